pub mod memory;
pub mod postgrest;
pub mod query;
pub mod store;

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;
pub use query::{Filter, Query, SortDirection};
pub use store::{Access, Db, Store, StoreError};

/// Table names in the hosted schema
pub mod tables {
    pub const PROFILES: &str = "profiles";
    pub const ARTISTS: &str = "artists";
    pub const RELEASES: &str = "releases";
    pub const ARTIST_RELEASES: &str = "artist_releases";
    pub const GENRES: &str = "genres";
    pub const RELEASE_GENRES: &str = "release_genres";
    pub const TRACKS: &str = "tracks";
    pub const RATINGS: &str = "ratings";
    pub const REVIEWS: &str = "reviews";
    pub const COLLECTIONS: &str = "collections";
    pub const COLLECTION_RELEASES: &str = "collection_releases";
    pub const FOLLOWS: &str = "follows";
}
