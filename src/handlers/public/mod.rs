// handlers/public/mod.rs - Public handlers (session optional)
//
// Catalog reads, public profiles and collections, music search, and the
// signup-time profile hook. A resolved session only changes what is visible
// (private collections, `is_following`), never whether the route answers.
pub mod artists;
pub mod collections;
pub mod music;
pub mod profiles;
pub mod releases;
pub mod reviews;
pub mod signup;
