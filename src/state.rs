use std::sync::Arc;

use crate::auth::{Session, SessionResolver, SupabaseAuth};
use crate::config::AppConfig;
use crate::database::{Access, Db, PostgrestStore, Store};
use crate::metadata::{MetadataProvider, MusicBrainzClient};

/// Shared handles for every request. Holds no per-request data.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub sessions: Arc<dyn SessionResolver>,
    pub metadata: Arc<dyn MetadataProvider>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn Store>,
        sessions: Arc<dyn SessionResolver>,
        metadata: Arc<dyn MetadataProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            sessions,
            metadata,
        }
    }

    /// Wire the hosted backend and MusicBrainz clients from configuration.
    pub fn from_config(config: AppConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().gzip(true).build()?;

        let store = Arc::new(PostgrestStore::new(client.clone(), &config.supabase));
        let sessions = Arc::new(SupabaseAuth::new(client.clone(), &config.supabase));
        let metadata = Arc::new(MusicBrainzClient::new(client, &config.metadata));

        Ok(Self::new(config, store, sessions, metadata))
    }

    /// Store scoped to the caller's credential (anonymous when signed out).
    pub fn db(&self, session: &Session) -> Db {
        Db::new(self.store.clone(), session.access())
    }

    /// Store under the elevated server-only credential. Signup profile
    /// creation is the only caller.
    pub fn elevated_db(&self) -> Db {
        Db::new(self.store.clone(), Access::Service)
    }
}
