use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    auth::jwt::JwtKeys,
    config::AppConfig,
    documents::repo::{DocumentRepository, PgDocumentRepository},
    lab_results::repo::{LabResultRepository, PgLabResultRepository},
    memory::{MemoryStorage, MemoryStore},
    storage::{S3Storage, StorageClient},
    trends::repo::{PgTrendRepository, TrendRepository},
    users::repo::{PgUserRepository, UserRepository},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub keys: JwtKeys,
    pub users: Arc<dyn UserRepository>,
    pub lab_results: Arc<dyn LabResultRepository>,
    pub documents: Arc<dyn DocumentRepository>,
    pub trends: Arc<dyn TrendRepository>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    /// Postgres repositories over `db`, S3 storage from config.
    pub async fn init(config: AppConfig, db: PgPool) -> anyhow::Result<Self> {
        let storage = Arc::new(S3Storage::new(&config.storage).await?) as Arc<dyn StorageClient>;

        Ok(Self {
            keys: JwtKeys::from_config(&config.jwt),
            config: Arc::new(config),
            users: Arc::new(PgUserRepository::new(db.clone())),
            lab_results: Arc::new(PgLabResultRepository::new(db.clone())),
            documents: Arc::new(PgDocumentRepository::new(db.clone())),
            trends: Arc::new(PgTrendRepository::new(db)),
            storage,
        })
    }

    /// In-memory repositories and storage, for tests.
    pub fn fake() -> Self {
        Self::fake_with(MemoryStore::new(), MemoryStorage::new())
    }

    /// Like [`AppState::fake`], sharing the given store and storage so tests
    /// can inspect them.
    pub fn fake_with(store: MemoryStore, storage: MemoryStorage) -> Self {
        let config = AppConfig::fake();
        Self {
            keys: JwtKeys::from_config(&config.jwt),
            config: Arc::new(config),
            users: Arc::new(store.clone()),
            lab_results: Arc::new(store.clone()),
            documents: Arc::new(store.clone()),
            trends: Arc::new(store),
            storage: Arc::new(storage),
        }
    }
}
