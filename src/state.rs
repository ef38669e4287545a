use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn, orm_from_pool},
    mailer::Mailer,
    payments::StripeClient,
    storage::FileStore,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub mailer: Mailer,
    pub payments: Option<StripeClient>,
    pub files: FileStore,
}

impl AppState {
    pub fn new(pool: DbPool, config: AppConfig) -> anyhow::Result<Self> {
        let orm = orm_from_pool(&pool);
        let mailer = Mailer::from_config(&config.mail)?;
        let payments = config
            .payments
            .secret_key
            .as_ref()
            .map(|key| StripeClient::new(key.clone(), config.payments.api_base.clone()));
        let files = FileStore::new(&config.upload_dir, config.max_upload_bytes);
        Ok(Self {
            pool,
            orm,
            config: Arc::new(config),
            mailer,
            payments,
            files,
        })
    }
}
