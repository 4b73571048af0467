//! Shared application state handed to every handler.

use std::sync::Arc;

use portal_auth::{AuthConfig, AuthService};
use portal_core::lifecycle::AssetLifecycle;
use portal_db::{
    SurrealAssetRepository, SurrealJobRepository, SurrealReferralRepository,
    SurrealUserRepository,
};
use portal_files::FileIntake;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;

pub type Db = Surreal<Any>;

/// Services wired against one database handle. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub auth: Arc<AuthService<SurrealUserRepository<Any>>>,
    pub jobs: Arc<SurrealJobRepository<Any>>,
    pub referrals: Arc<SurrealReferralRepository<Any>>,
    pub assets: Arc<AssetLifecycle<SurrealAssetRepository<Any>>>,
    pub files: Arc<dyn FileIntake>,
    pub max_upload_bytes: u64,
}

impl AppState {
    pub fn new(
        db: Db,
        auth_config: AuthConfig,
        files: Arc<dyn FileIntake>,
        max_upload_bytes: u64,
    ) -> Self {
        let users = match auth_config.pepper.clone() {
            Some(pepper) => SurrealUserRepository::with_pepper(db.clone(), pepper),
            None => SurrealUserRepository::new(db.clone()),
        };
        Self {
            auth: Arc::new(AuthService::new(users, auth_config)),
            jobs: Arc::new(SurrealJobRepository::new(db.clone())),
            referrals: Arc::new(SurrealReferralRepository::new(db.clone())),
            assets: Arc::new(AssetLifecycle::new(SurrealAssetRepository::new(db.clone()))),
            files,
            max_upload_bytes,
            db,
        }
    }
}
