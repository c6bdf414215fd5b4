use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::{IdentityResolver, TokenVerifier};
use crate::config::Config;
use crate::mail::Mailer;
use crate::writer::StoryWriter;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub identity: Arc<dyn IdentityResolver>,
    pub webhook_verifier: Arc<dyn TokenVerifier>,
    pub mailer: Arc<dyn Mailer>,
    pub writer: Arc<dyn StoryWriter>,
}
