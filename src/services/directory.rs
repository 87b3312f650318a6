use async_trait::async_trait;

use crate::db::{self, queries, Db};
use crate::errors::AppError;
use crate::models::{Court, User};

#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn find_user(&self, id: &str) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait CourtLookup: Send + Sync {
    async fn find_court(&self, id: &str) -> Result<Option<Court>, AppError>;
}

/// Users and courts read straight from the booking database.
pub struct SqliteDirectory {
    db: Db,
}

impl SqliteDirectory {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserLookup for SqliteDirectory {
    async fn find_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let conn = db::lock(&self.db);
        Ok(queries::find_user_by_id(&conn, id)?)
    }
}

#[async_trait]
impl CourtLookup for SqliteDirectory {
    async fn find_court(&self, id: &str) -> Result<Option<Court>, AppError> {
        let conn = db::lock(&self.db);
        Ok(queries::find_court_by_id(&conn, id)?)
    }
}
