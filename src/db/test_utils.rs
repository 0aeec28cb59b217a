//! Shared test utilities for database operations
//!
//! `test_pool()` opens an in-memory database through `Database::new(None)`
//! so tests run against the same schema as production.

use sqlx::SqlitePool;

use super::Database;

/// Create an in-memory test database pool with full schema
pub async fn test_pool() -> SqlitePool {
    let db = Database::new(None)
        .await
        .expect("Failed to create test database");
    db.pool().clone()
}
