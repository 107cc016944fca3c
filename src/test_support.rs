use sqlx::sqlite::SqlitePoolOptions;

use crate::{auth::TokenKeys, AppState};

/// Fresh migrated in-memory database. One connection, so every query sees the same memory db.
pub async fn test_state() -> AppState {
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    sqlx::migrate!().run(&db_pool).await.expect("migrations");
    AppState {
        db_pool,
        tokens: TokenKeys::new(b"test-secret"),
    }
}
