use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::{str::FromStr, time::Duration};

/// Creates a PostgreSQL connection pool
///
/// Every pooled connection carries a server-side `statement_timeout`, so a
/// slow recommendation query is cancelled by Postgres instead of holding a
/// connection indefinitely. Acquiring a connection is bounded by the same
/// timeout.
pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
    query_timeout: Duration,
) -> anyhow::Result<PgPool> {
    let options = PgConnectOptions::from_str(database_url)?
        .options([("statement_timeout", query_timeout.as_millis().to_string())]);

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(query_timeout)
        .connect_with(options)
        .await?;

    Ok(pool)
}
