use postgresql_embedded::PostgreSQL;
use tokio::runtime::{Builder, Runtime};
use tracing::warn;

use crate::postgres::Connection;

/// A running embedded `PostgreSQL` instance.
pub struct EmbeddedPostgres {
    pub postgresql: PostgreSQL,
    pub port: u16,
    /// DSN for the test database, in `pgsql:key=value;...` form.
    pub dsn: String,
    runtime: Runtime,
}

/// Start an embedded server and create `dbname` on it.
///
/// Must be called outside any async runtime.
///
/// # Errors
/// Returns an error if the server cannot be set up or started, if the database
/// cannot be created, or if the post-start connectivity check fails.
pub fn setup_postgres_embedded(
    dbname: &str,
) -> Result<EmbeddedPostgres, Box<dyn std::error::Error>> {
    let runtime = Builder::new_current_thread().enable_all().build()?;

    let (postgresql, dsn, port) = runtime.block_on(async {
        let mut postgresql = PostgreSQL::default();
        postgresql.setup().await?;
        postgresql.start().await?;
        postgresql.create_database(dbname).await?;

        let settings = postgresql.settings();
        let port = settings.port;
        let dsn = format!(
            "pgsql:host={};port={port};dbname={dbname};user={};password={}",
            settings.host, settings.username, settings.password
        );
        Ok::<_, Box<dyn std::error::Error>>((postgresql, dsn, port))
    })?;

    // Quick connection test
    let mut conn = Connection::open(&dsn)?;
    conn.query("SELECT 1")?;
    conn.close();

    Ok(EmbeddedPostgres {
        postgresql,
        port,
        dsn,
        runtime,
    })
}

/// Stop a previously started embedded `PostgreSQL` instance.
pub fn stop_postgres_embedded(postgres: EmbeddedPostgres) {
    let EmbeddedPostgres {
        postgresql,
        runtime,
        ..
    } = postgres;
    runtime.block_on(async move {
        if let Err(e) = postgresql.stop().await {
            warn!(error = %e, "failed to stop embedded postgres");
        }
    });
}
