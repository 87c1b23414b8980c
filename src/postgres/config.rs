use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DbcError, driver_message};

static SCHEME_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(pgsql|postgresql|postgres):").expect("valid regex"));

static KEYWORD_PASSWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(password\s*=\s*)('(?:[^'\\]|\\.)*'|[^\s;]+)"#).expect("valid regex")
});

static URL_PASSWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\s*postgres(?:ql)?://[^:/@]*:)[^@]*@").expect("valid regex")
});

/// Connection settings parsed from a DSN.
///
/// Accepted forms:
/// - `pgsql:host=db;port=5432;dbname=app;user=bob;password=secret;connect_timeout=5`
///   (scheme stripped, `;` turned into spaces),
/// - libpq keyword form `host=db port=5432 dbname=app`,
/// - URLs `postgres://bob:secret@db:5432/app`.
///
/// Values are handed to `tokio_postgres::Config` verbatim, so values containing
/// `;` cannot be expressed in the first form.
///
/// ```rust
/// use pg_dbc::postgres::ConnectOptions;
///
/// let opts = ConnectOptions::parse("pgsql:host=/tmp;port=6432;dbname=testdb;password=mypass");
/// assert_eq!(opts.conninfo(), "host=/tmp port=6432 dbname=testdb password=mypass");
/// assert_eq!(opts.sanitized(), "host=/tmp port=6432 dbname=testdb password=***");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOptions {
    conninfo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    application_name: Option<String>,
}

impl ConnectOptions {
    /// Normalize a DSN. Parsing of the individual keys happens when connecting.
    #[must_use]
    pub fn parse(dsn: &str) -> Self {
        let trimmed = dsn.trim();
        let conninfo = if is_url(trimmed) {
            trimmed.to_string()
        } else {
            SCHEME_PREFIX
                .replace(trimmed, "")
                .replace(';', " ")
                .trim()
                .to_string()
        };
        Self {
            conninfo,
            application_name: None,
        }
    }

    /// Report `name` as `application_name` to the server, overriding the DSN.
    #[must_use]
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// The normalized connection string.
    #[must_use]
    pub fn conninfo(&self) -> &str {
        &self.conninfo
    }

    /// The connection string with any password masked, safe for logs and errors.
    #[must_use]
    pub fn sanitized(&self) -> String {
        let masked = KEYWORD_PASSWORD.replace_all(&self.conninfo, "${1}***");
        URL_PASSWORD.replace(&masked, "${1}***@").into_owned()
    }

    /// Build the driver configuration.
    ///
    /// # Errors
    /// Returns `DbcError::ConnectionFailure` if the driver rejects the connection string.
    pub fn to_tokio_config(&self) -> Result<tokio_postgres::Config, DbcError> {
        let mut config =
            tokio_postgres::Config::from_str(&self.conninfo).map_err(|e| {
                DbcError::ConnectionFailure {
                    dsn: self.sanitized(),
                    message: driver_message(&e),
                }
            })?;
        if let Some(name) = &self.application_name {
            config.application_name(name);
        }
        Ok(config)
    }
}

impl FromStr for ConnectOptions {
    type Err = DbcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let options = ConnectOptions::parse(s);
        options.to_tokio_config()?;
        Ok(options)
    }
}

fn is_url(dsn: &str) -> bool {
    let lower = dsn.to_ascii_lowercase();
    lower.starts_with("postgres://") || lower.starts_with("postgresql://")
}
