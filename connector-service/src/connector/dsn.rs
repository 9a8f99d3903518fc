//! PostgreSQL connection string parsing.
//!
//! Accepts `postgres://` URLs and libpq keyword/value strings such as
//! `host=localhost port=5432 dbname=chinook user=postgres`.

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgSslMode};
use thiserror::Error;

/// Errors in a PostgreSQL connection string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DsnError {
    #[error("missing \"=\" after \"{0}\" in connection info string")]
    MissingEquals(String),
    #[error("unterminated quoted string in connection info string")]
    UnterminatedQuote,
    #[error("invalid connection option \"{0}\"")]
    UnknownKeyword(String),
    #[error("invalid {key} value: \"{value}\"")]
    InvalidValue { key: &'static str, value: String },
    #[error("invalid connection URL: {0}")]
    InvalidUrl(String),
}

/// Parsed connection target.
#[derive(Debug, Clone)]
pub struct PgTarget {
    pub options: PgConnectOptions,
    /// `connect_timeout` from the string; zero or absent means the default.
    pub connect_timeout: Option<Duration>,
}

/// Parses a URL or keyword/value connection string.
///
/// Keys missing from a keyword string fall back to the libpq environment
/// variables (`PGHOST`, `PGUSER`, ...).
pub fn parse(connection: &str) -> Result<PgTarget, DsnError> {
    let connection = connection.trim();
    if connection.starts_with("postgres://") || connection.starts_with("postgresql://") {
        let options = PgConnectOptions::from_str(connection)
            .map_err(|e| DsnError::InvalidUrl(e.to_string()))?;
        return Ok(PgTarget {
            options,
            connect_timeout: None,
        });
    }

    let mut options = PgConnectOptions::new();
    let mut connect_timeout = None;

    for (key, value) in pairs(connection)? {
        options = match key.as_str() {
            "host" | "hostaddr" if value.starts_with('/') => options.socket(&value),
            "host" | "hostaddr" => options.host(&value),
            "port" => options.port(value.parse().map_err(|_| DsnError::InvalidValue {
                key: "port",
                value: value.clone(),
            })?),
            "user" => options.username(&value),
            "password" => options.password(&value),
            "dbname" => options.database(&value),
            "sslmode" => options.ssl_mode(PgSslMode::from_str(&value).map_err(|_| {
                DsnError::InvalidValue {
                    key: "sslmode",
                    value: value.clone(),
                }
            })?),
            "application_name" => options.application_name(&value),
            "connect_timeout" => {
                let secs: u64 = value.parse().map_err(|_| DsnError::InvalidValue {
                    key: "connect_timeout",
                    value: value.clone(),
                })?;
                connect_timeout = (secs > 0).then(|| Duration::from_secs(secs));
                options
            }
            _ => return Err(DsnError::UnknownKeyword(key)),
        };
    }

    Ok(PgTarget {
        options,
        connect_timeout,
    })
}

/// Splits a keyword/value string into pairs.
///
/// Whitespace may surround `=`. Values may be single-quoted; a backslash
/// escapes the next character both inside and outside quotes.
fn pairs(input: &str) -> Result<Vec<(String, String)>, DsnError> {
    let mut chars = input.chars().peekable();
    let mut out = Vec::new();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            return Ok(out);
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && !c.is_whitespace()) {
            key.push(c);
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.next() != Some('=') {
            return Err(DsnError::MissingEquals(key));
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let mut value = String::new();
        if chars.next_if_eq(&'\'').is_some() {
            loop {
                match chars.next() {
                    Some('\\') => value.push(chars.next().ok_or(DsnError::UnterminatedQuote)?),
                    Some('\'') => break,
                    Some(c) => value.push(c),
                    None => return Err(DsnError::UnterminatedQuote),
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        value.push(escaped);
                    }
                } else {
                    value.push(c);
                }
            }
        }
        out.push((key, value));
    }
}
