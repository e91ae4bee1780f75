use std::env;

use thiserror::Error;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_DB_HOST: &str = "127.0.0.1";
const DEFAULT_DB_PORT: u16 = 3306;
const DEFAULT_DB_USER: &str = "root";
const DEFAULT_DB_NAME: &str = "closetdb";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid {name} value '{value}': port must be a number between 1 and 65535")]
    InvalidPort { name: &'static str, value: String },

    #[error("Invalid DB_NAME '{0}': only ASCII letters, digits and underscores are allowed")]
    InvalidDatabaseName(String),

    #[error("Unsupported DATABASE_URL '{0}': only sqlite: URLs are accepted, configure MySQL with DB_* variables")]
    UnsupportedDatabaseUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySqlSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseSettings {
    MySql(MySqlSettings),
    /// Embedded backend selected by a `sqlite:` DATABASE_URL.
    Sqlite { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub port: u16,
    pub database: DatabaseSettings,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through `lookup`, treating empty values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let port = parse_port("PORT", get("PORT"), DEFAULT_PORT)?;

        let database = match get("DATABASE_URL") {
            Some(url) if url.starts_with("sqlite:") => DatabaseSettings::Sqlite { url },
            Some(url) => return Err(ConfigError::UnsupportedDatabaseUrl(url)),
            None => {
                let database = get("DB_NAME").unwrap_or_else(|| DEFAULT_DB_NAME.to_string());
                validate_database_name(&database)?;
                DatabaseSettings::MySql(MySqlSettings {
                    host: get("DB_HOST").unwrap_or_else(|| DEFAULT_DB_HOST.to_string()),
                    port: parse_port("DB_PORT", get("DB_PORT"), DEFAULT_DB_PORT)?,
                    user: get("DB_USER").unwrap_or_else(|| DEFAULT_DB_USER.to_string()),
                    // An empty password is a valid setting, so read it unfiltered.
                    password: lookup("DB_PASSWORD").unwrap_or_default(),
                    database,
                })
            }
        };

        Ok(Self { port, database })
    }
}

fn parse_port(name: &'static str, value: Option<String>, default: u16) -> Result<u16, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ConfigError::InvalidPort { name, value }),
    }
}

/// The database name is spliced into `CREATE DATABASE` and `USE`, which take
/// no bind parameters, so it must be a plain identifier.
fn validate_database_name(name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidDatabaseName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let settings = settings(&[]).unwrap();
        assert_eq!(settings.port, 3001);
        assert_eq!(
            settings.database,
            DatabaseSettings::MySql(MySqlSettings {
                host: "127.0.0.1".into(),
                port: 3306,
                user: "root".into(),
                password: String::new(),
                database: "closetdb".into(),
            })
        );
    }

    #[test]
    fn reads_every_mysql_variable() {
        let settings = settings(&[
            ("PORT", "8080"),
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "3307"),
            ("DB_USER", "closet"),
            ("DB_PASSWORD", "hunter2"),
            ("DB_NAME", "wardrobe"),
        ])
        .unwrap();
        assert_eq!(settings.port, 8080);
        let DatabaseSettings::MySql(mysql) = settings.database else {
            panic!("expected mysql settings");
        };
        assert_eq!(mysql.host, "db.internal");
        assert_eq!(mysql.port, 3307);
        assert_eq!(mysql.user, "closet");
        assert_eq!(mysql.password, "hunter2");
        assert_eq!(mysql.database, "wardrobe");
    }

    #[test]
    fn rejects_bad_ports() {
        assert!(matches!(
            settings(&[("PORT", "http")]),
            Err(ConfigError::InvalidPort { name: "PORT", .. })
        ));
        assert!(matches!(
            settings(&[("DB_PORT", "70000")]),
            Err(ConfigError::InvalidPort { name: "DB_PORT", .. })
        ));
        assert!(matches!(
            settings(&[("PORT", "0")]),
            Err(ConfigError::InvalidPort { .. })
        ));
    }

    #[test]
    fn rejects_database_names_that_need_quoting() {
        assert_eq!(
            settings(&[("DB_NAME", "closet`; DROP DATABASE x")]),
            Err(ConfigError::InvalidDatabaseName(
                "closet`; DROP DATABASE x".into()
            ))
        );
    }

    #[test]
    fn sqlite_url_selects_embedded_backend() {
        let settings = settings(&[("DATABASE_URL", "sqlite:closet.db")]).unwrap();
        assert_eq!(
            settings.database,
            DatabaseSettings::Sqlite {
                url: "sqlite:closet.db".into()
            }
        );
    }

    #[test]
    fn other_database_urls_are_refused() {
        assert!(matches!(
            settings(&[("DATABASE_URL", "postgres://localhost/closet")]),
            Err(ConfigError::UnsupportedDatabaseUrl(_))
        ));
    }
}
