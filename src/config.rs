use thiserror::Error;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_DATABASE_NAME: &str = "ExpenseSplitter";
const DEV_SECRET_KEY: &str = "dev-secret";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("You need to add {0} to the env")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Mongo { uri: String, database: String },
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_address: String,
    pub secret_key: String,
    pub cookie_secure: bool,
    pub store: StoreBackend,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_address =
            lookup("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let secret_key = lookup("SECRET_KEY")
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| {
                tracing::warn!("SECRET_KEY not set; using insecure dev default");
                DEV_SECRET_KEY.to_string()
            });

        let cookie_secure = match lookup("COOKIE_SECURE").as_deref() {
            None | Some("") | Some("false") | Some("0") => false,
            Some("true") | Some("1") => true,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "COOKIE_SECURE",
                    value: other.to_string(),
                })
            }
        };

        let store = match lookup("STORE_BACKEND").as_deref() {
            None | Some("mongodb") => StoreBackend::Mongo {
                uri: lookup("MONGODB_URI").ok_or(ConfigError::Missing("MONGODB_URI"))?,
                database: lookup("DATABASE_NAME")
                    .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string()),
            },
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            bind_address,
            secret_key,
            cookie_secure,
            store,
        })
    }
}
