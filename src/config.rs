//! Store connection configuration.
//!
//! Sources, lowest to highest priority:
//! 1. Defaults (`127.0.0.1:6379`, database 0, no password)
//! 2. An optional TOML file (`host = "..."`, `port = 6380`, ...)
//! 3. `REDIS_`-prefixed environment variables (`REDIS_HOST`, `REDIS_PORT`,
//!    `REDIS_PASSWORD`, `REDIS_DB`, `REDIS_KEY_PREFIX`)

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::warn;

const ENV_PREFIX: &str = "REDIS_";

/// Keys read verbatim from the environment instead of being type-guessed,
/// so `REDIS_PASSWORD=0123` stays `"0123"`.
const RAW_ENV_KEYS: [&str; 2] = ["password", "key_prefix"];

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    #[serde(deserialize_with = "scalar_as_string")]
    pub password: Option<String>,
    pub db: i64,
    /// Prepended to every set key as `<prefix>:<category>`.
    #[serde(deserialize_with = "scalar_as_string")]
    pub key_prefix: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: None,
            db: 0,
            key_prefix: None,
        }
    }
}

impl StoreConfig {
    pub fn load(config_path: Option<&Path>) -> Result<StoreConfig, Box<figment::Error>> {
        let mut figment = Figment::new().merge(Serialized::defaults(StoreConfig::default()));

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(env_provider());
        for key in RAW_ENV_KEYS {
            let var = format!("{}{}", ENV_PREFIX, key.to_ascii_uppercase());
            if let Ok(value) = std::env::var(&var) {
                figment = figment.merge(Serialized::default(key, value));
            }
        }

        figment.extract().map_err(Box::new)
    }

    /// Store key for a word set, with the prefix applied.
    pub fn key(&self, name: &str) -> String {
        match self.key_prefix.as_deref().filter(|p| !p.is_empty()) {
            Some(prefix) => format!("{}:{}", prefix, name),
            None => name.to_string(),
        }
    }

    /// The password, unless unset or empty.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("db", &self.db)
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

/// `REDIS_*` variables, minus the raw-string keys. Kubernetes service links
/// inject `REDIS_PORT=tcp://host:port`; a port that is not a plain number
/// is skipped so lower-priority sources still apply.
fn env_provider() -> Env {
    let port_var = format!("{}PORT", ENV_PREFIX);
    let plain_port = match std::env::var(&port_var) {
        Ok(value) if value.trim().parse::<u16>().is_err() => {
            warn!(var = %port_var, value = %value, "ignoring non-numeric port");
            false
        }
        _ => true,
    };

    Env::prefixed(ENV_PREFIX)
        .ignore(&RAW_ENV_KEYS)
        .filter(move |key| plain_port || !key.as_str().eq_ignore_ascii_case("port"))
}

/// Accept any scalar (string, number, bool) as a string.
fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ScalarVisitor;

    impl<'de> Visitor<'de> for ScalarVisitor {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string, number or boolean")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_i128<E: de::Error>(self, v: i128) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(ScalarVisitor)
        }
    }

    deserializer.deserialize_any(ScalarVisitor)
}
