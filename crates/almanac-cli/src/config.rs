use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Settings read from `almanac.toml` and `ALMANAC_*` environment variables.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub database_path: String,
    /// Default tracing directive when `RUST_LOG` is unset
    pub log_level: String,
    #[serde(default)]
    pub defaults: RuleDefaults,
}

/// Values used by `add` when the matching flag is omitted.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct RuleDefaults {
    pub duration_minutes: u32,
    pub notif_offset_minutes: i32,
    pub has_notifications: bool,
}

impl Default for RuleDefaults {
    fn default() -> Self {
        Self {
            duration_minutes: 60,
            notif_offset_minutes: 15,
            has_notifications: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "almanac.db".to_string(),
            log_level: "warn".to_string(),
            defaults: RuleDefaults::default(),
        }
    }
}

impl Config {
    pub fn new() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file("almanac.toml"))
            .merge(Env::prefixed("ALMANAC_").split("__"))
    }
}
