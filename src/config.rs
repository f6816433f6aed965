use rocket::figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};

/// Settings read from `Rocket.toml`, `ROCKET_*` variables and the handful of
/// unprefixed variables the deployment scripts export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub frontend_url: String,
    pub session_hours: i64,
    pub session_cleanup_interval_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clerk_pem_public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clerk_issuer: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://german_gains.db?mode=rwc".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            session_hours: 24,
            session_cleanup_interval_secs: 3600,
            clerk_pem_public_key: None,
            clerk_issuer: None,
        }
    }
}

const UNPREFIXED_VARS: [&str; 4] = [
    "DATABASE_URL",
    "FRONTEND_URL",
    "CLERK_PEM_PUBLIC_KEY",
    "CLERK_ISSUER",
];

impl AppConfig {
    /// Rocket's own figment with our defaults underneath and the unprefixed
    /// variables on top.
    pub fn figment() -> Figment {
        rocket::Config::figment()
            .join(Serialized::defaults(AppConfig::default()))
            .merge(Env::raw().only(&UNPREFIXED_VARS))
    }

    pub fn from_figment(figment: &Figment) -> Result<Self, rocket::figment::Error> {
        figment.extract::<AppConfig>()
    }

    pub fn session_duration(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_hours.max(1))
    }

    pub fn cookie_max_age(&self) -> rocket::time::Duration {
        rocket::time::Duration::hours(self.session_hours.max(1))
    }
}
