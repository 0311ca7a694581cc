use std::fs;

use routing::RouteConfig;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_url: String,
    pub session_length_seconds: u64,
    pub login_round_trip_ms: u64,
    pub submit_round_trip_ms: u64,
    pub public_paths: Vec<String>,
    pub protected_prefixes: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let routes = RouteConfig::default();
        Self {
            database_url: "sqlite://./data/interview.db".into(),
            session_length_seconds: 1800,
            login_round_trip_ms: 1000,
            submit_round_trip_ms: 1500,
            public_paths: routes.public_paths,
            protected_prefixes: routes.protected_prefixes,
        }
    }
}

impl Settings {
    pub fn route_config(&self) -> RouteConfig {
        RouteConfig {
            public_paths: self.public_paths.clone(),
            protected_prefixes: self.protected_prefixes.clone(),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("interview.toml") {
        match toml::from_str::<Settings>(&raw) {
            Ok(file_settings) => settings = file_settings,
            Err(error) => warn!(%error, "ignoring malformed interview.toml"),
        }
    }

    if let Ok(v) = std::env::var("APP__DATABASE_URL") {
        settings.database_url = v;
    }
    if let Ok(v) = std::env::var("APP__SESSION_LENGTH_SECONDS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.session_length_seconds = parsed;
        }
    }
    if let Ok(v) = std::env::var("APP__LOGIN_ROUND_TRIP_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.login_round_trip_ms = parsed;
        }
    }
    if let Ok(v) = std::env::var("APP__SUBMIT_ROUND_TRIP_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.submit_round_trip_ms = parsed;
        }
    }

    settings
}
