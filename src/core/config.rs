mod parsing;
mod secret;
mod settings;
mod types;

pub(crate) use types::{
    ApiSettings, AutosaveSettings, ConfigError, CorsSettings, DatabaseSettings, Environment,
    RuntimeSettings, SecuritySettings, Settings, StoreBackend, TelemetrySettings,
};
