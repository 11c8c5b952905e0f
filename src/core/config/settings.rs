use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment,
    parse_store_backend, parse_u16, parse_u32, parse_u64,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    ApiSettings, AutosaveSettings, ConfigError, CorsSettings, DatabaseSettings, RuntimeSettings,
    SecuritySettings, ServerHost, ServerPort, ServerSettings, Settings, StoreBackend,
    TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("WORDCHECK_HOST", "0.0.0.0");
        let port = env_or_default("WORDCHECK_PORT", "8000");

        let environment = parse_environment(
            env_optional("WORDCHECK_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("WORDCHECK_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Wordcheck API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let (secret_key, secret_key_explicit) = match env_optional("SECRET_KEY") {
            Some(value) => (value, true),
            None => (load_or_create_secret_key(), false),
        };
        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "10080"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let backend = parse_store_backend(env_or_default("STORE_BACKEND", "postgres"))?;
        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "wordcheck");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "wordcheck");
        let database_url = env_optional("DATABASE_URL");
        let max_connections =
            parse_u32("DB_MAX_CONNECTIONS", env_or_default("DB_MAX_CONNECTIONS", "30"))?;
        let memory_seed_file = env_optional("MEMORY_SEED_FILE");

        let answer_debounce_ms = parse_u64(
            "AUTOSAVE_ANSWER_DEBOUNCE_MS",
            env_or_default("AUTOSAVE_ANSWER_DEBOUNCE_MS", "500"),
        )?;
        let progress_debounce_ms = parse_u64(
            "AUTOSAVE_PROGRESS_DEBOUNCE_MS",
            env_or_default("AUTOSAVE_PROGRESS_DEBOUNCE_MS", "1000"),
        )?;

        let log_level = env_or_default("WORDCHECK_LOG_LEVEL", "info");
        let json = env_optional("WORDCHECK_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings { host: ServerHost::parse(host)?, port: ServerPort::parse(port)? },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings {
                secret_key,
                secret_key_explicit,
                access_token_expire_minutes,
                algorithm,
            },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                backend,
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
                max_connections,
                memory_seed_file,
            },
            autosave: AutosaveSettings { answer_debounce_ms, progress_debounce_ms },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn autosave(&self) -> &AutosaveSettings {
        &self.autosave
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DB_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        if self.autosave.progress_debounce_ms < self.autosave.answer_debounce_ms {
            return Err(ConfigError::InvalidValue {
                field: "AUTOSAVE_PROGRESS_DEBOUNCE_MS",
                value: self.autosave.progress_debounce_ms.to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if !self.security.secret_key_explicit {
            return Err(ConfigError::MissingSecret("SECRET_KEY"));
        }
        if self.database.backend == StoreBackend::Postgres
            && self.database.database_url.is_none()
            && self.database.postgres_password.is_empty()
        {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Environment;

    fn base_settings() -> Settings {
        std::env::set_var("SECRET_KEY", "test-secret");
        Settings::load().expect("settings")
    }

    #[test]
    fn database_url_prefers_explicit_value() {
        let mut settings = base_settings();
        settings.database.database_url = Some("postgresql://a:b@db:5432/x".to_string());
        assert_eq!(settings.database().database_url(), "postgresql://a:b@db:5432/x");

        settings.database.database_url = None;
        settings.database.postgres_user = "u".to_string();
        settings.database.postgres_password = "p".to_string();
        settings.database.postgres_server = "host".to_string();
        settings.database.postgres_port = 6543;
        settings.database.postgres_db = "d".to_string();
        assert_eq!(settings.database().database_url(), "postgresql://u:p@host:6543/d");
    }

    #[test]
    fn strict_mode_requires_database_password() {
        let mut settings = base_settings();
        settings.runtime.strict_config = true;
        settings.security.secret_key_explicit = true;
        settings.database.backend = StoreBackend::Postgres;
        settings.database.database_url = None;
        settings.database.postgres_password = String::new();

        let err = settings.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret("POSTGRES_PASSWORD")));
    }

    #[test]
    fn strict_mode_requires_explicit_secret() {
        let mut settings = base_settings();
        settings.runtime.environment = Environment::Production;
        settings.security.secret_key_explicit = false;

        let err = settings.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret("SECRET_KEY")));
    }

    #[test]
    fn progress_debounce_must_not_be_shorter_than_answer_debounce() {
        let mut settings = base_settings();
        settings.autosave.answer_debounce_ms = 800;
        settings.autosave.progress_debounce_ms = 200;

        assert!(settings.validate().is_err());
    }
}
