use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment, parse_u16,
    parse_u32, parse_u64,
};
use super::types::{
    ApiSettings, AssessmentSettings, ConfigError, CorsSettings, DatabaseSettings, RedisSettings,
    RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings, Settings,
    TelemetrySettings,
};

const DEFAULT_MAX_LOCKED_SUBMISSIONS: &str = "10";

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("ASSESSMENT_HOST", "0.0.0.0");
        let port = env_or_default("ASSESSMENT_PORT", "8000");

        let environment = parse_environment(
            env_optional("ASSESSMENT_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("ASSESSMENT_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Assessment Desk");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let configured_secret = env_optional("SECRET_KEY");
        if configured_secret.is_none() && strict_config {
            return Err(ConfigError::MissingSecret("SECRET_KEY"));
        }
        let secret_key = configured_secret.unwrap_or_else(|| {
            tracing::warn!("SECRET_KEY not configured; using an ephemeral key for this process");
            generate_secret_key()
        });

        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "10080"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "assessment");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "assessment_desk");
        let database_url = env_optional("DATABASE_URL");
        let max_connections =
            parse_u32("DATABASE_MAX_CONNECTIONS", env_or_default("DATABASE_MAX_CONNECTIONS", "30"))?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let max_locked_submissions_per_tutor = parse_u32(
            "MAX_LOCKED_SUBMISSIONS_PER_TUTOR",
            env_or_default("MAX_LOCKED_SUBMISSIONS_PER_TUTOR", DEFAULT_MAX_LOCKED_SUBMISSIONS),
        )?;
        let second_round_excludes_first_assessor =
            env_optional("SECOND_ROUND_EXCLUDES_FIRST_ASSESSOR")
                .map(|value| parse_bool(&value))
                .unwrap_or(true);
        let complaint_lock_duration_minutes = parse_u64(
            "COMPLAINT_LOCK_DURATION_MINUTES",
            env_or_default("COMPLAINT_LOCK_DURATION_MINUTES", "1440"),
        )?;
        let result_release_interval_seconds = parse_u64(
            "RESULT_RELEASE_INTERVAL_SECONDS",
            env_or_default("RESULT_RELEASE_INTERVAL_SECONDS", "60"),
        )?;

        let log_level = env_or_default("ASSESSMENT_LOG_LEVEL", "info");
        let json =
            env_optional("ASSESSMENT_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings { secret_key, access_token_expire_minutes, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
                max_connections,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            assessment: AssessmentSettings {
                max_locked_submissions_per_tutor,
                second_round_excludes_first_assessor,
                complaint_lock_duration_minutes,
                result_release_interval_seconds,
            },
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

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn assessment(&self) -> &AssessmentSettings {
        &self.assessment
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.assessment.max_locked_submissions_per_tutor == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_LOCKED_SUBMISSIONS_PER_TUTOR",
                value: "0".to_string(),
            });
        }

        if self.assessment.result_release_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "RESULT_RELEASE_INTERVAL_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DATABASE_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        if !self.runtime.strict_config {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }

        Ok(())
    }
}

fn generate_secret_key() -> String {
    let mut bytes = [0u8; 64];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::Settings;
    use crate::test_support;

    #[tokio::test]
    async fn lock_ceiling_defaults_to_ten() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::remove_var("MAX_LOCKED_SUBMISSIONS_PER_TUTOR");

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.assessment().max_locked_submissions_per_tutor, 10);
        assert!(settings.assessment().second_round_excludes_first_assessor);
    }

    #[tokio::test]
    async fn zero_lock_ceiling_is_rejected() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("MAX_LOCKED_SUBMISSIONS_PER_TUTOR", "0");

        let result = Settings::load();
        std::env::remove_var("MAX_LOCKED_SUBMISSIONS_PER_TUTOR");

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn strict_mode_requires_secret_key() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::remove_var("SECRET_KEY");
        std::env::set_var("ASSESSMENT_STRICT_CONFIG", "1");

        let result = Settings::load();
        test_support::set_test_env();

        assert!(result.is_err());
    }
}
