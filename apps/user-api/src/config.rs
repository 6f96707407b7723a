use core_config::jwt::JwtConfig;
use core_config::nats::NatsConfig;
use core_config::quiz::QuizServiceConfig;
use core_config::server::ServerConfig;
use core_config::{app_info, AppInfo, ConfigError, Environment, FromEnv};

/// Runtime configuration for the user API, loaded from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub nats: NatsConfig,
    pub jwt: JwtConfig,
    pub quiz: QuizServiceConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            app: app_info!(),
            environment: Environment::from_env(),
            server: ServerConfig::from_env()?,
            nats: NatsConfig::from_env()?,
            jwt: JwtConfig::from_env()?,
            quiz: QuizServiceConfig::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        temp_env::with_vars(
            [
                ("NATS_URL", Some("nats://broker:4222")),
                ("JWT_SECRET", Some("secret")),
                ("QUIZ_SERVICE_URL", Some("http://quiz:8080")),
                ("PORT", Some("9100")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.server.port, 9100);
                assert_eq!(config.nats.url, "nats://broker:4222");
            },
        );
    }

    #[test]
    fn test_config_requires_nats_url() {
        temp_env::with_vars(
            [
                ("NATS_URL", None::<&str>),
                ("JWT_SECRET", Some("secret")),
                ("QUIZ_SERVICE_URL", Some("http://quiz:8080")),
            ],
            || {
                assert!(Config::from_env().is_err());
            },
        );
    }
}
