use core_config::{FromEnv, server::ServerConfig};
use domain_sessions::{RedisConfig, SessionConfig};

pub use core_config::Environment;

/// Application configuration, composed from the shared config components
#[derive(Clone, Debug)]
pub struct Config {
    pub session: SessionConfig,
    pub redis: RedisConfig,
    pub server: ServerConfig,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let session = SessionConfig::from_env()?; // Requires JWT_SECRET (or a PEM key pair)
        let redis = RedisConfig::from_env()?; // Requires REDIS_URL or REDIS_HOST
        let server = ServerConfig::from_env()?; // Defaults: HOST=0.0.0.0, PORT=8080

        Ok(Self {
            session,
            redis,
            server,
            environment,
        })
    }
}
