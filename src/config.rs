use crate::error::DispatchError;
use crate::service::scheduler::{parse_schedule, parse_timezone};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const CONFIG_FILE: &str = "dispatcher.toml";
pub const ENV_PREFIX: &str = "DISPATCH_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub connector_id: i64,
    pub queue_endpoint: Url,

    pub region: String,
    /// Overrides the AWS endpoint for both SQS and Secrets Manager.
    pub aws_endpoint: Option<Url>,

    pub schedule: String,
    pub timezone: String,

    pub secret_id: String,
    pub secret_timeout_secs: u64,
    pub db_credentials_group: String,

    pub pool_max_connections: u32,
    pub pool_idle_timeout_secs: u64,
    pub pool_connect_timeout_secs: u64,
    pub query_timeout_secs: u64,

    pub publish_timeout_secs: u64,
    pub publish_concurrency: usize,
    pub publish_max_retries: usize,

    pub shutdown_grace_secs: u64,
    pub loglevel: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connector_id: 6,
            queue_endpoint: Url::parse(
                "https://sqs.us-west-2.amazonaws.com/000000000000/gdrive-files",
            )
            .expect("default queue endpoint is a valid URL"),
            region: "us-west-2".to_string(),
            aws_endpoint: None,
            schedule: "0 0 * * *".to_string(),
            timezone: "America/New_York".to_string(),
            secret_id: "dev/envs".to_string(),
            secret_timeout_secs: 30,
            db_credentials_group: "DB_CREDENTIALS".to_string(),
            pool_max_connections: 5,
            pool_idle_timeout_secs: 30 * 60,
            pool_connect_timeout_secs: 15 * 60,
            query_timeout_secs: 60,
            publish_timeout_secs: 30,
            publish_concurrency: 16,
            publish_max_retries: 3,
            shutdown_grace_secs: 30,
            loglevel: "info".to_string(),
        }
    }
}

impl Config {
    /// Defaults, then `dispatcher.toml`, then `DISPATCH_*` environment variables.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load() -> Result<Self, DispatchError> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> Result<Self, DispatchError> {
        let cfg: Config = figment.extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        parse_schedule(&self.schedule)?;
        parse_timezone(&self.timezone)?;
        if self.publish_concurrency == 0 {
            return Err(DispatchError::Config(figment::Error::from(
                "publish_concurrency must be at least 1".to_string(),
            )));
        }
        Ok(())
    }

    pub fn secret_timeout(&self) -> Duration {
        Duration::from_secs(self.secret_timeout_secs)
    }

    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }

    pub fn pool_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_connect_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_the_nightly_gdrive_job() {
        let cfg = Config::from_figment(Figment::from(Serialized::defaults(Config::default())))
            .expect("defaults are valid");
        assert_eq!(cfg.connector_id, 6);
        assert_eq!(cfg.schedule, "0 0 * * *");
        assert_eq!(cfg.timezone, "America/New_York");
        assert_eq!(cfg.secret_id, "dev/envs");
        assert_eq!(cfg.region, "us-west-2");
        assert!(cfg.aws_endpoint.is_none());
        assert!(cfg.pool_idle_timeout() >= Duration::from_secs(10 * 60));
    }

    #[test]
    fn overrides_are_merged_over_defaults() {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Serialized::default("connector_id", 9))
            .merge(Serialized::default("timezone", "Europe/Berlin"))
            .merge(Serialized::default("aws_endpoint", "http://localhost:9324/"));
        let cfg = Config::from_figment(figment).expect("valid overrides");
        assert_eq!(cfg.connector_id, 9);
        assert_eq!(
            cfg.aws_endpoint.as_ref().map(Url::as_str),
            Some("http://localhost:9324/")
        );
        assert_eq!(cfg.timezone, "Europe/Berlin");
        assert_eq!(cfg.queue_endpoint.path(), "/000000000000/gdrive-files");
    }

    #[test]
    fn bad_timezone_is_rejected() {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Serialized::default("timezone", "Mars/Olympus_Mons"));
        let err = Config::from_figment(figment).unwrap_err();
        assert!(matches!(err, DispatchError::UnknownTimezone(_)));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Serialized::default("publish_concurrency", 0));
        assert!(matches!(
            Config::from_figment(figment),
            Err(DispatchError::Config(_))
        ));
    }
}
