use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";
pub const DEFAULT_STATSD_PORT: u16 = 8125;
pub const DEFAULT_METRICS_PREFIX: &str = "csye6225";

/// Object storage settings. `endpoint` is only set for S3-compatible stores (MinIO).
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

/// StatsD agent address and metric name prefix.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub host: String,
    pub port: u16,
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub s3: S3Config,
    pub sns_topic_arn: String,
    pub region: String,
    pub metrics: MetricsConfig,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let s3 = S3Config {
            bucket: std::env::var("S3_BUCKET_NAME").context("S3_BUCKET_NAME is not set")?,
            region: region_from_env(),
            endpoint: optional_var("S3_ENDPOINT"),
            access_key: optional_var("S3_ACCESS_KEY"),
            secret_key: optional_var("S3_SECRET_KEY"),
        };
        let sns_topic_arn = std::env::var("SNS_TOPIC_ARN").context("SNS_TOPIC_ARN is not set")?;
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = std::env::var("APP_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(8080);
        let metrics = MetricsConfig {
            host: std::env::var("STATSD_HOST").unwrap_or_else(|_| "localhost".into()),
            port: std::env::var("STATSD_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(DEFAULT_STATSD_PORT),
            prefix: std::env::var("STATSD_PREFIX").unwrap_or_else(|_| DEFAULT_METRICS_PREFIX.into()),
        };
        Ok(Self {
            database_url,
            s3,
            sns_topic_arn,
            region: region_from_env(),
            metrics,
            host,
            port,
        })
    }
}

/// Settings for the verification mail dispatcher.
#[derive(Debug, Clone, Deserialize)]
pub struct MailerConfig {
    pub secret_name: String,
    pub verify_endpoint: String,
    pub region: String,
    pub sendgrid_api_url: String,
}

impl MailerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            secret_name: std::env::var("SECRETS_MANAGER_NAME")
                .context("SECRETS_MANAGER_NAME is not set")?,
            verify_endpoint: std::env::var("VERIFY_ENDPOINT")
                .context("VERIFY_ENDPOINT is not set")?,
            region: region_from_env(),
            sendgrid_api_url: std::env::var("SENDGRID_API_URL")
                .unwrap_or_else(|_| DEFAULT_SENDGRID_API_URL.into()),
        })
    }
}

fn region_from_env() -> String {
    std::env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_REGION.into())
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
