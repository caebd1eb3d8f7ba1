use std::time::Duration;

use aws_config::{AppName, BehaviorVersion, Region, timeout::TimeoutConfig};
use aws_sdk_s3::Client;

use crate::api::S3Store;

/// Builds the S3 client the upload runs against. Credentials come from the
/// default provider chain (environment, shared profile, instance role).
pub struct S3ClientBuilder {
    region: String,
    endpoint_url: Option<String>,
    force_path_style: bool,
    connect_timeout: Duration,
}

impl S3ClientBuilder {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            endpoint_url: None,
            force_path_style: false,
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Talk to an S3 compatible endpoint instead of AWS.
    pub fn with_endpoint_url(mut self, endpoint_url: Option<String>) -> Self {
        self.endpoint_url = endpoint_url;
        self
    }

    pub fn with_path_style(mut self, force_path_style: bool) -> Self {
        self.force_path_style = force_path_style;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub async fn build(self) -> Client {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region))
            .timeout_config(
                TimeoutConfig::builder()
                    .connect_timeout(self.connect_timeout)
                    .build(),
            );
        if let Some(endpoint_url) = self.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        match AppName::new(format!("folder-to-s3-{}", crate::VERSION)) {
            Ok(app_name) => loader = loader.app_name(app_name),
            Err(e) => tracing::debug!("app name rejected: {}", e),
        }
        let shared = loader.load().await;
        let config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(self.force_path_style)
            .build();
        Client::from_conf(config)
    }

    pub async fn build_store(self) -> S3Store {
        S3Store::new(self.build().await)
    }
}
