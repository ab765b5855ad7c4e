mod stack;
mod synthetics;

pub use stack::CloudFormationOutputs;
pub use synthetics::SyntheticsService;

use crate::config::AwsConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::debug;

/// Resolve SDK configuration from the default provider chain plus overrides
pub async fn load_sdk_config(config: &AwsConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = &config.region {
        debug!(%region, "Using configured AWS region");
        loader = loader.region(Region::new(region.clone()));
    }

    if let Some(endpoint_url) = &config.endpoint_url {
        debug!(%endpoint_url, "Using configured AWS endpoint");
        loader = loader.endpoint_url(endpoint_url);
    }

    loader.load().await
}
