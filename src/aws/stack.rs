use crate::error::{CanaryError, Result};
use crate::harness::StackOutputs;
use aws_config::SdkConfig;
use aws_sdk_cloudformation::error::DisplayErrorContext;
use aws_sdk_cloudformation::Client;

/// Reads stack outputs through CloudFormation DescribeStacks
#[derive(Clone)]
pub struct CloudFormationOutputs {
    client: Client,
}

impl CloudFormationOutputs {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

#[async_trait::async_trait]
impl StackOutputs for CloudFormationOutputs {
    async fn output_value(&self, stack_name: &str, output_key: &str) -> Result<Option<String>> {
        let output = self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| {
                CanaryError::service(
                    "DescribeStacks".to_string(),
                    DisplayErrorContext(&e).to_string(),
                )
            })?;

        Ok(output
            .stacks()
            .first()
            .and_then(|stack| {
                stack
                    .outputs()
                    .iter()
                    .find(|output| output.output_key() == Some(output_key))
            })
            .and_then(|output| output.output_value())
            .map(str::to_string))
    }
}
