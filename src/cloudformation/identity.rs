//! STS caller identity lookup.

use async_trait::async_trait;
use aws_sdk_sts::Client;
use aws_sdk_sts::error::DisplayErrorContext;

use crate::error::{ApiError, Result};

use super::api::IdentityApi;
use super::types::CallerIdentity;

/// AWS SDK backed identity client.
#[derive(Debug, Clone)]
pub struct StsIdentityClient {
    /// SDK client.
    client: Client,
}

impl StsIdentityClient {
    /// Creates a client from a loaded AWS configuration.
    #[must_use]
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl IdentityApi for StsIdentityClient {
    async fn get_caller_identity(&self) -> Result<CallerIdentity> {
        let output = self
            .client
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| {
                ApiError::service(
                    "GetCallerIdentity",
                    "Unknown",
                    DisplayErrorContext(&e).to_string(),
                )
            })?;

        Ok(CallerIdentity {
            account: output.account().unwrap_or_default().to_string(),
            arn: output.arn().unwrap_or_default().to_string(),
            user_id: output.user_id().unwrap_or_default().to_string(),
        })
    }
}
