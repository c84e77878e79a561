//! S3 staging for templates too large to submit inline.
//!
//! CloudFormation accepts at most 51,200 bytes of inline template body.
//! Larger templates are uploaded to a bucket and referenced by URL.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use tracing::info;

use crate::error::{ApiError, Result};

use super::api::TemplateStager;

/// Largest template body the service accepts inline.
pub const MAX_INLINE_TEMPLATE_BYTES: usize = 51_200;

/// Uploads templates to an S3 bucket.
#[derive(Debug, Clone)]
pub struct S3TemplateStager {
    /// S3 client.
    client: Client,
    /// Bucket name.
    bucket: String,
    /// Key prefix, empty or ending in `/`.
    prefix: String,
    /// Bucket region, used to build the object URL.
    region: Option<String>,
}

impl S3TemplateStager {
    /// Creates a stager for the given bucket.
    #[must_use]
    pub fn new(config: &aws_config::SdkConfig, bucket: &str, prefix: Option<&str>) -> Self {
        Self {
            client: Client::new(config),
            bucket: bucket.to_string(),
            prefix: normalize_prefix(prefix),
            region: config.region().map(ToString::to_string),
        }
    }

    /// Returns the object key for a template.
    #[must_use]
    pub fn key(&self, stack_name: &str, digest: &str) -> String {
        format!("{}{stack_name}/{digest}.template", self.prefix)
    }

    /// Returns the HTTPS URL of an object in the bucket.
    #[must_use]
    pub fn url(&self, key: &str) -> String {
        object_url(&self.bucket, self.region.as_deref(), key)
    }
}

#[async_trait]
impl TemplateStager for S3TemplateStager {
    async fn stage(&self, stack_name: &str, digest: &str, body: &str) -> Result<String> {
        let key = self.key(stack_name, digest);
        info!("Staging template in s3://{}/{key}", self.bucket);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(body.as_bytes().to_vec().into())
            .content_type("text/plain")
            .send()
            .await
            .map_err(|e| ApiError::Staging {
                message: format!("S3 put error: {}", e.into_service_error()),
            })?;

        Ok(self.url(&key))
    }
}

/// Trims slashes and guarantees a trailing `/` on non-empty prefixes.
fn normalize_prefix(prefix: Option<&str>) -> String {
    prefix
        .map(|p| {
            let p = p.trim_matches('/');
            if p.is_empty() {
                String::new()
            } else {
                format!("{p}/")
            }
        })
        .unwrap_or_default()
}

fn object_url(bucket: &str, region: Option<&str>, key: &str) -> String {
    match region {
        Some(region) => format!("https://{bucket}.s3.{region}.amazonaws.com/{key}"),
        None => format!("https://{bucket}.s3.amazonaws.com/{key}"),
    }
}
