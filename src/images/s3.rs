use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CorsConfiguration, CorsRule, CreateBucketConfiguration,
    ObjectCannedAcl,
};
use bytes::Bytes;
use tracing::info;

use super::{image_key, ImageStore, ImageStoreError};
use crate::config::ImageConfig;

/// S3-backed image store. Works against AWS proper or any S3-compatible
/// endpoint (LocalStack etc.) via the endpoint override, which also switches
/// to path-style addressing.
pub struct S3ImageStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    region: String,
    endpoint: Option<String>,
}

impl S3ImageStore {
    pub async fn connect(config: &ImageConfig) -> Self {
        let base = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.s3_region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&base);
        if let Some(endpoint) = &config.s3_endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: config.s3_bucket.clone(),
            region: config.s3_region.clone(),
            endpoint: config.s3_endpoint.clone(),
        }
    }

    /// Create the bucket when absent and allow anonymous GETs on it.
    pub async fn ensure_bucket_and_cors(&self) -> Result<(), ImageStoreError> {
        let exists = self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok();

        if !exists {
            let mut create = self.client.create_bucket().bucket(&self.bucket);
            // A location constraint only applies on real AWS outside
            // us-east-1; custom endpoints reject it
            if self.endpoint.is_none() && self.region != "us-east-1" {
                create = create.create_bucket_configuration(
                    CreateBucketConfiguration::builder()
                        .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                        .build(),
                );
            }
            create
                .send()
                .await
                .map_err(|e| ImageStoreError::ObjectStorage(e.to_string()))?;
            info!("created image bucket {}", self.bucket);
        }

        let rule = CorsRule::builder()
            .allowed_headers("*")
            .allowed_methods("GET")
            .allowed_origins("*")
            .build()
            .map_err(|e| ImageStoreError::ObjectStorage(e.to_string()))?;
        let cors = CorsConfiguration::builder()
            .cors_rules(rule)
            .build()
            .map_err(|e| ImageStoreError::ObjectStorage(e.to_string()))?;

        self.client
            .put_bucket_cors()
            .bucket(&self.bucket)
            .cors_configuration(cors)
            .send()
            .await
            .map_err(|e| ImageStoreError::ObjectStorage(e.to_string()))?;

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => {
                // Containerized setups reach the store as "localstack" but
                // browsers need "localhost"
                let public_endpoint = if endpoint.contains("localstack") {
                    endpoint.replacen("localstack", "localhost", 1)
                } else {
                    endpoint.clone()
                };
                format!("{}/{}/{}", public_endpoint, self.bucket, key)
            }
            None => format!("https://{}.s3.{}.amazonaws.com/{}", self.bucket, self.region, key),
        }
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn save_image(
        &self,
        user_id: &str,
        filename: &str,
        data: Bytes,
    ) -> Result<String, ImageStoreError> {
        let key = image_key(user_id, filename);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data))
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| ImageStoreError::ObjectStorage(e.to_string()))?;

        Ok(self.public_url(&key))
    }
}
