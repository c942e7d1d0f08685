//! S3-compatible receipt blob store
//!
//! The core owns the `receipt_ref` column; this adapter owns the bytes.
//! Handles are object keys, opaque to everything above this module.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use shared_error::AppError;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use uuid::Uuid;
use worklog_service_core::domains::expense::domain::receipt::ReceiptStore;

const MAX_RETRIES: usize = 3;
const RETRY_BASE_DELAY_MS: u64 = 100;

/// Receipt store configuration
#[derive(Clone, Debug)]
pub struct ReceiptStoreConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
}

impl ReceiptStoreConfig {
    pub fn from_config(config: &shared_config::Config) -> Self {
        Self {
            endpoint: config.s3_endpoint.clone(),
            access_key: config.s3_access_key.clone(),
            secret_key: config.s3_secret_key.clone(),
            bucket: config.s3_bucket.clone(),
            region: config.s3_region.clone(),
        }
    }
}

/// S3 receipt store client
pub struct S3ReceiptStore {
    client: Client,
    bucket: String,
}

impl S3ReceiptStore {
    pub fn new(config: ReceiptStoreConfig) -> Self {
        let credentials = aws_sdk_s3::config::Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "worklog",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version_latest()
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .region(aws_sdk_s3::config::Region::new(config.region.clone()))
            // Required for S3-compatible storage (MinIO and friends)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket,
        }
    }

    fn retry_strategy() -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(RETRY_BASE_DELAY_MS)
            .factor(2)
            .max_delay(Duration::from_secs(5))
            .map(jitter)
            .take(MAX_RETRIES)
    }
}

#[async_trait]
impl ReceiptStore for S3ReceiptStore {
    async fn put(
        &self,
        owner_username: &str,
        expense_id: i64,
        bytes: Vec<u8>,
        mime: &str,
    ) -> Result<String, AppError> {
        let key = format!("receipts/{}/{}/{}", owner_username, expense_id, Uuid::new_v4());

        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let upload_key = key.clone();
        let mime = mime.to_string();

        let result = Retry::spawn(Self::retry_strategy(), || {
            let client = client.clone();
            let bucket = bucket.clone();
            let key = upload_key.clone();
            let mime = mime.clone();
            let bytes = bytes.clone();

            async move {
                client
                    .put_object()
                    .bucket(&bucket)
                    .key(&key)
                    .body(ByteStream::from(bytes))
                    .content_type(&mime)
                    .send()
                    .await
                    .map_err(|e| {
                        tracing::warn!("Receipt upload attempt failed, may retry: {:?}", e);
                        e
                    })
            }
        })
        .await;

        match result {
            Ok(_) => {
                tracing::info!(key = %key, "Receipt stored");
                Ok(key)
            },
            Err(e) => Err(AppError::Internal(format!(
                "Failed to store receipt after {} retries: {}",
                MAX_RETRIES, e
            ))),
        }
    }

    async fn get(&self, handle: &str) -> Result<Vec<u8>, AppError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(handle)
            .send()
            .await
            .map_err(|e| AppError::NotFound(format!("Receipt not found: {}", e)))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read receipt body: {}", e)))?;

        Ok(bytes.into_bytes().to_vec())
    }

    async fn delete(&self, handle: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(handle)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to delete receipt: {}", e)))?;

        tracing::info!(key = %handle, "Receipt deleted");
        Ok(())
    }
}
