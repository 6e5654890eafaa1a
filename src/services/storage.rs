use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;

/// The slice of the S3 API the gateway needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, bucket: &str, key: &str, body: ByteStream) -> Result<()>;

    /// Every key in `bucket` starting with `prefix`, across all result pages.
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    /// Object body, or `None` when the key does not exist.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<ByteStream>>;

    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    async fn create_bucket(&self, bucket: &str) -> Result<()>;
}

pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, body: ByteStream) -> Result<()> {
        let res = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await;

        if let Err(e) = res {
            tracing::error!(
                "S3 put_object failed: bucket={}, key={}, error={:?}",
                bucket,
                key,
                e
            );
            return Err(e.into());
        }
        Ok(())
    }

    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token = None;

        loop {
            let res = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token)
                .send()
                .await?;

            if let Some(contents) = res.contents {
                keys.extend(contents.into_iter().filter_map(|object| object.key));
            }

            if res.is_truncated.unwrap_or(false) {
                continuation_token = res.next_continuation_token;
            } else {
                break;
            }
        }

        Ok(keys)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<ByteStream>> {
        let res = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await;

        match res {
            Ok(output) => Ok(Some(output.body)),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    Ok(None)
                } else {
                    Err(anyhow::anyhow!(service_error))
                }
            }
        }
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        let res = self.client.head_bucket().bucket(bucket).send().await;

        match res {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(anyhow::anyhow!(service_error))
                }
            }
        }
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.client.create_bucket().bucket(bucket).send().await?;
        Ok(())
    }
}
