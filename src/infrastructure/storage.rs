use crate::config::GatewayConfig;
use crate::services::storage::{ObjectStore, S3ObjectStore};
use aws_sdk_s3::config::{Credentials, Region};
use std::sync::Arc;
use tracing::{error, info};

pub async fn setup_storage(config: &GatewayConfig) -> Arc<dyn ObjectStore> {
    info!(
        "☁️  S3 Storage: {} (Buckets: {}, {})",
        config.s3_endpoint.as_deref().unwrap_or("aws"),
        config.document_bucket,
        config.audio_bucket
    );

    let mut loader = aws_config::from_env().region(Region::new(config.s3_region.clone()));

    if let Some(endpoint) = &config.s3_endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    if let (Some(access_key), Some(secret_key)) = (&config.s3_access_key, &config.s3_secret_key) {
        loader = loader.credentials_provider(Credentials::new(
            access_key.clone(),
            secret_key.clone(),
            None,
            None,
            "static",
        ));
    }

    let aws_config = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(config.s3_force_path_style)
        .build();

    let store: Arc<dyn ObjectStore> =
        Arc::new(S3ObjectStore::new(aws_sdk_s3::Client::from_conf(s3_config)));

    if config.ensure_buckets {
        for bucket in [&config.document_bucket, &config.audio_bucket] {
            ensure_bucket(store.as_ref(), bucket).await;
        }
    }

    store
}

/// Creates `bucket` when it is missing. Failures are logged only.
pub async fn ensure_bucket(store: &dyn ObjectStore, bucket: &str) {
    match store.bucket_exists(bucket).await {
        Ok(true) => info!("✅ Bucket '{}' is ready", bucket),
        Ok(false) => {
            info!("🪣 Bucket '{}' not found, creating...", bucket);
            if let Err(e) = store.create_bucket(bucket).await {
                error!("❌ Failed to create bucket '{}': {}", bucket, e);
            } else {
                info!("✅ Bucket '{}' created successfully", bucket);
            }
        }
        Err(e) => error!("❌ Could not check bucket '{}': {}", bucket, e),
    }
}
