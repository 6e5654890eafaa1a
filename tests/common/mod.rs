#![allow(dead_code)]

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use axum::{
    Router,
    body::Body,
    http::{Request, header},
};
use cc_file_gateway::config::GatewayConfig;
use cc_file_gateway::services::gateway::StorageGateway;
use cc_file_gateway::services::storage::ObjectStore;
use cc_file_gateway::{AppState, create_app};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

pub const BOUNDARY: &str = "X-CC-GATEWAY-TEST-BOUNDARY";

/// In-memory stand-in for S3, keyed by (bucket, key).
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    fail_puts: AtomicBool,
    fail_lists: AtomicBool,
    missing_buckets: AtomicBool,
}

impl MemoryObjectStore {
    pub fn insert(&self, bucket: &str, key: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data.to_vec());
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn fail_puts(&self) {
        self.fail_puts.store(true, Ordering::SeqCst);
    }

    pub fn fail_lists(&self) {
        self.fail_lists.store(true, Ordering::SeqCst);
    }

    /// Reports every bucket as missing.
    pub fn drop_buckets(&self) {
        self.missing_buckets.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, body: ByteStream) -> anyhow::Result<()> {
        let data = body.collect().await?.into_bytes().to_vec();
        if self.fail_puts.load(Ordering::SeqCst) {
            anyhow::bail!("simulated put_object failure");
        }
        self.insert(bucket, key, &data);
        Ok(())
    }

    async fn list_keys(&self, bucket: &str, prefix: &str) -> anyhow::Result<Vec<String>> {
        if self.fail_lists.load(Ordering::SeqCst) {
            anyhow::bail!("simulated list_objects failure");
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> anyhow::Result<Option<ByteStream>> {
        Ok(self.get(bucket, key).map(ByteStream::from))
    }

    async fn bucket_exists(&self, _bucket: &str) -> anyhow::Result<bool> {
        Ok(!self.missing_buckets.load(Ordering::SeqCst))
    }

    async fn create_bucket(&self, _bucket: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

pub struct TestContext {
    pub app: Router,
    pub gateway: Arc<StorageGateway>,
    pub store: Arc<MemoryObjectStore>,
    pub config: GatewayConfig,
    pub staging: TempDir,
}

pub fn setup() -> TestContext {
    setup_with(|_| {})
}

pub fn setup_with(customize: impl FnOnce(&mut GatewayConfig)) -> TestContext {
    let staging = tempfile::tempdir().unwrap();
    let mut config = GatewayConfig {
        staging_dir: staging.path().to_path_buf(),
        ..GatewayConfig::default()
    };
    customize(&mut config);

    let store = Arc::new(MemoryObjectStore::default());
    let gateway = Arc::new(StorageGateway::new(store.clone(), &config));

    let app = create_app(AppState {
        gateway: gateway.clone(),
        config: config.clone(),
    });

    TestContext {
        app,
        gateway,
        store,
        config,
        staging,
    }
}

/// POST /file/upload with the payload in `field`, preceded by the `fileName`
/// text field the web client sends.
pub fn upload_request(field: &str, filename: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"fileName\"\r\n\r\n{filename}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/file/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}
