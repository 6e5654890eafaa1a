use crate::config::GatewayConfig;
use crate::services::layout::{AudioLanguage, FileLayout, FileLocation};
use crate::services::storage::ObjectStore;
use crate::utils::keyed_mutex::KeyedMutex;
use crate::utils::validation::ValidationError;
use aws_sdk_s3::primitives::ByteStream;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufWriter};
use utoipa::ToSchema;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid filename: {0}")]
    InvalidFilename(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    Remote(anyhow::Error),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("File exceeds the {limit} byte upload limit")]
    TooLarge { limit: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AudioStatus {
    pub language: AudioLanguage,
    pub filename: String,
    pub present: bool,
}

/// Moves files between the staging directory and the two buckets.
pub struct StorageGateway {
    store: Arc<dyn ObjectStore>,
    layout: FileLayout,
    document_bucket: String,
    audio_bucket: String,
    max_file_size: u64,
    staging_locks: KeyedMutex,
}

impl StorageGateway {
    pub fn new(store: Arc<dyn ObjectStore>, config: &GatewayConfig) -> Self {
        Self {
            store,
            layout: FileLayout::from_config(config),
            document_bucket: config.document_bucket.clone(),
            audio_bucket: config.audio_bucket.clone(),
            max_file_size: config.max_file_size as u64,
            staging_locks: KeyedMutex::new(),
        }
    }

    pub fn locate(&self, filename: &str) -> Result<FileLocation, GatewayError> {
        Ok(self.layout.locate(filename)?)
    }

    /// Writes `reader` to the staging path of `filename`, capped at the
    /// upload size limit.
    pub async fn stage<R>(&self, filename: &str, reader: R) -> Result<PathBuf, GatewayError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let loc = self.locate(filename)?;
        let guard = self.staging_locks.lock(&loc.name).await;
        self.write_staged(&loc.staging_path, reader, Some(self.max_file_size))
            .await?;
        drop(guard);
        self.staging_locks.prune();
        Ok(loc.staging_path)
    }

    /// Stages `reader` under `filename` and puts it into the document bucket.
    ///
    /// Returns the object key. The staged copy is left on disk.
    pub async fn upload_file<R>(&self, filename: &str, reader: R) -> Result<String, GatewayError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let loc = self.locate(filename)?;
        let guard = self.staging_locks.lock(&loc.name).await;

        let size = self
            .write_staged(&loc.staging_path, reader, Some(self.max_file_size))
            .await?;
        let body = ByteStream::from_path(&loc.staging_path)
            .await
            .map_err(std::io::Error::other)?;

        self.store
            .put_object(&self.document_bucket, &loc.document_key, body)
            .await
            .map_err(GatewayError::Remote)?;

        drop(guard);
        self.staging_locks.prune();

        tracing::info!(
            "Uploaded {} ({} bytes) to bucket {}",
            loc.document_key,
            size,
            self.document_bucket
        );
        Ok(loc.document_key)
    }

    /// True iff an audio object with exactly this key exists.
    pub async fn search(&self, key: &str) -> Result<bool, GatewayError> {
        let keys = self
            .store
            .list_keys(&self.audio_bucket, key)
            .await
            .map_err(GatewayError::Remote)?;

        Ok(keys.iter().any(|k| k == key))
    }

    /// Looks up the audio object belonging to `filename`.
    pub async fn find_audio(&self, filename: &str) -> Result<bool, GatewayError> {
        let loc = self.locate(filename)?;
        self.search(&loc.audio_key).await
    }

    /// Fetches the audio object for `filename` into its staging path.
    pub async fn download_file(&self, filename: &str) -> Result<PathBuf, GatewayError> {
        let loc = self.locate(filename)?;

        let body = self
            .store
            .get_object(&self.audio_bucket, &loc.audio_key)
            .await
            .map_err(GatewayError::Remote)?
            .ok_or_else(|| GatewayError::NotFound(loc.audio_key.clone()))?;

        let guard = self.staging_locks.lock(&loc.name).await;
        let size = self
            .write_staged(&loc.staging_path, Box::pin(body.into_async_read()), None)
            .await?;
        drop(guard);
        self.staging_locks.prune();

        tracing::info!(
            "Downloaded {} ({} bytes) from bucket {}",
            loc.audio_key,
            size,
            self.audio_bucket
        );
        Ok(loc.staging_path)
    }

    /// Presence of every language variant generated for `document`.
    pub async fn audio_status(&self, document: &str) -> Result<Vec<AudioStatus>, GatewayError> {
        self.locate(document)?;

        let checks = AudioLanguage::ALL.iter().map(|language| async move {
            let filename = language.audio_name(document);
            let present = self.find_audio(&filename).await?;
            Ok::<_, GatewayError>(AudioStatus {
                language: *language,
                filename,
                present,
            })
        });

        futures::future::try_join_all(checks).await
    }

    pub async fn is_reachable(&self) -> bool {
        match self.store.bucket_exists(&self.audio_bucket).await {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!("Audio bucket {} does not exist", self.audio_bucket);
                false
            }
            Err(e) => {
                tracing::warn!("Object store unreachable: {}", e);
                false
            }
        }
    }

    /// Streams `reader` into a temporary sibling of `dest`, then renames it
    /// over `dest`. Readers of `dest` see either the old or the new file.
    /// With a `limit`, more than `limit` bytes fail with `TooLarge` and
    /// `dest` is left untouched.
    async fn write_staged<R>(
        &self,
        dest: &Path,
        mut reader: R,
        limit: Option<u64>,
    ) -> Result<u64, GatewayError>
    where
        R: AsyncRead + Unpin,
    {
        tokio::fs::create_dir_all(self.layout.staging_dir()).await?;
        let tmp = self.layout.temp_path();

        let result: Result<u64, GatewayError> = async {
            let file = tokio::fs::File::create(&tmp).await?;
            let mut writer = BufWriter::new(file);
            let size = match limit {
                Some(limit) => {
                    let mut capped = (&mut reader).take(limit + 1);
                    let size = tokio::io::copy(&mut capped, &mut writer).await?;
                    if size > limit {
                        return Err(GatewayError::TooLarge { limit });
                    }
                    size
                }
                None => tokio::io::copy(&mut reader, &mut writer).await?,
            };
            writer.flush().await?;
            tokio::fs::rename(&tmp, dest).await?;
            Ok(size)
        }
        .await;

        if let Err(e) = &result {
            tracing::error!("Staging write to {} failed: {}", dest.display(), e);
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        result
    }
}
