use crate::config::GatewayConfig;
use crate::utils::validation::{ValidationError, validate_filename};
use serde::Serialize;
use std::path::{Path, PathBuf};
use utoipa::ToSchema;
use uuid::Uuid;

/// Where one logical file lives: its object keys and its local staging path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocation {
    pub name: String,
    pub document_key: String,
    pub audio_key: String,
    pub staging_path: PathBuf,
}

/// Maps file names to object keys and staging paths.
///
/// Upload and download both resolve names through [`FileLayout::locate`],
/// so the key an external generator writes and the path this service serves
/// from cannot drift apart.
#[derive(Debug, Clone)]
pub struct FileLayout {
    audio_key_prefix: String,
    staging_dir: PathBuf,
}

impl FileLayout {
    pub fn new(audio_key_prefix: impl Into<String>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            audio_key_prefix: audio_key_prefix.into(),
            staging_dir: staging_dir.into(),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.audio_key_prefix.clone(), config.staging_dir.clone())
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn locate(&self, filename: &str) -> Result<FileLocation, ValidationError> {
        let name = validate_filename(filename)?;
        Ok(FileLocation {
            name: name.to_string(),
            document_key: name.to_string(),
            audio_key: format!("{}{}", self.audio_key_prefix, name),
            staging_path: self.staging_dir.join(name),
        })
    }

    /// A fresh sibling path in the staging directory for an in-progress write.
    pub fn temp_path(&self) -> PathBuf {
        self.staging_dir.join(format!(".{}.part", Uuid::new_v4()))
    }
}

/// Languages the audio generator renders every document into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AudioLanguage {
    English,
    Hindi,
    Chinese,
}

impl AudioLanguage {
    pub const ALL: [AudioLanguage; 3] = [Self::English, Self::Hindi, Self::Chinese];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "english",
            Self::Hindi => "hindi",
            Self::Chinese => "chinese",
        }
    }

    /// Audio file name produced for `document`: `<stem>_<language>.mp3`,
    /// where the stem ends at the first `.`.
    pub fn audio_name(&self, document: &str) -> String {
        let stem = document.split('.').next().unwrap_or_default();
        format!("{}_{}.mp3", stem, self.as_str())
    }
}
