use std::env;
use std::path::PathBuf;

/// Bucket that receives uploaded documents.
pub const DOCUMENT_BUCKET: &str = "cc-documents-bucket";

/// Bucket the audio generator writes its output to.
pub const AUDIO_BUCKET: &str = "cc-audio-bucket";

/// Key prefix the audio generator puts in front of every audio object.
pub const AUDIO_KEY_PREFIX: &str = "/tmp/";

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Document bucket name (default: "cc-documents-bucket")
    pub document_bucket: String,

    /// Audio bucket name (default: "cc-audio-bucket")
    pub audio_bucket: String,

    /// Prefix of audio object keys (default: "/tmp/")
    pub audio_key_prefix: String,

    /// Local directory used to stage uploads and downloads (default: ".")
    pub staging_dir: PathBuf,

    /// Maximum upload size in bytes (default: 50 MB)
    pub max_file_size: usize,

    /// Allowed CORS origins, "*" means any (default: "*")
    pub allowed_origins: Vec<String>,

    /// Custom S3 endpoint, e.g. a MinIO instance
    pub s3_endpoint: Option<String>,

    /// Static S3 access key; the default credential chain is used when unset
    pub s3_access_key: Option<String>,

    /// Static S3 secret key
    pub s3_secret_key: Option<String>,

    /// S3 region (default: "us-east-1")
    pub s3_region: String,

    /// Use path-style bucket addressing (default: true when an endpoint is set)
    pub s3_force_path_style: bool,

    /// Create missing buckets on startup (default: false)
    pub ensure_buckets: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            document_bucket: DOCUMENT_BUCKET.to_string(),
            audio_bucket: AUDIO_BUCKET.to_string(),
            audio_key_prefix: AUDIO_KEY_PREFIX.to_string(),
            staging_dir: PathBuf::from("."),
            max_file_size: 50 * 1024 * 1024, // 50 MB
            allowed_origins: vec!["*".to_string()],
            s3_endpoint: None,
            s3_access_key: None,
            s3_secret_key: None,
            s3_region: "us-east-1".to_string(),
            s3_force_path_style: false,
            ensure_buckets: false,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();
        let s3_endpoint = env::var("S3_ENDPOINT").ok().filter(|v| !v.is_empty());

        Self {
            document_bucket: env::var("DOCUMENT_BUCKET").unwrap_or(default.document_bucket),

            audio_bucket: env::var("AUDIO_BUCKET").unwrap_or(default.audio_bucket),

            audio_key_prefix: env::var("AUDIO_KEY_PREFIX").unwrap_or(default.audio_key_prefix),

            staging_dir: env::var("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.staging_dir),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| parse_origins(&v))
                .unwrap_or(default.allowed_origins),

            s3_force_path_style: env::var("S3_FORCE_PATH_STYLE")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(s3_endpoint.is_some()),

            s3_endpoint,

            s3_access_key: env::var("S3_ACCESS_KEY").ok(),
            s3_secret_key: env::var("S3_SECRET_KEY").ok(),

            s3_region: env::var("S3_REGION").unwrap_or(default.s3_region),

            ensure_buckets: env::var("ENSURE_BUCKETS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(default.ensure_buckets),
        }
    }

    /// Local MinIO setup: path-style addressing, buckets created on startup
    pub fn development() -> Self {
        Self {
            s3_endpoint: Some("http://127.0.0.1:9000".to_string()),
            s3_access_key: Some("minioadmin".to_string()),
            s3_secret_key: Some("minioadmin".to_string()),
            s3_force_path_style: true,
            ensure_buckets: true,
            ..Self::default()
        }
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
