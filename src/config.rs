//! TOML configuration.
//!
//! Every section has defaults, so an empty file (or no file at all, see
//! [`load_or_minimal`]) yields a working setup that indexes into
//! `./data/docrag.sqlite` and answers through Groq's OpenAI-compatible API.
//!
//! ```toml
//! [store]
//! path = "./data/docrag.sqlite"
//!
//! [chunking]
//! chunk_size = 500
//!
//! [retrieval]
//! collection = "handbook"
//! k = 8
//!
//! [completion]
//! base_url = "https://api.groq.com/openai/v1"
//! model = "openai/gpt-oss-20b"
//! api_key_env = "GROQ_API_KEY"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./data/docrag.sqlite")
}
fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Characters per chunk used when indexing.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    500
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Collection used when a command does not name one.
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Number of chunks handed to the model as context.
    #[serde(default = "default_k")]
    pub k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            k: default_k(),
        }
    }
}

fn default_collection() -> String {
    "default".to_string()
}
fn default_k() -> usize {
    8
}

/// Which OpenAI-compatible endpoint shape to call.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompletionApi {
    /// `POST {base_url}/chat/completions`
    #[default]
    Chat,
    /// `POST {base_url}/responses`
    Responses,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api: CompletionApi,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the bearer token.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api: CompletionApi::default(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_completion_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}
fn default_model() -> String {
    "openai/gpt-oss-20b".to_string()
}
fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}
fn default_completion_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

/// Local MiniLM embeddings when compiled in, keyword ranking otherwise.
fn default_provider() -> String {
    if cfg!(feature = "local-embeddings-fastembed") {
        "local".to_string()
    } else {
        "disabled".to_string()
    }
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists; otherwise fall back to [`Config::minimal`] when
/// `allow_missing` is set (the CLI sets it for its default path only).
pub fn load_or_minimal(path: &Path, allow_missing: bool) -> Result<Config> {
    if allow_missing && !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::minimal());
    }
    load_config(path)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        bail!("chunking.chunk_size must be > 0");
    }

    if config.retrieval.k == 0 {
        bail!("retrieval.k must be >= 1");
    }
    if config.retrieval.collection.trim().is_empty() {
        bail!("retrieval.collection must not be empty");
    }

    if config.completion.model.trim().is_empty() {
        bail!("completion.model must not be empty");
    }
    if config.completion.timeout_secs == 0 {
        bail!("completion.timeout_secs must be > 0");
    }

    if config.store.max_connections == 0 {
        bail!("store.max_connections must be > 0");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "local" => {}
        "openai" | "ollama" => {
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    config.embedding.provider
                );
            }
            if config.embedding.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn empty_file_uses_defaults() {
        let f = write_config("");
        let cfg = load_config(f.path()).unwrap();
        assert_eq!(cfg.chunking.chunk_size, 500);
        assert_eq!(cfg.retrieval.k, 8);
        assert_eq!(cfg.completion.model, "openai/gpt-oss-20b");
        assert_eq!(cfg.completion.api, CompletionApi::Chat);
        assert_eq!(
            cfg.embedding.is_enabled(),
            cfg!(feature = "local-embeddings-fastembed")
        );
    }

    #[test]
    fn default_provider_follows_local_feature() {
        let expected = if cfg!(feature = "local-embeddings-fastembed") {
            "local"
        } else {
            "disabled"
        };
        assert_eq!(EmbeddingConfig::default().provider, expected);
        assert_eq!(Config::minimal().embedding.provider, expected);

        let f = write_config("[embedding]\nprovider = \"disabled\"\n");
        assert!(!load_config(f.path()).unwrap().embedding.is_enabled());
    }

    #[test]
    fn sections_override_defaults() {
        let f = write_config(
            r#"
[store]
path = "/tmp/x.sqlite"

[chunking]
chunk_size = 1200

[retrieval]
collection = "handbook"
k = 3

[completion]
api = "responses"
model = "llama-3.1-8b-instant"
"#,
        );
        let cfg = load_config(f.path()).unwrap();
        assert_eq!(cfg.store.path, PathBuf::from("/tmp/x.sqlite"));
        assert_eq!(cfg.chunking.chunk_size, 1200);
        assert_eq!(cfg.retrieval.collection, "handbook");
        assert_eq!(cfg.retrieval.k, 3);
        assert_eq!(cfg.completion.api, CompletionApi::Responses);
        assert_eq!(cfg.completion.model, "llama-3.1-8b-instant");
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let f = write_config("[chunking]\nchunk_size = 0\n");
        let err = load_config(f.path()).unwrap_err();
        assert!(err.to_string().contains("chunk_size"));
    }

    #[test]
    fn zero_k_rejected() {
        let f = write_config("[retrieval]\nk = 0\n");
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn openai_embedding_requires_dims() {
        let f = write_config("[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\n");
        let err = load_config(f.path()).unwrap_err();
        assert!(err.to_string().contains("dims"));
    }

    #[test]
    fn unknown_provider_rejected() {
        let f = write_config("[embedding]\nprovider = \"magic\"\n");
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn missing_file_falls_back_only_when_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(load_or_minimal(&path, true).is_ok());
        assert!(load_or_minimal(&path, false).is_err());
    }
}
