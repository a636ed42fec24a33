use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use super::moderation_file::ModerationFile;
use crate::core::moderation::{ConfigError, ModerationConfigSource, ModerationSnapshot};
use crate::infra::ai::{
    ChatCompletionClassifier, ClassifierOptions, DEFAULT_ENDPOINT, DEFAULT_MAX_TOKENS,
    DEFAULT_MODEL,
};

pub const DEFAULT_CONFIG_PATH: &str = "data/moderation.json";

/// Loads moderation snapshots from the JSON config file, with the
/// credential and classifier endpoint taken from the environment.
pub struct FileConfigSource {
    path: PathBuf,
    env_api_key: Option<String>,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env_api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Read settings from `AIMODERATOR_*` variables. Call after `dotenv`.
    pub fn from_env() -> Self {
        let path = std::env::var("AIMODERATOR_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let max_tokens = std::env::var("AIMODERATOR_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        Self {
            path: PathBuf::from(path),
            env_api_key: std::env::var("AIMODERATOR_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            endpoint: std::env::var("AIMODERATOR_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string()),
            model: std::env::var("AIMODERATOR_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            max_tokens,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the example config if no file exists yet. Returns whether one
    /// was written.
    pub async fn ensure_default_file(&self) -> Result<bool, ConfigError> {
        if self.path.exists() {
            return Ok(false);
        }

        ModerationFile::example().write(&self.path).await?;
        tracing::info!(path = %self.path.display(), "Wrote default moderation config");
        Ok(true)
    }
}

#[async_trait]
impl ModerationConfigSource for FileConfigSource {
    async fn load(&self) -> Result<ModerationSnapshot, ConfigError> {
        let file = ModerationFile::read(&self.path).await?;

        // Environment first, then the file
        let api_key = self
            .env_api_key
            .clone()
            .or_else(|| file.api_key().map(str::to_string))
            .ok_or(ConfigError::MissingCredential)?;

        let rules = file.rule_set()?;
        let settings = file.gate_settings()?;

        let classifier = ChatCompletionClassifier::new(ClassifierOptions {
            endpoint: self.endpoint.clone(),
            api_key,
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: 0.0,
        })?;

        Ok(ModerationSnapshot::new(rules, Arc::new(classifier), settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{FailPolicy, ModerationService};
    use tempfile::TempDir;

    async fn write(dir: &TempDir, json: &str) -> PathBuf {
        let path = dir.path().join("moderation.json");
        tokio::fs::write(&path, json).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_ensure_default_file_only_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileConfigSource::new(dir.path().join("data").join("moderation.json"));

        assert!(source.ensure_default_file().await.unwrap());
        assert!(source.path().exists());
        assert!(!source.ensure_default_file().await.unwrap());
    }

    #[tokio::test]
    async fn test_load_uses_file_credential() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"{
                "api_key": "file-key",
                "fail_policy": "closed",
                "rules": [ { "name": "Toxicity", "threshold": 0.8, "action": "warn" } ]
            }"#,
        )
        .await;

        let snapshot = FileConfigSource::new(path).load().await.unwrap();
        assert_eq!(snapshot.rules.len(), 1);
        assert_eq!(snapshot.settings.fail_policy, FailPolicy::Closed);
    }

    #[tokio::test]
    async fn test_load_without_credential_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, r#"{ "rules": [] }"#).await;

        let result = FileConfigSource::new(path).load().await;
        assert!(matches!(result, Err(ConfigError::MissingCredential)));
    }

    #[tokio::test]
    async fn test_explicit_key_covers_missing_file_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, r#"{ "rules": [] }"#).await;

        let mut source = FileConfigSource::new(path);
        source.env_api_key = Some("env-key".to_string());

        let snapshot = source.load().await.unwrap();
        assert!(snapshot.rules.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_file_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "{ \"rules\": [ { \"name\": ").await;

        let result = FileConfigSource::new(path).load().await;
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[tokio::test]
    async fn test_bad_edit_keeps_previous_rules_live() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"{
                "api_key": "k",
                "rules": [
                    { "name": "A", "threshold": 0.5 },
                    { "name": "B", "threshold": 0.5 }
                ]
            }"#,
        )
        .await;
        let source = FileConfigSource::new(path.clone());
        let service = ModerationService::new(ModerationSnapshot::unconfigured());
        assert_eq!(service.reload(&source).await.unwrap(), 2);

        // An out-of-range threshold makes the whole reload fail
        tokio::fs::write(
            &path,
            r#"{ "api_key": "k", "rules": [ { "name": "A", "threshold": 2.0 } ] }"#,
        )
        .await
        .unwrap();

        assert!(service.reload(&source).await.is_err());
        assert_eq!(service.snapshot().await.rules.len(), 2);
    }
}
