use std::path::{Path, PathBuf};

use tracing::{debug, info};
use ytchat_common::{Error, Result};

use crate::model::{AppConfig, default_base_dir};

/// Environment variables that override `providers.<id>.api_key`.
pub const ENV_API_KEYS: [(&str, &str); 3] = [
    ("openai", "OPENAI_API_KEY"),
    ("claude", "ANTHROPIC_API_KEY"),
    ("gemini", "GEMINI_API_KEY"),
];

pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    /// Loader for `~/.ytchat/config.yml`.
    pub fn new() -> Result<Self> {
        let base = default_base_dir()
            .ok_or_else(|| Error::Config("could not determine home directory".into()))?;
        Ok(Self::with_path(base.join("config.yml")))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file, then apply `.env` and process environment overrides.
    pub fn load(&self) -> Result<AppConfig> {
        if let Ok(env_file) = dotenvy::dotenv() {
            debug!("loaded environment from {}", env_file.display());
        }

        let mut config = self.load_file()?;
        apply_env_overrides(&mut config, |name| std::env::var(name).ok());
        Ok(config)
    }

    /// Read the file only. A missing file yields defaults.
    pub fn load_file(&self) -> Result<AppConfig> {
        if !self.path.exists() {
            debug!("no config file at {}, using defaults", self.path.display());
            return Ok(AppConfig::default());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let config = parse_config(&contents)
            .map_err(|e| Error::Config(format!("{}: {}", self.path.display(), e)))?;
        validate(&config).map_err(|e| Error::Config(format!("{}: {}", self.path.display(), e)))?;

        info!("loaded config from {}", self.path.display());
        Ok(config)
    }
}

fn parse_config(contents: &str) -> std::result::Result<AppConfig, serde_yaml::Error> {
    // An empty file deserializes to unit, not a mapping.
    if contents.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(contents)
}

fn validate(config: &AppConfig) -> std::result::Result<(), String> {
    if config.max_conversations == 0 {
        return Err("max_conversations must be at least 1".into());
    }
    if config.max_context_messages == 0 {
        return Err("max_context_messages must be at least 1".into());
    }
    Ok(())
}

/// Overwrite provider API keys with non-empty values from `lookup`.
pub fn apply_env_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    for (provider, var) in ENV_API_KEYS {
        let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        debug!(provider, "api key taken from {}", var);
        config
            .providers
            .entry(provider.to_string())
            .or_default()
            .api_key = Some(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::with_path(dir.path().join("config.yml"));

        let config = loader.load_file().unwrap();
        assert_eq!(config.default_provider, "gemini");
        assert_eq!(config.max_context_messages, 10);
        assert_eq!(config.max_conversations, 50);
        assert_eq!(config.log_level, "info");
        assert!(config.providers.is_empty());
    }

    #[test]
    fn parses_providers_and_limits() {
        let file = write_config(
            r#"
default_provider: claude
max_context_messages: 6
data_dir: /tmp/ytchat-test
providers:
  claude:
    api_key: sk-ant-file
    model: claude-3-haiku-20240307
  openai:
    base_url: http://localhost:8080/v1
"#,
        );

        let config = ConfigLoader::with_path(file.path()).load_file().unwrap();
        assert_eq!(config.default_provider, "claude");
        assert_eq!(config.max_context_messages, 6);
        assert_eq!(config.max_conversations, 50);
        assert_eq!(
            config.database_path(),
            PathBuf::from("/tmp/ytchat-test/ytchat.db")
        );

        let claude = config.provider("claude").unwrap();
        assert_eq!(claude.api_key.as_deref(), Some("sk-ant-file"));
        assert_eq!(claude.model.as_deref(), Some("claude-3-haiku-20240307"));
        let openai = config.provider("openai").unwrap();
        assert!(openai.api_key.is_none());
        assert_eq!(openai.base_url.as_deref(), Some("http://localhost:8080/v1"));
    }

    #[test]
    fn empty_file_gives_defaults() {
        let file = write_config("   \n");
        let config = ConfigLoader::with_path(file.path()).load_file().unwrap();
        assert_eq!(config.default_provider, "gemini");
    }

    #[test]
    fn invalid_yaml_is_config_error() {
        let file = write_config("providers: [unclosed");
        let err = ConfigLoader::with_path(file.path()).load_file().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn zero_limits_are_rejected() {
        let file = write_config("max_conversations: 0\n");
        let err = ConfigLoader::with_path(file.path()).load_file().unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("max_conversations")));

        let file = write_config("max_context_messages: 0\n");
        let err = ConfigLoader::with_path(file.path()).load_file().unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("max_context_messages")));
    }

    #[test]
    fn env_overrides_file_keys() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "openai".into(),
            crate::ProviderSettings {
                api_key: Some("sk-from-file".into()),
                model: Some("gpt-4".into()),
                base_url: None,
            },
        );

        let env: HashMap<&str, &str> =
            HashMap::from([("OPENAI_API_KEY", "sk-from-env"), ("GEMINI_API_KEY", "  ")]);
        apply_env_overrides(&mut config, |name| env.get(name).map(|v| v.to_string()));

        let openai = config.provider("openai").unwrap();
        assert_eq!(openai.api_key.as_deref(), Some("sk-from-env"));
        assert_eq!(openai.model.as_deref(), Some("gpt-4"));
        assert!(config.provider("gemini").is_none());
    }

    #[test]
    fn debug_hides_api_key() {
        let settings = crate::ProviderSettings {
            api_key: Some("sk-secret".into()),
            ..Default::default()
        };
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
