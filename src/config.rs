use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";
/// Older deployments exported the key under the frontend's build prefix.
pub const LEGACY_API_KEY_ENV: &str = "REACT_APP_GEMINI_API_KEY";
pub const ENVIRONMENT_ENV: &str = "RELAY_ENV";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Environment::Development),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path the relay is mounted on.
    pub route: String,
    pub api_base: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Literal key; takes precedence over `api_key_env` when set.
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub environment: Environment,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            route: "/api/gemini-proxy".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
            timeout_secs: 30,
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            environment: Environment::Production,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Loads the YAML file when given, otherwise defaults, then applies `RELAY_ENV`.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Ok(value) = std::env::var(ENVIRONMENT_ENV) {
            match Environment::parse(&value) {
                Some(environment) => config.environment = environment,
                None => tracing::warn!("Ignoring unknown {} value: {}", ENVIRONMENT_ENV, value),
            }
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Resolves the provider credential. Called once per relay invocation so
    /// that a rotated environment is picked up without a restart.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Some(key.to_string());
        }
        let from_env = |name: &str| std::env::var(name).ok().filter(|k| !k.trim().is_empty());
        from_env(&self.api_key_env).or_else(|| {
            if self.api_key_env == DEFAULT_API_KEY_ENV {
                from_env(LEGACY_API_KEY_ENV)
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_public_gemini_endpoint() {
        let config = Config::default();
        assert_eq!(config.route, "/api/gemini-proxy");
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(!config.is_development());
    }

    #[test]
    fn test_from_file_fills_missing_fields_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "model: gemini-1.5-pro\ntimeout_secs: 5\nenvironment: development").unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.model, "gemini-1.5-pro");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.api_key_env, DEFAULT_API_KEY_ENV);
        assert_eq!(config.route, "/api/gemini-proxy");
    }

    #[test]
    fn test_from_file_rejects_malformed_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timeout_secs: [not, a, number]").unwrap();
        assert!(Config::from_file(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_literal_key_wins_over_environment() {
        let config = Config {
            api_key: Some("literal".to_string()),
            api_key_env: "CHAT_RELAY_TEST_NEVER_SET".to_string(),
            ..Config::default()
        };
        assert_eq!(config.resolve_api_key().as_deref(), Some("literal"));
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let config = Config {
            api_key: Some("   ".to_string()),
            api_key_env: "CHAT_RELAY_TEST_NEVER_SET".to_string(),
            ..Config::default()
        };
        assert_eq!(config.resolve_api_key(), None);
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("Development"), Some(Environment::Development));
        assert_eq!(Environment::parse("prod"), Some(Environment::Production));
        assert_eq!(Environment::parse("staging"), None);
    }
}
