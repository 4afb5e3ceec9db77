use std::fs;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::domain::{Acceptance, Variant};
use crate::error::EnrichError;
use crate::providers::ProviderKind;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; Bot/0.1)";
pub const DEFAULT_DELAY_MS: u64 = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_OUTPUT: &str = "output.csv";
const LOCAL_CONFIG: &str = "doi-enrich.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub delay_ms: Option<u64>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub variant: Option<Variant>,
    #[serde(default)]
    pub acceptance: Option<Acceptance>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub providers: Option<Vec<String>>,
}

/// Values given on the command line; they win over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub variant: Option<Variant>,
    pub acceptance: Option<Acceptance>,
    pub output: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub user_agent: String,
    pub delay: Duration,
    pub timeout: Duration,
    pub variant: Variant,
    pub acceptance: Acceptance,
    pub placeholder: String,
    pub output: Utf8PathBuf,
    pub providers: Vec<ProviderKind>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            variant: Variant::Full,
            acceptance: Acceptance::Any,
            placeholder: String::new(),
            output: Utf8PathBuf::from(DEFAULT_OUTPUT),
            providers: ProviderKind::default_order().to_vec(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, EnrichError> {
        let config = Self::load(path)?;
        Self::resolve_config(config, overrides)
    }

    /// An explicit path must exist; otherwise the local file, then the
    /// per-user file, then built-in defaults.
    pub fn load(path: Option<&str>) -> Result<Config, EnrichError> {
        let config_path = match path {
            Some(path) => Some(Utf8PathBuf::from(path)),
            None => Self::discover(),
        };
        let Some(config_path) = config_path else {
            return Ok(Config::default());
        };

        tracing::debug!(path = %config_path, "loading config");
        let content = fs::read_to_string(&config_path)
            .map_err(|_| EnrichError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| EnrichError::ConfigParse(err.to_string()))
    }

    fn discover() -> Option<Utf8PathBuf> {
        let local = Utf8PathBuf::from(LOCAL_CONFIG);
        if local.as_std_path().exists() {
            return Some(local);
        }
        let dirs = ProjectDirs::from("", "", "doi-enrich")?;
        let global = Utf8PathBuf::from_path_buf(dirs.config_dir().join("config.json")).ok()?;
        global.as_std_path().exists().then_some(global)
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, EnrichError> {
        let defaults = ResolvedConfig::default();

        let providers = match config.providers {
            Some(names) if !names.is_empty() => {
                let mut kinds = Vec::new();
                for name in names {
                    let kind: ProviderKind = name.parse()?;
                    if !kinds.contains(&kind) {
                        kinds.push(kind);
                    }
                }
                kinds
            }
            _ => defaults.providers,
        };

        let user_agent = config
            .user_agent
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or(defaults.user_agent);

        Ok(ResolvedConfig {
            user_agent,
            delay: config
                .delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.delay),
            timeout: config
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            variant: overrides
                .variant
                .or(config.variant)
                .unwrap_or(defaults.variant),
            acceptance: overrides
                .acceptance
                .or(config.acceptance)
                .unwrap_or(defaults.acceptance),
            placeholder: config.placeholder.unwrap_or(defaults.placeholder),
            output: overrides
                .output
                .or(config.output.map(Utf8PathBuf::from))
                .unwrap_or(defaults.output),
            providers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let resolved =
            ConfigLoader::resolve_config(Config::default(), ConfigOverrides::default()).unwrap();
        assert_eq!(resolved.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(resolved.delay, Duration::from_secs(1));
        assert_eq!(resolved.variant, Variant::Full);
        assert_eq!(resolved.acceptance, Acceptance::Any);
        assert_eq!(resolved.output, Utf8PathBuf::from("output.csv"));
        assert_eq!(resolved.providers, ProviderKind::default_order());
    }
}
