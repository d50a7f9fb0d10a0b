use crate::error::ConfigError;
use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Config file looked up in the working directory when no path is given.
pub const CONFIG_FILE_NAME: &str = "mendforge.toml";

// ─── Sections ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub oracle: OracleConfig,
    pub engine: EngineConfig,
    pub healing: HealingConfig,
    pub project: ProjectConfig,
    pub handlers: HandlersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub model: String,
    pub temperature: f64,
    /// Name of the environment variable holding the API key. The key itself
    /// never lives in the config file.
    pub api_key_env: String,
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_iterations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealingConfig {
    pub enabled: bool,
    pub max_attempts: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project root; `~` expands to the home directory.
    pub root: String,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlersConfig {
    pub unit_tests: UnitTestsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitTestsConfig {
    /// Shell command run to validate a test artifact. `{target}` and
    /// `{source}` are substituted. Without one, a structural check is used.
    pub validate_command: Option<String>,
    pub timeout_secs: u64,
}

// ─── Defaults ───────────────────────────────────────────────────────────────

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    2
}

fn default_max_iterations() -> usize {
    crate::engine::DEFAULT_MAX_ITERATIONS
}

fn default_max_attempts() -> usize {
    crate::orchestrator::DEFAULT_MAX_HEAL_ATTEMPTS
}

fn default_include() -> Vec<String> {
    ["src/**/*.ts", "src/**/*.tsx", "src/**/*.js", "src/**/*.jsx"]
        .map(String::from)
        .to_vec()
}

fn default_exclude() -> Vec<String> {
    [
        "**/node_modules/**",
        "node_modules/**",
        "**/dist/**",
        "dist/**",
        "**/*.test.*",
        "**/*.spec.*",
    ]
    .map(String::from)
    .to_vec()
}

fn default_command_timeout_secs() -> u64 {
    120
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

impl Default for HealingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            include: default_include(),
            exclude: default_exclude(),
        }
    }
}

impl Default for UnitTestsConfig {
    fn default() -> Self {
        Self {
            validate_command: None,
            timeout_secs: default_command_timeout_secs(),
        }
    }
}

// ─── Loading and validation ─────────────────────────────────────────────────

impl Config {
    /// Load from an explicit path, or from `mendforge.toml` in the working
    /// directory, or fall back to defaults when neither exists. Environment
    /// overrides and validation always apply.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = match path {
            Some(p) => {
                let expanded = shellexpand::tilde(&p.to_string_lossy()).into_owned();
                Some(PathBuf::from(expanded))
            }
            None => {
                let default = PathBuf::from(CONFIG_FILE_NAME);
                default.exists().then_some(default)
            }
        };

        let mut config = match resolved {
            Some(p) => {
                let contents = std::fs::read_to_string(&p)
                    .map_err(|err| ConfigError::Load(format!("{}: {err}", p.display())))?;
                toml::from_str(&contents)
                    .map_err(|err| ConfigError::Load(format!("{}: {err}", p.display())))?
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        config
            .validate()
            .map_err(|err| ConfigError::Validation(format!("{err:#}")))?;
        Ok(config)
    }

    /// Environment variable overrides, applied after file parsing.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var("MENDFORGE_MODEL") {
            if !model.is_empty() {
                self.oracle.model = model;
            }
        }
        if let Ok(base_url) = std::env::var("MENDFORGE_BASE_URL") {
            if !base_url.is_empty() {
                self.oracle.base_url = base_url;
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.oracle.model.trim().is_empty() {
            bail!("oracle.model must not be empty");
        }
        if !(0.0..=2.0).contains(&self.oracle.temperature) {
            bail!("oracle.temperature must be in [0.0, 2.0]");
        }
        Url::parse(&self.oracle.base_url).with_context(|| {
            format!(
                "oracle.base_url is not a valid URL: {}",
                self.oracle.base_url
            )
        })?;
        if self.oracle.request_timeout_secs == 0 {
            bail!("oracle.request_timeout_secs must be >= 1");
        }
        if self.engine.max_iterations == 0 {
            bail!("engine.max_iterations must be >= 1");
        }
        if self.healing.max_attempts == 0 {
            bail!("healing.max_attempts must be >= 1");
        }
        if self.handlers.unit_tests.timeout_secs == 0 {
            bail!("handlers.unit_tests.timeout_secs must be >= 1");
        }
        for pattern in self.project.include.iter().chain(&self.project.exclude) {
            glob::Pattern::new(pattern)
                .with_context(|| format!("bad glob pattern in project config: {pattern:?}"))?;
        }
        Ok(())
    }

    /// Project root with `~` expanded.
    pub fn project_root(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.project.root).into_owned())
    }

    /// API key from the configured environment variable.
    pub fn api_key(&self) -> anyhow::Result<String> {
        let key = std::env::var(&self.oracle.api_key_env).with_context(|| {
            format!(
                "environment variable {} is not set (configure oracle.api_key_env)",
                self.oracle.api_key_env
            )
        })?;
        if key.trim().is_empty() {
            bail!("environment variable {} is empty", self.oracle.api_key_env);
        }
        Ok(key)
    }
}
