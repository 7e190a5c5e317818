use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use anyhow::{Result, anyhow};

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_FILES_URL: &str = "http://localhost:3000/files";
pub const DEFAULT_REPOSITORY_URL: &str = "https://github.com/moha-tah/bert-llm-chat-app";

/// Environment variable that overrides the configured API base URL
pub const API_URL_ENV: &str = "ASKDOCS_API_URL";

/// Which answer route of the API to post questions to
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Endpoint {
    #[default]
    Ask,
    AskStream,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Ask => "ask",
            Endpoint::AskStream => "ask-stream",
        }
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().trim_start_matches('/').to_lowercase().as_str() {
            "ask" => Ok(Endpoint::Ask),
            "ask-stream" | "ask_stream" => Ok(Endpoint::AskStream),
            other => Err(format!("unknown endpoint '{}', expected 'ask' or 'ask-stream'", other)),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub endpoint: Endpoint,
    pub temperature: Option<f32>,
    pub files_url: String,
    pub repository_url: String,
    pub theme: Theme,
}

/// Values given on the command line; each one set replaces the configured value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub endpoint: Option<Endpoint>,
    pub temperature: Option<f32>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            endpoint: Endpoint::default(),
            temperature: None,
            files_url: DEFAULT_FILES_URL.to_string(),
            repository_url: DEFAULT_REPOSITORY_URL.to_string(),
            theme: Theme::default(),
        }
    }

    /// Load the user config, falling back to defaults when no file exists yet.
    /// `ASKDOCS_API_URL` takes precedence over the file and `flags` over both.
    pub fn load_with(flags: &ConfigOverrides) -> Result<Self> {
        let env_api_url = std::env::var(API_URL_ENV).ok();
        Self::resolve(&Self::get_config_path()?, env_api_url.as_deref(), flags)
    }

    /// Layer the file at `config_path`, then `env_api_url`, then `flags`.
    /// Blank env values are ignored. The merged config is validated.
    pub fn resolve(
        config_path: &Path,
        env_api_url: Option<&str>,
        flags: &ConfigOverrides,
    ) -> Result<Self> {
        let mut config = Self::load_from(config_path)?;

        if let Some(url) = env_api_url.map(str::trim).filter(|url| !url.is_empty()) {
            config.api_url = url.to_string();
        }

        if let Some(api_url) = &flags.api_url {
            config.api_url = api_url.trim().to_string();
        }
        if let Some(endpoint) = flags.endpoint {
            config.endpoint = endpoint;
        }
        if flags.temperature.is_some() {
            config.temperature = flags.temperature;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(anyhow!(
                    "temperature must be between 0.0 and 2.0, got {}",
                    temperature
                ));
            }
        }
        if self.api_url.trim().is_empty() {
            return Err(anyhow!("api_url must not be empty"));
        }
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("config.json"))
    }

    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("askdocs"))
    }
}
