#![allow(clippy::multiple_crate_versions)]

use agritech::{
    is_placeholder_key, AdviceClient, AirQualityClient, ClimateClient, FileTokenStore,
    HttpClient, RouteGuard, WeatherClient,
};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

pub const APP_NAME: &str = "agritech";
pub const TOKEN_FILE_NAME: &str = "auth_token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiKey {
    Literal(String),
    Env { env: String },
    Cmd { cmd: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// A third-party API: key plus base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: ApiKey,
    pub base_url: String,
    /// Per-call deadline; the client's own default applies when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    fn placeholder(name: &str, base_url: &str) -> Self {
        Self {
            api_key: ApiKey::Literal(format!("your_{name}_api_key_here")),
            base_url: base_url.to_string(),
            timeout_secs: None,
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    #[serde(flatten)]
    pub provider: ProviderConfig,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::placeholder("openrouter", agritech::chat::DEFAULT_BASE_URL),
            model: default_model(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Opens every protected route regardless of the session.
    #[serde(default = "default_true")]
    pub demo_mode: bool,
    /// Where the bearer token is kept; defaults next to the config file.
    #[serde(default)]
    pub token_file: Option<PathBuf>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            demo_mode: true,
            token_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgriConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default = "default_openweather")]
    pub openweather: ProviderConfig,
    #[serde(default = "default_agromonitoring")]
    pub agromonitoring: ProviderConfig,
    #[serde(default = "default_airvisual")]
    pub airvisual: ProviderConfig,
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for AgriConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            openweather: default_openweather(),
            agromonitoring: default_agromonitoring(),
            airvisual: default_airvisual(),
            openrouter: OpenRouterConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

const fn default_true() -> bool {
    true
}

fn default_backend_url() -> String {
    "http://localhost:8000/api".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

fn default_model() -> String {
    agritech::chat::DEFAULT_MODEL.to_string()
}

fn default_openweather() -> ProviderConfig {
    ProviderConfig::placeholder("openweather", agritech::weather::DEFAULT_BASE_URL)
}

fn default_agromonitoring() -> ProviderConfig {
    ProviderConfig::placeholder("agromonitoring", agritech::climate::DEFAULT_BASE_URL)
}

fn default_airvisual() -> ProviderConfig {
    ProviderConfig::placeholder("airvisual", agritech::air_quality::AIRVISUAL_BASE_URL)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Confy(#[from] confy::ConfyError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("api key command failed: {cmd}: {message}")]
    CommandFailed { cmd: String, message: String },
    #[error("failed to execute api key command '{cmd}': {source}")]
    CommandExec { cmd: String, source: io::Error },
    #[error("api key command returned empty output: {cmd}")]
    CommandEmpty { cmd: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

impl AgriConfig {
    /// Loads the config file from the standard OS location, creating it
    /// with defaults on first run.
    ///
    /// # Errors
    /// Returns an error if the config file cannot be read or deserialized.
    pub fn load() -> Result<Self> {
        Ok(confy::load(APP_NAME, None)?)
    }

    /// # Errors
    /// Returns an error if the file cannot be read or deserialized.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Ok(confy::load_path(path)?)
    }

    /// Stores the config to the standard OS location.
    ///
    /// # Errors
    /// Returns an error if the config cannot be serialized or written.
    pub fn store(&self) -> Result<()> {
        confy::store(APP_NAME, None, self)?;
        Ok(())
    }

    /// # Errors
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf> {
        Ok(confy::get_configuration_file_path(APP_NAME, None)?)
    }

    /// Token file from `auth.token_file`, or `auth_token` beside the config file.
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined.
    pub fn token_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.auth.token_file {
            return Ok(path.clone());
        }
        let config_path = Self::config_path()?;
        Ok(config_path
            .parent()
            .map_or_else(|| PathBuf::from(TOKEN_FILE_NAME), |dir| dir.join(TOKEN_FILE_NAME)))
    }

    #[must_use]
    pub fn http_client(&self) -> HttpClient {
        HttpClient::new(&self.backend.base_url)
            .with_timeout(Duration::from_secs(self.backend.timeout_secs))
    }

    /// # Errors
    /// Returns an error if the OpenWeather key command fails.
    pub fn weather_client(&self) -> Result<WeatherClient> {
        let client = WeatherClient::new(self.openweather.api_key.resolve()?)
            .with_base_url(&self.openweather.base_url);
        Ok(match self.openweather.timeout() {
            Some(timeout) => client.with_timeout(timeout),
            None => client,
        })
    }

    /// # Errors
    /// Returns an error if the Agromonitoring key command fails.
    pub fn climate_client(&self) -> Result<ClimateClient> {
        let client = ClimateClient::new(self.agromonitoring.api_key.resolve()?)
            .with_base_url(&self.agromonitoring.base_url);
        Ok(match self.agromonitoring.timeout() {
            Some(timeout) => client.with_timeout(timeout),
            None => client,
        })
    }

    /// Both air quality sources share the OpenWeather deadline.
    ///
    /// # Errors
    /// Returns an error if either air quality key command fails.
    pub fn air_quality_client(&self) -> Result<AirQualityClient> {
        let client = AirQualityClient::new(
            self.openweather.api_key.resolve()?,
            self.airvisual.api_key.resolve()?,
        )
        .with_openweather_base_url(&self.openweather.base_url)
        .with_airvisual_base_url(&self.airvisual.base_url);
        Ok(match self.openweather.timeout() {
            Some(timeout) => client.with_timeout(timeout),
            None => client,
        })
    }

    /// # Errors
    /// Returns an error if the OpenRouter key command fails.
    pub fn advice_client(&self) -> Result<AdviceClient> {
        let provider = &self.openrouter.provider;
        let client = AdviceClient::new(provider.api_key.resolve()?)
            .with_base_url(&provider.base_url)
            .with_model(&self.openrouter.model);
        Ok(match provider.timeout() {
            Some(timeout) => client.with_timeout(timeout),
            None => client,
        })
    }

    /// # Errors
    /// Returns an error if the config directory cannot be determined.
    pub fn token_store(&self) -> Result<FileTokenStore> {
        Ok(FileTokenStore::new(self.token_path()?))
    }

    #[must_use]
    pub const fn route_guard(&self) -> RouteGuard {
        RouteGuard::new(self.auth.demo_mode)
    }
}

impl ApiKey {
    /// Resolves the key from its source. `Ok(None)` means the key is empty,
    /// still the shipped placeholder, or names an unset variable.
    ///
    /// # Errors
    /// Returns an error if the key command cannot run, fails or prints nothing.
    pub fn resolve(&self) -> Result<Option<String>> {
        let value = match self {
            Self::Literal(value) => value.clone(),
            Self::Env { env } => match std::env::var(env) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(env = %env, error = %err, "api key variable unavailable; treating key as unset");
                    return Ok(None);
                }
            },
            Self::Cmd { cmd } => {
                let output = Command::new("sh")
                    .arg("-c")
                    .arg(cmd)
                    .output()
                    .map_err(|e| ConfigError::CommandExec {
                        cmd: cmd.clone(),
                        source: e,
                    })?;

                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(ConfigError::CommandFailed {
                        cmd: cmd.clone(),
                        message: stderr.trim().to_string(),
                    });
                }

                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                if stdout.trim().is_empty() {
                    return Err(ConfigError::CommandEmpty { cmd: cmd.clone() });
                }
                stdout
            }
        };

        let trimmed = value.trim();
        Ok((!is_placeholder_key(trimmed)).then(|| trimmed.to_string()))
    }
}
