use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Software teams for the Fall 2025 cohort.
pub const FALL_2025_SW_TEAMS: &[&str] = &["Karp", "CineCircle", "SpecialStandard", "Prisere"];

pub const DEFAULT_ENV_PATH: &str = "./.env";
pub const DEFAULT_REGION: &str = "us-east-1";

pub const ACCESS_KEY_ID_VAR: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
pub const REGION_VAR: &str = "AWS_REGION";
pub const ENDPOINT_URL_VAR: &str = "AWS_ENDPOINT_URL";
pub const TEAMS_VAR: &str = "SHIPERATE_TEAMS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load environment file {path:?}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("No environment variables set in {0:?}, please ensure your dotenv file is non empty.")]
    EmptyEnvFile(PathBuf),

    #[error("Missing AWS credentials: {0} is not set")]
    MissingCredential(&'static str),

    #[error("SHIPERATE_TEAMS is set but contains no team names")]
    NoTeams,
}

/// A string that never shows up in logs or debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Variables read from a dotenv file, layered under the process environment.
///
/// Lookups never mutate the process environment; values already exported in
/// the shell win over the file, the same precedence dotenv loaders use.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    values: HashMap<String, String>,
    process_env: bool,
}

impl EnvSource {
    /// Loads `path`, failing when the file is missing or defines nothing.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let values = Self::read_file(path)?;
        if values.is_empty() {
            return Err(ConfigError::EmptyEnvFile(path.to_path_buf()));
        }
        Ok(Self {
            values,
            process_env: true,
        })
    }

    /// Loads `path` if it exists, otherwise falls back to the process environment alone.
    pub fn load_optional(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No env file at {}, using process environment", path.display());
            return Ok(Self {
                values: HashMap::new(),
                process_env: true,
            });
        }
        Ok(Self {
            values: Self::read_file(path)?,
            process_env: true,
        })
    }

    /// Builds a source from fixed pairs, ignoring the process environment.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            process_env: false,
        }
    }

    /// Returns the value for `key`; empty values count as unset.
    pub fn get(&self, key: &str) -> Option<String> {
        let from_process = if self.process_env {
            std::env::var(key).ok()
        } else {
            None
        };
        let is_set = |value: &String| !value.trim().is_empty();
        from_process
            .filter(is_set)
            .or_else(|| self.values.get(key).cloned().filter(is_set))
    }

    fn read_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
        let to_error = |source: dotenvy::Error| ConfigError::EnvFile {
            path: path.to_path_buf(),
            source,
        };
        let mut values = HashMap::new();
        for item in dotenvy::from_path_iter(path).map_err(to_error)? {
            let (key, value) = item.map_err(to_error)?;
            values.insert(key, value);
        }
        debug!(
            "Loaded {} variable(s) from {}",
            values.len(),
            path.display()
        );
        Ok(values)
    }
}

#[derive(Debug, Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: Secret,
}

/// Settings for the cloud CLI, fixed for the lifetime of one invocation.
#[derive(Debug, Clone)]
pub struct ShiperateConfig {
    teams: Vec<String>,
    access_key_id: Option<String>,
    secret_access_key: Option<Secret>,
    region: String,
    endpoint_url: Option<String>,
}

impl ShiperateConfig {
    /// Loads configuration from the env file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_env(&EnvSource::load(path)?)
    }

    pub fn from_env(env: &EnvSource) -> Result<Self, ConfigError> {
        let teams = match env.get(TEAMS_VAR) {
            Some(raw) => {
                let teams: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|team| !team.is_empty())
                    .map(str::to_string)
                    .collect();
                if teams.is_empty() {
                    return Err(ConfigError::NoTeams);
                }
                teams
            }
            None => FALL_2025_SW_TEAMS.iter().map(|t| t.to_string()).collect(),
        };

        Ok(Self {
            teams,
            access_key_id: env.get(ACCESS_KEY_ID_VAR),
            secret_access_key: env.get(SECRET_ACCESS_KEY_VAR).map(Secret::new),
            region: env
                .get(REGION_VAR)
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint_url: env.get(ENDPOINT_URL_VAR),
        })
    }

    pub fn teams(&self) -> &[String] {
        &self.teams
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn endpoint_url(&self) -> Option<&str> {
        self.endpoint_url.as_deref()
    }

    /// The credential pair, or the first missing key.
    pub fn aws_credentials(&self) -> Result<AwsCredentials, ConfigError> {
        let access_key_id = self
            .access_key_id
            .clone()
            .ok_or(ConfigError::MissingCredential(ACCESS_KEY_ID_VAR))?;
        let secret_access_key = self
            .secret_access_key
            .clone()
            .ok_or(ConfigError::MissingCredential(SECRET_ACCESS_KEY_VAR))?;
        Ok(AwsCredentials {
            access_key_id,
            secret_access_key,
        })
    }
}
