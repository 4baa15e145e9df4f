use super::types::{
    DeployConfig, DeployError, DeployResult, BUILD_CONTEXT_VAR, DOCKERFILE_VAR, DO_TOKEN_VAR,
    IMAGE_TAG_VAR, REPOSITORY_VAR, REQUIRED_ENV_VARS, REQUIRED_EXECUTABLES,
};
use crate::config::{EnvSource, Secret};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Dependency check run before any command is executed.
#[derive(Debug, Clone)]
pub struct Preflight {
    search_path: Option<OsString>,
    env: EnvSource,
}

impl Preflight {
    pub fn new(search_path: Option<OsString>, env: EnvSource) -> Self {
        Self { search_path, env }
    }

    /// Uses the process `PATH` and `env_file` layered under the process environment.
    pub fn from_env_file(env_file: &Path) -> DeployResult<Self> {
        let env = EnvSource::load_optional(env_file)?;
        Ok(Self::new(std::env::var_os("PATH"), env))
    }

    pub fn find_executable(&self, name: &str) -> Option<PathBuf> {
        let search_path = self.search_path.as_ref()?;
        std::env::split_paths(search_path)
            .map(|dir| dir.join(name))
            .find(|candidate| is_executable(candidate))
    }

    /// Fails on the first missing executable, then the first missing variable.
    pub fn check(&self) -> DeployResult<DeployConfig> {
        for name in REQUIRED_EXECUTABLES {
            match self.find_executable(name) {
                Some(path) => debug!("Found {} at {}", name, path.display()),
                None => return Err(DeployError::MissingDependency(name.to_string())),
            }
        }

        if let Some(missing) = REQUIRED_ENV_VARS
            .iter()
            .find(|var| self.env.get(var).is_none())
        {
            return Err(DeployError::MissingEnvVar(missing.to_string()));
        }

        Ok(DeployConfig {
            token: Secret::new(self.require(DO_TOKEN_VAR)?),
            build_context: PathBuf::from(self.require(BUILD_CONTEXT_VAR)?),
            dockerfile: PathBuf::from(self.require(DOCKERFILE_VAR)?),
            repository: self.require(REPOSITORY_VAR)?,
            image_tag: self.require(IMAGE_TAG_VAR)?,
        })
    }

    fn require(&self, var: &str) -> DeployResult<String> {
        self.env
            .get(var)
            .ok_or_else(|| DeployError::MissingEnvVar(var.to_string()))
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
