use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::cli::{Cli, LogFormat};
use crate::store::DigestAlgorithm;

fn default_backend() -> Backend {
    Backend::Disk
}

fn default_root() -> PathBuf {
    PathBuf::from("httpstash-data")
}

fn default_digest() -> String {
    DigestAlgorithm::default().name().to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

fn default_upstream_timeout() -> u64 {
    30
}

fn default_follow_redirects() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Disk,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_backend")]
    pub backend: Backend,
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_digest")]
    pub digest: String,
    #[serde(default = "default_log_format")]
    pub log: LogFormat,
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout: u64,
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,
}

impl Settings {
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = resolve_config_path(cli);
        Self::load_from(config_path.as_deref())
    }

    /// Layers `config_path` (when given) under `HTTPSTASH__*` environment
    /// variables.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("HTTPSTASH")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build().map_err(to_anyhow)?;
        let mut settings: Settings = cfg.try_deserialize().map_err(to_anyhow)?;
        if let Some(path) = config_path {
            settings.apply_base_dir(path);
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn digest_algorithm(&self) -> Result<DigestAlgorithm> {
        self.digest
            .parse()
            .with_context(|| format!("invalid digest setting '{}'", self.digest))
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout)
    }

    fn apply_base_dir(&mut self, config_path: &Path) {
        let base_dir = config_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        self.root = absolutize(&self.root, base_dir);
    }

    pub fn validate(&self) -> Result<()> {
        self.digest_algorithm()?;
        ensure!(
            self.upstream_timeout > 0,
            "upstream_timeout must be greater than 0 seconds (got {})",
            self.upstream_timeout
        );
        if self.backend == Backend::Disk {
            ensure!(
                !self.root.as_os_str().is_empty(),
                "root must be set for the disk backend"
            );
        }
        Ok(())
    }
}

fn to_anyhow(err: ConfigError) -> anyhow::Error {
    anyhow::anyhow!(err)
}

fn resolve_config_path(cli: &Cli) -> Option<PathBuf> {
    if let Some(path) = &cli.config {
        return Some(path.clone());
    }
    default_config_candidates()
        .into_iter()
        .find(|candidate| candidate.exists())
}

fn default_config_candidates() -> [PathBuf; 2] {
    [
        PathBuf::from("/etc/httpstash/httpstash.toml"),
        PathBuf::from("httpstash.toml"),
    ]
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn settings() -> Settings {
        Settings {
            backend: Backend::Disk,
            root: PathBuf::from("data"),
            digest: "sha256".to_string(),
            log: LogFormat::Text,
            upstream_timeout: 30,
            follow_redirects: true,
        }
    }

    #[test]
    fn test_settings_validation_defaults() {
        assert!(settings().validate().is_ok());
    }

    #[test]
    fn test_settings_validation_rejects_unknown_digest() {
        let mut settings = settings();
        settings.digest = "crc32".to_string();
        assert!(settings.validate().is_err());

        settings.digest = "SHA512".to_string();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.digest_algorithm().unwrap(), DigestAlgorithm::Sha512);
    }

    #[test]
    fn test_settings_validation_rejects_zero_timeout() {
        let mut settings = settings();
        settings.upstream_timeout = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_load_resolves_root_against_config_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("httpstash.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "root = \"records\"\ndigest = \"md5\"\nlog = \"json\"").unwrap();

        let settings = Settings::load_from(Some(path.as_path())).unwrap();
        assert_eq!(settings.root, dir.path().join("records"));
        assert_eq!(settings.digest_algorithm().unwrap(), DigestAlgorithm::Md5);
        assert_eq!(settings.log, LogFormat::Json);
        assert_eq!(settings.backend, Backend::Disk);
        assert!(settings.follow_redirects);
    }
}
