use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::tagger::Tagger;

/// Top-level configuration for rayban-tag.
///
/// # Loading
///
/// ```rust,no_run
/// use rayban_tag::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.tagger.exiftool_path = "/usr/local/bin/exiftool".into();
/// config.tagger.timeout_secs = Some(60);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How the external tool is invoked.
    pub tagger: TaggerConfig,
    /// Output and batch behavior.
    pub output: OutputConfig,
}

/// External tool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggerConfig {
    /// Executable to run. A bare name is looked up on `PATH`.
    pub exiftool_path: String,
    /// Raw arguments appended after the fixed tag flags.
    pub extra_args: Vec<String>,
    /// Kill the tool after this many seconds. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// If `true`, sniff and report without running the tool.
    pub dry_run: bool,
    /// If `true`, skip files whose format is neither sniffed nor implied by
    /// their extension.
    pub require_known_format: bool,
    /// Maximum number of files tagged at once. `0` means one per CPU.
    pub jobs: usize,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            exiftool_path: "exiftool".to_string(),
            extra_args: Vec::new(),
            timeout_secs: Some(120),
        }
    }
}

impl Config {
    /// Default location of the config file: `config.json` beside the
    /// `rayban-tag-cli` binary, so a copied install carries its tool path.
    pub fn config_path() -> Result<PathBuf> {
        let exe = std::env::current_exe().context("Cannot locate the running binary")?;
        let dir = exe.parent().context("Running binary has no parent directory")?;
        Ok(dir.join("config.json"))
    }

    fn resolve(path: Option<&Path>) -> Result<PathBuf> {
        path.map_or_else(Self::config_path, |p| Ok(p.to_path_buf()))
    }

    /// Read the tagger and batch settings.
    ///
    /// A missing file is not an error: the built-in defaults (`exiftool` on
    /// `PATH`, 120 s timeout) apply. Keys absent from the file keep their
    /// defaults too.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve(path)?;
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Write these settings as pretty JSON (used by `--init`).
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = Self::resolve(path)?;
        let text = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, text)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(path)
    }

    /// Number of files to process concurrently, resolving `0` to the CPU count.
    pub fn jobs(&self) -> usize {
        match self.output.jobs {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }

    /// Build the tagger described by this config.
    pub fn tagger(&self) -> Tagger {
        Tagger::new(&self.tagger.exiftool_path)
            .with_extra_args(&self.tagger.extra_args)
            .with_timeout(self.tagger.timeout_secs.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.tagger.exiftool_path, "exiftool");
        assert!(config.tagger.extra_args.is_empty());
        assert_eq!(config.tagger.timeout_secs, Some(120));
        assert!(!config.output.dry_run);
        assert!(config.jobs() >= 1);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("config.json"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::default();
        config.tagger.exiftool_path = "/opt/exiftool/exiftool".into();
        config.tagger.extra_args = vec!["-P".into()];
        config.output.jobs = 3;

        assert_eq!(config.save(Some(&path)).unwrap(), path);
        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.jobs(), 3);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "tagger": { "timeout_secs": null } }"#).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.tagger.exiftool_path, "exiftool");
        assert_eq!(config.tagger.timeout_secs, None);
        assert_eq!(config.output, OutputConfig::default());
    }

    #[test]
    fn saved_file_lists_every_setting() {
        let dir = TempDir::new().unwrap();
        let path = Config::default().save(Some(&dir.path().join("config.json"))).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["tagger"]["exiftool_path"], "exiftool");
        assert_eq!(json["tagger"]["timeout_secs"], 120);
        assert_eq!(json["output"]["require_known_format"], false);
        assert_eq!(json["output"]["jobs"], 0);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn tagger_follows_config() {
        let mut config = Config::default();
        config.tagger.exiftool_path = "/usr/bin/exiftool".into();
        config.tagger.extra_args = vec!["-q".into()];

        let tagger = config.tagger();
        assert_eq!(tagger.tool(), Path::new("/usr/bin/exiftool"));
        let invocation = tagger.command_for(Path::new("a.jpg"));
        let argv = invocation.argv();
        assert_eq!(argv[5], "-q");
        assert_eq!(argv[6], "a.jpg");
    }
}
