use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// Settings from `ulog-explorer.toml` (or `--config`) and `ULOG_EXPLORER_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ExplorerConfig {
    /// Directory searched when no log path is given.
    pub log_dir: Option<PathBuf>,
    /// Show `perf_*` info keys and full multi-info contents.
    pub verbose_info: bool,
    /// Start with bold (width 3) curves in plot output.
    pub bold: bool,
}

pub fn load(path: Option<&Path>) -> Result<ExplorerConfig> {
    let builder = config::Config::builder()
        .set_default("verbose_info", false)?
        .set_default("bold", false)?;
    let builder = match path {
        Some(p) => builder.add_source(config::File::from(p)),
        None => builder.add_source(config::File::with_name("ulog-explorer").required(false)),
    };
    let settings = builder
        .add_source(config::Environment::with_prefix("ULOG_EXPLORER"))
        .build()
        .context("failed to read configuration")?;
    Ok(settings.try_deserialize()?)
}

/// The log to open: `path` itself, or the newest `.ulg` inside it when it is
/// a directory. Without a path the configured `log_dir` is searched.
pub fn resolve_log(path: Option<&Path>, config: &ExplorerConfig) -> Result<PathBuf> {
    let path = match (path, &config.log_dir) {
        (Some(p), _) => p.to_path_buf(),
        (None, Some(dir)) => dir.clone(),
        (None, None) => bail!("no log file given and no log_dir configured"),
    };
    if !path.is_dir() {
        return Ok(path);
    }

    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    let entries = std::fs::read_dir(&path).with_context(|| format!("failed to list {}", path.display()))?;
    for entry in entries {
        let entry = entry?;
        let candidate = entry.path();
        if candidate.extension().is_none_or(|ext| ext != "ulg") {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
            newest = Some((modified, candidate));
        }
    }
    newest
        .map(|(_, p)| p)
        .with_context(|| format!("no .ulg files in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn config(log_dir: Option<PathBuf>) -> ExplorerConfig {
        ExplorerConfig {
            log_dir,
            verbose_info: false,
            bold: false,
        }
    }

    #[test]
    fn explicit_file_is_used_as_is() {
        let p = Path::new("/some/where/flight.ulg");
        assert_eq!(resolve_log(Some(p), &config(None)).unwrap(), p);
    }

    #[test]
    fn nothing_to_open_is_an_error() {
        assert!(resolve_log(None, &config(None)).is_err());
    }

    #[test]
    fn directory_picks_a_ulg_file() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("a.ulg"), b"x").unwrap();
        let picked = resolve_log(None, &config(Some(dir.path().to_path_buf()))).unwrap();
        assert_eq!(picked, dir.path().join("a.ulg"));
    }

    #[test]
    fn directory_without_logs_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        assert!(resolve_log(Some(dir.path()), &config(None)).is_err());
    }

    #[test]
    fn explicit_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "bold = true\nlog_dir = \"/var/log/px4\"").unwrap();
        let cfg = load(Some(file.path())).unwrap();
        assert!(cfg.bold);
        assert_eq!(cfg.log_dir.as_deref(), Some(Path::new("/var/log/px4")));
    }

    #[test]
    fn defaults_apply_without_a_file() {
        let cfg = load(None).unwrap();
        assert!(!cfg.bold);
        assert!(!cfg.verbose_info);
    }
}
