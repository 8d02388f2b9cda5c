//! Configuration discovery and effective settings resolution.
//!
//! vizlint reads `vizlint.toml|yaml|yml` from the repository root (or closest
//! ancestor) and merges it with CLI flags to produce an `Effective` config.
//! Defaults:
//! - `pages`: `pages`
//! - `sources`: `sources/CMP`
//! - `output`: `human`
//! - `strict`: false
//! - `[rules]`: the built-in rule tables; each table present in the file
//!   replaces its built-in counterpart.
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::error::{LintError, Result};
use crate::models::conventions::RuleConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_FILES: [&str; 3] = ["vizlint.toml", "vizlint.yaml", "vizlint.yml"];

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `vizlint.toml|yaml`.
pub struct VizlintConfig {
    pub pages: Option<String>,
    pub sources: Option<String>,
    pub output: Option<String>,
    pub strict: Option<bool>,
    #[serde(default)]
    pub rules: Option<RuleConfig>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub root: PathBuf,
    pub pages_dir: PathBuf,
    pub sources_dir: PathBuf,
    pub output: String,
    pub strict: bool,
    pub rules: RuleConfig,
    /// Path of the config file that was applied, if any.
    pub config_file: Option<PathBuf>,
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when a `vizlint.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_FILES.iter().any(|f| cur.join(f).exists()) || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `VizlintConfig` from `vizlint.toml` or `vizlint.yaml|yml` if present.
///
/// A file that exists but does not parse is an error, not a silent default.
pub fn load_config(root: &Path) -> Result<Option<(PathBuf, VizlintConfig)>> {
    let Some(path) = CONFIG_FILES
        .iter()
        .map(|f| root.join(f))
        .find(|p| p.is_file())
    else {
        return Ok(None);
    };
    let invalid = |message: String| LintError::Config {
        path: path.clone(),
        message,
    };
    let s = fs::read_to_string(&path).map_err(|e| invalid(e.to_string()))?;
    let cfg: VizlintConfig = if path.extension().is_some_and(|e| e == "toml") {
        toml::from_str(&s).map_err(|e| invalid(e.to_string()))?
    } else {
        serde_yaml::from_str(&s).map_err(|e| invalid(e.to_string()))?
    };
    debug!(path = %path.display(), "loaded config");
    Ok(Some((path, cfg)))
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
///
/// `pages` and `sources` are taken relative to the detected root unless
/// absolute.
pub fn resolve_effective(
    cli_root: Option<&str>,
    cli_pages: Option<&str>,
    cli_sources: Option<&str>,
    cli_output: Option<&str>,
    cli_strict: Option<bool>,
) -> Result<Effective> {
    let start = PathBuf::from(cli_root.unwrap_or("."));
    let root = detect_repo_root(&start);
    let (config_file, cfg) = match load_config(&root)? {
        Some((path, cfg)) => (Some(path), cfg),
        None => (None, VizlintConfig::default()),
    };

    let pages = cli_pages
        .map(str::to_string)
        .or(cfg.pages)
        .unwrap_or_else(|| "pages".to_string());
    let sources = cli_sources
        .map(str::to_string)
        .or(cfg.sources)
        .unwrap_or_else(|| "sources/CMP".to_string());
    let output = cli_output
        .map(str::to_string)
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());
    let strict = cli_strict.or(cfg.strict).unwrap_or(false);

    Ok(Effective {
        pages_dir: root.join(pages),
        sources_dir: root.join(sources),
        root,
        output,
        strict,
        rules: cfg.rules.unwrap_or_default(),
        config_file,
    })
}
