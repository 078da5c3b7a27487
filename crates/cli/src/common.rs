//! Setup shared by the command line tools: logging, the configuration
//! directory and the search path.

use anyhow::{Context, Result};
use clap::{ArgAction, Args};
use dviread_core::search::{FormatClass, Resolver, SearchConfig};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Overrides the configuration directory when set.
pub const CONFIG_DIR_ENV: &str = "DVIREAD_CONFIG_DIR";

/// Search configuration file inside the configuration directory.
pub const SEARCH_CONFIG_FILE: &str = "search.json";

/// Install the stderr log subscriber. `RUST_LOG` is honoured unless `debug`
/// forces the debug level; the fallback is `warn`.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Directory holding `search.json`, if one can be determined.
pub fn config_dir() -> Option<PathBuf> {
    config_dir_with(|key| std::env::var_os(key))
}

/// `$DVIREAD_CONFIG_DIR`, else `$XDG_CONFIG_HOME/dviread`, else
/// `$HOME/.config/dviread`. Empty values count as unset.
pub fn config_dir_with<F>(lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<OsString>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);
    if let Some(dir) = var(CONFIG_DIR_ENV) {
        return Some(dir);
    }
    if let Some(xdg) = var("XDG_CONFIG_HOME") {
        return Some(xdg.join("dviread"));
    }
    var("HOME").map(|home| home.join(".config").join("dviread"))
}

/// Search path options common to both tools.
#[derive(Args, Debug, Clone, Default)]
pub struct SearchArgs {
    /// Search configuration file (default: search.json in the config directory)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Add a TEXMF root; may be repeated
    #[arg(long = "texmf", value_name = "DIR")]
    pub roots: Vec<PathBuf>,

    /// Search this directory for TFM files first; append // to recurse
    #[arg(long = "tfm-dir", value_name = "DIR")]
    pub tfm_dirs: Vec<PathBuf>,

    /// Search this directory for font map files first; append // to recurse
    #[arg(long = "map-dir", value_name = "DIR")]
    pub map_dirs: Vec<PathBuf>,

    /// Ignore TFMFONTS, TEXFONTMAPS and the other search path variables
    #[arg(long = "no-env", action = ArgAction::SetTrue)]
    pub no_env: bool,

    /// Disable caching of resolved paths
    #[arg(short = 'C', long = "disable-caching", action = ArgAction::SetTrue)]
    pub disable_caching: bool,
}

impl SearchArgs {
    /// Configuration file, then environment, then command line.
    pub fn load_config(&self) -> Result<SearchConfig> {
        let path = match &self.config {
            Some(path) => Some(path.clone()),
            None => config_dir()
                .map(|dir| dir.join(SEARCH_CONFIG_FILE))
                .filter(|path| path.is_file()),
        };
        let mut config = match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading search configuration");
                SearchConfig::from_json_file(&path)
                    .with_context(|| format!("reading search configuration {}", path.display()))?
            }
            None => SearchConfig::new(),
        };

        if !self.no_env {
            config = config.apply_env();
        }
        for root in &self.roots {
            config = config.with_root(root);
        }
        for dir in &self.tfm_dirs {
            config = config.with_override(FormatClass::Tfm, dir);
        }
        for dir in &self.map_dirs {
            config = config.with_override(FormatClass::FontMap, dir);
        }
        if self.disable_caching {
            config = config.without_cache();
        }
        Ok(config)
    }

    pub fn build_resolver(&self) -> Result<Resolver> {
        Ok(Resolver::new(self.load_config()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let pairs: Vec<(String, OsString)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn config_dir_precedence() {
        let all = env(&[
            (CONFIG_DIR_ENV, "/etc/dviread"),
            ("XDG_CONFIG_HOME", "/xdg"),
            ("HOME", "/home/u"),
        ]);
        assert_eq!(config_dir_with(all), Some(PathBuf::from("/etc/dviread")));

        let xdg = env(&[(CONFIG_DIR_ENV, ""), ("XDG_CONFIG_HOME", "/xdg"), ("HOME", "/home/u")]);
        assert_eq!(config_dir_with(xdg), Some(PathBuf::from("/xdg/dviread")));

        let home = env(&[("HOME", "/home/u")]);
        assert_eq!(config_dir_with(home), Some(PathBuf::from("/home/u/.config/dviread")));

        assert_eq!(config_dir_with(env(&[])), None);
    }

    #[test]
    fn command_line_dirs_extend_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(SEARCH_CONFIG_FILE);
        std::fs::write(&config_path, r#"{ "texmf_roots": ["/texmf"] }"#).unwrap();

        let args = SearchArgs {
            config: Some(config_path),
            roots: vec![PathBuf::from("/extra")],
            tfm_dirs: vec![PathBuf::from("/tfm")],
            no_env: true,
            disable_caching: true,
            ..Default::default()
        };
        let config = args.load_config().unwrap();
        assert_eq!(
            config.texmf_roots,
            vec![PathBuf::from("/texmf"), PathBuf::from("/extra")]
        );
        assert_eq!(config.overrides[&FormatClass::Tfm], vec![PathBuf::from("/tfm")]);
        assert!(!config.cache);
    }
}
