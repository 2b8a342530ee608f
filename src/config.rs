//! Configuration file loading
//!
//! Reads defaults from `~/.wavfuserc`, a plain `key=value` file with `#`
//! comments. The CLI merges these under explicit flags; the combination
//! core never reads configuration itself.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

/// Config file name looked up in the user's home directory
pub const CONFIG_FILE_NAME: &str = ".wavfuserc";

/// Defaults loaded from the rc file
///
/// Every field is optional; `None` means "not set, use the built-in
/// default". Unknown keys are ignored, malformed values are skipped with a
/// debug note rather than failing startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub fade: Option<f64>,
    pub level: Option<f64>,
    pub loop_count: Option<u32>,
    pub output_dir: Option<String>,
    pub force: Option<bool>,
    pub reverse: Option<bool>,
    pub shuffle: Option<bool>,
    pub ambient: Option<String>,
}

impl Config {
    /// Load from `~/.wavfuserc`; a missing file yields defaults
    pub fn load() -> Self {
        match home_config_path() {
            Some(path) => Self::load_from(&path),
            None => Config::default(),
        }
    }

    /// Load from an explicit path; unreadable files yield defaults
    pub fn load_from(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(_) => return Config::default(),
        };
        debug!("reading configuration from {}", path.display());
        Self::parse(&text)
    }

    fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        for (line_num, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                debug!("ignoring invalid config line {}: {}", line_num + 1, line);
                continue;
            };
            let key = key.trim().to_string();
            let mut value = value.trim();
            // Strip surrounding quotes
            if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
                value = &value[1..value.len() - 1];
            }
            entries.insert(key, value.to_string());
        }

        Config {
            fade: parse_entry(&entries, "fade"),
            level: parse_entry(&entries, "level"),
            loop_count: parse_entry(&entries, "loop"),
            output_dir: entries.get("output-dir").cloned(),
            force: parse_bool(&entries, "force"),
            reverse: parse_bool(&entries, "reverse"),
            shuffle: parse_bool(&entries, "shuffle"),
            ambient: entries.get("ambient").cloned(),
        }
    }
}

fn parse_entry<T: std::str::FromStr>(entries: &HashMap<String, String>, key: &str) -> Option<T> {
    let raw = entries.get(key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            debug!("ignoring invalid config value for '{}': {}", key, raw);
            None
        }
    }
}

fn parse_bool(entries: &HashMap<String, String>, key: &str) -> Option<bool> {
    entries.get(key).map(|v| v.eq_ignore_ascii_case("true"))
}

fn home_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            "# wavfuse defaults\n\
             fade=1.5\n\
             level = 0.7\n\
             loop=3\n\
             output-dir=\"/tmp/mixed\"\n\
             force=TRUE\n\
             shuffle=false\n\
             ambient=rain\n",
        );
        assert_eq!(config.fade, Some(1.5));
        assert_eq!(config.level, Some(0.7));
        assert_eq!(config.loop_count, Some(3));
        assert_eq!(config.output_dir.as_deref(), Some("/tmp/mixed"));
        assert_eq!(config.force, Some(true));
        assert_eq!(config.shuffle, Some(false));
        assert_eq!(config.ambient.as_deref(), Some("rain"));
        assert_eq!(config.reverse, None);
    }

    #[test]
    fn test_invalid_values_are_skipped() {
        let config = Config::parse("fade=fast\nloop=two\nlevel=0.9\nnot a pair\n");
        assert_eq!(config.fade, None);
        assert_eq!(config.loop_count, None);
        assert_eq!(config.level, Some(0.9));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/.wavfuserc"));
        assert_eq!(config, Config::default());
    }
}
