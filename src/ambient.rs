//! Ambient backing-track selection
//!
//! When invoked with a single input file, wavfuse layers it over an ambient
//! track from the asset directory. Users can pick a named track, ask for a
//! random one, point at a custom file, or list what is installed.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use rand::seq::SliceRandom;

/// Directory holding the bundled ambient tracks
pub const ASSET_DIR: &str = "asset";

/// Default ambient track
pub const DEFAULT_AMBIENT: &str = "ambient.wav";

/// Known ambient files; users can drop more into the asset directory
pub const AMBIENT_FILES: &[&str] = &[
    "ambient.wav",
    "ambient_vinyl.wav",
    "ambient_rain.wav",
    "ambient_cafe.wav",
    "ambient_night.wav",
];

/// Resolves ambient choices against an asset directory
#[derive(Debug, Clone)]
pub struct AmbientSelector {
    asset_dir: PathBuf,
}

impl Default for AmbientSelector {
    fn default() -> Self {
        AmbientSelector {
            asset_dir: PathBuf::from(ASSET_DIR),
        }
    }
}

impl AmbientSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selector rooted at a non-default asset directory
    pub fn with_asset_dir(asset_dir: PathBuf) -> Self {
        AmbientSelector { asset_dir }
    }

    /// Resolve an ambient choice to a file path
    ///
    /// Accepts a bundled name (with or without `.wav`), `random`, or a
    /// custom path. Unresolvable choices fall back to the default track
    /// with a warning rather than failing; validation of the resulting
    /// file happens later in the pipeline.
    pub fn select(&self, choice: Option<&str>) -> PathBuf {
        let default = self.asset_dir.join(DEFAULT_AMBIENT);
        let choice = match choice {
            Some(c) if !c.is_empty() => c,
            _ => return default,
        };

        if choice.eq_ignore_ascii_case("random") {
            let available: Vec<PathBuf> = AMBIENT_FILES
                .iter()
                .map(|name| self.asset_dir.join(name))
                .filter(|p| p.exists())
                .collect();
            return match available.choose(&mut rand::thread_rng()) {
                Some(picked) => {
                    debug!("randomly selected ambient: {}", picked.display());
                    picked.clone()
                }
                None => {
                    warn!("no ambient files found, using default");
                    default
                }
            };
        }

        // Bundled name, with or without extension
        let named = self.asset_dir.join(choice);
        if named.exists() {
            return named;
        }
        if !choice.ends_with(".wav") {
            let with_ext = self.asset_dir.join(format!("{}.wav", choice));
            if with_ext.exists() {
                return with_ext;
            }
        }

        // Custom path outside the asset directory
        let custom = Path::new(choice);
        if custom.exists() {
            debug!("using custom ambient: {}", custom.display());
            return custom.to_path_buf();
        }

        warn!("ambient '{}' not found, using default", choice);
        default
    }

    /// Names of the bundled ambient tracks present on disk
    pub fn installed(&self) -> Vec<String> {
        AMBIENT_FILES
            .iter()
            .filter(|name| self.asset_dir.join(name).exists())
            .map(|name| name.trim_end_matches(".wav").to_string())
            .collect()
    }
}
