//! Sequential playlist chaining
//!
//! Combines an ordered list of files pairwise: (f0 + f1) -> temp, (temp +
//! f2) -> temp, ... with the final pair writing straight to the requested
//! output. Intermediates live next to the final output (same filesystem as
//! the last atomic rename) and carry unique names so concurrent chains
//! cannot collide.
//!
//! At most two intermediate artifacts exist at a time: the one currently
//! serving as input and the one just produced. A fixed two-slot ring tracks
//! them; the slot being reused is deleted only once the step after it has
//! succeeded. On failure every intermediate created so far is removed and
//! the final output path is left untouched.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use uuid::Uuid;

use crate::combine::{CombineOptions, CombineRequest, Combiner};
use crate::error::{FuseError, Result};

/// Runs pairwise combines across an ordered file list
#[derive(Debug, Default)]
pub struct Chainer {
    combiner: Combiner,
}

/// Two-slot ring of intermediate artifacts
///
/// `store` evicts (and deletes) whatever occupied the slot two steps ago;
/// `clear` removes everything that remains.
struct TempRing {
    slots: [Option<PathBuf>; 2],
    next: usize,
}

impl TempRing {
    fn new() -> Self {
        TempRing {
            slots: [None, None],
            next: 0,
        }
    }

    fn store(&mut self, path: PathBuf) {
        if let Some(old) = self.slots[self.next].replace(path) {
            debug!("retiring chain intermediate {}", old.display());
            let _ = fs::remove_file(old);
        }
        self.next = (self.next + 1) % 2;
    }

    fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            if let Some(path) = slot.take() {
                let _ = fs::remove_file(path);
            }
        }
    }
}

impl Chainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_combiner(combiner: Combiner) -> Self {
        Chainer { combiner }
    }

    /// Combine `files` in order into `final_output`
    ///
    /// Requires at least two files. Each step applies the same options;
    /// dry runs are rejected because later steps would depend on outputs
    /// the earlier dry-run steps never produced.
    pub fn combine_sequence(
        &self,
        files: &[PathBuf],
        final_output: &Path,
        options: &CombineOptions,
    ) -> Result<()> {
        if files.len() < 2 {
            return Err(FuseError::InvalidOption {
                reason: "playlist mode requires at least two files".to_string(),
            });
        }
        if options.dry_run {
            return Err(FuseError::InvalidOption {
                reason: "dry run is not supported in playlist mode".to_string(),
            });
        }

        let mut ring = TempRing::new();
        let mut current = files[0].clone();

        for (i, next) in files.iter().enumerate().skip(1) {
            let is_last = i == files.len() - 1;
            let dest = if is_last {
                final_output.to_path_buf()
            } else {
                intermediate_path(final_output)
            };

            debug!(
                "chain step {}/{}: {} + {} -> {}",
                i,
                files.len() - 1,
                current.display(),
                next.display(),
                dest.display()
            );

            let request = CombineRequest::with_options(
                current,
                next.clone(),
                dest.clone(),
                options.clone(),
            );
            if let Err(e) = self.combiner.combine(&request) {
                ring.clear();
                return Err(e);
            }

            if !is_last {
                ring.store(dest.clone());
            }
            current = dest;
        }

        // The last intermediate input is no longer needed
        ring.clear();
        Ok(())
    }
}

/// Unique sibling path for a chain intermediate
fn intermediate_path(final_output: &Path) -> PathBuf {
    let mut os = final_output.as_os_str().to_os_string();
    os.push(format!(".chain-{}.wav", Uuid::new_v4().simple()));
    PathBuf::from(os)
}
