//! wavfuse - WAV file combination
//!
//! Concatenates two uncompressed PCM WAV files into one, optionally with a
//! linear crossfade, peak normalization, input looping and preview-bounded
//! processing, writing the result atomically.
//!
//! # Architecture
//!
//! The core pipeline is layered bottom-up:
//! - [`wav`]: byte-accurate WAV container read/write and format probing
//! - [`validate`]: input file checks and disk-space queries
//! - [`process`]: pure PCM transforms (peak, normalize, crossfade, loop)
//! - [`combine`]: the two-file combination pipeline
//! - [`chain`]: pairwise chaining for ordered playlists
//!
//! Everything user-facing (flags, config merging, batch orchestration,
//! stdin/stdout piping, plain or JSON output) lives in [`cli`] and the
//! supporting [`config`], [`playlist`], [`ambient`] and [`stdio`] modules;
//! the core only consumes filesystem paths and returns structured results.

pub mod ambient;
pub mod chain;
pub mod cli;
pub mod combine;
pub mod config;
pub mod error;
pub mod playlist;
pub mod process;
pub mod stdio;
pub mod validate;
pub mod wav;

pub use combine::{CombineOptions, CombineRequest, CombineResult, Combiner};
pub use error::{FuseError, Result};
