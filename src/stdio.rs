//! Stdin/stdout adapter for pipeline use
//!
//! The combination core only works with filesystem paths. `-` arguments are
//! materialized here: stdin is spilled into a temporary WAV file before the
//! combine runs, and a produced output file is streamed back to stdout
//! afterwards. Temporary files are removed when the guard drops.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::Builder;

use crate::error::Result;

const COPY_CHUNK_BYTES: usize = 8192;

/// True when a CLI path argument means stdin or stdout
pub fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// A temporary file that is deleted on drop
#[derive(Debug)]
pub struct TempInput {
    path: PathBuf,
}

impl TempInput {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempInput {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Spill all of stdin into a temporary WAV file
pub fn read_stdin_to_temp_file() -> Result<TempInput> {
    // keep() detaches the file from tempfile's auto-delete; the TempInput
    // guard owns cleanup so the path stays valid for the whole operation.
    let (file, path) = Builder::new()
        .prefix("wavfuse_stdin_")
        .suffix(".wav")
        .tempfile()?
        .keep()
        .map_err(|e| e.error)?;

    let mut writer = io::BufWriter::new(file);
    let mut stdin = io::stdin().lock();
    let mut chunk = [0u8; COPY_CHUNK_BYTES];
    loop {
        let n = stdin.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        writer.write_all(&chunk[..n])?;
    }
    writer.flush()?;

    debug!("spilled stdin to {}", path.display());
    Ok(TempInput { path })
}

/// Create a unique temporary path for an output that will go to stdout
pub fn stdout_temp_file() -> Result<TempInput> {
    let (_, path) = Builder::new()
        .prefix("wavfuse_stdout_")
        .suffix(".wav")
        .tempfile()?
        .keep()
        .map_err(|e| e.error)?;
    Ok(TempInput { path })
}

/// Stream a produced audio file to stdout
pub fn write_to_stdout(audio_file: &Path) -> Result<()> {
    let mut reader = io::BufReader::new(fs::File::open(audio_file)?);
    let mut stdout = io::stdout().lock();
    let mut chunk = [0u8; COPY_CHUNK_BYTES];
    loop {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        stdout.write_all(&chunk[..n])?;
    }
    stdout.flush()?;
    Ok(())
}
