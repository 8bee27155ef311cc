//! Report sink selection
//!
//! The report destination is chosen by path convention: `-` is standard
//! out, `/dev/null` maps to the in-process null sink (no file is opened),
//! and anything else is created as a regular file. Failing to create the
//! output is fatal for the run, so it is checked before any walking
//! starts.

use crate::error::ConfigError;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Open the report destination named by `path`
pub fn open_sink(path: &Path) -> Result<Box<dyn Write + Send>, ConfigError> {
    if path == Path::new("-") {
        return Ok(Box::new(io::stdout()));
    }
    if path == Path::new("/dev/null") {
        return Ok(Box::new(io::sink()));
    }

    File::create(path)
        .map(|f| Box::new(f) as Box<dyn Write + Send>)
        .map_err(|e| ConfigError::CreateOutputFailed {
            path: path.to_path_buf(),
            source: e,
        })
}
