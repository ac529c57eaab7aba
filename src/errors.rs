//! Error mapping guide:
//! - Map io::ErrorKind::NotFound to exit code 127 (docker/curl missing); all other I/O errors to 1.
//! - Validation errors are printed to stdout verbatim and exit 1.
//! - A failed snapshot volume surfaces the runtime's own exit code.
use std::fmt;
use std::io;

/// Map an io::Error to a process exit code:
/// - 127 for NotFound (command not found)
/// - 1 for all other errors
pub fn exit_code_for_io_error(e: &io::Error) -> u8 {
    if e.kind() == io::ErrorKind::NotFound {
        127
    } else {
        1
    }
}

/// Exit code for an anyhow error: the io::Error mapping when one is at the root, else 1.
pub fn exit_code_for_anyhow(e: &anyhow::Error) -> u8 {
    match e.root_cause().downcast_ref::<io::Error>() {
        Some(ioe) => exit_code_for_io_error(ioe),
        None => 1,
    }
}

/// Clamp a child exit code into a non-zero process exit code.
pub fn exit_code_for_status(code: i32) -> u8 {
    match u8::try_from(code) {
        Ok(0) | Err(_) => 1,
        Ok(c) => c,
    }
}

#[derive(Debug)]
pub enum SnapshotError {
    /// CLI misuse detected before any runtime call.
    Validation(String),
    Io(io::Error),
    /// The helper image is neither present nor pullable.
    Helper(anyhow::Error),
    /// The runtime could not list volumes for `-a`.
    Resolve(anyhow::Error),
    /// One or more volumes failed; `exit_code` belongs to the first failure.
    Volumes { failed: Vec<String>, exit_code: i32 },
}

impl From<io::Error> for SnapshotError {
    fn from(e: io::Error) -> Self {
        SnapshotError::Io(e)
    }
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_for_snapshot_error(self))
    }
}

impl std::error::Error for SnapshotError {}

pub fn exit_code_for_snapshot_error(e: &SnapshotError) -> u8 {
    match e {
        SnapshotError::Validation(_) => 1,
        SnapshotError::Io(ioe) => exit_code_for_io_error(ioe),
        SnapshotError::Helper(e) | SnapshotError::Resolve(e) => exit_code_for_anyhow(e),
        SnapshotError::Volumes { exit_code, .. } => exit_code_for_status(*exit_code),
    }
}

/// User-facing text; validation messages are the fixed `Error: ...` lines.
pub fn display_for_snapshot_error(e: &SnapshotError) -> String {
    match e {
        SnapshotError::Validation(s) => format!("Error: {s}"),
        SnapshotError::Io(ioe) => ioe.to_string(),
        SnapshotError::Helper(e) => format!("helper image unavailable: {e:#}"),
        SnapshotError::Resolve(e) => format!("failed to list volumes: {e:#}"),
        SnapshotError::Volumes { failed, .. } => {
            format!("snapshot failed for volume(s): {}", failed.join(", "))
        }
    }
}
