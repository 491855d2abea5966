use std::io::Error;
use std::fmt::Display;
use std::process::ExitStatus;

#[derive(Debug)]
pub enum ProbeError {
    NumParseError(String),
    BitrateOverflow,

    ExecError(Error),
    BadExitStatus(ExitStatus),
    SerdeError(serde_json::Error),
}

impl std::error::Error for ProbeError {}

impl Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::NumParseError(num) => write!(f, "Failed to parse '{num}' as a number."),
            ProbeError::BitrateOverflow => write!(f, "Overflow while summing bitrates."),
            ProbeError::ExecError(e) => write!(f, "ffprobe subprocess failed to run: {e}"),
            ProbeError::BadExitStatus(status) => write!(f, "ffprobe exited with {status}."),
            ProbeError::SerdeError(e) => write!(f, "Serde failed to deserialize the result: {e}"),
        }
    }
}

#[derive(Debug)]
pub enum WriteError {
    SerializeError(serde_json::Error),
    IoError(Error),
}

impl std::error::Error for WriteError {}

impl Display for WriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteError::SerializeError(e) => write!(f, "Serde failed to serialize the summary: {e}"),
            WriteError::IoError(e) => write!(f, "Failed to write the summary file: {e}"),
        }
    }
}
