use std::{io, path::PathBuf, process::ExitStatus};
use thiserror::Error;

pub type Result<T, E = BuildError> = std::result::Result<T, E>;

/// An io error paired with the path that produced it.
#[derive(Debug, Error)]
#[error("\"{}\": {io}", self.path.display())]
pub struct PathIoError {
    io: io::Error,
    path: PathBuf,
}

impl PathIoError {
    pub fn new(io: io::Error, path: impl Into<PathBuf>) -> Self {
        Self { io, path: path.into() }
    }

    /// The path at which the error occurred
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// The underlying io error
    pub fn io_error(&self) -> &io::Error {
        &self.io
    }
}

impl From<PathIoError> for io::Error {
    fn from(err: PathIoError) -> Self {
        err.io
    }
}

/// Various error types for the build driver
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Io(#[from] PathIoError),
    /// A task was asked to run with an incomplete or contradictory configuration.
    #[error("{0}")]
    Configuration(String),
    /// An external tool exited with a non-zero status.
    #[error("command `{command}` exited with {status}\n{output}")]
    Tool { command: String, status: ExitStatus, output: String },
    /// An uncaught error surfaced from build-script evaluation.
    #[error("script error: {0}")]
    Script(String),
    #[error("{0}")]
    Message(String),
}

impl BuildError {
    pub fn io(err: io::Error, path: impl Into<PathBuf>) -> Self {
        PathIoError::new(err, path).into()
    }

    pub fn config(msg: impl std::fmt::Display) -> Self {
        BuildError::Configuration(msg.to_string())
    }

    pub(crate) fn msg(msg: impl std::fmt::Display) -> Self {
        BuildError::Message(msg.to_string())
    }

    /// Create an error from a failed external tool invocation, folding the
    /// captured stdout/stderr into the message.
    pub(crate) fn tool(command: impl Into<String>, status: ExitStatus, output: impl Into<String>) -> Self {
        let mut output = output.into();
        if output.trim().is_empty() {
            output = "<empty output>".to_string();
        }
        BuildError::Tool { command: command.into(), status, output }
    }
}
