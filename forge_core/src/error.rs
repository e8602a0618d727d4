use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("entity `{0}` not found")]
    NotFound(String),
    #[error("failed in IO: {0}")]
    IO(#[from] std::io::Error),
    #[error("malformed yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("argument provided is error: {0}")]
    Argument(String),
    #[error("problem configuration error: {0}")]
    Configuration(String),
    #[error("{identifier} is not among {directory} of problem {problem}")]
    UnknownSource {
        identifier: String,
        directory: String,
        problem: String,
    },
    #[error("failed to compile `{}`: {msg}", .path.display())]
    Compile { path: PathBuf, msg: String },
    #[error("generator command `{command}` failed: {msg}")]
    Generate { command: String, msg: String },
    #[error("malformed range `{token}`: {msg}")]
    Range { token: String, msg: String },
    #[error("malformed command `{0}`")]
    Command(String),
    #[error("environment error: {0}")]
    Environment(String),
    #[error("time accounting failed: {0}")]
    Cell(String),
}

impl Error {
    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }
}
