use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read nvpmodel config {path}: {source}")]
    ConfRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed setting at line {line_no}: '{line}' (expected NAME ATTRIBUTE VALUE)")]
    MalformedSetting { line_no: usize, line: String },

    #[error("malformed param argument at line {line_no}: '{line}' (expected NAME PATH)")]
    MalformedParamArg { line_no: usize, line: String },

    #[error("invalid value for {name} {attribute}: '{value}' is not an integer")]
    InvalidValue {
        name: String,
        attribute: String,
        value: String,
    },

    #[error("no power mode matches '{0}'")]
    UnknownMode(String),

    #[error("failed to run {path}: {source}")]
    ScriptSpawn {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} exited with {status}: {output}")]
    ScriptFailed {
        path: PathBuf,
        status: std::process::ExitStatus,
        output: String,
    },

    #[error("not running as root (required for {operation})")]
    NotRoot { operation: String },
}

pub type Result<T> = std::result::Result<T, Error>;
