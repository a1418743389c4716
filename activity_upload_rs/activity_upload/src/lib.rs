//! Core logic for uploading a single activities export.
//!
//! The user hands over a list of files (a directory selection in the browser,
//! a path walk on the command line); the handler picks the first file whose
//! name equals the configured target, posts it as multipart form data and
//! surfaces the server's `message`. Browser and network specifics live behind
//! the [`Transport`] and [`StatusSink`] traits so the same state machine runs
//! in wasm, in the CLI, and in tests.

use thiserror::Error;

pub mod config;
pub mod handler;
pub mod payload;
pub mod response;
pub mod select;

pub use config::{
    NoMatchPolicy, UploadConfig, DEFAULT_ENDPOINT, DEFAULT_FIELD_NAME, DEFAULT_TARGET_FILENAME,
};
pub use handler::{HandlerState, StatusSink, SubmitHandler, SubmitOutcome, Transport};
pub use payload::UploadPayload;
pub use response::{parse_status, StatusResponse};
pub use select::{select, select_target, NamedFile, Selection};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("request failed: {0}")]
    Network(String),
    #[error("response is not valid JSON: {0}")]
    MalformedResponse(String),
    #[error("response has no string `message` field")]
    MissingMessage,
    #[error("file '{target}' not found in the selection")]
    NotFound { target: String },
    #[error("an upload is already in flight")]
    Busy,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("i/o error: {0}")]
    Io(String),
}
