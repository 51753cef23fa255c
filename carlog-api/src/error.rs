//! Errors returned by `CarlogClient`
//!
use std::{collections::BTreeMap, fmt, path::PathBuf};

use serde::Deserialize;
use snafu::prelude::*;

/// Errors returned by carlog crate
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CarlogError {
    // Http connection or timeout error
    #[snafu(display("HTTP error {method} url:{url}"))]
    Http {
        method: String,
        url: String,
        source: reqwest::Error,
    },

    /// Backend responded with an error status not covered by a more specific variant.
    #[snafu(display("Api Server reported error ({code}) {method} {url}: {message}"))]
    ApiError {
        code: u16,
        method: String,
        url: String,
        message: String,
    },

    /// Encountered server error on "retryable" request, but all retry attempts failed.
    #[snafu(display("server api request: failed {n} times"))]
    TooManyRetries { n: u32 },

    /// Deserialization error. The server response did not match the expected schema.
    #[snafu(display("Deserialization: {source}"))]
    Deserialization { source: serde_json::Error },

    /// Serialization error. unlikely to occur.
    #[snafu(display("Serialization: {source}"))]
    Serialization { source: serde_json::Error },

    /// Expected item was not found.
    #[snafu(display("{obj_type} {key} not found"))]
    NotFound { obj_type: String, key: String },

    /// Request was rejected by local parameter checks or by the backend (http 400/422).
    /// Backend 422 responses carry per-field messages in `fields`.
    #[snafu(display("Validation error: {message}"))]
    Validation { message: String, fields: FieldErrors },

    /// Backup file could not be parsed as JSON.
    #[snafu(display("Could not parse the backup file. It may be corrupt or invalid: {source}"))]
    CorruptBackup { source: serde_json::Error },

    /// Backup file parsed, but does not have the expected structure.
    #[snafu(display("Invalid backup file structure: {message}"))]
    InvalidBackup { message: String },

    /// Restore session action is not allowed in the current state.
    #[snafu(display("Restore {action} not allowed in state {state}"))]
    InvalidState { action: String, state: String },

    /// Backend did not respond to liveness probes in time.
    #[snafu(display("Backend at {url} unavailable after {attempts} attempts in {elapsed:?}"))]
    BackendUnavailable {
        url: String,
        attempts: usize,
        elapsed: std::time::Duration,
        last_error: Option<String>,
    },

    /// Liveness probe was cancelled by the caller.
    #[snafu(display("Backend probe cancelled"))]
    ProbeCancelled,

    /// CSV writer error
    #[snafu(display("CSV: {source}"))]
    Csv { source: csv::Error },

    /// Error encountered by the configured `PrefStore`.
    #[snafu(display("PrefStore: {source}"))]
    PrefStore { source: PrefStoreError },

    /// File read/write error
    #[snafu(display("{path:?}: {source}"))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Some other error occurred
    #[snafu(display("{message}"))]
    Other { message: String },
}

impl CarlogError {
    /// Shorthand for local validation failures, which never carry field details.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields: FieldErrors::default(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for failures caused by the backup file contents rather than the network.
    pub fn is_bad_backup_file(&self) -> bool {
        matches!(self, Self::CorruptBackup { .. } | Self::InvalidBackup { .. })
    }

    /// Returns the backend message for a field, if this is a validation error that has one.
    pub fn field_error(&self, field: &str) -> Option<&str> {
        match self {
            Self::Validation { fields, .. } => fields.get(field),
            _ => None,
        }
    }
}

/// Errors arising from `PrefStore`
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PrefStoreError {
    /// Problem accessing the preferences file
    #[snafu(display("preferences file {path:?} {source}"))]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Preferences file exists but is not a json object of strings
    #[snafu(display("preferences file {path:?} is not valid: {source}"))]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[snafu(display("preferences configuration error: {message}"))]
    Config { message: String },

    /// Other error type - can be used by external implementations
    #[snafu(display("preferences {message}"))]
    External { message: String },
}

impl From<PrefStoreError> for CarlogError {
    fn from(source: PrefStoreError) -> Self {
        Self::PrefStore { source }
    }
}

/// Field-level validation messages, keyed by the field path reported by the backend.
///
/// A backend location of `["body", "fields", 0, "name"]` is keyed as `fields.0.name`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        // first message wins, same as the ui lookup
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

// FastAPI error body: `{"detail": "text"}` or `{"detail": [{"loc": [...], "msg": "..."}]}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Text(String),
    Items(Vec<ErrorItem>),
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    #[serde(default)]
    loc: Vec<LocPart>,
    msg: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LocPart {
    Index(u64),
    Name(String),
}

impl fmt::Display for LocPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(n) => write!(f, "{n}"),
            Self::Name(s) => f.write_str(s),
        }
    }
}

/// Message and per-field errors extracted from an error response body.
#[derive(Debug, Default)]
pub(crate) struct ParsedDetail {
    pub message: Option<String>,
    pub fields: FieldErrors,
}

/// Extracts the user-facing message from a backend error body.
/// For a list of errors, the message is the first `msg`.
pub(crate) fn parse_error_detail(body: &[u8]) -> ParsedDetail {
    let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) else {
        return ParsedDetail::default();
    };
    match parsed.detail {
        ErrorDetail::Text(message) => ParsedDetail {
            message: Some(message),
            fields: FieldErrors::default(),
        },
        ErrorDetail::Items(items) => {
            let mut fields = FieldErrors::default();
            for item in &items {
                // loc[0] is the request part ("body", "query", "path")
                let key = item
                    .loc
                    .iter()
                    .skip(1)
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(".");
                if !key.is_empty() {
                    fields.insert(key, item.msg.clone());
                }
            }
            ParsedDetail {
                message: items.first().map(|item| item.msg.clone()),
                fields,
            }
        }
    }
}
