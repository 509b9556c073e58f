use thiserror::Error;

/// Errors surfaced by query construction, pagination, streaming and record copy.
#[derive(Error, Debug)]
pub enum Error {
    /// Caller-supplied criteria were rejected before any request was issued.
    #[error("invalid query: {0}")]
    Validation(String),

    /// A request failed at the transport level or the backend answered non-2xx.
    #[error("{}", transport_message(.status, .message))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// The copy locator matched zero or several source rows.
    #[error(
        "expected exactly one row in table '{table}' matching `{predicate}`, found {matches}"
    )]
    AmbiguousSource {
        table: String,
        predicate: String,
        matches: usize,
    },

    /// An override names a field that cannot be written on the target table.
    #[error("field '{field}' is not a writable field of table '{table}'")]
    InvalidField { field: String, table: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub(crate) fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Error::Transport {
            status,
            message: message.into(),
        }
    }

    /// HTTP status carried by a transport failure, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::transport(err.status().map(|s| s.as_u16()), err.to_string())
    }
}

fn transport_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("request failed ({code}): {message}"),
        None => format!("request failed: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_display_includes_status_when_known() {
        let err = Error::transport(Some(404), "Table 'Pets' not found");
        assert_eq!(err.to_string(), "request failed (404): Table 'Pets' not found");
        assert_eq!(err.status(), Some(404));

        let err = Error::transport(None, "connection reset");
        assert_eq!(err.to_string(), "request failed: connection reset");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn ambiguous_source_names_predicate_and_count() {
        let err = Error::AmbiguousSource {
            table: "Pets".to_string(),
            predicate: "Name='Rex'".to_string(),
            matches: 2,
        };
        let text = err.to_string();
        assert!(text.contains("Name='Rex'"));
        assert!(text.contains("found 2"));
    }
}
