use thiserror::Error;

/// Errors raised by the friends store and its commands
#[derive(Debug, Error)]
pub enum FriendsError {
    #[error("malformed {kind}: \"{text}\"")]
    MalformedRecord { kind: &'static str, text: String },

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("no {kind} found for \"{query}\"")]
    NotFound { kind: &'static str, query: String },

    #[error("more than one {kind} found for \"{query}\": {}", names.join(", "))]
    Ambiguous {
        kind: &'static str,
        query: String,
        names: Vec<String>,
    },

    #[error("more than one {kind} named \"{name}\"")]
    InconsistentMention { kind: &'static str, name: String },

    #[error("{kind} \"{name}\" already exists")]
    DuplicateEntity { kind: &'static str, name: String },

    #[error("{friend} has no {what} \"{value}\"")]
    MissingAnnotation {
        what: &'static str,
        value: String,
        friend: String,
    },

    #[error("invalid name: \"{0}\"")]
    InvalidName(String),

    #[error("unsupported selector: {0}")]
    InvalidSelector(String),

    #[error("could not understand date \"{0}\"")]
    InvalidDate(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FriendsError>;
