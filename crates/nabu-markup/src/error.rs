use thiserror::Error;

/// A parse error from one markup section.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("markup error at {line}:{col}: {kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// 1-based source line number where the offending marker starts.
    pub line: usize,
    /// 1-based source column number where the offending marker starts.
    pub col: usize,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, line: usize, col: usize) -> Self {
        Self { kind, line, col }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    /// The underlying XML is not well formed (bad nesting, bad attribute syntax, ...).
    #[error("malformed markup: {0}")]
    Malformed(String),

    #[error("expected <{expected}> as the root element, found <{found}>")]
    UnexpectedRoot { expected: String, found: String },

    #[error("unexpected <{found}> inside <{parent}>")]
    UnexpectedElement { found: String, parent: String },

    #[error("<{parent}> accepts a single <{found}>")]
    DuplicateElement { found: String, parent: String },

    #[error("<{parent}> requires a <{element}> child")]
    MissingElement { element: String, parent: String },

    #[error("<{element}> is missing required attribute `{attribute}`")]
    MissingAttribute { element: String, attribute: String },

    #[error("invalid value {value:?} for `{attribute}` on <{element}>: {reason}")]
    InvalidValue {
        element: String,
        attribute: String,
        value: String,
        reason: String,
    },

    #[error("unexpected text content {0:?}")]
    UnexpectedText(String),

    #[error("unexpected end of markup")]
    UnexpectedEof,
}

/// Failure to read a markup bundle from disk.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not a directory")]
    NotADirectory(std::path::PathBuf),
}
