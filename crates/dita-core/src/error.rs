use thiserror::Error;

/// Structural failure while decoding a topic. Aborts that topic's conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Attribute error: {0}")]
    Attribute(String),
    #[error("End tag </{found}> without a matching start tag")]
    UnmatchedEnd { found: String },
    #[error("End tag </{found}> does not close <{expected}>")]
    MismatchedEnd { expected: String, found: String },
    #[error("Unexpected end of input inside <{open}>")]
    UnexpectedEof { open: String },
}

/// Non-fatal conversion problem, surfaced alongside a usable fragment.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Diagnostic {
    #[error("did not find topic {path} [{reference}] (from {source_path})")]
    TopicNotFound {
        source_path: String,
        reference: String,
        path: String,
    },
    #[error("unable to extract title from {path} [{reference}] (from {source_path}): {reason}")]
    SelectorTitle {
        source_path: String,
        reference: String,
        path: String,
        reason: String,
    },
    #[error("topic {path} [{reference}] has no slug (from {source_path})")]
    UnresolvedMapping {
        source_path: String,
        reference: String,
        path: String,
    },
    #[error("unable to inline image [{reference}] (from {source_path}): {reason}")]
    MediaUnavailable {
        source_path: String,
        reference: String,
        reason: String,
    },
}

impl Diagnostic {
    /// Path of the topic whose conversion produced this diagnostic.
    pub fn source_path(&self) -> &str {
        match self {
            Diagnostic::TopicNotFound { source_path, .. }
            | Diagnostic::SelectorTitle { source_path, .. }
            | Diagnostic::UnresolvedMapping { source_path, .. }
            | Diagnostic::MediaUnavailable { source_path, .. } => source_path,
        }
    }

    pub fn reference(&self) -> &str {
        match self {
            Diagnostic::TopicNotFound { reference, .. }
            | Diagnostic::SelectorTitle { reference, .. }
            | Diagnostic::UnresolvedMapping { reference, .. }
            | Diagnostic::MediaUnavailable { reference, .. } => reference,
        }
    }
}

/// Corpus-level error recorded while assigning slugs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("title missing in \"{path}\"")]
    TitleMissing { path: String },
    #[error("clashing title \"{title}\" in \"{path}\" and \"{other}\"")]
    ClashingTitle {
        title: String,
        path: String,
        other: String,
    },
}

impl MappingError {
    pub fn path(&self) -> &str {
        match self {
            MappingError::TitleMissing { path } | MappingError::ClashingTitle { path, .. } => path,
        }
    }
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("no element with id \"{0}\"")]
    ElementNotFound(String),
    #[error("element \"{0}\" has no title")]
    TitleMissing(String),
    #[error("malformed content: {0}")]
    Xml(String),
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
