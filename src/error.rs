use crate::cfg::NtHandle;

/// Errors that abort the processing of a sentence.
///
/// A search that finds no derivation is not an error; the search functions
/// return `Ok(None)` in that case.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no CFG rule w/ lhs {name}")]
    MalformedGrammar { nt: NtHandle, name: String },
    #[error("edge {edge} refers to missing tail {tail}")]
    DanglingTail { edge: usize, tail: usize },
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidConfig { field: String, reason: String },
    #[error("TOML parse error: {0}")]
    ConfigParse(String),
    #[error("hypergraph has no nodes")]
    EmptyHypergraph,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid(field: &str, reason: &str) -> Self {
        Error::InvalidConfig {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}
