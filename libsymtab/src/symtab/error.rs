use thiserror::Error;

pub type SymbolTableResult<T> = Result<T, SymbolTableError>;

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum SymbolTableError {
    #[error("symbol '{name}' not found in scope '{scope}'")]
    KeyNotFound { name: String, scope: String },

    #[error("cannot leave scope: scope path is already empty")]
    EmptyPathUnderflow,

    #[error("scope path '{path}' does not lead to a scope")]
    NotAScope { path: String },

    #[error("scope path '{path}' does not lead to a parameter list")]
    NotAParameterList { path: String },

    #[error("malformed {kind} node: {reason}")]
    MalformedNode { kind: &'static str, reason: String },
}

impl SymbolTableError {
    pub fn malformed<S: Into<String>>(kind: &'static str, reason: S) -> Self {
        SymbolTableError::MalformedNode {
            kind: kind,
            reason: reason.into(),
        }
    }
}
