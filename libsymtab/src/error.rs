use std::io;
use thiserror::Error;
use super::symtab::SymbolTableError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("lexing failed: {0}")]
    Lex(String),

    #[error("parsing failed: {0}")]
    Parse(String),

    #[error(transparent)]
    SymbolTable(#[from] SymbolTableError),
}
