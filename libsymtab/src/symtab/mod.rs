use std::fmt;
use super::ast::AST;

pub use self::error::{SymbolTableError, SymbolTableResult};
pub use self::scope::{CurrentScope, Scope, ScopeEntry, ScopePath, PARAMETERS_KEY, RETURN_KEY};
pub use self::types::{extract_type, Parameter, TypeDescriptor};
pub use self::visitor::{AstScanner, SymbolTableBuilder, VisitMode};

mod error;
mod scope;
mod types;
mod visitor;

/// Final output of one traversal: the symbol scopes and the flat alias table.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SymbolTable {
    pub symbols: Scope,
    pub type_aliases: Scope,
}

impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "symbols:")?;
        writeln!(f, "{}", self.symbols)?;
        writeln!(f, "type aliases:")?;
        write!(f, "{}", self.type_aliases)
    }
}

pub fn build(ast: &AST) -> SymbolTableResult<SymbolTable> {
    let mut builder = SymbolTableBuilder::new();
    builder.scan(ast)?;
    Ok(builder.finish())
}
