#[macro_use] extern crate log;

pub mod ast;
pub mod compiler;
pub mod error;
pub mod helpers;
pub mod parser;
pub mod source_file;
pub mod symtab;

pub use self::compiler::Compiler;
pub use self::error::Error;
