use super::ast::AST;
use super::error::Error;
use super::parser;
use super::source_file::SourceFile;
use super::symtab::{self, SymbolTable};

/// Program used when no source is given on the command line.
pub const DEMO_SOURCE: &str = "
typedef struct foobar {
    int f;
    int b;
    struct foobar * fb;
} foobar;
int q[100];
foobar w[100];
int z;
int foo(int a, int b) {
    int x;
    int y;
    return (x+y);
};
int bar(int c, int d) {
    int y;
    int z;
};
test() {};
typedef int strange_unit;
strange_unit bob;
";

pub struct Compiler {

}

pub type CompilerResult<T> = Result<T, Error>;

impl Compiler {

    pub fn new() -> Compiler {
        Compiler {
        }
    }

    pub fn compile(&self, path: &str) -> CompilerResult<SymbolTable> {
        let sf = SourceFile::load(path).map_err(|e| Error::Io {
            path: path.to_string(),
            source: e,
        })?;
        self.compile_source(&sf.body)
    }

    pub fn compile_source(&self, source: &str) -> CompilerResult<SymbolTable> {
        let ast = self.parse_source(source)?;
        Ok(symtab::build(&ast)?)
    }

    pub fn parse_source(&self, source: &str) -> CompilerResult<AST> {
        let tokens = parser::lex(source).map_err(Error::Lex)?;
        parser::parse(tokens).map_err(Error::Parse)
    }

}

#[cfg(test)]
use super::symtab::{ScopeEntry, TypeDescriptor, Parameter};

#[test]
fn test_simple_compile() {
    use std::io::{Seek, SeekFrom, Write};

    let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
    write!(tmpfile, "int z;").unwrap();
    tmpfile.seek(SeekFrom::Start(0)).unwrap();

    let table = Compiler::new().compile(tmpfile.path().to_str().unwrap()).unwrap();
    assert_eq!(table.symbols.descriptor("z"), Some(&TypeDescriptor::named("int")));
}

#[test]
fn test_missing_file() {
    match Compiler::new().compile("/nonexistent/source.c") {
        Err(Error::Io { ref path, .. }) => assert_eq!(path, "/nonexistent/source.c"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_demo_program() {
    let table = Compiler::new().compile_source(DEMO_SOURCE).unwrap();
    let int = TypeDescriptor::named("int");

    assert_eq!(table.symbols.descriptor("z"), Some(&int));
    assert_eq!(table.symbols.descriptor("q"), Some(&TypeDescriptor::array("100", int.clone())));
    assert_eq!(
        table.symbols.descriptor("w"),
        Some(&TypeDescriptor::array("100", TypeDescriptor::named("foobar")))
    );
    assert_eq!(table.symbols.descriptor("bob"), Some(&TypeDescriptor::named("strange_unit")));

    let foo = table.symbols.scope("foo").unwrap();
    assert_eq!(
        foo.parameters().unwrap(),
        &[Parameter::new("a", int.clone()), Parameter::new("b", int.clone())][..]
    );
    assert_eq!(foo.return_type(), Some(&int));
    assert_eq!(foo.descriptor("x"), Some(&int));
    assert_eq!(foo.descriptor("y"), Some(&int));

    let bar = table.symbols.scope("bar").unwrap();
    assert_eq!(bar.parameters().map(|params| params.len()), Some(2));
    assert_eq!(bar.descriptor("y"), Some(&int));
    assert_eq!(bar.descriptor("z"), Some(&int));

    let test = table.symbols.scope("test").unwrap();
    assert_eq!(test.parameters(), Some(&[][..]));
    assert_eq!(test.return_type(), Some(&int));

    assert_eq!(table.type_aliases.descriptor("strange_unit"), Some(&int));
    assert_eq!(table.type_aliases.get("foobar"), Some(&ScopeEntry::Scope(Default::default())));
    assert_eq!(table.type_aliases.len(), 2);
    assert_eq!(table.symbols.len(), 7);
}

#[test]
fn test_block_locals_land_in_function_scope() {
    let table = Compiler::new().compile_source("
        void run(int n) {
            for (int i = 0; i < n; i++) {
                int inner;
            }
        }
    ").unwrap();
    let run = table.symbols.scope("run").unwrap();
    assert!(run.contains_key("i"));
    assert!(run.contains_key("inner"));
    assert_eq!(run.return_type(), Some(&TypeDescriptor::named("void")));
}

#[test]
fn test_opaque_shapes_are_kept() {
    let table = Compiler::new().compile_source("
        typedef struct node { int value; } node_t;
        int *cursor;
        int (*handler)(int);
        node_t *head(node_t *list) { return list; }
    ").unwrap();
    assert!(table.symbols.descriptor("cursor").unwrap().is_opaque());
    assert!(table.symbols.descriptor("handler").unwrap().is_opaque());
    assert_eq!(table.symbols.descriptor("cursor").unwrap().to_string(), "<pointer to int>");

    let head = table.symbols.scope("head").unwrap();
    assert_eq!(head.return_type().unwrap().to_string(), "<pointer to node_t>");
    assert_eq!(head.parameters().unwrap()[0].name, "list");
}

#[test]
fn test_parse_failure_is_reported() {
    match Compiler::new().compile_source("int foo( {") {
        Err(Error::Parse(_)) => (),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_rendered_table() {
    let table = Compiler::new().compile_source("int z; int f(char c) { long l; }").unwrap();
    assert_eq!(
        table.to_string(),
        "symbols:\n{\n    \"f\": {\n        \"...\": [(\"c\", char)],\n        \"l\": long,\n        \"return\": int,\n    },\n    \"z\": int,\n}\ntype aliases:\n{}"
    );
}

#[test]
fn test_unnamed_and_variadic_parameters_from_source() {
    let table = Compiler::new().compile_source("int f(int, int b, ...) { }").unwrap();
    let f = table.symbols.scope("f").unwrap();
    assert_eq!(f.parameters().unwrap(), &[Parameter::new("b", TypeDescriptor::named("int"))][..]);
}
