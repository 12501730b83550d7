use super::super::ast::{Declaration, Node, Typedef};
use super::error::{SymbolTableError, SymbolTableResult};
use super::scope::{CurrentScope, Scope, ScopeEntry, ScopePath, PARAMETERS_KEY, RETURN_KEY};
use super::types::{describe_declarator, extract_type, Parameter, TypeDescriptor};
use super::SymbolTable;

/// What the next declaration node means to the builder.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VisitMode {
    /// A plain declaration at file scope or inside a function body.
    Ordinary,
    /// The declaration of a function definition; opens the function scope.
    NamingFunction,
    /// A parameter of the function scope being opened.
    InParameterList,
    /// The declarator of a typedef; written to the alias table.
    InTypedef,
}

/// Walks an AST in document order and records every declaration in either
/// the symbol scopes or the type alias table.
#[derive(Debug, Default)]
pub struct SymbolTableBuilder {
    symbols: ScopePath,
    type_aliases: ScopePath,
}

pub trait AstScanner {
    fn scan(&mut self, ast: &Node) -> SymbolTableResult<()>;
}

impl AstScanner for SymbolTableBuilder {

    fn scan(&mut self, ast: &Node) -> SymbolTableResult<()> {
        self.visit(ast, VisitMode::Ordinary)
    }

}

impl SymbolTableBuilder {

    pub fn new() -> Self {
        Self {
            symbols: ScopePath::new(),
            type_aliases: ScopePath::new(),
        }
    }

    pub fn symbols(&self) -> &ScopePath {
        &self.symbols
    }

    pub fn type_aliases(&self) -> &ScopePath {
        &self.type_aliases
    }

    pub fn finish(self) -> SymbolTable {
        SymbolTable {
            symbols: self.symbols.into_root(),
            type_aliases: self.type_aliases.into_root(),
        }
    }

    pub fn visit(&mut self, node: &Node, mode: VisitMode) -> SymbolTableResult<()> {
        match *node {
            Node::FuncDef { ref decl, ref body } => self.visit_function_definition(decl, body),
            Node::Decl(ref decl) => self.visit_declaration(decl, mode),
            Node::Typedef(ref typedef) => self.visit_typedef(typedef),
            _ => self.generic_visit(node, mode),
        }
    }

    fn generic_visit(&mut self, node: &Node, mode: VisitMode) -> SymbolTableResult<()> {
        for (_, child) in node.children() {
            self.visit(child, mode)?;
        }
        Ok(())
    }

    /// Opens one scope through the nested declaration and closes it once
    /// the body has been visited.
    fn visit_function_definition(&mut self, decl: &Node, body: &Node) -> SymbolTableResult<()> {
        match *decl {
            Node::Decl(_) => (),
            ref other => {
                return Err(SymbolTableError::malformed(
                    other.kind(),
                    "function definition must start with a declaration",
                ))
            },
        }
        let depth = self.symbols.depth();
        self.visit(decl, VisitMode::NamingFunction)?;
        self.visit(body, VisitMode::Ordinary)?;
        self.symbols.pop()?;
        debug_assert_eq!(depth, self.symbols.depth());
        Ok(())
    }

    fn visit_declaration(&mut self, decl: &Declaration, mode: VisitMode) -> SymbolTableResult<()> {
        match decl.name {
            Some(ref name) => self.declare(name, &decl.tipe, mode),
            None if mode == VisitMode::NamingFunction => Err(SymbolTableError::malformed(
                "Decl",
                "function definition has no name",
            )),
            None if mode == VisitMode::InParameterList => {
                warn!("skipping unnamed parameter of type {}", describe_declarator(&decl.tipe));
                Ok(())
            },
            None => {
                debug!("skipping anonymous declaration of {}", describe_declarator(&decl.tipe));
                Ok(())
            },
        }
    }

    /// The alias first gets a placeholder scope which the declarator visit
    /// writes into; the written descriptor then replaces the placeholder.
    /// Struct and union aliases keep the empty placeholder.
    fn visit_typedef(&mut self, typedef: &Typedef) -> SymbolTableResult<()> {
        let name = &typedef.name;
        self.type_aliases.write(name.clone(), ScopeEntry::Scope(Scope::new()))?;
        self.type_aliases.push(name.clone())?;
        self.declare(name, &typedef.tipe, VisitMode::InTypedef)?;
        let underlying = self.type_aliases.take(name)?;
        self.type_aliases.pop()?;
        match underlying {
            Some(ScopeEntry::Descriptor(ref descriptor)) if descriptor.is_aggregate() => {
                debug!("typedef '{}' keeps an empty member scope", name);
            },
            Some(entry) => {
                self.type_aliases.write(name.clone(), entry)?;
            },
            None => (),
        }
        Ok(())
    }

    fn declare(&mut self, name: &str, declarator: &Node, mode: VisitMode) -> SymbolTableResult<()> {
        debug!("declare({:?}, {}, {:?})", name, declarator.kind(), mode);
        match mode {
            VisitMode::NamingFunction => self.open_function_scope(name, declarator),
            VisitMode::InParameterList => self.declare_parameter(name, declarator),
            VisitMode::Ordinary | VisitMode::InTypedef => {
                let descriptor = self.describe(name, declarator, mode)?;
                self.store_for(mode).write(name, ScopeEntry::Descriptor(descriptor))?;
                Ok(())
            },
        }
    }

    /// Leaves the path inside the new function scope; the enclosing
    /// `visit_function_definition` pops it.
    fn open_function_scope(&mut self, name: &str, declarator: &Node) -> SymbolTableResult<()> {
        let (params, return_declarator) = match *declarator {
            Node::FuncDecl { ref args, ref tipe } => match **args {
                Node::ParamList(ref params) => (params, tipe),
                ref other => {
                    return Err(SymbolTableError::malformed(
                        other.kind(),
                        format!("function '{}' has no parameter list", name),
                    ))
                },
            },
            ref other => {
                return Err(SymbolTableError::malformed(
                    other.kind(),
                    format!("function '{}' is not declared with a function declarator", name),
                ))
            },
        };

        self.symbols.write(name, ScopeEntry::Scope(Scope::new()))?;
        self.symbols.push(name)?;
        self.symbols.write(PARAMETERS_KEY, ScopeEntry::Parameters(Vec::new()))?;
        self.symbols.push(PARAMETERS_KEY)?;
        for param in params {
            match *param {
                Node::Decl(_) => self.visit(param, VisitMode::InParameterList)?,
                Node::EllipsisParam => (),
                ref other => {
                    return Err(SymbolTableError::malformed(
                        other.kind(),
                        format!("unexpected entry in parameter list of '{}'", name),
                    ))
                },
            }
        }
        let return_type = self.describe(name, return_declarator, VisitMode::NamingFunction)?;
        self.symbols.pop()?;
        self.symbols.write(RETURN_KEY, ScopeEntry::Descriptor(return_type))?;
        Ok(())
    }

    fn declare_parameter(&mut self, name: &str, declarator: &Node) -> SymbolTableResult<()> {
        let descriptor = self.describe(name, declarator, VisitMode::InParameterList)?;
        match self.symbols.current_scope_mut()? {
            CurrentScope::Parameters(params) => {
                params.push(Parameter::new(name, descriptor));
                Ok(())
            },
            CurrentScope::Scope(_) => Err(SymbolTableError::NotAParameterList {
                path: self.symbols.path().join("."),
            }),
        }
    }

    fn describe(&self, name: &str, declarator: &Node, mode: VisitMode)
        -> SymbolTableResult<TypeDescriptor>
    {
        let descriptor = extract_type(declarator)?;
        let expected_placeholder = mode == VisitMode::InTypedef && descriptor.is_aggregate();
        if descriptor.is_opaque() && !expected_placeholder {
            warn!(
                "'{}' has an unresolved declarator shape: {}",
                name,
                describe_declarator(declarator)
            );
        }
        Ok(descriptor)
    }

    fn store_for(&mut self, mode: VisitMode) -> &mut ScopePath {
        match mode {
            VisitMode::InTypedef => &mut self.type_aliases,
            _ => &mut self.symbols,
        }
    }
}

#[cfg(test)]
fn int_decl(name: &str) -> Node {
    Node::decl(name, Node::type_decl(name, &["int"]))
}

#[cfg(test)]
fn function(name: &str, params: Vec<Node>, body: Vec<Node>) -> Node {
    Node::func_def(
        Node::decl(name, Node::func_decl(params, Node::type_decl(name, &["int"]))),
        body,
    )
}

#[cfg(test)]
fn scan(ast: &Node) -> SymbolTableResult<SymbolTable> {
    let mut builder = SymbolTableBuilder::new();
    builder.scan(ast)?;
    assert_eq!(builder.symbols().depth(), 0);
    assert_eq!(builder.type_aliases().depth(), 0);
    Ok(builder.finish())
}

#[test]
fn test_scalar_at_file_scope() {
    let table = scan(&Node::FileAST(vec![int_decl("z")])).unwrap();
    assert_eq!(table.symbols.descriptor("z"), Some(&TypeDescriptor::named("int")));
    assert_eq!(table.symbols.len(), 1);
}

#[test]
fn test_array_at_file_scope() {
    let q = Node::decl("q", Node::array_decl(Node::type_decl("q", &["int"]), "100"));
    let table = scan(&Node::FileAST(vec![q])).unwrap();
    assert_eq!(
        table.symbols.descriptor("q"),
        Some(&TypeDescriptor::array("100", TypeDescriptor::named("int")))
    );
}

#[test]
fn test_function_scope() {
    let foo = function(
        "foo",
        vec![int_decl("a"), int_decl("b")],
        vec![int_decl("x"), int_decl("y")],
    );
    let table = scan(&Node::FileAST(vec![foo])).unwrap();
    let scope = table.symbols.scope("foo").unwrap();
    assert_eq!(
        scope.parameters().unwrap(),
        &[
            Parameter::new("a", TypeDescriptor::named("int")),
            Parameter::new("b", TypeDescriptor::named("int")),
        ][..]
    );
    assert_eq!(scope.return_type(), Some(&TypeDescriptor::named("int")));
    assert_eq!(scope.descriptor("x"), Some(&TypeDescriptor::named("int")));
    assert_eq!(scope.descriptor("y"), Some(&TypeDescriptor::named("int")));
    assert_eq!(scope.len(), 4);
    assert!(!table.symbols.contains_key("x"));
}

#[test]
fn test_parameterless_function() {
    let table = scan(&Node::FileAST(vec![function("test", vec![], vec![])])).unwrap();
    let scope = table.symbols.scope("test").unwrap();
    assert_eq!(scope.parameters(), Some(&[][..]));
    assert_eq!(scope.return_type(), Some(&TypeDescriptor::named("int")));
}

#[test]
fn test_locals_do_not_collide_across_functions() {
    let ast = Node::FileAST(vec![
        function("foo", vec![], vec![int_decl("y"), int_decl("z")]),
        function("bar", vec![], vec![int_decl("y"), int_decl("z")]),
        int_decl("z"),
    ]);
    let table = scan(&ast).unwrap();
    for name in &["foo", "bar"] {
        let scope = table.symbols.scope(name).unwrap();
        assert!(scope.contains_key("y"));
        assert!(scope.contains_key("z"));
    }
    assert_eq!(table.symbols.descriptor("z"), Some(&TypeDescriptor::named("int")));
}

#[test]
fn test_typedef_alias_is_flat() {
    let ast = Node::FileAST(vec![
        Node::typedef("strange_unit", Node::type_decl("strange_unit", &["int"])),
        Node::decl("bob", Node::type_decl("bob", &["strange_unit"])),
    ]);
    let table = scan(&ast).unwrap();
    assert_eq!(
        table.type_aliases.get("strange_unit"),
        Some(&ScopeEntry::Descriptor(TypeDescriptor::named("int")))
    );
    assert_eq!(table.symbols.descriptor("bob"), Some(&TypeDescriptor::named("strange_unit")));
    assert!(!table.symbols.contains_key("strange_unit"));
}

#[test]
fn test_typedef_matches_direct_declaration() {
    let array = |name: &str| Node::array_decl(Node::type_decl(name, &["char"]), "16");
    let ast = Node::FileAST(vec![
        Node::typedef("name_t", array("name_t")),
        Node::decl("name", array("name")),
    ]);
    let table = scan(&ast).unwrap();
    assert_eq!(table.type_aliases.descriptor("name_t"), table.symbols.descriptor("name"));
}

#[test]
fn test_struct_typedef_keeps_placeholder() {
    use super::super::ast::AggregateKind;
    let foobar = Node::TypeDecl {
        declname: Some("foobar".to_string()),
        quals: vec![],
        tipe: Box::new(Node::Aggregate {
            kind: AggregateKind::Struct,
            name: Some("foobar".to_string()),
            members: Some(vec![int_decl("f"), int_decl("b")]),
        }),
    };
    let table = scan(&Node::FileAST(vec![Node::typedef("foobar", foobar)])).unwrap();
    assert_eq!(table.type_aliases.get("foobar"), Some(&ScopeEntry::Scope(Scope::new())));
    assert!(table.symbols.is_empty());
}

#[test]
fn test_malformed_function_definition() {
    let ast = Node::func_def(int_decl("main"), vec![]);
    match scan(&ast) {
        Err(SymbolTableError::MalformedNode { kind, .. }) => assert_eq!(kind, "TypeDecl"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_function_definition_without_declaration() {
    let ast = Node::FuncDef {
        decl: Box::new(Node::int_constant("1")),
        body: Box::new(Node::Compound(vec![])),
    };
    assert!(scan(&ast).is_err());
}

#[test]
fn test_two_builders_agree() {
    let ast = Node::FileAST(vec![
        int_decl("z"),
        function("foo", vec![int_decl("a")], vec![int_decl("x")]),
        Node::typedef("unit", Node::type_decl("unit", &["int"])),
    ]);
    assert_eq!(scan(&ast).unwrap(), scan(&ast).unwrap());
}

#[test]
fn test_unnamed_and_variadic_parameters_are_skipped() {
    use super::super::ast::Declaration;
    let unnamed = Node::Decl(Declaration::new(None, Node::TypeDecl {
        declname: None,
        quals: vec![],
        tipe: Box::new(Node::identifier_type(&["int"])),
    }));
    let f = function("f", vec![unnamed, int_decl("b"), Node::EllipsisParam], vec![]);
    let table = scan(&Node::FileAST(vec![f])).unwrap();
    let scope = table.symbols.scope("f").unwrap();
    assert_eq!(
        scope.parameters().unwrap(),
        &[Parameter::new("b", TypeDescriptor::named("int"))][..]
    );
}

#[test]
fn test_parameter_list_rejects_non_declarations() {
    let f = Node::func_def(
        Node::decl("f", Node::func_decl(
            vec![Node::int_constant("1")],
            Node::type_decl("f", &["int"]),
        )),
        vec![],
    );
    let mut builder = SymbolTableBuilder::new();
    match builder.scan(&Node::FileAST(vec![f])) {
        Err(SymbolTableError::MalformedNode { kind, .. }) => assert_eq!(kind, "Constant"),
        other => panic!("unexpected result: {:?}", other),
    }
}
