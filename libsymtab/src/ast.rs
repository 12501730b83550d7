use itertools::Itertools;

/// Root of a parsed translation unit, a `Node::FileAST`.
pub type AST = Node;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AggregateKind {
    Struct,
    Union,
}

impl AggregateKind {
    pub fn keyword(&self) -> &'static str {
        match *self {
            AggregateKind::Struct => "struct",
            AggregateKind::Union => "union",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConstantKind {
    Int,
    Float,
    Char,
    String,
}

impl ConstantKind {
    pub fn name(&self) -> &'static str {
        match *self {
            ConstantKind::Int => "int",
            ConstantKind::Float => "double",
            ConstantKind::Char => "char",
            ConstantKind::String => "string",
        }
    }
}

/// A single `name [= value]` entry of an enum specifier.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Enumerator {
    pub name: String,
    pub value: Option<Box<Node>>,
}

/// A declaration of one name. `name` is absent for bare struct/union/enum
/// declarations (`struct point { int x; };`) and abstract parameters.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Declaration {
    pub name: Option<String>,
    pub quals: Vec<String>,
    pub storage: Vec<String>,
    pub tipe: Box<Node>,
    pub init: Option<Box<Node>>,
    pub bitsize: Option<Box<Node>>,
}

impl Declaration {
    pub fn new(name: Option<String>, tipe: Node) -> Self {
        Self {
            name: name,
            quals: Vec::new(),
            storage: Vec::new(),
            tipe: Box::new(tipe),
            init: None,
            bitsize: None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Typedef {
    pub name: String,
    pub quals: Vec<String>,
    pub tipe: Box<Node>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Node {
    FileAST(Vec<Node>),
    FuncDef { decl: Box<Node>, body: Box<Node> },
    Decl(Declaration),
    Typedef(Typedef),

    // Declarators, innermost `TypeDecl` carries the declared name.
    TypeDecl { declname: Option<String>, quals: Vec<String>, tipe: Box<Node> },
    ArrayDecl { tipe: Box<Node>, dim: Option<Box<Node>> },
    PtrDecl { quals: Vec<String>, tipe: Box<Node> },
    FuncDecl { args: Box<Node>, tipe: Box<Node> },
    ParamList(Vec<Node>),
    EllipsisParam,

    // Type specifiers
    IdentifierType(Vec<String>),
    Aggregate { kind: AggregateKind, name: Option<String>, members: Option<Vec<Node>> },
    Enum { name: Option<String>, enumerators: Option<Vec<Enumerator>> },

    // Expressions are not analysed, only carried as text.
    Constant { kind: ConstantKind, value: String },
    Expression(String),

    // Statements
    Compound(Vec<Node>),
    DeclList(Vec<Node>),
    If { cond: Box<Node>, then: Box<Node>, otherwise: Option<Box<Node>> },
    While { cond: Box<Node>, body: Box<Node> },
    DoWhile { cond: Box<Node>, body: Box<Node> },
    For {
        init: Option<Box<Node>>,
        cond: Option<Box<Node>>,
        next: Option<Box<Node>>,
        body: Box<Node>,
    },
    Switch { cond: Box<Node>, body: Box<Node> },
    Case { expr: Box<Node>, body: Box<Node> },
    Default(Box<Node>),
    Label { name: String, body: Box<Node> },
    Return(Option<Box<Node>>),
    Goto(String),
    Break,
    Continue,
    EmptyStatement,
}

impl Node {

    pub fn type_decl(declname: &str, names: &[&str]) -> Node {
        Node::TypeDecl {
            declname: Some(declname.to_string()),
            quals: Vec::new(),
            tipe: Box::new(Node::identifier_type(names)),
        }
    }

    pub fn identifier_type(names: &[&str]) -> Node {
        Node::IdentifierType(names.iter().map(|name| name.to_string()).collect())
    }

    pub fn array_decl(tipe: Node, dim: &str) -> Node {
        Node::ArrayDecl {
            tipe: Box::new(tipe),
            dim: Some(Box::new(Node::int_constant(dim))),
        }
    }

    pub fn int_constant(value: &str) -> Node {
        Node::Constant { kind: ConstantKind::Int, value: value.to_string() }
    }

    pub fn decl(name: &str, tipe: Node) -> Node {
        Node::Decl(Declaration::new(Some(name.to_string()), tipe))
    }

    pub fn typedef(name: &str, tipe: Node) -> Node {
        Node::Typedef(Typedef {
            name: name.to_string(),
            quals: Vec::new(),
            tipe: Box::new(tipe),
        })
    }

    pub fn func_decl(params: Vec<Node>, tipe: Node) -> Node {
        Node::FuncDecl {
            args: Box::new(Node::ParamList(params)),
            tipe: Box::new(tipe),
        }
    }

    pub fn func_def(decl: Node, body: Vec<Node>) -> Node {
        Node::FuncDef {
            decl: Box::new(decl),
            body: Box::new(Node::Compound(body)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match *self {
            Node::FileAST(_) => "FileAST",
            Node::FuncDef { .. } => "FuncDef",
            Node::Decl(_) => "Decl",
            Node::Typedef(_) => "Typedef",
            Node::TypeDecl { .. } => "TypeDecl",
            Node::ArrayDecl { .. } => "ArrayDecl",
            Node::PtrDecl { .. } => "PtrDecl",
            Node::FuncDecl { .. } => "FuncDecl",
            Node::ParamList(_) => "ParamList",
            Node::EllipsisParam => "EllipsisParam",
            Node::IdentifierType(_) => "IdentifierType",
            Node::Aggregate { kind: AggregateKind::Struct, .. } => "Struct",
            Node::Aggregate { kind: AggregateKind::Union, .. } => "Union",
            Node::Enum { .. } => "Enum",
            Node::Constant { .. } => "Constant",
            Node::Expression(_) => "Expression",
            Node::Compound(_) => "Compound",
            Node::DeclList(_) => "DeclList",
            Node::If { .. } => "If",
            Node::While { .. } => "While",
            Node::DoWhile { .. } => "DoWhile",
            Node::For { .. } => "For",
            Node::Switch { .. } => "Switch",
            Node::Case { .. } => "Case",
            Node::Default(_) => "Default",
            Node::Label { .. } => "Label",
            Node::Return(_) => "Return",
            Node::Goto(_) => "Goto",
            Node::Break => "Break",
            Node::Continue => "Continue",
            Node::EmptyStatement => "EmptyStatement",
        }
    }

    pub fn name(&self) -> Option<&str> {
        match *self {
            Node::Decl(ref decl) => decl.name.as_ref().map(String::as_str),
            Node::Typedef(ref typedef) => Some(&typedef.name),
            Node::TypeDecl { ref declname, .. } => declname.as_ref().map(String::as_str),
            Node::Aggregate { ref name, .. } => name.as_ref().map(String::as_str),
            Node::Enum { ref name, .. } => name.as_ref().map(String::as_str),
            Node::Label { ref name, .. } => Some(name),
            Node::Goto(ref name) => Some(name),
            _ => None,
        }
    }

    /// Named sub-nodes in document order. List-like nodes repeat the same
    /// name for every element.
    pub fn children(&self) -> Vec<(&'static str, &Node)> {
        let mut children = Vec::new();
        match *self {
            Node::FileAST(ref ext) => {
                children.extend(ext.iter().map(|node| ("ext", node)));
            },
            Node::FuncDef { ref decl, ref body } => {
                children.push(("decl", &**decl));
                children.push(("body", &**body));
            },
            Node::Decl(ref decl) => {
                children.push(("type", &*decl.tipe));
                push_optional(&mut children, "init", &decl.init);
                push_optional(&mut children, "bitsize", &decl.bitsize);
            },
            Node::Typedef(ref typedef) => children.push(("type", &*typedef.tipe)),
            Node::TypeDecl { ref tipe, .. } => children.push(("type", &**tipe)),
            Node::ArrayDecl { ref tipe, ref dim } => {
                children.push(("type", &**tipe));
                push_optional(&mut children, "dim", dim);
            },
            Node::PtrDecl { ref tipe, .. } => children.push(("type", &**tipe)),
            Node::FuncDecl { ref args, ref tipe } => {
                children.push(("args", &**args));
                children.push(("type", &**tipe));
            },
            Node::ParamList(ref params) => {
                children.extend(params.iter().map(|node| ("params", node)));
            },
            Node::Aggregate { members: Some(ref members), .. } => {
                children.extend(members.iter().map(|node| ("decls", node)));
            },
            Node::Enum { enumerators: Some(ref enumerators), .. } => {
                for enumerator in enumerators {
                    push_optional(&mut children, "value", &enumerator.value);
                }
            },
            Node::Compound(ref items) => {
                children.extend(items.iter().map(|node| ("block_items", node)));
            },
            Node::DeclList(ref decls) => {
                children.extend(decls.iter().map(|node| ("decls", node)));
            },
            Node::If { ref cond, ref then, ref otherwise } => {
                children.push(("cond", &**cond));
                children.push(("iftrue", &**then));
                push_optional(&mut children, "iffalse", otherwise);
            },
            Node::While { ref cond, ref body } | Node::DoWhile { ref cond, ref body } => {
                children.push(("cond", &**cond));
                children.push(("stmt", &**body));
            },
            Node::For { ref init, ref cond, ref next, ref body } => {
                push_optional(&mut children, "init", init);
                push_optional(&mut children, "cond", cond);
                push_optional(&mut children, "next", next);
                children.push(("stmt", &**body));
            },
            Node::Switch { ref cond, ref body } => {
                children.push(("cond", &**cond));
                children.push(("stmt", &**body));
            },
            Node::Case { ref expr, ref body } => {
                children.push(("expr", &**expr));
                children.push(("stmt", &**body));
            },
            Node::Default(ref body) | Node::Label { ref body, .. } => {
                children.push(("stmt", &**body));
            },
            Node::Return(ref expr) => push_optional(&mut children, "expr", expr),
            _ => (),
        }
        children
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children().into_iter()
            .find(|&(child_name, _)| child_name == name)
            .map(|(_, node)| node)
    }

    /// Indented one-node-per-line dump of the tree.
    pub fn show(&self) -> String {
        let mut buf = String::new();
        self.show_into(&mut buf, 0);
        buf
    }

    fn show_into(&self, buf: &mut String, depth: usize) {
        buf.push_str(&"  ".repeat(depth));
        buf.push_str(self.kind());
        buf.push(':');
        if let Some(attributes) = self.attributes() {
            buf.push(' ');
            buf.push_str(&attributes);
        }
        buf.push('\n');
        for (_, child) in self.children() {
            child.show_into(buf, depth + 1);
        }
    }

    fn attributes(&self) -> Option<String> {
        match *self {
            Node::Decl(ref decl) => Some(format!(
                "{}, {}, {}",
                decl.name.as_ref().map(String::as_str).unwrap_or("None"),
                show_list(&decl.quals),
                show_list(&decl.storage),
            )),
            Node::Typedef(ref typedef) => {
                Some(format!("{}, {}", typedef.name, show_list(&typedef.quals)))
            },
            Node::TypeDecl { ref declname, ref quals, .. } => Some(format!(
                "{}, {}",
                declname.as_ref().map(String::as_str).unwrap_or("None"),
                show_list(quals),
            )),
            Node::PtrDecl { ref quals, .. } => Some(show_list(quals)),
            Node::IdentifierType(ref names) => Some(show_list(names)),
            Node::Aggregate { ref name, .. } | Node::Enum { ref name, .. } => {
                name.clone()
            },
            Node::Constant { ref kind, ref value } => Some(format!("{}, {}", kind.name(), value)),
            Node::Expression(ref text) => Some(text.clone()),
            Node::Label { ref name, .. } | Node::Goto(ref name) => Some(name.clone()),
            _ => None,
        }
    }
}

fn push_optional<'a>(
    children: &mut Vec<(&'static str, &'a Node)>,
    name: &'static str,
    node: &'a Option<Box<Node>>,
) {
    if let Some(ref node) = *node {
        children.push((name, &**node));
    }
}

fn show_list(items: &[String]) -> String {
    format!("[{}]", items.iter().map(|item| format!("'{}'", item)).join(", "))
}

#[test]
fn test_declaration_children_are_named() {
    let decl = Node::decl("q", Node::array_decl(Node::type_decl("q", &["int"]), "100"));
    let array = decl.child("type").unwrap();
    assert_eq!(array.kind(), "ArrayDecl");
    assert_eq!(array.child("dim"), Some(&Node::int_constant("100")));
    assert_eq!(array.child("type").and_then(Node::name), Some("q"));
    assert!(decl.child("init").is_none());
}

#[test]
fn test_show_indents_by_depth() {
    let ast = Node::FileAST(vec![Node::decl("z", Node::type_decl("z", &["int"]))]);
    assert_eq!(
        ast.show(),
        "FileAST:\n  Decl: z, [], []\n    TypeDecl: z, []\n      IdentifierType: ['int']\n"
    );
}

#[test]
fn test_function_definition_children() {
    let func = Node::func_def(
        Node::decl("main", Node::func_decl(vec![], Node::type_decl("main", &["int"]))),
        vec![Node::Return(Some(Box::new(Node::int_constant("0"))))],
    );
    let kinds: Vec<_> = func.children().iter().map(|&(name, node)| (name, node.kind())).collect();
    assert_eq!(kinds, vec![("decl", "Decl"), ("body", "Compound")]);
}
