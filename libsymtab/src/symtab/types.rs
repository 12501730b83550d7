use itertools::Itertools;
use std::fmt;
use super::super::ast::Node;
use super::error::{SymbolTableError, SymbolTableResult};

/// Normalized type of a declared name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TypeDescriptor {
    /// Specifier words as written, e.g. `["unsigned", "int"]` or a typedef name.
    Named(Vec<String>),
    /// Dimension kept verbatim; `None` for `[]`.
    Array { length: Option<String>, element: Box<TypeDescriptor> },
    /// Declarator shapes that are not normalized (pointers, functions,
    /// struct/union/enum typed declarators).
    Opaque(Box<Node>),
}

impl TypeDescriptor {

    pub fn named(name: &str) -> Self {
        TypeDescriptor::Named(name.split_whitespace().map(String::from).collect())
    }

    pub fn array(length: &str, element: TypeDescriptor) -> Self {
        TypeDescriptor::Array {
            length: Some(length.to_string()),
            element: Box::new(element),
        }
    }

    pub fn is_opaque(&self) -> bool {
        match *self {
            TypeDescriptor::Opaque(_) => true,
            _ => false,
        }
    }

    /// True for a plain struct/union typed declarator.
    pub fn is_aggregate(&self) -> bool {
        match *self {
            TypeDescriptor::Opaque(ref node) => match **node {
                Node::TypeDecl { ref tipe, .. } => match **tipe {
                    Node::Aggregate { .. } => true,
                    _ => false,
                },
                _ => false,
            },
            _ => false,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TypeDescriptor::Named(ref names) => write!(f, "{}", names.iter().join(" ")),
            TypeDescriptor::Array { ref length, ref element } => {
                write!(f, "({}, {})", length.as_ref().map(String::as_str).unwrap_or(""), element)
            },
            TypeDescriptor::Opaque(ref node) => write!(f, "<{}>", describe_declarator(node)),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub descriptor: TypeDescriptor,
}

impl Parameter {
    pub fn new<S: Into<String>>(name: S, descriptor: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(\"{}\", {})", self.name, self.descriptor)
    }
}

/// Normalizes a declarator sub-tree. Scalars and typedef names become
/// `Named`, arrays become `Array`, everything else passes through as `Opaque`.
pub fn extract_type(declarator: &Node) -> SymbolTableResult<TypeDescriptor> {
    match *declarator {
        Node::TypeDecl { ref tipe, .. } => match **tipe {
            Node::IdentifierType(ref names) => Ok(TypeDescriptor::Named(names.clone())),
            _ => Ok(TypeDescriptor::Opaque(Box::new(declarator.clone()))),
        },
        Node::ArrayDecl { ref tipe, ref dim } => {
            let length = match *dim {
                Some(ref dim) => Some(dimension_text(dim)?),
                None => None,
            };
            Ok(TypeDescriptor::Array {
                length: length,
                element: Box::new(extract_type(tipe)?),
            })
        },
        Node::PtrDecl { .. } | Node::FuncDecl { .. } => {
            Ok(TypeDescriptor::Opaque(Box::new(declarator.clone())))
        },
        ref other => Err(SymbolTableError::malformed(
            other.kind(),
            "expected a declarator",
        )),
    }
}

fn dimension_text(dim: &Node) -> SymbolTableResult<String> {
    match *dim {
        Node::Constant { ref value, .. } => Ok(value.clone()),
        Node::Expression(ref text) => Ok(text.clone()),
        ref other => Err(SymbolTableError::malformed(
            other.kind(),
            "array dimension must be a constant or an expression",
        )),
    }
}

/// Short English rendering of a declarator, used for opaque descriptors.
pub fn describe_declarator(node: &Node) -> String {
    match *node {
        Node::TypeDecl { ref tipe, .. } => describe_declarator(tipe),
        Node::IdentifierType(ref names) => names.iter().join(" "),
        Node::Aggregate { ref kind, ref name, .. } => {
            format!("{} {}", kind.keyword(), name.as_ref().map(String::as_str).unwrap_or("<anonymous>"))
        },
        Node::Enum { ref name, .. } => {
            format!("enum {}", name.as_ref().map(String::as_str).unwrap_or("<anonymous>"))
        },
        Node::PtrDecl { ref tipe, .. } => format!("pointer to {}", describe_declarator(tipe)),
        Node::ArrayDecl { ref tipe, ref dim } => {
            let length = match *dim {
                Some(ref dim) => dimension_text(dim).unwrap_or_default(),
                None => String::new(),
            };
            format!("array[{}] of {}", length, describe_declarator(tipe))
        },
        Node::FuncDecl { ref tipe, .. } => format!("function returning {}", describe_declarator(tipe)),
        ref other => other.kind().to_string(),
    }
}

#[test]
fn test_extract_scalar() {
    let node = Node::type_decl("z", &["unsigned", "int"]);
    assert_eq!(extract_type(&node), Ok(TypeDescriptor::named("unsigned int")));
}

#[test]
fn test_extract_nested_array() {
    let node = Node::array_decl(Node::array_decl(Node::type_decl("m", &["char"]), "3"), "2");
    assert_eq!(
        extract_type(&node),
        Ok(TypeDescriptor::array("2", TypeDescriptor::array("3", TypeDescriptor::named("char"))))
    );
}

#[test]
fn test_extract_expression_dimension_is_verbatim() {
    let node = Node::ArrayDecl {
        tipe: Box::new(Node::type_decl("buf", &["char"])),
        dim: Some(Box::new(Node::Expression("SIZE * 2".to_string()))),
    };
    assert_eq!(extract_type(&node).unwrap().to_string(), "(SIZE * 2, char)");
}

#[test]
fn test_extract_pointer_is_opaque() {
    let node = Node::PtrDecl {
        quals: vec![],
        tipe: Box::new(Node::type_decl("p", &["int"])),
    };
    let descriptor = extract_type(&node).unwrap();
    assert!(descriptor.is_opaque());
    assert!(!descriptor.is_aggregate());
    assert_eq!(descriptor.to_string(), "<pointer to int>");
}

#[test]
fn test_extract_rejects_non_declarator() {
    match extract_type(&Node::int_constant("1")) {
        Err(SymbolTableError::MalformedNode { kind, .. }) => assert_eq!(kind, "Constant"),
        other => panic!("unexpected result: {:?}", other),
    }
}
