use itertools::Itertools;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use super::error::{SymbolTableError, SymbolTableResult};
use super::types::{Parameter, TypeDescriptor};

/// Key of the parameter list inside a function scope.
pub const PARAMETERS_KEY: &str = "...";
/// Key of the return type inside a function scope.
pub const RETURN_KEY: &str = "return";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ScopeEntry {
    Descriptor(TypeDescriptor),
    Scope(Scope),
    Parameters(Vec<Parameter>),
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Scope {
    entries: BTreeMap<String, ScopeEntry>,
}

impl Scope {

    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ScopeEntry> {
        self.entries.get(name)
    }

    pub fn insert(&mut self, name: String, entry: ScopeEntry) -> Option<ScopeEntry> {
        self.entries.insert(name, entry)
    }

    pub fn remove(&mut self, name: &str) -> Option<ScopeEntry> {
        self.entries.remove(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ScopeEntry> {
        self.entries.iter()
    }

    pub fn descriptor(&self, name: &str) -> Option<&TypeDescriptor> {
        match self.get(name) {
            Some(&ScopeEntry::Descriptor(ref descriptor)) => Some(descriptor),
            _ => None,
        }
    }

    pub fn scope(&self, name: &str) -> Option<&Scope> {
        match self.get(name) {
            Some(&ScopeEntry::Scope(ref scope)) => Some(scope),
            _ => None,
        }
    }

    pub fn parameters(&self) -> Option<&[Parameter]> {
        match self.get(PARAMETERS_KEY) {
            Some(&ScopeEntry::Parameters(ref params)) => Some(params),
            _ => None,
        }
    }

    pub fn return_type(&self) -> Option<&TypeDescriptor> {
        self.descriptor(RETURN_KEY)
    }

    fn render(&self, f: &mut fmt::Formatter, indent: usize) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "{{}}");
        }
        writeln!(f, "{{")?;
        for (name, entry) in self.iter() {
            write!(f, "{}\"{}\": ", "    ".repeat(indent + 1), name)?;
            entry.render(f, indent + 1)?;
            writeln!(f, ",")?;
        }
        write!(f, "{}}}", "    ".repeat(indent))
    }
}

impl ScopeEntry {
    fn render(&self, f: &mut fmt::Formatter, indent: usize) -> fmt::Result {
        match *self {
            ScopeEntry::Descriptor(ref descriptor) => write!(f, "{}", descriptor),
            ScopeEntry::Scope(ref scope) => scope.render(f, indent),
            ScopeEntry::Parameters(ref params) => write!(f, "[{}]", params.iter().join(", ")),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.render(f, 0)
    }
}

/// Mutable handle to whatever the current path points at.
#[derive(Debug)]
pub enum CurrentScope<'a> {
    Scope(&'a mut Scope),
    Parameters(&'a mut Vec<Parameter>),
}

/// A rooted tree of scopes addressed through a current path. Reads and
/// writes only ever touch the scope at the end of the path; there is no
/// fallback to enclosing scopes.
#[derive(Debug, Default)]
pub struct ScopePath {
    root: Scope,
    path: Vec<String>,
}

impl ScopePath {

    pub fn new() -> Self {
        Self {
            root: Scope::new(),
            path: Vec::new(),
        }
    }

    pub fn read(&self, name: &str) -> SymbolTableResult<&ScopeEntry> {
        self.resolve()?.get(name).ok_or_else(|| SymbolTableError::KeyNotFound {
            name: name.to_string(),
            scope: describe_path(&self.path),
        })
    }

    pub fn write<S: Into<String>>(&mut self, name: S, entry: ScopeEntry)
        -> SymbolTableResult<Option<ScopeEntry>>
    {
        let name = name.into();
        debug!("write({:?}, {:?}) at {}", name, entry, describe_path(&self.path));
        match self.current_scope_mut()? {
            CurrentScope::Scope(scope) => Ok(scope.insert(name, entry)),
            CurrentScope::Parameters(_) => Err(SymbolTableError::NotAScope {
                path: describe_path(&self.path),
            }),
        }
    }

    /// Removes `name` from the current scope, returning it if present.
    pub fn take(&mut self, name: &str) -> SymbolTableResult<Option<ScopeEntry>> {
        match self.current_scope_mut()? {
            CurrentScope::Scope(scope) => Ok(scope.remove(name)),
            CurrentScope::Parameters(_) => Err(SymbolTableError::NotAScope {
                path: describe_path(&self.path),
            }),
        }
    }

    /// Descends into `segment`, which must already be a scope or parameter
    /// list at the current level.
    pub fn push<S: Into<String>>(&mut self, segment: S) -> SymbolTableResult<()> {
        let segment = segment.into();
        match *self.read(&segment)? {
            ScopeEntry::Descriptor(_) => {
                let mut path = self.path.clone();
                path.push(segment);
                return Err(SymbolTableError::NotAScope { path: describe_path(&path) });
            },
            _ => (),
        }
        debug!("push({:?})", segment);
        self.path.push(segment);
        Ok(())
    }

    pub fn pop(&mut self) -> SymbolTableResult<String> {
        match self.path.pop() {
            Some(segment) => {
                debug!("pop() -> {:?}", segment);
                Ok(segment)
            },
            None => {
                error!("unbalanced scope path: pop() on an empty path");
                Err(SymbolTableError::EmptyPathUnderflow)
            },
        }
    }

    pub fn current_scope_mut(&mut self) -> SymbolTableResult<CurrentScope<'_>> {
        let mut current = CurrentScope::Scope(&mut self.root);
        for (index, segment) in self.path.iter().enumerate() {
            current = match current {
                CurrentScope::Scope(scope) => match scope.entries.get_mut(segment) {
                    Some(&mut ScopeEntry::Scope(ref mut inner)) => CurrentScope::Scope(inner),
                    Some(&mut ScopeEntry::Parameters(ref mut params)) => {
                        CurrentScope::Parameters(params)
                    },
                    Some(&mut ScopeEntry::Descriptor(_)) => {
                        return Err(SymbolTableError::NotAScope {
                            path: describe_path(&self.path[..index + 1]),
                        })
                    },
                    None => {
                        return Err(SymbolTableError::KeyNotFound {
                            name: segment.clone(),
                            scope: describe_path(&self.path[..index]),
                        })
                    },
                },
                CurrentScope::Parameters(_) => {
                    return Err(SymbolTableError::NotAScope {
                        path: describe_path(&self.path[..index]),
                    })
                },
            };
        }
        Ok(current)
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn root(&self) -> &Scope {
        &self.root
    }

    pub fn into_root(self) -> Scope {
        self.root
    }

    fn resolve(&self) -> SymbolTableResult<&Scope> {
        let mut current = &self.root;
        for (index, segment) in self.path.iter().enumerate() {
            current = match current.get(segment) {
                Some(&ScopeEntry::Scope(ref inner)) => inner,
                Some(_) => {
                    return Err(SymbolTableError::NotAScope {
                        path: describe_path(&self.path[..index + 1]),
                    })
                },
                None => {
                    return Err(SymbolTableError::KeyNotFound {
                        name: segment.clone(),
                        scope: describe_path(&self.path[..index]),
                    })
                },
            };
        }
        Ok(current)
    }
}

fn describe_path(path: &[String]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.iter().join(".")
    }
}

#[test]
fn test_read_write_current_scope() {
    let mut store = ScopePath::new();
    store.write("z", ScopeEntry::Descriptor(TypeDescriptor::named("int"))).unwrap();
    assert_eq!(
        store.read("z"),
        Ok(&ScopeEntry::Descriptor(TypeDescriptor::named("int")))
    );
}

#[test]
fn test_read_does_not_fall_back_to_outer_scope() {
    let mut store = ScopePath::new();
    store.write("z", ScopeEntry::Descriptor(TypeDescriptor::named("int"))).unwrap();
    store.write("foo", ScopeEntry::Scope(Scope::new())).unwrap();
    store.push("foo").unwrap();
    assert_eq!(
        store.read("z"),
        Err(SymbolTableError::KeyNotFound { name: "z".to_string(), scope: "foo".to_string() })
    );
}

#[test]
fn test_push_pop_balance() {
    let mut store = ScopePath::new();
    store.write("foo", ScopeEntry::Scope(Scope::new())).unwrap();
    store.push("foo").unwrap();
    store.write("x", ScopeEntry::Descriptor(TypeDescriptor::named("int"))).unwrap();
    assert_eq!(store.depth(), 1);
    assert_eq!(store.pop(), Ok("foo".to_string()));
    assert_eq!(store.depth(), 0);
    let foo = store.root().scope("foo").unwrap();
    assert_eq!(foo.descriptor("x"), Some(&TypeDescriptor::named("int")));
}

#[test]
fn test_pop_empty_path_fails() {
    let mut store = ScopePath::new();
    assert_eq!(store.pop(), Err(SymbolTableError::EmptyPathUnderflow));
}

#[test]
fn test_push_requires_existing_scope() {
    let mut store = ScopePath::new();
    assert!(store.push("missing").is_err());
    store.write("z", ScopeEntry::Descriptor(TypeDescriptor::named("int"))).unwrap();
    assert_eq!(
        store.push("z"),
        Err(SymbolTableError::NotAScope { path: "z".to_string() })
    );
    assert_eq!(store.depth(), 0);
}

#[test]
fn test_append_to_parameter_list() {
    let mut store = ScopePath::new();
    store.write("foo", ScopeEntry::Scope(Scope::new())).unwrap();
    store.push("foo").unwrap();
    store.write(PARAMETERS_KEY, ScopeEntry::Parameters(Vec::new())).unwrap();
    store.push(PARAMETERS_KEY).unwrap();
    match store.current_scope_mut().unwrap() {
        CurrentScope::Parameters(params) => {
            params.push(Parameter::new("a", TypeDescriptor::named("int")))
        },
        CurrentScope::Scope(_) => panic!("expected a parameter list"),
    }
    assert!(store.write("b", ScopeEntry::Descriptor(TypeDescriptor::named("int"))).is_err());
    store.pop().unwrap();
    let params = store.root().scope("foo").and_then(Scope::parameters).unwrap();
    assert_eq!(params, &[Parameter::new("a", TypeDescriptor::named("int"))][..]);
}

#[test]
fn test_render_nested_scope() {
    let mut store = ScopePath::new();
    store.write("q", ScopeEntry::Descriptor(TypeDescriptor::array("100", TypeDescriptor::named("int")))).unwrap();
    store.write("foo", ScopeEntry::Scope(Scope::new())).unwrap();
    store.push("foo").unwrap();
    store.write(RETURN_KEY, ScopeEntry::Descriptor(TypeDescriptor::named("int"))).unwrap();
    store.write(PARAMETERS_KEY, ScopeEntry::Parameters(vec![
        Parameter::new("a", TypeDescriptor::named("int")),
    ])).unwrap();
    store.pop().unwrap();
    assert_eq!(
        store.root().to_string(),
        "{\n    \"foo\": {\n        \"...\": [(\"a\", int)],\n        \"return\": int,\n    },\n    \"q\": (100, int),\n}"
    );
}
