use nom::{
    branch::alt,
    combinator::map,
    multi::many0,
    sequence::{preceded, terminated},
    IResult,
};
use std::collections::HashSet;
use std::fmt;
use super::ast::*;
use super::helpers;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Token {
    Typedef,
    Struct,
    Union,
    Enum,
    If,
    Else,
    While,
    Do,
    For,
    Switch,
    Case,
    Default,
    Return,
    Break,
    Continue,
    Goto,
    TypeSpecifier(String),
    Qualifier(String),
    StorageClass(String),
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenSquareBracket,
    CloseSquareBracket,
    Semicolon,
    Comma,
    Colon,
    Star,
    Equal,
    Ellipsis,
    Operator(String),
    IntLiteral(String),
    FloatLiteral(String),
    CharLiteral(String),
    StringLiteral(String),
    Identifier(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text: &str = match *self {
            Token::Typedef => "typedef",
            Token::Struct => "struct",
            Token::Union => "union",
            Token::Enum => "enum",
            Token::If => "if",
            Token::Else => "else",
            Token::While => "while",
            Token::Do => "do",
            Token::For => "for",
            Token::Switch => "switch",
            Token::Case => "case",
            Token::Default => "default",
            Token::Return => "return",
            Token::Break => "break",
            Token::Continue => "continue",
            Token::Goto => "goto",
            Token::OpenParen => "(",
            Token::CloseParen => ")",
            Token::OpenBrace => "{",
            Token::CloseBrace => "}",
            Token::OpenSquareBracket => "[",
            Token::CloseSquareBracket => "]",
            Token::Semicolon => ";",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Star => "*",
            Token::Equal => "=",
            Token::Ellipsis => "...",
            Token::TypeSpecifier(ref text)
            | Token::Qualifier(ref text)
            | Token::StorageClass(ref text)
            | Token::Operator(ref text)
            | Token::IntLiteral(ref text)
            | Token::FloatLiteral(ref text)
            | Token::CharLiteral(ref text)
            | Token::StringLiteral(ref text)
            | Token::Identifier(ref text) => text,
        };
        write!(f, "{}", text)
    }
}

pub type LexResult<T> = Result<T, String>;

pub fn lex(input: &str) -> LexResult<Vec<Token>> {
    let result: IResult<&str, Vec<Token>> =
        terminated(many0(preceded(helpers::trivia, token)), helpers::trivia)(input);
    match result {
        Ok(("", tokens)) => Ok(tokens),
        Ok((rest, _)) => {
            let line = input[..input.len() - rest.len()].matches('\n').count() + 1;
            let snippet: String = rest.chars().take(20).collect();
            Err(format!("Unrecognized input on line {}: {:?}", line, snippet))
        },
        Err(e) => Err(format!("{:?}", e)),
    }
}

fn token(input: &str) -> IResult<&str, Token> {
    alt((
        map(helpers::identifier, keyword_or_identifier),
        map(helpers::number, |literal: &str| {
            if helpers::is_float_literal(literal) {
                Token::FloatLiteral(literal.to_string())
            } else {
                Token::IntLiteral(literal.to_string())
            }
        }),
        map(helpers::char_literal, |literal: &str| Token::CharLiteral(literal.to_string())),
        map(helpers::string_literal, |literal: &str| Token::StringLiteral(literal.to_string())),
        map(helpers::punctuator, punctuator_token),
    ))(input)
}

fn keyword_or_identifier(word: &str) -> Token {
    match word {
        "typedef" => Token::Typedef,
        "struct" => Token::Struct,
        "union" => Token::Union,
        "enum" => Token::Enum,
        "if" => Token::If,
        "else" => Token::Else,
        "while" => Token::While,
        "do" => Token::Do,
        "for" => Token::For,
        "switch" => Token::Switch,
        "case" => Token::Case,
        "default" => Token::Default,
        "return" => Token::Return,
        "break" => Token::Break,
        "continue" => Token::Continue,
        "goto" => Token::Goto,
        "void" | "char" | "short" | "int" | "long" | "float" | "double"
        | "signed" | "unsigned" | "_Bool" | "_Complex" => Token::TypeSpecifier(word.to_string()),
        "const" | "volatile" | "restrict" => Token::Qualifier(word.to_string()),
        "static" | "extern" | "auto" | "register" | "inline" => {
            Token::StorageClass(word.to_string())
        },
        _ => Token::Identifier(word.to_string()),
    }
}

fn punctuator_token(punct: &str) -> Token {
    match punct {
        "(" => Token::OpenParen,
        ")" => Token::CloseParen,
        "{" => Token::OpenBrace,
        "}" => Token::CloseBrace,
        "[" => Token::OpenSquareBracket,
        "]" => Token::CloseSquareBracket,
        ";" => Token::Semicolon,
        "," => Token::Comma,
        ":" => Token::Colon,
        "*" => Token::Star,
        "=" => Token::Equal,
        "..." => Token::Ellipsis,
        other => Token::Operator(other.to_string()),
    }
}

/// Source text of an expression, spaced the way it is usually written.
fn render_tokens(tokens: &[Token]) -> String {
    let mut text = String::new();
    let mut previous: Option<&Token> = None;
    for token in tokens {
        let glued = match (previous, token) {
            (None, _) => true,
            (Some(&Token::OpenParen), _)
            | (Some(&Token::OpenSquareBracket), _)
            | (Some(&Token::OpenBrace), _) => true,
            (_, &Token::CloseParen) | (_, &Token::CloseSquareBracket) | (_, &Token::CloseBrace) => true,
            (_, &Token::Comma) | (_, &Token::Semicolon) | (_, &Token::OpenSquareBracket) => true,
            (Some(&Token::Identifier(_)), &Token::OpenParen) => true,
            _ => false,
        };
        if !glued {
            text.push(' ');
        }
        text.push_str(&token.to_string());
        previous = Some(token);
    }
    text
}

fn expression_node(tokens: &[Token]) -> Node {
    match tokens {
        [Token::IntLiteral(value)] => Node::Constant { kind: ConstantKind::Int, value: value.clone() },
        [Token::FloatLiteral(value)] => Node::Constant { kind: ConstantKind::Float, value: value.clone() },
        [Token::CharLiteral(value)] => Node::Constant { kind: ConstantKind::Char, value: value.clone() },
        [Token::StringLiteral(value)] => Node::Constant { kind: ConstantKind::String, value: value.clone() },
        _ => Node::Expression(render_tokens(tokens)),
    }
}

macro_rules! parse_first {
    ($parser:ident($($args:expr),*) $($subparsers:expr),+) => {{
        let mut result = Err(format!("Could not match subparsers, remaining: {:?}", $parser.remaining()));
        for parser in [$($subparsers),+].iter() {
            $parser.checkpoint();
            let parser_result = parser($parser, $($args),*);
            if parser_result.is_ok() {
                $parser.commit_checkpoint();
                result = parser_result;
                break;
            }
            result = parser_result;
            $parser.revert_checkpoint();
        };
        result
    }}
}

/// Declaration specifiers shared by every declarator of one declaration.
#[derive(Clone, Debug)]
struct Specifiers {
    storage: Vec<String>,
    quals: Vec<String>,
    is_typedef: bool,
    tipe: Node,
    implicit: bool,
}

impl Specifiers {

    fn implicit_int() -> Self {
        Self {
            storage: Vec::new(),
            quals: Vec::new(),
            is_typedef: false,
            tipe: Node::identifier_type(&["int"]),
            implicit: true,
        }
    }

    fn declare(&self, declarator: Declarator) -> Declaration {
        let name = declarator.name().map(String::from);
        let base = Node::TypeDecl {
            declname: name.clone(),
            quals: self.quals.clone(),
            tipe: Box::new(self.tipe.clone()),
        };
        Declaration {
            name: name,
            quals: self.quals.clone(),
            storage: self.storage.clone(),
            tipe: Box::new(declarator.wrap(base)),
            init: None,
            bitsize: None,
        }
    }

    fn bare(&self) -> Node {
        Node::Decl(Declaration {
            name: None,
            quals: self.quals.clone(),
            storage: self.storage.clone(),
            tipe: Box::new(self.tipe.clone()),
            init: None,
            bitsize: None,
        })
    }
}

#[derive(Debug)]
enum Suffix {
    Array(Option<Node>),
    Function(Vec<Node>),
}

impl Suffix {
    fn wrap(self, tipe: Node) -> Node {
        match self {
            Suffix::Array(dim) => Node::ArrayDecl {
                tipe: Box::new(tipe),
                dim: dim.map(Box::new),
            },
            Suffix::Function(params) => Node::func_decl(params, tipe),
        }
    }
}

/// A declarator as written: `pointers (inner) suffixes` or
/// `pointers name suffixes`. Abstract declarators have neither.
#[derive(Debug, Default)]
struct Declarator {
    name: Option<String>,
    pointers: Vec<Vec<String>>,
    inner: Option<Box<Declarator>>,
    suffixes: Vec<Suffix>,
}

impl Declarator {

    fn name(&self) -> Option<&str> {
        match self.inner {
            Some(ref inner) => inner.name(),
            None => self.name.as_ref().map(String::as_str),
        }
    }

    /// Builds the declarator chain around `base`. Pointers bind looser than
    /// suffixes, and a parenthesised inner declarator binds loosest.
    fn wrap(self, base: Node) -> Node {
        let mut tipe = base;
        for quals in self.pointers {
            tipe = Node::PtrDecl { quals: quals, tipe: Box::new(tipe) };
        }
        for suffix in self.suffixes.into_iter().rev() {
            tipe = suffix.wrap(tipe);
        }
        match self.inner {
            Some(inner) => inner.wrap(tipe),
            None => tipe,
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    checkpoints: Vec<usize>,
    typedef_names: HashSet<String>,
}

type ParserResult<T> = Result<T, String>;

pub fn parse(tokens: Vec<Token>) -> ParserResult<AST> {
    debug!("Input: {:?}", tokens);
    Parser::new(tokens).parse()
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens,
            position: 0,
            checkpoints: vec![],
            typedef_names: HashSet::new(),
        }
    }

    fn parse(mut self) -> ParserResult<AST> {
        debug!("parse()");
        let mut ext = Vec::new();
        while !self.empty() {
            if self.peek_for(&Token::Semicolon) {
                self.consume()?;
                continue;
            }
            ext.extend(self.parse_external_declaration()?);
        }
        Ok(Node::FileAST(ext))
    }

    fn parse_external_declaration(&mut self) -> ParserResult<Vec<Node>> {
        debug!("parse_external_declaration()");
        let specifiers = if self.starts_declaration() {
            self.parse_declaration_specifiers()?
        } else {
            Specifiers::implicit_int()
        };
        if self.peek_for(&Token::Semicolon) && !specifiers.implicit {
            self.consume()?;
            return Ok(vec![specifiers.bare()]);
        }
        let declarator = self.parse_declarator()?;
        let decl = specifiers.declare(declarator);
        let is_function = match *decl.tipe {
            Node::FuncDecl { .. } => true,
            _ => false,
        };
        if is_function && self.peek_for(&Token::OpenBrace) && !specifiers.is_typedef {
            return self.parse_function_definition(decl).map(|func| vec![func]);
        }
        if specifiers.implicit {
            return Err(format!(
                "Missing type specifier in declaration of {:?}",
                decl.name
            ));
        }
        self.parse_init_declarator_list(&specifiers, decl)
    }

    fn parse_function_definition(&mut self, decl: Declaration) -> ParserResult<Node> {
        debug!("parse_function_definition({:?})", decl.name);
        let body = self.parse_compound_statement()?;
        Ok(Node::FuncDef {
            decl: Box::new(Node::Decl(decl)),
            body: Box::new(body),
        })
    }

    fn parse_declaration(&mut self) -> ParserResult<Vec<Node>> {
        debug!("parse_declaration()");
        let specifiers = self.parse_declaration_specifiers()?;
        if self.peek_for(&Token::Semicolon) {
            self.consume()?;
            return Ok(vec![specifiers.bare()]);
        }
        let declarator = self.parse_declarator()?;
        let decl = specifiers.declare(declarator);
        self.parse_init_declarator_list(&specifiers, decl)
    }

    fn parse_init_declarator_list(&mut self, specifiers: &Specifiers, first: Declaration)
        -> ParserResult<Vec<Node>>
    {
        debug!("parse_init_declarator_list()");
        let mut nodes = Vec::new();
        let mut decl = first;
        loop {
            if self.peek_for(&Token::Equal) {
                self.consume()?;
                let init = self.parse_expression_until(&[Token::Comma, Token::Semicolon])?;
                decl.init = Some(Box::new(init));
            }
            nodes.push(self.declaration_node(specifiers, decl)?);
            if self.peek_for(&Token::Comma) {
                self.consume()?;
                let declarator = self.parse_declarator()?;
                decl = specifiers.declare(declarator);
                continue;
            }
            self.skip(&Token::Semicolon)?;
            return Ok(nodes);
        }
    }

    fn declaration_node(&mut self, specifiers: &Specifiers, decl: Declaration) -> ParserResult<Node> {
        if !specifiers.is_typedef {
            return Ok(Node::Decl(decl));
        }
        if decl.init.is_some() {
            return Err(format!("Typedef {:?} cannot have an initializer", decl.name));
        }
        match decl.name {
            Some(name) => {
                self.typedef_names.insert(name.clone());
                Ok(Node::Typedef(Typedef {
                    name: name,
                    quals: decl.quals,
                    tipe: decl.tipe,
                }))
            },
            None => Err("Typedef without a name".to_string()),
        }
    }

    fn starts_declaration(&self) -> bool {
        match self.peek() {
            Some(&Token::Typedef)
            | Some(&Token::StorageClass(_))
            | Some(&Token::Qualifier(_))
            | Some(&Token::TypeSpecifier(_))
            | Some(&Token::Struct)
            | Some(&Token::Union)
            | Some(&Token::Enum) => true,
            Some(&Token::Identifier(ref name)) => self.typedef_names.contains(name),
            _ => false,
        }
    }

    fn parse_declaration_specifiers(&mut self) -> ParserResult<Specifiers> {
        debug!("parse_declaration_specifiers()");
        let mut storage = Vec::new();
        let mut quals = Vec::new();
        let mut names = Vec::new();
        let mut specifier: Option<Node> = None;
        let mut is_typedef = false;
        let mut seen = false;
        loop {
            let token = match self.peek() {
                Some(token) => token.clone(),
                None => break,
            };
            match token {
                Token::Typedef => {
                    self.consume()?;
                    is_typedef = true;
                },
                Token::StorageClass(word) => {
                    self.consume()?;
                    storage.push(word);
                },
                Token::Qualifier(word) => {
                    self.consume()?;
                    quals.push(word);
                },
                Token::TypeSpecifier(word) if specifier.is_none() => {
                    self.consume()?;
                    names.push(word);
                },
                Token::Struct | Token::Union if names.is_empty() && specifier.is_none() => {
                    specifier = Some(self.parse_aggregate_specifier()?);
                },
                Token::Enum if names.is_empty() && specifier.is_none() => {
                    specifier = Some(self.parse_enum_specifier()?);
                },
                Token::Identifier(ref name)
                    if names.is_empty() && specifier.is_none() && self.typedef_names.contains(name) =>
                {
                    self.consume()?;
                    names.push(name.clone());
                },
                _ => break,
            }
            seen = true;
        }
        if !seen {
            let found = self.peek().cloned();
            return Err(format!("Expecting declaration specifiers, found {:?}", found));
        }
        let tipe = match specifier {
            Some(node) => node,
            None if !names.is_empty() => Node::IdentifierType(names),
            None => return Err(format!("Missing type specifier after {:?}", storage)),
        };
        Ok(Specifiers {
            storage: storage,
            quals: quals,
            is_typedef: is_typedef,
            tipe: tipe,
            implicit: false,
        })
    }

    fn parse_aggregate_specifier(&mut self) -> ParserResult<Node> {
        debug!("parse_aggregate_specifier()");
        let kind = match self.consume()? {
            Token::Struct => AggregateKind::Struct,
            Token::Union => AggregateKind::Union,
            token => return self.error(token),
        };
        let name = self.parse_optional_identifier();
        let members = if self.peek_for(&Token::OpenBrace) {
            self.consume()?;
            let members = self.many_until(Parser::parse_member_declaration, Token::CloseBrace)?;
            Some(members.into_iter().flatten().collect())
        } else {
            None
        };
        if name.is_none() && members.is_none() {
            return Err(format!("Expecting a name or body after {}", kind.keyword()));
        }
        Ok(Node::Aggregate { kind: kind, name: name, members: members })
    }

    fn parse_member_declaration(&mut self) -> ParserResult<Vec<Node>> {
        debug!("parse_member_declaration()");
        let specifiers = self.parse_declaration_specifiers()?;
        if self.peek_for(&Token::Semicolon) {
            self.consume()?;
            return Ok(vec![specifiers.bare()]);
        }
        let mut members = Vec::new();
        loop {
            let declarator = if self.peek_for(&Token::Colon) {
                Declarator::default()
            } else {
                self.parse_declarator()?
            };
            let mut decl = specifiers.declare(declarator);
            if self.peek_for(&Token::Colon) {
                self.consume()?;
                let bitsize = self.parse_expression_until(&[Token::Comma, Token::Semicolon])?;
                decl.bitsize = Some(Box::new(bitsize));
            }
            members.push(Node::Decl(decl));
            if self.peek_for(&Token::Comma) {
                self.consume()?;
                continue;
            }
            self.skip(&Token::Semicolon)?;
            return Ok(members);
        }
    }

    fn parse_enum_specifier(&mut self) -> ParserResult<Node> {
        debug!("parse_enum_specifier()");
        self.skip(&Token::Enum)?;
        let name = self.parse_optional_identifier();
        let enumerators = if self.peek_for(&Token::OpenBrace) {
            self.consume()?;
            Some(self.separated_with_until(
                Parser::parse_enumerator,
                Token::Comma,
                Token::CloseBrace,
            )?)
        } else {
            None
        };
        if name.is_none() && enumerators.is_none() {
            return Err("Expecting a name or body after enum".to_string());
        }
        Ok(Node::Enum { name: name, enumerators: enumerators })
    }

    fn parse_enumerator(&mut self) -> ParserResult<Enumerator> {
        let name = self.parse_identifier()?;
        let value = if self.peek_for(&Token::Equal) {
            self.consume()?;
            let value = self.parse_expression_until(&[Token::Comma, Token::CloseBrace])?;
            Some(Box::new(value))
        } else {
            None
        };
        Ok(Enumerator { name: name, value: value })
    }

    fn parse_declarator(&mut self) -> ParserResult<Declarator> {
        debug!("parse_declarator()");
        let mut declarator = Declarator::default();
        while self.peek_for(&Token::Star) {
            self.consume()?;
            let mut quals = Vec::new();
            while let Some(Token::Qualifier(word)) = self.peek().cloned() {
                self.consume()?;
                quals.push(word);
            }
            declarator.pointers.push(quals);
        }

        match self.peek().cloned() {
            Some(Token::Identifier(name)) => {
                self.consume()?;
                declarator.name = Some(name);
            },
            Some(Token::OpenParen) if self.starts_nested_declarator() => {
                self.consume()?;
                declarator.inner = Some(Box::new(self.parse_declarator()?));
                self.skip(&Token::CloseParen)?;
            },
            _ => (),
        }

        loop {
            if self.peek_for(&Token::OpenSquareBracket) {
                self.consume()?;
                let dim = self.parse_array_dimension()?;
                self.skip(&Token::CloseSquareBracket)?;
                declarator.suffixes.push(Suffix::Array(dim));
            } else if self.peek_for(&Token::OpenParen) {
                self.consume()?;
                let params = self.parse_parameter_list()?;
                declarator.suffixes.push(Suffix::Function(params));
            } else {
                return Ok(declarator);
            }
        }
    }

    /// After a `(` in declarator position: a nested declarator starts with
    /// `*`, `(`, `[` or a name; anything else is a parameter list.
    fn starts_nested_declarator(&self) -> bool {
        match self.peek_at(1) {
            Some(&Token::Star) | Some(&Token::OpenParen) | Some(&Token::OpenSquareBracket) => true,
            Some(&Token::Identifier(ref name)) => !self.typedef_names.contains(name),
            _ => false,
        }
    }

    fn parse_array_dimension(&mut self) -> ParserResult<Option<Node>> {
        loop {
            match self.peek() {
                Some(&Token::Qualifier(_)) | Some(&Token::StorageClass(_)) => self.consume()?,
                _ => break,
            };
        }
        if self.peek_for(&Token::CloseSquareBracket) {
            return Ok(None);
        }
        self.parse_expression_until(&[Token::CloseSquareBracket]).map(Some)
    }

    fn parse_parameter_list(&mut self) -> ParserResult<Vec<Node>> {
        debug!("parse_parameter_list()");
        let void = Token::TypeSpecifier("void".to_string());
        if self.peek_for(&void) && self.peek_at(1) == Some(&Token::CloseParen) {
            self.consume_n(2)?;
            return Ok(Vec::new());
        }
        self.separated_with_until(Parser::parse_parameter, Token::Comma, Token::CloseParen)
    }

    fn parse_parameter(&mut self) -> ParserResult<Node> {
        debug!("parse_parameter()");
        if self.peek_for(&Token::Ellipsis) {
            self.consume()?;
            return Ok(Node::EllipsisParam);
        }
        let specifiers = self.parse_declaration_specifiers()?;
        let declarator = if self.peek_for_one_of(&[Token::Comma, Token::CloseParen]) {
            Declarator::default()
        } else {
            self.parse_declarator()?
        };
        Ok(Node::Decl(specifiers.declare(declarator)))
    }

    fn parse_compound_statement(&mut self) -> ParserResult<Node> {
        debug!("parse_compound_statement()");
        self.skip(&Token::OpenBrace)?;
        let items = self.many_until(Parser::parse_block_item, Token::CloseBrace)?;
        Ok(Node::Compound(items.into_iter().flatten().collect()))
    }

    fn parse_block_item(&mut self) -> ParserResult<Vec<Node>> {
        debug!("parse_block_item()");
        parse_first!(self()
            Parser::parse_declaration,
            Parser::parse_statement_as_block_item
        )
    }

    fn parse_statement_as_block_item(&mut self) -> ParserResult<Vec<Node>> {
        self.parse_statement().map(|stmt| vec![stmt])
    }

    fn parse_statement(&mut self) -> ParserResult<Node> {
        debug!("parse_statement()");
        let token = match self.peek() {
            Some(token) => token.clone(),
            None => return Err("EOF".to_string()),
        };
        match token {
            Token::OpenBrace => self.parse_compound_statement(),
            Token::If => {
                self.consume()?;
                let cond = self.parse_parenthesized_expression()?;
                let then = self.parse_statement()?;
                let otherwise = if self.peek_for(&Token::Else) {
                    self.consume()?;
                    Some(Box::new(self.parse_statement()?))
                } else {
                    None
                };
                Ok(Node::If { cond: Box::new(cond), then: Box::new(then), otherwise: otherwise })
            },
            Token::While => {
                self.consume()?;
                let cond = self.parse_parenthesized_expression()?;
                let body = self.parse_statement()?;
                Ok(Node::While { cond: Box::new(cond), body: Box::new(body) })
            },
            Token::Do => {
                self.consume()?;
                let body = self.parse_statement()?;
                self.skip(&Token::While)?;
                let cond = self.parse_parenthesized_expression()?;
                self.skip(&Token::Semicolon)?;
                Ok(Node::DoWhile { cond: Box::new(cond), body: Box::new(body) })
            },
            Token::For => self.parse_for(),
            Token::Switch => {
                self.consume()?;
                let cond = self.parse_parenthesized_expression()?;
                let body = self.parse_statement()?;
                Ok(Node::Switch { cond: Box::new(cond), body: Box::new(body) })
            },
            Token::Case => {
                self.consume()?;
                let expr = self.parse_expression_until(&[Token::Colon])?;
                self.skip(&Token::Colon)?;
                let body = self.parse_statement()?;
                Ok(Node::Case { expr: Box::new(expr), body: Box::new(body) })
            },
            Token::Default => {
                self.consume()?;
                self.skip(&Token::Colon)?;
                let body = self.parse_statement()?;
                Ok(Node::Default(Box::new(body)))
            },
            Token::Return => {
                self.consume()?;
                let expr = if self.peek_for(&Token::Semicolon) {
                    None
                } else {
                    Some(Box::new(self.parse_expression_until(&[Token::Semicolon])?))
                };
                self.skip(&Token::Semicolon)?;
                Ok(Node::Return(expr))
            },
            Token::Break | Token::Continue => {
                self.consume()?;
                self.skip(&Token::Semicolon)?;
                Ok(if token == Token::Break { Node::Break } else { Node::Continue })
            },
            Token::Goto => {
                self.consume()?;
                let label = self.parse_identifier()?;
                self.skip(&Token::Semicolon)?;
                Ok(Node::Goto(label))
            },
            Token::Semicolon => {
                self.consume()?;
                Ok(Node::EmptyStatement)
            },
            Token::Identifier(name) if self.peek_at(1) == Some(&Token::Colon) => {
                self.consume_n(2)?;
                let body = self.parse_statement()?;
                Ok(Node::Label { name: name, body: Box::new(body) })
            },
            _ => {
                let expr = self.parse_expression_until(&[Token::Semicolon])?;
                self.skip(&Token::Semicolon)?;
                Ok(expr)
            },
        }
    }

    fn parse_for(&mut self) -> ParserResult<Node> {
        debug!("parse_for()");
        self.skip(&Token::For)?;
        self.skip(&Token::OpenParen)?;
        let init = if self.peek_for(&Token::Semicolon) {
            self.consume()?;
            None
        } else if self.starts_declaration() {
            Some(Box::new(Node::DeclList(self.parse_declaration()?)))
        } else {
            let init = self.parse_expression_until(&[Token::Semicolon])?;
            self.skip(&Token::Semicolon)?;
            Some(Box::new(init))
        };
        let cond = if self.peek_for(&Token::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_expression_until(&[Token::Semicolon])?))
        };
        self.skip(&Token::Semicolon)?;
        let next = if self.peek_for(&Token::CloseParen) {
            None
        } else {
            Some(Box::new(self.parse_expression_until(&[Token::CloseParen])?))
        };
        self.skip(&Token::CloseParen)?;
        let body = self.parse_statement()?;
        Ok(Node::For { init: init, cond: cond, next: next, body: Box::new(body) })
    }

    fn parse_parenthesized_expression(&mut self) -> ParserResult<Node> {
        self.skip(&Token::OpenParen)?;
        let expr = self.parse_expression_until(&[Token::CloseParen])?;
        self.skip(&Token::CloseParen)?;
        Ok(expr)
    }

    /// Expressions are not parsed, only delimited: tokens are collected up
    /// to the first terminator outside of any bracket pair.
    fn parse_expression_until(&mut self, terminators: &[Token]) -> ParserResult<Node> {
        debug!("parse_expression_until({:?})", terminators);
        let start = self.position;
        let mut depth = 0;
        loop {
            let token = match self.peek() {
                Some(token) => token.clone(),
                None => return Err(format!("EOF while expecting one of {:?}", terminators)),
            };
            if depth == 0 && terminators.contains(&token) {
                break;
            }
            match token {
                Token::OpenParen | Token::OpenSquareBracket | Token::OpenBrace => depth += 1,
                Token::CloseParen | Token::CloseSquareBracket | Token::CloseBrace => {
                    if depth == 0 {
                        return self.error(token);
                    }
                    depth -= 1;
                },
                _ => (),
            }
            self.consume()?;
        }
        if self.position == start {
            let found = self.peek().cloned();
            return Err(format!("Expecting expression, found {:?}", found));
        }
        Ok(expression_node(&self.tokens[start..self.position]))
    }

    fn parse_identifier(&mut self) -> ParserResult<String> {
        debug!("parse_identifier()");
        match self.consume()? {
            Token::Identifier(name) => Ok(name),
            token => self.error(token),
        }
    }

    fn parse_optional_identifier(&mut self) -> Option<String> {
        match self.peek() {
            Some(&Token::Identifier(_)) => self.parse_identifier().ok(),
            _ => None,
        }
    }

    fn consume(&mut self) -> ParserResult<Token> {
        if self.empty() {
            return Err("EOF".to_string());
        }
        let t = self.tokens[self.position].clone();
        self.position += 1;
        debug!("Consume: {:?}", t);
        Ok(t)
    }

    fn consume_n(&mut self, n: usize) -> ParserResult<Vec<Token>> {
        debug!("consume_n({:?})", n);
        let mut v = vec![];
        for _ in 0..n {
            v.push(self.consume()?);
        }
        Ok(v)
    }

    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.position + offset)
    }

    fn peek_for(&self, t: &Token) -> bool {
        self.peek()
            .map(|peeked| peeked == t)
            .unwrap_or(false)
    }

    fn peek_for_one_of(&self, t: &[Token]) -> bool {
        self.peek()
            .map(|peeked| t.contains(peeked))
            .unwrap_or(false)
    }

    fn skip(&mut self, t: &Token) -> ParserResult<()> {
        debug!("skip({:?})", t);
        self.skip_one_of(&[t.clone()])
    }

    fn skip_one_of(&mut self, tokens: &[Token]) -> ParserResult<()> {
        if self.peek_for_one_of(tokens) {
            self.consume()?;
            Ok(())
        } else {
            let found = self.peek().cloned();
            self.error_expected_one_of(found, tokens)
        }
    }

    fn many_until<F, T>(&mut self, f: F, t: Token) -> ParserResult<Vec<T>>
        where F: Fn(&mut Parser) -> ParserResult<T>
    {
        debug!("many_until({:?})", t);
        let mut v = vec![];
        loop {
            if self.peek_for(&t) {
                self.consume()?;
                return Ok(v);
            }
            if self.empty() {
                return Err(format!("EOF while expecting {:?}", t));
            }
            v.push(f(self)?);
        }
    }

    fn separated_with_until<F, T>(&mut self, f: F, sep: Token, end: Token) -> ParserResult<Vec<T>>
        where F: Fn(&mut Parser) -> ParserResult<T>
    {
        debug!("separated_with_until({:?}, {:?})", sep, end);
        let mut v = vec![];
        loop {
            if self.peek_for(&end) {
                self.consume()?;
                return Ok(v);
            }
            v.push(f(self)?);
            if self.peek_for(&end) {
                self.consume()?;
                return Ok(v);
            }
            self.skip(&sep)?;
        }
    }

    fn error<T>(&self, token: Token) -> ParserResult<T> {
        Err(format!("Unexpected token: {:?}", token))
    }

    fn error_expected_one_of<T>(&self, found: Option<Token>, expected: &[Token]) -> ParserResult<T> {
        match found {
            Some(token) => Err(format!("Expecting one of {:?}, found {:?}", expected, token)),
            None => Err(format!("Expecting one of {:?}, found EOF", expected)),
        }
    }

    fn checkpoint(&mut self) {
        self.checkpoints.push(self.position)
    }

    fn commit_checkpoint(&mut self) {
        self.checkpoints.pop();
    }

    fn revert_checkpoint(&mut self) {
        if let Some(position) = self.checkpoints.pop() {
            self.position = position;
        }
    }

    fn empty(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn remaining(&self) -> Vec<Token> {
        self.tokens[self.position..].to_owned()
    }
}

#[cfg(test)]
fn check_input(input: &str, expected: AST) {
    let lexed = lex(input).unwrap();
    debug!("{:?}", lexed);
    let parsed = parse(lexed).unwrap();
    assert_eq!(parsed, expected);
}

#[cfg(test)]
fn parse_source(input: &str) -> ParserResult<AST> {
    parse(lex(input)?)
}

#[test]
fn test_lex_declaration() {
    assert_eq!(
        lex("unsigned int q[100]; /* trailing */").unwrap(),
        vec![
            Token::TypeSpecifier("unsigned".to_string()),
            Token::TypeSpecifier("int".to_string()),
            Token::Identifier("q".to_string()),
            Token::OpenSquareBracket,
            Token::IntLiteral("100".to_string()),
            Token::CloseSquareBracket,
            Token::Semicolon,
        ]
    );
}

#[test]
fn test_lex_rejects_unknown_characters() {
    assert!(lex("int @x;").is_err());
}

#[test]
fn test_scalar_declaration() {
    check_input(
        "int z;",
        Node::FileAST(vec![Node::decl("z", Node::type_decl("z", &["int"]))]),
    );
}

#[test]
fn test_array_declaration() {
    check_input(
        "int q[100];",
        Node::FileAST(vec![
            Node::decl("q", Node::array_decl(Node::type_decl("q", &["int"]), "100")),
        ]),
    );
}

#[test]
fn test_multiple_declarators_share_specifiers() {
    let ast = parse_source("long a, *b, c[2] = {1, 2};").unwrap();
    let names: Vec<_> = ast.children().iter().map(|&(_, node)| node.name()).collect();
    assert_eq!(names, vec![Some("a"), Some("b"), Some("c")]);
    let children = ast.children();
    match *children[2].1 {
        Node::Decl(ref decl) => {
            assert_eq!(decl.init, Some(Box::new(Node::Expression("{1, 2}".to_string()))));
        },
        ref other => panic!("unexpected node: {:?}", other),
    }
}

#[test]
fn test_function_definition() {
    check_input(
        "int foo(int a, int b) { int x; return (x+a); };",
        Node::FileAST(vec![Node::func_def(
            Node::decl("foo", Node::func_decl(
                vec![
                    Node::decl("a", Node::type_decl("a", &["int"])),
                    Node::decl("b", Node::type_decl("b", &["int"])),
                ],
                Node::type_decl("foo", &["int"]),
            )),
            vec![
                Node::decl("x", Node::type_decl("x", &["int"])),
                Node::Return(Some(Box::new(Node::Expression("(x + a)".to_string())))),
            ],
        )]),
    );
}

#[test]
fn test_implicit_int_function_definition() {
    check_input(
        "test() {}",
        Node::FileAST(vec![Node::func_def(
            Node::decl("test", Node::func_decl(vec![], Node::type_decl("test", &["int"]))),
            vec![],
        )]),
    );
}

#[test]
fn test_implicit_int_requires_function_definition() {
    assert!(parse_source("x;").is_err());
}

#[test]
fn test_void_parameter_list_is_empty() {
    check_input(
        "void run(void);",
        Node::FileAST(vec![
            Node::decl("run", Node::func_decl(vec![], Node::type_decl("run", &["void"]))),
        ]),
    );
}

#[test]
fn test_typedef_name_starts_declaration() {
    check_input(
        "typedef int strange_unit; strange_unit bob;",
        Node::FileAST(vec![
            Node::typedef("strange_unit", Node::type_decl("strange_unit", &["int"])),
            Node::decl("bob", Node::type_decl("bob", &["strange_unit"])),
        ]),
    );
}

#[test]
fn test_pointer_array_binding() {
    let ast = parse_source("int *a[3];").unwrap();
    let decl = ast.child("ext").unwrap();
    let array = decl.child("type").unwrap();
    assert_eq!(array.kind(), "ArrayDecl");
    assert_eq!(array.child("type").map(Node::kind), Some("PtrDecl"));
}

#[test]
fn test_function_pointer_declarator() {
    let ast = parse_source("int (*callback)(int, char *name);").unwrap();
    let decl = ast.child("ext").unwrap();
    assert_eq!(decl.name(), Some("callback"));
    let pointer = decl.child("type").unwrap();
    assert_eq!(pointer.kind(), "PtrDecl");
    let function = pointer.child("type").unwrap();
    assert_eq!(function.kind(), "FuncDecl");
    let params = function.child("args").unwrap().children();
    assert_eq!(params.len(), 2);
    assert_eq!(params[0].1.name(), None);
    assert_eq!(params[1].1.name(), Some("name"));
}

#[test]
fn test_struct_typedef() {
    let ast = parse_source("
        typedef struct foobar {
            int f;
            int b;
            struct foobar * fb;
        } foobar;
        foobar w[100];
    ").unwrap();
    let children = ast.children();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].1.kind(), "Typedef");
    assert_eq!(children[0].1.name(), Some("foobar"));
    let aggregate = children[0].1.child("type").and_then(|decl| decl.child("type")).unwrap();
    assert_eq!(aggregate.kind(), "Struct");
    assert_eq!(aggregate.children().len(), 3);
    assert_eq!(children[1].1.name(), Some("w"));
}

#[test]
fn test_enum_declaration() {
    let ast = parse_source("enum color { RED, GREEN = 2, } paint;").unwrap();
    let decl = ast.child("ext").unwrap();
    assert_eq!(decl.name(), Some("paint"));
    match *decl.child("type").and_then(|tipe| tipe.child("type")).unwrap() {
        Node::Enum { ref name, enumerators: Some(ref enumerators) } => {
            assert_eq!(name.as_ref().map(String::as_str), Some("color"));
            assert_eq!(enumerators.len(), 2);
            assert_eq!(enumerators[1].value, Some(Box::new(Node::int_constant("2"))));
        },
        ref other => panic!("unexpected node: {:?}", other),
    }
}

#[test]
fn test_statements_in_body() {
    let ast = parse_source("
        int main(int argc, char **argv) {
            int total = 0;
            for (int i = 0; i < argc; i++) {
                if (argv[i][0] == '-') continue; else total += i;
            }
            while (total > 10) total--;
            do { total++; } while (total < 3);
            switch (total) { case 1: break; default: ; }
            done:
            return total;
        }
    ").unwrap();
    let function = ast.child("ext").unwrap();
    let items = function.child("body").unwrap().children();
    let kinds: Vec<_> = items.iter().map(|&(_, node)| node.kind()).collect();
    assert_eq!(kinds, vec!["Decl", "For", "While", "DoWhile", "Switch", "Label"]);
    let for_init = items[1].1.child("init").unwrap();
    assert_eq!(for_init.kind(), "DeclList");
    let init_decls = for_init.children();
    assert_eq!(init_decls[0].1.name(), Some("i"));
}

#[test]
fn test_unbalanced_body_fails() {
    assert!(parse_source("int main() { return 0;").is_err());
    assert!(parse_source("int x = );").is_err());
}
