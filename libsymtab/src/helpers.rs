use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while},
    character::complete::{anychar, char, digit1, multispace1, none_of, not_line_ending, one_of, satisfy},
    combinator::{recognize, value},
    multi::many0_count,
    sequence::{pair, tuple},
    IResult,
};

/// Whitespace, comments and preprocessor lines.
pub fn trivia(input: &str) -> IResult<&str, ()> {
    value((), many0_count(alt((multispace1, line_comment, block_comment, directive))))(input)
}

fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(tag("//"), not_line_ending))(input)
}

fn block_comment(input: &str) -> IResult<&str, &str> {
    recognize(tuple((tag("/*"), take_until("*/"), tag("*/"))))(input)
}

fn directive(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('#'), not_line_ending))(input)
}

fn is_valid_identifier_char(chr: char) -> bool {
    chr.is_ascii_alphanumeric() || chr == '_'
}

pub fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|chr| chr.is_ascii_alphabetic() || chr == '_'),
        take_while(is_valid_identifier_char),
    ))(input)
}

/// Integer and floating literals with any suffix, kept as written.
pub fn number(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((digit1, recognize(pair(char('.'), digit1)))),
        many0_count(alt((
            recognize(pair(one_of("eEpP"), one_of("+-"))),
            recognize(satisfy(|chr| is_valid_identifier_char(chr) || chr == '.')),
        ))),
    ))(input)
}

pub fn is_float_literal(literal: &str) -> bool {
    let lowered = literal.to_ascii_lowercase();
    if lowered.starts_with("0x") {
        lowered.contains('.') || lowered.contains('p')
    } else {
        lowered.contains('.') || lowered.contains('e')
    }
}

fn quoted<'a>(quote: char, input: &'a str) -> IResult<&'a str, &'a str> {
    let escapes: &str = if quote == '"' { "\\\"\n" } else { "\\'\n" };
    recognize(tuple((
        char(quote),
        many0_count(alt((
            recognize(pair(char('\\'), anychar)),
            recognize(none_of(escapes)),
        ))),
        char(quote),
    )))(input)
}

pub fn char_literal(input: &str) -> IResult<&str, &str> {
    quoted('\'', input)
}

pub fn string_literal(input: &str) -> IResult<&str, &str> {
    quoted('"', input)
}

/// Longest-match C punctuators.
pub fn punctuator(input: &str) -> IResult<&str, &str> {
    alt((
        alt((
            tag("..."), tag("<<="), tag(">>="), tag("->"), tag("++"), tag("--"),
            tag("<<"), tag(">>"), tag("<="), tag(">="), tag("=="), tag("!="),
            tag("&&"), tag("||"),
        )),
        alt((
            tag("+="), tag("-="), tag("*="), tag("/="), tag("%="), tag("&="),
            tag("^="), tag("|="), tag("##"),
        )),
        recognize(one_of("()[]{};,:*=+-/%&|^!~<>?.#")),
    ))(input)
}

#[test]
fn test_valid_identifiers() {
    assert_eq!(identifier("hello"), Ok(("", "hello")));
    assert_eq!(identifier("hello_world;"), Ok((";", "hello_world")));
    assert_eq!(identifier("_h3llo123 x"), Ok((" x", "_h3llo123")));
    assert!(identifier("1abc").is_err());
}

#[test]
fn test_numbers() {
    assert_eq!(number("100]"), Ok(("]", "100")));
    assert_eq!(number("0x1Fu;"), Ok((";", "0x1Fu")));
    assert_eq!(number("1.5e-3f)"), Ok((")", "1.5e-3f")));
    assert!(is_float_literal("1.5e-3f"));
    assert!(!is_float_literal("0x1Fe"));
}

#[test]
fn test_trivia_skips_comments_and_directives() {
    let source = "  // line\n/* block\n comment */\n#include <stdio.h>\nint";
    assert_eq!(trivia(source), Ok(("int", ())));
}

#[test]
fn test_quoted_literals() {
    assert_eq!(string_literal("\"a \\\"b\\\"\" rest"), Ok((" rest", "\"a \\\"b\\\"\"")));
    assert_eq!(char_literal("'\\n';"), Ok((";", "'\\n'")));
}

#[test]
fn test_punctuator_prefers_longest() {
    assert_eq!(punctuator("...)"), Ok((")", "...")));
    assert_eq!(punctuator("<<= 1"), Ok((" 1", "<<=")));
    assert_eq!(punctuator("*p"), Ok(("p", "*")));
}
