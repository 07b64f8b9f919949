//! Scalar typing and source extents.
//!
//! The YAML parser hands back every scalar as a string plus a start
//! marker. Typing follows the plain/quoted distinction in the source, and
//! the end of a scalar is recovered by re-reading the text at its start.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while_m_n},
    character::complete::char,
    combinator::{cut, map, map_opt, value},
    error::{context, VerboseError},
    multi::fold_many0,
    sequence::preceded,
    IResult,
};

use crate::node::ScalarValue;

type ScalarResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Type a scalar whose source starts at `source` and whose parsed value is
/// `parsed`.
pub(super) fn typed_value(source: &str, parsed: &str) -> ScalarValue {
    if parsed.is_empty() {
        // an empty value's marker can sit on the next token
        return if source.starts_with("\"\"") || source.starts_with("''") {
            ScalarValue::String(String::new())
        } else {
            ScalarValue::Null
        };
    }
    match source.chars().next() {
        Some('"' | '\'' | '|' | '>') => ScalarValue::String(parsed.to_string()),
        _ => plain_value(parsed),
    }
}

/// Byte length of the scalar at the start of `source`.
///
/// Quoted scalars run to their closing quote, block scalars cover their
/// indicator line and plain scalars their first line of text.
pub(super) fn extent(source: &str, parsed: &str) -> usize {
    match source.chars().next() {
        Some('"' | '\'') => match quoted_string(source) {
            Ok((rest, _)) => source.len() - rest.len(),
            Err(_) => first_line(source).len(),
        },
        Some('|' | '>') => first_line(source).trim_end().len(),
        _ if parsed.is_empty() => 0,
        _ => {
            let head = first_line(parsed);
            if source.starts_with(head) {
                head.len()
            } else {
                0
            }
        }
    }
}

fn first_line(s: &str) -> &str {
    s.split(['\n', '\r']).next().unwrap_or("")
}

/// Resolve the type of an unquoted scalar.
pub(super) fn plain_value(text: &str) -> ScalarValue {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return ScalarValue::Null,
        "true" | "True" | "TRUE" => return ScalarValue::Bool(true),
        "false" | "False" | "FALSE" => return ScalarValue::Bool(false),
        ".inf" | ".Inf" | ".INF" | "+.inf" => return ScalarValue::Float(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => return ScalarValue::Float(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => return ScalarValue::Float(f64::NAN),
        _ => {}
    }

    let digits = text.strip_prefix(|c| c == '-' || c == '+').unwrap_or(text);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(i) = text.parse::<i64>() {
            return ScalarValue::Integer(i);
        }
    }

    let numeric_chars = text
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E'));
    if numeric_chars && text.bytes().any(|b| b.is_ascii_digit()) {
        if let Ok(f) = text.parse::<f64>() {
            return ScalarValue::Float(f);
        }
    }

    ScalarValue::String(text.to_string())
}

// ============================================================================
// Quoted strings
// ============================================================================

pub(super) fn quoted_string(input: &str) -> ScalarResult<'_, String> {
    alt((double_quoted, single_quoted))(input)
}

fn double_quoted(input: &str) -> ScalarResult<'_, String> {
    preceded(
        char('"'),
        cut(|i| {
            let (i, s) = fold_many0(
                alt((
                    map(is_not("\"\\"), String::from),
                    map(
                        preceded(char('\\'), cut(context("invalid escape sequence", escape_char))),
                        String::from,
                    ),
                )),
                String::new,
                |mut acc, piece| {
                    acc.push_str(&piece);
                    acc
                },
            )(i)?;
            let (i, _) = context("unterminated double-quoted string", char('"'))(i)?;
            Ok((i, s))
        }),
    )(input)
}

fn escape_char(input: &str) -> ScalarResult<'_, char> {
    alt((
        value('\n', char('n')),
        value('\r', char('r')),
        value('\t', char('t')),
        value('\\', char('\\')),
        value('"', char('"')),
        value('/', char('/')),
        value(' ', char(' ')),
        value('\0', char('0')),
        map_opt(
            preceded(
                char('u'),
                take_while_m_n(4, 4, |c: char| c.is_ascii_hexdigit()),
            ),
            |hex: &str| u32::from_str_radix(hex, 16).ok().and_then(char::from_u32),
        ),
    ))(input)
}

fn single_quoted(input: &str) -> ScalarResult<'_, String> {
    preceded(
        char('\''),
        cut(|i| {
            let (i, s) = fold_many0(
                alt((map(is_not("'"), String::from), value("'".to_string(), tag("''")))),
                String::new,
                |mut acc, piece| {
                    acc.push_str(&piece);
                    acc
                },
            )(i)?;
            let (i, _) = context("unterminated single-quoted string", char('\''))(i)?;
            Ok((i, s))
        }),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_value_typing() {
        assert_eq!(plain_value("~"), ScalarValue::Null);
        assert_eq!(plain_value("True"), ScalarValue::Bool(true));
        assert_eq!(plain_value("-1"), ScalarValue::Integer(-1));
        assert_eq!(plain_value("+7"), ScalarValue::Integer(7));
        assert_eq!(plain_value("1e-6"), ScalarValue::Float(1e-6));
        assert_eq!(plain_value("0.001"), ScalarValue::Float(0.001));
        assert_eq!(plain_value("relu"), ScalarValue::String("relu".into()));
        assert_eq!(plain_value("1.2.3"), ScalarValue::String("1.2.3".into()));
        assert_eq!(plain_value("e"), ScalarValue::String("e".into()));
    }

    #[test]
    fn test_quoted_source_stays_string() {
        assert_eq!(typed_value("\"32\"", "32"), ScalarValue::String("32".into()));
        assert_eq!(typed_value("'true'", "true"), ScalarValue::String("true".into()));
        assert_eq!(typed_value("32", "32"), ScalarValue::Integer(32));
        assert_eq!(typed_value("next: 1", ""), ScalarValue::Null);
        assert_eq!(typed_value("\"\"", ""), ScalarValue::String(String::new()));
    }

    #[test]
    fn test_extents() {
        assert_eq!(extent("\"a, b\"]", "a, b"), 6);
        assert_eq!(extent("'it''s' # c", "it's"), 7);
        assert_eq!(extent("dense, units: 4}", "dense"), 5);
        assert_eq!(extent("|\n  text\n", "text\n"), 1);
        assert_eq!(extent("first\n  second\n", "first second"), 5);
        assert_eq!(extent("x: 1", ""), 0);
    }

    #[test]
    fn test_quoted_strings() {
        assert_eq!(
            quoted_string(r#""line1\nline2""#).unwrap().1,
            "line1\nline2"
        );
        assert_eq!(quoted_string("''").unwrap().1, "");
        assert_eq!(quoted_string("'it''s'").unwrap().1, "it's");
        assert_eq!(quoted_string(r#""é""#).unwrap().1, "é");
    }
}
