//! Tokenizer.

use crate::error::{EvalError, EvalResult};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    Symbol(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token in the source.
    pub pos: usize,
    /// A line break separates this token from the previous one.
    pub newline_before: bool,
}

/// Multi-character symbols first so the longest match wins.
const SYMBOLS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "(", ")", "[", "]", "{", "}", ",", ";",
    ".", ":", "?", "+", "-", "*", "/", "%", "!", "<", ">", "=",
];

pub fn tokenize(input: &str) -> EvalResult<Vec<Token>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut newline_before = false;

    while pos < bytes.len() {
        let ch = bytes[pos];

        if ch == b'\n' {
            newline_before = true;
            pos += 1;
            continue;
        }
        if ch.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        // Line comment.
        if input[pos..].starts_with("//") {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }

        let start = pos;
        let kind = if ch.is_ascii_digit()
            || (ch == b'.' && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit))
        {
            pos = scan_number(bytes, pos);
            let text = &input[start..pos];
            let value = text
                .parse::<f64>()
                .map_err(|_| EvalError::syntax(start, format!("invalid number `{text}`")))?;
            TokenKind::Number(value)
        } else if ch == b'"' || ch == b'\'' {
            let (value, end) = scan_string(input, pos)?;
            pos = end;
            TokenKind::Str(value)
        } else if is_ident_start(ch) {
            while pos < bytes.len() && is_ident_char(bytes[pos]) {
                pos += 1;
            }
            TokenKind::Ident(input[start..pos].to_string())
        } else if let Some(sym) = SYMBOLS.iter().find(|s| input[pos..].starts_with(**s)) {
            pos += sym.len();
            TokenKind::Symbol(normalize(*sym))
        } else {
            let c = input[pos..].chars().next().unwrap_or('?');
            return Err(EvalError::syntax(pos, format!("unexpected character `{c}`")));
        };

        tokens.push(Token {
            kind,
            pos: start,
            newline_before,
        });
        newline_before = false;
    }

    Ok(tokens)
}

/// Strict equality is the only equality there is.
fn normalize(sym: &'static str) -> &'static str {
    match sym {
        "===" => "==",
        "!==" => "!=",
        other => other,
    }
}

fn scan_number(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    if pos < bytes.len() && bytes[pos] == b'.' {
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
    }
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        let mut exp = pos + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            pos = exp;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }
    pos
}

fn scan_string(input: &str, start: usize) -> EvalResult<(String, usize)> {
    let mut chars = input[start..].char_indices();
    let quote = chars.next().map(|(_, c)| c).unwrap_or('"');
    let mut value = String::new();

    while let Some((offset, c)) = chars.next() {
        if c == quote {
            return Ok((value, start + offset + c.len_utf8()));
        }
        if c == '\\' {
            match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, escaped)) => value.push(escaped),
                None => break,
            }
            continue;
        }
        value.push(c);
    }

    Err(EvalError::syntax(start, "unterminated string literal"))
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_' || ch == b'$'
}

fn is_ident_char(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn numbers_and_symbols() {
        assert_eq!(
            kinds("1.5 + .25*3e2"),
            vec![
                TokenKind::Number(1.5),
                TokenKind::Symbol("+"),
                TokenKind::Number(0.25),
                TokenKind::Symbol("*"),
                TokenKind::Number(300.0),
            ]
        );
    }

    #[test]
    fn strict_equality_is_normalized() {
        assert_eq!(
            kinds("a === b !== c"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Symbol("=="),
                TokenKind::Ident("b".into()),
                TokenKind::Symbol("!="),
                TokenKind::Ident("c".into()),
            ]
        );
    }

    #[test]
    fn strings_with_escapes() {
        assert_eq!(kinds(r#"'it\'s' "a\"b""#), vec![
            TokenKind::Str("it's".into()),
            TokenKind::Str("a\"b".into()),
        ]);
    }

    #[test]
    fn tracks_line_breaks_and_skips_comments() {
        let tokens = tokenize("a // first\nb").unwrap();
        assert_eq!(tokens.len(), 2);
        assert!(!tokens[0].newline_before);
        assert!(tokens[1].newline_before);
    }

    #[test]
    fn rejects_unknown_characters() {
        assert!(matches!(
            tokenize("1 # 2"),
            Err(EvalError::Syntax { position: 2, .. })
        ));
        assert!(tokenize("'open").is_err());
    }
}
