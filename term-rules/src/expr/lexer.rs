use crate::error::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    /// Quoted string literal, escapes resolved
    Str(String),
    /// Numeric literal, kept as written
    Number(String),
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Bang,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    Eof,
}

pub(crate) fn lex(src: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut pos = 0usize;

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        if c == '"' {
            pos += 1;
            let mut s = String::new();
            loop {
                let Some(&sc) = chars.get(pos) else {
                    return Err(ExprError::InvalidSyntax(
                        "unterminated string literal".to_string(),
                    ));
                };
                pos += 1;
                match sc {
                    '"' => break,
                    '\\' => {
                        let Some(&esc) = chars.get(pos) else {
                            return Err(ExprError::InvalidSyntax(
                                "unterminated escape in string".to_string(),
                            ));
                        };
                        pos += 1;
                        match esc {
                            'n' => s.push('\n'),
                            't' => s.push('\t'),
                            '"' | '\\' => s.push(esc),
                            other => {
                                return Err(ExprError::InvalidSyntax(format!(
                                    "unknown escape: \\{other}"
                                )))
                            }
                        }
                    }
                    _ => s.push(sc),
                }
            }
            tokens.push(Token::Str(s));
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(pos + 1).is_some_and(|d| d.is_ascii_digit()))
        {
            let start = pos;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
            if pos < chars.len() && chars[pos] == '.' {
                pos += 1;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
            }
            if pos < chars.len() && (chars[pos] == 'e' || chars[pos] == 'E') {
                let mut look = pos + 1;
                if matches!(chars.get(look), Some('+') | Some('-')) {
                    look += 1;
                }
                if chars.get(look).is_some_and(|d| d.is_ascii_digit()) {
                    pos = look;
                    while pos < chars.len() && chars[pos].is_ascii_digit() {
                        pos += 1;
                    }
                }
            }
            tokens.push(Token::Number(chars[start..pos].iter().collect()));
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len()
                && (chars[pos].is_alphanumeric() || chars[pos] == '_' || chars[pos] == '.')
            {
                pos += 1;
            }
            tokens.push(Token::Ident(chars[start..pos].iter().collect()));
            continue;
        }

        let next = chars.get(pos + 1).copied();
        let (tok, width) = match (c, next) {
            ('=', Some('=')) => (Token::Eq, 2),
            ('!', Some('=')) => (Token::Neq, 2),
            ('<', Some('=')) => (Token::Lte, 2),
            ('>', Some('=')) => (Token::Gte, 2),
            ('&', Some('&')) => (Token::And, 2),
            ('|', Some('|')) => (Token::Or, 2),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('!', _) => (Token::Bang, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            (',', _) => (Token::Comma, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            _ => {
                return Err(ExprError::InvalidSyntax(format!(
                    "unexpected character '{c}'"
                )))
            }
        };
        tokens.push(tok);
        pos += width;
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_operators_and_literals() {
        let tokens = lex(r#"in(band, "a\"b", 5.20) && x<=-1e3"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("in".to_string()),
                Token::LParen,
                Token::Ident("band".to_string()),
                Token::Comma,
                Token::Str("a\"b".to_string()),
                Token::Comma,
                Token::Number("5.20".to_string()),
                Token::RParen,
                Token::And,
                Token::Ident("x".to_string()),
                Token::Lte,
                Token::Minus,
                Token::Number("1e3".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_leading_dot_number() {
        assert_eq!(
            lex(".25").unwrap(),
            vec![Token::Number(".25".to_string()), Token::Eof]
        );
    }

    #[test]
    fn test_lex_errors() {
        assert!(matches!(lex("\"abc"), Err(ExprError::InvalidSyntax(_))));
        assert!(matches!(lex("a # b"), Err(ExprError::InvalidSyntax(_))));
        assert!(matches!(lex("a & b"), Err(ExprError::InvalidSyntax(_))));
    }
}
