use crate::ExprError;
use calc_models::Number;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Num(Number),
    Ident(String),
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    LParen,
    RParen,
    Comma,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Num(n) => n.to_string(),
            Token::Ident(name) => name.clone(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Star => "*".into(),
            Token::StarStar => "**".into(),
            Token::Slash => "/".into(),
            Token::SlashSlash => "//".into(),
            Token::Percent => "%".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
            Token::Comma => ",".into(),
        }
    }
}

/// A token together with its character offset in the source.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub position: usize,
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, ExprError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let token = if c.is_ascii_digit() || (c == '.' && next_is_digit(&chars, i)) {
            i = scan_number(&chars, i);
            let literal: String = chars[start..i].iter().collect();
            Token::Num(parse_number(&literal)?)
        } else if c.is_alphabetic() || c == '_' {
            while i < chars.len()
                && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
            {
                i += 1;
            }
            Token::Ident(chars[start..i].iter().collect())
        } else {
            let (token, width) = match (c, chars.get(i + 1)) {
                ('*', Some('*')) => (Token::StarStar, 2),
                ('/', Some('/')) => (Token::SlashSlash, 2),
                ('+', _) => (Token::Plus, 1),
                ('-', _) => (Token::Minus, 1),
                ('*', _) => (Token::Star, 1),
                ('/', _) => (Token::Slash, 1),
                ('%', _) => (Token::Percent, 1),
                ('(', _) => (Token::LParen, 1),
                (')', _) => (Token::RParen, 1),
                (',', _) => (Token::Comma, 1),
                _ => {
                    return Err(ExprError::UnexpectedCharacter {
                        ch: c,
                        position: start,
                    })
                }
            };
            i += width;
            token
        };

        tokens.push(Spanned {
            token,
            position: start,
        });
    }

    Ok(tokens)
}

fn next_is_digit(chars: &[char], i: usize) -> bool {
    chars.get(i + 1).is_some_and(|c| c.is_ascii_digit())
}

/// Advance past `digits [. digits] [e [+-] digits]`.
fn scan_number(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i < chars.len() && chars[i] == '.' {
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        if j < chars.len() && chars[j].is_ascii_digit() {
            while j < chars.len() && chars[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    i
}

/// Integer literals stay integers; ones beyond i64 become floats.
fn parse_number(literal: &str) -> Result<Number, ExprError> {
    let invalid = || ExprError::InvalidNumber {
        literal: literal.to_string(),
    };
    if literal.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(i) = literal.parse::<i64>() {
            return Ok(Number::Int(i));
        }
    }
    let value: f64 = literal.parse().map_err(|_| invalid())?;
    if value.is_finite() {
        Ok(Number::Float(value))
    } else {
        Err(invalid())
    }
}
