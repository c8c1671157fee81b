use crate::error::Error;
use std::fmt;

/// Named patterns accepted wherever a template is configured.
pub const PRESETS: &[(&str, &str)] = &[
    ("default", "{key}_{chapter}.mp4"),
    ("numbered", "{key}_{chapter}.mp4"),
    ("gopro", "G?{chapter:2}{key:4}.mp4"),
    ("gopro-legacy", "GP{chapter:2}{key:4}.mp4"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Key,
    Chapter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Stored lowercased, compared ASCII case-insensitively.
    Literal(Vec<char>),
    Capture { field: Field, width: Option<usize> },
    AnyChar,
    AnyRun,
}

/// Session key and chapter text pulled out of a matching file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub session_key: String,
    pub chapter_label: String,
}

/// Filename template with one `{key}` and one `{chapter}` placeholder.
///
/// * `{key}` - one or more characters
/// * `{chapter}` - one or more ASCII alphanumerics
/// * `{key:N}` / `{chapter:N}` - exactly N characters
/// * `?` - any single character, `*` - any run of characters
/// * `{{` and `}}` - literal braces
///
/// Everything else matches literally, ignoring ASCII case. Variable-width
/// placeholders are greedy and backtrack, so `{key}_{chapter}.mp4` splits
/// `A_B_001.MP4` into `A_B` and `001`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenamePattern {
    source: String,
    tokens: Vec<Token>,
}

impl FilenamePattern {
    /// Resolve a preset name, or parse the value as a template.
    pub fn from_config(value: &str) -> Result<Self, Error> {
        let lowered = value.trim().to_ascii_lowercase();
        match PRESETS.iter().find(|(name, _)| *name == lowered) {
            Some((_, template)) => Self::parse(template),
            None => Self::parse(value),
        }
    }

    pub fn parse(template: &str) -> Result<Self, Error> {
        let invalid = |reason: &str| Error::Pattern {
            pattern: template.to_string(),
            reason: reason.to_string(),
        };

        let mut tokens: Vec<Token> = Vec::new();
        let mut literal: Vec<char> = Vec::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(invalid("unmatched '}'")),
                '{' => {
                    let mut body = String::new();
                    let mut closed = false;
                    for inner in chars.by_ref() {
                        if inner == '}' {
                            closed = true;
                            break;
                        }
                        body.push(inner);
                    }
                    if !closed {
                        return Err(invalid("unterminated placeholder"));
                    }
                    flush_literal(&mut tokens, &mut literal);
                    tokens.push(parse_placeholder(&body).map_err(|reason| invalid(&reason))?);
                }
                '?' => {
                    flush_literal(&mut tokens, &mut literal);
                    tokens.push(Token::AnyChar);
                }
                '*' => {
                    flush_literal(&mut tokens, &mut literal);
                    tokens.push(Token::AnyRun);
                }
                other => literal.push(other.to_ascii_lowercase()),
            }
        }
        flush_literal(&mut tokens, &mut literal);

        let count = |wanted: Field| {
            tokens
                .iter()
                .filter(|t| matches!(t, Token::Capture { field, .. } if *field == wanted))
                .count()
        };
        if count(Field::Key) != 1 {
            return Err(invalid("expected exactly one {key} placeholder"));
        }
        if count(Field::Chapter) != 1 {
            return Err(invalid("expected exactly one {chapter} placeholder"));
        }

        Ok(Self {
            source: template.to_string(),
            tokens,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match a whole file name. Returns `None` when it does not fit.
    pub fn match_name(&self, name: &str) -> Option<PatternMatch> {
        let chars: Vec<char> = name.chars().collect();
        let mut captures = Captures::default();
        let mut matcher = Matcher {
            tokens: &self.tokens,
            name: &chars,
            failed: vec![false; (self.tokens.len() + 1) * (chars.len() + 1)],
        };
        if !matcher.match_from(0, 0, &mut captures) {
            return None;
        }
        let (key_start, key_end) = captures.key?;
        let (chapter_start, chapter_end) = captures.chapter?;
        Some(PatternMatch {
            session_key: chars[key_start..key_end].iter().collect(),
            chapter_label: chars[chapter_start..chapter_end].iter().collect(),
        })
    }
}

impl fmt::Display for FilenamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn flush_literal(tokens: &mut Vec<Token>, literal: &mut Vec<char>) {
    if !literal.is_empty() {
        tokens.push(Token::Literal(std::mem::take(literal)));
    }
}

fn parse_placeholder(body: &str) -> Result<Token, String> {
    let (name, width) = match body.split_once(':') {
        Some((name, width)) => {
            let width: usize = width
                .trim()
                .parse()
                .map_err(|_| format!("invalid width '{}'", width))?;
            if width == 0 {
                return Err("placeholder width must be at least 1".to_string());
            }
            (name.trim(), Some(width))
        }
        None => (body.trim(), None),
    };
    let field = match name {
        "key" => Field::Key,
        "chapter" => Field::Chapter,
        other => return Err(format!("unknown placeholder '{{{}}}'", other)),
    };
    Ok(Token::Capture { field, width })
}

#[derive(Debug, Default, Clone, Copy)]
struct Captures {
    key: Option<(usize, usize)>,
    chapter: Option<(usize, usize)>,
}

impl Captures {
    fn set(&mut self, field: Field, span: (usize, usize)) {
        match field {
            Field::Key => self.key = Some(span),
            Field::Chapter => self.chapter = Some(span),
        }
    }
}

fn accepts(field: Field, c: char) -> bool {
    match field {
        Field::Key => true,
        Field::Chapter => c.is_ascii_alphanumeric(),
    }
}

/// Backtracking state for one name. Whether the rest of the name matches the
/// rest of the template depends only on the two positions, never on earlier
/// captures, so each failed `(token, char)` pair is remembered and never
/// retried. That keeps wildcard-heavy templates polynomial.
struct Matcher<'a> {
    tokens: &'a [Token],
    name: &'a [char],
    failed: Vec<bool>,
}

impl Matcher<'_> {
    fn match_from(&mut self, ti: usize, ni: usize, captures: &mut Captures) -> bool {
        let state = ti * (self.name.len() + 1) + ni;
        if self.failed[state] {
            return false;
        }
        let matched = self.step(ti, ni, captures);
        if !matched {
            self.failed[state] = true;
        }
        matched
    }

    fn step(&mut self, ti: usize, ni: usize, captures: &mut Captures) -> bool {
        let (tokens, name) = (self.tokens, self.name);
        let Some(token) = tokens.get(ti) else {
            return ni == name.len();
        };

        match token {
            Token::Literal(text) => {
                let end = ni + text.len();
                end <= name.len()
                    && name[ni..end]
                        .iter()
                        .zip(text)
                        .all(|(a, b)| a.to_ascii_lowercase() == *b)
                    && self.match_from(ti + 1, end, captures)
            }
            Token::AnyChar => ni < name.len() && self.match_from(ti + 1, ni + 1, captures),
            Token::AnyRun => (ni..=name.len())
                .rev()
                .any(|end| self.match_from(ti + 1, end, captures)),
            Token::Capture {
                field,
                width: Some(width),
            } => {
                let end = ni + width;
                if end > name.len() || !name[ni..end].iter().all(|c| accepts(*field, *c)) {
                    return false;
                }
                let saved = *captures;
                captures.set(*field, (ni, end));
                if self.match_from(ti + 1, end, captures) {
                    return true;
                }
                *captures = saved;
                false
            }
            Token::Capture { field, width: None } => {
                let run = name[ni..].iter().take_while(|c| accepts(*field, **c)).count();
                for len in (1..=run).rev() {
                    let saved = *captures;
                    captures.set(*field, (ni, ni + len));
                    if self.match_from(ti + 1, ni + len, captures) {
                        return true;
                    }
                    *captures = saved;
                }
                false
            }
        }
    }
}
