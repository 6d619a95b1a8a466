//! Minimal reader for the S-expression syntax shared by `.kicad_sch`,
//! `.kicad_pcb` and the library tables.
//!
//! Only the structure is kept: quoted and bare atoms both become
//! [`SExpr::Atom`], numbers are left as text.

use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("input contains no expression")]
    Empty,

    #[error("unterminated string starting on line {line}")]
    UnterminatedString { line: usize },

    #[error("unexpected ')' on line {line}")]
    UnexpectedClose { line: usize },

    #[error("expected '(' on line {line}")]
    ExpectedList { line: usize },

    #[error("input ended with {depth} unclosed list(s)")]
    Unbalanced { depth: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SExpr {
    Atom(String),
    List(Vec<SExpr>),
}

/// Parses the first top-level list in `text`. Anything after it is ignored.
pub fn parse(text: &str) -> Result<SExpr, ParseError> {
    let mut stack: Vec<Vec<SExpr>> = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut line = 1;

    while let Some((_, c)) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {}
            '(' => stack.push(Vec::new()),
            ')' => {
                let items = stack.pop().ok_or(ParseError::UnexpectedClose { line })?;
                let node = SExpr::List(items);
                match stack.last_mut() {
                    Some(parent) => parent.push(node),
                    None => return Ok(node),
                }
            }
            '"' => {
                let start_line = line;
                let value = read_quoted(&mut chars, &mut line)
                    .ok_or(ParseError::UnterminatedString { line: start_line })?;
                push_atom(&mut stack, value, start_line)?;
            }
            _ => {
                let mut atom = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_whitespace() || matches!(next, '(' | ')' | '"') {
                        break;
                    }
                    atom.push(next);
                    chars.next();
                }
                push_atom(&mut stack, atom, line)?;
            }
        }
    }

    if stack.is_empty() {
        Err(ParseError::Empty)
    } else {
        Err(ParseError::Unbalanced { depth: stack.len() })
    }
}

fn push_atom(stack: &mut [Vec<SExpr>], atom: String, line: usize) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(list) => {
            list.push(SExpr::Atom(atom));
            Ok(())
        }
        None => Err(ParseError::ExpectedList { line }),
    }
}

// Only `\"` and `\\` are unescaped; other backslashes are kept verbatim so
// Windows-style paths survive.
fn read_quoted(chars: &mut Peekable<CharIndices<'_>>, line: &mut usize) -> Option<String> {
    let mut value = String::new();
    while let Some((_, c)) = chars.next() {
        match c {
            '"' => return Some(value),
            '\\' => match chars.peek() {
                Some(&(_, escaped @ ('"' | '\\'))) => {
                    value.push(escaped);
                    chars.next();
                }
                _ => value.push('\\'),
            },
            '\n' => {
                *line += 1;
                value.push('\n');
            }
            other => value.push(other),
        }
    }
    None
}

impl SExpr {
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExpr::Atom(value) => Some(value),
            SExpr::List(_) => None,
        }
    }

    pub fn children(&self) -> &[SExpr] {
        match self {
            SExpr::List(items) => items,
            SExpr::Atom(_) => &[],
        }
    }

    /// The leading atom of a list, e.g. `sheet` for `(sheet ...)`.
    pub fn head(&self) -> Option<&str> {
        self.children().first().and_then(SExpr::as_atom)
    }

    /// Every list named `name` in pre-order, the node itself included.
    pub fn find_all(&self, name: &str) -> Vec<&SExpr> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a SExpr>) {
        if self.head() == Some(name) {
            found.push(self);
        }
        for child in self.children() {
            if let SExpr::List(_) = child {
                child.collect_named(name, found);
            }
        }
    }

    /// Value of a direct `(property "name" "value" ...)` child.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.children().iter().find_map(|child| match child.children() {
            [key, prop_name, value, ..]
                if key.as_atom() == Some("property") && prop_name.as_atom() == Some(name) =>
            {
                value.as_atom()
            }
            _ => None,
        })
    }

    /// First atom of a direct `(key value ...)` child.
    pub fn value_of(&self, key: &str) -> Option<&str> {
        self.children().iter().find_map(|child| match child.children() {
            [head, value, ..] if head.as_atom() == Some(key) => value.as_atom(),
            _ => None,
        })
    }
}
