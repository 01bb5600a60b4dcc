//! CSS Selector Matching
//!
//! The selector subset the toolkit needs for queries, `closest` and event
//! delegation: compound selectors (`*`, tag, `#id`, `.class`, attribute
//! tests with an optional ` i` flag, `:not(...)`), descendant and child
//! combinators, and comma separated lists.

use crate::{DomError, DomResult, DomTree, NodeId};

/// Parsed selector list (`a, b, c`)
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList {
    selectors: Vec<ComplexSelector>,
}

/// Compound selectors joined by combinators, stored left to right
#[derive(Debug, Clone, PartialEq)]
struct ComplexSelector {
    /// First compound has no combinator
    parts: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    /// Leading compound
    None,
    /// Whitespace
    Descendant,
    /// `>`
    Child,
}

/// A compound selector such as `input.big[name="x" i]:not([readonly])`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
    negations: Vec<SelectorList>,
}

/// Attribute test
#[derive(Debug, Clone, PartialEq)]
struct AttrSelector {
    name: String,
    test: Option<AttrTest>,
}

#[derive(Debug, Clone, PartialEq)]
struct AttrTest {
    op: AttrOp,
    value: String,
    case_insensitive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    /// `=`
    Equals,
    /// `~=`
    Includes,
    /// `^=`
    Prefix,
    /// `$=`
    Suffix,
    /// `*=`
    Substring,
}

impl AttrTest {
    fn matches(&self, actual: &str) -> bool {
        let (actual, expected) = if self.case_insensitive {
            (actual.to_lowercase(), self.value.to_lowercase())
        } else {
            (actual.to_string(), self.value.clone())
        };
        match self.op {
            AttrOp::Equals => actual == expected,
            AttrOp::Includes => actual.split_whitespace().any(|w| w == expected),
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(&expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(&expected),
            AttrOp::Substring => !expected.is_empty() && actual.contains(&expected),
        }
    }
}

impl SelectorList {
    /// Parse a selector list
    pub fn parse(input: &str) -> DomResult<Self> {
        let mut selectors = Vec::new();
        for part in split_top_level(input, ',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(DomError::Selector(input.to_string()));
            }
            selectors.push(parse_complex(part).ok_or_else(|| DomError::Selector(input.to_string()))?);
        }
        if selectors.is_empty() {
            return Err(DomError::Selector(input.to_string()));
        }
        Ok(Self { selectors })
    }

    /// Check whether `node` matches any selector in the list
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        self.selectors.iter().any(|s| s.matches(tree, node))
    }
}

impl ComplexSelector {
    fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        match_from(tree, node, &self.parts, self.parts.len())
    }
}

/// Match `parts[..end]` with the last compound anchored at `node`
fn match_from(tree: &DomTree, node: NodeId, parts: &[(Combinator, Compound)], end: usize) -> bool {
    let (combinator, compound) = &parts[end - 1];
    if !compound.matches(tree, node) {
        return false;
    }
    if end == 1 {
        return true;
    }
    match combinator {
        Combinator::Child => tree
            .parent_element(node)
            .is_some_and(|parent| match_from(tree, parent, parts, end - 1)),
        Combinator::Descendant => {
            let mut cursor = tree.parent_element(node);
            while let Some(ancestor) = cursor {
                if match_from(tree, ancestor, parts, end - 1) {
                    return true;
                }
                cursor = tree.parent_element(ancestor);
            }
            false
        }
        Combinator::None => true,
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.ids.is_empty()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.negations.is_empty()
    }

    fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        let Some(elem) = tree.element(node) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if !elem.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if !self.ids.iter().all(|id| elem.id() == Some(id.as_str())) {
            return false;
        }
        if !self.classes.iter().all(|c| elem.has_class(c)) {
            return false;
        }
        for attr in &self.attrs {
            match (elem.get_attr(&attr.name), &attr.test) {
                (None, _) => return false,
                (Some(_), None) => {}
                (Some(actual), Some(test)) => {
                    if !test.matches(actual) {
                        return false;
                    }
                }
            }
        }
        self.negations.iter().all(|neg| !neg.matches(tree, node))
    }
}

/// Split on `sep` outside of brackets, parentheses and quotes
fn split_top_level(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '[' | '(' => depth += 1,
                ']' | ')' => depth -= 1,
                _ if c == sep && depth == 0 => {
                    parts.push(&input[start..i]);
                    start = i + c.len_utf8();
                }
                _ => {}
            },
        }
    }
    parts.push(&input[start..]);
    parts
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

struct Cursor<'a> {
    chars: Vec<char>,
    pos: usize,
    _src: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
            _src: src,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn ident(&mut self) -> Option<String> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        (self.pos > start).then(|| self.chars[start..self.pos].iter().collect())
    }

    fn quoted_or_ident(&mut self) -> Option<String> {
        match self.peek()? {
            q @ ('"' | '\'') => {
                self.pos += 1;
                let mut out = String::new();
                loop {
                    match self.bump()? {
                        c if c == q => return Some(out),
                        '\\' => out.push(self.bump()?),
                        c => out.push(c),
                    }
                }
            }
            _ => self.ident(),
        }
    }

    /// Text up to the parenthesis closing the one just consumed
    fn balanced_group(&mut self) -> Option<String> {
        let mut depth = 1;
        let mut out = String::new();
        let mut quote: Option<char> = None;
        loop {
            let c = self.bump()?;
            match quote {
                Some(q) if c == q => quote = None,
                Some(_) => {}
                None => match c {
                    '"' | '\'' => quote = Some(c),
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            return Some(out);
                        }
                    }
                    _ => {}
                },
            }
            out.push(c);
        }
    }
}

fn parse_complex(input: &str) -> Option<ComplexSelector> {
    let mut cursor = Cursor::new(input);
    let mut parts = Vec::new();
    cursor.skip_ws();
    let mut combinator = Combinator::None;
    loop {
        let compound = parse_compound(&mut cursor)?;
        parts.push((combinator, compound));
        let had_ws = cursor.skip_ws();
        match cursor.peek() {
            None => break,
            Some('>') => {
                cursor.bump();
                cursor.skip_ws();
                combinator = Combinator::Child;
            }
            Some(_) if had_ws => combinator = Combinator::Descendant,
            Some(_) => return None,
        }
    }
    Some(ComplexSelector { parts })
}

fn parse_compound(cursor: &mut Cursor<'_>) -> Option<Compound> {
    let mut compound = Compound::default();
    let mut universal = false;
    if cursor.eat('*') {
        universal = true;
    } else if cursor.peek().is_some_and(is_ident_char) {
        compound.tag = Some(cursor.ident()?.to_ascii_lowercase());
    }
    loop {
        match cursor.peek() {
            Some('#') => {
                cursor.bump();
                compound.ids.push(cursor.ident()?);
            }
            Some('.') => {
                cursor.bump();
                compound.classes.push(cursor.ident()?);
            }
            Some('[') => {
                cursor.bump();
                compound.attrs.push(parse_attr(cursor)?);
            }
            Some(':') => {
                cursor.bump();
                let name = cursor.ident()?;
                if !name.eq_ignore_ascii_case("not") || !cursor.eat('(') {
                    return None;
                }
                let inner = cursor.balanced_group()?;
                compound.negations.push(SelectorList::parse(&inner).ok()?);
            }
            _ => break,
        }
    }
    if compound.is_empty() && !universal {
        return None;
    }
    Some(compound)
}

fn parse_attr(cursor: &mut Cursor<'_>) -> Option<AttrSelector> {
    cursor.skip_ws();
    let name = cursor.ident()?.to_ascii_lowercase();
    cursor.skip_ws();
    if cursor.eat(']') {
        return Some(AttrSelector { name, test: None });
    }
    let op = match cursor.bump()? {
        '=' => AttrOp::Equals,
        c @ ('~' | '^' | '$' | '*') => {
            if !cursor.eat('=') {
                return None;
            }
            match c {
                '~' => AttrOp::Includes,
                '^' => AttrOp::Prefix,
                '$' => AttrOp::Suffix,
                _ => AttrOp::Substring,
            }
        }
        _ => return None,
    };
    cursor.skip_ws();
    let value = cursor.quoted_or_ident()?;
    cursor.skip_ws();
    let mut case_insensitive = false;
    if cursor.peek().is_some_and(|c| c == 'i' || c == 'I') {
        cursor.bump();
        case_insensitive = true;
        cursor.skip_ws();
    } else if cursor.peek().is_some_and(|c| c == 's' || c == 'S') {
        cursor.bump();
        cursor.skip_ws();
    }
    if !cursor.eat(']') {
        return None;
    }
    Some(AttrSelector {
        name,
        test: Some(AttrTest {
            op,
            value,
            case_insensitive,
        }),
    })
}
