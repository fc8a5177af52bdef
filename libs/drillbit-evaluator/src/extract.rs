/// Entry-Point Extraction
///
/// **Core Responsibility:**
/// Find the name of the function a submission wants graded, without running it.
///
/// **How:**
/// A small lexer walks the source, skipping comments, string and template
/// literals, and regular-expression literals, while tracking bracket
/// nesting. Only bindings at nesting depth 0 are candidates, so decoys in
/// comments or strings and helpers nested inside the solution are ignored.
///
/// **Selection Rules (first rule that yields a candidate wins):**
/// 1. A top-level binding whose name equals the configured hint
/// 2. The first function declaration in source order
/// 3. The first arrow-function or function-expression binding in source order
/// 4. Otherwise `ExtractError::NoFunctionFound`

use crate::error::ExtractError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// `function name(...) {}` (including `async` and generator forms)
    Declaration,
    /// `const name = (...) => ...` or `const name = param => ...`
    Arrow,
    /// `const name = function (...) {}`
    FunctionExpression,
}

/// A callable bound at the top level of a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    /// Byte offset of the name in the source
    pub offset: usize,
}

/// Locate the entry point of a submission
pub fn find_entry_point(source: &str, hint: Option<&str>) -> Result<Binding, ExtractError> {
    let bindings = top_level_bindings(source);

    if let Some(hint) = hint {
        if let Some(binding) = bindings.iter().find(|binding| binding.name == hint) {
            return Ok(binding.clone());
        }
    }

    bindings
        .iter()
        .find(|binding| binding.kind == BindingKind::Declaration)
        .or_else(|| bindings.iter().find(|binding| binding.kind != BindingKind::Declaration))
        .cloned()
        .ok_or(ExtractError::NoFunctionFound)
}

/// All top-level function bindings, in source order
pub fn top_level_bindings(source: &str) -> Vec<Binding> {
    let tokens = Lexer::new(source).tokenize();
    let mut bindings = Vec::new();

    for (index, token) in tokens.iter().enumerate() {
        if token.depth != 0 {
            continue;
        }
        let TokenKind::Ident(word) = &token.kind else {
            continue;
        };
        let binding = match word.as_str() {
            "function" => declaration_at(&tokens, index),
            "const" | "let" | "var" => assigned_function_at(&tokens, index),
            _ => None,
        };
        if let Some(binding) = binding {
            bindings.push(binding);
        }
    }

    bindings
}

const RESERVED: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "export", "extends", "false", "finally", "for", "function", "if",
    "import", "in", "instanceof", "let", "new", "null", "return", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Keywords after which a `/` starts a regular expression
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return", "typeof", "case", "do", "else", "in", "of", "new", "delete", "void", "throw",
    "instanceof", "yield", "await",
];

/// Keywords that cannot end an expression statement
const EXPRESSION_CONTINUING_KEYWORDS: &[&str] = &[
    "typeof", "new", "void", "delete", "in", "of", "instanceof", "yield", "await", "case",
    "extends",
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Ident(String),
    Punct(char),
    Arrow,
    /// String, template, number, or regular-expression literal
    Literal,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
    /// Bracket nesting depth; an opener and its closer share a depth
    depth: usize,
    line_break_before: bool,
}

struct Lexer {
    chars: Vec<(usize, char)>,
    pos: usize,
    depth: usize,
    line_break: bool,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.char_indices().collect(),
            pos: 0,
            depth: 0,
            line_break: false,
            tokens: Vec::new(),
        }
    }

    fn peek(&self, at: usize) -> Option<char> {
        self.chars.get(at).map(|&(_, c)| c)
    }

    fn push(&mut self, kind: TokenKind, offset: usize) {
        self.tokens.push(Token {
            kind,
            offset,
            depth: self.depth,
            line_break_before: self.line_break,
        });
        self.line_break = false;
    }

    fn tokenize(mut self) -> Vec<Token> {
        while let Some(&(offset, c)) = self.chars.get(self.pos) {
            match c {
                '\n' | '\r' | '\u{2028}' | '\u{2029}' => {
                    self.line_break = true;
                    self.pos += 1;
                }
                c if c.is_whitespace() => self.pos += 1,
                '/' if self.peek(self.pos + 1) == Some('/') => self.skip_line_comment(),
                '/' if self.peek(self.pos + 1) == Some('*') => self.skip_block_comment(),
                '/' if self.regex_allowed() => {
                    self.skip_regex();
                    self.push(TokenKind::Literal, offset);
                }
                '\'' | '"' => {
                    self.pos = skip_string(&self.chars, self.pos);
                    self.push(TokenKind::Literal, offset);
                }
                '`' => {
                    self.pos = skip_template(&self.chars, self.pos);
                    self.push(TokenKind::Literal, offset);
                }
                c if is_ident_start(c) => {
                    let start = self.pos;
                    while self.peek(self.pos).is_some_and(is_ident_part) {
                        self.pos += 1;
                    }
                    let word: String = self.chars[start..self.pos].iter().map(|&(_, c)| c).collect();
                    self.push(TokenKind::Ident(word), offset);
                }
                c if c.is_ascii_digit() => {
                    while self
                        .peek(self.pos)
                        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
                    {
                        self.pos += 1;
                    }
                    self.push(TokenKind::Literal, offset);
                }
                '=' if self.peek(self.pos + 1) == Some('>') => {
                    self.pos += 2;
                    self.push(TokenKind::Arrow, offset);
                }
                '(' | '[' | '{' => {
                    self.pos += 1;
                    self.push(TokenKind::Punct(c), offset);
                    self.depth += 1;
                }
                ')' | ']' | '}' => {
                    self.pos += 1;
                    self.depth = self.depth.saturating_sub(1);
                    self.push(TokenKind::Punct(c), offset);
                }
                other => {
                    self.pos += 1;
                    self.push(TokenKind::Punct(other), offset);
                }
            }
        }
        self.tokens
    }

    fn regex_allowed(&self) -> bool {
        match self.tokens.last().map(|token| &token.kind) {
            None | Some(TokenKind::Arrow) => true,
            Some(TokenKind::Punct(c)) => !matches!(c, ')' | ']' | '}'),
            Some(TokenKind::Ident(word)) => REGEX_PRECEDING_KEYWORDS.contains(&word.as_str()),
            Some(TokenKind::Literal) => false,
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek(self.pos) {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        while let Some(c) = self.peek(self.pos) {
            if c == '*' && self.peek(self.pos + 1) == Some('/') {
                self.pos += 2;
                return;
            }
            if c == '\n' {
                self.line_break = true;
            }
            self.pos += 1;
        }
    }

    fn skip_regex(&mut self) {
        let mut in_class = false;
        self.pos += 1;
        while let Some(c) = self.peek(self.pos) {
            match c {
                '\\' => {
                    self.pos += 2;
                    continue;
                }
                '\n' => return,
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => {
                    self.pos += 1;
                    while self.peek(self.pos).is_some_and(is_ident_part) {
                        self.pos += 1;
                    }
                    return;
                }
                _ => {}
            }
            self.pos += 1;
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Returns the index just past the closing quote (or the end of the line
/// for an unterminated literal).
fn skip_string(chars: &[(usize, char)], start: usize) -> usize {
    let quote = chars[start].1;
    let mut pos = start + 1;
    while let Some(&(_, c)) = chars.get(pos) {
        match c {
            '\\' => pos += 2,
            '\n' => return pos,
            c if c == quote => return pos + 1,
            _ => pos += 1,
        }
    }
    chars.len()
}

fn skip_template(chars: &[(usize, char)], start: usize) -> usize {
    let mut pos = start + 1;
    while let Some(&(_, c)) = chars.get(pos) {
        match c {
            '\\' => pos += 2,
            '`' => return pos + 1,
            '$' if chars.get(pos + 1).map(|&(_, c)| c) == Some('{') => {
                pos = skip_substitution(chars, pos + 2);
            }
            _ => pos += 1,
        }
    }
    chars.len()
}

/// Skips a `${ ... }` body, starting just after the opening brace
fn skip_substitution(chars: &[(usize, char)], start: usize) -> usize {
    let mut depth = 1usize;
    let mut pos = start;
    while let Some(&(_, c)) = chars.get(pos) {
        match c {
            '{' => {
                depth += 1;
                pos += 1;
            }
            '}' => {
                depth -= 1;
                pos += 1;
                if depth == 0 {
                    return pos;
                }
            }
            '\'' | '"' => pos = skip_string(chars, pos),
            '`' => pos = skip_template(chars, pos),
            _ => pos += 1,
        }
    }
    chars.len()
}

fn is_punct(token: Option<&Token>, expected: char) -> bool {
    matches!(token.map(|token| &token.kind), Some(TokenKind::Punct(c)) if *c == expected)
}

fn is_word(token: Option<&Token>, expected: &str) -> bool {
    matches!(token.map(|token| &token.kind), Some(TokenKind::Ident(word)) if word == expected)
}

fn is_arrow(token: Option<&Token>) -> bool {
    matches!(token.map(|token| &token.kind), Some(TokenKind::Arrow))
}

/// A non-reserved identifier
fn binding_name(token: Option<&Token>) -> Option<&str> {
    match token.map(|token| &token.kind) {
        Some(TokenKind::Ident(word)) if !RESERVED.contains(&word.as_str()) => Some(word.as_str()),
        _ => None,
    }
}

/// Whether the token at `index` begins a statement rather than sitting
/// inside an expression
fn at_statement_start(tokens: &[Token], index: usize) -> bool {
    let Some(prev_index) = index.checked_sub(1) else {
        return true;
    };
    let prev = &tokens[prev_index];

    if let TokenKind::Ident(word) = &prev.kind {
        if matches!(word.as_str(), "async" | "export" | "default") {
            return at_statement_start(tokens, prev_index);
        }
    }

    match &prev.kind {
        TokenKind::Punct(';') | TokenKind::Punct('}') => true,
        _ => tokens[index].line_break_before && !continues_expression(prev),
    }
}

fn continues_expression(token: &Token) -> bool {
    match &token.kind {
        TokenKind::Punct(c) => "=(,:?[!&|+-*/%<>~^.".contains(*c),
        TokenKind::Arrow => true,
        TokenKind::Ident(word) => EXPRESSION_CONTINUING_KEYWORDS.contains(&word.as_str()),
        TokenKind::Literal => false,
    }
}

fn declaration_at(tokens: &[Token], index: usize) -> Option<Binding> {
    if !at_statement_start(tokens, index) {
        return None;
    }

    let mut next = index + 1;
    if is_punct(tokens.get(next), '*') {
        next += 1;
    }
    let name = binding_name(tokens.get(next))?;
    if !is_punct(tokens.get(next + 1), '(') {
        return None;
    }

    Some(Binding {
        name: name.to_string(),
        kind: BindingKind::Declaration,
        offset: tokens[next].offset,
    })
}

fn assigned_function_at(tokens: &[Token], index: usize) -> Option<Binding> {
    let name = binding_name(tokens.get(index + 1))?;
    if !is_punct(tokens.get(index + 2), '=') {
        return None;
    }

    let mut cursor = index + 3;
    // `async => ...` uses `async` as a parameter name
    if is_word(tokens.get(cursor), "async") && !is_arrow(tokens.get(cursor + 1)) {
        cursor += 1;
    }

    let kind = match &tokens.get(cursor)?.kind {
        TokenKind::Ident(word) if word.as_str() == "function" => BindingKind::FunctionExpression,
        TokenKind::Ident(_) if is_arrow(tokens.get(cursor + 1)) => BindingKind::Arrow,
        TokenKind::Punct('(') => {
            let close = matching_close(tokens, cursor)?;
            if !is_arrow(tokens.get(close + 1)) {
                return None;
            }
            BindingKind::Arrow
        }
        _ => return None,
    };

    Some(Binding {
        name: name.to_string(),
        kind,
        offset: tokens[index + 1].offset,
    })
}

fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let depth = tokens[open].depth;
    tokens
        .iter()
        .enumerate()
        .skip(open + 1)
        .find(|(_, token)| {
            token.depth == depth && matches!(token.kind, TokenKind::Punct(')' | ']' | '}'))
        })
        .filter(|(_, token)| token.kind == TokenKind::Punct(')'))
        .map(|(index, _)| index)
}
