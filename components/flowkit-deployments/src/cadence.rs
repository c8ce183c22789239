//! Top-level declaration scanner for Cadence sources.
//!
//! Only what deployment and transaction building need is recognised: import
//! declarations, contract and contract interface names, transaction
//! parameters with their `prepare` block, and top-level functions. Bodies are
//! skipped by brace matching.
//!
//! Parameters must carry a type annotation as Cadence requires, so a
//! `prepare(auth1, auth2)` list is a parse error rather than two parameters.

use std::fmt;

use flow_codec::Address;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    String,
    Number,
    Symbol,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Unescaped content for strings, source text otherwise.
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub line: usize,
}

impl Token {
    fn is_identifier(&self, text: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == text
    }

    fn is_symbol(&self, symbol: &str) -> bool {
        self.kind == TokenKind::Symbol && self.text == symbol
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let bytes = source.as_bytes();
    let mut tokens = vec![];
    let mut line = 1;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'\n' => {
                line += 1;
                i += 1;
            }
            c if c.is_ascii_whitespace() => i += 1,
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let opened_at = line;
                let mut depth = 0;
                loop {
                    match (bytes.get(i), bytes.get(i + 1)) {
                        (Some(b'/'), Some(b'*')) => {
                            depth += 1;
                            i += 2;
                        }
                        (Some(b'*'), Some(b'/')) => {
                            depth -= 1;
                            i += 2;
                            if depth == 0 {
                                break;
                            }
                        }
                        (Some(b'\n'), _) => {
                            line += 1;
                            i += 1;
                        }
                        (Some(_), _) => i += 1,
                        (None, _) => {
                            return Err(ParseError {
                                line: opened_at,
                                message: "unterminated block comment".into(),
                            })
                        }
                    }
                }
            }
            b'"' => {
                let start = i;
                let mut text = String::new();
                i += 1;
                loop {
                    let Some(ch) = source[i..].chars().next() else {
                        return Err(ParseError {
                            line,
                            message: "unterminated string literal".into(),
                        });
                    };
                    match ch {
                        '"' => {
                            i += 1;
                            break;
                        }
                        '\n' => {
                            return Err(ParseError {
                                line,
                                message: "unterminated string literal".into(),
                            })
                        }
                        '\\' => {
                            let escaped = source[i + 1..].chars().next().ok_or(ParseError {
                                line,
                                message: "unterminated string literal".into(),
                            })?;
                            text.push(match escaped {
                                'n' => '\n',
                                't' => '\t',
                                'r' => '\r',
                                '0' => '\0',
                                other => other,
                            });
                            i += 1 + escaped.len_utf8();
                        }
                        other => {
                            text.push(other);
                            i += other.len_utf8();
                        }
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::String,
                    text,
                    start,
                    end: i,
                    line,
                });
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Identifier,
                    text: source[start..i].to_string(),
                    start,
                    end: i,
                    line,
                });
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'.')
                {
                    i += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Number,
                    text: source[start..i].to_string(),
                    start,
                    end: i,
                    line,
                });
            }
            _ => {
                let len = source[i..].chars().next().map(char::len_utf8).unwrap_or(1);
                tokens.push(Token {
                    kind: TokenKind::Symbol,
                    text: source[i..i + len].to_string(),
                    start: i,
                    end: i + len,
                    line,
                });
                i += len;
            }
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportLocation {
    /// `import X from "./X.cdc"` or `import "X"`.
    String(String),
    /// `import X from 0x01`.
    Address(Address),
    /// `import Crypto`.
    Identifier(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDeclaration {
    pub identifiers: Vec<String>,
    pub location: ImportLocation,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub label: Option<String>,
    pub name: String,
    pub type_annotation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDeclaration {
    pub parameters: Vec<Parameter>,
    /// Parameters of the `prepare` block, `None` when there is no such block.
    pub prepare_parameters: Option<Vec<Parameter>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Import(ImportDeclaration),
    Contract { name: String, is_interface: bool },
    Transaction(TransactionDeclaration),
    Function { name: String },
    Other,
}

const DECLARATION_KEYWORDS: &[&str] = &[
    "import",
    "pub",
    "priv",
    "access",
    "contract",
    "transaction",
    "fun",
    "resource",
    "struct",
    "event",
    "enum",
    "entitlement",
    "attachment",
    "let",
    "var",
];

/// Parses the top-level declarations of `source`.
pub fn parse(source: &str) -> Result<Vec<Declaration>, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    parser.declarations()
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn line(&self) -> usize {
        self.peek()
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, ParseError> {
        Err(ParseError {
            line: self.line(),
            message: message.into(),
        })
    }

    fn expect_identifier(&mut self, what: &str) -> Result<Token, ParseError> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Identifier => {
                let token = token.clone();
                self.pos += 1;
                Ok(token)
            }
            Some(token) => {
                let found = token.text.clone();
                self.error(format!("expected {what}, got {found}"))
            }
            None => self.error(format!("expected {what}, got end of file")),
        }
    }

    fn declarations(&mut self) -> Result<Vec<Declaration>, ParseError> {
        let mut declarations = vec![];
        while let Some(token) = self.peek() {
            if token.is_identifier("import") {
                self.pos += 1;
                declarations.push(Declaration::Import(self.import()?));
                continue;
            }
            if token.is_symbol(";") {
                self.pos += 1;
                continue;
            }
            if token.is_symbol("}") || token.is_symbol(")") {
                return self.error(format!("unexpected {}", token.text));
            }
            self.skip_modifiers()?;
            declarations.push(self.declaration()?);
        }
        Ok(declarations)
    }

    fn skip_modifiers(&mut self) -> Result<(), ParseError> {
        loop {
            let Some(token) = self.peek() else {
                return Ok(());
            };
            let is_modifier = ["pub", "priv", "access", "view", "static", "native"]
                .iter()
                .any(|m| token.is_identifier(m));
            if !is_modifier {
                return Ok(());
            }
            self.pos += 1;
            if self.peek().map(|t| t.is_symbol("(")).unwrap_or(false) {
                self.skip_balanced("(", ")")?;
            }
        }
    }

    fn declaration(&mut self) -> Result<Declaration, ParseError> {
        let Some(token) = self.next() else {
            return Ok(Declaration::Other);
        };
        if token.is_identifier("contract") {
            let is_interface = self
                .peek()
                .map(|t| t.is_identifier("interface"))
                .unwrap_or(false)
                && self
                    .peek_at(1)
                    .map(|t| t.kind == TokenKind::Identifier)
                    .unwrap_or(false);
            if is_interface {
                self.pos += 1;
            }
            let name = self.expect_identifier("contract name")?.text;
            self.skip_declaration()?;
            return Ok(Declaration::Contract { name, is_interface });
        }
        if token.is_identifier("transaction") {
            return Ok(Declaration::Transaction(self.transaction()?));
        }
        if token.is_identifier("fun") {
            let name = self.expect_identifier("function name")?.text;
            self.skip_declaration()?;
            return Ok(Declaration::Function { name });
        }
        self.skip_declaration()?;
        Ok(Declaration::Other)
    }

    fn import(&mut self) -> Result<ImportDeclaration, ParseError> {
        let line = self.line();
        if let Some(token) = self.peek() {
            if token.kind == TokenKind::String {
                let name = token.text.clone();
                self.pos += 1;
                return Ok(ImportDeclaration {
                    identifiers: vec![name.clone()],
                    location: ImportLocation::String(name),
                    line,
                });
            }
        }

        let mut identifiers = vec![self.expect_identifier("import identifier")?.text];
        while self.peek().map(|t| t.is_symbol(",")).unwrap_or(false) {
            self.pos += 1;
            identifiers.push(self.expect_identifier("import identifier")?.text);
        }
        if !self.peek().map(|t| t.is_identifier("from")).unwrap_or(false) {
            let location = identifiers.remove(0);
            if !identifiers.is_empty() {
                return self.error("expected from in import declaration");
            }
            return Ok(ImportDeclaration {
                identifiers,
                location: ImportLocation::Identifier(location),
                line,
            });
        }
        self.pos += 1;

        let location = match self.next() {
            Some(token) if token.kind == TokenKind::String => ImportLocation::String(token.text),
            Some(token) if token.kind == TokenKind::Number => {
                let address = Address::from_hex(&token.text).map_err(|_| ParseError {
                    line: token.line,
                    message: format!("invalid import address {}", token.text),
                })?;
                ImportLocation::Address(address)
            }
            Some(token) if token.kind == TokenKind::Identifier => {
                ImportLocation::Identifier(token.text)
            }
            _ => return self.error("expected import location"),
        };
        Ok(ImportDeclaration {
            identifiers,
            location,
            line,
        })
    }

    fn transaction(&mut self) -> Result<TransactionDeclaration, ParseError> {
        let parameters = if self.peek().map(|t| t.is_symbol("(")).unwrap_or(false) {
            self.parameters()?
        } else {
            vec![]
        };
        if !self.peek().map(|t| t.is_symbol("{")).unwrap_or(false) {
            return self.error("expected { after transaction");
        }
        self.pos += 1;

        let mut prepare_parameters = None;
        let mut depth = 1;
        while depth > 0 {
            let Some(token) = self.peek().cloned() else {
                return self.error("expected } to close transaction");
            };
            if depth == 1
                && token.is_identifier("prepare")
                && self.peek_at(1).map(|t| t.is_symbol("(")).unwrap_or(false)
            {
                self.pos += 1;
                prepare_parameters = Some(self.parameters()?);
                continue;
            }
            if token.is_symbol("{") {
                depth += 1;
            } else if token.is_symbol("}") {
                depth -= 1;
            }
            self.pos += 1;
        }
        Ok(TransactionDeclaration {
            parameters,
            prepare_parameters,
        })
    }

    /// Parses a parenthesised parameter list starting at `(`. Every
    /// parameter needs a `label: Type` annotation.
    fn parameters(&mut self) -> Result<Vec<Parameter>, ParseError> {
        self.pos += 1;
        let mut groups: Vec<Vec<Token>> = vec![vec![]];
        let mut depth = 0;
        loop {
            let Some(token) = self.next() else {
                return self.error("expected ) to close parameter list");
            };
            if token.kind == TokenKind::Symbol {
                match token.text.as_str() {
                    ")" if depth == 0 => break,
                    "(" | "[" | "{" | "<" => depth += 1,
                    ")" | "]" | "}" | ">" => depth -= 1,
                    "," if depth == 0 => {
                        groups.push(vec![]);
                        continue;
                    }
                    _ => {}
                }
            }
            if let Some(group) = groups.last_mut() {
                group.push(token);
            }
        }

        let mut parameters = vec![];
        for group in groups {
            if group.is_empty() {
                continue;
            }
            let Some(colon) = group.iter().position(|t| t.is_symbol(":")) else {
                return Err(ParseError {
                    line: group[0].line,
                    message: "expected : in parameter".into(),
                });
            };
            let names: Vec<&Token> = group[..colon].iter().collect();
            let (label, name) = match names.as_slice() {
                [name] => (None, name.text.clone()),
                [label, name] => (Some(label.text.clone()), name.text.clone()),
                _ => {
                    return Err(ParseError {
                        line: group[0].line,
                        message: "invalid parameter name".into(),
                    })
                }
            };
            let type_annotation = match (group.get(colon + 1), group.last()) {
                (Some(first), Some(last)) => self.source[first.start..last.end].trim().to_string(),
                _ => {
                    return Err(ParseError {
                        line: group[0].line,
                        message: format!("missing type for parameter {name}"),
                    })
                }
            };
            parameters.push(Parameter {
                label,
                name,
                type_annotation,
            });
        }
        Ok(parameters)
    }

    /// Skips `(` ... `)` style groups starting at the opening symbol.
    fn skip_balanced(&mut self, open: &str, close: &str) -> Result<(), ParseError> {
        let mut depth = 0;
        loop {
            let Some(token) = self.next() else {
                return self.error(format!("expected {close}"));
            };
            if token.is_symbol(open) {
                depth += 1;
            } else if token.is_symbol(close) {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
        }
    }

    /// Skips to the end of the current declaration: after its body, or right
    /// before the next declaration keyword.
    fn skip_declaration(&mut self) -> Result<(), ParseError> {
        while let Some(token) = self.peek() {
            if token.is_symbol("{") {
                return self.skip_balanced("{", "}");
            }
            if token.is_symbol("(") {
                self.skip_balanced("(", ")")?;
                continue;
            }
            if token.is_symbol("}") {
                return self.error("unexpected }");
            }
            if token.kind == TokenKind::Identifier
                && DECLARATION_KEYWORDS.contains(&token.text.as_str())
            {
                return Ok(());
            }
            self.pos += 1;
        }
        Ok(())
    }
}
