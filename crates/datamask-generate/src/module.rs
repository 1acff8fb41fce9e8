//! Reads generated config modules back.
//!
//! Only the subset of the language [`generate_transform`] emits is
//! understood: imports, `copycat.setHashKey(..)`, and a default-exported
//! `defineConfig({ .. })` whose transform tables return literals or
//! copycat calls.
//!
//! [`generate_transform`]: crate::generate_transform

use std::iter::Peekable;
use std::str::Chars;

use datamask_transform::copycat::METHODS;
use datamask_transform::{
    CallInput, ColumnTransform, Copycat, CopycatCall, CopycatError, CopycatOptions, SelectConfig,
    TableTransform, Transform, TransformOverrides,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ModuleParseError;

type ParseResult<T> = std::result::Result<T, ModuleParseError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ModuleColumn {
    Call(CopycatCall),
    Value(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleTable {
    pub schema: String,
    pub table: String,
    /// `None` for `table: true`, which keeps every value.
    pub columns: Option<Vec<(String, ModuleColumn)>>,
}

/// A parsed config module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedModule {
    pub hash_key: Option<String>,
    pub subset: Option<Value>,
    pub select: Option<SelectConfig>,
    pub tables: Vec<ModuleTable>,
}

impl GeneratedModule {
    pub fn overrides(&self) -> TransformOverrides {
        TransformOverrides {
            hash_key: self.hash_key.clone(),
            ..TransformOverrides::default()
        }
    }

    pub fn call(&self, schema: &str, table: &str, column: &str) -> Option<&CopycatCall> {
        self.tables
            .iter()
            .filter(|entry| entry.schema == schema && entry.table == table)
            .flat_map(|entry| entry.columns.iter().flatten())
            .find_map(|(name, entry)| match entry {
                ModuleColumn::Call(call) if name == column => Some(call),
                _ => None,
            })
    }

    /// Build a transform whose column functions evaluate the parsed calls
    /// with the module's hash key.
    pub fn to_transform(&self) -> Transform {
        let copycat = Copycat::new(self.hash_key.clone());
        let mut transform = Transform::new().with_overrides(self.overrides());

        for entry in &self.tables {
            let node = match &entry.columns {
                None => TableTransform::PassThrough,
                Some(columns) => {
                    columns
                        .iter()
                        .fold(TableTransform::columns(), |node, (column, value)| {
                            node.with_column(column.as_str(), column_transform(&copycat, value))
                        })
                }
            };
            transform.insert_table(entry.schema.as_str(), entry.table.as_str(), node);
        }
        transform
    }
}

fn column_transform(copycat: &Copycat, column: &ModuleColumn) -> ColumnTransform {
    match column {
        ModuleColumn::Value(value) => ColumnTransform::Value(value.clone()),
        ModuleColumn::Call(call) => {
            let call = call.clone();
            let copycat = copycat.clone();
            ColumnTransform::function(move |input| Ok(call.evaluate(&copycat, input.row)?))
        }
    }
}

pub fn parse_module(source: &str) -> ParseResult<GeneratedModule> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let mut module = GeneratedModule::default();
    let mut config = None;

    while let Some(token) = parser.peek() {
        let kind = token.kind.clone();
        match &kind {
            TokenKind::Ident(word) if word == "import" => parser.skip_statement(),
            TokenKind::Ident(word) if word == "copycat" => {
                module.hash_key = Some(parser.parse_set_hash_key()?);
            }
            TokenKind::Ident(word) if word == "export" => {
                config = Some(parser.parse_export()?);
            }
            TokenKind::Punct(';') => parser.pos += 1,
            _ => return Err(parser.unexpected("import, copycat.setHashKey or export")),
        }
    }

    let config = config.ok_or(ModuleParseError::MissingConfig)?;
    for (key, node) in config {
        match key.as_str() {
            "transform" => module.tables = transform_tables(node)?,
            "select" => {
                let value = literal(node, "/select")?;
                module.select = Some(SelectConfig::try_from(value)?);
            }
            "subset" => module.subset = Some(literal(node, "/subset")?),
            other => warn!(key = other, "ignoring unknown config key"),
        }
    }

    debug!(
        tables = module.tables.len(),
        hash_key = module.hash_key.is_some(),
        "parsed config module"
    );
    Ok(module)
}

fn transform_tables(node: Node) -> ParseResult<Vec<ModuleTable>> {
    let Node::Object(schemas) = node else {
        return Err(invalid("/transform", "expected an object"));
    };

    let mut tables = Vec::new();
    for (schema, schema_node) in schemas {
        let Node::Object(entries) = schema_node else {
            return Err(invalid(&format!("/transform/{schema}"), "expected an object"));
        };
        for (table, table_node) in entries {
            let path = format!("/transform/{schema}/{table}");
            let columns = match table_node {
                Node::Method(body) | Node::Object(body) => Some(
                    body.into_iter()
                        .map(|(column, value)| -> ParseResult<(String, ModuleColumn)> {
                            let path = format!("{path}/{column}");
                            let value = match value {
                                Node::Call(call) => ModuleColumn::Call(call),
                                other => ModuleColumn::Value(literal(other, &path)?),
                            };
                            Ok((column, value))
                        })
                        .collect::<ParseResult<Vec<_>>>()?,
                ),
                Node::Literal(Value::Bool(true)) => None,
                _ => return Err(invalid(&path, "expected a table function or an object")),
            };
            tables.push(ModuleTable {
                schema: schema.clone(),
                table,
                columns,
            });
        }
    }
    Ok(tables)
}

fn invalid(path: &str, message: &str) -> ModuleParseError {
    ModuleParseError::Invalid {
        path: path.to_string(),
        message: message.to_string(),
    }
}

fn literal(node: Node, path: &str) -> ParseResult<Value> {
    match node {
        Node::Literal(value) => Ok(value),
        Node::Object(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                let child = format!("{path}/{key}");
                map.insert(key, literal(value, &child)?);
            }
            Ok(Value::Object(map))
        }
        Node::Call(call) => Err(invalid(path, &format!("expected a literal, found {call}"))),
        Node::Method(_) => Err(invalid(path, "expected a literal, found a function")),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Ident(String),
    Str(String),
    Num(String),
    Punct(char),
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    line: usize,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    fn tokenize(mut self) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(&ch) = self.chars.peek() {
            let line = self.line;
            if ch.is_whitespace() {
                self.bump();
                continue;
            }
            if ch == '/' {
                self.bump();
                match self.chars.peek() {
                    Some('/') => {
                        while let Some(next) = self.bump() {
                            if next == '\n' {
                                break;
                            }
                        }
                        continue;
                    }
                    Some('*') => {
                        self.bump();
                        let mut previous = '\0';
                        while let Some(next) = self.bump() {
                            if previous == '*' && next == '/' {
                                break;
                            }
                            previous = next;
                        }
                        continue;
                    }
                    _ => {
                        tokens.push(Token {
                            kind: TokenKind::Punct('/'),
                            line,
                        });
                        continue;
                    }
                }
            }

            let kind = if ch == '"' || ch == '\'' {
                TokenKind::Str(self.string(ch)?)
            } else if ch.is_ascii_digit() {
                TokenKind::Num(self.take_while(|ch| {
                    ch.is_ascii_alphanumeric() || ch == '.' || ch == '_'
                }))
            } else if ch.is_alphabetic() || ch == '_' || ch == '$' {
                TokenKind::Ident(self.take_while(|ch| ch.is_alphanumeric() || ch == '_' || ch == '$'))
            } else {
                self.bump();
                TokenKind::Punct(ch)
            };
            tokens.push(Token { kind, line });
        }
        Ok(tokens)
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(&ch) = self.chars.peek() {
            if !accept(ch) {
                break;
            }
            out.push(ch);
            self.bump();
        }
        out
    }

    fn string(&mut self, quote: char) -> ParseResult<String> {
        let line = self.line;
        self.bump();
        let mut out = String::new();
        loop {
            let ch = self
                .bump()
                .ok_or(ModuleParseError::UnterminatedString { line })?;
            match ch {
                '\n' => return Err(ModuleParseError::UnterminatedString { line }),
                '\\' => {
                    let escaped = self
                        .bump()
                        .ok_or(ModuleParseError::UnterminatedString { line })?;
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        'u' => {
                            let hex: String = (0..4).filter_map(|_| self.bump()).collect();
                            let decoded = u32::from_str_radix(&hex, 16)
                                .ok()
                                .and_then(char::from_u32)
                                .ok_or_else(|| ModuleParseError::Unexpected {
                                    line,
                                    expected: "a \\u escape".to_string(),
                                    found: format!("\\u{hex}"),
                                })?;
                            out.push(decoded);
                        }
                        other => out.push(other),
                    }
                }
                ch if ch == quote => return Ok(out),
                ch => out.push(ch),
            }
        }
    }
}

/// Object, call, and literal nodes of the config expression.
#[derive(Debug, Clone)]
enum Node {
    Literal(Value),
    Object(Vec<(String, Node)>),
    /// `table({ row }) { return { .. }; }`
    Method(Vec<(String, Node)>),
    Call(CopycatCall),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_punct(&self, punct: char) -> bool {
        matches!(self.peek(), Some(Token { kind: TokenKind::Punct(ch), .. }) if *ch == punct)
    }

    fn next(&mut self, expected: &str) -> ParseResult<Token> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| ModuleParseError::UnexpectedEnd {
                expected: expected.to_string(),
            })?;
        self.pos += 1;
        Ok(token)
    }

    fn line(&self) -> usize {
        self.peek()
            .or_else(|| self.tokens.last())
            .map_or(0, |token| token.line)
    }

    fn unexpected(&self, expected: &str) -> ModuleParseError {
        match self.peek() {
            Some(token) => ModuleParseError::Unexpected {
                line: token.line,
                expected: expected.to_string(),
                found: describe(&token.kind),
            },
            None => ModuleParseError::UnexpectedEnd {
                expected: expected.to_string(),
            },
        }
    }

    fn expect_punct(&mut self, punct: char) -> ParseResult<()> {
        if self.peek_punct(punct) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{punct}`")))
        }
    }

    fn expect_ident(&mut self, word: &str) -> ParseResult<()> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Ident(found),
                ..
            }) if found == word => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.unexpected(&format!("`{word}`"))),
        }
    }

    fn ident(&mut self, expected: &str) -> ParseResult<String> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Ident(word),
                ..
            }) => {
                let word = word.clone();
                self.pos += 1;
                Ok(word)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn skip_statement(&mut self) {
        while let Some(token) = self.peek() {
            let end = token.kind == TokenKind::Punct(';');
            self.pos += 1;
            if end {
                break;
            }
        }
    }

    fn skip_semicolon(&mut self) {
        if self.peek_punct(';') {
            self.pos += 1;
        }
    }

    fn parse_set_hash_key(&mut self) -> ParseResult<String> {
        self.expect_ident("copycat")?;
        self.expect_punct('.')?;
        self.expect_ident("setHashKey")?;
        self.expect_punct('(')?;
        let token = self.next("a string")?;
        let TokenKind::Str(key) = token.kind else {
            return Err(ModuleParseError::Unexpected {
                line: token.line,
                expected: "a string".to_string(),
                found: describe(&token.kind),
            });
        };
        self.expect_punct(')')?;
        self.skip_semicolon();
        Ok(key)
    }

    fn parse_export(&mut self) -> ParseResult<Vec<(String, Node)>> {
        self.expect_ident("export")?;
        self.expect_ident("default")?;
        self.expect_ident("defineConfig")?;
        self.expect_punct('(')?;
        let entries = self.parse_object("")?;
        self.expect_punct(')')?;
        self.skip_semicolon();
        Ok(entries)
    }

    fn parse_key(&mut self) -> ParseResult<String> {
        let token = self.next("a property key")?;
        match token.kind {
            TokenKind::Ident(key) | TokenKind::Str(key) | TokenKind::Num(key) => Ok(key),
            other => Err(ModuleParseError::Unexpected {
                line: token.line,
                expected: "a property key".to_string(),
                found: describe(&other),
            }),
        }
    }

    fn parse_object(&mut self, path: &str) -> ParseResult<Vec<(String, Node)>> {
        self.expect_punct('{')?;
        let mut entries = Vec::new();
        while !self.peek_punct('}') {
            let key = self.parse_key()?;
            let child = format!("{path}/{key}");
            let node = if self.peek_punct('(') {
                Node::Method(self.parse_table_method(&child)?)
            } else {
                self.expect_punct(':')?;
                self.parse_value(&child)?
            };
            entries.push((key, node));
            if !self.peek_punct(',') {
                break;
            }
            self.pos += 1;
        }
        self.expect_punct('}')?;
        Ok(entries)
    }

    // ({ row }) { return { .. }; }
    fn parse_table_method(&mut self, path: &str) -> ParseResult<Vec<(String, Node)>> {
        self.expect_punct('(')?;
        self.expect_punct('{')?;
        self.expect_ident("row")?;
        self.expect_punct('}')?;
        self.expect_punct(')')?;
        self.expect_punct('{')?;
        self.expect_ident("return")?;
        let body = self.parse_object(path)?;
        self.skip_semicolon();
        self.expect_punct('}')?;
        Ok(body)
    }

    fn parse_value(&mut self, path: &str) -> ParseResult<Node> {
        let line = self.line();
        let Some(token) = self.peek() else {
            return Err(self.unexpected("a value"));
        };
        match token.kind.clone() {
            TokenKind::Punct('{') => Ok(Node::Object(self.parse_object(path)?)),
            TokenKind::Punct('[') => {
                self.pos += 1;
                let mut items = Vec::new();
                while !self.peek_punct(']') {
                    let item = self.parse_value(path)?;
                    items.push(literal(item, path)?);
                    if !self.peek_punct(',') {
                        break;
                    }
                    self.pos += 1;
                }
                self.expect_punct(']')?;
                Ok(Node::Literal(Value::Array(items)))
            }
            TokenKind::Punct('-') => {
                self.pos += 1;
                match self.next("a number")?.kind {
                    TokenKind::Num(digits) => Ok(Node::Literal(number(&format!("-{digits}"), line, path)?)),
                    other => Err(ModuleParseError::Unexpected {
                        line,
                        expected: "a number".to_string(),
                        found: describe(&other),
                    }),
                }
            }
            TokenKind::Str(text) => {
                self.pos += 1;
                Ok(Node::Literal(Value::String(text)))
            }
            TokenKind::Num(digits) => {
                self.pos += 1;
                Ok(Node::Literal(number(&digits, line, path)?))
            }
            TokenKind::Ident(word) => match word.as_str() {
                "true" | "false" => {
                    self.pos += 1;
                    Ok(Node::Literal(Value::Bool(word == "true")))
                }
                "null" => {
                    self.pos += 1;
                    Ok(Node::Literal(Value::Null))
                }
                "copycat" => Ok(Node::Call(self.parse_call(path)?)),
                other => Err(ModuleParseError::Unsupported {
                    line,
                    path: path.to_string(),
                    message: format!("`{other}` is not a literal or a copycat call"),
                }),
            },
            other => Err(ModuleParseError::Unexpected {
                line,
                expected: "a value".to_string(),
                found: describe(&other),
            }),
        }
    }

    fn parse_call(&mut self, path: &str) -> ParseResult<CopycatCall> {
        let line = self.line();
        self.expect_ident("copycat")?;
        self.expect_punct('.')?;
        let method = self.ident("a copycat method")?;
        if !METHODS.contains(&method.as_str()) {
            return Err(CopycatError::UnknownMethod(method).into());
        }
        self.expect_punct('(')?;

        let input = if matches!(self.peek(), Some(Token { kind: TokenKind::Ident(word), .. }) if word == "row")
        {
            CallInput::Column(self.parse_row_access()?)
        } else {
            let node = self.parse_value(path)?;
            CallInput::Literal(literal(node, path)?)
        };

        let mut rest = Vec::new();
        while self.peek_punct(',') {
            self.pos += 1;
            if self.peek_punct(')') {
                break;
            }
            let node = self.parse_value(path)?;
            rest.push(literal(node, path)?);
        }
        self.expect_punct(')')?;

        // A trailing object argument holds the options.
        let options = match rest.last() {
            Some(Value::Object(_)) => match rest.pop() {
                Some(Value::Object(options)) => options,
                _ => Map::new(),
            },
            _ => Map::new(),
        };
        CopycatOptions::from_value(&method, &Value::Object(options.clone()))?;

        let mut call = CopycatCall {
            method,
            input,
            args: rest,
            options,
            to_string: false,
            slice: None,
        };

        while self.peek_punct('.') {
            self.pos += 1;
            match self.ident("toString or slice")?.as_str() {
                "toString" => {
                    self.expect_punct('(')?;
                    self.expect_punct(')')?;
                    call.to_string = true;
                }
                "slice" => {
                    self.expect_punct('(')?;
                    let start = self.parse_value(path)?;
                    if !matches!(&start, Node::Literal(value) if value.as_u64() == Some(0)) {
                        return Err(ModuleParseError::Unsupported {
                            line,
                            path: path.to_string(),
                            message: "slice must start at 0".to_string(),
                        });
                    }
                    self.expect_punct(',')?;
                    let end = literal(self.parse_value(path)?, path)?;
                    let len = end.as_u64().ok_or_else(|| ModuleParseError::Unsupported {
                        line,
                        path: path.to_string(),
                        message: format!("slice end must be a non-negative integer, found {end}"),
                    })?;
                    self.expect_punct(')')?;
                    call.slice = Some(len as usize);
                }
                other => {
                    return Err(ModuleParseError::Unsupported {
                        line,
                        path: path.to_string(),
                        message: format!("unsupported method `.{other}()` on a copycat call"),
                    });
                }
            }
        }
        Ok(call)
    }

    // row.name | row["name"]
    fn parse_row_access(&mut self) -> ParseResult<String> {
        self.expect_ident("row")?;
        if self.peek_punct('.') {
            self.pos += 1;
            return self.ident("a column name");
        }
        self.expect_punct('[')?;
        let token = self.next("a quoted column name")?;
        let TokenKind::Str(column) = token.kind else {
            return Err(ModuleParseError::Unexpected {
                line: token.line,
                expected: "a quoted column name".to_string(),
                found: describe(&token.kind),
            });
        };
        self.expect_punct(']')?;
        Ok(column)
    }
}

fn number(text: &str, line: usize, path: &str) -> ParseResult<Value> {
    serde_json::from_str::<serde_json::Number>(text)
        .map(Value::Number)
        .map_err(|_| ModuleParseError::Unsupported {
            line,
            path: path.to_string(),
            message: format!("`{text}` is not a JSON number"),
        })
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(word) => format!("`{word}`"),
        TokenKind::Str(text) => format!("string {text:?}"),
        TokenKind::Num(digits) => format!("number {digits}"),
        TokenKind::Punct(ch) => format!("`{ch}`"),
    }
}
