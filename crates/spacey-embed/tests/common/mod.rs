//! Shared test support: a tiny scripted engine.
//!
//! It understands just enough of a script language to exercise the bridge:
//! statements separated by `;` or newlines, each one of
//!
//! - `target = expr` where `target` is a local or a dotted property path
//! - `throw expr`
//! - `return expr`
//! - a bare expression
//!
//! Expressions are literals (`42`, `"text"`, `true`, `undefined`, `{}`),
//! `new Error("message")`, dotted paths and calls `path(arg, ...)`.
//!
//! Every handle given to the host is counted, so tests can assert that the
//! bridge gives back exactly what it took.

#![allow(dead_code)]

use spacey_embed::{BuiltinModule, Engine, EngineResult, EngineStatus, FACTORY_SIGNATURE};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// Magic prefix of test snapshot blobs
pub const SNAPSHOT_MAGIC: &[u8] = b"SNAP";

/// Separator between functions of a test snapshot blob
pub const RECORD_SEPARATOR: u8 = 0x1E;

/// Engine value handle. Not `Clone`, just like the real thing.
#[derive(Debug)]
pub struct Handle(usize);

type NativeFn = Rc<dyn Fn(&ScriptEngine, &[usize]) -> Result<usize, usize>>;

#[derive(Clone)]
enum Data {
    Undefined,
    Bool(bool),
    Number(f64),
    Str(String),
    Object(BTreeMap<String, usize>),
    Error(String),
    Script(Rc<Body>),
    Native(NativeFn),
}

struct Slot {
    data: Data,
    host_refs: usize,
}

struct Body {
    params: Vec<String>,
    statements: Vec<Stmt>,
}

enum Stmt {
    Assign(Vec<String>, Expr),
    Throw(Expr),
    Return(Option<Expr>),
    Expr(Expr),
}

enum Expr {
    Undefined,
    Bool(bool),
    Number(f64),
    Str(String),
    Object,
    Error(String),
    Path(Vec<String>),
    Call(Vec<String>, Vec<Expr>),
}

struct Completion {
    last: Option<usize>,
    returned: Option<usize>,
}

/// A recorded `parse_function` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCall {
    pub resource_name: String,
    pub params: String,
}

/// Scripted in-memory engine
#[derive(Default)]
pub struct ScriptEngine {
    heap: RefCell<Vec<Slot>>,
    parses: RefCell<Vec<ParseCall>>,
    calls: Cell<usize>,
    releases: Cell<usize>,
}

impl ScriptEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `parse_function` call so far
    pub fn parses(&self) -> Vec<ParseCall> {
        self.parses.borrow().clone()
    }

    /// Number of `call_function` calls
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Number of `release_value` calls
    pub fn releases(&self) -> usize {
        self.releases.get()
    }

    /// References currently held by the host
    pub fn live_refs(&self) -> usize {
        self.heap.borrow().iter().map(|slot| slot.host_refs).sum()
    }

    /// A `{ id, exports: {} }` module object
    pub fn module(&self, id: &str) -> Handle {
        let id = self.alloc(Data::Str(id.to_string()));
        let exports = self.alloc(Data::Object(BTreeMap::new()));
        let props = BTreeMap::from([("id".to_string(), id), ("exports".to_string(), exports)]);
        self.hand_out(self.alloc(Data::Object(props)))
    }

    /// A fresh empty object
    pub fn object(&self) -> Handle {
        self.hand_out(self.alloc(Data::Object(BTreeMap::new())))
    }

    /// A number
    pub fn number(&self, value: f64) -> Handle {
        self.hand_out(self.alloc(Data::Number(value)))
    }

    /// A native `require` that maps module names to numbers
    pub fn require_stub(&self, modules: &[(&str, f64)]) -> Handle {
        let modules: HashMap<String, f64> = modules
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect();
        let require: NativeFn = Rc::new(move |engine, args| {
            let name = args.first().and_then(|arg| engine.string_of(*arg));
            match name.as_ref().and_then(|name| modules.get(name)) {
                Some(value) => Ok(engine.alloc(Data::Number(*value))),
                None => Err(engine.alloc(Data::Error(format!(
                    "Error: Cannot find module '{}'",
                    name.unwrap_or_default()
                )))),
            }
        });
        self.hand_out(self.alloc(Data::Native(require)))
    }

    /// Number stored at `path` below `object`
    pub fn number_at(&self, object: &Handle, path: &str) -> Option<f64> {
        match self.lookup(object.0, path).map(|slot| self.data(slot)) {
            Some(Data::Number(value)) => Some(value),
            _ => None,
        }
    }

    /// String stored at `path` below `object`
    pub fn string_at(&self, object: &Handle, path: &str) -> Option<String> {
        self.lookup(object.0, path).and_then(|slot| self.string_of(slot))
    }

    /// Whether `value` is `undefined`
    pub fn is_undefined(&self, value: &Handle) -> bool {
        matches!(self.data(value.0), Data::Undefined)
    }

    /// Whether `object[path]` is `undefined` (or missing)
    pub fn is_undefined_at(&self, object: &Handle, path: &str) -> bool {
        self.lookup(object.0, path)
            .is_none_or(|slot| matches!(self.data(slot), Data::Undefined))
    }

    /// Whether `object[path]` is the very value `value` refers to
    pub fn is_same_at(&self, object: &Handle, path: &str, value: &Handle) -> bool {
        self.lookup(object.0, path) == Some(value.0)
    }

    /// Whether two handles refer to the same value
    pub fn same(&self, a: &Handle, b: &Handle) -> bool {
        a.0 == b.0
    }

    /// Number a handle refers to
    pub fn number_of(&self, value: &Handle) -> Option<f64> {
        match self.data(value.0) {
            Data::Number(value) => Some(value),
            _ => None,
        }
    }

    /// Property names of an object, sorted
    pub fn keys(&self, object: &Handle) -> Vec<String> {
        match self.data(object.0) {
            Data::Object(props) => props.into_keys().collect(),
            _ => Vec::new(),
        }
    }

    fn lookup(&self, object: usize, path: &str) -> Option<usize> {
        path.split('.').try_fold(object, |current, name| match self.data(current) {
            Data::Object(props) => props.get(name).copied(),
            _ => None,
        })
    }

    fn string_of(&self, slot: usize) -> Option<String> {
        match self.data(slot) {
            Data::Str(text) => Some(text),
            _ => None,
        }
    }

    fn alloc(&self, data: Data) -> usize {
        let mut heap = self.heap.borrow_mut();
        heap.push(Slot { data, host_refs: 0 });
        heap.len() - 1
    }

    fn hand_out(&self, slot: usize) -> Handle {
        self.heap.borrow_mut()[slot].host_refs += 1;
        Handle(slot)
    }

    fn out(&self, result: Result<usize, usize>) -> EngineResult<Handle> {
        result.map(|slot| self.hand_out(slot)).map_err(|slot| self.hand_out(slot))
    }

    fn data(&self, slot: usize) -> Data {
        self.heap.borrow()[slot].data.clone()
    }

    fn error(&self, message: impl Into<String>) -> usize {
        self.alloc(Data::Error(message.into()))
    }

    fn compile_body(&self, params: &str, source: &[u8]) -> Result<Rc<Body>, usize> {
        let source = std::str::from_utf8(source)
            .map_err(|_| self.error("SyntaxError: Invalid or unexpected token"))?;
        parse_body(params, source).map(Rc::new).map_err(|message| self.error(message))
    }

    fn run(&self, body: &Body, args: &[usize]) -> Result<Completion, usize> {
        let mut locals = HashMap::new();
        for (i, param) in body.params.iter().enumerate() {
            let slot = match args.get(i) {
                Some(slot) => *slot,
                None => self.alloc(Data::Undefined),
            };
            locals.insert(param.clone(), slot);
        }

        let mut last = None;
        for statement in &body.statements {
            match statement {
                Stmt::Assign(target, expr) => {
                    let value = self.eval(&locals, expr)?;
                    match target.split_last() {
                        Some((name, [])) => {
                            locals.insert(name.clone(), value);
                        }
                        Some((name, object_path)) => {
                            let object = self.eval_path(&locals, object_path)?;
                            self.store(object, name, value)?;
                        }
                        None => return Err(self.error("SyntaxError: empty assignment target")),
                    }
                }
                Stmt::Throw(expr) => return Err(self.eval(&locals, expr)?),
                Stmt::Return(expr) => {
                    let value = match expr {
                        Some(expr) => self.eval(&locals, expr)?,
                        None => self.alloc(Data::Undefined),
                    };
                    return Ok(Completion {
                        last,
                        returned: Some(value),
                    });
                }
                Stmt::Expr(expr) => last = Some(self.eval(&locals, expr)?),
            }
        }
        Ok(Completion {
            last,
            returned: None,
        })
    }

    fn eval(&self, locals: &HashMap<String, usize>, expr: &Expr) -> Result<usize, usize> {
        let data = match expr {
            Expr::Undefined => Data::Undefined,
            Expr::Bool(value) => Data::Bool(*value),
            Expr::Number(value) => Data::Number(*value),
            Expr::Str(text) => Data::Str(text.clone()),
            Expr::Object => Data::Object(BTreeMap::new()),
            Expr::Error(message) => Data::Error(message.clone()),
            Expr::Path(path) => return self.eval_path(locals, path),
            Expr::Call(callee, args) => {
                let function = self.eval_path(locals, callee)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(locals, arg))
                    .collect::<Result<Vec<_>, _>>()?;
                return self.invoke(function, &args);
            }
        };
        Ok(self.alloc(data))
    }

    fn eval_path(&self, locals: &HashMap<String, usize>, path: &[String]) -> Result<usize, usize> {
        let Some((first, rest)) = path.split_first() else {
            return Err(self.error("SyntaxError: empty path"));
        };
        let mut current = match locals.get(first) {
            Some(slot) => *slot,
            None => return Err(self.error(format!("ReferenceError: {first} is not defined"))),
        };
        for name in rest {
            current = self.load(current, name)?;
        }
        Ok(current)
    }

    fn load(&self, object: usize, name: &str) -> Result<usize, usize> {
        match self.data(object) {
            Data::Object(props) => match props.get(name) {
                Some(slot) => Ok(*slot),
                None => Ok(self.alloc(Data::Undefined)),
            },
            Data::Undefined => Err(self.error(format!(
                "TypeError: Cannot read properties of undefined (reading '{name}')"
            ))),
            _ => Ok(self.alloc(Data::Undefined)),
        }
    }

    fn store(&self, object: usize, name: &str, value: usize) -> Result<(), usize> {
        let stored = {
            let mut heap = self.heap.borrow_mut();
            if let Data::Object(props) = &mut heap[object].data {
                props.insert(name.to_string(), value);
                true
            } else {
                false
            }
        };
        if stored {
            Ok(())
        } else {
            Err(self.error(format!(
                "TypeError: Cannot set properties of non-object (setting '{name}')"
            )))
        }
    }

    fn invoke(&self, function: usize, args: &[usize]) -> Result<usize, usize> {
        match self.data(function) {
            Data::Script(body) => {
                let completion = self.run(&body, args)?;
                Ok(match completion.returned {
                    Some(value) => value,
                    None => self.alloc(Data::Undefined),
                })
            }
            Data::Native(function) => function(self, args),
            _ => Err(self.error("TypeError: value is not a function")),
        }
    }
}

impl Engine for ScriptEngine {
    type Value = Handle;

    fn parse_function(&self, resource_name: &str, params: &str, source: &[u8]) -> EngineResult<Handle> {
        self.parses.borrow_mut().push(ParseCall {
            resource_name: resource_name.to_string(),
            params: params.to_string(),
        });
        let compiled = self
            .compile_body(params, source)
            .map(|body| self.alloc(Data::Script(body)));
        self.out(compiled)
    }

    fn exec_snapshot_at(&self, blob: &[u8], index: u32) -> EngineResult<Handle> {
        let Some(records) = snapshot_records(blob) else {
            return self.out(Err(self.error("RangeError: invalid snapshot header")));
        };
        let Some(record) = records.get(index as usize) else {
            return self.out(Err(self.error("RangeError: snapshot function index out of range")));
        };
        let compiled = self
            .compile_body(FACTORY_SIGNATURE, record)
            .map(|body| self.alloc(Data::Script(body)));
        self.out(compiled)
    }

    fn exec_snapshot(&self, blob: &[u8]) -> EngineResult<Handle> {
        let Some(records) = snapshot_records(blob) else {
            return self.out(Err(self.error("RangeError: invalid snapshot header")));
        };
        let result = self
            .compile_body("", records.first().copied().unwrap_or_default())
            .and_then(|body| self.run(&body, &[]))
            .map(|completion| match completion.returned.or(completion.last) {
                Some(value) => value,
                None => self.alloc(Data::Undefined),
            });
        self.out(result)
    }

    fn call_function(&self, function: &Handle, _this: &Handle, args: &[&Handle]) -> EngineResult<Handle> {
        self.calls.set(self.calls.get() + 1);
        let args: Vec<usize> = args.iter().map(|arg| arg.0).collect();
        self.out(self.invoke(function.0, &args))
    }

    fn create_undefined(&self) -> Handle {
        self.hand_out(self.alloc(Data::Undefined))
    }

    fn create_object(&self) -> Handle {
        self.object()
    }

    fn create_boolean(&self, value: bool) -> Handle {
        self.hand_out(self.alloc(Data::Bool(value)))
    }

    fn create_error(&self, message: &str) -> Handle {
        self.hand_out(self.error(message))
    }

    fn get_property(&self, object: &Handle, name: &str) -> EngineResult<Handle> {
        self.out(self.load(object.0, name))
    }

    fn set_property(&self, object: &Handle, name: &str, value: &Handle) -> EngineStatus<Handle> {
        self.store(object.0, name, value.0)
            .map_err(|error| self.hand_out(error))
    }

    fn string_value(&self, value: &Handle) -> Option<String> {
        self.string_of(value.0)
    }

    fn error_message(&self, error: &Handle) -> String {
        match self.data(error.0) {
            Data::Error(message) | Data::Str(message) => message,
            Data::Number(value) => value.to_string(),
            Data::Bool(value) => value.to_string(),
            Data::Undefined => "undefined".to_string(),
            Data::Object(_) => "[object Object]".to_string(),
            Data::Script(_) | Data::Native(_) => "function".to_string(),
        }
    }

    fn acquire_value(&self, value: &Handle) -> Handle {
        self.hand_out(value.0)
    }

    fn release_value(&self, value: Handle) {
        let mut heap = self.heap.borrow_mut();
        let slot = &mut heap[value.0];
        assert!(slot.host_refs > 0, "value {} released more often than acquired", value.0);
        slot.host_refs -= 1;
        self.releases.set(self.releases.get() + 1);
    }
}

/// Build a snapshot blob holding one factory body per record
pub fn snapshot(records: &[&str]) -> Vec<u8> {
    let mut blob = SNAPSHOT_MAGIC.to_vec();
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            blob.push(RECORD_SEPARATOR);
        }
        blob.extend_from_slice(record.as_bytes());
    }
    blob
}

/// A builtin table and matching snapshot blob for `modules`, so the same
/// bodies run whichever compile strategy the build selected.
pub fn builtin_table(modules: &[(&'static str, &'static str)]) -> (&'static [BuiltinModule], &'static [u8]) {
    let table: Vec<BuiltinModule> = modules
        .iter()
        .enumerate()
        .map(|(index, &(name, source))| BuiltinModule::new(name, source.as_bytes(), index as u32))
        .collect();
    let sources: Vec<&str> = modules.iter().map(|(_, source)| *source).collect();
    (
        Box::leak(table.into_boxed_slice()),
        Box::leak(snapshot(&sources).into_boxed_slice()),
    )
}

/// Install a test log subscriber; `RUST_LOG` picks the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn snapshot_records(blob: &[u8]) -> Option<Vec<&[u8]>> {
    blob.strip_prefix(SNAPSHOT_MAGIC)
        .map(|body| body.split(|byte| *byte == RECORD_SEPARATOR).collect())
}

fn parse_body(params: &str, source: &str) -> Result<Body, String> {
    let params = params
        .split(',')
        .map(str::trim)
        .filter(|param| !param.is_empty())
        .map(String::from)
        .collect();
    let statements = split_top_level(source, &[';', '\n'])
        .into_iter()
        .map(str::trim)
        .filter(|statement| !statement.is_empty() && !statement.starts_with("//"))
        .map(parse_statement)
        .collect::<Result<_, _>>()?;
    Ok(Body { params, statements })
}

fn parse_statement(statement: &str) -> Result<Stmt, String> {
    if let Some(rest) = statement.strip_prefix("throw ") {
        return Ok(Stmt::Throw(parse_expr(rest.trim())?));
    }
    if statement == "return" {
        return Ok(Stmt::Return(None));
    }
    if let Some(rest) = statement.strip_prefix("return ") {
        return Ok(Stmt::Return(Some(parse_expr(rest.trim())?)));
    }

    match split_top_level(statement, &['=']).as_slice() {
        [expr] => Ok(Stmt::Expr(parse_expr(expr.trim())?)),
        [target, value] => {
            let target = target.trim();
            let path = parse_path(target)
                .ok_or_else(|| format!("SyntaxError: Invalid left-hand side in assignment '{target}'"))?;
            Ok(Stmt::Assign(path, parse_expr(value.trim())?))
        }
        _ => Err(format!("SyntaxError: Unexpected token in '{statement}'")),
    }
}

fn parse_expr(expr: &str) -> Result<Expr, String> {
    match expr {
        "" => return Err("SyntaxError: Unexpected end of input".to_string()),
        "undefined" => return Ok(Expr::Undefined),
        "true" => return Ok(Expr::Bool(true)),
        "false" => return Ok(Expr::Bool(false)),
        "{}" => return Ok(Expr::Object),
        _ => {}
    }

    if let Some(text) = string_literal(expr) {
        return Ok(Expr::Str(text));
    }
    if expr.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        return expr
            .parse()
            .map(Expr::Number)
            .map_err(|_| format!("SyntaxError: Invalid number '{expr}'"));
    }
    if let Some(inner) = expr.strip_prefix("new Error(").and_then(|rest| rest.strip_suffix(')')) {
        let message = string_literal(inner.trim())
            .ok_or_else(|| format!("SyntaxError: Unexpected token '{inner}'"))?;
        return Ok(Expr::Error(format!("Error: {message}")));
    }
    if let (Some(open), true) = (expr.find('('), expr.ends_with(')')) {
        let callee = parse_path(expr[..open].trim())
            .ok_or_else(|| format!("SyntaxError: Unexpected token '{expr}'"))?;
        let args = split_top_level(&expr[open + 1..expr.len() - 1], &[','])
            .into_iter()
            .map(str::trim)
            .filter(|arg| !arg.is_empty())
            .map(parse_expr)
            .collect::<Result<_, _>>()?;
        return Ok(Expr::Call(callee, args));
    }
    parse_path(expr)
        .map(Expr::Path)
        .ok_or_else(|| format!("SyntaxError: Unexpected token '{expr}'"))
}

fn string_literal(expr: &str) -> Option<String> {
    let quote = expr.chars().next()?;
    let quoted = (quote == '"' || quote == '\'') && expr.len() >= 2 && expr.ends_with(quote);
    quoted.then(|| expr[1..expr.len() - 1].to_string())
}

fn parse_path(expr: &str) -> Option<Vec<String>> {
    let parts: Vec<String> = expr.split('.').map(String::from).collect();
    parts.iter().all(|part| is_identifier(part)).then_some(parts)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn split_top_level<'a>(text: &'a str, separators: &[char]) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut quote = None;
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '{' | '[') => depth += 1,
            (None, ')' | '}' | ']') => depth = depth.saturating_sub(1),
            (None, _) if depth == 0 && separators.contains(&c) => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}
