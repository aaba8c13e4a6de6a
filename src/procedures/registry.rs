//! Procedure table consulted by the host's dispatch layer. Each entry pairs a
//! signature (name, mode, typed parameters, output columns) with a handler
//! taking positional JSON arguments and producing records.

use std::{collections::BTreeMap, fmt};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::ProcError;

/// One output row of a procedure.
pub type Record = Map<String, Value>;

pub type ProcedureHandler = Box<dyn Fn(&[Value]) -> Result<Vec<Record>, ProcError> + Send + Sync>;

/// Access a procedure needs. Ordered: a caller granted `Schema` may run
/// everything, one granted `Read` only read procedures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ProcMode {
    Read,
    Write,
    Schema,
}

impl fmt::Display for ProcMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ProcMode::Read => "READ",
            ProcMode::Write => "WRITE",
            ProcMode::Schema => "SCHEMA",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamType {
    Integer,
    String,
    Boolean,
    List(Box<ParamType>),
    Any,
}

impl ParamType {
    pub fn list_of(inner: ParamType) -> Self {
        ParamType::List(Box::new(inner))
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ParamType::Any, _) => true,
            (ParamType::Integer, Value::Number(n)) => n.as_i64().is_some(),
            (ParamType::String, Value::String(_)) => true,
            (ParamType::Boolean, Value::Bool(_)) => true,
            (ParamType::List(inner), Value::Array(items)) => {
                items.iter().all(|item| inner.accepts(item))
            }
            _ => false,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Integer => f.write_str("INTEGER"),
            ParamType::String => f.write_str("STRING"),
            ParamType::Boolean => f.write_str("BOOLEAN"),
            ParamType::List(inner) => write!(f, "LIST OF {inner}"),
            ParamType::Any => f.write_str("ANY"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub ty: ParamType,
}

impl ParamSpec {
    pub fn new<T: Into<String>>(name: T, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcedureSignature {
    pub name: String,
    pub description: String,
    pub mode: ProcMode,
    pub params: Vec<ParamSpec>,
    pub outputs: Vec<String>,
}

impl ProcedureSignature {
    pub fn new<N: Into<String>, D: Into<String>>(name: N, mode: ProcMode, description: D) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            mode,
            params: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn param<T: Into<String>>(mut self, name: T, ty: ParamType) -> Self {
        self.params.push(ParamSpec::new(name, ty));
        self
    }

    pub fn output<T: Into<String>>(mut self, column: T) -> Self {
        self.outputs.push(column.into());
        self
    }
}

impl fmt::Display for ProcedureSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .params
            .iter()
            .map(|p| format!("{} :: {}", p.name, p.ty))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}({}) :: {}", self.name, params, self.mode)
    }
}

struct RegisteredProcedure {
    signature: ProcedureSignature,
    handler: ProcedureHandler,
}

#[derive(Default)]
pub struct ProcedureRegistry {
    procedures: BTreeMap<String, RegisteredProcedure>,
}

impl ProcedureRegistry {
    pub fn new() -> Self {
        Self {
            procedures: BTreeMap::new(),
        }
    }

    pub fn register(
        &mut self,
        signature: ProcedureSignature,
        handler: ProcedureHandler,
    ) -> Result<(), ProcError> {
        if self.procedures.contains_key(&signature.name) {
            return Err(ProcError::invalid_input(format!(
                "procedure {} is already registered",
                signature.name
            )));
        }
        self.procedures.insert(
            signature.name.clone(),
            RegisteredProcedure { signature, handler },
        );
        Ok(())
    }

    pub fn signature(&self, name: &str) -> Option<&ProcedureSignature> {
        self.procedures.get(name).map(|entry| &entry.signature)
    }

    /// All signatures, sorted by name.
    pub fn signatures(&self) -> Vec<&ProcedureSignature> {
        self.procedures.values().map(|entry| &entry.signature).collect()
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }

    /// Validates mode, arity and argument types, then runs the handler.
    pub fn call(
        &self,
        name: &str,
        args: &[Value],
        granted: ProcMode,
    ) -> Result<Vec<Record>, ProcError> {
        let entry = self
            .procedures
            .get(name)
            .ok_or_else(|| ProcError::not_found(format!("procedure {name}")))?;
        let signature = &entry.signature;
        if signature.mode > granted {
            return Err(ProcError::access_mode(format!(
                "{name} requires {} access but the caller was granted {granted}",
                signature.mode
            )));
        }
        if args.len() != signature.params.len() {
            return Err(ProcError::invalid_input(format!(
                "{name} expects {} arguments, got {}",
                signature.params.len(),
                args.len()
            )));
        }
        for (param, value) in signature.params.iter().zip(args) {
            if !param.ty.accepts(value) {
                return Err(ProcError::invalid_input(format!(
                    "{name}: argument `{}` must be {}, got {value}",
                    param.name, param.ty
                )));
            }
        }
        (entry.handler)(args)
    }
}

/// Boxes a closure as a [`ProcedureHandler`].
pub fn handler<F>(f: F) -> ProcedureHandler
where
    F: Fn(&[Value]) -> Result<Vec<Record>, ProcError> + Send + Sync + 'static,
{
    Box::new(f)
}

pub fn int_arg(args: &[Value], position: usize, name: &str) -> Result<i64, ProcError> {
    args.get(position)
        .and_then(Value::as_i64)
        .ok_or_else(|| ProcError::invalid_input(format!("argument `{name}` must be an integer")))
}

pub fn string_arg<'a>(args: &'a [Value], position: usize, name: &str) -> Result<&'a str, ProcError> {
    args.get(position)
        .and_then(Value::as_str)
        .ok_or_else(|| ProcError::invalid_input(format!("argument `{name}` must be a string")))
}

pub fn string_list_arg(args: &[Value], position: usize, name: &str) -> Result<Vec<String>, ProcError> {
    let items = args
        .get(position)
        .and_then(Value::as_array)
        .ok_or_else(|| ProcError::invalid_input(format!("argument `{name}` must be a list")))?;
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                ProcError::invalid_input(format!("argument `{name}` must contain strings"))
            })
        })
        .collect()
}

pub fn int_list_arg(args: &[Value], position: usize, name: &str) -> Result<Vec<i64>, ProcError> {
    let items = args
        .get(position)
        .and_then(Value::as_array)
        .ok_or_else(|| ProcError::invalid_input(format!("argument `{name}` must be a list")))?;
    items
        .iter()
        .map(|item| {
            item.as_i64().ok_or_else(|| {
                ProcError::invalid_input(format!("argument `{name}` must contain integers"))
            })
        })
        .collect()
}

pub fn record<K: Into<String>>(column: K, value: Value) -> Record {
    let mut record = Record::new();
    record.insert(column.into(), value);
    record
}
