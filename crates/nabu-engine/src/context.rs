//! Runtime variables.
//!
//! [`ContextStore`] keeps two tiers of variables:
//!
//! - **engine** variables, shared by every microapp and addressed by a bare
//!   name (`@@{name}` in markup);
//! - **microapp** variables, grouped per microapp code and addressed as
//!   `code.name` (`@{code.name}` in markup).
//!
//! Resolution never reads the store directly. It works on a
//! [`ResolutionContext`], an owned snapshot that also carries the frame-local
//! overrides of the current screen.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

// ── ContextValue ──────────────────────────────────────────────────────────

/// A dynamically typed variable value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    #[default]
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
}

impl ContextValue {
    /// Interpret a markup literal: `true`/`false`, `null`, a finite number,
    /// or else a string.
    pub fn parse_literal(raw: &str) -> Self {
        match raw.trim() {
            "true" => return Self::Boolean(true),
            "false" => return Self::Boolean(false),
            "null" => return Self::Null,
            _ => {}
        }
        match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Self::Number(n),
            _ => Self::String(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Best-effort text form used by binding resolution.
///
/// Integral numbers print without a fractional part and `Null` prints as
/// an empty string.
impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for ContextValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for ContextValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

// ── VariablePath ──────────────────────────────────────────────────────────

/// Where a variable key written in markup or an action lives.
///
/// A key containing a `.` names a microapp variable (split on the first
/// `.`); a bare key names an engine variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariablePath {
    Engine(String),
    Microapp { scope: String, name: String },
}

impl VariablePath {
    pub fn parse(key: &str) -> Self {
        match key.split_once('.') {
            Some((scope, name)) => Self::Microapp { scope: scope.to_string(), name: name.to_string() },
            None => Self::Engine(key.to_string()),
        }
    }
}

/// Prints the flat key, the inverse of [`VariablePath::parse`].
impl fmt::Display for VariablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine(name) => f.write_str(name),
            Self::Microapp { scope, name } => write!(f, "{scope}.{name}"),
        }
    }
}

// ── ContextChange ─────────────────────────────────────────────────────────

/// Broadcast by [`ContextStore`] after every mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextChange {
    Set { path: VariablePath, value: ContextValue },
    MicroappCleared { code: String },
    EngineCleared,
    AllCleared,
}

// ── ContextStore ──────────────────────────────────────────────────────────

/// Two-tier variable store. Last write wins per key.
///
/// Single writer: the store is owned by a session and mutated through
/// `&mut self`; observers follow along through [`ContextStore::subscribe`].
#[derive(Debug)]
pub struct ContextStore {
    engine: HashMap<String, ContextValue>,
    microapps: HashMap<String, HashMap<String, ContextValue>>,
    changes: broadcast::Sender<ContextChange>,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { engine: HashMap::new(), microapps: HashMap::new(), changes }
    }

    /// Receive a [`ContextChange`] for every subsequent mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<ContextChange> {
        self.changes.subscribe()
    }

    fn notify(&self, change: ContextChange) {
        // No receivers is the common case.
        let _ = self.changes.send(change);
    }

    // ── microapp tier ─────────────────────────────────────────────────────

    pub fn set_microapp_variable(&mut self, code: &str, name: &str, value: impl Into<ContextValue>) {
        let value = value.into();
        self.microapps
            .entry(code.to_string())
            .or_default()
            .insert(name.to_string(), value.clone());
        self.notify(ContextChange::Set {
            path: VariablePath::Microapp { scope: code.to_string(), name: name.to_string() },
            value,
        });
    }

    pub fn get_microapp_variable(&self, code: &str, name: &str) -> Option<&ContextValue> {
        self.microapps.get(code)?.get(name)
    }

    /// Copy of all variables of microapp `code`; empty when it has none.
    pub fn microapp_context(&self, code: &str) -> HashMap<String, ContextValue> {
        self.microapps.get(code).cloned().unwrap_or_default()
    }

    pub fn clear_microapp_context(&mut self, code: &str) {
        self.microapps.remove(code);
        self.notify(ContextChange::MicroappCleared { code: code.to_string() });
    }

    // ── engine tier ───────────────────────────────────────────────────────

    pub fn set_engine_variable(&mut self, name: &str, value: impl Into<ContextValue>) {
        let value = value.into();
        self.engine.insert(name.to_string(), value.clone());
        self.notify(ContextChange::Set { path: VariablePath::Engine(name.to_string()), value });
    }

    pub fn get_engine_variable(&self, name: &str) -> Option<&ContextValue> {
        self.engine.get(name)
    }

    /// Copy of all engine variables.
    pub fn engine_context(&self) -> HashMap<String, ContextValue> {
        self.engine.clone()
    }

    pub fn clear_engine_context(&mut self) {
        self.engine.clear();
        self.notify(ContextChange::EngineCleared);
    }

    pub fn clear_all(&mut self) {
        self.engine.clear();
        self.microapps.clear();
        self.notify(ContextChange::AllCleared);
    }

    // ── path addressing ───────────────────────────────────────────────────

    pub fn set_path(&mut self, path: &VariablePath, value: impl Into<ContextValue>) {
        match path {
            VariablePath::Engine(name) => self.set_engine_variable(name, value),
            VariablePath::Microapp { scope, name } => self.set_microapp_variable(scope, name, value),
        }
    }

    pub fn get_path(&self, path: &VariablePath) -> Option<&ContextValue> {
        match path {
            VariablePath::Engine(name) => self.get_engine_variable(name),
            VariablePath::Microapp { scope, name } => self.get_microapp_variable(scope, name),
        }
    }

    /// Both tiers in one map: engine variables under `name`, microapp
    /// variables under `code.name`.
    pub fn flatten(&self) -> HashMap<String, ContextValue> {
        let mut flat = self.engine.clone();
        flat.extend(self.microapp_entries());
        flat
    }

    /// Snapshot for binding resolution, with `local` as frame overrides.
    pub fn snapshot(&self, local: &HashMap<String, ContextValue>) -> ResolutionContext {
        ResolutionContext {
            engine: self.engine.clone(),
            microapp: self.microapp_entries().collect(),
            local: local.clone(),
        }
    }

    fn microapp_entries(&self) -> impl Iterator<Item = (String, ContextValue)> + '_ {
        self.microapps.iter().flat_map(|(code, vars)| {
            vars.iter().map(move |(name, value)| (format!("{code}.{name}"), value.clone()))
        })
    }
}

// ── ResolutionContext ─────────────────────────────────────────────────────

/// Owned view of the variables visible to binding resolution.
///
/// Frame-local entries shadow both tiers: `@@{name}` checks local `name`
/// first and `@{scope.name}` checks local `scope.name` first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionContext {
    engine: HashMap<String, ContextValue>,
    /// Keyed `scope.name`.
    microapp: HashMap<String, ContextValue>,
    local: HashMap<String, ContextValue>,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engine(mut self, name: &str, value: impl Into<ContextValue>) -> Self {
        self.engine.insert(name.to_string(), value.into());
        self
    }

    pub fn with_microapp(mut self, scope: &str, name: &str, value: impl Into<ContextValue>) -> Self {
        self.microapp.insert(format!("{scope}.{name}"), value.into());
        self
    }

    pub fn with_local(mut self, key: &str, value: impl Into<ContextValue>) -> Self {
        self.bind_local(key, value);
        self
    }

    /// Set a frame-local override, e.g. a loop index.
    pub fn bind_local(&mut self, key: &str, value: impl Into<ContextValue>) {
        self.local.insert(key.to_string(), value.into());
    }

    pub fn engine(&self, name: &str) -> Option<&ContextValue> {
        self.local.get(name).or_else(|| self.engine.get(name))
    }

    pub fn microapp(&self, scope: &str, name: &str) -> Option<&ContextValue> {
        let key = format!("{scope}.{name}");
        self.local.get(&key).or_else(|| self.microapp.get(&key))
    }
}
