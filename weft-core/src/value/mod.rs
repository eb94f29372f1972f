//! Value Model
//!
//! Rust has no dynamic property traps, so the object graphs the reactive core
//! observes are modelled explicitly: a [`Value`] is either a primitive, a
//! [`RawObject`] (record, sequence or collection), a wrapped view over a raw
//! object ([`ReactiveObject`]) or a value cell ([`Ref`]).
//!
//! Callers never get a drop-in substitute for the raw object. Instead they
//! go through the view's accessor methods (`get`, `set`, `has`, `keys`, ...),
//! and those methods are where interception happens.
//!
//! # Equality
//!
//! `Value` equality is shallow: primitives compare by value using the host
//! `==` (so `NaN` never equals itself), while objects, views and cells compare
//! by identity. A write only notifies subscribers when the new value is `!=`
//! to the old one under these rules.

mod json;
mod object;

pub use object::{ObjectId, RawObject, Shape, MAX_LENGTH};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::reactive::{ReactiveObject, Ref};

/// A dynamically typed value stored in, or read from, an object graph.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    /// An unwrapped composite.
    Object(RawObject),
    /// A mutable or read-only view over a composite.
    Reactive(ReactiveObject),
    /// A single-value reactive cell.
    Ref(Ref),
}

impl Value {
    /// Short name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
            Value::Reactive(_) => "reactive object",
            Value::Ref(_) => "ref",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether the value is a composite, raw or wrapped.
    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Reactive(_))
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, Value::Ref(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the value; integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&RawObject> {
        match self {
            Value::Object(raw) => Some(raw),
            _ => None,
        }
    }

    pub fn as_reactive(&self) -> Option<&ReactiveObject> {
        match self {
            Value::Reactive(view) => Some(view),
            _ => None,
        }
    }

    pub fn into_reactive(self) -> Option<ReactiveObject> {
        match self {
            Value::Reactive(view) => Some(view),
            _ => None,
        }
    }

    pub fn as_ref_cell(&self) -> Option<&Ref> {
        match self {
            Value::Ref(cell) => Some(cell),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Reactive(a), Value::Reactive(b)) => a.ptr_eq(b),
            (Value::Ref(a), Value::Ref(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            // Graphs may be cyclic; print identities only.
            Value::Object(raw) => write!(f, "Object({})", raw.id()),
            Value::Reactive(view) => write!(f, "Reactive({}, {:?})", view.id(), view.kind()),
            Value::Ref(cell) => write!(f, "Ref({})", cell.id()),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<Arc<str>> for Value {
    fn from(s: Arc<str>) -> Self {
        Value::Str(s)
    }
}

impl From<RawObject> for Value {
    fn from(raw: RawObject) -> Self {
        Value::Object(raw)
    }
}

impl From<&RawObject> for Value {
    fn from(raw: &RawObject) -> Self {
        Value::Object(raw.clone())
    }
}

impl From<ReactiveObject> for Value {
    fn from(view: ReactiveObject) -> Self {
        Value::Reactive(view)
    }
}

impl From<&ReactiveObject> for Value {
    fn from(view: &ReactiveObject) -> Self {
        Value::Reactive(view.clone())
    }
}

impl From<Ref> for Value {
    fn from(cell: Ref) -> Self {
        Value::Ref(cell)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

// ----------------------------------------------------------------------------
// Property keys
// ----------------------------------------------------------------------------

/// Engine-internal marker keys. Reading one through a view bypasses tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// Yields the raw object behind a view.
    Raw,
    /// Yields `true` for any view.
    IsReactive,
    /// Yields whether the view is read-only.
    IsReadonly,
}

/// Symbolic property keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// Language-level plumbing such as `iterator`. Never tracked.
    WellKnown(&'static str),
    /// Engine-internal marker.
    Marker(Marker),
    /// User-created symbol, unique by id.
    Unique { id: u64, description: Arc<str> },
}

impl Symbol {
    pub const ITERATOR: Symbol = Symbol::WellKnown("iterator");
    pub const ASYNC_ITERATOR: Symbol = Symbol::WellKnown("asyncIterator");
    pub const HAS_INSTANCE: Symbol = Symbol::WellKnown("hasInstance");
    pub const TO_PRIMITIVE: Symbol = Symbol::WellKnown("toPrimitive");
    pub const TO_STRING_TAG: Symbol = Symbol::WellKnown("toStringTag");

    /// Create a fresh unique symbol.
    pub fn new(description: &str) -> Self {
        static SYMBOL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);
        Symbol::Unique {
            id: SYMBOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            description: Arc::from(description),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::WellKnown(name) => write!(f, "Symbol({name})"),
            Symbol::Marker(marker) => write!(f, "Symbol({marker:?})"),
            Symbol::Unique { description, .. } => write!(f, "Symbol({description})"),
        }
    }
}

/// A property key: a name, an index or a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Name(Arc<str>),
    Index(usize),
    Symbol(Symbol),
}

impl PropertyKey {
    pub const RAW: PropertyKey = PropertyKey::Symbol(Symbol::Marker(Marker::Raw));
    pub const IS_REACTIVE: PropertyKey = PropertyKey::Symbol(Symbol::Marker(Marker::IsReactive));
    pub const IS_READONLY: PropertyKey = PropertyKey::Symbol(Symbol::Marker(Marker::IsReadonly));

    pub fn name(name: &str) -> Self {
        PropertyKey::Name(Arc::from(name))
    }

    /// The `length` key of sequences.
    pub fn length() -> Self {
        PropertyKey::name("length")
    }

    /// The slot value cells track themselves under.
    pub fn empty() -> Self {
        PropertyKey::name("")
    }

    pub fn is_length(&self) -> bool {
        matches!(self, PropertyKey::Name(name) if &**name == "length")
    }

    pub fn is_well_known(&self) -> bool {
        matches!(self, PropertyKey::Symbol(Symbol::WellKnown(_)))
    }

    pub fn marker(&self) -> Option<Marker> {
        match self {
            PropertyKey::Symbol(Symbol::Marker(marker)) => Some(*marker),
            _ => None,
        }
    }

    /// Canonical form of the key for a target shape.
    ///
    /// Records address everything by name, so indices become names.
    /// Sequences address elements by index, so canonical numeric names
    /// become indices. Collections keep keys as given.
    pub fn normalized(self, shape: Shape) -> Self {
        match (shape, self) {
            (Shape::Record, PropertyKey::Index(i)) => PropertyKey::Name(Arc::from(i.to_string())),
            (Shape::Sequence, PropertyKey::Name(name)) => match name.parse::<usize>() {
                Ok(i) if i.to_string() == *name => PropertyKey::Index(i),
                _ => PropertyKey::Name(name),
            },
            (_, key) => key,
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Name(name) => f.write_str(name),
            PropertyKey::Index(i) => write!(f, "{i}"),
            PropertyKey::Symbol(symbol) => write!(f, "{symbol}"),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(name: &str) -> Self {
        PropertyKey::name(name)
    }
}

impl From<String> for PropertyKey {
    fn from(name: String) -> Self {
        PropertyKey::Name(Arc::from(name))
    }
}

impl From<usize> for PropertyKey {
    fn from(index: usize) -> Self {
        PropertyKey::Index(index)
    }
}

impl From<Symbol> for PropertyKey {
    fn from(symbol: Symbol) -> Self {
        PropertyKey::Symbol(symbol)
    }
}

impl From<&PropertyKey> for PropertyKey {
    fn from(key: &PropertyKey) -> Self {
        key.clone()
    }
}
