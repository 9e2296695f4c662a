use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::name::Name;

/// An opaque application-data value stored in props, state cells, or context
/// subscriptions.
///
/// Primitives compare by content. Reference values (`Function`, `Object`,
/// `Array`, `Element`) are `Arc`-shared and compare by pointer identity, so
/// the diff engine can distinguish "same allocation" from "new allocation
/// with the same structure" — the distinction the stability heuristic rests
/// on.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Name),
    Function(Arc<FunctionValue>),
    Object(Arc<ObjectValue>),
    Array(Arc<ArrayValue>),
    Element(Arc<ElementValue>),
}

/// A function value: display name plus its full printed source text.
#[derive(Debug)]
pub struct FunctionValue {
    pub name: Name,
    pub source: Name,
    fingerprint: OnceLock<Name>,
}

/// An object value: either a plain data object (`constructor: None`) or a
/// class instance fingerprinted by its constructor name.
#[derive(Debug)]
pub struct ObjectValue {
    pub constructor: Option<Name>,
    pub fields: Vec<(Name, Value)>,
    fingerprint: OnceLock<Name>,
}

#[derive(Debug)]
pub struct ArrayValue {
    pub items: Vec<Value>,
    fingerprint: OnceLock<Name>,
}

/// A renderable UI description. Never diffed structurally — its own work
/// node is diffed independently.
#[derive(Debug)]
pub struct ElementValue {
    pub component: Name,
    pub prop_count: usize,
    fingerprint: OnceLock<Name>,
}

/// Shared default for absent prop slots.
pub static UNDEFINED: Value = Value::Undefined;

impl Value {
    pub fn str(s: impl Into<Name>) -> Self {
        Value::Str(s.into())
    }

    pub fn function(name: impl Into<Name>, source: impl Into<Name>) -> Self {
        Value::Function(Arc::new(FunctionValue {
            name: name.into(),
            source: source.into(),
            fingerprint: OnceLock::new(),
        }))
    }

    /// Plain data object.
    pub fn object(fields: impl IntoIterator<Item = (Name, Value)>) -> Self {
        Value::Object(Arc::new(ObjectValue {
            constructor: None,
            fields: fields.into_iter().collect(),
            fingerprint: OnceLock::new(),
        }))
    }

    /// Class instance with a constructor name.
    pub fn instance(
        constructor: impl Into<Name>,
        fields: impl IntoIterator<Item = (Name, Value)>,
    ) -> Self {
        Value::Object(Arc::new(ObjectValue {
            constructor: Some(constructor.into()),
            fields: fields.into_iter().collect(),
            fingerprint: OnceLock::new(),
        }))
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(Arc::new(ArrayValue {
            items: items.into_iter().collect(),
            fingerprint: OnceLock::new(),
        }))
    }

    pub fn element(component: impl Into<Name>, prop_count: usize) -> Self {
        Value::Element(Arc::new(ElementValue {
            component: component.into(),
            prop_count,
            fingerprint: OnceLock::new(),
        }))
    }

    /// Whether this is a reference type — the kinds prone to spurious
    /// recreation across renders (inline closures, object literals).
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Value::Function(_) | Value::Object(_) | Value::Array(_) | Value::Element(_)
        )
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Value::Element(_))
    }

    /// Pointer identity for reference values; false for everything else.
    pub fn ref_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Element(a), Value::Element(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// The equality rule the diff engine uses: identity, or both values are
    /// NaN (repeated NaN renders are definitionally non-informative).
    pub fn is_equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => self.ref_eq(other),
        }
    }

    /// Short structural fingerprint of the value.
    ///
    /// Primitives stringify directly; functions fingerprint by their full
    /// source text; plain objects and arrays by shape only (`{N}` / `[N]`),
    /// staying O(1) regardless of nesting depth; class instances by
    /// constructor name; elements by component name and prop count.
    ///
    /// Fingerprints for reference values are computed once and cached for
    /// the lifetime of the allocation, keyed by identity, so a cached entry
    /// can never merge two distinct values.
    pub fn fingerprint(&self) -> Name {
        match self {
            Value::Undefined => Name::from("undefined"),
            Value::Null => Name::from("null"),
            Value::Bool(b) => Name::from(if *b { "true" } else { "false" }),
            Value::Number(n) => Name::from(format_number(*n)),
            Value::Str(s) => s.clone(),
            Value::Function(f) => f.fingerprint.get_or_init(|| f.source.clone()).clone(),
            Value::Object(o) => o
                .fingerprint
                .get_or_init(|| match &o.constructor {
                    Some(ctor) => Name::from(format!("{ctor}{{…}}")),
                    None if o.fields.is_empty() => Name::from("{}"),
                    None => Name::from(format!("{{{}}}", o.fields.len())),
                })
                .clone(),
            Value::Array(a) => a
                .fingerprint
                .get_or_init(|| {
                    if a.items.is_empty() {
                        Name::from("[]")
                    } else {
                        Name::from(format!("[{}]", a.items.len()))
                    }
                })
                .clone(),
            Value::Element(e) => e
                .fingerprint
                .get_or_init(|| Name::from(format!("<{} {}>", e.component, e.prop_count)))
                .clone(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        format!("{n}")
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Name::from(s))
    }
}

// Serialization captures structure, not identity: a deserialized value is a
// fresh allocation with its own pointer identity and an empty fingerprint
// cache. Used for event streams and replay, never for live-tree state.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ValueRepr {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Name),
    Function { name: Name, source: Name },
    Object { constructor: Option<Name>, fields: Vec<(Name, ValueRepr)> },
    Array(Vec<ValueRepr>),
    Element { component: Name, prop_count: usize },
}

impl From<&Value> for ValueRepr {
    fn from(value: &Value) -> Self {
        match value {
            Value::Undefined => ValueRepr::Undefined,
            Value::Null => ValueRepr::Null,
            Value::Bool(b) => ValueRepr::Bool(*b),
            Value::Number(n) => ValueRepr::Number(*n),
            Value::Str(s) => ValueRepr::Str(s.clone()),
            Value::Function(f) => ValueRepr::Function {
                name: f.name.clone(),
                source: f.source.clone(),
            },
            Value::Object(o) => ValueRepr::Object {
                constructor: o.constructor.clone(),
                fields: o
                    .fields
                    .iter()
                    .map(|(name, v)| (name.clone(), ValueRepr::from(v)))
                    .collect(),
            },
            Value::Array(a) => ValueRepr::Array(a.items.iter().map(ValueRepr::from).collect()),
            Value::Element(e) => ValueRepr::Element {
                component: e.component.clone(),
                prop_count: e.prop_count,
            },
        }
    }
}

impl From<ValueRepr> for Value {
    fn from(repr: ValueRepr) -> Self {
        match repr {
            ValueRepr::Undefined => Value::Undefined,
            ValueRepr::Null => Value::Null,
            ValueRepr::Bool(b) => Value::Bool(b),
            ValueRepr::Number(n) => Value::Number(n),
            ValueRepr::Str(s) => Value::Str(s),
            ValueRepr::Function { name, source } => Value::function(name, source),
            ValueRepr::Object { constructor: Some(ctor), fields } => {
                Value::instance(ctor, fields.into_iter().map(|(n, v)| (n, Value::from(v))))
            }
            ValueRepr::Object { constructor: None, fields } => {
                Value::object(fields.into_iter().map(|(n, v)| (n, Value::from(v))))
            }
            ValueRepr::Array(items) => Value::array(items.into_iter().map(Value::from)),
            ValueRepr::Element { component, prop_count } => Value::element(component, prop_count),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ValueRepr::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Value::from(ValueRepr::deserialize(deserializer)?))
    }
}
