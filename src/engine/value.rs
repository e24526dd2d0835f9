//! Runtime values and their types.
//!
//! Queries run over a closed value model: scalars, records exposed through
//! the [`Record`] trait, and sequences. Every value can report its
//! [`ValueType`], which is what the compiler resolves names against.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, FixedOffset};

use super::schema::{self, TypeInfo};

/// A record reachable from a query. Implementors describe their shape with a
/// [`TypeInfo`] registered once per type.
pub trait Record: fmt::Debug + Any {
    fn type_info(&self) -> &'static TypeInfo;
    fn as_any(&self) -> &dyn Any;
}

/// Static type of a compiled expression.
#[derive(Debug, Clone)]
pub enum ValueType {
    Null,
    Bool,
    Int,
    Long,
    Text,
    Timestamp,
    Record(&'static TypeInfo),
    List(Box<ValueType>),
    Lambda {
        parameter: Box<ValueType>,
        result: Box<ValueType>,
    },
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ValueType::Null, ValueType::Null)
            | (ValueType::Bool, ValueType::Bool)
            | (ValueType::Int, ValueType::Int)
            | (ValueType::Long, ValueType::Long)
            | (ValueType::Text, ValueType::Text)
            | (ValueType::Timestamp, ValueType::Timestamp) => true,
            (ValueType::Record(a), ValueType::Record(b)) => std::ptr::eq(*a, *b),
            (ValueType::List(a), ValueType::List(b)) => a == b,
            (
                ValueType::Lambda {
                    parameter: pa,
                    result: ra,
                },
                ValueType::Lambda {
                    parameter: pb,
                    result: rb,
                },
            ) => pa == pb && ra == rb,
            _ => false,
        }
    }
}

impl ValueType {
    pub fn list_of(element: ValueType) -> Self {
        ValueType::List(Box::new(element))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Int | ValueType::Long)
    }

    /// Types usable as an `OrderBy` key.
    pub fn is_orderable(&self) -> bool {
        matches!(
            self,
            ValueType::Bool
                | ValueType::Int
                | ValueType::Long
                | ValueType::Text
                | ValueType::Timestamp
        )
    }

    /// Element type when this is a sequence.
    pub fn element(&self) -> Option<&ValueType> {
        match self {
            ValueType::List(element) => Some(element),
            _ => None,
        }
    }

    /// The member/method registry for this type, if it has one.
    pub fn type_info(&self) -> Option<&'static TypeInfo> {
        match self {
            ValueType::Record(info) => Some(info),
            ValueType::Text => Some(schema::text_type()),
            ValueType::Timestamp => Some(schema::timestamp_type()),
            ValueType::List(_) => Some(schema::sequence_type()),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Null => f.write_str("Null"),
            ValueType::Bool => f.write_str("Bool"),
            ValueType::Int => f.write_str("Int"),
            ValueType::Long => f.write_str("Long"),
            ValueType::Text => f.write_str("Text"),
            ValueType::Timestamp => f.write_str("Timestamp"),
            ValueType::Record(info) => f.write_str(info.name()),
            ValueType::List(element) => write!(f, "Sequence<{}>", element),
            ValueType::Lambda { parameter, result } => write!(f, "Func<{}, {}>", parameter, result),
        }
    }
}

/// An immutable, shared sequence of values of one element type.
#[derive(Debug, Clone)]
pub struct Sequence {
    element: ValueType,
    items: Rc<[Value]>,
}

impl Sequence {
    pub fn new(element: ValueType, items: Vec<Value>) -> Self {
        Self {
            element,
            items: Rc::from(items),
        }
    }

    /// Wrap a list of records of one type.
    pub fn of_records<R: Record>(info: &'static TypeInfo, records: Vec<R>) -> Self {
        let items = records
            .into_iter()
            .map(|r| Value::Record(Rc::new(r)))
            .collect();
        Self::new(ValueType::Record(info), items)
    }

    pub fn element_type(&self) -> &ValueType {
        &self.element
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Text(String),
    Timestamp(DateTime<FixedOffset>),
    Record(Rc<dyn Record>),
    List(Sequence),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Long(_) => ValueType::Long,
            Value::Text(_) => ValueType::Text,
            Value::Timestamp(_) => ValueType::Timestamp,
            Value::Record(record) => ValueType::Record(record.type_info()),
            Value::List(seq) => ValueType::list_of(seq.element_type().clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i as i64),
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Value::List(seq) => Some(seq),
            _ => None,
        }
    }

    pub fn as_record<T: Record>(&self) -> Option<&T> {
        match self {
            Value::Record(record) => record.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Equality as used by `==` and `!=`. Null equals only Null; records and
    /// sequences compare by identity.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(&a.items, &b.items),
            (a, b) => match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    /// Ordering between two non-null values of the same orderable kind.
    /// Text orders case-insensitively, ties broken ordinally.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => {
                Some(a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)))
            }
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => None,
            },
        }
    }

    /// Total order used for sorting: Null sorts before everything else.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (a, b) => a.compare(b).unwrap_or(Ordering::Equal),
        }
    }

    /// Plain-text rendering of scalars; records show their type name and
    /// sequences their length.
    pub fn display(&self) -> String {
        match self {
            Value::Null => "(null)".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Long(l) => l.to_string(),
            Value::Text(s) => s.clone(),
            Value::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M").to_string(),
            Value::Record(record) => format!("<{}>", record.type_info().name()),
            Value::List(seq) => format!("[{} items]", seq.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Option<&str>> for Value {
    fn from(s: Option<&str>) -> Self {
        s.map(Value::from).unwrap_or(Value::Null)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(ts: DateTime<FixedOffset>) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<Sequence> for Value {
    fn from(seq: Sequence) -> Self {
        Value::List(seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_equality_across_widths() {
        assert!(Value::Int(5).equals(&Value::Long(5)));
        assert!(!Value::Int(5).equals(&Value::Long(6)));
    }

    #[test]
    fn test_text_sorts_case_insensitively() {
        let mut names: Vec<Value> = ["Zed", "alice", "Bob", "bob"]
            .into_iter()
            .map(Value::from)
            .collect();
        names.sort_by(|a, b| a.sort_cmp(b));
        let sorted: Vec<&str> = names.iter().filter_map(Value::as_str).collect();
        assert_eq!(sorted, vec!["alice", "Bob", "bob", "Zed"]);
    }

    #[test]
    fn test_null_equality() {
        assert!(Value::Null.equals(&Value::Null));
        assert!(!Value::Null.equals(&Value::from("x")));
        assert!(!Value::from("x").equals(&Value::Null));
    }

    #[test]
    fn test_sort_cmp_puts_null_first() {
        let mut values = vec![Value::Int(3), Value::Null, Value::Int(1)];
        values.sort_by(|a, b| a.sort_cmp(b));
        assert!(values[0].is_null());
        assert_eq!(values[1].as_i64(), Some(1));
        assert_eq!(values[2].as_i64(), Some(3));
    }

    #[test]
    fn test_compare_mismatched_kinds() {
        assert_eq!(Value::from("a").compare(&Value::Int(1)), None);
        assert_eq!(
            Value::from("a").compare(&Value::from("b")),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_sequence_type() {
        let seq = Sequence::new(ValueType::Text, vec![Value::from("a"), Value::from("b")]);
        assert_eq!(seq.len(), 2);
        assert_eq!(
            Value::List(seq).value_type(),
            ValueType::list_of(ValueType::Text)
        );
    }

    #[test]
    fn test_type_display() {
        assert_eq!(ValueType::list_of(ValueType::Text).to_string(), "Sequence<Text>");
        assert_eq!(
            ValueType::Lambda {
                parameter: Box::new(ValueType::Int),
                result: Box::new(ValueType::Bool)
            }
            .to_string(),
            "Func<Int, Bool>"
        );
    }

    #[test]
    fn test_orderable_types() {
        assert!(ValueType::Timestamp.is_orderable());
        assert!(ValueType::Text.is_orderable());
        assert!(!ValueType::list_of(ValueType::Int).is_orderable());
    }
}
