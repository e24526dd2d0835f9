//! Introspection registry.
//!
//! A [`TypeInfo`] lists the members and methods a query may reach on a type.
//! Registries are built once per type and live for the whole process, so the
//! compiler can hold `&'static` references to the entries it resolves.

use std::fmt;
use std::sync::OnceLock;

use chrono::{Datelike, Timelike};

use super::value::{Record, Value, ValueType};

/// Reads one member off a receiver.
pub type Getter = fn(&Value) -> Value;

/// Invokes a method with already-evaluated arguments. The receiver is never
/// Null; the executor rejects that before calling.
pub type Invoker = fn(&Value, &[Value]) -> Result<Value, String>;

pub struct MemberInfo {
    pub name: &'static str,
    pub ty: ValueType,
    pub get: Getter,
}

pub struct MethodInfo {
    pub name: &'static str,
    pub params: Vec<ValueType>,
    pub returns: ValueType,
    pub call: Invoker,
}

impl fmt::Debug for MemberInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ") -> {}", self.returns)
    }
}

pub struct TypeInfo {
    name: &'static str,
    members: Vec<MemberInfo>,
    methods: Vec<MethodInfo>,
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("members", &self.members.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

impl TypeInfo {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            members: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn member(mut self, name: &'static str, ty: ValueType, get: Getter) -> Self {
        self.members.push(MemberInfo { name, ty, get });
        self
    }

    pub fn method(
        mut self,
        name: &'static str,
        params: Vec<ValueType>,
        returns: ValueType,
        call: Invoker,
    ) -> Self {
        self.methods.push(MethodInfo {
            name,
            params,
            returns,
            call,
        });
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn members(&self) -> &[MemberInfo] {
        &self.members
    }

    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    /// Case-insensitive member lookup.
    pub fn find_member(&self, name: &str) -> Option<&MemberInfo> {
        self.members
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }

    /// Methods whose name matches case-insensitively and take `arity` arguments.
    pub fn find_methods(&self, name: &str, arity: usize) -> Vec<&MethodInfo> {
        self.methods
            .iter()
            .filter(|m| m.name.eq_ignore_ascii_case(name) && m.params.len() == arity)
            .collect()
    }
}

/// Read a member of record type `T`, yielding Null for any other receiver.
pub fn field<T: Record>(value: &Value, get: fn(&T) -> Value) -> Value {
    value.as_record::<T>().map(get).unwrap_or(Value::Null)
}

/// Borrow the receiver as record type `T` inside an [`Invoker`].
pub fn receiver<T: Record>(value: &Value) -> Result<&T, String> {
    value
        .as_record::<T>()
        .ok_or_else(|| format!("receiver is {}, not a record of the expected type", value.value_type()))
}

/// Borrow a text argument inside an [`Invoker`].
pub fn text_arg(args: &[Value], index: usize) -> Result<&str, String> {
    match args.get(index) {
        Some(Value::Text(s)) => Ok(s),
        Some(Value::Null) => Err("value cannot be null".to_string()),
        Some(other) => Err(format!("expected Text argument, got {}", other.value_type())),
        None => Err(format!("missing argument {}", index + 1)),
    }
}

fn text_receiver(value: &Value) -> Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("receiver is {}, not Text", value.value_type()))
}

fn text_predicate(receiver: &Value, args: &[Value], test: fn(&str, &str) -> bool) -> Result<Value, String> {
    let text = text_receiver(receiver)?;
    let needle = text_arg(args, 0)?;
    Ok(Value::Bool(test(text, needle)))
}

pub fn text_type() -> &'static TypeInfo {
    static INFO: OnceLock<TypeInfo> = OnceLock::new();
    INFO.get_or_init(|| {
        TypeInfo::new("Text")
            .member("Length", ValueType::Int, |v| match v {
                Value::Text(s) => Value::Int(s.chars().count() as i32),
                _ => Value::Null,
            })
            .method("Contains", vec![ValueType::Text], ValueType::Bool, |v, args| {
                text_predicate(v, args, |s, n| s.contains(n))
            })
            .method("StartsWith", vec![ValueType::Text], ValueType::Bool, |v, args| {
                text_predicate(v, args, |s, n| s.starts_with(n))
            })
            .method("EndsWith", vec![ValueType::Text], ValueType::Bool, |v, args| {
                text_predicate(v, args, |s, n| s.ends_with(n))
            })
            .method("Equals", vec![ValueType::Text], ValueType::Bool, |v, args| {
                text_predicate(v, args, |s, n| s == n)
            })
            .method("ToLower", vec![], ValueType::Text, |v, _| {
                Ok(Value::Text(text_receiver(v)?.to_lowercase()))
            })
            .method("ToUpper", vec![], ValueType::Text, |v, _| {
                Ok(Value::Text(text_receiver(v)?.to_uppercase()))
            })
            .method("Trim", vec![], ValueType::Text, |v, _| {
                Ok(Value::Text(text_receiver(v)?.trim().to_string()))
            })
    })
}

pub fn timestamp_type() -> &'static TypeInfo {
    static INFO: OnceLock<TypeInfo> = OnceLock::new();
    INFO.get_or_init(|| {
        TypeInfo::new("Timestamp")
            .member("Year", ValueType::Int, |v| match v {
                Value::Timestamp(ts) => Value::Int(ts.year()),
                _ => Value::Null,
            })
            .member("Month", ValueType::Int, |v| match v {
                Value::Timestamp(ts) => Value::Int(ts.month() as i32),
                _ => Value::Null,
            })
            .member("Day", ValueType::Int, |v| match v {
                Value::Timestamp(ts) => Value::Int(ts.day() as i32),
                _ => Value::Null,
            })
            .member("Hour", ValueType::Int, |v| match v {
                Value::Timestamp(ts) => Value::Int(ts.hour() as i32),
                _ => Value::Null,
            })
            .member("Minute", ValueType::Int, |v| match v {
                Value::Timestamp(ts) => Value::Int(ts.minute() as i32),
                _ => Value::Null,
            })
    })
}

/// Members shared by every `Sequence<T>`. Sequence operators are resolved by
/// the compiler, not through this registry.
pub fn sequence_type() -> &'static TypeInfo {
    static INFO: OnceLock<TypeInfo> = OnceLock::new();
    INFO.get_or_init(|| {
        TypeInfo::new("Sequence").member("Count", ValueType::Int, |v| match v {
            Value::List(seq) => Value::Int(seq.len() as i32),
            _ => Value::Null,
        })
    })
}
