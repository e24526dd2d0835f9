//! Compiled query plans.
//!
//! A [`Plan`] is the typed, fully resolved form of a query: every member and
//! method reference points straight at its registry entry, every lambda
//! parameter has an environment slot, and every node knows its result type.

use super::schema::{MemberInfo, MethodInfo};
use super::value::{Value, ValueType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Lt,
    GtEq,
    LtEq,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::GtEq => ">=",
            CompareOp::LtEq => "<=",
        }
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, CompareOp::Eq | CompareOp::NotEq)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
        }
    }
}

/// A one-argument function. `slot` is the environment index the argument is
/// bound to while `body` runs.
#[derive(Debug)]
pub struct Lambda {
    pub parameter: String,
    pub slot: usize,
    pub parameter_type: ValueType,
    pub body: Box<Plan>,
}

impl Lambda {
    pub fn result_type(&self) -> ValueType {
        self.body.value_type()
    }
}

#[derive(Debug)]
pub enum SequenceOp {
    Where(Lambda),
    Select(Lambda),
    OrderBy { key: Lambda, descending: bool },
    Take(Box<Plan>),
    Skip(Box<Plan>),
    First(Option<Lambda>),
    FirstOrDefault(Option<Lambda>),
    Any(Option<Lambda>),
    Count(Option<Lambda>),
}

impl SequenceOp {
    pub fn name(&self) -> &'static str {
        match self {
            SequenceOp::Where(_) => "Where",
            SequenceOp::Select(_) => "Select",
            SequenceOp::OrderBy {
                descending: false, ..
            } => "OrderBy",
            SequenceOp::OrderBy {
                descending: true, ..
            } => "OrderByDescending",
            SequenceOp::Take(_) => "Take",
            SequenceOp::Skip(_) => "Skip",
            SequenceOp::First(_) => "First",
            SequenceOp::FirstOrDefault(_) => "FirstOrDefault",
            SequenceOp::Any(_) => "Any",
            SequenceOp::Count(_) => "Count",
        }
    }
}

#[derive(Debug)]
pub enum Plan {
    Constant(Value),
    Parameter {
        name: String,
        slot: usize,
        ty: ValueType,
    },
    Member {
        target: Box<Plan>,
        member: &'static MemberInfo,
    },
    Invoke {
        target: Box<Plan>,
        method: &'static MethodInfo,
        args: Vec<Plan>,
    },
    /// Numeric width change between `Int` and `Long`.
    Convert { inner: Box<Plan>, to: ValueType },
    Compare {
        left: Box<Plan>,
        op: CompareOp,
        right: Box<Plan>,
    },
    Logical {
        left: Box<Plan>,
        op: LogicalOp,
        right: Box<Plan>,
    },
    Sequence {
        source: Box<Plan>,
        op: SequenceOp,
        ty: ValueType,
    },
    Lambda(Lambda),
}

impl Plan {
    pub fn value_type(&self) -> ValueType {
        match self {
            Plan::Constant(value) => value.value_type(),
            Plan::Parameter { ty, .. } => ty.clone(),
            Plan::Member { member, .. } => member.ty.clone(),
            Plan::Invoke { method, .. } => method.returns.clone(),
            Plan::Convert { to, .. } => to.clone(),
            Plan::Compare { .. } | Plan::Logical { .. } => ValueType::Bool,
            Plan::Sequence { ty, .. } => ty.clone(),
            Plan::Lambda(lambda) => ValueType::Lambda {
                parameter: Box::new(lambda.parameter_type.clone()),
                result: Box::new(lambda.result_type()),
            },
        }
    }

    pub(crate) fn convert(self, to: ValueType) -> Plan {
        if self.value_type() == to {
            return self;
        }
        Plan::Convert {
            inner: Box::new(self),
            to,
        }
    }
}
