//! Query error taxonomy.

use std::fmt;

use thiserror::Error;

use crate::ast::ParseError;

/// Broad grouping of [`QueryError`]s, used to pick a heading and colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Syntax,
    Resolution,
    Runtime,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Syntax => write!(f, "Syntax Error"),
            ErrorCategory::Resolution => write!(f, "Query Error"),
            ErrorCategory::Runtime => write!(f, "Runtime Error"),
        }
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("member '{member}' not found on type {type_name}")]
    MemberNotFound { member: String, type_name: String },

    #[error("method '{method}' not found on type {type_name}")]
    MethodNotFound { method: String, type_name: String },

    #[error("{operator} expects {expected}")]
    ArgumentShape { operator: String, expected: String },

    #[error("operator '{operator}' is not supported between {left} and {right}")]
    UnsupportedOperator {
        operator: String,
        left: String,
        right: String,
    },

    #[error("{kind} is not supported {context}")]
    UnsupportedNodeKind { kind: String, context: String },

    #[error("{0}")]
    RuntimeInvocation(String),
}

impl QueryError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            QueryError::Parse(_) => ErrorCategory::Syntax,
            QueryError::RuntimeInvocation(_) => ErrorCategory::Runtime,
            _ => ErrorCategory::Resolution,
        }
    }

    pub(crate) fn member_not_found(member: &str, type_name: impl ToString) -> Self {
        QueryError::MemberNotFound {
            member: member.to_string(),
            type_name: type_name.to_string(),
        }
    }

    pub(crate) fn method_not_found(method: &str, type_name: impl ToString) -> Self {
        QueryError::MethodNotFound {
            method: method.to_string(),
            type_name: type_name.to_string(),
        }
    }

    pub(crate) fn argument_shape(operator: &str, expected: impl Into<String>) -> Self {
        QueryError::ArgumentShape {
            operator: operator.to_string(),
            expected: expected.into(),
        }
    }

    pub(crate) fn unsupported_node(kind: &str, context: impl Into<String>) -> Self {
        QueryError::UnsupportedNodeKind {
            kind: kind.to_string(),
            context: context.into(),
        }
    }
}
