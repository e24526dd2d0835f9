//! Query AST types for gitlinq.
//!
//! This module defines the tree produced by the parser and consumed by the
//! compiler. The AST is:
//! - Closed (every node kind is a variant of [`Node`])
//! - Immutable once built (the compiler only borrows it)
//! - Schema-agnostic (member and method names are plain strings, resolved later)

use std::fmt;

/// A single node of a parsed query.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Bare name: the root source (`Commits`) or a lambda parameter.
    Identifier(String),
    /// Quoted text, either `"..."` or `'...'`.
    StringLiteral(String),
    /// Unsigned decimal digits.
    NumberLiteral(i32),
    /// `target.member`
    MemberAccess { target: Box<Node>, member: String },
    /// `target.method(arguments...)`
    MethodCall {
        target: Box<Node>,
        method: String,
        arguments: Vec<Node>,
    },
    /// `param => body` or `(param) => body`
    Lambda { parameter: String, body: Box<Node> },
    /// `left op right`
    Binary {
        left: Box<Node>,
        op: BinaryOperator,
        right: Box<Node>,
    },
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    NotEq,
    Gt,
    Lt,
    GtEq,
    LtEq,
    // Logical
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "==",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Lt => "<",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Node {
    pub fn identifier(name: impl Into<String>) -> Self {
        Node::Identifier(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Node::StringLiteral(value.into())
    }

    pub fn member(target: Node, member: impl Into<String>) -> Self {
        Node::MemberAccess {
            target: Box::new(target),
            member: member.into(),
        }
    }

    pub fn call(target: Node, method: impl Into<String>, arguments: Vec<Node>) -> Self {
        Node::MethodCall {
            target: Box::new(target),
            method: method.into(),
            arguments,
        }
    }

    pub fn lambda(parameter: impl Into<String>, body: Node) -> Self {
        Node::Lambda {
            parameter: parameter.into(),
            body: Box::new(body),
        }
    }

    pub fn binary(left: Node, op: BinaryOperator, right: Node) -> Self {
        Node::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Short human-readable name of the node kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Identifier(_) => "identifier",
            Node::StringLiteral(_) => "string literal",
            Node::NumberLiteral(_) => "number literal",
            Node::MemberAccess { .. } => "member access",
            Node::MethodCall { .. } => "method call",
            Node::Lambda { .. } => "lambda",
            Node::Binary { .. } => "binary expression",
        }
    }
}

/// Renders the node back as query text. String literals are always written
/// with double quotes unless the content itself contains one.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Identifier(name) => f.write_str(name),
            Node::StringLiteral(value) => {
                if value.contains('"') {
                    write!(f, "'{}'", value)
                } else {
                    write!(f, "\"{}\"", value)
                }
            }
            Node::NumberLiteral(value) => write!(f, "{}", value),
            Node::MemberAccess { target, member } => write!(f, "{}.{}", target, member),
            Node::MethodCall {
                target,
                method,
                arguments,
            } => {
                write!(f, "{}.{}(", target, method)?;
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Node::Lambda { parameter, body } => write!(f, "{} => {}", parameter, body),
            Node::Binary { left, op, right } => write!(f, "{} {} {}", left, op, right),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_clone_equality() {
        let node = Node::call(
            Node::identifier("Commits"),
            "Where",
            vec![Node::lambda(
                "c",
                Node::call(
                    Node::member(Node::identifier("c"), "Message"),
                    "Contains",
                    vec![Node::string("fix")],
                ),
            )],
        );
        assert_eq!(node.clone(), node);
    }

    #[test]
    fn test_argument_order_is_significant() {
        let a = Node::call(
            Node::identifier("x"),
            "f",
            vec![Node::NumberLiteral(1), Node::NumberLiteral(2)],
        );
        let b = Node::call(
            Node::identifier("x"),
            "f",
            vec![Node::NumberLiteral(2), Node::NumberLiteral(1)],
        );
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_round_trip_text() {
        let node = Node::call(
            Node::call(
                Node::identifier("Commits"),
                "Where",
                vec![Node::lambda(
                    "c",
                    Node::binary(
                        Node::member(Node::member(Node::identifier("c"), "Diff"), "FilesChanged"),
                        BinaryOperator::Gt,
                        Node::NumberLiteral(2),
                    ),
                )],
            ),
            "Take",
            vec![Node::NumberLiteral(10)],
        );
        assert_eq!(
            node.to_string(),
            "Commits.Where(c => c.Diff.FilesChanged > 2).Take(10)"
        );
    }

    #[test]
    fn test_display_quotes() {
        assert_eq!(Node::string("abc").to_string(), "\"abc\"");
        assert_eq!(Node::string("say \"hi\"").to_string(), "'say \"hi\"'");
    }

    #[test]
    fn test_operator_symbols() {
        assert_eq!(BinaryOperator::GtEq.symbol(), ">=");
        assert_eq!(BinaryOperator::NotEq.to_string(), "!=");
        assert_eq!(BinaryOperator::Or.symbol(), "||");
    }
}
