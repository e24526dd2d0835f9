/// Query language front end.
///
/// ```text
/// Query text
///       ↓
/// Lexer                   (lexer.rs)
///       ↓
/// Parser → AST            (parser.rs, types.rs)
///       ↓
/// Compiler → Plan         (compiler.rs)
///       ↓
/// Executor                (engine/executor.rs)
/// ```
///
/// Syntax problems surface as [`ParseError`]; everything the compiler rejects
/// is a [`crate::error::QueryError`].
pub mod compiler;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod types;

// Re-export key types for convenience
pub use compiler::{compile, SEQUENCE_OPERATORS};
pub use error::ParseError;
pub use parser::parse_query;
pub use types::*;
