pub mod ast;
pub mod config;
pub mod display;
pub mod editor;
pub mod engine;
pub mod error;
pub mod explain;
pub mod export;
pub mod git;
pub mod model;
pub mod repl;
pub mod snippets;
pub mod table;
