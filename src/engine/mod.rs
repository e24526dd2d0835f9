//! Query engine: value model, type registry, plans and their execution.

pub mod executor;
pub mod plan;
pub mod schema;
pub mod value;

use std::time::{Duration, Instant};

use tracing::debug;

use crate::ast::{compile, parse_query};
use crate::error::QueryError;
use crate::model::{commit_type, CommitInfo};
use plan::Plan;
use value::{Sequence, Value, ValueType};

/// Name under which the commit collection is exposed unless configured
/// otherwise.
pub const DEFAULT_ROOT_NAME: &str = "Commits";

/// The collection a query starts from, bound to a case-sensitive name.
#[derive(Debug, Clone)]
pub struct RootSource {
    name: String,
    collection: Sequence,
}

impl RootSource {
    pub fn new(name: impl Into<String>, collection: Sequence) -> Self {
        Self {
            name: name.into(),
            collection,
        }
    }

    pub fn from_commits(name: impl Into<String>, commits: Vec<CommitInfo>) -> Self {
        Self::new(name, Sequence::of_records(commit_type(), commits))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection(&self) -> &Sequence {
        &self.collection
    }

    pub fn element_type(&self) -> &ValueType {
        self.collection.element_type()
    }

    pub fn collection_type(&self) -> ValueType {
        ValueType::list_of(self.element_type().clone())
    }
}

/// Result of running a query, with the time spent compiling and executing.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub value: Value,
    pub elapsed: Duration,
}

/// Parse and compile `text` without running it.
pub fn compile_query(text: &str, root: &RootSource) -> Result<Plan, QueryError> {
    let started = Instant::now();
    let ast = parse_query(text)?;
    let plan = compile(&ast, root)?;
    debug!(
        elapsed_us = started.elapsed().as_micros() as u64,
        result = %plan.value_type(),
        "compiled query"
    );
    Ok(plan)
}

/// Parse, compile and execute `text` against `root`.
pub fn run_query(text: &str, root: &RootSource) -> Result<Value, QueryError> {
    run(text, root).map(|outcome| outcome.value)
}

pub fn run(text: &str, root: &RootSource) -> Result<QueryOutcome, QueryError> {
    let started = Instant::now();
    let plan = compile_query(text, root)?;
    let value = executor::execute(&plan)?;
    Ok(QueryOutcome {
        value,
        elapsed: started.elapsed(),
    })
}
