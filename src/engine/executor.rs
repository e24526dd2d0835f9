//! Plan evaluation.
//!
//! Plans are evaluated eagerly and exactly once. Lambda arguments live on an
//! environment stack indexed by the slot the compiler assigned.

use std::time::Instant;

use tracing::debug;

use super::plan::{CompareOp, Lambda, LogicalOp, Plan, SequenceOp};
use super::value::{Sequence, Value, ValueType};
use crate::error::QueryError;

/// Evaluate a compiled plan to its final value.
pub fn execute(plan: &Plan) -> Result<Value, QueryError> {
    if let Plan::Constant(value) = plan {
        return Ok(value.clone());
    }
    let started = Instant::now();
    let mut env = Vec::new();
    let result = evaluate(plan, &mut env);
    debug!(elapsed_us = started.elapsed().as_micros() as u64, ok = result.is_ok(), "executed query plan");
    result
}

fn runtime(message: impl Into<String>) -> QueryError {
    QueryError::RuntimeInvocation(message.into())
}

fn evaluate(plan: &Plan, env: &mut Vec<Value>) -> Result<Value, QueryError> {
    match plan {
        Plan::Constant(value) => Ok(value.clone()),
        Plan::Parameter { name, slot, .. } => env
            .get(*slot)
            .cloned()
            .ok_or_else(|| runtime(format!("parameter '{}' is not bound", name))),
        Plan::Member { target, member } => {
            let target = evaluate(target, env)?;
            if target.is_null() {
                return Err(runtime(format!(
                    "cannot read '{}' of a null value",
                    member.name
                )));
            }
            Ok((member.get)(&target))
        }
        Plan::Invoke {
            target,
            method,
            args,
        } => {
            let target = evaluate(target, env)?;
            if target.is_null() {
                return Err(runtime(format!("cannot call '{}' on a null value", method.name)));
            }
            let args = args
                .iter()
                .map(|arg| evaluate(arg, env))
                .collect::<Result<Vec<_>, _>>()?;
            (method.call)(&target, &args).map_err(|err| runtime(format!("{}: {}", method.name, err)))
        }
        Plan::Convert { inner, to } => Ok(convert(evaluate(inner, env)?, to)),
        Plan::Compare { left, op, right } => {
            let left = evaluate(left, env)?;
            let right = evaluate(right, env)?;
            Ok(Value::Bool(compare(&left, *op, &right)))
        }
        Plan::Logical { left, op, right } => {
            let left = truthy(&evaluate(left, env)?);
            let result = match op {
                LogicalOp::And => left && truthy(&evaluate(right, env)?),
                LogicalOp::Or => left || truthy(&evaluate(right, env)?),
            };
            Ok(Value::Bool(result))
        }
        Plan::Sequence { source, op, ty } => {
            let items = match evaluate(source, env)? {
                Value::List(items) => items,
                Value::Null => {
                    return Err(runtime(format!("cannot call {} on a null value", op.name())))
                }
                other => {
                    return Err(runtime(format!(
                        "{} called on {} instead of a sequence",
                        op.name(),
                        other.value_type()
                    )))
                }
            };
            apply(&items, op, ty, env)
        }
        Plan::Lambda(lambda) => Err(runtime(format!(
            "lambda '{}' cannot be evaluated as a value",
            lambda.parameter
        ))),
    }
}

/// Run `lambda` with `arg` bound to its slot.
fn call(lambda: &Lambda, arg: &Value, env: &mut Vec<Value>) -> Result<Value, QueryError> {
    env.truncate(lambda.slot);
    env.push(arg.clone());
    let result = evaluate(&lambda.body, env);
    env.truncate(lambda.slot);
    result
}

fn test(predicate: &Lambda, item: &Value, env: &mut Vec<Value>) -> Result<bool, QueryError> {
    call(predicate, item, env).map(|v| truthy(&v))
}

fn apply(
    source: &Sequence,
    op: &SequenceOp,
    ty: &ValueType,
    env: &mut Vec<Value>,
) -> Result<Value, QueryError> {
    let element = || ty.element().cloned().unwrap_or(ValueType::Null);
    match op {
        SequenceOp::Where(predicate) => {
            let mut kept = Vec::new();
            for item in source.iter() {
                if test(predicate, item, env)? {
                    kept.push(item.clone());
                }
            }
            Ok(Value::List(Sequence::new(element(), kept)))
        }
        SequenceOp::Select(selector) => {
            let mapped = source
                .iter()
                .map(|item| call(selector, item, env))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(Sequence::new(element(), mapped)))
        }
        SequenceOp::OrderBy { key, descending } => {
            let mut keyed = source
                .iter()
                .map(|item| Ok((call(key, item, env)?, item.clone())))
                .collect::<Result<Vec<_>, QueryError>>()?;
            if *descending {
                keyed.sort_by(|(a, _), (b, _)| b.sort_cmp(a));
            } else {
                keyed.sort_by(|(a, _), (b, _)| a.sort_cmp(b));
            }
            let sorted = keyed.into_iter().map(|(_, item)| item).collect();
            Ok(Value::List(Sequence::new(element(), sorted)))
        }
        SequenceOp::Take(count) => {
            let n = count_value(count, env)?.min(source.len());
            Ok(Value::List(Sequence::new(element(), source.items()[..n].to_vec())))
        }
        SequenceOp::Skip(count) => {
            let n = count_value(count, env)?.min(source.len());
            Ok(Value::List(Sequence::new(element(), source.items()[n..].to_vec())))
        }
        SequenceOp::First(predicate) => match find(source, predicate.as_ref(), env)? {
            Some(item) => Ok(item),
            None if predicate.is_some() => Err(runtime("sequence contains no matching element")),
            None => Err(runtime("sequence contains no elements")),
        },
        SequenceOp::FirstOrDefault(predicate) => {
            Ok(find(source, predicate.as_ref(), env)?.unwrap_or(Value::Null))
        }
        SequenceOp::Any(predicate) => Ok(Value::Bool(find(source, predicate.as_ref(), env)?.is_some())),
        SequenceOp::Count(None) => Ok(Value::Int(source.len() as i32)),
        SequenceOp::Count(Some(predicate)) => {
            let mut count = 0;
            for item in source.iter() {
                if test(predicate, item, env)? {
                    count += 1;
                }
            }
            Ok(Value::Int(count))
        }
    }
}

fn find(
    source: &Sequence,
    predicate: Option<&Lambda>,
    env: &mut Vec<Value>,
) -> Result<Option<Value>, QueryError> {
    let Some(predicate) = predicate else {
        return Ok(source.items().first().cloned());
    };
    for item in source.iter() {
        if test(predicate, item, env)? {
            return Ok(Some(item.clone()));
        }
    }
    Ok(None)
}

/// Evaluate a Take/Skip count; negative counts behave as zero.
fn count_value(count: &Plan, env: &mut Vec<Value>) -> Result<usize, QueryError> {
    let value = evaluate(count, env)?;
    let n = value
        .as_i64()
        .ok_or_else(|| runtime(format!("count must be an integer, got {}", value.display())))?;
    Ok(n.max(0) as usize)
}

fn truthy(value: &Value) -> bool {
    value.as_bool().unwrap_or(false)
}

fn convert(value: Value, to: &ValueType) -> Value {
    match (value, to) {
        (Value::Int(i), ValueType::Long) => Value::Long(i as i64),
        (Value::Long(l), ValueType::Int) => Value::Int(l as i32),
        (other, _) => other,
    }
}

/// Comparison semantics: equality treats Null as a value, ordering against
/// Null is always false.
fn compare(left: &Value, op: CompareOp, right: &Value) -> bool {
    match op {
        CompareOp::Eq => left.equals(right),
        CompareOp::NotEq => !left.equals(right),
        _ => {
            let Some(ordering) = left.compare(right) else {
                return false;
            };
            match op {
                CompareOp::Gt => ordering.is_gt(),
                CompareOp::Lt => ordering.is_lt(),
                CompareOp::GtEq => ordering.is_ge(),
                _ => ordering.is_le(),
            }
        }
    }
}
