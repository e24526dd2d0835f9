use std::time::Duration;

use crate::engine::plan::{Lambda, Plan, SequenceOp};
use crate::engine::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct PlanNode {
    pub node_type: String,
    pub result_type: String,
    pub details: Vec<String>,
    pub children: Vec<PlanNode>,
    pub depth: usize,
}

impl PlanNode {
    fn new(node_type: impl Into<String>, result_type: String, depth: usize) -> Self {
        Self {
            node_type: node_type.into(),
            result_type,
            details: Vec::new(),
            children: Vec::new(),
            depth,
        }
    }

    /// Total number of nodes in this subtree.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(PlanNode::size).sum::<usize>()
    }
}

/// REPL lines of the form `explain <query>`. Returns the query part.
pub fn strip_explain_command(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let keyword = trimmed.get(..7)?;
    if !keyword.eq_ignore_ascii_case("explain") {
        return None;
    }
    let rest = &trimmed[7..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

/// Build a display tree for a compiled plan.
pub fn explain(plan: &Plan) -> PlanNode {
    build(plan, 0)
}

fn build(plan: &Plan, depth: usize) -> PlanNode {
    let ty = plan.value_type().to_string();
    match plan {
        Plan::Constant(Value::List(seq)) => {
            let mut node = PlanNode::new("Source", ty, depth);
            node.details.push(format!("{} items", seq.len()));
            node
        }
        Plan::Constant(value) => {
            let mut node = PlanNode::new("Constant", ty, depth);
            node.details.push(match value {
                Value::Text(s) => format!("{:?}", s),
                other => other.display(),
            });
            node
        }
        Plan::Parameter { name, slot, .. } => {
            let mut node = PlanNode::new(format!("Parameter {}", name), ty, depth);
            node.details.push(format!("slot {}", slot));
            node
        }
        Plan::Member { target, member } => {
            let mut node = PlanNode::new(format!("Member {}", member.name), ty, depth);
            node.children.push(build(target, depth + 1));
            node
        }
        Plan::Invoke {
            target,
            method,
            args,
        } => {
            let mut node = PlanNode::new(format!("Call {}", method.name), ty, depth);
            node.details.push(method.to_string());
            node.children.push(build(target, depth + 1));
            node.children
                .extend(args.iter().map(|arg| build(arg, depth + 1)));
            node
        }
        Plan::Convert { inner, to } => {
            let mut node = PlanNode::new(format!("Convert to {}", to), ty, depth);
            node.children.push(build(inner, depth + 1));
            node
        }
        Plan::Compare { left, op, right } => {
            let mut node = PlanNode::new(format!("Compare {}", op.symbol()), ty, depth);
            node.children.push(build(left, depth + 1));
            node.children.push(build(right, depth + 1));
            node
        }
        Plan::Logical { left, op, right } => {
            let mut node = PlanNode::new(format!("Logical {}", op.symbol()), ty, depth);
            node.details.push("short-circuit".to_string());
            node.children.push(build(left, depth + 1));
            node.children.push(build(right, depth + 1));
            node
        }
        Plan::Sequence { source, op, .. } => {
            let mut node = PlanNode::new(op.name(), ty, depth);
            node.children.push(build(source, depth + 1));
            match op {
                SequenceOp::Where(lambda) | SequenceOp::Select(lambda) => {
                    node.children.push(build_lambda(lambda, depth + 1));
                }
                SequenceOp::OrderBy { key, .. } => {
                    node.details.push("stable".to_string());
                    node.children.push(build_lambda(key, depth + 1));
                }
                SequenceOp::Take(count) | SequenceOp::Skip(count) => {
                    node.children.push(build(count, depth + 1));
                }
                SequenceOp::First(predicate)
                | SequenceOp::FirstOrDefault(predicate)
                | SequenceOp::Any(predicate)
                | SequenceOp::Count(predicate) => {
                    if let Some(lambda) = predicate {
                        node.children.push(build_lambda(lambda, depth + 1));
                    }
                }
            }
            node
        }
        Plan::Lambda(lambda) => build_lambda(lambda, depth),
    }
}

fn build_lambda(lambda: &Lambda, depth: usize) -> PlanNode {
    let mut node = PlanNode::new(
        format!("Lambda {} => ...", lambda.parameter),
        format!("{} => {}", lambda.parameter_type, lambda.result_type()),
        depth,
    );
    node.details.push(format!("slot {}", lambda.slot));
    node.children.push(build(&lambda.body, depth + 1));
    node
}

/// Render a plan tree as indented text, one node per line.
pub fn render(root: &PlanNode) -> String {
    let mut out = String::new();
    render_into(root, &mut out);
    out
}

fn render_into(node: &PlanNode, out: &mut String) {
    let indent = "   ".repeat(node.depth);
    let arrow = if node.depth == 0 { "" } else { "-> " };
    out.push_str(&format!(
        "{}{}{}  ({})\n",
        indent, arrow, node.node_type, node.result_type
    ));
    for detail in &node.details {
        let pad = if node.depth == 0 { "  " } else { "     " };
        out.push_str(&format!("{}{}{}\n", indent, pad, detail));
    }
    for child in &node.children {
        render_into(child, out);
    }
}

pub fn format_duration(elapsed: Duration) -> String {
    format_duration_ms(elapsed.as_secs_f64() * 1000.0)
}

pub fn format_duration_ms(ms: f64) -> String {
    if ms >= 1000.0 {
        format!("{:.2}s", ms / 1000.0)
    } else {
        format!("{:.2}ms", ms)
    }
}
