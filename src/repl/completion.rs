//! Tab completion and inline hints for the query prompt.
//!
//! Completion works on the raw line rather than a parse tree, since the line
//! is usually incomplete. The type in front of a `.` is recovered by walking
//! back through member accesses, calls and lambda parameters, then looked up
//! in the same registries the compiler uses.

use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Context, Event, EventContext, Helper, RepeatCount,
};

use crate::ast::SEQUENCE_OPERATORS;
use crate::engine::value::ValueType;

use super::commands::COMMANDS;

pub struct QueryHelper {
    root_name: String,
    root_type: ValueType,
}

impl QueryHelper {
    pub fn new(root_name: impl Into<String>, root_type: ValueType) -> Self {
        Self {
            root_name: root_name.into(),
            root_type,
        }
    }

    /// Candidates for the word ending at `pos`, and where that word starts.
    pub fn suggest(&self, line: &str, pos: usize) -> (usize, Vec<Pair>) {
        let input = match line.get(..pos) {
            Some(input) => input,
            None => return (pos, Vec::new()),
        };
        let start = word_start(input);
        let prefix = &input[start..];

        if start > 0 && input[..start].ends_with('.') {
            let candidates = self
                .receiver_type(input, start - 1, 0)
                .map(|ty| members_of(&ty))
                .unwrap_or_default();
            return (start, filter(candidates, prefix));
        }

        let mut candidates = Vec::new();
        if input[..start].trim().is_empty() {
            candidates.extend(COMMANDS.iter().map(|(name, _)| Candidate::word(name)));
        }
        candidates.push(Candidate::word(&self.root_name));
        candidates.extend(lambda_parameters(&input[..start]).into_iter().map(Candidate::word));
        (start, filter(candidates, prefix))
    }

    /// Type of the expression ending just before the `.` at `dot`.
    fn receiver_type(&self, line: &str, dot: usize, depth: usize) -> Option<ValueType> {
        if depth > 32 {
            return None;
        }
        let before = line[..dot].trim_end();

        if before.ends_with(')') {
            let open = matching_open_paren(before)?;
            let name_start = word_start(&before[..open]);
            let method = &before[name_start..open];
            if name_start == 0 || !before[..name_start].ends_with('.') {
                return None;
            }
            let receiver = self.receiver_type(line, name_start - 1, depth + 1)?;
            return call_result(&receiver, method);
        }

        let start = word_start(before);
        let name = &before[start..];
        if name.is_empty() {
            return None;
        }
        if start > 0 && before[..start].ends_with('.') {
            let receiver = self.receiver_type(line, start - 1, depth + 1)?;
            return receiver
                .type_info()
                .and_then(|info| info.find_member(name))
                .map(|member| member.ty.clone());
        }
        if name == self.root_name {
            return Some(self.root_type.clone());
        }
        self.parameter_type(line, name, depth + 1)
    }

    /// Element type of the sequence whose operator introduced `parameter`.
    fn parameter_type(&self, line: &str, parameter: &str, depth: usize) -> Option<ValueType> {
        let binding = find_binding(line, parameter)?;
        let before = line[..binding].trim_end().trim_end_matches(['(', ' ']);
        let op_start = word_start(before);
        if op_start == 0 || !before[..op_start].ends_with('.') {
            return None;
        }
        let receiver = self.receiver_type(line, op_start - 1, depth + 1)?;
        receiver.element().cloned()
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    name: String,
    replacement: String,
    detail: String,
}

impl Candidate {
    fn word(name: &str) -> Self {
        Self {
            name: name.to_string(),
            replacement: name.to_string(),
            detail: String::new(),
        }
    }
}

fn filter(candidates: Vec<Candidate>, prefix: &str) -> Vec<Pair> {
    let prefix = prefix.to_lowercase();
    let mut seen = std::collections::HashSet::new();
    candidates
        .into_iter()
        .filter(|c| c.name.to_lowercase().starts_with(&prefix))
        .filter(|c| seen.insert(c.name.clone()))
        .map(|c| Pair {
            display: if c.detail.is_empty() {
                c.name
            } else {
                format!("{:<20} {}", c.name, c.detail)
            },
            replacement: c.replacement,
        })
        .collect()
}

fn members_of(ty: &ValueType) -> Vec<Candidate> {
    let mut out = Vec::new();
    if ty.element().is_some() {
        out.extend(SEQUENCE_OPERATORS.iter().map(|op| Candidate {
            name: op.to_string(),
            replacement: format!("{}(", op),
            detail: "operator".to_string(),
        }));
    }
    if let Some(info) = ty.type_info() {
        out.extend(info.members().iter().map(|m| Candidate {
            name: m.name.to_string(),
            replacement: m.name.to_string(),
            detail: m.ty.to_string(),
        }));
        out.extend(info.methods().iter().map(|m| Candidate {
            name: m.name.to_string(),
            replacement: format!("{}(", m.name),
            detail: m.to_string(),
        }));
    }
    out
}

fn call_result(receiver: &ValueType, method: &str) -> Option<ValueType> {
    if receiver.element().is_some() {
        match method.to_ascii_lowercase().as_str() {
            "where" | "orderby" | "orderbydescending" | "take" | "skip" => {
                return Some(receiver.clone())
            }
            "first" | "firstordefault" => return receiver.element().cloned(),
            _ => {}
        }
    }
    receiver
        .type_info()?
        .methods()
        .iter()
        .find(|m| m.name.eq_ignore_ascii_case(method))
        .map(|m| m.returns.clone())
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn word_start(input: &str) -> usize {
    input
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_word_char(*c))
        .last()
        .map(|(i, _)| i)
        .unwrap_or(input.len())
}

fn matching_open_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices().rev() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            ')' => depth += 1,
            '(' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Byte offset of the parameter in the last `parameter =>` binding.
fn find_binding(line: &str, parameter: &str) -> Option<usize> {
    let mut found = None;
    let mut search = 0;
    while let Some(offset) = line[search..].find("=>") {
        let arrow = search + offset;
        let before = line[..arrow].trim_end().trim_end_matches(')');
        let start = word_start(before);
        if &before[start..] == parameter {
            found = Some(start);
        }
        search = arrow + 2;
    }
    found
}

fn lambda_parameters(input: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut search = 0;
    while let Some(offset) = input[search..].find("=>") {
        let arrow = search + offset;
        let before = input[..arrow].trim_end().trim_end_matches(')');
        let start = word_start(before);
        if start < before.len() {
            params.push(&before[start..]);
        }
        search = arrow + 2;
    }
    params
}

impl Completer for QueryHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        Ok(self.suggest(line, pos))
    }
}

impl Hinter for QueryHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        let (start, candidates) = self.suggest(line, pos);
        let typed = &line[start..pos];
        match candidates.as_slice() {
            [only] if !typed.is_empty() && only.replacement.len() > typed.len() => {
                only.replacement.get(typed.len()..).map(str::to_string)
            }
            _ => None,
        }
    }
}

impl Highlighter for QueryHelper {}
impl Validator for QueryHelper {}
impl Helper for QueryHelper {}

pub struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}
