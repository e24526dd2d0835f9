/// AST → plan compiler.
///
/// Resolves every identifier, member and method in a parsed query against the
/// introspection registry and produces a typed [`Plan`]. Name resolution is
/// driven entirely by the types discovered while compiling, starting from the
/// root collection's element type, so the compiler holds no knowledge of any
/// particular record shape.
use super::types::{BinaryOperator, Node};
use crate::engine::plan::{CompareOp, Lambda, LogicalOp, Plan, SequenceOp};
use crate::engine::schema::MethodInfo;
use crate::engine::value::{Value, ValueType};
use crate::engine::RootSource;
use crate::error::QueryError;

/// Operators callable on any `Sequence<T>`, in the casing shown to users.
pub const SEQUENCE_OPERATORS: [&str; 10] = [
    "Where",
    "Select",
    "OrderBy",
    "OrderByDescending",
    "Take",
    "Skip",
    "First",
    "FirstOrDefault",
    "Any",
    "Count",
];

/// Compile a parsed query against `root`.
pub fn compile(node: &Node, root: &RootSource) -> Result<Plan, QueryError> {
    if let Node::Lambda { .. } = node {
        return Err(QueryError::unsupported_node("lambda", "as a whole query"));
    }
    Compiler { root }.compile(node, &Scope::Root, None)
}

/// Lambda parameters visible at some point of the tree. Each lambda pushes a
/// frame that lives only while its body is compiled.
#[derive(Clone, Copy)]
enum Scope<'a> {
    Root,
    Bound {
        name: &'a str,
        slot: usize,
        ty: &'a ValueType,
        parent: &'a Scope<'a>,
    },
}

impl<'a> Scope<'a> {
    fn lookup(&self, name: &str) -> Option<(usize, &'a ValueType)> {
        match *self {
            Scope::Root => None,
            Scope::Bound {
                name: bound,
                slot,
                ty,
                parent,
            } => {
                if bound == name {
                    Some((slot, ty))
                } else {
                    parent.lookup(name)
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            Scope::Root => 0,
            Scope::Bound { slot, .. } => slot + 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SequenceOperator {
    Where,
    Select,
    OrderBy,
    OrderByDescending,
    Take,
    Skip,
    First,
    FirstOrDefault,
    Any,
    Count,
}

impl SequenceOperator {
    fn parse(name: &str) -> Option<Self> {
        let op = match name.to_ascii_lowercase().as_str() {
            "where" => SequenceOperator::Where,
            "select" => SequenceOperator::Select,
            "orderby" => SequenceOperator::OrderBy,
            "orderbydescending" => SequenceOperator::OrderByDescending,
            "take" => SequenceOperator::Take,
            "skip" => SequenceOperator::Skip,
            "first" => SequenceOperator::First,
            "firstordefault" => SequenceOperator::FirstOrDefault,
            "any" => SequenceOperator::Any,
            "count" => SequenceOperator::Count,
            _ => return None,
        };
        Some(op)
    }

    fn name(&self) -> &'static str {
        match self {
            SequenceOperator::Where => "Where",
            SequenceOperator::Select => "Select",
            SequenceOperator::OrderBy => "OrderBy",
            SequenceOperator::OrderByDescending => "OrderByDescending",
            SequenceOperator::Take => "Take",
            SequenceOperator::Skip => "Skip",
            SequenceOperator::First => "First",
            SequenceOperator::FirstOrDefault => "FirstOrDefault",
            SequenceOperator::Any => "Any",
            SequenceOperator::Count => "Count",
        }
    }
}

struct Compiler<'r> {
    root: &'r RootSource,
}

impl Compiler<'_> {
    /// `element` is the element type of the innermost sequence operator whose
    /// arguments are being compiled, if any.
    fn compile(
        &self,
        node: &Node,
        scope: &Scope<'_>,
        element: Option<&ValueType>,
    ) -> Result<Plan, QueryError> {
        match node {
            Node::Identifier(name) => self.compile_identifier(name, scope),
            Node::StringLiteral(value) => Ok(Plan::Constant(Value::Text(value.clone()))),
            Node::NumberLiteral(value) => Ok(Plan::Constant(Value::Int(*value))),
            Node::MemberAccess { target, member } => {
                let target = self.compile_operand(target, scope, element, "as a member target")?;
                compile_member(target, member)
            }
            Node::MethodCall {
                target,
                method,
                arguments,
            } => {
                let target = self.compile_operand(target, scope, element, "as a method target")?;
                match target.value_type() {
                    ValueType::List(item) => {
                        self.compile_sequence_call(target, *item, method, arguments, scope)
                    }
                    _ => self.compile_instance_call(target, method, arguments, scope, element),
                }
            }
            Node::Lambda { parameter, body } => self
                .compile_lambda(parameter, body, scope, element)
                .map(Plan::Lambda),
            Node::Binary { left, op, right } => {
                self.compile_binary(left, *op, right, scope, element)
            }
        }
    }

    /// Compile a node that must produce a value, not a function.
    fn compile_operand(
        &self,
        node: &Node,
        scope: &Scope<'_>,
        element: Option<&ValueType>,
        context: &str,
    ) -> Result<Plan, QueryError> {
        if let Node::Lambda { .. } = node {
            return Err(QueryError::unsupported_node("lambda", context));
        }
        self.compile(node, scope, element)
    }

    fn compile_identifier(&self, name: &str, scope: &Scope<'_>) -> Result<Plan, QueryError> {
        if let Some((slot, ty)) = scope.lookup(name) {
            return Ok(Plan::Parameter {
                name: name.to_string(),
                slot,
                ty: ty.clone(),
            });
        }
        if name == self.root.name() {
            return Ok(Plan::Constant(Value::List(self.root.collection().clone())));
        }
        Err(QueryError::UnknownIdentifier(name.to_string()))
    }

    fn compile_lambda(
        &self,
        parameter: &str,
        body: &Node,
        scope: &Scope<'_>,
        element: Option<&ValueType>,
    ) -> Result<Lambda, QueryError> {
        let parameter_type = element
            .cloned()
            .unwrap_or_else(|| self.root.element_type().clone());
        let slot = scope.depth();
        let inner = Scope::Bound {
            name: parameter,
            slot,
            ty: &parameter_type,
            parent: scope,
        };
        let body = self.compile_operand(body, &inner, element, "as the body of a lambda")?;
        Ok(Lambda {
            parameter: parameter.to_string(),
            slot,
            parameter_type,
            body: Box::new(body),
        })
    }

    fn compile_binary(
        &self,
        left: &Node,
        op: BinaryOperator,
        right: &Node,
        scope: &Scope<'_>,
        element: Option<&ValueType>,
    ) -> Result<Plan, QueryError> {
        let context = format!("as an operand of '{}'", op);
        let left = self.compile_operand(left, scope, element, &context)?;
        let right = self.compile_operand(right, scope, element, &context)?;

        let compare = match classify(op) {
            Operator::Compare(compare) => compare,
            Operator::Logical(logical) => {
                let (lt, rt) = (left.value_type(), right.value_type());
                if lt != ValueType::Bool || rt != ValueType::Bool {
                    return Err(unsupported_operator(op, &lt, &rt));
                }
                return Ok(Plan::Logical {
                    left: Box::new(left),
                    op: logical,
                    right: Box::new(right),
                });
            }
        };
        let (left, right) = widen(left, right);
        let (lt, rt) = (left.value_type(), right.value_type());
        let supported = if lt == ValueType::Null || rt == ValueType::Null {
            compare.is_equality()
        } else if lt != rt {
            false
        } else {
            match lt {
                ValueType::Int | ValueType::Long | ValueType::Timestamp => true,
                ValueType::Text | ValueType::Bool => compare.is_equality(),
                _ => false,
            }
        };
        if !supported {
            return Err(unsupported_operator(op, &lt, &rt));
        }
        Ok(Plan::Compare {
            left: Box::new(left),
            op: compare,
            right: Box::new(right),
        })
    }

    fn compile_instance_call(
        &self,
        target: Plan,
        method: &str,
        arguments: &[Node],
        scope: &Scope<'_>,
        element: Option<&ValueType>,
    ) -> Result<Plan, QueryError> {
        let target_type = target.value_type();
        let args = arguments
            .iter()
            .map(|arg| self.compile(arg, scope, element))
            .collect::<Result<Vec<_>, _>>()?;

        let candidates = target_type
            .type_info()
            .map(|info| info.find_methods(method, args.len()))
            .unwrap_or_default();
        if candidates.is_empty() {
            return Err(QueryError::method_not_found(method, &target_type));
        }

        let arg_types: Vec<ValueType> = args.iter().map(Plan::value_type).collect();
        let chosen = candidates
            .iter()
            .find(|m| m.params == arg_types)
            .or_else(|| {
                candidates.iter().find(|m| {
                    m.params
                        .iter()
                        .zip(&arg_types)
                        .all(|(param, arg)| accepts(param, arg))
                })
            })
            .copied();
        let Some(chosen) = chosen else {
            let first = candidates[0];
            return Err(QueryError::argument_shape(
                first.name,
                format!("arguments matching {}", first),
            ));
        };

        Ok(Plan::Invoke {
            target: Box::new(target),
            method: chosen,
            args: coerce_arguments(args, chosen),
        })
    }

    fn compile_sequence_call(
        &self,
        source: Plan,
        element: ValueType,
        method: &str,
        arguments: &[Node],
        scope: &Scope<'_>,
    ) -> Result<Plan, QueryError> {
        let source_type = ValueType::list_of(element.clone());
        let Some(operator) = SequenceOperator::parse(method) else {
            return Err(QueryError::method_not_found(method, &source_type));
        };
        let name = operator.name();
        let predicate_shape = format!("a predicate `{} => Bool`", element);

        let (op, ty) = match operator {
            SequenceOperator::Where => {
                let arg = single_argument(name, arguments, &predicate_shape)?;
                let predicate = self.predicate(name, arg, scope, &element, &predicate_shape)?;
                (SequenceOp::Where(predicate), source_type)
            }
            SequenceOperator::Select => {
                let shape = format!("a selector lambda `{} => R`", element);
                let arg = single_argument(name, arguments, &shape)?;
                let selector = self.lambda_argument(name, arg, scope, &element, &shape)?;
                let ty = ValueType::list_of(selector.result_type());
                (SequenceOp::Select(selector), ty)
            }
            SequenceOperator::OrderBy | SequenceOperator::OrderByDescending => {
                let shape = format!("a key selector `{} => K` with an orderable K", element);
                let arg = single_argument(name, arguments, &shape)?;
                let key = self.lambda_argument(name, arg, scope, &element, &shape)?;
                if !key.result_type().is_orderable() {
                    return Err(QueryError::argument_shape(name, shape));
                }
                let descending = operator == SequenceOperator::OrderByDescending;
                (SequenceOp::OrderBy { key, descending }, source_type)
            }
            SequenceOperator::Take | SequenceOperator::Skip => {
                let arg = single_argument(name, arguments, "a single integer count")?;
                let count = Box::new(self.count(name, arg, scope, &element)?);
                let op = if operator == SequenceOperator::Take {
                    SequenceOp::Take(count)
                } else {
                    SequenceOp::Skip(count)
                };
                (op, source_type)
            }
            SequenceOperator::First
            | SequenceOperator::FirstOrDefault
            | SequenceOperator::Any
            | SequenceOperator::Count => {
                let shape = format!("no arguments or {}", predicate_shape);
                let predicate = match optional_argument(name, arguments, &shape)? {
                    Some(arg) => Some(self.predicate(name, arg, scope, &element, &shape)?),
                    None => None,
                };
                match operator {
                    SequenceOperator::First => (SequenceOp::First(predicate), element),
                    SequenceOperator::FirstOrDefault => {
                        (SequenceOp::FirstOrDefault(predicate), element)
                    }
                    SequenceOperator::Any => (SequenceOp::Any(predicate), ValueType::Bool),
                    _ => (SequenceOp::Count(predicate), ValueType::Int),
                }
            }
        };

        Ok(Plan::Sequence {
            source: Box::new(source),
            op,
            ty,
        })
    }

    fn lambda_argument(
        &self,
        operator: &str,
        arg: &Node,
        scope: &Scope<'_>,
        element: &ValueType,
        shape: &str,
    ) -> Result<Lambda, QueryError> {
        match arg {
            Node::Lambda { parameter, body } => {
                self.compile_lambda(parameter, body, scope, Some(element))
            }
            _ => Err(QueryError::argument_shape(operator, shape)),
        }
    }

    fn predicate(
        &self,
        operator: &str,
        arg: &Node,
        scope: &Scope<'_>,
        element: &ValueType,
        shape: &str,
    ) -> Result<Lambda, QueryError> {
        let lambda = self.lambda_argument(operator, arg, scope, element, shape)?;
        if lambda.result_type() != ValueType::Bool {
            return Err(QueryError::argument_shape(operator, shape));
        }
        Ok(lambda)
    }

    fn count(
        &self,
        operator: &str,
        arg: &Node,
        scope: &Scope<'_>,
        element: &ValueType,
    ) -> Result<Plan, QueryError> {
        let shape = "a single integer count";
        if let Node::Lambda { .. } = arg {
            return Err(QueryError::argument_shape(operator, shape));
        }
        let count = self.compile(arg, scope, Some(element))?;
        match count.value_type() {
            ValueType::Int => Ok(count),
            ValueType::Long => Ok(count.convert(ValueType::Int)),
            _ => Err(QueryError::argument_shape(operator, shape)),
        }
    }
}

fn compile_member(target: Plan, member: &str) -> Result<Plan, QueryError> {
    let ty = target.value_type();
    let info = ty
        .type_info()
        .and_then(|info| info.find_member(member))
        .ok_or_else(|| QueryError::member_not_found(member, &ty))?;
    Ok(Plan::Member {
        target: Box::new(target),
        member: info,
    })
}

fn single_argument<'n>(
    operator: &str,
    arguments: &'n [Node],
    shape: &str,
) -> Result<&'n Node, QueryError> {
    match arguments {
        [arg] => Ok(arg),
        _ => Err(QueryError::argument_shape(operator, shape)),
    }
}

fn optional_argument<'n>(
    operator: &str,
    arguments: &'n [Node],
    shape: &str,
) -> Result<Option<&'n Node>, QueryError> {
    match arguments {
        [] => Ok(None),
        [arg] => Ok(Some(arg)),
        _ => Err(QueryError::argument_shape(operator, shape)),
    }
}

/// Whether an argument of type `arg` can be passed for `param`, allowing
/// `Int` to widen to `Long`.
fn accepts(param: &ValueType, arg: &ValueType) -> bool {
    param == arg
        || (*param == ValueType::Long && *arg == ValueType::Int)
        || *arg == ValueType::Null
}

fn coerce_arguments(args: Vec<Plan>, method: &MethodInfo) -> Vec<Plan> {
    args.into_iter()
        .zip(&method.params)
        .map(|(arg, param)| {
            if param.is_numeric() && arg.value_type().is_numeric() {
                arg.convert(param.clone())
            } else {
                arg
            }
        })
        .collect()
}

/// Widen the narrower side when one operand is `Int` and the other `Long`.
fn widen(left: Plan, right: Plan) -> (Plan, Plan) {
    match (left.value_type(), right.value_type()) {
        (ValueType::Int, ValueType::Long) => (left.convert(ValueType::Long), right),
        (ValueType::Long, ValueType::Int) => (left, right.convert(ValueType::Long)),
        _ => (left, right),
    }
}

enum Operator {
    Compare(CompareOp),
    Logical(LogicalOp),
}

fn classify(op: BinaryOperator) -> Operator {
    match op {
        BinaryOperator::Eq => Operator::Compare(CompareOp::Eq),
        BinaryOperator::NotEq => Operator::Compare(CompareOp::NotEq),
        BinaryOperator::Gt => Operator::Compare(CompareOp::Gt),
        BinaryOperator::Lt => Operator::Compare(CompareOp::Lt),
        BinaryOperator::GtEq => Operator::Compare(CompareOp::GtEq),
        BinaryOperator::LtEq => Operator::Compare(CompareOp::LtEq),
        BinaryOperator::And => Operator::Logical(LogicalOp::And),
        BinaryOperator::Or => Operator::Logical(LogicalOp::Or),
    }
}

fn unsupported_operator(op: BinaryOperator, left: &ValueType, right: &ValueType) -> QueryError {
    QueryError::UnsupportedOperator {
        operator: op.symbol().to_string(),
        left: left.to_string(),
        right: right.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_query;
    use std::any::Any;
    use std::sync::OnceLock;

    use crate::engine::schema::{field, TypeInfo};
    use crate::engine::value::{Record, Sequence};
    use crate::model::{commit_type, file_change_type, fixtures};

    fn compile_text(query: &str) -> Result<Plan, QueryError> {
        compile(&parse_query(query)?, &fixtures::root())
    }

    #[test]
    fn test_root_identifier_is_constant_sequence() {
        let plan = compile_text("Commits").unwrap();
        assert!(matches!(plan, Plan::Constant(Value::List(_))));
        assert_eq!(
            plan.value_type(),
            ValueType::list_of(ValueType::Record(commit_type()))
        );
    }

    #[test]
    fn test_root_name_is_case_sensitive() {
        let err = compile_text("commits.Count()").unwrap_err();
        assert!(matches!(err, QueryError::UnknownIdentifier(name) if name == "commits"));
    }

    #[test]
    fn test_result_types() {
        let cases = [
            ("Commits.Count()", ValueType::Int),
            ("Commits.Any(c => c.Diff.FilesChanged > 2)", ValueType::Bool),
            ("Commits.First()", ValueType::Record(commit_type())),
            (
                "Commits.Select(c => c.Sha)",
                ValueType::list_of(ValueType::Text),
            ),
            (
                "Commits.Select(c => c.Diff.Files)",
                ValueType::list_of(ValueType::list_of(ValueType::Record(file_change_type()))),
            ),
            ("Commits.Count", ValueType::Int),
            ("Commits.First().AuthorWhen.Year", ValueType::Int),
        ];
        for (query, expected) in cases {
            assert_eq!(compile_text(query).unwrap().value_type(), expected, "{}", query);
        }
    }

    #[test]
    fn test_names_resolve_case_insensitively() {
        assert!(compile_text("Commits.where(c => c.message.contains(\"x\")).COUNT()").is_ok());
    }

    #[test]
    fn test_nested_lambda_binds_inner_element_type() {
        assert!(compile_text(
            "Commits.Where(c => c.Diff.Files.Any(f => f.Path.EndsWith(\".rs\")))"
        )
        .is_ok());

        let err = compile_text("Commits.Where(c => c.Diff.Files.Any(f => f.AuthorName == \"x\"))")
            .unwrap_err();
        match err {
            QueryError::MemberNotFound { member, type_name } => {
                assert_eq!(member, "AuthorName");
                assert_eq!(type_name, "FileChange");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_outer_parameter_visible_in_nested_lambda() {
        assert!(compile_text(
            "Commits.Where(c => c.Diff.Files.Any(f => f.Path == c.Sha))"
        )
        .is_ok());
    }

    #[test]
    fn test_lambda_parameter_does_not_leak_to_siblings() {
        let err = compile_text("Commits.Where(c => c.Diff.FilesChanged > 1).Select(x => c.Sha)")
            .unwrap_err();
        assert!(matches!(err, QueryError::UnknownIdentifier(name) if name == "c"));
    }

    #[test]
    fn test_unknown_sequence_operator() {
        let err = compile_text("Commits.Foo()").unwrap_err();
        match err {
            QueryError::MethodNotFound { method, type_name } => {
                assert_eq!(method, "Foo");
                assert_eq!(type_name, "Sequence<CommitInfo>");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_instance_method() {
        let err = compile_text("Commits.Where(c => c.Message.Shout())").unwrap_err();
        assert!(matches!(err, QueryError::MethodNotFound { .. }));
        let err = compile_text("Commits.Where(c => c.Message.Contains(\"a\", \"b\"))").unwrap_err();
        assert!(matches!(err, QueryError::MethodNotFound { .. }));
    }

    #[test]
    fn test_method_argument_type_mismatch() {
        let err = compile_text("Commits.Where(c => c.Message.Contains(5))").unwrap_err();
        assert!(
            matches!(err, QueryError::ArgumentShape { ref operator, .. } if operator == "Contains")
        );
    }

    #[test]
    fn test_unknown_member() {
        let err = compile_text("Commits.Where(c => c.Nope == 1)").unwrap_err();
        assert!(
            matches!(err, QueryError::MemberNotFound { ref type_name, .. } if type_name == "CommitInfo")
        );
    }

    #[test]
    fn test_argument_shapes() {
        for query in [
            "Commits.Where(5)",
            "Commits.Where()",
            "Commits.Where(c => c.Sha)",
            "Commits.Select(1)",
            "Commits.Take(c => 1)",
            "Commits.Take(\"3\")",
            "Commits.Take(1, 2)",
            "Commits.Skip()",
            "Commits.OrderBy(c => c.Diff)",
            "Commits.First(c => c.Sha, c => c.Sha)",
            "Commits.Count(c => c.Diff.FilesChanged)",
        ] {
            let err = compile_text(query).unwrap_err();
            assert!(
                matches!(err, QueryError::ArgumentShape { .. }),
                "{}: {:?}",
                query,
                err
            );
        }
    }

    #[test]
    fn test_operator_support() {
        assert!(compile_text("Commits.Where(c => c.AuthorWhen > c.CommitterWhen)").is_ok());
        assert!(compile_text("Commits.Where(c => c.Sha != \"abc\")").is_ok());
        assert!(compile_text("Commits.Where(c => c.Diff.Files.Any(f => f.IsBinary == f.IsBinary))").is_ok());

        for query in [
            "Commits.Where(c => c.Sha > \"abc\")",
            "Commits.Where(c => c.Sha == 1)",
            "Commits.Where(c => c.Diff == c.Diff)",
            "Commits.Where(c => c.Sha && c.Sha)",
        ] {
            let err = compile_text(query).unwrap_err();
            assert!(
                matches!(err, QueryError::UnsupportedOperator { .. }),
                "{}: {:?}",
                query,
                err
            );
        }
    }

    #[test]
    fn test_logical_operators_compile() {
        let plan = compile_text(
            "Commits.Where(c => c.AuthorName == \"Alice\" || c.AuthorName == \"Bob\" && c.Diff.FilesChanged > 1)",
        )
        .unwrap();
        assert!(matches!(plan, Plan::Sequence { op: SequenceOp::Where(_), .. }));
    }

    #[test]
    fn test_lambda_outside_argument_position() {
        let err = compile_text("c => c.Sha").unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedNodeKind { .. }));

        let node = Node::binary(
            Node::lambda("c", Node::identifier("c")),
            BinaryOperator::Eq,
            Node::NumberLiteral(1),
        );
        let err = compile(&node, &fixtures::root()).unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedNodeKind { .. }));
    }

    #[test]
    fn test_lambda_slots_follow_nesting_depth() {
        let plan = compile_text("Commits.Where(c => c.Diff.Files.Any(f => f.IsBinary))").unwrap();
        let Plan::Sequence {
            op: SequenceOp::Where(outer),
            ..
        } = plan
        else {
            panic!("expected Where");
        };
        assert_eq!(outer.slot, 0);
        let Plan::Sequence {
            op: SequenceOp::Any(Some(inner)),
            ..
        } = *outer.body
        else {
            panic!("expected Any");
        };
        assert_eq!(inner.slot, 1);
        assert_eq!(inner.parameter_type, ValueType::Record(file_change_type()));
    }

    #[derive(Debug)]
    struct Blob {
        size: i64,
    }

    impl Record for Blob {
        fn type_info(&self) -> &'static TypeInfo {
            blob_type()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn blob_type() -> &'static TypeInfo {
        static INFO: OnceLock<TypeInfo> = OnceLock::new();
        INFO.get_or_init(|| {
            TypeInfo::new("Blob").member("Size", ValueType::Long, |v| {
                field(v, |b: &Blob| Value::Long(b.size))
            })
        })
    }

    fn blobs() -> RootSource {
        let items = [1, 3, 5].into_iter().map(|size| Blob { size }).collect();
        RootSource::new("Items", Sequence::of_records(blob_type(), items))
    }

    fn compile_blobs(query: &str) -> Result<Plan, QueryError> {
        compile(&parse_query(query)?, &blobs())
    }

    fn where_comparison(plan: Plan) -> (Plan, Plan) {
        let Plan::Sequence {
            op: SequenceOp::Where(lambda),
            ..
        } = plan
        else {
            panic!("expected Where");
        };
        let Plan::Compare { left, right, .. } = *lambda.body else {
            panic!("expected comparison");
        };
        (*left, *right)
    }

    #[test]
    fn test_int_operand_widens_to_long() {
        let plan = compile_blobs("Items.Where(i => i.Size > 2)").unwrap();
        let (left, right) = where_comparison(plan);
        assert_eq!(left.value_type(), ValueType::Long);
        assert!(matches!(right, Plan::Convert { to: ValueType::Long, .. }));

        let plan = compile_blobs("Items.Where(i => 3 == i.Size)").unwrap();
        let (left, right) = where_comparison(plan);
        assert!(matches!(left, Plan::Convert { to: ValueType::Long, .. }));
        assert!(matches!(right, Plan::Member { .. }));

        let count = |query: &str| crate::engine::run_query(query, &blobs()).unwrap().as_i64();
        assert_eq!(count("Items.Where(i => i.Size > 2).Count()"), Some(2));
        assert_eq!(count("Items.Where(i => 3 == i.Size).Count()"), Some(1));
    }

    #[test]
    fn test_long_count_narrows_to_int() {
        let plan = compile_blobs("Items.Take(Items.First(i => i.Size == 3).Size)").unwrap();
        let Plan::Sequence {
            op: SequenceOp::Take(count),
            ..
        } = plan
        else {
            panic!("expected Take");
        };
        assert!(matches!(*count, Plan::Convert { to: ValueType::Int, .. }));

        let taken = crate::engine::run_query(
            "Items.Take(Items.First(i => i.Size == 3).Size).Count()",
            &blobs(),
        )
        .unwrap();
        assert_eq!(taken.as_i64(), Some(3));
    }

    #[test]
    fn test_long_against_text_is_unsupported() {
        let err = compile_blobs("Items.Where(i => i.Size == \"x\")").unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedOperator { .. }));
    }
}
