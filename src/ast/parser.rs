/// Query text → AST parser.
///
/// A hand-written recursive-descent parser over the tokens produced by
/// [`super::lexer`]. The grammar is small enough that each production maps
/// to one method:
///
/// ```text
/// Expression           := Lambda | LogicalExpression
/// Lambda               := ( '(' Identifier ')' | Identifier ) '=>' Expression
/// LogicalExpression    := AndExpression ( '||' AndExpression )*
/// AndExpression        := ComparisonExpression ( '&&' ComparisonExpression )*
/// ComparisonExpression := ChainedExpression [ ComparisonOp ChainedExpression ]
/// ChainedExpression    := Primary Suffix*
/// Primary              := Identifier | StringLiteral | NumberLiteral
/// Suffix               := '.' Identifier [ '(' ArgList? ')' ]
/// ArgList              := Expression ( ',' Expression )*
/// ```
///
/// The whole input must be consumed. The first error aborts parsing; there is
/// no recovery.
use super::error::ParseError;
use super::lexer::{tokenize, Token, TokenKind};
use super::types::{BinaryOperator, Node};

/// Parse a query string into an AST.
pub fn parse_query(input: &str) -> Result<Node, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(tokens);
    let node = parser.expression()?;
    parser.expect_end()?;
    Ok(node)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    /// The lexer always terminates the list with `Eof`, so lookahead past the
    /// end keeps returning it.
    fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError::new(token.position, expected, token.kind.to_string())
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error(&kind.to_string()))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match &self.peek().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("identifier")),
        }
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        if self.check(&TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.error("'.', operator or end of input"))
        }
    }

    fn expression(&mut self) -> Result<Node, ParseError> {
        if self.at_lambda() {
            self.lambda()
        } else {
            self.logical_or()
        }
    }

    /// `x =>` or `(x) =>`. The primary grammar has no parenthesised
    /// expressions, so a leading `(` can only open a lambda parameter.
    fn at_lambda(&self) -> bool {
        match (&self.peek_at(0).kind, &self.peek_at(1).kind) {
            (TokenKind::Identifier(_), TokenKind::Arrow) => true,
            (TokenKind::LParen, _) => true,
            _ => false,
        }
    }

    fn lambda(&mut self) -> Result<Node, ParseError> {
        let parameter = if self.eat(&TokenKind::LParen) {
            let name = self.expect_identifier()?;
            self.expect(TokenKind::RParen)?;
            name
        } else {
            self.expect_identifier()?
        };
        self.expect(TokenKind::Arrow)?;
        let body = self.expression()?;
        Ok(Node::lambda(parameter, body))
    }

    fn logical_or(&mut self) -> Result<Node, ParseError> {
        let mut left = self.logical_and()?;
        while self.eat(&TokenKind::OrOr) {
            let right = self.logical_and()?;
            left = Node::binary(left, BinaryOperator::Or, right);
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Node, ParseError> {
        let mut left = self.comparison()?;
        while self.eat(&TokenKind::AndAnd) {
            let right = self.comparison()?;
            left = Node::binary(left, BinaryOperator::And, right);
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Node, ParseError> {
        let left = self.chained()?;
        let op = match self.peek().kind {
            TokenKind::Eq => BinaryOperator::Eq,
            TokenKind::NotEq => BinaryOperator::NotEq,
            TokenKind::Gt => BinaryOperator::Gt,
            TokenKind::Lt => BinaryOperator::Lt,
            TokenKind::GtEq => BinaryOperator::GtEq,
            TokenKind::LtEq => BinaryOperator::LtEq,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.chained()?;
        Ok(Node::binary(left, op, right))
    }

    fn chained(&mut self) -> Result<Node, ParseError> {
        let mut node = self.primary()?;
        while self.eat(&TokenKind::Dot) {
            let name = self.expect_identifier()?;
            if self.eat(&TokenKind::LParen) {
                let arguments = self.arguments()?;
                node = Node::call(node, name, arguments);
            } else {
                node = Node::member(node, name);
            }
        }
        Ok(node)
    }

    fn primary(&mut self) -> Result<Node, ParseError> {
        let node = match &self.peek().kind {
            TokenKind::Identifier(name) => Node::Identifier(name.clone()),
            TokenKind::String(value) => Node::StringLiteral(value.clone()),
            TokenKind::Number(value) => Node::NumberLiteral(*value),
            _ => return Err(self.error("identifier, string or number")),
        };
        self.advance();
        Ok(node)
    }

    /// Arguments after the opening `(`, through the closing `)`.
    fn arguments(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut arguments = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.expression()?);
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            if self.eat(&TokenKind::RParen) {
                return Ok(arguments);
            }
            return Err(self.error("',' or ')'"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Node {
        parse_query(input).unwrap()
    }

    fn where_lambda(node: &Node) -> (&str, &Node) {
        match node {
            Node::MethodCall { arguments, .. } => match &arguments[0] {
                Node::Lambda { parameter, body } => (parameter.as_str(), body.as_ref()),
                other => panic!("expected lambda, got {:?}", other),
            },
            other => panic!("expected method call, got {:?}", other),
        }
    }

    #[test]
    fn test_identifier() {
        assert_eq!(parse("Commits"), Node::identifier("Commits"));
        assert_eq!(parse("  Commits  "), Node::identifier("Commits"));
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse("\"hello world\""), Node::string("hello world"));
        assert_eq!(parse("'hello'"), Node::string("hello"));
        assert_eq!(parse("42"), Node::NumberLiteral(42));
        assert_eq!(parse("0"), Node::NumberLiteral(0));
    }

    #[test]
    fn test_member_access_chain() {
        assert_eq!(
            parse("Commits.First().Diff.Files"),
            Node::member(
                Node::member(
                    Node::call(Node::identifier("Commits"), "First", vec![]),
                    "Diff"
                ),
                "Files"
            )
        );
    }

    #[test]
    fn test_method_call_arguments_keep_order() {
        assert_eq!(
            parse("x.Between(1, \"a\", y)"),
            Node::call(
                Node::identifier("x"),
                "Between",
                vec![
                    Node::NumberLiteral(1),
                    Node::string("a"),
                    Node::identifier("y")
                ]
            )
        );
    }

    #[test]
    fn test_lambda_forms() {
        let expected = Node::call(
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
        assert_eq!(parse("Commits.Where(c => c.Message.Contains(\"fix\"))"), expected);
        assert_eq!(parse("Commits.Where((c) => c.Message.Contains('fix'))"), expected);
        assert_eq!(
            parse("Commits.Where( c=>c.Message.Contains( \"fix\" ) )"),
            expected
        );
    }

    #[test]
    fn test_comparison_in_lambda_body() {
        let ast = parse("Commits.Where(c => c.Diff.FilesChanged > 2)");
        let (param, body) = where_lambda(&ast);
        assert_eq!(param, "c");
        assert_eq!(
            *body,
            Node::binary(
                Node::member(Node::member(Node::identifier("c"), "Diff"), "FilesChanged"),
                BinaryOperator::Gt,
                Node::NumberLiteral(2)
            )
        );
    }

    #[test]
    fn test_all_comparison_operators() {
        for (text, op) in [
            ("==", BinaryOperator::Eq),
            ("!=", BinaryOperator::NotEq),
            (">", BinaryOperator::Gt),
            ("<", BinaryOperator::Lt),
            (">=", BinaryOperator::GtEq),
            ("<=", BinaryOperator::LtEq),
        ] {
            let ast = parse(&format!("Commits.Where(c => c.Diff.FilesChanged {} 1)", text));
            match where_lambda(&ast).1 {
                Node::Binary { op: parsed, .. } => assert_eq!(*parsed, op),
                other => panic!("expected binary, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_only_one_comparison_per_expression() {
        let err = parse_query("Commits.Where(c => 1 < 2 < 3)").unwrap_err();
        assert_eq!(err.expected, "',' or ')'");
        assert_eq!(err.found, "'<'");
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let ast = parse("Commits.Where(c => a == 1 || b == 2 && d == 3)");
        let cmp = |name: &str, n: i32| {
            Node::binary(Node::identifier(name), BinaryOperator::Eq, Node::NumberLiteral(n))
        };
        assert_eq!(
            *where_lambda(&ast).1,
            Node::binary(
                cmp("a", 1),
                BinaryOperator::Or,
                Node::binary(cmp("b", 2), BinaryOperator::And, cmp("d", 3))
            )
        );
    }

    #[test]
    fn test_logical_left_associative() {
        let ast = parse("a && b && d");
        assert_eq!(
            ast,
            Node::binary(
                Node::binary(
                    Node::identifier("a"),
                    BinaryOperator::And,
                    Node::identifier("b")
                ),
                BinaryOperator::And,
                Node::identifier("d")
            )
        );
    }

    #[test]
    fn test_nested_lambda() {
        let ast = parse("Commits.Where(c => c.Diff.Files.Any(f => f.Path.EndsWith(\".rs\")))");
        let (_, body) = where_lambda(&ast);
        let (inner_param, _) = where_lambda(body);
        assert_eq!(inner_param, "f");
    }

    #[test]
    fn test_empty_argument_list() {
        assert_eq!(
            parse("Commits.First()"),
            Node::call(Node::identifier("Commits"), "First", vec![])
        );
    }

    #[test]
    fn test_chained_methods_fold_left() {
        let ast = parse("Commits.Skip(5).Take(10)");
        assert_eq!(
            ast,
            Node::call(
                Node::call(
                    Node::identifier("Commits"),
                    "Skip",
                    vec![Node::NumberLiteral(5)]
                ),
                "Take",
                vec![Node::NumberLiteral(10)]
            )
        );
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let query = "Commits.Where(c => c.AuthorName.Contains(\"Alice\")).OrderBy(c => c.AuthorWhen).Take(3)";
        assert_eq!(parse_query(query), parse_query(query));
    }

    #[test]
    fn test_trailing_comma_rejected() {
        let err = parse_query("Commits.Take(1,)").unwrap_err();
        assert_eq!(err.position, 15);
        assert_eq!(err.expected, "identifier, string or number");
    }

    #[test]
    fn test_missing_close_paren() {
        let err = parse_query("Commits.Take(1").unwrap_err();
        assert_eq!(err.position, 14);
        assert_eq!(err.found, "end of input");
    }

    #[test]
    fn test_trailing_input_rejected() {
        let err = parse_query("Commits Commits").unwrap_err();
        assert_eq!(err.position, 8);
        assert_eq!(err.expected, "'.', operator or end of input");
    }

    #[test]
    fn test_dot_requires_identifier() {
        let err = parse_query("Commits.").unwrap_err();
        assert_eq!(err.expected, "identifier");
        let err = parse_query("Commits.5").unwrap_err();
        assert_eq!(err.found, "number 5");
    }

    #[test]
    fn test_empty_input() {
        let err = parse_query("   ").unwrap_err();
        assert_eq!(err.position, 3);
        assert_eq!(err.found, "end of input");
    }

    #[test]
    fn test_negative_numbers_not_supported() {
        assert!(parse_query("Commits.Take(-1)").is_err());
    }

    #[test]
    fn test_lambda_missing_arrow() {
        let err = parse_query("Commits.Where((c) c.Sha)").unwrap_err();
        assert_eq!(err.expected, "'=>'");
    }
}
