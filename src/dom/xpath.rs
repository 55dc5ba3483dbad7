//! Path queries over a parsed [`Document`].
//!
//! Supports the XPath 1.0 subset scraping scripts actually use: absolute and
//! relative location paths, `//`, `.`, `..`, `@attr`, `*`, `text()`, `node()`,
//! the common axes, positional and boolean predicates, `and`/`or`, comparisons
//! and a handful of core functions (`contains`, `starts-with`,
//! `normalize-space`, `not`, `position`, `last`, `count`, `string`, `concat`,
//! `string-length`, `name`, `local-name`, `true`, `false`).
//!
//! Results always come back in document order without duplicates.

use crate::dom::document::Document;
use crate::errors::{AgentError, Result};
use ego_tree::{NodeId, NodeRef};
use regex::Regex;
use scraper::{ElementRef, Node};
use std::collections::HashMap;
use std::sync::OnceLock;

/// A parsed path query, reusable across documents.
#[derive(Debug, Clone)]
pub struct XPath {
    source: String,
    path: LocationPath,
}

impl XPath {
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            source,
        };
        let path = parser.parse_location_path()?;
        if parser.pos != parser.tokens.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(Self {
            source: source.to_string(),
            path,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Matching elements in document order. Non-element results (text or
    /// attribute nodes) are dropped.
    pub fn select<'a>(&self, document: &'a Document) -> Vec<ElementRef<'a>> {
        let root = document.tree_root();
        let evaluator = Evaluator::new(root);
        evaluator
            .select_path(&self.path, XNode::Tree(root))
            .into_iter()
            .filter_map(|node| match node {
                XNode::Tree(node) => ElementRef::wrap(node),
                XNode::Attr { .. } => None,
            })
            .collect()
    }
}

/// Parse `path` and run it against `document`. An empty result is not an error.
pub fn evaluate<'a>(document: &'a Document, path: &str) -> Result<Vec<ElementRef<'a>>> {
    Ok(XPath::parse(path)?.select(document))
}

// ---------------------------------------------------------------------------
// Lexing

#[derive(Debug, Clone, PartialEq)]
enum Token {
    DoubleSlash,
    Slash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Comma,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Dot,
    DotDot,
    Star,
    ColonColon,
    Literal(String),
    Number(f64),
    Name(String),
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"^\s*(?:(//|::|!=|<=|>=|\.\.|[/\[\]()@,=<>.*])|'([^']*)'|"([^"]*)"|(\d+(?:\.\d+)?)|([A-Za-z_][\w.-]*))"#,
        )
        .expect("token pattern is a valid regex")
    })
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut rest = source.trim_start();

    while !rest.is_empty() {
        let caps = token_pattern().captures(rest).ok_or_else(|| {
            AgentError::InvalidSelector(format!("{}: unexpected input at '{}'", source, rest))
        })?;

        let token = if let Some(symbol) = caps.get(1) {
            match symbol.as_str() {
                "//" => Token::DoubleSlash,
                "/" => Token::Slash,
                "[" => Token::LBracket,
                "]" => Token::RBracket,
                "(" => Token::LParen,
                ")" => Token::RParen,
                "@" => Token::At,
                "," => Token::Comma,
                "=" => Token::Eq,
                "!=" => Token::NotEq,
                "<" => Token::Lt,
                ">" => Token::Gt,
                "<=" => Token::LtEq,
                ">=" => Token::GtEq,
                "." => Token::Dot,
                ".." => Token::DotDot,
                "*" => Token::Star,
                _ => Token::ColonColon,
            }
        } else if let Some(literal) = caps.get(2).or_else(|| caps.get(3)) {
            Token::Literal(literal.as_str().to_string())
        } else if let Some(number) = caps.get(4) {
            Token::Number(number.as_str().parse().unwrap_or(f64::NAN))
        } else if let Some(name) = caps.get(5) {
            Token::Name(name.as_str().to_string())
        } else {
            return Err(AgentError::InvalidSelector(format!(
                "{}: unexpected input at '{}'",
                source, rest
            )));
        };

        tokens.push(token);
        let consumed = caps.get(0).map_or(rest.len(), |m| m.end());
        rest = rest[consumed..].trim_start();
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Syntax tree

#[derive(Debug, Clone)]
struct LocationPath {
    absolute: bool,
    steps: Vec<Step>,
}

#[derive(Debug, Clone)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Expr>,
}

impl Step {
    fn bare(axis: Axis) -> Self {
        Self {
            axis,
            test: NodeTest::AnyNode,
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    SelfAxis,
    Parent,
    Ancestor,
    FollowingSibling,
    PrecedingSibling,
    Attribute,
}

impl Axis {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "child" => Some(Axis::Child),
            "descendant" => Some(Axis::Descendant),
            "descendant-or-self" => Some(Axis::DescendantOrSelf),
            "self" => Some(Axis::SelfAxis),
            "parent" => Some(Axis::Parent),
            "ancestor" => Some(Axis::Ancestor),
            "following-sibling" => Some(Axis::FollowingSibling),
            "preceding-sibling" => Some(Axis::PrecedingSibling),
            "attribute" => Some(Axis::Attribute),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum NodeTest {
    Name(String),
    Wildcard,
    Text,
    AnyNode,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

#[derive(Debug, Clone)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    Literal(String),
    Number(f64),
    Path(LocationPath),
    Call(String, Vec<Expr>),
}

// name, min args, max args
const FUNCTIONS: &[(&str, usize, usize)] = &[
    ("contains", 2, 2),
    ("starts-with", 2, 2),
    ("normalize-space", 0, 1),
    ("not", 1, 1),
    ("position", 0, 0),
    ("last", 0, 0),
    ("count", 1, 1),
    ("string", 0, 1),
    ("concat", 2, usize::MAX),
    ("string-length", 0, 1),
    ("name", 0, 1),
    ("local-name", 0, 1),
    ("true", 0, 0),
    ("false", 0, 0),
];

// ---------------------------------------------------------------------------
// Parsing

struct Parser<'s> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'s str,
}

impl<'s> Parser<'s> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(Token::Name(name)) if name == keyword => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {:?}", token)))
        }
    }

    fn error(&self, message: &str) -> AgentError {
        AgentError::InvalidSelector(format!(
            "{}: {} (at token {})",
            self.source, message, self.pos
        ))
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Dot | Token::DotDot | Token::At | Token::Star | Token::Name(_))
        )
    }

    fn parse_location_path(&mut self) -> Result<LocationPath> {
        let mut steps = Vec::new();
        let absolute = match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                if !self.starts_step() {
                    return Ok(LocationPath {
                        absolute: true,
                        steps,
                    });
                }
                true
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                steps.push(Step::bare(Axis::DescendantOrSelf));
                true
            }
            _ => false,
        };

        steps.push(self.parse_step()?);
        loop {
            if self.eat(&Token::Slash) {
                steps.push(self.parse_step()?);
            } else if self.eat(&Token::DoubleSlash) {
                steps.push(Step::bare(Axis::DescendantOrSelf));
                steps.push(self.parse_step()?);
            } else {
                break;
            }
        }

        Ok(LocationPath { absolute, steps })
    }

    fn parse_step(&mut self) -> Result<Step> {
        if self.eat(&Token::Dot) {
            return Ok(Step::bare(Axis::SelfAxis));
        }
        if self.eat(&Token::DotDot) {
            return Ok(Step::bare(Axis::Parent));
        }

        let named_axis = match (self.peek(), self.peek_at(1)) {
            (Some(Token::Name(name)), Some(Token::ColonColon)) => Some(
                Axis::from_name(name)
                    .ok_or_else(|| self.error(&format!("unknown axis '{}'", name)))?,
            ),
            _ => None,
        };
        let axis = if let Some(axis) = named_axis {
            self.pos += 2;
            axis
        } else if self.eat(&Token::At) {
            Axis::Attribute
        } else {
            Axis::Child
        };

        let test = match self.next() {
            Some(Token::Star) => NodeTest::Wildcard,
            Some(Token::Name(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    let test = match name.as_str() {
                        "text" => NodeTest::Text,
                        "node" => NodeTest::AnyNode,
                        _ => return Err(self.error(&format!("'{}()' is not a node test", name))),
                    };
                    self.expect(&Token::LParen)?;
                    self.expect(&Token::RParen)?;
                    test
                } else {
                    NodeTest::Name(name)
                }
            }
            _ => return Err(self.error("expected a node test")),
        };

        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.parse_expr()?);
            self.expect(&Token::RBracket)?;
        }

        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat_keyword("or") {
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.eat_keyword("and") {
            let rhs = self.parse_equality()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => CompareOp::Eq,
                Some(Token::NotEq) => CompareOp::NotEq,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_relational()?;
            lhs = Expr::Compare(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_primary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => CompareOp::Lt,
                Some(Token::Gt) => CompareOp::Gt,
                Some(Token::LtEq) => CompareOp::LtEq,
                Some(Token::GtEq) => CompareOp::GtEq,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_primary()?;
            lhs = Expr::Compare(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.peek().cloned() {
            Some(Token::Literal(value)) => {
                self.pos += 1;
                Ok(Expr::Literal(value))
            }
            Some(Token::Number(value)) => {
                self.pos += 1;
                Ok(Expr::Number(value))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Some(Token::Name(name))
                if self.peek_at(1) == Some(&Token::LParen) && name != "text" && name != "node" =>
            {
                self.pos += 2;
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.parse_expr()?);
                        if self.eat(&Token::RParen) {
                            break;
                        }
                        self.expect(&Token::Comma)?;
                    }
                }
                let (_, min, max) = FUNCTIONS
                    .iter()
                    .find(|(known, _, _)| *known == name)
                    .ok_or_else(|| self.error(&format!("unknown function '{}'", name)))?;
                if args.len() < *min || args.len() > *max {
                    return Err(self.error(&format!(
                        "wrong number of arguments for '{}()'",
                        name
                    )));
                }
                Ok(Expr::Call(name, args))
            }
            _ => Ok(Expr::Path(self.parse_location_path()?)),
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation

#[derive(Debug, Clone, Copy)]
enum XNode<'a> {
    Tree(NodeRef<'a, Node>),
    Attr {
        owner: NodeRef<'a, Node>,
        index: usize,
        name: &'a str,
        value: &'a str,
    },
}

enum Value<'a> {
    Nodes(Vec<XNode<'a>>),
    Str(String),
    Number(f64),
    Bool(bool),
}

struct Context<'a> {
    node: XNode<'a>,
    position: usize,
    size: usize,
}

struct Evaluator<'a> {
    root: NodeRef<'a, Node>,
    order: HashMap<NodeId, usize>,
}

impl<'a> Evaluator<'a> {
    fn new(root: NodeRef<'a, Node>) -> Self {
        let order = root
            .descendants()
            .enumerate()
            .map(|(index, node)| (node.id(), index))
            .collect();
        Self { root, order }
    }

    fn order_key(&self, node: &XNode<'a>) -> (usize, usize) {
        match node {
            XNode::Tree(n) => (self.order.get(&n.id()).copied().unwrap_or(usize::MAX), 0),
            XNode::Attr { owner, index, .. } => (
                self.order.get(&owner.id()).copied().unwrap_or(usize::MAX),
                index + 1,
            ),
        }
    }

    fn sort_unique(&self, mut nodes: Vec<XNode<'a>>) -> Vec<XNode<'a>> {
        nodes.sort_by_key(|node| self.order_key(node));
        nodes.dedup_by_key(|node| self.order_key(node));
        nodes
    }

    fn select_path(&self, path: &LocationPath, context: XNode<'a>) -> Vec<XNode<'a>> {
        let mut current = if path.absolute {
            vec![XNode::Tree(self.root)]
        } else {
            vec![context]
        };
        for step in &path.steps {
            current = self.apply_step(step, &current);
        }
        current
    }

    fn apply_step(&self, step: &Step, contexts: &[XNode<'a>]) -> Vec<XNode<'a>> {
        let mut selected = Vec::new();
        for context in contexts {
            let mut candidates: Vec<XNode<'a>> = axis_nodes(step.axis, *context)
                .into_iter()
                .filter(|node| matches_test(step, node))
                .collect();

            for predicate in &step.predicates {
                let size = candidates.len();
                candidates = candidates
                    .into_iter()
                    .enumerate()
                    .filter(|(index, node)| {
                        let ctx = Context {
                            node: *node,
                            position: index + 1,
                            size,
                        };
                        match self.eval(predicate, &ctx) {
                            Value::Number(n) => n == ctx.position as f64,
                            other => boolean(&other),
                        }
                    })
                    .map(|(_, node)| node)
                    .collect();
            }

            selected.extend(candidates);
        }
        self.sort_unique(selected)
    }

    fn eval(&self, expr: &Expr, ctx: &Context<'a>) -> Value<'a> {
        match expr {
            Expr::Or(lhs, rhs) => {
                Value::Bool(boolean(&self.eval(lhs, ctx)) || boolean(&self.eval(rhs, ctx)))
            }
            Expr::And(lhs, rhs) => {
                Value::Bool(boolean(&self.eval(lhs, ctx)) && boolean(&self.eval(rhs, ctx)))
            }
            Expr::Compare(op, lhs, rhs) => {
                Value::Bool(compare(*op, &self.eval(lhs, ctx), &self.eval(rhs, ctx)))
            }
            Expr::Literal(value) => Value::Str(value.clone()),
            Expr::Number(value) => Value::Number(*value),
            Expr::Path(path) => Value::Nodes(self.select_path(path, ctx.node)),
            Expr::Call(name, args) => self.call(name, args, ctx),
        }
    }

    fn call(&self, name: &str, args: &[Expr], ctx: &Context<'a>) -> Value<'a> {
        let arg = |index: usize| -> Value<'a> { self.eval(&args[index], ctx) };
        // functions defaulting to the context node when called without arguments
        let subject = || -> Value<'a> {
            if args.is_empty() {
                Value::Nodes(vec![ctx.node])
            } else {
                arg(0)
            }
        };

        match name {
            "contains" => Value::Bool(string(&arg(0)).contains(&string(&arg(1)))),
            "starts-with" => Value::Bool(string(&arg(0)).starts_with(&string(&arg(1)))),
            "normalize-space" => Value::Str(
                string(&subject())
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            "not" => Value::Bool(!boolean(&arg(0))),
            "position" => Value::Number(ctx.position as f64),
            "last" => Value::Number(ctx.size as f64),
            "count" => match arg(0) {
                Value::Nodes(nodes) => Value::Number(nodes.len() as f64),
                _ => Value::Number(0.0),
            },
            "string" => Value::Str(string(&subject())),
            "concat" => Value::Str(args.iter().map(|a| string(&self.eval(a, ctx))).collect()),
            "string-length" => Value::Number(string(&subject()).chars().count() as f64),
            "name" | "local-name" => match subject() {
                Value::Nodes(nodes) => Value::Str(nodes.first().map(node_name).unwrap_or_default()),
                _ => Value::Str(String::new()),
            },
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            // arity and names are checked at parse time
            _ => Value::Bool(false),
        }
    }
}

fn axis_nodes<'a>(axis: Axis, node: XNode<'a>) -> Vec<XNode<'a>> {
    let tree = match node {
        XNode::Tree(tree) => tree,
        XNode::Attr { owner, .. } => {
            return match axis {
                Axis::SelfAxis => vec![node],
                Axis::Parent => vec![XNode::Tree(owner)],
                Axis::Ancestor => std::iter::once(owner)
                    .chain(owner.ancestors())
                    .map(XNode::Tree)
                    .collect(),
                _ => Vec::new(),
            };
        }
    };

    match axis {
        Axis::Child => tree.children().map(XNode::Tree).collect(),
        Axis::Descendant => tree.descendants().skip(1).map(XNode::Tree).collect(),
        Axis::DescendantOrSelf => tree.descendants().map(XNode::Tree).collect(),
        Axis::SelfAxis => vec![node],
        Axis::Parent => tree.parent().map(XNode::Tree).into_iter().collect(),
        Axis::Ancestor => tree.ancestors().map(XNode::Tree).collect(),
        Axis::FollowingSibling => tree.next_siblings().map(XNode::Tree).collect(),
        Axis::PrecedingSibling => tree.prev_siblings().map(XNode::Tree).collect(),
        Axis::Attribute => tree
            .value()
            .as_element()
            .map(|element| {
                element
                    .attrs()
                    .enumerate()
                    .map(|(index, (name, value))| XNode::Attr {
                        owner: tree,
                        index,
                        name,
                        value,
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn matches_test(step: &Step, node: &XNode<'_>) -> bool {
    match (step.axis, &step.test, node) {
        (Axis::Attribute, NodeTest::Name(wanted), XNode::Attr { name, .. }) => {
            name.eq_ignore_ascii_case(wanted)
        }
        (Axis::Attribute, NodeTest::Wildcard | NodeTest::AnyNode, XNode::Attr { .. }) => true,
        (Axis::Attribute, _, _) => false,
        (_, NodeTest::AnyNode, _) => true,
        (_, NodeTest::Text, XNode::Tree(n)) => n.value().is_text(),
        (_, NodeTest::Wildcard, XNode::Tree(n)) => n.value().is_element(),
        (_, NodeTest::Name(wanted), XNode::Tree(n)) => n
            .value()
            .as_element()
            .map_or(false, |element| element.name().eq_ignore_ascii_case(wanted)),
        _ => false,
    }
}

fn node_name(node: &XNode<'_>) -> String {
    match node {
        XNode::Tree(n) => n
            .value()
            .as_element()
            .map(|element| element.name().to_string())
            .unwrap_or_default(),
        XNode::Attr { name, .. } => name.to_string(),
    }
}

fn string_value(node: &XNode<'_>) -> String {
    match node {
        XNode::Tree(n) => match n.value() {
            Node::Text(text) => String::from(&**text),
            Node::Comment(comment) => String::from(&**comment),
            Node::Element(_) | Node::Document | Node::Fragment => n
                .descendants()
                .filter_map(|d| d.value().as_text())
                .map(|text| &**text)
                .collect(),
            _ => String::new(),
        },
        XNode::Attr { value, .. } => value.to_string(),
    }
}

fn string(value: &Value<'_>) -> String {
    match value {
        Value::Str(s) => s.clone(),
        Value::Number(n) if n.fract() == 0.0 && n.is_finite() => format!("{}", *n as i64),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Nodes(nodes) => nodes.first().map(string_value).unwrap_or_default(),
    }
}

fn number(value: &Value<'_>) -> f64 {
    match value {
        Value::Number(n) => *n,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        other => string(other).trim().parse().unwrap_or(f64::NAN),
    }
}

fn boolean(value: &Value<'_>) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::Str(s) => !s.is_empty(),
        Value::Nodes(nodes) => !nodes.is_empty(),
    }
}

fn compare(op: CompareOp, lhs: &Value<'_>, rhs: &Value<'_>) -> bool {
    match (lhs, rhs) {
        (Value::Nodes(left), Value::Nodes(right)) => left.iter().any(|l| {
            let l = Value::Str(string_value(l));
            right
                .iter()
                .any(|r| compare_atoms(op, &l, &Value::Str(string_value(r))))
        }),
        (Value::Nodes(left), Value::Bool(_)) => {
            compare_atoms(op, &Value::Bool(!left.is_empty()), rhs)
        }
        (Value::Bool(_), Value::Nodes(right)) => {
            compare_atoms(op, lhs, &Value::Bool(!right.is_empty()))
        }
        (Value::Nodes(left), other) => left
            .iter()
            .any(|l| compare_atoms(op, &Value::Str(string_value(l)), other)),
        (other, Value::Nodes(right)) => right
            .iter()
            .any(|r| compare_atoms(op, other, &Value::Str(string_value(r)))),
        _ => compare_atoms(op, lhs, rhs),
    }
}

fn compare_atoms(op: CompareOp, lhs: &Value<'_>, rhs: &Value<'_>) -> bool {
    match op {
        CompareOp::Eq | CompareOp::NotEq => {
            let equal = if matches!(lhs, Value::Bool(_)) || matches!(rhs, Value::Bool(_)) {
                boolean(lhs) == boolean(rhs)
            } else if matches!(lhs, Value::Number(_)) || matches!(rhs, Value::Number(_)) {
                number(lhs) == number(rhs)
            } else {
                string(lhs) == string(rhs)
            };
            equal == (op == CompareOp::Eq)
        }
        CompareOp::Lt => number(lhs) < number(rhs),
        CompareOp::Gt => number(lhs) > number(rhs),
        CompareOp::LtEq => number(lhs) <= number(rhs),
        CompareOp::GtEq => number(lhs) >= number(rhs),
    }
}
