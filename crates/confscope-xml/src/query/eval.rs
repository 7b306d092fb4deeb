use crate::document::{Document, NodeId, NodeKind};

use super::{Axis, CompareOp, Expr, Function, LocationPath, Match, NodeTest, Step};

#[derive(Debug, Clone)]
enum Value {
    Nodes(Vec<Match>),
    Str(String),
    Num(f64),
    Bool(bool),
}

struct Context<'a> {
    item: &'a Match,
    position: usize,
    size: usize,
}

pub(super) struct Evaluator<'d> {
    doc: &'d Document,
    order: Vec<usize>,
}

impl<'d> Evaluator<'d> {
    pub(super) fn new(doc: &'d Document) -> Self {
        Self {
            doc,
            order: doc.document_order(),
        }
    }

    pub(super) fn select(&self, expr: &Expr, context: NodeId) -> Vec<Match> {
        let item = Match::Node(context);
        let ctx = Context {
            item: &item,
            position: 1,
            size: 1,
        };
        match self.eval(expr, &ctx) {
            Value::Nodes(nodes) => nodes,
            _ => Vec::new(),
        }
    }

    fn eval(&self, expr: &Expr, ctx: &Context<'_>) -> Value {
        match expr {
            Expr::Path(path) => Value::Nodes(self.eval_path(path, ctx)),
            Expr::Union(members) => {
                let mut all = Vec::new();
                for member in members {
                    if let Value::Nodes(nodes) = self.eval(member, ctx) {
                        all.extend(nodes);
                    }
                }
                Value::Nodes(self.normalize(all))
            }
            Expr::Or(left, right) => Value::Bool(
                self.boolean(&self.eval(left, ctx)) || self.boolean(&self.eval(right, ctx)),
            ),
            Expr::And(left, right) => Value::Bool(
                self.boolean(&self.eval(left, ctx)) && self.boolean(&self.eval(right, ctx)),
            ),
            Expr::Compare { op, left, right } => {
                let left = self.eval(left, ctx);
                let right = self.eval(right, ctx);
                Value::Bool(self.compare(*op, &left, &right))
            }
            Expr::Literal(text) => Value::Str(text.clone()),
            Expr::Number(n) => Value::Num(*n),
            Expr::Call { function, args } => self.call(*function, args, ctx),
        }
    }

    fn call(&self, function: Function, args: &[Expr], ctx: &Context<'_>) -> Value {
        let arg = |i: usize| {
            args.get(i)
                .map(|expr| self.eval(expr, ctx))
                .unwrap_or(Value::Str(String::new()))
        };
        match function {
            Function::Not => Value::Bool(!self.boolean(&arg(0))),
            Function::Position => Value::Num(ctx.position as f64),
            Function::Last => Value::Num(ctx.size as f64),
            Function::Count => match arg(0) {
                Value::Nodes(nodes) => Value::Num(nodes.len() as f64),
                _ => Value::Num(0.0),
            },
            Function::Contains => {
                Value::Bool(self.string(&arg(0)).contains(self.string(&arg(1)).as_str()))
            }
            Function::StartsWith => {
                Value::Bool(self.string(&arg(0)).starts_with(self.string(&arg(1)).as_str()))
            }
        }
    }

    // ========================================================================
    // Paths
    // ========================================================================

    fn eval_path(&self, path: &LocationPath, ctx: &Context<'_>) -> Vec<Match> {
        let mut current = if path.absolute {
            vec![Match::Node(self.doc.root())]
        } else {
            vec![ctx.item.clone()]
        };
        for step in &path.steps {
            let mut next = Vec::new();
            for item in &current {
                next.extend(self.eval_step(step, item));
            }
            current = self.normalize(next);
        }
        current
    }

    fn eval_step(&self, step: &Step, item: &Match) -> Vec<Match> {
        let mut candidates: Vec<Match> = self
            .axis(step.axis, item)
            .into_iter()
            .filter(|candidate| self.matches_test(&step.test, step.axis, candidate))
            .collect();
        for predicate in &step.predicates {
            let size = candidates.len();
            candidates = candidates
                .iter()
                .enumerate()
                .filter(|(index, candidate)| {
                    let ctx = Context {
                        item: candidate,
                        position: index + 1,
                        size,
                    };
                    match self.eval(predicate, &ctx) {
                        Value::Num(n) => n == ctx.position as f64,
                        other => self.boolean(&other),
                    }
                })
                .map(|(_, candidate)| candidate.clone())
                .collect();
        }
        candidates
    }

    fn axis(&self, axis: Axis, item: &Match) -> Vec<Match> {
        let node = match item {
            Match::Node(id) => *id,
            Match::Attribute { element, .. } => {
                return match axis {
                    Axis::SelfAxis | Axis::DescendantOrSelf => vec![item.clone()],
                    Axis::Parent => vec![Match::Node(*element)],
                    _ => Vec::new(),
                };
            }
        };
        match axis {
            Axis::Child => self.doc.children(node).iter().map(|id| Match::Node(*id)).collect(),
            Axis::Descendant => self
                .doc
                .descendants(node)
                .into_iter()
                .map(Match::Node)
                .collect(),
            Axis::DescendantOrSelf => std::iter::once(node)
                .chain(self.doc.descendants(node))
                .map(Match::Node)
                .collect(),
            Axis::SelfAxis => vec![Match::Node(node)],
            Axis::Parent => self.doc.parent(node).map(Match::Node).into_iter().collect(),
            Axis::Attribute => self
                .doc
                .attributes(node)
                .iter()
                .filter(|attr| !attr.is_namespace_declaration())
                .map(|attr| Match::Attribute {
                    element: node,
                    name: attr.name.clone(),
                })
                .collect(),
        }
    }

    fn matches_test(&self, test: &NodeTest, axis: Axis, item: &Match) -> bool {
        let principal = match (axis, item) {
            (Axis::Attribute, Match::Attribute { .. }) => true,
            (Axis::Attribute, Match::Node(_)) => false,
            (_, Match::Node(id)) => self.doc.is_element(*id),
            (_, Match::Attribute { .. }) => false,
        };
        match test {
            NodeTest::Node => true,
            NodeTest::Text => matches!(
                item,
                Match::Node(id) if matches!(self.doc.kind(*id), NodeKind::Text(_) | NodeKind::CData(_))
            ),
            NodeTest::Comment => matches!(
                item,
                Match::Node(id) if matches!(self.doc.kind(*id), NodeKind::Comment(_))
            ),
            NodeTest::AnyName => principal,
            NodeTest::NamespaceWildcard { uri, .. } => {
                principal && self.namespace_of(item) == Some(uri.as_str())
            }
            NodeTest::Name { local, uri, .. } => {
                principal
                    && self.local_name_of(item) == Some(local.as_str())
                    && self.namespace_of(item) == uri.as_deref()
            }
        }
    }

    fn local_name_of<'a>(&'a self, item: &'a Match) -> Option<&'a str> {
        match item {
            Match::Node(id) => self.doc.local_name(*id),
            Match::Attribute { name, .. } => Some(crate::document::split_qname(name).1),
        }
    }

    /// Unprefixed attributes are in no namespace, whatever the default is.
    fn namespace_of(&self, item: &Match) -> Option<&str> {
        match item {
            Match::Node(id) => self.doc.namespace_uri(*id),
            Match::Attribute { element, name } => match crate::document::split_qname(name).0 {
                Some(prefix) => self.doc.lookup_namespace(*element, Some(prefix)),
                None => None,
            },
        }
    }

    /// Document order, attributes after their element, no duplicates.
    fn normalize(&self, mut matches: Vec<Match>) -> Vec<Match> {
        matches.sort_by_cached_key(|item| self.sort_key(item));
        matches.dedup();
        matches
    }

    fn sort_key(&self, item: &Match) -> (usize, usize, usize) {
        let rank = |id: NodeId| self.order.get(id.index()).copied().unwrap_or(usize::MAX);
        match item {
            Match::Node(id) => (rank(*id), 0, 0),
            Match::Attribute { element, name } => {
                let index = self
                    .doc
                    .attributes(*element)
                    .iter()
                    .position(|attr| &attr.name == name)
                    .unwrap_or(usize::MAX);
                (rank(*element), 1, index)
            }
        }
    }

    // ========================================================================
    // Conversions and comparison
    // ========================================================================

    fn match_string(&self, item: &Match) -> String {
        match item {
            Match::Node(id) => self.doc.text_content(*id),
            Match::Attribute { element, name } => self
                .doc
                .attribute(*element, name)
                .unwrap_or_default()
                .to_string(),
        }
    }

    fn boolean(&self, value: &Value) -> bool {
        match value {
            Value::Nodes(nodes) => !nodes.is_empty(),
            Value::Str(text) => !text.is_empty(),
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Bool(b) => *b,
        }
    }

    fn string(&self, value: &Value) -> String {
        match value {
            Value::Nodes(nodes) => nodes
                .first()
                .map(|item| self.match_string(item))
                .unwrap_or_default(),
            Value::Str(text) => text.clone(),
            Value::Num(n) => format_number(*n),
            Value::Bool(b) => b.to_string(),
        }
    }

    fn number(&self, value: &Value) -> f64 {
        match value {
            Value::Num(n) => *n,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            other => self.string(other).trim().parse().unwrap_or(f64::NAN),
        }
    }

    fn compare(&self, op: CompareOp, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Nodes(a), Value::Nodes(b)) => a.iter().any(|x| {
                let x = Value::Str(self.match_string(x));
                b.iter()
                    .any(|y| self.compare_atoms(op, &x, &Value::Str(self.match_string(y))))
            }),
            (Value::Nodes(nodes), Value::Bool(b)) => {
                self.compare_atoms(op, &Value::Bool(!nodes.is_empty()), &Value::Bool(*b))
            }
            (Value::Bool(b), Value::Nodes(nodes)) => {
                self.compare_atoms(op, &Value::Bool(*b), &Value::Bool(!nodes.is_empty()))
            }
            (Value::Nodes(nodes), other) => nodes
                .iter()
                .any(|item| self.compare_atoms(op, &Value::Str(self.match_string(item)), other)),
            (other, Value::Nodes(nodes)) => nodes
                .iter()
                .any(|item| self.compare_atoms(op, other, &Value::Str(self.match_string(item)))),
            (a, b) => self.compare_atoms(op, a, b),
        }
    }

    fn compare_atoms(&self, op: CompareOp, a: &Value, b: &Value) -> bool {
        match op {
            CompareOp::Eq | CompareOp::Ne => {
                let equal = if matches!(a, Value::Bool(_)) || matches!(b, Value::Bool(_)) {
                    self.boolean(a) == self.boolean(b)
                } else if matches!(a, Value::Num(_)) || matches!(b, Value::Num(_)) {
                    self.number(a) == self.number(b)
                } else {
                    self.string(a) == self.string(b)
                };
                (op == CompareOp::Eq) == equal
            }
            CompareOp::Lt => self.number(a) < self.number(b),
            CompareOp::Le => self.number(a) <= self.number(b),
            CompareOp::Gt => self.number(a) > self.number(b),
            CompareOp::Ge => self.number(a) >= self.number(b),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
