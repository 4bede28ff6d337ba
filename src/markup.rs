//! Markup tree adapter.
//!
//! Turns the JSX nodes of an oxc program into an owned [`MarkupRoot`] tree.
//! Embedded expressions are not copied: an [`Expr`] keeps the source span of
//! the expression plus whatever later passes need to know about it (markup
//! nested inside it, `this` references, whether reading it is reactive).

use crate::error::{Result, TransformError};
use oxc_ast::ast::*;
use oxc_ast_visit::{walk, Visit};
use oxc_span::{GetSpan, Span};
use oxc_syntax::operator::LogicalOperator;
use oxc_syntax::scope::ScopeFlags;
use std::cell::Cell;

// ═══════════════════════════════════════════════════════════════════════════════
// MARKUP TREE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub enum MarkupRoot {
    Element(ElementNode),
    Fragment(FragmentNode),
}

impl MarkupRoot {
    pub fn span(&self) -> Span {
        match self {
            MarkupRoot::Element(el) => el.span,
            MarkupRoot::Fragment(frag) => frag.span,
        }
    }

    /// True when any expression in the tree (nested markup included) reads `this`.
    pub fn uses_this(&self) -> bool {
        match self {
            MarkupRoot::Element(el) => el.uses_this(),
            MarkupRoot::Fragment(frag) => frag.children.iter().any(MarkupNode::uses_this),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FragmentNode {
    pub children: Vec<MarkupNode>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum MarkupNode {
    Element(ElementNode),
    Text(TextNode),
    Slot(ExpressionSlot),
    Control(ControlNode),
}

impl MarkupNode {
    fn uses_this(&self) -> bool {
        match self {
            MarkupNode::Element(el) => el.uses_this(),
            MarkupNode::Text(_) => false,
            MarkupNode::Slot(slot) => slot.expr.uses_this(),
            MarkupNode::Control(ctrl) => ctrl.whole.uses_this(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// `div`, `my-element`
    Tag,
    /// `Foo`
    Reference,
    /// `Foo.Bar`, `this.Foo`
    Member,
    /// `<this>`
    This,
    /// `svg:rect`
    Namespaced,
}

#[derive(Debug, Clone)]
pub struct ElementNode {
    pub name: String,
    pub name_kind: NameKind,
    pub attributes: Vec<AttributeItem>,
    pub children: Vec<MarkupNode>,
    pub span: Span,
    /// Sits inside a non-arrow function or class of an enclosing root's
    /// expression, where `this` is that function's own receiver.
    pub receiver_bound: bool,
}

impl ElementNode {
    pub fn name_uses_this(&self) -> bool {
        !self.receiver_bound
            && (self.name_kind == NameKind::This
                || (self.name_kind == NameKind::Member && self.name.starts_with("this.")))
    }

    fn uses_this(&self) -> bool {
        self.name_uses_this()
            || self.attributes.iter().any(|item| match item {
                AttributeItem::Named(attr) => match &attr.value {
                    AttributeValue::Expression(expr) => expr.uses_this(),
                    _ => false,
                },
                AttributeItem::Spread(expr) => expr.uses_this(),
            })
            || self.children.iter().any(MarkupNode::uses_this)
    }
}

#[derive(Debug, Clone)]
pub struct TextNode {
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ExpressionSlot {
    pub expr: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum AttributeItem {
    Named(Attribute),
    Spread(Expr),
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub name: String,
    pub value: AttributeValue,
    pub span: Span,
}

impl Attribute {
    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}:{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum AttributeValue {
    Implicit,
    /// Entity-decoded string literal.
    Literal(String),
    Expression(Expr),
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTROL NODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
    Coalesce,
}

impl LogicOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicOp::And => "&&",
            LogicOp::Or => "||",
            LogicOp::Coalesce => "??",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ControlKind {
    Conditional {
        test: Expr,
        consequent: Expr,
        alternate: Expr,
    },
    Logical {
        op: LogicOp,
        left: Expr,
        right: Expr,
    },
    /// `items.map(...)`
    List,
}

#[derive(Debug, Clone)]
pub struct ControlNode {
    pub kind: ControlKind,
    /// The expression as written, used when the node is not wrapped.
    pub whole: Expr,
    pub span: Span,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    /// Number already printed the way JS would stringify it.
    Num(String),
    Bool(bool),
}

#[derive(Debug, Clone)]
pub enum ExprShape {
    Function,
    /// Identifier or member access, something `x = el` can target.
    Assignable,
    /// Two-element array literal, `[handler, data]`.
    Pair(Box<(Expr, Expr)>),
    Other,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub span: Span,
    /// Outermost markup roots inside the expression.
    pub nested: Vec<MarkupRoot>,
    /// `this` references outside nested functions, classes and markup.
    pub this_spans: Vec<Span>,
    /// Reading the value may track a signal: a call, member access or tagged
    /// template that is not deferred inside a function.
    pub reactive: bool,
    /// Preceded by the static marker comment.
    pub once: bool,
    pub literal: Option<Literal>,
    pub shape: ExprShape,
    /// The expression is itself a markup element or fragment.
    pub markup: bool,
    /// Sequence or object literal, which changes meaning when spliced into an
    /// argument list or arrow body without parentheses.
    pub needs_parens: bool,
}

impl Expr {
    pub fn uses_this(&self) -> bool {
        !self.this_spans.is_empty() || self.nested.iter().any(MarkupRoot::uses_this)
    }

    pub fn is_dynamic(&self) -> bool {
        self.reactive && !self.once
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADAPTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Collects the outermost markup roots of a program, in source order.
pub fn collect_roots(
    program: &Program<'_>,
    source: &str,
    static_marker: &str,
) -> Result<Vec<MarkupRoot>> {
    let adapter = MarkupAdapter::new(source, static_marker);
    // Top-level roots own whatever receiver they are written under.
    let mut collector = RootCollector::new(&adapter, false);
    collector.visit_program(program);
    collector.finish()
}

pub struct MarkupAdapter<'s> {
    source: &'s str,
    static_marker: &'s str,
    /// Non-arrow functions and classes entered inside root expressions.
    receiver_depth: Cell<u32>,
}

impl<'s> MarkupAdapter<'s> {
    pub fn new(source: &'s str, static_marker: &'s str) -> Self {
        Self {
            source,
            static_marker,
            receiver_depth: Cell::new(0),
        }
    }

    fn receiver_bound(&self) -> bool {
        self.receiver_depth.get() > 0
    }

    fn slice(&self, span: Span) -> &'s str {
        span.source_text(self.source)
    }

    pub fn element(&self, el: &JSXElement<'_>) -> Result<ElementNode> {
        let opening = &el.opening_element;
        let name_span = opening.name.span();
        let name_kind = match &opening.name {
            JSXElementName::Identifier(_) => NameKind::Tag,
            JSXElementName::IdentifierReference(_) => NameKind::Reference,
            JSXElementName::NamespacedName(_) => NameKind::Namespaced,
            JSXElementName::MemberExpression(_) => NameKind::Member,
            JSXElementName::ThisExpression(_) => NameKind::This,
        };

        let mut attributes = Vec::with_capacity(opening.attributes.len());
        for item in &opening.attributes {
            attributes.push(self.attribute(item)?);
        }

        Ok(ElementNode {
            name: self.slice(name_span).to_string(),
            name_kind,
            attributes,
            children: self.children(&el.children)?,
            span: el.span,
            receiver_bound: self.receiver_bound(),
        })
    }

    pub fn fragment(&self, frag: &JSXFragment<'_>) -> Result<FragmentNode> {
        Ok(FragmentNode {
            children: self.children(&frag.children)?,
            span: frag.span,
        })
    }

    fn attribute(&self, item: &JSXAttributeItem<'_>) -> Result<AttributeItem> {
        let attr = match item {
            JSXAttributeItem::SpreadAttribute(spread) => {
                return Ok(AttributeItem::Spread(self.expr(&spread.argument, None)?));
            }
            JSXAttributeItem::Attribute(attr) => attr,
        };

        let (namespace, name) = match &attr.name {
            JSXAttributeName::Identifier(id) => (None, id.name.to_string()),
            JSXAttributeName::NamespacedName(ns) => (
                Some(ns.namespace.name.to_string()),
                ns.name.name.to_string(),
            ),
        };

        let value = match &attr.value {
            None => AttributeValue::Implicit,
            Some(JSXAttributeValue::StringLiteral(lit)) => {
                let raw = self.slice(Span::new(lit.span.start + 1, lit.span.end - 1));
                AttributeValue::Literal(html_escape::decode_html_entities(raw).into_owned())
            }
            Some(JSXAttributeValue::ExpressionContainer(container)) => {
                match container.expression.as_expression() {
                    Some(expr) => AttributeValue::Expression(self.expr(expr, Some(container.span))?),
                    None => {
                        return Err(TransformError::structural(
                            self.source,
                            container.span,
                            "attribute expression must not be empty",
                        ))
                    }
                }
            }
            Some(JSXAttributeValue::Element(el)) => AttributeValue::Expression(
                self.markup_expr(el.span, MarkupRoot::Element(self.element(el)?)),
            ),
            Some(JSXAttributeValue::Fragment(frag)) => AttributeValue::Expression(
                self.markup_expr(frag.span, MarkupRoot::Fragment(self.fragment(frag)?)),
            ),
        };

        Ok(AttributeItem::Named(Attribute {
            namespace,
            name,
            value,
            span: attr.span,
        }))
    }

    fn children(&self, children: &[JSXChild<'_>]) -> Result<Vec<MarkupNode>> {
        let mut out = Vec::new();
        for child in children {
            match child {
                JSXChild::Text(text) => {
                    let value = normalize_jsx_text(self.slice(text.span));
                    if !value.is_empty() {
                        out.push(MarkupNode::Text(TextNode {
                            value,
                            span: text.span,
                        }));
                    }
                }
                JSXChild::Element(el) => out.push(MarkupNode::Element(self.element(el)?)),
                // Fragments inside markup contribute their children in place.
                JSXChild::Fragment(frag) => out.extend(self.children(&frag.children)?),
                JSXChild::ExpressionContainer(container) => {
                    if let Some(expr) = container.expression.as_expression() {
                        out.push(self.child_expression(expr, container.span)?);
                    }
                }
                JSXChild::Spread(spread) => out.push(MarkupNode::Slot(ExpressionSlot {
                    expr: self.expr(&spread.expression, None)?,
                    span: spread.span,
                })),
            }
        }
        Ok(out)
    }

    fn child_expression(&self, expr: &Expression<'_>, container: Span) -> Result<MarkupNode> {
        let whole = self.expr(expr, Some(container))?;
        let kind = match strip_parens(expr) {
            Expression::ConditionalExpression(cond) => Some(ControlKind::Conditional {
                test: self.expr(&cond.test, None)?,
                consequent: self.expr(&cond.consequent, None)?,
                alternate: self.expr(&cond.alternate, None)?,
            }),
            Expression::LogicalExpression(logical) => Some(ControlKind::Logical {
                op: match logical.operator {
                    LogicalOperator::And => LogicOp::And,
                    LogicalOperator::Or => LogicOp::Or,
                    LogicalOperator::Coalesce => LogicOp::Coalesce,
                },
                left: self.expr(&logical.left, None)?,
                right: self.expr(&logical.right, None)?,
            }),
            Expression::CallExpression(call) if is_map_call(call) => Some(ControlKind::List),
            _ => None,
        };

        Ok(match kind {
            Some(kind) => MarkupNode::Control(ControlNode {
                kind,
                whole,
                span: container,
            }),
            None => MarkupNode::Slot(ExpressionSlot {
                expr: whole,
                span: container,
            }),
        })
    }

    /// `container` is the `{...}` span around the expression, where a static
    /// marker comment may sit.
    pub fn expr(&self, expr: &Expression<'_>, container: Option<Span>) -> Result<Expr> {
        let span = expr.span();

        let mut collector = RootCollector::new(self, true);
        collector.visit_expression(expr);
        let nested = collector.finish()?;

        let mut this = ThisCollector::default();
        if !self.receiver_bound() {
            this.visit_expression(expr);
        }

        let mut probe = ReactivityProbe::default();
        probe.visit_expression(expr);

        let once = container
            .map(|c| self.has_static_marker(Span::new(c.start + 1, span.start)))
            .unwrap_or(false);

        let inner = strip_parens(expr);
        let shape = match inner {
            Expression::ArrowFunctionExpression(_) | Expression::FunctionExpression(_) => {
                ExprShape::Function
            }
            Expression::Identifier(_) => ExprShape::Assignable,
            e if e.is_member_expression() => ExprShape::Assignable,
            Expression::ArrayExpression(arr) if arr.elements.len() == 2 => {
                match (arr.elements[0].as_expression(), arr.elements[1].as_expression()) {
                    (Some(first), Some(second)) => ExprShape::Pair(Box::new((
                        self.expr(first, None)?,
                        self.expr(second, None)?,
                    ))),
                    _ => ExprShape::Other,
                }
            }
            _ => ExprShape::Other,
        };

        Ok(Expr {
            span,
            nested,
            this_spans: this.spans,
            reactive: probe.reactive,
            once,
            literal: literal_value(inner),
            shape,
            markup: matches!(
                inner,
                Expression::JSXElement(_) | Expression::JSXFragment(_)
            ),
            needs_parens: matches!(
                expr,
                Expression::SequenceExpression(_) | Expression::ObjectExpression(_)
            ),
        })
    }

    fn markup_expr(&self, span: Span, root: MarkupRoot) -> Expr {
        Expr {
            span,
            nested: vec![root],
            this_spans: Vec::new(),
            reactive: false,
            once: false,
            literal: None,
            shape: ExprShape::Other,
            markup: true,
            needs_parens: false,
        }
    }

    fn has_static_marker(&self, span: Span) -> bool {
        if self.static_marker.is_empty() || span.start >= span.end {
            return false;
        }
        let leading: String = self
            .slice(span)
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        leading.contains(&format!("/*{}*/", self.static_marker))
    }
}

fn strip_parens<'b, 'a>(mut expr: &'b Expression<'a>) -> &'b Expression<'a> {
    while let Expression::ParenthesizedExpression(paren) = expr {
        expr = &paren.expression;
    }
    expr
}

fn is_map_call(call: &CallExpression<'_>) -> bool {
    strip_parens(&call.callee)
        .as_member_expression()
        .and_then(|member| member.static_property_name())
        .map_or(false, |name| name == "map")
}

fn literal_value(expr: &Expression<'_>) -> Option<Literal> {
    match expr {
        Expression::StringLiteral(lit) => Some(Literal::Str(lit.value.to_string())),
        Expression::BooleanLiteral(lit) => Some(Literal::Bool(lit.value)),
        Expression::NumericLiteral(lit) => Some(Literal::Num(format_number(lit.value))),
        Expression::TemplateLiteral(tpl) if tpl.expressions.is_empty() => tpl
            .quasis
            .first()
            .and_then(|q| q.value.cooked.as_ref())
            .map(|cooked| Literal::Str(cooked.to_string())),
        _ => None,
    }
}

/// `Number.prototype.toString` for a literal value.
fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let sign = if value < 0.0 { "-" } else { "" };
    // Shortest round-trip digits, as `d.ddde<exp>`.
    let sci = format!("{:e}", value.abs());
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let digits = mantissa.replace('.', "");
    let k = digits.len() as i32;
    let n = exp.parse::<i32>().unwrap_or(0) + 1;

    let body = if k <= n && n <= 21 {
        format!("{}{}", digits, "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        format!("{}.{}", &digits[..n as usize], &digits[n as usize..])
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let e = n - 1;
        let e = if e < 0 { format!("-{}", -e) } else { format!("+{}", e) };
        if k == 1 {
            format!("{}e{}", digits, e)
        } else {
            format!("{}.{}e{}", &digits[..1], &digits[1..], e)
        }
    };
    format!("{}{}", sign, body)
}

/// JSX whitespace rule: lines are trimmed, whitespace-only lines vanish, and
/// the remaining lines are joined by a single space.
pub fn normalize_jsx_text(raw: &str) -> String {
    let replaced = raw.replace('\r', "").replace('\t', " ");
    let lines: Vec<&str> = replaced.split('\n').collect();
    let last = lines.len() - 1;

    let mut buf = String::new();
    for (i, line) in lines.iter().enumerate() {
        let mut line = *line;
        if i != 0 {
            line = line.trim_start_matches(' ');
        }
        if i != last {
            line = line.trim_end_matches(' ');
        }
        if line.is_empty() {
            continue;
        }
        if !buf.is_empty() {
            buf.push(' ');
        }
        buf.push_str(line);
    }
    html_escape::decode_html_entities(&buf).into_owned()
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLECTORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Adapts every outermost JSX element or fragment it meets and does not
/// descend into them.
struct RootCollector<'s, 'r> {
    adapter: &'r MarkupAdapter<'s>,
    roots: Vec<MarkupRoot>,
    error: Option<TransformError>,
    /// Count functions and classes crossed on the way to a root.
    track_receivers: bool,
}

impl<'s, 'r> RootCollector<'s, 'r> {
    fn new(adapter: &'r MarkupAdapter<'s>, track_receivers: bool) -> Self {
        Self {
            adapter,
            roots: Vec::new(),
            error: None,
            track_receivers,
        }
    }

    fn with_receiver(&mut self, inner: impl FnOnce(&mut Self)) {
        if !self.track_receivers {
            inner(self);
            return;
        }
        let adapter = self.adapter;
        let depth = &adapter.receiver_depth;
        depth.set(depth.get() + 1);
        inner(self);
        depth.set(depth.get() - 1);
    }

    fn finish(self) -> Result<Vec<MarkupRoot>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.roots),
        }
    }
}

impl<'a, 's, 'r> Visit<'a> for RootCollector<'s, 'r> {
    fn visit_function(&mut self, it: &Function<'a>, flags: ScopeFlags) {
        self.with_receiver(|v| walk::walk_function(v, it, flags));
    }

    fn visit_class(&mut self, it: &Class<'a>) {
        self.with_receiver(|v| walk::walk_class(v, it));
    }

    fn visit_jsx_element(&mut self, it: &JSXElement<'a>) {
        if self.error.is_some() {
            return;
        }
        match self.adapter.element(it) {
            Ok(el) => self.roots.push(MarkupRoot::Element(el)),
            Err(err) => self.error = Some(err),
        }
    }

    fn visit_jsx_fragment(&mut self, it: &JSXFragment<'a>) {
        if self.error.is_some() {
            return;
        }
        match self.adapter.fragment(it) {
            Ok(frag) => self.roots.push(MarkupRoot::Fragment(frag)),
            Err(err) => self.error = Some(err),
        }
    }
}

#[derive(Default)]
struct ThisCollector {
    spans: Vec<Span>,
}

impl<'a> Visit<'a> for ThisCollector {
    fn visit_this_expression(&mut self, it: &ThisExpression) {
        self.spans.push(it.span);
    }

    // Functions and classes bind their own receiver.
    fn visit_function(&mut self, _it: &Function<'a>, _flags: ScopeFlags) {}

    fn visit_class(&mut self, _it: &Class<'a>) {}

    // Nested markup records its own references.
    fn visit_jsx_element(&mut self, _it: &JSXElement<'a>) {}

    fn visit_jsx_fragment(&mut self, _it: &JSXFragment<'a>) {}
}

#[derive(Default)]
struct ReactivityProbe {
    reactive: bool,
}

impl<'a> Visit<'a> for ReactivityProbe {
    fn visit_call_expression(&mut self, _it: &CallExpression<'a>) {
        self.reactive = true;
    }

    fn visit_member_expression(&mut self, _it: &MemberExpression<'a>) {
        self.reactive = true;
    }

    fn visit_static_member_expression(&mut self, _it: &StaticMemberExpression<'a>) {
        self.reactive = true;
    }

    fn visit_computed_member_expression(&mut self, _it: &ComputedMemberExpression<'a>) {
        self.reactive = true;
    }

    fn visit_tagged_template_expression(&mut self, _it: &TaggedTemplateExpression<'a>) {
        self.reactive = true;
    }

    fn visit_function(&mut self, _it: &Function<'a>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _it: &ArrowFunctionExpression<'a>) {}

    fn visit_class(&mut self, _it: &Class<'a>) {}

    fn visit_jsx_element(&mut self, _it: &JSXElement<'a>) {}

    fn visit_jsx_fragment(&mut self, _it: &JSXFragment<'a>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn roots(source: &str) -> Vec<MarkupRoot> {
        let allocator = Allocator::default();
        let source_type = SourceType::default().with_jsx(true).with_module(true);
        let ret = Parser::new(&allocator, source, source_type).parse();
        assert!(ret.errors.is_empty(), "{:?}", ret.errors);
        collect_roots(&ret.program, source, "@once").unwrap()
    }

    fn element(root: &MarkupRoot) -> &ElementNode {
        match root {
            MarkupRoot::Element(el) => el,
            MarkupRoot::Fragment(_) => panic!("expected element"),
        }
    }

    #[test]
    fn test_collects_outermost_roots_only() {
        let found = roots("const a = <div><span/></div>; const b = <>{x}</>;");
        assert_eq!(found.len(), 2);
        assert!(matches!(found[1], MarkupRoot::Fragment(_)));
        assert_eq!(element(&found[0]).children.len(), 1);
    }

    #[test]
    fn test_names() {
        let found = roots("<div><my-el/><Foo/><a.B/></div>");
        let el = element(&found[0]);
        let kinds: Vec<NameKind> = el
            .children
            .iter()
            .map(|c| match c {
                MarkupNode::Element(e) => e.name_kind,
                _ => panic!("expected element"),
            })
            .collect();
        assert_eq!(kinds, vec![NameKind::Tag, NameKind::Reference, NameKind::Member]);
    }

    #[test]
    fn test_text_whitespace_and_entities() {
        assert_eq!(normalize_jsx_text("\n   hello\n   world  \n"), "hello world");
        assert_eq!(normalize_jsx_text("  a  "), "  a  ");
        assert_eq!(normalize_jsx_text("\n  \n"), "");
        assert_eq!(normalize_jsx_text("a &amp; b"), "a & b");
    }

    #[test]
    fn test_expression_analysis() {
        let found = roots("<div a={x} b={x.y} c={() => x()} d={/*@once*/ f()} e=\"&lt;\" f={42}>{this.v}</div>");
        let el = element(&found[0]);
        let exprs: Vec<&Expr> = el
            .attributes
            .iter()
            .filter_map(|a| match a {
                AttributeItem::Named(Attribute {
                    value: AttributeValue::Expression(e),
                    ..
                }) => Some(e),
                _ => None,
            })
            .collect();
        assert!(!exprs[0].reactive);
        assert!(matches!(exprs[0].shape, ExprShape::Assignable));
        assert!(exprs[1].reactive);
        assert!(!exprs[2].reactive);
        assert!(matches!(exprs[2].shape, ExprShape::Function));
        assert!(exprs[3].reactive && exprs[3].once);
        assert_eq!(exprs[4].literal, Some(Literal::Num("42".to_string())));

        match &el.attributes[4] {
            AttributeItem::Named(attr) => {
                assert!(matches!(&attr.value, AttributeValue::Literal(v) if v == "<"))
            }
            _ => panic!("expected attribute"),
        }
        assert!(found[0].uses_this());
    }

    #[test]
    fn test_control_detection() {
        let found = roots("<ul>{a ? <li/> : null}{b && c}{items.map(i => <li>{i}</li>)}{plain}</ul>");
        let el = element(&found[0]);
        assert!(matches!(
            &el.children[0],
            MarkupNode::Control(ControlNode { kind: ControlKind::Conditional { .. }, .. })
        ));
        assert!(matches!(
            &el.children[1],
            MarkupNode::Control(ControlNode { kind: ControlKind::Logical { op: LogicOp::And, .. }, .. })
        ));
        match &el.children[2] {
            MarkupNode::Control(ctrl) => {
                assert!(matches!(ctrl.kind, ControlKind::List));
                assert_eq!(ctrl.whole.nested.len(), 1);
            }
            _ => panic!("expected list"),
        }
        assert!(matches!(&el.children[3], MarkupNode::Slot(_)));
    }

    #[test]
    fn test_this_inside_function_is_ignored() {
        let found = roots("<div onClick={function () { this.x(); }} />");
        assert!(!found[0].uses_this());
    }

    #[test]
    fn test_markup_in_nested_function_keeps_its_receiver() {
        let found = roots("<ul>{items.map(function (i) { return <li>{this.label}</li>; })}</ul>");
        assert!(!found[0].uses_this());
        let MarkupNode::Control(list) = &element(&found[0]).children[0] else {
            panic!("expected list");
        };
        assert!(!list.whole.nested[0].uses_this());

        let found = roots("<ul>{items.map((i) => <li>{this.label}</li>)}</ul>");
        assert!(found[0].uses_this());
    }

    #[test]
    fn test_top_level_root_in_method_uses_this() {
        let found = roots("class A { render() { return <p>{this.x}</p>; } }");
        assert!(found[0].uses_this());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(1.23e-18), "1.23e-18");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(123456789012.5), "123456789012.5");
        assert_eq!(format_number(16.0), "16");
    }
}
