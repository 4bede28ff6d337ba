//! Binding emission.
//!
//! Turns classified nodes into runtime calls. A host element becomes an
//! [`EmittedUnit`]: the template it instantiates plus one statement per
//! binding site. Statements address nodes by path; variable names are only
//! assigned when the unit is rendered, after the hydration adapter had its
//! say about how nodes are acquired.

use crate::classify::{AttrBinding, ClassifiedNode, ComponentCall, HostNode, PropItem, PropValue};
use crate::context::{js_string, CompilationContext};
use crate::error::{Result, TransformError};
use crate::markup::{ControlKind, ControlNode, Expr, ExprShape, Literal, LogicOp};
use crate::path::{self, BindingSite, NodePath, SiteTarget};
use crate::{assemble, hydrate, template};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

// ═══════════════════════════════════════════════════════════════════════════════
// UNITS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// `_tmpl$()`
    Clone,
    /// `getNextElement(_tmpl$)`
    Claim,
}

#[derive(Debug)]
pub struct EmittedUnit<'a, 'm> {
    pub template: String,
    pub acquire: Acquire,
    pub sites: Vec<BindingSite<'a, 'm>>,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Bind {
        node: NodePath,
        binding: Binding,
    },
    Insert {
        parent: NodePath,
        value: String,
        marker: Option<NodePath>,
        anchor: Option<NodePath>,
        /// Pass the server-rendered nodes being replaced.
        claim: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    SetAttribute {
        name: String,
        value: String,
        reactive: bool,
    },
    SetProperty {
        name: String,
        value: String,
        reactive: bool,
    },
    ClassName {
        value: String,
        reactive: bool,
    },
    ClassList {
        value: String,
        reactive: bool,
    },
    Style {
        value: String,
        reactive: bool,
    },
    Delegate {
        event: String,
        handler: String,
        data: Option<String>,
    },
    Listen {
        event: String,
        handler: String,
        /// Bound once when the listener is attached, passed ahead of the event.
        data: Option<String>,
        capture: bool,
    },
    Ref {
        value: String,
        kind: RefKind,
    },
    Use {
        directive: String,
        value: String,
    },
    Spread {
        value: String,
        has_children: bool,
    },
    Owner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// `el => ...`: called with the node.
    Call,
    /// Variable or member: called if it holds a function, assigned otherwise.
    Assign,
    /// Anything else: called if it evaluates to a function.
    Invoke,
}

/// Where a child value ends up, which decides how reactive reads are deferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Argument of `insert`, which accepts thunks.
    Insert,
    /// Array element or fragment value.
    Fragment,
    /// Sole value returned from a props getter.
    Getter,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE UNITS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn emit_template<'a, 'm>(
    host: &'a HostNode<'m>,
    ctx: &mut CompilationContext,
) -> Result<EmittedUnit<'a, 'm>> {
    let template = ctx.templates.register(template::extract(host, ctx.config));
    let sites = path::resolve(host);

    let mut stmts = Vec::with_capacity(sites.len());
    for site in &sites {
        stmts.push(emit_site(site, ctx)?);
    }

    Ok(EmittedUnit {
        template,
        acquire: Acquire::Clone,
        sites,
        stmts,
    })
}

/// Emit, adapt for hydration when configured, and render.
pub fn compile_host(host: &HostNode, ctx: &mut CompilationContext) -> Result<String> {
    let mut unit = emit_template(host, ctx)?;
    if ctx.config.hydratable {
        hydrate::adapt(&mut unit);
    }
    render_unit(&unit, ctx)
}

fn emit_site(site: &BindingSite, ctx: &mut CompilationContext) -> Result<Stmt> {
    Ok(match &site.target {
        SiteTarget::Attr { binding, host } => Stmt::Bind {
            node: site.path.clone(),
            binding: emit_binding(binding, host, ctx)?,
        },
        SiteTarget::Owner => Stmt::Bind {
            node: site.path.clone(),
            binding: Binding::Owner,
        },
        SiteTarget::Insert {
            node,
            parent,
            anchor,
            has_marker,
        } => Stmt::Insert {
            parent: parent.clone(),
            value: child_value(node, Position::Insert, ctx)?,
            marker: has_marker.then(|| site.path.clone()),
            anchor: anchor.clone(),
            claim: false,
        },
    })
}

fn emit_binding(
    binding: &AttrBinding,
    host: &HostNode,
    ctx: &mut CompilationContext,
) -> Result<Binding> {
    Ok(match binding {
        AttrBinding::Static { name, .. } => {
            // Static attributes never become sites.
            return Err(TransformError::Emit {
                message: format!("static attribute `{}` reached the binding emitter", name),
            });
        }
        AttrBinding::Attribute { name, value } => Binding::SetAttribute {
            name: name.clone(),
            value: lower_expr(value, ctx)?,
            reactive: value.is_dynamic(),
        },
        AttrBinding::Property { name, value } => Binding::SetProperty {
            name: name.clone(),
            value: lower_expr(value, ctx)?,
            reactive: value.is_dynamic(),
        },
        AttrBinding::ClassName(value) => Binding::ClassName {
            value: lower_expr(value, ctx)?,
            reactive: value.is_dynamic(),
        },
        AttrBinding::ClassList(value) => Binding::ClassList {
            value: lower_expr(value, ctx)?,
            reactive: value.is_dynamic(),
        },
        AttrBinding::Style(value) => Binding::Style {
            value: lower_expr(value, ctx)?,
            reactive: value.is_dynamic(),
        },
        AttrBinding::Event {
            name,
            handler,
            delegated,
            capture,
        } => {
            let pair = match &handler.shape {
                ExprShape::Pair(pair) => Some((lower_expr(&pair.0, ctx)?, lower_expr(&pair.1, ctx)?)),
                _ => None,
            };
            if *delegated {
                ctx.delegate(name);
                let (handler, data) = match pair {
                    Some((handler, data)) => (handler, Some(data)),
                    None => (lower_expr(handler, ctx)?, None),
                };
                Binding::Delegate {
                    event: name.clone(),
                    handler,
                    data,
                }
            } else {
                let (handler, data) = match pair {
                    Some((handler, data)) => (handler, Some(data)),
                    None => (lower_expr(handler, ctx)?, None),
                };
                Binding::Listen {
                    event: name.clone(),
                    handler,
                    data,
                    capture: *capture,
                }
            }
        }
        AttrBinding::Ref(value) => Binding::Ref {
            value: lower_expr(value, ctx)?,
            kind: match value.shape {
                ExprShape::Function => RefKind::Call,
                ExprShape::Assignable => RefKind::Assign,
                _ => RefKind::Invoke,
            },
        },
        AttrBinding::Use { directive, value } => Binding::Use {
            directive: directive.clone(),
            value: lower_expr(value, ctx)?,
        },
        AttrBinding::Spread(value) => Binding::Spread {
            value: lower_expr(value, ctx)?,
            has_children: !host.children.is_empty(),
        },
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHILD VALUES
// ═══════════════════════════════════════════════════════════════════════════════

pub fn child_value(
    node: &ClassifiedNode,
    position: Position,
    ctx: &mut CompilationContext,
) -> Result<String> {
    match node {
        ClassifiedNode::Host(host) => compile_host(host, ctx),
        ClassifiedNode::Text(text) => Ok(js_string(text)),
        ClassifiedNode::Component(call) => component_expr(call, ctx),
        ClassifiedNode::Control(ctrl) => control_expr(ctrl, ctx),
        ClassifiedNode::Slot(expr) => {
            let code = lower_expr(expr, ctx)?;
            if !expr.is_dynamic() {
                return Ok(code);
            }
            Ok(match position {
                Position::Insert => format!("() => {}", code),
                Position::Fragment => format!("{}(() => {})", ctx.memo(), code),
                Position::Getter => code,
            })
        }
    }
}

/// Value of a child list: the single child itself, or an array.
pub fn children_value(
    children: &[ClassifiedNode],
    position: Position,
    ctx: &mut CompilationContext,
) -> Result<String> {
    if let [only] = children {
        return child_value(only, position, ctx);
    }
    let mut items = Vec::with_capacity(children.len());
    for child in children {
        items.push(child_value(child, Position::Fragment, ctx)?);
    }
    Ok(format!("[{}]", items.join(", ")))
}

pub fn control_expr(ctrl: &ControlNode, ctx: &mut CompilationContext) -> Result<String> {
    let wrap = ctx.config.wrap_conditionals;
    match &ctrl.kind {
        ControlKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            let test = lower_expr(test, ctx)?;
            let consequent = lower_expr(consequent, ctx)?;
            let alternate = lower_expr(alternate, ctx)?;
            if wrap {
                let memo = ctx.memo();
                let cond = ctx.uid("c");
                Ok(format!(
                    "(() => {{ const {cond} = {memo}(() => !!({test})); return () => {cond}() ? {consequent} : {alternate}; }})()"
                ))
            } else {
                Ok(format!("() => {} ? {} : {}", test, consequent, alternate))
            }
        }
        ControlKind::Logical {
            op: LogicOp::And,
            left,
            right,
        } => {
            let left = lower_expr(left, ctx)?;
            let right = lower_expr(right, ctx)?;
            if wrap {
                let memo = ctx.memo();
                let cond = ctx.uid("c");
                Ok(format!(
                    "(() => {{ const {cond} = {memo}(() => !!({left})); return () => {cond}() && {right}; }})()"
                ))
            } else {
                Ok(format!("() => {} && {}", left, right))
            }
        }
        // `||` and `??` yield the left value itself, so there is no boolean to memoize.
        ControlKind::Logical { .. } => Ok(format!("() => {}", lower_expr(&ctrl.whole, ctx)?)),
        ControlKind::List => {
            let list = lower_expr(&ctrl.whole, ctx)?;
            Ok(format!("{}(() => {})", ctx.memo(), list))
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENTS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn component_expr(call: &ComponentCall, ctx: &mut CompilationContext) -> Result<String> {
    let name = if call.name_uses_this {
        call.name.replacen("this", "_self$", 1)
    } else {
        call.name.to_string()
    };

    let mut sources: Vec<String> = Vec::new();
    let mut entries: Vec<String> = Vec::new();
    let mut spread = false;
    for prop in &call.props {
        match prop {
            PropItem::Spread(expr) => {
                spread = true;
                if !entries.is_empty() {
                    sources.push(format!("{{ {} }}", entries.join(", ")));
                    entries.clear();
                }
                sources.push(lower_expr(expr, ctx)?);
            }
            PropItem::Named { name, value } => entries.push(prop_entry(name, value, ctx)?),
        }
    }

    if !call.children.is_empty() {
        entries.push(children_entry(&call.children, ctx)?);
    }
    if !entries.is_empty() || sources.is_empty() {
        sources.push(format!("{{ {} }}", entries.join(", ")));
    }

    let props = if spread {
        format!("{}({})", ctx.helper("mergeProps"), sources.join(", "))
    } else {
        sources.join(", ")
    };
    Ok(format!("{}({}, {})", ctx.helper("createComponent"), name, props))
}

fn prop_entry(name: &str, value: &PropValue, ctx: &mut CompilationContext) -> Result<String> {
    let key = prop_key(name);
    let expr = match value {
        PropValue::True => return Ok(format!("{}: true", key)),
        PropValue::Literal(s) => return Ok(format!("{}: {}", key, js_string(s))),
        PropValue::Expression(expr) => expr,
    };

    if let Some(literal) = &expr.literal {
        return Ok(format!("{}: {}", key, literal_code(literal)));
    }

    let code = lower_expr(expr, ctx)?;
    if name == "ref" {
        return Ok(match expr.shape {
            ExprShape::Assignable => {
                let tmp = ctx.uid("ref");
                format!(
                    "ref(r$) {{ const {tmp} = {code}; typeof {tmp} === \"function\" ? {tmp}(r$) : {code} = r$; }}"
                )
            }
            _ => format!("ref: {}", code),
        });
    }

    if expr.is_dynamic() {
        Ok(format!("get {}() {{ return {}; }}", key, code))
    } else {
        Ok(format!("{}: {}", key, code))
    }
}

fn children_entry(children: &[ClassifiedNode], ctx: &mut CompilationContext) -> Result<String> {
    if let [ClassifiedNode::Text(text)] = children {
        return Ok(format!("children: {}", js_string(text)));
    }
    let value = children_value(children, Position::Getter, ctx)?;
    Ok(format!("get children() {{ return {}; }}", value))
}

fn literal_code(literal: &Literal) -> String {
    match literal {
        Literal::Str(s) => js_string(s),
        Literal::Num(n) => n.clone(),
        Literal::Bool(b) => b.to_string(),
    }
}

fn is_identifier(name: &str) -> bool {
    lazy_static! {
        static ref IDENT_RE: Regex = Regex::new(r"^[a-zA-Z_$][a-zA-Z0-9_$]*$").unwrap();
    }
    IDENT_RE.is_match(name)
}

fn prop_key(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        js_string(name)
    }
}

fn member(object: &str, name: &str) -> String {
    if is_identifier(name) {
        format!("{}.{}", object, name)
    } else {
        format!("{}[{}]", object, js_string(name))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Source text of an expression with its nested markup compiled and `this`
/// replaced by the captured receiver.
pub fn lower_expr(expr: &Expr, ctx: &mut CompilationContext) -> Result<String> {
    let mut edits: Vec<(u32, u32, String)> = Vec::new();
    for root in &expr.nested {
        let span = root.span();
        edits.push((span.start, span.end, assemble::compile_nested(root, ctx)?));
    }
    for span in &expr.this_spans {
        edits.push((span.start, span.end, "_self$".to_string()));
    }
    edits.sort_by_key(|(start, _, _)| *start);

    let source = ctx.source;
    let mut out = String::new();
    let mut cursor = expr.span.start as usize;
    for (start, end, text) in edits {
        out.push_str(&source[cursor..start as usize]);
        out.push_str(&text);
        cursor = end as usize;
    }
    out.push_str(&source[cursor..expr.span.end as usize]);

    if expr.needs_parens {
        Ok(format!("({})", out))
    } else {
        Ok(out)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDERING
// ═══════════════════════════════════════════════════════════════════════════════

pub fn render_unit(unit: &EmittedUnit, ctx: &mut CompilationContext) -> Result<String> {
    let root_init = match unit.acquire {
        Acquire::Clone => format!("{}()", unit.template),
        Acquire::Claim => format!("{}({})", ctx.helper("getNextElement"), unit.template),
    };
    if unit.stmts.is_empty() {
        return Ok(root_init);
    }

    let mut paths: Vec<NodePath> = Vec::new();
    let mut scanned: BTreeSet<NodePath> = BTreeSet::new();
    for stmt in &unit.stmts {
        match stmt {
            Stmt::Bind { node, .. } => paths.push(node.clone()),
            Stmt::Insert {
                parent,
                marker,
                anchor,
                claim,
                ..
            } => {
                paths.push(parent.clone());
                match marker {
                    Some(marker) if *claim => {
                        scanned.insert(marker.clone());
                    }
                    Some(marker) => paths.push(marker.clone()),
                    None => {}
                }
                if *claim {
                    paths.extend(anchor.iter().cloned());
                }
            }
        }
    }
    let refs = path::walk_nodes(root_init, paths, &scanned, ctx);

    let mut body = Vec::with_capacity(unit.stmts.len());
    for stmt in &unit.stmts {
        body.push(render_stmt(stmt, &refs, ctx)?);
    }

    let decls: Vec<String> = refs
        .decls
        .iter()
        .map(|(name, init)| format!("{} = {}", name, init))
        .collect();
    let root = node_name(&refs, &[])?;
    Ok(format!(
        "(() => {{ const {}; {} return {}; }})()",
        decls.join(", "),
        body.join(" "),
        root
    ))
}

fn node_name<'r>(refs: &'r path::NodeRefs, node: &[usize]) -> Result<&'r str> {
    refs.get(node).ok_or_else(|| TransformError::Emit {
        message: format!("no node reference for path {:?}", node),
    })
}

fn render_stmt(
    stmt: &Stmt,
    refs: &path::NodeRefs,
    ctx: &mut CompilationContext,
) -> Result<String> {
    let (node, binding) = match stmt {
        Stmt::Insert {
            parent,
            value,
            marker,
            anchor,
            claim,
        } => {
            let insert = ctx.helper("insert");
            let parent = node_name(refs, parent)?;
            let marker_path = marker.as_ref();
            let marker = match marker {
                Some(m) => Some(node_name(refs, m)?),
                None => None,
            };
            if !*claim {
                return Ok(match marker {
                    Some(marker) => format!("{}({}, {}, {});", insert, parent, value, marker),
                    None => format!("{}({}, {});", insert, parent, value),
                });
            }
            return Ok(match (marker, marker_path) {
                // The nodes in front of the scanned marker were claimed by the walk.
                (Some(marker), Some(path)) => {
                    let nodes = refs.claimed(path).ok_or_else(|| TransformError::Emit {
                        message: format!("no claimed nodes for marker {:?}", path),
                    })?;
                    format!("{}({}, {}, {}, {});", insert, parent, value, marker, nodes)
                }
                _ => {
                    let anchor = match anchor {
                        Some(a) => node_name(refs, a)?,
                        None => "null",
                    };
                    let claim_nodes = ctx.helper("claimNodes");
                    format!(
                        "{}({}, {}, null, {}({}, {}, null));",
                        insert, parent, value, claim_nodes, parent, anchor
                    )
                }
            });
        }
        Stmt::Bind { node, binding } => (node_name(refs, node)?, binding),
    };

    Ok(match binding {
        Binding::SetAttribute {
            name,
            value,
            reactive,
        } => {
            let call = format!(
                "{}({}, {}, {})",
                ctx.helper("setAttribute"),
                node,
                js_string(name),
                value
            );
            reactive_stmt(call, *reactive, ctx)
        }
        Binding::SetProperty {
            name,
            value,
            reactive,
        } => {
            let assign = format!("{} = {}", member(node, name), value);
            if *reactive {
                format!("{}(() => ({}));", ctx.effect(), assign)
            } else {
                format!("{};", assign)
            }
        }
        Binding::ClassName { value, reactive } => {
            let call = format!("{}({}, {})", ctx.helper("className"), node, value);
            reactive_stmt(call, *reactive, ctx)
        }
        Binding::ClassList { value, reactive } => {
            previous_value_stmt(&ctx.helper("classList"), node, value, *reactive, ctx)
        }
        Binding::Style { value, reactive } => {
            previous_value_stmt(&ctx.helper("style"), node, value, *reactive, ctx)
        }
        Binding::Delegate {
            event,
            handler,
            data,
        } => {
            let mut out = format!("{} = {};", member(node, &format!("$${}", event)), handler);
            if let Some(data) = data {
                out.push_str(&format!(
                    " {} = {};",
                    member(node, &format!("$${}Data", event)),
                    data
                ));
            }
            out
        }
        Binding::Listen {
            event,
            handler,
            data,
            capture,
        } => {
            let capture = if *capture { ", true" } else { "" };
            match data {
                Some(data) => {
                    let tmp = ctx.uid("d");
                    format!(
                        "const {tmp} = {data}; {node}.addEventListener({}, (_e$) => ({handler})({tmp}, _e$){capture});",
                        js_string(event)
                    )
                }
                None => format!(
                    "{}.addEventListener({}, {}{});",
                    node,
                    js_string(event),
                    handler,
                    capture
                ),
            }
        }
        Binding::Ref { value, kind } => match kind {
            RefKind::Call => format!("({})({});", value, node),
            RefKind::Assign => {
                let tmp = ctx.uid("ref");
                format!(
                    "const {tmp} = {value}; typeof {tmp} === \"function\" ? {tmp}({node}) : {value} = {node};"
                )
            }
            RefKind::Invoke => {
                let tmp = ctx.uid("ref");
                format!("const {tmp} = {value}; typeof {tmp} === \"function\" && {tmp}({node});")
            }
        },
        Binding::Use { directive, value } => format!(
            "{}({}, {}, () => {});",
            ctx.helper("use"),
            directive,
            node,
            value
        ),
        Binding::Spread {
            value,
            has_children,
        } => format!(
            "{}({}, {}, {});",
            ctx.helper("spread"),
            node,
            value,
            has_children
        ),
        Binding::Owner => format!("{}._$owner = {}();", node, ctx.helper("getOwner")),
    })
}

fn reactive_stmt(call: String, reactive: bool, ctx: &mut CompilationContext) -> String {
    if reactive {
        format!("{}(() => {});", ctx.effect(), call)
    } else {
        format!("{};", call)
    }
}

/// `classList` and `style` diff against the value they applied last time.
fn previous_value_stmt(
    helper: &str,
    node: &str,
    value: &str,
    reactive: bool,
    ctx: &mut CompilationContext,
) -> String {
    if reactive {
        format!(
            "{}((_p$) => {}({}, {}, _p$));",
            ctx.effect(),
            helper,
            node,
            value
        )
    } else {
        format!("{}({}, {});", helper, node, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_access() {
        assert_eq!(member("_el$", "$$click"), "_el$.$$click");
        assert_eq!(member("_el$", "aria-x"), "_el$[\"aria-x\"]");
    }

    #[test]
    fn test_prop_keys() {
        assert_eq!(prop_key("title"), "title");
        assert_eq!(prop_key("on:click"), "\"on:click\"");
        assert_eq!(prop_key("$$data"), "$$data");
        assert_eq!(prop_key("1st"), "\"1st\"");
    }
}
