//! Node classification.
//!
//! Walks one markup root and decides, node by node, what can be baked into a
//! template and what needs runtime code. The result borrows from the markup
//! tree and is never mutated by later passes.

use crate::config::Config;
use crate::error::{Result, TransformError};
use crate::markup::{
    AttributeItem, AttributeValue, ControlNode, ElementNode, Expr, Literal, MarkupNode, MarkupRoot,
    NameKind,
};
use crate::validate;
use lazy_static::lazy_static;
use oxc_span::Span;
use std::collections::HashSet;

lazy_static! {
    /// Attributes that native elements expose as writable properties.
    static ref PROPERTIES: HashSet<&'static str> = [
        "value", "checked", "selected", "muted", "indeterminate", "multiple", "readOnly",
        "disabled", "hidden", "open", "required", "autofocus", "autoplay", "controls", "loop",
        "innerHTML", "textContent", "innerText", "defaultValue", "defaultChecked",
    ]
    .into_iter()
    .collect();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    Static,
    Dynamic,
    Control,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    Native,
    /// Hyphenated tag or a configured built-in. Attributes stay attributes.
    Custom,
}

#[derive(Debug)]
pub enum ClassifiedRoot<'m> {
    Host(HostNode<'m>),
    Component(ComponentCall<'m>),
    Fragment(Vec<ClassifiedNode<'m>>),
}

impl<'m> ClassifiedRoot<'m> {
    /// Nothing to bind, insert or call: the root is pure static markup.
    pub fn is_inert(&self) -> bool {
        match self {
            ClassifiedRoot::Host(host) => host.class == NodeClass::Static,
            ClassifiedRoot::Component(_) => false,
            ClassifiedRoot::Fragment(children) => {
                children.iter().all(|c| c.class() == NodeClass::Static)
            }
        }
    }
}

#[derive(Debug)]
pub enum ClassifiedNode<'m> {
    Host(HostNode<'m>),
    Component(ComponentCall<'m>),
    Text(String),
    Slot(&'m Expr),
    Control(&'m ControlNode),
}

impl<'m> ClassifiedNode<'m> {
    pub fn class(&self) -> NodeClass {
        match self {
            ClassifiedNode::Host(host) => host.class,
            ClassifiedNode::Text(_) => NodeClass::Static,
            ClassifiedNode::Component(_) | ClassifiedNode::Slot(_) => NodeClass::Dynamic,
            ClassifiedNode::Control(_) => NodeClass::Control,
        }
    }
}

#[derive(Debug)]
pub struct HostNode<'m> {
    pub tag: &'m str,
    pub kind: HostKind,
    pub attrs: Vec<AttrBinding<'m>>,
    pub children: Vec<ClassifiedNode<'m>>,
    pub class: NodeClass,
    /// Receives `_$owner` so context reaches the custom element.
    pub owner_context: bool,
    pub span: Span,
}

impl<'m> HostNode<'m> {
    pub fn static_attrs(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.attrs.iter().filter_map(|attr| match attr {
            AttrBinding::Static { name, value } => Some((name.as_str(), value.as_deref())),
            _ => None,
        })
    }

    /// Needs a node reference after instantiation.
    pub fn has_bindings(&self) -> bool {
        self.owner_context || self.attrs.iter().any(|a| !a.is_static())
    }
}

#[derive(Debug)]
pub enum AttrBinding<'m> {
    /// Serialized into the template. `None` is a boolean attribute.
    Static {
        name: String,
        value: Option<String>,
    },
    Attribute {
        name: String,
        value: &'m Expr,
    },
    Property {
        name: String,
        value: &'m Expr,
    },
    ClassName(&'m Expr),
    ClassList(&'m Expr),
    Style(&'m Expr),
    Event {
        name: String,
        handler: &'m Expr,
        delegated: bool,
        capture: bool,
    },
    Ref(&'m Expr),
    Use {
        directive: String,
        value: &'m Expr,
    },
    Spread(&'m Expr),
}

impl<'m> AttrBinding<'m> {
    pub fn is_static(&self) -> bool {
        matches!(self, AttrBinding::Static { .. })
    }
}

#[derive(Debug)]
pub struct ComponentCall<'m> {
    pub name: &'m str,
    pub name_uses_this: bool,
    pub props: Vec<PropItem<'m>>,
    pub children: Vec<ClassifiedNode<'m>>,
    pub span: Span,
}

#[derive(Debug)]
pub enum PropItem<'m> {
    Named { name: String, value: PropValue<'m> },
    Spread(&'m Expr),
}

#[derive(Debug)]
pub enum PropValue<'m> {
    True,
    Literal(&'m str),
    Expression(&'m Expr),
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLASSIFIER
// ═══════════════════════════════════════════════════════════════════════════════

pub fn classify<'m>(
    root: &'m MarkupRoot,
    source: &str,
    config: &Config,
) -> Result<ClassifiedRoot<'m>> {
    let mut classifier = Classifier {
        source,
        config,
        ancestors: Vec::new(),
    };
    match root {
        MarkupRoot::Element(el) if classifier.is_component(el) => {
            Ok(ClassifiedRoot::Component(classifier.component(el)?))
        }
        MarkupRoot::Element(el) => Ok(ClassifiedRoot::Host(classifier.host(el)?)),
        MarkupRoot::Fragment(frag) => Ok(ClassifiedRoot::Fragment(
            classifier.children(&frag.children)?,
        )),
    }
}

struct Classifier<'c> {
    source: &'c str,
    config: &'c Config,
    /// Open host tags of the template being classified, innermost last.
    ancestors: Vec<String>,
}

impl<'c> Classifier<'c> {
    fn is_component(&self, el: &ElementNode) -> bool {
        if self.config.is_built_in(&el.name) {
            return false;
        }
        match el.name_kind {
            NameKind::Reference | NameKind::Member | NameKind::This => true,
            NameKind::Tag | NameKind::Namespaced => {
                el.name.chars().next().map_or(false, |c| c.is_ascii_uppercase())
            }
        }
    }

    fn ancestor_refs(&self) -> Vec<&str> {
        self.ancestors.iter().map(String::as_str).collect()
    }

    fn element<'m>(&mut self, el: &'m ElementNode) -> Result<ClassifiedNode<'m>> {
        if self.is_component(el) {
            Ok(ClassifiedNode::Component(self.component(el)?))
        } else {
            Ok(ClassifiedNode::Host(self.host(el)?))
        }
    }

    fn component<'m>(&mut self, el: &'m ElementNode) -> Result<ComponentCall<'m>> {
        if self.config.validate {
            validate::check_component(self.source, el, &self.ancestor_refs())?;
        }
        // Component children become their own templates.
        let saved = std::mem::take(&mut self.ancestors);
        let children = self.children(&el.children);
        self.ancestors = saved;

        Ok(ComponentCall {
            name: &el.name,
            name_uses_this: el.name_uses_this(),
            props: self.props(el)?,
            children: children?,
            span: el.span,
        })
    }

    fn host<'m>(&mut self, el: &'m ElementNode) -> Result<HostNode<'m>> {
        if self.config.validate {
            validate::check_host(self.source, el, &self.ancestor_refs())?;
        }

        let kind = if el.name.contains('-') || self.config.is_built_in(&el.name) {
            HostKind::Custom
        } else {
            HostKind::Native
        };
        let attrs = self.attributes(el, kind)?;

        self.ancestors.push(el.name.clone());
        let children = self.children(&el.children);
        self.ancestors.pop();
        let children = children?;

        let class = if attrs.iter().all(AttrBinding::is_static)
            && children.iter().all(|c| c.class() == NodeClass::Static)
        {
            NodeClass::Static
        } else {
            NodeClass::Dynamic
        };
        let owner_context = kind == HostKind::Custom && self.config.context_to_custom_elements;

        Ok(HostNode {
            tag: &el.name,
            kind,
            attrs,
            children,
            class: if owner_context { NodeClass::Dynamic } else { class },
            owner_context,
            span: el.span,
        })
    }

    fn children<'m>(&mut self, children: &'m [MarkupNode]) -> Result<Vec<ClassifiedNode<'m>>> {
        let mut out: Vec<ClassifiedNode<'m>> = Vec::with_capacity(children.len());
        for child in children {
            let node = match child {
                MarkupNode::Element(el) => self.element(el)?,
                MarkupNode::Text(text) => ClassifiedNode::Text(text.value.clone()),
                MarkupNode::Slot(slot) => match &slot.expr.literal {
                    Some(Literal::Str(s)) | Some(Literal::Num(s)) => ClassifiedNode::Text(s.clone()),
                    // Booleans render nothing.
                    Some(Literal::Bool(_)) => continue,
                    None => ClassifiedNode::Slot(&slot.expr),
                },
                MarkupNode::Control(ctrl) if ctrl.whole.once => ClassifiedNode::Slot(&ctrl.whole),
                MarkupNode::Control(ctrl) => ClassifiedNode::Control(ctrl),
            };

            // Adjacent text collapses into one DOM text node.
            if let ClassifiedNode::Text(text) = &node {
                if let Some(ClassifiedNode::Text(prev)) = out.last_mut() {
                    prev.push_str(text);
                    continue;
                }
            }
            out.push(node);
        }
        Ok(out)
    }

    fn props<'m>(&self, el: &'m ElementNode) -> Result<Vec<PropItem<'m>>> {
        check_spreads(self.source, el)?;
        Ok(el
            .attributes
            .iter()
            .map(|item| match item {
                AttributeItem::Spread(expr) => PropItem::Spread(expr),
                AttributeItem::Named(attr) => PropItem::Named {
                    name: attr.full_name(),
                    value: match &attr.value {
                        AttributeValue::Implicit => PropValue::True,
                        AttributeValue::Literal(s) => PropValue::Literal(s),
                        AttributeValue::Expression(expr) => PropValue::Expression(expr),
                    },
                },
            })
            .collect())
    }

    fn attributes<'m>(&self, el: &'m ElementNode, kind: HostKind) -> Result<Vec<AttrBinding<'m>>> {
        check_spreads(self.source, el)?;

        let mut out = Vec::new();
        let mut literal_names: HashSet<String> = HashSet::new();
        for item in &el.attributes {
            let attr = match item {
                AttributeItem::Spread(expr) => {
                    out.push(AttrBinding::Spread(expr));
                    continue;
                }
                AttributeItem::Named(attr) => attr,
            };

            let binding = self.attribute(
                attr.namespace.as_deref(),
                &attr.name,
                &attr.value,
                kind,
                attr.span,
            )?;
            let Some(binding) = binding else {
                continue;
            };
            if let AttrBinding::Static { name, .. } = &binding {
                if !literal_names.insert(name.clone()) {
                    return Err(TransformError::structural(
                        self.source,
                        attr.span,
                        format!("attribute `{}` is repeated on <{}>", name, el.name),
                    ));
                }
            }
            out.push(binding);
        }
        Ok(out)
    }

    fn attribute<'m>(
        &self,
        namespace: Option<&str>,
        name: &str,
        value: &'m AttributeValue,
        kind: HostKind,
        span: Span,
    ) -> Result<Option<AttrBinding<'m>>> {
        let expr = match value {
            AttributeValue::Expression(expr) => Some(expr),
            _ => None,
        };

        match namespace {
            Some("on") => return self.event(name, value, false, false, span).map(Some),
            Some("oncapture") => return self.event(name, value, false, true, span).map(Some),
            Some("use") => {
                return match expr {
                    Some(value) => Ok(Some(AttrBinding::Use {
                        directive: name.to_string(),
                        value,
                    })),
                    None => Err(TransformError::unsupported(
                        self.source,
                        span,
                        format!("use:{}", name),
                        "directives need an expression value",
                    )),
                }
            }
            Some("prop") => {
                return Ok(match expr.filter(|e| e.literal.is_none()) {
                    Some(value) => Some(AttrBinding::Property {
                        name: name.to_string(),
                        value,
                    }),
                    None => static_attr(name.to_string(), value),
                })
            }
            Some("attr") => return Ok(self.plain(name.to_string(), value, HostKind::Custom)),
            Some(ns) => return Ok(self.plain(format!("{}:{}", ns, name), value, kind)),
            None => {}
        }

        if name == "ref" {
            return match expr {
                Some(value) => Ok(Some(AttrBinding::Ref(value))),
                None => Err(TransformError::unsupported(
                    self.source,
                    span,
                    "ref",
                    "ref needs an expression value",
                )),
            };
        }

        if let Some(event) = name.strip_prefix("on") {
            if event.chars().next().map_or(false, |c| c.is_ascii_uppercase()) {
                let event = event.to_ascii_lowercase();
                let delegated = self.config.is_delegated(&event);
                return self.event(&event, value, delegated, false, span).map(Some);
            }
        }

        let dynamic = expr.filter(|e| e.literal.is_none());
        Ok(match name {
            "class" | "className" => match dynamic {
                Some(value) => Some(AttrBinding::ClassName(value)),
                None => static_attr("class".to_string(), value),
            },
            "classList" => match dynamic {
                Some(value) => Some(AttrBinding::ClassList(value)),
                None => {
                    return Err(TransformError::unsupported(
                        self.source,
                        span,
                        "classList",
                        "classList needs an object expression",
                    ))
                }
            },
            "style" => match dynamic {
                Some(value) => Some(AttrBinding::Style(value)),
                None => static_attr("style".to_string(), value),
            },
            "htmlFor" => self.plain("for".to_string(), value, kind),
            _ => self.plain(name.to_string(), value, kind),
        })
    }

    fn plain<'m>(
        &self,
        name: String,
        value: &'m AttributeValue,
        kind: HostKind,
    ) -> Option<AttrBinding<'m>> {
        match value {
            AttributeValue::Expression(expr) if expr.literal.is_none() => {
                if kind == HostKind::Native && PROPERTIES.contains(name.as_str()) {
                    Some(AttrBinding::Property { name, value: expr })
                } else {
                    Some(AttrBinding::Attribute { name, value: expr })
                }
            }
            _ => static_attr(name, value),
        }
    }

    fn event<'m>(
        &self,
        name: &str,
        value: &'m AttributeValue,
        delegated: bool,
        capture: bool,
        span: Span,
    ) -> Result<AttrBinding<'m>> {
        let attribute = if capture {
            format!("oncapture:{}", name)
        } else {
            format!("on:{}", name)
        };
        if name.is_empty() {
            return Err(TransformError::unsupported(
                self.source,
                span,
                attribute,
                "event name is empty",
            ));
        }
        match value {
            AttributeValue::Expression(handler) if handler.literal.is_none() => {
                Ok(AttrBinding::Event {
                    name: name.to_string(),
                    handler,
                    delegated,
                    capture,
                })
            }
            AttributeValue::Implicit => Err(TransformError::unsupported(
                self.source,
                span,
                attribute,
                "event handlers need a value",
            )),
            _ => Err(TransformError::unsupported(
                self.source,
                span,
                attribute,
                "event handlers must be expressions, not literals",
            )),
        }
    }
}

/// Folds a literal attribute value into a template attribute; `false` drops it.
fn static_attr<'m>(name: String, value: &AttributeValue) -> Option<AttrBinding<'m>> {
    let value = match value {
        AttributeValue::Implicit => None,
        AttributeValue::Literal(s) => Some(s.clone()),
        AttributeValue::Expression(expr) => match &expr.literal {
            Some(Literal::Str(s)) | Some(Literal::Num(s)) => Some(s.clone()),
            Some(Literal::Bool(true)) => None,
            Some(Literal::Bool(false)) | None => return None,
        },
    };
    Some(AttrBinding::Static { name, value })
}

fn check_spreads(source: &str, el: &ElementNode) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    for item in &el.attributes {
        if let AttributeItem::Spread(expr) = item {
            if !seen.insert(expr.span.source_text(source)) {
                return Err(TransformError::structural(
                    source,
                    expr.span,
                    format!("<{}> spreads the same props twice", el.name),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::collect_roots;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn roots(source: &str) -> Vec<MarkupRoot> {
        let allocator = Allocator::default();
        let source_type = SourceType::default().with_jsx(true).with_module(true);
        let ret = Parser::new(&allocator, source, source_type).parse();
        collect_roots(&ret.program, source, "@once").unwrap()
    }

    fn host<'a, 'm>(root: &'a ClassifiedRoot<'m>) -> &'a HostNode<'m> {
        match root {
            ClassifiedRoot::Host(host) => host,
            other => panic!("expected host, got {:?}", other),
        }
    }

    #[test]
    fn test_static_element() {
        let source = r#"<div id="a" hidden>Hello <b>world</b></div>"#;
        let found = roots(source);
        let classified = classify(&found[0], source, &Config::default()).unwrap();
        assert!(classified.is_inert());
        let attrs: Vec<_> = host(&classified).static_attrs().collect();
        assert_eq!(attrs, vec![("id", Some("a")), ("hidden", None)]);
    }

    #[test]
    fn test_literal_folding_merges_text() {
        let source = r#"<p>a{"b"}{1}{false}c</p>"#;
        let found = roots(source);
        let classified = classify(&found[0], source, &Config::default()).unwrap();
        let children = &host(&classified).children;
        assert_eq!(children.len(), 1);
        assert!(matches!(&children[0], ClassifiedNode::Text(t) if t == "ab1c"));
        assert!(classified.is_inert());
    }

    #[test]
    fn test_attribute_kinds() {
        let source = r#"<input value={v()} class={c} classList={{a: b}} style={s} aria-x={x} onClick={h} on:Custom={h} />"#;
        let found = roots(source);
        let classified = classify(&found[0], source, &Config::default()).unwrap();
        let attrs = &host(&classified).attrs;
        assert!(matches!(&attrs[0], AttrBinding::Property { name, .. } if name == "value"));
        assert!(matches!(&attrs[1], AttrBinding::ClassName(_)));
        assert!(matches!(&attrs[2], AttrBinding::ClassList(_)));
        assert!(matches!(&attrs[3], AttrBinding::Style(_)));
        assert!(matches!(&attrs[4], AttrBinding::Attribute { name, .. } if name == "aria-x"));
        assert!(matches!(&attrs[5], AttrBinding::Event { name, delegated: true, .. } if name == "click"));
        assert!(matches!(&attrs[6], AttrBinding::Event { name, delegated: false, .. } if name == "Custom"));
    }

    #[test]
    fn test_custom_elements_never_use_properties() {
        let source = r#"<my-input value={v()} />"#;
        let found = roots(source);
        let classified = classify(&found[0], source, &Config::default()).unwrap();
        let h = host(&classified);
        assert_eq!(h.kind, HostKind::Custom);
        assert!(matches!(&h.attrs[0], AttrBinding::Attribute { name, .. } if name == "value"));
    }

    #[test]
    fn test_built_ins_are_hosts() {
        let source = r#"<Widget value={v} />"#;
        let found = roots(source);
        let config = Config {
            built_ins: vec!["Widget".to_string()],
            ..Config::default()
        };
        let classified = classify(&found[0], source, &config).unwrap();
        assert_eq!(host(&classified).kind, HostKind::Custom);

        let classified = classify(&found[0], source, &Config::default()).unwrap();
        assert!(matches!(classified, ClassifiedRoot::Component(_)));
    }

    #[test]
    fn test_control_children() {
        let source = r#"<div>{a ? b : c}{/*@once*/ a ? b : c}</div>"#;
        let found = roots(source);
        let classified = classify(&found[0], source, &Config::default()).unwrap();
        let children = &host(&classified).children;
        assert_eq!(children[0].class(), NodeClass::Control);
        assert!(matches!(children[1], ClassifiedNode::Slot(_)));
        assert_eq!(host(&classified).class, NodeClass::Dynamic);
    }

    #[test]
    fn test_structural_errors() {
        let source = r#"<div {...p} {...p} />"#;
        let found = roots(source);
        let err = classify(&found[0], source, &Config::default()).unwrap_err();
        assert_eq!(err.code(), "JSX-STRUCT");

        let source = r#"<div id="a" id="b" />"#;
        let found = roots(source);
        let err = classify(&found[0], source, &Config::default()).unwrap_err();
        assert_eq!(err.code(), "JSX-STRUCT");
    }

    #[test]
    fn test_unsupported_events() {
        for source in [r#"<div onClick />"#, r#"<div onClick="go()" />"#, r#"<div ref />"#, r#"<div classList="a" />"#] {
            let found = roots(source);
            let err = classify(&found[0], source, &Config::default()).unwrap_err();
            assert_eq!(err.code(), "JSX-BINDING", "{}", source);
        }
    }

    #[test]
    fn test_validation_respects_flag() {
        let source = r#"<p><div /></p>"#;
        let found = roots(source);
        assert!(classify(&found[0], source, &Config::default()).is_err());
        let config = Config {
            validate: false,
            ..Config::default()
        };
        assert!(classify(&found[0], source, &config).is_ok());
    }
}
