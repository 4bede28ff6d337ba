//! Template extraction.
//!
//! Serializes the static frame of a host element into the HTML string handed
//! to the runtime's `template()` helper, and keeps the per-call registry that
//! deduplicates identical strings.
//!
//! Marker placement lives here too ([`plan_children`]) because the serialized
//! string and the node paths computed in `path` must agree node for node.

use crate::classify::{ClassifiedNode, HostNode};
use crate::config::Config;
use crate::context::js_string;
use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

/// Comment node the runtime inserts content before, or that keeps two text
/// nodes from merging when the template is parsed.
pub const MARKER: &str = "<!>";

lazy_static! {
    static ref VOID_ELEMENTS: HashSet<&'static str> = [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr",
    ]
    .into_iter()
    .collect();

    /// SVG elements that cannot start an HTML template on their own. `svg`
    /// itself and the names shared with HTML (`a`, `title`, ...) are left out.
    static ref SVG_ELEMENTS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("path");
        s.insert("circle");
        s.insert("ellipse");
        s.insert("line");
        s.insert("polyline");
        s.insert("polygon");
        s.insert("rect");
        s.insert("g");
        s.insert("defs");
        s.insert("use");
        s.insert("symbol");
        s.insert("clippath");
        s.insert("mask");
        s.insert("pattern");
        s.insert("marker");
        s.insert("lineargradient");
        s.insert("radialgradient");
        s.insert("stop");
        s.insert("filter");
        s.insert("feblend");
        s.insert("fecolormatrix");
        s.insert("fecomposite");
        s.insert("feflood");
        s.insert("fegaussianblur");
        s.insert("feimage");
        s.insert("femerge");
        s.insert("femergenode");
        s.insert("feoffset");
        s.insert("feturbulence");
        s.insert("foreignobject");
        s.insert("image");
        s.insert("text");
        s.insert("tspan");
        s.insert("textpath");
        s.insert("desc");
        s.insert("metadata");
        s.insert("view");
        s.insert("animate");
        s.insert("animatemotion");
        s.insert("animatetransform");
        s.insert("set");
        s.insert("mpath");
        s
    };

    static ref RAW_TEXT_PARENTS: HashSet<&'static str> =
        ["script", "style"].into_iter().collect();
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHILD PLAN
// ═══════════════════════════════════════════════════════════════════════════════

/// How one classified child shows up among its parent's DOM children.
#[derive(Debug)]
pub enum ChildPlan<'a, 'm> {
    Element(&'a HostNode<'m>),
    Text(&'a str),
    /// Runtime insertion. `split` puts a marker before the site (the previous
    /// node is text), `end` puts one after it (the site is not the only child).
    Insert {
        node: &'a ClassifiedNode<'m>,
        split: bool,
        end: bool,
    },
}

impl<'a, 'm> ChildPlan<'a, 'm> {
    /// Number of DOM nodes this child contributes to the parsed template.
    pub fn dom_len(&self) -> usize {
        match self {
            ChildPlan::Element(_) | ChildPlan::Text(_) => 1,
            ChildPlan::Insert { split, end, .. } => *split as usize + *end as usize,
        }
    }
}

pub fn plan_children<'a, 'm>(children: &'a [ClassifiedNode<'m>]) -> Vec<ChildPlan<'a, 'm>> {
    let sole = children.len() == 1;
    let mut after_text = false;
    children
        .iter()
        .map(|child| {
            let plan = match child {
                ClassifiedNode::Host(host) => ChildPlan::Element(host),
                ClassifiedNode::Text(text) => ChildPlan::Text(text),
                _ => ChildPlan::Insert {
                    node: child,
                    split: after_text,
                    end: !sole,
                },
            };
            after_text = matches!(plan, ChildPlan::Text(_));
            plan
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERIALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateHtml {
    pub html: String,
    /// Root must be created in the SVG namespace.
    pub is_svg: bool,
}

pub fn extract(host: &HostNode, config: &Config) -> TemplateHtml {
    let mut html = String::new();
    write_element(&mut html, host, config.omit_nested_closing_tags);
    TemplateHtml {
        html,
        is_svg: SVG_ELEMENTS.contains(host.tag.to_ascii_lowercase().as_str()),
    }
}

/// `trailing` is true along the last-child chain starting at the root, whose
/// closing tags may be dropped.
fn write_element(out: &mut String, host: &HostNode, trailing: bool) {
    out.push('<');
    out.push_str(host.tag);
    for (name, value) in host.static_attrs() {
        out.push(' ');
        out.push_str(name);
        if let Some(value) = value {
            out.push_str("=\"");
            out.push_str(&html_escape::encode_double_quoted_attribute(value));
            out.push('"');
        }
    }
    out.push('>');

    if VOID_ELEMENTS.contains(host.tag) {
        return;
    }

    let raw_text = RAW_TEXT_PARENTS.contains(host.tag);
    let plans = plan_children(&host.children);
    let last = plans.len().saturating_sub(1);
    for (i, plan) in plans.iter().enumerate() {
        match plan {
            ChildPlan::Element(child) => write_element(out, child, trailing && i == last),
            ChildPlan::Text(text) if raw_text => out.push_str(text),
            ChildPlan::Text(text) => out.push_str(&html_escape::encode_text(text)),
            ChildPlan::Insert { split, end, .. } => {
                if *split {
                    out.push_str(MARKER);
                }
                if *end {
                    out.push_str(MARKER);
                }
            }
        }
    }

    if !trailing {
        out.push_str("</");
        out.push_str(host.tag);
        out.push('>');
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub id: String,
    pub html: String,
    pub is_svg: bool,
}

/// Deduplicates templates by their serialized string and hands out ids in
/// first-use order.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    prefix: String,
    entries: Vec<Template>,
    index: HashMap<String, usize>,
}

impl TemplateRegistry {
    pub fn new(prefix: String) -> Self {
        Self {
            prefix,
            ..Self::default()
        }
    }

    pub fn register(&mut self, template: TemplateHtml) -> String {
        if let Some(&i) = self.index.get(&template.html) {
            return self.entries[i].id.clone();
        }

        let n = self.entries.len() + 1;
        let base = if self.prefix.is_empty() {
            "_tmpl$".to_string()
        } else {
            format!("_{}$tmpl", self.prefix)
        };
        let id = if n == 1 { base } else { format!("{}{}", base, n) };

        tracing::trace!(id = %id, html = %template.html, "registered template");
        self.index.insert(template.html.clone(), self.entries.len());
        self.entries.push(Template {
            id: id.clone(),
            html: template.html,
            is_svg: template.is_svg,
        });
        id
    }

    pub fn templates(&self) -> &[Template] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `const _tmpl$ = template("..."), ...;`
    pub fn declarations(&self, template_helper: &str) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let decls: Vec<String> = self
            .entries
            .iter()
            .map(|t| {
                let svg = if t.is_svg { ", true" } else { "" };
                format!("{} = {}({}{})", t.id, template_helper, js_string(&t.html), svg)
            })
            .collect();
        Some(format!("const {};", decls.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify, ClassifiedRoot};
    use crate::markup::{collect_roots, MarkupRoot};
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;
    use pretty_assertions::assert_eq;

    fn roots(source: &str) -> Vec<MarkupRoot> {
        let allocator = Allocator::default();
        let source_type = SourceType::default().with_jsx(true).with_module(true);
        let ret = Parser::new(&allocator, source, source_type).parse();
        collect_roots(&ret.program, source, "@once").unwrap()
    }

    fn html(source: &str, config: &Config) -> TemplateHtml {
        let found = roots(source);
        match classify(&found[0], source, config).unwrap() {
            ClassifiedRoot::Host(host) => extract(&host, config),
            other => panic!("expected host, got {:?}", other),
        }
    }

    #[test]
    fn test_static_serialization() {
        let out = html(
            r#"<div class="a&b" hidden><input type="text"/><span>1 &lt; 2</span></div>"#,
            &Config::default(),
        );
        assert_eq!(
            out.html,
            r#"<div class="a&amp;b" hidden><input type="text"><span>1 &lt; 2</span></div>"#
        );
        assert!(!out.is_svg);
    }

    #[test]
    fn test_markers() {
        let config = Config::default();
        assert_eq!(html("<p>{a}</p>", &config).html, "<p></p>");
        assert_eq!(html("<p>Hi {a}</p>", &config).html, "<p>Hi <!><!></p>");
        assert_eq!(html("<p>{a}{b}<b/></p>", &config).html, "<p><!><!><b></b></p>");
        assert_eq!(html("<p><b/>{a} x</p>", &config).html, "<p><b></b><!> x</p>");
    }

    #[test]
    fn test_omit_nested_closing_tags() {
        let config = Config {
            omit_nested_closing_tags: true,
            ..Config::default()
        };
        assert_eq!(
            html("<div><span>a</span><ul><li>b</li></ul></div>", &config).html,
            "<div><span>a</span><ul><li>b"
        );
    }

    #[test]
    fn test_svg_roots() {
        assert!(html("<rect x={x}/>", &Config::default()).is_svg);
        assert!(!html("<svg><rect/></svg>", &Config::default()).is_svg);
    }

    #[test]
    fn test_registry_dedups_and_names() {
        let mut registry = TemplateRegistry::new("once".to_string());
        let a = registry.register(TemplateHtml {
            html: "<span></span>".to_string(),
            is_svg: false,
        });
        let b = registry.register(TemplateHtml {
            html: "<b></b>".to_string(),
            is_svg: false,
        });
        let c = registry.register(TemplateHtml {
            html: "<span></span>".to_string(),
            is_svg: false,
        });
        assert_eq!(a, "_once$tmpl");
        assert_eq!(b, "_once$tmpl2");
        assert_eq!(a, c);
        assert_eq!(registry.templates().len(), 2);
        assert_eq!(
            registry.declarations("template").unwrap(),
            r#"const _once$tmpl = template("<span></span>"), _once$tmpl2 = template("<b></b>");"#
        );

        let mut bare = TemplateRegistry::new(String::new());
        let id = bare.register(TemplateHtml {
            html: "<i></i>".to_string(),
            is_svg: true,
        });
        assert_eq!(id, "_tmpl$");
        assert_eq!(
            bare.declarations("t").unwrap(),
            r#"const _tmpl$ = t("<i></i>", true);"#
        );
    }
}
