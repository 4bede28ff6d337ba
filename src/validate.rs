//! Semantic validation of markup, run by the classifier when `validate` is on.
//!
//! These rules catch markup that would compile but misbehave at runtime:
//! attributes colliding with the runtime's own expando names, components where
//! only raw text is allowed, and nesting an HTML parser would rewrite (which
//! would silently shift every node path in the template).

use crate::error::{Result, TransformError};
use crate::markup::{AttributeItem, AttributeValue, ElementNode};
use lazy_static::lazy_static;
use std::collections::HashSet;

lazy_static! {
    /// Elements whose content the HTML parser treats as raw text.
    static ref RAW_TEXT_ELEMENTS: HashSet<&'static str> =
        ["script", "style", "textarea", "title"].into_iter().collect();

    /// Start tags that implicitly close an open `<p>`.
    static ref BLOCK_ELEMENTS: HashSet<&'static str> = [
        "address", "article", "aside", "blockquote", "details", "dialog", "div", "dl",
        "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
        "h6", "header", "hgroup", "hr", "main", "menu", "nav", "ol", "p", "pre", "section",
        "table", "ul",
    ]
    .into_iter()
    .collect();
}

/// Prefixes the runtime uses for its own properties on DOM nodes.
const RESERVED_PREFIXES: [&str; 2] = ["$$", "_$"];

/// Checks a host element against its open ancestors within the same template
/// (innermost last).
pub fn check_host(source: &str, el: &ElementNode, ancestors: &[&str]) -> Result<()> {
    for item in &el.attributes {
        let AttributeItem::Named(attr) = item else {
            continue;
        };
        if RESERVED_PREFIXES.iter().any(|p| attr.name.starts_with(p)) {
            return Err(TransformError::validation(
                source,
                attr.span,
                format!(
                    "attribute `{}` on <{}> uses a name reserved by the runtime",
                    attr.name, el.name
                ),
            ));
        }
        if let AttributeValue::Expression(expr) = &attr.value {
            if expr.markup {
                return Err(TransformError::validation(
                    source,
                    attr.span,
                    format!(
                        "attribute `{}` on <{}> cannot take markup as its value",
                        attr.full_name(),
                        el.name
                    ),
                ));
            }
        }
    }

    check_nesting(source, el, ancestors)
}

/// Checks a component reference against the host element it sits in.
pub fn check_component(source: &str, el: &ElementNode, ancestors: &[&str]) -> Result<()> {
    if let Some(parent) = ancestors.last() {
        if RAW_TEXT_ELEMENTS.contains(parent) {
            return Err(TransformError::validation(
                source,
                el.span,
                format!("component <{}> cannot appear inside <{}>", el.name, parent),
            ));
        }
    }
    Ok(())
}

fn check_nesting(source: &str, el: &ElementNode, ancestors: &[&str]) -> Result<()> {
    let tag = el.name.as_str();
    let parent = ancestors.last().copied();

    let violation = if BLOCK_ELEMENTS.contains(tag) && ancestors.contains(&"p") {
        Some("p")
    } else if matches!(tag, "a" | "button" | "form") && ancestors.contains(&tag) {
        Some(tag)
    } else if tag == "tr" && parent == Some("table") {
        Some("table")
    } else {
        None
    };

    match violation {
        Some(outer) => Err(TransformError::validation(
            source,
            el.span,
            format!(
                "<{}> cannot be nested in <{}>; the browser would restructure the template",
                tag, outer
            ),
        )),
        None => Ok(()),
    }
}
