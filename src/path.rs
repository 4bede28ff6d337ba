//! Path resolution.
//!
//! Every dynamic site in a template gets a path: child indices from the
//! template root, counted over the DOM nodes the serialized template parses
//! into (text and marker comments included). Paths are the same for cloned
//! and hydrated nodes; only the node walk differs, in the end markers it is
//! told to scan for.

use crate::classify::{AttrBinding, ClassifiedNode, HostNode};
use crate::context::CompilationContext;
use crate::template::{plan_children, ChildPlan};
use std::collections::{BTreeSet, HashMap};

pub type NodePath = Vec<usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteKind {
    /// Expression inserted as content.
    Text,
    Attribute,
    Event,
    /// Conditional or list content.
    ChildInsertion,
    ComponentCall,
    /// Owner hand-off to a custom element.
    Context,
}

#[derive(Debug)]
pub enum SiteTarget<'a, 'm> {
    Attr {
        binding: &'a AttrBinding<'m>,
        host: &'a HostNode<'m>,
    },
    Owner,
    Insert {
        node: &'a ClassifiedNode<'m>,
        parent: NodePath,
        /// Node right before the inserted content; `None` when it starts the parent.
        anchor: Option<NodePath>,
        /// `path` points at an end marker rather than the parent's first child.
        has_marker: bool,
    },
}

#[derive(Debug)]
pub struct BindingSite<'a, 'm> {
    pub path: NodePath,
    pub kind: SiteKind,
    pub target: SiteTarget<'a, 'm>,
}

/// Sites of one template in left-to-right depth-first order.
pub fn resolve<'a, 'm>(root: &'a HostNode<'m>) -> Vec<BindingSite<'a, 'm>> {
    let mut sites = Vec::new();
    walk(root, Vec::new(), &mut sites);
    sites
}

fn walk<'a, 'm>(host: &'a HostNode<'m>, path: NodePath, out: &mut Vec<BindingSite<'a, 'm>>) {
    for binding in host.attrs.iter().filter(|a| !a.is_static()) {
        let kind = match binding {
            AttrBinding::Event { .. } => SiteKind::Event,
            _ => SiteKind::Attribute,
        };
        out.push(BindingSite {
            path: path.clone(),
            kind,
            target: SiteTarget::Attr { binding, host },
        });
    }
    if host.owner_context {
        out.push(BindingSite {
            path: path.clone(),
            kind: SiteKind::Context,
            target: SiteTarget::Owner,
        });
    }

    let child = |index: usize| {
        let mut p = path.clone();
        p.push(index);
        p
    };

    let mut index = 0;
    for plan in plan_children(&host.children) {
        match plan {
            ChildPlan::Element(el) => {
                walk(el, child(index), out);
                index += 1;
            }
            ChildPlan::Text(_) => index += 1,
            ChildPlan::Insert { node, split, end } => {
                let anchor = if split {
                    Some(child(index))
                } else if index > 0 {
                    Some(child(index - 1))
                } else {
                    None
                };
                if split {
                    index += 1;
                }
                let site_path = child(index);
                if end {
                    index += 1;
                }
                let kind = match node {
                    ClassifiedNode::Slot(_) => SiteKind::Text,
                    ClassifiedNode::Component(_) => SiteKind::ComponentCall,
                    _ => SiteKind::ChildInsertion,
                };
                out.push(BindingSite {
                    path: site_path,
                    kind,
                    target: SiteTarget::Insert {
                        node,
                        parent: path.clone(),
                        anchor,
                        has_marker: end,
                    },
                });
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODE WALK
// ═══════════════════════════════════════════════════════════════════════════════

/// Variable names for the template nodes generated code touches.
#[derive(Debug)]
pub struct NodeRefs {
    names: HashMap<NodePath, String>,
    /// Nodes claimed ahead of a scanned marker, keyed by the marker path.
    claimed: HashMap<NodePath, String>,
    /// `(binding, initializer)` in declaration order, root first.
    pub decls: Vec<(String, String)>,
}

impl NodeRefs {
    pub fn get(&self, path: &[usize]) -> Option<&str> {
        self.names.get(path).map(String::as_str)
    }

    pub fn claimed(&self, marker: &[usize]) -> Option<&str> {
        self.claimed.get(marker).map(String::as_str)
    }
}

/// Declares the root plus every requested path and its ancestors. Each node is
/// reached from the closest declared previous sibling, or from its parent's
/// `firstChild`.
///
/// Paths in `scanned` are end markers of claimed insertions. Server-rendered
/// content sits in front of them, so they are found with `getNextMarker`
/// starting at the node after the anchor, and later siblings chain from the
/// marker that was found.
pub fn walk_nodes(
    root_init: String,
    paths: impl IntoIterator<Item = NodePath>,
    scanned: &BTreeSet<NodePath>,
    ctx: &mut CompilationContext,
) -> NodeRefs {
    let mut needed: BTreeSet<NodePath> = BTreeSet::new();
    for path in paths.into_iter().chain(scanned.iter().cloned()) {
        for len in 1..=path.len() {
            needed.insert(path[..len].to_vec());
        }
    }

    let root = ctx.uid("el");
    let mut names: HashMap<NodePath, String> = HashMap::new();
    let mut claimed: HashMap<NodePath, String> = HashMap::new();
    let mut decls = vec![(root.clone(), root_init)];
    names.insert(Vec::new(), root);

    // parent path -> (index, name) of the last declared child
    let mut last_child: HashMap<NodePath, (usize, String)> = HashMap::new();
    for path in needed {
        let (index, parent) = match path.split_last() {
            Some((index, parent)) => (*index, parent.to_vec()),
            None => continue,
        };

        let start = match last_child.get(&parent) {
            Some((prev, name)) => format!("{}{}", name, ".nextSibling".repeat(index - prev)),
            None => {
                let parent_name = names.get(&parent).cloned().unwrap_or_default();
                format!("{}.firstChild{}", parent_name, ".nextSibling".repeat(index))
            }
        };

        let name = ctx.uid("el");
        if scanned.contains(&path) {
            let nodes = ctx.uid("co");
            let init = format!("{}({})", ctx.helper("getNextMarker"), start);
            decls.push((format!("[{}, {}]", name, nodes), init));
            claimed.insert(path.clone(), nodes);
        } else {
            decls.push((name.clone(), start));
        }
        last_child.insert(parent, (index, name.clone()));
        names.insert(path, name);
    }

    NodeRefs {
        names,
        claimed,
        decls,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify, ClassifiedRoot};
    use crate::config::Config;
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

    fn site_paths(source: &str) -> Vec<(NodePath, SiteKind)> {
        let found = roots(source);
        let classified = classify(&found[0], source, &Config::default()).unwrap();
        let ClassifiedRoot::Host(host) = classified else {
            panic!("expected host");
        };
        resolve(&host)
            .into_iter()
            .map(|site| (site.path, site.kind))
            .collect()
    }

    #[test]
    fn test_sole_child_uses_first_child() {
        assert_eq!(site_paths("<p>{a}</p>"), vec![(vec![0], SiteKind::Text)]);
    }

    #[test]
    fn test_paths_count_text_and_markers() {
        // <div>Hi <!><!><b></b><!></div>
        let sites = site_paths(r#"<div id={x}>Hi {a}<b onClick={h} />{c ? d : e}</div>"#);
        assert_eq!(
            sites,
            vec![
                (vec![], SiteKind::Attribute),
                (vec![2], SiteKind::Text),
                (vec![3], SiteKind::Event),
                (vec![4], SiteKind::ChildInsertion),
            ]
        );
    }

    #[test]
    fn test_components_are_sites() {
        let sites = site_paths("<ul><li/><Item/></ul>");
        assert_eq!(sites, vec![(vec![1], SiteKind::ComponentCall)]);
    }

    #[test]
    fn test_anchor_is_split_marker_or_previous_sibling() {
        let source = "<p>Hi {a}<b/>{c}</p>";
        let found = roots(source);
        let ClassifiedRoot::Host(host) = classify(&found[0], source, &Config::default()).unwrap()
        else {
            panic!("expected host");
        };
        let anchors: Vec<Option<NodePath>> = resolve(&host)
            .into_iter()
            .map(|site| match site.target {
                SiteTarget::Insert { anchor, .. } => anchor,
                _ => panic!("expected insert"),
            })
            .collect();
        assert_eq!(anchors, vec![Some(vec![1]), Some(vec![3])]);
    }

    #[test]
    fn test_walk_reuses_siblings() {
        let config = Config::default();
        let mut ctx = CompilationContext::new("", &config);
        let refs = walk_nodes(
            "_tmpl$()".to_string(),
            vec![vec![0, 1], vec![2]],
            &BTreeSet::new(),
            &mut ctx,
        );
        assert_eq!(
            refs.decls,
            vec![
                ("_el$".to_string(), "_tmpl$()".to_string()),
                ("_el$2".to_string(), "_el$.firstChild".to_string()),
                ("_el$3".to_string(), "_el$2.firstChild.nextSibling".to_string()),
                ("_el$4".to_string(), "_el$2.nextSibling.nextSibling".to_string()),
            ]
        );
        assert_eq!(refs.get(&[2]), Some("_el$4"));
        assert_eq!(refs.get(&[]), Some("_el$"));
    }

    #[test]
    fn test_walk_chains_from_scanned_marker() {
        let config = Config::default();
        let mut ctx = CompilationContext::new("", &config);
        let scanned: BTreeSet<NodePath> = [vec![2]].into_iter().collect();
        let refs = walk_nodes(
            "_tmpl$()".to_string(),
            vec![vec![1], vec![3]],
            &scanned,
            &mut ctx,
        );
        assert_eq!(
            refs.decls,
            vec![
                ("_el$".to_string(), "_tmpl$()".to_string()),
                ("_el$2".to_string(), "_el$.firstChild.nextSibling".to_string()),
                (
                    "[_el$3, _co$]".to_string(),
                    "getNextMarker(_el$2.nextSibling)".to_string()
                ),
                ("_el$4".to_string(), "_el$3.nextSibling".to_string()),
            ]
        );
        assert_eq!(refs.get(&[2]), Some("_el$3"));
        assert_eq!(refs.claimed(&[2]), Some("_co$"));
        assert_eq!(refs.claimed(&[3]), None);
    }
}
