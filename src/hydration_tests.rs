use crate::classify::{classify, ClassifiedRoot};
use crate::config::Config;
use crate::context::CompilationContext;
use crate::emit::{emit_template, render_unit, Acquire};
use crate::hydrate;
use crate::markup::{collect_roots, MarkupRoot};
use crate::path::{NodePath, SiteKind};
use crate::transform;
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

/// Template strings and site paths of the first root, with or without hydration.
fn layout(source: &str, hydratable: bool) -> (Vec<String>, Vec<(NodePath, SiteKind)>) {
    let config = Config {
        hydratable,
        ..Config::default()
    };
    let found = roots(source);
    let ClassifiedRoot::Host(host) = classify(&found[0], source, &config).unwrap() else {
        panic!("expected host");
    };
    let mut ctx = CompilationContext::new(source, &config);
    let mut unit = emit_template(&host, &mut ctx).unwrap();
    if hydratable {
        hydrate::adapt(&mut unit);
        assert_eq!(unit.acquire, Acquire::Claim);
    }
    let sites = unit.sites.iter().map(|s| (s.path.clone(), s.kind)).collect();
    let html = ctx.templates.templates().iter().map(|t| t.html.clone()).collect();
    (html, sites)
}

/// Rendered code of the first root after the hydration adapter ran.
fn hydrated(source: &str) -> String {
    let config = Config {
        hydratable: true,
        ..Config::default()
    };
    let found = roots(source);
    let ClassifiedRoot::Host(host) = classify(&found[0], source, &config).unwrap() else {
        panic!("expected host");
    };
    let mut ctx = CompilationContext::new(source, &config);
    let mut unit = emit_template(&host, &mut ctx).unwrap();
    hydrate::adapt(&mut unit);
    render_unit(&unit, &mut ctx).unwrap()
}

#[test]
fn test_same_templates_and_paths() {
    let sources = [
        "<p>{a}</p>",
        "<div id={x}>Hi {a}<b onClick={h} />{c ? d : e}</div>",
        "<ul><li>{x()}</li><Item /> tail {y}</ul>",
        "<section><h1>{title}</h1><div>{body()}<span>{n}</span></div></section>",
    ];
    for source in sources {
        assert_eq!(layout(source, false), layout(source, true), "{}", source);
    }
}

#[test]
fn test_hydratable_output_claims_nodes() {
    let config = Config {
        hydratable: true,
        ..Config::default()
    };
    let out = transform("const v = <div>Hi {name()}<b /></div>;", &config).unwrap();
    assert!(out.contains("getNextElement(_once$tmpl)"), "{}", out);
    assert!(out.contains("getNextMarker(_el$2.nextSibling)"), "{}", out);
    assert!(out.contains("insert(_el$, () => name(), _el$3, _co$)"), "{}", out);
    assert!(!out.contains("_once$tmpl()"), "{}", out);
}

#[test]
fn test_hydratable_sole_child_has_no_anchor() {
    let config = Config {
        hydratable: true,
        ..Config::default()
    };
    let out = transform("const v = <p>{name()}</p>;", &config).unwrap();
    assert!(out.contains("claimNodes(_el$, null, null)"), "{}", out);
}

#[test]
fn test_hydration_does_not_change_template_declarations() {
    let source = "const v = <div class=\"x\">Hi {name()}<b>{n}</b></div>;";
    let plain = transform(source, &Config::default()).unwrap();
    let hydrated = transform(
        source,
        &Config {
            hydratable: true,
            ..Config::default()
        },
    )
    .unwrap();
    let decl = |out: &str| {
        let start = out.find("template(").unwrap();
        let end = start + out[start..].find(')').unwrap();
        out[start..end].to_string()
    };
    assert_eq!(decl(&plain), decl(&hydrated));
}

// Server markup `<div>Hi <!>Ada<!><b></b></div>`: "Ada" sits between the split
// marker and the end marker, so `<b>` must be reached from the marker that was
// scanned for, not by counting siblings from the split marker.
#[test]
fn test_nodes_after_insertion_chain_from_scanned_marker() {
    assert_eq!(
        hydrated("<div>Hi {name()}<b onClick={go} /></div>"),
        "(() => { const _el$ = getNextElement(_once$tmpl), \
         _el$2 = _el$.firstChild.nextSibling, \
         [_el$3, _co$] = getNextMarker(_el$2.nextSibling), \
         _el$4 = _el$3.nextSibling; \
         insert(_el$, () => name(), _el$3, _co$); \
         _el$4.$$click = go; \
         return _el$; })()"
    );
}

#[test]
fn test_adjacent_insertions_scan_in_order() {
    assert_eq!(
        hydrated("<p>{a()}{b()}</p>"),
        "(() => { const _el$ = getNextElement(_once$tmpl), \
         [_el$2, _co$] = getNextMarker(_el$.firstChild), \
         [_el$3, _co$2] = getNextMarker(_el$2.nextSibling); \
         insert(_el$, () => a(), _el$2, _co$); \
         insert(_el$, () => b(), _el$3, _co$2); \
         return _el$; })()"
    );
}
