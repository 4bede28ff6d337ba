//! Hydration adapter.
//!
//! Rewrites an emitted unit so it adopts server-rendered nodes instead of
//! cloning its template. Paths are left exactly as the resolver produced them.
//! What changes is how the node walk treats insertions: on the server their
//! content already sits between the anchor and the end marker, so the marker
//! is scanned for with `getNextMarker` and every later sibling is reached from
//! the marker found, never by counting across the rendered content.

use crate::emit::{Acquire, EmittedUnit, Stmt};

pub fn adapt(unit: &mut EmittedUnit) {
    unit.acquire = Acquire::Claim;
    for stmt in &mut unit.stmts {
        if let Stmt::Insert { claim, .. } = stmt {
            // Existing content in front of the marker belongs to this
            // insertion and is handed over instead of being re-created.
            *claim = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify, ClassifiedRoot};
    use crate::config::Config;
    use crate::context::CompilationContext;
    use crate::emit::{emit_template, render_unit};
    use crate::markup::{collect_roots, MarkupRoot};
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn roots(source: &str) -> Vec<MarkupRoot> {
        let allocator = Allocator::default();
        let source_type = SourceType::default().with_jsx(true).with_module(true);
        let ret = Parser::new(&allocator, source, source_type).parse();
        collect_roots(&ret.program, source, "@once").unwrap()
    }

    #[test]
    fn test_adapt_claims_nodes() {
        let source = "<p>Hi {name}<b/></p>";
        let found = roots(source);
        let config = Config::default();
        let ClassifiedRoot::Host(host) = classify(&found[0], source, &config).unwrap() else {
            panic!("expected host");
        };
        let mut ctx = CompilationContext::new(source, &config);
        let mut unit = emit_template(&host, &mut ctx).unwrap();
        let paths_before: Vec<_> = unit.sites.iter().map(|s| s.path.clone()).collect();

        adapt(&mut unit);
        assert_eq!(unit.acquire, Acquire::Claim);
        assert!(unit
            .stmts
            .iter()
            .all(|s| matches!(s, Stmt::Insert { claim: true, .. })));

        let paths_after: Vec<_> = unit.sites.iter().map(|s| s.path.clone()).collect();
        assert_eq!(paths_before, paths_after);

        let code = render_unit(&unit, &mut ctx).unwrap();
        assert!(code.contains("getNextElement(_once$tmpl)"), "{}", code);
        assert!(code.contains("getNextMarker(_el$2.nextSibling)"), "{}", code);
        assert!(!code.contains("claimNodes("), "{}", code);
    }
}
