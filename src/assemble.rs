//! Code assembly.
//!
//! Drives the passes for every markup root of a file and stitches the
//! results back into the source text: each root's span is replaced by its
//! compiled expression, the helper import and template declarations go after
//! the leading directives and imports, and delegated events are registered
//! once at the end. The stitched text is re-parsed and printed by
//! `oxc_codegen`, which both checks and normalizes it.

use crate::classify::{self, ClassifiedNode, ClassifiedRoot};
use crate::config::Config;
use crate::context::{js_string, CompilationContext};
use crate::emit::{self, Position};
use crate::error::{Result, SourceLocation, TransformError};
use crate::markup::{self, MarkupRoot};
use oxc_allocator::Allocator;
use oxc_ast::ast::{Program, Statement};
use oxc_codegen::Codegen;
use oxc_parser::{Parser, ParserReturn};
use oxc_span::SourceType;
use tracing::{debug, trace};

fn source_type() -> SourceType {
    SourceType::default()
        .with_module(true)
        .with_typescript(true)
        .with_jsx(true)
}

pub fn transform(source: &str, config: &Config) -> Result<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type()).parse();
    check_parse(source, &ret)?;

    let roots = markup::collect_roots(&ret.program, source, &config.static_marker)?;
    debug!(roots = roots.len(), "transform start");

    let mut ctx = CompilationContext::new(source, config);
    // (start, end, order, text); order breaks ties so the header lands
    // before a root that starts at the same offset.
    let mut edits: Vec<(u32, u32, u8, String)> = Vec::new();
    for root in &roots {
        let span = root.span();
        trace!(start = span.start, end = span.end, "compiling root");
        if let Some(code) = compile_top_level(root, &mut ctx)? {
            edits.push((span.start, span.end, 0, code));
        }
    }

    if edits.is_empty() {
        debug!("no markup to compile");
        return Ok(source.to_string());
    }

    let template_helper = if ctx.templates.is_empty() {
        None
    } else {
        Some(ctx.helper("template"))
    };
    let footer = if ctx.delegated.is_empty() {
        None
    } else {
        let events: Vec<String> = ctx.delegated.iter().map(|e| js_string(e)).collect();
        Some(format!(
            "{}([{}]);",
            ctx.helper("delegateEvents"),
            events.join(", ")
        ))
    };

    let mut header: Vec<String> = Vec::new();
    header.extend(ctx.import_statement());
    if let Some(helper) = template_helper {
        header.extend(ctx.templates.declarations(&helper));
    }
    if !header.is_empty() {
        let offset = header_offset(&ret.program);
        edits.push((offset, offset, 1, format!("\n{}\n", header.join("\n"))));
    }
    if let Some(footer) = footer {
        let end = source.len() as u32;
        edits.push((end, end, 1, format!("\n{}\n", footer)));
    }

    // Sort reverse to apply safely
    edits.sort_by(|a, b| b.0.cmp(&a.0).then(a.2.cmp(&b.2)));
    let mut output = source.to_string();
    for (start, end, _, text) in edits {
        output.replace_range((start as usize)..(end as usize), &text);
    }

    debug!(
        templates = ctx.templates.templates().len(),
        delegated = ctx.delegated.len(),
        "transform done"
    );
    print(&output)
}

/// Parse and print without transforming.
pub fn roundtrip(source: &str) -> Result<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type()).parse();
    check_parse(source, &ret)?;
    Ok(Codegen::new().build(&ret.program).code)
}

/// Fails with a structural error located at the parser's first label.
fn check_parse(source: &str, ret: &ParserReturn<'_>) -> Result<()> {
    let Some(err) = ret.errors.first() else {
        return Ok(());
    };
    let offset = err
        .labels
        .as_ref()
        .and_then(|labels| labels.first())
        .map(|label| label.offset())
        .unwrap_or(0);
    Err(TransformError::Structural {
        message: err.to_string(),
        location: SourceLocation::from_offset(source, offset),
    })
}

fn print(output: &str) -> Result<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, output, source_type()).parse();
    if let Some(err) = ret.errors.first() {
        return Err(TransformError::Emit {
            message: err.to_string(),
        });
    }
    Ok(Codegen::new().build(&ret.program).code)
}

/// End of the leading directives and import declarations.
fn header_offset(program: &Program<'_>) -> u32 {
    let mut offset = program.hashbang.as_ref().map_or(0, |h| h.span.end);
    if let Some(last) = program.directives.last() {
        offset = offset.max(last.span.end);
    }
    for stmt in &program.body {
        match stmt {
            Statement::ImportDeclaration(decl) => offset = offset.max(decl.span.end),
            _ => break,
        }
    }
    offset
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROOTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Inert roots stay as written unless `hoistStaticRoots` is set.
fn compile_top_level(root: &MarkupRoot, ctx: &mut CompilationContext) -> Result<Option<String>> {
    let classified = classify::classify(root, ctx.source, ctx.config)?;
    if classified.is_inert() && !ctx.config.hoist_static_roots {
        trace!("inert root left untouched");
        return Ok(None);
    }

    let code = compile_classified(&classified, ctx)?;
    if root.uses_this() {
        Ok(Some(format!(
            "(() => {{ const _self$ = this; return {}; }})()",
            code
        )))
    } else {
        Ok(Some(code))
    }
}

/// Markup inside another root's expressions is always compiled.
pub fn compile_nested(root: &MarkupRoot, ctx: &mut CompilationContext) -> Result<String> {
    let classified = classify::classify(root, ctx.source, ctx.config)?;
    compile_classified(&classified, ctx)
}

fn compile_classified(classified: &ClassifiedRoot, ctx: &mut CompilationContext) -> Result<String> {
    match classified {
        ClassifiedRoot::Host(host) => emit::compile_host(host, ctx),
        ClassifiedRoot::Component(call) => emit::component_expr(call, ctx),
        ClassifiedRoot::Fragment(children) => match children.as_slice() {
            [] => Ok("[]".to_string()),
            // Keep a lone expression grouped where the fragment stood.
            [ClassifiedNode::Slot(expr)] if !expr.is_dynamic() => {
                Ok(format!("({})", emit::lower_expr(expr, ctx)?))
            }
            _ => emit::children_value(children, Position::Fragment, ctx),
        },
    }
}
