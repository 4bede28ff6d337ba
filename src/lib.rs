//! # JSX to DOM template compiler
//!
//! Rewrites every JSX element or fragment in a module into code that clones a
//! static HTML template once and wires the dynamic parts to the runtime:
//!
//! 1. **markup** adapts the oxc AST into an owned markup tree.
//! 2. **classify** decides which nodes are static, dynamic or control flow.
//! 3. **template** serializes the static frame and deduplicates it per file.
//! 4. **path** locates every binding site as child indices into the template.
//! 5. **emit** turns each site into a runtime call.
//! 6. **hydrate** switches node acquisition to claiming server-rendered DOM.
//! 7. **assemble** splices the results into the module and prints it.
//!
//! All state of one call lives in a [`CompilationContext`]; concurrent calls
//! share nothing, which is what [`transform_many`] relies on.

use rayon::prelude::*;
use serde::Serialize;

mod assemble;
mod cache;
mod classify;
mod config;
mod context;
mod emit;
mod error;
mod hydrate;
mod markup;
mod path;
mod template;
mod validate;

#[cfg(feature = "napi")]
mod binding;

#[cfg(test)]
mod hydration_tests;

pub use assemble::{roundtrip, transform};
pub use cache::TransformCache;
pub use config::{Config, OutputType, DELEGATED_EVENTS};
pub use context::CompilationContext;
pub use error::{Result, SourceLocation, TransformError};

#[cfg(feature = "napi")]
pub use binding::TransformOptions;

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutput {
    pub path: String,
    pub result: std::result::Result<String, TransformError>,
}

/// Transforms independent files in parallel. Output order matches input order.
pub fn transform_many(files: &[SourceFile], config: &Config) -> Vec<FileOutput> {
    files
        .par_iter()
        .map(|file| FileOutput {
            path: file.path.clone(),
            result: transform(&file.source, config),
        })
        .collect()
}
