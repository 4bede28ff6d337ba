//! Per-call compilation state.
//!
//! One [`CompilationContext`] lives for exactly one `transform` call and is
//! threaded by reference through every pass. Nothing in it outlives the call.

use crate::config::Config;
use crate::template::TemplateRegistry;
use std::collections::{BTreeSet, HashMap};

pub struct CompilationContext<'s> {
    pub source: &'s str,
    pub config: &'s Config,
    pub templates: TemplateRegistry,
    /// Event names dispatched through the shared document listener.
    pub delegated: BTreeSet<String>,
    /// Runtime helpers referenced by emitted code.
    pub imports: BTreeSet<String>,
    uids: HashMap<String, usize>,
}

impl<'s> CompilationContext<'s> {
    pub fn new(source: &'s str, config: &'s Config) -> Self {
        Self {
            source,
            config,
            templates: TemplateRegistry::new(config.marker_ident()),
            delegated: BTreeSet::new(),
            imports: BTreeSet::new(),
            uids: HashMap::new(),
        }
    }

    /// Name under which a runtime helper is referenced, registering the import.
    pub fn helper(&mut self, name: &str) -> String {
        self.imports.insert(name.to_string());
        if self.config.require_import_source {
            format!("_${}", name)
        } else {
            name.to_string()
        }
    }

    pub fn effect(&mut self) -> String {
        let name = self.config.effect_wrapper.clone();
        self.helper(&name)
    }

    pub fn memo(&mut self) -> String {
        let name = self.config.memo_wrapper.clone();
        self.helper(&name)
    }

    /// `_el$`, `_el$2`, `_el$3`, ... counted per prefix across the whole file.
    pub fn uid(&mut self, prefix: &str) -> String {
        let count = self.uids.entry(prefix.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            format!("_{}$", prefix)
        } else {
            format!("_{}${}", prefix, count)
        }
    }

    pub fn delegate(&mut self, event: &str) {
        self.delegated.insert(event.to_string());
    }

    /// `import { insert as _$insert, ... } from "module";`, or nothing when
    /// helpers are globals.
    pub fn import_statement(&self) -> Option<String> {
        if !self.config.require_import_source || self.imports.is_empty() {
            return None;
        }
        let specifiers: Vec<String> = self
            .imports
            .iter()
            .map(|name| format!("{} as _${}", name, name))
            .collect();
        Some(format!(
            "import {{ {} }} from {};",
            specifiers.join(", "),
            js_string(&self.config.module_name)
        ))
    }
}

/// Double-quoted JS string literal.
pub fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}
