//! Transform configuration.
//!
//! Field names follow the camelCase option names a JS caller passes, so an
//! options object deserializes straight into [`Config`].

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

lazy_static! {
    /// Events the runtime can dispatch from a single document-level listener.
    pub static ref DELEGATED_EVENTS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("beforeinput");
        s.insert("click");
        s.insert("dblclick");
        s.insert("contextmenu");
        s.insert("focusin");
        s.insert("focusout");
        s.insert("input");
        s.insert("keydown");
        s.insert("keyup");
        s.insert("mousedown");
        s.insert("mousemove");
        s.insert("mouseout");
        s.insert("mouseover");
        s.insert("mouseup");
        s.insert("pointerdown");
        s.insert("pointermove");
        s.insert("pointerout");
        s.insert("pointerover");
        s.insert("pointerup");
        s.insert("touchend");
        s.insert("touchmove");
        s.insert("touchstart");
        s
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    #[default]
    Dom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Module the runtime helpers are imported from.
    pub module_name: String,
    pub generate: OutputType,
    pub hydratable: bool,
    pub delegate_events: bool,
    /// Extra event names eligible for delegation, on top of [`DELEGATED_EVENTS`].
    pub delegated_events: Vec<String>,
    /// Tag names treated as native elements even when they look like components
    /// or custom elements.
    pub built_ins: Vec<String>,
    pub require_import_source: bool,
    pub wrap_conditionals: bool,
    pub omit_nested_closing_tags: bool,
    pub context_to_custom_elements: bool,
    /// Comment text that opts an expression out of reactive wrapping; its
    /// identifier-safe characters also prefix template ids.
    pub static_marker: String,
    pub effect_wrapper: String,
    pub memo_wrapper: String,
    pub validate: bool,
    /// Compile top-level markup that has nothing dynamic in it.
    pub hoist_static_roots: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            module_name: "dom".to_string(),
            generate: OutputType::Dom,
            hydratable: false,
            delegate_events: true,
            delegated_events: Vec::new(),
            built_ins: Vec::new(),
            require_import_source: false,
            wrap_conditionals: true,
            omit_nested_closing_tags: false,
            context_to_custom_elements: false,
            static_marker: "@once".to_string(),
            effect_wrapper: "effect".to_string(),
            memo_wrapper: "memo".to_string(),
            validate: true,
            hoist_static_roots: false,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn is_delegated(&self, event: &str) -> bool {
        self.delegate_events
            && (DELEGATED_EVENTS.contains(event) || self.delegated_events.iter().any(|e| e == event))
    }

    pub fn is_built_in(&self, tag: &str) -> bool {
        self.built_ins.iter().any(|b| b == tag)
    }

    /// `@once` -> `once`. Used as the template id prefix.
    pub fn marker_ident(&self) -> String {
        self.static_marker
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.module_name, "dom");
        assert!(config.delegate_events);
        assert!(config.wrap_conditionals);
        assert!(config.validate);
        assert!(!config.hydratable);
        assert_eq!(config.marker_ident(), "once");
    }

    #[test]
    fn test_from_json_fills_missing_fields() {
        let config = Config::from_json(
            r#"{"hydratable": true, "delegatedEvents": ["wheel"], "unknownKey": 1}"#,
        )
        .unwrap();
        assert!(config.hydratable);
        assert_eq!(config.effect_wrapper, "effect");
        assert!(config.is_delegated("wheel"));
        assert!(config.is_delegated("click"));
        assert!(!config.is_delegated("scroll"));
    }

    #[test]
    fn test_delegation_off() {
        let config = Config {
            delegate_events: false,
            ..Config::default()
        };
        assert!(!config.is_delegated("click"));
    }
}
