//! Node bindings.

use crate::config::{Config, OutputType};
use napi_derive::napi;

/// Options as passed from JS. Every field is optional and falls back to the
/// matching [`Config`] default.
#[napi(object)]
#[derive(Default)]
pub struct TransformOptions {
    pub module_name: Option<String>,
    pub generate: Option<String>,
    pub hydratable: Option<bool>,
    pub delegate_events: Option<bool>,
    pub delegated_events: Option<Vec<String>>,
    pub built_ins: Option<Vec<String>>,
    pub require_import_source: Option<bool>,
    pub wrap_conditionals: Option<bool>,
    pub omit_nested_closing_tags: Option<bool>,
    pub context_to_custom_elements: Option<bool>,
    pub static_marker: Option<String>,
    pub effect_wrapper: Option<String>,
    pub memo_wrapper: Option<String>,
    pub validate: Option<bool>,
    pub hoist_static_roots: Option<bool>,
}

impl TryFrom<TransformOptions> for Config {
    type Error = napi::Error;

    fn try_from(opts: TransformOptions) -> napi::Result<Self> {
        let d = Config::default();
        let generate = match opts.generate.as_deref() {
            None | Some("dom") => OutputType::Dom,
            Some(other) => {
                return Err(napi::Error::from_reason(format!(
                    "unsupported output type `{}`",
                    other
                )))
            }
        };
        Ok(Config {
            module_name: opts.module_name.unwrap_or(d.module_name),
            generate,
            hydratable: opts.hydratable.unwrap_or(d.hydratable),
            delegate_events: opts.delegate_events.unwrap_or(d.delegate_events),
            delegated_events: opts.delegated_events.unwrap_or(d.delegated_events),
            built_ins: opts.built_ins.unwrap_or(d.built_ins),
            require_import_source: opts.require_import_source.unwrap_or(d.require_import_source),
            wrap_conditionals: opts.wrap_conditionals.unwrap_or(d.wrap_conditionals),
            omit_nested_closing_tags: opts
                .omit_nested_closing_tags
                .unwrap_or(d.omit_nested_closing_tags),
            context_to_custom_elements: opts
                .context_to_custom_elements
                .unwrap_or(d.context_to_custom_elements),
            static_marker: opts.static_marker.unwrap_or(d.static_marker),
            effect_wrapper: opts.effect_wrapper.unwrap_or(d.effect_wrapper),
            memo_wrapper: opts.memo_wrapper.unwrap_or(d.memo_wrapper),
            validate: opts.validate.unwrap_or(d.validate),
            hoist_static_roots: opts.hoist_static_roots.unwrap_or(d.hoist_static_roots),
        })
    }
}

fn to_napi(err: crate::error::TransformError) -> napi::Error {
    napi::Error::from_reason(format!("[{}] {}", err.code(), err))
}

#[napi]
pub fn transform(source: String, options: Option<TransformOptions>) -> napi::Result<String> {
    let config = Config::try_from(options.unwrap_or_default())?;
    crate::assemble::transform(&source, &config).map_err(to_napi)
}

/// Same as `transform`, but returns the error as a structured value instead of
/// throwing.
#[napi]
pub fn transform_with_diagnostics(
    source: String,
    options: Option<TransformOptions>,
) -> napi::Result<serde_json::Value> {
    let config = Config::try_from(options.unwrap_or_default())?;
    let value = match crate::assemble::transform(&source, &config) {
        Ok(code) => serde_json::json!({ "code": code }),
        Err(err) => serde_json::json!({ "code": null, "error": err, "errorCode": err.code() }),
    };
    Ok(value)
}

#[napi]
pub fn roundtrip(source: String) -> napi::Result<String> {
    crate::assemble::roundtrip(&source).map_err(to_napi)
}
