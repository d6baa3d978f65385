//! Selection-query templating
//!
//! Substitutes manifest variables into per-table selection queries using
//! `{{ var }}` placeholders. Undefined variables are a hard error rather than
//! silent empty output.

use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use std::collections::HashMap;

/// Error during query template rendering
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Undefined template variable: {0}")]
    UndefinedVariable(String),

    #[error("Template render error: {0}")]
    RenderError(String),
}

/// Render a selection-query template against the manifest's variables
///
/// Plain name-to-value substitution; the caller is responsible for any
/// quoting inside the template itself.
pub fn render_query(
    template: &str,
    vars: &HashMap<String, String>,
) -> Result<String, TemplateError> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);

    env.render_str(template, vars).map_err(|e| {
        if matches!(e.kind(), ErrorKind::UndefinedError) {
            let name = extract_variable_name(&e.to_string())
                .unwrap_or_else(|| e.to_string());
            TemplateError::UndefinedVariable(name)
        } else {
            TemplateError::RenderError(e.to_string())
        }
    })
}

/// Extract a variable name quoted in a render error message
fn extract_variable_name(message: &str) -> Option<String> {
    for quote in ['\'', '`'] {
        if let Some(start) = message.find(quote) {
            if let Some(end) = message[start + 1..].find(quote) {
                return Some(message[start + 1..start + 1 + end].to_string());
            }
        }
    }
    None
}
