//! Prompt templates.
//!
//! A [`PromptTemplate`] is a named, versioned body with `{{placeholder}}`
//! markers. The [`TemplateRegistry`] owns the loaded set and renders them
//! against a JSON object. Rendering is pure: the same template and data
//! always produce the same text, which matters because the response cache
//! keys on the rendered prompt rather than on the data.
//!
//! Templates are seeded from a compiled-in JSON file; a file named in
//! configuration may replace individual templates by name or add new ones.

pub mod truncate;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::TemplateError;
use crate::types::{GenerationParams, TemplateTag};

pub use truncate::TruncationStrategy;

const BUILTIN_TEMPLATES: &str = include_str!("builtin.json");

/// Template names used by the analyst.
pub mod names {
    pub const SUMMARIZE: &str = "summarize_entries";
    pub const REFLECTIVE_PROMPTS: &str = "reflective_prompts";
    pub const EXTRACT_METADATA: &str = "extract_metadata";
    pub const RECOMMEND_PLACES: &str = "recommend_places";
    pub const ANALYZE_EXPENSES: &str = "analyze_expenses";
}

/// A named, versioned prompt body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub name: String,
    pub version: String,
    pub body: String,
    /// Overrides the configured temperature for this template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Overrides the configured output length for this template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Appended to the prompt when structured output failed to parse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrective_instruction: Option<String>,
}

impl PromptTemplate {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            body: body.into(),
            temperature: None,
            max_tokens: None,
            corrective_instruction: None,
        }
    }

    pub fn tag(&self) -> TemplateTag {
        TemplateTag::new(&self.name, &self.version)
    }

    /// Generation params for this template: `base` with overrides applied.
    pub fn params(&self, base: &GenerationParams) -> GenerationParams {
        let mut params = base.clone();
        if let Some(t) = self.temperature {
            params.temperature = Some(t);
        }
        if let Some(m) = self.max_tokens {
            params.max_tokens = Some(m);
        }
        params
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<String> {
        let mut found = Vec::new();
        let mut rest = self.body.as_str();
        while let Some(start) = rest.find("{{") {
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else { break };
            let key = after[..end].trim();
            if !key.is_empty() && !found.iter().any(|k| k == key) {
                found.push(key.to_string());
            }
            rest = &after[end + 2..];
        }
        found
    }

    /// Render the body against `data`, which must be a JSON object.
    pub fn render(&self, data: &Value) -> Result<String, TemplateError> {
        let Some(fields) = data.as_object() else {
            return Err(TemplateError::InvalidData {
                template: self.name.clone(),
                reason: "data must be a JSON object".to_string(),
            });
        };

        let mut out = String::with_capacity(self.body.len());
        let mut rest = self.body.as_str();
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                // Unterminated marker is literal text.
                out.push_str(&rest[start..]);
                rest = "";
                break;
            };
            let key = after[..end].trim();
            if key.is_empty() {
                out.push_str("{{}}");
            } else {
                let value = fields.get(key).ok_or_else(|| self.render_error(key, "is missing"))?;
                self.render_value(key, value, &mut out)?;
            }
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn render_value(&self, key: &str, value: &Value, out: &mut String) -> Result<(), TemplateError> {
        match value {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push('\n');
                    }
                    match scalar_text(item) {
                        Some(text) => out.push_str(&text),
                        None => return Err(self.render_error(key, "contains a non-scalar item")),
                    }
                }
                Ok(())
            }
            Value::Object(_) => Err(self.render_error(key, "is an object, expected text")),
            Value::Null => Err(self.render_error(key, "is null")),
            scalar => {
                if let Some(text) = scalar_text(scalar) {
                    out.push_str(&text);
                }
                Ok(())
            }
        }
    }

    fn render_error(&self, placeholder: &str, reason: &str) -> TemplateError {
        TemplateError::Render {
            template: self.name.clone(),
            placeholder: placeholder.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Rough token count for budgeting: one token per four characters.
///
/// Monotonic in text length, not exact for any tokenizer.
pub fn estimate_length(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// The set of templates available to the analyst.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, PromptTemplate>,
}

impl TemplateRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the compiled-in templates.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        match serde_json::from_str::<Vec<PromptTemplate>>(BUILTIN_TEMPLATES) {
            Ok(templates) => {
                for template in templates {
                    registry.register(template);
                }
            }
            Err(e) => {
                // Lookups then report NotFound.
                error!(error = %e, "failed to parse builtin templates");
            }
        }
        registry
    }

    /// Add a template, replacing any existing template with the same name.
    pub fn register(&mut self, template: PromptTemplate) {
        if let Some(old) = self.templates.get(&template.name) {
            debug!(
                template = %template.name,
                from = %old.version,
                to = %template.version,
                "replacing template"
            );
        }
        self.templates.insert(template.name.clone(), template);
    }

    /// Load a JSON array of templates from `path`, replacing by name.
    ///
    /// Returns the number of templates loaded.
    pub fn load_file(&mut self, path: &Path) -> Result<usize, TemplateError> {
        let content = fs::read_to_string(path)
            .map_err(|e| TemplateError::Load(format!("failed to read {path:?}: {e}")))?;
        let templates: Vec<PromptTemplate> = serde_json::from_str(&content)
            .map_err(|e| TemplateError::Load(format!("failed to parse {path:?}: {e}")))?;
        let count = templates.len();
        for template in templates {
            self.register(template);
        }
        Ok(count)
    }

    pub fn get(&self, name: &str) -> Result<&PromptTemplate, TemplateError> {
        self.templates
            .get(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }

    /// Render the named template against `data`.
    pub fn render(&self, name: &str, data: &Value) -> Result<String, TemplateError> {
        self.get(name)?.render(data)
    }

    /// Registered template names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
