//! Template store: compiled at startup, read-only while serving.

use crate::error::{ConfigError, RenderError};
use minijinja::{AutoEscape, Environment};
use serde_json::Value;
use std::path::Path;

/// Renders a named template with a data value.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, data: &Value) -> Result<String, RenderError>;
}

#[derive(Debug)]
pub struct TemplateStore {
    env: Environment<'static>,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateStore {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        TemplateStore { env }
    }

    /// Read and compile the template at `path` once; returns its key.
    pub fn load(&mut self, path: &Path) -> Result<String, ConfigError> {
        let key = path.display().to_string();
        if self.contains(&key) {
            return Ok(key);
        }
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Template {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.insert(key.clone(), source).map_err(|message| ConfigError::Template {
            path: path.to_path_buf(),
            message,
        })?;
        tracing::debug!(template = %key, "template loaded");
        Ok(key)
    }

    /// Register an in-memory template under `key`.
    pub fn insert(&mut self, key: String, source: String) -> Result<(), String> {
        self.env.add_template_owned(key, source).map_err(|e| e.to_string())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.env.get_template(key).is_ok()
    }
}

impl Renderer for TemplateStore {
    fn render(&self, template: &str, data: &Value) -> Result<String, RenderError> {
        let fail = |e: minijinja::Error| RenderError {
            template: template.to_string(),
            message: e.to_string(),
        };
        self.env.get_template(template).map_err(fail)?.render(data).map_err(fail)
    }
}
