//! Endpoint registry: built once from the settings path, read-only afterwards.

use crate::config::{discover, load_definition};
use crate::endpoint::Endpoint;
use crate::error::ConfigError;
use crate::response::{StateDefaults, TemplateStore};
use crate::routes::common::COMMON_PATHS;
use axum::http::Method;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct EndpointRegistry {
    endpoints: Vec<Arc<Endpoint>>,
}

/// Segments the router matches by position. `:name` and `*name` are erased to
/// `:` and `*` so `/users/:id` and `/users/:key` collide.
fn route_shape(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| match s.chars().next() {
            Some(':') => ":",
            Some('*') => "*",
            _ => s,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Routes accepted so far, keyed the way the router will see them.
#[derive(Default)]
struct RouteIndex {
    /// (method, shape) -> endpoint
    methods: HashMap<(Method, String), String>,
    /// shape of the preceding segments -> (parameter segment, uri, endpoint)
    parameters: HashMap<String, (String, String, String)>,
}

impl RouteIndex {
    fn insert(&mut self, endpoint: &Endpoint) -> Result<(), ConfigError> {
        if COMMON_PATHS.contains(&endpoint.uri.as_str()) {
            return Err(ConfigError::Validation {
                endpoint: endpoint.name.clone(),
                message: format!("uri '{}' is reserved", endpoint.uri),
            });
        }

        let segments: Vec<&str> = endpoint.uri.split('/').collect();
        for (i, segment) in segments.iter().enumerate() {
            if !segment.starts_with(':') && !segment.starts_with('*') {
                continue;
            }
            let prefix = route_shape(&segments[..i]);
            match self.parameters.get(&prefix) {
                Some((seen, uri, owner)) if seen != segment => {
                    return Err(ConfigError::Validation {
                        endpoint: endpoint.name.clone(),
                        message: format!(
                            "uri '{}' declares '{segment}' where '{uri}' of endpoint \
                             '{owner}' declares '{seen}'",
                            endpoint.uri
                        ),
                    });
                }
                Some(_) => {}
                None => {
                    self.parameters.insert(
                        prefix,
                        (segment.to_string(), endpoint.uri.clone(), endpoint.name.clone()),
                    );
                }
            }
        }

        let key = (endpoint.method.clone(), route_shape(&segments));
        if let Some(first) = self.methods.get(&key) {
            return Err(ConfigError::DuplicateRoute {
                method: endpoint.method.to_string(),
                uri: endpoint.uri.clone(),
                first: first.clone(),
                second: endpoint.name.clone(),
            });
        }
        self.methods.insert(key, endpoint.name.clone());
        Ok(())
    }
}

impl EndpointRegistry {
    /// Load every definition under `root`, compiling templates into `templates`.
    /// The first failing file aborts the whole load.
    pub fn load(
        root: &Path,
        templates: &mut TemplateStore,
        defaults: &StateDefaults,
    ) -> Result<Self, ConfigError> {
        let mut registry = EndpointRegistry::default();
        let mut names: HashMap<String, PathBuf> = HashMap::new();
        let mut routes = RouteIndex::default();

        for file in discover(root)? {
            if names.insert(file.name.clone(), file.path.clone()).is_some() {
                return Err(ConfigError::DuplicateEndpoint(file.name));
            }
            let def = load_definition(&file.path)?;
            let endpoint = Endpoint::build(&file, def, templates, defaults)?;
            routes.insert(&endpoint)?;

            tracing::info!(
                endpoint = %endpoint.name,
                method = %endpoint.method,
                uri = %endpoint.uri,
                filename = %file.path.display(),
                "endpoint registered"
            );
            registry.endpoints.push(Arc::new(endpoint));
        }

        if registry.endpoints.is_empty() {
            tracing::warn!(path = %root.display(), "no endpoint definitions found");
        }
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Endpoint>> {
        self.endpoints.iter().find(|e| e.name == name)
    }

    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
