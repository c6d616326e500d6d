//! Discover and parse endpoint definition files.

use crate::config::EndpointDefinition;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One definition file found under the settings path.
#[derive(Clone, Debug)]
pub struct DefinitionFile {
    /// File stem; names the endpoint and its default template.
    pub name: String,
    pub path: PathBuf,
}

impl DefinitionFile {
    /// Directory that relative template paths resolve against.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Walk `root` recursively and collect `*.json` files, sorted by path.
pub fn discover(root: &Path) -> Result<Vec<DefinitionFile>, ConfigError> {
    let mut out = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| ConfigError::Load {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        out.push(DefinitionFile {
            name: name.to_string(),
            path: path.to_path_buf(),
        });
    }
    Ok(out)
}

/// Read and parse one definition file.
pub fn load_definition(path: &Path) -> Result<EndpointDefinition, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovers_json_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("users.json"), "{}").unwrap();
        fs::write(dir.path().join("users.tmpl"), "").unwrap();
        fs::write(dir.path().join("nested/orders.json"), "{}").unwrap();

        let files = discover(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["orders", "users"]);
        assert_eq!(files[0].dir(), dir.path().join("nested"));
    }

    #[test]
    fn missing_root_is_a_load_error() {
        let err = discover(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
    }

    #[test]
    fn unparseable_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_definition(&path), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            load_definition(&dir.path().join("missing.json")),
            Err(ConfigError::Load { .. })
        ));
    }

    #[test]
    fn loads_minimal_definition() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        let body = r#"{"method": "get", "uri": "/users", "query": {"table": "users"}}"#;
        fs::write(&path, body).unwrap();
        let def = load_definition(&path).unwrap();
        assert_eq!(def.method, "get");
        assert_eq!(def.query.table, "users");
        assert!(def.response.state.is_empty());
    }
}
