//! YAML parser for collection definitions
//!
//! Parses and validates collection YAML files.

use super::types::CollectionDefinition;
use crate::error::{Error, Result};
use crate::template::{extract_variables, KNOWN_ROOTS};
use crate::types::Method;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Load a collection definition from a YAML file
///
/// ```ignore
/// let posts = load_collection("./collections/posts.yaml")?;
/// let view = posts.build_view("design".to_string())?;
/// ```
pub fn load_collection(path: impl AsRef<Path>) -> Result<CollectionDefinition> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            Error::config(format!(
                "Failed to read collection file '{}': {e}",
                path.display()
            ))
        }
    })?;

    debug!("Loaded collection definition from {}", path.display());
    load_collection_from_str(&content)
}

/// Load a collection definition from a YAML string
pub fn load_collection_from_str(yaml: &str) -> Result<CollectionDefinition> {
    let def: CollectionDefinition = serde_yaml::from_str(yaml)
        .map_err(|e| Error::config(format!("Failed to parse collection YAML: {e}")))?;

    def.validate()?;
    Ok(def)
}

impl CollectionDefinition {
    /// Check the definition for errors that would only surface at fetch time
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("Collection name cannot be empty"));
        }

        validate_base_url(&self.base_url)?;

        if self.page_size == 0 {
            return Err(Error::invalid_value(
                "page_size",
                "page size must be a positive integer",
            ));
        }

        if self.request.path.is_empty() {
            return Err(Error::config(format!(
                "Collection '{}' request path cannot be empty",
                self.name
            )));
        }

        let templates = std::iter::once(&self.request.path)
            .chain(self.request.query.values())
            .chain(self.request.headers.values());
        for template in templates {
            self.validate_template(template)?;
        }

        if self.response.items_path.trim().is_empty() {
            return Err(Error::missing_field("response.items_path"));
        }
        if self.response.total_path.trim().is_empty() {
            return Err(Error::missing_field("response.total_path"));
        }

        if self.request.body.is_some() && self.request.method == Method::GET {
            warn!(
                "Collection '{}' defines a request body but uses GET; the body is still sent",
                self.name
            );
        }

        Ok(())
    }

    fn validate_template(&self, template: &str) -> Result<()> {
        for variable in extract_variables(template) {
            let root = variable.split('.').next().unwrap_or_default();
            let known = KNOWN_ROOTS.contains(&root) || self.vars.get(root).is_some();
            if !known {
                return Err(Error::template(format!(
                    "Collection '{}' references unknown variable '{variable}' in '{template}'",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

fn validate_base_url(base_url: &str) -> Result<()> {
    if base_url.is_empty() {
        return Err(Error::missing_field("base_url"));
    }

    let url = url::Url::parse(base_url)?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(Error::invalid_value(
            "base_url",
            format!("unsupported scheme '{scheme}'"),
        )),
    }
}
