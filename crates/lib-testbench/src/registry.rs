//! Named template store backed by a directory of YAML files.

use crate::error::{TemplateError, TemplateResult};
use crate::template::TemplateSpec;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

const EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Loads templates by name from `<directory>/<name>.yaml` (or `.yml`).
///
/// Loaded templates are immutable and shared; the cache only ever grows.
#[derive(Debug)]
pub struct TemplateRegistry {
    directory: PathBuf,
    cache: RwLock<HashMap<String, Arc<TemplateSpec>>>,
}

impl TemplateRegistry {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Register an in-memory template under its own name.
    pub fn insert(&self, template: TemplateSpec) -> Arc<TemplateSpec> {
        let template = Arc::new(template);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(template.name().to_string(), Arc::clone(&template));
        template
    }

    /// Get a template, loading it from disk on first use.
    pub fn get(&self, name: &str) -> TemplateResult<Arc<TemplateSpec>> {
        if let Some(cached) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(Arc::clone(cached));
        }

        let path = self.template_path(name).ok_or_else(|| TemplateError::NotFound {
            name: name.to_string(),
            dir: self.directory.clone(),
        })?;
        let template = TemplateSpec::load(&path)?;
        if template.name() != name {
            tracing::warn!(
                "Template file {} declares name '{}'; registered as '{}'",
                path.display(),
                template.name(),
                name
            );
        }
        tracing::debug!("Loaded template '{}' from {}", name, path.display());

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let entry = cache.entry(name.to_string()).or_insert_with(|| Arc::new(template));
        Ok(Arc::clone(entry))
    }

    /// Load every template file in the directory. Returns the number loaded.
    pub fn load_all(&self) -> TemplateResult<usize> {
        let entries = std::fs::read_dir(&self.directory).map_err(|source| TemplateError::Io {
            path: self.directory.clone(),
            source,
        })?;

        let mut count = 0;
        for entry in entries {
            let path = entry
                .map_err(|source| TemplateError::Io {
                    path: self.directory.clone(),
                    source,
                })?
                .path();
            let is_template = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| EXTENSIONS.contains(&e));
            if !is_template {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                self.get(stem)?;
                count += 1;
            }
        }
        tracing::info!("Loaded {} templates from {}", count, self.directory.display());
        Ok(count)
    }

    /// Names currently cached, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    fn template_path(&self, name: &str) -> Option<PathBuf> {
        let plain = !name.is_empty() && !name.contains(['/', '\\']) && name != "." && name != "..";
        if !plain {
            return None;
        }
        EXTENSIONS
            .iter()
            .map(|ext| self.directory.join(format!("{name}.{ext}")))
            .find(|p| p.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SIMPLE: &str = "name: simple\nparameters:\n  - name: x\nbody:\n  value: \"${x}\"\n";

    #[test]
    fn test_get_caches_shared_instance() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("simple.yaml"), SIMPLE).unwrap();

        let registry = TemplateRegistry::new(dir.path());
        let a = registry.get("simple").unwrap();
        let b = registry.get("simple").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.names(), vec!["simple".to_string()]);
    }

    #[test]
    fn test_yml_extension_and_missing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("alt.yml"), SIMPLE).unwrap();

        let registry = TemplateRegistry::new(dir.path());
        assert!(registry.get("alt").is_ok());
        assert!(matches!(
            registry.get("nope").unwrap_err(),
            TemplateError::NotFound { .. }
        ));
        assert!(matches!(
            registry.get("../alt").unwrap_err(),
            TemplateError::NotFound { .. }
        ));
    }

    #[test]
    fn test_load_all_skips_other_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("one.yaml"), SIMPLE).unwrap();
        std::fs::write(dir.path().join("two.yml"), SIMPLE).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a template").unwrap();

        let registry = TemplateRegistry::new(dir.path());
        assert_eq!(registry.load_all().unwrap(), 2);
        assert_eq!(registry.names(), vec!["one".to_string(), "two".to_string()]);
    }
}
