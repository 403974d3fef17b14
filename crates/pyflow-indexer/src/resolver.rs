//! Import resolution against the project tree

use std::path::{Path, PathBuf};

use crate::extractor::file_id;

/// Module file extensions in lookup order.
const MODULE_EXTENSIONS: [&str; 2] = ["py", "pyi"];

/// Resolves dotted module paths to project file ids for one importing file.
#[derive(Debug, Clone)]
pub struct ModuleResolver<'a> {
    project_root: &'a Path,
    /// Directory of the importing file, as project-relative segments.
    file_dir: Vec<String>,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(project_root: &'a Path, relative_file: &Path) -> Self {
        let file_dir = relative_file
            .parent()
            .map(|dir| {
                file_id(dir)
                    .split('/')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self { project_root, file_dir }
    }

    /// File id of `module` imported at `level`, if such a file exists.
    ///
    /// `<base>/a/b.py` is tried before `<base>/a/b/__init__.py`, and stubs
    /// (`.pyi`) only after both. Level 0 is
    /// the project root, level 1 the importing file's directory, and every
    /// extra level one directory further up.
    pub fn resolve(&self, module: &str, level: usize) -> Option<String> {
        let mut segments = self.base(level)?;
        segments.extend(module.split('.').filter(|s| !s.is_empty()).map(str::to_string));
        self.module_file(&segments)
    }

    /// File id of `member` when it is itself a module of package `module`.
    pub fn resolve_submodule(&self, module: &str, level: usize, member: &str) -> Option<String> {
        let mut segments = self.base(level)?;
        segments.extend(module.split('.').filter(|s| !s.is_empty()).map(str::to_string));
        segments.push(member.to_string());
        self.module_file(&segments)
    }

    fn base(&self, level: usize) -> Option<Vec<String>> {
        if level == 0 {
            return Some(Vec::new());
        }
        let ascend = level - 1;
        if ascend > self.file_dir.len() {
            return None;
        }
        Some(self.file_dir[..self.file_dir.len() - ascend].to_vec())
    }

    fn module_file(&self, segments: &[String]) -> Option<String> {
        if segments.iter().any(|s| s == "." || s == "..") {
            return None;
        }

        let mut candidates: Vec<PathBuf> = Vec::with_capacity(4);
        for ext in MODULE_EXTENSIONS {
            if let Some((last, parents)) = segments.split_last() {
                let mut module: PathBuf = parents.iter().collect();
                module.push(format!("{last}.{ext}"));
                candidates.push(module);
            }
            let mut package: PathBuf = segments.iter().collect();
            package.push(format!("__init__.{ext}"));
            candidates.push(package);
        }

        candidates
            .into_iter()
            .find(|candidate| self.project_root.join(candidate).is_file())
            .map(|candidate| file_id(&candidate))
    }
}
