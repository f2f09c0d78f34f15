//! Schema file ordering
//!
//! Decides the sequence in which the `.sql` files of a schema directory are applied,
//! so that views and foreign keys come after the objects they depend on.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Subdirectory that is always applied first
pub const PRIORITY_DIRECTORY: &str = "schemas";

/// Build-tool output directories that never hold schema content
pub const DEFAULT_EXCLUDED_DIRECTORIES: &[&str] = &["bin", "obj"];

const POSTDEPLOY_SUFFIX: &str = ".postdeploy.sql";

/// A schema file read from disk and classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFile {
    pub path: PathBuf,
    /// Lowercased file content, used for classification
    pub content: String,
    /// Original file content, executed as-is
    pub sql: String,
    pub defines_view: bool,
    pub defines_foreign_key: bool,
}

impl SchemaFile {
    /// Classify already-read file content
    pub fn new(path: impl Into<PathBuf>, sql: String) -> Self {
        let content = sql.to_lowercase();
        let defines_view =
            content.contains("create view") || content.contains("create materialized view");
        let defines_foreign_key = content.contains("foreign key");

        Self {
            path: path.into(),
            content,
            sql,
            defines_view,
            defines_foreign_key,
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let sql = fs::read_to_string(path)?;
        Ok(Self::new(path, sql))
    }

    /// Application order within a directory: plain files, then foreign keys, then
    /// views; path breaks ties.
    pub fn apply_order(&self, other: &Self) -> Ordering {
        (self.defines_view, self.defines_foreign_key)
            .cmp(&(other.defines_view, other.defines_foreign_key))
            .then_with(|| self.path.as_os_str().cmp(other.path.as_os_str()))
    }
}

/// Produces the ordered list of schema files under a root directory
#[derive(Debug, Clone)]
pub struct SchemaFileOrderer {
    excluded_dirs: Vec<String>,
}

impl Default for SchemaFileOrderer {
    fn default() -> Self {
        Self::with_excluded_dirs(DEFAULT_EXCLUDED_DIRECTORIES.iter().copied())
    }
}

impl SchemaFileOrderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the names of top-level directories that are skipped
    pub fn with_excluded_dirs<I, S>(dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded_dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Ordered schema files under `root`, in the exact order they must be applied
    pub fn order(&self, root: &Path) -> Result<Vec<SchemaFile>> {
        if !root.is_dir() {
            return Err(Error::DirectoryNotFound(root.to_path_buf()));
        }

        let mut ordered = Vec::new();
        for directory in self.subdirectories(root)? {
            let files = self.ordered_files(&directory)?;
            tracing::debug!(
                directory = %directory.display(),
                files = files.len(),
                "Ordered schema directory"
            );
            ordered.extend(files);
        }

        Ok(ordered)
    }

    /// Immediate subdirectories, `schemas` first, excluded names removed
    fn subdirectories(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut directories = Vec::new();
        for entry in fs::read_dir(root)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let name = dir_name(&path);
            if self.excluded_dirs.iter().any(|excluded| *excluded == name) {
                tracing::debug!(directory = %path.display(), "Skipping excluded directory");
                continue;
            }
            directories.push(path);
        }

        // read_dir order is platform dependent
        directories.sort_by(|a, b| dir_name(a).cmp(&dir_name(b)));
        directories.sort_by_key(|dir| !dir_name(dir).eq_ignore_ascii_case(PRIORITY_DIRECTORY));

        Ok(directories)
    }

    fn ordered_files(&self, directory: &Path) -> Result<Vec<SchemaFile>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(directory).follow_links(true) {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_type().is_file() && is_schema_file(entry.path()) {
                files.push(SchemaFile::read(entry.path())?);
            }
        }

        files.sort_by(SchemaFile::apply_order);
        Ok(files)
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_schema_file(path: &Path) -> bool {
    let is_sql = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"));
    let is_postdeploy = dir_name(path).to_lowercase().ends_with(POSTDEPLOY_SUFFIX);

    is_sql && !is_postdeploy
}
