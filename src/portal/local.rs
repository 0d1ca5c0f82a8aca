use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::debug;
use walkdir::{DirEntry, WalkDir};

use super::{DataPortal, DatasetInfo};
use crate::data::loader::{self, Separator};
use crate::data::model::Table;

/// Optional file in a dataset directory naming the process that produced it.
pub const PROCESS_FILE: &str = "process.txt";

/// A portal backed by a directory: `<root>/<project>/<dataset>/<files...>`.
#[derive(Debug, Clone)]
pub struct LocalPortal {
    root: PathBuf,
}

impl LocalPortal {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Join `/`-separated segments onto the root, refusing anything that
    /// could leave it.
    fn resolve(&self, segments: &[&str]) -> Result<PathBuf> {
        let mut path = self.root.clone();
        for segment in segments {
            for part in segment.split('/') {
                let mut components = Path::new(part).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(c)), None) => path.push(c),
                    _ => bail!("invalid path segment '{part}' in '{segment}'"),
                }
            }
        }
        Ok(path)
    }

    fn subdirectories(&self, dir: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("listing {}", dir.display()))?;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with('.') && entry.path().is_dir() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

impl DataPortal for LocalPortal {
    fn list_projects(&self) -> Result<Vec<String>> {
        let projects = self.subdirectories(&self.root)?;
        debug!("{} projects under {}", projects.len(), self.root.display());
        Ok(projects)
    }

    fn list_datasets(&self, project: &str) -> Result<Vec<DatasetInfo>> {
        let dir = self.resolve(&[project])?;
        self.subdirectories(&dir)?
            .into_iter()
            .map(|name| -> Result<DatasetInfo> {
                let process_path = dir.join(&name).join(PROCESS_FILE);
                let process = if process_path.is_file() {
                    std::fs::read_to_string(&process_path)
                        .with_context(|| format!("reading {}", process_path.display()))?
                        .trim()
                        .to_string()
                } else {
                    String::new()
                };
                Ok(DatasetInfo {
                    id: name.clone(),
                    name,
                    process,
                })
            })
            .collect()
    }

    fn list_files(&self, project: &str, dataset: &str) -> Result<Vec<String>> {
        let dir = self.resolve(&[project, dataset])?;
        if !dir.is_dir() {
            bail!("dataset '{project}/{dataset}' not found");
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
        {
            let entry = entry.with_context(|| format!("walking {}", dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry.path().strip_prefix(&dir).unwrap_or(entry.path());
            let parts: Vec<String> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect();
            files.push(parts.join("/"));
        }
        files.sort();
        debug!("{} files in {project}/{dataset}", files.len());
        Ok(files)
    }

    fn read_table(
        &self,
        project: &str,
        dataset: &str,
        file: &str,
        sep: Separator,
    ) -> Result<Table> {
        let path = self.resolve(&[project, dataset, file])?;
        loader::load_file(&path, Some(sep))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for rel in [
            "beta/counts/data/table.csv",
            "beta/counts/readme.txt",
            "beta/counts/.hidden/secret.csv",
            "alpha/de/metadata.csv",
            ".cache/x/y.csv",
        ] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "a,b\n1,2\n").unwrap();
        }
        fs::write(root.join("alpha/de/process.txt"), "differential-expression-table\n").unwrap();
        dir
    }

    #[test]
    fn test_cascade_listing() {
        let dir = tree();
        let portal = LocalPortal::new(dir.path());
        assert_eq!(portal.list_projects().unwrap(), vec!["alpha", "beta"]);

        let datasets = portal.list_datasets("alpha").unwrap();
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].process, "differential-expression-table");
        assert_eq!(portal.list_datasets("beta").unwrap()[0].process, "");

        assert_eq!(
            portal.list_files("beta", "counts").unwrap(),
            vec!["data/table.csv", "readme.txt"]
        );
    }

    #[test]
    fn test_read_table_with_separator() {
        let dir = tree();
        let portal = LocalPortal::new(dir.path());
        let t = portal
            .read_table("beta", "counts", "data/table.csv", Separator::Comma)
            .unwrap();
        assert_eq!(t.headers, vec!["a", "b"]);
        let t = portal
            .read_table("beta", "counts", "data/table.csv", Separator::Tab)
            .unwrap();
        assert_eq!(t.headers, vec!["a,b"]);
    }

    #[test]
    fn test_paths_cannot_escape_root() {
        let dir = tree();
        let portal = LocalPortal::new(dir.path().join("beta"));
        assert!(portal.list_datasets("..").is_err());
        assert!(portal.read_table("counts", "..", "alpha/de/metadata.csv", Separator::Comma).is_err());
        assert!(portal.list_files("counts", "/etc").is_err());
        assert!(portal.list_files("missing", "nothing").is_err());
    }
}
