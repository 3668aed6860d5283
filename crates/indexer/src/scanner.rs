use crate::classifier::classify;
use crate::error::{IndexerError, Result};
use crate::limits::LoadLimiter;
use crate::paths::resolve_within;
use simlog_protocol::{Config, DirectoryTree, Run, RunId, Zone};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;
use walkdir::{DirEntry, WalkDir};

/// Scanner for the fixed `zone/config/run` hierarchy of simulation output
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    root: PathBuf,
    limiter: LoadLimiter,
}

impl DirectoryScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            limiter: LoadLimiter::default(),
        }
    }

    /// Shares permits with other components holding the same limiter.
    pub fn with_limiter(mut self, limiter: LoadLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `relative` under the root and requires it to be a directory.
    pub fn resolve_dir(&self, relative: &str) -> Result<PathBuf> {
        let dir = resolve_within(&self.root, relative)?;
        if !dir.is_dir() {
            return Err(IndexerError::NotFound(relative.to_string()));
        }
        Ok(dir)
    }

    /// Builds the full tree under `relative`, scanning zones concurrently.
    pub async fn scan(&self, relative: &str) -> Result<DirectoryTree> {
        let dir = self.resolve_dir(relative)?;
        let zones = {
            let dir = dir.clone();
            tokio::task::spawn_blocking(move || subdirectories(&dir))
                .await
                .map_err(|err| IndexerError::Internal(err.to_string()))??
        };

        let mut join = JoinSet::new();
        for (name, path) in zones {
            let permit = self
                .limiter
                .acquire()
                .await
                .map_err(|err| IndexerError::Internal(err.to_string()))?;
            join.spawn_blocking(move || {
                let _permit = permit;
                scan_zone(&path).map(|zone| (name, zone))
            });
        }

        let mut tree = DirectoryTree {
            url: relative.to_string(),
            zones: BTreeMap::new(),
        };
        while let Some(joined) = join.join_next().await {
            let (name, zone) = joined.map_err(|err| IndexerError::Internal(err.to_string()))??;
            tree.zones.insert(name, zone);
        }

        log::info!(
            "Scanned {}: {} zones, {} runs",
            dir.display(),
            tree.zones.len(),
            tree.zones
                .values()
                .flat_map(|zone| zone.configs.values())
                .map(|config| config.runs.len())
                .sum::<usize>()
        );
        Ok(tree)
    }

    /// Lists the runs directly under a config directory.
    pub async fn scan_runs(&self, relative: &str) -> Result<BTreeMap<RunId, Run>> {
        let dir = self.resolve_dir(relative)?;
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|err| IndexerError::Internal(err.to_string()))?;
        tokio::task::spawn_blocking(move || scan_config(&dir))
            .await
            .map_err(|err| IndexerError::Internal(err.to_string()))?
    }
}

fn scan_zone(path: &Path) -> Result<Zone> {
    let mut zone = Zone::default();
    for (name, config_path) in subdirectories(path)? {
        let runs = scan_config(&config_path)?;
        zone.configs.insert(name, Config { runs });
    }
    Ok(zone)
}

fn scan_config(path: &Path) -> Result<BTreeMap<RunId, Run>> {
    let mut runs = BTreeMap::new();
    for (name, run_path) in subdirectories(path)? {
        runs.insert(name, scan_run(&run_path)?);
    }
    Ok(runs)
}

fn scan_run(path: &Path) -> Result<Run> {
    let mut run = Run::default();
    for entry in children(path)? {
        if !entry.file_type().is_file() {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().into_owned();
        let classified = classify(&filename);
        match classified.category {
            Some(category) => run.push(category, classified.filename),
            None => log::trace!("Ignoring unclassified file {}", entry.path().display()),
        }
    }
    Ok(run)
}

fn subdirectories(path: &Path) -> Result<Vec<(String, PathBuf)>> {
    Ok(children(path)?
        .into_iter()
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| {
            (
                entry.file_name().to_string_lossy().into_owned(),
                entry.into_path(),
            )
        })
        .collect())
}

/// Immediate children, sorted by name so file lists are deterministic.
fn children(path: &Path) -> Result<Vec<DirEntry>> {
    if !path.is_dir() {
        return Ok(Vec::new());
    }
    WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| entry.map_err(IndexerError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "a,b\n1,2\n").unwrap();
    }

    #[test]
    fn scan_run_buckets_by_category() {
        let temp = TempDir::new().unwrap();
        for name in [
            "lift_logbook.csv",
            "605_timeline_logbook_L3.csv",
            "timeline_logbook.csv",
            "passenger_logbook.csv",
            "notes.txt",
            "passenger_logbook.feather",
        ] {
            touch(temp.path(), name);
        }
        std::fs::create_dir(temp.path().join("lift_logbook_dir.csv")).unwrap();

        let run = scan_run(temp.path()).unwrap();
        assert_eq!(run.lift_logbooks, vec!["lift_logbook.csv"]);
        assert_eq!(
            run.timeline_logbooks,
            vec!["605_timeline_logbook_L3.csv", "timeline_logbook.csv"]
        );
        assert_eq!(run.passenger_logbooks, vec!["passenger_logbook.csv"]);
    }

    #[test]
    fn missing_directory_has_no_children() {
        let temp = TempDir::new().unwrap();
        assert!(children(&temp.path().join("absent")).unwrap().is_empty());
    }
}
