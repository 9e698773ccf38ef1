use std::path::{Path, PathBuf};

use log::{debug, info};
use walkdir::{DirEntry, WalkDir};

use super::batch::BatchError;

/// Default name of the per-sample quantitation report.
pub const DEFAULT_RESULT_FILE: &str = "a-all.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Exact file name looked for in each sample folder.
    pub file_name: String,
    /// Search at any depth instead of direct subfolders only.
    pub recursive: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        DiscoveryOptions {
            file_name: DEFAULT_RESULT_FILE.to_string(),
            recursive: false,
        }
    }
}

/// A result file together with the sample it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFile {
    pub sample: String,
    pub path: PathBuf,
}

fn is_target(entry: &DirEntry, file_name: &str) -> bool {
    entry.file_type().is_file() && entry.file_name().to_string_lossy() == file_name
}

/// Sample name of a result file: its folder name without extension, so
/// `Batch/QC_01.D/a-all.txt` belongs to `QC_01`.
fn sample_name(path: &Path) -> Option<String> {
    path.parent()
        .and_then(|p| p.file_stem())
        .map(|n| n.to_string_lossy().into_owned())
}

/// Find every result file below `root`, sorted by path so repeated runs see
/// the samples in the same order.
pub fn discover_samples(root: &Path, options: &DiscoveryOptions) -> Result<Vec<SampleFile>, BatchError> {
    if !root.is_dir() {
        return Err(BatchError::RootNotFound(root.to_path_buf()));
    }

    let walker = if options.recursive {
        WalkDir::new(root).min_depth(1)
    } else {
        WalkDir::new(root).min_depth(2).max_depth(2)
    };

    let mut found = Vec::new();
    for entry in walker
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| is_target(e, &options.file_name))
    {
        let path = entry.into_path();
        let sample = sample_name(&path).ok_or_else(|| BatchError::NoSampleName(path.clone()))?;
        debug!("found {} for sample {sample}", path.display());
        found.push(SampleFile { sample, path });
    }

    info!(
        "discovered {} '{}' files under {}",
        found.len(),
        options.file_name,
        root.display()
    );
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn finds_files_in_direct_subfolders_only() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "B/a-all.txt");
        touch(dir.path(), "A/a-all.txt");
        touch(dir.path(), "A/other.txt");
        touch(dir.path(), "deep/nested/a-all.txt");
        touch(dir.path(), "a-all.txt");

        let found = discover_samples(dir.path(), &DiscoveryOptions::default()).unwrap();
        let names: Vec<_> = found.iter().map(|f| f.sample.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn recursive_search_reaches_nested_folders() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "A/a-all.txt");
        touch(dir.path(), "deep/nested/a-all.txt");

        let options = DiscoveryOptions {
            recursive: true,
            ..DiscoveryOptions::default()
        };
        let found = discover_samples(dir.path(), &options).unwrap();
        let names: Vec<_> = found.iter().map(|f| f.sample.as_str()).collect();
        assert_eq!(names, vec!["A", "nested"]);
    }

    #[test]
    fn folder_extension_is_not_part_of_sample_name() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "QC_01.D/a-all.txt");
        let found = discover_samples(dir.path(), &DiscoveryOptions::default()).unwrap();
        assert_eq!(found[0].sample, "QC_01");
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            discover_samples(&missing, &DiscoveryOptions::default()),
            Err(BatchError::RootNotFound(_))
        ));
    }
}
