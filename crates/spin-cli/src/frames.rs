//! Frame directory operations: inspection, renaming and manifests

use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use serde::Serialize;
use spin_core::{
    missing_numbers, FrameFileName, FrameUrlScheme, NamingStyle, Rename, SpinManifest, ViewerConfig,
    MANIFEST_FILE,
};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A recognized frame file inside a product directory
#[derive(Debug, Clone, Serialize)]
pub struct FrameEntry {
    pub file_name: String,
    pub number: u32,
    pub style: NamingStyle,
    pub extension: String,
}

/// Everything `inspect` found in a directory
#[derive(Debug, Default)]
pub struct DirectoryReport {
    /// Sorted by frame number
    pub frames: Vec<FrameEntry>,
    pub unrecognized: Vec<String>,
    /// Numbers claimed by more than one file
    pub duplicates: BTreeMap<u32, Vec<String>>,
    /// Runs of missing frame numbers
    pub gaps: Vec<RangeInclusive<u32>>,
}

impl DirectoryReport {
    pub fn styles(&self) -> BTreeMap<NamingStyle, usize> {
        let mut counts = BTreeMap::new();
        for frame in &self.frames {
            *counts.entry(frame.style).or_insert(0) += 1;
        }
        counts
    }

    pub fn extensions(&self) -> BTreeSet<String> {
        self.frames.iter().map(|f| f.extension.clone()).collect()
    }

    /// Whether the names already match the scheme exactly
    pub fn is_canonical(&self, scheme: &FrameUrlScheme) -> bool {
        self.duplicates.is_empty()
            && self
                .frames
                .iter()
                .enumerate()
                .all(|(i, f)| f.file_name == scheme.file_name_with_extension(i, &f.extension))
    }
}

/// Plain file names directly inside `dir`, sorted
pub fn list_files(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Failed to read {}", dir.display()))?;
        if entry.file_type().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

pub fn inspect(dir: &Path) -> Result<DirectoryReport> {
    let mut report = DirectoryReport::default();
    let mut claimed: BTreeMap<u32, Vec<String>> = BTreeMap::new();

    for name in list_files(dir)? {
        if name == MANIFEST_FILE {
            continue;
        }
        match FrameFileName::parse(&name) {
            Some(parsed) => {
                claimed.entry(parsed.number).or_default().push(name.clone());
                report.frames.push(FrameEntry {
                    extension: parsed.canonical_extension().to_string(),
                    file_name: name,
                    number: parsed.number,
                    style: parsed.style,
                });
            }
            None => report.unrecognized.push(name),
        }
    }

    report.frames.sort_by(|a, b| a.number.cmp(&b.number).then_with(|| a.file_name.cmp(&b.file_name)));
    report.gaps = missing_numbers(claimed.keys().copied());
    report.duplicates = claimed.into_iter().filter(|(_, names)| names.len() > 1).collect();
    Ok(report)
}

/// Carry out a normalization plan inside `dir`
///
/// Renames go through temporary names first, so a plan that shifts names
/// onto each other (`000.jpg -> 001.jpg`, `001.jpg -> 002.jpg`) never
/// overwrites a frame. If any rename fails, the files already moved are
/// put back under their original names before the error is returned.
/// Returns the number of files renamed.
pub fn apply_renames(dir: &Path, plan: &[Rename], progress: Option<&ProgressBar>) -> Result<usize> {
    let pending: Vec<&Rename> = plan.iter().filter(|r| !r.is_noop()).collect();
    let sources: HashSet<&str> = plan.iter().map(|r| r.from.as_str()).collect();

    for rename in &pending {
        if !sources.contains(rename.to.as_str()) && dir.join(&rename.to).exists() {
            bail!(
                "Refusing to overwrite {} (not part of the frame set)",
                dir.join(&rename.to).display()
            );
        }
    }

    let mut staged: Vec<StagedRename> = Vec::with_capacity(pending.len());
    for (i, rename) in pending.iter().enumerate() {
        let entry = StagedRename {
            from: dir.join(&rename.from),
            tmp: dir.join(format!(".spin-tmp-{}-{}", i, rename.from)),
            to: dir.join(&rename.to),
        };
        if let Err(e) = std::fs::rename(&entry.from, &entry.tmp) {
            roll_back(&staged, 0);
            return Err(e).with_context(|| format!("Failed to stage {}", entry.from.display()));
        }
        staged.push(entry);
    }

    for (done, entry) in staged.iter().enumerate() {
        if let Err(e) = std::fs::rename(&entry.tmp, &entry.to) {
            roll_back(&staged, done);
            return Err(e).with_context(|| format!("Failed to rename to {}", entry.to.display()));
        }
        if let Some(pb) = progress {
            pb.inc(1);
        }
        tracing::debug!(to = %entry.to.display(), "renamed frame");
    }

    Ok(staged.len())
}

/// A file parked under its temporary name during `apply_renames`
struct StagedRename {
    from: PathBuf,
    tmp: PathBuf,
    to: PathBuf,
}

/// Put every staged file back under its original name
///
/// The first `finalized` entries already reached their target. They are
/// parked again first, so a shifted chain never lands on a name still in use.
/// Best effort: failures are logged and the caller's error is returned.
fn roll_back(staged: &[StagedRename], finalized: usize) {
    for entry in staged[..finalized].iter().rev() {
        if let Err(e) = std::fs::rename(&entry.to, &entry.tmp) {
            tracing::warn!(file = %entry.to.display(), error = %e, "rollback: could not re-stage frame");
        }
    }
    for entry in staged {
        if let Err(e) = std::fs::rename(&entry.tmp, &entry.from) {
            tracing::warn!(file = %entry.tmp.display(), error = %e, "rollback: could not restore frame");
        }
    }
}

/// Build and write `manifest.json` for a product directory
pub fn write_manifest(dir: &Path, product_id: &str, viewer: Option<ViewerConfig>) -> Result<SpinManifest> {
    let report = inspect(dir)?;
    if report.frames.is_empty() {
        bail!("No frames found in {}", dir.display());
    }
    if let Some((number, names)) = report.duplicates.iter().next() {
        bail!("Frame {} is claimed by {}; run normalize first", number, names.join(", "));
    }
    let extensions = report.extensions();
    if extensions.len() > 1 {
        bail!(
            "Mixed image formats ({}); a frame set must use one extension",
            extensions.into_iter().collect::<Vec<_>>().join(", ")
        );
    }
    let extension = extensions.into_iter().next().unwrap_or_else(|| "jpg".to_string());

    let scheme = viewer.as_ref().map(|v| v.url_scheme.clone()).unwrap_or_default();
    if !report.is_canonical(&scheme) {
        tracing::warn!(dir = %dir.display(), "frame names are not canonical; the viewer will miss frames until normalized");
    }

    let manifest = SpinManifest {
        product_id: product_id.to_string(),
        frame_count: report.frames.len(),
        extension,
        viewer,
    };
    let path = dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(&manifest)?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spin_core::plan_normalization;

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), name.as_bytes()).unwrap();
        }
    }

    #[test]
    fn test_inspect_reports_styles_gaps_and_duplicates() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), &["img1.jpg", "001.jpg", "img3.jpg", "0004.jpg", "readme.txt"]);

        let report = inspect(tmp.path()).unwrap();
        assert_eq!(report.frames.len(), 4);
        assert_eq!(report.unrecognized, vec!["readme.txt".to_string()]);
        assert_eq!(report.gaps, vec![2..=2]);
        assert_eq!(report.duplicates.get(&1).map(Vec::len), Some(2));
        assert_eq!(report.styles().get(&NamingStyle::Prefixed), Some(&2));
        assert!(!report.is_canonical(&FrameUrlScheme::default()));
    }

    #[test]
    fn test_shifting_renames_do_not_clobber() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), &["000.jpg", "001.jpg", "002.jpg"]);

        let files = list_files(tmp.path()).unwrap();
        let plan = plan_normalization(&files, &FrameUrlScheme::default()).unwrap();
        let renamed = apply_renames(tmp.path(), &plan, None).unwrap();
        assert_eq!(renamed, 3);

        assert_eq!(list_files(tmp.path()).unwrap(), vec!["001.jpg", "002.jpg", "003.jpg"]);
        // contents moved with their frame
        assert_eq!(std::fs::read_to_string(tmp.path().join("001.jpg")).unwrap(), "000.jpg");
        assert_eq!(std::fs::read_to_string(tmp.path().join("003.jpg")).unwrap(), "002.jpg");
        assert!(inspect(tmp.path()).unwrap().is_canonical(&FrameUrlScheme::default()));
    }

    #[test]
    fn test_refuses_to_overwrite_foreign_file() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), &["img1.png"]);
        std::fs::write(tmp.path().join("001.png"), b"keep").unwrap();

        let plan = vec![Rename {
            from: "img1.png".to_string(),
            to: "001.png".to_string(),
        }];
        assert!(apply_renames(tmp.path(), &plan, None).is_err());
        assert_eq!(std::fs::read(tmp.path().join("001.png")).unwrap(), b"keep");
    }

    #[test]
    fn test_failed_rename_restores_directory() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), &["img1.jpg"]);

        // img2.jpg vanished after planning
        let plan = vec![
            Rename { from: "img1.jpg".to_string(), to: "001.jpg".to_string() },
            Rename { from: "img2.jpg".to_string(), to: "002.jpg".to_string() },
        ];
        assert!(apply_renames(tmp.path(), &plan, None).is_err());
        assert_eq!(list_files(tmp.path()).unwrap(), vec!["img1.jpg"]);
        assert_eq!(std::fs::read_to_string(tmp.path().join("img1.jpg")).unwrap(), "img1.jpg");
    }

    #[test]
    fn test_roll_back_undoes_finalized_chain() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        touch(dir, &["000.jpg", "001.jpg"]);

        // 000 -> 001 already landed, 001 -> 002 still parked
        let staged = vec![
            StagedRename { from: dir.join("000.jpg"), tmp: dir.join(".spin-tmp-0-000.jpg"), to: dir.join("001.jpg") },
            StagedRename { from: dir.join("001.jpg"), tmp: dir.join(".spin-tmp-1-001.jpg"), to: dir.join("002.jpg") },
        ];
        std::fs::rename(dir.join("001.jpg"), &staged[1].tmp).unwrap();
        std::fs::rename(dir.join("000.jpg"), dir.join("001.jpg")).unwrap();

        roll_back(&staged, 1);
        assert_eq!(list_files(dir).unwrap(), vec!["000.jpg", "001.jpg"]);
        assert_eq!(std::fs::read_to_string(dir.join("000.jpg")).unwrap(), "000.jpg");
        assert_eq!(std::fs::read_to_string(dir.join("001.jpg")).unwrap(), "001.jpg");
    }

    #[test]
    fn test_inspect_survives_timestamp_named_file() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), &["001.jpg", "002.jpg", "4294967295.jpg"]);

        let report = inspect(tmp.path()).unwrap();
        assert_eq!(report.frames.len(), 3);
        assert_eq!(report.gaps, vec![3..=4294967294]);
    }

    #[test]
    fn test_manifest_written_next_to_frames() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), &["001.webp", "002.webp", "003.webp"]);

        let manifest = write_manifest(tmp.path(), "sofa-9", None).unwrap();
        assert_eq!(manifest.frame_count, 3);
        assert_eq!(manifest.extension, "webp");

        let loaded = SpinManifest::load(&tmp.path().join(MANIFEST_FILE)).unwrap();
        assert_eq!(loaded, manifest);
        // the manifest itself is not counted as a frame or as clutter
        assert!(inspect(tmp.path()).unwrap().unrecognized.is_empty());
    }

    #[test]
    fn test_manifest_rejects_mixed_formats() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), &["001.jpg", "002.png"]);
        assert!(write_manifest(tmp.path(), "p", None).is_err());
    }
}
