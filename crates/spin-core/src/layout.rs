//! Frame URL scheme and on-disk naming conventions
//!
//! The storefront reads frames from one canonical location:
//! `/images/products/{product}/360/{NNN}.{ext}`. Older upload paths wrote
//! `img{n}.jpg`, 3-digit or 4-digit names; [`FrameFileName::parse`] recognizes
//! all of them so [`plan_normalization`] can migrate a directory onto the
//! canonical names.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ViewerConfig;
use crate::error::{Result, SpinError};

/// Image extensions accepted as frames
pub const FRAME_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "avif"];

/// File name of the per-product manifest written next to the frames
pub const MANIFEST_FILE: &str = "manifest.json";

/// How frame URLs are built from a product id and frame index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameUrlScheme {
    /// Root path the product directories live under
    pub base: String,
    /// Zero-padding width of the frame number
    pub pad_width: usize,
    /// File extension without the dot
    pub extension: String,
    /// Number written for frame index 0
    pub first_number: u32,
}

impl Default for FrameUrlScheme {
    fn default() -> Self {
        Self {
            base: "/images/products".to_string(),
            pad_width: 3,
            extension: "jpg".to_string(),
            first_number: 1,
        }
    }
}

impl FrameUrlScheme {
    /// Directory holding every frame of a product
    pub fn directory(&self, product_id: &str) -> String {
        format!(
            "{}/{}/360",
            self.base.trim_end_matches('/'),
            urlencoding::encode(product_id)
        )
    }

    /// File name for a frame index, e.g. `001.jpg` for frame 0
    pub fn file_name(&self, frame: usize) -> String {
        self.file_name_with_extension(frame, &self.extension)
    }

    /// File name for a frame index with an explicit extension
    pub fn file_name_with_extension(&self, frame: usize, extension: &str) -> String {
        let number = self.first_number as usize + frame;
        format!("{:0width$}.{}", number, extension, width = self.pad_width)
    }

    /// Full URL of a frame
    pub fn frame_url(&self, product_id: &str, frame: usize) -> String {
        format!("{}/{}", self.directory(product_id), self.file_name(frame))
    }

    /// URL of the product's manifest
    pub fn manifest_url(&self, product_id: &str) -> String {
        format!("{}/{}", self.directory(product_id), MANIFEST_FILE)
    }
}

/// Naming convention a frame file was written with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamingStyle {
    /// `img{n}.ext`
    Prefixed,
    /// `{nnn}.ext`
    Padded3,
    /// `{nnnn}.ext`
    Padded4,
    /// Bare digits without a fixed width
    Unpadded,
}

impl NamingStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamingStyle::Prefixed => "prefixed",
            NamingStyle::Padded3 => "padded-3",
            NamingStyle::Padded4 => "padded-4",
            NamingStyle::Unpadded => "unpadded",
        }
    }
}

/// A recognized frame file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFileName {
    pub number: u32,
    pub extension: String,
    pub style: NamingStyle,
}

impl FrameFileName {
    /// Extension the canonical name is written with (`jpeg` becomes `jpg`)
    pub fn canonical_extension(&self) -> &str {
        if self.extension == "jpeg" { "jpg" } else { &self.extension }
    }

    /// Parse a bare file name (no directory); returns None for anything that
    /// is not an image frame
    pub fn parse(name: &str) -> Option<Self> {
        let (stem, ext) = name.rsplit_once('.')?;
        let extension = ext.to_ascii_lowercase();
        if !FRAME_EXTENSIONS.contains(&extension.as_str()) {
            return None;
        }

        // `img`, `IMG` and any other casing of the prefix
        let (digits, prefixed) = match stem.get(..3) {
            Some(prefix) if prefix.eq_ignore_ascii_case("img") => (stem[3..].trim_start_matches(['_', '-']), true),
            _ => (stem, false),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let number = digits.parse().ok()?;

        let style = match digits.len() {
            _ if prefixed => NamingStyle::Prefixed,
            3 => NamingStyle::Padded3,
            4 if digits.starts_with('0') => NamingStyle::Padded4,
            _ => NamingStyle::Unpadded,
        };

        Some(Self { number, extension, style })
    }
}

/// One step of a normalization plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

impl Rename {
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// Plan canonical names for the frame files of one product directory
///
/// Files are ordered by their parsed number and renumbered sequentially from
/// `scheme.first_number`, so gaps are compacted. Each file keeps its own
/// image format; only the stem and extension spelling change. Names that
/// are not frames are left out of the plan. Two files claiming the same
/// number abort the plan since their order cannot be decided.
pub fn plan_normalization<S: AsRef<str>>(files: &[S], scheme: &FrameUrlScheme) -> Result<Vec<Rename>> {
    let mut by_number: BTreeMap<u32, (String, String)> = BTreeMap::new();

    for name in files {
        let name = name.as_ref();
        let Some(parsed) = FrameFileName::parse(name) else {
            tracing::debug!(file = name, "skipping non-frame file");
            continue;
        };
        let extension = parsed.canonical_extension().to_string();
        if let Some((existing, _)) = by_number.insert(parsed.number, (name.to_string(), extension)) {
            let (first, second) = if existing.as_str() < name {
                (existing, name.to_string())
            } else {
                (name.to_string(), existing)
            };
            return Err(SpinError::DuplicateFrame {
                number: parsed.number,
                first,
                second,
            });
        }
    }

    let gaps = missing_numbers(by_number.keys().copied());
    if !gaps.is_empty() {
        tracing::warn!(
            missing = missing_count(&gaps),
            gaps = %format_gaps(&gaps),
            "frame numbering has gaps, compacting"
        );
    }

    Ok(by_number
        .into_values()
        .enumerate()
        .map(|(index, (from, extension))| Rename {
            from,
            to: scheme.file_name_with_extension(index, &extension),
        })
        .collect())
}

/// Runs of numbers missing between the smallest and largest of a sorted,
/// deduplicated sequence
///
/// One range per hole, so a stray `1700000000.jpg` next to `001.jpg` costs a
/// single entry.
pub fn missing_numbers(sorted: impl IntoIterator<Item = u32>) -> Vec<RangeInclusive<u32>> {
    let mut gaps = Vec::new();
    let mut previous: Option<u32> = None;
    for n in sorted {
        if let Some(p) = previous {
            if n > p.saturating_add(1) {
                gaps.push(p + 1..=n - 1);
            }
        }
        previous = Some(n);
    }
    gaps
}

/// Total count of numbers covered by `gaps`
pub fn missing_count(gaps: &[RangeInclusive<u32>]) -> u64 {
    gaps.iter().map(|r| u64::from(r.end() - r.start()) + 1).sum()
}

/// Human-readable list of gaps: `2, 5-9`
pub fn format_gaps(gaps: &[RangeInclusive<u32>]) -> String {
    gaps.iter()
        .map(|r| {
            if r.start() == r.end() {
                r.start().to_string()
            } else {
                format!("{}-{}", r.start(), r.end())
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Per-product description of a frame set, served next to the frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinManifest {
    pub product_id: String,
    pub frame_count: usize,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer: Option<ViewerConfig>,
}

fn default_extension() -> String {
    "jpg".to_string()
}

impl SpinManifest {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| SpinError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Viewer config for this product, with the manifest's extension applied
    pub fn viewer_config(&self) -> ViewerConfig {
        let mut config = self.viewer.clone().unwrap_or_default();
        config.url_scheme.extension = self.extension.clone();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_frame_url() {
        let scheme = FrameUrlScheme::default();
        assert_eq!(scheme.frame_url("chair-42", 0), "/images/products/chair-42/360/001.jpg");
        assert_eq!(scheme.frame_url("chair-42", 35), "/images/products/chair-42/360/036.jpg");
        assert_eq!(scheme.manifest_url("chair-42"), "/images/products/chair-42/360/manifest.json");
    }

    #[test]
    fn test_product_id_is_encoded() {
        let scheme = FrameUrlScheme::default();
        assert_eq!(scheme.directory("a b/c"), "/images/products/a%20b%2Fc/360");
    }

    #[test]
    fn test_four_digit_scheme() {
        let scheme = FrameUrlScheme {
            base: "/360-web/".to_string(),
            pad_width: 4,
            extension: "webp".to_string(),
            first_number: 0,
        };
        assert_eq!(scheme.frame_url("x", 7), "/360-web/x/360/0007.webp");
    }

    #[test]
    fn test_parse_naming_styles() {
        let prefixed = FrameFileName::parse("img12.JPG").unwrap();
        assert_eq!(prefixed.number, 12);
        assert_eq!(prefixed.extension, "jpg");
        assert_eq!(prefixed.style, NamingStyle::Prefixed);

        assert_eq!(FrameFileName::parse("007.png").unwrap().style, NamingStyle::Padded3);
        assert_eq!(FrameFileName::parse("0007.jpg").unwrap().style, NamingStyle::Padded4);
        assert_eq!(FrameFileName::parse("42.jpg").unwrap().style, NamingStyle::Unpadded);
        assert_eq!(FrameFileName::parse("IMG_3.jpeg").unwrap().number, 3);
        assert_eq!(FrameFileName::parse("Img-4.jpg").unwrap().style, NamingStyle::Prefixed);
        assert_eq!(FrameFileName::parse("iMg5.webp").unwrap().number, 5);
    }

    #[test]
    fn test_parse_rejects_non_frames() {
        assert_eq!(FrameFileName::parse("manifest.json"), None);
        assert_eq!(FrameFileName::parse("cover.jpg"), None);
        assert_eq!(FrameFileName::parse("img.jpg"), None);
        assert_eq!(FrameFileName::parse("001"), None);
    }

    #[test]
    fn test_plan_compacts_and_orders() {
        let files = ["img10.jpg", "img2.JPEG", "img1.jpg", "notes.txt"];
        let plan = plan_normalization(&files, &FrameUrlScheme::default()).unwrap();
        assert_eq!(
            plan,
            vec![
                Rename { from: "img1.jpg".into(), to: "001.jpg".into() },
                Rename { from: "img2.JPEG".into(), to: "002.jpg".into() },
                Rename { from: "img10.jpg".into(), to: "003.jpg".into() },
            ]
        );
    }

    #[test]
    fn test_plan_rejects_duplicates() {
        let files = ["001.jpg", "img1.jpg"];
        let err = plan_normalization(&files, &FrameUrlScheme::default()).unwrap_err();
        match err {
            SpinError::DuplicateFrame { number, first, second } => {
                assert_eq!(number, 1);
                assert_eq!(first, "001.jpg");
                assert_eq!(second, "img1.jpg");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_already_canonical_is_noop() {
        let files = ["001.jpg", "002.jpg"];
        let plan = plan_normalization(&files, &FrameUrlScheme::default()).unwrap();
        assert!(plan.iter().all(Rename::is_noop));
    }

    #[test]
    fn test_missing_numbers() {
        let gaps = missing_numbers([1, 2, 5, 7]);
        assert_eq!(gaps, vec![3..=4, 6..=6]);
        assert_eq!(missing_count(&gaps), 3);
        assert_eq!(format_gaps(&gaps), "3-4, 6");
        assert!(missing_numbers([3]).is_empty());
        assert!(missing_numbers([1, 2, 3]).is_empty());
    }

    #[test]
    fn test_huge_gap_is_one_range() {
        let gaps = missing_numbers([1, 2, 1_000_000_000, u32::MAX]);
        assert_eq!(gaps, vec![3..=999_999_999, 1_000_000_001..=u32::MAX - 1]);
        assert_eq!(missing_count(&gaps), 999_999_997 + (u32::MAX as u64 - 1_000_000_001));
    }

    #[test]
    fn test_plan_with_timestamp_named_frame() {
        let files = ["001.jpg", "002.jpg", "1700000000.jpg"];
        let plan = plan_normalization(&files, &FrameUrlScheme::default()).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[2], Rename { from: "1700000000.jpg".into(), to: "003.jpg".into() });
    }

    #[test]
    fn test_manifest_defaults() {
        let manifest = SpinManifest::from_json(r#"{"product_id":"p1","frame_count":36}"#).unwrap();
        assert_eq!(manifest.extension, "jpg");
        assert!(manifest.viewer.is_none());
        assert_eq!(manifest.viewer_config().url_scheme.extension, "jpg");
    }
}
