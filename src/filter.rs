//! Extension filter deciding which files are tracked
//!
//! A file is eligible when its name ends with one of the configured
//! suffixes, compared case-insensitively. Suffixes are matched exactly as
//! configured, so `.pdf` matches `report.PDF` but `pdf` also matches
//! `notapdf`. An empty allow-list makes nothing eligible.

/// Check a single file name against an allow-list
///
/// ```rust
/// use noobsave::filter::is_eligible;
///
/// let allowed = vec![".pdf".to_string(), ".txt".to_string()];
/// assert!(is_eligible("Report.PDF", &allowed));
/// assert!(!is_eligible("setup.exe", &allowed));
/// assert!(!is_eligible::<&str>("notes.txt", &[]));
/// ```
pub fn is_eligible<S: AsRef<str>>(file_name: &str, allowed_extensions: &[S]) -> bool {
    let name = file_name.to_lowercase();
    allowed_extensions
        .iter()
        .any(|ext| name.ends_with(&ext.as_ref().to_lowercase()))
}

/// Allow-list prepared once for a whole pass
#[derive(Debug, Clone, Default)]
pub struct ExtensionFilter {
    suffixes: Vec<String>,
}

impl ExtensionFilter {
    /// Build a filter from configured suffixes
    pub fn new<S: AsRef<str>>(allowed_extensions: &[S]) -> Self {
        Self {
            suffixes: allowed_extensions
                .iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Whether `file_name` passes the filter
    pub fn accepts(&self, file_name: &str) -> bool {
        let name = file_name.to_lowercase();
        self.suffixes.iter().any(|suffix| name.ends_with(suffix.as_str()))
    }

    /// Whether the filter rejects everything
    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }
}
