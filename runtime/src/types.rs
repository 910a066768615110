//! Records flowing through the pipeline and the closed set of categories.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification tag assigned to a surviving record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Secret,
    Config,
    Backup,
    Vcs,
    Database,
    Cloud,
    Api,
    Archive,
    Log,
    Pdf,
    Doc,
    Sheet,
    Param,
    Js,
    #[default]
    None,
}

impl Category {
    /// Every category except `None`, in classification priority order.
    pub const ALL: [Category; 14] = [
        Category::Secret,
        Category::Config,
        Category::Backup,
        Category::Vcs,
        Category::Database,
        Category::Cloud,
        Category::Api,
        Category::Archive,
        Category::Log,
        Category::Pdf,
        Category::Doc,
        Category::Sheet,
        Category::Param,
        Category::Js,
    ];

    /// Number of distinct categories including `None`.
    pub const COUNT: usize = 15;

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Secret => "secret",
            Category::Config => "config",
            Category::Backup => "backup",
            Category::Vcs => "vcs",
            Category::Database => "database",
            Category::Cloud => "cloud",
            Category::Api => "api",
            Category::Archive => "archive",
            Category::Log => "log",
            Category::Pdf => "pdf",
            Category::Doc => "doc",
            Category::Sheet => "sheet",
            Category::Param => "param",
            Category::Js => "js",
            Category::None => "none",
        }
    }

    /// Stable index, used for per-category counters.
    pub fn index(self) -> usize {
        match self {
            Category::Secret => 0,
            Category::Config => 1,
            Category::Backup => 2,
            Category::Vcs => 3,
            Category::Database => 4,
            Category::Cloud => 5,
            Category::Api => 6,
            Category::Archive => 7,
            Category::Log => 8,
            Category::Pdf => 9,
            Category::Doc => 10,
            Category::Sheet => 11,
            Category::Param => 12,
            Category::Js => 13,
            Category::None => 14,
        }
    }

    pub fn is_none(self) -> bool {
        self == Category::None
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single discovered URL travelling through the gate chain.
///
/// The producing source is fixed at construction. The category can be
/// assigned once; later assignments are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRecord {
    #[serde(rename = "normalized_url")]
    url: String,
    source: String,
    #[serde(rename = "http_status", skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    category: Category,
}

impl ScanRecord {
    /// Create a freshly discovered record with no status and category `none`.
    pub fn discovered(url: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            source: source.into(),
            status_code: None,
            category: Category::None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub(crate) fn set_url(&mut self, url: String) {
        self.url = url;
    }

    pub(crate) fn set_status_code(&mut self, code: u16) {
        self.status_code = Some(code);
    }

    /// Assign the classification. Only the first non-`none` assignment sticks.
    pub(crate) fn set_category(&mut self, category: Category) {
        if self.category.is_none() {
            self.category = category;
        }
    }
}
