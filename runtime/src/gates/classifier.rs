//! Classify URLs by pattern into a single [`Category`].

use crate::config::FilterFlags;
use crate::types::Category;
use regex::Regex;
use std::sync::LazyLock;

static SECRET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(api[_-]?key|access[_-]?token|secret|auth|password|passwd)")
        .expect("valid secret regex")
});

const CLOUD_HOSTS: &[&str] = &[
    "s3.amazonaws.com",
    "blob.core.windows.net",
    "storage.googleapis.com",
    "digitaloceanspaces.com",
    "r2.cloudflarestorage.com",
];

const COMMON_LIBS: &[&str] = &["jquery", "bootstrap", "react", "vue"];

/// Priority-ordered URL classifier. The first enabled rule that matches wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    flags: FilterFlags,
}

impl Classifier {
    pub fn new(flags: FilterFlags) -> Self {
        Self { flags }
    }

    pub fn flags(&self) -> FilterFlags {
        self.flags
    }

    /// Classify a canonical URL.
    pub fn classify(&self, url: &str) -> Category {
        let lower = url.to_lowercase();
        // Suffix rules look at the URL without its query string.
        let bare = lower.split('?').next().unwrap_or(&lower);
        let flags = self.flags;

        if flags.sensitive {
            if SECRET_RE.is_match(url) {
                return Category::Secret;
            }
            if is_config(&lower) {
                return Category::Config;
            }
            if ends_with_any(bare, &[".bak", ".old", ".swp"]) || lower.contains("backup") {
                return Category::Backup;
            }
            if lower.contains("/.git/") || lower.contains("/.svn/") {
                return Category::Vcs;
            }
            if ends_with_any(bare, &[".sql", ".db", ".dump", ".sqlite"])
                || lower.contains("mysqldump")
            {
                return Category::Database;
            }
            if CLOUD_HOSTS.iter().any(|h| lower.contains(h)) {
                return Category::Cloud;
            }
            if lower.contains("/api/") || lower.contains("swagger") || lower.contains("openapi") {
                return Category::Api;
            }
            if ends_with_any(bare, &[".zip", ".tar.gz", ".rar"]) {
                return Category::Archive;
            }
        }

        if flags.log && (bare.ends_with(".log") || lower.contains("error_log")) {
            return Category::Log;
        }
        if flags.pdf && bare.ends_with(".pdf") {
            return Category::Pdf;
        }
        if flags.config_files && !flags.sensitive && is_config(&lower) {
            return Category::Config;
        }

        if flags.sensitive {
            if ends_with_any(bare, &[".doc", ".docx", ".txt"]) {
                return Category::Doc;
            }
            if ends_with_any(bare, &[".xls", ".xlsx", ".csv"]) {
                return Category::Sheet;
            }
        }

        if flags.params && lower.contains('?') && lower.contains('=') {
            return Category::Param;
        }

        if flags.js && bare.ends_with(".js") {
            if flags.exclude_libs && COMMON_LIBS.iter().any(|lib| lower.contains(lib)) {
                return Category::None;
            }
            return Category::Js;
        }

        Category::None
    }
}

fn is_config(lower: &str) -> bool {
    [".env", "config.", ".yml", ".xml", ".conf"]
        .iter()
        .any(|p| lower.contains(p))
}

fn ends_with_any(s: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|suffix| s.ends_with(suffix))
}
