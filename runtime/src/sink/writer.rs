//! File and stdout writer for scan results.
//!
//! Layout under the output directory:
//!
//! ```text
//! <dir>/all_urls.txt
//! <dir>/sensitiveurls/<category>_urls.txt   (created on first use)
//! ```

use super::Sink;
use crate::error::SinkError;
use crate::types::{Category, ScanRecord};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// File every surviving URL is written to.
pub const MAIN_FILE: &str = "all_urls.txt";

/// Subdirectory holding the per-category files.
pub const CATEGORY_DIR: &str = "sensitiveurls";

/// Where and how records are written.
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    /// Output directory. `None` writes nothing to disk.
    pub dir: Option<PathBuf>,
    /// Write each record as a JSON line instead of the bare URL.
    pub json: bool,
    /// Echo each line to stdout.
    pub stdout: bool,
}

/// File name for a category's output file.
pub fn category_file(category: Category) -> Option<&'static str> {
    let name = match category {
        Category::Secret => "secret_urls.txt",
        Category::Config => "config_urls.txt",
        Category::Backup => "backup_exposure_urls.txt",
        Category::Database => "database_backup_urls.txt",
        Category::Api => "api_specs_urls.txt",
        Category::Param => "parameter_urls.txt",
        Category::Js => "js_urls.txt",
        Category::Pdf => "pdf_urls.txt",
        Category::Log => "log_urls.txt",
        Category::Vcs => "vcs_exposure_urls.txt",
        Category::Cloud => "cloud_urls.txt",
        Category::Archive => "archive_urls.txt",
        Category::Doc => "doc_urls.txt",
        Category::Sheet => "sheet_urls.txt",
        Category::None => return None,
    };
    Some(name)
}

#[derive(Default)]
struct Files {
    main: Option<BufWriter<File>>,
    categories: HashMap<Category, BufWriter<File>>,
}

/// Buffered writer behind a mutex, shared by all pipeline workers.
pub struct OutputWriter {
    options: OutputOptions,
    files: Mutex<Files>,
}

impl OutputWriter {
    /// Create the output directories and the main file.
    pub fn create(options: OutputOptions) -> Result<Self, SinkError> {
        let mut files = Files::default();

        if let Some(dir) = &options.dir {
            let category_dir = dir.join(CATEGORY_DIR);
            std::fs::create_dir_all(&category_dir).map_err(|source| SinkError::Create {
                path: category_dir.clone(),
                source,
            })?;
            files.main = Some(open(&dir.join(MAIN_FILE))?);
        }

        Ok(Self {
            options,
            files: Mutex::new(files),
        })
    }

    pub fn options(&self) -> &OutputOptions {
        &self.options
    }

    fn format(&self, record: &ScanRecord) -> Result<String, SinkError> {
        if self.options.json {
            Ok(serde_json::to_string(record)?)
        } else {
            Ok(record.url().to_string())
        }
    }
}

fn open(path: &Path) -> Result<BufWriter<File>, SinkError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| SinkError::Create {
            path: path.to_path_buf(),
            source,
        })
}

impl Sink for OutputWriter {
    fn write(&self, record: &ScanRecord) -> Result<(), SinkError> {
        let line = self.format(record)?;
        let mut files = self.files.lock().map_err(|_| SinkError::Poisoned)?;

        if self.options.stdout {
            writeln!(std::io::stdout().lock(), "{line}")?;
        }

        if let Some(main) = files.main.as_mut() {
            writeln!(main, "{line}")?;
        }

        if let (Some(dir), Some(name)) = (&self.options.dir, category_file(record.category())) {
            let writer = match files.categories.entry(record.category()) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => {
                    e.insert(open(&dir.join(CATEGORY_DIR).join(name))?)
                }
            };
            writeln!(writer, "{line}")?;
        }

        Ok(())
    }

    fn close(&self) -> Result<(), SinkError> {
        let mut files = self.files.lock().map_err(|_| SinkError::Poisoned)?;
        if let Some(main) = files.main.as_mut() {
            main.flush()?;
        }
        for writer in files.categories.values_mut() {
            writer.flush()?;
        }
        if self.options.stdout {
            std::io::stdout().flush()?;
        }
        Ok(())
    }
}
