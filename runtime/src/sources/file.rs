//! Replay URLs from a local file, one per line.

use super::{RecordSender, Source};
use crate::error::SourceError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl Source for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    fn needs_key(&self) -> bool {
        false
    }

    async fn run(
        &self,
        cancel: &CancellationToken,
        out: &RecordSender,
    ) -> Result<(), SourceError> {
        let io_err = |source| SourceError::Io {
            path: self.path.clone(),
            source,
        };
        let file = tokio::fs::File::open(&self.path).await.map_err(io_err)?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();

        // Byte lines: a line that isn't UTF-8 is passed on lossily and left to
        // the normalizer, the rest of the file is still read.
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await.map_err(io_err)? == 0 {
                break;
            }
            if cancel.is_cancelled() {
                return Err(SourceError::Cancelled);
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            out.emit(line).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_reads_non_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "http://a.example.com/x\n\n  \nexample.com/y\n").unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let out = RecordSender::new(tx, cancel.clone(), "file");
        FileSource::new(&path).run(&cancel, &out).await.unwrap();
        drop(out);

        let mut urls = Vec::new();
        while let Some(r) = rx.recv().await {
            assert_eq!(r.source(), "file");
            urls.push(r.url().to_string());
        }
        assert_eq!(urls, vec!["http://a.example.com/x", "example.com/y"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_end_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        let mut content = b"http://example.com/a\nhttp://example.com/".to_vec();
        content.extend_from_slice(&[0xff, 0xfe]);
        content.extend_from_slice(b"\nhttp://example.com/b\r\nhttp://example.com/c");
        std::fs::write(&path, content).unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let out = RecordSender::new(tx, cancel.clone(), "file");
        FileSource::new(&path).run(&cancel, &out).await.unwrap();
        drop(out);

        let mut urls = Vec::new();
        while let Some(r) = rx.recv().await {
            urls.push(r.url().to_string());
        }
        assert_eq!(urls.len(), 4);
        assert_eq!(urls[0], "http://example.com/a");
        assert!(urls[1].contains('\u{fffd}'));
        assert_eq!(urls[2..], ["http://example.com/b", "http://example.com/c"]);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let (tx, _rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let out = RecordSender::new(tx, cancel.clone(), "file");
        let res = FileSource::new("/no/such/urls.txt").run(&cancel, &out).await;
        assert!(matches!(res, Err(SourceError::Io { .. })));
    }
}
