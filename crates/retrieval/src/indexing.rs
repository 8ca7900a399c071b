//! Indexing pipeline: route files by type (text, markdown, PDF), clean,
//! split by word, write.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::backend::{Document, DocumentStore};
use crate::error::RetrievalError;

/// How a source file is converted to text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Text,
    Markdown,
    Pdf,
}

fn route(path: &Path) -> Option<FileKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "txt" | "text" => Some(FileKind::Text),
        "md" | "markdown" => Some(FileKind::Markdown),
        "pdf" => Some(FileKind::Pdf),
        _ => None,
    }
}

/// Strip markdown syntax that carries no searchable text.
fn markdown_to_text(source: &str) -> String {
    source
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .map(|line| line.trim_start().trim_start_matches('#').trim_start())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text of every page, in page order.
fn pdf_to_text(bytes: &[u8]) -> Result<String, lopdf::Error> {
    let doc = lopdf::Document::load_mem(bytes)?;
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    doc.extract_text(&pages)
}

/// Trim every line, collapse runs of whitespace, and drop empty lines.
pub fn clean_text(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Splits text into windows of `length` words overlapping by `overlap` words.
#[derive(Debug, Clone, Copy)]
pub struct WordSplitter {
    length: usize,
    overlap: usize,
}

impl WordSplitter {
    pub fn new(length: usize, overlap: usize) -> Result<Self, RetrievalError> {
        if length == 0 || overlap >= length {
            return Err(RetrievalError::Config(format!(
                "split overlap ({overlap}) must be smaller than split length ({length})"
            )));
        }
        Ok(Self { length, overlap })
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }

        let step = self.length - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.length).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end == words.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}

/// Outcome of one indexing run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub files_seen: usize,
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub documents_written: usize,
}

pub struct IndexingPipeline {
    store: Arc<dyn DocumentStore>,
    splitter: WordSplitter,
}

impl IndexingPipeline {
    pub fn new(store: Arc<dyn DocumentStore>, splitter: WordSplitter) -> Self {
        Self { store, splitter }
    }

    /// Index every supported file under `dir`, recursively.
    pub async fn run(&self, dir: &Path) -> Result<IndexReport, RetrievalError> {
        if !dir.is_dir() {
            return Err(RetrievalError::Io {
                path: dir.display().to_string(),
                reason: "input directory does not exist".into(),
            });
        }

        self.store.prepare().await?;

        let mut files = Vec::new();
        collect_files(dir, &mut files)?;
        files.sort();

        let mut report = IndexReport::default();
        let mut documents = Vec::new();

        for path in files {
            report.files_seen += 1;
            let Some(kind) = route(&path) else {
                warn!(path = %path.display(), "Skipping unsupported file type");
                report.files_skipped += 1;
                continue;
            };

            let text = match kind {
                FileKind::Pdf => match read_pdf(&path).await {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping unreadable PDF");
                        report.files_skipped += 1;
                        continue;
                    }
                },
                FileKind::Text => read_text(&path).await?,
                FileKind::Markdown => markdown_to_text(&read_text(&path).await?),
            };

            let source = path.display().to_string();
            let chunks = self.splitter.split(&clean_text(&text));
            debug!(path = %source, chunks = chunks.len(), "Split file");
            documents.extend(chunks.into_iter().map(|c| Document::new(c).with_source(source.clone())));
            report.files_indexed += 1;
        }

        // Identical fragments collapse to one write
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        documents.dedup_by(|a, b| a.id == b.id);

        report.documents_written = self.store.write_documents(&documents).await?;
        info!(
            files = report.files_indexed,
            skipped = report.files_skipped,
            documents = report.documents_written,
            "Indexing complete"
        );
        Ok(report)
    }
}

async fn read_text(path: &Path) -> Result<String, RetrievalError> {
    tokio::fs::read_to_string(path).await.map_err(|e| RetrievalError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

async fn read_pdf(path: &Path) -> Result<String, RetrievalError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| RetrievalError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let extract_err = |reason: String| RetrievalError::Extract {
        path: path.display().to_string(),
        reason,
    };
    tokio::task::spawn_blocking(move || pdf_to_text(&bytes))
        .await
        .map_err(|e| extract_err(e.to_string()))?
        .map_err(|e| extract_err(e.to_string()))
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RetrievalError> {
    let io_err = |e: std::io::Error| RetrievalError::Io {
        path: dir.display().to_string(),
        reason: e.to_string(),
    };
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}
