//! Content type inference for uploads.
//!
//! Two interchangeable strategies sit behind [`ContentTyper`]: a lookup by
//! file extension against the mime-db table shipped with `mime_guess`, and a
//! sniff of the first bytes of the file. Inference never fails; anything
//! unrecognised gets [`FALLBACK_CONTENT_TYPE`].

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// Content type used when nothing better is known.
pub const FALLBACK_CONTENT_TYPE: &str = "text/plain";

/// Upper bound on bytes read when sniffing.
pub const SNIFF_LEN: usize = 512;

/// Infers a MIME type for a local file.
pub trait ContentTyper: Send + Sync {
    fn infer(&self, path: &Path) -> String;
}

/// Which [`ContentTyper`] a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeStrategy {
    /// File extension only.
    #[default]
    Extension,
    /// Leading bytes only.
    Sniff,
    /// Extension first, then leading bytes.
    Layered,
}

impl TypeStrategy {
    pub fn typer(self) -> Arc<dyn ContentTyper> {
        match self {
            TypeStrategy::Extension => Arc::new(ExtensionTyper),
            TypeStrategy::Sniff => Arc::new(SniffTyper),
            TypeStrategy::Layered => Arc::new(LayeredTyper),
        }
    }
}

/// Lookup by file extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionTyper;

impl ExtensionTyper {
    pub fn lookup(path: &Path) -> Option<&'static str> {
        mime_guess::from_path(path).first_raw()
    }
}

impl ContentTyper for ExtensionTyper {
    fn infer(&self, path: &Path) -> String {
        Self::lookup(path).unwrap_or(FALLBACK_CONTENT_TYPE).to_string()
    }
}

/// Magic-number sniffing of the first [`SNIFF_LEN`] bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SniffTyper;

impl SniffTyper {
    pub fn sniff(path: &Path) -> Option<&'static str> {
        let mut head = Vec::with_capacity(SNIFF_LEN);
        File::open(path)
            .ok()?
            .take(SNIFF_LEN as u64)
            .read_to_end(&mut head)
            .ok()?;
        sniff_bytes(&head)
    }
}

impl ContentTyper for SniffTyper {
    fn infer(&self, path: &Path) -> String {
        Self::sniff(path).unwrap_or(FALLBACK_CONTENT_TYPE).to_string()
    }
}

/// Extension lookup with sniffing as a second opinion.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayeredTyper;

impl ContentTyper for LayeredTyper {
    fn infer(&self, path: &Path) -> String {
        ExtensionTyper::lookup(path)
            .or_else(|| SniffTyper::sniff(path))
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string()
    }
}

/// Match well-known file signatures.
pub fn sniff_bytes(head: &[u8]) -> Option<&'static str> {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"%PDF-", "application/pdf"),
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"PK\x03\x04", "application/zip"),
        (b"\x1f\x8b", "application/gzip"),
        (b"BZh", "application/x-bzip2"),
        (b"\xfd7zXZ\x00", "application/x-xz"),
        (b"7z\xbc\xaf\x27\x1c", "application/x-7z-compressed"),
        (b"\x28\xb5\x2f\xfd", "application/zstd"),
        (b"\x00asm", "application/wasm"),
        (b"wOFF", "font/woff"),
        (b"wOF2", "font/woff2"),
        (b"OggS", "audio/ogg"),
        (b"fLaC", "audio/flac"),
        (b"ID3", "audio/mpeg"),
        (b"\x1a\x45\xdf\xa3", "video/webm"),
    ];

    if let Some(mime) = SIGNATURES
        .iter()
        .find(|(magic, _)| head.starts_with(magic))
        .map(|(_, mime)| *mime)
    {
        return Some(mime);
    }

    // RIFF containers carry their format at offset 8
    if head.len() >= 12 && head.starts_with(b"RIFF") {
        match &head[8..12] {
            b"WEBP" => return Some("image/webp"),
            b"WAVE" => return Some("audio/wav"),
            b"AVI " => return Some("video/x-msvideo"),
            _ => {}
        }
    }

    // ISO base media: "ftyp" box at offset 4
    if head.len() >= 12 && &head[4..8] == b"ftyp" {
        return Some(match &head[8..12] {
            b"avif" => "image/avif",
            b"qt  " => "video/quicktime",
            _ => "video/mp4",
        });
    }

    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    let lower = text.get(..text.len().min(64))?.to_ascii_lowercase();
    if lower.starts_with("<!doctype html") || lower.starts_with("<html") {
        return Some("text/html");
    }
    if lower.starts_with("<svg") {
        return Some("image/svg+xml");
    }
    if lower.starts_with("<?xml") {
        return Some(if text.contains("<svg") {
            "image/svg+xml"
        } else {
            "application/xml"
        });
    }

    None
}
