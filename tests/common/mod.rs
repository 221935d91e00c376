//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use offline_library::{config::IngestConfig, db, services::ensure_storage_dirs};
use sqlx::SqlitePool;
use std::{
    io::{Cursor, Write},
    path::Path,
    sync::Arc,
};
use tempfile::TempDir;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

/// Temp storage directories plus an in-memory database with the schema.
pub struct Fixture {
    pub dir: TempDir,
    pub db: Arc<SqlitePool>,
    pub config: IngestConfig,
}

pub async fn fixture() -> Fixture {
    let dir = TempDir::new().expect("temp dir");
    let config = IngestConfig::with_base_dir(dir.path());
    ensure_storage_dirs(&config).await.expect("storage dirs");
    let db = Arc::new(db::connect_in_memory().await.expect("in-memory db"));
    Fixture { dir, db, config }
}

/// A file that starts with the PDF signature but is not a renderable PDF.
pub fn pdf_bytes() -> Vec<u8> {
    let mut bytes = b"%PDF-1.4\n".to_vec();
    bytes.extend_from_slice(b"not really a pdf body\n");
    bytes
}

/// A small EPUB with the given `dc:subject` values and an EPUB3 cover.
pub fn epub_bytes(subjects: &[&str], cover: &[u8]) -> Vec<u8> {
    let subjects = subjects
        .iter()
        .map(|s| format!("<dc:subject>{s}</dc:subject>"))
        .collect::<String>();
    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="id">test-book</dc:identifier>
    <dc:title>Test Book</dc:title>
    {subjects}
  </metadata>
  <manifest>
    <item id="cover" href="images/cover.jpg" media-type="image/jpeg" properties="cover-image"/>
    <item id="ch1" href="ch1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine><itemref idref="ch1"/></spine>
</package>"#
    );
    let container = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;
    let chapter = r#"<html xmlns="http://www.w3.org/1999/xhtml"><body><p>Hello</p></body></html>"#;

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let entries: [(&str, &[u8]); 5] = [
        ("mimetype", b"application/epub+zip"),
        ("META-INF/container.xml", container.as_bytes()),
        ("OEBPS/content.opf", opf.as_bytes()),
        ("OEBPS/ch1.xhtml", chapter.as_bytes()),
        ("OEBPS/images/cover.jpg", cover),
    ];
    for (name, data) in entries {
        zip.start_file(name, options).expect("zip entry");
        zip.write_all(data).expect("zip write");
    }
    zip.finish().expect("zip finish").into_inner()
}

/// Number of regular files directly inside `dir`.
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| e.path().is_file())
                .count()
        })
        .unwrap_or(0)
}

/// An EPUB with no usable declared cover whose first chapter (with a
/// DOCTYPE) shows `page_image`. With `dangling_cover` the package names a
/// cover image that the archive does not contain.
pub fn epub_with_page_image(page_image: &[u8], dangling_cover: bool) -> Vec<u8> {
    let cover_item = if dangling_cover {
        r#"<item id="cover" href="images/missing.jpg" media-type="image/jpeg" properties="cover-image"/>"#
    } else {
        ""
    };
    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>Pages</dc:title></metadata>
  <manifest>
    {cover_item}
    <item id="ch1" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine><itemref idref="ch1"/></spine>
</package>"#
    );
    let container = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles><rootfile full-path="OEBPS/content.opf"/></rootfiles>
</container>"#;
    let chapter = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml"><body><img src="../images/page1.jpg"/></body></html>"#;

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let entries: [(&str, &[u8]); 5] = [
        ("mimetype", b"application/epub+zip"),
        ("META-INF/container.xml", container.as_bytes()),
        ("OEBPS/content.opf", opf.as_bytes()),
        ("OEBPS/text/ch1.xhtml", chapter.as_bytes()),
        ("OEBPS/images/page1.jpg", page_image),
    ];
    for (name, data) in entries {
        zip.start_file(name, options).expect("zip entry");
        zip.write_all(data).expect("zip write");
    }
    zip.finish().expect("zip finish").into_inner()
}
