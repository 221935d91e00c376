//! Minimal EPUB package reader: locates the OPF through
//! `META-INF/container.xml` and pulls out the bits the pipeline needs
//! (subjects, cover image, first spine document).

use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, Read},
    path::Path,
};
use thiserror::Error;
use zip::ZipArchive;

#[derive(Debug, Error)]
pub enum EpubError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("zip: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("xml: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("{0}")]
    Malformed(String),
}

/// One manifest entry of the OPF package.
#[derive(Debug, Clone)]
struct ManifestItem {
    href: String,
    media_type: String,
    properties: String,
}

/// Parsed OPF package document.
#[derive(Debug, Default)]
pub struct Package {
    /// Directory of the OPF inside the archive, used to resolve hrefs.
    base_dir: String,
    subjects: Vec<String>,
    manifest: BTreeMap<String, ManifestItem>,
    cover_meta_id: Option<String>,
    spine: Vec<String>,
}

pub struct EpubArchive {
    archive: ZipArchive<File>,
    package: Package,
}

impl EpubArchive {
    pub fn open(path: &Path) -> Result<Self, EpubError> {
        let mut archive = ZipArchive::new(File::open(path)?)?;
        let container = read_string(&mut archive, "META-INF/container.xml")?;
        let opf_path = parse_container(&container)?;
        let opf = read_string(&mut archive, &opf_path)?;

        let base_dir = match opf_path.rsplit_once('/') {
            Some((dir, _)) => dir.to_string(),
            None => String::new(),
        };
        let mut package = parse_opf(&opf)?;
        package.base_dir = base_dir;

        Ok(Self { archive, package })
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Raw bytes of the declared cover image, if the package names one.
    pub fn cover_image(&mut self) -> Result<Option<Vec<u8>>, EpubError> {
        let Some(href) = self.package.cover_href() else {
            return Ok(None);
        };
        let path = resolve_path(&self.package.base_dir, &href);
        read_bytes(&mut self.archive, &path).map(Some)
    }

    /// First image referenced by the first spine document. This is what a
    /// reader shows as the opening page of a book without a declared cover.
    pub fn first_page_image(&mut self) -> Result<Option<Vec<u8>>, EpubError> {
        let Some(first) = self.package.spine.first().cloned() else {
            return Ok(None);
        };
        let Some(item) = self.package.manifest.get(&first).cloned() else {
            return Ok(None);
        };

        let doc_path = resolve_path(&self.package.base_dir, &item.href);
        let xhtml = read_string(&mut self.archive, &doc_path)?;
        let doc = parse_xml(&xhtml)?;

        let src = doc.descendants().find_map(|node| match node.tag_name().name() {
            "img" => node.attribute("src"),
            "image" => node
                .attributes()
                .find(|attr| attr.name() == "href")
                .map(|attr| attr.value()),
            _ => None,
        });
        let Some(src) = src else {
            return Ok(None);
        };

        let doc_dir = doc_path.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        let path = resolve_path(doc_dir, src);
        read_bytes(&mut self.archive, &path).map(Some)
    }
}

impl Package {
    /// All `dc:subject` values joined into one comma-separated field.
    pub fn subject(&self) -> Option<String> {
        if self.subjects.is_empty() {
            None
        } else {
            Some(self.subjects.join(", "))
        }
    }

    fn cover_href(&self) -> Option<String> {
        // EPUB3 marks the cover in the manifest.
        let epub3 = self
            .manifest
            .values()
            .find(|item| item.properties.split_whitespace().any(|p| p == "cover-image"));
        if let Some(item) = epub3 {
            return Some(item.href.clone());
        }

        // EPUB2 points at a manifest id from <meta name="cover">.
        let id = self.cover_meta_id.as_ref()?;
        self.manifest
            .get(id)
            .filter(|item| item.media_type.starts_with("image/"))
            .map(|item| item.href.clone())
    }
}

/// Parse package XML. Chapters routinely carry `<!DOCTYPE html>`, so DTDs
/// are allowed (roxmltree never resolves external entities).
fn parse_xml(xml: &str) -> Result<roxmltree::Document<'_>, roxmltree::Error> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    roxmltree::Document::parse_with_options(xml, options)
}

fn parse_container(xml: &str) -> Result<String, EpubError> {
    let doc = parse_xml(xml)?;
    doc.descendants()
        .find(|node| node.tag_name().name() == "rootfile")
        .and_then(|node| node.attribute("full-path"))
        .map(str::to_string)
        .ok_or_else(|| EpubError::Malformed("no rootfile in container.xml".into()))
}

fn parse_opf(xml: &str) -> Result<Package, EpubError> {
    let doc = parse_xml(xml)?;
    let mut package = Package::default();

    for node in doc.descendants() {
        match node.tag_name().name() {
            "subject" => {
                if let Some(text) = node.text() {
                    let text = text.trim();
                    if !text.is_empty() {
                        package.subjects.push(text.to_string());
                    }
                }
            }
            "meta" if node.attribute("name") == Some("cover") => {
                package.cover_meta_id = node.attribute("content").map(str::to_string);
            }
            "item" => {
                if let (Some(id), Some(href)) = (node.attribute("id"), node.attribute("href")) {
                    package.manifest.insert(
                        id.to_string(),
                        ManifestItem {
                            href: href.to_string(),
                            media_type: node.attribute("media-type").unwrap_or("").to_string(),
                            properties: node.attribute("properties").unwrap_or("").to_string(),
                        },
                    );
                }
            }
            "itemref" => {
                if let Some(idref) = node.attribute("idref") {
                    package.spine.push(idref.to_string());
                }
            }
            _ => {}
        }
    }

    Ok(package)
}

fn read_bytes(archive: &mut ZipArchive<File>, path: &str) -> Result<Vec<u8>, EpubError> {
    let mut entry = archive.by_name(path)?;
    let mut buf = Vec::new();
    entry.read_to_end(&mut buf)?;
    Ok(buf)
}

fn read_string(archive: &mut ZipArchive<File>, path: &str) -> Result<String, EpubError> {
    let bytes = read_bytes(archive, path)?;
    String::from_utf8(bytes).map_err(|e| EpubError::Malformed(format!("{path}: {e}")))
}

/// Resolve an href relative to a directory inside the archive, folding
/// `.` and `..` segments.
fn resolve_path(base_dir: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or(href);
    let mut parts: Vec<&str> = if href.starts_with('/') {
        Vec::new()
    } else {
        base_dir.split('/').filter(|s| !s.is_empty()).collect()
    };
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}
