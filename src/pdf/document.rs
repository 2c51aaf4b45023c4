use crate::error::SplitError;
use lopdf::xref::XrefEntry;
use lopdf::{Dictionary, Document, Object, ObjectId, Reader};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct PdfDocument {
    pub doc: Document,
    pub path: PathBuf,
}

impl PdfDocument {
    /// Load a PDF and unlock it with `password` if it is encrypted. Page
    /// access is only possible once this returns.
    pub fn open<P: AsRef<Path>>(path: P, password: Option<&str>) -> Result<Self, SplitError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(SplitError::SourceNotFound { path });
        }

        let bytes = fs::read(&path).map_err(|source| SplitError::Io {
            path: path.clone(),
            source,
        })?;
        let doc = Document::load_mem(&bytes).map_err(|source| SplitError::Load {
            path: path.clone(),
            source,
        })?;

        let mut pdf = Self::from_document(doc, path);
        pdf.unlock(&bytes, password)?;
        debug!(path = %pdf.path.display(), pages = pdf.page_count(), "opened PDF");
        Ok(pdf)
    }

    /// Wrap an already-loaded, unencrypted document.
    pub fn from_document(doc: Document, path: impl Into<PathBuf>) -> Self {
        PdfDocument {
            doc,
            path: path.into(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Page object IDs in document order; position `i` is page index `i`.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        // get_pages is keyed by 1-based page number, so values come out in order.
        self.doc.get_pages().into_values().collect()
    }

    pub fn is_encrypted(&self) -> bool {
        self.doc.is_encrypted()
    }

    /// Leave the document decrypted with no `Encrypt` entry. `bytes` is the
    /// file the document was loaded from.
    fn unlock(&mut self, bytes: &[u8], password: Option<&str>) -> Result<(), SplitError> {
        if !self.is_encrypted() {
            return Ok(());
        }

        // lopdf already decrypted everything with the empty user password.
        if self.doc.encryption_state.is_some() {
            if let Some(password) = password {
                self.authenticate(password)?;
            }
            if let Some(Object::Reference(id)) = self.doc.trailer.remove(b"Encrypt") {
                self.doc.objects.remove(&id);
            }
            debug!(path = %self.path.display(), "opened PDF with empty user password");
            return Ok(());
        }

        let Some(password) = password else {
            return Err(SplitError::PasswordRequired {
                path: self.path.clone(),
            });
        };
        self.authenticate(password)?;

        // Without a working password lopdf keeps only the Encrypt dictionary,
        // so the remaining objects are read again before decrypting.
        let doc = std::mem::take(&mut self.doc);
        self.doc = read_encrypted_objects(doc, bytes);
        let malformed = |source: lopdf::Error| SplitError::Load {
            path: self.path.clone(),
            source,
        };
        self.doc.decrypt(password).map_err(malformed)?;
        self.doc.catalog().map_err(malformed)?;

        debug!(path = %self.path.display(), "decrypted PDF");
        Ok(())
    }

    fn authenticate(&self, password: &str) -> Result<(), SplitError> {
        self.doc
            .authenticate_password(password)
            .map_err(|source| SplitError::IncorrectPassword {
                path: self.path.clone(),
                source,
            })
    }

    /// Document info dictionary entries whose values can be read as strings.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        let Some(info) = self.info_dictionary() else {
            return metadata;
        };

        for (key, value) in info.iter() {
            let key = String::from_utf8_lossy(key).into_owned();
            if key.is_empty() {
                continue;
            }
            match self.coerce_to_string(value) {
                Some(value) => {
                    metadata.insert(key, value);
                }
                None => warn!(key = %key, "skipping metadata entry that is not string-like"),
            }
        }

        metadata
    }

    fn info_dictionary(&self) -> Option<&Dictionary> {
        match self.doc.trailer.get(b"Info").ok()? {
            Object::Reference(id) => self.doc.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    fn coerce_to_string(&self, value: &Object) -> Option<String> {
        match value {
            Object::String(bytes, _) => decode_pdf_string(bytes),
            Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
            Object::Integer(i) => Some(i.to_string()),
            Object::Real(r) => Some(r.to_string()),
            Object::Boolean(b) => Some(b.to_string()),
            Object::Reference(id) => match self.doc.get_object(*id).ok()? {
                // Only one level of indirection; a reference to a reference is not string-like.
                Object::Reference(_) => None,
                target => self.coerce_to_string(target),
            },
            _ => None,
        }
    }
}

/// Parse every uncompressed object of `bytes` into `doc`, still encrypted.
/// Objects inside object streams appear once the document is decrypted.
fn read_encrypted_objects(doc: Document, bytes: &[u8]) -> Document {
    // Xref offsets count from the header, as in lopdf's own reader.
    let start = bytes
        .windows(5)
        .position(|w| w == b"%PDF-")
        .unwrap_or(0);
    let reader = Reader {
        buffer: &bytes[start..],
        document: doc,
        encryption_state: None,
        raw_objects: BTreeMap::new(),
    };

    let mut objects = BTreeMap::new();
    for (&number, entry) in &reader.document.reference_table.entries {
        let XrefEntry::Normal { generation, .. } = *entry else {
            continue;
        };
        let id = (number, generation);
        if reader.document.objects.contains_key(&id) {
            continue;
        }
        match reader.get_object(id, &mut HashSet::new()) {
            Ok(object) => {
                objects.insert(id, object);
            }
            Err(err) => warn!(object = ?id, error = %err, "skipping unreadable object"),
        }
    }

    let mut doc = reader.document;
    doc.objects.extend(objects);
    doc
}

pub fn decode_pdf_string(bytes: &[u8]) -> Option<String> {
    // Check for UTF-16 BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let u16_chars: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        String::from_utf16(&u16_chars).ok()
    } else {
        // Latin-1 / PDFDocEncoding (simplified)
        Some(bytes.iter().map(|&b| b as char).collect())
    }
}

/// Inverse of [`decode_pdf_string`]: Latin-1 when possible, UTF-16BE otherwise.
pub fn encode_pdf_string(s: &str) -> Vec<u8> {
    if s.chars().all(|c| (c as u32) < 0x100) {
        s.chars().map(|c| c as u8).collect()
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in s.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        bytes
    }
}
