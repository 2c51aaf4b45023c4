//! Writing selected pages of a [`PdfDocument`] to new files.
//!
//! Output documents are built from a clone of the source object graph: the page
//! tree is replaced by a single `Pages` node listing the selected pages in
//! selection order, then everything no longer reachable is pruned.

use crate::error::SplitError;
use crate::pdf::document::encode_pdf_string;
use crate::pdf::PdfDocument;
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Catalog entries that address pages by the source's page numbering.
const PAGE_BOUND_CATALOG_KEYS: [&[u8]; 5] = [
    b"Outlines",
    b"PageLabels",
    b"OpenAction",
    b"StructTreeRoot",
    b"Dests",
];

/// Write the selected pages, in order, to a single PDF at `output`.
pub fn write_merged(
    source: &PdfDocument,
    indices: &[usize],
    output: &Path,
) -> Result<(), SplitError> {
    let metadata = source.metadata();
    let mut doc = build_subset(source, indices, Some(&metadata))?;
    save_atomically(&mut doc, output)?;
    info!(
        output = %output.display(),
        pages = indices.len(),
        "wrote merged subset"
    );
    Ok(())
}

/// Write each selected page to its own PDF in `output_dir`, returning the
/// paths in the order they were written.
pub fn write_per_page(
    source: &PdfDocument,
    indices: &[usize],
    output_dir: &Path,
    stem: &str,
) -> Result<Vec<PathBuf>, SplitError> {
    create_dir(output_dir)?;

    let total_pages = source.page_count();
    let mut outputs = Vec::with_capacity(indices.len());
    for &index in indices {
        let output = output_dir.join(per_page_file_name(stem, index + 1, total_pages));
        let mut doc = build_subset(source, &[index], None)?;
        save_atomically(&mut doc, &output)?;
        debug!(page = index + 1, output = %output.display(), "wrote page");
        outputs.push(output);
    }

    info!(
        dir = %output_dir.display(),
        pages = outputs.len(),
        "wrote per-page outputs"
    );
    Ok(outputs)
}

/// `<stem>.p<NNNN>.pdf`, with the 1-based page number padded to at least four
/// digits, or to the digit count of `total_pages` if that is wider.
pub fn per_page_file_name(stem: &str, page_number: usize, total_pages: usize) -> String {
    let width = total_pages.to_string().len().max(4);
    format!("{}.p{:0width$}.pdf", stem, page_number, width = width)
}

fn build_subset(
    source: &PdfDocument,
    indices: &[usize],
    metadata: Option<&BTreeMap<String, String>>,
) -> Result<Document, SplitError> {
    let page_ids = source.page_ids();
    let selected = indices
        .iter()
        .map(|&index| {
            page_ids.get(index).copied().ok_or(SplitError::PageNotFound {
                index,
                total: page_ids.len(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut doc = source.doc.clone();
    let malformed = |err: lopdf::Error| SplitError::Load {
        path: source.path.clone(),
        source: err,
    };

    let root_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(malformed)?;
    let pages_id = doc
        .get_dictionary(root_id)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(malformed)?;

    let mut placed = HashSet::new();
    let mut kids = Vec::with_capacity(selected.len());
    for page_id in selected {
        let mut page = flattened_page(&doc, page_id).map_err(malformed)?;
        page.set("Parent", pages_id);
        // A page selected twice needs a second page object.
        let id = if placed.insert(page_id) {
            doc.objects.insert(page_id, Object::Dictionary(page));
            page_id
        } else {
            doc.add_object(page)
        };
        kids.push(Object::Reference(id));
    }

    let pages = doc.get_dictionary_mut(pages_id).map_err(malformed)?;
    pages.set("Count", kids.len() as i64);
    pages.set("Kids", kids);
    pages.remove(b"Parent");

    let catalog = doc.get_dictionary_mut(root_id).map_err(malformed)?;
    for key in PAGE_BOUND_CATALOG_KEYS {
        catalog.remove(key);
    }

    // Outputs are always written in the clear.
    doc.trailer.remove(b"Encrypt");
    doc.trailer.remove(b"Info");
    if let Some(metadata) = metadata.filter(|metadata| !metadata.is_empty()) {
        let mut info = Dictionary::new();
        for (key, value) in metadata {
            info.set(
                key.as_bytes().to_vec(),
                Object::String(encode_pdf_string(value), StringFormat::Literal),
            );
        }
        let info_id = doc.add_object(info);
        doc.trailer.set("Info", info_id);
    }

    doc.prune_objects();
    doc.renumber_objects();
    Ok(doc)
}

/// Copy of the page dictionary with inherited attributes made explicit.
fn flattened_page(doc: &Document, page_id: ObjectId) -> lopdf::Result<Dictionary> {
    let mut page = doc.get_dictionary(page_id)?.clone();
    let mut visited = HashSet::from([page_id]);
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    while let Some(parent_id) = parent {
        if !visited.insert(parent_id) {
            break;
        }
        let node = doc.get_dictionary(parent_id)?;
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(page)
}

/// Serialize to a temporary file next to `output`, then move it into place.
fn save_atomically(doc: &mut Document, output: &Path) -> Result<(), SplitError> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    create_dir(dir)?;

    let io_error = |source: std::io::Error| SplitError::Io {
        path: output.to_path_buf(),
        source,
    };

    let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        doc.save_to(&mut writer).map_err(|source| SplitError::Save {
            path: output.to_path_buf(),
            source: source.into(),
        })?;
        writer.flush().map_err(io_error)?;
    }
    file.persist(output).map_err(|err| io_error(err.error))?;
    Ok(())
}

fn create_dir(dir: &Path) -> Result<(), SplitError> {
    fs::create_dir_all(dir).map_err(|source| SplitError::Io {
        path: dir.to_path_buf(),
        source,
    })
}
