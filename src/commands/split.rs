use crate::error::SplitError;
use crate::page_range::{resolve, Indexing};
use crate::pdf::subset::{write_merged, write_per_page};
use crate::pdf::PdfDocument;
use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct SplitOptions {
    pub pages: String,
    pub indexing: Indexing,
    pub password: Option<String>,
    pub json: bool,
}

/// Where the selected pages go. At least one destination is always set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    pub merged: Option<PathBuf>,
    pub per_page_dir: Option<PathBuf>,
}

impl OutputPlan {
    pub fn new(merged: Option<PathBuf>, per_page_dir: Option<PathBuf>) -> Result<Self, SplitError> {
        if merged.is_none() && per_page_dir.is_none() {
            return Err(SplitError::NothingToWrite);
        }
        Ok(OutputPlan {
            merged,
            per_page_dir,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SplitReport {
    pub input: PathBuf,
    pub total_pages: usize,
    /// Zero-based, in selection order.
    pub page_indices: Vec<usize>,
    pub merged_output: Option<PathBuf>,
    pub per_page_outputs: Vec<PathBuf>,
}

/// Open (decrypting if needed), resolve and write. Nothing is printed.
pub fn split<P: AsRef<Path>>(
    input: P,
    plan: &OutputPlan,
    options: &SplitOptions,
) -> Result<SplitReport, SplitError> {
    let input = input.as_ref();
    let doc = PdfDocument::open(input, options.password.as_deref())?;

    let total_pages = doc.page_count();
    let page_indices = resolve(&options.pages, total_pages, options.indexing)?;
    info!(
        input = %input.display(),
        selected = page_indices.len(),
        total_pages,
        "resolved page selection"
    );

    if let Some(output) = &plan.merged {
        write_merged(&doc, &page_indices, output)?;
    }

    let per_page_outputs = match &plan.per_page_dir {
        Some(dir) => {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "page".to_string());
            write_per_page(&doc, &page_indices, dir, &stem)?
        }
        None => Vec::new(),
    };

    Ok(SplitReport {
        input: input.to_path_buf(),
        total_pages,
        page_indices,
        merged_output: plan.merged.clone(),
        per_page_outputs,
    })
}

pub fn run<P: AsRef<Path>>(input: P, plan: &OutputPlan, options: &SplitOptions) -> Result<()> {
    let report = split(&input, plan, options)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if let Some(output) = &report.merged_output {
        println!(
            "Merged {} page(s) into {}",
            report.page_indices.len(),
            output.display()
        );
    }
    if let Some(dir) = &plan.per_page_dir {
        println!(
            "Wrote {} per-page file(s) to {}",
            report.per_page_outputs.len(),
            dir.display()
        );
        for path in &report.per_page_outputs {
            println!("{}", path.display());
        }
    }
    println!(
        "Selected {} of {} page(s) from {}",
        report.page_indices.len(),
        report.total_pages,
        report.input.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SelectorError;
    use crate::pdf::fixtures::{encrypted_document, page_tags, sample_document};
    use tempfile::tempdir;

    fn options(pages: &str) -> SplitOptions {
        SplitOptions {
            pages: pages.to_string(),
            indexing: Indexing::OneBased,
            password: None,
            json: false,
        }
    }

    fn write_sample(dir: &Path, name: &str, pages: usize) -> PathBuf {
        let path = dir.join(name);
        sample_document(pages).save(&path).unwrap();
        path
    }

    #[test]
    fn test_empty_plan_is_rejected() {
        assert!(matches!(
            OutputPlan::new(None, None),
            Err(SplitError::NothingToWrite)
        ));
        assert!(OutputPlan::new(Some("a.pdf".into()), None).is_ok());
        assert!(OutputPlan::new(None, Some("pages".into())).is_ok());
    }

    #[test]
    fn test_split_both_outputs() {
        let dir = tempdir().unwrap();
        let input = write_sample(dir.path(), "demo.pdf", 6);
        let plan = OutputPlan::new(
            Some(dir.path().join("out").join("demo.subset.pdf")),
            Some(dir.path().join("pages")),
        )
        .unwrap();

        let report = split(&input, &plan, &options("5-,1,5")).unwrap();

        assert_eq!(report.total_pages, 6);
        assert_eq!(report.page_indices, vec![4, 5, 0]);
        assert_eq!(
            report.per_page_outputs,
            vec![
                dir.path().join("pages").join("demo.p0005.pdf"),
                dir.path().join("pages").join("demo.p0006.pdf"),
                dir.path().join("pages").join("demo.p0001.pdf"),
            ]
        );

        let merged = lopdf::Document::load(plan.merged.as_ref().unwrap()).unwrap();
        assert_eq!(page_tags(&merged), vec!["page-5", "page-6", "page-1"]);
    }

    #[test]
    fn test_split_zero_based() {
        let dir = tempdir().unwrap();
        let input = write_sample(dir.path(), "demo.pdf", 3);
        let plan = OutputPlan::new(Some(dir.path().join("z.pdf")), None).unwrap();
        let options = SplitOptions {
            indexing: Indexing::ZeroBased,
            ..options("0,2")
        };

        let report = split(&input, &plan, &options).unwrap();
        assert_eq!(report.page_indices, vec![0, 2]);
        assert!(report.per_page_outputs.is_empty());
    }

    #[test]
    fn test_split_selector_error_writes_nothing() {
        let dir = tempdir().unwrap();
        let input = write_sample(dir.path(), "demo.pdf", 3);
        let output = dir.path().join("never.pdf");
        let plan = OutputPlan::new(Some(output.clone()), None).unwrap();

        let err = split(&input, &plan, &options("1,9")).unwrap_err();
        assert!(matches!(
            err,
            SplitError::Selector(SelectorError::PageOutOfBounds { page: 9, .. })
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_split_encrypted_with_user_password() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("locked.pdf");
        encrypted_document(4, "owner", "secret").save(&input).unwrap();
        let plan = OutputPlan::new(
            Some(dir.path().join("locked.subset.pdf")),
            Some(dir.path().join("pages")),
        )
        .unwrap();
        let options = SplitOptions {
            password: Some("secret".to_string()),
            ..options("2,1")
        };

        let report = split(&input, &plan, &options).unwrap();

        assert_eq!(report.page_indices, vec![1, 0]);
        let merged = lopdf::Document::load(plan.merged.as_ref().unwrap()).unwrap();
        assert!(!merged.is_encrypted());
        assert_eq!(page_tags(&merged), vec!["page-2", "page-1"]);
        let second = lopdf::Document::load(&report.per_page_outputs[0]).unwrap();
        assert_eq!(page_tags(&second), vec!["page-2"]);
    }

    #[test]
    fn test_split_encrypted_with_empty_user_password() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("open.pdf");
        encrypted_document(3, "owner", "").save(&input).unwrap();
        let output = dir.path().join("open.subset.pdf");
        let plan = OutputPlan::new(Some(output.clone()), None).unwrap();

        split(&input, &plan, &options("3,1")).unwrap();

        let merged = lopdf::Document::load(&output).unwrap();
        assert!(!merged.is_encrypted());
        assert_eq!(page_tags(&merged), vec!["page-3", "page-1"]);
    }

    #[test]
    fn test_split_encrypted_with_wrong_password() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("locked.pdf");
        encrypted_document(2, "owner", "secret").save(&input).unwrap();
        let output = dir.path().join("never.pdf");
        let plan = OutputPlan::new(Some(output.clone()), None).unwrap();
        let options = SplitOptions {
            password: Some("wrong".to_string()),
            ..options("1")
        };

        let err = split(&input, &plan, &options).unwrap_err();
        assert!(matches!(err, SplitError::IncorrectPassword { .. }));
        assert_eq!(err.exit_code(), 64);
        assert!(!output.exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_split_non_utf8_stem() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir().unwrap();
        let input = dir.path().join(OsStr::from_bytes(b"caf\xe9.pdf"));
        sample_document(2).save(&input).unwrap();
        let plan = OutputPlan::new(None, Some(dir.path().join("pages"))).unwrap();

        let report = split(&input, &plan, &options("2")).unwrap();

        let name = report.per_page_outputs[0]
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert_eq!(name, "caf\u{FFFD}.p0002.pdf");
    }

    #[test]
    fn test_split_missing_input() {
        let dir = tempdir().unwrap();
        let plan = OutputPlan::new(Some(dir.path().join("x.pdf")), None).unwrap();
        let err = split(dir.path().join("missing.pdf"), &plan, &options("1")).unwrap_err();
        assert!(matches!(err, SplitError::SourceNotFound { .. }));
        assert_eq!(err.exit_code(), 66);
    }

    #[test]
    fn test_report_serializes() {
        let report = SplitReport {
            input: "demo.pdf".into(),
            total_pages: 3,
            page_indices: vec![2, 0],
            merged_output: None,
            per_page_outputs: vec!["pages/demo.p0003.pdf".into()],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["page_indices"], serde_json::json!([2, 0]));
        assert_eq!(json["merged_output"], serde_json::Value::Null);
        assert_eq!(json["per_page_outputs"][0], "pages/demo.p0003.pdf");
    }
}
