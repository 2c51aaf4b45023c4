use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which part of a selector token failed to parse as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    Page,
    RangeStart,
    RangeEnd,
}

impl fmt::Display for NumberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberKind::Page => write!(f, "page number"),
            NumberKind::RangeStart => write!(f, "range start"),
            NumberKind::RangeEnd => write!(f, "range end"),
        }
    }
}

/// Errors produced while turning a selector string into page indices.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("input PDF has no pages")]
    EmptyDocument,

    #[error("no valid page selectors were provided")]
    NoSelectors,

    #[error("invalid range '{token}': {reason}")]
    InvalidRange { token: String, reason: &'static str },

    #[error("invalid {kind}: '{fragment}'")]
    InvalidNumber { kind: NumberKind, fragment: String },

    #[error("page {page} out of bounds, valid range is {min}..={max}")]
    PageOutOfBounds { page: i64, min: i64, max: i64 },
}

/// Everything that can stop a split run.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error("input PDF not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("PDF '{}' is encrypted, provide --password", path.display())]
    PasswordRequired { path: PathBuf },

    #[error("incorrect password for encrypted PDF '{}'", path.display())]
    IncorrectPassword {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("nothing to write, set --output and/or --per-page-dir")]
    NothingToWrite,

    #[error("page index {index} is out of range for a {total}-page document")]
    PageNotFound { index: usize, total: usize },

    #[error("failed to open PDF: {}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("failed to save PDF: {}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SplitError {
    /// Process exit code for this failure (sysexits-style).
    pub fn exit_code(&self) -> u8 {
        match self {
            SplitError::Selector(_)
            | SplitError::PasswordRequired { .. }
            | SplitError::IncorrectPassword { .. }
            | SplitError::NothingToWrite => 64,
            SplitError::SourceNotFound { .. } => 66,
            SplitError::PageNotFound { .. }
            | SplitError::Load { .. }
            | SplitError::Save { .. }
            | SplitError::Io { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_number_names_fragment_and_kind() {
        let err = SelectorError::InvalidNumber {
            kind: NumberKind::RangeEnd,
            fragment: "x".to_string(),
        };
        assert_eq!(err.to_string(), "invalid range end: 'x'");
    }

    #[test]
    fn test_out_of_bounds_reports_valid_range() {
        let err = SelectorError::PageOutOfBounds {
            page: 9,
            min: 1,
            max: 5,
        };
        assert_eq!(err.to_string(), "page 9 out of bounds, valid range is 1..=5");
    }

    #[test]
    fn test_selector_error_is_transparent() {
        let err = SplitError::from(SelectorError::NoSelectors);
        assert_eq!(err.to_string(), "no valid page selectors were provided");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(SplitError::from(SelectorError::EmptyDocument).exit_code(), 64);
        assert_eq!(SplitError::NothingToWrite.exit_code(), 64);
        assert_eq!(
            SplitError::PasswordRequired {
                path: PathBuf::from("a.pdf")
            }
            .exit_code(),
            64
        );
        assert_eq!(
            SplitError::SourceNotFound {
                path: PathBuf::from("a.pdf")
            }
            .exit_code(),
            66
        );
        assert_eq!(
            SplitError::PageNotFound { index: 3, total: 2 }.exit_code(),
            1
        );
    }
}
