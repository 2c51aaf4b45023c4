use crate::error::{NumberKind, SelectorError};
use std::collections::HashSet;
use tracing::debug;

/// How the numbers in a selector map onto the document's pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indexing {
    OneBased,
    ZeroBased,
}

impl Indexing {
    pub fn min_page(self) -> i64 {
        match self {
            Indexing::OneBased => 1,
            Indexing::ZeroBased => 0,
        }
    }

    pub fn max_page(self, total_pages: usize) -> i64 {
        let total = total_pages as i64;
        match self {
            Indexing::OneBased => total,
            Indexing::ZeroBased => total - 1,
        }
    }

    /// Translate an in-bounds page number to a 0-based index.
    fn to_index(self, page: i64) -> usize {
        (page - self.min_page()) as usize
    }
}

/// One comma-separated unit of a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Page(i64),
    /// Inclusive range; a missing side means "first page" or "last page".
    Range { start: Option<i64>, end: Option<i64> },
}

impl Selector {
    /// Parse a token like "5", "1-5", "5-" or "-3"
    pub fn parse(token: &str) -> Result<Self, SelectorError> {
        let token = token.trim();
        let Some((start_raw, end_raw)) = token.split_once('-') else {
            return parse_number(token, NumberKind::Page).map(Selector::Page);
        };

        let (start_raw, end_raw) = (start_raw.trim(), end_raw.trim());
        if start_raw.is_empty() && end_raw.is_empty() {
            return Err(SelectorError::InvalidRange {
                token: token.to_string(),
                reason: "empty range not allowed",
            });
        }

        let start = (!start_raw.is_empty())
            .then(|| parse_number(start_raw, NumberKind::RangeStart))
            .transpose()?;
        let end = (!end_raw.is_empty())
            .then(|| parse_number(end_raw, NumberKind::RangeEnd))
            .transpose()?;

        Ok(Selector::Range { start, end })
    }

    /// Resolve to an inclusive `(first, last)` pair of page numbers in the
    /// selector's own numbering. Bounds are not checked here.
    pub fn span(
        &self,
        total_pages: usize,
        indexing: Indexing,
    ) -> Result<(i64, i64), SelectorError> {
        match *self {
            Selector::Page(n) => Ok((n, n)),
            Selector::Range { start, end } => {
                let first = start.unwrap_or(indexing.min_page());
                let last = end.unwrap_or(indexing.max_page(total_pages));
                if first > last {
                    return Err(SelectorError::InvalidRange {
                        token: self.to_string(),
                        reason: "range start > end",
                    });
                }
                Ok((first, last))
            }
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Page(n) => write!(f, "{}", n),
            Selector::Range { start, end } => {
                if let Some(start) = start {
                    write!(f, "{}", start)?;
                }
                write!(f, "-")?;
                if let Some(end) = end {
                    write!(f, "{}", end)?;
                }
                Ok(())
            }
        }
    }
}

fn parse_number(s: &str, kind: NumberKind) -> Result<i64, SelectorError> {
    s.parse::<i64>().map_err(|_| SelectorError::InvalidNumber {
        kind,
        fragment: s.to_string(),
    })
}

/// The non-blank comma-separated tokens of a selector like "1,3,5-7,10-".
fn tokens(input: &str) -> Vec<&str> {
    input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Resolve a selector into distinct 0-based page indices, in the order they
/// were first selected. Tokens are parsed and checked left to right, so the
/// first bad token is the one reported.
pub fn resolve(
    selectors: &str,
    total_pages: usize,
    indexing: Indexing,
) -> Result<Vec<usize>, SelectorError> {
    if total_pages == 0 {
        return Err(SelectorError::EmptyDocument);
    }

    let min = indexing.min_page();
    let max = indexing.max_page(total_pages);

    let tokens = tokens(selectors);
    if tokens.is_empty() {
        return Err(SelectorError::NoSelectors);
    }

    let mut seen = HashSet::new();
    let mut resolved = Vec::new();
    for token in tokens {
        let selector = Selector::parse(token)?;
        let (first, last) = selector.span(total_pages, indexing)?;

        // The first offending number of the ascending expansion.
        if first < min || last > max {
            let page = if first < min || first > max { first } else { max + 1 };
            return Err(SelectorError::PageOutOfBounds { page, min, max });
        }

        debug!(selector = %selector, first, last, "expanding page selector");
        for page in first..=last {
            let index = indexing.to_index(page);
            if seen.insert(index) {
                resolved.push(index);
            }
        }
    }

    Ok(resolved)
}
