//! Turns a document's per-page text into ordered, embeddable chunk records.

use crate::category::PolicyCategory;
use crate::types::EngineError;

/// One page-scoped passage of a document, ready to be embedded and stored.
#[derive(Clone, Debug, PartialEq)]
pub struct PolicyChunk {
    /// Extracted passage text. Never empty.
    pub text: String,
    /// Document display name. One document produces many chunks.
    pub source: String,
    /// 1-based page number reflecting the page's original position, even when
    /// earlier pages were skipped.
    pub page: u32,
    pub category: PolicyCategory,
    /// Caller-supplied date string; opaque to the engine.
    pub last_updated: String,
}

/// Splits a document's pages into chunk records.
///
/// Pages whose text is empty or whitespace-only are skipped. A document where
/// every page is skipped fails with [`EngineError::EmptyDocument`] so that no
/// ghost index entry can ever exist for a zero-chunk document.
pub fn chunk_pages(
    source: &str,
    pages: &[String],
    category: PolicyCategory,
    last_updated: &str,
) -> Result<Vec<PolicyChunk>, EngineError> {
    let chunks: Vec<PolicyChunk> = pages
        .iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(page_idx, text)| PolicyChunk {
            text: text.clone(),
            source: source.to_string(),
            page: page_idx as u32 + 1,
            category,
            last_updated: last_updated.to_string(),
        })
        .collect();

    if chunks.is_empty() {
        return Err(EngineError::EmptyDocument {
            source: source.to_string(),
        });
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|text| text.to_string()).collect()
    }

    #[test]
    fn skipped_pages_keep_original_numbering() {
        let chunks = chunk_pages(
            "handbook.pdf",
            &pages(&["intro", "   ", "", "outro"]),
            PolicyCategory::Onboarding,
            "2024-03-01",
        )
        .unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].page, 1);
        assert_eq!(chunks[1].page, 4);
        assert_eq!(chunks[1].text, "outro");
        assert!(chunks.iter().all(|c| c.source == "handbook.pdf"));
    }

    #[test]
    fn fully_blank_document_is_rejected() {
        let err = chunk_pages(
            "blank.pdf",
            &pages(&["", "  \n\t "]),
            PolicyCategory::General,
            "",
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::EmptyDocument { source } if source == "blank.pdf"));
    }

    #[test]
    fn single_page_document_chunks() {
        let chunks =
            chunk_pages("one.pdf", &pages(&["only page"]), PolicyCategory::Other, "").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page, 1);
        assert_eq!(chunks[0].category, PolicyCategory::Other);
    }
}
