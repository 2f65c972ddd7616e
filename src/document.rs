//! Documents stored in a report's similarity index.
//!
//! Each report contributes one passage document per narrative segment and a
//! single table document. Every document gets a freshly generated identifier.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What part of the report a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Passage,
    Table,
}

/// Provenance attached to an indexed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Identifier of this document.
    pub doc_id: String,
    /// Identifier of the report the content came from, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A unit of retrievable content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub id: String,
    pub content: String,
    pub kind: DocumentKind,
    pub metadata: DocumentMetadata,
}

impl IndexedDocument {
    fn new(kind: DocumentKind, content: impl Into<String>, source: Option<&str>) -> Self {
        let id = Uuid::new_v4().to_string();
        Self {
            metadata: DocumentMetadata {
                doc_id: id.clone(),
                source: source.map(str::to_string),
            },
            id,
            content: content.into(),
            kind,
        }
    }

    /// A narrative passage.
    pub fn passage(content: impl Into<String>, source: Option<&str>) -> Self {
        Self::new(DocumentKind::Passage, content, source)
    }

    /// The rendered table block.
    pub fn table(content: impl Into<String>, source: Option<&str>) -> Self {
        Self::new(DocumentKind::Table, content, source)
    }

    pub fn is_table(&self) -> bool {
        self.kind == DocumentKind::Table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_get_distinct_ids() {
        let a = IndexedDocument::passage("Revenue grew 5%.", Some("report-1"));
        let b = IndexedDocument::passage("Revenue grew 5%.", Some("report-1"));
        let t = IndexedDocument::table("   2020", None);

        assert_ne!(a.id, b.id);
        assert_ne!(a.id, t.id);
        assert_eq!(a.metadata.doc_id, a.id);
        assert_eq!(a.metadata.source.as_deref(), Some("report-1"));
        assert!(t.is_table());
        assert!(!a.is_table());
    }
}
