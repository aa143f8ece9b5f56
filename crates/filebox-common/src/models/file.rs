use serde::{Deserialize, Serialize};

/// One stored object: its key, metadata, and (when materialized) its bytes.
///
/// Records are built per request and dropped with the response. The object
/// store is the system of record; nothing is cached in process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Object key, unique within the container.
    #[serde(rename = "fileName")]
    pub name: String,
    #[serde(rename = "contentType")]
    pub content_type: String,
    #[serde(rename = "fileLength")]
    pub length: Option<i64>,
    /// Present only for upload and download.
    #[serde(skip)]
    pub content: Option<Vec<u8>>,
}

impl FileRecord {
    /// A record carrying only a name, as used for reorder requests.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content_type: String::new(),
            length: None,
            content: None,
        }
    }

    /// A listing entry: metadata without content.
    pub fn summary(name: impl Into<String>, content_type: impl Into<String>, length: i64) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            length: Some(length),
            content: None,
        }
    }

    /// A fully materialized record. `length` is taken from the content.
    pub fn with_content(
        name: impl Into<String>,
        content_type: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            length: Some(content.len() as i64),
            content: Some(content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_wire_names_without_content() {
        let rec = FileRecord::with_content("Test.pdf", "application/pdf", b"abc".to_vec());
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "fileName": "Test.pdf",
                "contentType": "application/pdf",
                "fileLength": 3
            })
        );
    }

    #[test]
    fn test_named_has_no_length() {
        let rec = FileRecord::named("a.pdf");
        assert_eq!(rec.length, None);
        assert!(rec.content.is_none());
    }
}
