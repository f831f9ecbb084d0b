use crate::dates::{NO_DELTA_DATE, convert_date};
use crate::error::SyncError;
use std::fmt;

/// One joined row from the annotations database, before normalization.
#[derive(Debug, Clone, Default)]
pub struct RawAnnotation {
    pub volume_id: String,
    pub kind: String,
    pub text: Option<String>,
    pub annotation: Option<String>,
    pub extra: Option<String>,
    pub created_at: Option<String>,
    pub modified_at: Option<String>,
    pub book_title: Option<String>,
    pub title: String,
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationKind {
    Highlight,
    Note,
    Other(String),
}

impl AnnotationKind {
    pub fn from_db(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "highlight" => AnnotationKind::Highlight,
            "note" => AnnotationKind::Note,
            _ => AnnotationKind::Other(raw.to_string()),
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationKind::Highlight => write!(f, "Highlight"),
            AnnotationKind::Note => write!(f, "Note"),
            AnnotationKind::Other(raw) => {
                let mut chars = raw.chars();
                match chars.next() {
                    Some(first) => write!(f, "{}{}", first.to_uppercase(), chars.as_str()),
                    None => Ok(()),
                }
            }
        }
    }
}

/// A normalized highlight/note joined with its book metadata. Timestamps are
/// canonical strings, never empty: absent columns fall back to the epoch
/// sentinel.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub volume_id: String,
    pub kind: AnnotationKind,
    pub text: String,
    pub note: String,
    pub extra: Option<String>,
    pub created_at: String,
    pub modified_at: String,
    pub book_title: String,
    pub title: String,
    pub author: String,
}

impl Annotation {
    pub fn from_row(row: RawAnnotation) -> Result<Self, SyncError> {
        let created_at = match row.created_at.as_deref() {
            Some(raw) => convert_date(raw)?,
            None => NO_DELTA_DATE.to_string(),
        };
        let modified_at = match row.modified_at.as_deref() {
            Some(raw) => convert_date(raw)?,
            None => NO_DELTA_DATE.to_string(),
        };

        Ok(Annotation {
            volume_id: row.volume_id,
            kind: AnnotationKind::from_db(&row.kind),
            text: row.text.unwrap_or_default(),
            note: row.annotation.unwrap_or_default(),
            extra: row.extra,
            created_at,
            modified_at,
            book_title: row.book_title.unwrap_or_default(),
            title: row.title,
            author: row.author.unwrap_or_default(),
        })
    }

    pub fn page_title(&self) -> String {
        format!("{}: {}", self.kind, self.title)
    }

    pub fn attribution(&self) -> String {
        format!("Source: {}, {}", self.title, self.author)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> RawAnnotation {
        RawAnnotation {
            volume_id: "vol-1".to_string(),
            kind: "highlight".to_string(),
            text: Some("a memorable passage".to_string()),
            created_at: Some("2023-10-25T14:30:22Z".to_string()),
            modified_at: Some("2023-10-25T14:30:22Z".to_string()),
            title: "The Title".to_string(),
            author: Some("The Author".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_row_normalizes_dates() {
        let annotation = Annotation::from_row(row()).unwrap();
        assert_eq!(annotation.created_at, "2023-10-25 14:30:22");
        assert_eq!(annotation.modified_at, "2023-10-25 14:30:22");
    }

    #[test]
    fn test_from_row_substitutes_sentinel_for_absent_dates() {
        let mut raw = row();
        raw.created_at = None;
        raw.modified_at = None;
        let annotation = Annotation::from_row(raw).unwrap();
        assert_eq!(annotation.created_at, NO_DELTA_DATE);
        assert_eq!(annotation.modified_at, NO_DELTA_DATE);
        assert!(!annotation.created_at.is_empty());
        assert!(!annotation.modified_at.is_empty());
    }

    #[test]
    fn test_from_row_rejects_malformed_dates() {
        let mut raw = row();
        raw.created_at = Some("garbage".to_string());
        assert!(Annotation::from_row(raw).is_err());
    }

    #[test]
    fn test_kind_display_capitalizes() {
        assert_eq!(AnnotationKind::from_db("highlight").to_string(), "Highlight");
        assert_eq!(AnnotationKind::from_db("note").to_string(), "Note");
        assert_eq!(AnnotationKind::from_db("dogear").to_string(), "Dogear");
    }

    #[test]
    fn test_page_title_and_attribution() {
        let annotation = Annotation::from_row(row()).unwrap();
        assert_eq!(annotation.page_title(), "Highlight: The Title");
        assert_eq!(annotation.attribution(), "Source: The Title, The Author");
    }
}
