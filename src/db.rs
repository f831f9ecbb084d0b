use crate::model::RawAnnotation;
use anyhow::Result;
use libsql::{Builder, Connection};
use std::path::Path;

const ANNOTATION_QUERY: &str = r#"
SELECT
    Bookmark.VolumeID,
    Bookmark.Type,
    Bookmark.Text,
    Bookmark.Annotation,
    Bookmark.ExtraAnnotationData,
    Bookmark.DateCreated,
    Bookmark.DateModified,
    content.BookTitle,
    content.Title,
    content.Attribution
FROM Bookmark
INNER JOIN content ON Bookmark.VolumeID = content.ContentID
"#;

pub struct SourceDatabase {
    conn: Connection,
}

impl SourceDatabase {
    pub async fn open(path: &Path) -> Result<Self> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;
        Ok(SourceDatabase { conn })
    }

    pub async fn annotations(&self) -> Result<Vec<RawAnnotation>> {
        let mut rows = self.conn.query(ANNOTATION_QUERY, ()).await?;
        let mut annotations: Vec<RawAnnotation> = vec![];

        while let Some(row) = rows.next().await? {
            annotations.push(RawAnnotation {
                volume_id: row.get::<Option<String>>(0)?.unwrap_or_default(),
                kind: row.get::<Option<String>>(1)?.unwrap_or_default(),
                text: row.get::<Option<String>>(2)?,
                annotation: row.get::<Option<String>>(3)?,
                extra: row.get::<Option<String>>(4)?,
                created_at: row.get::<Option<String>>(5)?,
                modified_at: row.get::<Option<String>>(6)?,
                book_title: row.get::<Option<String>>(7)?,
                title: row.get::<Option<String>>(8)?.unwrap_or_default(),
                author: row.get::<Option<String>>(9)?,
            });
        }

        Ok(annotations)
    }
}

/// Reads every annotation row joined with its book metadata. Read failures
/// (missing tables, corruption, locked file) degrade to an empty row set so a
/// damaged database never aborts the run or moves the watermark.
pub async fn parse_database(path: &Path) -> Vec<RawAnnotation> {
    tracing::info!("parsing annotations database");

    let result = async { SourceDatabase::open(path).await?.annotations().await }.await;
    match result {
        Ok(annotations) => annotations,
        Err(e) => {
            tracing::error!(error = %e, path = ?path, "unexpected error reading the annotations database");
            Vec::new()
        }
    }
}
