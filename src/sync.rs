use crate::config::Config;
use crate::dates::convert_date;
use crate::db;
use crate::error::SyncError;
use crate::model::Annotation;
use crate::notion::{NOTION_API_URL, NotionClient, RetryPolicy};
use anyhow::Result;
use std::fs;
use std::path::Path;

/// The annotations to publish this run and the watermark to persist
/// afterwards. `watermark` is `None` when nothing qualified, in which case
/// the configuration stays untouched.
pub struct SyncPlan<'a> {
    pub to_publish: Vec<&'a Annotation>,
    pub watermark: Option<String>,
}

pub fn is_new(annotation: &Annotation, watermark: &str) -> bool {
    annotation.created_at.as_str() > watermark || annotation.modified_at.as_str() > watermark
}

/// Selects annotations strictly newer than the watermark and accumulates the
/// next watermark over the selected records only.
pub fn plan<'a>(annotations: &'a [Annotation], watermark: &str) -> SyncPlan<'a> {
    let mut to_publish: Vec<&Annotation> = vec![];
    let mut latest: Option<String> = None;

    for annotation in annotations {
        if !is_new(annotation, watermark) {
            continue;
        }
        for candidate in [&annotation.created_at, &annotation.modified_at] {
            if latest.as_deref().is_none_or(|l| candidate.as_str() > l) {
                latest = Some(candidate.clone());
            }
        }
        to_publish.push(annotation);
    }

    SyncPlan { to_publish, watermark: latest }
}

/// Copies the device database to the cache path so the live device file is
/// never queried directly. A missing device path is fatal.
pub fn copy_database(source: &Path, cache: &Path) -> Result<()> {
    if !source.exists() {
        return Err(SyncError::SourceUnavailable(source.to_path_buf()).into());
    }

    tracing::info!("retrieving database from e-reader");
    if cache.exists() {
        fs::remove_file(cache)?;
    }
    fs::copy(source, cache)?;
    Ok(())
}

/// One full sync pass: copy database, extract, plan, publish sequentially,
/// persist the advanced watermark.
pub async fn run(cfg: &Config) -> Result<()> {
    let source = Path::new(&cfg.device.database_path);
    let cache = Path::new(&cfg.device.database_cache);
    copy_database(source, cache)?;

    let rows = db::parse_database(cache).await;
    let annotations = rows
        .into_iter()
        .map(Annotation::from_row)
        .collect::<Result<Vec<_>, _>>()?;

    let watermark = convert_date(cfg.watermark())?;
    let plan = plan(&annotations, &watermark);
    if plan.to_publish.is_empty() {
        tracing::info!("no annotations newer than {}", watermark);
        return Ok(());
    }

    let publisher = NotionClient::new(
        NOTION_API_URL,
        cfg.notion.integration_token.clone(),
        cfg.notion.parent_page.clone(),
        cfg.notion.icon.clone(),
        RetryPolicy::default(),
    )?;

    tracing::info!("publishing {} annotations", plan.to_publish.len());
    for annotation in &plan.to_publish {
        publisher
            .create_page(&annotation.page_title(), &annotation.text, &annotation.attribution())
            .await?;
    }

    if let Some(watermark) = plan.watermark {
        cfg.persist_watermark(&watermark)?;
        tracing::info!("watermark advanced to {}", watermark);
    }

    Ok(())
}
