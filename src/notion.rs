use anyhow::Result;
use serde_json::{Value, json};
use std::time::Duration;

pub const NOTION_API_URL: &str = "https://api.notion.com";
const NOTION_VERSION: &str = "2022-06-28";

/// Notion rejects paragraph text blocks longer than this many characters.
pub const BLOCK_CHAR_LIMIT: usize = 2000;

/// Fixed-delay retry policy for rejected page submissions. Publishing never
/// gives up: a dropped highlight is worse than a stalled run.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(delay: Duration) -> Self {
        RetryPolicy { delay }
    }

    pub async fn pause(&self) {
        tokio::time::sleep(self.delay).await;
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy { delay: Duration::from_secs(60) }
    }
}

/// Splits text into consecutive chunks of `size` characters; only the final
/// chunk may be shorter, and the chunks concatenate back to the input.
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut len = 0;

    for ch in text.chars() {
        buf.push(ch);
        len += 1;
        if len == size {
            chunks.push(std::mem::take(&mut buf));
            len = 0;
        }
    }
    if !buf.is_empty() {
        chunks.push(buf);
    }

    chunks
}

fn paragraph(text: &str, italic: bool) -> Value {
    let mut rich_text = json!({ "type": "text", "text": { "content": text } });
    if italic {
        rich_text["annotations"] = json!({ "italic": true });
    }
    json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": { "rich_text": [rich_text] },
    })
}

/// Builds a page-creation request: the body chunked into paragraph blocks,
/// followed by one italic attribution block.
pub fn build_page_request(parent_page: &str, icon: &str, title: &str, body: &str, source: &str) -> Value {
    let mut children: Vec<Value> = chunk_text(body, BLOCK_CHAR_LIMIT)
        .iter()
        .map(|chunk| paragraph(chunk, false))
        .collect();
    children.push(paragraph(source, true));

    json!({
        "parent": { "page_id": parent_page },
        "icon": { "emoji": icon },
        "properties": { "title": [{ "text": { "content": title } }] },
        "children": children,
    })
}

pub struct NotionClient {
    http: reqwest::Client,
    pages_url: String,
    token: String,
    parent_page: String,
    icon: String,
    retry: RetryPolicy,
}

impl NotionClient {
    pub fn new(base_url: &str, token: String, parent_page: String, icon: String, retry: RetryPolicy) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(NotionClient {
            http,
            pages_url: format!("{}/v1/pages", base_url.trim_end_matches('/')),
            token,
            parent_page,
            icon,
            retry,
        })
    }

    /// Submits one page and blocks until the service accepts it. Any non-200
    /// response is logged and retried after the policy delay; only a transport
    /// failure surfaces as an error.
    pub async fn create_page(&self, title: &str, body: &str, source: &str) -> Result<()> {
        let request = build_page_request(&self.parent_page, &self.icon, title, body, source);

        loop {
            let response = self
                .http
                .post(&self.pages_url)
                .bearer_auth(&self.token)
                .header("Notion-Version", NOTION_VERSION)
                .json(&request)
                .send()
                .await?;

            let status = response.status();
            if status == reqwest::StatusCode::OK {
                tracing::info!("created {:?}", title);
                return Ok(());
            }

            let body = response.text().await?;
            tracing::error!(status = %status, body = %body, "page creation rejected");
            tracing::info!("retrying in {:?}", self.retry.delay);
            self.retry.pause().await;
        }
    }
}
