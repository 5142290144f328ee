/*!
Publish rendered charts and summaries to wherever the site is hosted
*/
use crate::config::PublishConfig;
use crate::instrument::AssetClass;
use crate::report::{ReportFiles, TimeFrame};
use crate::source::Http;
use crate::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// The prefix every published object lives under
pub const ASSET_PREFIX: &str = "assets/machine_learning_portfolio";

/// Object key of the chart for `class` over `frame`
pub fn graph_key(class: AssetClass, frame: TimeFrame) -> String {
    format!("{}/graphs/{}Plot-{}.html", ASSET_PREFIX, class.key_name(), frame.key())
}

/// Object key of the JSON summary for `class`
pub fn data_key(class: AssetClass) -> String {
    format!("{}/data/{}Data.json", ASSET_PREFIX, class.key_name())
}

/// The content type served for a key
pub fn content_type(key: &str) -> &'static str {
    match Path::new(key).extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

/// Somewhere rendered files are published
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish the file at `local` under `key`
    async fn publish(&self, local: &Path, key: &str) -> Result<()>;
}

/// Leaves files where they were rendered
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPublisher;

#[async_trait]
impl Publisher for NullPublisher {
    async fn publish(&self, local: &Path, key: &str) -> Result<()> {
        tracing::debug!(path = %local.display(), key, "publishing disabled");
        Ok(())
    }
}

/// Copies files into a directory tree, e.g. a checked-out site repository
#[derive(Debug, Clone)]
pub struct LocalPublisher {
    /// The tree keys are resolved against
    pub root: PathBuf,
}

#[async_trait]
impl Publisher for LocalPublisher {
    async fn publish(&self, local: &Path, key: &str) -> Result<()> {
        let target = self.root.join(key);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(local, &target).await?;
        tracing::info!(key, target = %target.display(), "published");
        Ok(())
    }
}

/// PUTs files to `<base_url>/<key>`
#[derive(Debug, Clone)]
pub struct HttpPublisher {
    /// HTTP client
    pub http: Http,
    /// The URL keys are appended to
    pub base_url: String,
    /// Bearer token, if the endpoint needs one
    pub token: Option<String>,
}

impl HttpPublisher {
    /// The URL an object is written to
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key.trim_start_matches('/'))
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn publish(&self, local: &Path, key: &str) -> Result<()> {
        let body = tokio::fs::read(local).await?;
        let url = self.object_url(key);
        self.http
            .put_bytes(&url, body, self.token.as_deref(), content_type(key))
            .await?;
        tracing::info!(key, "published");
        Ok(())
    }
}

/// Build the publisher a configuration asks for
pub fn from_config(config: &PublishConfig, http: &Http) -> Box<dyn Publisher> {
    match config {
        PublishConfig::None => Box::new(NullPublisher),
        PublishConfig::Local { root } => Box::new(LocalPublisher { root: root.clone() }),
        PublishConfig::Http { base_url, token } => Box::new(HttpPublisher {
            http: http.clone(),
            base_url: base_url.clone(),
            token: token.clone(),
        }),
    }
}

/// Publish every file of a rendered report for `class`, failing on the first file that cannot be published
pub async fn publish_report<P: Publisher + ?Sized>(
    publisher: &P,
    class: AssetClass,
    report: &ReportFiles,
) -> Result<()> {
    for (frame, path) in &report.graphs {
        publisher.publish(path, &graph_key(class, *frame)).await?;
    }
    publisher.publish(&report.summary, &data_key(class)).await
}
