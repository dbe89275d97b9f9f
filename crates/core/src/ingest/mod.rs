pub mod decode;
pub mod fetcher;

use crate::config::Settings;
use fetcher::{ArtifactFetcher, HttpArtifactFetcher, LocalDirFetcher};
use std::sync::Arc;

/// `CONTENT_DIR` wins over `CONTENT_BASE_URL` so a local checkout can be served without edits.
pub fn fetcher_from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn ArtifactFetcher>> {
    if let Some(dir) = settings.content_dir.as_deref() {
        return Ok(Arc::new(LocalDirFetcher::new(dir)));
    }
    Ok(Arc::new(HttpArtifactFetcher::from_settings(settings)?))
}
