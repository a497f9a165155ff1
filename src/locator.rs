//! Chapter locator: turn a manga name and chapter number into image URLs.
//!
//! Resolution is two page fetches. The search page gives the manga ID, the
//! chapter page lists the images. HTML handling is split into pure functions
//! ([`extract_manga_id`], [`extract_assets`]) so it can be tested against
//! saved markup without any network access.

use crate::config::PipelineConfig;
use crate::error::MangaPdfError;
use async_trait::async_trait;
use kuchiki::traits::TendrilSink;
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default catalogue host.
pub const DEFAULT_BASE_URL: &str = "https://ww8.mangakakalot.tv";

/// Maps a human-facing source name and chapter identifier to the ordered
/// list of image URLs of that chapter.
#[async_trait]
pub trait Locator: Send + Sync {
    async fn locate(&self, source_name: &str, chapter: &str) -> Result<Vec<String>, MangaPdfError>;
}

/// Locator for mangakakalot-style catalogues.
#[derive(Debug, Clone)]
pub struct MangakakalotLocator {
    client: reqwest::Client,
    base_url: Url,
}

impl MangakakalotLocator {
    /// Build a locator for `base_url` using the config's timeout and user agent.
    pub fn new(base_url: &str, config: &PipelineConfig) -> Result<Self, MangaPdfError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| MangaPdfError::InvalidConfig(format!("base URL '{base_url}': {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| MangaPdfError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }

    /// Manga ID for a source name, from the catalogue's search page.
    pub async fn find_manga_id(&self, source_name: &str) -> Result<String, MangaPdfError> {
        let query = search_query(source_name);
        let url = self.endpoint(&format!("search/{query}"))?;
        let html = self.get_text(url).await?;

        let id = extract_manga_id(&html, &query).ok_or_else(|| MangaPdfError::MangaNotFound {
            name: source_name.to_string(),
        })?;
        info!("Manga ID found: {}", id);
        Ok(id)
    }

    /// Image URLs of one chapter, in reading order.
    pub async fn chapter_images(
        &self,
        manga_id: &str,
        chapter: &str,
    ) -> Result<Vec<String>, MangaPdfError> {
        let url = self.endpoint(&format!("chapter/{manga_id}/chapter-{chapter}"))?;
        let html = self.get_text(url.clone()).await?;

        let images = extract_assets(&html, &url);
        if images.is_empty() {
            return Err(MangaPdfError::ChapterNotFound {
                manga_id: manga_id.to_string(),
                chapter: chapter.to_string(),
            });
        }
        info!("Found {} images for chapter {}", images.len(), chapter);
        Ok(images)
    }

    fn endpoint(&self, path: &str) -> Result<Url, MangaPdfError> {
        self.base_url
            .join(path)
            .map_err(|e| MangaPdfError::InvalidConfig(format!("cannot build URL for '{path}': {e}")))
    }

    async fn get_text(&self, url: Url) -> Result<String, MangaPdfError> {
        debug!("Visiting {}", url);
        let unavailable = |reason: String| MangaPdfError::LocatorUnavailable {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(unavailable(format!("HTTP {}", response.status())));
        }
        response.text().await.map_err(|e| unavailable(e.to_string()))
    }
}

#[async_trait]
impl Locator for MangakakalotLocator {
    async fn locate(&self, source_name: &str, chapter: &str) -> Result<Vec<String>, MangaPdfError> {
        let id = self.find_manga_id(source_name).await?;
        self.chapter_images(&id, chapter).await
    }
}

/// Normalise a source name the way the catalogue's search expects it:
/// lower-case, dashes replaced by spaces.
pub fn search_query(source_name: &str) -> String {
    source_name.trim().replace('-', " ").to_lowercase()
}

/// Find the manga ID in a search results page.
///
/// Takes the first `h3.story_name a` whose text equals `query`
/// (case-insensitive) and returns the second path segment of its `href`
/// (`/manga/<id>/`).
pub fn extract_manga_id(html: &str, query: &str) -> Option<String> {
    let document = kuchiki::parse_html().one(html);
    let wanted = query.trim().to_lowercase();

    let links = document.select("h3.story_name a").ok()?;
    for link in links {
        let title = link.as_node().text_contents();
        if title.trim().to_lowercase() != wanted {
            continue;
        }
        let attrs = link.attributes.borrow();
        let Some(href) = attrs.get("href") else {
            continue;
        };
        if let Some(id) = manga_id_from_href(href) {
            return Some(id);
        }
    }
    None
}

/// `/manga/manga-aa951409/` or an absolute URL with that path → `manga-aa951409`.
fn manga_id_from_href(href: &str) -> Option<String> {
    let path = match Url::parse(href) {
        Ok(url) => url.path().to_string(),
        Err(_) => href.to_string(),
    };
    path.split('/')
        .nth(2)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Collect the chapter's image URLs in document order.
///
/// Reads the `data-src` of every `div.vung-doc img.img-loading`. Empty
/// attributes are skipped; relative URLs are resolved against `page_url`.
pub fn extract_assets(html: &str, page_url: &Url) -> Vec<String> {
    let document = kuchiki::parse_html().one(html);
    let mut urls = Vec::new();

    if let Ok(images) = document.select("div.vung-doc img.img-loading") {
        for img in images {
            let attrs = img.attributes.borrow();
            let src = attrs.get("data-src").unwrap_or("").trim();
            if src.is_empty() {
                continue;
            }
            match page_url.join(src) {
                Ok(url) => {
                    debug!("Image found: {}", url);
                    urls.push(url.to_string());
                }
                Err(e) => warn!("Skipping image with bad URL '{}': {}", src, e),
            }
        }
    }
    urls
}
