//! Configuration types for chapter download and PDF assembly.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. The builder clamps obviously bad values and
//! `build()` rejects the ones that cannot be repaired.

use crate::error::MangaPdfError;
use crate::locator::{Locator, DEFAULT_BASE_URL};
use crate::pipeline::geometry::PageSpec;
use crate::pipeline::source::AssetSource;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default number of simultaneous downloads.
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// User agent sent to the catalogue and the image CDN.
pub const DEFAULT_USER_AGENT: &str = "MangaAPI/1.0";

/// Configuration for one chapter run.
///
/// # Example
/// ```rust
/// use manga2pdf::{PageSize, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .max_concurrency(8)
///     .page_size(PageSize::Letter)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_concurrency, 8);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Maximum downloads holding an admission slot at once. Default: 5.
    pub max_concurrency: usize,

    /// Page size of the output document. Default: A4 portrait.
    pub page: PageSpec,

    /// Per-request HTTP timeout in seconds. Default: 120.
    pub request_timeout_secs: u64,

    /// User agent for every HTTP request. Default: `MangaAPI/1.0`.
    pub user_agent: String,

    /// Extension for downloaded files whose URL has none. Default: `jpg`.
    pub default_extension: String,

    /// Zero-padding width of downloaded file names. Default: 3 (`001.jpg`).
    pub filename_width: usize,

    /// Catalogue host used when no `locator` is supplied.
    pub base_url: String,

    /// Pre-constructed locator. Takes precedence over `base_url`.
    pub locator: Option<Arc<dyn Locator>>,

    /// Pre-constructed asset source. If None, an HTTP source is built from
    /// `request_timeout_secs` and `user_agent`.
    pub asset_source: Option<Arc<dyn AssetSource>>,

    /// Optional per-asset progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            page: PageSpec::A4,
            request_timeout_secs: 120,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_extension: "jpg".to_string(),
            filename_width: 3,
            base_url: DEFAULT_BASE_URL.to_string(),
            locator: None,
            asset_source: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("max_concurrency", &self.max_concurrency)
            .field("page", &self.page)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("default_extension", &self.default_extension)
            .field("filename_width", &self.filename_width)
            .field("base_url", &self.base_url)
            .field("locator", &self.locator.as_ref().map(|_| "<dyn Locator>"))
            .field(
                "asset_source",
                &self.asset_source.as_ref().map(|_| "<dyn AssetSource>"),
            )
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn FetchProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.config.max_concurrency = n.max(1);
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page = size.spec();
        self
    }

    pub fn page(mut self, page: PageSpec) -> Self {
        self.config.page = page;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn default_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.default_extension = ext.into().trim_start_matches('.').to_string();
        self
    }

    pub fn filename_width(mut self, width: usize) -> Self {
        self.config.filename_width = width.clamp(1, 12);
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn locator(mut self, locator: Arc<dyn Locator>) -> Self {
        self.config.locator = Some(locator);
        self
    }

    pub fn asset_source(mut self, source: Arc<dyn AssetSource>) -> Self {
        self.config.asset_source = Some(source);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, MangaPdfError> {
        let c = &self.config;
        if c.max_concurrency == 0 {
            return Err(MangaPdfError::InvalidConfig(
                "max_concurrency must be ≥ 1".into(),
            ));
        }
        if !(c.page.width > 0.0 && c.page.height > 0.0) {
            return Err(MangaPdfError::InvalidConfig(format!(
                "page size must be positive, got {}x{} mm",
                c.page.width, c.page.height
            )));
        }
        if c.request_timeout_secs == 0 {
            return Err(MangaPdfError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        if c.default_extension.is_empty()
            || !c.default_extension.chars().all(|ch| ch.is_ascii_alphanumeric())
        {
            return Err(MangaPdfError::InvalidConfig(format!(
                "default extension must be alphanumeric, got '{}'",
                c.default_extension
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Named page sizes for the output document (portrait, millimetres).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PageSize {
    /// 210 × 297 mm (default).
    #[default]
    A4,
    /// 148 × 210 mm, close to a tankōbon page.
    A5,
    /// 215.9 × 279.4 mm.
    Letter,
    /// Arbitrary width × height in millimetres.
    Custom { width: f64, height: f64 },
}

impl PageSize {
    pub fn spec(self) -> PageSpec {
        match self {
            PageSize::A4 => PageSpec::A4,
            PageSize::A5 => PageSpec::new(148.0, 210.0),
            PageSize::Letter => PageSpec::new(215.9, 279.4),
            PageSize::Custom { width, height } => PageSpec::new(width, height),
        }
    }
}
