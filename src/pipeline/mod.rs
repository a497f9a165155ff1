//! Pipeline stages for chapter-to-PDF conversion.
//!
//! Each submodule implements one step; the network stays behind the
//! [`source::AssetSource`] seam so everything downstream can be driven from
//! local files.
//!
//! ## Data Flow
//!
//! ```text
//! request ──▶ fetch ──▶ geometry ──▶ assemble
//! (URLs)     (bounded)   (fit)        (lopdf)
//! ```
//!
//! 1. [`request`]  — indexed asset requests and the ordered result set
//! 2. [`source`]   — how one asset is downloaded (reqwest, streamed to disk)
//! 3. [`fetch`]    — admission-gated concurrent downloads; failures are
//!    recorded per index, never raised
//! 4. [`format`]   — JPEG/PNG detection from the file extension
//! 5. [`geometry`] — page size, image size and the no-upscale fit
//! 6. [`assemble`] — one page per image; synchronous, so callers run it in
//!    `spawn_blocking`

pub mod assemble;
pub mod fetch;
pub mod format;
pub mod geometry;
pub mod request;
pub mod source;
