//! Bundle an HTML page and all of its external assets into a single
//! self-contained document.
//!
//! Stylesheet links become `<style>` elements, external scripts become inline
//! `<script>` elements, and images (both `<img>` tags and `url()` references
//! inside CSS) become base64 data URIs. `@import` chains are flattened
//! recursively. Which asset classes are inlined is configured per locality
//! (local filesystem vs. network) through [`BundleOptions`]; CSS, JS, and the
//! final document can optionally be minified on the way through.
//!
//! ```no_run
//! use pagefuse::{bundle, BundleOptions};
//!
//! let html = std::fs::read("index.html")?;
//! let out = bundle(&html, BundleOptions::everything("./site/"))?;
//! std::fs::write("index.bundled.html", out)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod minify;
pub mod resolve;
pub mod rewrite;

pub use config::{AssetClass, AssetSet, BundleOptions};
pub use error::{BundleError, BundleResult};
pub use minify::Minifier;
pub use resolve::{Resolver, is_remote};
pub use rewrite::{Bundler, bundle};
