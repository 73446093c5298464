//! Markup rewriting: the bundling engine.
//!
//! [`Bundler`] walks the parsed document in a fixed pass order (inline
//! `<style>` minification, stylesheet links, `@import` expansion inside
//! inline styles, external scripts, then images), consulting the inclusion policy
//! for every candidate element and fetching referenced content through the
//! [`Resolver`]. The tree is mutated in place by a single thread of control;
//! the first fatal error aborts with all not-yet-visited elements unmodified.

mod css;
mod dom;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use kuchiki::NodeRef;
use kuchiki::traits::TendrilSink;

use crate::config::{AssetClass, BundleOptions};
use crate::error::{BundleError, BundleResult, tolerate};
use crate::minify::Minifier;
use crate::resolve::{Resolver, is_remote, mime_for_path};

/// Bundle a document with a freshly constructed engine.
pub fn bundle(html: &[u8], options: BundleOptions) -> BundleResult<String> {
    Bundler::new(options, Minifier::new())?.bundle(html)
}

/// The bundling engine: one document per invocation, synchronous and
/// depth-first.
pub struct Bundler {
    options: BundleOptions,
    resolver: Resolver,
    minifier: Minifier,
}

impl Bundler {
    pub fn new(mut options: BundleOptions, minifier: Minifier) -> BundleResult<Self> {
        // `./` keeps resolving next to the working directory; any other root
        // loses its trailing slash before being prefixed onto references.
        if options.root != "./" {
            options.root = options.root.trim_end_matches('/').to_string();
        }
        Ok(Bundler {
            options,
            resolver: Resolver::new()?,
            minifier,
        })
    }

    /// Rewrite a document according to the configured policy and return the
    /// serialized result.
    pub fn bundle(&self, html: &[u8]) -> BundleResult<String> {
        let text = std::str::from_utf8(html)
            .map_err(|e| BundleError::Document(format!("input is not valid UTF-8: {e}")))?;
        let document = kuchiki::parse_html().one(text);

        self.minify_style_blocks(&document)?;
        self.inline_stylesheet_links(&document)?;
        self.expand_style_blocks(&document)?;
        self.inline_scripts(&document)?;
        self.inline_images(&document)?;

        let mut out = Vec::new();
        document
            .serialize(&mut out)
            .map_err(|e| BundleError::Document(format!("could not serialize document: {e}")))?;
        let out = String::from_utf8(out).map_err(|e| {
            BundleError::Document(format!("serialized document is not valid UTF-8: {e}"))
        })?;

        if self.options.minifies(AssetClass::Html) {
            return self.minifier.html(&out);
        }
        Ok(out)
    }

    fn joined(&self, reference: &str) -> String {
        format!("{}{reference}", self.options.root)
    }

    fn included(&self, class: AssetClass, path: &str) -> bool {
        self.options.includes(class, is_remote(path))
    }

    /// Minify the text of inline `<style>` blocks. No fetching involved.
    fn minify_style_blocks(&self, document: &NodeRef) -> BundleResult<()> {
        if !self.options.minifies(AssetClass::Css) {
            return Ok(());
        }
        for style in dom::select_all(document, "style")? {
            let node = style.as_node();
            let text = node.text_contents();
            match self.minifier.css(&text) {
                Ok(minified) => dom::set_text(node, &minified),
                Err(err) => tolerate(&self.options, err.at("inline style block"))?,
            }
        }
        Ok(())
    }

    /// Replace `<link rel="stylesheet">` elements with `<style>` elements
    /// carrying the fetched, rewritten text.
    fn inline_stylesheet_links(&self, document: &NodeRef) -> BundleResult<()> {
        if !self.options.considers(AssetClass::Css) {
            return Ok(());
        }
        for link in dom::select_all(document, r#"link[rel="stylesheet"]"#)? {
            let node = link.as_node();
            let Some(href) = dom::attr(&link, "href") else {
                continue;
            };
            let path = self.joined(&href);
            if !self.included(AssetClass::Css, &path) {
                continue;
            }

            let bytes = match self.resolver.fetch(&path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    tolerate(&self.options, err)?;
                    continue;
                }
            };

            let fetched = String::from_utf8_lossy(&bytes);
            let mut text = self.rewrite_stylesheet(&fetched, 0)?;
            if self.options.minifies(AssetClass::Css) {
                match self.minifier.css(&text) {
                    Ok(minified) => text = minified,
                    Err(err) => tolerate(&self.options, err.at(&path))?,
                }
            }

            node.insert_before(dom::style_element(&text));
            node.detach();
        }
        Ok(())
    }

    /// Expand `@import` statements and rewrite `url()` references inside
    /// inline `<style>` blocks, including the ones inserted by
    /// [`Bundler::inline_stylesheet_links`].
    fn expand_style_blocks(&self, document: &NodeRef) -> BundleResult<()> {
        if !self.options.considers(AssetClass::Css) {
            return Ok(());
        }
        for style in dom::select_all(document, "style")? {
            let node = style.as_node();
            let text = node.text_contents();
            let rewritten = self.rewrite_stylesheet(&text, 0)?;
            if rewritten != text {
                dom::set_text(node, &rewritten);
            }
        }
        Ok(())
    }

    /// Replace `<script src>` elements with inline `<script>` elements.
    /// Inline scripts without a `src` are only ever minified, never fetched.
    fn inline_scripts(&self, document: &NodeRef) -> BundleResult<()> {
        if !self.options.considers(AssetClass::Js) {
            return Ok(());
        }
        for script in dom::select_all(document, "script")? {
            let node = script.as_node();
            let Some(src) = dom::attr(&script, "src") else {
                if self.options.minifies(AssetClass::Js) {
                    let text = node.text_contents();
                    match self.minifier.js(&text) {
                        Ok(minified) => dom::set_text(node, &minified),
                        Err(err) => tolerate(&self.options, err.at("inline script"))?,
                    }
                }
                continue;
            };

            let path = self.joined(&src);
            if !self.included(AssetClass::Js, &path) {
                continue;
            }

            let bytes = match self.resolver.fetch(&path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    tolerate(&self.options, err)?;
                    continue;
                }
            };

            let mut text = String::from_utf8_lossy(&bytes).into_owned();
            if self.options.minifies(AssetClass::Js) {
                match self.minifier.js(&text) {
                    Ok(minified) => text = minified,
                    Err(err) => tolerate(&self.options, err.at(&path))?,
                }
            }

            node.insert_before(dom::script_element(&text));
            node.detach();
        }
        Ok(())
    }

    /// Rewrite `<img src>` attributes to base64 data URIs. The element stays
    /// in place; only the attribute changes.
    fn inline_images(&self, document: &NodeRef) -> BundleResult<()> {
        if !self.options.considers(AssetClass::Image) {
            return Ok(());
        }
        for img in dom::select_all(document, "img")? {
            let Some(src) = dom::attr(&img, "src") else {
                continue;
            };
            // Already inlined.
            if src.starts_with("data:") {
                continue;
            }

            let path = self.joined(&src);
            if !self.included(AssetClass::Image, &path) {
                continue;
            }

            let bytes = match self.resolver.fetch(&path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    tolerate(&self.options, err)?;
                    continue;
                }
            };

            let Some(mime) = mime_for_path(&path) else {
                tolerate(
                    &self.options,
                    BundleError::parse(&path, "could not find MIME type"),
                )?;
                continue;
            };

            let data = format!("data:{mime};base64,{}", BASE64.encode(&bytes));
            img.attributes.borrow_mut().insert("src", data);
        }
        Ok(())
    }
}
