//! Bundling policy configuration.
//!
//! Each asset class is independently switchable along three dimensions:
//! inclusion of local references, inclusion of remote references, and
//! minification. An asset class with neither include flag set is skipped
//! entirely, leaving the original references byte-for-byte intact.

use crate::error::{BundleError, BundleResult};

/// One class of bundleable asset.
///
/// `Html` only participates in the minify dimension; it is not something
/// that can be inlined into itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetClass {
    Css,
    Js,
    Image,
    Font,
    Html,
}

impl std::fmt::Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetClass::Css => write!(f, "css"),
            AssetClass::Js => write!(f, "js"),
            AssetClass::Image => write!(f, "image"),
            AssetClass::Font => write!(f, "font"),
            AssetClass::Html => write!(f, "html"),
        }
    }
}

/// A set of asset classes, one named flag per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssetSet {
    pub css: bool,
    pub js: bool,
    pub image: bool,
    pub font: bool,
    pub html: bool,
}

impl AssetSet {
    /// The empty set.
    pub const EMPTY: AssetSet = AssetSet {
        css: false,
        js: false,
        image: false,
        font: false,
        html: false,
    };

    #[must_use]
    pub fn contains(self, class: AssetClass) -> bool {
        match class {
            AssetClass::Css => self.css,
            AssetClass::Js => self.js,
            AssetClass::Image => self.image,
            AssetClass::Font => self.font,
            AssetClass::Html => self.html,
        }
    }

    pub fn insert(&mut self, class: AssetClass) {
        match class {
            AssetClass::Css => self.css = true,
            AssetClass::Js => self.js = true,
            AssetClass::Image => self.image = true,
            AssetClass::Font => self.font = true,
            AssetClass::Html => self.html = true,
        }
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self == AssetSet::EMPTY
    }

    /// Parse a comma-separated include list as accepted by the `--local` and
    /// `--remote` flags: `css`, `js`/`javascript`, `img`/`image`/`images`,
    /// `font`/`fonts`. Empty tokens are ignored, so an empty string disables
    /// the dimension. Unknown tokens are a configuration error.
    pub fn parse_include(list: &str, flag: &str) -> BundleResult<AssetSet> {
        let mut set = AssetSet::EMPTY;
        for raw in list.split(',') {
            match raw.trim().to_ascii_lowercase().as_str() {
                "" => {}
                "css" => set.insert(AssetClass::Css),
                "js" | "javascript" => set.insert(AssetClass::Js),
                "img" | "image" | "images" => set.insert(AssetClass::Image),
                "font" | "fonts" => set.insert(AssetClass::Font),
                other => {
                    return Err(BundleError::Config(format!(
                        "unknown value for --{flag}: {other:?}"
                    )));
                }
            }
        }
        Ok(set)
    }

    /// Parse the comma-separated `--minify` list: `css`, `js`/`javascript`,
    /// `html`. Empty tokens are ignored; unknown tokens are a configuration
    /// error.
    pub fn parse_minify(list: &str) -> BundleResult<AssetSet> {
        let mut set = AssetSet::EMPTY;
        for raw in list.split(',') {
            match raw.trim().to_ascii_lowercase().as_str() {
                "" => {}
                "css" => set.insert(AssetClass::Css),
                "js" | "javascript" => set.insert(AssetClass::Js),
                "html" => set.insert(AssetClass::Html),
                other => {
                    return Err(BundleError::Config(format!(
                        "unknown value for --minify: {other:?}"
                    )));
                }
            }
        }
        Ok(set)
    }
}

/// Policy for a single bundling run. Immutable once built; consulted by every
/// pass of the engine.
#[derive(Debug, Clone, Default)]
pub struct BundleOptions {
    /// Prefix for resolving references, either a filesystem path or a remote
    /// URL. When it is a remote URL, every joined reference classifies as
    /// remote.
    pub root: String,
    /// Abort the whole run on the first lookup or parse failure instead of
    /// warning and leaving the reference alone.
    pub strict: bool,
    /// Suppress warnings about skipped assets.
    pub quiet: bool,
    /// Asset classes inlined when they resolve to the local filesystem.
    pub local: AssetSet,
    /// Asset classes inlined when they resolve to a network address.
    pub remote: AssetSet,
    /// Content types minified while bundling.
    pub minify: AssetSet,
}

impl BundleOptions {
    #[must_use]
    pub fn new(root: impl Into<String>, strict: bool, quiet: bool) -> Self {
        BundleOptions {
            root: root.into(),
            strict,
            quiet,
            ..BundleOptions::default()
        }
    }

    /// Options with everything enabled: all asset classes inlined from both
    /// localities, CSS, JS, and HTML minified.
    #[must_use]
    pub fn everything(root: impl Into<String>) -> Self {
        let include = AssetSet {
            css: true,
            js: true,
            image: true,
            font: true,
            html: false,
        };
        BundleOptions {
            root: root.into(),
            local: include,
            remote: include,
            minify: AssetSet {
                css: true,
                js: true,
                html: true,
                ..AssetSet::EMPTY
            },
            ..BundleOptions::default()
        }
    }

    /// Whether an asset of `class` with the given locality should be inlined.
    #[must_use]
    pub fn includes(&self, class: AssetClass, remote: bool) -> bool {
        if remote {
            self.remote.contains(class)
        } else {
            self.local.contains(class)
        }
    }

    /// Whether a class is included for at least one locality. Passes over
    /// classes for which this is false skip their elements wholesale.
    #[must_use]
    pub fn considers(&self, class: AssetClass) -> bool {
        self.local.contains(class) || self.remote.contains(class)
    }

    /// Whether content of `class` should be minified.
    #[must_use]
    pub fn minifies(&self, class: AssetClass) -> bool {
        self.minify.contains(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_include_accepts_aliases_and_mixed_case() {
        let set = AssetSet::parse_include("CSS, jS", "local").unwrap();
        assert!(set.css);
        assert!(set.js);
        assert!(!set.image);

        let set = AssetSet::parse_include("images,fonts", "local").unwrap();
        assert!(set.image);
        assert!(set.font);
    }

    #[test]
    fn empty_string_disables_a_dimension() {
        assert!(AssetSet::parse_include("", "local").unwrap().is_empty());
        assert!(AssetSet::parse_minify("").unwrap().is_empty());
    }

    #[test]
    fn unknown_include_token_is_a_config_error() {
        let err = AssetSet::parse_include("css,wasm", "remote").unwrap_err();
        assert!(matches!(err, BundleError::Config(_)));
        assert!(err.to_string().contains("--remote"));
        assert!(err.to_string().contains("wasm"));
    }

    #[test]
    fn html_is_only_valid_for_minify() {
        assert!(AssetSet::parse_include("html", "local").is_err());
        let set = AssetSet::parse_minify("css,js,html").unwrap();
        assert!(set.html);
    }

    #[test]
    fn fonts_are_not_a_minify_target() {
        assert!(AssetSet::parse_minify("font").is_err());
    }

    #[test]
    fn includes_selects_the_matching_locality() {
        let mut options = BundleOptions::new("", false, false);
        options.local.insert(AssetClass::Css);
        assert!(options.includes(AssetClass::Css, false));
        assert!(!options.includes(AssetClass::Css, true));
        assert!(options.considers(AssetClass::Css));
        assert!(!options.considers(AssetClass::Js));
    }
}
