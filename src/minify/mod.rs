//! Pluggable minification for CSS, JS, and HTML text.
//!
//! One backend per content type: lightningcss for stylesheets, oxc for
//! scripts, minify-html for the final document. A backend rejecting its
//! input surfaces as a parse failure, subject to the same strict/lenient
//! policy as fetch failures.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use crate::error::{BundleError, BundleResult};

/// Minifies text content, one function per content type. Stateless per call,
/// so a single instance serves a whole bundling run.
pub struct Minifier {
    html_cfg: minify_html::Cfg,
}

impl Minifier {
    #[must_use]
    pub fn new() -> Self {
        Minifier {
            html_cfg: minify_html::Cfg {
                keep_closing_tags: true,
                keep_html_and_head_opening_tags: true,
                ..minify_html::Cfg::default()
            },
        }
    }

    /// Minify a stylesheet.
    pub fn css(&self, source: &str) -> BundleResult<String> {
        let sheet = StyleSheet::parse(source, ParserOptions::default())
            .map_err(|e| BundleError::parse("stylesheet", e))?;
        let out = sheet
            .to_css(PrinterOptions {
                minify: true,
                ..PrinterOptions::default()
            })
            .map_err(|e| BundleError::parse("stylesheet", e))?;
        Ok(out.code)
    }

    /// Minify a script.
    pub fn js(&self, source: &str) -> BundleResult<String> {
        let allocator = Allocator::default();
        let parsed = Parser::new(&allocator, source, SourceType::mjs()).parse();
        if let Some(error) = parsed.errors.first() {
            return Err(BundleError::parse("script", error));
        }

        let mut program = parsed.program;
        let minified = oxc::minifier::Minifier::new(MinifierOptions {
            mangle: Some(MangleOptions::default()),
            compress: Some(CompressOptions::smallest()),
        })
        .minify(&allocator, &mut program);

        let code = Codegen::new()
            .with_options(CodegenOptions {
                minify: true,
                comments: CommentOptions::disabled(),
                ..CodegenOptions::default()
            })
            .with_scoping(minified.scoping)
            .build(&program)
            .code;
        Ok(code)
    }

    /// Minify a whole HTML document.
    pub fn html(&self, source: &str) -> BundleResult<String> {
        let bytes = minify_html::minify(source.as_bytes(), &self.html_cfg);
        String::from_utf8(bytes)
            .map_err(|e| BundleError::Document(format!("minified document is not valid UTF-8: {e}")))
    }
}

impl Default for Minifier {
    fn default() -> Self {
        Minifier::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_collapses_whitespace() {
        let out = Minifier::new().css("div {\n\tdisplay: none;\n}\n").unwrap();
        assert_eq!(out, "div{display:none}");
    }

    #[test]
    fn invalid_css_is_a_parse_failure() {
        let err = Minifier::new().css("div { color: }").unwrap_err();
        assert!(matches!(err, BundleError::Parse { .. }));
    }

    #[test]
    fn js_shrinks_and_keeps_effects() {
        let source = "var x = 1;\nvar y = 2;\nconsole.log(x + y);\n";
        let out = Minifier::new().js(source).unwrap();
        assert!(out.len() < source.len());
        assert!(out.contains("console"));
    }

    #[test]
    fn invalid_js_is_a_parse_failure() {
        let err = Minifier::new().js("var = ;;;(").unwrap_err();
        assert!(matches!(err, BundleError::Parse { .. }));
    }

    #[test]
    fn html_collapses_whitespace() {
        let out = Minifier::new()
            .html("<html>\n  <head>\n    <title>t</title>\n  </head>\n  <body>\n  </body>\n</html>")
            .unwrap();
        assert!(!out.contains("\n  "));
        assert!(out.contains("<title>t</title>"));
    }
}
