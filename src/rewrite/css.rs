//! Stylesheet rewriting over a CSS token stream.
//!
//! Two constructs are rewritten: `@import` statements are resolved and their
//! fully expanded content spliced in place, recursively up to a fixed depth;
//! `url()` references to images and fonts become base64 data URIs. Every
//! other token is copied through byte-for-byte by slicing the source between
//! token positions, so untouched rules keep their original formatting.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use cssparser::{ParseError, ParseErrorKind, Parser, ParserInput, Token};

use super::Bundler;
use crate::config::AssetClass;
use crate::error::{BundleError, BundleResult, tolerate};
use crate::resolve::{is_remote, mime_for_path};

/// Import chains deeper than this abort with a parse failure instead of
/// recursing until resource exhaustion.
const MAX_IMPORT_DEPTH: usize = 64;

impl Bundler {
    /// Rewrite a stylesheet, resolving `@import` targets and inlining
    /// `url()` references according to policy.
    ///
    /// Import targets are fetched as written; they are not joined with the
    /// configured root.
    pub(crate) fn rewrite_stylesheet(&self, css: &str, depth: usize) -> BundleResult<String> {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut out = String::with_capacity(css.len());
        self.rewrite_tokens(&mut parser, depth, &mut out)?;
        Ok(out)
    }

    fn rewrite_tokens(
        &self,
        parser: &mut Parser<'_, '_>,
        depth: usize,
        out: &mut String,
    ) -> BundleResult<()> {
        loop {
            let start = parser.position();
            let token = match parser.next_including_whitespace_and_comments() {
                Ok(token) => token.clone(),
                Err(_) => {
                    // End of input.
                    out.push_str(parser.slice_from(start));
                    return Ok(());
                }
            };

            match token {
                Token::AtKeyword(ref name) if name.eq_ignore_ascii_case("import") => {
                    self.expand_import(parser, depth, out)?;
                }
                Token::UnquotedUrl(ref target) => {
                    let target = target.as_ref().to_string();
                    let verbatim = parser.slice_from(start).to_string();
                    self.rewrite_url(&target, &verbatim, out)?;
                }
                Token::Function(ref name) if name.eq_ignore_ascii_case("url") => {
                    // The quoted form: `url("…")` tokenizes as a function.
                    let target = parse_url_argument(parser);
                    let verbatim = parser.slice_from(start).to_string();
                    match target {
                        Some(target) => self.rewrite_url(&target, &verbatim, out)?,
                        None => out.push_str(&verbatim),
                    }
                }
                Token::Function(_)
                | Token::ParenthesisBlock
                | Token::SquareBracketBlock
                | Token::CurlyBracketBlock => {
                    out.push_str(parser.slice_from(start));
                    let close = match token {
                        Token::SquareBracketBlock => "]",
                        Token::CurlyBracketBlock => "}",
                        _ => ")",
                    };
                    self.rewrite_nested(parser, depth, out)?;
                    out.push_str(close);
                }
                _ => out.push_str(parser.slice_from(start)),
            }
        }
    }

    /// Descend into a block, rewriting its contents. The closing delimiter is
    /// consumed by the parser, so it is re-emitted by the caller.
    fn rewrite_nested(
        &self,
        parser: &mut Parser<'_, '_>,
        depth: usize,
        out: &mut String,
    ) -> BundleResult<()> {
        let result = parser.parse_nested_block(|block| {
            self.rewrite_tokens(block, depth, out)
                .map_err(|e| block.new_custom_error(e))
        });
        match result {
            Ok(()) => Ok(()),
            Err(ParseError {
                kind: ParseErrorKind::Custom(err),
                ..
            }) => Err(err),
            // The tokenizer itself never fails here.
            Err(_) => Ok(()),
        }
    }

    /// Consume an `@import` statement through its terminating semicolon and
    /// splice the expanded target in its place. Trailing media-query tokens
    /// are ignored. A non-fatal failure drops the statement entirely.
    fn expand_import(
        &self,
        parser: &mut Parser<'_, '_>,
        depth: usize,
        out: &mut String,
    ) -> BundleResult<()> {
        let mut targets = Vec::new();
        loop {
            let token = match parser.next_including_whitespace_and_comments() {
                Ok(token) => token.clone(),
                Err(_) => break,
            };
            match token {
                Token::Semicolon => break,
                Token::QuotedString(ref s) | Token::UnquotedUrl(ref s) => {
                    targets.push(s.as_ref().to_string());
                }
                Token::Function(ref name) if name.eq_ignore_ascii_case("url") => {
                    if let Some(target) = parse_url_argument(parser) {
                        targets.push(target);
                    }
                }
                _ => {}
            }
        }

        for target in targets {
            if target.is_empty() {
                continue;
            }
            if depth >= MAX_IMPORT_DEPTH {
                tolerate(
                    &self.options,
                    BundleError::parse(&target, "import depth exceeded"),
                )?;
                continue;
            }
            let bytes = match self.resolver.fetch(&target) {
                Ok(bytes) => bytes,
                Err(err) => {
                    tolerate(&self.options, err)?;
                    continue;
                }
            };
            let text = String::from_utf8_lossy(&bytes);
            let expanded = self.rewrite_stylesheet(&text, depth + 1)?;
            out.push_str(&expanded);
        }
        Ok(())
    }

    /// Rewrite a single `url()` reference to a data URI, or pass it through
    /// untouched when it is already inlined, its MIME type is unknown, or
    /// policy disallows its class for its locality.
    fn rewrite_url(&self, target: &str, verbatim: &str, out: &mut String) -> BundleResult<()> {
        if target.starts_with("data:") {
            out.push_str(verbatim);
            return Ok(());
        }

        let Some(mime) = mime_for_path(target) else {
            tolerate(
                &self.options,
                BundleError::parse(target, "could not find MIME type"),
            )?;
            out.push_str(verbatim);
            return Ok(());
        };

        let class = if mime.starts_with("image/") {
            Some(AssetClass::Image)
        } else if mime.starts_with("font/") {
            Some(AssetClass::Font)
        } else {
            None
        };
        if let Some(class) = class
            && !self.options.includes(class, is_remote(target))
        {
            out.push_str(verbatim);
            return Ok(());
        }

        match self.resolver.fetch(target) {
            Ok(bytes) => {
                out.push_str("url(data:");
                out.push_str(mime);
                out.push_str(";base64,");
                BASE64.encode_string(&bytes, out);
                out.push(')');
            }
            // An unfetchable reference is dropped from the output.
            Err(err) => tolerate(&self.options, err)?,
        }
        Ok(())
    }
}

/// Extract the string argument of a `url("…")` function token, consuming the
/// whole parenthesized block. Returns `None` when the argument is not a plain
/// string.
fn parse_url_argument(parser: &mut Parser<'_, '_>) -> Option<String> {
    parser
        .parse_nested_block(|block| {
            let value = block.expect_string()?.as_ref().to_string();
            Ok::<_, ParseError<'_, ()>>(value)
        })
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BundleOptions;
    use crate::minify::Minifier;

    fn bundler(options: BundleOptions) -> Bundler {
        Bundler::new(options, Minifier::new()).unwrap()
    }

    fn css_and_images() -> BundleOptions {
        let mut options = BundleOptions::new("", false, true);
        options.local.insert(AssetClass::Css);
        options.local.insert(AssetClass::Image);
        options
    }

    fn png_data_uri() -> String {
        let bytes = std::fs::read("./testdata/a.png").unwrap();
        format!("data:image/png;base64,{}", BASE64.encode(&bytes))
    }

    #[test]
    fn unmatched_tokens_pass_through_byte_for_byte() {
        let b = bundler(css_and_images());
        for css in [
            "span { display: block; }",
            "/* keep me */\na {\n\tcolor: calc(1px + 2em);\n}\n",
            "a[href=\"x\"] > b { margin: 0 }",
            "@media print { p { color: black } }",
        ] {
            assert_eq!(b.rewrite_stylesheet(css, 0).unwrap(), css);
        }
    }

    #[test]
    fn import_string_form_is_expanded() {
        let b = bundler(css_and_images());
        let want = std::fs::read_to_string("./testdata/a.css").unwrap();
        let out = b
            .rewrite_stylesheet("@import './testdata/a.css';", 0)
            .unwrap();
        assert_eq!(out, want);
    }

    #[test]
    fn import_url_forms_are_expanded() {
        let b = bundler(css_and_images());
        let want = std::fs::read_to_string("./testdata/a.css").unwrap();
        for css in [
            "@import url(\"./testdata/a.css\");",
            "@import url(./testdata/a.css);",
            "@import url(\"./testdata/a.css\") print;",
        ] {
            assert_eq!(b.rewrite_stylesheet(css, 0).unwrap(), want, "{css}");
        }
    }

    #[test]
    fn url_references_become_data_uris() {
        let b = bundler(css_and_images());
        let want = format!("span {{ background-image: url({}); }}", png_data_uri());
        for css in [
            "span { background-image: url('./testdata/a.png'); }",
            "span { background-image: url(./testdata/a.png); }",
        ] {
            assert_eq!(b.rewrite_stylesheet(css, 0).unwrap(), want, "{css}");
        }
    }

    #[test]
    fn data_uris_pass_through() {
        let b = bundler(css_and_images());
        let css = "span { background-image: url(data:image/png;base64,iVBORw0KGgoAAA==); }";
        assert_eq!(b.rewrite_stylesheet(css, 0).unwrap(), css);
    }

    #[test]
    fn disallowed_class_passes_through_with_original_quoting() {
        let mut options = BundleOptions::new("", false, true);
        options.local.insert(AssetClass::Css);
        // Image inclusion left disabled.
        let b = bundler(options);
        let css = "span { background-image: url('./testdata/a.png'); }";
        assert_eq!(b.rewrite_stylesheet(css, 0).unwrap(), css);
    }

    #[test]
    fn unknown_mime_passes_through_in_lenient_mode() {
        let b = bundler(css_and_images());
        let css = "span { background-image: url('./testdata/a.unknownext'); }";
        assert_eq!(b.rewrite_stylesheet(css, 0).unwrap(), css);
    }

    #[test]
    fn unknown_mime_aborts_in_strict_mode() {
        let mut options = css_and_images();
        options.strict = true;
        let b = bundler(options);
        let err = b
            .rewrite_stylesheet("span { background-image: url('./testdata/a.unknownext'); }", 0)
            .unwrap_err();
        assert!(matches!(err, BundleError::Parse { .. }));
        assert!(err.to_string().contains("MIME"));
    }

    #[test]
    fn missing_import_is_dropped_in_lenient_mode() {
        let b = bundler(css_and_images());
        let out = b
            .rewrite_stylesheet("@import './testdata/nonexist.css';\nspan { display: block; }", 0)
            .unwrap();
        assert_eq!(out, "\nspan { display: block; }");
    }

    #[test]
    fn missing_import_aborts_in_strict_mode() {
        let mut options = css_and_images();
        options.strict = true;
        let b = bundler(options);
        let err = b
            .rewrite_stylesheet("@import './testdata/nonexist.css';", 0)
            .unwrap_err();
        assert!(matches!(err, BundleError::Lookup { .. }));
    }

    #[test]
    fn nested_import_is_flattened_and_inlined() {
        let b = bundler(css_and_images());
        let out = b
            .rewrite_stylesheet("@import './testdata/import.css';", 0)
            .unwrap();
        assert!(!out.contains("@import"));
        assert!(out.contains(&png_data_uri()));
    }

    #[test]
    fn self_referential_import_hits_the_depth_limit() {
        let source = std::fs::read_to_string("./testdata/self.css").unwrap();

        let lenient = bundler(css_and_images());
        let out = lenient.rewrite_stylesheet(&source, 0).unwrap();
        assert!(out.trim().is_empty());

        let mut options = css_and_images();
        options.strict = true;
        let strict = bundler(options);
        let err = strict.rewrite_stylesheet(&source, 0).unwrap_err();
        assert!(err.to_string().contains("import depth exceeded"));
    }
}
