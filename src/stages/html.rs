// src/stages/html.rs

//! HTML minification with `minify-html`.
//!
//! Closing tags and the `<html>`/`<head>` opening tags are kept, so the
//! output stays readable by tools that do not implement HTML's tag
//! omission rules. Inline `<script>` and `<style>` bodies are left alone;
//! scripts and stylesheets have their own stages.

use anyhow::Result;
use minify_html::{minify, Cfg};

use super::{blocking, Asset, BoxFuture, Stage};

fn config() -> Cfg {
    let mut cfg = Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.do_not_minify_doctype = true;
    cfg.ensure_spec_compliant_unquoted_attribute_values = true;
    cfg
}

pub fn minify_html(input: &[u8]) -> Vec<u8> {
    minify(input, &config())
}

#[derive(Debug, Clone, Copy)]
pub struct HtmlStage;

impl Stage for HtmlStage {
    fn name(&self) -> &'static str {
        "html"
    }

    fn apply(&self, assets: Vec<Asset>) -> BoxFuture<'_, Result<Vec<Asset>>> {
        blocking(move || {
            let cfg = config();
            Ok(assets
                .into_iter()
                .map(|mut asset| {
                    asset.contents = minify(&asset.contents, &cfg);
                    asset
                })
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minified(html: &str) -> String {
        String::from_utf8(minify_html(html.as_bytes())).unwrap()
    }

    #[test]
    fn drops_layout_whitespace() {
        let out = minified("<!DOCTYPE html>\n<html>\n  <body>\n    <h1>Hi</h1>\n  </body>\n</html>\n");
        assert!(out.starts_with("<!DOCTYPE html><html>"), "got {out}");
        assert!(out.contains("<h1>Hi</h1>"), "got {out}");
        assert!(!out.contains('\n'), "got {out}");
    }

    #[test]
    fn whitespace_between_inline_elements_survives() {
        let out = minified("<p><span>Hello</span>\n    <span>world</span></p>");
        assert!(out.contains("<span>Hello</span> <span>world</span>"), "got {out}");
    }

    #[test]
    fn attribute_values_are_untouched() {
        let out = minified("<p title=\"a\n    b\">x</p>");
        assert!(out.contains("a\n    b"), "got {out}");
    }

    #[test]
    fn preformatted_text_is_kept() {
        let out = minified("<div>\n  <pre>a\n   b</pre>\n</div>");
        assert!(out.contains("<pre>a\n   b</pre>"), "got {out}");
    }
}
