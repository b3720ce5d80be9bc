// src/stages/svg.rs

//! SVG cleanup and sprite stacking.
//!
//! Both stages parse their input with `roxmltree` (internal DTD entities are
//! expanded) and write the element tree back out. Comments, processing
//! instructions, the doctype and whitespace-only text are not written.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use roxmltree::{Document, Node, ParsingOptions};
use tracing::debug;

use super::{blocking, Asset, BoxFuture, Stage};

const DEFAULT_SPRITE_FILE: &str = "stack.svg";
const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespaces of editor bookkeeping (Inkscape, Sodipodi, Sketch, Adobe).
const EDITOR_NAMESPACES: &[&str] = &[
    "http://www.inkscape.org/namespaces/inkscape",
    "http://sodipodi.sourceforge.net/DTD/sodipodi-0.dtd",
    "http://www.bohemiancoding.com/sketch/ns",
];
const ADOBE_NS_PREFIX: &str = "http://ns.adobe.com/";

/// SVG elements that never affect rendering.
const DROPPED_ELEMENTS: &[&str] = &["metadata", "title", "desc"];

type Scope = Vec<(Option<String>, String)>;

fn is_editor_ns(uri: &str) -> bool {
    EDITOR_NAMESPACES.contains(&uri) || uri.starts_with(ADOBE_NS_PREFIX)
}

fn parse(text: &str) -> Result<Document<'_>, roxmltree::Error> {
    let opts = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(text, opts)
}

fn is_dropped(node: Node) -> bool {
    let name = node.tag_name();
    match name.namespace() {
        Some(ns) if is_editor_ns(ns) => true,
        Some(ns) if ns != SVG_NS => false,
        _ => DROPPED_ELEMENTS.contains(&name.name()),
    }
}

/// Namespace declarations in scope at `node`.
fn scope(node: Node) -> Scope {
    node.namespaces()
        .filter(|ns| ns.uri() != XML_NS)
        .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
        .collect()
}

fn qualified(node: Node, uri: Option<&str>, local: &str, is_attr: bool) -> String {
    let Some(uri) = uri else {
        return local.to_string();
    };
    if uri == XML_NS {
        return format!("xml:{local}");
    }
    if !is_attr && node.default_namespace() == Some(uri) {
        return local.to_string();
    }
    match node.lookup_prefix(uri) {
        Some(prefix) => format!("{prefix}:{local}"),
        None => local.to_string(),
    }
}

fn push_escaped(out: &mut String, text: &str, in_attr: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attr => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    let _ = write!(out, " {name}=\"");
    push_escaped(out, value, true);
    out.push('"');
}

fn push_xmlns(out: &mut String, prefix: Option<&str>, uri: &str) {
    match prefix {
        Some(prefix) => push_attr(out, &format!("xmlns:{prefix}"), uri),
        None => push_attr(out, "xmlns", uri),
    }
}

fn write_children(node: Node, scope: &Scope, out: &mut String) {
    for child in node.children() {
        write_node(child, scope, out);
    }
}

/// Serialise `node`, declaring only namespaces not already in `parent_scope`.
fn write_node(node: Node, parent_scope: &Scope, out: &mut String) {
    if node.is_text() {
        if let Some(text) = node.text().filter(|t| !t.trim().is_empty()) {
            push_escaped(out, text, false);
        }
        return;
    }
    if !node.is_element() || is_dropped(node) {
        return;
    }

    let tag = node.tag_name();
    let name = qualified(node, tag.namespace(), tag.name(), false);
    let scope = scope(node);

    out.push('<');
    out.push_str(&name);
    for (prefix, uri) in scope.iter().filter(|ns| !parent_scope.contains(ns)) {
        if !is_editor_ns(uri) {
            push_xmlns(out, prefix.as_deref(), uri);
        }
    }
    for attr in node.attributes() {
        if attr.namespace().is_some_and(is_editor_ns) {
            continue;
        }
        let attr_name = qualified(node, attr.namespace(), attr.name(), true);
        push_attr(out, &attr_name, attr.value());
    }

    let mut body = String::new();
    write_children(node, &scope, &mut body);
    if body.is_empty() {
        out.push_str("/>");
    } else {
        let _ = write!(out, ">{body}</{name}>");
    }
}

/// Drop editor cruft, non-rendering metadata and inter-tag whitespace.
pub fn clean_svg(input: &str) -> Result<String> {
    let doc = parse(input)?;
    let mut out = String::with_capacity(input.len());
    write_node(doc.root_element(), &Scope::new(), &mut out);
    Ok(out)
}

#[derive(Debug, Clone, Copy)]
pub struct SvgoStage;

impl Stage for SvgoStage {
    fn name(&self) -> &'static str {
        "svgo"
    }

    fn apply(&self, assets: Vec<Asset>) -> BoxFuture<'_, Result<Vec<Asset>>> {
        blocking(move || {
            assets
                .into_iter()
                .map(|mut asset| {
                    let cleaned = clean_svg(asset.text()?)
                        .with_context(|| format!("{} is not well-formed SVG", asset.rel.display()))?;
                    asset.contents = cleaned.into_bytes();
                    Ok(asset)
                })
                .collect()
        })
    }
}

/// Merge every input SVG into one stack.
///
/// Each icon becomes a nested `<svg id="...">` keeping its `viewBox`; the id
/// is the icon's relative path without extension, separators replaced by
/// `_`. A `:target` rule makes `stack.svg#menu` render only that icon.
#[derive(Debug, Clone)]
pub struct SpriteStage {
    file: String,
}

impl SpriteStage {
    pub fn new(file: Option<String>) -> Self {
        Self {
            file: file.unwrap_or_else(|| DEFAULT_SPRITE_FILE.to_string()),
        }
    }
}

fn icon_id(asset: &Asset) -> String {
    asset
        .rel
        .with_extension("")
        .to_string_lossy()
        .replace(['/', '\\'], "_")
}

fn stack_icon(asset: &Asset, out: &mut String) -> Result<()> {
    let doc = parse(asset.text()?)
        .with_context(|| format!("{} is not well-formed SVG", asset.rel.display()))?;
    let root = doc.root_element();
    if root.tag_name().name() != "svg" {
        bail!("{} has no <svg> root element", asset.rel.display());
    }

    let _ = write!(out, "<svg id=\"{}\"", icon_id(asset));
    for name in ["viewBox", "preserveAspectRatio"] {
        if let Some(value) = root.attribute(name) {
            push_attr(out, name, value);
        }
    }
    // The stack root declares the SVG and xlink namespaces.
    let scope = scope(root);
    for (prefix, uri) in &scope {
        if uri != SVG_NS && uri != XLINK_NS && !is_editor_ns(uri) {
            push_xmlns(out, prefix.as_deref(), uri);
        }
    }
    out.push('>');
    write_children(root, &scope, out);
    out.push_str("</svg>");
    Ok(())
}

pub fn build_stack(icons: &[Asset]) -> Result<String> {
    let mut body = String::new();
    for icon in icons {
        stack_icon(icon, &mut body)?;
    }
    let xlink = if body.contains("xlink:") {
        format!(" xmlns:xlink=\"{XLINK_NS}\"")
    } else {
        String::new()
    };
    Ok(format!(
        "<svg xmlns=\"{SVG_NS}\"{xlink}><style>:root{{visibility:hidden}}:target{{visibility:visible}}</style>{body}</svg>"
    ))
}

impl Stage for SpriteStage {
    fn name(&self) -> &'static str {
        "sprite"
    }

    fn apply(&self, assets: Vec<Asset>) -> BoxFuture<'_, Result<Vec<Asset>>> {
        let file = self.file.clone();
        blocking(move || {
            if assets.is_empty() {
                debug!(file = %file, "no icons; sprite not written");
                return Ok(Vec::new());
            }
            let stack = build_stack(&assets)?;
            Ok(vec![Asset::new(PathBuf::from(file), stack)])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_drops_prolog_comments_and_editor_data() {
        let svg = r#"<?xml version="1.0"?>
<!-- Generator: Sketch -->
<svg xmlns="http://www.w3.org/2000/svg" xmlns:sketch="http://www.bohemiancoding.com/sketch/ns" viewBox="0 0 10 10">
  <title>Icon</title>
  <metadata>junk</metadata>
  <path d="M0 0h10v10z" sketch:type="MSShapeGroup"/>
</svg>
"#;
        assert_eq!(
            clean_svg(svg).unwrap(),
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"><path d="M0 0h10v10z"/></svg>"#
        );
    }

    #[test]
    fn entity_doctype_is_resolved_and_dropped() {
        let svg = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd" [
	<!ENTITY ns_svg "http://www.w3.org/2000/svg">
	<!ENTITY ns_xlink "http://www.w3.org/1999/xlink">
]>
<svg version="1.1" xmlns="&ns_svg;" xmlns:xlink="&ns_xlink;" viewBox="0 0 10 10">
	<rect width="10" height="10"/>
</svg>
"#;
        let out = clean_svg(svg).unwrap();
        assert!(out.starts_with("<svg "), "got {out}");
        assert!(out.contains(r#"xmlns="http://www.w3.org/2000/svg""#), "got {out}");
        assert!(!out.contains("]>"), "got {out}");
        assert!(!out.contains("&ns_"), "got {out}");
        assert!(out.ends_with(r#"<rect width="10" height="10"/></svg>"#), "got {out}");
        assert!(Document::parse(&out).is_ok());
    }

    #[test]
    fn text_and_foreign_namespaces_are_kept() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">
  <text x="1">A &amp; B</text>
  <use xlink:href="#a"/>
</svg>"##;
        let out = clean_svg(svg).unwrap();
        assert!(out.contains(r#"xmlns:xlink="http://www.w3.org/1999/xlink""#), "got {out}");
        assert!(
            out.ends_with(r##"><text x="1">A &amp; B</text><use xlink:href="#a"/></svg>"##),
            "got {out}"
        );
    }

    #[tokio::test]
    async fn sprite_stacks_icons_by_relative_name() {
        let icons = vec![
            Asset::new("menu.svg", r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" viewBox="0 0 24 24"><path d="M1 1"/></svg>"#),
            Asset::new("social/vk.svg", r#"<svg viewBox="0 0 16 16"><circle r="4"/></svg>"#),
        ];
        let out = SpriteStage::new(None).apply(icons).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].rel, PathBuf::from("stack.svg"));

        let text = out[0].text().unwrap();
        assert!(text.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg">"#));
        assert!(text.contains(r#"<svg id="menu" viewBox="0 0 24 24"><path d="M1 1"/></svg>"#));
        assert!(text.contains(r#"<svg id="social_vk" viewBox="0 0 16 16"><circle r="4"/></svg>"#));
        assert!(!text.contains("width="));
    }

    #[tokio::test]
    async fn sprite_without_icons_writes_nothing() {
        let out = SpriteStage::new(Some("icons.svg".into()))
            .apply(Vec::new())
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn sprite_rejects_non_svg_input() {
        let out = SpriteStage::new(None)
            .apply(vec![Asset::new("x.svg", "plain text")])
            .await;
        assert!(out.is_err());
    }
}
