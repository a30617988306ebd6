//! In-place HTML DOM mutation on top of `scraper`'s `ego_tree`-backed
//! document. `scraper::Html` is normally read-only (selectors borrow from
//! it), but its `tree` field is public and mutable, which is what lets us
//! decompose nodes and rewrite attributes without re-parsing after every
//! edit.

use ego_tree::NodeId;
use html5ever::{LocalName, Namespace, QualName};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{node::Element, Html, Node, Selector};
use tendril::StrTendril;

fn qualname(local: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(local))
}

pub struct HtmlDoc {
    pub html: Html,
}

impl HtmlDoc {
    pub fn parse_fragment(input: &str) -> Self {
        HtmlDoc { html: Html::parse_fragment(input) }
    }

    pub fn parse_document(input: &str) -> Self {
        HtmlDoc { html: Html::parse_document(input) }
    }

    pub fn to_html(&self) -> String {
        self.html.html()
    }

    fn select_ids(&self, selector: &str) -> Vec<NodeId> {
        match Selector::parse(selector) {
            Ok(sel) => self.html.select(&sel).map(|e| e.id()).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn decompose(&mut self, id: NodeId) {
        if let Some(mut node) = self.html.tree.get_mut(id) {
            node.detach();
        }
    }

    fn with_element_mut<F: FnOnce(&mut Element)>(&mut self, id: NodeId, f: F) {
        if let Some(mut node) = self.html.tree.get_mut(id) {
            if let Node::Element(el) = node.value() {
                f(el);
            }
        }
    }

    fn text_of(&self, id: NodeId) -> String {
        self.html
            .tree
            .get(id)
            .map(|n| n.descendants().filter_map(|d| d.value().as_text()).map(|t| t.to_string()).collect::<String>())
            .unwrap_or_default()
    }

    fn has_img_descendant(&self, id: NodeId) -> bool {
        self.html
            .tree
            .get(id)
            .map(|n| {
                n.descendants()
                    .any(|d| d.value().as_element().map(|e| e.name() == "img").unwrap_or(false))
            })
            .unwrap_or(false)
    }

    /// Strips HTML-comment text nodes that look like a stray literal
    /// `<!--...-->` left behind by upstream feed content.
    pub fn clean_html(&mut self) {
        let ids: Vec<NodeId> = self
            .html
            .tree
            .nodes()
            .filter(|n| {
                n.value()
                    .as_text()
                    .map(|t| t.trim_start().starts_with("<!--"))
                    .unwrap_or(false)
            })
            .map(|n| n.id())
            .collect();
        for id in ids {
            self.decompose(id);
        }
    }

    pub fn remove_selectors(&mut self, selectors: &[&str]) {
        for selector in selectors {
            for id in self.select_ids(selector) {
                self.decompose(id);
            }
        }
    }

    /// Removes elements of the given tag names that have no text content
    /// and no `<img>` descendant (a blank ad slot, an empty paragraph left
    /// by an upstream sanitizer, etc).
    pub fn remove_empty_elements(&mut self, tags: &[&str]) {
        for tag in tags {
            for id in self.select_ids(tag) {
                if self.text_of(id).trim().is_empty() && !self.has_img_descendant(id) {
                    self.decompose(id);
                }
            }
        }
    }

    /// Strips every `data-*` attribute except the ones in `keep`.
    pub fn clean_data_attributes(&mut self, keep: &[&str]) {
        let ids = self.select_ids("*");
        for id in ids {
            self.with_element_mut(id, |el| {
                let to_remove: Vec<QualName> = el
                    .attrs
                    .keys()
                    .filter(|name| {
                        let local = name.local.as_ref();
                        local.starts_with("data-") && !keep.contains(&local)
                    })
                    .cloned()
                    .collect();
                for name in to_remove {
                    el.attrs.remove(&name);
                }
            });
        }
    }

    /// Renames `class` to `data-sanitized-class` on every element,
    /// preserving the value as a plain string for downstream debugging
    /// without letting feed content inject classes into our stylesheet.
    pub fn sanitize_class_names(&mut self) {
        let ids = self.select_ids("*");
        for id in ids {
            self.with_element_mut(id, |el| {
                let class_name = qualname("class");
                if let Some(value) = el.attrs.remove(&class_name) {
                    el.attrs.insert(qualname("data-sanitized-class"), value);
                }
            });
        }
    }

    /// Decomposes `script`/`object`/`embed`/`style`/`iframe` tags, then
    /// renames `class`/`style`/`id`/`data-*` (other than `data-src` and
    /// `data-srcset`) to a `data-sanitized-*` form on everything else.
    pub fn sanitize_html_attributes(&mut self) {
        self.remove_selectors(&["script", "object", "embed"]);
        self.remove_selectors(&["style", "iframe"]);

        let ids = self.select_ids("*");
        for id in ids {
            self.with_element_mut(id, |el| {
                for (attr, renamed) in [("class", "data-sanitized-class"), ("style", "data-sanitized-style"), ("id", "data-sanitized-id")] {
                    let name = qualname(attr);
                    if let Some(value) = el.attrs.remove(&name) {
                        el.attrs.insert(qualname(renamed), value);
                    }
                }

                let extra_data: Vec<(QualName, StrTendril)> = el
                    .attrs
                    .iter()
                    .filter(|(name, _)| {
                        let local = name.local.as_ref();
                        local.starts_with("data-")
                            && local != "data-src"
                            && local != "data-srcset"
                            && !local.starts_with("data-sanitized-")
                    })
                    .map(|(n, v)| (n.clone(), v.clone()))
                    .collect();
                for (name, value) in extra_data {
                    el.attrs.remove(&name);
                    let suffix = name.local.as_ref().trim_start_matches("data-");
                    el.attrs.insert(qualname(&format!("data-sanitized-{suffix}")), value);
                }
            });
        }
    }

    /// Strips every attribute that starts with `data-sanitized-` (the
    /// second pass some site adapters run after they've read what they
    /// needed out of the renamed attributes).
    pub fn remove_sanitized_attributes(&mut self) {
        let ids = self.select_ids("*");
        for id in ids {
            self.with_element_mut(id, |el| {
                let to_remove: Vec<QualName> = el
                    .attrs
                    .keys()
                    .filter(|name| name.local.as_ref().starts_with("data-sanitized-"))
                    .cloned()
                    .collect();
                for name in to_remove {
                    el.attrs.remove(&name);
                }
            });
        }
    }

    /// Removes the first `<img>` whose `src`/`data-src`/`data-lazy-src`
    /// matches `image_url` exactly, or (failing that) whose filename or
    /// "responsive base" filename (stripped of `-NxN` suffixes and a
    /// trailing short hash) matches. A no-op for `data:` URIs or an empty
    /// `image_url` — those never identify a single image unambiguously.
    pub fn remove_image_by_url(&mut self, image_url: &str) {
        if image_url.is_empty() || image_url.starts_with("data:") {
            return;
        }
        let image_path = last_path_segment(image_url);
        let image_base = base_filename(&image_path);

        let ids = self.select_ids("img");
        let mut target: Option<NodeId> = None;

        'outer: for id in &ids {
            let Some(node) = self.html.tree.get(*id) else { continue };
            let Some(el) = node.value().as_element() else { continue };
            for attr in ["src", "data-src", "data-lazy-src"] {
                let Some(val) = el.attr(attr) else { continue };
                if val.starts_with("data:") {
                    continue;
                }
                if val == image_url {
                    target = Some(*id);
                    break 'outer;
                }
            }
        }

        if target.is_none() {
            'outer2: for id in &ids {
                let Some(node) = self.html.tree.get(*id) else { continue };
                let Some(el) = node.value().as_element() else { continue };
                for attr in ["src", "data-src", "data-lazy-src"] {
                    let Some(val) = el.attr(attr) else { continue };
                    if val.starts_with("data:") {
                        continue;
                    }
                    let img_path = last_path_segment(val);
                    if img_path == image_path && img_path.len() > 3 && !GENERIC_FILENAMES.contains(&img_path.as_str()) {
                        target = Some(*id);
                        break 'outer2;
                    }
                }
            }
        }

        if target.is_none() {
            'outer3: for id in &ids {
                let Some(node) = self.html.tree.get(*id) else { continue };
                let Some(el) = node.value().as_element() else { continue };
                for attr in ["src", "data-src", "data-lazy-src"] {
                    let Some(val) = el.attr(attr) else { continue };
                    if val.starts_with("data:") {
                        continue;
                    }
                    let img_base = base_filename(&last_path_segment(val));
                    if img_base == image_base && img_base.len() > 3 && !GENERIC_BASENAMES.contains(&img_base.as_str()) {
                        target = Some(*id);
                        break 'outer3;
                    }
                }
            }
        }

        if let Some(id) = target {
            self.decompose(id);
        }
    }
}

static GENERIC_FILENAMES: [&str; 3] = ["image.jpg", "photo.jpg", "pic.jpg"];
static GENERIC_BASENAMES: [&str; 3] = ["image", "photo", "pic"];

fn last_path_segment(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

static RESPONSIVE_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:-\d+x\d+|-\d+)*$").unwrap());
static HASH_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"-[a-zA-Z0-9]{3,6}$").unwrap());

/// `photo-800x600-a1b2c3.jpg` -> `photo`, mirroring how WordPress-style
/// responsive-image pipelines derive variant filenames from a base name.
fn base_filename(filename: &str) -> String {
    let without_ext = filename.rsplit_once('.').map(|(base, _)| base).unwrap_or(filename);
    let without_dims = RESPONSIVE_SUFFIX.replace(without_ext, "");
    let without_hash = HASH_SUFFIX.replace(&without_dims, "");
    without_hash.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_filename_strips_dimensions_and_hash() {
        assert_eq!(base_filename("photo-800x600-a1b2c3.jpg"), "photo");
        assert_eq!(base_filename("photo-800x600.jpg"), "photo");
        assert_eq!(base_filename("photo.jpg"), "photo");
    }

    #[test]
    fn remove_image_by_url_exact_match() {
        let mut doc = HtmlDoc::parse_fragment(
            r#"<p><img src="https://example.com/a.jpg"></p><p><img src="https://example.com/b.jpg"></p>"#,
        );
        doc.remove_image_by_url("https://example.com/a.jpg");
        let out = doc.to_html();
        assert!(!out.contains("a.jpg"));
        assert!(out.contains("b.jpg"));
    }

    #[test]
    fn remove_image_by_url_noop_for_data_uri() {
        let mut doc = HtmlDoc::parse_fragment(r#"<img src="data:image/png;base64,aaaa">"#);
        doc.remove_image_by_url("data:image/png;base64,aaaa");
        assert!(doc.to_html().contains("data:image/png"));
    }
}
