//! Renders Reddit post/comment bodies to sanitized HTML. Reddit's markdown
//! dialect layers a handful of extensions (superscript, strikethrough,
//! spoiler tags, Giphy shortcodes, bare `preview.redd.it` links) on top of
//! CommonMark; this runs those extension passes as regex rewrites before
//! handing off to `pulldown-cmark`, then auto-links any remaining bare URLs
//! and forces every `<a>` to open in a new tab.

use once_cell::sync::Lazy;
use pulldown_cmark::{html, Options, Parser};
use regex::Regex;

const MAX_TEXT_LENGTH: usize = 100_000;

static PREVIEW_BARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?P<url>https?://preview\.redd\.it/\S+)").unwrap());
static PREVIEW_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(?P<alt>[^\]]*)\]\((?P<url>https?://preview\.redd\.it/[^)]+)\)").unwrap());
static GIPHY_MD: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[(?P<alt>[^\]]*)\]\(giphy\|(?P<id>[A-Za-z0-9]+)\)").unwrap());
static GIPHY_IMG_SRC: Lazy<Regex> = Lazy::new(|| Regex::new(r#"src="giphy\|([A-Za-z0-9]+)""#).unwrap());
static GIPHY_BARE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|\s)giphy\|([A-Za-z0-9]+)").unwrap());
static SUP_PAREN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\^\(([^)]+)\)").unwrap());
static SUP_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\^(\S+)").unwrap());
static STRIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"~~([^~]+)~~").unwrap());
static SPOILER: Lazy<Regex> = Lazy::new(|| Regex::new(r">!([^!]+)!<").unwrap());
static BARE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(https?://[^\s<"]+)"#).unwrap());

pub fn convert_reddit_markdown(text: &str) -> String {
    let mut text = text.to_string();
    if text.len() > MAX_TEXT_LENGTH {
        text.truncate(MAX_TEXT_LENGTH);
    }

    text = PREVIEW_LINK
        .replace_all(&text, |c: &regex::Captures| {
            format!("<img src=\"{}\" alt=\"{}\">", &c["url"], &c["alt"])
        })
        .into_owned();
    text = PREVIEW_BARE
        .replace_all(&text, |c: &regex::Captures| format!("<img src=\"{}\" alt=\"\">", &c["url"]))
        .into_owned();

    text = GIPHY_MD
        .replace_all(&text, |c: &regex::Captures| {
            format!("<img src=\"https://i.giphy.com/{}.gif\" alt=\"{}\">", &c["id"], &c["alt"])
        })
        .into_owned();
    text = GIPHY_IMG_SRC
        .replace_all(&text, |c: &regex::Captures| format!("src=\"https://i.giphy.com/{}.gif\"", &c[1]))
        .into_owned();
    text = GIPHY_BARE
        .replace_all(&text, |c: &regex::Captures| format!(" <img src=\"https://i.giphy.com/{}.gif\" alt=\"\">", &c[1]))
        .into_owned();

    text = SUP_PAREN.replace_all(&text, "<sup>$1</sup>").into_owned();
    text = SUP_WORD.replace_all(&text, "<sup>$1</sup>").into_owned();
    text = STRIKE.replace_all(&text, "<del>$1</del>").into_owned();
    text = SPOILER
        .replace_all(&text, "<span class=\"spoiler\" style=\"background:#000;color:#000;\">$1</span>")
        .into_owned();

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(&text, options);
    let mut rendered = String::new();
    html::push_html(&mut rendered, parser);

    linkify_html(&rendered)
}

/// Wraps bare URLs in `<a>` tags (skipping text already inside one), then
/// forces `target="_blank" rel="noopener"` onto every `<a>` — including
/// ones `pulldown-cmark` already produced from `[text](url)` syntax.
fn linkify_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut depth_in_anchor = 0usize;
    let mut i = 0;
    let bytes = html.as_bytes();

    while i < bytes.len() {
        if html[i..].starts_with("<a ") || html[i..].starts_with("<a>") {
            depth_in_anchor += 1;
            let end = html[i..].find('>').map(|p| i + p + 1).unwrap_or(html.len());
            out.push_str(&force_anchor_attrs(&html[i..end]));
            i = end;
            continue;
        }
        if html[i..].starts_with("</a>") {
            depth_in_anchor = depth_in_anchor.saturating_sub(1);
            out.push_str("</a>");
            i += 4;
            continue;
        }
        if depth_in_anchor == 0 {
            if let Some(m) = BARE_URL.find(&html[i..]) {
                if m.start() == 0 {
                    let raw = m.as_str();
                    let trimmed = raw.trim_end_matches(|c: char| ".,!?;:)".contains(c));
                    out.push_str(&format!(
                        "<a href=\"{trimmed}\" target=\"_blank\" rel=\"noopener\">{trimmed}</a>"
                    ));
                    i += trimmed.len();
                    continue;
                }
            }
        }
        let ch_len = next_char_len(&html[i..]);
        out.push_str(&html[i..i + ch_len]);
        i += ch_len;
    }

    out
}

fn next_char_len(s: &str) -> usize {
    s.chars().next().map(|c| c.len_utf8()).unwrap_or(1)
}

fn force_anchor_attrs(tag: &str) -> String {
    if tag.contains("target=") {
        return tag.to_string();
    }
    if let Some(stripped) = tag.strip_suffix('>') {
        format!("{stripped} target=\"_blank\" rel=\"noopener\">")
    } else {
        tag.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_superscript_and_strikethrough() {
        let out = convert_reddit_markdown("normal ^word and ~~gone~~");
        assert!(out.contains("<sup>word</sup>"));
        assert!(out.contains("<del>gone</del>"));
    }

    #[test]
    fn renders_spoiler_tags() {
        let out = convert_reddit_markdown(">!secret!<");
        assert!(out.contains("class=\"spoiler\""));
    }

    #[test]
    fn auto_links_bare_urls_and_forces_target_blank() {
        let out = convert_reddit_markdown("see https://example.com/a for details");
        assert!(out.contains("target=\"_blank\""));
        assert!(out.contains("rel=\"noopener\""));
    }

    #[test]
    fn markdown_links_also_get_target_blank() {
        let out = convert_reddit_markdown("[text](https://example.com)");
        assert!(out.contains("target=\"_blank\""));
    }
}
