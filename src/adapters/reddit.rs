use super::AdapterServices;
use crate::error::{AggregatorError, Result};
use crate::http_client::HttpClient;
use crate::markdown::convert_reddit_markdown;
use crate::pipeline::types::{FeedContext, RawArticle};
use crate::pipeline::{default_filter_articles, Aggregator};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

const REDDIT_API_BASE: &str = "https://www.reddit.com";
const DEFAULT_COMMENT_LIMIT: usize = 10;

static SUBREDDIT_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:reddit\.com)?/?r/(\w+)").unwrap());

pub fn normalize_subreddit(identifier: &str) -> String {
    if let Some(c) = SUBREDDIT_PREFIX.captures(identifier) {
        return c[1].to_string();
    }
    identifier.trim_start_matches("r/").trim_start_matches('/').to_string()
}

fn decode_entities(url: &str) -> String {
    url.replace("&amp;", "&").replace("&lt;", "<").replace("&gt;", ">").replace("&quot;", "\"").replace("&#39;", "'")
}

fn fix_media_url(url: &str) -> String {
    let decoded = decode_entities(url);
    if decoded.contains("styles.redditmedia.com") || decoded.contains("external-preview.redd.it") {
        decoded.replace("&amp;", "&")
    } else {
        decoded
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

fn is_bot_author(author: &str) -> bool {
    let lower = author.to_lowercase();
    lower.ends_with("_bot") || lower.ends_with("-bot") || lower == "automoderator"
}

struct RedditComment {
    author: String,
    body: String,
    score: i64,
    permalink: String,
}

fn format_comment_html(comment: &RedditComment) -> String {
    format!(
        "<blockquote><p><strong>{}</strong> | <a href=\"https://reddit.com{}\" target=\"_blank\" rel=\"noopener\">source</a></p><div>{}</div></blockquote>",
        escape_html(&comment.author),
        comment.permalink,
        convert_reddit_markdown(&comment.body),
    )
}

/// Keeps only real, non-deleted, non-bot top-level comments, sorted by score
/// descending, capped at `limit`.
fn parse_comments(children: &[Value], limit: usize) -> Vec<RedditComment> {
    let mut comments: Vec<RedditComment> = children
        .iter()
        .filter_map(|child| child.get("data"))
        .filter_map(|data| {
            let body = data.get("body").and_then(Value::as_str)?;
            if body.is_empty() || body == "[deleted]" || body == "[removed]" {
                return None;
            }
            let author = data.get("author").and_then(Value::as_str).unwrap_or_default().to_string();
            if author.is_empty() || is_bot_author(&author) {
                return None;
            }
            Some(RedditComment {
                author,
                body: body.to_string(),
                score: data.get("score").and_then(Value::as_i64).unwrap_or(0),
                permalink: data.get("permalink").and_then(Value::as_str).unwrap_or_default().to_string(),
            })
        })
        .collect();

    comments.sort_by(|a, b| b.score.cmp(&a.score));
    comments.truncate(limit);
    comments
}

/// Fetches top-level comments for a post from the public (no-auth) comments
/// JSON endpoint. A 4xx response comes back from `HttpClient::get_text` as
/// an already-skippable error, which we propagate so the caller drops the
/// whole article; any other failure (bad JSON, timeout after retries) is
/// logged and treated as "no comments" rather than failing the post.
async fn fetch_post_comments(http: &HttpClient, subreddit: &str, post_id: &str, limit: usize) -> Result<Vec<RedditComment>> {
    let fetch_limit = (limit * 2).max(20);
    let url = format!("{REDDIT_API_BASE}/r/{subreddit}/comments/{post_id}.json?sort=best&limit={fetch_limit}");

    let body = match http.get_text(&url, None).await {
        Ok(body) => body,
        Err(e) if e.is_skippable() => return Err(e),
        Err(e) => {
            warn!(subreddit, post_id, error = %e, "failed to fetch reddit comments, continuing without them");
            return Ok(Vec::new());
        }
    };

    let json: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(subreddit, post_id, error = %e, "invalid reddit comments json");
            return Ok(Vec::new());
        }
    };

    let Some(children) = json
        .as_array()
        .and_then(|a| a.get(1))
        .and_then(|c| c.pointer("/data/children"))
        .and_then(Value::as_array)
    else {
        return Ok(Vec::new());
    };

    Ok(parse_comments(children, limit))
}

fn comments_section_html(permalink: &str, comments: &[RedditComment]) -> String {
    let mut section = format!("<h3><a href=\"{permalink}\" target=\"_blank\" rel=\"noopener\">Comments</a></h3>");
    if comments.is_empty() {
        section.push_str("<p><em>No comments yet.</em></p>");
    } else {
        for comment in comments {
            section.push_str(&format_comment_html(comment));
        }
    }
    format!("<section>{section}</section>")
}

/// Renders a gallery post's images in display order. Animated items prefer
/// the GIF/MP4 source over a static frame.
fn gallery_media_html(post: &Value) -> Vec<String> {
    let is_gallery = post.get("is_gallery").and_then(Value::as_bool).unwrap_or(false);
    if !is_gallery {
        return Vec::new();
    }
    let Some(media_metadata) = post.get("media_metadata").and_then(Value::as_object) else {
        return Vec::new();
    };
    let Some(items) = post.pointer("/gallery_data/items").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for item in items {
        let Some(media_id) = item.get("media_id").and_then(Value::as_str) else { continue };
        let Some(info) = media_metadata.get(media_id) else { continue };
        let kind = info.get("e").and_then(Value::as_str).unwrap_or_default();
        let is_animated = kind == "AnimatedImage";
        let media_url = if is_animated {
            info.pointer("/s/gif").or_else(|| info.pointer("/s/mp4")).and_then(Value::as_str)
        } else if kind == "Image" {
            info.pointer("/s/u").and_then(Value::as_str)
        } else {
            None
        };
        let Some(media_url) = media_url else { continue };

        let fixed = fix_media_url(media_url);
        let caption = item.get("caption").and_then(Value::as_str).unwrap_or_default();
        let alt = if !caption.is_empty() {
            escape_html(caption)
        } else if is_animated {
            "Animated GIF".to_string()
        } else {
            "Gallery image".to_string()
        };

        if !caption.is_empty() {
            out.push(format!("<figure><img src=\"{fixed}\" alt=\"{alt}\"><figcaption>{alt}</figcaption></figure>"));
        } else {
            out.push(format!("<p><img src=\"{fixed}\" alt=\"{alt}\"></p>"));
        }
    }
    out
}

enum LinkMedia {
    Html(String),
    /// Handled, but deliberately rendered nowhere in the body (surfaced via
    /// the header element instead).
    Silent,
    Unhandled,
}

fn classify_link_media(url: &str) -> LinkMedia {
    let lower = url.to_lowercase();

    if lower.ends_with(".gif") || lower.ends_with(".gifv") {
        let gif_url = if lower.ends_with(".gifv") { &url[..url.len() - 1] } else { url };
        return LinkMedia::Html(format!("<p><img src=\"{}\" alt=\"Animated GIF\"></p>", fix_media_url(gif_url)));
    }

    let is_image = [".jpg", ".jpeg", ".png", ".webp"].iter().any(|ext| lower.contains(ext)) || lower.contains("i.redd.it");
    if is_image {
        let fixed = fix_media_url(url);
        return LinkMedia::Html(format!(
            "<p><a href=\"{fixed}\" target=\"_blank\" rel=\"noopener\">{}</a></p>",
            escape_html(&fixed)
        ));
    }

    if lower.contains("v.redd.it") {
        return LinkMedia::Silent;
    }

    if lower.contains("youtube.com") || lower.contains("youtu.be") {
        return LinkMedia::Html(format!(
            "<p><a href=\"{url}\" target=\"_blank\" rel=\"noopener\">\u{25b6} View Video on YouTube</a></p>"
        ));
    }

    if lower.contains("twitter.com") || lower.contains("x.com") {
        return LinkMedia::Html(format!(
            "<p><a href=\"{url}\" target=\"_blank\" rel=\"noopener\">View on X/Twitter</a></p>"
        ));
    }

    LinkMedia::Unhandled
}

fn link_media_html(post: &Value, is_cross_post: bool) -> Option<String> {
    let is_gallery = post.get("is_gallery").and_then(Value::as_bool).unwrap_or(false);
    if is_gallery {
        return None;
    }
    let raw_url = post.get("url").and_then(Value::as_str)?;
    let url = decode_entities(raw_url);
    let is_self = post.get("is_self").and_then(Value::as_bool).unwrap_or(false);

    match classify_link_media(&url) {
        LinkMedia::Html(html) => Some(html),
        LinkMedia::Silent => None,
        LinkMedia::Unhandled if !is_cross_post && !is_self => Some(format!(
            "<p><a href=\"{url}\" target=\"_blank\" rel=\"noopener\">{}</a></p>",
            escape_html(&url)
        )),
        LinkMedia::Unhandled => None,
    }
}

/// Unwraps a cross-post to the original post's data so selftext/gallery/link
/// rendering reflects what was actually posted, not an empty cross-post
/// shell. Returns `(effective_post, is_cross_post, subreddit_for_comments)`.
fn resolve_original<'a>(post: &'a Value, subreddit: &str) -> (&'a Value, bool, String) {
    if let Some(original) = post.get("crosspost_parent_list").and_then(Value::as_array).and_then(|a| a.first()) {
        let original_subreddit = original.get("subreddit").and_then(Value::as_str).unwrap_or(subreddit).to_string();
        return (original, true, original_subreddit);
    }
    (post, false, subreddit.to_string())
}

/// Pulls a subreddit's newest posts from the public JSON listing endpoint
/// (no OAuth token required — the same endpoint the header-element
/// strategy uses to fetch community icons). Self posts are rendered
/// through the Reddit markdown dialect; link posts get gallery/link media
/// plus a header element; every kept post gets a top-comments section.
pub struct RedditAggregator {
    services: AdapterServices,
}

impl RedditAggregator {
    pub fn new(services: AdapterServices) -> Self {
        RedditAggregator { services }
    }
}

#[async_trait]
impl Aggregator for RedditAggregator {
    fn aggregator_type(&self) -> &'static str {
        "reddit"
    }

    fn get_source_url(&self, ctx: &FeedContext) -> String {
        format!("https://reddit.com/r/{}", normalize_subreddit(&ctx.identifier))
    }

    /// Drops AutoModerator posts before the default age/jitter filter runs.
    fn filter_articles(&self, _ctx: &FeedContext, articles: Vec<RawArticle>) -> Vec<RawArticle> {
        let kept: Vec<RawArticle> =
            articles.into_iter().filter(|a| a.author.as_deref() != Some("AutoModerator")).collect();
        default_filter_articles(kept)
    }

    async fn fetch_source_data(&self, ctx: &FeedContext) -> Result<String> {
        let subreddit = normalize_subreddit(&ctx.identifier);
        // Over-fetch 2-3x to survive AutoModerator/age filtering downstream.
        let fetch_limit = (ctx.daily_limit.max(1) * 3).min(100);
        let url = format!("{REDDIT_API_BASE}/r/{subreddit}/new.json?limit={fetch_limit}");
        self.services.http.get_text(&url, None).await
    }

    async fn parse_to_raw_articles(&self, ctx: &FeedContext, source_data: &str, limit: usize) -> Result<Vec<RawArticle>> {
        let subreddit = normalize_subreddit(&ctx.identifier);
        let comment_limit =
            ctx.options.get("comment_limit").and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_COMMENT_LIMIT);

        let json: Value = serde_json::from_str(source_data)
            .map_err(|e| AggregatorError::Other(format!("invalid reddit listing json: {e}")))?;
        let Some(children) = json.pointer("/data/children").and_then(Value::as_array) else {
            return Ok(Vec::new());
        };

        let mut articles = Vec::new();
        for child in children {
            if articles.len() >= limit {
                break;
            }
            let Some(post) = child.get("data") else { continue };
            let (effective, is_cross_post, comment_subreddit) = resolve_original(post, &subreddit);

            let title = effective.get("title").and_then(Value::as_str).unwrap_or("Untitled").to_string();
            let permalink = decode_entities(effective.get("permalink").and_then(Value::as_str).unwrap_or_default());
            let identifier = format!("https://reddit.com{permalink}");
            let created = effective.get("created_utc").and_then(Value::as_f64).unwrap_or(0.0);
            let published_at = chrono::DateTime::from_timestamp(created as i64, 0).unwrap_or_else(chrono::Utc::now);
            let author = effective.get("author").and_then(Value::as_str).map(str::to_string);
            let is_self = effective.get("is_self").and_then(Value::as_bool).unwrap_or(false);
            let post_id = effective.get("id").and_then(Value::as_str).unwrap_or_default().to_string();

            let mut article = RawArticle::new(identifier.clone(), title, published_at);
            article.author = author;

            let mut body = String::new();

            let selftext = effective.get("selftext").and_then(Value::as_str).unwrap_or_default();
            if !selftext.is_empty() {
                body.push_str(&format!("<div>{}</div>", convert_reddit_markdown(selftext)));
            }

            for gallery_item in gallery_media_html(effective) {
                body.push_str(&gallery_item);
            }

            if let Some(link_html) = link_media_html(effective, is_cross_post) {
                body.push_str(&link_html);
            }

            if !is_self {
                let link_url = effective.get("url").and_then(Value::as_str).unwrap_or(&identifier).to_string();
                match self.services.headers.extract(&link_url).await {
                    Ok(Some(header)) => article.icon = Some(header.html),
                    Ok(None) => {}
                    Err(e) if e.is_skippable() => {
                        warn!(url = %link_url, error = %e, "skipping reddit post, header extraction failed");
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }

            let comments = if post_id.is_empty() {
                Vec::new()
            } else {
                match fetch_post_comments(&self.services.http, &comment_subreddit, &post_id, comment_limit).await {
                    Ok(comments) => comments,
                    Err(e) => {
                        warn!(url = %identifier, error = %e, "skipping reddit post, comments fetch failed");
                        continue;
                    }
                }
            };
            body.push_str(&comments_section_html(&identifier, &comments));

            article.content = Some(body);
            articles.push(article);
        }

        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_subreddit_names() {
        assert_eq!(normalize_subreddit("rust"), "rust");
        assert_eq!(normalize_subreddit("r/rust"), "rust");
        assert_eq!(normalize_subreddit("https://reddit.com/r/rust"), "rust");
    }

    #[test]
    fn filters_bot_and_deleted_comments_and_sorts_by_score() {
        let children = serde_json::json!([
            {"data": {"author": "alice", "body": "good point", "score": 5, "permalink": "/a"}},
            {"data": {"author": "some_bot", "body": "spam", "score": 100, "permalink": "/b"}},
            {"data": {"author": "AutoModerator", "body": "rules", "score": 1, "permalink": "/c"}},
            {"data": {"author": "bob", "body": "[deleted]", "score": 50, "permalink": "/d"}},
            {"data": {"author": "carol", "body": "even better", "score": 20, "permalink": "/e"}},
        ]);
        let comments = parse_comments(children.as_array().unwrap(), 10);
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].author, "carol");
        assert_eq!(comments[1].author, "alice");
    }

    #[test]
    fn caps_comments_at_limit() {
        let children: Vec<Value> = (0..5)
            .map(|i| serde_json::json!({"data": {"author": format!("u{i}"), "body": "hi", "score": i, "permalink": "/x"}}))
            .collect();
        let comments = parse_comments(&children, 2);
        assert_eq!(comments.len(), 2);
    }

    #[test]
    fn classifies_link_media_by_url_shape() {
        assert!(matches!(classify_link_media("https://i.redd.it/abc.jpg"), LinkMedia::Html(_)));
        assert!(matches!(classify_link_media("https://v.redd.it/abc"), LinkMedia::Silent));
        assert!(matches!(classify_link_media("https://example.com/page"), LinkMedia::Unhandled));
    }

    #[test]
    fn unwraps_cross_posts_to_original() {
        let post = serde_json::json!({
            "id": "xp1",
            "crosspost_parent_list": [{"id": "orig1", "subreddit": "originalsub", "title": "Original"}]
        });
        let (effective, is_cross_post, subreddit) = resolve_original(&post, "hostsub");
        assert!(is_cross_post);
        assert_eq!(subreddit, "originalsub");
        assert_eq!(effective.get("id").and_then(Value::as_str), Some("orig1"));
    }
}
