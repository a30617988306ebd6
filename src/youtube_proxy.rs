//! `GET /api/youtube-proxy` (§6): wraps a video id in a minimal HTML page
//! embedding the privacy-respecting `youtube-nocookie.com` player, so a
//! reader client can show video content without the source site's own
//! (frequently tracker-laden, sometimes frame-busting) embed markup.

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct YoutubeProxyQuery {
    v: Option<String>,
    autoplay: Option<String>,
    #[serde(rename = "loop")]
    loop_: Option<String>,
    mute: Option<String>,
    controls: Option<String>,
    rel: Option<String>,
    modestbranding: Option<String>,
    playsinline: Option<String>,
}

fn flag(value: Option<&str>, default: &str) -> &'static str {
    match value.unwrap_or(default) {
        "1" | "true" => "1",
        _ => "0",
    }
}

pub async fn handler(Query(q): Query<YoutubeProxyQuery>) -> Response {
    let Some(video_id) = q.v.filter(|v| !v.is_empty()) else {
        return (StatusCode::BAD_REQUEST, Html("<html><body>Missing required parameter: v</body></html>")).into_response();
    };

    let autoplay = flag(q.autoplay.as_deref(), "0");
    let loop_flag = flag(q.loop_.as_deref(), "0");
    let mute = flag(q.mute.as_deref(), "0");
    let controls = flag(q.controls.as_deref(), "1");
    let rel = flag(q.rel.as_deref(), "0");
    let modestbranding = flag(q.modestbranding.as_deref(), "1");
    let playsinline = flag(q.playsinline.as_deref(), "1");

    let mut params = vec![
        format!("autoplay={autoplay}"),
        format!("mute={mute}"),
        format!("controls={controls}"),
        format!("rel={rel}"),
        format!("modestbranding={modestbranding}"),
        format!("playsinline={playsinline}"),
    ];
    if loop_flag == "1" {
        params.push("loop=1".to_string());
        params.push(format!("playlist={video_id}"));
    }

    let src = format!("https://www.youtube-nocookie.com/embed/{video_id}?{}", params.join("&"));
    let body = format!(
        r#"<!DOCTYPE html><html><head><meta charset="utf-8"><style>html,body,iframe{{margin:0;padding:0;width:100%;height:100%;border:0;}}</style></head><body><iframe src="{src}" allow="accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture" allowfullscreen></iframe></body></html>"#
    );

    // Deliberately no X-Frame-Options: this page exists to be embedded.
    Html(body).into_response()
}

#[cfg(test)]
mod tests {
    use super::flag;

    #[test]
    fn flag_defaults_and_parses_truthy_values() {
        assert_eq!(flag(None, "1"), "1");
        assert_eq!(flag(Some("true"), "0"), "1");
        assert_eq!(flag(Some("0"), "1"), "0");
    }
}
