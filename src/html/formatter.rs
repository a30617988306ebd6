//! Assembles the final article HTML body from its parts: an optional
//! header image, the cleaned content, an optional comments section, and a
//! footer linking back to the source. Every site adapter funnels its
//! output through this single function so the GReader stream items all
//! share the same shape regardless of which aggregator produced them.

pub struct FormatOptions<'a> {
    pub title: &'a str,
    pub url: &'a str,
    pub header_image_url: Option<&'a str>,
    pub comments_html: Option<&'a str>,
}

pub fn format_article_content(body_html: &str, opts: &FormatOptions<'_>) -> String {
    let mut out = String::new();

    if let Some(image) = opts.header_image_url {
        out.push_str(&format!(
            "<p><img src=\"{}\" alt=\"{}\" style=\"max-width:100%;height:auto;\"></p>\n",
            escape_attr(image),
            escape_attr(opts.title)
        ));
    }

    out.push_str(body_html);

    if let Some(comments) = opts.comments_html {
        if !comments.trim().is_empty() {
            out.push_str("\n<h4>Comments</h4>\n");
            out.push_str(comments);
        }
    }

    out.push_str(&format!(
        "\n<p><a href=\"{}\" target=\"_blank\" rel=\"noopener\">Read the original article</a></p>",
        escape_attr(opts.url)
    ));

    out
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_body_with_header_and_footer() {
        let out = format_article_content(
            "<p>body</p>",
            &FormatOptions { title: "Title", url: "https://example.com/a", header_image_url: Some("https://example.com/i.jpg"), comments_html: None },
        );
        assert!(out.contains("<img src=\"https://example.com/i.jpg\""));
        assert!(out.contains("<p>body</p>"));
        assert!(out.contains("Read the original article"));
    }
}
