//! Formatting utilities (bot reply → right-to-left story HTML).

use std::sync::OnceLock;

use regex::Regex;

/// Heading shown above a generated story.
pub const STORY_HEADING: &str = "Claude's Social Story:";

const CONTAINER_STYLE: &str = "text-align: right; direction: rtl; font-family: Arial, sans-serif; \
border: 2px solid #e3e3e3; padding: 20px; border-radius: 10px;";
const HEADING_STYLE: &str = "color: #4a90e2;";
const SECTION_STYLE: &str = "color: #333;";

/// Escape HTML special characters.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*[-•*]\s+(.*)$").expect("valid regex"))
}

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*([^*\n]+)\*").expect("valid regex"))
}

fn italic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(^|[\s(])_([^_\n]+)_").expect("valid regex"))
}

/// Render a bot reply as a styled RTL story block.
///
/// Bulleted lines (`- `, `• `, `* `) become section headings, every other
/// non-blank line a paragraph. Nothing is rejected: odd input comes out as
/// escaped paragraphs.
pub fn format_story(reply: &str, heading: &str) -> String {
    let mut html = format!(
        "<div style='{CONTAINER_STYLE}'><h2 style='{HEADING_STYLE}'>{}</h2>",
        escape_html(heading)
    );

    for line in reply.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match bullet_re().captures(line) {
            Some(caps) => {
                let title = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                html.push_str(&format!(
                    "<h3 style='{SECTION_STYLE}'>{}</h3>",
                    inline_markup(title)
                ));
            }
            None => {
                html.push_str(&format!("<p>{}</p>", inline_markup(line.trim())));
            }
        }
    }

    html.push_str("</div>");
    html
}

/// Escape, then map Slack mrkdwn `*bold*` and `_italic_` spans.
fn inline_markup(text: &str) -> String {
    let escaped = escape_html(text);
    let bold = bold_re().replace_all(&escaped, "<b>$1</b>");
    italic_re()
        .replace_all(&bold, "$1<i>$2</i>")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html() {
        let s = r#"<a href="x&y">"#;
        assert_eq!(escape_html(s), "&lt;a href=&quot;x&amp;y&quot;&gt;");
    }

    #[test]
    fn bullets_become_headings_and_the_rest_paragraphs() {
        let reply = "- Title: הולכים לרופא שיניים\nאני הולך לרופא.\n\n    - Coping sentences: אני יכול לנשום";
        let html = format_story(reply, STORY_HEADING);

        assert!(html.starts_with("<div style='text-align: right; direction: rtl;"));
        assert!(html.contains("<h2 style='color: #4a90e2;'>Claude's Social Story:</h2>"));
        assert!(html.contains("<h3 style='color: #333;'>Title: הולכים לרופא שיניים</h3>"));
        assert!(html.contains("<p>אני הולך לרופא.</p>"));
        assert!(html.contains("<h3 style='color: #333;'>Coping sentences: אני יכול לנשום</h3>"));
        assert!(!html.contains("<p></p>"));
        assert!(html.ends_with("</div>"));
    }

    #[test]
    fn reply_markup_is_escaped() {
        let html = format_story("<script>alert(1)</script>", "h");
        assert!(html.contains("<p>&lt;script&gt;alert(1)&lt;/script&gt;</p>"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn maps_slack_emphasis() {
        let html = format_story("This is *important* and _gentle_.", "h");
        assert!(html.contains("<p>This is <b>important</b> and <i>gentle</i>.</p>"));
    }

    #[test]
    fn snake_case_words_are_not_italicised() {
        let html = format_story("file_name_here", "h");
        assert!(html.contains("<p>file_name_here</p>"));
    }

    #[test]
    fn empty_reply_renders_only_the_frame() {
        let html = format_story("", "h");
        assert_eq!(
            html,
            format!("<div style='{CONTAINER_STYLE}'><h2 style='{HEADING_STYLE}'>h</h2></div>")
        );
    }
}
