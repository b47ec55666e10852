use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use std::collections::HashSet;

pub const HTTP_TIMEOUT_SECONDS: u64 = 30;
pub const HTTP_CONNECT_TIMEOUT: u64 = 15;
pub const MAX_RETRIES: u32 = 3;
pub const MAX_HTML_DEPTH: u32 = 250;

/// Display name used when a poster's id is absent from the participant list.
pub const UNKNOWN_USER: &str = "Unknown User";

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const MISSING_DATE: &str = "unknown date";

// Formatting geometry. Column widths are cosmetic; long names simply
// overflow their column rather than being truncated.
pub const INDENT_UNIT: &str = "    ";
pub const THREAD_RAIL: &str = "│   ";
pub const THREAD_ELBOW: &str = "└── ";
pub const AUTHOR_COL_WIDTH: usize = 30;
pub const DATE_COL_WIDTH: usize = 50;
pub const SECTION_RULE_WIDTH: usize = 60;
pub const HEADER_RULE_WIDTH: usize = 70;
pub const SUMMARY_RULE_WIDTH: usize = 55;
pub const SUMMARY_NAME_WIDTH: usize = 25;
pub const SUMMARY_POSTS_WIDTH: usize = 8;

pub const POST_BOX_TOP: &str = "┌──────────────────────────────────────────────────────────┐";
pub const POST_BOX_BOTTOM: &str = "└──────────────────────────────────────────────────────────┘";

pub fn topic_endpoint(base_url: &str, course_id: i64, topic_id: i64) -> String {
    format!(
        "{}/api/v1/courses/{}/discussion_topics/{}",
        base_url.trim_end_matches('/'),
        course_id,
        topic_id
    )
}

pub fn view_endpoint(base_url: &str, course_id: i64, topic_id: i64) -> String {
    format!(
        "{}/api/v1/courses/{}/discussion_topics/{}/view?include_new_entries=1",
        base_url.trim_end_matches('/'),
        course_id,
        topic_id
    )
}

pub static BASE_HEADERS: Lazy<HeaderMap> = Lazy::new(|| {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers
});

/// Tags whose content is preceded by a newline in the normalized text.
pub static BLOCK_PREFIX_TAGS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["p", "br", "div"]));

/// Tags whose subtrees contribute no text at all.
pub static SKIP_TAGS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["script", "style", "head", "template"]));

pub static FORBIDDEN_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f\x7f]"#).unwrap());
pub static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_]+").unwrap());
