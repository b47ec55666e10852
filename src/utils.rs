use crate::constants::*;
use crate::errors::AppResult;
use crate::logging::{log, LogLevel};
use chrono::{DateTime, Local, Utc};
use scraper::{ElementRef, Html, Node};
use std::path::Path;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// Converts a rich-text fragment into whitespace-normalized plain text.
///
/// Block-level separators (`p`, `br`, `div`) insert a newline immediately
/// before their content; every other tag is stripped, entities are decoded
/// by the parser, and script/style subtrees are dropped. The parser is
/// inert, so arbitrary markup is safe. Total: any input yields a string,
/// empty markup yields "".
pub fn normalize_html(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(html);
    let mut raw = String::new();
    collect_text(fragment.root_element(), &mut raw, 0);
    normalize_whitespace(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String, depth: u32) {
    if depth > MAX_HTML_DEPTH {
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&text.text),

            Node::Element(el) => {
                let tag = el.name().to_lowercase();
                if SKIP_TAGS.contains(tag.as_str()) {
                    continue;
                }

                if BLOCK_PREFIX_TAGS.contains(tag.as_str()) {
                    out.push('\n');
                }

                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out, depth + 1);
                }
            }

            _ => {}
        }
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<&str>>().join(" "))
        .collect::<Vec<String>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Whitespace-delimited token count. split_whitespace yields nothing for
/// empty or all-whitespace input, so the degenerate case counts 0, not 1.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(ts) => ts
            .with_timezone(&Local)
            .format(DATE_FORMAT)
            .to_string(),
        None => MISSING_DATE.to_string(),
    }
}

pub fn clean_filename<S: AsRef<str>>(name: S) -> String {
    let name_ref = name.as_ref().trim();
    let cleaned = FORBIDDEN_CHARS_RE.replace_all(name_ref, "_");
    let cleaned = WHITESPACE_RE.replace_all(&cleaned, "_");
    let cleaned = cleaned.trim_matches('_').to_lowercase();
    if cleaned.is_empty() {
        "discussion".to_string()
    } else {
        cleaned
    }
}

pub fn export_filename(title: &str) -> String {
    format!("discussion_export_{}.txt", clean_filename(title))
}

async fn write_file_async(fpath: &Path, data: &[u8]) -> AppResult<()> {
    if let Some(parent) = fpath.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut file = File::create(fpath).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

pub async fn save_text(fpath: &Path, content: &str) -> AppResult<bool> {
    match write_file_async(fpath, content.as_bytes()).await {
        Ok(_) => Ok(true),
        Err(e) => {
            log(
                LogLevel::Error,
                &format!(
                    "Save FAIL - Write Error: {}. File: '{}'",
                    e,
                    fpath.display()
                ),
            );
            if fs::try_exists(fpath).await.unwrap_or(false) {
                let _ = fs::remove_file(fpath).await;
            }

            Ok(false)
        }
    }
}
