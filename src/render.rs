use crate::constants::*;
use crate::data_structures::{DiscussionEntry, UserId, UserStats};
use crate::utils::{format_timestamp, normalize_html, word_count};
use chrono::Local;
use std::collections::HashMap;

/// Renders one level of the reply tree and everything below it, updating
/// the shared statistics accumulator as a side effect of the walk.
///
/// Depth 0 entries get a boxed header block; replies get a thread-connector
/// header indented one unit per level. Replies are emitted directly after
/// their parent (pre-order), in their original order.
pub fn render_entries(
    entries: &[DiscussionEntry],
    participants: &HashMap<UserId, String>,
    stats: &mut UserStats,
    depth: usize,
) -> String {
    let mut text = String::new();
    let indent = INDENT_UNIT.repeat(depth);
    let thread_line = if depth > 0 {
        format!("{}{}", THREAD_RAIL.repeat(depth - 1), THREAD_ELBOW)
    } else {
        String::new()
    };

    for entry in entries {
        let author = entry
            .user_id
            .and_then(|id| participants.get(&id))
            .cloned()
            .unwrap_or_else(|| UNKNOWN_USER.to_string());
        let date = format_timestamp(entry.created_at);
        let message = normalize_html(entry.message.as_deref().unwrap_or_default());
        let words = word_count(&message);

        stats.record(&author, words);

        // Body newlines pick up the indent, plus the vertical rails when
        // we are inside the reply gutter.
        let continuation = if depth > 0 {
            format!("\n{}{}", indent, THREAD_RAIL.repeat(depth))
        } else {
            "\n".to_string()
        };
        let formatted_msg = message.replace('\n', &continuation);

        if depth == 0 {
            text.push_str(POST_BOX_TOP);
            text.push('\n');
            text.push_str(&format!(
                "│ FROM: {:<width$} [{} words]\n",
                author,
                words,
                width = AUTHOR_COL_WIDTH
            ));
            text.push_str(&format!(
                "│ DATE: {:<width$} │\n",
                date,
                width = DATE_COL_WIDTH
            ));
            text.push_str(POST_BOX_BOTTOM);
            text.push('\n');
            text.push_str(&formatted_msg);
            text.push('\n');
            text.push_str(&format!("\n{}\n\n", "=".repeat(SECTION_RULE_WIDTH)));
        } else {
            text.push_str(&format!(
                "{}REPLY FROM: {} ({}) [{} words]\n",
                thread_line, author, date, words
            ));
            text.push_str(&format!("{}│\n", indent));
            text.push_str(&format!("{}└─ {}\n", indent, formatted_msg));
            text.push_str(&format!("{}\n", indent));
        }

        if !entry.replies.is_empty() {
            text.push_str(&render_entries(
                &entry.replies,
                participants,
                stats,
                depth + 1,
            ));
        }
    }

    text
}

/// Participation table: one row per author, most words first, ties in
/// first-appearance order.
pub fn render_summary(stats: &UserStats) -> String {
    let rule = "=".repeat(SUMMARY_RULE_WIDTH);
    let mut text = format!("\n\n{}\n   PARTICIPATION SUMMARY\n{}\n", rule, rule);
    text.push_str(&format!(
        "{:<name_w$} | {:<posts_w$} | TOTAL WORDS\n",
        "USER",
        "POSTS",
        name_w = SUMMARY_NAME_WIDTH,
        posts_w = SUMMARY_POSTS_WIDTH
    ));
    text.push_str(&format!("{}\n", "-".repeat(SUMMARY_RULE_WIDTH)));

    for (name, tally) in stats.ranked() {
        text.push_str(&format!(
            "{:<name_w$} | {:<posts_w$} | {} words\n",
            name,
            tally.posts,
            tally.words,
            name_w = SUMMARY_NAME_WIDTH,
            posts_w = SUMMARY_POSTS_WIDTH
        ));
    }

    text.push_str(&rule);
    text.push('\n');
    text
}

/// Assembles the full export: header block, formatted thread (or a
/// fallback line when the thread is empty), and the participation summary.
pub fn render_document(
    title: &str,
    url: &str,
    view: &[DiscussionEntry],
    participants: &HashMap<UserId, String>,
) -> (String, UserStats) {
    let mut stats = UserStats::default();

    let mut content = format!("\n  DISCUSSION EXPORT: {}\n", title.to_uppercase());
    content.push_str(&format!("  URL: {}\n", url));
    content.push_str(&format!(
        "  EXPORTED ON: {}\n",
        Local::now().format(DATE_FORMAT)
    ));
    content.push_str(&format!("{}\n\n", "#".repeat(HEADER_RULE_WIDTH)));

    if view.is_empty() {
        content.push_str("No posts found.");
    } else {
        content.push_str(&render_entries(view, participants, &mut stats, 0));
    }

    content.push_str(&render_summary(&stats));
    (content, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::UserTally;
    use chrono::{TimeZone, Utc};

    fn entry(user_id: Option<UserId>, message: &str, replies: Vec<DiscussionEntry>) -> DiscussionEntry {
        DiscussionEntry {
            user_id,
            created_at: Utc.with_ymd_and_hms(2026, 2, 4, 10, 30, 0).single(),
            message: if message.is_empty() {
                None
            } else {
                Some(message.to_string())
            },
            replies,
        }
    }

    fn directory(pairs: &[(UserId, &str)]) -> HashMap<UserId, String> {
        pairs
            .iter()
            .map(|(id, name)| (*id, name.to_string()))
            .collect()
    }

    fn count_entries(entries: &[DiscussionEntry]) -> usize {
        entries
            .iter()
            .map(|e| 1 + count_entries(&e.replies))
            .sum()
    }

    #[test]
    fn single_root_post() {
        let posts = vec![entry(Some(1), "<p>Hello world</p>", vec![])];
        let dir = directory(&[(1, "Alice")]);
        let mut stats = UserStats::default();
        let text = render_entries(&posts, &dir, &mut stats, 0);

        assert!(text.contains("FROM: Alice"));
        assert!(text.contains("[2 words]"));
        assert!(text.contains("Hello world"));
        assert!(text.starts_with(POST_BOX_TOP));
        assert_eq!(stats.get("Alice"), Some(UserTally { posts: 1, words: 2 }));
    }

    #[test]
    fn empty_root_with_reply() {
        let posts = vec![entry(
            Some(1),
            "",
            vec![entry(Some(2), "<p>Hi</p>", vec![])],
        )];
        let dir = directory(&[(1, "Alice"), (2, "Bob")]);
        let mut stats = UserStats::default();
        let text = render_entries(&posts, &dir, &mut stats, 0);

        assert!(text.contains("└── REPLY FROM: Bob"));
        assert!(text.contains("[1 words]"));
        assert_eq!(stats.get("Alice"), Some(UserTally { posts: 1, words: 0 }));
        assert_eq!(stats.get("Bob"), Some(UserTally { posts: 1, words: 1 }));
    }

    #[test]
    fn unresolved_authors_pool_under_sentinel() {
        let posts = vec![
            entry(Some(99), "<p>first orphan</p>", vec![]),
            entry(None, "<p>second orphan post</p>", vec![]),
        ];
        let dir = directory(&[(1, "Alice")]);
        let mut stats = UserStats::default();
        let text = render_entries(&posts, &dir, &mut stats, 0);

        assert!(text.contains("FROM: Unknown User"));
        assert_eq!(stats.len(), 1);
        assert_eq!(
            stats.get(UNKNOWN_USER),
            Some(UserTally { posts: 2, words: 5 })
        );
    }

    #[test]
    fn empty_body_counts_zero_words() {
        let posts = vec![entry(Some(1), "", vec![])];
        let dir = directory(&[(1, "Alice")]);
        let mut stats = UserStats::default();
        let text = render_entries(&posts, &dir, &mut stats, 0);

        assert!(text.contains("[0 words]"));
        assert_eq!(stats.get("Alice"), Some(UserTally { posts: 1, words: 0 }));
    }

    #[test]
    fn deep_nesting_indents_per_level() {
        let posts = vec![entry(
            Some(1),
            "<p>root</p>",
            vec![entry(
                Some(2),
                "<p>level one</p>",
                vec![entry(Some(3), "<p>level two</p>", vec![])],
            )],
        )];
        let dir = directory(&[(1, "A"), (2, "B"), (3, "C")]);
        let mut stats = UserStats::default();
        let text = render_entries(&posts, &dir, &mut stats, 0);

        assert!(text.contains("└── REPLY FROM: B"));
        assert!(text.contains("│   └── REPLY FROM: C"));
        assert!(text.contains(&format!("{}└─ level two", INDENT_UNIT.repeat(2))));
    }

    #[test]
    fn output_follows_pre_order() {
        let posts = vec![
            entry(
                Some(1),
                "<p>alpha</p>",
                vec![
                    entry(Some(2), "<p>beta</p>", vec![entry(Some(3), "<p>gamma</p>", vec![])]),
                    entry(Some(4), "<p>delta</p>", vec![]),
                ],
            ),
            entry(Some(5), "<p>epsilon</p>", vec![]),
        ];
        let dir = directory(&[(1, "P1"), (2, "P2"), (3, "P3"), (4, "P4"), (5, "P5")]);
        let mut stats = UserStats::default();
        let text = render_entries(&posts, &dir, &mut stats, 0);

        let positions: Vec<usize> = ["P1", "P2", "P3", "P4", "P5"]
            .iter()
            .map(|name| text.find(&format!("FROM: {}", name)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn every_entry_counted_exactly_once() {
        let posts = vec![
            entry(
                Some(1),
                "<p>one two three</p>",
                vec![
                    entry(Some(2), "<p>four</p>", vec![]),
                    entry(Some(1), "", vec![entry(None, "<p>five six</p>", vec![])]),
                ],
            ),
            entry(Some(2), "<p>seven eight nine ten</p>", vec![]),
        ];
        let dir = directory(&[(1, "Alice"), (2, "Bob")]);
        let mut stats = UserStats::default();
        render_entries(&posts, &dir, &mut stats, 0);

        assert_eq!(stats.total_posts(), count_entries(&posts));
        assert_eq!(stats.total_words(), 3 + 1 + 0 + 2 + 4);
    }

    #[test]
    fn summary_sorts_by_words_with_stable_ties() {
        let mut stats = UserStats::default();
        stats.record("X", 10);
        stats.record("Y", 10);
        stats.record("Z", 3);
        let table = render_summary(&stats);

        let x = table.find("X ").unwrap();
        let y = table.find("Y ").unwrap();
        let z = table.find("Z ").unwrap();
        assert!(x < y && y < z);
        assert!(table.contains("PARTICIPATION SUMMARY"));
        assert!(table.contains("10 words"));
    }

    #[test]
    fn document_header_and_empty_fallback() {
        let dir = directory(&[]);
        let (content, stats) =
            render_document("Week 3: Ethics", "https://x.test/d/1", &[], &dir);

        assert!(content.contains("DISCUSSION EXPORT: WEEK 3: ETHICS"));
        assert!(content.contains("URL: https://x.test/d/1"));
        assert!(content.contains("EXPORTED ON:"));
        assert!(content.contains("No posts found."));
        assert!(content.contains("PARTICIPATION SUMMARY"));
        assert!(stats.is_empty());
    }

    #[test]
    fn document_includes_thread_and_summary() {
        let posts = vec![entry(Some(1), "<p>Hello world</p>", vec![])];
        let dir = directory(&[(1, "Alice")]);
        let (content, stats) = render_document("Intro", "https://x.test/d/2", &posts, &dir);

        assert!(content.contains("FROM: Alice"));
        let summary_at = content.find("PARTICIPATION SUMMARY").unwrap();
        let post_at = content.find("FROM: Alice").unwrap();
        assert!(post_at < summary_at);
        assert_eq!(stats.total_posts(), 1);
    }
}
