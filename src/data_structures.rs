use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::HashMap;

pub type UserId = i64;

/// Canvas ids arrive as numbers or numeric strings depending on the
/// endpoint and instance version; accept both, map anything else to None.
fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<UserId>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Value = Deserialize::deserialize(deserializer)?;
    Ok(match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Value = Deserialize::deserialize(deserializer)?;
    match v {
        Value::String(s) if !s.is_empty() => Ok(Some(s)),
        _ => Ok(None),
    }
}

fn deserialize_optional_datetime<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Value = Deserialize::deserialize(deserializer)?;
    Ok(match v {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    })
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Participant {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub id: Option<UserId>,
    #[serde(default)]
    pub display_name: String,
}

/// One node of the reply tree. Deleted or anonymous entries come through
/// with a null user_id and no message; everything degrades to defaults.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct DiscussionEntry {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub user_id: Option<UserId>,
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub message: Option<String>,
    #[serde(default)]
    pub replies: Vec<DiscussionEntry>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct DiscussionView {
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub view: Vec<DiscussionEntry>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct TopicMeta {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub html_url: Option<String>,
}

pub fn build_participant_map(participants: &[Participant]) -> HashMap<UserId, String> {
    let mut map = HashMap::with_capacity(participants.len());
    for p in participants {
        if let Some(id) = p.id {
            if !p.display_name.is_empty() {
                map.insert(id, p.display_name.clone());
            }
        }
    }

    map
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserTally {
    pub posts: usize,
    pub words: usize,
}

/// Per-author post/word accumulator. Remembers first-appearance order so
/// the summary sort stays stable for equal word totals.
#[derive(Debug, Clone, Default)]
pub struct UserStats {
    tallies: HashMap<String, UserTally>,
    order: Vec<String>,
}

impl UserStats {
    pub fn record(&mut self, author: &str, words: usize) {
        if !self.tallies.contains_key(author) {
            self.order.push(author.to_string());
            self.tallies.insert(author.to_string(), UserTally::default());
        }

        if let Some(tally) = self.tallies.get_mut(author) {
            tally.posts += 1;
            tally.words += words;
        }
    }

    pub fn get(&self, author: &str) -> Option<UserTally> {
        self.tallies.get(author).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn total_posts(&self) -> usize {
        self.tallies.values().map(|t| t.posts).sum()
    }

    pub fn total_words(&self) -> usize {
        self.tallies.values().map(|t| t.words).sum()
    }

    /// Authors sorted by descending word total. The sort is stable over
    /// first-appearance order, so ties keep the order the authors were
    /// first seen during traversal.
    pub fn ranked(&self) -> Vec<(&str, UserTally)> {
        let mut rows: Vec<(&str, UserTally)> = self
            .order
            .iter()
            .map(|name| (name.as_str(), self.tallies[name]))
            .collect();
        rows.sort_by_key(|(_, tally)| Reverse(tally.words));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view_from(value: serde_json::Value) -> DiscussionView {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_numeric_and_string_ids() {
        let view = view_from(json!({
            "participants": [
                {"id": 101, "display_name": "Alice"},
                {"id": "102", "display_name": "Bob"}
            ],
            "view": [
                {"user_id": "101", "created_at": "2026-02-04T10:30:00Z", "message": "<p>Hi</p>"}
            ]
        }));

        let map = build_participant_map(&view.participants);
        assert_eq!(map.get(&101).map(String::as_str), Some("Alice"));
        assert_eq!(map.get(&102).map(String::as_str), Some("Bob"));
        assert_eq!(view.view[0].user_id, Some(101));
        assert!(view.view[0].created_at.is_some());
    }

    #[test]
    fn tolerates_deleted_entries() {
        let view = view_from(json!({
            "view": [
                {"user_id": null, "created_at": null, "message": null, "deleted": true,
                 "replies": [{"user_id": 7, "message": "<p>orphan reply</p>"}]}
            ]
        }));

        let entry = &view.view[0];
        assert!(entry.user_id.is_none());
        assert!(entry.created_at.is_none());
        assert!(entry.message.is_none());
        assert_eq!(entry.replies.len(), 1);
        assert_eq!(entry.replies[0].user_id, Some(7));
    }

    #[test]
    fn garbage_timestamp_becomes_none() {
        let view = view_from(json!({
            "view": [{"user_id": 1, "created_at": "not a date", "message": "<p>x</p>"}]
        }));
        assert!(view.view[0].created_at.is_none());
    }

    #[test]
    fn stats_record_and_rank() {
        let mut stats = UserStats::default();
        stats.record("Alice", 5);
        stats.record("Bob", 12);
        stats.record("Alice", 3);

        assert_eq!(
            stats.get("Alice"),
            Some(UserTally { posts: 2, words: 8 })
        );
        assert_eq!(stats.total_posts(), 3);
        assert_eq!(stats.total_words(), 20);

        let ranked = stats.ranked();
        assert_eq!(ranked[0].0, "Bob");
        assert_eq!(ranked[1].0, "Alice");
    }

    #[test]
    fn ranking_keeps_first_seen_order_on_ties() {
        let mut stats = UserStats::default();
        stats.record("X", 10);
        stats.record("Y", 10);
        stats.record("Z", 11);

        let ranked: Vec<&str> = stats.ranked().into_iter().map(|(n, _)| n).collect();
        assert_eq!(ranked, vec!["Z", "X", "Y"]);
    }
}
