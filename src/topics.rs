//! Grouping, search and rendering helpers for the public-hearing Q&A
//! knowledge base.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{QaEntry, CATCH_ALL_TOPIC};

pub const RECOMMENDED_TOPICS: [&str; 14] = [
    "Health Concerns",
    "Environmental Impact",
    "Agricultural and Rural Community Impact",
    "Property Values",
    "Economic Viability",
    "Waste and Recycling",
    "Visual Impact and Noise",
    "Temperature and Heat Island Effects",
    "Decommissioning",
    "Battery Energy Storage Systems (BESS) Safety",
    "Community Engagement and Trust",
    "Energy Independence and Security",
    "Land Use",
    CATCH_ALL_TOPIC,
];

fn sort_with_catch_all_last(topics: BTreeSet<String>) -> Vec<String> {
    let mut sorted: Vec<String> = topics
        .into_iter()
        .filter(|t| t != CATCH_ALL_TOPIC)
        .collect();
    sorted.push(CATCH_ALL_TOPIC.to_string());
    sorted
}

/// Recommended topics merged with any ad hoc topics in `entries`:
/// deduplicated, alphabetical, catch-all last.
pub fn topic_catalog(entries: &[QaEntry]) -> Vec<String> {
    let topics: BTreeSet<String> = RECOMMENDED_TOPICS
        .iter()
        .map(|t| t.to_string())
        .chain(
            entries
                .iter()
                .filter_map(|e| e.topic.clone())
                .filter(|t| !t.trim().is_empty()),
        )
        .collect();
    sort_with_catch_all_last(topics)
}

#[derive(Debug, Clone)]
pub struct TopicGroup<'a> {
    pub topic: String,
    pub entries: Vec<&'a QaEntry>,
}

impl TopicGroup<'_> {
    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

/// Groups by exact topic string. Entries without a topic land in the
/// catch-all group. Groups are alphabetical with the catch-all last.
pub fn group_by_topic(entries: &[QaEntry]) -> Vec<TopicGroup<'_>> {
    let mut groups: BTreeMap<String, Vec<&QaEntry>> = BTreeMap::new();
    for entry in entries {
        groups
            .entry(entry.topic_label().to_string())
            .or_default()
            .push(entry);
    }

    let catch_all = groups.remove(CATCH_ALL_TOPIC);
    let mut ordered: Vec<TopicGroup> = groups
        .into_iter()
        .map(|(topic, entries)| TopicGroup { topic, entries })
        .collect();
    if let Some(entries) = catch_all {
        ordered.push(TopicGroup {
            topic: CATCH_ALL_TOPIC.to_string(),
            entries,
        });
    }
    ordered
}

/// Case-insensitive substring search over question, response and topic,
/// optionally narrowed to one topic (exact match).
pub fn search<'a>(entries: &'a [QaEntry], query: &str, topic: Option<&str>) -> Vec<&'a QaEntry> {
    let query = query.trim().to_lowercase();
    entries
        .iter()
        .filter(|e| {
            query.is_empty()
                || e.question.to_lowercase().contains(&query)
                || e.response.to_lowercase().contains(&query)
                || e.topic
                    .as_deref()
                    .is_some_and(|t| t.to_lowercase().contains(&query))
        })
        .filter(|e| topic.map_or(true, |t| e.topic.as_deref() == Some(t)))
        .collect()
}

/// Splits a response on the '•' bullet marker into its lead paragraph and
/// the non-empty bullet items.
pub fn response_parts(response: &str) -> (String, Vec<String>) {
    let mut parts = response.split('•');
    let lead = parts.next().unwrap_or_default().trim().to_string();
    let bullets = parts
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    (lead, bullets)
}

static URL_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r#"https?://[^\s<>"')\]]+"#).ok());

/// First http(s) link in a sources blob, trailing punctuation trimmed.
pub fn first_url(sources: &str) -> Option<String> {
    let candidate = URL_RE
        .as_ref()?
        .find(sources)?
        .as_str()
        .trim_end_matches(['.', ',', ';', ':']);
    url::Url::parse(candidate).ok().map(|u| u.to_string())
}
