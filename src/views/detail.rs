use crate::models::{Project, Sentiment};

/// Known limitation: any phrasing other than "no mention" or "none" counts
/// as a real moratoria mention.
pub fn mentions_moratoria(text: &str) -> bool {
    let lower = text.to_lowercase();
    !(lower.contains("no mention") || lower.contains("none"))
}

/// Sentiment detail paragraphs: blank-line separated when present,
/// otherwise " - " separated. Leading dashes are dropped.
pub fn split_sentiment_detail(text: &str) -> Vec<String> {
    let items: Vec<&str> = if text.contains("\n\n") {
        text.split("\n\n").collect()
    } else {
        text.split(" - ").collect()
    };
    items
        .into_iter()
        .map(|item| item.trim().trim_start_matches('-').trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// One recent-project entry, with a bold header when the source reads like
/// "Name (2024): what happened".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailItem {
    pub header: Option<String>,
    pub text: String,
}

pub fn split_recent_projects(text: &str) -> Vec<DetailItem> {
    let items: Vec<&str> = if text.contains(';') {
        text.split(';').collect()
    } else {
        text.split('\n').collect()
    };
    items
        .into_iter()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            if item.contains('(') && item.contains(')') {
                if let Some((header, content)) = item.split_once(':') {
                    return DetailItem {
                        header: Some(header.trim().to_string()),
                        text: content.trim().to_string(),
                    };
                }
            }
            DetailItem {
                header: None,
                text: item.to_string(),
            }
        })
        .collect()
}

/// Splits `**bold**` markup into (text, is_bold) runs. An unmatched `**`
/// is kept literally.
pub fn bold_spans(text: &str) -> Vec<(String, bool)> {
    let mut spans = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("**") else {
            break;
        };
        if end == 0 {
            // "****" has nothing to embolden.
            spans.push((rest[..start + 4].to_string(), false));
            rest = &after[2..];
            continue;
        }
        if start > 0 {
            spans.push((rest[..start].to_string(), false));
        }
        spans.push((after[..end].to_string(), true));
        rest = &after[end + 2..];
    }
    if !rest.is_empty() {
        spans.push((rest.to_string(), false));
    }
    spans
}

#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Overview(Vec<(&'static str, String)>),
    SentimentDetail(Vec<String>),
    Moratoria { text: String, warning: bool },
    RecentProjects(Vec<DetailItem>),
    /// (title, full question, answer)
    Survey(Vec<(&'static str, &'static str, String)>),
    Notes(String),
}

impl Section {
    pub fn heading(&self) -> &'static str {
        match self {
            Section::Overview(_) => "Project Overview",
            Section::SentimentDetail(_) => "Sentiment Analysis",
            Section::Moratoria { warning: true, .. } => "Moratoria Mentions",
            Section::Moratoria { warning: false, .. } => "Moratoria Status",
            Section::RecentProjects(_) => "Recent Projects",
            Section::Survey(_) => "Community Engagement Survey Responses",
            Section::Notes(_) => "Opposition Notes",
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn size(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v} MW"))
}

/// Sections for one project. Optional sections are only present when the
/// underlying field has content.
pub fn detail_sections(project: &Project) -> Vec<Section> {
    let na = |v: &Option<String>| present(v).unwrap_or("N/A").to_string();
    let mut sections = vec![Section::Overview(vec![
        ("Location", na(&project.county)),
        ("Type", na(&project.facility_type)),
        ("Status", na(&project.status)),
        ("Sentiment", project.sentiment.label().to_string()),
        ("AC Size", size(project.size_mw_ac)),
        ("DC Size", size(project.size_mw_dc)),
    ])];

    if let Some(detail) = present(&project.sentiment_detail) {
        let items = split_sentiment_detail(detail);
        if !items.is_empty() {
            sections.push(Section::SentimentDetail(items));
        }
    }

    if let Some(moratoria) = present(&project.moratoria) {
        sections.push(Section::Moratoria {
            text: moratoria.to_string(),
            warning: mentions_moratoria(moratoria),
        });
    }

    if let Some(recent) = present(&project.recent_projects) {
        let items = split_recent_projects(recent);
        if !items.is_empty() {
            sections.push(Section::RecentProjects(items));
        }
    }

    let answers: Vec<_> = project
        .survey
        .answered()
        .map(|(q, a)| (q.title, q.prompt, a.to_string()))
        .collect();
    if !answers.is_empty() {
        sections.push(Section::Survey(answers));
    }

    if let Some(notes) = present(&project.opposition_notes) {
        sections.push(Section::Notes(notes.to_string()));
    }

    sections
}

/// Header line under the project name.
pub fn location_line(project: &Project) -> String {
    match (present(&project.county), present(&project.state)) {
        (Some(county), Some(state)) => format!("{county}, {state}"),
        (None, Some(state)) => state.to_string(),
        (Some(county), None) => county.to_string(),
        (None, None) => "Location unknown".to_string(),
    }
}

pub fn sentiment_badge(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Good => "●",
        Sentiment::Mixed => "◐",
        Sentiment::Bad => "▲",
        Sentiment::NoData => "○",
    }
}
