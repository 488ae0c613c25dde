use serde::{Deserialize, Deserializer, Serialize};

/// Topic used when an entry carries none.
pub const CATCH_ALL_TOPIC: &str = "Other";

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Row of `public_hearing_qa`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaEntry {
    pub id: i64,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub question: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub response: String,
    #[serde(default)]
    pub sources: Option<String>,
    #[serde(default)]
    pub is_removed: Option<bool>,
}

impl QaEntry {
    /// Active means the soft-delete flag is false or unset.
    pub fn is_active(&self) -> bool {
        !self.is_removed.unwrap_or(false)
    }

    pub fn topic_label(&self) -> &str {
        self.topic
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(CATCH_ALL_TOPIC)
    }

    /// First `max_chars` characters of the question, with an ellipsis when cut.
    pub fn question_preview(&self, max_chars: usize) -> String {
        let mut preview: String = self.question.chars().take(max_chars).collect();
        if self.question.chars().count() > max_chars {
            preview.push_str("...");
        }
        preview
    }
}

/// Insert/update payload for a Q&A entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewQa {
    pub topic: String,
    pub question: String,
    pub response: String,
    pub sources: Option<String>,
}

/// Which slice of the Q&A table a read returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QaScope {
    Active,
    Removed,
    All,
}

impl QaScope {
    pub fn includes(&self, entry: &QaEntry) -> bool {
        match self {
            QaScope::Active => entry.is_active(),
            QaScope::Removed => !entry.is_active(),
            QaScope::All => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(is_removed: Option<bool>) -> QaEntry {
        QaEntry {
            id: 7,
            topic: Some("Health Concerns".to_string()),
            question: "Do panels emit harmful EMF?".to_string(),
            response: "No.".to_string(),
            sources: None,
            is_removed,
        }
    }

    #[test]
    fn flag_lifecycle_moves_between_scopes() {
        let mut qa = entry(None);
        assert!(QaScope::Active.includes(&qa));
        assert!(!QaScope::Removed.includes(&qa));

        qa.is_removed = Some(true);
        assert!(!QaScope::Active.includes(&qa));
        assert!(QaScope::Removed.includes(&qa));

        qa.is_removed = Some(false);
        assert!(QaScope::Active.includes(&qa));
        assert!(QaScope::All.includes(&qa));
    }

    #[test]
    fn null_text_columns_deserialize_empty() {
        let qa: QaEntry = serde_json::from_value(serde_json::json!({
            "id": 3,
            "topic": null,
            "question": "Will this lower property values?",
            "response": null,
            "is_removed": null
        }))
        .unwrap();
        assert_eq!(qa.response, "");
        assert_eq!(qa.topic_label(), CATCH_ALL_TOPIC);
        assert!(qa.is_active());
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let mut qa = entry(None);
        qa.question = "é".repeat(5);
        assert_eq!(qa.question_preview(3), "ééé...");
        assert_eq!(qa.question_preview(10), "ééééé");
    }
}
