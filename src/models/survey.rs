use serde::{Deserialize, Serialize};

pub const SURVEY_LEN: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct SurveyQuestion {
    /// Column name in the record store.
    pub key: &'static str,
    /// Short heading used in forms and detail panels.
    pub title: &'static str,
    /// Full question text; also the column label of the unified table.
    pub prompt: &'static str,
}

pub const SURVEY_QUESTIONS: [SurveyQuestion; SURVEY_LEN] = [
    SurveyQuestion {
        key: "survey_q1",
        title: "Initial Public Opposition",
        prompt: "Can you describe any initial public opposition to the project - including when it occurred, its tone, scale, and level of organization, and the permitting stage it emerged in? Who were the most vocal opponents and supporters (if any)? If there was little or no opposition, please describe your community interactions, including any key supporters or positive dynamics that helped ease the permitting process.",
    },
    SurveyQuestion {
        key: "survey_q2",
        title: "Prominent Concerns",
        prompt: "What were the most prominent concerns or recurring public fears raised by the community at this project? What type of approval(s) were being sought?",
    },
    SurveyQuestion {
        key: "survey_q3",
        title: "Community Engagement",
        prompt: "Regarding this project, what forms of community engagement were used, and were they helpful? Do you believe engagement made - or could have made - a positive difference in the project's outcome? If so, which approaches were or would have been most effective?",
    },
    SurveyQuestion {
        key: "survey_q4",
        title: "Difficult Questions",
        prompt: "What were some of the most difficult or unexpected questions you've been asked during public hearings, community meetings and/or public interactions regarding this project? How did you respond - or how do you wish you had responded?",
    },
    SurveyQuestion {
        key: "survey_q5",
        title: "Success Factors",
        prompt: "If the project succeeded with minimal or manageable opposition, what do you think made the difference?",
    },
    SurveyQuestion {
        key: "survey_q6",
        title: "Failure Factors",
        prompt: "If opposition caused significant delay or failure, what factors do you believe contributed?",
    },
    SurveyQuestion {
        key: "survey_q7",
        title: "Timeline Impact",
        prompt: "Did public opposition affect project timeline and to what degree?",
    },
    SurveyQuestion {
        key: "survey_q8",
        title: "Additional Comments",
        prompt: "(OPTIONAL) Is there anything else you'd like to share that didn't fit into the questions above?",
    },
];

/// Reduce a column label to lowercase alphanumerics so that dash variants,
/// stray punctuation and a dangling " (" compare equal.
pub fn label_key(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Index of the survey question a column label refers to, by store key or
/// by question text.
pub fn survey_index_for_label(label: &str) -> Option<usize> {
    let key = label_key(label);
    if key.is_empty() {
        return None;
    }
    SURVEY_QUESTIONS
        .iter()
        .position(|q| label_key(q.key) == key || label_key(q.prompt) == key)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveyAnswers {
    #[serde(default)]
    pub survey_q1: Option<String>,
    #[serde(default)]
    pub survey_q2: Option<String>,
    #[serde(default)]
    pub survey_q3: Option<String>,
    #[serde(default)]
    pub survey_q4: Option<String>,
    #[serde(default)]
    pub survey_q5: Option<String>,
    #[serde(default)]
    pub survey_q6: Option<String>,
    #[serde(default)]
    pub survey_q7: Option<String>,
    #[serde(default)]
    pub survey_q8: Option<String>,
}

impl SurveyAnswers {
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut answers = Self::default();
        for (i, value) in values.into_iter().take(SURVEY_LEN).enumerate() {
            answers.set(i, value.into());
        }
        answers
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        let slot = match index {
            0 => &self.survey_q1,
            1 => &self.survey_q2,
            2 => &self.survey_q3,
            3 => &self.survey_q4,
            4 => &self.survey_q5,
            5 => &self.survey_q6,
            6 => &self.survey_q7,
            7 => &self.survey_q8,
            _ => return None,
        };
        slot.as_deref()
    }

    /// Blank answers are stored as absent.
    pub fn set(&mut self, index: usize, value: String) {
        let value = if value.trim().is_empty() { None } else { Some(value) };
        let slot = match index {
            0 => &mut self.survey_q1,
            1 => &mut self.survey_q2,
            2 => &mut self.survey_q3,
            3 => &mut self.survey_q4,
            4 => &mut self.survey_q5,
            5 => &mut self.survey_q6,
            6 => &mut self.survey_q7,
            7 => &mut self.survey_q8,
            _ => return,
        };
        *slot = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        (0..SURVEY_LEN).map(move |i| self.get(i))
    }

    /// Answers paired with their question, skipping empty ones.
    pub fn answered(&self) -> impl Iterator<Item = (&'static SurveyQuestion, &str)> + '_ {
        SURVEY_QUESTIONS
            .iter()
            .zip(self.iter())
            .filter_map(|(q, a)| a.filter(|s| !s.trim().is_empty()).map(|s| (q, s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_key_and_prompt_variants() {
        assert_eq!(survey_index_for_label("survey_q3"), Some(2));
        assert_eq!(survey_index_for_label(SURVEY_QUESTIONS[0].prompt), Some(0));

        // Display-time wording uses em-dashes and, for q2, a dangling " (".
        let em_dash = SURVEY_QUESTIONS[0].prompt.replace(" - ", " — ");
        assert_eq!(survey_index_for_label(&em_dash), Some(0));
        let dangling = format!("{} (", SURVEY_QUESTIONS[1].prompt);
        assert_eq!(survey_index_for_label(&dangling), Some(1));

        assert_eq!(survey_index_for_label("Project"), None);
        assert_eq!(survey_index_for_label(" - "), None);
    }

    #[test]
    fn blank_answers_are_absent() {
        let answers = SurveyAnswers::from_values(["", "Noise", "  ", "", "", "", "", "Later"]);
        assert_eq!(answers.get(0), None);
        assert_eq!(answers.get(1), Some("Noise"));
        assert_eq!(answers.get(2), None);

        let titles: Vec<_> = answers.answered().map(|(q, _)| q.title).collect();
        assert_eq!(titles, vec!["Prominent Concerns", "Additional Comments"]);
    }

    #[test]
    fn serializes_with_store_keys() {
        let answers = SurveyAnswers::from_values(["Quiet hearing"]);
        let json = serde_json::to_value(&answers).unwrap();
        assert_eq!(json["survey_q1"], "Quiet hearing");
        assert!(json["survey_q8"].is_null());
    }
}
