mod project;
mod qa;
mod report;
mod survey;

pub use project::{Origin, Project, ProjectRecord, Sentiment, Tombstone, FACILITY_TYPES, PROJECT_STATUSES};
pub use qa::{NewQa, QaEntry, QaScope, CATCH_ALL_TOPIC};
pub use report::{ContestedProject, Restriction};
pub use survey::{label_key, survey_index_for_label, SurveyAnswers, SURVEY_LEN, SURVEY_QUESTIONS};

/// User-visible message surfaced in the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Success(String),
    Warning(String),
    Error(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Info(m) | Notice::Success(m) | Notice::Warning(m) | Notice::Error(m) => m,
        }
    }
}
