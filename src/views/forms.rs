//! Keyboard-driven forms for projects, surveys and Q&A entries.
//!
//! A [`Form`] is a flat list of fields with one focused at a time. Drafts
//! are read out of a submitted form and validated before any store call.

use crate::models::{
    NewQa, Project, ProjectRecord, QaEntry, SurveyAnswers, FACILITY_TYPES, PROJECT_STATUSES, SURVEY_QUESTIONS,
};
use crate::services::CountySentiment;

pub const NAME: &str = "Project Name*";
pub const STATE: &str = "State Code*";
pub const COUNTY: &str = "County*";
pub const TYPE: &str = "Type*";
pub const STATUS: &str = "Status*";
pub const LATITUDE: &str = "Latitude*";
pub const LONGITUDE: &str = "Longitude*";
pub const DC_SIZE: &str = "DC Size (MW)";
pub const AC_SIZE: &str = "AC Size (MW)";
pub const TOPIC: &str = "Select Existing Topic";
pub const NEW_TOPIC: &str = "OR Create New Topic";
pub const QUESTION: &str = "Common Concern/Question*";
pub const RESPONSE: &str = "Response*";
pub const SOURCES: &str = "Sources (Optional)";

const NO_TOPIC: &str = "-- Select --";

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text { max_len: Option<usize>, uppercase: bool },
    Number,
    Choice(Vec<String>),
    TextArea,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub label: &'static str,
    pub kind: FieldKind,
    pub value: String,
}

impl FormField {
    fn text(label: &'static str) -> Self {
        Self {
            label,
            kind: FieldKind::Text {
                max_len: None,
                uppercase: false,
            },
            value: String::new(),
        }
    }

    fn number(label: &'static str) -> Self {
        Self {
            label,
            kind: FieldKind::Number,
            value: String::new(),
        }
    }

    fn area(label: &'static str, value: Option<&str>) -> Self {
        Self {
            label,
            kind: FieldKind::TextArea,
            value: value.unwrap_or_default().to_string(),
        }
    }

    fn choice(label: &'static str, options: Vec<String>, selected: Option<&str>) -> Self {
        let value = selected
            .filter(|s| options.iter().any(|o| o == s))
            .or(options.first().map(String::as_str))
            .unwrap_or_default()
            .to_string();
        Self {
            label,
            kind: FieldKind::Choice(options),
            value,
        }
    }

    pub fn is_multiline(&self) -> bool {
        matches!(self.kind, FieldKind::TextArea)
    }

    fn push(&mut self, c: char) {
        match &self.kind {
            FieldKind::Text { max_len, uppercase } => {
                if max_len.is_some_and(|max| self.value.chars().count() >= max) {
                    return;
                }
                if *uppercase {
                    self.value.extend(c.to_uppercase());
                } else {
                    self.value.push(c);
                }
            }
            FieldKind::Number => {
                if c.is_ascii_digit() || c == '.' || (c == '-' && self.value.is_empty()) {
                    self.value.push(c);
                }
            }
            FieldKind::TextArea => self.value.push(c),
            FieldKind::Choice(_) => {}
        }
    }

    fn cycle(&mut self, forward: bool) {
        let FieldKind::Choice(options) = &self.kind else {
            return;
        };
        if options.is_empty() {
            return;
        }
        let current = options.iter().position(|o| *o == self.value).unwrap_or(0);
        let next = if forward {
            (current + 1) % options.len()
        } else {
            (current + options.len() - 1) % options.len()
        };
        self.value = options[next].clone();
    }

    fn number_value(&self) -> f64 {
        self.value.trim().parse().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormKind {
    AddProject,
    EditSurvey { project: String },
    AddQa,
    EditQa { id: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    pub kind: FormKind,
    pub fields: Vec<FormField>,
    pub focus: usize,
    /// Missing required fields from the last rejected submit.
    pub errors: Vec<String>,
}

fn owned(options: &[&str]) -> Vec<String> {
    options.iter().map(|o| o.to_string()).collect()
}

fn survey_fields(answers: &SurveyAnswers) -> impl Iterator<Item = FormField> + '_ {
    SURVEY_QUESTIONS
        .iter()
        .enumerate()
        .map(|(i, q)| FormField::area(q.title, answers.get(i)))
}

fn topic_fields(topics: &[String], current: Option<&str>) -> Vec<FormField> {
    let mut options = vec![NO_TOPIC.to_string()];
    options.extend(topics.iter().cloned());
    if let Some(topic) = current.filter(|t| !options.iter().any(|o| o == t)) {
        options.push(topic.to_string());
    }
    vec![
        FormField::choice(TOPIC, options, current),
        FormField::text(NEW_TOPIC),
    ]
}

impl Form {
    fn new(kind: FormKind, fields: Vec<FormField>) -> Self {
        Self {
            kind,
            fields,
            focus: 0,
            errors: Vec::new(),
        }
    }

    pub fn add_project() -> Self {
        let mut fields = vec![
            FormField::text(NAME),
            FormField {
                kind: FieldKind::Text {
                    max_len: Some(2),
                    uppercase: true,
                },
                ..FormField::text(STATE)
            },
            FormField::text(COUNTY),
            FormField::choice(TYPE, owned(&FACILITY_TYPES), None),
            FormField::choice(STATUS, owned(&PROJECT_STATUSES), None),
            FormField::number(LATITUDE),
            FormField::number(LONGITUDE),
            FormField::number(DC_SIZE),
            FormField::number(AC_SIZE),
        ];
        fields.extend(survey_fields(&SurveyAnswers::default()));
        Self::new(FormKind::AddProject, fields)
    }

    pub fn edit_survey(project: &Project) -> Self {
        Self::new(
            FormKind::EditSurvey {
                project: project.name.clone(),
            },
            survey_fields(&project.survey).collect(),
        )
    }

    pub fn add_qa(topics: &[String]) -> Self {
        let mut fields = topic_fields(topics, None);
        fields.extend([
            FormField::area(QUESTION, None),
            FormField::area(RESPONSE, None),
            FormField::area(SOURCES, None),
        ]);
        Self::new(FormKind::AddQa, fields)
    }

    pub fn edit_qa(entry: &QaEntry, topics: &[String]) -> Self {
        let mut fields = topic_fields(topics, entry.topic.as_deref());
        fields.extend([
            FormField::area(QUESTION, Some(&entry.question)),
            FormField::area(RESPONSE, Some(&entry.response)),
            FormField::area(SOURCES, entry.sources.as_deref()),
        ]);
        Self::new(FormKind::EditQa { id: entry.id }, fields)
    }

    pub fn title(&self) -> String {
        match &self.kind {
            FormKind::AddProject => "Add New Project".to_string(),
            FormKind::EditSurvey { project } => format!("Survey: {project}"),
            FormKind::AddQa => "Add New Q&A".to_string(),
            FormKind::EditQa { id } => format!("Edit Q&A #{id}"),
        }
    }

    pub fn focused(&self) -> Option<&FormField> {
        self.fields.get(self.focus)
    }

    pub fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn prev_field(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub fn input(&mut self, c: char) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            if !matches!(field.kind, FieldKind::Choice(_)) {
                field.value.pop();
            }
        }
    }

    /// Enter inside a text area starts a new line; elsewhere it advances.
    pub fn enter(&mut self) {
        match self.fields.get_mut(self.focus) {
            Some(field) if field.is_multiline() => field.value.push('\n'),
            _ => self.next_field(),
        }
    }

    pub fn cycle_choice(&mut self, forward: bool) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.cycle(forward);
        }
    }

    pub fn value(&self, label: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
            .unwrap_or_default()
    }

    fn number(&self, label: &str) -> f64 {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(FormField::number_value)
            .unwrap_or(0.0)
    }

    pub fn survey_answers(&self) -> SurveyAnswers {
        SurveyAnswers::from_values(SURVEY_QUESTIONS.iter().map(|q| self.value(q.title).to_string()))
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn text_or_none(value: &str) -> Option<String> {
    (!blank(value)).then(|| value.trim().to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDraft {
    pub name: String,
    pub state: String,
    pub county: String,
    pub facility_type: String,
    pub status: String,
    pub latitude: f64,
    pub longitude: f64,
    pub size_mw_ac: f64,
    pub size_mw_dc: f64,
    pub survey: SurveyAnswers,
}

impl ProjectDraft {
    pub fn from_form(form: &Form) -> Self {
        Self {
            name: form.value(NAME).trim().to_string(),
            state: form.value(STATE).trim().to_uppercase(),
            county: form.value(COUNTY).trim().to_string(),
            facility_type: form.value(TYPE).to_string(),
            status: form.value(STATUS).to_string(),
            latitude: form.number(LATITUDE),
            longitude: form.number(LONGITUDE),
            size_mw_ac: form.number(AC_SIZE),
            size_mw_dc: form.number(DC_SIZE),
            survey: form.survey_answers(),
        }
    }

    /// Labels of required fields that are empty or unusable. Coordinates
    /// must be non-zero and inside their geographic range.
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if blank(&self.name) {
            missing.push("Project Name");
        }
        if blank(&self.state) {
            missing.push("State Code");
        }
        if blank(&self.county) {
            missing.push("County");
        }
        if self.latitude == 0.0 || !(-90.0..=90.0).contains(&self.latitude) {
            missing.push("Latitude");
        }
        if self.longitude == 0.0 || !(-180.0..=180.0).contains(&self.longitude) {
            missing.push("Longitude");
        }
        missing.into_iter().map(str::to_string).collect()
    }

    /// Store row for the draft, enriched with county sentiment when a
    /// report matched. Sizes of zero are stored as absent.
    pub fn into_record(self, enrichment: Option<CountySentiment>) -> ProjectRecord {
        let positive = |v: f64| (v > 0.0).then_some(v);
        let (sentiment, sentiment_detail, moratoria, recent_projects) = match enrichment {
            Some(found) => (
                found.sentiment.label().to_string(),
                found.sentiment_detail,
                found.moratoria,
                found.recent_projects,
            ),
            None => ("NO DATA".to_string(), None, None, None),
        };
        ProjectRecord {
            id: None,
            project: self.name,
            state: Some(self.state),
            county: Some(self.county),
            facility_type: Some(self.facility_type),
            status: Some(self.status),
            latitude: Some(self.latitude),
            longitude: Some(self.longitude),
            system_size_mw_ac: positive(self.size_mw_ac),
            system_size_mw_dc: positive(self.size_mw_dc),
            sentiment: Some(sentiment),
            sentiment_detail,
            mentions_of_moratoria: moratoria,
            recent_projects,
            survey: self.survey,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QaDraft {
    pub topic: Option<String>,
    pub question: String,
    pub response: String,
    pub sources: Option<String>,
}

impl QaDraft {
    /// A typed new topic wins over the selected one.
    pub fn from_form(form: &Form) -> Self {
        let topic = text_or_none(form.value(NEW_TOPIC))
            .or_else(|| text_or_none(form.value(TOPIC)).filter(|t| t != NO_TOPIC));
        Self {
            topic,
            question: form.value(QUESTION).trim().to_string(),
            response: form.value(RESPONSE).trim().to_string(),
            sources: text_or_none(form.value(SOURCES)),
        }
    }

    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.topic.is_none() {
            missing.push("Topic".to_string());
        }
        if blank(&self.question) {
            missing.push("Question".to_string());
        }
        if blank(&self.response) {
            missing.push("Response".to_string());
        }
        missing
    }

    pub fn into_new_qa(self) -> NewQa {
        NewQa {
            topic: self.topic.unwrap_or_default(),
            question: self.question,
            response: self.response,
            sources: self.sources,
        }
    }
}
