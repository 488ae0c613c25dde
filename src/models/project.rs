use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::survey::SurveyAnswers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Sentiment {
    Good,
    Mixed,
    Bad,
    #[default]
    NoData,
}

impl Sentiment {
    pub const ALL: [Sentiment; 4] = [
        Sentiment::Good,
        Sentiment::Mixed,
        Sentiment::Bad,
        Sentiment::NoData,
    ];

    /// Anything outside the fixed enumeration counts as "NO DATA".
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "GOOD" => Sentiment::Good,
            "MIXED" => Sentiment::Mixed,
            "BAD" => Sentiment::Bad,
            _ => Sentiment::NoData,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Good => "GOOD",
            Sentiment::Mixed => "MIXED",
            Sentiment::Bad => "BAD",
            Sentiment::NoData => "NO DATA",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for Sentiment {
    fn from(value: String) -> Self {
        Sentiment::parse(&value)
    }
}

impl From<Sentiment> for String {
    fn from(value: Sentiment) -> Self {
        value.label().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Loaded from the baseline workbook; never written back.
    Baseline,
    /// Lives in the record store.
    UserAdded,
}

pub const FACILITY_TYPES: [&str; 5] = ["Solar", "Wind", "Storage", "Transmission", "Hybrid"];

pub const PROJECT_STATUSES: [&str; 5] = [
    "Early Stage Development",
    "Development",
    "Construction",
    "Operating",
    "On Hold",
];

/// One row of the unified table. The name is the identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub name: String,
    pub state: Option<String>,
    pub county: Option<String>,
    pub facility_type: Option<String>,
    pub status: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub size_mw_ac: Option<f64>,
    pub size_mw_dc: Option<f64>,
    pub sentiment: Sentiment,
    pub sentiment_detail: Option<String>,
    pub moratoria: Option<String>,
    pub recent_projects: Option<String>,
    pub opposition_notes: Option<String>,
    pub survey: SurveyAnswers,
    pub origin: Origin,
}

impl Project {
    pub fn new(name: impl Into<String>, origin: Origin) -> Self {
        Self {
            name: name.into(),
            state: None,
            county: None,
            facility_type: None,
            status: None,
            latitude: None,
            longitude: None,
            size_mw_ac: None,
            size_mw_dc: None,
            sentiment: Sentiment::NoData,
            sentiment_detail: None,
            moratoria: None,
            recent_projects: None,
            opposition_notes: None,
            survey: SurveyAnswers::default(),
            origin,
        }
    }

    /// Coordinates usable on a map: both present and finite.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Row shape of the `user_added_projects` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(default, skip_serializing)]
    pub id: Option<i64>,
    pub project: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default, rename = "type")]
    pub facility_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub system_size_mw_ac: Option<f64>,
    #[serde(default)]
    pub system_size_mw_dc: Option<f64>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub sentiment_detail: Option<String>,
    #[serde(default)]
    pub mentions_of_moratoria: Option<String>,
    #[serde(default)]
    pub recent_projects: Option<String>,
    #[serde(flatten)]
    pub survey: SurveyAnswers,
}

impl ProjectRecord {
    /// Snapshot of a unified-table row, used when a baseline project gains
    /// survey answers and has to be copied into the store.
    pub fn from_project(project: &Project) -> Self {
        Self {
            id: None,
            project: project.name.clone(),
            state: project.state.clone(),
            county: project.county.clone(),
            facility_type: project.facility_type.clone(),
            status: project.status.clone(),
            latitude: project.latitude,
            longitude: project.longitude,
            system_size_mw_ac: project.size_mw_ac,
            system_size_mw_dc: project.size_mw_dc,
            sentiment: Some(project.sentiment.label().to_string()),
            sentiment_detail: project.sentiment_detail.clone(),
            mentions_of_moratoria: project.moratoria.clone(),
            recent_projects: project.recent_projects.clone(),
            survey: project.survey.clone(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl From<ProjectRecord> for Project {
    fn from(record: ProjectRecord) -> Self {
        Self {
            name: record.project,
            state: non_blank(record.state),
            county: non_blank(record.county),
            facility_type: non_blank(record.facility_type),
            status: non_blank(record.status),
            latitude: record.latitude,
            longitude: record.longitude,
            size_mw_ac: record.system_size_mw_ac,
            size_mw_dc: record.system_size_mw_dc,
            sentiment: record
                .sentiment
                .as_deref()
                .map(Sentiment::parse)
                .unwrap_or_default(),
            sentiment_detail: non_blank(record.sentiment_detail),
            moratoria: non_blank(record.mentions_of_moratoria),
            recent_projects: non_blank(record.recent_projects),
            opposition_notes: None,
            survey: record.survey,
            origin: Origin::UserAdded,
        }
    }
}

/// Row of `removed_projects`: hides a project name from every view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tombstone {
    #[serde(default, skip_serializing)]
    pub id: Option<i64>,
    pub project: String,
    #[serde(default, skip_serializing, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Accepts RFC 3339 as well as zone-less `timestamp` columns (read as UTC).
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_parsing_falls_back_to_no_data() {
        assert_eq!(Sentiment::parse("good"), Sentiment::Good);
        assert_eq!(Sentiment::parse(" BAD "), Sentiment::Bad);
        assert_eq!(Sentiment::parse("NO DATA"), Sentiment::NoData);
        assert_eq!(Sentiment::parse("excellent"), Sentiment::NoData);
    }

    #[test]
    fn record_deserializes_store_row() {
        let row = serde_json::json!({
            "id": 12,
            "project": "Prairie Wind",
            "state": "TX",
            "county": "Harris County",
            "type": "Wind",
            "latitude": 29.76,
            "longitude": -95.37,
            "sentiment": "BAD",
            "survey_q2": "Noise",
            "created_at": "2025-06-01T10:00:00+00:00"
        });
        let record: ProjectRecord = serde_json::from_value(row).unwrap();
        assert_eq!(record.id, Some(12));
        assert_eq!(record.facility_type.as_deref(), Some("Wind"));
        assert_eq!(record.survey.get(1), Some("Noise"));

        let project = Project::from(record);
        assert_eq!(project.origin, Origin::UserAdded);
        assert_eq!(project.sentiment, Sentiment::Bad);
        assert_eq!(project.coordinates(), Some((29.76, -95.37)));
    }

    #[test]
    fn record_serialization_omits_id() {
        let mut project = Project::new("Mesa Solar", Origin::Baseline);
        project.sentiment = Sentiment::Mixed;
        let json = serde_json::to_value(ProjectRecord::from_project(&project)).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["project"], "Mesa Solar");
        assert_eq!(json["sentiment"], "MIXED");
        assert!(json["survey_q1"].is_null());
    }

    #[test]
    fn tombstone_accepts_zone_less_timestamps() {
        let with_zone: Tombstone = serde_json::from_value(serde_json::json!({
            "id": 1, "project": "A", "created_at": "2025-06-01T10:00:00.5+00:00"
        }))
        .unwrap();
        let without_zone: Tombstone = serde_json::from_value(serde_json::json!({
            "id": 2, "project": "B", "created_at": "2025-06-01T10:00:00.5"
        }))
        .unwrap();
        assert_eq!(with_zone.created_at, without_zone.created_at);
        assert!(with_zone.created_at.is_some());
    }

    #[test]
    fn non_finite_coordinates_are_not_mappable() {
        let mut project = Project::new("Ghost", Origin::Baseline);
        project.latitude = Some(f64::NAN);
        project.longitude = Some(-100.0);
        assert_eq!(project.coordinates(), None);
    }
}
