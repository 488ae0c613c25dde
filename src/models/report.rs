use serde::Deserialize;

/// One row of the restrictions CSV: a state or local law impeding deployment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Restriction {
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "County", default)]
    pub county: Option<String>,
    #[serde(rename = "Type", default)]
    pub restriction_type: Option<String>,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
    #[serde(rename = "Year Adopted", default, deserialize_with = "csv::invalid_option")]
    pub year_adopted: Option<f64>,
    #[serde(rename = "Level", default)]
    pub level: Option<String>,
}

/// One row of the contested-projects CSV. `state` may list several codes
/// joined by '|'.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContestedProject {
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "County", default)]
    pub county: Option<String>,
    #[serde(rename = "Type", default)]
    pub project_type: Option<String>,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
    #[serde(rename = "Capacity", default)]
    pub capacity: Option<String>,
    #[serde(rename = "Content", default)]
    pub content: Option<String>,
    #[serde(rename = "Year Cancelled", default, deserialize_with = "csv::invalid_option")]
    pub year_cancelled: Option<f64>,
    #[serde(rename = "Litigation", default)]
    pub litigation: Option<String>,
}

impl ContestedProject {
    pub fn states(&self) -> impl Iterator<Item = &str> {
        self.state.split('|').map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn has_litigation(&self) -> bool {
        self.litigation.as_deref().map(str::trim) == Some("Yes")
    }

    /// Numeric capacity in MW when the cell holds a plain number.
    pub fn capacity_mw(&self) -> Option<f64> {
        self.capacity
            .as_deref()
            .and_then(|c| c.trim().parse::<f64>().ok())
            .filter(|c| c.is_finite())
    }
}
