use std::collections::BTreeSet;

use crate::models::{Project, Sentiment};

/// Number of rows listed under the map, selected project included.
pub const DISPLAY_CAP: usize = 20;

/// True when at least one of the eight survey answers is non-empty. Every
/// survey-presence check goes through here.
pub fn has_survey(project: &Project) -> bool {
    project
        .survey
        .iter()
        .any(|answer| answer.is_some_and(|a| !a.trim().is_empty()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurveyPresence {
    #[default]
    All,
    WithSurvey,
    WithoutSurvey,
}

impl SurveyPresence {
    pub fn cycle(&self) -> Self {
        match self {
            SurveyPresence::All => SurveyPresence::WithSurvey,
            SurveyPresence::WithSurvey => SurveyPresence::WithoutSurvey,
            SurveyPresence::WithoutSurvey => SurveyPresence::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SurveyPresence::All => "All",
            SurveyPresence::WithSurvey => "With survey",
            SurveyPresence::WithoutSurvey => "Without survey",
        }
    }

    fn matches(&self, project: &Project) -> bool {
        match self {
            SurveyPresence::All => true,
            SurveyPresence::WithSurvey => has_survey(project),
            SurveyPresence::WithoutSurvey => !has_survey(project),
        }
    }
}

/// Predicates over the unified table. Unset predicates match everything;
/// set ones compose with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectFilter {
    pub name_query: String,
    pub county_query: String,
    pub state: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub facility_type: Option<String>,
    pub survey: SurveyPresence,
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return true;
    }
    haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
}

impl ProjectFilter {
    pub fn is_empty(&self) -> bool {
        *self == ProjectFilter::default()
    }

    pub fn matches(&self, project: &Project) -> bool {
        contains_ci(Some(&project.name), &self.name_query)
            && contains_ci(project.county.as_deref(), &self.county_query)
            && self
                .state
                .as_ref()
                .map_or(true, |s| project.state.as_ref() == Some(s))
            && self.sentiment.map_or(true, |s| project.sentiment == s)
            && self
                .facility_type
                .as_ref()
                .map_or(true, |t| project.facility_type.as_ref() == Some(t))
            && self.survey.matches(project)
    }

    pub fn apply<'a>(&self, projects: &'a [Project]) -> FilterResult<'a> {
        let rows: Vec<&Project> = projects.iter().filter(|p| self.matches(p)).collect();
        let count = rows.len();
        FilterResult { rows, count }
    }

    /// Short description of the active predicates for the status line.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.name_query.trim().is_empty() {
            parts.push(format!("name~\"{}\"", self.name_query.trim()));
        }
        if !self.county_query.trim().is_empty() {
            parts.push(format!("county~\"{}\"", self.county_query.trim()));
        }
        if let Some(state) = &self.state {
            parts.push(format!("state={state}"));
        }
        if let Some(sentiment) = self.sentiment {
            parts.push(format!("sentiment={sentiment}"));
        }
        if let Some(facility_type) = &self.facility_type {
            parts.push(format!("type={facility_type}"));
        }
        if self.survey != SurveyPresence::All {
            parts.push(self.survey.label().to_lowercase());
        }
        if parts.is_empty() {
            "no filters".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterResult<'a> {
    pub rows: Vec<&'a Project>,
    pub count: usize,
}

/// Distinct values offered by the exact-match selectors, sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    pub states: Vec<String>,
    pub sentiments: Vec<Sentiment>,
    pub facility_types: Vec<String>,
}

pub fn options(projects: &[Project]) -> FilterOptions {
    let states: BTreeSet<_> = projects.iter().filter_map(|p| p.state.clone()).collect();
    let sentiments: BTreeSet<_> = projects.iter().map(|p| p.sentiment).collect();
    let types: BTreeSet<_> = projects
        .iter()
        .filter_map(|p| p.facility_type.clone())
        .collect();
    FilterOptions {
        states: states.into_iter().collect(),
        sentiments: sentiments.into_iter().collect(),
        facility_types: types.into_iter().collect(),
    }
}

/// Steps through `None` followed by each option, wrapping around.
pub fn cycle_option<T: Clone + PartialEq>(current: &Option<T>, options: &[T]) -> Option<T> {
    match current {
        None => options.first().cloned(),
        Some(value) => {
            let next = options.iter().position(|o| o == value).map(|i| i + 1);
            next.and_then(|i| options.get(i)).cloned()
        }
    }
}

/// Rows for the list under the map: the selected project first, then the
/// others in table order, capped at `DISPLAY_CAP`.
pub fn display_order<'a>(rows: &[&'a Project], selected: Option<&str>) -> Vec<&'a Project> {
    let mut ordered = Vec::with_capacity(DISPLAY_CAP.min(rows.len()));
    if let Some(name) = selected {
        if let Some(project) = rows.iter().find(|p| p.name == name) {
            ordered.push(*project);
        }
    }
    for project in rows {
        if ordered.len() >= DISPLAY_CAP {
            break;
        }
        if Some(project.name.as_str()) == selected {
            continue;
        }
        ordered.push(*project);
    }
    ordered
}

/// (with survey, without survey) counts for the survey editor listing.
pub fn survey_counts(projects: &[Project]) -> (usize, usize) {
    let with = projects.iter().filter(|p| has_survey(p)).count();
    (with, projects.len() - with)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Origin, SurveyAnswers};

    fn project(name: &str, state: &str, sentiment: Sentiment) -> Project {
        let mut p = Project::new(name, Origin::Baseline);
        p.state = Some(state.to_string());
        p.sentiment = sentiment;
        p
    }

    fn five_rows() -> Vec<Project> {
        vec![
            project("Alpha", "TX", Sentiment::Bad),
            project("Bravo", "TX", Sentiment::Good),
            project("Charlie", "CA", Sentiment::Bad),
            project("Delta", "TX", Sentiment::Bad),
            project("Echo", "NM", Sentiment::Mixed),
        ]
    }

    #[test]
    fn state_and_sentiment_compose_with_and() {
        let rows = five_rows();
        let filter = ProjectFilter {
            state: Some("TX".to_string()),
            sentiment: Some(Sentiment::Bad),
            ..Default::default()
        };
        let result = filter.apply(&rows);
        assert_eq!(result.count, 2);
        let names: Vec<_> = result.rows.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Delta"]);
    }

    #[test]
    fn text_queries_are_case_insensitive_substrings() {
        let mut rows = five_rows();
        rows[2].county = Some("Kern County".to_string());
        let filter = ProjectFilter {
            name_query: "ARL".to_string(),
            county_query: "kern".to_string(),
            ..Default::default()
        };
        assert_eq!(filter.apply(&rows).count, 1);

        let filter = ProjectFilter {
            county_query: "kern".to_string(),
            ..Default::default()
        };
        // Rows without a county never match a county query.
        assert_eq!(filter.apply(&rows).count, 1);
    }

    #[test]
    fn survey_presence_is_three_valued() {
        let mut rows = five_rows();
        rows[0].survey = SurveyAnswers::from_values(["", "", "", "", "", "", "", "late"]);
        rows[1].survey.survey_q1 = Some("   ".to_string());

        assert!(has_survey(&rows[0]));
        assert!(!has_survey(&rows[1]));

        let with = ProjectFilter {
            survey: SurveyPresence::WithSurvey,
            ..Default::default()
        };
        let without = ProjectFilter {
            survey: SurveyPresence::WithoutSurvey,
            ..Default::default()
        };
        assert_eq!(with.apply(&rows).count, 1);
        assert_eq!(without.apply(&rows).count, 4);
        assert_eq!(survey_counts(&rows), (1, 4));
    }

    #[test]
    fn selected_project_listed_first_within_cap() {
        let rows: Vec<Project> = (0..30)
            .map(|i| project(&format!("P{i:02}"), "TX", Sentiment::NoData))
            .collect();
        let refs: Vec<&Project> = rows.iter().collect();

        let ordered = display_order(&refs, Some("P25"));
        assert_eq!(ordered.len(), DISPLAY_CAP);
        assert_eq!(ordered[0].name, "P25");
        assert_eq!(ordered[1].name, "P00");
        assert!(ordered.iter().filter(|p| p.name == "P25").count() == 1);

        let ordered = display_order(&refs, Some("missing"));
        assert_eq!(ordered[0].name, "P00");
    }

    #[test]
    fn options_are_sorted_and_distinct() {
        let opts = options(&five_rows());
        assert_eq!(opts.states, vec!["CA", "NM", "TX"]);
        assert_eq!(
            opts.sentiments,
            vec![Sentiment::Good, Sentiment::Mixed, Sentiment::Bad]
        );
        assert_eq!(cycle_option(&None, &opts.states), Some("CA".to_string()));
        assert_eq!(cycle_option(&Some("TX".to_string()), &opts.states), None);
    }
}
