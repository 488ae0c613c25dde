use std::collections::{HashMap, HashSet};
use std::io::Write;

use crate::error::Result;
use crate::models::{Project, SURVEY_QUESTIONS};

fn fill<T: Clone>(target: &mut Option<T>, fallback: &Option<T>) {
    if target.is_none() {
        target.clone_from(fallback);
    }
}

/// Lays a user-added row over the baseline row of the same name. The user
/// row wins wherever it has a value. Survey answers are stored as a full
/// snapshot, so the user row's answers are taken as they are.
fn overlay(mut user: Project, base: &Project) -> Project {
    fill(&mut user.state, &base.state);
    fill(&mut user.county, &base.county);
    fill(&mut user.facility_type, &base.facility_type);
    fill(&mut user.status, &base.status);
    fill(&mut user.latitude, &base.latitude);
    fill(&mut user.longitude, &base.longitude);
    fill(&mut user.size_mw_ac, &base.size_mw_ac);
    fill(&mut user.size_mw_dc, &base.size_mw_dc);
    fill(&mut user.sentiment_detail, &base.sentiment_detail);
    fill(&mut user.moratoria, &base.moratoria);
    fill(&mut user.recent_projects, &base.recent_projects);
    fill(&mut user.opposition_notes, &base.opposition_notes);
    user
}

/// Builds the unified table: baseline rows in file order (replaced by a
/// user row of the same name), then the remaining user rows, with every
/// tombstoned name dropped. Each name appears at most once.
pub fn merge(baseline: &[Project], user: Vec<Project>, tombstones: &HashSet<String>) -> Vec<Project> {
    let mut user_by_name: HashMap<String, Project> = HashMap::new();
    let mut user_order = Vec::new();
    for project in user {
        if user_by_name.contains_key(&project.name) {
            continue;
        }
        user_order.push(project.name.clone());
        user_by_name.insert(project.name.clone(), project);
    }

    let mut merged = Vec::with_capacity(baseline.len() + user_by_name.len());
    for base in baseline {
        if tombstones.contains(&base.name) {
            user_by_name.remove(&base.name);
            continue;
        }
        match user_by_name.remove(&base.name) {
            Some(user) => merged.push(overlay(user, base)),
            None => merged.push(base.clone()),
        }
    }

    for name in user_order {
        if tombstones.contains(&name) {
            continue;
        }
        if let Some(project) = user_by_name.remove(&name) {
            merged.push(project);
        }
    }
    merged
}

const BASE_COLUMNS: [&str; 14] = [
    "Project",
    "State",
    "County",
    "Type",
    "Status",
    "Latitude",
    "Longitude",
    "System Size (MW AC)",
    "System Size (MW DC)",
    "Sentiment",
    "Sentiment Detail",
    "Mentions of Moratoria",
    "Recent Projects",
    "Opposition Notes",
];

/// Display labels of the unified table; survey columns carry the full
/// question text.
pub fn column_labels() -> Vec<&'static str> {
    BASE_COLUMNS
        .iter()
        .copied()
        .chain(SURVEY_QUESTIONS.iter().map(|q| q.prompt))
        .collect()
}

fn display_row(project: &Project) -> Vec<String> {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let num = |v: Option<f64>| v.map(|n| n.to_string()).unwrap_or_default();

    let mut row = vec![
        project.name.clone(),
        text(&project.state),
        text(&project.county),
        text(&project.facility_type),
        text(&project.status),
        num(project.latitude),
        num(project.longitude),
        num(project.size_mw_ac),
        num(project.size_mw_dc),
        project.sentiment.label().to_string(),
        text(&project.sentiment_detail),
        text(&project.moratoria),
        text(&project.recent_projects),
        text(&project.opposition_notes),
    ];
    row.extend(project.survey.iter().map(|a| a.unwrap_or_default().to_string()));
    row
}

/// Writes the unified table as CSV with display labels.
pub fn write_csv<W: Write>(projects: &[Project], writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(column_labels())?;
    for project in projects {
        out.write_record(display_row(project))?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::baseline::sample_projects;
    use crate::models::{Origin, Sentiment, SurveyAnswers};

    fn user(name: &str) -> Project {
        let mut project = Project::new(name, Origin::UserAdded);
        project.state = Some("NM".to_string());
        project
    }

    #[test]
    fn tombstone_hides_and_restore_brings_back_unchanged() {
        let baseline = sample_projects();
        let tombstones = HashSet::from(["Sample Project 1".to_string()]);

        let hidden = merge(&baseline, vec![], &tombstones);
        assert!(hidden.iter().all(|p| p.name != "Sample Project 1"));
        assert_eq!(hidden.len(), 1);

        let restored = merge(&baseline, vec![], &HashSet::new());
        let back = restored
            .iter()
            .find(|p| p.name == "Sample Project 1")
            .unwrap();
        assert_eq!(back, &baseline[0]);
        assert_eq!(back.state.as_deref(), Some("CA"));
    }

    #[test]
    fn tombstone_applies_to_user_rows_too() {
        let tombstones = HashSet::from(["High Desert Solar".to_string()]);
        let merged = merge(&[], vec![user("High Desert Solar"), user("Ridge")], &tombstones);
        let names: Vec<_> = merged.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ridge"]);
    }

    #[test]
    fn user_row_overrides_baseline_of_same_name() {
        let baseline = sample_projects();
        let mut surveyed = Project::new("Sample Project 2", Origin::UserAdded);
        surveyed.sentiment = Sentiment::Bad;
        surveyed.survey = SurveyAnswers::from_values(["Organized opposition"]);

        let merged = merge(&baseline, vec![surveyed, user("Sample Project 2")], &HashSet::new());
        assert_eq!(merged.len(), 2);

        let row = &merged[1];
        assert_eq!(row.origin, Origin::UserAdded);
        assert_eq!(row.sentiment, Sentiment::Bad);
        assert_eq!(row.county.as_deref(), Some("Harris County"));
        assert_eq!(row.survey.get(0), Some("Organized opposition"));
    }

    #[test]
    fn cleared_survey_answer_stays_cleared() {
        let mut base = Project::new("Sample Project 1", Origin::Baseline);
        base.state = Some("CA".to_string());
        base.survey = SurveyAnswers::from_values(["Old baseline answer", "Glare"]);

        let mut edited = Project::new("Sample Project 1", Origin::UserAdded);
        edited.survey = SurveyAnswers::from_values(["", "Glare"]);

        let merged = merge(&[base], vec![edited], &HashSet::new());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].survey.get(0), None);
        assert_eq!(merged[0].survey.get(1), Some("Glare"));
        assert_eq!(merged[0].state.as_deref(), Some("CA"));
    }

    #[test]
    fn csv_export_uses_question_text_headers() {
        let mut buf = Vec::new();
        write_csv(&sample_projects(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let header = text.lines().next().unwrap();

        assert!(header.starts_with("Project,State,County"));
        assert!(header.contains("System Size (MW AC)"));
        assert!(header.contains("Did public opposition affect project timeline and to what degree?"));
        assert_eq!(text.lines().count(), 3);
    }
}
