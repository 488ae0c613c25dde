use std::collections::HashSet;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{label_key, survey_index_for_label, Origin, Project, Sentiment};

/// Where the baseline rows came from.
#[derive(Debug, Clone, PartialEq)]
pub enum BaselineSource {
    Workbook { path: PathBuf, sheet: String },
    Csv(PathBuf),
    Sample,
}

impl BaselineSource {
    pub fn describe(&self) -> String {
        match self {
            BaselineSource::Workbook { path, sheet } => {
                format!("{} [{}]", path.display(), sheet)
            }
            BaselineSource::Csv(path) => path.display().to_string(),
            BaselineSource::Sample => "built-in sample data".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Baseline {
    pub projects: Vec<Project>,
    pub source: BaselineSource,
}

/// Header row plus text cells, as read from a sheet or CSV.
#[derive(Debug, Default)]
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Project,
    State,
    County,
    Type,
    Status,
    Latitude,
    Longitude,
    SizeAc,
    SizeDc,
    Sentiment,
    SentimentDetail,
    Moratoria,
    RecentProjects,
    Notes,
    Survey(usize),
}

fn classify(label: &str) -> Option<Field> {
    let field = match label_key(label).as_str() {
        "project" | "projectname" | "name" => Field::Project,
        "state" | "statecode" => Field::State,
        "county" => Field::County,
        "type" | "facilitytype" | "technology" => Field::Type,
        "status" | "projectstatus" => Field::Status,
        "latitude" | "lat" => Field::Latitude,
        "longitude" | "lon" | "lng" | "long" => Field::Longitude,
        "systemsizemwac" | "mwac" => Field::SizeAc,
        "systemsizemwdc" | "mwdc" => Field::SizeDc,
        "sentiment" => Field::Sentiment,
        "sentimentdetail" => Field::SentimentDetail,
        "mentionsofmoratoria" | "moratoria" => Field::Moratoria,
        "recentprojects" => Field::RecentProjects,
        "oppositionnotes" | "publicoppositionnotes" | "notes" => Field::Notes,
        _ => return survey_index_for_label(label).map(Field::Survey),
    };
    Some(field)
}

fn number(text: &str) -> Option<f64> {
    text.trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

impl RawTable {
    fn into_projects(self) -> Vec<Project> {
        let fields: Vec<Option<Field>> = self.headers.iter().map(|h| classify(h)).collect();
        let mut seen = HashSet::new();
        let mut projects = Vec::with_capacity(self.rows.len());

        for row in self.rows {
            let mut project = Project::new(String::new(), Origin::Baseline);
            for (field, cell) in fields.iter().zip(row) {
                let (Some(field), Some(text)) = (field, cell) else {
                    continue;
                };
                let text = text.trim().to_string();
                if text.is_empty() {
                    continue;
                }
                match *field {
                    Field::Project => project.name = text,
                    Field::State => project.state = Some(text.to_uppercase()),
                    Field::County => project.county = Some(text),
                    Field::Type => project.facility_type = Some(text),
                    Field::Status => project.status = Some(text),
                    Field::Latitude => project.latitude = number(&text),
                    Field::Longitude => project.longitude = number(&text),
                    Field::SizeAc => project.size_mw_ac = number(&text),
                    Field::SizeDc => project.size_mw_dc = number(&text),
                    Field::Sentiment => project.sentiment = Sentiment::parse(&text),
                    Field::SentimentDetail => project.sentiment_detail = Some(text),
                    Field::Moratoria => project.moratoria = Some(text),
                    Field::RecentProjects => project.recent_projects = Some(text),
                    Field::Notes => project.opposition_notes = Some(text),
                    Field::Survey(i) => project.survey.set(i, text),
                }
            }

            if project.name.is_empty() {
                continue;
            }
            if !seen.insert(project.name.clone()) {
                tracing::warn!("Duplicate baseline project '{}' skipped", project.name);
                continue;
            }
            projects.push(project);
        }
        projects
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        other => Some(other.to_string()),
    }
}

fn read_sheet(path: &Path, sheet: Option<&str>) -> Result<(RawTable, String)> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| AppError::Sheet(format!("{} has no sheets", path.display())))?,
    };
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .ok_or_else(|| AppError::Sheet(format!("sheet '{sheet_name}' is empty")))?
        .iter()
        .map(|c| cell_text(c).unwrap_or_default())
        .collect();
    let rows = rows.map(|r| r.iter().map(cell_text).collect()).collect();

    Ok((RawTable { headers, rows }, sheet_name))
}

fn read_csv(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|c| Some(c.to_string())).collect());
    }
    Ok(RawTable { headers, rows })
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

/// Two placeholder rows shown when no baseline file exists.
pub fn sample_projects() -> Vec<Project> {
    let mut first = Project::new("Sample Project 1", Origin::Baseline);
    first.state = Some("CA".to_string());
    first.county = Some("Los Angeles County".to_string());
    first.sentiment = Sentiment::Good;
    first.latitude = Some(34.0522);
    first.longitude = Some(-118.2437);

    let mut second = Project::new("Sample Project 2", Origin::Baseline);
    second.state = Some("TX".to_string());
    second.county = Some("Harris County".to_string());
    second.sentiment = Sentiment::Mixed;
    second.latitude = Some(29.7604);
    second.longitude = Some(-95.3698);

    vec![first, second]
}

/// Reads the first baseline source that exists. `Ok` with
/// `BaselineSource::Sample` means no file was found; `Err` means a file was
/// found but could not be read.
pub fn load_baseline(config: &Config) -> Result<Baseline> {
    let primary = config.data_path(&config.baseline_workbook);
    if primary.exists() {
        let (table, sheet) = read_sheet(&primary, Some(&config.baseline_sheet))?;
        tracing::info!("Loaded baseline from {} [{}]", primary.display(), sheet);
        return Ok(Baseline {
            projects: table.into_projects(),
            source: BaselineSource::Workbook {
                path: primary,
                sheet,
            },
        });
    }

    for name in &config.baseline_fallbacks {
        let path = config.data_path(name);
        if !path.exists() {
            continue;
        }
        if is_csv(&path) {
            let table = read_csv(&path)?;
            tracing::info!("Loaded baseline from {}", path.display());
            return Ok(Baseline {
                projects: table.into_projects(),
                source: BaselineSource::Csv(path),
            });
        }
        let (table, sheet) = read_sheet(&path, None)?;
        tracing::info!("Loaded baseline from {} [{}]", path.display(), sheet);
        return Ok(Baseline {
            projects: table.into_projects(),
            source: BaselineSource::Workbook { path, sheet },
        });
    }

    tracing::warn!("No baseline file found in {}", config.data_dir.display());
    Ok(Baseline {
        projects: sample_projects(),
        source: BaselineSource::Sample,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SURVEY_QUESTIONS;

    fn config_in(dir: &Path) -> Config {
        Config {
            data_dir: dir.to_path_buf(),
            ..Config::default()
        }
    }

    #[test]
    fn no_files_synthesizes_sample() {
        let dir = tempfile::tempdir().unwrap();
        let baseline = load_baseline(&config_in(dir.path())).unwrap();

        assert_eq!(baseline.source, BaselineSource::Sample);
        assert_eq!(baseline.projects.len(), 2);
        assert_eq!(baseline.projects[0].name, "Sample Project 1");
        assert_eq!(baseline.projects[1].sentiment, Sentiment::Mixed);
    }

    #[test]
    fn csv_fallback_normalizes_labels() {
        let dir = tempfile::tempdir().unwrap();
        let q1 = SURVEY_QUESTIONS[0].prompt.replace(" - ", " — ");
        let content = format!(
            "\u{feff}Project,State,County,System Size (MW AC),Sentiment,\"{q1}\",survey_q2\n\
             Mesa Solar,az,Pima County,\"1,200\",bad,Loud hearing,Glare\n\
             ,TX,Nameless,,,,\n\
             Mesa Solar,AZ,Duplicate,,,,\n"
        );
        std::fs::write(dir.path().join("projects.csv"), content).unwrap();

        let baseline = load_baseline(&config_in(dir.path())).unwrap();
        assert!(matches!(baseline.source, BaselineSource::Csv(_)));
        assert_eq!(baseline.projects.len(), 1);

        let mesa = &baseline.projects[0];
        assert_eq!(mesa.state.as_deref(), Some("AZ"));
        assert_eq!(mesa.size_mw_ac, Some(1200.0));
        assert_eq!(mesa.sentiment, Sentiment::Bad);
        assert_eq!(mesa.survey.get(0), Some("Loud hearing"));
        assert_eq!(mesa.survey.get(1), Some("Glare"));
    }

    #[test]
    fn unreadable_workbook_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("DESRI_PowerBI_Complete.xlsx"), "not a zip").unwrap();
        assert!(load_baseline(&config_in(dir.path())).is_err());
    }

    #[test]
    fn classify_accepts_display_and_store_labels() {
        assert_eq!(classify("System Size (MW DC)"), Some(Field::SizeDc));
        assert_eq!(classify("system_size_mw_dc"), Some(Field::SizeDc));
        assert_eq!(classify("Mentions of Moratoria"), Some(Field::Moratoria));
        assert_eq!(classify("survey_q8"), Some(Field::Survey(7)));
        assert_eq!(classify("Developer"), None);
    }
}
