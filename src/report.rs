//! The static 2025 opposition report: restrictions and contested projects
//! aggregated by state and county.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::error::Result;
use crate::models::{ContestedProject, Restriction};

/// Approximate geographic centre of each state, for the state-level map.
pub const STATE_CENTROIDS: [(&str, f64, f64); 51] = [
    ("AL", 32.806671, -86.791130),
    ("AK", 61.370716, -152.404419),
    ("AZ", 33.729759, -111.431221),
    ("AR", 34.969704, -92.373123),
    ("CA", 36.116203, -119.681564),
    ("CO", 39.059811, -105.311104),
    ("CT", 41.597782, -72.755371),
    ("DE", 39.318523, -75.507141),
    ("FL", 27.766279, -81.686783),
    ("GA", 33.040619, -83.643074),
    ("HI", 21.094318, -157.498337),
    ("ID", 44.240459, -114.478828),
    ("IL", 40.349457, -88.986137),
    ("IN", 39.849426, -86.258278),
    ("IA", 42.011539, -93.210526),
    ("KS", 38.526600, -96.726486),
    ("KY", 37.668140, -84.670067),
    ("LA", 31.169546, -91.867805),
    ("ME", 44.693947, -69.381927),
    ("MD", 39.063946, -76.802101),
    ("MA", 42.230171, -71.530106),
    ("MI", 43.326618, -84.536095),
    ("MN", 45.694454, -93.900192),
    ("MS", 32.741646, -89.678696),
    ("MO", 38.456085, -92.288368),
    ("MT", 46.921925, -110.454353),
    ("NE", 41.125370, -98.268082),
    ("NV", 38.313515, -117.055374),
    ("NH", 43.452492, -71.563896),
    ("NJ", 40.298904, -74.521011),
    ("NM", 34.840515, -106.248482),
    ("NY", 42.165726, -74.948051),
    ("NC", 35.630066, -79.806419),
    ("ND", 47.528912, -99.784012),
    ("OH", 40.388783, -82.764915),
    ("OK", 35.565342, -96.928917),
    ("OR", 44.572021, -122.070938),
    ("PA", 40.590752, -77.209755),
    ("RI", 41.680893, -71.511780),
    ("SC", 33.856892, -80.945007),
    ("SD", 44.299782, -99.438828),
    ("TN", 35.747845, -86.692345),
    ("TX", 31.054487, -97.563461),
    ("UT", 40.150032, -111.862434),
    ("VT", 44.045876, -72.710686),
    ("VA", 37.769337, -78.169968),
    ("WA", 47.400902, -121.490494),
    ("WV", 38.491226, -80.954456),
    ("WI", 44.268543, -89.616508),
    ("WY", 42.755966, -107.302490),
    ("DC", 38.907192, -77.036873),
];

pub fn state_centroid(code: &str) -> Option<(f64, f64)> {
    STATE_CENTROIDS
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|&(_, lat, lon)| (lat, lon))
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = std::fs::read_to_string(path)?;
    let content = content.trim_start_matches('\u{feff}');
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReportSummary {
    pub states_with_opposition: usize,
    pub contested_projects: usize,
    pub restrictions: usize,
    pub litigation_count: usize,
    pub litigation_pct: f64,
    pub cancellation_pct: f64,
    pub average_capacity_mw: Option<f64>,
}

/// Per-state totals. `intensity` is
/// (restrictions + projects) / (max restrictions + max projects), capped at 1.
#[derive(Debug, Clone, PartialEq)]
pub struct StateOpposition {
    pub state: String,
    pub restrictions: usize,
    pub projects: usize,
    pub intensity: f64,
}

#[derive(Debug, Clone, Default)]
pub struct CountyDetail<'a> {
    pub restrictions: Vec<&'a Restriction>,
    pub projects: Vec<&'a ContestedProject>,
}

#[derive(Debug, Clone, Default)]
pub struct OppositionReport {
    pub restrictions: Vec<Restriction>,
    pub contested: Vec<ContestedProject>,
}

impl OppositionReport {
    pub fn load(config: &Config) -> Result<Self> {
        let restrictions = read_rows(&config.data_path(&config.restrictions_csv))?;
        let contested = read_rows(&config.data_path(&config.contested_csv))?;
        let report = Self {
            restrictions,
            contested,
        };
        tracing::info!(
            "Loaded opposition report: {} restrictions, {} contested projects",
            report.restrictions.len(),
            report.contested.len()
        );
        Ok(report)
    }

    /// Union of the states named by restrictions and contested projects.
    pub fn states(&self) -> BTreeSet<String> {
        self.restrictions
            .iter()
            .map(|r| r.state.trim().to_string())
            .chain(
                self.contested
                    .iter()
                    .flat_map(|c| c.states().map(str::to_string)),
            )
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn summary(&self) -> ReportSummary {
        let contested = self.contested.len();
        let litigation_count = self.contested.iter().filter(|c| c.has_litigation()).count();
        let canceled = self
            .contested
            .iter()
            .filter(|c| c.status.as_deref().map(str::trim) == Some("Canceled"))
            .count();
        let capacities: Vec<f64> = self.contested.iter().filter_map(|c| c.capacity_mw()).collect();
        let pct = |n: usize| {
            if contested == 0 {
                0.0
            } else {
                n as f64 / contested as f64 * 100.0
            }
        };

        ReportSummary {
            states_with_opposition: self.states().len(),
            contested_projects: contested,
            restrictions: self.restrictions.len(),
            litigation_count,
            litigation_pct: pct(litigation_count),
            cancellation_pct: pct(canceled),
            average_capacity_mw: (!capacities.is_empty())
                .then(|| capacities.iter().sum::<f64>() / capacities.len() as f64),
        }
    }

    pub fn state_counts(&self) -> Vec<StateOpposition> {
        let mut counts: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for r in &self.restrictions {
            let state = r.state.trim();
            if !state.is_empty() {
                counts.entry(state.to_string()).or_default().0 += 1;
            }
        }
        for c in &self.contested {
            for state in c.states() {
                counts.entry(state.to_string()).or_default().1 += 1;
            }
        }

        let max_restrictions = counts.values().map(|c| c.0).max().unwrap_or(0);
        let max_projects = counts.values().map(|c| c.1).max().unwrap_or(0);
        let max_total = max_restrictions + max_projects;

        counts
            .into_iter()
            .map(|(state, (restrictions, projects))| {
                let intensity = if max_total > 0 {
                    ((restrictions + projects) as f64 / max_total as f64).min(1.0)
                } else {
                    0.0
                };
                StateOpposition {
                    state,
                    restrictions,
                    projects,
                    intensity,
                }
            })
            .collect()
    }

    /// Counties with any record in `state`, sorted.
    pub fn counties_in(&self, state: &str) -> Vec<String> {
        let restriction_counties = self
            .restrictions
            .iter()
            .filter(|r| r.state.trim() == state)
            .filter_map(|r| r.county.clone());
        let contested_counties = self
            .contested
            .iter()
            .filter(|c| c.states().any(|s| s == state))
            .filter_map(|c| c.county.clone());
        restriction_counties
            .chain(contested_counties)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Records for a state, optionally narrowed to one county.
    pub fn county_detail(&self, state: &str, county: Option<&str>) -> CountyDetail<'_> {
        let county_matches = |c: &Option<String>| {
            county.map_or(true, |wanted| c.as_deref().map(str::trim) == Some(wanted))
        };
        CountyDetail {
            restrictions: self
                .restrictions
                .iter()
                .filter(|r| r.state.trim() == state && county_matches(&r.county))
                .collect(),
            projects: self
                .contested
                .iter()
                .filter(|c| c.states().any(|s| s == state) && county_matches(&c.county))
                .collect(),
        }
    }

    /// (county, state) pairs whose county contains `term`, case-insensitively.
    pub fn search_counties(&self, term: &str) -> Vec<(String, String)> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Vec::new();
        }
        let hit = |county: &Option<String>| {
            county
                .as_deref()
                .map(str::trim)
                .filter(|c| c.to_lowercase().contains(&term))
                .map(str::to_string)
        };

        let mut found = BTreeSet::new();
        for r in &self.restrictions {
            if let Some(county) = hit(&r.county) {
                found.insert((county, r.state.trim().to_string()));
            }
        }
        for c in &self.contested {
            if let Some(county) = hit(&c.county) {
                for state in c.states() {
                    found.insert((county.clone(), state.to_string()));
                }
            }
        }
        found.into_iter().collect()
    }

    pub fn contested_by_type(&self) -> BTreeMap<String, usize> {
        tally(self.contested.iter().map(|c| c.project_type.as_deref()))
    }

    pub fn contested_by_status(&self) -> BTreeMap<String, usize> {
        tally(self.contested.iter().map(|c| c.status.as_deref()))
    }

    pub fn restrictions_by_type(&self) -> BTreeMap<String, usize> {
        tally(self.restrictions.iter().map(|r| r.restriction_type.as_deref()))
    }

    pub fn cancellations_by_year(&self) -> BTreeMap<i32, usize> {
        year_tally(self.contested.iter().map(|c| c.year_cancelled))
    }

    pub fn restrictions_by_year(&self) -> BTreeMap<i32, usize> {
        year_tally(self.restrictions.iter().map(|r| r.year_adopted))
    }
}

fn tally<'a>(values: impl Iterator<Item = Option<&'a str>>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for value in values {
        let key = value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("Unknown");
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
    counts
}

fn year_tally(values: impl Iterator<Item = Option<f64>>) -> BTreeMap<i32, usize> {
    let mut counts = BTreeMap::new();
    for year in values.flatten().filter(|y| y.is_finite()) {
        *counts.entry(year as i32).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESTRICTIONS: &str = "\u{feff}Title,State,County,Type,Status,Year Adopted,Level\n\
        Setback Ordinance,TX,Harris County,Setback,Active,2022,Local\n\
        Solar Moratorium,TX,Travis County,Moratorium,Active,2023.0,Local\n\
        Siting Law,OH,,Siting,Active,,State\n";

    const CONTESTED: &str = "Title,State,County,Type,Status,Capacity,Content,Year Cancelled,Litigation\n\
        Grain Belt,KS|MO,Multiple,Transmission,Delayed,,Line,,Yes\n\
        Lone Star Solar,TX,Harris County,Solar,Canceled,200,Farm,2021,No\n\
        Birch Solar,OH,Allen County,Solar,Canceled,300,Farm,2022,Yes\n";

    fn fixture() -> (tempfile::TempDir, OppositionReport) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2025-Restrictions.csv"), RESTRICTIONS).unwrap();
        std::fs::write(dir.path().join("2025-Contested-Projects.csv"), CONTESTED).unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let report = OppositionReport::load(&config).unwrap();
        (dir, report)
    }

    #[test]
    fn loads_with_bom_and_lenient_years() {
        let (_dir, report) = fixture();
        assert_eq!(report.restrictions.len(), 3);
        assert_eq!(report.restrictions[0].title, "Setback Ordinance");
        assert_eq!(report.restrictions[1].year_adopted, Some(2023.0));
        assert_eq!(report.restrictions[2].year_adopted, None);
    }

    #[test]
    fn summary_counts_union_of_states() {
        let (_dir, report) = fixture();
        let summary = report.summary();
        assert_eq!(summary.states_with_opposition, 4);
        assert_eq!(summary.litigation_count, 2);
        assert!((summary.cancellation_pct - 66.666).abs() < 0.01);
        assert_eq!(summary.average_capacity_mw, Some(250.0));
    }

    #[test]
    fn multi_state_rows_count_for_each_state() {
        let (_dir, report) = fixture();
        let states = report.state_counts();
        let get = |code: &str| states.iter().find(|s| s.state == code).unwrap().clone();

        assert_eq!(get("KS").projects, 1);
        assert_eq!(get("MO").projects, 1);
        let tx = get("TX");
        assert_eq!((tx.restrictions, tx.projects), (2, 1));
        // max restrictions 2 + max projects 1
        assert!((tx.intensity - 1.0).abs() < f64::EPSILON);
        assert!((get("KS").intensity - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn county_drill_down_and_search() {
        let (_dir, report) = fixture();
        assert_eq!(report.counties_in("TX"), vec!["Harris County", "Travis County"]);

        let harris = report.county_detail("TX", Some("Harris County"));
        assert_eq!(harris.restrictions.len(), 1);
        assert_eq!(harris.projects.len(), 1);
        let all_tx = report.county_detail("TX", None);
        assert_eq!(all_tx.restrictions.len(), 2);

        assert_eq!(
            report.search_counties("county"),
            vec![
                ("Allen County".to_string(), "OH".to_string()),
                ("Harris County".to_string(), "TX".to_string()),
                ("Travis County".to_string(), "TX".to_string()),
            ]
        );
        assert!(report.search_counties("  ").is_empty());
    }

    #[test]
    fn tallies_fill_unknown_and_years() {
        let (_dir, report) = fixture();
        assert_eq!(report.contested_by_type().get("Solar"), Some(&2));
        assert_eq!(report.cancellations_by_year(), BTreeMap::from([(2021, 1), (2022, 1)]));
        assert_eq!(report.restrictions_by_year().get(&2023), Some(&1));
        assert_eq!(state_centroid("DC"), Some((38.907192, -77.036873)));
    }
}
