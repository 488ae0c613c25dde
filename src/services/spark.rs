use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;

use crate::error::Result;
use crate::models::Sentiment;

const DEFAULT_MORATORIA: &str = "No mentions of moratoria";

/// County-level sentiment pulled from a bulk county report.
#[derive(Debug, Clone, PartialEq)]
pub struct CountySentiment {
    pub sentiment: Sentiment,
    pub sentiment_detail: Option<String>,
    pub moratoria: Option<String>,
    pub recent_projects: Option<String>,
}

/// Looks up `county` in the first `spark_bulk_report_<STATE>_counties_*.csv`
/// under `reports_dir`. The county matches when the report's county cell
/// contains it, case-insensitively, with any " County" suffix dropped.
pub fn county_sentiment(reports_dir: &Path, state: &str, county: &str) -> Result<Option<CountySentiment>> {
    let pattern = reports_dir.join(format!(
        "spark_bulk_report_{}_counties_*.csv",
        state.trim().to_uppercase()
    ));
    let pattern = pattern.to_string_lossy();

    let mut files: Vec<_> = glob::glob(&pattern)?.filter_map(|entry| entry.ok()).collect();
    files.sort();
    let Some(file) = files.first() else {
        tracing::debug!("No county report matches {}", pattern);
        return Ok(None);
    };

    let lowered = county.trim().to_lowercase();
    let needle = lowered.strip_suffix(" county").unwrap_or(&lowered).trim();
    if needle.is_empty() {
        return Ok(None);
    }

    let mut reader = csv::Reader::from_path(file)
        .with_context(|| format!("opening county report {}", file.display()))?;
    let headers = reader.headers()?.clone();
    let columns: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim_start_matches('\u{feff}').trim(), i))
        .collect();

    let Some(&county_col) = columns.get("County") else {
        tracing::warn!("County report {} has no County column", file.display());
        return Ok(None);
    };

    for record in reader.records() {
        let record = record?;
        let cell = record.get(county_col).unwrap_or_default().to_lowercase();
        if !cell.contains(needle) {
            continue;
        }

        let pick = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| columns.get(name).and_then(|&i| record.get(i)))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        tracing::info!("Matched county {} in {}", county, file.display());
        return Ok(Some(CountySentiment {
            sentiment: pick(&["Sentiment", "Overall_Sentiment"])
                .map(|s| Sentiment::parse(&s))
                .unwrap_or_default(),
            sentiment_detail: pick(&["Sentiment Detail", "Summary"]),
            moratoria: pick(&["Mentions of Moratoria", "Moratoria_Mentions"])
                .or_else(|| Some(DEFAULT_MORATORIA.to_string())),
            recent_projects: pick(&["Recent Projects", "Recent_Projects"]),
        }));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[test]
    fn matches_county_without_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("spark_bulk_report_TX_counties_2025.csv"),
            "County,Overall_Sentiment,Summary,Recent_Projects\n\
             Travis County,GOOD,Supportive board,\n\
             Harris County,BAD,Packed hearings,Solar A; Wind B\n",
        )
        .unwrap();

        let found = county_sentiment(dir.path(), "tx", "Harris County")
            .unwrap()
            .unwrap();
        assert_eq!(found.sentiment, Sentiment::Bad);
        assert_eq!(found.sentiment_detail.as_deref(), Some("Packed hearings"));
        assert_eq!(found.moratoria.as_deref(), Some(DEFAULT_MORATORIA));
        assert_eq!(found.recent_projects.as_deref(), Some("Solar A; Wind B"));
    }

    #[test]
    fn preferred_columns_win_over_alternates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("spark_bulk_report_CA_counties_a.csv"),
            "County,Sentiment,Overall_Sentiment,Mentions of Moratoria\n\
             Kern,MIXED,BAD,Six-month moratorium adopted\n",
        )
        .unwrap();

        let found = county_sentiment(dir.path(), "CA", "kern county")
            .unwrap()
            .unwrap();
        assert_eq!(found.sentiment, Sentiment::Mixed);
        assert_eq!(found.moratoria.as_deref(), Some("Six-month moratorium adopted"));
    }

    #[test]
    fn county_suffix_is_stripped_in_any_case() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("spark_bulk_report_CO_counties_x.csv"),
            "County,Sentiment\nWeld,BAD\n",
        )
        .unwrap();

        for query in ["weld county", "WELD COUNTY", " Weld County "] {
            let found = assert_ok!(county_sentiment(dir.path(), "co", query));
            assert_eq!(found.map(|c| c.sentiment), Some(Sentiment::Bad), "{query}");
        }
    }

    #[test]
    fn missing_report_or_county_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(assert_ok!(county_sentiment(dir.path(), "NV", "Clark")).is_none());

        std::fs::write(
            dir.path().join("spark_bulk_report_NV_counties_1.csv"),
            "County,Sentiment\nWashoe,GOOD\n",
        )
        .unwrap();
        assert!(assert_ok!(county_sentiment(dir.path(), "NV", "Clark")).is_none());
    }
}
