use super::SearchEngine;
use crate::hosting::RepositoryRecord;
use chrono::{DateTime, Utc};
use core::cmp::Ordering;

/// Weight of a description match relative to a README match.
const DESCRIPTION_WEIGHT: f64 = 10.0;

/// One search hit over a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub url: String,
    pub description_score: f64,
    pub readme_score: f64,
    pub ranking: f64,
}

/// Restricts which records take part in a search.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Accepted languages, compared case-insensitively. Empty accepts every record.
    pub languages: Vec<String>,

    /// Only records updated at or after this instant.
    pub active_since: Option<DateTime<Utc>>,
}

impl SearchFilter {
    #[must_use]
    pub fn accepts(&self, record: &RepositoryRecord) -> bool {
        let language_ok = self.languages.is_empty()
            || record
                .language
                .as_deref()
                .is_some_and(|lang| self.languages.iter().any(|l| l.eq_ignore_ascii_case(lang)));

        let activity_ok = self.active_since.is_none_or(|since| record.latest_update >= since);

        language_ok && activity_ok
    }
}

/// Two BM25 indexes over a dataset: one on descriptions, one on READMEs.
#[derive(Debug, Clone, Default)]
pub struct ListingSearch {
    descriptions: SearchEngine,
    readmes: SearchEngine,
}

impl ListingSearch {
    /// Index the records accepted by `filter`, keyed by repository URL.
    ///
    /// Missing descriptions and READMEs are simply not indexed.
    pub fn from_records<'a, I>(records: I, filter: &SearchFilter) -> Self
    where
        I: IntoIterator<Item = &'a RepositoryRecord>,
    {
        let mut search = Self::default();
        for record in records.into_iter().filter(|r| filter.accepts(r)) {
            if let Some(description) = &record.description {
                search.descriptions.index(&record.url, description);
            }
            if let Some(readme) = &record.readme {
                search.readmes.index(&record.url, readme);
            }
        }
        search
    }

    #[must_use]
    pub fn document_count(&self) -> usize {
        self.descriptions.document_count().max(self.readmes.document_count())
    }

    /// Rank every matching repository, best first. Ties are ordered by URL.
    #[must_use]
    pub fn rank(&self, query: &str) -> Vec<RankedResult> {
        let mut by_description = self.descriptions.search(query);
        let by_readme = self.readmes.search(query);

        let with_readme: Vec<_> = by_readme
            .into_iter()
            .map(|(url, readme_score)| {
                let description_score = by_description.remove(&url).unwrap_or(0.0);
                (url, description_score, readme_score)
            })
            .collect();

        let mut results: Vec<RankedResult> = with_readme
            .into_iter()
            .chain(by_description.into_iter().map(|(url, score)| (url, score, 0.0)))
            .map(|(url, description_score, readme_score)| RankedResult {
                url,
                description_score,
                readme_score,
                ranking: DESCRIPTION_WEIGHT.mul_add(description_score, readme_score),
            })
            .collect();

        results.sort_by(|a, b| match b.ranking.total_cmp(&a.ranking) {
            Ordering::Equal => a.url.cmp(&b.url),
            other => other,
        });
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(url: &str, description: Option<&str>, readme: Option<&str>, language: Option<&str>) -> RepositoryRecord {
        RepositoryRecord {
            id: url.trim_start_matches("https://github.com/").to_string(),
            name: url.rsplit('/').next().unwrap_or_default().to_string(),
            organisation: None,
            url: url.to_string(),
            website: None,
            description: description.map(str::to_string),
            license: None,
            language: language.map(str::to_string),
            latest_update: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            last_commit: None,
            open_pull_requests: None,
            master_branch: None,
            readme: readme.map(str::to_string),
            is_fork: false,
            forked_from: None,
            raw_details: serde_json::Value::Null,
        }
    }

    #[test]
    fn description_hits_outweigh_readme_hits() {
        let records = [
            record("https://github.com/acme/a", Some("solar forecasting"), Some("weather tools"), None),
            record("https://github.com/acme/b", Some("weather tools"), Some("solar forecasting"), None),
            record("https://github.com/acme/c", Some("battery"), None, None),
        ];
        let search = ListingSearch::from_records(&records, &SearchFilter::default());

        let results = search.rank("solar");
        let urls: Vec<_> = results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, ["https://github.com/acme/a", "https://github.com/acme/b"]);

        let top = &results[0];
        assert!((top.ranking - 10.0 * top.description_score).abs() < 1e-9);
        assert!(top.readme_score.abs() < f64::EPSILON);
    }

    #[test]
    fn match_in_both_indexes_is_one_result() {
        let records = [record("https://github.com/acme/a", Some("solar"), Some("solar panels"), None)];
        let search = ListingSearch::from_records(&records, &SearchFilter::default());

        let results = search.rank("solar");
        assert_eq!(results.len(), 1);

        let hit = &results[0];
        assert!(hit.description_score > 0.0);
        assert!(hit.readme_score > 0.0);
        assert!((hit.ranking - DESCRIPTION_WEIGHT.mul_add(hit.description_score, hit.readme_score)).abs() < 1e-9);
    }

    #[test]
    fn description_only_match_is_kept() {
        let records = [
            record("https://github.com/acme/a", Some("hydrogen storage"), Some("unrelated"), None),
            record("https://github.com/acme/b", Some("solar"), None, None),
        ];
        let search = ListingSearch::from_records(&records, &SearchFilter::default());

        let results = search.rank("hydrogen");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://github.com/acme/a");
        assert!(results[0].description_score > 0.0);
        assert!(results[0].readme_score.abs() < f64::EPSILON);
    }

    #[test]
    fn ties_are_ordered_by_url() {
        let records = [
            record("https://github.com/acme/z", Some("grid"), None, None),
            record("https://github.com/acme/m", Some("grid"), None, None),
        ];
        let search = ListingSearch::from_records(&records, &SearchFilter::default());

        let urls: Vec<_> = search.rank("grid").into_iter().map(|r| r.url).collect();
        assert_eq!(urls, ["https://github.com/acme/m", "https://github.com/acme/z"]);
    }

    #[test]
    fn unmatched_query_is_empty() {
        let records = [record("https://github.com/acme/a", Some("solar"), Some("solar"), None)];
        let search = ListingSearch::from_records(&records, &SearchFilter::default());

        assert!(search.rank("hydrogen").is_empty());
        assert!(search.rank("").is_empty());
    }

    #[test]
    fn filters_restrict_indexed_records() {
        let mut stale = record("https://github.com/acme/old", Some("solar"), None, Some("Python"));
        stale.latest_update = Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap();
        let records = [
            stale,
            record("https://github.com/acme/py", Some("solar"), None, Some("Python")),
            record("https://github.com/acme/rs", Some("solar"), None, Some("Rust")),
        ];

        let filter = SearchFilter {
            languages: vec!["python".to_string()],
            active_since: Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()),
        };
        let search = ListingSearch::from_records(&records, &filter);

        let urls: Vec<_> = search.rank("solar").into_iter().map(|r| r.url).collect();
        assert_eq!(urls, ["https://github.com/acme/py"]);
        assert_eq!(search.document_count(), 1);
    }
}
