// Filtered, newest-first views over absence records

use chrono::{Datelike, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::record::AbsenceRecord;

/// Class and month filters for a view. Empty strings mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterState {
    /// Exact class name
    pub class_name: String,
    /// Calendar month as `YYYY-MM`
    pub month: String,
}

impl FilterState {
    pub fn new(class_name: impl Into<String>, month: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            month: month.into(),
        }
    }

    /// Check a `YYYY-MM` month value, for use as a CLI value parser
    pub fn parse_month(s: &str) -> Result<String, String> {
        let valid = s.len() == 7 && NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").is_ok();
        if valid {
            Ok(s.to_string())
        } else {
            Err(format!("Invalid month: {} (expected YYYY-MM)", s))
        }
    }

    fn matches<Tz: TimeZone>(&self, record: &AbsenceRecord, tz: &Tz) -> bool {
        let class_ok = self.class_name.is_empty() || record.class_name == self.class_name;
        class_ok && (self.month.is_empty() || month_key(record, tz) == self.month)
    }
}

/// `YYYY-MM` of the record's date in `tz`
pub fn month_key<Tz: TimeZone>(record: &AbsenceRecord, tz: &Tz) -> String {
    let date = record.date.with_timezone(tz);
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Records matching both filters, most recently created first, using local time
pub fn compute_view<'a>(records: &'a [AbsenceRecord], filters: &FilterState) -> Vec<&'a AbsenceRecord> {
    compute_view_in(records, filters, &Local)
}

/// Records matching both filters with months taken in `tz`, most recently created first
pub fn compute_view_in<'a, Tz: TimeZone>(
    records: &'a [AbsenceRecord],
    filters: &FilterState,
    tz: &Tz,
) -> Vec<&'a AbsenceRecord> {
    let mut view: Vec<&AbsenceRecord> = records.iter().filter(|r| filters.matches(r, tz)).collect();
    view.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    view
}

/// Remembers the last view and recomputes only when the store revision or filters change
#[derive(Debug)]
pub struct ViewCache<Tz: TimeZone = Local> {
    tz: Tz,
    key: Option<(u64, FilterState)>,
    positions: Vec<usize>,
    recomputations: usize,
}

impl Default for ViewCache<Local> {
    fn default() -> Self {
        Self::new(Local)
    }
}

impl<Tz: TimeZone> ViewCache<Tz> {
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            key: None,
            positions: Vec::new(),
            recomputations: 0,
        }
    }

    /// View of `records` at `revision`. `records` must be the collection that
    /// `revision` was taken from.
    pub fn view<'a>(
        &mut self,
        revision: u64,
        records: &'a [AbsenceRecord],
        filters: &FilterState,
    ) -> Vec<&'a AbsenceRecord> {
        let fresh = matches!(&self.key, Some((rev, f)) if *rev == revision && f == filters);
        if !fresh {
            let mut positions: Vec<usize> = (0..records.len())
                .filter(|&i| filters.matches(&records[i], &self.tz))
                .collect();
            positions.sort_by(|&a, &b| records[b].timestamp.cmp(&records[a].timestamp));
            self.positions = positions;
            self.key = Some((revision, filters.clone()));
            self.recomputations += 1;
        }

        self.positions.iter().filter_map(|&i| records.get(i)).collect()
    }

    /// How many times the view has actually been recomputed
    pub fn recomputations(&self) -> usize {
        self.recomputations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::AbsenceType;
    use chrono::{FixedOffset, Utc};

    fn record(id: &str, class_name: &str, date: &str, timestamp: i64) -> AbsenceRecord {
        AbsenceRecord {
            id: id.to_string(),
            student_name: format!("Siswa {}", id),
            class_name: class_name.to_string(),
            absence_type: AbsenceType::Sick,
            reason: "Sakit perut".to_string(),
            date: date.parse().unwrap(),
            proof_image: None,
            timestamp,
            status: None,
        }
    }

    fn wib() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn ids(view: &[&AbsenceRecord]) -> Vec<String> {
        view.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn test_unfiltered_sorted_by_creation_not_date() {
        // "late" describes an earlier day but was entered last
        let records = vec![
            record("early", "1", "2024-03-20T00:00:00Z", 1000),
            record("late", "1", "2024-01-02T00:00:00Z", 3000),
            record("middle", "2", "2024-02-10T00:00:00Z", 2000),
        ];

        let view = compute_view_in(&records, &FilterState::default(), &Utc);
        assert_eq!(ids(&view), vec!["late", "middle", "early"]);
    }

    #[test]
    fn test_class_filter_exact_match() {
        let records = vec![
            record("a", "1", "2024-03-05T00:00:00Z", 1),
            record("b", "1A", "2024-03-05T00:00:00Z", 2),
            record("c", "1", "2024-03-05T00:00:00Z", 3),
        ];

        let view = compute_view_in(&records, &FilterState::new("1", ""), &Utc);
        assert_eq!(ids(&view), vec!["c", "a"]);
    }

    #[test]
    fn test_month_filter_uses_given_time_zone() {
        // 2024-03-31 20:00 UTC is already April 1st in WIB (UTC+7)
        let records = vec![record("edge", "1", "2024-03-31T20:00:00Z", 1)];

        let march = FilterState::new("", "2024-03");
        let april = FilterState::new("", "2024-04");

        assert_eq!(compute_view_in(&records, &march, &Utc).len(), 1);
        assert_eq!(compute_view_in(&records, &march, &wib()).len(), 0);
        assert_eq!(compute_view_in(&records, &april, &wib()).len(), 1);
    }

    #[test]
    fn test_combined_filters_intersect() {
        let records = vec![
            record("a", "1A", "2024-03-05T03:00:00Z", 1),
            record("b", "1B", "2024-03-10T03:00:00Z", 2),
            record("c", "1A", "2024-04-01T03:00:00Z", 3),
        ];

        let view = compute_view_in(&records, &FilterState::new("1A", "2024-03"), &wib());
        assert_eq!(ids(&view), vec!["a"]);
    }

    #[test]
    fn test_malformed_month_matches_nothing() {
        let records = vec![record("a", "1", "2024-03-05T00:00:00Z", 1)];
        assert!(compute_view_in(&records, &FilterState::new("", "2024-3"), &Utc).is_empty());
    }

    #[test]
    fn test_view_does_not_mutate_input() {
        let records = vec![
            record("a", "1", "2024-03-05T00:00:00Z", 1),
            record("b", "1", "2024-03-06T00:00:00Z", 2),
        ];
        let before = records.clone();
        let filters = FilterState::new("1", "2024-03");

        let first = ids(&compute_view_in(&records, &filters, &Utc));
        let second = ids(&compute_view_in(&records, &filters, &Utc));

        assert_eq!(first, second);
        assert_eq!(records, before);
        assert_eq!(filters, FilterState::new("1", "2024-03"));
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(FilterState::parse_month("2024-03").unwrap(), "2024-03");
        assert!(FilterState::parse_month("2024-13").is_err());
        assert!(FilterState::parse_month("2024-3").is_err());
        assert!(FilterState::parse_month("March").is_err());
    }

    #[test]
    fn test_view_cache_recomputes_on_change_only() {
        let records = vec![
            record("a", "1", "2024-03-05T00:00:00Z", 1),
            record("b", "2", "2024-03-06T00:00:00Z", 2),
        ];
        let mut cache = ViewCache::new(Utc);
        let all = FilterState::default();

        assert_eq!(ids(&cache.view(1, &records, &all)), vec!["b", "a"]);
        assert_eq!(ids(&cache.view(1, &records, &all)), vec!["b", "a"]);
        assert_eq!(cache.recomputations(), 1);

        let class_two = FilterState::new("2", "");
        assert_eq!(ids(&cache.view(1, &records, &class_two)), vec!["b"]);
        assert_eq!(cache.recomputations(), 2);

        let mut grown = records.clone();
        grown.insert(0, record("c", "2", "2024-03-07T00:00:00Z", 3));
        assert_eq!(ids(&cache.view(2, &grown, &class_two)), vec!["c", "b"]);
        assert_eq!(cache.recomputations(), 3);
    }

    #[test]
    fn test_view_cache_matches_compute_view() {
        let records = vec![
            record("a", "1", "2024-03-05T00:00:00Z", 5),
            record("b", "1", "2024-04-06T00:00:00Z", 9),
            record("c", "2", "2024-03-07T00:00:00Z", 7),
        ];
        let filters = FilterState::new("", "2024-03");
        let mut cache = ViewCache::new(wib());

        assert_eq!(
            ids(&cache.view(0, &records, &filters)),
            ids(&compute_view_in(&records, &filters, &wib()))
        );
    }
}
