//! Daily star series: aggregation from raw events and loading from CSV.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DateRange;

/// One stargazer and the moment they starred the repository.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StarEvent {
    pub starred_at: DateTime<Utc>,
    pub user: String,
}

/// Daily aggregate as written by `fetch` and `aggregate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStars {
    pub date: NaiveDate,
    pub new_stars: u64,
    pub total_stars: u64,
}

/// A single analysis row.
///
/// Loaded from either CSV layout: `date,new_stars,total_stars` from the
/// fetcher or `date,stars[,total_stars][,z_score]` from a previous
/// analysis run. `total_stars` is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarDay {
    pub date: NaiveDate,
    #[serde(alias = "new_stars")]
    pub stars: u64,
    #[serde(default)]
    pub total_stars: Option<u64>,
    #[serde(default)]
    pub z_score: Option<f64>,
}

impl StarDay {
    pub fn new(date: NaiveDate, stars: u64) -> Self {
        Self {
            date,
            stars,
            total_stars: None,
            z_score: None,
        }
    }
}

/// Buckets events by UTC calendar day and attaches running totals.
pub fn aggregate_stars_by_date(events: &[StarEvent]) -> Vec<DailyStars> {
    let mut daily_counts: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for event in events {
        *daily_counts.entry(event.starred_at.date_naive()).or_default() += 1;
    }

    let mut cumulative = 0;
    daily_counts
        .into_iter()
        .map(|(date, new_stars)| {
            cumulative += new_stars;
            DailyStars {
                date,
                new_stars,
                total_stars: cumulative,
            }
        })
        .collect()
}

/// Loads a daily CSV and sorts it by date.
pub fn load_star_data(path: impl AsRef<Path>) -> Result<Vec<StarDay>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut days = read_star_days(file).with_context(|| format!("reading {}", path.display()))?;
    days.sort_by_key(|d| d.date);
    debug!(path = %path.display(), rows = days.len(), "Loaded star series");
    Ok(days)
}

pub(crate) fn read_star_days<R: std::io::Read>(reader: R) -> Result<Vec<StarDay>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut days = Vec::new();
    for result in rdr.deserialize() {
        let record: StarDay = result?;
        days.push(record);
    }
    Ok(days)
}

/// Days whose date falls inside `range`, in series order.
pub fn in_period<'a>(series: &'a [StarDay], range: &'a DateRange) -> impl Iterator<Item = &'a StarDay> {
    series.iter().filter(move |d| range.contains(d.date))
}

/// Running sum of `stars` over the series.
pub fn cumulative_stars(series: &[StarDay]) -> Vec<u64> {
    series
        .iter()
        .scan(0u64, |acc, d| {
            *acc += d.stars;
            Some(*acc)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(y: i32, m: u32, d: u32, h: u32, user: &str) -> StarEvent {
        StarEvent {
            starred_at: Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap(),
            user: user.to_string(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_aggregate_running_totals() {
        let mut events: Vec<_> = (0..5).map(|i| event(2023, 1, 1, i, "a")).collect();
        events.extend((0..3).map(|i| event(2023, 1, 2, i, "b")));

        let daily = aggregate_stars_by_date(&events);

        assert_eq!(
            daily,
            vec![
                DailyStars { date: date(2023, 1, 1), new_stars: 5, total_stars: 5 },
                DailyStars { date: date(2023, 1, 2), new_stars: 3, total_stars: 8 },
            ]
        );
    }

    #[test]
    fn test_aggregate_sorts_unordered_events() {
        let events = vec![
            event(2023, 3, 1, 10, "late"),
            event(2023, 1, 1, 23, "early"),
            event(2023, 3, 1, 1, "late2"),
        ];
        let daily = aggregate_stars_by_date(&events);
        let dates: Vec<_> = daily.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![date(2023, 1, 1), date(2023, 3, 1)]);
        assert_eq!(daily.last().unwrap().total_stars, 3);
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate_stars_by_date(&[]).is_empty());
    }

    #[test]
    fn test_read_fetcher_layout_renames_new_stars() {
        let csv = "date,new_stars,total_stars\n2023-01-02,3,8\n2023-01-01,5,5\n";
        let days = read_star_days(csv.as_bytes()).unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].stars, 3);
        assert_eq!(days[0].total_stars, Some(8));
        assert_eq!(days[0].z_score, None);
    }

    #[test]
    fn test_read_zscore_layout() {
        let csv = "date,stars,z_score\n2023-01-01,5,0.5\n2023-01-02,50,inf\n";
        let days = read_star_days(csv.as_bytes()).unwrap();
        assert_eq!(days[0].total_stars, None);
        assert_eq!(days[0].z_score, Some(0.5));
        assert_eq!(days[1].z_score, Some(f64::INFINITY));
    }

    #[test]
    fn test_read_rejects_missing_star_column() {
        let csv = "date,forks\n2023-01-01,5\n";
        assert!(read_star_days(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_load_sorts_by_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily.csv");
        std::fs::write(&path, "date,new_stars,total_stars\n2023-01-02,3,8\n2023-01-01,5,5\n")
            .unwrap();

        let days = load_star_data(&path).unwrap();
        assert_eq!(days[0].date, date(2023, 1, 1));
        assert_eq!(cumulative_stars(&days), vec![5, 8]);
    }

    #[test]
    fn test_in_period_is_inclusive() {
        let series: Vec<_> = (1..=5).map(|d| StarDay::new(date(2023, 1, d), d as u64)).collect();
        let range = DateRange::new(date(2023, 1, 2), date(2023, 1, 4)).unwrap();
        let stars: Vec<_> = in_period(&series, &range).map(|d| d.stars).collect();
        assert_eq!(stars, vec![2, 3, 4]);
    }
}
