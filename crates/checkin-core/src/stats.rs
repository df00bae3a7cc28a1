//! Dashboard numbers: streaks and chart series.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{CheckInWithAnswers, Id, User};
use crate::week::format_week;

/// Number of consecutive weeks ending at the latest week in `weeks`.
///
/// Duplicate weeks count once. Counting walks backwards from the most recent
/// week and stops at the first step that is not exactly seven days.
pub fn streak<I>(weeks: I) -> u32
where
    I: IntoIterator<Item = NaiveDate>,
{
    let weeks: BTreeSet<NaiveDate> = weeks.into_iter().collect();
    let mut newest_first = weeks.iter().rev();
    let Some(mut prev) = newest_first.next() else {
        return 0;
    };

    let mut count = 1;
    for week in newest_first {
        if (*prev - *week).num_days() != 7 {
            break;
        }
        count += 1;
        prev = week;
    }
    count
}

/// Numeric value of a scale answer. Non-integers yield `None`.
pub fn parse_scale(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}

/// Labels and values of one user's scale answers over time.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ChartSeries {
    /// Week labels, oldest first.
    pub labels: Vec<String>,
    /// One value per label; `None` marks an unparseable answer.
    pub values: Vec<Option<i64>>,
}

impl ChartSeries {
    /// True when there is nothing to plot.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Builds the dashboard chart for the given scale question.
///
/// Check-ins without an answer to the question are left out entirely; answers
/// that do not parse as integers become gaps.
pub fn user_series(checkins: &[CheckInWithAnswers], scale_question: Id) -> ChartSeries {
    let mut ordered: Vec<&CheckInWithAnswers> = checkins.iter().collect();
    ordered.sort_by_key(|c| (c.checkin.week_start, c.checkin.id));

    let mut series = ChartSeries::default();
    for c in ordered {
        if let Some(answer) = c.answer_for(scale_question) {
            series.labels.push(format_week(c.checkin.week_start));
            series.values.push(parse_scale(&answer.value));
        }
    }
    series
}

/// One user's line on the combined chart.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NamedSeries {
    /// User's display name.
    pub name: String,
    /// One value per week label of the chart.
    pub values: Vec<Option<i64>>,
}

/// Combined chart: one line per user over the union of all weeks.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CoupleChart {
    /// Week labels, oldest first.
    pub labels: Vec<String>,
    /// One line per user.
    pub series: Vec<NamedSeries>,
}

/// Builds the combined chart.
///
/// Labels cover every week any user checked in, whether or not the scale
/// question was answered. Within a week the answer from the newest check-in
/// (highest id) carrying one wins.
pub fn couple_series(
    users: &[(User, Vec<CheckInWithAnswers>)],
    scale_question: Id,
) -> CoupleChart {
    let weeks: BTreeSet<NaiveDate> = users
        .iter()
        .flat_map(|(_, checkins)| checkins.iter().map(|c| c.checkin.week_start))
        .collect();

    let series = users
        .iter()
        .map(|(user, checkins)| {
            let mut ordered: Vec<&CheckInWithAnswers> = checkins.iter().collect();
            ordered.sort_by_key(|c| c.checkin.id);

            let mut by_week: BTreeMap<NaiveDate, Option<i64>> = BTreeMap::new();
            for c in ordered {
                if let Some(answer) = c.answer_for(scale_question) {
                    by_week.insert(c.checkin.week_start, parse_scale(&answer.value));
                }
            }

            NamedSeries {
                name: user.name.clone(),
                values: weeks
                    .iter()
                    .map(|w| by_week.get(w).copied().flatten())
                    .collect(),
            }
        })
        .collect();

    CoupleChart {
        labels: weeks.iter().copied().map(format_week).collect(),
        series,
    }
}
