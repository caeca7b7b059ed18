//! Activity heatmap layout.
//!
//! Pure date arithmetic shared by the heatmap screen and the `activity`
//! subcommand: weeks become columns, weekdays rows (Sunday first), and every
//! day in the range gets a cell even when the backend reported no activity
//! for it.

use std::collections::HashMap;

use chrono::{Datelike, Duration, Months, NaiveDate};

use crate::api::models::{activity_level, ActivityDay};

/// One day in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub count: i64,
    /// 0-4 intensity, 0 meaning no reviews that day.
    pub level: u8,
}

/// Calendar grid for a trailing window of months.
#[derive(Debug, Clone)]
pub struct HeatmapGrid {
    /// One entry per week, oldest first; seven slots each, Sunday first.
    /// `None` pads days outside the requested range.
    pub weeks: Vec<[Option<DayCell>; 7]>,
    /// `(week index, label)` for each column where a new month begins.
    pub months: Vec<(usize, String)>,
}

impl HeatmapGrid {
    /// Lay out the trailing `months` months ending at `today`.
    pub fn build(days: &[ActivityDay], today: NaiveDate, months: u32) -> Self {
        let mut counts: HashMap<NaiveDate, i64> = HashMap::new();
        for day in days {
            if let Some(date) = day.date_at() {
                counts.insert(date.date_naive(), day.count);
            }
        }

        let start = today
            .checked_sub_months(Months::new(months))
            .unwrap_or(today);
        // Columns start on Sunday; walk back to the one on or before `start`.
        let lead = start.weekday().num_days_from_sunday() as i64;
        let mut cursor = start - Duration::days(lead);

        let mut weeks: Vec<[Option<DayCell>; 7]> = Vec::new();
        let mut week: [Option<DayCell>; 7] = [None; 7];
        while cursor <= today {
            let slot = cursor.weekday().num_days_from_sunday() as usize;
            if cursor >= start {
                let count = counts.get(&cursor).copied().unwrap_or(0);
                week[slot] = Some(DayCell {
                    date: cursor,
                    count,
                    level: activity_level(count),
                });
            }
            if slot == 6 {
                weeks.push(week);
                week = [None; 7];
            }
            cursor += Duration::days(1);
        }
        if week.iter().any(|cell| cell.is_some()) {
            weeks.push(week);
        }

        let months = month_starts(&weeks);
        Self { weeks, months }
    }

    /// Total reviews across the whole window.
    pub fn total_reviews(&self) -> i64 {
        self.weeks
            .iter()
            .flatten()
            .flatten()
            .map(|cell| cell.count)
            .sum()
    }
}

fn month_starts(weeks: &[[Option<DayCell>; 7]]) -> Vec<(usize, String)> {
    let mut labels = Vec::new();
    let mut last = None;
    for (index, week) in weeks.iter().enumerate() {
        let Some(first) = week.iter().flatten().next() else {
            continue;
        };
        let month = (first.date.year(), first.date.month());
        if last != Some(month) {
            labels.push((index, first.date.format("%b").to_string()));
            last = Some(month);
        }
    }
    labels
}
