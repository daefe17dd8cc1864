//! Six-week month grids and the cursor that picks which month is shown.

use crate::date_key::DateKey;
use chrono::{Datelike, NaiveDate};

pub const WEEKS_PER_GRID: usize = 6;
pub const DAYS_PER_WEEK: usize = 7;
pub const WEEKDAY_LABELS: [&str; DAYS_PER_WEEK] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];

/// Which month a grid cell belongs to, relative to the displayed month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Membership {
    Previous,
    Current,
    Next,
}

impl Membership {
    /// Offset in months from the displayed month.
    pub fn month_offset(self) -> i32 {
        match self {
            Membership::Previous => -1,
            Membership::Current => 0,
            Membership::Next => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DayCell {
    pub day: u32,
    pub membership: Membership,
}

impl DayCell {
    pub fn new(day: u32, membership: Membership) -> Self {
        DayCell { day, membership }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthStep {
    Previous,
    Next,
}

/// The displayed `(year, month)` pair. `month0` is always in `0..=11`, and
/// the year stays one inside the representable range so the months on either
/// side of any grid exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthCursor {
    year: i32,
    month0: u32,
}

impl MonthCursor {
    /// Normalizes out-of-range months into the neighbouring years.
    pub fn new(year: i32, month0: i32) -> Self {
        Self::clamped(
            year.saturating_add(month0.div_euclid(12)),
            month0.rem_euclid(12) as u32,
        )
    }

    pub fn of(date: DateKey) -> Self {
        Self::clamped(date.year(), date.month0())
    }

    fn clamped(year: i32, month0: u32) -> Self {
        let (lowest, highest) = year_bounds();
        MonthCursor {
            year: year.clamp(lowest, highest),
            month0,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month0(&self) -> u32 {
        self.month0
    }

    /// Moves one month. At the edges of the calendar range the cursor stays.
    pub fn step(self, step: MonthStep) -> Self {
        let (year, month0) = match step {
            MonthStep::Previous if self.month0 == 0 => (self.year - 1, 11),
            MonthStep::Previous => (self.year, self.month0 - 1),
            MonthStep::Next if self.month0 == 11 => (self.year + 1, 0),
            MonthStep::Next => (self.year, self.month0 + 1),
        };
        let (lowest, highest) = year_bounds();
        if year < lowest || year > highest {
            return self;
        }
        MonthCursor { year, month0 }
    }

    pub fn first_day(&self) -> DateKey {
        DateKey::from_parts(self.year, self.month0 as i32, 1)
    }

    pub fn days_in_month(&self) -> u32 {
        DateKey::from_parts(self.year, self.month0 as i32 + 1, 0).day()
    }

    /// `YYYY-MM` label for headers and CLI output.
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month0 + 1)
    }
}

fn year_bounds() -> (i32, i32) {
    (NaiveDate::MIN.year() + 1, NaiveDate::MAX.year() - 1)
}

pub fn days_in_month(year: i32, month0: i32) -> u32 {
    MonthCursor::new(year, month0).days_in_month()
}

/// Absolute date of a grid cell shown while `cursor` is displayed.
///
/// Both rendering and selection go through here so the two can never
/// disagree about which date a cell stands for.
pub fn resolve_cell_date(cursor: MonthCursor, cell: DayCell) -> DateKey {
    DateKey::from_parts(
        cursor.year,
        cursor.month0 as i32 + cell.membership.month_offset(),
        cell.day as i32,
    )
}

/// A Sunday-first grid of exactly six weeks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthMatrix {
    cursor: MonthCursor,
    weeks: [[DayCell; DAYS_PER_WEEK]; WEEKS_PER_GRID],
}

impl MonthMatrix {
    /// Builds the grid for `month0` of `year`, normalizing months outside
    /// `0..=11`.
    pub fn build(year: i32, month0: i32) -> Self {
        Self::for_cursor(MonthCursor::new(year, month0))
    }

    pub fn for_cursor(cursor: MonthCursor) -> Self {
        let start_weekday = cursor.first_day().weekday_from_sunday() as usize;
        let days = cursor.days_in_month() as usize;
        let prev_last = cursor.step(MonthStep::Previous).days_in_month() as usize;

        let mut weeks = [[DayCell::new(1, Membership::Current); DAYS_PER_WEEK]; WEEKS_PER_GRID];
        for (position, slot) in weeks.iter_mut().flatten().enumerate() {
            *slot = if position < start_weekday {
                DayCell::new(
                    (prev_last - start_weekday + position + 1) as u32,
                    Membership::Previous,
                )
            } else if position < start_weekday + days {
                DayCell::new((position - start_weekday + 1) as u32, Membership::Current)
            } else {
                DayCell::new(
                    (position - start_weekday - days + 1) as u32,
                    Membership::Next,
                )
            };
        }
        MonthMatrix { cursor, weeks }
    }

    pub fn cursor(&self) -> MonthCursor {
        self.cursor
    }

    pub fn weeks(&self) -> &[[DayCell; DAYS_PER_WEEK]; WEEKS_PER_GRID] {
        &self.weeks
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<DayCell> {
        self.weeks.get(row).and_then(|week| week.get(col)).copied()
    }

    /// Cells in reading order as `(row, col, cell)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, DayCell)> + '_ {
        self.weeks.iter().enumerate().flat_map(|(row, week)| {
            week.iter()
                .enumerate()
                .map(move |(col, cell)| (row, col, *cell))
        })
    }

    pub fn date_at(&self, row: usize, col: usize) -> Option<DateKey> {
        self.cell(row, col)
            .map(|cell| resolve_cell_date(self.cursor, cell))
    }

    /// Grid position of `date`, if it is visible in this grid.
    pub fn position_of(&self, date: DateKey) -> Option<(usize, usize)> {
        self.iter()
            .find(|(_, _, cell)| resolve_cell_date(self.cursor, *cell) == date)
            .map(|(row, col, _)| (row, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(week: &[DayCell]) -> Vec<u32> {
        week.iter().map(|c| c.day).collect()
    }

    #[test]
    fn test_february_2024_leap_year() {
        let grid = MonthMatrix::build(2024, 1);
        let weeks = grid.weeks();
        assert_eq!(days(&weeks[0]), vec![28, 29, 30, 31, 1, 2, 3]);
        assert!(weeks[0][..4]
            .iter()
            .all(|c| c.membership == Membership::Previous));
        assert!(weeks[0][4..]
            .iter()
            .all(|c| c.membership == Membership::Current));
        assert_eq!(weeks[4][4], DayCell::new(29, Membership::Current));
        let trailing: Vec<DayCell> = grid
            .iter()
            .filter(|(row, col, _)| (*row, *col) > (4, 4))
            .map(|(_, _, cell)| cell)
            .collect();
        assert_eq!(trailing.len(), 9);
        for (idx, cell) in trailing.iter().enumerate() {
            assert_eq!(*cell, DayCell::new(idx as u32 + 1, Membership::Next));
        }
    }

    #[test]
    fn test_february_2023_still_has_six_rows() {
        let grid = MonthMatrix::build(2023, 1);
        assert_eq!(grid.weeks().len(), WEEKS_PER_GRID);
        assert_eq!(days(&grid.weeks()[0]), vec![29, 30, 31, 1, 2, 3, 4]);
        assert_eq!(grid.cell(4, 2), Some(DayCell::new(28, Membership::Current)));
        assert_eq!(days(&grid.weeks()[5]), vec![5, 6, 7, 8, 9, 10, 11]);
    }

    #[test]
    fn test_january_2024_has_one_leading_cell() {
        let grid = MonthMatrix::build(2024, 0);
        let leading = grid
            .iter()
            .filter(|(_, _, c)| c.membership == Membership::Previous)
            .count();
        assert_eq!(leading, 1);
        assert_eq!(grid.cell(0, 0), Some(DayCell::new(31, Membership::Previous)));
        assert_eq!(grid.cell(0, 1), Some(DayCell::new(1, Membership::Current)));
    }

    #[test]
    fn test_month_without_leading_or_trailing_remainder() {
        // February 2015: 28 days starting on a Sunday fills exactly four rows
        let grid = MonthMatrix::build(2015, 1);
        assert_eq!(grid.cell(0, 0), Some(DayCell::new(1, Membership::Current)));
        assert_eq!(grid.cell(3, 6), Some(DayCell::new(28, Membership::Current)));
        assert_eq!(days(&grid.weeks()[4]), vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(days(&grid.weeks()[5]), vec![8, 9, 10, 11, 12, 13, 14]);
    }

    #[test]
    fn test_month_spanning_all_six_rows() {
        // March 2024 starts on a Friday and ends on a Sunday in row six
        let grid = MonthMatrix::build(2024, 2);
        assert_eq!(grid.cell(0, 5), Some(DayCell::new(1, Membership::Current)));
        assert_eq!(grid.cell(5, 0), Some(DayCell::new(31, Membership::Current)));
        assert_eq!(grid.cell(5, 1), Some(DayCell::new(1, Membership::Next)));
    }

    #[test]
    fn test_out_of_range_month_is_normalized() {
        assert_eq!(MonthMatrix::build(2023, 13), MonthMatrix::build(2024, 1));
        assert_eq!(MonthMatrix::build(2025, -1), MonthMatrix::build(2024, 11));
        assert_eq!(MonthMatrix::build(2024, 25).cursor(), MonthCursor::new(2026, 1));
    }

    #[test]
    fn test_cursor_step_wraps_years() {
        let dec = MonthCursor::new(2024, 11);
        assert_eq!(dec.step(MonthStep::Next), MonthCursor::new(2025, 0));
        let jan = MonthCursor::new(2024, 0);
        assert_eq!(jan.step(MonthStep::Previous), MonthCursor::new(2023, 11));
        assert_eq!(
            MonthCursor::new(2024, 5).step(MonthStep::Next).label(),
            "2024-07"
        );
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 1), 29);
        assert_eq!(days_in_month(2023, 1), 28);
        assert_eq!(days_in_month(1900, 1), 28);
        assert_eq!(days_in_month(2000, 1), 29);
        assert_eq!(days_in_month(2024, 3), 30);
        assert_eq!(days_in_month(2024, 11), 31);
    }

    #[test]
    fn test_resolve_cell_date_crosses_years() {
        let jan = MonthCursor::new(2024, 0);
        assert_eq!(
            resolve_cell_date(jan, DayCell::new(31, Membership::Previous)).to_canonical(),
            "2023-12-31"
        );
        let dec = MonthCursor::new(2024, 11);
        assert_eq!(
            resolve_cell_date(dec, DayCell::new(4, Membership::Next)).to_canonical(),
            "2025-01-04"
        );
        assert_eq!(
            resolve_cell_date(dec, DayCell::new(25, Membership::Current)).to_canonical(),
            "2024-12-25"
        );
    }

    #[test]
    fn test_position_of_visible_dates() {
        let grid = MonthMatrix::build(2024, 1);
        assert_eq!(grid.position_of(DateKey::from_parts(2024, 1, 1)), Some((0, 4)));
        assert_eq!(grid.position_of(DateKey::from_parts(2024, 0, 28)), Some((0, 0)));
        assert_eq!(grid.position_of(DateKey::from_parts(2024, 5, 1)), None);
        assert_eq!(
            grid.date_at(5, 6).map(|d| d.to_canonical()).as_deref(),
            Some("2024-03-09")
        );
    }

    #[test]
    fn test_grids_at_the_edges_of_the_calendar_range() {
        let lowest = NaiveDate::MIN.year();
        let highest = NaiveDate::MAX.year();
        for year in [i32::MIN, lowest - 1, lowest, lowest + 1, highest - 1, highest, i32::MAX] {
            for month0 in 0..12 {
                let grid = MonthMatrix::build(year, month0);
                let cursor = grid.cursor();
                assert!(cursor.year() > lowest && cursor.year() < highest);
                let dates: Vec<DateKey> = grid
                    .iter()
                    .map(|(_, _, cell)| resolve_cell_date(cursor, cell))
                    .collect();
                for pair in dates.windows(2) {
                    assert_eq!((pair[1].as_date() - pair[0].as_date()).num_days(), 1);
                }
                assert_eq!(dates[0].weekday_from_sunday(), 0);
            }
        }

        let floor = MonthCursor::new(lowest + 1, 0);
        assert_eq!(floor.step(MonthStep::Previous), floor);
        let ceiling = MonthCursor::new(highest - 1, 11);
        assert_eq!(ceiling.step(MonthStep::Next), ceiling);
    }
}
