use crate::date_key::DateKey;
use crate::model::{Event, EventIndex};
use crate::month::{resolve_cell_date, DayCell, MonthCursor, MonthMatrix, MonthStep};

/// Displayed month plus selected date.
///
/// The two move independently: picking a cell from a neighbouring month
/// changes the selection but keeps the grid where it is, and paging months
/// leaves the selection alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarController {
    cursor: MonthCursor,
    selected: DateKey,
}

impl CalendarController {
    pub fn new(initial_selected: DateKey) -> Self {
        CalendarController {
            cursor: MonthCursor::of(initial_selected),
            selected: initial_selected,
        }
    }

    pub fn cursor(&self) -> MonthCursor {
        self.cursor
    }

    pub fn selected(&self) -> DateKey {
        self.selected
    }

    pub fn advance_month(&mut self, step: MonthStep) {
        self.cursor = self.cursor.step(step);
    }

    pub fn select_cell(&mut self, cell: DayCell) -> DateKey {
        self.selected = resolve_cell_date(self.cursor, cell);
        self.selected
    }

    /// Moves both the grid and the selection to `date`.
    pub fn jump_to(&mut self, date: DateKey) {
        *self = CalendarController::new(date);
    }

    pub fn current_grid(&self) -> MonthMatrix {
        MonthMatrix::for_cursor(self.cursor)
    }

    pub fn events_for_selected<'a>(&self, index: &'a EventIndex) -> &'a [Event] {
        index.get(&self.selected)
    }
}
