//! Month-grid calendar core: date keys, six-week grids, per-day event lookup
//! and the selection state that ties them together, plus the local store.

pub mod controller;
pub mod date_key;
pub mod model;
pub mod month;
pub mod storage;

pub use controller::CalendarController;
pub use date_key::{DateKey, DateKeyError};
pub use model::{CalendarError, Event, EventId, EventIndex, EventList, RawEvent};
pub use month::{resolve_cell_date, DayCell, Membership, MonthCursor, MonthMatrix, MonthStep};
