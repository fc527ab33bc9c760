//! Daily attendance: the sheet lifecycle, the service that persists it, and
//! monthly aggregation.

pub mod lifecycle;
pub mod monthly;
pub mod service;

pub use lifecycle::{AttendanceSession, SheetState};
pub use monthly::{aggregate, MonthlyGrid, MonthlyRow, EMPTY_CELL};
pub use service::AttendanceService;
