//! Timing — tempo, schedule construction, and cursor bookkeeping.

pub mod conductor;
pub mod cursor;
pub mod sweep;
pub mod table;

pub use conductor::Conductor;
pub use cursor::Cursor;
pub use sweep::MissSweeper;
pub use table::{ScheduleEntry, TimingTable, TimingTableBuilder};
