//! Miss sweeper — moves the judgement cursor past beats whose window closed.
//!
//! Without input a beat would hold the cursor forever. The sweeper searches
//! forward from the cursor for the first pip still within reach of `now` and
//! jumps there. It never revisits earlier beats.

use std::ops::Range;

use super::cursor::Cursor;
use super::table::TimingTable;

/// Advances the next-expected cursor by timeout.
#[derive(Debug, Clone, Copy)]
pub struct MissSweeper {
    hit_window: f64,
}

impl MissSweeper {
    pub fn new(hit_window: f64) -> Self {
        Self { hit_window }
    }

    /// Advance `cursor` to the first entry with `timestamp >= now - hit_window`.
    ///
    /// Returns the range of indices that were swept past (empty if the cursor
    /// did not move). Idempotent for a fixed `now`.
    pub fn sweep(&self, table: &TimingTable, cursor: &mut Cursor, now: f64) -> Range<usize> {
        let before = cursor.get();
        let cutoff = now - self.hit_window;
        let found = table.lower_bound(cutoff, before);
        cursor.advance_to(found);
        before..cursor.get().max(before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{Block, Chart};
    use crate::timing::TimingTableBuilder;

    fn single_beat_at_one() -> TimingTable {
        TimingTableBuilder::new(0.5).build(&Chart::new(vec![Block::new(1)]), 1.0)
    }

    #[test]
    fn sweeps_expired_beat_once() {
        let table = single_beat_at_one();
        let sweeper = MissSweeper::new(0.12);
        let mut cursor = Cursor::new(0);

        let swept = sweeper.sweep(&table, &mut cursor, 1.3);
        assert_eq!(cursor.get(), 1);
        assert_eq!(swept, 0..1);

        let swept = sweeper.sweep(&table, &mut cursor, 1.3);
        assert_eq!(cursor.get(), 1);
        assert!(swept.is_empty());
    }

    #[test]
    fn beat_inside_window_is_kept() {
        let table = single_beat_at_one();
        let sweeper = MissSweeper::new(0.12);
        let mut cursor = Cursor::new(0);
        sweeper.sweep(&table, &mut cursor, 1.1);
        assert_eq!(cursor.get(), 0);
        // still inside the window
        sweeper.sweep(&table, &mut cursor, 1.0 + 0.0625);
        assert_eq!(cursor.get(), 0);
    }

    #[test]
    fn never_decreases_with_non_decreasing_now() {
        let chart = Chart::new((0..8).map(|i| Block::new(1 + i % 6)).collect());
        let table = TimingTableBuilder::new(0.4).build(&chart, 0.0);
        let sweeper = MissSweeper::new(0.12);
        let mut cursor = Cursor::new(0);
        let mut last = 0;
        let mut now = 0.0;
        while now < 5.0 {
            sweeper.sweep(&table, &mut cursor, now);
            assert!(cursor.get() >= last);
            last = cursor.get();
            now += 0.037;
        }
        assert_eq!(cursor.get(), table.len());
    }

    #[test]
    fn search_starts_at_cursor() {
        let table = TimingTableBuilder::new(1.0)
            .build(&Chart::new(vec![Block::new(1), Block::new(1)]), 0.0);
        let sweeper = MissSweeper::new(0.12);
        let mut cursor = Cursor::new(2);
        let swept = sweeper.sweep(&table, &mut cursor, 0.0);
        assert_eq!(cursor.get(), 2);
        assert!(swept.is_empty());
    }
}
