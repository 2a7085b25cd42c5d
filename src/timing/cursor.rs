//! Forward-only schedule cursor.

/// An index into the schedule that can never move backward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor(usize);

impl Cursor {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn get(self) -> usize {
        self.0
    }

    /// Move to `index` if it is ahead. Returns whether the cursor moved.
    pub fn advance_to(&mut self, index: usize) -> bool {
        if index > self.0 {
            self.0 = index;
            true
        } else {
            false
        }
    }

    /// Step forward by one.
    pub fn step(&mut self) {
        self.0 += 1;
    }
}
