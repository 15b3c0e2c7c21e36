/// Counts outstanding exchanges; the indicator is visible while any remain.
#[derive(Clone, Copy, Debug, Default)]
pub struct TypingIndicator {
    outstanding: usize,
}

impl TypingIndicator {
    pub fn is_visible(&self) -> bool {
        self.outstanding > 0
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Returns `true` when this call made the indicator visible.
    pub fn begin(&mut self) -> bool {
        self.outstanding += 1;
        self.outstanding == 1
    }

    /// Returns `true` when this call hid the indicator. Unmatched calls are ignored.
    pub fn end(&mut self) -> bool {
        if self.outstanding == 0 {
            return false;
        }
        self.outstanding -= 1;
        self.outstanding == 0
    }

    /// Drop every outstanding exchange. Returns `true` if it was visible.
    pub fn reset(&mut self) -> bool {
        let was_visible = self.is_visible();
        self.outstanding = 0;
        was_visible
    }
}
