/// Per-frame work budget.
///
/// Budgets are expressed in abstract "work units" rather than wall-clock time
/// so a replayed frame sequence does the same work. Layer synchronization
/// counts one unit per feature.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameBudget {
    remaining_units: u32,
}

impl FrameBudget {
    pub fn new(units: u32) -> Self {
        Self {
            remaining_units: units,
        }
    }

    pub fn unlimited() -> Self {
        Self {
            remaining_units: u32::MAX,
        }
    }

    pub fn remaining_units(&self) -> u32 {
        self.remaining_units
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_units == 0
    }

    /// Attempts to consume `units` from the budget.
    ///
    /// Returns `true` if the budget had enough remaining units.
    pub fn try_consume(&mut self, units: u32) -> bool {
        if self.remaining_units < units {
            return false;
        }
        self.remaining_units -= units;
        true
    }

    /// Charges `units` for work that cannot be split, clamping at zero.
    ///
    /// Returns `false` without charging if the budget was already exhausted.
    pub fn consume_saturating(&mut self, units: u32) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.remaining_units = self.remaining_units.saturating_sub(units);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::FrameBudget;

    #[test]
    fn consumes_units() {
        let mut b = FrameBudget::new(3);
        assert!(b.try_consume(2));
        assert_eq!(b.remaining_units(), 1);
        assert!(!b.try_consume(2));
        assert!(b.try_consume(1));
        assert!(b.is_exhausted());
    }

    #[test]
    fn indivisible_work_overdraws_once() {
        let mut b = FrameBudget::new(150);
        assert!(b.consume_saturating(200));
        assert!(b.is_exhausted());
        assert!(!b.consume_saturating(1));
    }
}
