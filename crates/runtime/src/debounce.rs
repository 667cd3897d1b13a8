use foundation::time::Time;

/// Trailing-edge debouncer driven by frame time.
///
/// Each [`Debouncer::trigger`] restarts the quiet window; [`Debouncer::poll`]
/// fires once when the window has elapsed. The very first trigger can be made
/// to fire on the next poll without waiting.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay_ms: u64,
    deadline: Option<Time>,
    eager_first: bool,
    fired_once: bool,
}

impl Debouncer {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            deadline: None,
            eager_first: false,
            fired_once: false,
        }
    }

    /// Skip the delay for the first trigger ever seen.
    pub fn eager_first(mut self) -> Self {
        self.eager_first = true;
        self
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn trigger(&mut self, now: Time) {
        let deadline = if self.eager_first && !self.fired_once {
            now
        } else {
            now.plus_ms(self.delay_ms)
        };
        self.deadline = Some(deadline);
    }

    /// Returns `true` exactly once per quiet window, when `now` has reached it.
    pub fn poll(&mut self, now: Time) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.fired_once = true;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::Debouncer;
    use foundation::time::Time;

    #[test]
    fn fires_after_quiet_window() {
        let mut d = Debouncer::new(500);
        d.trigger(Time(0.0));
        assert!(!d.poll(Time(0.4)));
        assert!(d.poll(Time(0.5)));
        assert!(!d.poll(Time(0.6)));
    }

    #[test]
    fn retrigger_restarts_window() {
        let mut d = Debouncer::new(500);
        d.trigger(Time(0.0));
        d.trigger(Time(0.3));
        assert!(!d.poll(Time(0.6)));
        assert!(d.poll(Time(0.8)));
    }

    #[test]
    fn eager_first_fires_immediately_then_debounces() {
        let mut d = Debouncer::new(500).eager_first();
        d.trigger(Time(1.0));
        assert!(d.poll(Time(1.0)));

        d.trigger(Time(2.0));
        assert!(!d.poll(Time(2.0)));
        assert!(d.poll(Time(2.5)));
    }

    #[test]
    fn cancel_drops_pending_fire() {
        let mut d = Debouncer::new(10);
        d.trigger(Time(0.0));
        d.cancel();
        assert!(!d.is_pending());
        assert!(!d.poll(Time(5.0)));
    }
}
