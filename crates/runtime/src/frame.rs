use foundation::time::Time;

/// One tick of the host's frame callback.
///
/// Everything the engine does between pointer events happens inside a frame;
/// suspended work resumes on the next one.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Host time at the start of the frame.
    pub time: Time,
}

impl Frame {
    pub fn new(index: u64, time: Time) -> Self {
        Self { index, time }
    }

    /// The frame after this one, `dt_s` seconds later.
    pub fn advance(self, dt_s: f64) -> Self {
        Self::new(self.index + 1, Time(self.time.0 + dt_s))
    }
}
