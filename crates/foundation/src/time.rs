/// Engine time in seconds, advanced by the frame loop.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct Time(pub f64);

impl Time {
    pub const ZERO: Time = Time(0.0);

    pub fn seconds(self) -> f64 {
        self.0
    }

    pub fn plus_ms(self, ms: u64) -> Self {
        Time(self.0 + ms as f64 / 1000.0)
    }
}
