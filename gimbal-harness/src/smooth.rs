/// Smooths orientation samples before they reach a consumer: a clamp
/// against single-sample glitches, then a first-order low-pass blend.
pub struct QuatFilter {
    last: Option<[f32; 4]>,
}

impl QuatFilter {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Feeds one `[real, i, j, k]` sample and returns the smoothed value.
    pub fn apply(&mut self, sample: [f32; 4]) -> [f32; 4] {
        let Some(last) = self.last else {
            self.last = Some(sample);
            return sample;
        };

        let mut smoothed = [0.0f32; 4];
        for index in 0..4 {
            // a jump past a full unit between samples is a glitch, not motion
            let held = if (sample[index] - last[index]).abs() > 1.0 {
                last[index]
            } else {
                sample[index]
            };
            smoothed[index] = last[index] * 0.8 + held * 0.2;
        }
        self.last = Some(smoothed);
        smoothed
    }
}

impl Default for QuatFilter {
    fn default() -> Self {
        Self::new()
    }
}
