/// One-shot countdown that can be cancelled before it fires.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseTimer {
    remaining: Option<f32>,
}

impl PhaseTimer {
    pub fn start(&mut self, secs: f32) {
        self.remaining = Some(secs.max(0.0));
    }

    pub fn cancel(&mut self) {
        self.remaining = None;
    }

    pub fn is_running(&self) -> bool {
        self.remaining.is_some()
    }

    pub fn remaining(&self) -> Option<f32> {
        self.remaining
    }

    /// Returns true on the tick that expires the timer, once.
    pub fn tick(&mut self, dt: f32) -> bool {
        let Some(remaining) = self.remaining else {
            return false;
        };
        let left = remaining - dt.max(0.0);
        if left <= 0.0 {
            self.remaining = None;
            true
        } else {
            self.remaining = Some(left);
            false
        }
    }
}
