//! Parameter automation timeline
//!
//! A parameter holds one segment: a start point and a target reached at
//! `end_time`, interpolated linearly in between. Setting a value makes the
//! segment flat, cancelling freezes it at its value at the cancel time, and a
//! new ramp starts from the previous segment's end.

/// Automation state of one parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Automation {
    start_value: f64,
    start_time: f64,
    target: f64,
    end_time: f64,
}

impl Automation {
    pub fn new(value: f64) -> Self {
        Self {
            start_value: value,
            start_time: 0.0,
            target: value,
            end_time: 0.0,
        }
    }

    /// Jump to `value` at `time`, discarding any scheduled change
    pub fn set_value(&mut self, value: f64, time: f64) {
        self.start_value = value;
        self.target = value;
        self.start_time = time;
        self.end_time = time;
    }

    /// Drop scheduled changes after `time`, holding the value reached then
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        let value = self.value_at(time);
        self.set_value(value, time);
    }

    /// Ramp linearly from the end of the current segment to `value`
    pub fn linear_ramp_to_value_at_time(&mut self, value: f64, end_time: f64) {
        self.start_value = self.target;
        self.start_time = self.end_time;
        self.target = value;
        self.end_time = end_time;
    }

    pub fn value_at(&self, time: f64) -> f64 {
        if time >= self.end_time {
            self.target
        } else if time <= self.start_time {
            self.start_value
        } else {
            let position = (time - self.start_time) / (self.end_time - self.start_time);
            self.start_value + (self.target - self.start_value) * position
        }
    }

    /// Final value of the current segment
    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn is_settled(&self, time: f64) -> bool {
        time >= self.end_time
    }
}
