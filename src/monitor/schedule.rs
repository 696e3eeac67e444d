use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Fires once per day at a fixed local time of day.
#[derive(Debug, Clone)]
pub struct DailyTrigger {
    at: NaiveTime,
    last_fired: Option<NaiveDate>,
}

impl DailyTrigger {
    pub fn new(at: NaiveTime) -> Self {
        Self {
            at,
            last_fired: None,
        }
    }

    /// Next firing strictly after `now`, skipping a day that already fired.
    pub fn next_fire(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.at);
        if today > now && self.last_fired != Some(now.date()) {
            today
        } else {
            today + Duration::days(1)
        }
    }

    pub fn delay_until_next(&self, now: NaiveDateTime) -> std::time::Duration {
        (self.next_fire(now) - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }

    pub fn mark_fired(&mut self, now: NaiveDateTime) {
        self.last_fired = Some(now.date());
    }
}
