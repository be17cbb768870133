use crate::utils::time_utils::current_timestamp;

/**
 * Counts how many times the sensible endpoints (anything
 * that writes) get called per unit of time, and blocks them
 * entirely for a configured duration when the counter goes
 * over the limit.
 */
pub struct BasicRateLimiter {
  counter: u32,
  last_update: i64,
  is_limited: bool,
  max_requests: u32,
  max_requests_time: u32,
  block_duration: u32
}

impl BasicRateLimiter {

  pub fn new(
    max_requests: u32,
    max_requests_time: u32,
    block_duration: u32
  ) -> Self {
    Self {
      counter: 0,
      last_update: current_timestamp(),
      is_limited: false,
      max_requests,
      max_requests_time,
      block_duration
    }
  }

  pub fn is_locked(&self) -> bool {
    self.is_limited
  }

  pub fn is_expired(&self) -> bool {
    // If currently locked, check if past block_duration.
    // Check if past max_requests_time otherwise.
    if self.is_locked() {
      current_timestamp() - self.last_update >= self.block_duration.into()
    } else {
      current_timestamp() - self.last_update >= self.max_requests_time.into()
    }
  }

  // Counts a request and returns the resulting locked
  // state, so callers can do their 429 business in a single
  // call.
  pub fn update(&mut self) -> bool {
    if self.is_expired() {
      // Window or block is over, reset:
      self.counter = 0;
      self.last_update = current_timestamp();
      self.is_limited = false;
    } else if !self.is_limited {
      self.counter += 1;
      if self.counter >= self.max_requests {
        self.is_limited = true;
        self.last_update = current_timestamp();
      }
    }
    self.is_limited
  }

}
