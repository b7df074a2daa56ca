use middleware::global::EventLimiter;

pub mod middleware {
    pub mod global;
}

/// Caps how many webhook calls the whole process accepts per second.
pub fn global_middleware(permits_per_second: u32) -> EventLimiter {
    EventLimiter::new(permits_per_second)
}
