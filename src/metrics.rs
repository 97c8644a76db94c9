use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("suggest_requests_total", "Total number of suggestion requests").unwrap();
    pub static ref CACHE_HITS: Counter =
        register_counter!("suggest_cache_hits_total", "Total cache hits").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("suggest_cache_misses_total", "Total cache misses").unwrap();
    pub static ref GENERATION_TIMEOUTS: Counter =
        register_counter!("suggest_generation_timeouts_total", "Generation attempts that lost the race to the timer").unwrap();
    pub static ref GENERATION_FAILURES: Counter =
        register_counter!("suggest_generation_failures_total", "Generation attempts that failed or produced an invalid meal").unwrap();
    pub static ref FALLBACKS_SERVED: Counter =
        register_counter!("suggest_fallbacks_total", "Responses served from the meal catalog").unwrap();
    pub static ref PLACEHOLDERS_SERVED: Counter =
        register_counter!("suggest_placeholders_total", "Responses served with the static placeholder meal").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "suggest_request_latency_seconds",
        "Request latency in seconds"
    )
    .unwrap();
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("suggest_cache_size", "Current number of meals in cache").unwrap();
}
