pub mod source;
pub mod window;

pub use source::{
    Clock, FastaSource, ManualClock, RateLimitedSource, RateLimiter, SequenceSource, SystemClock,
    SECONDS_BETWEEN_REQUESTS,
};
pub use window::GenomicWindow;
