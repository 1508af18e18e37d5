//! Pace and retry control-plane calls shared by independent stream consumers.
//!
//! Consumers of a sharded stream usually run as many independent instances that never talk to
//! each other but share a single account-wide (or stream-wide) limit on control-plane calls. The
//! primitives in this crate let each instance stay within its share of such a limit
//! ([RateBudget]) and recover from transient failures with a bounded number of attempts
//! ([RetryTracker]).

mod rate;
pub use rate::{RateBudget, RateLimit};
mod retry;
pub use retry::{Backoff, RetryPolicy, RetryTracker};
