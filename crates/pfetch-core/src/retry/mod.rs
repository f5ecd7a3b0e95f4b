//! Exit-code classification and retry policy.
//!
//! The transfer tool's exit code is the only signal we get about a failed
//! attempt. Classification is a pure function over that code so the worker
//! loop, the tests, and any future transfer backend agree on what is retried.

mod classify;
mod policy;

pub use classify::{classify_exit, ExitClass, DEFAULT_RETRY_THRESHOLD};
pub use policy::RetryPolicy;
