//! Cancellation shared between frame-driven passes and async fetches.
//!
//! Clones observe the same state. Synchronous code polls
//! [`CancelToken::is_cancelled`] at its suspension points; async code awaits
//! [`CancelToken::cancelled`].

pub use tokio_util::sync::CancellationToken as CancelToken;
