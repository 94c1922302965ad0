//! A resettable, thread-safe one-shot guard.
//!
//! [`OnceGuard`] runs an action exactly once per arm cycle, no matter how many
//! threads race to call it, and can be re-armed with [`OnceGuard::reset`].
//! Besides closures it can gate a *named* operation on a target: the name is
//! resolved through a [`Dispatcher`] (usually a [`MethodTable`]), and the
//! winning caller may have the operation's results delivered through a
//! [`Sink`].
//!
//! # Features
//!
//! - **Lock-free fast path**: checking whether the guard has fired is a single
//!   acquire load.
//! - **Efficient blocking**: losers of the race park on the guard's state word
//!   through `parking_lot`'s futex-based primitives.
//! - **Resettable**: `reset` re-arms the guard, waiting out an in-flight action.
//! - **At-most-once, even on failure**: an action that panics, or a dispatched
//!   operation that errors, still consumes the arm cycle.
//! - **Async support**: `call_once_async` gates a future-producing action.
//!
//! # Cargo features
//!
//! - `async-tokio-mt` (default): async lock acquisition yields to tokio and
//!   falls back to `block_in_place` under contention.
//! - `async-tokio`: tokio yielding only, for current-thread runtimes.
//! - `tracing`: `trace`-level events when a guard fires or is reset.
//!
//! # Examples
//!
//! ## Closures
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::thread;
//!
//! use resync::OnceGuard;
//!
//! let guard = Arc::new(OnceGuard::new());
//! let counter = Arc::new(AtomicUsize::new(0));
//!
//! let threads: Vec<_> = (0..8)
//!    .map(|_| {
//!       let (guard, counter) = (guard.clone(), counter.clone());
//!       thread::spawn(move || guard.call_once(|| {
//!          counter.fetch_add(1, Ordering::SeqCst);
//!       }))
//!    })
//!    .collect();
//! for t in threads {
//!    t.join().unwrap();
//! }
//! assert_eq!(counter.load(Ordering::SeqCst), 1);
//! ```
//!
//! ## Named operations
//!
//! ```rust
//! use std::sync::atomic::{AtomicI64, Ordering};
//!
//! use resync::{args, Delivery, MethodTable, OnceGuard};
//!
//! struct Counter(AtomicI64);
//!
//! let methods = MethodTable::new()
//!    .method("GetResult", |c: &Counter| c.0.fetch_add(1, Ordering::SeqCst) + 1);
//! let counter = Counter(AtomicI64::new(0));
//! let guard = OnceGuard::new();
//!
//! let Delivery::Won(sink) = guard.call_named_to_sink(&methods, &counter, "GetResult", args![])? else {
//!    unreachable!("first call wins");
//! };
//! let value = sink.recv().unwrap().downcast::<i64>().unwrap();
//! assert_eq!(*value, 1);
//!
//! assert!(guard.call_named_to_sink(&methods, &counter, "GetResult", args![])?.is_lost());
//! # Ok::<(), resync::DispatchError>(())
//! ```

/// Emits a `trace` event for a guard state transition when the `tracing`
/// feature is enabled.
macro_rules! trace_transition {
   ($what:literal) => {
      #[cfg(feature = "tracing")]
      ::tracing::trace!(target: "resync", transition = $what, "once guard transition");
   };
}
pub(crate) use trace_transition;

/// Name-based operation dispatch.
mod dispatch;

/// The one-shot guard.
mod guard;

/// Result delivery channel.
mod sink;

/// Internal synchronization state.
mod state;

pub use dispatch::{DispatchError, Dispatcher, Handler, IntoValues, MethodTable, Value};
pub use guard::OnceGuard;
pub use sink::{channel, Delivery, Sink, SinkSender};
