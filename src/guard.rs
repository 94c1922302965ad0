//! The one-shot guard.
//!
//! [`OnceGuard`] runs an action at most once per arm cycle. The check for
//! "already fired" is a single acquire load that is inlined into every call
//! site; everything else lives on a `#[cold]` slow path that takes the
//! guard's lock, re-checks the flag and runs the action.
//!
//! Unlike `std::sync::Once`, the guard can be re-armed with
//! [`OnceGuard::reset`], and it can gate a named operation resolved through a
//! [`Dispatcher`] instead of a closure.

use core::fmt;
use core::future::Future;
use core::sync::atomic::Ordering;

use crate::dispatch::{DispatchError, Dispatcher, Value};
use crate::sink::Delivery;
use crate::state::{GuardState, Mode};

/// A guard which performs exactly one action per arm cycle.
///
/// An arm cycle starts when the guard is created (or [`reset`](Self::reset))
/// and ends when its guarded action completes. Between the two, however many
/// threads call into the guard, only one of them, the *winner*, runs its
/// action; everyone else returns without doing anything.
///
/// An action that fails still counts as completed: a panic unwinds through
/// the winner and leaves the guard fired, and errors returned by a dispatched
/// operation go to the winner while the guard fires anyway. Call `reset` to
/// try again.
///
/// The guard must be shared by reference (or through an `Arc`), never
/// duplicated, so it deliberately implements neither `Clone` nor `Copy`.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use resync::OnceGuard;
///
/// static INIT: OnceGuard = OnceGuard::new();
/// static RUNS: AtomicUsize = AtomicUsize::new(0);
///
/// for _ in 0..3 {
///    INIT.call_once(|| {
///       RUNS.fetch_add(1, Ordering::Relaxed);
///    });
/// }
/// assert_eq!(RUNS.load(Ordering::Relaxed), 1);
///
/// INIT.reset();
/// INIT.call_once(|| {
///    RUNS.fetch_add(1, Ordering::Relaxed);
/// });
/// assert_eq!(RUNS.load(Ordering::Relaxed), 2);
/// ```
pub struct OnceGuard {
   state: GuardState,
}

impl OnceGuard {
   /// Creates a new, unfired guard.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         state: GuardState::unfired(),
      }
   }

   /// Creates a guard that is already fired. Nothing runs through it until
   /// it is reset.
   #[inline]
   #[must_use]
   pub const fn fired() -> Self {
      Self {
         state: GuardState::fired(),
      }
   }

   /// Returns `true` if the current arm cycle's action has completed.
   ///
   /// This is an acquire load: when it returns `true`, every write the
   /// winning action made is visible to the caller. Never blocks.
   #[inline]
   pub fn is_fired(&self) -> bool {
      self.state.is_fired(Ordering::Acquire)
   }

   /// Runs `f` if and only if this is the first call of the current arm cycle.
   ///
   /// Callers that arrive while the winner is still running block until it
   /// finishes, so on return the action has always completed, whoever ran it.
   ///
   /// Calling back into the same guard from inside `f` deadlocks; use
   /// [`try_call_once`](Self::try_call_once) there instead.
   #[inline]
   pub fn call_once<F>(&self, f: F)
   where
      F: FnOnce(),
   {
      if self.is_fired() {
         return;
      }
      self.run(f);
   }

   /// Like [`call_once`](Self::call_once), but hands the action's return
   /// value back to the winner.
   ///
   /// Returns `Some(value)` to the one caller whose `f` ran and `None` to
   /// every other caller.
   #[inline]
   pub fn call_once_with<F, R>(&self, f: F) -> Option<R>
   where
      F: FnOnce() -> R,
   {
      if self.is_fired() {
         return None;
      }
      self.run(f)
   }

   /// Runs `f` only if the guard is unfired and no other call is in progress.
   ///
   /// Never blocks. Returns `true` if `f` ran. Calling this from inside a
   /// guarded action returns `false`, since the lock is held by the caller.
   #[inline]
   pub fn try_call_once<F>(&self, f: F) -> bool
   where
      F: FnOnce(),
   {
      if self.is_fired() {
         return false;
      }
      let Some(section) = self.state.try_lock() else {
         return false;
      };
      f();
      section.fire();
      true
   }

   /// Runs the async action `f` if and only if this is the first call of the
   /// current arm cycle.
   ///
   /// The guard's lock is held across every await point of the action, so
   /// concurrent callers wait for it to resolve. Returns the action's output
   /// to the winner and `None` to everyone else.
   ///
   /// Dropping the winner's future before it completes counts as a failed
   /// attempt: the guard fires.
   pub async fn call_once_async<F, Fut>(&self, f: F) -> Option<Fut::Output>
   where
      F: FnOnce() -> Fut,
      Fut: Future,
   {
      if self.is_fired() {
         return None;
      }
      let section = self.state.lock_async(Mode::Unfired).await?;
      let output = f().await;
      section.fire();
      crate::trace_transition!("fired (async)");
      Some(output)
   }

   /// Invokes the operation `name` on `target` through `dispatcher` if and
   /// only if this is the first call of the current arm cycle, discarding
   /// its results.
   ///
   /// A dispatch error is returned to the winning caller only; the guard
   /// fires regardless. Every other caller gets `Ok(())`.
   ///
   /// # Examples
   ///
   /// ```
   /// use std::sync::atomic::{AtomicI64, Ordering};
   /// use resync::{args, MethodTable, OnceGuard};
   ///
   /// struct Total(AtomicI64);
   ///
   /// let table = MethodTable::new().method("Add", |t: &Total, d: i64| {
   ///    t.0.fetch_add(d, Ordering::SeqCst);
   /// });
   /// let total = Total(AtomicI64::new(0));
   /// let guard = OnceGuard::new();
   ///
   /// guard.call_named(&table, &total, "Add", args![5i64]).unwrap();
   /// guard.call_named(&table, &total, "Add", args![5i64]).unwrap();
   /// assert_eq!(total.0.load(Ordering::SeqCst), 5);
   /// ```
   #[inline]
   pub fn call_named<T, D>(
      &self,
      dispatcher: &D,
      target: &T,
      name: &str,
      args: Vec<Value>,
   ) -> Result<(), DispatchError>
   where
      T: ?Sized,
      D: Dispatcher<T> + ?Sized,
   {
      match self.call_once_with(|| dispatcher.invoke(target, name, args)) {
         Some(Err(err)) => Err(err),
         Some(Ok(_)) | None => Ok(()),
      }
   }

   /// Invokes the operation `name` on `target` through `dispatcher` if and
   /// only if this is the first call of the current arm cycle, delivering its
   /// results through a [`Sink`](crate::Sink).
   ///
   /// The winner gets [`Delivery::Won`] with a closed sink holding every
   /// result value in the order the operation returned them. Every other
   /// caller, whether it lost the race or arrived after the guard fired,
   /// gets [`Delivery::Lost`] and nothing else. A dispatch error is returned
   /// to the winner and the guard fires regardless.
   pub fn call_named_to_sink<T, D>(
      &self,
      dispatcher: &D,
      target: &T,
      name: &str,
      args: Vec<Value>,
   ) -> Result<Delivery, DispatchError>
   where
      T: ?Sized,
      D: Dispatcher<T> + ?Sized,
   {
      let Some(results) = self.call_once_with(|| dispatcher.invoke(target, name, args)) else {
         return Ok(Delivery::Lost);
      };
      Ok(Delivery::Won(results?.into_iter().collect()))
   }

   /// Re-arms the guard so the next call runs its action again.
   ///
   /// Takes the guard's lock, so a reset issued while an action is running
   /// waits for that action to finish (it is never interrupted) and then
   /// clears the flag. Resetting an unfired guard does nothing.
   pub fn reset(&self) {
      if let Some(section) = self.state.lock(Mode::Any) {
         if section.clear() {
            crate::trace_transition!("reset");
         }
      }
   }

   /// Re-arms the guard through exclusive access. Never blocks.
   ///
   /// Returns `true` if the guard was fired.
   #[inline]
   pub fn reset_mut(&mut self) -> bool {
      self.state.set_unfired()
   }

   /// Slow path: take the lock, re-check, run.
   #[cold]
   fn run<F, R>(&self, f: F) -> Option<R>
   where
      F: FnOnce() -> R,
   {
      // `None` means the flag was set by the time the lock came free.
      let section = self.state.lock(Mode::Unfired)?;
      // If `f` unwinds, dropping `section` fires the guard.
      let output = f();
      section.fire();
      crate::trace_transition!("fired");
      Some(output)
   }
}

impl Default for OnceGuard {
   /// Creates a new, unfired guard.
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl fmt::Debug for OnceGuard {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("OnceGuard");
      if self.is_fired() {
         d.field(&format_args!("<fired>"));
      } else {
         d.field(&format_args!("<unfired>"));
      }
      d.finish()
   }
}
