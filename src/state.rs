//! Packed synchronization state for [`OnceGuard`](crate::OnceGuard).
//!
//! The fired flag and the slow-path lock share a single `AtomicU8`:
//! - Bit 0: FIRED - The guarded action has completed for this arm cycle
//! - Bit 1: LOCKED - Some thread is inside the critical section
//! - Bit 2: WAITING - At least one thread is parked on the state word
//! - Bits 3-7: EPOCH - Bumped on every release so parked threads see a change
//!
//! Blocking uses `parking_lot_core`, keyed on the address of the atomic.

use core::mem;
use core::sync::atomic::{self, AtomicU8, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

/// What a lock attempt is allowed to do when the guard is already fired.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
   /// Give up if FIRED is set (the double-checked slow path).
   Unfired,
   /// Take the lock regardless of FIRED (reset).
   Any,
}

#[repr(transparent)]
pub(crate) struct GuardState(AtomicU8);

impl GuardState {
   const FIRED: u8 = 1;
   const LOCKED: u8 = 2;
   const WAITING: u8 = 4;
   const EPOCH_1: u8 = 8;
   const EPOCH_MASK: u8 = !(Self::FIRED | Self::LOCKED | Self::WAITING);

   #[inline(always)]
   const fn next_epoch(current: u8) -> u8 {
      (current & Self::EPOCH_MASK).wrapping_add(Self::EPOCH_1) & Self::EPOCH_MASK
   }

   #[inline]
   pub(crate) const fn unfired() -> Self {
      Self(AtomicU8::new(0))
   }

   #[inline]
   pub(crate) const fn fired() -> Self {
      Self(AtomicU8::new(Self::FIRED))
   }

   fn notify_all(&self) {
      // SAFETY: The key is the address of the state word, the same one `wait` parks on.
      unsafe {
         parking_lot_core::unpark_all(self.0.as_ptr() as usize, DEFAULT_UNPARK_TOKEN);
      }
   }

   /// Parks until the state word differs from `expected`. Spurious wakeups are
   /// fine, every caller loops back into `lock_step`.
   fn wait(&self, expected: u8) {
      // SAFETY: See `notify_all`.
      unsafe {
         let _ = parking_lot_core::park(
            self.0.as_ptr() as usize,
            || self.0.load(atomic::Ordering::Acquire) == expected,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            None,
         );
      }
   }

   /// Swaps in `flags` with a fresh epoch, clearing LOCKED and WAITING, and
   /// wakes parked threads if there were any. Returns the previous state.
   #[inline]
   fn release(&self, flags: u8) -> u8 {
      let current = self.0.load(Ordering::Relaxed);
      let next = flags | Self::next_epoch(current);

      // Release pairs with the Acquire loads in `is_fired` and `lock_step`:
      // whatever the winner did before this store is visible to every thread
      // that later observes FIRED.
      let prev = self.0.swap(next, Ordering::Release);
      if prev & Self::WAITING != 0 {
         self.notify_all();
      }
      prev
   }

   /// Sets FIRED (and releases the lock if held). Returns `true` if the state
   /// was not fired before.
   #[inline]
   pub(crate) fn set_fired(&self) -> bool {
      self.release(Self::FIRED) & Self::FIRED == 0
   }

   /// Clears FIRED (and releases the lock if held). Returns `true` if the
   /// state was fired before.
   #[inline]
   pub(crate) fn set_unfired(&self) -> bool {
      self.release(0) & Self::FIRED != 0
   }

   #[inline]
   pub(crate) fn is_fired(&self, ordering: Ordering) -> bool {
      self.0.load(ordering) & Self::FIRED != 0
   }

   /// One lock attempt.
   ///
   /// - `Ok(None)`: `mode` is `Unfired` and the guard is fired.
   /// - `Ok(Some(section))`: lock acquired.
   /// - `Err(state)`: lock held elsewhere; `state` is the value to park on.
   ///   With `nowait` the WAITING bit is left alone.
   fn lock_step(&self, mode: Mode, nowait: bool) -> Result<Option<Section<'_>>, u8> {
      loop {
         let current = self.0.load(Ordering::Acquire);
         if mode == Mode::Unfired && current & Self::FIRED != 0 {
            return Ok(None);
         }

         if current & Self::LOCKED == 0 {
            match self.0.compare_exchange_weak(
               current,
               current | Self::LOCKED,
               Ordering::Acquire,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Ok(Some(Section::new(self))),
               Err(_) => {
                  std::hint::spin_loop();
                  continue;
               }
            }
         }

         if !nowait && current & Self::WAITING == 0 {
            let waiting = current | Self::WAITING;
            match self.0.compare_exchange_weak(
               current,
               waiting,
               Ordering::Relaxed,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Err(waiting),
               Err(_) => {
                  std::hint::spin_loop();
                  continue;
               }
            }
         }
         return Err(current);
      }
   }

   /// Acquires the lock, parking while another thread holds it.
   ///
   /// Returns `None` only in `Mode::Unfired`, when the guard turned out to be
   /// fired before or while waiting.
   pub(crate) fn lock(&self, mode: Mode) -> Option<Section<'_>> {
      let mut observed = match self.lock_step(mode, false) {
         Ok(section) => return section,
         Err(state) => state,
      };
      loop {
         self.wait(observed);
         match self.lock_step(mode, false) {
            Ok(section) => return section,
            Err(state) => observed = state,
         }
      }
   }

   /// Acquires the lock from async code: spins and yields to the runtime
   /// first, then (with `async-tokio-mt`, on a multi-thread runtime) parks
   /// inside `block_in_place`. On any other runtime it keeps yielding.
   pub(crate) async fn lock_async(&self, mode: Mode) -> Option<Section<'_>> {
      loop {
         for _ in 0..16 {
            match self.lock_step(mode, false) {
               Ok(section) => return section,
               Err(state) => {
                  for _ in 0..32 {
                     #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
                     tokio::task::yield_now().await;
                     if self.0.load(Ordering::Relaxed) != state {
                        break;
                     }
                  }
               }
            }
         }

         #[cfg(feature = "async-tokio-mt")]
         {
            if Self::can_block_in_place() {
               return match self.lock_step(mode, false) {
                  Ok(section) => section,
                  Err(state) => tokio::task::block_in_place(|| {
                     self.wait(state);
                     self.lock(mode)
                  }),
               };
            }
         }
      }
   }

   /// `block_in_place` panics outside a multi-thread runtime.
   #[cfg(feature = "async-tokio-mt")]
   fn can_block_in_place() -> bool {
      tokio::runtime::Handle::try_current()
         .is_ok_and(|handle| handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread)
   }

   /// Takes the lock only if the guard is unfired and nobody holds it.
   #[inline]
   pub(crate) fn try_lock(&self) -> Option<Section<'_>> {
      self.lock_step(Mode::Unfired, true).ok().flatten()
   }
}

/// Proof of holding the slow-path lock.
///
/// Dropping a section without calling [`Section::clear`] sets FIRED, so an
/// action that unwinds still consumes its arm cycle.
pub(crate) struct Section<'a> {
   state: &'a GuardState,
}

impl<'a> Section<'a> {
   #[inline(always)]
   const fn new(state: &'a GuardState) -> Self {
      Self { state }
   }

   /// Marks the guard fired and releases the lock.
   #[inline(always)]
   pub(crate) fn fire(self) -> bool {
      let was_unfired = self.state.set_fired();
      mem::forget(self);
      was_unfired
   }

   /// Marks the guard unfired and releases the lock.
   #[inline(always)]
   pub(crate) fn clear(self) -> bool {
      let was_fired = self.state.set_unfired();
      mem::forget(self);
      was_fired
   }
}

impl Drop for Section<'_> {
   #[inline(always)]
   fn drop(&mut self) {
      self.state.set_fired();
   }
}
