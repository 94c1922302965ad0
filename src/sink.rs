//! Ordered, closable result delivery.
//!
//! A [`Sink`] is the read half of an unbounded `flume` channel: values come
//! out in the order they were sent, and once the [`SinkSender`] is closed (or
//! dropped) and the buffer is drained, receivers see `None` instead of
//! blocking. [`Delivery`] is what
//! [`OnceGuard::call_named_to_sink`](crate::OnceGuard::call_named_to_sink)
//! returns: the winning caller's sink, or an explicit "lost".

use core::fmt;

use crate::dispatch::Value;

/// Creates a new sink and the sender that feeds it.
#[must_use]
pub fn channel<T>() -> (SinkSender<T>, Sink<T>) {
   let (tx, rx) = flume::unbounded();
   (SinkSender { tx }, Sink { rx })
}

/// The write half of a [`Sink`].
pub struct SinkSender<T> {
   tx: flume::Sender<T>,
}

impl<T> SinkSender<T> {
   /// Appends `value` to the sink.
   ///
   /// Returns `Err(value)` if the sink has been dropped.
   #[inline]
   pub fn send(&self, value: T) -> Result<(), T> {
      self.tx.send(value).map_err(|err| err.into_inner())
   }

   /// Signals that no further values will be sent.
   ///
   /// Values already sent stay readable.
   #[inline]
   pub fn close(self) {
      drop(self);
   }
}

impl<T> fmt::Debug for SinkSender<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("SinkSender").field("buffered", &self.tx.len()).finish()
   }
}

/// The read half of a result channel.
///
/// Several threads may read from one sink (it is `Sync` when `T: Send`);
/// each value goes to exactly one of them.
pub struct Sink<T = Value> {
   rx: flume::Receiver<T>,
}

impl<T> Sink<T> {
   /// Takes the next value, blocking until one arrives.
   ///
   /// Returns `None` once the sink is closed and drained.
   #[inline]
   pub fn recv(&self) -> Option<T> {
      self.rx.recv().ok()
   }

   /// Takes the next value if one is buffered. Never blocks.
   #[inline]
   pub fn try_recv(&self) -> Option<T> {
      self.rx.try_recv().ok()
   }

   /// Takes the next value, waiting asynchronously for one to arrive.
   ///
   /// Returns `None` once the sink is closed and drained.
   #[inline]
   pub async fn recv_async(&self) -> Option<T> {
      self.rx.recv_async().await.ok()
   }

   /// Returns `true` if the sender side has been closed. Buffered values may
   /// still be readable.
   #[inline]
   pub fn is_closed(&self) -> bool {
      self.rx.is_disconnected()
   }

   /// Number of values currently buffered.
   #[inline]
   pub fn len(&self) -> usize {
      self.rx.len()
   }

   /// Returns `true` if no values are currently buffered.
   #[inline]
   pub fn is_empty(&self) -> bool {
      self.rx.is_empty()
   }

   /// A blocking iterator over the values, ending when the sink is closed
   /// and drained.
   #[inline]
   pub fn iter(&self) -> flume::Iter<'_, T> {
      self.rx.iter()
   }
}

impl<T> FromIterator<T> for Sink<T> {
   /// Creates a closed sink holding every value of `iter`, in order.
   fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
      let (tx, rx) = flume::unbounded();
      for value in iter {
         tx.send(value).ok();
      }
      Self { rx }
   }
}

impl<T> IntoIterator for Sink<T> {
   type Item = T;
   type IntoIter = flume::IntoIter<T>;

   #[inline]
   fn into_iter(self) -> Self::IntoIter {
      self.rx.into_iter()
   }
}

impl<'a, T> IntoIterator for &'a Sink<T> {
   type Item = T;
   type IntoIter = flume::Iter<'a, T>;

   #[inline]
   fn into_iter(self) -> Self::IntoIter {
      self.iter()
   }
}

impl<T> fmt::Debug for Sink<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Sink")
         .field("buffered", &self.rx.len())
         .field("closed", &self.is_closed())
         .finish()
   }
}

/// Outcome of a sink-delivering call on a guard.
#[must_use]
#[derive(Debug)]
pub enum Delivery<T = Value> {
   /// This caller ran the operation; the sink holds its results and is
   /// already closed.
   Won(Sink<T>),
   /// Another caller ran (or had already run) the operation. There is
   /// nothing to wait for.
   Lost,
}

impl<T> Delivery<T> {
   /// Returns `true` if this caller ran the operation.
   #[inline]
   pub fn is_won(&self) -> bool {
      matches!(self, Self::Won(_))
   }

   /// Returns `true` if another caller ran the operation.
   #[inline]
   pub fn is_lost(&self) -> bool {
      matches!(self, Self::Lost)
   }

   /// Returns the sink if this caller won.
   #[inline]
   pub fn into_sink(self) -> Option<Sink<T>> {
      match self {
         Self::Won(sink) => Some(sink),
         Self::Lost => None,
      }
   }
}
