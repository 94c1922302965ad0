//! Invoking operations by name.
//!
//! A [`Dispatcher`] resolves an operation name against a target and runs it
//! with positional, type-erased arguments. [`MethodTable`] is the stock
//! implementation: a table built once at registration time that maps names to
//! typed closures and does the downcasting for them. Any
//! `Fn(&T, &str, Vec<Value>) -> Result<Vec<Value>, DispatchError>` is a
//! dispatcher too, for callers that prefer a hand-written `match`.

use core::any::{type_name, Any};
use core::fmt;
use std::collections::HashMap;
use std::error::Error;

/// A type-erased argument or result.
pub type Value = Box<dyn Any + Send>;

/// Boxes each expression into a [`Value`], producing a `Vec<Value>`.
///
/// ```
/// let args = resync::args![1i64, "two", 3.0f64];
/// assert_eq!(args.len(), 3);
/// assert_eq!(args[1].downcast_ref::<&str>(), Some(&"two"));
/// ```
#[macro_export]
macro_rules! args {
   () => {
      ::std::vec::Vec::<$crate::Value>::new()
   };
   ($($arg:expr),+ $(,)?) => {
      ::std::vec![$(::std::boxed::Box::new($arg) as $crate::Value),+]
   };
}

/// Errors raised while resolving or invoking a named operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
   /// The target exposes no operation with this name.
   OperationNotFound { operation: String },
   /// The operation takes `expected` arguments but `found` were given.
   ArityMismatch {
      operation: String,
      expected: usize,
      found: usize,
   },
   /// The argument at `index` is not of the type the operation takes.
   ArgumentType {
      operation: String,
      index: usize,
      expected: &'static str,
   },
}

impl fmt::Display for DispatchError {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self {
         Self::OperationNotFound { operation } => {
            write!(f, "operation `{operation}` not found")
         }
         Self::ArityMismatch {
            operation,
            expected,
            found,
         } => write!(
            f,
            "operation `{operation}` takes {expected} argument(s) but {found} were given"
         ),
         Self::ArgumentType {
            operation,
            index,
            expected,
         } => write!(
            f,
            "argument {index} of operation `{operation}` is not a `{expected}`"
         ),
      }
   }
}

impl Error for DispatchError {}

/// Invokes named operations on targets of type `T`.
pub trait Dispatcher<T: ?Sized> {
   /// Looks up the operation `name` on `target` and calls it with `args`,
   /// returning its results in order.
   fn invoke(&self, target: &T, name: &str, args: Vec<Value>) -> Result<Vec<Value>, DispatchError>;
}

impl<T, F> Dispatcher<T> for F
where
   T: ?Sized,
   F: Fn(&T, &str, Vec<Value>) -> Result<Vec<Value>, DispatchError>,
{
   #[inline]
   fn invoke(&self, target: &T, name: &str, args: Vec<Value>) -> Result<Vec<Value>, DispatchError> {
      self(target, name, args)
   }
}

/// Converts an operation's return value into an ordered list of results.
///
/// `()` yields no results, a tuple yields one result per field, and a single
/// scalar or string yields one result. Return a `Vec<Value>` to produce a
/// variable number of results.
pub trait IntoValues {
   /// Splits `self` into result values, in order.
   fn into_values(self) -> Vec<Value>;
}

impl IntoValues for () {
   #[inline]
   fn into_values(self) -> Vec<Value> {
      Vec::new()
   }
}

impl IntoValues for Vec<Value> {
   #[inline]
   fn into_values(self) -> Vec<Value> {
      self
   }
}

macro_rules! impl_into_values_scalar {
   ($($ty:ty),* $(,)?) => {
      $(
         impl IntoValues for $ty {
            #[inline]
            fn into_values(self) -> Vec<Value> {
               vec![Box::new(self)]
            }
         }
      )*
   };
}

impl_into_values_scalar!(
   bool,
   char,
   i8,
   i16,
   i32,
   i64,
   i128,
   isize,
   u8,
   u16,
   u32,
   u64,
   u128,
   usize,
   f32,
   f64,
   String,
   &'static str,
);

macro_rules! impl_into_values_tuple {
   ($($name:ident),+) => {
      impl<$($name: Any + Send),+> IntoValues for ($($name,)+) {
         #[allow(non_snake_case)]
         #[inline]
         fn into_values(self) -> Vec<Value> {
            let ($($name,)+) = self;
            vec![$(Box::new($name) as Value),+]
         }
      }
   };
}

impl_into_values_tuple!(A);
impl_into_values_tuple!(A, B);
impl_into_values_tuple!(A, B, C);
impl_into_values_tuple!(A, B, C, D);
impl_into_values_tuple!(A, B, C, D, E);
impl_into_values_tuple!(A, B, C, D, E, F);

/// A typed closure that can be stored in a [`MethodTable`].
///
/// Implemented for `Fn(&T, A0, .., An) -> R` with up to six arguments, where
/// every argument is `'static` and `R: IntoValues`. The `Args` parameter only
/// tells the arities apart.
pub trait Handler<T: ?Sized, Args>: Send + Sync + 'static {
   /// Number of arguments the handler takes.
   const ARITY: usize;

   /// Downcasts `args` and calls the handler. Fails with
   /// [`DispatchError::ArityMismatch`] unless exactly
   /// [`ARITY`](Self::ARITY) arguments are given.
   fn call(&self, target: &T, operation: &str, args: Vec<Value>) -> Result<Vec<Value>, DispatchError>;
}

fn next_arg<A: Any>(
   operation: &str,
   index: usize,
   args: &mut std::vec::IntoIter<Value>,
) -> Result<A, DispatchError> {
   let Some(value) = args.next() else {
      return Err(DispatchError::ArityMismatch {
         operation: operation.to_owned(),
         expected: index + 1,
         found: index,
      });
   };
   value
      .downcast::<A>()
      .map(|boxed| *boxed)
      .map_err(|_| DispatchError::ArgumentType {
         operation: operation.to_owned(),
         index,
         expected: type_name::<A>(),
      })
}

macro_rules! count {
   () => { 0usize };
   ($head:ident $($tail:ident)*) => { 1usize + count!($($tail)*) };
}

macro_rules! impl_handler {
   ($($arg:ident),*) => {
      impl<T, F, R, $($arg,)*> Handler<T, ($($arg,)*)> for F
      where
         T: ?Sized,
         F: Fn(&T, $($arg),*) -> R + Send + Sync + 'static,
         R: IntoValues,
         $($arg: Any,)*
      {
         const ARITY: usize = count!($($arg)*);

         #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
         fn call(&self, target: &T, operation: &str, args: Vec<Value>) -> Result<Vec<Value>, DispatchError> {
            if args.len() != Self::ARITY {
               return Err(DispatchError::ArityMismatch {
                  operation: operation.to_owned(),
                  expected: Self::ARITY,
                  found: args.len(),
               });
            }
            let mut args = args.into_iter();
            let mut index = 0;
            $(
               let $arg = next_arg::<$arg>(operation, index, &mut args)?;
               index += 1;
            )*
            Ok((self)(target, $($arg),*).into_values())
         }
      }
   };
}

impl_handler!();
impl_handler!(A0);
impl_handler!(A0, A1);
impl_handler!(A0, A1, A2);
impl_handler!(A0, A1, A2, A3);
impl_handler!(A0, A1, A2, A3, A4);
impl_handler!(A0, A1, A2, A3, A4, A5);

type Method<T> = Box<dyn Fn(&T, &str, Vec<Value>) -> Result<Vec<Value>, DispatchError> + Send + Sync>;

struct Entry<T: ?Sized> {
   arity: usize,
   method: Method<T>,
}

/// A name → operation table for targets of type `T`.
///
/// Built once, then shared; lookups take `&self`.
///
/// ```
/// use resync::{args, Dispatcher, MethodTable};
///
/// struct Point(i32, i32);
///
/// let table = MethodTable::new()
///    .method("X", |p: &Point| p.0)
///    .method("Swap", |p: &Point| (p.1, p.0))
///    .method("Scaled", |p: &Point, k: i32| (p.0 * k, p.1 * k));
///
/// let results = table.invoke(&Point(1, 2), "Scaled", args![10i32]).unwrap();
/// assert_eq!(results.len(), 2);
/// assert_eq!(results[1].downcast_ref::<i32>(), Some(&20));
/// ```
pub struct MethodTable<T: ?Sized> {
   entries: HashMap<String, Entry<T>>,
}

impl<T: ?Sized + 'static> MethodTable<T> {
   /// Creates an empty table.
   #[must_use]
   pub fn new() -> Self {
      Self {
         entries: HashMap::new(),
      }
   }

   /// Registers `handler` under `name`, replacing any previous registration.
   #[must_use]
   pub fn method<Args, H>(mut self, name: impl Into<String>, handler: H) -> Self
   where
      Args: 'static,
      H: Handler<T, Args>,
   {
      self.insert::<Args, H>(name, handler);
      self
   }

   /// Registers `handler` under `name` in place, returning `true` if it
   /// replaced an earlier registration.
   pub fn insert<Args, H>(&mut self, name: impl Into<String>, handler: H) -> bool
   where
      Args: 'static,
      H: Handler<T, Args>,
   {
      let entry = Entry {
         arity: H::ARITY,
         method: Box::new(move |target: &T, operation: &str, args: Vec<Value>| {
            handler.call(target, operation, args)
         }),
      };
      self.entries.insert(name.into(), entry).is_some()
   }

   /// Returns `true` if an operation named `name` is registered.
   #[inline]
   pub fn contains(&self, name: &str) -> bool {
      self.entries.contains_key(name)
   }

   /// Number of arguments the operation `name` takes, if registered.
   #[inline]
   pub fn arity(&self, name: &str) -> Option<usize> {
      self.entries.get(name).map(|entry| entry.arity)
   }

   /// Names of all registered operations, in no particular order.
   pub fn names(&self) -> impl Iterator<Item = &str> {
      self.entries.keys().map(String::as_str)
   }

   /// Number of registered operations.
   #[inline]
   pub fn len(&self) -> usize {
      self.entries.len()
   }

   /// Returns `true` if no operations are registered.
   #[inline]
   pub fn is_empty(&self) -> bool {
      self.entries.is_empty()
   }
}

impl<T: ?Sized + 'static> Default for MethodTable<T> {
   fn default() -> Self {
      Self::new()
   }
}

impl<T: ?Sized> Dispatcher<T> for MethodTable<T> {
   fn invoke(&self, target: &T, name: &str, args: Vec<Value>) -> Result<Vec<Value>, DispatchError> {
      let Some(entry) = self.entries.get(name) else {
         return Err(DispatchError::OperationNotFound {
            operation: name.to_owned(),
         });
      };
      if args.len() != entry.arity {
         return Err(DispatchError::ArityMismatch {
            operation: name.to_owned(),
            expected: entry.arity,
            found: args.len(),
         });
      }
      (entry.method)(target, name, args)
   }
}

impl<T: ?Sized> fmt::Debug for MethodTable<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut names: Vec<_> = self.entries.keys().collect();
      names.sort();
      f.debug_struct("MethodTable").field("methods", &names).finish()
   }
}
