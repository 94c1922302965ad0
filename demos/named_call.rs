use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use resync::{args, Delivery, MethodTable, OnceGuard};

struct Counter(AtomicI64);

impl Counter {
   fn add(&self, d: i64) {
      self.0.fetch_add(d, Ordering::SeqCst);
   }

   fn get_result(&self) -> i64 {
      self.0.fetch_add(1, Ordering::SeqCst) + 1
   }
}

fn main() -> Result<(), resync::DispatchError> {
   let methods = Arc::new(
      MethodTable::new()
         .method("Add", Counter::add)
         .method("GetResult", Counter::get_result),
   );
   let counter = Arc::new(Counter(AtomicI64::new(0)));

   // Only the first of these adds lands
   let add_once = OnceGuard::new();
   for _ in 0..3 {
      add_once.call_named(&*methods, &*counter, "Add", args![10i64])?;
   }
   println!("After Add: {}", counter.0.load(Ordering::SeqCst));

   // Only the winning thread gets the results
   let fetch_once = Arc::new(OnceGuard::new());
   let threads: Vec<_> = (0..5)
      .map(|i| {
         let (methods, counter, guard) = (methods.clone(), counter.clone(), fetch_once.clone());
         std::thread::spawn(move || {
            match guard.call_named_to_sink(&*methods, &*counter, "GetResult", args![]) {
               Ok(Delivery::Won(sink)) => {
                  for value in sink {
                     println!("Thread {i} won: {:?}", value.downcast_ref::<i64>());
                  }
               }
               Ok(Delivery::Lost) => println!("Thread {i} lost"),
               Err(err) => println!("Thread {i} failed: {err}"),
            }
         })
      })
      .collect();

   for t in threads {
      t.join().unwrap();
   }
   Ok(())
}
