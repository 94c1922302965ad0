use std::sync::atomic::{AtomicUsize, Ordering};

use resync::OnceGuard;

static COUNTER: AtomicUsize = AtomicUsize::new(0);
static SETUP: OnceGuard = OnceGuard::new();

fn ensure_setup() {
   SETUP.call_once(|| {
      // This closure runs only once per arm cycle
      COUNTER.fetch_add(1, Ordering::Relaxed);
      println!("Running setup...");
      std::thread::sleep(std::time::Duration::from_millis(50));
   });
}

fn main() {
   let threads: Vec<_> = (0..5)
      .map(|_| {
         std::thread::spawn(|| {
            ensure_setup();
            println!("Thread sees {} setup run(s)", COUNTER.load(Ordering::Relaxed));
         })
      })
      .collect();

   for t in threads {
      t.join().unwrap();
   }
   assert_eq!(COUNTER.load(Ordering::Relaxed), 1);

   // Re-arm and run setup a second time
   SETUP.reset();
   ensure_setup();
   assert_eq!(COUNTER.load(Ordering::Relaxed), 2);
   println!("Setup ran {} times", COUNTER.load(Ordering::Relaxed));
}
