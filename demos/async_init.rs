use std::sync::atomic::{AtomicUsize, Ordering};

use resync::OnceGuard;
use tokio::time::{sleep, Duration};

static COUNTER: AtomicUsize = AtomicUsize::new(0);
static CONNECT: OnceGuard = OnceGuard::new();

async fn connect() -> bool {
   CONNECT
      .call_once_async(|| async {
         // This async block runs only once
         COUNTER.fetch_add(1, Ordering::Relaxed);
         println!("Connecting...");
         sleep(Duration::from_millis(50)).await;
      })
      .await
      .is_some()
}

#[tokio::main]
async fn main() {
   let tasks: Vec<_> = (0..5)
      .map(|i| {
         tokio::spawn(async move {
            let won = connect().await;
            println!("Task {i}: {}", if won { "connected" } else { "reused connection" });
         })
      })
      .collect();

   for t in tasks {
      t.await.unwrap();
   }

   assert!(CONNECT.is_fired());
   assert_eq!(COUNTER.load(Ordering::Relaxed), 1); // Action ran only once
}
