use resync::{args, DispatchError, MethodTable, OnceGuard};

struct Service;

fn main() {
   let methods = MethodTable::new().method("Start", |_: &Service, port: u16| {
      println!("Starting on port {port}");
   });
   let guard = OnceGuard::new();

   // First attempt fails: wrong argument type
   match guard.call_named(&methods, &Service, "Start", args!["8080"]) {
      Ok(()) => panic!("Should have failed"),
      Err(err) => println!("Caught error: {err}"),
   }
   // The failed attempt still fired the guard
   assert!(guard.is_fired());
   assert_eq!(
      guard.call_named(&methods, &Service, "Start", args![8080u16]),
      Ok::<(), DispatchError>(())
   );

   // Re-arm explicitly to try again
   guard.reset();
   match guard.call_named(&methods, &Service, "Start", args![8080u16]) {
      Ok(()) => println!("Started"),
      Err(_) => panic!("Should have succeeded"),
   }
}
