use std::thread;
use std::time::Duration;

use resync::{channel, Delivery, Sink};

#[test]
fn test_values_in_send_order() {
   let (sender, sink) = channel();
   for i in 0..5 {
      sender.send(i).unwrap();
   }
   sender.close();

   assert!(sink.is_closed());
   assert_eq!(sink.len(), 5);
   let values: Vec<i32> = sink.iter().collect();
   assert_eq!(values, [0, 1, 2, 3, 4]);
   assert!(sink.recv().is_none());
}

#[test]
fn test_recv_blocks_until_closed() {
   let (sender, sink) = channel::<&str>();

   let producer = thread::spawn(move || {
      thread::sleep(Duration::from_millis(20));
      sender.send("late").unwrap();
      thread::sleep(Duration::from_millis(20));
      // Dropping the sender closes the sink
   });

   assert_eq!(sink.recv(), Some("late"));
   assert_eq!(sink.recv(), None);
   producer.join().unwrap();
}

#[test]
fn test_try_recv_never_blocks() {
   let (sender, sink) = channel();
   assert_eq!(sink.try_recv(), None::<u8>);
   assert!(!sink.is_closed());

   sender.send(3).unwrap();
   assert_eq!(sink.try_recv(), Some(3));
   assert!(sink.is_empty());
}

#[test]
fn test_send_after_sink_dropped() {
   let (sender, sink) = channel();
   drop(sink);
   assert_eq!(sender.send(7), Err(7));
}

#[test]
fn test_collect_into_closed_sink() {
   let sink: Sink<u32> = (1..=3).collect();
   assert!(sink.is_closed());
   assert_eq!(sink.len(), 3);
   assert_eq!(sink.into_iter().collect::<Vec<_>>(), [1, 2, 3]);

   let empty: Sink<u32> = std::iter::empty().collect();
   assert!(empty.is_closed());
   assert_eq!(empty.recv(), None);
}

#[test]
fn test_delivery_accessors() {
   let (sender, sink): (_, Sink<u8>) = channel();
   sender.close();

   let won = Delivery::Won(sink);
   assert!(won.is_won());
   assert!(!won.is_lost());
   assert!(won.into_sink().is_some());

   let lost = Delivery::<u8>::Lost;
   assert!(lost.is_lost());
   assert!(lost.into_sink().is_none());
}

#[tokio::test]
async fn test_recv_async() {
   let (sender, sink) = channel();
   sender.send(String::from("a")).unwrap();
   sender.send(String::from("b")).unwrap();
   sender.close();

   assert_eq!(sink.recv_async().await.as_deref(), Some("a"));
   assert_eq!(sink.recv_async().await.as_deref(), Some("b"));
   assert_eq!(sink.recv_async().await, None);
}
