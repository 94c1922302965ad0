use std::sync::Mutex;

use resync::{args, DispatchError, Dispatcher, Handler, MethodTable, Value};

#[derive(Default)]
struct Log(Mutex<Vec<String>>);

impl Log {
   fn push(&self, line: String) {
      self.0.lock().unwrap().push(line);
   }

   fn lines(&self) -> Vec<String> {
      self.0.lock().unwrap().clone()
   }
}

fn table() -> MethodTable<Log> {
   MethodTable::new()
      .method("Clear", |log: &Log| log.0.lock().unwrap().clear())
      .method("Push", |log: &Log, line: String| log.push(line))
      .method("Len", |log: &Log| log.lines().len())
      .method("Join", |log: &Log, sep: &'static str, upper: bool| {
         let joined = log.lines().join(sep);
         if upper {
            joined.to_uppercase()
         } else {
            joined
         }
      })
      .method("Stats", |log: &Log| {
         let lines = log.lines();
         let total: usize = lines.iter().map(String::len).sum();
         (lines.len(), total)
      })
      .method("Each", |log: &Log| {
         log.lines()
            .into_iter()
            .map(|line| Box::new(line) as Value)
            .collect::<Vec<Value>>()
      })
}

#[test]
fn test_invoke_positional_args_and_results() {
   let table = table();
   let log = Log::default();

   let results = table.invoke(&log, "Push", args![String::from("a")]).unwrap();
   assert!(results.is_empty());
   table.invoke(&log, "Push", args![String::from("b")]).unwrap();

   let joined = table.invoke(&log, "Join", args!["-", true]).unwrap();
   assert_eq!(joined.len(), 1);
   assert_eq!(joined[0].downcast_ref::<String>().map(String::as_str), Some("A-B"));

   let stats = table.invoke(&log, "Stats", args![]).unwrap();
   assert_eq!(stats[0].downcast_ref::<usize>(), Some(&2));
   assert_eq!(stats[1].downcast_ref::<usize>(), Some(&2));
}

#[test]
fn test_variable_results() {
   let table = table();
   let log = Log::default();
   for line in ["x", "y", "z"] {
      table.invoke(&log, "Push", args![line.to_string()]).unwrap();
   }

   let results = table.invoke(&log, "Each", args![]).unwrap();
   let lines: Vec<&str> = results
      .iter()
      .map(|value| value.downcast_ref::<String>().unwrap().as_str())
      .collect();
   assert_eq!(lines, ["x", "y", "z"]);

   table.invoke(&log, "Clear", args![]).unwrap();
   let len = table.invoke(&log, "Len", args![]).unwrap();
   assert_eq!(len[0].downcast_ref::<usize>(), Some(&0));
}

#[test]
fn test_operation_not_found() {
   let table = table();
   let err = table.invoke(&Log::default(), "Pop", args![]).unwrap_err();
   assert_eq!(
      err,
      DispatchError::OperationNotFound {
         operation: "Pop".into()
      }
   );
   assert_eq!(err.to_string(), "operation `Pop` not found");
}

#[test]
fn test_arity_mismatch() {
   let table = table();
   let log = Log::default();

   let err = table
      .invoke(&log, "Push", args![String::from("a"), 1u8])
      .unwrap_err();
   assert_eq!(
      err,
      DispatchError::ArityMismatch {
         operation: "Push".into(),
         expected: 1,
         found: 2,
      }
   );
   assert_eq!(
      err.to_string(),
      "operation `Push` takes 1 argument(s) but 2 were given"
   );
   // Nothing ran
   assert!(log.lines().is_empty());
}

#[test]
fn test_handler_rejects_extra_arguments() {
   let push = |log: &Log, line: String| log.push(line);
   let log = Log::default();

   let err = <_ as Handler<Log, (String,)>>::call(
      &push,
      &log,
      "Push",
      args![String::from("a"), String::from("b")],
   )
   .unwrap_err();
   assert_eq!(
      err,
      DispatchError::ArityMismatch {
         operation: "Push".into(),
         expected: 1,
         found: 2,
      }
   );
   assert!(log.lines().is_empty());

   let err = <_ as Handler<Log, (String,)>>::call(&push, &log, "Push", args![]).unwrap_err();
   assert!(matches!(err, DispatchError::ArityMismatch { expected: 1, found: 0, .. }));

   <_ as Handler<Log, (String,)>>::call(&push, &log, "Push", args![String::from("c")]).unwrap();
   assert_eq!(log.lines(), ["c"]);
}

#[test]
fn test_argument_type_mismatch() {
   let table = table();
   let err = table
      .invoke(&Log::default(), "Join", args!["-", 1u8])
      .unwrap_err();
   assert_eq!(
      err,
      DispatchError::ArgumentType {
         operation: "Join".into(),
         index: 1,
         expected: "bool",
      }
   );
}

#[test]
fn test_table_introspection() {
   let mut table = table();
   assert_eq!(table.len(), 6);
   assert!(!table.is_empty());
   assert!(table.contains("Join"));
   assert!(!table.contains("join"));
   assert_eq!(table.arity("Join"), Some(2));
   assert_eq!(table.arity("Clear"), Some(0));
   assert_eq!(table.arity("Missing"), None);

   let mut names: Vec<_> = table.names().collect();
   names.sort_unstable();
   assert_eq!(names, ["Clear", "Each", "Join", "Len", "Push", "Stats"]);

   // Re-registering replaces the old handler
   assert!(table.insert("Len", |_: &Log| 99usize));
   let len = table.invoke(&Log::default(), "Len", args![]).unwrap();
   assert_eq!(len[0].downcast_ref::<usize>(), Some(&99));

   assert!(MethodTable::<Log>::default().is_empty());
}

#[test]
fn test_debug_lists_methods() {
   let table = MethodTable::new()
      .method("b", |_: &Log| ())
      .method("a", |_: &Log| ());
   assert_eq!(format!("{table:?}"), r#"MethodTable { methods: ["a", "b"] }"#);
}
