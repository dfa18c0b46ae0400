//! Printable rendering of exception objects

use std::fmt::Write;

use heron_gc::{Heap, Value, tags};

use crate::exception::ExceptionObject;
use crate::runtime::Runtime;
use crate::tag::{ExnTag, Predefined};

impl Runtime {
    /// Render `exn` the way an uncaught-exception report shows it, e.g.
    /// `Failure("bad input")` or `Match_failure("main.ml", 3, 7)`
    pub fn describe(&self, exn: ExceptionObject) -> String {
        let heap = self.heap();
        let tag = self.tag_of(exn);
        let name = tag
            .and_then(|tag| self.tag_name(tag))
            .unwrap_or_else(|| "_".to_owned());

        let args = exn.args(heap).unwrap_or_default();
        // Match_failure's single argument is a location tuple, shown inline
        let args = match (tag, args) {
            (Some(ExnTag::Predefined(Predefined::MatchFailure)), [tuple]) => {
                heap.fields(*tuple).unwrap_or(args)
            }
            _ => args,
        };

        if args.is_empty() {
            return name;
        }
        let mut out = name;
        out.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write_value(&mut out, heap, *arg);
        }
        out.push(')');
        out
    }
}

fn write_value(out: &mut String, heap: &Heap, v: Value) {
    if let Value::Int(n) = v {
        let _ = write!(out, "{n}");
        return;
    }
    match heap.header(v).map(|h| h.tag()) {
        Some(tags::STRING) => match heap.string(v) {
            Some(s) => {
                let _ = write!(out, "{s:?}");
            }
            None => out.push('_'),
        },
        _ => out.push('_'),
    }
}
