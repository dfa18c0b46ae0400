//! Raising
//!
//! Every raising entry point funnels into [`Runtime::raise`], which leaves any
//! blocking section before handing the bucket to the unwinder. With no handler
//! installed the bucket goes to the process boundary instead.

use heron_gc::{Value, tags};

use crate::error::UncaughtException;
use crate::exception::ExceptionObject;
use crate::runtime::Runtime;
use crate::tag::{ExnTag, Predefined};

impl Runtime {
    /// Transfer control to the innermost handler with `exn` as its result
    pub fn raise(&mut self, exn: ExceptionObject) -> ! {
        // Handlers assume managed invariants hold
        self.section.exit_blocking_section();

        if !self.unwinder.has_handler() {
            self.uncaught(exn)
        }
        tracing::trace!(target: "heron::raise", bucket = ?exn.value(), "raise");
        self.unwinder.transfer_to_handler(exn)
    }

    /// Raise a bucket with no arguments
    pub fn raise_zero_arg(&mut self, tag: impl Into<ExnTag>) -> ! {
        let exn = self.build_zero_arg(tag);
        self.raise(exn)
    }

    /// Raise a bucket carrying `args`
    pub fn raise_n_arg(&mut self, tag: impl Into<ExnTag>, args: &[Value]) -> ! {
        let exn = self.build_n_arg(tag, args);
        self.raise(exn)
    }

    /// Raise a bucket carrying one argument
    pub fn raise_with_arg(&mut self, tag: impl Into<ExnTag>, arg: Value) -> ! {
        self.raise_n_arg(tag, &[arg])
    }

    /// Raise a bucket carrying a copy of `text`
    pub fn raise_with_string(&mut self, tag: impl Into<ExnTag>, text: &str) -> ! {
        let exn = self.build_with_string(tag, text);
        self.raise(exn)
    }

    /// Raise `Failure(message)`
    pub fn failure(&mut self, message: &str) -> ! {
        self.raise_with_string(Predefined::Failure, message)
    }

    /// Raise `Invalid_argument(message)`
    pub fn invalid_argument(&mut self, message: &str) -> ! {
        self.raise_with_string(Predefined::InvalidArgument, message)
    }

    /// Raise `Sys_error(message)` with an already built message value
    pub fn sys_error(&mut self, message: Value) -> ! {
        self.raise_with_arg(Predefined::SysError, message)
    }

    /// Raise `End_of_file`
    pub fn end_of_file(&mut self) -> ! {
        self.raise_zero_arg(Predefined::EndOfFile)
    }

    /// Raise `Division_by_zero`
    pub fn division_by_zero(&mut self) -> ! {
        self.raise_zero_arg(Predefined::DivisionByZero)
    }

    /// Raise `Not_found`
    pub fn not_found(&mut self) -> ! {
        self.raise_zero_arg(Predefined::NotFound)
    }

    /// Raise `Out_of_memory`. Never allocates.
    pub fn out_of_memory(&mut self) -> ! {
        tracing::trace!(target: "heron::raise", "raising Out_of_memory");
        self.raise(ExceptionObject::out_of_memory())
    }

    /// Raise `Match_failure(file, line, column)`
    pub fn match_failure(&mut self, file: &str, line: i64, column: i64) -> ! {
        let file = self.intern_text(file.as_bytes());
        let location =
            match self
                .heap
                .allocate_protected(&[file], 3, tags::RECORD, |roots, fields| {
                    fields[0] = roots[0];
                    fields[1] = Value::Int(line);
                    fields[2] = Value::Int(column);
                }) {
                Ok(v) => v,
                Err(err) => self.allocation_failed(err),
            };
        self.raise_with_arg(Predefined::MatchFailure, location)
    }

    fn uncaught(&mut self, exn: ExceptionObject) -> ! {
        let report = UncaughtException::new(exn, self.describe(exn));
        tracing::error!(target: "heron::raise", "uncaught {report}");
        self.boundary.terminate(report)
    }
}
