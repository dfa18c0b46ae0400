//! Integration tests for exception construction and raising
//!
//! The recording fixtures below stand in for the unwinder, the blocking
//! section tracker and the process boundary, and write every call they see to
//! a shared log so ordering can be checked.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use heron_gc::{FaultPolicy, GcConfig, Value, tags};
use heron_runtime::unwind;
use heron_runtime::{
    BlockingSection, ExceptionObject, ExnTag, Predefined, ProcessBoundary, Runtime,
    RuntimeConfig, RuntimeError, UncaughtException, Unwinder,
};

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    SectionEnter,
    SectionExit,
    Transfer(ExceptionObject),
    Terminate(ExceptionObject),
}

type Log = Rc<RefCell<Vec<Event>>>;

struct RecordingUnwinder {
    log: Log,
    depth: usize,
}

impl Unwinder for RecordingUnwinder {
    fn has_handler(&self) -> bool {
        self.depth > 0
    }

    fn enter_handler(&mut self) {
        self.depth += 1;
    }

    fn leave_handler(&mut self) {
        self.depth -= 1;
    }

    fn transfer_to_handler(&mut self, exn: ExceptionObject) -> ! {
        self.log.borrow_mut().push(Event::Transfer(exn));
        unwind::unwind(exn)
    }
}

struct RecordingSection {
    log: Log,
    active: bool,
}

impl BlockingSection for RecordingSection {
    fn enter_blocking_section(&mut self) {
        self.log.borrow_mut().push(Event::SectionEnter);
        self.active = true;
    }

    fn exit_blocking_section(&mut self) {
        self.log.borrow_mut().push(Event::SectionExit);
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

struct RecordingBoundary {
    log: Log,
}

impl ProcessBoundary for RecordingBoundary {
    fn terminate(&mut self, report: UncaughtException) -> ! {
        self.log
            .borrow_mut()
            .push(Event::Terminate(report.exception()));
        panic::resume_unwind(Box::new(report))
    }
}

fn recording_runtime(config: RuntimeConfig) -> (Runtime, Log) {
    let log: Log = Rc::default();
    let rt = Runtime::with_config(config)
        .with_unwinder(RecordingUnwinder {
            log: log.clone(),
            depth: 0,
        })
        .with_blocking_section(RecordingSection {
            log: log.clone(),
            active: false,
        })
        .with_boundary(RecordingBoundary { log: log.clone() });
    (rt, log)
}

fn gc_config(gc: GcConfig) -> RuntimeConfig {
    RuntimeConfig {
        gc,
        ..RuntimeConfig::default()
    }
}

fn catch(rt: &mut Runtime, body: impl FnOnce(&mut Runtime)) -> ExceptionObject {
    rt.try_with(body).err().expect("body should raise")
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_build_n_arg_any_arity() {
    let mut rt = Runtime::new();
    let tags_under_test = [
        ExnTag::from(Predefined::Failure),
        ExnTag::from(Predefined::SysError),
        rt.define_exception("Custom"),
    ];

    for tag in tags_under_test {
        for n in 0..6 {
            let args: Vec<Value> = (0..n).map(|i| Value::Int(i * 10)).collect();
            let exn = rt.build_n_arg(tag, &args);
            assert_eq!(exn.tag(rt.heap()), Some(tag));
            assert_eq!(exn.args(rt.heap()), Some(args.as_slice()));
            assert_eq!(exn.arity(rt.heap()), n as usize);
        }
    }
}

#[test]
fn test_collection_during_construction_relocates_roots() {
    let mut rt = Runtime::with_config(gc_config(GcConfig::stress()));
    let first = rt.intern_text(b"alpha");
    let id = rt.register_global(first);
    let second = rt.intern_text(b"beta");
    let first = rt.global(id).unwrap();

    let before = rt.heap().stats().collections;
    let depth = rt.heap().root_depth();
    let exn = rt.build_n_arg(Predefined::Failure, &[first, Value::Int(5), second]);

    let heap = rt.heap();
    assert!(heap.stats().collections > before);
    assert_eq!(heap.root_depth(), depth);

    let args = exn.args(heap).unwrap();
    assert_ne!(args[0], first);
    assert_ne!(args[2], second);
    assert_eq!(heap.string(args[0]).as_deref(), Some("alpha"));
    assert_eq!(args[1], Value::Int(5));
    assert_eq!(heap.string(args[2]).as_deref(), Some("beta"));
    assert_eq!(rt.global(id), Some(args[0]));
}

#[test]
fn test_nested_protection_under_stress() {
    let mut rt = Runtime::with_config(gc_config(GcConfig::stress()));
    let outer = rt.intern_text(b"outer");

    let mut scope = rt.heap_mut().protect(&[outer]);
    let inner = scope.heap().alloc_string(b"inner").unwrap();
    {
        let mut nested = scope.heap().protect(&[inner]);
        let pair = nested
            .heap()
            .allocate_protected(&[], 2, tags::RECORD, |_, _| {})
            .unwrap();
        assert!(nested.heap_ref().contains(pair));
        let inner = nested.get(0).unwrap();
        assert_eq!(nested.heap_ref().string(inner).as_deref(), Some("inner"));
    }
    let outer = scope.get(0).unwrap();
    assert_eq!(scope.heap_ref().string(outer).as_deref(), Some("outer"));
    drop(scope);

    assert_eq!(rt.heap().root_depth(), 0);
}

// ============================================================================
// Out_of_memory
// ============================================================================

#[test]
fn test_out_of_memory_never_allocates() {
    let mut rt = Runtime::with_config(gc_config(GcConfig::failing()));
    let calls = rt.heap().stats().allocation_calls;

    let exn = catch(&mut rt, |rt| rt.out_of_memory());

    assert!(exn.is_out_of_memory());
    assert_eq!(exn.tag(rt.heap()), Some(Predefined::OutOfMemory.into()));
    assert_eq!(rt.heap().stats().allocation_calls, calls);
}

#[test]
fn test_out_of_memory_is_singleton() {
    let mut rt = Runtime::new();
    let first = catch(&mut rt, |rt| rt.out_of_memory());
    let second = catch(&mut rt, |rt| rt.out_of_memory());

    assert_eq!(first, second);
    assert_eq!(first.value(), second.value());
    assert_eq!(first.constructor(rt.heap()), second.constructor(rt.heap()));
    assert_eq!(first.args(rt.heap()), Some(&[][..]));
    assert_eq!(second.args(rt.heap()), Some(&[][..]));
}

#[test]
fn test_failed_construction_raises_out_of_memory() {
    let mut rt = Runtime::with_config(gc_config(GcConfig {
        fault: FaultPolicy::AfterAllocations(1),
        ..GcConfig::default()
    }));
    let message = rt.intern_text(b"disk full");

    let exn = catch(&mut rt, |rt| rt.sys_error(message));
    assert!(exn.is_out_of_memory());
    assert_eq!(rt.heap().stats().failed_allocations, 1);
}

#[test]
fn test_heap_limit_raises_out_of_memory() {
    let mut rt = Runtime::with_config(gc_config(GcConfig {
        heap_limit_words: Some(4),
        ..GcConfig::default()
    }));

    let exn = catch(&mut rt, |rt| rt.failure("this message does not fit"));
    assert!(exn.is_out_of_memory());
}

#[test]
fn test_repeated_raises_under_heap_limit() {
    let mut rt = Runtime::with_config(gc_config(GcConfig {
        heap_limit_words: Some(16),
        ..GcConfig::default()
    }));

    for i in 0..100 {
        let exn = catch(&mut rt, |rt| rt.not_found());
        assert_eq!(
            exn.tag(rt.heap()),
            Some(Predefined::NotFound.into()),
            "iteration {i}"
        );

        let exn = catch(&mut rt, |rt| rt.failure("again"));
        assert!(!exn.is_out_of_memory(), "iteration {i}");
        assert_eq!(rt.describe(exn), "Failure(\"again\")");
    }
    assert!(rt.heap().stats().collections > 0);
    assert_eq!(rt.heap().stats().failed_allocations, 0);
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_section_exit_precedes_transfer() {
    let (mut rt, log) = recording_runtime(RuntimeConfig::default());

    let exn = catch(&mut rt, |rt| {
        rt.enter_blocking_section();
        rt.not_found()
    });

    assert_eq!(
        *log.borrow(),
        vec![
            Event::SectionEnter,
            Event::SectionExit,
            Event::Transfer(exn)
        ]
    );
}

#[test]
fn test_section_exit_called_without_section() {
    let (mut rt, log) = recording_runtime(RuntimeConfig::default());

    let exn = catch(&mut rt, |rt| rt.end_of_file());

    assert_eq!(*log.borrow(), vec![Event::SectionExit, Event::Transfer(exn)]);
}

#[test]
fn test_blocking_scope_raise() {
    let (mut rt, log) = recording_runtime(RuntimeConfig::default());

    let exn = catch(&mut rt, |rt| rt.blocking(|rt| rt.division_by_zero()));

    assert!(!rt.in_blocking_section());
    let exits = log
        .borrow()
        .iter()
        .filter(|e| **e == Event::SectionExit)
        .count();
    assert_eq!(exits, 1);
    assert_eq!(log.borrow().last(), Some(&Event::Transfer(exn)));
}

#[test]
fn test_failure_end_to_end() {
    let mut rt = Runtime::with_config(gc_config(GcConfig::stress()));

    let exn = catch(&mut rt, |rt| rt.failure("bad input"));

    let heap = rt.heap();
    assert_eq!(exn.tag(heap), Some(Predefined::Failure.into()));
    let args = exn.args(heap).unwrap();
    assert_eq!(args.len(), 1);
    assert_eq!(heap.string(args[0]).as_deref(), Some("bad input"));
}

#[test]
fn test_zero_arg_raises_are_distinguishable() {
    let mut rt = Runtime::new();

    let div = catch(&mut rt, |rt| rt.division_by_zero());
    let missing = catch(&mut rt, |rt| rt.not_found());

    let heap = rt.heap();
    assert_eq!(div.arity(heap), 0);
    assert_eq!(missing.arity(heap), 0);
    assert_eq!(div.tag(heap), Some(Predefined::DivisionByZero.into()));
    assert_eq!(missing.tag(heap), Some(Predefined::NotFound.into()));
    assert_ne!(div.constructor(heap), missing.constructor(heap));
}

#[test]
fn test_invalid_argument() {
    let mut rt = Runtime::new();
    let exn = catch(&mut rt, |rt| rt.invalid_argument("index out of bounds"));
    assert_eq!(rt.describe(exn), "Invalid_argument(\"index out of bounds\")");
}

#[test]
fn test_uncaught_reaches_boundary_once() {
    let (mut rt, log) = recording_runtime(RuntimeConfig::default());

    let payload = panic::catch_unwind(AssertUnwindSafe(|| {
        rt.raise_zero_arg(Predefined::NotFound);
    }))
    .err()
    .unwrap();
    let report = payload.downcast::<UncaughtException>().unwrap();

    let terminations: Vec<_> = log
        .borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Terminate(exn) => Some(*exn),
            _ => None,
        })
        .collect();
    assert_eq!(terminations, vec![report.exception()]);
    assert!(!log.borrow().iter().any(|e| matches!(e, Event::Transfer(_))));
    assert_eq!(log.borrow().first(), Some(&Event::SectionExit));
    assert_eq!(report.description(), "Not_found");
}

#[test]
fn test_uncaught_bucket_is_unchanged() {
    let (mut rt, log) = recording_runtime(RuntimeConfig::default());
    let exn = rt.build_with_string(Predefined::Failure, "fatal");

    let _ = panic::catch_unwind(AssertUnwindSafe(|| {
        rt.raise(exn);
    }));

    assert_eq!(
        *log.borrow(),
        vec![Event::SectionExit, Event::Terminate(exn)]
    );
}

// ============================================================================
// Handlers
// ============================================================================

#[test]
fn test_nested_handlers() {
    let mut rt = Runtime::new();

    let outer = catch(&mut rt, |rt| {
        let inner = rt.try_with(|rt| rt.not_found()).err().unwrap();
        assert_eq!(inner.tag(rt.heap()), Some(Predefined::NotFound.into()));
        rt.end_of_file()
    });

    assert_eq!(outer.tag(rt.heap()), Some(Predefined::EndOfFile.into()));
}

#[test]
fn test_catch_restores_root_depth() {
    let mut rt = Runtime::new();
    let depth = rt.heap().root_depth();

    let exn = catch(&mut rt, |rt| {
        let s = rt.intern_text(b"held");
        let scope = rt.heap_mut().protect(&[s, s]);
        std::mem::forget(scope);
        rt.failure("while protected")
    });

    assert_eq!(rt.heap().root_depth(), depth);
    assert_eq!(rt.describe(exn), "Failure(\"while protected\")");
}

#[test]
fn test_foreign_panic_passes_through() {
    let mut rt = Runtime::new();

    let payload = panic::catch_unwind(AssertUnwindSafe(|| {
        let _ = rt.try_with(|_| panic::resume_unwind(Box::new("not a raise")));
    }))
    .err()
    .unwrap();

    assert_eq!(payload.downcast_ref::<&str>(), Some(&"not a raise"));
}

#[test]
fn test_user_exception_survives_collection() {
    let mut rt = Runtime::with_config(gc_config(GcConfig::stress()));
    let tag = rt.define_exception("Config_error");
    let before = rt.constructor(tag).unwrap();

    let exn = catch(&mut rt, |rt| rt.raise_with_string(tag, "missing key"));

    let heap = rt.heap();
    assert_eq!(exn.tag(heap), Some(tag));
    assert_ne!(exn.constructor(heap), Some(before));
    assert_eq!(rt.describe(exn), "Config_error(\"missing key\")");
}

#[test]
fn test_run_toplevel_reports_uncaught() {
    let mut rt = Runtime::new();

    assert_eq!(rt.run_toplevel(|_| 7).ok(), Some(7));

    let err = rt.run_toplevel(|rt| rt.match_failure("main.ml", 3, 7)).err().unwrap();
    let RuntimeError::Uncaught(report) = &err;
    assert_eq!(report.description(), "Match_failure(\"main.ml\", 3, 7)");
    assert_eq!(
        err.to_string(),
        "uncaught exception Match_failure(\"main.ml\", 3, 7)"
    );
}
