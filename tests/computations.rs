//! End-to-end behaviour of tasks, handoffs, generators and callbacks.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use relay::promise::{CaptureAndRethrow, Delegatable, Kind, Lazy, Yield, Yields};
use relay::*;
use tracing_subscriber::EnvFilter;

type Trace = Rc<RefCell<Vec<i32>>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Records `-1` when the body holding it is torn down.
struct Marker(Trace);

impl Drop for Marker {
    fn drop(&mut self) {
        self.0.borrow_mut().push(-1);
    }
}

fn inner(trace: Trace) -> Task<i32> {
    Task::new(async move {
        trace.borrow_mut().push(1);
        2
    })
}

#[test]
fn test_simple_delegate() {
    init_tracing();
    let trace = Trace::default();
    let task = Task::new({
        let trace = Rc::clone(&trace);
        async move {
            trace.borrow_mut().push(3);
            let value = inner(Rc::clone(&trace)).await;
            trace.borrow_mut().push(value);
            trace.borrow_mut().push(4);
        }
    });

    while !task.done() {
        task.resume().unwrap();
    }
    assert_eq!(&*trace.borrow(), &[3, 1, 2, 4]);
}

#[test]
fn test_nondestructive_handoff() {
    init_tracing();
    let trace = Trace::default();
    {
        let task = Task::new({
            let trace = Rc::clone(&trace);
            async move {
                let _marker = Marker(Rc::clone(&trace));
                trace.borrow_mut().push(3);
                Handoff::to(inner(Rc::clone(&trace))).await;
                trace.borrow_mut().push(4);
            }
        });
        while !task.done() {
            task.resume().unwrap();
        }
    }
    assert_eq!(&*trace.borrow(), &[3, 1, 4, -1]);
}

#[test]
fn test_destructive_handoff() {
    init_tracing();
    let trace = Trace::default();
    {
        let routine = inner(Rc::clone(&trace));
        let task = Task::new({
            let trace = Rc::clone(&trace);
            let target = routine.handle();
            async move {
                let _marker = Marker(Rc::clone(&trace));
                trace.borrow_mut().push(3);
                Handoff::destructive(target).await;
                trace.borrow_mut().push(100);
            }
        });
        task.resume().unwrap();
        assert!(task.done());
        assert!(routine.done());
        assert_eq!(routine.take_result(), Some(2));
    }
    assert_eq!(&*trace.borrow(), &[3, -1, 1]);
}

#[test]
fn test_dropping_suspended_task_runs_only_destructors() {
    let trace = Trace::default();
    let task = Task::with_context({
        let trace = Rc::clone(&trace);
        move |co| async move {
            let _marker = Marker(Rc::clone(&trace));
            trace.borrow_mut().push(1);
            co.pause().await;
            trace.borrow_mut().push(2);
        }
    });
    task.resume().unwrap();
    drop(task);
    assert_eq!(&*trace.borrow(), &[1, -1]);
}

#[test]
fn test_generator_yields_exactly_its_values() {
    init_tracing();
    let generator: SimpleGenerator<usize> = SimpleGenerator::new(|co| async move {
        for n in 0..5 {
            co.yield_(n).await;
        }
    });

    let mut iter = YieldRange::new(generator).begin().unwrap();
    let mut seen = Vec::new();
    while !iter.is_end() {
        seen.extend(iter.current());
        iter.advance().unwrap();
    }
    assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    assert!(matches!(iter.advance(), Err(Error::PastEnd)));
    assert!(matches!(iter.advance(), Err(Error::PastEnd)));
}

#[test]
fn test_delegation_is_transparent_to_consumer() {
    fn words(prefix: &'static str, count: usize) -> Generator<String, usize> {
        Generator::new(move |co| async move {
            for n in 0..count {
                co.yield_(format!("{prefix}{n}")).await;
            }
            count
        })
    }

    let outer: Generator<String, usize> = Generator::new(|co| async move {
        co.yield_("start".to_string()).await;
        let a = co.yield_from(words("a", 2)).await;
        let b = co.yield_from(words("b", 3)).await;
        let empty = co.yield_from(words("c", 0)).await;
        co.yield_("end".to_string()).await;
        a + b + empty
    });

    let mut iter = outer.into_iter();
    let items: Vec<_> = iter.by_ref().collect::<Result<_, _>>().unwrap();
    assert_eq!(items, ["start", "a0", "a1", "b0", "b1", "b2", "end"]);
    assert_eq!(iter.into_return(), Some(5));
}

#[test]
fn test_nested_fault_surfaces_at_next_increment() {
    fn broken() -> u8 {
        panic!("nested generator broke")
    }

    let nested: Generator<u8> = Generator::new(|co| async move {
        co.yield_(1).await;
        co.yield_(broken()).await;
    });
    let outer: Generator<u8> = Generator::new(move |co| async move {
        co.yield_(0).await;
        co.yield_from(nested).await;
        co.yield_(9).await;
    });

    let mut iter = outer.into_iter();
    assert_eq!(iter.next().unwrap().unwrap(), 0);
    assert_eq!(iter.next().unwrap().unwrap(), 1);
    let fault = iter.next().unwrap().unwrap_err();
    assert_eq!(fault.message(), "nested generator broke");
    assert!(iter.next().is_none());
}

#[test]
fn test_preemptor_runs_before_next_element_unobserved() {
    init_tracing();
    let trace = Trace::default();
    let stream: SimpleGenerator<i32> = SimpleGenerator::new({
        let trace = Rc::clone(&trace);
        move |co| async move {
            for n in 0..3 {
                trace.borrow_mut().push(n);
                co.yield_(n).await;
            }
        }
    });
    let preemptor: SimpleGenerator<i32> = SimpleGenerator::new({
        let trace = Rc::clone(&trace);
        move |co| async move {
            trace.borrow_mut().push(100);
            co.yield_(100).await;
            co.pause().await;
            trace.borrow_mut().push(200);
            co.yield_(200).await;
        }
    });

    let mut iter = stream.into_iter();
    assert_eq!(iter.next().unwrap().unwrap(), 0);
    iter.preempt(preemptor).unwrap();

    let rest: Vec<_> = iter.by_ref().map(Result::unwrap).collect();
    assert_eq!(rest, vec![1, 2]);
    assert_eq!(&*trace.borrow(), &[0, 1, 100, 200, 2]);
}

#[test]
fn test_preemption_is_repeatable() {
    let runs = Rc::new(RefCell::new(0));
    let stream: SimpleGenerator<i32> = SimpleGenerator::new(|co| async move {
        for n in 0..4 {
            co.yield_(n).await;
        }
    });
    let mut iter = YieldIterator::new(stream).unwrap();
    let mut seen = Vec::new();
    while !iter.is_end() {
        seen.extend(iter.current());
        let runs = Rc::clone(&runs);
        iter.preempt(Task::new(async move { *runs.borrow_mut() += 1 }))
            .unwrap();
        iter.advance().unwrap();
    }
    assert_eq!(seen, vec![0, 1, 2, 3]);
    assert_eq!(*runs.borrow(), 4);
}

#[test]
fn test_callback_bridges_an_event_queue() {
    init_tracing();
    let queue: Rc<RefCell<VecDeque<Completion<(u16, String)>>>> = Rc::default();
    let signals: Rc<RefCell<VecDeque<Completion<()>>>> = Rc::default();

    let request = Task::new({
        let queue = Rc::clone(&queue);
        let signals = Rc::clone(&signals);
        async move {
            Callback::new(|done| signals.borrow_mut().push_back(done)).await;
            let (status, body) =
                Callback::new(|done| queue.borrow_mut().push_back(done)).await;
            let ready = Callback::new(|done: Completion<bool>| done.complete(true)).await;
            let cached = fetch(1).await;
            format!("{status} {body} {ready} {cached}")
        }
    });

    request.resume().unwrap();
    assert!(queue.borrow().is_empty());
    let signal = signals.borrow_mut().pop_front().unwrap();
    signal.complete(());
    assert!(!request.done());

    let done = queue.borrow_mut().pop_front().unwrap();
    done.complete((200, "ok".to_string()));
    assert!(request.done());
    assert_eq!(request.take_result().as_deref(), Some("200 ok true 1"));
}

/// A generator whose yields hand control to its continuation.
struct Relay;

impl Kind for Relay {
    type Initiation = Lazy;
    type Faults = CaptureAndRethrow;
    type Finish = Delegatable<true>;
    type Output = ();
    type Yield = Yield<i32, true>;
}

#[test]
fn test_async_yield_hands_off_to_continuation() {
    let trace = Trace::default();
    let producer = Unique::<Relay>::from_fn({
        let trace = Rc::clone(&trace);
        move |co| async move {
            trace.borrow_mut().push(1);
            co.yield_(10).await;
            trace.borrow_mut().push(2);
            co.yield_(20).await;
        }
    });
    let consumer: Task = Task::with_context({
        let trace = Rc::clone(&trace);
        move |co| async move {
            loop {
                trace.borrow_mut().push(0);
                co.pause().await;
            }
        }
    });

    producer.set_continuation(consumer.handle());
    producer.resume().unwrap();
    assert_eq!(&*trace.borrow(), &[1, 0]);
    assert_eq!(producer.promise().unwrap().yielded().release(), Some(10));

    // The continuation was consumed by the first yield.
    producer.resume().unwrap();
    assert_eq!(&*trace.borrow(), &[1, 0, 2]);
}

#[test]
fn test_released_procedure_owns_itself() {
    let trace = Trace::default();
    let handle = Procedure::spawn({
        let trace = Rc::clone(&trace);
        async move {
            let _marker = Marker(Rc::clone(&trace));
            trace.borrow_mut().push(1);
            Handoff::to(Handle::noop()).await;
            trace.borrow_mut().push(2);
        }
    });
    assert_eq!(&*trace.borrow(), &[1]);
    handle.destroy();
    assert_eq!(&*trace.borrow(), &[1, -1]);
    assert!(handle.done());
}

#[test]
fn test_join_reports_fault_without_raising() {
    fn broken() -> i32 {
        panic!("child failed")
    }

    let parent = Task::new(async {
        let child = Task::new(async { broken() });
        match child.join().await {
            Ok(value) => value,
            Err(fault) => {
                assert_eq!(fault.message(), "child failed");
                -1
            }
        }
    });
    parent.resume().unwrap();
    assert_eq!(parent.take_result(), Some(-1));
}
