use intmap::IntMap;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use crate::executor;

// Cycle-based stand-in for simulator callbacks. Each cycle has three phases:
// rising edge (timers due this cycle), read-write, read-only.
struct CycleScheduler {
    cycle: u64,
    // key is absolute cycle
    timers: IntMap<VecDeque<Waker>>,
    read_write: VecDeque<Waker>,
    read_only: VecDeque<Waker>,
}

impl CycleScheduler {
    fn new() -> Self {
        Self {
            cycle: 0,
            timers: IntMap::new(),
            read_write: VecDeque::new(),
            read_only: VecDeque::new(),
        }
    }
}

thread_local! {
    static SCHEDULER: RefCell<CycleScheduler> = RefCell::new(CycleScheduler::new());
}

pub fn cycle() -> u64 {
    SCHEDULER.with(|s| s.borrow().cycle)
}

pub(crate) fn cancel_all_triggers() {
    SCHEDULER.with(|s| {
        let mut s = s.borrow_mut();
        s.timers.clear();
        s.read_write.clear();
        s.read_only.clear();
    });
}

pub(crate) fn reset() {
    SCHEDULER.with(|s| *s.borrow_mut() = CycleScheduler::new());
}

fn wake_all(wakers: VecDeque<Waker>) {
    if !wakers.is_empty() {
        for waker in wakers {
            waker.wake();
        }
        executor::run_once();
    }
}

/// Advances the simulation by one cycle and runs every phase of it.
pub fn tick() {
    let edge = SCHEDULER.with(|s| {
        let mut s = s.borrow_mut();
        s.cycle += 1;
        let now = s.cycle;
        s.timers.remove(now)
    });
    if let Some(edge) = edge {
        wake_all(edge);
    }
    let rw = SCHEDULER.with(|s| std::mem::take(&mut s.borrow_mut().read_write));
    wake_all(rw);
    let ro = SCHEDULER.with(|s| std::mem::take(&mut s.borrow_mut().read_only));
    wake_all(ro);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrigKind {
    Timer(u64),
    ReadWrite,
    ReadOnly,
}

#[derive(Clone, Debug)]
pub struct Trigger {
    kind: TrigKind,
    awaited: bool,
}

impl Trigger {
    /// Fires `cycles` rising edges from now. Zero is treated as one.
    pub fn timer(cycles: u64) -> Self {
        Trigger {
            kind: TrigKind::Timer(cycles.max(1)),
            awaited: false,
        }
    }
    pub fn rising_edge() -> Self {
        Trigger::timer(1)
    }
    // after the edge tasks have driven their outputs
    pub fn read_write() -> Self {
        Trigger {
            kind: TrigKind::ReadWrite,
            awaited: false,
        }
    }
    // end of cycle, sample here
    pub fn read_only() -> Self {
        Trigger {
            kind: TrigKind::ReadOnly,
            awaited: false,
        }
    }
    pub fn kind(&self) -> TrigKind {
        self.kind
    }
}

impl Future for Trigger {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A trigger is registered on its first poll; the next poll comes from its wake-up.
        if self.awaited {
            return Poll::Ready(());
        }
        self.awaited = true;
        let kind = self.kind;
        let waker = cx.waker().clone();
        SCHEDULER.with(|s| {
            let mut guard = s.borrow_mut();
            let s = &mut *guard;
            match kind {
                TrigKind::Timer(n) => {
                    let at = s.cycle + n;
                    if let Some(wakers) = s.timers.get_mut(at) {
                        wakers.push_back(waker);
                    } else {
                        let mut wakers = VecDeque::new();
                        wakers.push_back(waker);
                        s.timers.insert(at, wakers);
                    }
                }
                TrigKind::ReadWrite => s.read_write.push_back(waker),
                TrigKind::ReadOnly => s.read_only.push_back(waker),
            }
        });
        Poll::Pending
    }
}
