use futures::{future::{BoxFuture, FutureExt}, task::{waker_ref, ArcWake, Context, Poll}};
use futures_channel::oneshot;
use log::trace;
use queues::{IsQueue, Queue};
use std::{cell::RefCell, future::Future, pin::Pin, sync::{Arc, Mutex, PoisonError}};

use crate::TbResult;

thread_local! {
    static READY_QUEUE: RefCell<Queue<Arc<Task>>> = RefCell::new(Queue::new());
}

pub fn schedule_task(task: Arc<Task>) {
    READY_QUEUE.with(|q| {
        let _ = q.borrow_mut().add(task);
    });
}

fn next_task() -> Option<Arc<Task>> {
    READY_QUEUE.with(|q| q.borrow_mut().remove().ok())
}

pub(crate) fn clear_ready_queue() {
    READY_QUEUE.with(|q| *q.borrow_mut() = Queue::new());
}

#[inline]
pub fn run_once() {
    while let Some(task) = next_task() {
        process_task(task);
    }
}

#[inline]
fn process_task(task: Arc<Task>) {
    if task.is_cancelled() {
        // dropped once the last trigger holding its waker goes away
        return;
    }

    let mut fut_slot = task.future.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(mut fut) = fut_slot.take() {
        let waker = waker_ref(&task);
        let context = &mut Context::from_waker(&waker);
        match fut.as_mut().poll(context) {
            Poll::Pending => *fut_slot = Some(fut),
            Poll::Ready(result) => {
                trace!("task {} done: {:?}", task.name, result);
                if let Err(e) = &result {
                    crate::fail_test(e.clone());
                }
                let tx = task.join_tx.lock().unwrap_or_else(PoisonError::into_inner).take();
                if let Some(tx) = tx {
                    let _ = tx.send(result);
                }
            }
        }
    } else {
        trace!("task {} woken after completion", task.name);
    }
}

#[derive(PartialEq, Clone, Copy, Debug)]
enum TaskState {
    Pending,
    Cancelled,
}

pub struct Task {
    future: Mutex<Option<BoxFuture<'static, TbResult>>>,
    state: Mutex<TaskState>,
    name: String,
    join_tx: Mutex<Option<oneshot::Sender<TbResult>>>,
}

impl Task {
    pub fn fork(future: impl Future<Output = TbResult> + Send + 'static) -> JoinHandle {
        Task::spawn_from_future(future, "forked")
    }

    pub fn spawn_from_future(
        future: impl Future<Output = TbResult> + Send + 'static,
        name: &str,
    ) -> JoinHandle {
        let (task, join_handle) = Task::new(future.boxed(), name);
        schedule_task(task);
        join_handle
    }

    fn new(fut: BoxFuture<'static, TbResult>, name: &str) -> (Arc<Self>, JoinHandle) {
        let (tx, rx) = oneshot::channel::<TbResult>();
        let task = Arc::new(Self {
            future: Mutex::new(Some(fut)),
            state: Mutex::new(TaskState::Pending),
            name: name.to_string(),
            join_tx: Mutex::new(Some(tx)),
        });
        let join_handle = JoinHandle {
            task: task.clone(),
            join_rx: rx,
        };
        (task, join_handle)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cancel(&self) {
        // the executor skips cancelled tasks when their trigger fires
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = TaskState::Cancelled;
    }

    fn is_cancelled(&self) -> bool {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) == TaskState::Cancelled
    }
}

impl ArcWake for Task {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        schedule_task(arc_self.clone());
    }
}

pub struct JoinHandle {
    task: Arc<Task>,
    join_rx: oneshot::Receiver<TbResult>,
}

impl JoinHandle {
    pub fn name(&self) -> &str {
        self.task.name()
    }

    pub fn cancel(self) {
        self.task.cancel();
    }
}

impl Future for JoinHandle {
    // a cancelled task resolves to Ok
    type Output = TbResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.join_rx.poll_unpin(cx) {
            Poll::Ready(result) => Poll::Ready(result.unwrap_or(Ok(()))),
            Poll::Pending => Poll::Pending,
        }
    }
}
