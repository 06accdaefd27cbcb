use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// TbObj lets several tasks share one test bench object (an agent, a stream, a
// crossbar). Tasks run one at a time on the scheduler thread, so the lock is
// never contended; it only makes the object Send for boxed task futures.
pub struct TbObj<T>(Arc<Mutex<T>>);

impl<T> TbObj<T> {
    pub fn new(data: T) -> TbObj<T> {
        TbObj(Arc::new(Mutex::new(data)))
    }

    pub fn get(&self) -> MutexGuard<'_, T> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_mut<U>(&self, f: impl FnOnce(&mut T) -> U) -> U {
        f(&mut self.get())
    }
}

impl<T> Clone for TbObj<T> {
    fn clone(&self) -> Self {
        TbObj(self.0.clone())
    }
}
