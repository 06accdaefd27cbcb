#![allow(unreachable_code)]

use crate::executor::{JoinHandle, Task};
use crate::random::{BoolRandomizer, RandomSource};
use crate::tb_obj::TbObj;
use crate::trigger::Trigger;
use crate::TbResult;

// valid/ready channel, a transfer happens when both are high in the read-only phase
pub struct Stream<T>(TbObj<StreamState<T>>);

struct StreamState<T> {
    valid: bool,
    ready: bool,
    payload: Option<T>,
}

impl<T: Clone> Stream<T> {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(TbObj::new(StreamState {
            valid: false,
            ready: false,
            payload: None,
        }))
    }

    pub fn drive(&self, payload: Option<T>) {
        self.0.with_mut(|s| {
            s.valid = payload.is_some();
            s.payload = payload;
        })
    }

    pub fn set_ready(&self, ready: bool) {
        self.0.with_mut(|s| s.ready = ready)
    }

    pub fn valid(&self) -> bool {
        self.0.get().valid
    }

    pub fn ready(&self) -> bool {
        self.0.get().ready
    }

    pub fn fire(&self) -> bool {
        let s = self.0.get();
        s.valid && s.ready
    }

    pub fn payload(&self) -> Option<T> {
        self.0.get().payload.clone()
    }

    pub fn transfer(&self) -> Option<T> {
        let s = self.0.get();
        match s.valid && s.ready {
            true => s.payload.clone(),
            false => None,
        }
    }
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Stream(self.0.clone())
    }
}

pub struct StreamDriverMaster;

impl StreamDriverMaster {
    pub fn spawn<T, F>(stream: Stream<T>, next: F, name: &str) -> JoinHandle
    where
        T: Clone + Send + 'static,
        F: FnMut() -> Option<T> + Send + 'static,
    {
        Task::spawn_from_future(Self::run(stream, next), name)
    }

    async fn run<T, F>(stream: Stream<T>, mut next: F) -> TbResult
    where
        T: Clone + Send + 'static,
        F: FnMut() -> Option<T> + Send + 'static,
    {
        stream.drive(None);
        let mut transferred = false;
        loop {
            Trigger::rising_edge().await;
            // a valid payload is held until it has been transferred
            if transferred || !stream.valid() {
                stream.drive(next());
            }
            Trigger::read_only().await;
            transferred = stream.fire();
        }
        Ok(())
    }
}

pub struct StreamDriverSlave;

impl StreamDriverSlave {
    pub fn spawn<T, R>(stream: Stream<T>, randomizer: BoolRandomizer, rng: R, name: &str) -> JoinHandle
    where
        T: Clone + Send + 'static,
        R: RandomSource + Send + 'static,
    {
        Task::spawn_from_future(Self::run(stream, randomizer, rng), name)
    }

    async fn run<T, R>(stream: Stream<T>, mut randomizer: BoolRandomizer, mut rng: R) -> TbResult
    where
        T: Clone + Send + 'static,
        R: RandomSource + Send + 'static,
    {
        stream.set_ready(false);
        loop {
            Trigger::rising_edge().await;
            stream.set_ready(randomizer.get(&mut rng));
        }
        Ok(())
    }
}

pub struct StreamMonitor;

impl StreamMonitor {
    pub fn spawn<T, F>(stream: Stream<T>, on_transfer: F, name: &str) -> JoinHandle
    where
        T: Clone + Send + 'static,
        F: FnMut(T) -> TbResult + Send + 'static,
    {
        Task::spawn_from_future(Self::run(stream, on_transfer), name)
    }

    async fn run<T, F>(stream: Stream<T>, mut on_transfer: F) -> TbResult
    where
        T: Clone + Send + 'static,
        F: FnMut(T) -> TbResult + Send + 'static,
    {
        loop {
            Trigger::read_only().await;
            if let Some(payload) = stream.transfer() {
                on_transfer(payload)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TbError;
    use crate::random::StdRandom;
    use crate::{executor, trigger};

    fn setup() {
        trigger::reset();
        executor::clear_ready_queue();
        crate::take_failure();
    }

    fn counter_source(limit: u32) -> impl FnMut() -> Option<u32> + Send + 'static {
        let mut n = 0;
        move || {
            if n < limit {
                n += 1;
                Some(n)
            } else {
                None
            }
        }
    }

    #[test]
    fn delivers_every_payload_once_in_order() {
        setup();
        let stream = Stream::new();
        let seen = TbObj::new(Vec::new());
        let s = seen.clone();
        StreamDriverMaster::spawn(stream.clone(), counter_source(50), "src");
        StreamDriverSlave::spawn(
            stream.clone(),
            BoolRandomizer::new(Default::default()),
            StdRandom::seeded(4),
            "sink",
        );
        StreamMonitor::spawn(
            stream,
            move |v| {
                s.with_mut(|l| l.push(v));
                Ok(())
            },
            "mon",
        );
        executor::run_once();
        for _ in 0..2000 {
            trigger::tick();
        }
        assert_eq!(*seen.get(), (1..=50).collect::<Vec<u32>>());
    }

    #[test]
    fn payload_is_stable_under_backpressure() {
        setup();
        let stream = Stream::new();
        StreamDriverMaster::spawn(stream.clone(), counter_source(3), "src");
        executor::run_once();
        for _ in 0..10 {
            trigger::tick();
            assert_eq!(stream.payload(), Some(1));
            assert!(!stream.fire());
        }
        stream.set_ready(true);
        trigger::tick();
        assert!(stream.fire());
        assert_eq!(stream.payload(), Some(1));
        trigger::tick();
        assert_eq!(stream.payload(), Some(2));
    }

    #[test]
    fn monitor_error_fails_the_run() {
        setup();
        let stream = Stream::new();
        stream.drive(Some(7u32));
        stream.set_ready(true);
        StreamMonitor::spawn(
            stream,
            |v| Err(TbError::UnexpectedResponse { master: 0, id: v as u8 }),
            "mon",
        );
        executor::run_once();
        trigger::tick();
        assert_eq!(
            crate::take_failure(),
            Some(TbError::UnexpectedResponse { master: 0, id: 7 })
        );
    }
}
