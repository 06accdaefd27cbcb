#![allow(unreachable_code)]

use crate::error::TbError;
use crate::executor::{JoinHandle, Task};
use crate::stream::Stream;
use crate::transaction::*;
use crate::trigger::Trigger;
use crate::TbResult;
use log::trace;
use std::collections::VecDeque;

struct MasterPort {
    ar: Stream<ReadCmd>,
    r: Stream<ReadBeat>,
    r_q: VecDeque<ReadBeat>,
    // bursts accepted from this master whose last beat has not been returned
    pending: u32,
    target: Option<usize>,
}

struct SlavePort {
    ar: Stream<ReadCmd>,
    r: Stream<ReadBeat>,
    ar_q: VecDeque<ReadCmd>,
}

// Read crossbar, decodes on addr[11:10] and routes beats back on the ID's master bits.
// A master port holds a command for another slave until its pending bursts returned.
pub struct Interconnect {
    masters: Vec<MasterPort>,
    slaves: Vec<SlavePort>,
    max_outstanding: u32,
    queue_depth: usize,
    ar_rr: usize,
    r_rr: usize,
}

impl Interconnect {
    pub fn new(masters: usize, max_outstanding: u32, queue_depth: usize) -> Self {
        Self {
            masters: (0..masters)
                .map(|_| MasterPort {
                    ar: Stream::new(),
                    r: Stream::new(),
                    r_q: VecDeque::new(),
                    pending: 0,
                    target: None,
                })
                .collect(),
            slaves: (0..SLAVE_COUNT)
                .map(|_| SlavePort {
                    ar: Stream::new(),
                    r: Stream::new(),
                    ar_q: VecDeque::new(),
                })
                .collect(),
            max_outstanding,
            queue_depth,
            ar_rr: 0,
            r_rr: 0,
        }
    }

    pub fn master_ar(&self, master: usize) -> Stream<ReadCmd> {
        self.masters[master].ar.clone()
    }

    pub fn master_r(&self, master: usize) -> Stream<ReadBeat> {
        self.masters[master].r.clone()
    }

    pub fn slave_ar(&self, slave: usize) -> Stream<ReadCmd> {
        self.slaves[slave].ar.clone()
    }

    pub fn slave_r(&self, slave: usize) -> Stream<ReadBeat> {
        self.slaves[slave].r.clone()
    }

    pub fn spawn(self) -> JoinHandle {
        Task::spawn_from_future(self.run(), "interconnect")
    }

    async fn run(mut self) -> TbResult {
        for port in &self.masters {
            port.ar.set_ready(false);
            port.r.drive(None);
        }
        for port in &self.slaves {
            port.ar.drive(None);
            port.r.set_ready(false);
        }
        loop {
            Trigger::rising_edge().await;
            self.drive_outputs();
            Trigger::read_write().await;
            self.arbitrate()?;
            Trigger::read_only().await;
            self.sample();
        }
        Ok(())
    }

    fn drive_outputs(&self) {
        for port in &self.slaves {
            port.ar.drive(port.ar_q.front().cloned());
        }
        for port in &self.masters {
            port.r.drive(port.r_q.front().cloned());
        }
    }

    // Sets every `ready` driven by the crossbar from the payload offered this cycle.
    fn arbitrate(&mut self) -> TbResult {
        let mut ar_room: Vec<usize> = self
            .slaves
            .iter()
            .map(|s| self.queue_depth.saturating_sub(s.ar_q.len()))
            .collect();
        let n = self.masters.len();
        for k in 0..n {
            let port = &self.masters[(self.ar_rr + k) % n];
            let ready = match port.ar.payload() {
                Some(cmd) => {
                    let slave = slave_select(cmd.addr);
                    let accept = ar_room[slave] > 0
                        && port.pending < self.max_outstanding
                        && port.target.map_or(true, |t| t == slave);
                    if accept {
                        ar_room[slave] -= 1;
                    }
                    accept
                }
                None => false,
            };
            port.ar.set_ready(ready);
        }
        self.ar_rr = (self.ar_rr + 1) % n.max(1);

        let mut r_room: Vec<usize> = self
            .masters
            .iter()
            .map(|m| self.queue_depth.saturating_sub(m.r_q.len()))
            .collect();
        let n = self.slaves.len();
        for k in 0..n {
            let port = &self.slaves[(self.r_rr + k) % n];
            let ready = match port.r.payload() {
                Some(beat) => {
                    let master = id_owner(beat.id);
                    match r_room.get_mut(master) {
                        Some(room) if *room > 0 => {
                            *room -= 1;
                            true
                        }
                        Some(_) => false,
                        None => return Err(TbError::UnexpectedResponse { master, id: beat.id }),
                    }
                }
                None => false,
            };
            port.r.set_ready(ready);
        }
        self.r_rr = (self.r_rr + 1) % n;
        Ok(())
    }

    // Moves this cycle's transfers through the internal queues.
    fn sample(&mut self) {
        for (m, port) in self.masters.iter_mut().enumerate() {
            if let Some(cmd) = port.ar.transfer() {
                let slave = slave_select(cmd.addr);
                trace!("interconnect: master {} id={} -> slave {}", m, cmd.id, slave);
                port.pending += 1;
                port.target = Some(slave);
                self.slaves[slave].ar_q.push_back(cmd);
            }
        }
        for port in self.slaves.iter_mut() {
            if port.ar.fire() {
                port.ar_q.pop_front();
            }
        }

        for port in &self.slaves {
            if let Some(beat) = port.r.transfer() {
                if let Some(master) = self.masters.get_mut(id_owner(beat.id)) {
                    master.r_q.push_back(beat);
                }
            }
        }
        for port in self.masters.iter_mut() {
            if port.r.fire() {
                if let Some(beat) = port.r_q.pop_front() {
                    if beat.last {
                        port.pending = port.pending.saturating_sub(1);
                        if port.pending == 0 {
                            port.target = None;
                        }
                    }
                }
            }
        }
    }
}
