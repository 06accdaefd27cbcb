use crate::error::{TbError, TbResult};
use crate::random::RandomSource;
use crate::transaction::*;
use log::{debug, trace, warn};
use std::collections::VecDeque;

pub const MAX_ADDRESS_DRAWS: usize = 4096;

// Only queue heads are inspected, so beats of one ID must come back in issue order.
pub struct MasterAgent<R> {
    id: usize,
    rng: R,
    finish_after: u32,
    counter: u32,
    finished: bool,
    issued: u64,
    beats_checked: u64,
    queues: [VecDeque<ReadCmd>; SUB_IDS],
}

impl<R: RandomSource> MasterAgent<R> {
    pub fn new(id: usize, rng: R, finish_after: u32) -> TbResult<Self> {
        if id > SELECT_MASK as usize {
            return Err(TbError::Config(format!(
                "master id {} does not fit the master-select address field",
                id
            )));
        }
        Ok(Self {
            id,
            rng,
            finish_after,
            counter: 0,
            finished: false,
            issued: 0,
            beats_checked: 0,
            queues: Default::default(),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn generate_address(&mut self) -> u16 {
        for _ in 0..MAX_ADDRESS_DRAWS {
            let addr = self.rng.rand_bits(ADDR_BITS) as u16;
            if slave_select(addr) != self.id && master_select(addr) == self.id {
                return addr;
            }
        }
        warn!(
            "master {}: no legal address after {} draws",
            self.id, MAX_ADDRESS_DRAWS
        );
        let slave = (self.id + 1) % SLAVE_COUNT;
        let offset = self.rng.rand_bits(MASTER_SELECT_SHIFT) as u16;
        ((slave as u16) << SLAVE_SELECT_SHIFT) | ((self.id as u16) << MASTER_SELECT_SHIFT) | offset
    }

    pub fn generate_read_command(&mut self) -> Option<ReadCmd> {
        if self.finished {
            return None;
        }
        let offset = self.rng.rand_bits(SUB_ID_BITS) as usize;
        let addr = self.generate_address();
        let id = (self.id * SUB_IDS + offset) as u8;
        let cmd = ReadCmd::random(&mut self.rng, addr, id);
        debug!(
            "master {} start id={} addr={:#05x} len={}",
            self.id, cmd.id, cmd.addr, cmd.len
        );
        self.queues[offset].push_back(cmd.clone());
        self.issued += 1;
        Some(cmd)
    }

    pub fn on_read_response(&mut self, beat: &ReadBeat) -> TbResult {
        let master = self.id;
        let offset = (beat.id as usize)
            .checked_sub(master * SUB_IDS)
            .filter(|offset| *offset < SUB_IDS)
            .ok_or(TbError::UnexpectedResponse {
                master,
                id: beat.id,
            })?;
        let queue = &mut self.queues[offset];
        let task = queue.front_mut().ok_or(TbError::UnexpectedResponse {
            master,
            id: beat.id,
        })?;

        let expected = task.expected_data();
        if beat.data != expected {
            return Err(TbError::DataMismatch {
                master,
                id: beat.id,
                beat: task.progress,
                expected,
                actual: beat.data,
            });
        }
        trace!("master {} id={} beat {} ok", master, beat.id, task.progress);
        self.beats_checked += 1;

        if task.advance() {
            if let Some(done) = queue.pop_front() {
                debug!("master {} finish id={} addr={:#05x}", master, done.id, done.addr);
            }
            self.counter += 1;
            if self.counter > self.finish_after && !self.finished {
                debug!("master {} finished after {} transactions", master, self.counter);
                self.finished = true;
            }
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.finished && self.queues.iter().all(|q| q.is_empty())
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn issued(&self) -> u64 {
        self.issued
    }

    pub fn completed(&self) -> u32 {
        self.counter
    }

    pub fn beats_checked(&self) -> u64 {
        self.beats_checked
    }

    pub fn pending(&self) -> usize {
        self.queues.iter().map(|q| q.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::tests::Scripted;
    use crate::random::StdRandom;

    fn beat(cmd: &ReadCmd, k: u16) -> ReadBeat {
        ReadBeat {
            data: cmd.addr as u32 + k as u32,
            id: cmd.id,
            resp: Resp::Okay,
            last: k == cmd.len as u16,
        }
    }

    fn serve(master: &mut MasterAgent<StdRandom>, cmd: &ReadCmd) {
        for k in 0..=cmd.len as u16 {
            master.on_read_response(&beat(cmd, k)).unwrap();
        }
    }

    #[test]
    fn addresses_respect_partition() {
        for id in 0..4 {
            let mut master = MasterAgent::new(id, StdRandom::seeded(id as u64), 200).unwrap();
            for _ in 0..500 {
                let addr = master.generate_address();
                assert!(addr < 1 << ADDR_BITS);
                assert_ne!(slave_select(addr), id);
                assert_eq!(master_select(addr), id);
            }
        }
    }

    #[test]
    fn address_fallback_is_still_legal() {
        // all-zero draws never satisfy the constraints for master 1
        let mut master = MasterAgent::new(1, Scripted::new(&[]), 200).unwrap();
        let addr = master.generate_address();
        assert_eq!(slave_select(addr), 2);
        assert_eq!(master_select(addr), 1);
    }

    #[test]
    fn rejects_master_id_outside_select_field() {
        assert!(matches!(
            MasterAgent::new(4, StdRandom::seeded(0), 200),
            Err(TbError::Config(_))
        ));
    }

    #[test]
    fn command_ids_belong_to_master() {
        let mut master = MasterAgent::new(2, StdRandom::seeded(5), 200).unwrap();
        for _ in 0..100 {
            let cmd = master.generate_read_command().unwrap();
            assert_eq!(id_owner(cmd.id), 2);
            assert_eq!(cmd.progress, 0);
            assert!(cmd.len < 16);
        }
        assert_eq!(master.issued(), 100);
        assert_eq!(master.pending(), 100);
    }

    #[test]
    fn scripted_command_fields() {
        // offset 2, then address 0x4a3 (slave 1, master 0), then region, len, ...
        let mut master =
            MasterAgent::new(0, Scripted::new(&[2, 0x4a3, 5, 3, 2, 1, 0, 4, 6, 7]), 200).unwrap();
        let cmd = master.generate_read_command().unwrap();
        assert_eq!(cmd.id, 2);
        assert_eq!(cmd.addr, 0x4a3);
        assert_eq!(cmd.region, 5);
        assert_eq!(cmd.len, 3);
        assert_eq!(cmd.size, 2);
        assert_eq!(cmd.burst, 1);
        assert_eq!(cmd.lock, 0);
        assert_eq!(cmd.cache, 4);
        assert_eq!(cmd.qos, 6);
        assert_eq!(cmd.prot, 7);
    }

    #[test]
    fn checks_data_per_beat() {
        let mut master = MasterAgent::new(0, StdRandom::seeded(1), 200).unwrap();
        let cmd = master.generate_read_command().unwrap();
        master.on_read_response(&beat(&cmd, 0)).unwrap();
        let mut bad = beat(&cmd, 1);
        bad.data += 7;
        let err = master.on_read_response(&bad).unwrap_err();
        assert_eq!(
            err,
            TbError::DataMismatch {
                master: 0,
                id: cmd.id,
                beat: 1,
                expected: cmd.addr as u32 + 1,
                actual: cmd.addr as u32 + 8,
            }
        );
    }

    #[test]
    fn same_id_is_checked_in_issue_order() {
        let mut master = MasterAgent::new(1, StdRandom::seeded(9), 200).unwrap();
        let mut cmds = Vec::new();
        while cmds.len() < 2 {
            let cmd = master.generate_read_command().unwrap();
            if cmd.id == 5 {
                cmds.push(cmd);
            }
        }
        // answering the younger command first must fail unless both share an address
        if cmds[0].addr != cmds[1].addr {
            assert!(master.on_read_response(&beat(&cmds[1], 0)).is_err());
        }
        let pending = master.pending();
        serve(&mut master, &cmds[0]);
        serve(&mut master, &cmds[1]);
        assert_eq!(master.pending(), pending - 2);
    }

    #[test]
    fn foreign_or_unexpected_id_is_rejected() {
        let mut master = MasterAgent::new(1, StdRandom::seeded(2), 200).unwrap();
        let stray = ReadBeat {
            data: 0,
            id: 0,
            resp: Resp::Okay,
            last: true,
        };
        assert_eq!(
            master.on_read_response(&stray),
            Err(TbError::UnexpectedResponse { master: 1, id: 0 })
        );
        let empty = ReadBeat { id: 4, ..stray };
        assert_eq!(
            master.on_read_response(&empty),
            Err(TbError::UnexpectedResponse { master: 1, id: 4 })
        );
    }

    #[test]
    fn finishes_after_threshold_and_completes_when_drained() {
        let mut master = MasterAgent::new(0, StdRandom::seeded(3), 200).unwrap();
        master.counter = 200;
        let first = master.generate_read_command().unwrap();
        let second = master.generate_read_command().unwrap();
        assert!(!master.is_finished());

        serve(&mut master, &first);
        assert_eq!(master.completed(), 201);
        assert!(master.is_finished());
        assert!(!master.is_complete());
        assert_eq!(master.generate_read_command(), None);

        serve(&mut master, &second);
        assert!(master.is_complete());
    }

    #[test]
    fn threshold_is_configurable() {
        let mut master = MasterAgent::new(3, StdRandom::seeded(4), 0).unwrap();
        let cmd = master.generate_read_command().unwrap();
        serve(&mut master, &cmd);
        assert!(master.is_complete());
    }
}
