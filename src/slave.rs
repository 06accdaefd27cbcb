use crate::error::{TbError, TbResult};
use crate::random::{BoolRandomizer, RandomSource};
use crate::transaction::*;
use log::{debug, trace};
use std::collections::VecDeque;

// one task queue per AXI ID
pub struct SlaveAgent<R> {
    id: usize,
    rng: R,
    stall: BoolRandomizer,
    queues: Vec<VecDeque<ReadCmd>>,
    accepted: u64,
    beats: u64,
    stalls: u64,
    retired: u64,
}

impl<R: RandomSource> SlaveAgent<R> {
    pub fn new(id: usize, rng: R, stall: BoolRandomizer) -> Self {
        Self {
            id,
            rng,
            stall,
            queues: vec![VecDeque::new(); ID_COUNT],
            accepted: 0,
            beats: 0,
            stalls: 0,
            retired: 0,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn on_read_command(&mut self, mut cmd: ReadCmd) -> TbResult {
        // bits above the 12-bit address space must be clear too
        if (cmd.addr >> SLAVE_SELECT_SHIFT) as usize != self.id {
            return Err(TbError::AddressRoutingError {
                slave: self.id,
                addr: cmd.addr,
                id: cmd.id,
            });
        }
        let queue = self
            .queues
            .get_mut(cmd.id as usize)
            .ok_or(TbError::IdOutOfRange {
                slave: self.id,
                id: cmd.id,
            })?;
        debug!(
            "slave {} accept id={} addr={:#05x} len={}",
            self.id, cmd.id, cmd.addr, cmd.len
        );
        cmd.progress = 0;
        queue.push_back(cmd);
        self.accepted += 1;
        Ok(())
    }

    pub fn pick_random_ready_queue(&mut self) -> Option<usize> {
        let ready: Vec<usize> = self
            .queues
            .iter()
            .enumerate()
            .filter(|(_, q)| !q.is_empty())
            .map(|(id, _)| id)
            .collect();
        if ready.is_empty() {
            return None;
        }
        Some(ready[self.rng.rand_index(ready.len())])
    }

    // None when idle or stalling this cycle
    pub fn generate_read_response(&mut self) -> Option<ReadBeat> {
        let id = self.pick_random_ready_queue()?;
        if !self.stall.get(&mut self.rng) {
            self.stalls += 1;
            return None;
        }

        let queue = &mut self.queues[id];
        let task = queue.front_mut()?;
        let data = task.expected_data();
        let last = task.advance();
        trace!(
            "slave {} id={} beat {} data={:#x}",
            self.id,
            task.id,
            task.progress - 1,
            data
        );
        let beat = ReadBeat {
            data,
            id: task.id,
            resp: Resp::Okay,
            last,
        };
        if last {
            queue.pop_front();
            self.retired += 1;
        }
        self.beats += 1;
        Some(beat)
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn beats(&self) -> u64 {
        self.beats
    }

    pub fn stalls(&self) -> u64 {
        self.stalls
    }

    pub fn retired(&self) -> u64 {
        self.retired
    }

    pub fn pending(&self) -> usize {
        self.queues.iter().map(|q| q.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::tests::Scripted;
    use crate::random::{RandomizerConfig, StdRandom};

    fn cmd(addr: u16, id: u8, len: u8) -> ReadCmd {
        ReadCmd {
            addr,
            id,
            len,
            size: 2,
            burst: 1,
            lock: 0,
            cache: 0,
            qos: 0,
            prot: 0,
            region: 0,
            progress: 0,
        }
    }

    fn always(id: usize, seed: u64) -> SlaveAgent<StdRandom> {
        SlaveAgent::new(id, StdRandom::seeded(seed), BoolRandomizer::always())
    }

    #[test]
    fn serves_burst_with_last_on_final_beat() {
        // master 0, sub-ID 2, slave 1
        let mut slave = always(1, 0);
        let addr = 0b01_00_0011_0000;
        slave.on_read_command(cmd(addr, 2, 3)).unwrap();

        let beats: Vec<ReadBeat> = (0..4).map(|_| slave.generate_read_response().unwrap()).collect();
        let data: Vec<u32> = beats.iter().map(|b| b.data).collect();
        let last: Vec<bool> = beats.iter().map(|b| b.last).collect();
        assert_eq!(data, vec![addr as u32, addr as u32 + 1, addr as u32 + 2, addr as u32 + 3]);
        assert_eq!(last, vec![false, false, false, true]);
        assert!(beats.iter().all(|b| b.id == 2 && b.resp == Resp::Okay));

        assert_eq!(slave.generate_read_response(), None);
        assert_eq!(slave.retired(), 1);
        assert_eq!(slave.pending(), 0);
    }

    #[test]
    fn misrouted_command_is_rejected() {
        let mut slave = always(2, 0);
        let addr = 0b11_00_0000_0001;
        assert_eq!(
            slave.on_read_command(cmd(addr, 1, 0)),
            Err(TbError::AddressRoutingError {
                slave: 2,
                addr,
                id: 1
            })
        );
        assert_eq!(slave.pending(), 0);
    }

    #[test]
    fn address_beyond_twelve_bits_is_rejected() {
        let mut slave = always(1, 0);
        assert_eq!(
            slave.on_read_command(cmd(0x1400, 4, 0)),
            Err(TbError::AddressRoutingError {
                slave: 1,
                addr: 0x1400,
                id: 4
            })
        );
        assert_eq!(slave.accepted(), 0);
        assert_eq!(
            TbError::AddressRoutingError { slave: 1, addr: 0x1400, id: 4 }.to_string(),
            "slave 1: received command id 4 for address 0x1400 which decodes to slave 5"
        );
    }

    #[test]
    fn id_beyond_queues_is_rejected() {
        let mut slave = always(0, 0);
        assert_eq!(
            slave.on_read_command(cmd(0x010, 64, 0)),
            Err(TbError::IdOutOfRange { slave: 0, id: 64 })
        );
    }

    #[test]
    fn accepted_progress_is_reset() {
        let mut slave = always(3, 0);
        let mut c = cmd(0xc00, 0, 1);
        c.progress = 1;
        slave.on_read_command(c).unwrap();
        assert_eq!(slave.generate_read_response().unwrap().data, 0xc00);
    }

    #[test]
    fn same_id_served_in_fifo_order() {
        let mut slave = always(1, 42);
        slave.on_read_command(cmd(0x410, 7, 1)).unwrap();
        slave.on_read_command(cmd(0x420, 7, 0)).unwrap();
        slave.on_read_command(cmd(0x430, 3, 2)).unwrap();

        let mut per_id: Vec<Vec<u32>> = vec![Vec::new(); ID_COUNT];
        while let Some(beat) = slave.generate_read_response() {
            per_id[beat.id as usize].push(beat.data);
        }
        assert_eq!(per_id[7], vec![0x410, 0x411, 0x420]);
        assert_eq!(per_id[3], vec![0x430, 0x431, 0x432]);
    }

    #[test]
    fn picks_only_ready_queues() {
        let mut slave = SlaveAgent::new(0, Scripted::new(&[1, 0, 1]), BoolRandomizer::always());
        assert_eq!(slave.pick_random_ready_queue(), None);
        slave.on_read_command(cmd(0x100, 4, 0)).unwrap();
        slave.on_read_command(cmd(0x200, 9, 0)).unwrap();
        assert_eq!(slave.pick_random_ready_queue(), Some(9));
        assert_eq!(slave.pick_random_ready_queue(), Some(4));
        assert_eq!(slave.pick_random_ready_queue(), Some(9));
    }

    #[test]
    fn stall_produces_nothing_and_keeps_task() {
        let cfg = RandomizerConfig {
            prob_low: 0,
            prob_high: 0,
            period: 1,
        };
        let mut slave = SlaveAgent::new(2, StdRandom::seeded(8), BoolRandomizer::new(cfg));
        slave.on_read_command(cmd(0x800, 1, 0)).unwrap();
        for _ in 0..10 {
            assert_eq!(slave.generate_read_response(), None);
        }
        assert_eq!(slave.stalls(), 10);
        assert_eq!(slave.pending(), 1);
    }
}
