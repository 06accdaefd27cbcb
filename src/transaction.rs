use crate::random::RandomSource;

pub const ADDR_BITS: u32 = 12;
pub const SLAVE_SELECT_SHIFT: u32 = 10;
pub const MASTER_SELECT_SHIFT: u32 = 8;
pub const SELECT_MASK: u16 = 0x3;
pub const SLAVE_COUNT: usize = 1 << 2;

pub const SUB_ID_BITS: u32 = 2;
pub const SUB_IDS: usize = 1 << SUB_ID_BITS;
pub const ID_COUNT: usize = 64;

pub const LEN_BITS: u32 = 4;
pub const SIZE_BITS: u32 = 3;
pub const BURST_BITS: u32 = 2;
pub const LOCK_BITS: u32 = 1;
pub const CACHE_BITS: u32 = 4;
pub const QOS_BITS: u32 = 4;
pub const PROT_BITS: u32 = 3;
pub const REGION_BITS: u32 = 4;

#[inline]
pub fn slave_select(addr: u16) -> usize {
    ((addr >> SLAVE_SELECT_SHIFT) & SELECT_MASK) as usize
}

#[inline]
pub fn master_select(addr: u16) -> usize {
    ((addr >> MASTER_SELECT_SHIFT) & SELECT_MASK) as usize
}

#[inline]
pub fn id_owner(id: u8) -> usize {
    (id >> SUB_ID_BITS) as usize
}

/// A burst read command. Master and slave each keep their own copy, so
/// `progress` is local to each side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadCmd {
    pub addr: u16,
    pub id: u8,
    pub len: u8,
    pub size: u8,
    pub burst: u8,
    pub lock: u8,
    pub cache: u8,
    pub qos: u8,
    pub prot: u8,
    pub region: u8,
    pub progress: u16,
}

impl ReadCmd {
    pub fn random<R: RandomSource + ?Sized>(rng: &mut R, addr: u16, id: u8) -> Self {
        Self {
            addr,
            id,
            region: rng.rand_bits(REGION_BITS) as u8,
            len: rng.rand_bits(LEN_BITS) as u8,
            size: rng.rand_bits(SIZE_BITS) as u8,
            burst: rng.rand_bits(BURST_BITS) as u8,
            lock: rng.rand_bits(LOCK_BITS) as u8,
            cache: rng.rand_bits(CACHE_BITS) as u8,
            qos: rng.rand_bits(QOS_BITS) as u8,
            prot: rng.rand_bits(PROT_BITS) as u8,
            progress: 0,
        }
    }

    pub fn beats(&self) -> u16 {
        self.len as u16 + 1
    }

    pub fn expected_data(&self) -> u32 {
        self.addr as u32 + self.progress as u32
    }

    // true once the burst is exhausted
    pub fn advance(&mut self) -> bool {
        self.progress += 1;
        self.is_retired()
    }

    pub fn is_retired(&self) -> bool {
        self.progress == self.beats()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resp {
    Okay,
    ExOkay,
    SlvErr,
    DecErr,
}

impl From<Resp> for u8 {
    fn from(resp: Resp) -> u8 {
        match resp {
            Resp::Okay => 0,
            Resp::ExOkay => 1,
            Resp::SlvErr => 2,
            Resp::DecErr => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadBeat {
    pub data: u32,
    pub id: u8,
    pub resp: Resp,
    pub last: bool,
}
