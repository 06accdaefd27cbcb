use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TbError {
    #[error("master {master}: read data mismatch on id {id} beat {beat}: expected {expected:#x}, got {actual:#x}")]
    DataMismatch {
        master: usize,
        id: u8,
        beat: u16,
        expected: u32,
        actual: u32,
    },

    #[error("slave {slave}: received command id {id} for address {addr:#05x} which decodes to slave {}", .addr >> 10)]
    AddressRoutingError { slave: usize, addr: u16, id: u8 },

    #[error("master {master}: response with id {id} has no pending transaction")]
    UnexpectedResponse { master: usize, id: u8 },

    #[error("slave {slave}: command id {id} does not fit the id queues")]
    IdOutOfRange { slave: usize, id: u8 },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no completion after {cycles} cycles")]
    Timeout { cycles: u64 },
}

pub type TbResult<T = ()> = Result<T, TbError>;
