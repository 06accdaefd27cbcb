pub use crate::config::TbConfig;
pub use crate::executor::{JoinHandle, Task};
pub use crate::interconnect::Interconnect;
pub use crate::master::MasterAgent;
pub use crate::random::{BoolRandomizer, RandomSource, RandomizerConfig, StdRandom};
pub use crate::report::TbReport;
pub use crate::slave::SlaveAgent;
pub use crate::stream::{Stream, StreamDriverMaster, StreamDriverSlave, StreamMonitor};
pub use crate::tb_obj::TbObj;
pub use crate::testbench::Testbench;
pub use crate::transaction::{ReadBeat, ReadCmd, Resp};
pub use crate::trigger::Trigger;
pub use crate::{fail_test, TbError, TbResult};
