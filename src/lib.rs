pub mod config;
pub mod error;
mod executor;
pub mod interconnect;
pub mod master;
pub mod prelude;
pub mod random;
pub mod report;
pub mod slave;
pub mod stream;
mod tb_obj;
pub mod testbench;
pub mod transaction;
pub mod trigger;

use log::error;
use std::cell::RefCell;

pub use error::{TbError, TbResult};
pub use executor::{JoinHandle, Task};
pub use tb_obj::TbObj;

thread_local! {
    // first failure of the run on this thread
    static FAILURE: RefCell<Option<TbError>> = RefCell::new(None);
}

/// Fails the running test. Only the first failure is kept.
pub fn fail_test(err: TbError) {
    FAILURE.with(|f| {
        let mut f = f.borrow_mut();
        if f.is_none() {
            error!("{}", err);
            f.replace(err);
        }
    });
}

pub(crate) fn take_failure() -> Option<TbError> {
    FAILURE.with(|f| f.borrow_mut().take())
}
