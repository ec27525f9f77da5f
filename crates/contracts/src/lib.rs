//! Meridian settlement and oracle contract bindings.
//!
//! The settlement layer is split across two contracts: the `DepositManager`
//! owns reserve configuration and deposit-side balances, the `BorrowManager`
//! owns debt-side balances and the borrow index. Prices arrive through a
//! Pyth-style oracle contract; test environments substitute a mock that can
//! mint update payloads on demand.

mod bindings;

pub use bindings::{IBorrowManager, IDepositManager, IERC20, IMockPyth, IPyth};
