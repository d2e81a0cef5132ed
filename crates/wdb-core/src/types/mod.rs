//! # Types
//!
//! Plain data types shared by every component of the controller: addresses,
//! process and thread identifiers, OS handles, portable signals, wait
//! results and register values.

pub mod address;
pub mod process;
pub mod registers;

pub use address::Address;
pub use process::{Architecture, OsHandle, ProcessId, Signal, ThreadId, WaitStatus};
pub use registers::{RegisterGroups, RegisterValue};
