//! Common imports for consumers of the controller.

pub use crate::config::{SessionConfig, Verbosity};
pub use crate::controller::NativeProcessController;
pub use crate::debugger::{create_debugger, Debugger};
pub use crate::error::{Result, WdbError};
pub use crate::events::{DebuggerEvent, DebuggerEventReceiver};
pub use crate::paths::{MsysPaths, NativePaths, PathTranslator};
pub use crate::registers::RegisterLayout;
pub use crate::symbols::{ObjectSymbolLoader, SymbolLoader};
pub use crate::types::{Address, Architecture, ProcessId, RegisterValue, Signal, ThreadId, WaitStatus};
