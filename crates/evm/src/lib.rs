//! Stack-based EVM bytecode interpreter, pinned to a single historical
//! schedule (post-EIP-150 "Tangerine Whistle", pre-Byzantium; see
//! `vm::Schedule`). `interpreter` runs one frame's bytecode; `executive`
//! drives the call/create tree around it over an in-memory account
//! backend (`state`); `precompiles` dispatches the four native contracts
//! this schedule actually runs.

pub mod executive;
pub mod factory;
pub mod instructions;
pub mod interpreter;
pub mod precompiles;
pub mod state;
pub mod vmtype;

pub use executive::{Executive, FrameResult, LogEntry};
pub use factory::Factory;
pub use interpreter::Interpreter;
pub use vmtype::VMType;
