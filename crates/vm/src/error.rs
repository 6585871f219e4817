//! VM errors module

use crate::action_params::ActionParams;
use crate::{ResumeCall, ResumeCreate};
use ethereum_types::Address;
use std::fmt;

/// Why an in-flight frame suspended instead of returning a result directly.
#[derive(Debug)]
pub enum TrapKind {
    Call(ActionParams),
    Create(ActionParams, Address),
}

/// Carries a suspended computation out of `Exec::exec` so the driver can
/// resume it once the nested call/create has produced a result.
pub enum TrapError<Call, Create> {
    Call(ActionParams, Call),
    Create(ActionParams, Address, Create),
}

/// VM errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// `OutOfGas` is returned when execution runs out of gas.
    /// The frame's state changes must be reverted, but this does not mean
    /// the transaction itself was invalid: balance still moves and nonce
    /// still increases at the enclosing layer.
    OutOfGas,
    /// `BadJumpDestination` is returned when execution tried to move
    /// to a position that wasn't marked with a `JUMPDEST` instruction.
    BadJumpDestination {
        /// Position the code tried to jump to.
        destination: usize,
    },
    /// `BadInstruction` is returned when the given opcode is not
    /// recognized by the active schedule.
    BadInstruction {
        /// Unrecognized opcode.
        instruction: u8,
    },
    /// Not enough operands on the stack for the instruction.
    StackUnderflow {
        instruction: &'static str,
        wanted: usize,
        on_stack: usize,
    },
    /// Instruction would push the stack past the configured limit.
    OutOfStack {
        instruction: &'static str,
        wanted: usize,
        limit: usize,
    },
    /// A precompiled contract failed on the given input.
    BuiltIn(&'static str),
    /// Execution tried to mutate state from a read-only (static) context.
    MutableCallInStaticContext,
    /// Invalid code to deploy as a contract.
    InvalidCode,
    /// Error from the state backend unrelated to EVM semantics. Fatal;
    /// surfaces to the transaction layer rather than aborting just the
    /// frame.
    Internal(String),
    /// Out of bounds access, e.g. in RETURNDATACOPY.
    OutOfBounds,
    /// Execution reverted with REVERT.
    Reverted,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::Error::*;
        match *self {
            OutOfGas => write!(f, "Out of gas"),
            BadJumpDestination { destination } => write!(f, "Bad jump destination {destination:x}"),
            BadInstruction { instruction } => write!(f, "Bad instruction {instruction:x}"),
            StackUnderflow {
                instruction,
                wanted,
                on_stack,
            } => write!(f, "Stack underflow {instruction} {wanted}/{on_stack}"),
            OutOfStack {
                instruction,
                wanted,
                limit,
            } => write!(f, "Out of stack {instruction} {wanted}/{limit}"),
            BuiltIn(name) => write!(f, "Built-in failed: {name}"),
            Internal(ref msg) => write!(f, "Internal error: {msg}"),
            MutableCallInStaticContext => write!(f, "Mutable call in static context"),
            InvalidCode => write!(f, "Invalid code to deploy as a contract"),
            OutOfBounds => write!(f, "Out of bounds"),
            Reverted => write!(f, "Reverted"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
pub type TrapResult<T, Call, Create> = std::result::Result<Result<T>, TrapError<Call, Create>>;

pub type ExecTrapResult<T> = TrapResult<T, Box<dyn ResumeCall>, Box<dyn ResumeCreate>>;
pub type ExecTrapError = TrapError<Box<dyn ResumeCall>, Box<dyn ResumeCreate>>;
