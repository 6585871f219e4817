//! Per-instruction tracing, compiled in only behind the `evm-debug`
//! feature so the hot fetch-decode-execute loop pays nothing for it in a
//! normal build.

#[cfg(feature = "evm-debug")]
mod enabled {
    use ethereum_types::U256;
    use vm::Ext;

    use crate::instructions;

    /// Logs the instruction about to run and the gas it has left, the way
    /// the teacher's own debug builds trace execution.
    pub struct EvmInformant;

    impl EvmInformant {
        pub fn before_instruction(ext: &mut dyn Ext, pc: usize, instruction: u8, current_gas: U256) {
            if !ext.trace_next_instruction(pc, instruction, current_gas) {
                return;
            }
            let name = instructions::get_info(instruction).map(|i| i.name).unwrap_or("UNKNOWN");
            log::trace!("pc={pc} op={name} gas={current_gas}");
        }
    }
}

#[cfg(feature = "evm-debug")]
pub use enabled::EvmInformant;

#[cfg(not(feature = "evm-debug"))]
pub struct EvmInformant;

#[cfg(not(feature = "evm-debug"))]
impl EvmInformant {
    #[inline(always)]
    pub fn before_instruction(_ext: &mut dyn vm::Ext, _pc: usize, _instruction: u8, _current_gas: ethereum_types::U256) {}
}
