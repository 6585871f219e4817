//! Cost schedule and other parameterisations for the EVM.
//!
//! This crate pins a single historical rule set: post-Tangerine-Whistle
//! (EIP-150, the 63/64 call-gas forwarding rule) but pre-Byzantium (no
//! `STATICCALL`/`REVERT`/`RETURNDATA*`/`CREATE2`/`EXTCODEHASH`, and the
//! "simple" two-tier `SSTORE` pricing rather than EIP-1283/2200 net-gas
//! metering). See `SPEC_FULL.md` for why this fork was chosen.

/// Definition of the cost schedule and other parameterisations for the EVM.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Does it have a delegate call.
    pub have_delegate_call: bool,
    /// VM stack limit.
    pub stack_limit: usize,
    /// Max number of nested calls/creates.
    pub max_depth: usize,
    /// Gas price for `EXP` opcode.
    pub exp_gas: usize,
    /// Additional gas for `EXP` opcode for each byte of the exponent.
    pub exp_byte_gas: usize,
    /// Gas price for `SHA3` opcode.
    pub sha3_gas: usize,
    /// Additional gas for `SHA3` opcode for each word of hashed memory.
    pub sha3_word_gas: usize,
    /// Gas price for loading from storage.
    pub sload_gas: usize,
    /// Gas price for setting a new value into storage (`storage==0`, `new!=0`).
    pub sstore_set_gas: usize,
    /// Gas price for altering an existing value in storage.
    pub sstore_reset_gas: usize,
    /// Gas refund for `SSTORE` clearing (`storage!=0`, `new==0`).
    pub sstore_refund_gas: usize,
    /// Gas price for `JUMPDEST` opcode.
    pub jumpdest_gas: usize,
    /// Gas price for `LOG*`.
    pub log_gas: usize,
    /// Additional gas for data in `LOG*`.
    pub log_data_gas: usize,
    /// Additional gas for each topic in `LOG*`.
    pub log_topic_gas: usize,
    /// Gas price for `CREATE` opcode.
    pub create_gas: usize,
    /// Gas price for `*CALL*` opcodes.
    pub call_gas: usize,
    /// Stipend for transfer for `CALL|CALLCODE` when `value>0`.
    pub call_stipend: usize,
    /// Additional gas required for value transfer (`CALL|CALLCODE`).
    pub call_value_transfer_gas: usize,
    /// Additional gas for creating a new account (`CALL|CALLCODE`).
    pub call_new_account_gas: usize,
    /// Refund for SELFDESTRUCT.
    pub suicide_refund_gas: usize,
    /// Gas for used memory, per word.
    pub memory_gas: usize,
    /// Coefficient used to convert memory size to gas price for memory.
    pub quad_coeff_div: usize,
    /// Cost per byte of contract length when executing `CREATE`.
    pub create_data_gas: usize,
    /// Maximum code size when creating a contract.
    pub create_data_limit: usize,
    /// Gas price for copying memory.
    pub copy_gas: usize,
    /// Price of `EXTCODESIZE`.
    pub extcodesize_gas: usize,
    /// Base price of `EXTCODECOPY`.
    pub extcodecopy_base_gas: usize,
    /// Price of `BALANCE`.
    pub balance_gas: usize,
    /// Price of `SELFDESTRUCT`.
    pub suicide_gas: usize,
    /// Additional gas to pay when SELFDESTRUCT credits a non-existent account.
    pub suicide_to_new_account_cost: usize,
    /// `let limit = gas_left - gas_left / sub_gas_cap_divisor`; CALL's gas
    /// = `min(requested, limit)`, CREATE's gas = `limit`. This is EIP-150's
    /// 63/64 rule (divisor 64).
    pub sub_gas_cap_divisor: usize,
    /// Don't ever create empty accounts; contracts start with nonce=1.
    pub no_empty: bool,
    /// Kill empty accounts if touched.
    pub kill_empty: bool,
    /// `BLOCKHASH` instruction gas cost.
    pub blockhash_gas: usize,
    /// Gas used divided by this number is the maximum refundable amount.
    pub max_refund_quotient: usize,
}

/// Gas used in a transaction divided by this number is the maximum
/// refundable amount (pre-EIP-3529 value).
pub const MAX_REFUND_QUOTIENT: usize = 2;

impl Schedule {
    /// The single schedule this crate implements: post-EIP-150
    /// ("Tangerine Whistle"), pre-Byzantium.
    pub fn new_post_eip150(max_code_size: usize, no_empty: bool, kill_empty: bool) -> Schedule {
        Schedule {
            have_delegate_call: true,
            stack_limit: 1024,
            max_depth: 1024,
            exp_gas: 10,
            exp_byte_gas: 10,
            sha3_gas: 30,
            sha3_word_gas: 6,
            sload_gas: 200,
            sstore_set_gas: 20000,
            sstore_reset_gas: 5000,
            sstore_refund_gas: 15000,
            jumpdest_gas: 1,
            log_gas: 375,
            log_data_gas: 8,
            log_topic_gas: 375,
            create_gas: 32000,
            call_gas: 700,
            call_stipend: 2300,
            call_value_transfer_gas: 9000,
            call_new_account_gas: 25000,
            suicide_refund_gas: 24000,
            memory_gas: 3,
            quad_coeff_div: 512,
            create_data_gas: 200,
            create_data_limit: max_code_size,
            copy_gas: 3,
            extcodesize_gas: 700,
            extcodecopy_base_gas: 700,
            balance_gas: 400,
            suicide_gas: 5000,
            suicide_to_new_account_cost: 25000,
            sub_gas_cap_divisor: 64,
            no_empty,
            kill_empty,
            blockhash_gas: 20,
            max_refund_quotient: MAX_REFUND_QUOTIENT,
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::new_post_eip150(24576, true, true)
    }
}

#[test]
fn schedule_evm_assumptions() {
    // Memory-cost division is optimized assuming quad_coeff_div == 2**9.
    let s = Schedule::default();
    assert_eq!(s.quad_coeff_div, 512);
    assert_eq!(s.sub_gas_cap_divisor, 64);
}
