//! Native contracts reachable at addresses `0x01`-`0x08`. `ECRECOVER`,
//! `SHA256`, `RIPEMD160` and `IDENTITY` (`0x01`-`0x04`) predate this
//! schedule's fork and run for real. `MODEXP` and the `bn128` pairing
//! family (`0x05`-`0x08`) are Byzantium additions: they stay registered,
//! so address-existence checks and gas metering see them as precompiled
//! accounts rather than empty ones, but `run` always fails — this
//! schedule never reaches Byzantium, so nothing is expected to call them
//! successfully.

use ethereum_types::{Address, H256, U256};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use vm::{Error, Result};

/// A native contract reachable via `CALL`/`CALLCODE`/`DELEGATECALL` at a
/// fixed, low address instead of running interpreted bytecode.
pub trait Precompile: Send + Sync {
    fn required_gas(&self, input: &[u8]) -> u64;
    fn run(&self, input: &[u8]) -> Result<Vec<u8>>;
}

/// Maps the fixed low addresses to their native implementations.
#[derive(Default)]
pub struct PrecompileRegistry;

impl PrecompileRegistry {
    pub fn get(&self, address: &Address) -> Option<Box<dyn Precompile>> {
        lookup(address)
    }

    pub fn contains(&self, address: &Address) -> bool {
        lookup(address).is_some()
    }
}

fn lookup(address: &Address) -> Option<Box<dyn Precompile>> {
    let value = U256::from_big_endian(address.as_bytes());
    if value > U256::from(u64::MAX) {
        return None;
    }
    match value.low_u64() {
        1 => Some(Box::new(EcRecover)),
        2 => Some(Box::new(Sha256Hash)),
        3 => Some(Box::new(Ripemd160Hash)),
        4 => Some(Box::new(Identity)),
        5 => Some(Box::new(Unsupported("MODEXP"))),
        6 => Some(Box::new(Unsupported("BN128_ADD"))),
        7 => Some(Box::new(Unsupported("BN128_MUL"))),
        8 => Some(Box::new(Unsupported("BN128_PAIRING"))),
        _ => None,
    }
}

fn words(len: usize) -> u64 {
    ((len as u64) + 31) / 32
}

struct EcRecover;

impl Precompile for EcRecover {
    fn required_gas(&self, _input: &[u8]) -> u64 {
        3000
    }

    fn run(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut padded = [0u8; 128];
        let len = input.len().min(128);
        padded[..len].copy_from_slice(&input[..len]);

        let hash = &padded[0..32];
        let v = H256::from_slice(&padded[32..64]);
        let r = &padded[64..96];
        let s = &padded[96..128];

        if !v.as_bytes()[..31].iter().all(|b| *b == 0) {
            return Ok(Vec::new());
        }
        let recovery_byte = v.as_bytes()[31];
        if recovery_byte != 27 && recovery_byte != 28 {
            return Ok(Vec::new());
        }

        let mut signature_bytes = [0u8; 64];
        signature_bytes[..32].copy_from_slice(r);
        signature_bytes[32..].copy_from_slice(s);

        let recovered = (|| -> std::result::Result<Address, libsecp256k1::Error> {
            let message = libsecp256k1::Message::parse_slice(hash)?;
            let signature = libsecp256k1::Signature::parse_standard(&signature_bytes)?;
            let recovery_id = libsecp256k1::RecoveryId::parse(recovery_byte - 27)?;
            let public_key = libsecp256k1::recover(&message, &signature, &recovery_id)?;
            let serialized = public_key.serialize();
            let hash = keccak_hash::keccak(&serialized[1..]);
            Ok(Address::from_slice(&hash.as_bytes()[12..]))
        })();

        match recovered {
            Ok(address) => {
                let mut output = vec![0u8; 32];
                output[12..].copy_from_slice(address.as_bytes());
                Ok(output)
            }
            Err(_) => Ok(Vec::new()),
        }
    }
}

struct Sha256Hash;

impl Precompile for Sha256Hash {
    fn required_gas(&self, input: &[u8]) -> u64 {
        60 + 12 * words(input.len())
    }

    fn run(&self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(Sha256::digest(input).to_vec())
    }
}

struct Ripemd160Hash;

impl Precompile for Ripemd160Hash {
    fn required_gas(&self, input: &[u8]) -> u64 {
        600 + 120 * words(input.len())
    }

    fn run(&self, input: &[u8]) -> Result<Vec<u8>> {
        let digest = Ripemd160::digest(input);
        let mut output = vec![0u8; 12];
        output.extend_from_slice(&digest);
        Ok(output)
    }
}

struct Identity;

impl Precompile for Identity {
    fn required_gas(&self, input: &[u8]) -> u64 {
        15 + 3 * words(input.len())
    }

    fn run(&self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }
}

/// A precompile address this schedule reserves but never runs: present
/// for `extcodesize`/call-target checks, always fails if actually called.
struct Unsupported(#[allow(dead_code)] &'static str);

impl Precompile for Unsupported {
    fn required_gas(&self, _input: &[u8]) -> u64 {
        0
    }

    fn run(&self, _input: &[u8]) -> Result<Vec<u8>> {
        Err(Error::BuiltIn("not implemented in this schedule"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_recognise_precompile_addresses() {
        assert!(lookup(&Address::from_low_u64_be(1)).is_some());
        assert!(lookup(&Address::from_low_u64_be(4)).is_some());
        assert!(lookup(&Address::from_low_u64_be(8)).is_some());
        assert!(lookup(&Address::from_low_u64_be(9)).is_none());
        assert!(lookup(&Address::from_low_u64_be(0)).is_none());
    }

    #[test]
    fn registry_reports_unimplemented_addresses_as_registered() {
        let registry = PrecompileRegistry::default();
        assert!(registry.contains(&Address::from_low_u64_be(5)));
        let modexp = registry.get(&Address::from_low_u64_be(5)).unwrap();
        assert!(modexp.run(&[]).is_err());
    }

    #[test]
    fn identity_echoes_input() {
        let data = b"hello world";
        assert_eq!(Identity.run(data).unwrap(), data.to_vec());
    }

    #[test]
    fn sha256_matches_known_digest() {
        let digest = Sha256Hash.run(b"").unwrap();
        assert_eq!(digest.len(), 32);
        assert_eq!(hex_string(&digest), "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
    }

    #[test]
    fn ripemd160_pads_to_32_bytes() {
        let digest = Ripemd160Hash.run(b"").unwrap();
        assert_eq!(digest.len(), 32);
        assert_eq!(&digest[..12], &[0u8; 12][..]);
    }

    #[test]
    fn gas_schedule_scales_with_word_count() {
        assert_eq!(Sha256Hash.required_gas(&[]), 60);
        assert_eq!(Sha256Hash.required_gas(&[0u8; 32]), 72);
        assert_eq!(Identity.required_gas(&[0u8; 64]), 15 + 3 * 2);
    }

    fn hex_string(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
