//! A lazily-sliceable handle onto a child frame's output, used to serve
//! the "no copy unless asked" reads of the outer driver.

use std::ops::Deref;
use std::sync::Arc;

/// Output of the most recently completed call/create, shared rather than
/// copied so that holding onto it across several opcodes is free.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReturnData {
    mem: Arc<Vec<u8>>,
    offset: usize,
    size: usize,
}

impl Deref for ReturnData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.mem[self.offset..self.offset + self.size]
    }
}

impl ReturnData {
    /// Create empty `ReturnData`.
    pub fn empty() -> Self {
        ReturnData {
            mem: Arc::new(Vec::new()),
            offset: 0,
            size: 0,
        }
    }

    /// Create `ReturnData` from a vector, specifying offset and size to
    /// separate retained data from the actual return data.
    pub fn new(mem: Vec<u8>, offset: usize, size: usize) -> Self {
        ReturnData {
            mem: Arc::new(mem),
            offset,
            size,
        }
    }
}
