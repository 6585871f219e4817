//! Builds a runnable frame from `ActionParams`, hiding the interpreter's
//! constructor behind the `vm::Exec` trait object the executive drives.
//!
//! Depth-limit enforcement happens in the executive before a frame is
//! even constructed; by the time `create` runs, the call/create is known
//! to be allowed.

use vm::{ActionParams, Exec};

use crate::interpreter::shared_cache::SharedCache;
use crate::interpreter::Interpreter;
use crate::vmtype::VMType;

#[derive(Default, Clone)]
pub struct Factory {
    evm: VMType,
    cache: SharedCache,
}

impl Factory {
    pub fn new(evm: VMType, cache: SharedCache) -> Self {
        Factory { evm, cache }
    }

    /// Create a fresh frame for `params`, ready for `Exec::exec`.
    pub fn create(&self, params: ActionParams) -> Box<dyn Exec> {
        match self.evm {
            VMType::Interpreter => Box::new(Interpreter::<u64>::new(params, self.cache.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_create_interpreter() {
        let factory = Factory::default();
        let _exec = factory.create(ActionParams::default());
    }
}
