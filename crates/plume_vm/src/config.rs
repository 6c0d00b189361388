//! Configuration for the virtual machine.

use plume_foundation::DEFAULT_THRESHOLD;

/// Default number of global slots at the bottom of the stack.
pub const GLOBALS_SIZE: usize = 10;

/// Default stack capacity in slots (globals included).
pub const STACK_CAPACITY: usize = 8192;

/// Default maximum call depth.
pub const MAX_FRAMES: usize = 1024;

/// Sizes and limits of a [`Vm`](crate::Vm).
///
/// Frame markers record stack positions in 16-bit fields, so capacities
/// above `u16::MAX` fail on the first call that needs a deeper frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VmConfig {
    /// Slots reserved for globals below the operand region.
    pub globals_size: usize,

    /// Total stack slots, globals included.
    pub stack_capacity: usize,

    /// Maximum number of nested bytecode calls.
    pub max_frames: usize,

    /// Live heap blocks that trigger the first collection.
    pub gc_threshold: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            globals_size: GLOBALS_SIZE,
            stack_capacity: STACK_CAPACITY,
            max_frames: MAX_FRAMES,
            gc_threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl VmConfig {
    /// Builder method to set the globals region size.
    #[must_use]
    pub fn with_globals_size(mut self, size: usize) -> Self {
        self.globals_size = size;
        self
    }

    /// Builder method to set the stack capacity.
    #[must_use]
    pub fn with_stack_capacity(mut self, capacity: usize) -> Self {
        self.stack_capacity = capacity;
        self
    }

    /// Builder method to set the call depth limit.
    #[must_use]
    pub fn with_max_frames(mut self, frames: usize) -> Self {
        self.max_frames = frames;
        self
    }

    /// Builder method to set the collection threshold.
    #[must_use]
    pub fn with_gc_threshold(mut self, threshold: usize) -> Self {
        self.gc_threshold = threshold;
        self
    }
}
