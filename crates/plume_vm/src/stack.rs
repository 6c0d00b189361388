//! The value stack: a globals region below an operand/frame region.
//!
//! ```text
//! 0 .. globals         globals, addressed by absolute index
//! globals .. sp        operands, frame markers and locals
//! sp .. capacity       free
//! ```

use plume_foundation::{Error, ErrorKind, Result, Value};

/// Fixed-capacity value stack.
#[derive(Clone, Debug)]
pub struct Stack {
    slots: Vec<Value>,
    sp: usize,
    globals: usize,
}

impl Stack {
    /// Creates a stack with `globals` global slots and room for `capacity`
    /// slots in total. All slots start out special.
    #[must_use]
    pub fn new(globals: usize, capacity: usize) -> Self {
        let capacity = capacity.max(globals);
        Self {
            slots: vec![Value::special(); capacity],
            sp: globals,
            globals,
        }
    }

    /// Pushes a value.
    pub fn push(&mut self, value: Value) -> Result<()> {
        let slot = self
            .slots
            .get_mut(self.sp)
            .ok_or_else(|| Error::new(ErrorKind::StackOverflow))?;
        *slot = value;
        self.sp += 1;
        Ok(())
    }

    /// Pops a value.
    pub fn pop(&mut self) -> Result<Value> {
        if self.sp <= self.globals {
            return Err(Error::new(ErrorKind::StackUnderflow));
        }
        self.sp -= 1;
        Ok(self.slots[self.sp])
    }

    /// Pops `n` values, returned bottom-to-top.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>> {
        if self.len() < n {
            return Err(Error::new(ErrorKind::StackUnderflow));
        }
        let start = self.sp - n;
        let values = self.slots[start..self.sp].to_vec();
        self.sp = start;
        Ok(values)
    }

    /// Pushes `values` in order, so the last one ends up on top.
    pub fn push_n(&mut self, values: &[Value]) -> Result<()> {
        let end = self.sp + values.len();
        if end > self.slots.len() {
            return Err(Error::new(ErrorKind::StackOverflow));
        }
        self.slots[self.sp..end].copy_from_slice(values);
        self.sp = end;
        Ok(())
    }

    /// Returns the top value without popping it.
    pub fn peek(&self) -> Result<Value> {
        if self.sp <= self.globals {
            return Err(Error::new(ErrorKind::StackUnderflow));
        }
        Ok(self.slots[self.sp - 1])
    }

    fn global_slot(&self, index: i64) -> Result<usize> {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < self.globals)
            .ok_or_else(|| {
                Error::new(ErrorKind::GlobalOutOfBounds {
                    index,
                    size: self.globals,
                })
            })
    }

    /// Reads global `index`.
    pub fn load_global(&self, index: i64) -> Result<Value> {
        Ok(self.slots[self.global_slot(index)?])
    }

    /// Writes global `index`.
    pub fn store_global(&mut self, index: i64, value: Value) -> Result<()> {
        let slot = self.global_slot(index)?;
        self.slots[slot] = value;
        Ok(())
    }

    /// Reads an absolute slot below the stack pointer.
    pub fn get(&self, index: usize) -> Result<Value> {
        if index >= self.sp {
            return Err(Error::new(ErrorKind::StackUnderflow));
        }
        Ok(self.slots[index])
    }

    /// Writes an absolute slot below the stack pointer.
    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        if index >= self.sp {
            return Err(Error::new(ErrorKind::StackUnderflow));
        }
        self.slots[index] = value;
        Ok(())
    }

    /// Moves the stack pointer. Slots exposed by growing hold whatever they
    /// held last.
    pub fn set_sp(&mut self, sp: usize) -> Result<()> {
        if sp > self.slots.len() {
            return Err(Error::new(ErrorKind::StackOverflow));
        }
        if sp < self.globals {
            return Err(Error::new(ErrorKind::StackUnderflow));
        }
        self.sp = sp;
        Ok(())
    }

    /// Index of the next free slot.
    #[must_use]
    pub fn sp(&self) -> usize {
        self.sp
    }

    /// Index of the first operand slot (the size of the globals region).
    #[must_use]
    pub fn floor(&self) -> usize {
        self.globals
    }

    /// Total number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of values in the operand region.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sp - self.globals
    }

    /// Returns true if the operand region is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sp == self.globals
    }

    /// Every slot the collector must treat as a root: globals plus the
    /// operand region up to the stack pointer.
    #[must_use]
    pub fn live(&self) -> &[Value] {
        &self.slots[..self.sp]
    }

    /// The operand region, bottom-to-top.
    #[must_use]
    pub fn operands(&self) -> &[Value] {
        &self.slots[self.globals..self.sp]
    }
}
