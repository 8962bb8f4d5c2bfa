//! Subroutine call stack.
//!
//! Sixteen return addresses with an explicit occupancy count.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Maximum call depth.
pub const STACK_DEPTH: usize = 16;

/// Fixed-capacity stack of return addresses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStack {
    slots: [u16; STACK_DEPTH],
    len: usize,
}

impl CallStack {
    pub fn new() -> Self {
        Self {
            slots: [0; STACK_DEPTH],
            len: 0,
        }
    }

    /// Push a return address.
    pub fn push(&mut self, addr: u16) -> Result<(), StackFault> {
        if self.len == STACK_DEPTH {
            return Err(StackFault::Overflow);
        }
        self.slots[self.len] = addr;
        self.len += 1;
        Ok(())
    }

    /// Pop the most recent return address.
    pub fn pop(&mut self) -> Result<u16, StackFault> {
        if self.len == 0 {
            return Err(StackFault::Underflow);
        }
        self.len -= 1;
        Ok(self.slots[self.len])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Occupied entries, oldest first.
    pub fn frames(&self) -> &[u16] {
        &self.slots[..self.len]
    }
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Call stack misuse by the running program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StackFault {
    #[error("call stack overflow (more than {} nested calls)", STACK_DEPTH)]
    Overflow,

    #[error("return with empty call stack")]
    Underflow,
}
