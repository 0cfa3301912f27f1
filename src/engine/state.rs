//! Double-buffered state tables.

use crate::value::Value;

/// Current and next generation of the state-fluent table.
///
/// A step writes every entry of `next` from the read-only `current`, then
/// [`commit`](Self::commit) swaps the two.
#[derive(Debug, Clone)]
pub(crate) struct StateBuffers {
    current: Vec<Value>,
    next: Vec<Value>,
}

impl StateBuffers {
    pub(crate) fn new(initial: &[Value]) -> Self {
        Self {
            current: initial.to_vec(),
            next: initial.to_vec(),
        }
    }

    pub(crate) fn reset(&mut self, initial: &[Value]) {
        self.current.clear();
        self.current.extend_from_slice(initial);
        self.next.clear();
        self.next.extend_from_slice(initial);
    }

    pub(crate) fn current(&self) -> &[Value] {
        &self.current
    }

    /// Read view of the current generation alongside the writable next one.
    pub(crate) fn split(&mut self) -> (&[Value], &mut [Value]) {
        (&self.current, &mut self.next)
    }

    pub(crate) fn commit(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }
}
