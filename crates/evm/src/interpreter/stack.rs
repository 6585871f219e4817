//! The 1024-word EVM stack.

use std::fmt;

/// Abstract stack interface the interpreter programs against, so tests
/// can swap in a tracing/instrumented implementation if needed.
pub trait Stack<T> {
    /// Returns the item at the given index from the top, without removing
    /// it.
    fn peek(&self, no_from_top: usize) -> &T;
    /// Returns the item at the given index from the top, mutably.
    fn peek_mut(&mut self, no_from_top: usize) -> &mut T;
    /// Swaps the top of the stack with the item `no_from_top` back.
    fn swap_with_top(&mut self, no_from_top: usize);
    /// Returns `true` if the stack has at least `no_of_elems` items.
    fn has(&self, no_of_elems: usize) -> bool;
    /// Pops the top element.
    fn pop_back(&mut self) -> T;
    /// Pushes an element.
    fn push(&mut self, elem: T);
    /// Number of elements currently on the stack.
    fn size(&self) -> usize;
    /// Copies the whole stack out, bottom first.
    fn peek_top(&self, no_of_elems: usize) -> &[T];
}

/// A `Stack` backed by a `Vec`, with a fixed upper bound enforced by the
/// caller (the gasometer checks `OutOfStack` before every push).
pub struct VecStack<S> {
    stack: Vec<S>,
    limit: usize,
}

impl<S: fmt::Debug> fmt::Debug for VecStack<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.stack)
    }
}

impl<S> VecStack<S> {
    /// Create a new stack, pre-allocated to `limit` capacity.
    pub fn with_capacity(limit: usize) -> Self {
        VecStack {
            stack: Vec::with_capacity(limit.min(1024)),
            limit,
        }
    }
}

impl<S> Stack<S> for VecStack<S> {
    fn peek(&self, no_from_top: usize) -> &S {
        &self.stack[self.stack.len() - no_from_top - 1]
    }

    fn peek_mut(&mut self, no_from_top: usize) -> &mut S {
        let len = self.stack.len();
        &mut self.stack[len - no_from_top - 1]
    }

    fn swap_with_top(&mut self, no_from_top: usize) {
        let len = self.stack.len();
        self.stack.swap(len - 1, len - no_from_top - 1);
    }

    fn has(&self, no_of_elems: usize) -> bool {
        self.stack.len() >= no_of_elems
    }

    fn pop_back(&mut self) -> S {
        self.stack.pop().expect("pop_back called on an empty stack; caller must check has() first")
    }

    fn push(&mut self, elem: S) {
        debug_assert!(self.stack.len() < self.limit, "push called past the stack limit; caller must check capacity first");
        self.stack.push(elem);
    }

    fn size(&self) -> usize {
        self.stack.len()
    }

    fn peek_top(&self, no_of_elems: usize) -> &[S] {
        &self.stack[self.stack.len() - no_of_elems..]
    }
}
