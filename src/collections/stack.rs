//! LIFO stack.

/// A last-in, first-out stack.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stack<T> {
    items: Vec<T>,
}

impl<T> Stack<T> {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Create an empty stack that can hold `capacity` items without
    /// reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    /// Top item, or `None` when empty.
    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    /// Remove and return the top item, or `None` when empty.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
