use core::fmt;

use crate::vm::RuntimeError;

/// Fixed-capacity operand stack.
///
/// All slots are allocated up front and `sp` points at the next free slot, so
/// the top of the stack is `items[sp - 1]`. Popping only moves `sp`; the
/// popped value stays in its slot until overwritten, which is what
/// [`Stack::last_popped`] reads.
///
/// Unlike a growable stack, overflow is a recoverable error here: user
/// programs can recurse without bound.
///
/// # Examples
///
/// ```ignore
/// use blaze_core::vm::Stack;
///
/// let mut stack = Stack::new(100);
/// stack.push(42)?;
/// stack.push(17)?;
/// assert_eq!(stack.pop()?, 17);
/// assert_eq!(stack.last_popped(), Some(&17));
/// assert_eq!(stack.len(), 1);
/// ```
pub struct Stack<T> {
    items: Vec<T>,
    sp: usize,
}

impl<T: Clone + Default> Stack<T> {
    /// Creates a stack with room for exactly `capacity` values.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: vec![T::default(); capacity],
            sp: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, value: T) -> Result<(), RuntimeError> {
        let capacity = self.items.len();
        let slot = self
            .items
            .get_mut(self.sp)
            .ok_or(RuntimeError::StackOverflow { capacity })?;
        *slot = value;
        self.sp += 1;
        Ok(())
    }

    /// Removes and returns the top value.
    #[inline]
    pub fn pop(&mut self) -> Result<T, RuntimeError> {
        if self.sp == 0 {
            return Err(RuntimeError::StackUnderflow);
        }
        self.sp -= 1;
        Ok(self.items[self.sp].clone())
    }

    /// Removes the top `n` values and returns them bottom-first.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<T>, RuntimeError> {
        if n > self.sp {
            return Err(RuntimeError::StackUnderflow);
        }
        self.sp -= n;
        Ok(self.items[self.sp..self.sp + n].to_vec())
    }

    /// Returns the value `distance` slots below the top (0 is the top).
    #[inline]
    pub fn peek(&self, distance: usize) -> Result<&T, RuntimeError> {
        if distance >= self.sp {
            return Err(RuntimeError::StackUnderflow);
        }
        Ok(&self.items[self.sp - 1 - distance])
    }

    /// The value in the slot just above the top, i.e. the one most recently
    /// popped. A stack that was never used holds default values there;
    /// a full stack has no such slot.
    #[inline]
    pub fn last_popped(&self) -> Option<&T> {
        self.items.get(self.sp)
    }

    /// Reads an absolute slot. Slots at or above `sp` are readable; they hold
    /// stale or default values.
    #[inline]
    pub fn get(&self, index: usize) -> Result<&T, RuntimeError> {
        self.items.get(index).ok_or(RuntimeError::StackOverflow {
            capacity: self.items.len(),
        })
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: T) -> Result<(), RuntimeError> {
        let capacity = self.items.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or(RuntimeError::StackOverflow { capacity })?;
        *slot = value;
        Ok(())
    }

    /// Moves the stack pointer, resetting newly exposed slots to the default
    /// value when growing.
    pub fn set_sp(&mut self, sp: usize) -> Result<(), RuntimeError> {
        if sp > self.items.len() {
            return Err(RuntimeError::StackOverflow {
                capacity: self.items.len(),
            });
        }
        for slot in &mut self.items[self.sp.min(sp)..sp] {
            *slot = T::default();
        }
        self.sp = sp;
        Ok(())
    }

    /// Clones the top value, if any.
    #[inline]
    pub fn top(&self) -> Option<T> {
        self.sp.checked_sub(1).map(|i| self.items[i].clone())
    }

    #[inline]
    pub fn sp(&self) -> usize {
        self.sp
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sp
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sp == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    /// Iterates live values from bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items[..self.sp].iter()
    }
}

impl<T: fmt::Debug + Clone + Default> fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("items", &&self.items[..self.sp])
            .field("sp", &self.sp)
            .field("capacity", &self.items.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stack() {
        let stack: Stack<i32> = Stack::new(100);
        assert_eq!(stack.len(), 0);
        assert!(stack.is_empty());
        assert_eq!(stack.capacity(), 100);
        assert_eq!(stack.top(), None);
    }

    #[test]
    fn test_push_pop() {
        let mut stack = Stack::new(10);
        stack.push(1).unwrap();
        stack.push(2).unwrap();
        stack.push(3).unwrap();

        assert_eq!(stack.len(), 3);
        assert_eq!(stack.pop(), Ok(3));
        assert_eq!(stack.pop(), Ok(2));
        assert_eq!(stack.pop(), Ok(1));
        assert_eq!(stack.pop(), Err(RuntimeError::StackUnderflow));
    }

    #[test]
    fn test_last_popped() {
        let mut stack = Stack::new(10);
        assert_eq!(stack.last_popped(), Some(&0));
        stack.push(7).unwrap();
        stack.push(8).unwrap();
        stack.pop().unwrap();
        assert_eq!(stack.last_popped(), Some(&8));
        assert_eq!(stack.top(), Some(7));
    }

    #[test]
    fn test_peek() {
        let mut stack = Stack::new(10);
        stack.push(10).unwrap();
        stack.push(20).unwrap();
        assert_eq!(stack.peek(0), Ok(&20));
        assert_eq!(stack.peek(1), Ok(&10));
        assert_eq!(stack.peek(2), Err(RuntimeError::StackUnderflow));
    }

    #[test]
    fn test_pop_n_keeps_order() {
        let mut stack = Stack::new(10);
        for i in 1..=4 {
            stack.push(i).unwrap();
        }
        assert_eq!(stack.pop_n(3), Ok(vec![2, 3, 4]));
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.pop_n(2), Err(RuntimeError::StackUnderflow));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let mut stack = Stack::new(2);
        stack.push(1).unwrap();
        stack.push(2).unwrap();
        assert_eq!(
            stack.push(3),
            Err(RuntimeError::StackOverflow { capacity: 2 })
        );
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_set_sp_clears_new_slots() {
        let mut stack = Stack::new(10);
        stack.push(5).unwrap();
        stack.push(6).unwrap();
        stack.pop().unwrap();
        stack.pop().unwrap();

        stack.set_sp(3).unwrap();
        assert_eq!(stack.iter().copied().collect::<Vec<_>>(), vec![0, 0, 0]);
        assert!(stack.set_sp(11).is_err());
    }

    #[test]
    fn test_get_set() {
        let mut stack = Stack::new(4);
        stack.push(1).unwrap();
        stack.set(0, 9).unwrap();
        assert_eq!(stack.get(0), Ok(&9));
        assert!(stack.get(4).is_err());
    }
}
