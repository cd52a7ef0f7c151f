//! Statically sized thread stacks.
//!
//! Each ring slot owns one stack of `W` words. While a thread runs, the
//! processor writes its stack behind the compiler's back, so the pool hands
//! out raw access only under the conditions spelled out on each method.

use core::cell::UnsafeCell;
use core::mem::size_of;

use ringos_core::{OsError, OsResult};
use ringos_port::{SavedContext, FRAME_WORDS};

const WORD_BYTES: usize = size_of::<u32>();

// 8-byte alignment keeps every hardware-stacked frame aligned as long as W
// is even.
#[repr(C, align(8))]
struct Stacks<const N: usize, const W: usize>([[u32; W]; N]);

pub(crate) struct StackPool<const N: usize, const W: usize> {
    stacks: UnsafeCell<Stacks<N, W>>,
}

// SAFETY: all mutable access goes through `stack_mut`, whose callers hold a
// critical section and guarantee the stack's thread is not executing.
unsafe impl<const N: usize, const W: usize> Sync for StackPool<N, W> {}

impl<const N: usize, const W: usize> StackPool<N, W> {
    pub(crate) const fn new() -> Self {
        assert!(W % 2 == 0, "stack size must be an even number of words");
        Self {
            stacks: UnsafeCell::new(Stacks([[0; W]; N])),
        }
    }

    /// # Safety
    ///
    /// The caller holds a critical section and no thread is executing on
    /// stack `index`.
    pub(crate) unsafe fn stack_mut(&self, index: usize) -> &mut [u32; W] {
        &mut (*self.stacks.get()).0[index]
    }

    /// # Safety
    ///
    /// The caller holds a critical section and no thread is executing on
    /// stack `index`.
    pub(crate) unsafe fn stack(&self, index: usize) -> &[u32; W] {
        &(*self.stacks.get()).0[index]
    }

    /// Address of the first word of stack `index`
    pub(crate) fn base_address(&self, index: usize) -> usize {
        self.stacks.get() as usize + index * W * WORD_BYTES
    }

    /// Stack-pointer value that addresses `context` in stack `index`
    pub(crate) fn address_of(&self, index: usize, context: SavedContext) -> usize {
        self.base_address(index) + context.offset() * WORD_BYTES
    }

    /// Turns a captured stack pointer back into a context of stack `index`.
    ///
    /// Fails when the pointer is misaligned or leaves no room for a whole
    /// frame, which is what an overflowed stack looks like.
    pub(crate) fn context_at(&self, index: usize, stack_pointer: usize) -> OsResult<SavedContext> {
        let base = self.base_address(index);
        let byte_offset = stack_pointer
            .checked_sub(base)
            .ok_or(OsError::InvalidContext)?;
        if byte_offset % WORD_BYTES != 0 {
            return Err(OsError::InvalidContext);
        }
        let offset = byte_offset / WORD_BYTES;
        if offset + FRAME_WORDS > W {
            return Err(OsError::InvalidContext);
        }
        Ok(SavedContext::from_offset(offset))
    }
}
