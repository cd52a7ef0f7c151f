//! Initial thread frames and the simulated context restore.
//!
//! A saved context on ARMv7-M is sixteen words at the saved stack pointer:
//! the eight registers the trap handler pushes by hand (R4-R11) followed by
//! the eight the hardware stacks on exception entry (R0-R3, R12, LR, PC,
//! xPSR). The exception return pops exactly this frame, so a fresh thread
//! only needs a fake one with its entry address in the PC slot.
//!
//! This is the only module that knows the frame layout. The kernel passes
//! [`SavedContext`] values around and never indexes frame words itself.

use ringos_core::{EntryPoint, OsError, OsResult};

/// Words in one saved frame
pub const FRAME_WORDS: usize = 16;

/// Words pushed by the trap handler (R4-R11)
pub const SOFTWARE_WORDS: usize = 8;

/// Execution-state bit in xPSR; must be set for Thumb code.
pub const THUMB_BIT: u32 = 0x0100_0000;

/// Test pattern loaded into R0-R12 of a fresh thread
pub const INITIAL_REGISTERS: [u32; 13] = [
    0x0000_0000,
    0x0101_0101,
    0x0202_0202,
    0x0303_0303,
    0x0404_0404,
    0x0505_0505,
    0x0606_0606,
    0x0707_0707,
    0x0808_0808,
    0x0909_0909,
    0x1010_1010,
    0x1111_1111,
    0x1212_1212,
];

/// Test pattern loaded into LR of a fresh thread
pub const INITIAL_LR: u32 = 0x1414_1414;

// word offsets inside a frame
const R4: usize = 0;
const R0: usize = 8;
const R12: usize = 12;
const LR: usize = 13;
const PC: usize = 14;
const XPSR: usize = 15;

/// Location of a thread's saved frame, as a word offset into its stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SavedContext(usize);

impl SavedContext {
    pub const fn from_offset(offset: usize) -> Self {
        Self(offset)
    }

    pub const fn offset(self) -> usize {
        self.0
    }

    /// Offset at which a fresh frame lands in a stack of `stack_words`
    pub const fn initial(stack_words: usize) -> Option<Self> {
        if stack_words < FRAME_WORDS {
            None
        } else {
            Some(Self(stack_words - FRAME_WORDS))
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SavedContext {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "ctx@{}", self.0);
    }
}

/// Register values as they stand after a restore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterFile {
    /// R0 through R12
    pub r: [u32; 13],
    pub lr: u32,
    pub pc: u32,
    pub xpsr: u32,
}

impl RegisterFile {
    /// Registers a thread starts with
    pub const fn initial(entry: EntryPoint) -> Self {
        Self {
            r: INITIAL_REGISTERS,
            lr: INITIAL_LR,
            pc: entry.resume_address(),
            xpsr: THUMB_BIT,
        }
    }

    pub const fn is_thumb(&self) -> bool {
        self.xpsr & THUMB_BIT != 0
    }
}

/// Writes a fresh frame at the top of `stack` and returns its location.
pub fn build_initial_frame(stack: &mut [u32], entry: EntryPoint) -> OsResult<SavedContext> {
    let context = SavedContext::initial(stack.len()).ok_or(OsError::StackTooSmall {
        words: stack.len(),
        required: FRAME_WORDS,
    })?;
    let frame = &mut stack[context.offset()..];
    let regs = RegisterFile::initial(entry);

    frame[R4..R4 + SOFTWARE_WORDS].copy_from_slice(&regs.r[4..12]);
    frame[R0..R0 + 4].copy_from_slice(&regs.r[0..4]);
    frame[R12] = regs.r[12];
    frame[LR] = regs.lr;
    frame[PC] = regs.pc;
    frame[XPSR] = regs.xpsr;

    Ok(context)
}

/// Pops the frame at `context` the way the trap handler and exception
/// return would.
pub fn restore_frame(stack: &[u32], context: SavedContext) -> OsResult<RegisterFile> {
    let end = context
        .offset()
        .checked_add(FRAME_WORDS)
        .ok_or(OsError::InvalidContext)?;
    let frame = stack
        .get(context.offset()..end)
        .ok_or(OsError::InvalidContext)?;

    let mut r = [0u32; 13];
    r[4..12].copy_from_slice(&frame[R4..R4 + SOFTWARE_WORDS]);
    r[0..4].copy_from_slice(&frame[R0..R0 + 4]);
    r[12] = frame[R12];

    Ok(RegisterFile {
        r,
        lr: frame[LR],
        pc: frame[PC],
        xpsr: frame[XPSR],
    })
}
