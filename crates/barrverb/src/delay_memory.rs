//! Delay RAM

// SPDX-FileCopyrightText: © 2024 The BarrVerb authors
//
// SPDX-License-Identifier: ISC

use crate::engine_constants::{DELAY_MEMORY_SIZE, POINTER_MASK};

/// 14-bit delay RAM address.  All arithmetic wraps around the delay memory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DelayPointer(u16);

impl DelayPointer {
    pub const ZERO: Self = Self(0);

    pub const fn new(address: u16) -> Self {
        Self(address & POINTER_MASK)
    }

    pub const fn address(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    #[must_use]
    pub const fn advance(self, amount: u16) -> Self {
        Self(self.0.wrapping_add(amount) & POINTER_MASK)
    }
}

/// The emulated bucket-brigade delay line.
///
/// Allocated once and never resized.
pub struct DelayMemory {
    cells: Box<[i16; DELAY_MEMORY_SIZE]>,
}

impl DelayMemory {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            cells: Box::new([0; DELAY_MEMORY_SIZE]),
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    #[inline]
    pub fn read(&self, ptr: DelayPointer) -> i16 {
        // ptr is always masked, the bounds check is optimised out
        self.cells[ptr.index()]
    }

    #[inline]
    pub fn write(&mut self, ptr: DelayPointer, value: i16) {
        self.cells[ptr.index()] = value;
    }

    pub fn cells(&self) -> &[i16; DELAY_MEMORY_SIZE] {
        &self.cells
    }

    pub fn is_silent(&self) -> bool {
        self.cells.iter().all(|&c| c == 0)
    }
}
