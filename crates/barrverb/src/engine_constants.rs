//! Engine constants

// SPDX-FileCopyrightText: © 2024 The BarrVerb authors
//
// SPDX-License-Identifier: ISC

// These values MUST match the emulated hardware.

#![allow(clippy::assertions_on_constants)]

/// Number of 16-bit words in the delay RAM.
pub const DELAY_MEMORY_SIZE: usize = 0x4000;

/// The delay pointer is 14 bits wide.
pub const POINTER_MASK: u16 = 0x3fff;

pub const STEPS_PER_PROGRAM: usize = 128;

/// The DAC/ADC path is 12 bits wide (one value is unused to keep the range symmetric).
pub const SAMPLE_MAX: i16 = 2047;
pub const SAMPLE_MIN: i16 = -SAMPLE_MAX;

pub const OP_CLASS_MASK: u16 = 0xc000;
pub const OP_CLASS_SHIFT: u32 = 14;
pub const ADVANCE_MASK: u16 = POINTER_MASK;

pub const N_PROGRAMS: usize = 64;

/// Default front panel program number (1-based).
pub const DEFAULT_PROGRAM_PARAMETER: f32 = 20.0;

const _: () = assert!(
    DELAY_MEMORY_SIZE == POINTER_MASK as usize + 1,
    "Pointer mask does not cover the delay memory"
);
const _: () = assert!(
    OP_CLASS_MASK & ADVANCE_MASK == 0 && (OP_CLASS_MASK | ADVANCE_MASK) == u16::MAX,
    "Opcode fields overlap"
);
