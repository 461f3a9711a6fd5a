//! Microcode opcodes

// SPDX-FileCopyrightText: © 2024 The BarrVerb authors
//
// SPDX-License-Identifier: ISC

use crate::engine_constants::{ADVANCE_MASK, OP_CLASS_MASK, OP_CLASS_SHIFT};

use std::fmt::Display;

/// The operation selected by the top two bits of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpClass {
    /// `ai = ram[ptr]`, `latch = acc + ai/2`
    ReadAccumulate = 0,
    /// `ai = ram[ptr]`, `latch = ai/2`
    Read = 1,
    /// `ai = acc`, `ram[ptr] = ai`, `latch = acc + ai/2`
    WriteAccumulate = 2,
    /// `ai = acc`, `ram[ptr] = -ai`, `latch = -ai/2`
    WriteInvert = 3,
}

impl OpClass {
    pub const ALL: [OpClass; 4] = [
        OpClass::ReadAccumulate,
        OpClass::Read,
        OpClass::WriteAccumulate,
        OpClass::WriteInvert,
    ];

    pub const fn from_bits(bits: u16) -> Self {
        match bits & 0b11 {
            0 => Self::ReadAccumulate,
            1 => Self::Read,
            2 => Self::WriteAccumulate,
            _ => Self::WriteInvert,
        }
    }

    pub const fn bits(self) -> u16 {
        self as u16
    }

    pub const fn writes_memory(self) -> bool {
        matches!(self, Self::WriteAccumulate | Self::WriteInvert)
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::ReadAccumulate => "rda",
            Self::Read => "rd",
            Self::WriteAccumulate => "wra",
            Self::WriteInvert => "wrn",
        }
    }
}

/// A single 16-bit microcode instruction.
///
/// ```text
///  15 14 13                                     0
/// [ class |          pointer advance             ]
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(u16);

impl Opcode {
    pub const fn from_word(word: u16) -> Self {
        Self(word)
    }

    /// The advance is masked to 14 bits.
    pub const fn new(class: OpClass, advance: u16) -> Self {
        Self((class.bits() << OP_CLASS_SHIFT) | (advance & ADVANCE_MASK))
    }

    pub const fn word(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn class(self) -> OpClass {
        OpClass::from_bits((self.0 & OP_CLASS_MASK) >> OP_CLASS_SHIFT)
    }

    #[inline]
    pub const fn advance(self) -> u16 {
        self.0 & ADVANCE_MASK
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:<3} ${:04x}", self.class().mnemonic(), self.advance())
    }
}
