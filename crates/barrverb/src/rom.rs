//! The program bank
//!
//! 64 programs in four families of 16:
//!  * `0x00..0x10`: reverbs with a long decay (comb feedback 3/4)
//!  * `0x10..0x20`: plates with a short decay (comb feedback 1/2) and predelay
//!  * `0x20..0x30`: feedback echoes
//!  * `0x30..0x40`: early reflection ambiences (no feedback)
//!
//! The programs are assembled at compile time.

// SPDX-FileCopyrightText: © 2024 The BarrVerb authors
//
// SPDX-License-Identifier: ISC

use crate::engine_constants::{DELAY_MEMORY_SIZE, N_PROGRAMS};
use crate::programs::{Program, ProgramBuilder, ProgramTable, StepLayout};

use crate::opcode::OpClass::{Read, ReadAccumulate, WriteAccumulate, WriteInvert};

const LAYOUT: StepLayout = StepLayout::MIDIVERB;

/// Position of the input-load (ADC) cell
const INPUT: u16 = 0;

// Comb and diffuser lengths at size 16 (in passes)
const COMB_LENGTHS: [u16; 4] = [1116, 1188, 1277, 1356];
const DIFFUSER_LENGTHS: [u16; 4] = [142, 107, 379, 277];

const LEFT_TAP_JITTER: [u16; 6] = [0, 7, 3, 11, 5, 13];
const RIGHT_TAP_JITTER: [u16; 6] = [4, 0, 9, 2, 12, 6];

/// 4 comb taps, 2 diffusers, 2 gain stages
const REVERB_CHAIN_STEPS: usize = 4 + 3 + 1 + 3 + 1;
/// 6 input taps, 1 diffuser, 1 gain stage
const AMBIENCE_CHAIN_STEPS: usize = 6 + 3 + 1;

#[rustfmt::skip]
const NAMES: [&str; N_PROGRAMS] = [
    "Small Room", "Bright Room", "Medium Room", "Wood Room",
    "Studio A", "Studio B", "Chamber", "Stone Chamber",
    "Concert Hall", "Warm Hall", "Large Hall", "Dark Hall",
    "Church", "Big Church", "Cathedral", "Cavern",

    "Tight Plate", "Small Plate", "Vocal Plate", "Snare Plate",
    "Plate A", "Plate B", "Bright Plate", "Long Plate",
    "Predelay Room", "Predelay Studio", "Predelay Chamber", "Predelay Hall",
    "Wide Plate", "Slow Plate", "Distant Room", "Far Hall",

    "Slapback", "Slapback Repeat", "Short Echo", "Short Echo Repeat",
    "Echo", "Echo Repeat", "Medium Echo", "Medium Echo Repeat",
    "Long Echo", "Long Echo Repeat", "Delay", "Delay Repeat",
    "Long Delay", "Long Delay Repeat", "Space Echo", "Space Echo Repeat",

    "Booth", "Closet", "Bathroom", "Small Ambience",
    "Ambience", "Wide Ambience", "Garage", "Gym",
    "Hallway", "Stairwell", "Warehouse", "Parking Garage",
    "Canyon", "Stadium", "Arena", "Multi-tap",
];

#[derive(Clone, Copy)]
enum Decay {
    /// feedback 1/2
    Short,
    /// feedback 3/4
    Long,
}

/// `line[0] = input/2 + feedback * line[length]`
const fn comb(
    b: ProgramBuilder,
    decay: Decay,
    input: u16,
    line: u16,
    length: u16,
    scratch: u16,
) -> ProgramBuilder {
    match decay {
        Decay::Short => b
            .op(Read, input)
            .op(ReadAccumulate, line + length)
            .op(WriteAccumulate, line),

        // The scratch write scales the accumulator by 3/2
        Decay::Long => b
            .op(Read, line + length)
            .op(WriteAccumulate, scratch)
            .op(ReadAccumulate, input)
            .op(WriteAccumulate, line),
    }
}

/// Diffuser, the line holds the inverted signal.
/// Output is `-(v + v[length]) / 2` where `v = acc - v[length] / 2`.
const fn diffuser(b: ProgramBuilder, line: u16, length: u16) -> ProgramBuilder {
    b.op(ReadAccumulate, line + length)
        .op(WriteInvert, line)
        .op(ReadAccumulate, line + length)
}

/// Memory region allocator, returns `(region_start, next_free_position)`
const fn alloc(next: u16, length: u16) -> (u16, u16) {
    let end = next as usize + length as usize + 1;
    assert!(end < DELAY_MEMORY_SIZE, "Program does not fit in delay memory");
    (next, end as u16)
}

const fn scale(length: u16, size: u16) -> u16 {
    let l = (length as u32 * size as u32 / 16) as u16;
    if l > 0 {
        l
    } else {
        1
    }
}

const fn reverb(name: &'static str, size: u16, predelay: u16, decay: Decay) -> Program {
    // input region is `INPUT..=predelay`
    let mut next = INPUT + predelay + 1;

    let mut combs = [(0, 0); 4];
    let mut i = 0;
    while i < combs.len() {
        let length = scale(COMB_LENGTHS[i], size);
        let (line, n) = alloc(next, length);
        combs[i] = (line, length);
        next = n;
        i += 1;
    }

    let mut diffusers = [(0, 0); 4];
    let mut i = 0;
    while i < diffusers.len() {
        let length = scale(DIFFUSER_LENGTHS[i], size);
        let (line, n) = alloc(next, length);
        diffusers[i] = (line, length);
        next = n;
        i += 1;
    }

    let scratch = next;

    let mut b = ProgramBuilder::new(LAYOUT, scratch);

    let mut i = 0;
    while i < combs.len() {
        b = comb(b, decay, INPUT + predelay, combs[i].0, combs[i].1, scratch);
        i += 1;
    }

    // Right channel
    b = b.seek(LAYOUT.right_output as usize - REVERB_CHAIN_STEPS);
    let mut i = 0;
    while i < combs.len() {
        let class = if i == 0 { Read } else { ReadAccumulate };
        b = b.op(class, combs[i].0 + combs[i].1 / 5);
        i += 1;
    }
    b = diffuser(b, diffusers[2].0, diffusers[2].1);
    b = b.op(WriteAccumulate, scratch);
    b = diffuser(b, diffusers[3].0, diffusers[3].1);
    b = b.op(WriteAccumulate, scratch);
    b = b.output(LAYOUT.right_output, WriteAccumulate, scratch);

    // Left channel
    b = b.seek(LAYOUT.left_output as usize - REVERB_CHAIN_STEPS);
    let mut i = 0;
    while i < combs.len() {
        let class = if i == 0 { Read } else { ReadAccumulate };
        b = b.op(class, combs[i].0 + combs[i].1 / 3);
        i += 1;
    }
    b = diffuser(b, diffusers[0].0, diffusers[0].1);
    b = b.op(WriteAccumulate, scratch);
    b = diffuser(b, diffusers[1].0, diffusers[1].1);
    b = b.op(WriteAccumulate, scratch);
    b = b.output(LAYOUT.left_output, WriteAccumulate, scratch);

    b.build(name)
}

const fn echo(name: &'static str, delay: u16, decay: Decay, left_tap: u16, right_tap: u16) -> Program {
    assert!(left_tap <= delay && right_tap <= delay);

    let (line, scratch) = alloc(INPUT + 1, delay);

    let b = ProgramBuilder::new(LAYOUT, scratch);
    let b = comb(b, decay, INPUT, line, delay, scratch);

    b.output(LAYOUT.right_output, Read, line + right_tap)
        .output(LAYOUT.left_output, Read, line + left_tap)
        .build(name)
}

const fn ambience(name: &'static str, spacing: u16, diffusion: u16) -> Program {
    let mut left_taps = [0; 6];
    let mut right_taps = [0; 6];
    let mut max_tap = 0;

    let mut i = 0;
    while i < left_taps.len() {
        let t = spacing * (i as u16 + 1);
        left_taps[i] = INPUT + t + LEFT_TAP_JITTER[i];
        right_taps[i] = INPUT + t + RIGHT_TAP_JITTER[i];

        if left_taps[i] > max_tap {
            max_tap = left_taps[i];
        }
        if right_taps[i] > max_tap {
            max_tap = right_taps[i];
        }
        i += 1;
    }

    let next = max_tap + 1;
    let left_diffuser_length = scale(DIFFUSER_LENGTHS[0], diffusion);
    let (left_diffuser, next) = alloc(next, left_diffuser_length);
    let right_diffuser_length = scale(DIFFUSER_LENGTHS[1], diffusion);
    let (right_diffuser, scratch) = alloc(next, right_diffuser_length);

    let mut b = ProgramBuilder::new(LAYOUT, scratch);

    b = b.seek(LAYOUT.right_output as usize - AMBIENCE_CHAIN_STEPS);
    let mut i = 0;
    while i < right_taps.len() {
        let class = if i == 0 { Read } else { ReadAccumulate };
        b = b.op(class, right_taps[i]);
        i += 1;
    }
    b = diffuser(b, right_diffuser, right_diffuser_length);
    b = b.op(WriteAccumulate, scratch);
    b = b.output(LAYOUT.right_output, WriteAccumulate, scratch);

    b = b.seek(LAYOUT.left_output as usize - AMBIENCE_CHAIN_STEPS);
    let mut i = 0;
    while i < left_taps.len() {
        let class = if i == 0 { Read } else { ReadAccumulate };
        b = b.op(class, left_taps[i]);
        i += 1;
    }
    b = diffuser(b, left_diffuser, left_diffuser_length);
    b = b.op(WriteAccumulate, scratch);
    b = b.output(LAYOUT.left_output, WriteAccumulate, scratch);

    b.build(name)
}

const fn program(index: usize) -> Program {
    let name = NAMES[index];
    let v = (index % 16) as u16;

    match index / 16 {
        0 => reverb(name, 6 + v, 24 + v * 40, Decay::Long),
        1 => reverb(name, 4 + v, 200 + v * 60, Decay::Short),
        2 => {
            let delay = 600 + v * 600;
            let decay = if v % 2 == 0 { Decay::Short } else { Decay::Long };
            echo(name, delay, decay, delay, delay * 3 / 4)
        }
        _ => ambience(name, 37 + v * 29, 8 + v),
    }
}

const fn build_bank() -> [Program; N_PROGRAMS] {
    let mut bank = [Program::BLANK; N_PROGRAMS];

    let mut i = 0;
    while i < N_PROGRAMS {
        bank[i] = program(i);
        i += 1;
    }
    bank
}

pub static PROGRAMS: [Program; N_PROGRAMS] = build_bank();

pub static MIDIVERB_BANK: ProgramTable<'static> = ProgramTable::new(&PROGRAMS, LAYOUT);
