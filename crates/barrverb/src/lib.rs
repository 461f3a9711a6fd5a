//! MIDIVerb-style microcode reverb engine

// SPDX-FileCopyrightText: © 2024 The BarrVerb authors
//
// SPDX-License-Identifier: ISC

#![forbid(unsafe_code)]

pub mod config;
pub mod delay_memory;
pub mod engine_constants;
pub mod errors;
pub mod interpreter;
pub mod opcode;
pub mod pipeline;
pub mod programs;
pub mod rom;
pub mod svf;

pub use config::{EngineConfig, FilterCascade, FilterStage, FixedPointScale, OutputCadence};
pub use errors::ConfigError;
pub use interpreter::{DacFrame, MicrocodeInterpreter, StereoFrame};
pub use opcode::{OpClass, Opcode};
pub use pipeline::{PreFilter, ProgramSelector, SamplePipeline};
pub use programs::{Program, ProgramBuilder, ProgramTable, StepLayout};
pub use rom::MIDIVERB_BANK;
