//! barrverb binary

// SPDX-FileCopyrightText: © 2024 The BarrVerb authors
//
// SPDX-License-Identifier: ISC

mod wav;

use barrverb::engine_constants::STEPS_PER_PROGRAM;
use barrverb::{EngineConfig, OpClass, ProgramTable, SamplePipeline, MIDIVERB_BANK};

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use std::fs;
use std::path::PathBuf;

macro_rules! error {
    ($($arg:tt)*) => {{
        eprintln!($($arg)*);
        std::process::exit(1);
    }};
}

#[derive(Parser)]
#[command(author, version)]
#[command(about = "MIDIVerb-style microcode reverb")]
#[command(arg_required_else_help = true)]
struct ArgParser {
    #[arg(short = 'v', long, global = true, help = "show debug messages")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a reverb program to a wave file
    Process(ProcessArgs),

    /// List the reverb programs
    Programs(ProgramsArgs),

    /// Print the microcode of a program
    Disasm(DisasmArgs),

    /// Print the impulse response of a program
    Trace(TraceArgs),
}

// Engine configuration
// ====================

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    Midiverb,
    FullRate,
}

#[derive(Args)]
struct EngineArgs {
    #[arg(
        long,
        value_enum,
        default_value = "midiverb",
        conflicts_with = "config",
        help = "engine preset"
    )]
    preset: Preset,

    #[arg(long, value_name = "JSON_FILE", help = "engine configuration file")]
    config: Option<PathBuf>,
}

fn engine_config(args: &EngineArgs) -> EngineConfig {
    match &args.config {
        Some(path) => {
            let contents = match fs::read_to_string(path) {
                Ok(s) => s,
                Err(why) => error!("Couldn't open {}: {}", path.display(), why),
            };
            match serde_json::from_str(&contents) {
                Ok(c) => c,
                Err(why) => error!("Error reading {}: {}", path.display(), why),
            }
        }
        None => match args.preset {
            Preset::Midiverb => EngineConfig::MIDIVERB,
            Preset::FullRate => EngineConfig::FULL_RATE,
        },
    }
}

fn create_pipeline(
    config: EngineConfig,
    sample_rate: f32,
    program: usize,
) -> SamplePipeline<'static> {
    let mut pipeline = match SamplePipeline::new(config, sample_rate) {
        Ok(p) => p,
        Err(e) => error!("Invalid engine configuration: {}", e),
    };
    pipeline.select_program(program);
    pipeline
}

// Process
// =======

#[derive(Args)]
struct ProcessArgs {
    #[arg(value_name = "WAV_FILE", help = "input wave file")]
    input: PathBuf,

    #[arg(short = 'o', long, value_name = "WAV_FILE", help = "output wave file")]
    output: PathBuf,

    #[arg(short = 'p', long, value_name = "N", default_value_t = 0, help = "program index")]
    program: usize,

    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = 2.0,
        help = "length of silence to append to the input"
    )]
    tail: f32,

    #[arg(
        long,
        value_name = "N",
        default_value_t = 512,
        help = "number of frames per process call"
    )]
    block_size: usize,

    #[command(flatten)]
    engine: EngineArgs,
}

fn process_wave_file(args: ProcessArgs) {
    if args.block_size == 0 {
        error!("--block-size cannot be 0");
    }
    let config = engine_config(&args.engine);

    let input = match wav::read_wave_file(&args.input) {
        Ok(w) => w,
        Err(why) => error!("Error reading {}: {}", args.input.display(), why),
    };

    let sample_rate = input.sample_rate;
    let mut pipeline = create_pipeline(config, sample_rate as f32, args.program);

    let tail_frames = match tail_frames(args.tail, sample_rate) {
        Some(n) => n,
        None => error!(
            "Invalid --tail: {} (must be between 0 and {} seconds)",
            args.tail, MAX_TAIL_SECONDS
        ),
    };
    let n_frames = input.n_frames() + tail_frames;

    info!(
        program = pipeline.program_index(),
        name = MIDIVERB_BANK.name(pipeline.program_index()),
        sample_rate,
        n_frames,
        "Processing {}",
        args.input.display()
    );

    let mut left = vec![0.0; n_frames];
    let mut right = vec![0.0; n_frames];

    let mut block_l = vec![0.0; args.block_size];
    let mut block_r = vec![0.0; args.block_size];

    let mut n_blocks = 0;

    for start in (0..n_frames).step_by(args.block_size) {
        let end = (start + args.block_size).min(n_frames);
        let out_l = &mut left[start..end];
        let out_r = &mut right[start..end];

        match &input.channels {
            wav::Channels::Mono(samples) => {
                let block = &mut block_l[..end - start];
                copy_padded(block, samples, start);
                pipeline.process_mono(block, out_l, out_r);
            }
            wav::Channels::Stereo(in_l, in_r) => {
                let bl = &mut block_l[..end - start];
                let br = &mut block_r[..end - start];
                copy_padded(bl, in_l, start);
                copy_padded(br, in_r, start);
                pipeline.process(bl, br, out_l, out_r);
            }
        }
        n_blocks += 1;
    }

    debug!(n_blocks, block_size = args.block_size, "Processed");

    match wav::write_stereo_wave_file(&args.output, sample_rate, &left, &right) {
        Ok(()) => info!("Wrote {}", args.output.display()),
        Err(why) => error!("Error writing {}: {}", args.output.display(), why),
    }
}

const MAX_TAIL_SECONDS: f32 = 60.0;

fn tail_frames(seconds: f32, sample_rate: u32) -> Option<usize> {
    match seconds {
        s if (0.0..=MAX_TAIL_SECONDS).contains(&s) => Some((s * sample_rate as f32) as usize),
        _ => None,
    }
}

/// Copies `source[start..]` into `block`, zero-filling past the end of `source`.
fn copy_padded(block: &mut [f32], source: &[f32], start: usize) {
    let src = source.get(start..).unwrap_or_default();
    let n = src.len().min(block.len());

    block[..n].copy_from_slice(&src[..n]);
    block[n..].fill(0.0);
}

// Programs
// ========

#[derive(Args)]
struct ProgramsArgs {
    #[arg(long, help = "output json")]
    json: bool,
}

#[derive(Serialize)]
struct ProgramInfo {
    index: usize,
    name: &'static str,
    reads: usize,
    writes: usize,
    total_advance: u16,
}

fn program_info(table: &ProgramTable, index: usize) -> ProgramInfo {
    let p = table.program(index);

    ProgramInfo {
        index,
        name: p.name(),
        reads: p.count_steps(OpClass::Read) + p.count_steps(OpClass::ReadAccumulate),
        writes: p.count_steps(OpClass::WriteAccumulate) + p.count_steps(OpClass::WriteInvert),
        total_advance: p.total_advance(),
    }
}

fn list_programs(args: ProgramsArgs) {
    let programs: Vec<ProgramInfo> = (0..MIDIVERB_BANK.len())
        .map(|i| program_info(&MIDIVERB_BANK, i))
        .collect();

    if args.json {
        print_json(&programs);
    } else {
        for p in &programs {
            println!(
                "{:>2}  {:<24} {:>3} reads {:>3} writes",
                p.index, p.name, p.reads, p.writes
            );
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(why) => error!("Cannot serialize json: {}", why),
    }
}

// Disassemble
// ===========

#[derive(Args)]
struct DisasmArgs {
    #[arg(short = 'p', long, value_name = "N", help = "program index")]
    program: usize,
}

fn disassemble(args: DisasmArgs) {
    let index = MIDIVERB_BANK.wrap_index(args.program);
    let program = MIDIVERB_BANK.program(index);
    let layout = MIDIVERB_BANK.layout();

    println!("; {}: {}", index, program.name());
    println!("; step  position  opcode");

    for step in 0..STEPS_PER_PROGRAM {
        let comment = match step {
            s if s == usize::from(layout.input) => "  ; input",
            s if s == usize::from(layout.left_output) => "  ; left output",
            s if s == usize::from(layout.right_output) => "  ; right output",
            _ => "",
        };

        println!(
            "  ${:02x}   ${:04x}     {}{}",
            step,
            program.step_position(step),
            program.opcode(step),
            comment
        );
    }

    println!("; total advance: ${:04x}", program.total_advance());
}

// Trace
// =====

#[derive(Args)]
struct TraceArgs {
    #[arg(short = 'p', long, value_name = "N", default_value_t = 0, help = "program index")]
    program: usize,

    #[arg(long, value_name = "HZ", default_value_t = 48000.0, help = "sample rate")]
    sample_rate: f32,

    #[arg(long, value_name = "N", default_value_t = 16384, help = "number of frames")]
    frames: usize,

    #[arg(long, help = "output the whole trace as json")]
    json: bool,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Serialize)]
struct ChannelTrace {
    first_non_zero: Option<usize>,
    peak: f32,
    peak_frame: usize,
    samples: Vec<f32>,
}

impl ChannelTrace {
    fn new(samples: Vec<f32>) -> Self {
        let (peak_frame, peak) = samples
            .iter()
            .copied()
            .enumerate()
            .fold((0, 0.0_f32), |acc, (i, s)| {
                if s.abs() > acc.1.abs() {
                    (i, s)
                } else {
                    acc
                }
            });

        Self {
            first_non_zero: samples.iter().position(|&s| s != 0.0),
            peak,
            peak_frame,
            samples,
        }
    }
}

#[derive(Serialize)]
struct Trace {
    program: usize,
    name: &'static str,
    sample_rate: f32,
    config: EngineConfig,
    left: ChannelTrace,
    right: ChannelTrace,
}

fn trace(args: TraceArgs) {
    let config = engine_config(&args.engine);
    let mut pipeline = create_pipeline(config, args.sample_rate, args.program);

    let mut input = vec![0.0; args.frames];
    if let Some(s) = input.first_mut() {
        *s = 1.0;
    }
    let mut left = vec![0.0; args.frames];
    let mut right = vec![0.0; args.frames];

    pipeline.process_mono(&input, &mut left, &mut right);

    let program = pipeline.program_index();
    let trace = Trace {
        program,
        name: MIDIVERB_BANK.name(program),
        sample_rate: args.sample_rate,
        config,
        left: ChannelTrace::new(left),
        right: ChannelTrace::new(right),
    };

    if args.json {
        print_json(&trace);
    } else {
        println!("{}: {} at {} Hz", trace.program, trace.name, trace.sample_rate);
        for (label, c) in [("left", &trace.left), ("right", &trace.right)] {
            match c.first_non_zero {
                Some(f) => println!(
                    "  {:<5} first non-zero frame {:>6}, peak {:+.6} at frame {}",
                    label, f, c.peak, c.peak_frame
                ),
                None => println!("  {:<5} silent", label),
            }
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = ArgParser::parse();

    init_logging(args.verbose);

    match args.command {
        Command::Process(c) => process_wave_file(c),
        Command::Programs(c) => list_programs(c),
        Command::Disasm(c) => disassemble(c),
        Command::Trace(c) => trace(c),
    }
}
