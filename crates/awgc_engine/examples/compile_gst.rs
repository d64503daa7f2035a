//! Compile a GST file into command tables and sequencer programs
//!
//! Usage:
//! ```bash
//! # Built-in two-qubit demo
//! cargo run --example compile_gst
//!
//! # Own inputs, artifacts written to ./out
//! RUST_LOG=info cargo run --example compile_gst -- seq.gst channels.json params.json --out out
//! ```

use anyhow::{bail, Context, Result};
use awgc_engine::prelude::*;
use std::path::{Path, PathBuf};

const DEMO_GST: &str = "\
GST demo sequences
(1)x;(2)t100;
(1)t50;(2)y;(3)p;
(1)xx(2)x(4)p;(1)z45z;(2)myym;
(1)*drag[40,0.4,90];(3)p(4)p;
";

struct Args {
    gst: Option<PathBuf>,
    channel_map: Option<PathBuf>,
    params: Option<PathBuf>,
    out: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut positional = Vec::new();
    let mut out = None;
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--out" => out = Some(PathBuf::from(iter.next().context("--out needs a directory")?)),
            _ => positional.push(PathBuf::from(arg)),
        }
    }
    match positional.len() {
        0 | 3 => {}
        n => bail!("expected <gst> <channel-map.json> <params.json>, got {} paths", n),
    }
    let mut positional = positional.into_iter();
    Ok(Args {
        gst: positional.next(),
        channel_map: positional.next(),
        params: positional.next(),
        out,
    })
}

fn demo_compiler() -> Result<Compiler> {
    let registry = CoreRegistry::new(vec![
        CoreDescriptor::rf("dev8001", 0, 1).with_trigger(),
        CoreDescriptor::rf("dev8001", 1, 2),
        CoreDescriptor::dc("dev8002", 0, 3, 4),
    ])?;
    let params = GateParameterTable::new()
        .with_rf(1, RfParameters::new(66.0, 33.0, 0.5, 0.45, 1.0e8))
        .with_rf(2, RfParameters::new(70.0, 35.0, 0.48, 0.5, 1.2e8))
        .with_plunger(3, PlungerParameters::new(40.0, 0.2))
        .with_plunger(4, PlungerParameters::new(60.0, -0.15));
    Ok(Compiler::new(CompilerConfig::single_shot(), registry, params)?)
}

fn write_artifacts(compiled: &CompiledProgram, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for (id, artifacts) in &compiled.cores {
        let stem = format!("{}_core{}", id.awg, id.core);
        std::fs::write(dir.join(format!("{}_ct.json", stem)), &artifacts.table_json)?;
        std::fs::write(dir.join(format!("{}.seqc", stem)), &artifacts.program_text)?;
    }
    println!("✓ Artifacts written to {}", dir.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = parse_args()?;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              AWGC - GST Gate-Sequence Compiler               ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let compiled = match (&args.gst, &args.channel_map, &args.params) {
        (Some(gst), Some(map), Some(params)) => {
            let compiler = Compiler::from_json_files(CompilerConfig::standard(), map, params)
                .context("loading channel map and gate parameters")?;
            println!("Config: {}", compiler.config());
            compiler
                .compile_file(gst)
                .with_context(|| format!("compiling {}", gst.display()))?
        }
        _ => {
            println!("No inputs given, compiling the built-in demo\n");
            let compiler = demo_compiler()?;
            println!("Config: {}", compiler.config());
            compiler.compile_str(DEMO_GST)?
        }
    };

    println!("{}\n", compiled.summary);
    println!("{}", compiled.sync);

    for artifacts in compiled.cores.values() {
        println!("── {} ({} entries) ──", artifacts.id(), artifacts.table.len());
        for entry in &artifacts.table.entries {
            println!("  {}", entry);
        }
        for plan in &artifacts.lines {
            println!("  line {:>3}: {:?}", plan.line, plan.indices);
        }
        println!();
        println!("{}", artifacts.program_text);
    }

    if let Some(dir) = &args.out {
        write_artifacts(&compiled, dir)?;
    }
    Ok(())
}
