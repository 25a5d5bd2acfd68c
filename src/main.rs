//! # Vulkan-RS Shader Compiler
//!
//! This binary compiles GLSL shaders into SPIR-V bytecode usable by the Vulkan graphics
//! pipeline, expanding `#include <file>` directives relative to each including file. Settings
//! come from the environment, see [`vulkanrs_shader::config`], and log output is controlled with
//! `RUST_LOG`.

use std::{env, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result, bail};
use vulkanrs_shader::{ArtifactCache, LogSink, Resolver, ShaderConfig, ShadercBackend};

const USAGE: &str = "\
usage: vulkanrs-shader <source> <dest>
       vulkanrs-shader --dir <shader-dir> <out-dir>
       vulkanrs-shader --expand <source>";

/// What the command line asked for.
enum Command {
    Compile { source: PathBuf, dest: PathBuf },
    CompileDir { src_dir: PathBuf, out_dir: PathBuf },
    Expand { source: PathBuf },
}

fn parse_args(args: &[String]) -> Result<Command> {
    let command = match args {
        [flag, src_dir, out_dir] if flag == "--dir" => Command::CompileDir {
            src_dir: src_dir.into(),
            out_dir: out_dir.into(),
        },
        [flag, source] if flag == "--expand" => Command::Expand {
            source: source.into(),
        },
        [source, dest] if !source.starts_with("--") => Command::Compile {
            source: source.into(),
            dest: dest.into(),
        },
        _ => bail!("{USAGE}"),
    };

    Ok(command)
}

fn run(command: Command) -> Result<()> {
    let config = ShaderConfig::from_env().context("Invalid shader configuration")?;
    let resolver = Resolver::new(config.include.clone(), &LogSink);

    // Expanding needs no compiler at all.
    if let Command::Expand { source } = &command {
        let expanded = resolver
            .resolve(source)
            .with_context(|| format!("Failed to expand '{}'", source.display()))?;

        for include in &expanded.includes {
            log::debug!("included {}", include.display());
        }
        print!("{}", expanded.text);
        return Ok(());
    }

    let cache = ArtifactCache::new(resolver, ShadercBackend::new(config)?);

    match command {
        Command::Compile { source, dest } => {
            cache
                .compile(&source, &dest)
                .with_context(|| format!("Failed to compile '{}'", source.display()))?;
        }
        Command::CompileDir { src_dir, out_dir } => {
            let compiled = cache
                .compile_dir(&src_dir, &out_dir)
                .with_context(|| format!("Failed to compile shaders in '{}'", src_dir.display()))?;
            log::info!("Compiled {} shader(s) into {}", compiled.len(), out_dir.display());
        }
        Command::Expand { .. } => unreachable!("handled above"),
    }

    Ok(())
}

fn main() -> ExitCode {
    pretty_env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();

    match parse_args(&args).and_then(run) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
