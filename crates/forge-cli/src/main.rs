//! Forge - CMake build wrapper with structured output inspection
//!
//! The `forge` command runs CMake configure and build steps and turns their
//! output into project, toolchain, diagnostic and target summaries.
//!
//! ## Commands
//!
//! - `inspect build`: Inspect a captured build log
//! - `inspect configure`: Inspect a captured configure log
//! - `project-name`: Print the project declared in a CMakeLists.txt
//! - `configure`: Run `cmake -S -B` and inspect its output
//! - `build`: Run `cmake --build` and inspect its output

mod record;
mod runner;
mod summary;
mod telemetry;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use forge_inspect::{decode_lossy, BuildInspector, InspectOptions};
use serde::Serialize;
use tracing::{debug, info, Level};

use crate::record::{RunMetadata, RunRecord};
use crate::runner::{CommandOutput, CommandRunner, CommandSpec, ProcessRunner};

#[derive(Parser)]
#[command(name = "forge")]
#[command(author = "Forge Developers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CMake build wrapper with structured output inspection", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    log_json: bool,

    /// CMake executable to run
    #[arg(long, global = true, env = "FORGE_CMAKE", default_value = "cmake")]
    cmake: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect previously captured output
    Inspect {
        #[command(subcommand)]
        action: InspectAction,
    },

    /// Print the project name declared by a CMakeLists.txt
    ProjectName {
        /// CMakeLists.txt, or a directory containing one
        path: PathBuf,
    },

    /// Run the CMake configure step and inspect its output
    Configure {
        /// Source directory (containing CMakeLists.txt)
        #[arg(short = 'S', long, default_value = ".")]
        source_dir: PathBuf,

        /// Build directory
        #[arg(short = 'B', long, default_value = "build")]
        build_dir: PathBuf,

        /// CMake generator (e.g. "Ninja")
        #[arg(short = 'G', long)]
        generator: Option<String>,

        /// Cache entry to define, as KEY=VALUE
        #[arg(short = 'D', long = "define", value_name = "KEY=VALUE", value_parser = parse_define)]
        defines: Vec<String>,

        /// CMAKE_BUILD_TYPE to set
        #[arg(long)]
        build_type: Option<String>,

        /// Kill the step after this many seconds (0 = no limit)
        #[arg(long, default_value = "0")]
        timeout: u64,

        /// Directory for JSON run records
        #[arg(long, env = "FORGE_RECORD_DIR")]
        record_dir: Option<PathBuf>,
    },

    /// Run the CMake build step and inspect its output
    Build {
        /// Build directory
        #[arg(short = 'B', long, default_value = "build")]
        build_dir: PathBuf,

        /// Source directory, for the project name (default: from CMakeCache.txt)
        #[arg(short = 'S', long)]
        source_dir: Option<PathBuf>,

        /// Target to build
        #[arg(short, long)]
        target: Option<String>,

        /// Configuration for multi-config generators (e.g. Release)
        #[arg(long)]
        config: Option<String>,

        /// Parallel build jobs
        #[arg(short, long)]
        jobs: Option<u32>,

        /// Kill the step after this many seconds (0 = no limit)
        #[arg(long, default_value = "0")]
        timeout: u64,

        /// Directory for JSON run records
        #[arg(long, env = "FORGE_RECORD_DIR")]
        record_dir: Option<PathBuf>,

        /// Collapse repeated diagnostics
        #[arg(long, env = "FORGE_DEDUP")]
        dedup: bool,
    },
}

#[derive(Subcommand)]
enum InspectAction {
    /// Inspect build output (Ninja, Make or MSBuild)
    Build {
        /// Log file ("-" or omitted for stdin)
        log: Option<PathBuf>,

        /// CMakeLists.txt used to name the project
        #[arg(long, conflicts_with = "source_dir")]
        cmakelists: Option<PathBuf>,

        /// Source directory used to name the project
        #[arg(long)]
        source_dir: Option<PathBuf>,

        /// Collapse repeated diagnostics
        #[arg(long, env = "FORGE_DEDUP")]
        dedup: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect CMake configure output
    Configure {
        /// Log file ("-" or omitted for stdin)
        log: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_define(value: &str) -> std::result::Result<String, String> {
    match value.split_once('=') {
        Some((key, _)) if !key.is_empty() => Ok(value.to_string()),
        _ => Err(format!("expected KEY=VALUE, got {value:?}")),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    telemetry::init_tracing(cli.log_json, level);

    let inspector = BuildInspector::new();

    match cli.command {
        Commands::Inspect { action } => match action {
            InspectAction::Build {
                log,
                cmakelists,
                source_dir,
                dedup,
                json,
            } => {
                let descriptor = cmakelists.or(source_dir);
                cmd_inspect_build(&inspector, log.as_deref(), descriptor.as_deref(), dedup, json)
            }
            InspectAction::Configure { log, json } => {
                cmd_inspect_configure(&inspector, log.as_deref(), json)
            }
        },
        Commands::ProjectName { path } => cmd_project_name(&inspector, &path),
        Commands::Configure {
            source_dir,
            build_dir,
            generator,
            defines,
            build_type,
            timeout,
            record_dir,
        } => {
            let spec = configure_command(
                &cli.cmake,
                &source_dir,
                &build_dir,
                generator.as_deref(),
                build_type.as_deref(),
                &defines,
            )
            .timeout_secs(timeout);
            cmd_configure(&inspector, &ProcessRunner, &spec, &source_dir, record_dir.as_deref())
                .await
        }
        Commands::Build {
            build_dir,
            source_dir,
            target,
            config,
            jobs,
            timeout,
            record_dir,
            dedup,
        } => {
            let spec = build_command(
                &cli.cmake,
                &build_dir,
                target.as_deref(),
                config.as_deref(),
                jobs,
            )
            .timeout_secs(timeout);
            let source_dir = source_dir.or_else(|| source_dir_from_cache(&inspector, &build_dir));
            let options = InspectOptions {
                deduplicate: dedup,
                parallel_jobs: jobs,
            };
            cmd_build(
                &inspector,
                &ProcessRunner,
                &spec,
                source_dir.as_deref(),
                &options,
                record_dir.as_deref(),
            )
            .await
        }
    }
}

// ── Command construction ────────────────────────────────────────────────

fn configure_command(
    cmake: &str,
    source_dir: &Path,
    build_dir: &Path,
    generator: Option<&str>,
    build_type: Option<&str>,
    defines: &[String],
) -> CommandSpec {
    let mut spec = CommandSpec::new(cmake).args([
        "-S".to_string(),
        source_dir.display().to_string(),
        "-B".to_string(),
        build_dir.display().to_string(),
    ]);
    if let Some(generator) = generator {
        spec = spec.args(["-G", generator]);
    }
    if let Some(build_type) = build_type {
        spec = spec.arg(format!("-DCMAKE_BUILD_TYPE={build_type}"));
    }
    for define in defines {
        spec = spec.arg(format!("-D{define}"));
    }
    spec
}

fn build_command(
    cmake: &str,
    build_dir: &Path,
    target: Option<&str>,
    config: Option<&str>,
    jobs: Option<u32>,
) -> CommandSpec {
    let mut spec = CommandSpec::new(cmake).args(["--build".to_string(), build_dir.display().to_string()]);
    if let Some(target) = target {
        spec = spec.args(["--target", target]);
    }
    if let Some(config) = config {
        spec = spec.args(["--config", config]);
    }
    if let Some(jobs) = jobs {
        spec = spec.args(["--parallel".to_string(), jobs.to_string()]);
    }
    spec
}

/// Recover the source directory recorded in `<build>/CMakeCache.txt`.
fn source_dir_from_cache(inspector: &BuildInspector, build_dir: &Path) -> Option<PathBuf> {
    let cache = std::fs::read(build_dir.join("CMakeCache.txt")).ok()?;
    let meta = inspector.inspect_configure_output(&decode_lossy(&cache));
    let home = meta.option("CMAKE_HOME_DIRECTORY")?;
    debug!(event = "cache.source_dir", source_dir = home);
    Some(PathBuf::from(home))
}

// ── Command handlers ────────────────────────────────────────────────────

/// Read a log file, or stdin when `path` is absent or `-`.
fn read_log(path: Option<&Path>) -> Result<String> {
    let bytes = match path {
        Some(path) if path != Path::new("-") => std::fs::read(path)
            .with_context(|| format!("Failed to read log file {:?}", path))?,
        _ => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read log from stdin")?;
            buf
        }
    };
    Ok(decode_lossy(&bytes).into_owned())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize result")?
    );
    Ok(())
}

fn cmd_inspect_build(
    inspector: &BuildInspector,
    log: Option<&Path>,
    descriptor: Option<&Path>,
    dedup: bool,
    json: bool,
) -> Result<ExitCode> {
    let text = read_log(log)?;
    let options = InspectOptions {
        deduplicate: dedup,
        parallel_jobs: None,
    };
    let meta = inspector.inspect_build_output_with(&text, descriptor, &options);

    if json {
        print_json(&meta)?;
    } else {
        print!("{}", summary::render_build(&meta));
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_inspect_configure(
    inspector: &BuildInspector,
    log: Option<&Path>,
    json: bool,
) -> Result<ExitCode> {
    let text = read_log(log)?;
    let meta = inspector.inspect_configure_output(&text);

    if json {
        print_json(&meta)?;
    } else {
        print!("{}", summary::render_configure(&meta));
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_project_name(inspector: &BuildInspector, path: &Path) -> Result<ExitCode> {
    match inspector.detect_project_name(path) {
        Some(name) => {
            println!("{name}");
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("no project() call found in {:?}", path);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn cmd_configure(
    inspector: &BuildInspector,
    runner: &dyn CommandRunner,
    spec: &CommandSpec,
    source_dir: &Path,
    record_dir: Option<&Path>,
) -> Result<ExitCode> {
    let output = runner.run(spec).await?;
    echo(&output);

    let mut meta = inspector.inspect_configure_output(&output.combined());
    if meta.project_name.is_none() {
        meta.project_name = inspector.detect_project_name(source_dir);
    }
    info!(
        event = "configure.inspected",
        generator = ?meta.generator,
        packages = meta.found_packages.len(),
    );

    println!();
    print!("{}", summary::render_configure(&meta));
    write_record(record_dir, spec, &output, RunMetadata::Configure(meta))?;

    Ok(exit_code(output.exit_code))
}

async fn cmd_build(
    inspector: &BuildInspector,
    runner: &dyn CommandRunner,
    spec: &CommandSpec,
    source_dir: Option<&Path>,
    options: &InspectOptions,
    record_dir: Option<&Path>,
) -> Result<ExitCode> {
    let output = runner.run(spec).await?;
    echo(&output);

    let meta = inspector.inspect_build_output_with(&output.combined(), source_dir, options);
    info!(
        event = "build.inspected",
        targets = meta.targets.len(),
        warnings = meta.warning_count(),
        errors = meta.error_count(),
    );

    println!();
    print!("{}", summary::render_build(&meta));
    write_record(record_dir, spec, &output, RunMetadata::Build(meta))?;

    Ok(exit_code(output.exit_code))
}

fn echo(output: &CommandOutput) {
    print!("{}", output.stdout);
    eprint!("{}", output.stderr);
}

fn write_record(
    record_dir: Option<&Path>,
    spec: &CommandSpec,
    output: &CommandOutput,
    metadata: RunMetadata,
) -> Result<()> {
    if let Some(dir) = record_dir {
        let record = RunRecord::new(spec, output, metadata);
        let path = record.write_to(dir)?;
        info!(event = "record.written", run_id = %record.run_id, path = ?path);
    }
    Ok(())
}

/// Map a child exit code onto this process's exit status.
fn exit_code(code: i32) -> ExitCode {
    match u8::try_from(code) {
        Ok(code) => ExitCode::from(code),
        Err(_) => ExitCode::FAILURE,
    }
}
