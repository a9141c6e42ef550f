//! Command-line front end for tacflow.
//!
//! Provides the `tacflow` binary with three subcommands: `check` verifies a
//! TAC file, `cfg` prints its control-flow graph, and `analyze` runs one
//! dataflow analysis and prints the visited snapshots. All output is JSON on
//! stdout; diagnostics and logs go to stderr.
//!
//! Reads configuration from environment variables:
//! - `TACFLOW_WINDOW`: default step-window size for `analyze` (default: 64)

use std::collections::BTreeSet;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::Level;

use tacflow_analysis::{
    Algorithm, AnalysisSession, ControlFlowGraph, GraphView, SessionConfig, Snapshot, WindowSize,
};
use tacflow_core::{build_program, CollectiveError, Instruction, NodeId, Program};

/// Dataflow analysis for three-address code.
#[derive(Parser)]
#[command(name = "tacflow", about = "Dataflow analysis for three-address code")]
struct Cli {
    /// Log analysis progress to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Verify a program and print its numbered instructions.
    Check {
        /// TAC source file.
        file: PathBuf,
    },

    /// Print the control-flow graph of a program.
    Cfg {
        /// TAC source file.
        file: PathBuf,

        /// Group instructions into basic blocks.
        #[arg(long)]
        blocks: bool,
    },

    /// Run a dataflow analysis and print its steps.
    Analyze {
        /// TAC source file.
        file: PathBuf,

        /// Analysis to run.
        #[arg(short, long, value_enum)]
        algorithm: AlgorithmArg,

        /// Variables live at program exit (liveness only), comma separated.
        #[arg(long, value_delimiter = ',')]
        live_out: Vec<String>,

        /// Steps kept for backward navigation (default: $TACFLOW_WINDOW or 64).
        #[arg(short, long)]
        window: Option<usize>,

        /// Keep every step instead of a bounded window.
        #[arg(long, conflicts_with = "window")]
        unbounded: bool,

        /// Print only the first N steps after the initial one.
        #[arg(short, long, conflicts_with = "to_end")]
        steps: Option<usize>,

        /// Print only the final snapshot.
        #[arg(long)]
        to_end: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AlgorithmArg {
    Liveness,
    LivenessBlocks,
    Reaching,
    Constants,
}

impl AlgorithmArg {
    /// Builds the session algorithm; live-out names are accepted by liveness only.
    fn resolve(self, live_out: Vec<String>) -> Result<Algorithm, String> {
        let live_out: BTreeSet<String> = live_out.into_iter().collect();
        match self {
            AlgorithmArg::Liveness => Ok(Algorithm::LivenessInstructions { live_out }),
            AlgorithmArg::LivenessBlocks => Ok(Algorithm::LivenessBlocks { live_out }),
            _ if !live_out.is_empty() => {
                Err("--live-out only applies to liveness analyses".to_string())
            }
            AlgorithmArg::Reaching => Ok(Algorithm::ReachingDefinitions),
            AlgorithmArg::Constants => Ok(Algorithm::ConstantPropagation),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match cli.command {
        Commands::Check { file } => run_check(&file),
        Commands::Cfg { file, blocks } => run_cfg(&file, blocks),
        Commands::Analyze {
            file,
            algorithm,
            live_out,
            window,
            unbounded,
            steps,
            to_end,
        } => {
            let window = if unbounded {
                Ok(WindowSize::Unbounded)
            } else {
                window_size(window)
            };
            match algorithm.resolve(live_out).and_then(|a| window.map(|w| (a, w))) {
                Ok((algorithm, window)) => {
                    run_analyze(&file, algorithm, SessionConfig { window }, steps, to_end)
                }
                Err(msg) => {
                    eprintln!("Error: {}", msg);
                    1
                }
            }
        }
    };
    process::exit(exit_code);
}

/// Resolves the window from the flag, then `TACFLOW_WINDOW`, then the default.
fn window_size(flag: Option<usize>) -> Result<WindowSize, String> {
    if let Some(size) = flag {
        return Ok(WindowSize::Bounded(size));
    }
    match std::env::var("TACFLOW_WINDOW") {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(WindowSize::Bounded)
            .map_err(|_| format!("invalid TACFLOW_WINDOW '{}', expected a number", raw)),
        Err(_) => Ok(SessionConfig::default().window),
    }
}

/// Reads and verifies a program.
///
/// Returns the exit code on failure: 2 = invalid program, 3 = I/O error.
fn load_program(path: &Path) -> Result<Program, i32> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", path.display(), e);
            return Err(3);
        }
    };
    build_program(&text).map_err(|err| {
        report(&err);
        2
    })
}

fn report(err: &CollectiveError) {
    eprintln!("{}:", err);
    for error in &err.errors {
        eprintln!("  - {}", error);
    }
}

fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: failed to serialize output: {}", e);
            1
        }
    }
}

#[derive(Serialize)]
struct NumberedInstruction<'a> {
    id: NodeId,
    text: String,
    instruction: &'a Instruction,
}

/// Execute the check subcommand.
///
/// Returns exit code: 0 = valid, 2 = invalid program, 3 = I/O error.
fn run_check(path: &Path) -> i32 {
    let program = match load_program(path) {
        Ok(program) => program,
        Err(code) => return code,
    };
    let listing: Vec<NumberedInstruction> = program
        .iter()
        .map(|(id, instruction)| NumberedInstruction {
            id,
            text: instruction.to_string(),
            instruction,
        })
        .collect();
    print_json(&listing)
}

/// Execute the cfg subcommand.
fn run_cfg(path: &Path, blocks: bool) -> i32 {
    let mut program = match load_program(path) {
        Ok(program) => program,
        Err(code) => return code,
    };
    let graph = if blocks {
        ControlFlowGraph::basic_blocks(&mut program)
    } else {
        ControlFlowGraph::per_instruction(&mut program)
    };
    let view = graph.and_then(|graph| GraphView::new(&program, &graph, &Default::default()));
    match view {
        Ok(view) => print_json(&view),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

/// Writes `{"algorithm": .., "view": .., "steps": [..]}` to `out`, emitting
/// each snapshot as soon as the session produces it.
///
/// Returns the number of snapshots written.
fn write_report<W: Write>(
    out: &mut W,
    session: &mut AnalysisSession,
    steps: Option<usize>,
    to_end: bool,
) -> io::Result<usize> {
    write!(out, "{{\"algorithm\":")?;
    serde_json::to_writer(&mut *out, session.algorithm())?;
    write!(out, ",\"view\":")?;
    serde_json::to_writer(&mut *out, session.view())?;
    write!(out, ",\"steps\":[")?;

    let mut written = 0usize;
    let mut emit = |out: &mut W, snapshot: Option<&Snapshot>| -> io::Result<()> {
        if let Some(snapshot) = snapshot {
            if written > 0 {
                write!(out, ",")?;
            }
            writeln!(out)?;
            serde_json::to_writer(&mut *out, snapshot)?;
            written += 1;
        }
        Ok(())
    };

    if to_end {
        emit(out, session.step_to_end())?;
    } else {
        emit(out, session.current())?;
        let limit = steps.unwrap_or(usize::MAX);
        let mut taken = 0usize;
        while taken < limit && session.has_next() {
            emit(out, session.step_forward())?;
            taken += 1;
        }
    }
    writeln!(out, "\n]}}")?;
    out.flush()?;
    Ok(written)
}

/// Execute the analyze subcommand.
///
/// Returns exit code: 0 = success, 1 = invalid arguments,
/// 2 = invalid program, 3 = I/O error.
fn run_analyze(
    path: &Path,
    algorithm: Algorithm,
    config: SessionConfig,
    steps: Option<usize>,
    to_end: bool,
) -> i32 {
    let program = match load_program(path) {
        Ok(program) => program,
        Err(code) => return code,
    };
    let mut session = match AnalysisSession::new(program, algorithm, config) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let mut out = BufWriter::new(io::stdout().lock());
    match write_report(&mut out, &mut session, steps, to_end) {
        Ok(written) => {
            tracing::info!(steps = written, "analysis finished");
            0
        }
        Err(e) => {
            eprintln!("Error: failed to write output: {}", e);
            3
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(text: &str, window: WindowSize) -> AnalysisSession {
        let program = build_program(text).unwrap();
        AnalysisSession::new(program, Algorithm::ReachingDefinitions, SessionConfig { window })
            .unwrap()
    }

    fn render(
        session: &mut AnalysisSession,
        steps: Option<usize>,
        to_end: bool,
    ) -> serde_json::Value {
        let mut buf = Vec::new();
        write_report(&mut buf, session, steps, to_end).unwrap();
        serde_json::from_slice(&buf).unwrap()
    }

    #[test]
    fn streamed_report_is_one_json_document() {
        // one block between Entry and Exit
        let mut session = session("a = 1\nb = a", WindowSize::Bounded(1));
        let json = render(&mut session, None, false);

        assert_eq!(json["algorithm"]["algorithm"], "reaching_definitions");
        assert!(json["view"]["nodes"].is_array());
        let steps = json["steps"].as_array().unwrap();
        assert_eq!(steps.first().unwrap()["phase"], "initialized");
        assert_eq!(steps.last().unwrap()["phase"], "ended");
        // every step is written even though the window keeps only two
        assert_eq!(steps.len(), 1 + 2 * 3 * 2 + 1);
    }

    #[test]
    fn step_limit_and_to_end() {
        let mut limited = session("a = 1", WindowSize::default());
        assert_eq!(render(&mut limited, Some(2), false)["steps"].as_array().unwrap().len(), 3);

        let mut last = session("a = 1", WindowSize::default());
        let steps = render(&mut last, None, true)["steps"].as_array().unwrap().clone();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0]["phase"], "ended");
    }

    #[test]
    fn live_out_belongs_to_liveness_only() {
        let names = || vec!["x".to_string()];
        assert_eq!(
            AlgorithmArg::LivenessBlocks.resolve(names()),
            Ok(Algorithm::LivenessBlocks {
                live_out: ["x".to_string()].into()
            })
        );
        assert!(AlgorithmArg::Reaching.resolve(names()).is_err());
        assert!(AlgorithmArg::Constants.resolve(names()).is_err());
        assert_eq!(
            AlgorithmArg::Constants.resolve(Vec::new()),
            Ok(Algorithm::ConstantPropagation)
        );
    }
}
