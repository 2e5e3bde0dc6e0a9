// ============================================================================
// PixelGraph CLI — run image scripts from files or stdin
// ============================================================================
//
// Usage examples:
//   PixelGraph --script build.txt
//   PixelGraph -s "scripts/*.txt" --jpeg-quality 80 --quiet
//   PixelGraph                                   (reads commands from stdin)
//
// All script files share one interpreter, so images created by an earlier
// script are visible to later ones.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::interpreter::Interpreter;
use crate::logger;
use crate::settings::EngineSettings;
use crate::shell::{RunSummary, Shell};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// PixelGraph script-driven image processor.
#[derive(Parser, Debug)]
#[command(
    name = "PixelGraph",
    version,
    about = "Script-driven pixel graph and layered image processor",
    long_about = "Runs image scripts (one command per line) against a shared set of\n\
                  named images and layered images. Supports PPM, PNG and JPEG.\n\n\
                  Example:\n  \
                  PixelGraph --script build.txt\n  \
                  PixelGraph -s \"scripts/*.txt\" --quiet"
)]
pub struct CliArgs {
    /// Script file(s) to run in order. Glob patterns accepted.
    /// When omitted, commands are read from standard input.
    #[arg(short, long, num_args = 1.., value_name = "PATTERN")]
    pub script: Vec<String>,

    /// JPEG quality (1–100). Overrides the settings file.
    #[arg(long, value_name = "1-100", value_parser = clap::value_parser!(u8).range(1..=100))]
    pub jpeg_quality: Option<u8>,

    /// Do not print a line for each command that succeeds.
    #[arg(short, long)]
    pub quiet: bool,

    /// Mirror log records to stderr at debug level.
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not write the session log file.
    #[arg(long)]
    pub no_log: bool,

    /// Settings file to use instead of the platform default.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    /// Settings file values with the command-line overrides applied.
    pub fn settings(&self) -> EngineSettings {
        let mut settings = match &self.config {
            Some(path) => EngineSettings::load_from(path),
            None => EngineSettings::load(),
        };
        if let Some(q) = self.jpeg_quality {
            settings.jpeg_quality = q;
        }
        if self.quiet {
            settings.echo_success = false;
        }
        if self.no_log {
            settings.session_log = false;
        }
        settings
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run the session and return an OS exit code.
/// `0` = every line succeeded, `1` = a line failed or a script was unreadable.
pub fn run(args: CliArgs) -> ExitCode {
    let settings = args.settings();
    if let Some(path) = logger::init(settings.session_log, args.verbose) {
        log::debug!("session log at {}", path.display());
    }

    let interpreter = Interpreter::new(settings.workspace_options());
    let stdout = io::stdout();
    let mut shell = Shell::new(interpreter, stdout.lock()).quiet(!settings.echo_success);

    let mut any_failure = false;
    let started = Instant::now();

    if args.script.is_empty() {
        match shell.run(io::stdin().lock()) {
            Ok(summary) => any_failure |= summary.failed > 0,
            Err(e) => {
                eprintln!("error: could not read standard input: {}", e);
                any_failure = true;
            }
        }
    } else {
        let scripts = resolve_inputs(&args.script);
        if scripts.is_empty() {
            eprintln!("error: no script files matched the given pattern(s).");
            any_failure = true;
        }
        for path in &scripts {
            match run_script(&mut shell, path) {
                Ok(summary) => {
                    log::info!(
                        "{}: {} ok, {} failed",
                        path.display(),
                        summary.succeeded,
                        summary.failed
                    );
                    any_failure |= summary.failed > 0;
                    if summary.quit {
                        break;
                    }
                }
                Err(e) => {
                    eprintln!("error: could not read script '{}': {}", path.display(), e);
                    any_failure = true;
                }
            }
        }
    }

    if let Err(e) = shell.quit() {
        eprintln!("error: {}", e);
        any_failure = true;
    }
    log::info!(
        "session finished in {:.0}ms",
        started.elapsed().as_secs_f64() * 1000.0
    );
    log::logger().flush();

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

fn run_script<W: io::Write>(shell: &mut Shell<W>, path: &Path) -> io::Result<RunSummary> {
    let file = File::open(path)?;
    log::info!("running script {}", path.display());
    shell.run(BufReader::new(file))
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
pub fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}
