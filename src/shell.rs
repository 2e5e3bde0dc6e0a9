// ============================================================================
// SHELL — line loop over a script or an interactive stream
// ============================================================================
//
// Output protocol (one line per non-skipped input line):
//   Line <n>: <keyword> done          success (suppressed when quiet)
//   Invalid line <n>: <reason>         failure, the session continues
//   Image Processor Quit               written once by `quit()`

use std::io::{self, BufRead, Write};

use crate::interpreter::Interpreter;

/// Words that end a session early.
const QUIT_WORDS: &[&str] = &["quit", "exit", "q"];

/// Tally for one `run` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// A quit word was read before the input ended.
    pub quit: bool,
}

pub struct Shell<W: Write> {
    interpreter: Interpreter,
    out: W,
    quiet: bool,
}

impl<W: Write> Shell<W> {
    pub fn new(interpreter: Interpreter, out: W) -> Self {
        Self {
            interpreter,
            out,
            quiet: false,
        }
    }

    /// Suppress the per-line success messages.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn into_parts(self) -> (Interpreter, W) {
        (self.interpreter, self.out)
    }

    /// Feed every line of `input` to the interpreter. Line numbers count
    /// physical lines from 1, including skipped ones. A line that is not
    /// valid UTF-8 is reported as invalid and the session continues.
    pub fn run<R: BufRead>(&mut self, mut input: R) -> io::Result<RunSummary> {
        let mut summary = RunSummary::default();
        let mut buf = Vec::new();
        let mut n = 0;
        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            n += 1;
            let Ok(line) = std::str::from_utf8(&buf) else {
                summary.failed += 1;
                log::warn!("line {} is not valid UTF-8", n);
                writeln!(self.out, "Invalid line {}: line is not valid UTF-8", n)?;
                continue;
            };
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if QUIT_WORDS.contains(&trimmed.to_lowercase().as_str()) {
                summary.quit = true;
                break;
            }

            match self.interpreter.run_line(trimmed) {
                Ok(cmd) => {
                    summary.succeeded += 1;
                    if !self.quiet {
                        writeln!(self.out, "Line {}: {} done", n, cmd.keyword())?;
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    log::warn!("line {} failed: {}", n, e);
                    writeln!(self.out, "Invalid line {}: {}", n, e)?;
                }
            }
        }
        self.out.flush()?;
        Ok(summary)
    }

    /// Write the closing status line.
    pub fn quit(&mut self) -> io::Result<()> {
        writeln!(self.out, "Image Processor Quit")?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_script(script: &str, quiet: bool) -> (String, RunSummary) {
        let mut shell = Shell::new(Interpreter::default(), Vec::new()).quiet(quiet);
        let summary = shell.run(script.as_bytes()).unwrap();
        shell.quit().unwrap();
        let (_, out) = shell.into_parts();
        (String::from_utf8(out).unwrap(), summary)
    }

    #[test]
    fn reports_each_line_by_physical_number() {
        let script = "# header\n\ncreate-image empty a\nload a\ncreate-image copy b a\n";
        let (out, summary) = run_script(script, false);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Line 3: create-image done");
        assert!(lines[1].starts_with("Invalid line 4: "), "{}", lines[1]);
        assert_eq!(lines[2], "Line 5: create-image done");
        assert_eq!(lines[3], "Image Processor Quit");
        assert_eq!(
            summary,
            RunSummary {
                succeeded: 2,
                failed: 1,
                quit: false
            }
        );
    }

    #[test]
    fn quit_word_stops_the_session() {
        let (out, summary) = run_script("create-image empty a\nQUIT\ncreate-image empty b\n", true);
        assert_eq!(out, "Image Processor Quit\n");
        assert!(summary.quit);
        assert_eq!(summary.succeeded, 1);
    }

    #[test]
    fn undecodable_line_is_reported_and_the_session_continues() {
        let script: &[u8] = b"create-image empty a\n\
                              create-image empty \xff\xfe\n\
                              create-image empty b\n";
        let mut shell = Shell::new(Interpreter::default(), Vec::new());
        let summary = shell.run(script).unwrap();
        let (interp, out) = shell.into_parts();
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Line 1: create-image done",
                "Invalid line 2: line is not valid UTF-8",
                "Line 3: create-image done",
            ]
        );
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert!(interp.workspace().graph("b").is_ok());
    }
}
