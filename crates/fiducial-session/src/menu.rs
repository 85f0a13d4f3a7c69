//! The interactive menu.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::detection::DetectionSummary;
use crate::error::SessionError;

/// One menu selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationMode {
    GenerateMarker,
    DetectOnly,
    DetectAndSample,
    Exit,
}

impl OperationMode {
    pub const ALL: [OperationMode; 4] = [
        Self::GenerateMarker,
        Self::DetectOnly,
        Self::DetectAndSample,
        Self::Exit,
    ];

    /// The number the operator types for this mode.
    pub fn choice(self) -> u8 {
        match self {
            Self::GenerateMarker => 1,
            Self::DetectOnly => 2,
            Self::DetectAndSample => 3,
            Self::Exit => 4,
        }
    }

    pub fn from_choice(choice: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|m| i64::from(m.choice()) == choice)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::GenerateMarker => "create fiducial marker",
            Self::DetectOnly => "detect fiducial markers",
            Self::DetectAndSample => "detect markers and sample angles",
            Self::Exit => "exit",
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parse one line of operator input.
pub fn parse_choice(line: &str) -> Option<OperationMode> {
    line.trim()
        .parse::<i64>()
        .ok()
        .and_then(OperationMode::from_choice)
}

/// What the menu dispatches to.
pub trait Operations {
    /// Render the configured marker and write it out, returning the path.
    fn generate_marker(&mut self, console: &mut dyn Write) -> Result<PathBuf, SessionError>;

    /// Run one detection loop, sampling angles when `sampling` is set.
    fn detect(
        &mut self,
        sampling: bool,
        console: &mut dyn Write,
    ) -> Result<DetectionSummary, SessionError>;
}

/// Why the menu loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuExit {
    ExitChosen,
    /// Standard input reached end of file.
    InputClosed,
}

/// Repeating menu over a set of [`Operations`].
///
/// Operation failures are reported and the menu comes back; only console
/// I/O errors end the loop early.
pub struct SessionController<O> {
    operations: O,
}

impl<O: Operations> SessionController<O> {
    pub fn new(operations: O) -> Self {
        Self { operations }
    }

    pub fn into_operations(self) -> O {
        self.operations
    }

    pub fn run<R, W>(&mut self, mut input: R, output: &mut W) -> io::Result<MenuExit>
    where
        R: BufRead,
        W: Write,
    {
        let mut raw = Vec::new();
        loop {
            write_menu(output)?;

            raw.clear();
            if input.read_until(b'\n', &mut raw)? == 0 {
                log::info!("input closed, leaving menu");
                return Ok(MenuExit::InputClosed);
            }
            // Undecodable bytes become U+FFFD and fail to parse.
            let line = String::from_utf8_lossy(&raw);

            let Some(mode) = parse_choice(&line) else {
                log::warn!("bad menu choice {:?}", line.trim());
                writeln!(output, "Bad choice")?;
                continue;
            };
            log::debug!("menu choice: {mode}");

            match mode {
                OperationMode::Exit => return Ok(MenuExit::ExitChosen),
                OperationMode::GenerateMarker => {
                    match self.operations.generate_marker(output) {
                        Ok(path) => writeln!(output, "marker written to {}", path.display())?,
                        Err(err) => report(output, mode, &err)?,
                    }
                }
                OperationMode::DetectOnly | OperationMode::DetectAndSample => {
                    let sampling = mode == OperationMode::DetectAndSample;
                    match self.operations.detect(sampling, output) {
                        Ok(summary) => writeln!(output, "{summary}")?,
                        Err(err) => report(output, mode, &err)?,
                    }
                }
            }
        }
    }
}

fn write_menu<W: Write>(output: &mut W) -> io::Result<()> {
    for mode in OperationMode::ALL {
        writeln!(output, "{}. {}", mode.choice(), mode.label())?;
    }
    write!(output, "Enter your choice: ")?;
    output.flush()
}

fn report<W: Write>(output: &mut W, mode: OperationMode, err: &SessionError) -> io::Result<()> {
    log::error!("{mode} failed: {err}");
    writeln!(output, "{mode} failed: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::LoopOutcome;
    use crate::error::VisionError;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<OperationMode>,
        fail_detection: bool,
    }

    impl Operations for Recorder {
        fn generate_marker(&mut self, _console: &mut dyn Write) -> Result<PathBuf, SessionError> {
            self.calls.push(OperationMode::GenerateMarker);
            Ok(PathBuf::from("fiducial.png"))
        }

        fn detect(
            &mut self,
            sampling: bool,
            console: &mut dyn Write,
        ) -> Result<DetectionSummary, SessionError> {
            self.calls.push(if sampling {
                OperationMode::DetectAndSample
            } else {
                OperationMode::DetectOnly
            });
            if self.fail_detection {
                return Err(VisionError::SourceUnavailable { index: 0 }.into());
            }
            writeln!(console, "reading")?;
            Ok(DetectionSummary {
                outcome: LoopOutcome::Cancelled,
                frames: 1,
                observations: 0,
            })
        }
    }

    fn run(input: &str, ops: Recorder) -> (MenuExit, String, Recorder) {
        let mut controller = SessionController::new(ops);
        let mut out = Vec::new();
        let exit = controller.run(input.as_bytes(), &mut out).expect("run");
        (
            exit,
            String::from_utf8(out).expect("utf8"),
            controller.into_operations(),
        )
    }

    #[test]
    fn parses_only_the_four_choices() {
        assert_eq!(parse_choice("1\n"), Some(OperationMode::GenerateMarker));
        assert_eq!(parse_choice(" 3 "), Some(OperationMode::DetectAndSample));
        assert_eq!(parse_choice("4"), Some(OperationMode::Exit));
        for bad in ["0", "5", "-1", "", "two", "1.0", "99999999999999999999"] {
            assert_eq!(parse_choice(bad), None, "{bad:?}");
        }
    }

    #[test]
    fn out_of_range_choices_re_present_the_menu() {
        let (exit, out, ops) = run("0\n5\n4\n", Recorder::default());
        assert_eq!(exit, MenuExit::ExitChosen);
        assert_eq!(out.matches("Bad choice").count(), 2);
        assert_eq!(out.matches("Enter your choice").count(), 3);
        assert!(ops.calls.is_empty());
    }

    #[test]
    fn non_utf8_input_is_a_bad_choice() {
        let mut controller = SessionController::new(Recorder::default());
        let mut out = Vec::new();
        let exit = controller
            .run(&b"\xff\xfe\n4\n"[..], &mut out)
            .expect("run");
        let out = String::from_utf8(out).expect("utf8");
        assert_eq!(exit, MenuExit::ExitChosen);
        assert_eq!(out.matches("Bad choice").count(), 1);
        assert_eq!(out.matches("Enter your choice").count(), 2);
    }

    #[test]
    fn nothing_is_printed_after_exit() {
        let (_, out, ops) = run("4\n1\n", Recorder::default());
        assert!(out.ends_with("Enter your choice: "), "{out:?}");
        assert_eq!(out.matches("Enter your choice").count(), 1);
        assert!(ops.calls.is_empty());
    }

    #[test]
    fn dispatches_each_operation() {
        let (_, out, ops) = run("1\n2\n3\n4\n", Recorder::default());
        assert_eq!(
            ops.calls,
            vec![
                OperationMode::GenerateMarker,
                OperationMode::DetectOnly,
                OperationMode::DetectAndSample
            ]
        );
        assert!(out.contains("marker written to fiducial.png"));
        assert_eq!(out.matches("detection cancelled after 1 frames").count(), 2);
    }

    #[test]
    fn operation_errors_return_to_the_menu() {
        let ops = Recorder {
            fail_detection: true,
            ..Recorder::default()
        };
        let (exit, out, ops) = run("2\n1\n4\n", ops);
        assert_eq!(exit, MenuExit::ExitChosen);
        assert!(out.contains("detect fiducial markers failed: video source 0 could not be opened"));
        assert_eq!(ops.calls.len(), 2);
    }

    #[test]
    fn end_of_input_leaves_the_menu() {
        let (exit, out, _) = run("2\n", Recorder::default());
        assert_eq!(exit, MenuExit::InputClosed);
        assert!(out.contains("reading"));
    }
}
