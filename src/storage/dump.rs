//! Optional raw SQL dump
//!
//! A best-effort side capability: a dump that cannot be produced yields
//! `None` and never fails a backup.

use std::process::Command;

use tracing::{debug, warn};

/// Produces raw SQL text for the whole database, if it can
pub trait SqlDumper {
    fn dump(&self) -> Option<String>;
}

/// A dumper that never produces anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDump;

impl SqlDumper for NoDump {
    fn dump(&self) -> Option<String> {
        None
    }
}

/// Runs an external program and captures its stdout as the dump
#[derive(Debug, Clone)]
pub struct CommandDump {
    argv: Vec<String>,
}

impl CommandDump {
    /// Build from a program followed by its arguments
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl SqlDumper for CommandDump {
    fn dump(&self) -> Option<String> {
        let (program, args) = self.argv.split_first()?;

        let output = match Command::new(program).args(args).output() {
            Ok(output) => output,
            Err(e) => {
                warn!(program = %program, error = %e, "SQL dump program not available");
                return None;
            }
        };

        if !output.status.success() {
            warn!(
                program = %program,
                status = %output.status,
                "SQL dump program failed"
            );
            return None;
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        if text.trim().is_empty() {
            warn!(program = %program, "SQL dump program produced no output");
            return None;
        }

        debug!(bytes = text.len(), "SQL dump captured");
        Some(text)
    }
}

/// Build the dumper described by settings
pub fn from_settings(dump_command: Option<&Vec<String>>) -> Box<dyn SqlDumper> {
    match dump_command {
        Some(argv) if !argv.is_empty() => Box::new(CommandDump::new(argv.clone())),
        _ => Box::new(NoDump),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_dump() {
        assert!(NoDump.dump().is_none());
    }

    #[test]
    fn test_missing_program_is_none() {
        let dumper = CommandDump::new(vec!["civic-backup-no-such-dump-tool".into()]);
        assert!(dumper.dump().is_none());
    }

    #[test]
    fn test_empty_argv_is_none() {
        assert!(CommandDump::new(Vec::new()).dump().is_none());
        assert!(from_settings(Some(&Vec::new())).dump().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_stdout() {
        let dumper = CommandDump::new(vec![
            "sh".into(),
            "-c".into(),
            "echo 'CREATE TABLE folders (id INTEGER);'".into(),
        ]);
        let dump = dumper.dump().unwrap();
        assert!(dump.contains("CREATE TABLE folders"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_program_is_none() {
        let dumper = CommandDump::new(vec!["sh".into(), "-c".into(), "exit 3".into()]);
        assert!(dumper.dump().is_none());
    }
}
