use std::process::Command;

use log::{debug, info};

use super::{LatencyError, TcCommand};

const TC_PROGRAM: &str = "tc";

pub trait CommandRunner {
    fn run(&mut self, command: &TcCommand) -> Result<(), LatencyError>;
}

/// Runs commands on the host.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, command: &TcCommand) -> Result<(), LatencyError> {
        debug!("Running `{command}`");
        let reason = match Command::new(TC_PROGRAM).args(command.args()).output() {
            Ok(output) if output.status.success() => return Ok(()),
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                if stderr.is_empty() {
                    output.status.to_string()
                } else {
                    stderr
                }
            }
            Err(e) => e.to_string(),
        };

        if command.may_fail() {
            debug!("Ignoring failure of `{command}`: {reason}");
            return Ok(());
        }
        Err(LatencyError::CommandFailed {
            command: command.to_string(),
            reason,
        })
    }
}

/// Records commands instead of running them.
#[derive(Debug, Default)]
pub struct DryRunRunner {
    executed: Vec<String>,
}

impl DryRunRunner {
    pub fn executed(&self) -> &[String] {
        &self.executed
    }
}

impl CommandRunner for DryRunRunner {
    fn run(&mut self, command: &TcCommand) -> Result<(), LatencyError> {
        self.executed.push(command.to_string());
        Ok(())
    }
}

/// Runs `commands` in order and stops at the first failure. Rules installed
/// before the failure are left in place.
pub fn apply<R: CommandRunner + ?Sized>(
    commands: &[TcCommand],
    runner: &mut R,
) -> Result<usize, LatencyError> {
    for command in commands {
        runner.run(command)?;
    }
    info!("Applied {} traffic control commands", commands.len());
    Ok(commands.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latency::{IpZoneTable, ShapingPlan, ZoneLatencyMatrix, unset_commands};

    struct FailingRunner {
        fail_at: usize,
        seen: usize,
    }

    impl CommandRunner for FailingRunner {
        fn run(&mut self, command: &TcCommand) -> Result<(), LatencyError> {
            self.seen += 1;
            if self.seen == self.fail_at {
                return Err(LatencyError::CommandFailed {
                    command: command.to_string(),
                    reason: "boom".to_string(),
                });
            }
            Ok(())
        }
    }

    fn plan() -> ShapingPlan {
        let table = IpZoneTable::from_reader(
            "Node,IP,Zone\na,10.0.0.1,z1\nb,10.0.0.2,z2\n".as_bytes(),
            "inline",
        )
        .unwrap();
        let matrix =
            ZoneLatencyMatrix::from_reader("from/to,z1,z2\nz1,0,25\n".as_bytes(), "inline")
                .unwrap();
        ShapingPlan::build("eth0", "10.0.0.1".parse().unwrap(), &table, &matrix).unwrap()
    }

    #[test]
    fn dry_run_records_everything() {
        let mut runner = DryRunRunner::default();
        let applied = apply(&plan().commands(), &mut runner).unwrap();
        assert_eq!(applied, 8);
        assert_eq!(runner.executed().len(), 8);
        assert_eq!(runner.executed()[0], "tc qdisc del dev eth0 root");
    }

    #[test]
    fn stops_at_first_failure() {
        let mut runner = FailingRunner { fail_at: 3, seen: 0 };
        let err = apply(&plan().commands(), &mut runner).unwrap_err();
        assert!(matches!(err, LatencyError::CommandFailed { .. }));
        assert_eq!(runner.seen, 3);
    }

    #[test]
    fn unset_is_a_single_tolerant_delete() {
        let mut runner = DryRunRunner::default();
        apply(&unset_commands("ens5"), &mut runner).unwrap();
        assert_eq!(runner.executed(), ["tc qdisc del dev ens5 root"]);
    }
}
