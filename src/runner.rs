use declarative::{CommandExecutor, Error};
use std::process::{Command, Stdio};

/// Runs mutation commands (`groupadd`, `usermod`, ...) as child processes
///
/// In mock mode the command line is printed instead, so a run can be
/// previewed on a machine where the shadow tools must not be touched.
#[derive(Debug, Default)]
pub struct SystemExecutor {
    mock: bool,
}

impl SystemExecutor {
    pub fn new(mock: bool) -> Self {
        Self { mock }
    }
}

impl CommandExecutor for SystemExecutor {
    fn execute(&self, program: &str, args: &[String]) -> declarative::Result<()> {
        if self.mock {
            println!("MOCK: {} {}", program, args.join(" "));
            return Ok(());
        }

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::CommandExecution {
                program: program.to_string(),
                message: format!("Failed to execute: {}", e),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = match stderr.trim() {
            "" => format!("exited with {}", output.status),
            detail => format!("exited with {}: {}", output.status, detail),
        };
        Err(Error::CommandExecution {
            program: program.to_string(),
            message,
        })
    }
}
