// src/utils/commands.rs

use std::process::Command;

use crate::errors::CommandError;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

fn build(program: &str, args: &[&str]) -> Command {
    let mut command = Command::new(program);
    command.args(args);
    // Keep child consoles from flashing over the GUI.
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        command.creation_flags(CREATE_NO_WINDOW);
    }
    command
}

/// Runs a command to completion, failing on a non-zero exit status.
pub fn run_command(program: &str, args: &[&str]) -> Result<(), CommandError> {
    tracing::debug!("Running '{} {}'", program, args.join(" "));
    let status = build(program, args)
        .status()
        .map_err(|e| CommandError::Launch(program.to_string(), e))?;

    if status.success() {
        Ok(())
    } else {
        Err(CommandError::ExitStatus(
            format!("{} {}", program, args.join(" ")),
            status.code().unwrap_or(-1),
        ))
    }
}

/// Runs a command and returns its stdout as text, lossily decoded. Used by
/// tweaks that probe applied-state by scanning tool output.
pub fn capture_output(program: &str, args: &[&str]) -> Result<String, CommandError> {
    let output = build(program, args)
        .output()
        .map_err(|e| CommandError::Launch(program.to_string(), e))?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
