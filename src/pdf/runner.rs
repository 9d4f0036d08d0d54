//! Subprocess execution for the external PDF tools
//!
//! Commands run in an explicit working directory with fully buffered
//! stdin/stdout. There is no timeout: a hung tool blocks the caller.

use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::process::{Command, Stdio};

/// Run `program` with `args` inside `dir` and return its standard output.
///
/// When `stdin` is given it is written to the child's standard input from a
/// separate thread, so a tool that streams output before it finishes reading
/// cannot deadlock against us.
///
/// A non-zero exit status becomes [`Error::CommandFailed`] carrying the
/// captured standard error.
pub fn run_command<I, S>(
    dir: &Path,
    program: &Path,
    args: I,
    stdin: Option<&[u8]>,
) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program_name = program.display().to_string();

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(dir)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    tracing::debug!(command = ?command, "spawning external tool");

    let mut child = command.spawn().map_err(|source| Error::Spawn {
        program: program_name.clone(),
        source,
    })?;

    let child_stdin = child.stdin.take();

    let (output, write_result) = std::thread::scope(|scope| {
        let writer = scope.spawn(move || -> std::io::Result<()> {
            match (child_stdin, stdin) {
                (Some(mut pipe), Some(input)) => {
                    pipe.write_all(input)?;
                    // Dropping the pipe closes it so the tool sees EOF
                    drop(pipe);
                    Ok(())
                }
                _ => Ok(()),
            }
        });

        let output = child.wait_with_output();
        let write_result = writer
            .join()
            .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
        (output, write_result)
    });

    let output = output?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::debug!(program = %program_name, status = %output.status, %stderr, "external tool failed");
        return Err(Error::CommandFailed {
            program: program_name,
            status: output.status,
            stderr,
        });
    }

    if let Err(e) = write_result {
        if e.kind() != ErrorKind::BrokenPipe {
            return Err(Error::Io(e));
        }
        tracing::debug!(program = %program_name, "tool exited before reading all of stdin");
    }

    tracing::debug!(
        program = %program_name,
        stdout_bytes = output.stdout.len(),
        "external tool finished"
    );

    Ok(output.stdout)
}
