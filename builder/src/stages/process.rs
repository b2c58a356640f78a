/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

fn program(command: &Command) -> String {
    command.as_std().get_program().to_string_lossy().into_owned()
}

pub(crate) fn push_line(log: &mut String, line: &str) {
    log.push_str(line);
    log.push('\n');
}

/// Runs `command` and appends its stdout and stderr to `log` line by line while
/// it runs. The child is killed if the future is dropped.
pub(crate) async fn run_logged(mut command: Command, log: &mut String) -> Result<(), String> {
    let program = program(&command);

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .map_err(|e| format!("failed to start `{}`: {}", program, e))?;

    // Output is not guaranteed to be UTF-8, so lines are read as raw bytes.
    let mut stdout = child.stdout.take().map(|s| BufReader::new(s).split(b'\n'));
    let mut stderr = child.stderr.take().map(|s| BufReader::new(s).split(b'\n'));

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            line = async { stdout.as_mut()?.next_segment().await.ok().flatten() }, if stdout.is_some() => match line {
                Some(line) => push_line(log, &String::from_utf8_lossy(&line)),
                None => stdout = None,
            },
            line = async { stderr.as_mut()?.next_segment().await.ok().flatten() }, if stderr.is_some() => match line {
                Some(line) => push_line(log, &String::from_utf8_lossy(&line)),
                None => stderr = None,
            },
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|e| format!("failed to wait for `{}`: {}", program, e))?;

    debug!(program = %program, status = %status, "Process finished");

    if status.success() {
        Ok(())
    } else {
        Err(format!("`{}` exited with {}", program, status))
    }
}

/// Runs `command` to completion and returns its trimmed stdout. On a non-zero
/// exit the error carries the trimmed stderr.
pub(crate) async fn run_captured(mut command: Command) -> Result<String, String> {
    let program = program(&command);

    let output = command
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| format!("failed to start `{}`: {}", program, e))?;

    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if stderr.is_empty() {
        Err(format!("`{}` exited with {}", program, output.status))
    } else {
        Err(stderr)
    }
}
