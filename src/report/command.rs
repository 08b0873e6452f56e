// src/report/command.rs

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::report::PipelineError;

/// Launch one external tool invocation and wait for it to exit.
///
/// stdout is discarded (the tool's useful output is the files it writes);
/// stderr is drained and logged at debug so buffers never fill. A non-zero
/// exit becomes [`PipelineError::ToolExit`] carrying the rendered command
/// line, a failed launch becomes [`PipelineError::Spawn`].
///
/// There is no timeout: once launched, the tool runs to completion or
/// failure. A hung tool therefore holds its job's execution lock until the
/// operator intervenes.
pub async fn run_tool(step: &str, program: &str, args: &[String]) -> Result<(), PipelineError> {
    info!(%step, %program, "launching external tool");
    debug!(%step, ?args, "tool arguments");

    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| PipelineError::Spawn {
            command: render_command(program, args),
            source,
        })?;

    if let Some(stderr) = child.stderr.take() {
        let step = step.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(step = %step, "stderr: {}", line);
            }
        });
    }

    let status = child.wait().await.map_err(|source| PipelineError::Spawn {
        command: render_command(program, args),
        source,
    })?;

    if status.success() {
        debug!(%step, "tool exited successfully");
        Ok(())
    } else {
        Err(PipelineError::ToolExit {
            command: render_command(program, args),
            exit_code: status.code().unwrap_or(-1),
        })
    }
}

fn render_command(program: &str, args: &[String]) -> String {
    let mut rendered = String::from(program);
    for arg in args {
        rendered.push(' ');
        rendered.push_str(arg);
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_exit_is_ok() {
        run_tool("noop", "true", &[]).await.unwrap();
    }

    #[tokio::test]
    async fn nonzero_exit_carries_command_and_code() {
        let err = run_tool("fail", "false", &[]).await.unwrap_err();
        match err {
            PipelineError::ToolExit { command, exit_code } => {
                assert_eq!(command, "false");
                assert_eq!(exit_code, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unlaunchable_program_is_a_spawn_error() {
        let err = run_tool("ghost", "/definitely/not/a/real/binary", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Spawn { .. }));
    }
}
