use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::OracleError;
use crate::table::parse_table;
use crate::types::{SegmentCandidate, Transcript};

use super::SelectionOracle;

/// Delegates selection to an external program.
///
/// The transcript is written to the program's stdin as SubRip text and a
/// segment table is expected on its stdout. The child is killed if the call
/// is abandoned (timeout or cancellation).
#[derive(Debug, Clone)]
pub struct CommandOracle {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandOracle {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl SelectionOracle for CommandOracle {
    fn name(&self) -> &str {
        &self.program
    }

    async fn select(
        &self,
        transcript: &Transcript,
    ) -> Result<Vec<SegmentCandidate>, OracleError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn()?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| OracleError::Failed("child stdin unavailable".to_string()))?;
        let input = transcript.to_srt();

        let feed = async move {
            let written = stdin.write_all(input.as_bytes()).await;
            drop(stdin);
            written
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        match fed {
            // The program may answer without reading the transcript.
            Err(err) if err.kind() != ErrorKind::BrokenPipe => return Err(err.into()),
            _ => {}
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OracleError::Failed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|err| OracleError::BadOutput(format!("stdout is not UTF-8: {}", err)))?;
        let rows = parse_table(&stdout).map_err(|err| OracleError::BadOutput(err.to_string()))?;
        debug!(program = %self.program, rows = rows.len(), "command oracle answered");
        Ok(rows.iter().map(|row| row.to_candidate()).collect())
    }
}
