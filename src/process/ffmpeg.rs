//! # ffmpeg-backed capture processes.
//!
//! [`Invocation`] fixes the command line every stream is captured with:
//!
//! ```text
//! ffmpeg -rtsp_transport tcp          reliable transport for the input
//!        -i <source_url>
//!        -an                          audio disabled
//!        -c:v copy                    video passthrough, no re-encode
//!        -f segment
//!        -segment_time <secs>         time-based rotation
//!        -reset_timestamps 1          timestamps restart per segment
//!        -strftime 1                  wall-clock file names
//!        <output_dir>/<id>_%Y-%m-%d-%H-%M.<ext>
//! ```
//!
//! [`FfmpegLauncher`] spawns it with `tokio::process`, merging stdout and stderr
//! into [`ProcessEvent::Output`] lines. ffmpeg redraws its progress line with
//! `\r`, so both `\r` and `\n` terminate a line: every progress update counts as
//! liveness. Output with no terminator is delivered in `MAX_LINE` chunks.

use std::ffi::OsString;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio_util::bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, FramedRead};

use crate::config::{CaptureSettings, StreamDefinition};
use crate::error::ProcessError;
use crate::process::launcher::{CaptureProcess, Launcher, ProcessEvent};

/// strftime pattern embedded in segment file names.
pub const SEGMENT_TIME_FORMAT: &str = "%Y-%m-%d-%H-%M";

/// The fixed capture command line, parameterized per stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    output_dir: PathBuf,
    extension: String,
    segment_duration: Duration,
}

impl Invocation {
    /// Builds the invocation from capture settings and the segment length.
    pub fn new(capture: &CaptureSettings, segment_duration: Duration) -> Self {
        Self {
            program: capture.program.clone(),
            output_dir: capture.output_dir.clone(),
            extension: capture.segment_extension.clone(),
            segment_duration,
        }
    }

    /// Output path pattern handed to the tool (strftime placeholders intact).
    pub fn output_pattern(&self, stream: &StreamDefinition) -> PathBuf {
        self.output_dir
            .join(format!("{}_{SEGMENT_TIME_FORMAT}.{}", stream.id, self.extension))
    }

    /// The file a segment starting at `at` will be written to.
    pub fn segment_path_at<Tz>(&self, stream: &StreamDefinition, at: &DateTime<Tz>) -> PathBuf
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        self.output_dir.join(format!(
            "{}_{}.{}",
            stream.id,
            at.format(SEGMENT_TIME_FORMAT),
            self.extension
        ))
    }

    /// Full argument vector (without the program).
    pub fn args(&self, stream: &StreamDefinition) -> Vec<OsString> {
        let segment_secs = self.segment_duration.as_secs().max(1).to_string();
        let mut args: Vec<OsString> = [
            "-rtsp_transport",
            "tcp",
            "-i",
            stream.source_url.as_str(),
            "-an",
            "-c:v",
            "copy",
            "-f",
            "segment",
            "-segment_time",
            segment_secs.as_str(),
            "-reset_timestamps",
            "1",
            "-strftime",
            "1",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(self.output_pattern(stream).into_os_string());
        args
    }

    fn command(&self, stream: &StreamDefinition) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args(stream))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Spawns real capture processes.
#[derive(Clone, Debug)]
pub struct FfmpegLauncher {
    invocation: Invocation,
}

impl FfmpegLauncher {
    /// Creates a launcher for the given invocation.
    pub fn new(invocation: Invocation) -> Self {
        Self { invocation }
    }

    /// The invocation used for every launch.
    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }
}

#[async_trait]
impl Launcher for FfmpegLauncher {
    async fn launch(
        &self,
        stream: &StreamDefinition,
    ) -> Result<Box<dyn CaptureProcess>, ProcessError> {
        let mut child = self
            .invocation
            .command(stream)
            .spawn()
            .map_err(|source| ProcessError::Spawn { source })?;

        let first_segment = self.invocation.segment_path_at(stream, &Local::now());
        tracing::debug!(
            stream = %stream.id,
            pid = ?child.id(),
            first_segment = %first_segment.display(),
            "capture process spawned"
        );

        let stdout = child.stdout.take().map(line_reader);
        let stderr = child.stderr.take().map(line_reader);
        Ok(Box::new(FfmpegProcess {
            child,
            stdout,
            stderr,
            first_segment,
            reaped: false,
        }))
    }
}

/// A spawned ffmpeg child with its output pipes.
struct FfmpegProcess {
    child: Child,
    stdout: Option<LineReader<ChildStdout>>,
    stderr: Option<LineReader<ChildStderr>>,
    first_segment: PathBuf,
    reaped: bool,
}

#[async_trait]
impl CaptureProcess for FfmpegProcess {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn first_segment(&self) -> Option<&Path> {
        Some(&self.first_segment)
    }

    async fn next_event(&mut self) -> Result<ProcessEvent, ProcessError> {
        loop {
            // Output first, so lines printed right before the exit are not lost.
            tokio::select! {
                biased;
                line = next_line(&mut self.stderr) => match line {
                    Ok(Some(line)) => return Ok(ProcessEvent::Output(line)),
                    Ok(None) => self.stderr = None,
                    Err(source) => return Err(ProcessError::Io { source }),
                },
                line = next_line(&mut self.stdout) => match line {
                    Ok(Some(line)) => return Ok(ProcessEvent::Output(line)),
                    Ok(None) => self.stdout = None,
                    Err(source) => return Err(ProcessError::Io { source }),
                },
                status = self.child.wait() => {
                    let status = status.map_err(|source| ProcessError::Io { source })?;
                    self.reaped = true;
                    return Ok(ProcessEvent::Exited(status.into()));
                }
            }
        }
    }

    async fn kill(&mut self) {
        if self.reaped {
            return;
        }
        if let Err(err) = self.child.kill().await {
            tracing::debug!(pid = ?self.child.id(), %err, "kill failed");
        }
        self.reaped = true;
    }
}

/// Longest line delivered in one piece; longer runs are cut into chunks.
pub(crate) const MAX_LINE: usize = 64 * 1024;

type LineReader<R> = FramedRead<R, OutputCodec>;

fn line_reader<R: AsyncRead>(inner: R) -> LineReader<R> {
    FramedRead::new(inner, OutputCodec)
}

/// Reads the next line, or never resolves when the pipe is gone.
async fn next_line<R>(reader: &mut Option<LineReader<R>>) -> std::io::Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    match reader {
        Some(reader) => reader.next().await.transpose(),
        None => std::future::pending().await,
    }
}

/// Splits output on `\r` and `\n`, decoding lossily.
///
/// A run of [`MAX_LINE`] bytes without a terminator is emitted as a line of its
/// own, so the buffer stays bounded and undelimited output still counts as
/// activity.
#[derive(Debug, Default)]
struct OutputCodec;

impl Decoder for OutputCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        loop {
            let window = buf.len().min(MAX_LINE);
            match buf[..window].iter().position(|b| *b == b'\n' || *b == b'\r') {
                // `\r\n` and blank lines carry nothing.
                Some(0) => buf.advance(1),
                Some(end) => {
                    let line = buf.split_to(end);
                    buf.advance(1);
                    return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
                }
                None if buf.len() >= MAX_LINE => {
                    let chunk = buf.split_to(MAX_LINE);
                    return Ok(Some(String::from_utf8_lossy(&chunk).into_owned()));
                }
                None => return Ok(None),
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        let rest = buf.split_to(buf.len());
        Ok(Some(String::from_utf8_lossy(&rest).into_owned()))
    }
}
