use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::error::{ProcessingError, ProcessingResult};

const FONT_SIZE: u32 = 12;
const MARGIN_PX: u32 = 10;
const MAX_STDERR_CHARS: usize = 500;

/// Escape a value for use inside a single-quoted drawtext option
fn escape_drawtext(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | '\'' | ':' | '%' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Burns a text watermark into the bottom-right corner of a video for its
/// full duration. Audio streams are copied untouched.
#[derive(Debug, Clone)]
pub struct VideoWatermarker {
    ffmpeg_path: String,
    font_path: Option<PathBuf>,
    text: String,
    timeout: Duration,
}

impl VideoWatermarker {
    pub fn new(ffmpeg_path: impl Into<String>, font_path: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            font_path,
            text: crate::WATERMARK_TEXT.to_string(),
            timeout,
        }
    }

    /// drawtext filter placing the text bottom-right with a fixed margin
    pub fn filter(&self) -> String {
        let mut filter = String::from("drawtext=");
        if let Some(font) = &self.font_path {
            filter.push_str(&format!(
                "fontfile='{}':",
                escape_drawtext(&font.to_string_lossy())
            ));
        }
        filter.push_str(&format!(
            "text='{}':fontcolor=gray@0.5:fontsize={}:x=w-tw-{}:y=h-th-{}",
            escape_drawtext(&self.text),
            FONT_SIZE,
            MARGIN_PX,
            MARGIN_PX
        ));
        filter
    }

    pub fn build_args(&self, input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-nostdin".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vf".to_string(),
            self.filter(),
            "-c:a".to_string(),
            "copy".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }

    /// Run ffmpeg. The child is killed if the timeout elapses.
    #[tracing::instrument(skip(self), fields(ffmpeg = %self.ffmpeg_path))]
    pub async fn apply(&self, input: &Path, output: &Path) -> ProcessingResult<()> {
        let start = Instant::now();
        let args = self.build_args(input, output);

        let child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let result = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| ProcessingError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| ProcessingError::Ffmpeg(format!("Failed to run FFmpeg: {}", e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: String = stderr
                .chars()
                .rev()
                .take(MAX_STDERR_CHARS)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            return Err(ProcessingError::Ffmpeg(format!(
                "exit status {}: {}",
                result.status, tail
            )));
        }

        tracing::info!(
            output = %output.display(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Video watermarked"
        );
        Ok(())
    }
}
