use std::path::{Path, PathBuf};
use std::time::Duration;

use lentolux_core::models::MediaKind;
use lentolux_core::Config;
use tokio::fs;
use uuid::Uuid;

#[cfg(feature = "image")]
use crate::image::{decode_image, TextWatermark, WatermarkStyle};
#[cfg(feature = "video")]
use crate::video::VideoWatermarker;
use crate::error::{ProcessingError, ProcessingResult};
use crate::fonts::resolve_font_path;

const MAX_EXTENSION_LEN: usize = 10;
const DEFAULT_VIDEO_EXTENSION: &str = "mp4";

#[derive(Debug, Clone)]
pub struct MediaProcessorConfig {
    pub upload_dir: PathBuf,
    pub font_path: Option<String>,
    pub ffmpeg_path: String,
    pub video_timeout: Duration,
    pub keep_original: bool,
}

impl MediaProcessorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            upload_dir: PathBuf::from(config.upload_dir()),
            font_path: config.font_path().map(str::to_string),
            ffmpeg_path: config.ffmpeg_path().to_string(),
            video_timeout: Duration::from_secs(config.video_watermark_timeout_secs()),
            keep_original: config.keep_original_uploads(),
        }
    }
}

/// Result of processing one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedMedia {
    /// Where the raw upload was written. Removed after watermarking unless originals are kept.
    pub raw_path: PathBuf,
    /// Final artifact handed to the archive
    pub artifact_path: PathBuf,
    pub media_kind: MediaKind,
}

/// Lowercased alphanumeric extension of the client filename, if it has a usable one
pub fn sanitize_extension(original_filename: &str) -> Option<String> {
    let ext = Path::new(original_filename).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > MAX_EXTENSION_LEN || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// `{id}.{ext}`, or just `{id}` without a usable extension
pub fn raw_filename(id: Uuid, extension: Option<&str>) -> String {
    match extension {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}

/// Persists uploads and produces watermarked artifacts
pub struct MediaProcessor {
    config: MediaProcessorConfig,
    #[cfg(feature = "image")]
    image_watermark: Option<TextWatermark>,
    #[cfg(feature = "video")]
    video_watermark: VideoWatermarker,
}

impl MediaProcessor {
    pub fn new(config: MediaProcessorConfig) -> Self {
        let font_path = resolve_font_path(config.font_path.as_deref());
        if font_path.is_none() {
            tracing::warn!("No watermark font found; image and video uploads will be rejected or unstyled");
        }

        #[cfg(feature = "image")]
        let image_watermark = font_path.as_deref().and_then(|path| {
            TextWatermark::from_font_file(path, WatermarkStyle::default())
                .map_err(|e| tracing::warn!(error = %e, "Failed to load watermark font"))
                .ok()
        });

        #[cfg(feature = "video")]
        let video_watermark =
            VideoWatermarker::new(config.ffmpeg_path.clone(), font_path.clone(), config.video_timeout);

        Self {
            config,
            #[cfg(feature = "image")]
            image_watermark,
            #[cfg(feature = "video")]
            video_watermark,
        }
    }

    pub fn config(&self) -> &MediaProcessorConfig {
        &self.config
    }

    /// Write the raw upload under a fresh UUID name, then watermark it according
    /// to the declared MIME type. Anything neither image nor video is kept as is.
    ///
    /// On failure every file this call created is removed.
    #[tracing::instrument(skip(self, data), fields(size_bytes = data.len()))]
    pub async fn process(
        &self,
        original_filename: &str,
        declared_mime: &str,
        data: &[u8],
    ) -> ProcessingResult<ProcessedMedia> {
        let media_kind = MediaKind::from_mime(declared_mime);
        let extension = sanitize_extension(original_filename);
        let id = Uuid::new_v4();

        fs::create_dir_all(&self.config.upload_dir).await?;
        let raw_path = self
            .config
            .upload_dir
            .join(raw_filename(id, extension.as_deref()));
        fs::write(&raw_path, data).await?;

        let artifact_path = match media_kind {
            MediaKind::Image => self.config.upload_dir.join(format!("{}_watermarked.png", id)),
            MediaKind::Video => self.config.upload_dir.join(format!(
                "{}_watermarked.{}",
                id,
                extension.as_deref().unwrap_or(DEFAULT_VIDEO_EXTENSION)
            )),
            _ => {
                tracing::info!(path = %raw_path.display(), "Stored upload without watermark");
                return Ok(ProcessedMedia {
                    artifact_path: raw_path.clone(),
                    raw_path,
                    media_kind,
                });
            }
        };

        let result = match media_kind {
            MediaKind::Image => self.watermark_image(data, &artifact_path).await,
            _ => self.watermark_video(&raw_path, &artifact_path).await,
        };

        if let Err(err) = result {
            tracing::warn!(error = %err, media_kind = media_kind.as_str(), "Watermarking failed");
            remove_file_if_exists(&artifact_path).await;
            remove_file_if_exists(&raw_path).await;
            return Err(err);
        }

        if !self.config.keep_original {
            remove_file_if_exists(&raw_path).await;
        }

        tracing::info!(
            artifact = %artifact_path.display(),
            media_kind = media_kind.as_str(),
            "Upload watermarked"
        );

        Ok(ProcessedMedia {
            raw_path,
            artifact_path,
            media_kind,
        })
    }

    /// Remove everything `process` left on disk. Missing files are ignored.
    pub async fn remove_artifacts(&self, media: &ProcessedMedia) {
        remove_file_if_exists(&media.artifact_path).await;
        if media.raw_path != media.artifact_path {
            remove_file_if_exists(&media.raw_path).await;
        }
    }

    #[cfg(feature = "image")]
    async fn watermark_image(&self, data: &[u8], output: &Path) -> ProcessingResult<()> {
        // Decode before looking at the font so bad uploads report as decode errors
        let watermark = self.image_watermark.clone();
        let data = data.to_vec();
        let output = output.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let img = decode_image(&data)?;
            let watermark = watermark.ok_or_else(|| {
                ProcessingError::FontUnavailable("no usable watermark font configured".to_string())
            })?;
            watermark.write_png(img, &output)
        })
        .await
        .map_err(|e| ProcessingError::Task(e.to_string()))??;
        Ok(())
    }

    #[cfg(not(feature = "image"))]
    async fn watermark_image(&self, _data: &[u8], _output: &Path) -> ProcessingResult<()> {
        Err(ProcessingError::Decode(
            "image support not enabled (image feature not enabled)".to_string(),
        ))
    }

    #[cfg(feature = "video")]
    async fn watermark_video(&self, input: &Path, output: &Path) -> ProcessingResult<()> {
        self.video_watermark.apply(input, output).await
    }

    #[cfg(not(feature = "video"))]
    async fn watermark_video(&self, _input: &Path, _output: &Path) -> ProcessingResult<()> {
        Err(ProcessingError::Ffmpeg(
            "video support not enabled (video feature not enabled)".to_string(),
        ))
    }
}

async fn remove_file_if_exists(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove file"),
    }
}
