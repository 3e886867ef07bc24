use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::WallpaperConfig;
use crate::types::{PictureRecord, WallpaperTarget};

#[derive(Debug)]
pub struct WallpaperError {
    pub kind: WallpaperErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallpaperErrorKind {
    /// Download or filesystem failure.
    Io,
    /// The image could not be decoded, or decoding would exceed bounds.
    Decode,
    /// The surface command failed or is not configured.
    Apply,
}

impl WallpaperError {
    fn io(message: impl Into<String>) -> Self {
        Self {
            kind: WallpaperErrorKind::Io,
            message: message.into(),
        }
    }

    fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: WallpaperErrorKind::Decode,
            message: message.into(),
        }
    }

    fn apply(message: impl Into<String>) -> Self {
        Self {
            kind: WallpaperErrorKind::Apply,
            message: message.into(),
        }
    }
}

impl fmt::Display for WallpaperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Wallpaper error ({:?}): {}", self.kind, self.message)
    }
}

impl std::error::Error for WallpaperError {}

/// Download → bounded decode → apply, triggered directly from user
/// interaction and never from the scheduler. Failures are reported to the
/// caller as `false`; nothing is retried automatically.
pub struct WallpaperPipeline {
    client: Client,
    config: WallpaperConfig,
    /// Whole-pipeline runs are serialized; overlapping requests queue here.
    run_lock: Mutex<()>,
}

impl WallpaperPipeline {
    pub fn new(config: WallpaperConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            config,
            run_lock: Mutex::new(()),
        })
    }

    /// Apply the record's image to the requested surface(s).
    /// Never propagates an error: any I/O, decode, or command failure is
    /// logged and reported as `false`.
    pub async fn apply(&self, record: &PictureRecord, target: WallpaperTarget) -> bool {
        let _serialized = self.run_lock.lock().await;
        match self.apply_inner(record, target).await {
            Ok(()) => {
                info!(date = %record.date, target = %target, "Wallpaper applied");
                true
            }
            Err(e) => {
                warn!(date = %record.date, target = %target, "Wallpaper not applied: {}", e);
                false
            }
        }
    }

    async fn apply_inner(
        &self,
        record: &PictureRecord,
        target: WallpaperTarget,
    ) -> Result<(), WallpaperError> {
        let url = record
            .best_image_url()
            .ok_or_else(|| WallpaperError::io("record has no image URL"))?;

        let cache_dir = PathBuf::from(&self.config.cache_dir);
        tokio::fs::create_dir_all(&cache_dir)
            .await
            .map_err(|e| WallpaperError::io(format!("create cache dir: {}", e)))?;

        let raw_path = scratch_path(&cache_dir);
        let processed_path = processed_path(&cache_dir);

        let result = self
            .download_decode_apply(url, &raw_path, &processed_path, target)
            .await;

        // The raw download is scratch data either way; the processed file
        // must outlive us because the surface command references it by path.
        if let Err(e) = tokio::fs::remove_file(&raw_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!("Could not remove scratch file {}: {}", raw_path.display(), e);
            }
        }

        result
    }

    async fn download_decode_apply(
        &self,
        url: &str,
        raw_path: &Path,
        processed_path: &Path,
        target: WallpaperTarget,
    ) -> Result<(), WallpaperError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| WallpaperError::io(format!("download: {}", e)))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| WallpaperError::io(format!("download body: {}", e)))?;
        tokio::fs::write(raw_path, &bytes)
            .await
            .map_err(|e| WallpaperError::io(format!("write scratch file: {}", e)))?;

        let (raw, processed) = (raw_path.to_path_buf(), processed_path.to_path_buf());
        let (req_w, req_h) = (self.config.screen_width, self.config.screen_height);
        tokio::task::spawn_blocking(move || {
            let image = decode_bounded(&raw, req_w, req_h)?;
            image
                .to_rgb8()
                .save(&processed)
                .map_err(|e| WallpaperError::io(format!("write processed image: {}", e)))
        })
        .await
        .map_err(|e| WallpaperError::decode(format!("decode task panicked: {}", e)))??;

        for command in target_commands(&self.config, target) {
            run_surface_command(command, processed_path).await?;
        }
        Ok(())
    }
}

/// Fixed file names: each run overwrites the previous day's files, so the
/// cache directory never grows past one scratch and one processed image.
fn scratch_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("download.img")
}

fn processed_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("wallpaper.jpg")
}

fn target_commands(config: &WallpaperConfig, target: WallpaperTarget) -> Vec<&[String]> {
    match target {
        WallpaperTarget::Home => vec![config.home_command.as_slice()],
        WallpaperTarget::Lock => vec![config.lock_command.as_slice()],
        WallpaperTarget::Both => vec![
            config.home_command.as_slice(),
            config.lock_command.as_slice(),
        ],
    }
}

async fn run_surface_command(template: &[String], path: &Path) -> Result<(), WallpaperError> {
    let argv = substitute_path(template, path);
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| WallpaperError::apply("surface command not configured"))?;

    let status = tokio::process::Command::new(program)
        .args(args)
        .status()
        .await
        .map_err(|e| WallpaperError::apply(format!("spawn {}: {}", program, e)))?;
    if !status.success() {
        return Err(WallpaperError::apply(format!(
            "{} exited with {}",
            program, status
        )));
    }
    Ok(())
}

/// Replace every "{path}" placeholder with the processed file path.
fn substitute_path(template: &[String], path: &Path) -> Vec<String> {
    let path = path.to_string_lossy();
    template
        .iter()
        .map(|arg| arg.replace("{path}", &path))
        .collect()
}

/// Hard ceiling on source dimensions. Past this the full decode would
/// allocate more than we are willing to spend on a wallpaper.
const MAX_SOURCE_DIM: u32 = 16_384;

/// Two-pass bounded decode. The first pass reads only the dimensions and
/// rejects oversized sources; the second decodes under explicit allocation
/// limits and shrinks by the computed power-of-two factor, keeping both
/// dimensions at or above the requested bounds.
fn decode_bounded(path: &Path, req_w: u32, req_h: u32) -> Result<DynamicImage, WallpaperError> {
    let reader = ImageReader::open(path)
        .map_err(|e| WallpaperError::io(format!("open image: {}", e)))?
        .with_guessed_format()
        .map_err(|e| WallpaperError::io(format!("probe image format: {}", e)))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| WallpaperError::decode(format!("read dimensions: {}", e)))?;

    if !source_dims_ok(width, height) {
        return Err(WallpaperError::decode(format!(
            "source dimensions {}x{} outside supported range",
            width, height
        )));
    }

    let factor = sample_factor((width, height), (req_w, req_h));

    let mut reader = ImageReader::open(path)
        .map_err(|e| WallpaperError::io(format!("open image: {}", e)))?
        .with_guessed_format()
        .map_err(|e| WallpaperError::io(format!("probe image format: {}", e)))?;
    let mut limits = image::Limits::default();
    limits.max_image_width = Some(MAX_SOURCE_DIM);
    limits.max_image_height = Some(MAX_SOURCE_DIM);
    reader.limits(limits);
    let image = reader
        .decode()
        .map_err(|e| WallpaperError::decode(format!("decode image: {}", e)))?;

    if factor > 1 {
        Ok(image.resize_exact(width / factor, height / factor, FilterType::Triangle))
    } else {
        Ok(image)
    }
}

/// A claimed dimension of zero or beyond the ceiling means the file is
/// corrupt or hostile; either way we refuse to hand it to the full decoder.
fn source_dims_ok(width: u32, height: u32) -> bool {
    (1..=MAX_SOURCE_DIM).contains(&width) && (1..=MAX_SOURCE_DIM).contains(&height)
}

/// Largest power-of-two downsample factor such that both downsampled
/// dimensions stay at or above the requested dimensions.
pub fn sample_factor((width, height): (u32, u32), (req_w, req_h): (u32, u32)) -> u32 {
    let mut factor = 1;
    if (height > req_h || width > req_w) && req_w > 0 && req_h > 0 {
        let half_w = width / 2;
        let half_h = height / 2;
        while half_h / factor >= req_h && half_w / factor >= req_w {
            factor *= 2;
        }
    }
    factor
}
