use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use askmom_api::BoxFuture;
use image::ImageReader;
use image::codecs::jpeg::JpegEncoder;
use snafu::{ResultExt, ensure};

use crate::error::{
    CreateSnafu, DecodeSnafu, EncodeSnafu, LimitReachedSnafu, NotLocalSnafu, PermissionDeniedSnafu,
    PickError, PickerSnafu, ReadSnafu, TranscodeError, WorkerSnafu,
};
use crate::turn::ImageRef;

/// Upper bound on images staged for one turn.
pub const MAX_IMAGES: usize = 5;

/// Encodings the backend accepts without conversion.
pub const COMPATIBLE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

const CONVERTED_SUFFIX: &str = "-converted.jpg";
const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    Cancelled,
    Picked(Vec<String>),
}

/// Device photo library: permission prompt plus a bounded multi-select picker.
pub trait PhotoLibrary: Send + Sync {
    /// Resolves to `true` when access is granted.
    fn request_permission<'a>(&'a self) -> BoxFuture<'a, Result<bool, PickError>>;

    fn pick<'a>(&'a self, limit: usize) -> BoxFuture<'a, Result<PickOutcome, PickError>>;
}

pub trait ImageTranscoder: Send + Sync {
    fn is_compatible(&self, uri: &str) -> bool {
        extension(uri).is_some_and(|ext| COMPATIBLE_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Re-encodes `uri` to JPEG and returns the converted handle.
    fn transcode<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<String, TranscodeError>>;
}

/// Lower-cased extension of the last path segment, ignoring query and fragment.
pub fn extension(uri: &str) -> Option<String> {
    let path = uri.split(['?', '#']).next().unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();
    let (stem, ext) = segment.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then(|| ext.to_ascii_lowercase())
}

fn local_path(uri: &str) -> Option<PathBuf> {
    if let Some(path) = uri.strip_prefix("file://") {
        return Some(PathBuf::from(path));
    }
    (!uri.contains("://")).then(|| PathBuf::from(uri))
}

fn converted_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    source.with_file_name(format!("{stem}{CONVERTED_SUFFIX}"))
}

/// Decodes with the `image` crate (format sniffed from content) and writes
/// `<stem>-converted.jpg` beside the source.
#[derive(Debug, Clone, Copy)]
pub struct ImageCrateTranscoder {
    quality: u8,
}

impl Default for ImageCrateTranscoder {
    fn default() -> Self {
        Self {
            quality: JPEG_QUALITY,
        }
    }
}

impl ImageCrateTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    async fn transcode_inner(&self, uri: &str) -> Result<String, TranscodeError> {
        let source = local_path(uri).ok_or_else(|| {
            NotLocalSnafu {
                stage: "transcode-resolve",
                uri: uri.to_string(),
            }
            .build()
        })?;
        let quality = self.quality;
        let owned_uri = uri.to_string();

        tokio::task::spawn_blocking(move || encode_jpeg(&owned_uri, &source, quality))
            .await
            .context(WorkerSnafu {
                stage: "transcode-join",
                uri: uri.to_string(),
            })?
    }
}

fn encode_jpeg(uri: &str, source: &Path, quality: u8) -> Result<String, TranscodeError> {
    let decoded = ImageReader::open(source)
        .and_then(|reader| reader.with_guessed_format())
        .context(ReadSnafu {
            stage: "transcode-open",
            uri,
        })?
        .decode()
        .context(DecodeSnafu {
            stage: "transcode-decode",
            uri,
        })?;

    // JPEG has no alpha channel.
    let rgb = decoded.to_rgb8();
    let output = converted_path(source);
    let path = output.display().to_string();

    let file = std::fs::File::create(&output).context(CreateSnafu {
        stage: "transcode-create",
        path: path.clone(),
    })?;
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, quality)
        .encode_image(&rgb)
        .context(EncodeSnafu {
            stage: "transcode-encode",
            path: path.clone(),
        })?;
    writer.flush().context(CreateSnafu {
        stage: "transcode-flush",
        path: path.clone(),
    })?;

    Ok(path)
}

impl ImageTranscoder for ImageCrateTranscoder {
    fn transcode<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<String, TranscodeError>> {
        Box::pin(self.transcode_inner(uri))
    }
}

/// Picks from a fixed list of local files; missing files are skipped.
#[derive(Debug, Clone, Default)]
pub struct PathPhotoLibrary {
    paths: Vec<PathBuf>,
}

impl PathPhotoLibrary {
    pub fn new(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    async fn pick_inner(&self, limit: usize) -> Result<PickOutcome, PickError> {
        if self.paths.is_empty() {
            return Ok(PickOutcome::Cancelled);
        }

        let mut picked = Vec::new();
        let mut last_failure = None;
        for path in &self.paths {
            if picked.len() >= limit {
                break;
            }
            match tokio::fs::metadata(path).await {
                Ok(metadata) if metadata.is_file() => picked.push(path.display().to_string()),
                Ok(_) => {
                    tracing::warn!(path = %path.display(), "skipping non-file selection");
                    last_failure = Some(format!("{} is not a file", path.display()));
                }
                Err(error) => {
                    tracing::warn!(path = %path.display(), error = %error, "skipping unreadable selection");
                    last_failure = Some(format!("{}: {error}", path.display()));
                }
            }
        }

        // Every selection was unusable.
        if picked.is_empty() {
            return PickerSnafu {
                stage: "pick-path",
                message: last_failure.unwrap_or_default(),
            }
            .fail();
        }
        Ok(PickOutcome::Picked(picked))
    }
}

impl PhotoLibrary for PathPhotoLibrary {
    fn request_permission<'a>(&'a self) -> BoxFuture<'a, Result<bool, PickError>> {
        Box::pin(async { Ok(true) })
    }

    fn pick<'a>(&'a self, limit: usize) -> BoxFuture<'a, Result<PickOutcome, PickError>> {
        Box::pin(self.pick_inner(limit))
    }
}

/// Composer staging area for images not yet sent.
#[derive(Debug, Clone, Default)]
pub struct ImageAttachmentPipeline {
    staged: Vec<ImageRef>,
}

impl ImageAttachmentPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn staged(&self) -> &[ImageRef] {
        &self.staged
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub fn remaining(&self) -> usize {
        MAX_IMAGES.saturating_sub(self.staged.len())
    }

    /// Runs permission, picker and normalization, then stages the result.
    ///
    /// Returns how many images were added. A cancelled picker adds none.
    pub async fn pick(
        &mut self,
        library: &dyn PhotoLibrary,
        transcoder: &dyn ImageTranscoder,
    ) -> Result<usize, PickError> {
        let remaining = self.remaining();
        ensure!(
            remaining > 0,
            LimitReachedSnafu {
                stage: "pick-limit",
                max: MAX_IMAGES,
            }
        );

        let granted = library.request_permission().await?;
        ensure!(
            granted,
            PermissionDeniedSnafu {
                stage: "pick-permission",
            }
        );

        let uris = match library.pick(remaining).await? {
            PickOutcome::Cancelled => {
                tracing::debug!("photo picker cancelled");
                return Ok(0);
            }
            PickOutcome::Picked(uris) => uris,
        };

        let mut normalized = Vec::with_capacity(uris.len());
        for uri in uris {
            normalized.push(normalize(transcoder, uri).await);
        }

        Ok(self.stage(normalized))
    }

    /// Stages uris as loading placeholders. Duplicates and overflow are dropped.
    pub fn stage(&mut self, uris: impl IntoIterator<Item = String>) -> usize {
        let mut added = 0;
        for uri in uris {
            if self.staged.len() >= MAX_IMAGES {
                break;
            }
            if self.staged.iter().any(|image| image.uri == uri) {
                continue;
            }
            self.staged.push(ImageRef::placeholder(uri));
            added += 1;
        }
        added
    }

    /// Flags a staged image as decoded. Returns `false` for unknown uris.
    pub fn mark_loaded(&mut self, uri: &str) -> bool {
        let Some(image) = self.staged.iter_mut().find(|image| image.uri == uri) else {
            return false;
        };
        image.loading = false;
        true
    }

    pub fn remove(&mut self, uri: &str) -> bool {
        let before = self.staged.len();
        self.staged.retain(|image| image.uri != uri);
        before != self.staged.len()
    }

    pub fn snapshot_and_clear(&mut self) -> Vec<ImageRef> {
        std::mem::take(&mut self.staged)
    }

    pub fn clear(&mut self) {
        self.staged.clear();
    }
}

async fn normalize(transcoder: &dyn ImageTranscoder, uri: String) -> String {
    if transcoder.is_compatible(&uri) {
        return uri;
    }

    match transcoder.transcode(&uri).await {
        Ok(converted) => {
            tracing::debug!(uri = %uri, converted = %converted, "re-encoded image to jpeg");
            converted
        }
        Err(error) => {
            tracing::warn!(uri = %uri, error = %error, "image re-encode failed, staging original");
            uri
        }
    }
}
