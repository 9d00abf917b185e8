use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use reqwest::multipart::{Form, Part};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::ReaderStream;
use tracing::debug;

use super::error::Result;
use super::progress::ProgressSink;

/// Form field the portal expects the track file under
pub const FIELD_NAME: &str = "body";

/// Media type of the track part
pub const TRACK_MIME: &str = "application/octet-stream";

// Read size for each body chunk (8 KiB)
pub const CHUNK_SIZE: usize = 8 * 1024;

/// A local track file that passed the existence check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackFile {
    path: PathBuf,
    file_name: String,
    len: u64,
}

impl TrackFile {
    /// Check that `path` is a readable regular file
    ///
    /// Returns `None` when the file is missing, is a directory, or cannot be
    /// opened. The handle used for the check is closed before returning.
    pub async fn probe(path: &Path) -> Option<Self> {
        let file = File::open(path).await.ok()?;
        let metadata = file.metadata().await.ok()?;
        if !metadata.is_file() {
            return None;
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "track.bin".to_string());

        Some(Self {
            path: path.to_path_buf(),
            file_name,
            len: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Size seen when the file was probed
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Build the multipart form for one upload attempt
///
/// The file is reopened for every attempt and streamed in [`CHUNK_SIZE`]
/// chunks; its content is never buffered as a whole. The part length is taken
/// from the freshly opened handle.
pub async fn encode_track(
    track: &TrackFile,
    progress: Option<Arc<dyn ProgressSink>>,
) -> Result<Form> {
    let file = File::open(track.path()).await?;
    let total = file.metadata().await?.len();

    debug!(
        "Encoding {} ({} bytes) as multipart field '{}'",
        track.file_name(),
        total,
        FIELD_NAME
    );

    let body = reqwest::Body::wrap_stream(progress_stream(file, total, progress));
    let part = Part::stream_with_length(body, total)
        .file_name(track.file_name().to_string())
        .mime_str(TRACK_MIME)?;

    Ok(Form::new().part(FIELD_NAME, part))
}

/// Stream the first `total` bytes of `reader` in chunks, reporting
/// `written / total` after each chunk
///
/// The stream never yields more than `total` bytes, so a file that grows
/// while it is being sent still matches the declared part length. Nothing is
/// reported when `total` is zero.
pub fn progress_stream<R>(
    reader: R,
    total: u64,
    progress: Option<Arc<dyn ProgressSink>>,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static
where
    R: AsyncRead + Send + 'static,
{
    let mut written = 0u64;

    ReaderStream::with_capacity(reader.take(total), CHUNK_SIZE).inspect_ok(move |chunk| {
        written += chunk.len() as u64;
        if total == 0 {
            return;
        }
        if let Some(sink) = &progress {
            sink.on_progress(fraction(written, total));
        }
    })
}

fn fraction(written: u64, total: u64) -> f32 {
    (written as f64 / total as f64).min(1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    fn recording_sink() -> (Arc<dyn ProgressSink>, Arc<Mutex<Vec<f32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let sink: Arc<dyn ProgressSink> =
            Arc::new(move |fraction: f32| captured.lock().unwrap().push(fraction));
        (sink, seen)
    }

    fn track_with(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_ends_at_one() {
        let content = vec![7u8; 3 * CHUNK_SIZE + 100];
        let file = track_with(&content);
        let (sink, seen) = recording_sink();

        let reader = File::open(file.path()).await.unwrap();
        let chunks: Vec<Bytes> = progress_stream(reader, content.len() as u64, Some(sink))
            .try_collect()
            .await
            .unwrap();

        let streamed: usize = chunks.iter().map(Bytes::len).sum();
        assert_eq!(streamed, content.len());
        assert!(chunks.iter().all(|c| c.len() <= CHUNK_SIZE));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), chunks.len());
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert!(seen.iter().all(|f| (0.0..=1.0).contains(f)));
        assert_eq!(*seen.last().unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_empty_file_never_reports_progress() {
        let file = track_with(b"");
        let (sink, seen) = recording_sink();

        let reader = File::open(file.path()).await.unwrap();
        let chunks: Vec<Bytes> = progress_stream(reader, 0, Some(sink))
            .try_collect()
            .await
            .unwrap();

        assert!(chunks.is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stream_without_sink() {
        let reader: &'static [u8] = b"hello track";
        let chunks: Vec<Bytes> = progress_stream(reader, 11, None)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(chunks.concat(), b"hello track");
    }

    #[tokio::test]
    async fn test_stream_stops_at_declared_length() {
        let content = vec![1u8; 2 * CHUNK_SIZE];
        let file = track_with(&content);
        let (sink, seen) = recording_sink();

        // File grows after its size was taken
        let reader = File::open(file.path()).await.unwrap();
        let mut appender = std::fs::OpenOptions::new()
            .append(true)
            .open(file.path())
            .unwrap();
        appender.write_all(&[2u8; CHUNK_SIZE]).unwrap();
        appender.flush().unwrap();

        let chunks: Vec<Bytes> = progress_stream(reader, content.len() as u64, Some(sink))
            .try_collect()
            .await
            .unwrap();

        assert_eq!(chunks.concat(), content);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.iter().filter(|f| **f == 1.0).count(), 1);
        assert_eq!(*seen.last().unwrap(), 1.0);
    }

    #[test]
    fn test_fraction_is_clamped() {
        assert_eq!(fraction(5, 10), 0.5);
        assert_eq!(fraction(10, 10), 1.0);
        assert_eq!(fraction(12, 10), 1.0);
    }

    #[tokio::test]
    async fn test_probe_existing_file() {
        let file = track_with(b"abc");
        let track = TrackFile::probe(file.path()).await.unwrap();

        assert_eq!(track.len(), 3);
        assert!(!track.is_empty());
        assert_eq!(
            track.file_name(),
            file.path().file_name().unwrap().to_string_lossy()
        );
    }

    #[tokio::test]
    async fn test_probe_rejects_missing_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TrackFile::probe(&dir.path().join("missing.bin")).await.is_none());
        assert!(TrackFile::probe(dir.path()).await.is_none());
    }

    #[tokio::test]
    async fn test_encode_empty_track() {
        let file = track_with(b"");
        let track = TrackFile::probe(file.path()).await.unwrap();
        let (sink, seen) = recording_sink();

        let form = encode_track(&track, Some(sink)).await;

        assert!(form.is_ok());
        assert!(track.is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }
}
