use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::models::audio_models::AudioFormat;
use crate::models::error::CaptureError;
use crate::processing::wav_format::{self, WAV_HEADER_SIZE};

/// Write-through WAV file writer for a single growing capture.
///
/// ## File Format
///
/// ```text
/// [44-byte WAV header]
/// [raw little-endian PCM data, in append order...]
/// ```
///
/// The header carries placeholder sizes until it is rewritten, either
/// periodically (see [`StreamingEncoder::with_header_refresh`]) or by
/// [`StreamingEncoder::finalize`]. Chunks go straight to the file handle, so
/// memory use does not grow with recording length.
///
/// A finalized encoder can be reopened on the same path; it then continues
/// appending after the existing data instead of truncating.
#[derive(Debug)]
pub struct StreamingEncoder {
    file_path: PathBuf,
    format: AudioFormat,
    file: Option<File>,
    data_bytes: u64,
    bytes_since_header: u64,
    header_refresh_bytes: Option<u64>,
}

impl StreamingEncoder {
    /// Create (or truncate) `file_path` and write the initial header.
    pub fn create(file_path: impl Into<PathBuf>, format: AudioFormat) -> Result<Self, CaptureError> {
        let file_path = file_path.into();
        let file = File::create(&file_path).map_err(|e| {
            CaptureError::Io(format!("failed to create {}: {}", file_path.display(), e))
        })?;
        Self::from_file(file_path, file, format)
    }

    /// Take over a freshly created, empty `file` at `file_path` and write
    /// the initial header.
    pub fn from_file(
        file_path: impl Into<PathBuf>,
        mut file: File,
        format: AudioFormat,
    ) -> Result<Self, CaptureError> {
        let file_path = file_path.into();
        file.write_all(&wav_format::generate_wav_header(&format, 0))
            .map_err(|e| CaptureError::Io(format!("failed to write header: {}", e)))?;

        log::debug!("Created capture file {}", file_path.display());
        Ok(Self {
            file_path,
            format,
            file: Some(file),
            data_bytes: 0,
            bytes_since_header: 0,
            header_refresh_bytes: None,
        })
    }

    /// Open an existing WAV written in `format` and continue after its data.
    ///
    /// The data length is taken from the physical file length, so a file
    /// whose header was never finalized is still extended correctly.
    pub fn append_to(file_path: impl Into<PathBuf>, format: AudioFormat) -> Result<Self, CaptureError> {
        let file_path = file_path.into();
        let (file, data_bytes) = open_for_append(&file_path, &format)?;

        log::debug!(
            "Reopened capture file {} at {} data bytes",
            file_path.display(),
            data_bytes
        );
        Ok(Self {
            file_path,
            format,
            file: Some(file),
            data_bytes,
            bytes_since_header: 0,
            header_refresh_bytes: None,
        })
    }

    /// Rewrite the header every `bytes` of appended data.
    pub fn with_header_refresh(mut self, bytes: Option<u64>) -> Self {
        self.header_refresh_bytes = bytes.filter(|&b| b > 0);
        self
    }

    /// Reopen a finalized encoder on its own file in append mode.
    /// No-op while already open.
    pub fn reopen(&mut self) -> Result<(), CaptureError> {
        if self.file.is_some() {
            return Ok(());
        }
        let (file, data_bytes) = open_for_append(&self.file_path, &self.format)?;
        self.file = Some(file);
        self.data_bytes = data_bytes;
        self.bytes_since_header = 0;
        Ok(())
    }

    /// Write `chunk` verbatim after the data already in the file.
    pub fn append(&mut self, chunk: &[u8]) -> Result<(), CaptureError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::Io("encoder is not open".into()))?;
        file.write_all(chunk)
            .map_err(|e| CaptureError::Io(format!("write failed: {}", e)))?;

        self.data_bytes += chunk.len() as u64;
        self.bytes_since_header += chunk.len() as u64;

        if let Some(interval) = self.header_refresh_bytes {
            if self.bytes_since_header >= interval {
                self.rewrite_header()?;
            }
        }
        Ok(())
    }

    /// Flush, write the final header and close the file.
    ///
    /// Returns the finalized file length. Calling it on a closed encoder
    /// reports the current file length (0 if missing) and does nothing else.
    pub fn finalize(&mut self) -> Result<u64, CaptureError> {
        if self.file.is_none() {
            return Ok(file_len(&self.file_path));
        }

        let result = self.rewrite_header().and_then(|()| {
            let file = self
                .file
                .as_mut()
                .ok_or_else(|| CaptureError::Io("encoder is not open".into()))?;
            file.flush()
                .and_then(|()| file.sync_all())
                .map_err(|e| CaptureError::Io(format!("flush failed: {}", e)))
        });
        // The handle is released even if the final header could not be written.
        self.file = None;
        result?;

        let size = file_len(&self.file_path);
        log::debug!(
            "Finalized {} ({} data bytes, {} bytes on disk)",
            self.file_path.display(),
            self.data_bytes,
            size
        );
        Ok(size)
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// PCM bytes in the file, excluding the header.
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn rewrite_header(&mut self) -> Result<(), CaptureError> {
        let header = wav_format::generate_wav_header(&self.format, self.data_bytes);
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::Io("encoder is not open".into()))?;

        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.write_all(&header))
            .and_then(|()| file.seek(SeekFrom::End(0)))
            .map_err(|e| CaptureError::Io(format!("failed to rewrite header: {}", e)))?;

        self.bytes_since_header = 0;
        Ok(())
    }
}

impl Drop for StreamingEncoder {
    fn drop(&mut self) {
        if self.file.is_some() {
            if let Err(e) = self.finalize() {
                log::warn!(
                    "Failed to finalize {} on drop: {}",
                    self.file_path.display(),
                    e
                );
            }
        }
    }
}

/// Open `path` read/write (not `append`, which would forbid header rewrites),
/// check its header against `format` and position at the end.
fn open_for_append(path: &Path, format: &AudioFormat) -> Result<(File, u64), CaptureError> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| CaptureError::Io(format!("failed to open {}: {}", path.display(), e)))?;

    let mut header = [0u8; WAV_HEADER_SIZE];
    file.read_exact(&mut header)
        .map_err(|e| CaptureError::EncodingFailed(format!("failed to read header: {}", e)))?;
    let parsed = wav_format::parse_wav_header(&header)?;
    if parsed.format != *format {
        return Err(CaptureError::EncodingFailed(format!(
            "format mismatch: file is {:?}, expected {:?}",
            parsed.format, format
        )));
    }

    let end = file
        .seek(SeekFrom::End(0))
        .map_err(|e| CaptureError::Io(format!("seek failed: {}", e)))?;
    Ok((file, end.saturating_sub(WAV_HEADER_SIZE as u64)))
}

fn file_len(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
