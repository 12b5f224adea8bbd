//! Recording artifact value object

use std::fmt;
use std::path::{Path, PathBuf};

/// Supported audio MIME types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioMimeType {
    Ogg,
    Mp3,
    Wav,
    Webm,
    Mp4,
}

impl AudioMimeType {
    /// Get the MIME type string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ogg => "audio/ogg",
            Self::Mp3 => "audio/mp3",
            Self::Wav => "audio/wav",
            Self::Webm => "audio/webm",
            Self::Mp4 => "audio/mp4",
        }
    }

    /// Get the file extension
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Ogg => "ogg",
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Webm => "webm",
            Self::Mp4 => "mp4",
        }
    }

    /// Parse a MIME type string such as `audio/ogg`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "audio/ogg" => Some(Self::Ogg),
            "audio/mp3" | "audio/mpeg" => Some(Self::Mp3),
            "audio/wav" | "audio/x-wav" | "audio/wave" => Some(Self::Wav),
            "audio/webm" => Some(Self::Webm),
            "audio/mp4" => Some(Self::Mp4),
            _ => None,
        }
    }
}

impl fmt::Display for AudioMimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for AudioMimeType {
    fn default() -> Self {
        Self::Ogg
    }
}

/// Where the captured audio physically lives.
///
/// Backends that record through an external process hand back a temp file;
/// backends that capture in-process hand back the encoded bytes directly.
/// Consumers must handle both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactLocator {
    /// Audio persisted to a file on disk
    File(PathBuf),
    /// Audio held in memory
    Buffer(Vec<u8>),
}

/// Value object describing one finished recording.
///
/// Produced exactly once per capture, by a successful stop. Carries the
/// locator, the audible duration (pauses excluded), and the container type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    locator: ArtifactLocator,
    duration_millis: u64,
    mime_type: AudioMimeType,
}

impl Artifact {
    /// Create an artifact backed by a file on disk
    pub fn from_file(path: PathBuf, duration_millis: u64, mime_type: AudioMimeType) -> Self {
        Self {
            locator: ArtifactLocator::File(path),
            duration_millis,
            mime_type,
        }
    }

    /// Create an artifact backed by an in-memory buffer
    pub fn from_buffer(data: Vec<u8>, duration_millis: u64, mime_type: AudioMimeType) -> Self {
        Self {
            locator: ArtifactLocator::Buffer(data),
            duration_millis,
            mime_type,
        }
    }

    /// Get the locator
    pub fn locator(&self) -> &ArtifactLocator {
        &self.locator
    }

    /// Get the audible duration in milliseconds
    pub fn duration_millis(&self) -> u64 {
        self.duration_millis
    }

    /// Get the MIME type
    pub fn mime_type(&self) -> AudioMimeType {
        self.mime_type
    }

    /// Path on disk, if the artifact is file-backed
    pub fn path(&self) -> Option<&Path> {
        match &self.locator {
            ArtifactLocator::File(path) => Some(path.as_path()),
            ArtifactLocator::Buffer(_) => None,
        }
    }

    /// In-memory bytes, if the artifact is buffer-backed
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.locator {
            ArtifactLocator::File(_) => None,
            ArtifactLocator::Buffer(data) => Some(data.as_slice()),
        }
    }

    /// Size in bytes for buffer-backed artifacts, `None` for file-backed
    pub fn size_bytes(&self) -> Option<usize> {
        self.bytes().map(<[u8]>::len)
    }

    /// Human-readable duration, e.g. `1:05.3`
    pub fn human_readable_duration(&self) -> String {
        let total_secs = self.duration_millis / 1000;
        let tenths = (self.duration_millis % 1000) / 100;
        format!("{}:{:02}.{}", total_secs / 60, total_secs % 60, tenths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_type_as_str() {
        assert_eq!(AudioMimeType::Ogg.as_str(), "audio/ogg");
        assert_eq!(AudioMimeType::Wav.as_str(), "audio/wav");
        assert_eq!(AudioMimeType::Webm.as_str(), "audio/webm");
    }

    #[test]
    fn mime_type_extension() {
        assert_eq!(AudioMimeType::Ogg.extension(), "ogg");
        assert_eq!(AudioMimeType::Wav.extension(), "wav");
        assert_eq!(AudioMimeType::Mp4.extension(), "mp4");
    }

    #[test]
    fn mime_type_parse() {
        assert_eq!(AudioMimeType::parse("audio/ogg"), Some(AudioMimeType::Ogg));
        assert_eq!(AudioMimeType::parse("audio/mpeg"), Some(AudioMimeType::Mp3));
        assert_eq!(AudioMimeType::parse("AUDIO/WAV"), Some(AudioMimeType::Wav));
        assert_eq!(AudioMimeType::parse("text/plain"), None);
    }

    #[test]
    fn default_mime_type_is_ogg() {
        assert_eq!(AudioMimeType::default(), AudioMimeType::Ogg);
    }

    #[test]
    fn file_artifact_exposes_path_not_bytes() {
        let artifact = Artifact::from_file(
            PathBuf::from("/tmp/take.ogg"),
            1500,
            AudioMimeType::Ogg,
        );
        assert_eq!(artifact.path(), Some(Path::new("/tmp/take.ogg")));
        assert_eq!(artifact.bytes(), None);
        assert_eq!(artifact.duration_millis(), 1500);
    }

    #[test]
    fn buffer_artifact_exposes_bytes_not_path() {
        let artifact = Artifact::from_buffer(vec![1, 2, 3], 250, AudioMimeType::Wav);
        assert_eq!(artifact.bytes(), Some(&[1u8, 2, 3][..]));
        assert_eq!(artifact.path(), None);
        assert_eq!(artifact.size_bytes(), Some(3));
    }

    #[test]
    fn human_readable_duration_formats_minutes() {
        let artifact = Artifact::from_buffer(vec![], 65_300, AudioMimeType::Wav);
        assert_eq!(artifact.human_readable_duration(), "1:05.3");
    }

    #[test]
    fn human_readable_duration_sub_second() {
        let artifact = Artifact::from_buffer(vec![], 900, AudioMimeType::Wav);
        assert_eq!(artifact.human_readable_duration(), "0:00.9");
    }
}
