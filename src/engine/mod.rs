//! Boundary to the extraction engine.
//!
//! The server never inspects media sites itself. Metadata and downloads are
//! delegated to an implementation of [`MediaEngine`]; in production that is
//! [`YtDlp`], which drives the `yt-dlp` binary as a subprocess.

mod ytdlp;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::EngineError;

pub use ytdlp::YtDlp;

/// Selector used when the caller does not pick an encoding.
pub const DEFAULT_SELECTOR: &str = "best";

/// Metadata for one media item or, when `entries` is present, a playlist.
///
/// Mirrors the subset of yt-dlp's `-J` output the server reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMedia {
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub upload_date: Option<String>,
    pub modified_date: Option<String>,
    formats: Option<Vec<RawFormat>>,
    entries: Option<Vec<Option<RawMedia>>>,
}

impl RawMedia {
    pub fn is_playlist(&self) -> bool {
        self.entries.is_some()
    }

    pub fn formats(&self) -> &[RawFormat] {
        self.formats.as_deref().unwrap_or_default()
    }

    /// Playlist items in order. Unavailable entries, reported as `null`, are skipped.
    pub fn items(&self) -> impl Iterator<Item = &RawMedia> {
        self.entries.iter().flatten().flatten()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFormat {
    pub format_id: String,
    pub resolution: Option<String>,
    pub format_note: Option<String>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub filesize: Option<f64>,
}

impl RawFormat {
    /// Reported size in bytes, with unknown sizes counted as zero.
    pub fn size_bytes(&self) -> u64 {
        match self.filesize {
            Some(size) if size.is_finite() && size > 0.0 => size as u64,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbePurpose {
    /// Title, counts and dates for `/video_info`.
    Metadata,
    /// Full format lists for `/list_formats`; DASH manifests are skipped.
    Formats,
}

/// Where a download is written and which container it ends up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPolicy {
    /// `<root>/<playlist title>/<title>.<ext>`, merged into mp4.
    Playlist,
    /// `<root>/<title>.<ext>`, merged into mp4, playlist expansion disabled.
    Single,
    /// `<root>/<title>.<ext>`, audio extracted to mp3.
    Audio,
}

impl OutputPolicy {
    /// The audio platform flag takes precedence over the playlist flag.
    pub fn from_flags(is_playlist: bool, is_audio_platform: bool) -> Self {
        if is_audio_platform {
            Self::Audio
        } else if is_playlist {
            Self::Playlist
        } else {
            Self::Single
        }
    }

    pub fn output_template(self, root: &Path) -> PathBuf {
        match self {
            Self::Playlist => root.join("%(playlist_title)s").join("%(title)s.%(ext)s"),
            Self::Single | Self::Audio => root.join("%(title)s.%(ext)s"),
        }
    }

    pub fn container(self) -> &'static str {
        match self {
            Self::Playlist | Self::Single => "mp4",
            Self::Audio => "mp3",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub url: String,
    pub selector: String,
    pub policy: OutputPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Downloaded file, or the playlist directory, relative to the download root.
    pub relative_path: PathBuf,
    pub title: Option<String>,
}

#[async_trait]
pub trait MediaEngine: Send + Sync {
    async fn probe(&self, url: &str, purpose: ProbePurpose) -> Result<RawMedia, EngineError>;

    async fn download(&self, job: &DownloadJob) -> Result<DownloadOutcome, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn size_treats_missing_and_null_as_zero() {
        let formats: Vec<RawFormat> = serde_json::from_value(json!([
            {"format_id": "a"},
            {"format_id": "b", "filesize": null},
            {"format_id": "c", "filesize": 4096},
        ]))
        .unwrap();

        let sizes: Vec<u64> = formats.iter().map(RawFormat::size_bytes).collect();
        assert_eq!(sizes, vec![0, 0, 4096]);
    }

    #[test]
    fn playlist_items_skip_unavailable_entries() {
        let media: RawMedia = serde_json::from_value(json!({
            "title": "Mix",
            "entries": [{"title": "one"}, null, {"title": "two"}],
        }))
        .unwrap();

        assert!(media.is_playlist());
        let titles: Vec<_> = media.items().filter_map(|item| item.title.as_deref()).collect();
        assert_eq!(titles, vec!["one", "two"]);
    }

    #[test]
    fn null_formats_read_as_empty() {
        let media: RawMedia =
            serde_json::from_value(json!({"title": "clip", "formats": null})).unwrap();
        assert!(!media.is_playlist());
        assert!(media.formats().is_empty());
    }

    #[test]
    fn policy_flags_are_mutually_exclusive() {
        assert_eq!(OutputPolicy::from_flags(false, false), OutputPolicy::Single);
        assert_eq!(OutputPolicy::from_flags(true, false), OutputPolicy::Playlist);
        assert_eq!(OutputPolicy::from_flags(true, true), OutputPolicy::Audio);
        assert_eq!(OutputPolicy::from_flags(false, true), OutputPolicy::Audio);
    }

    #[test]
    fn templates_are_rooted_in_download_dir() {
        let root = Path::new("web");
        assert_eq!(
            OutputPolicy::Playlist.output_template(root),
            Path::new("web/%(playlist_title)s/%(title)s.%(ext)s")
        );
        assert_eq!(
            OutputPolicy::Audio.output_template(root),
            Path::new("web/%(title)s.%(ext)s")
        );
        assert_eq!(OutputPolicy::Audio.container(), "mp3");
    }
}
