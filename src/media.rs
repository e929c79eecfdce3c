//! Media classification, retrieval URLs and display formatting for entries.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

use crate::protocol::{Entry, EntryKind};

const IMAGE_EXTENSIONS: [&str; 6] = [".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp"];
const AUDIO_EXTENSIONS: [&str; 4] = [".mp3", ".wav", ".ogg", ".m4a"];
const VIDEO_EXTENSIONS: [&str; 5] = [".mp4", ".webm", ".ogv", ".mov", ".mkv"];

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl MediaKind {
    /// Classify a dotted extension such as `.MP3`.
    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.to_lowercase();
        let ext = ext.as_str();
        if IMAGE_EXTENSIONS.contains(&ext) {
            Some(Self::Image)
        } else if AUDIO_EXTENSIONS.contains(&ext) {
            Some(Self::Audio)
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            Some(Self::Video)
        } else {
            None
        }
    }

    pub fn of(entry: &Entry) -> Option<Self> {
        if entry.kind != EntryKind::File {
            return None;
        }
        entry.details.extension.as_deref().and_then(Self::from_extension)
    }
}

pub fn is_streamable(entry: &Entry) -> bool {
    MediaKind::of(entry).is_some()
}

pub fn icon(entry: &Entry) -> &'static str {
    match (entry.kind, MediaKind::of(entry)) {
        (EntryKind::Directory, _) => "📁",
        (_, Some(MediaKind::Video)) => "🎬",
        (_, Some(MediaKind::Audio)) => "🎵",
        (_, Some(MediaKind::Image)) => "🖼️",
        (_, None) => "📄",
    }
}

/// Builds download and stream endpoints from the server's HTTP base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBuilder {
    base_url: String,
}

impl UrlBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn download(&self, path: &str) -> String {
        format!("{}/download/file?path={}", self.base_url, urlencoding::encode(path))
    }

    pub fn stream(&self, path: &str) -> String {
        format!("{}/stream/file?path={}", self.base_url, urlencoding::encode(path))
    }

    /// Images are shown straight from the download endpoint; audio and video
    /// go through the ranged stream endpoint.
    pub fn playback(&self, entry: &Entry) -> Option<String> {
        match MediaKind::of(entry)? {
            MediaKind::Image => Some(self.download(&entry.path)),
            MediaKind::Audio | MediaKind::Video => Some(self.stream(&entry.path)),
        }
    }
}

/// MIME type to hand the player for a streamable entry.
pub fn stream_mime(entry: &Entry) -> Option<String> {
    let kind = MediaKind::of(entry)?;
    if let Some(filetype) = entry.details.filetype.as_deref().filter(|t| !t.is_empty()) {
        return Some(filetype.to_string());
    }
    Some(match kind {
        MediaKind::Audio => "audio/mpeg".to_string(),
        MediaKind::Video => "video/mp4".to_string(),
        MediaKind::Image => {
            let ext = entry.details.extension.as_deref().unwrap_or_default();
            mime_guess::from_ext(ext.trim_start_matches('.'))
                .first_or_octet_stream()
                .to_string()
        }
    })
}

/// Human readable size in base 1024 with one decimal.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut exponent = 0;
    while value >= 1024.0 && exponent < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        exponent += 1;
    }
    format!("{value:.1} {}", SIZE_UNITS[exponent])
}

/// Caption under an entry's name: item count for folders, size for files.
pub fn caption(entry: &Entry) -> String {
    match entry.kind {
        EntryKind::Directory => format!("{} items", entry.details.count.unwrap_or(0)),
        EntryKind::File => format_size(entry.details.size.unwrap_or(0)),
    }
}

/// `HH:MM YYYY-MM-DD` in local time; empty when missing or unparseable.
pub fn format_date(value: Option<&str>) -> String {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return String::new();
    };
    let local = DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Local))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .and_then(|naive| Local.from_local_datetime(&naive).single())
        });
    local
        .map(|dt| dt.format("%H:%M %Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::EntryDetails;

    fn file(path: &str, extension: Option<&str>) -> Entry {
        Entry {
            kind: EntryKind::File,
            path: path.to_string(),
            details: EntryDetails {
                name: path.rsplit('/').next().unwrap_or_default().to_string(),
                extension: extension.map(str::to_string),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_media_classification_is_case_insensitive() {
        assert_eq!(MediaKind::from_extension(".JPG"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_extension(".m4a"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_extension(".MkV"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_extension(".pdf"), None);
        assert_eq!(MediaKind::from_extension("mp4"), None);
    }

    #[test]
    fn test_directories_are_never_streamable() {
        let mut dir = file("/clips.mp4", Some(".mp4"));
        dir.kind = EntryKind::Directory;
        assert!(!is_streamable(&dir));
        assert_eq!(icon(&dir), "📁");
        assert!(is_streamable(&file("/a.mp4", Some(".mp4"))));
    }

    #[test]
    fn test_urls_are_encoded() {
        let urls = UrlBuilder::new("http://localhost:8888/");
        assert_eq!(
            urls.download("/my docs/a&b.txt"),
            "http://localhost:8888/download/file?path=%2Fmy%20docs%2Fa%26b.txt"
        );
        assert_eq!(
            urls.stream("/song.mp3"),
            "http://localhost:8888/stream/file?path=%2Fsong.mp3"
        );
    }

    #[test]
    fn test_playback_endpoint_by_kind() {
        let urls = UrlBuilder::new("http://h");
        assert_eq!(
            urls.playback(&file("/p.png", Some(".png"))),
            Some("http://h/download/file?path=%2Fp.png".to_string())
        );
        assert_eq!(
            urls.playback(&file("/v.webm", Some(".webm"))),
            Some("http://h/stream/file?path=%2Fv.webm".to_string())
        );
        assert_eq!(urls.playback(&file("/r.txt", Some(".txt"))), None);
    }

    #[test]
    fn test_stream_mime_defaults() {
        assert_eq!(stream_mime(&file("/a.ogg", Some(".ogg"))).as_deref(), Some("audio/mpeg"));
        assert_eq!(stream_mime(&file("/v.mov", Some(".mov"))).as_deref(), Some("video/mp4"));
        assert_eq!(stream_mime(&file("/p.png", Some(".png"))).as_deref(), Some("image/png"));

        let mut typed = file("/a.ogg", Some(".ogg"));
        typed.details.filetype = Some("audio/ogg".to_string());
        assert_eq!(stream_mime(&typed).as_deref(), Some("audio/ogg"));
        assert_eq!(stream_mime(&file("/r.txt", Some(".txt"))), None);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512.0 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_caption() {
        let mut dir = file("/d", None);
        dir.kind = EntryKind::Directory;
        dir.details.count = Some(3);
        assert_eq!(caption(&dir), "3 items");
        assert_eq!(caption(&file("/f", None)), "0 B");
    }

    #[test]
    fn test_format_date_handles_missing_and_garbage() {
        assert_eq!(format_date(None), "");
        assert_eq!(format_date(Some("")), "");
        assert_eq!(format_date(Some("garbage")), "");
        assert_eq!(format_date(Some("2024-05-01T10:30:00")), "10:30 2024-05-01");
    }
}
