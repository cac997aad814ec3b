//! User-facing text, one table per supported locale.

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Ar,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "ar" | "arabic" => Ok(Self::Ar),
            other => Err(format!("unsupported locale {other:?}, expected \"en\" or \"ar\"")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    MissingUrl,
    InvalidUrl,
    InvalidBody,
    PageNotFound,
    InfoFailed,
    FormatsFailed,
    DownloadFailed,
    PlaylistDownloadFailed,
    AudioDownloadFailed,
    EngineMissing,
    Internal,
    Unknown,
    NoNote,
    AudioOnly,
    PlaylistTitle,
    DownloadedPlaylistTitle,
}

impl Locale {
    pub fn text(self, message: Message) -> &'static str {
        match self {
            Self::En => english(message),
            Self::Ar => arabic(message),
        }
    }

    /// Prefix a diagnostic with the localized description of the failed operation.
    pub fn failure(self, message: Message, cause: impl std::fmt::Display) -> String {
        format!("{}: {cause}", self.text(message))
    }
}

fn english(message: Message) -> &'static str {
    match message {
        Message::MissingUrl => "A URL must be provided",
        Message::InvalidUrl => "The URL must be an absolute http or https address",
        Message::InvalidBody => "The request body must be a JSON object",
        Message::PageNotFound => "Page not found",
        Message::InfoFailed => "An error occurred while fetching video info",
        Message::FormatsFailed => "An error occurred while fetching available qualities",
        Message::DownloadFailed => "An error occurred while downloading",
        Message::PlaylistDownloadFailed => "An error occurred while downloading the playlist",
        Message::AudioDownloadFailed => "An error occurred while downloading from SoundCloud",
        Message::EngineMissing => "yt-dlp is not installed. Install yt-dlp and restart the server",
        Message::Internal => "Internal server error",
        Message::Unknown => "Unknown",
        Message::NoNote => "None",
        Message::AudioOnly => "Audio only",
        Message::PlaylistTitle => "Playlist",
        Message::DownloadedPlaylistTitle => "The playlist",
    }
}

fn arabic(message: Message) -> &'static str {
    match message {
        Message::MissingUrl => "يجب توفير عنوان URL",
        Message::InvalidUrl => "يجب أن يكون العنوان رابط http أو https كامل",
        Message::InvalidBody => "يجب أن يكون محتوى الطلب كائن JSON",
        Message::PageNotFound => "الصفحة غير موجودة",
        Message::InfoFailed => "حدث خطأ أثناء جلب معلومات الفيديو",
        Message::FormatsFailed => "حدث خطأ أثناء جلب الجودات",
        Message::DownloadFailed => "حدث خطأ أثناء التحميل",
        Message::PlaylistDownloadFailed => "حدث خطأ أثناء تحميل قائمة التشغيل",
        Message::AudioDownloadFailed => "حدث خطأ أثناء التحميل من SoundCloud",
        Message::EngineMissing => "أداة yt-dlp غير مثبتة. قم بتثبيتها ثم أعد تشغيل الخادم",
        Message::Internal => "خطأ داخلي في الخادم",
        Message::Unknown => "غير معروف",
        Message::NoNote => "لا يوجد",
        Message::AudioOnly => "الصوت فقط",
        Message::PlaylistTitle => "قائمة تشغيل",
        Message::DownloadedPlaylistTitle => "قائمة التشغيل",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_locale_names() {
        assert_eq!("EN".parse::<Locale>(), Ok(Locale::En));
        assert_eq!(" ar ".parse::<Locale>(), Ok(Locale::Ar));
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn failure_appends_cause() {
        let text = Locale::En.failure(Message::InfoFailed, "HTTP Error 404");
        assert_eq!(
            text,
            "An error occurred while fetching video info: HTTP Error 404"
        );
    }

    #[test]
    fn playlist_defaults_differ_between_info_and_download() {
        assert_eq!(Locale::Ar.text(Message::PlaylistTitle), "قائمة تشغيل");
        assert_eq!(Locale::Ar.text(Message::DownloadedPlaylistTitle), "قائمة التشغيل");
    }

    #[test]
    fn arabic_audio_marker_matches_catalog_label() {
        assert_eq!(Locale::Ar.text(Message::AudioOnly), "الصوت فقط");
    }
}
