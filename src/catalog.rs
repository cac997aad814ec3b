//! Turns raw engine format lists into the selectable catalog shown to callers.
//!
//! A raw format is listed as a video format when it carries a video codec, as
//! an audio-only format when it carries an audio codec and no video codec, and
//! is left out otherwise. The reported `total_size` is summed over every raw
//! format, listed or not, so it can exceed the sum of the listed sizes.

use serde::Serialize;

use crate::{
    engine::{RawFormat, RawMedia},
    messages::{Locale, Message},
};

const NO_CODEC: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodingOption {
    pub format_id: String,
    pub resolution: String,
    pub note: String,
    pub filesize: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormatCatalog {
    pub formats: Vec<EncodingOption>,
    pub total_size: u64,
}

/// Fallback texts used while building a catalog.
#[derive(Debug, Clone, Copy)]
pub struct CatalogLabels<'a> {
    pub unknown_resolution: &'a str,
    pub no_note: &'a str,
    pub audio_only: &'a str,
}

impl CatalogLabels<'static> {
    pub fn for_locale(locale: Locale) -> Self {
        Self {
            unknown_resolution: locale.text(Message::Unknown),
            no_note: locale.text(Message::NoNote),
            audio_only: locale.text(Message::AudioOnly),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingKind {
    Video,
    AudioOnly,
}

pub fn classify(format: &RawFormat) -> Option<EncodingKind> {
    if has_video(format) {
        Some(EncodingKind::Video)
    } else if has_audio(format) {
        Some(EncodingKind::AudioOnly)
    } else {
        None
    }
}

fn has_video(format: &RawFormat) -> bool {
    matches!(format.vcodec.as_deref(), Some(value) if value != NO_CODEC)
}

fn has_audio(format: &RawFormat) -> bool {
    matches!(format.acodec.as_deref(), Some(value) if value != NO_CODEC)
}

impl FormatCatalog {
    /// Catalog for a probe result, spanning every item when it is a playlist.
    pub fn for_media(media: &RawMedia, labels: CatalogLabels<'_>) -> Self {
        if media.is_playlist() {
            Self::for_collection(media.items().map(RawMedia::formats), labels)
        } else {
            Self::for_item(media.formats(), labels)
        }
    }

    pub fn for_item(formats: &[RawFormat], labels: CatalogLabels<'_>) -> Self {
        Self::for_collection([formats], labels)
    }

    /// Items contribute their video formats then their audio-only formats, in
    /// collection order. Sorting happens once, over the combined list.
    pub fn for_collection<'f, I>(items: I, labels: CatalogLabels<'_>) -> Self
    where
        I: IntoIterator<Item = &'f [RawFormat]>,
    {
        let mut catalog = Self::default();
        for formats in items {
            catalog.append_item(formats, labels);
        }

        // `sort_by` is stable, so equal sizes keep their insertion order.
        catalog
            .formats
            .sort_by(|a, b| b.filesize.cmp(&a.filesize));
        catalog
    }

    fn append_item(&mut self, formats: &[RawFormat], labels: CatalogLabels<'_>) {
        let video = formats
            .iter()
            .filter(|format| classify(format) == Some(EncodingKind::Video))
            .map(|format| option(format, EncodingKind::Video, labels));
        let audio = formats
            .iter()
            .filter(|format| classify(format) == Some(EncodingKind::AudioOnly))
            .map(|format| option(format, EncodingKind::AudioOnly, labels));

        self.formats.extend(video.chain(audio));
        self.total_size = formats
            .iter()
            .map(RawFormat::size_bytes)
            .fold(self.total_size, u64::saturating_add);
    }
}

fn option(format: &RawFormat, kind: EncodingKind, labels: CatalogLabels<'_>) -> EncodingOption {
    let resolution = match kind {
        EncodingKind::Video => format
            .resolution
            .clone()
            .unwrap_or_else(|| labels.unknown_resolution.to_string()),
        EncodingKind::AudioOnly => labels.audio_only.to_string(),
    };

    EncodingOption {
        format_id: format.format_id.clone(),
        resolution,
        note: format
            .format_note
            .clone()
            .unwrap_or_else(|| labels.no_note.to_string()),
        filesize: format.size_bytes(),
    }
}
