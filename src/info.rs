use serde::Serialize;

use crate::{
    engine::RawMedia,
    messages::{Locale, Message},
};

/// Metadata returned by `/video_info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MediaSummary {
    Single(SingleSummary),
    Playlist(PlaylistSummary),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleSummary {
    pub is_playlist: bool,
    pub title: String,
    pub thumbnail: String,
    pub duration: f64,
    pub view_count: u64,
    pub like_count: u64,
    pub upload_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistSummary {
    pub is_playlist: bool,
    pub title: String,
    pub thumbnail: String,
    pub video_count: usize,
    pub view_count: u64,
    pub last_updated: String,
}

impl MediaSummary {
    pub fn from_media(media: &RawMedia, locale: Locale) -> Self {
        let unknown = || locale.text(Message::Unknown).to_string();

        if media.is_playlist() {
            let thumbnail = media
                .items()
                .next()
                .and_then(|first| first.thumbnail.clone())
                .unwrap_or_default();

            Self::Playlist(PlaylistSummary {
                is_playlist: true,
                title: media
                    .title
                    .clone()
                    .unwrap_or_else(|| locale.text(Message::PlaylistTitle).to_string()),
                thumbnail,
                video_count: media.items().count(),
                view_count: media
                    .items()
                    .map(|item| item.view_count.unwrap_or_default())
                    .fold(0, u64::saturating_add),
                last_updated: media.modified_date.clone().unwrap_or_else(unknown),
            })
        } else {
            Self::Single(SingleSummary {
                is_playlist: false,
                title: media.title.clone().unwrap_or_else(unknown),
                thumbnail: media.thumbnail.clone().unwrap_or_default(),
                duration: media.duration.unwrap_or_default(),
                view_count: media.view_count.unwrap_or_default(),
                like_count: media.like_count.unwrap_or_default(),
                upload_date: media.upload_date.clone().unwrap_or_else(unknown),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn media(value: serde_json::Value) -> RawMedia {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn single_item_copies_fields() {
        let summary = MediaSummary::from_media(
            &media(json!({
                "title": "Talk",
                "thumbnail": "https://img.example/t.jpg",
                "duration": 125.0,
                "view_count": 42,
                "like_count": 7,
                "upload_date": "20240102",
            })),
            Locale::En,
        );

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(
            value,
            json!({
                "is_playlist": false,
                "title": "Talk",
                "thumbnail": "https://img.example/t.jpg",
                "duration": 125.0,
                "view_count": 42,
                "like_count": 7,
                "upload_date": "20240102",
            })
        );
    }

    #[test]
    fn single_item_defaults_missing_fields() {
        let MediaSummary::Single(summary) = MediaSummary::from_media(&media(json!({})), Locale::Ar)
        else {
            panic!("expected a single item summary");
        };

        assert_eq!(summary.title, "غير معروف");
        assert_eq!(summary.thumbnail, "");
        assert_eq!(summary.view_count, 0);
        assert_eq!(summary.upload_date, "غير معروف");
    }

    #[test]
    fn playlist_sums_views_and_counts_available_items() {
        let summary = MediaSummary::from_media(
            &media(json!({
                "title": "Mix",
                "modified_date": "20240301",
                "entries": [
                    {"title": "one", "thumbnail": "https://img.example/1.jpg", "view_count": 10},
                    null,
                    {"title": "two", "view_count": null},
                    {"title": "three", "view_count": 5},
                ],
            })),
            Locale::En,
        );

        assert_eq!(
            summary,
            MediaSummary::Playlist(PlaylistSummary {
                is_playlist: true,
                title: "Mix".to_string(),
                thumbnail: "https://img.example/1.jpg".to_string(),
                video_count: 3,
                view_count: 15,
                last_updated: "20240301".to_string(),
            })
        );
    }

    #[test]
    fn empty_playlist_uses_default_title() {
        let MediaSummary::Playlist(summary) =
            MediaSummary::from_media(&media(json!({"entries": []})), Locale::En)
        else {
            panic!("expected a playlist summary");
        };

        assert_eq!(summary.title, "Playlist");
        assert_eq!(summary.thumbnail, "");
        assert_eq!(summary.video_count, 0);
        assert_eq!(summary.last_updated, "Unknown");
    }
}
