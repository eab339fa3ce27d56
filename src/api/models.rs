use serde::{Deserialize, Serialize};

const LOCAL_FILE_ARTWORK: &str = "./samplesong.svg";
const FALLBACK_DEVICE_ICON: &str = "./playbackDevice.svg";
const DEVICE_ICONS: &[&str] = &["computer", "smartphone", "speaker", "tv", "tablet"];

// Auth types
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

// Wire types for GET /me/player
#[derive(Debug, Deserialize)]
pub struct PlayerResponse {
    #[serde(default)]
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub is_playing: bool,
    pub device: WireDevice,
    pub item: Option<PlayableItem>,
}

#[derive(Debug, Deserialize)]
pub struct WireDevice {
    #[serde(rename = "type")]
    pub device_type: String,
}

/// A track and a podcast episode expose their author and container under
/// different fields; the `type` tag tells them apart.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlayableItem {
    Track(TrackItem),
    Episode(EpisodeItem),
}

#[derive(Debug, Deserialize)]
pub struct TrackItem {
    pub name: String,
    pub duration_ms: u64,
    #[serde(default)]
    pub artists: Vec<NamedRef>,
    pub album: AlbumRef,
    #[serde(default)]
    pub is_local: bool,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Deserialize)]
pub struct EpisodeItem {
    pub name: String,
    pub duration_ms: u64,
    pub show: ShowRef,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AlbumRef {
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
pub struct ShowRef {
    pub name: String,
    pub publisher: String,
}

#[derive(Debug, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

/// Everything the renderer needs to draw the current item. Replaced as a
/// whole on every successful poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub title: String,
    pub author: String,
    pub album_or_show_name: String,
    pub artwork_url: Option<String>,
    pub progress_ms: u64,
    pub duration_ms: u64,
    pub is_playing: bool,
    pub device_type: String,
    pub external_url: Option<String>,
}

impl PlayerResponse {
    /// `None` when the player is active but has no item (e.g. an ad break).
    pub fn into_snapshot(self) -> Option<PlaybackSnapshot> {
        let item = self.item?;
        let (title, author, album_or_show_name, artwork_url, duration_ms, external_url) =
            match item {
                PlayableItem::Track(track) => {
                    let artwork = if track.is_local {
                        Some(LOCAL_FILE_ARTWORK.to_string())
                    } else {
                        first_image(&track.album.images)
                    };
                    (
                        track.name,
                        track
                            .artists
                            .into_iter()
                            .next()
                            .map(|a| a.name)
                            .unwrap_or_default(),
                        track.album.name,
                        artwork,
                        track.duration_ms,
                        track.external_urls.spotify,
                    )
                }
                PlayableItem::Episode(episode) => (
                    episode.name,
                    episode.show.publisher,
                    episode.show.name,
                    first_image(&episode.images),
                    episode.duration_ms,
                    episode.external_urls.spotify,
                ),
            };

        Some(PlaybackSnapshot {
            title,
            author,
            album_or_show_name,
            artwork_url,
            progress_ms: self.progress_ms.unwrap_or(0),
            duration_ms,
            is_playing: self.is_playing,
            device_type: self.device.device_type.to_lowercase(),
            external_url,
        })
    }
}

fn first_image(images: &[Image]) -> Option<String> {
    images.first().map(|i| i.url.clone())
}

// Devices
#[derive(Debug, Deserialize)]
pub struct DevicesResponse {
    #[serde(default)]
    pub devices: Vec<DeviceDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Restricted devices report no id and cannot be targeted.
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
}

impl DeviceDescriptor {
    pub fn icon(&self) -> String {
        let kind = self.device_type.to_lowercase();
        if DEVICE_ICONS.contains(&kind.as_str()) {
            format!("{}.svg", kind)
        } else {
            FALLBACK_DEVICE_ICON.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Option<PlaybackSnapshot> {
        serde_json::from_str::<PlayerResponse>(json)
            .unwrap()
            .into_snapshot()
    }

    #[test]
    fn track_uses_album_and_first_artist() {
        let snapshot = decode(
            r#"{
                "progress_ms": 1200,
                "is_playing": true,
                "device": {"type": "Computer"},
                "item": {
                    "type": "track",
                    "name": "Song",
                    "duration_ms": 180000,
                    "artists": [{"name": "First"}, {"name": "Second"}],
                    "album": {"name": "Record", "images": [{"url": "https://i/big"}, {"url": "https://i/small"}]},
                    "is_local": false,
                    "external_urls": {"spotify": "https://open.spotify.com/track/1"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(snapshot.album_or_show_name, "Record");
        assert_eq!(snapshot.author, "First");
        assert_eq!(snapshot.artwork_url.as_deref(), Some("https://i/big"));
        assert_eq!(snapshot.device_type, "computer");
        assert_eq!(snapshot.progress_ms, 1200);
        assert_eq!(snapshot.duration_ms, 180000);
        assert!(snapshot.is_playing);
        assert_eq!(
            snapshot.external_url.as_deref(),
            Some("https://open.spotify.com/track/1")
        );
    }

    #[test]
    fn episode_uses_show_name_and_publisher() {
        let snapshot = decode(
            r#"{
                "progress_ms": 5,
                "is_playing": false,
                "device": {"type": "Smartphone"},
                "item": {
                    "type": "episode",
                    "name": "Episode 12",
                    "duration_ms": 3600000,
                    "show": {"name": "The Show", "publisher": "Some Network"},
                    "images": [{"url": "https://i/episode"}]
                }
            }"#,
        )
        .unwrap();

        assert_eq!(snapshot.album_or_show_name, "The Show");
        assert_eq!(snapshot.author, "Some Network");
        assert_eq!(snapshot.title, "Episode 12");
        assert_eq!(snapshot.artwork_url.as_deref(), Some("https://i/episode"));
        assert!(!snapshot.is_playing);
    }

    #[test]
    fn local_track_gets_bundled_artwork() {
        let snapshot = decode(
            r#"{
                "is_playing": true,
                "device": {"type": "Computer"},
                "item": {
                    "type": "track",
                    "name": "ripped.mp3",
                    "duration_ms": 1000,
                    "artists": [{"name": "Me"}],
                    "album": {"name": "Local", "images": []},
                    "is_local": true
                }
            }"#,
        )
        .unwrap();
        assert_eq!(snapshot.artwork_url.as_deref(), Some("./samplesong.svg"));
        assert_eq!(snapshot.progress_ms, 0);
    }

    #[test]
    fn missing_item_yields_no_snapshot() {
        assert!(decode(r#"{"is_playing": false, "device": {"type": "TV"}, "item": null}"#).is_none());
    }

    #[test]
    fn device_icons_fall_back_for_unknown_types() {
        let tv = DeviceDescriptor {
            id: Some("1".into()),
            name: "Living room".into(),
            device_type: "TV".into(),
        };
        let car = DeviceDescriptor {
            id: Some("2".into()),
            name: "Car".into(),
            device_type: "Automobile".into(),
        };
        assert_eq!(tv.icon(), "tv.svg");
        assert_eq!(car.icon(), "./playbackDevice.svg");
    }
}
