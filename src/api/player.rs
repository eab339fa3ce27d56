use crate::api::client::SpotifyClient;
use crate::api::models::{DeviceDescriptor, DevicesResponse, PlaybackSnapshot, PlayerResponse};
use crate::error::AppResult;
use reqwest::Method;
use serde::{Deserialize, Serialize};

const PLAYER_PATH: &str = "/me/player";
const PLAYER_READ_PATH: &str = "/me/player?additional_types=track,episode";
const DEVICES_PATH: &str = "/me/player/devices";

/// Transport controls exposed to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum PlaybackCommand {
    Next,
    Previous,
    Play,
    Pause,
    Seek { position_ms: u64 },
}

impl PlaybackCommand {
    pub fn method(&self) -> Method {
        match self {
            PlaybackCommand::Next | PlaybackCommand::Previous => Method::POST,
            PlaybackCommand::Play | PlaybackCommand::Pause | PlaybackCommand::Seek { .. } => {
                Method::PUT
            }
        }
    }

    pub fn path(&self) -> String {
        match self {
            PlaybackCommand::Next => format!("{}/next", PLAYER_PATH),
            PlaybackCommand::Previous => format!("{}/previous", PLAYER_PATH),
            PlaybackCommand::Play => format!("{}/play", PLAYER_PATH),
            PlaybackCommand::Pause => format!("{}/pause", PLAYER_PATH),
            PlaybackCommand::Seek { position_ms } => {
                format!("{}/seek?position_ms={}", PLAYER_PATH, position_ms)
            }
        }
    }
}

impl SpotifyClient {
    /// `Ok(None)` when nothing is playing (204) or the player has no item.
    pub async fn current_playback(&self) -> AppResult<Option<PlaybackSnapshot>> {
        let response = self.dispatch(PLAYER_READ_PATH, Method::GET, None).await?;
        if response.status == 204 || response.body.trim().is_empty() {
            return Ok(None);
        }
        let player: PlayerResponse = response.json()?;
        Ok(player.into_snapshot())
    }

    pub async fn devices(&self) -> AppResult<Vec<DeviceDescriptor>> {
        let response = self.dispatch(DEVICES_PATH, Method::GET, None).await?;
        let body: DevicesResponse = response.json()?;
        Ok(body.devices)
    }

    pub async fn transfer_playback(&self, device_id: &str) -> AppResult<()> {
        let body = serde_json::json!({ "device_ids": [device_id] });
        self.dispatch(PLAYER_PATH, Method::PUT, Some(body)).await?;
        Ok(())
    }

    pub async fn send_command(&self, command: PlaybackCommand) -> AppResult<()> {
        self.dispatch(&command.path(), command.method(), None)
            .await?;
        Ok(())
    }
}
