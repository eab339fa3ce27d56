pub mod auth_commands;
pub mod device_commands;
pub mod image_commands;
pub mod playback_commands;
