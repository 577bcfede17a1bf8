//! Settings command handler.

use anyhow::Result;
use serde_json::{Value, json};
use syncstream_core::SyncSettings;

/// Effective values, defaults filled in.
pub fn effective_json(settings: &SyncSettings) -> Value {
    json!({
        "sync_threshold_secs": settings.effective_sync_threshold(),
        "heartbeat_interval_ms": u64::try_from(settings.effective_heartbeat_interval().as_millis()).unwrap_or(u64::MAX),
        "ducking_factor": settings.effective_ducking_factor(),
        "release_window_ms": u64::try_from(settings.effective_release_window().as_millis()).unwrap_or(u64::MAX),
        "speech_energy_threshold": settings.effective_speech_energy_threshold(),
        "default_volume": settings.effective_default_volume(),
        "channel_capacity": settings.effective_channel_capacity(),
        "default_room_id": settings.effective_room_id(),
    })
}

/// Print the effective settings.
pub fn execute(settings: &SyncSettings) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&effective_json(settings))?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_reported() {
        let value = effective_json(&SyncSettings::default());
        assert_eq!(value["heartbeat_interval_ms"], 1200);
        assert_eq!(value["default_room_id"], "SYNC-STREAM-CINEMA");
        assert_eq!(value["channel_capacity"], 64);
    }
}
