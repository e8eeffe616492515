//! Wire format for the room synchronization channel.
//!
//! Outbound intents are JSON objects tagged by `action`; the single
//! inbound message type is the full room playback state, tagged by
//! `type: "metronomeState"`. Messages of any other type belong to other
//! subsystems sharing the channel and are not ours to reject.

use serde::{Deserialize, Serialize};

use beatroom_core::{BEATS_MAX, BEATS_MIN, TEMPO_MAX, TEMPO_MIN};

use crate::{Error, Result};

/// Outbound client intent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ClientIntent {
    #[serde(rename_all = "camelCase")]
    StartMetronome { tempo: u16, beats: u32 },
    StopMetronome,
    #[serde(rename_all = "camelCase")]
    ChangeTempo { tempo: u16 },
    #[serde(rename_all = "camelCase")]
    ChangeBeats { beats: u32 },
    RequestSync,
}

/// Authoritative room playback state, as broadcast by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateBroadcast {
    pub is_playing: bool,
    pub tempo: u16,
    pub beats: u32,
    /// Server wall-clock time at which beat 0 logically began, in epoch ms.
    pub start_time: f64,
    /// Server wall-clock time at which this state was sent, in epoch ms.
    pub server_time: f64,
    #[serde(default)]
    pub room_uuid: Option<String>,
}

impl StateBroadcast {
    /// Range-check the broadcast. A server that violates its own bounds is
    /// treated the same as a corrupt message.
    pub fn validate(&self) -> Result<()> {
        if !(TEMPO_MIN..=TEMPO_MAX).contains(&self.tempo) {
            return Err(Error::MalformedStateMessage(format!(
                "tempo {} out of range",
                self.tempo
            )));
        }
        if !(BEATS_MIN..=BEATS_MAX).contains(&self.beats) {
            return Err(Error::MalformedStateMessage(format!(
                "beats {} out of range",
                self.beats
            )));
        }
        if self.is_playing && self.start_time > self.server_time {
            return Err(Error::MalformedStateMessage(format!(
                "startTime {} is after serverTime {}",
                self.start_time, self.server_time
            )));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct TypedMessage<'a> {
    #[serde(rename = "type")]
    msg_type: &'a str,
}

/// Decode an inbound channel message.
///
/// Returns `Ok(None)` for messages addressed to other subsystems
/// (different or missing `type`); `Err` only for a `metronomeState`
/// message that is undecodable or out of range.
pub fn parse_broadcast(raw: &str) -> Result<Option<StateBroadcast>> {
    let typed: TypedMessage = match serde_json::from_str(raw) {
        Ok(typed) => typed,
        Err(_) => return Ok(None),
    };
    if typed.msg_type != "metronomeState" {
        return Ok(None);
    }

    let state: StateBroadcast = serde_json::from_str(raw)
        .map_err(|e| Error::MalformedStateMessage(e.to_string()))?;
    state.validate()?;
    Ok(Some(state))
}
