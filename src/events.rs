//! Push channel event types.
//!
//! Every event travelling over the development push channel has a name (the
//! SSE `event:` field) and a JSON payload. Only [`ChannelEvent::UpdateFile`]
//! matters to the sync agent; slide and note updates share the transport and
//! are decoded so that their presence is harmless.

use serde::{Deserialize, Serialize};

/// Event name for a tracked-file snapshot.
pub const UPDATE_FILE: &str = "slidev:update-file";
/// Event name for slide metadata changes.
pub const UPDATE_SLIDE: &str = "slidev:update-slide";
/// Event name for speaker note changes.
pub const UPDATE_NOTE: &str = "slidev:update-note";

/// Snapshot of the tracked file pushed from backend to client.
///
/// Same shape as [`crate::file::FileRecord`]: a full snapshot, never a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub filepath: String,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideUpdate {
    pub no: u32,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteUpdate {
    pub no: u32,
    pub note: String,
    #[serde(rename = "noteHTML")]
    pub note_html: String,
}

/// A decoded push channel event.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    UpdateFile(UpdateEvent),
    UpdateSlide(SlideUpdate),
    UpdateNote(NoteUpdate),
    /// An event we have no decoder for. Kept so callers can log it.
    Unknown { name: String, data: String },
}

/// Error decoding a known event name whose payload has the wrong shape.
#[derive(Debug, thiserror::Error)]
#[error("invalid payload for {name}: {source}")]
pub struct DecodeError {
    pub name: String,
    #[source]
    pub source: serde_json::Error,
}

impl ChannelEvent {
    /// Decode an event from its wire name and JSON data.
    ///
    /// Unrecognized names are never an error; they come back as
    /// [`ChannelEvent::Unknown`].
    pub fn decode(name: &str, data: &str) -> Result<Self, DecodeError> {
        let wrap = |source| DecodeError {
            name: name.to_string(),
            source,
        };
        match name {
            UPDATE_FILE => serde_json::from_str(data)
                .map(ChannelEvent::UpdateFile)
                .map_err(wrap),
            UPDATE_SLIDE => serde_json::from_str(data)
                .map(ChannelEvent::UpdateSlide)
                .map_err(wrap),
            UPDATE_NOTE => serde_json::from_str(data)
                .map(ChannelEvent::UpdateNote)
                .map_err(wrap),
            _ => Ok(ChannelEvent::Unknown {
                name: name.to_string(),
                data: data.to_string(),
            }),
        }
    }

    /// Wire name of this event.
    pub fn name(&self) -> &str {
        match self {
            ChannelEvent::UpdateFile(_) => UPDATE_FILE,
            ChannelEvent::UpdateSlide(_) => UPDATE_SLIDE,
            ChannelEvent::UpdateNote(_) => UPDATE_NOTE,
            ChannelEvent::Unknown { name, .. } => name,
        }
    }

    /// JSON payload as sent on the wire.
    pub fn data(&self) -> Result<String, serde_json::Error> {
        match self {
            ChannelEvent::UpdateFile(e) => serde_json::to_string(e),
            ChannelEvent::UpdateSlide(e) => serde_json::to_string(e),
            ChannelEvent::UpdateNote(e) => serde_json::to_string(e),
            ChannelEvent::Unknown { data, .. } => Ok(data.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_update_file() {
        let event =
            ChannelEvent::decode(UPDATE_FILE, r##"{"filepath":"slides.md","raw":"# Hi"}"##)
                .unwrap();
        assert_eq!(
            event,
            ChannelEvent::UpdateFile(UpdateEvent {
                filepath: "slides.md".to_string(),
                raw: "# Hi".to_string(),
            })
        );
        assert_eq!(event.name(), UPDATE_FILE);
    }

    #[test]
    fn test_decode_note_uses_camel_case_html_field() {
        let event = ChannelEvent::decode(
            UPDATE_NOTE,
            r#"{"no":3,"note":"hello","noteHTML":"<p>hello</p>"}"#,
        )
        .unwrap();
        match event {
            ChannelEvent::UpdateNote(note) => {
                assert_eq!(note.no, 3);
                assert_eq!(note.note_html, "<p>hello</p>");
            }
            other => panic!("Expected note update, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_slide_keeps_metadata_opaque() {
        let event = ChannelEvent::decode(
            UPDATE_SLIDE,
            r#"{"no":1,"data":{"title":"Intro","layout":"cover"}}"#,
        )
        .unwrap();
        match event {
            ChannelEvent::UpdateSlide(slide) => {
                assert_eq!(slide.no, 1);
                assert_eq!(slide.data["layout"], "cover");
            }
            other => panic!("Expected slide update, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_is_not_an_error() {
        let event = ChannelEvent::decode("vite:beforeUpdate", "{}").unwrap();
        assert_eq!(event.name(), "vite:beforeUpdate");
        assert!(matches!(event, ChannelEvent::Unknown { .. }));
    }

    #[test]
    fn test_malformed_known_event_fails() {
        let err = ChannelEvent::decode(UPDATE_FILE, r#"{"filepath":"a.md"}"#).unwrap_err();
        assert_eq!(err.name, UPDATE_FILE);
    }

    #[test]
    fn test_data_round_trips_through_decode() {
        let event = ChannelEvent::UpdateFile(UpdateEvent {
            filepath: "slides.md".to_string(),
            raw: "line one\nline two".to_string(),
        });
        let data = event.data().unwrap();
        assert_eq!(ChannelEvent::decode(event.name(), &data).unwrap(), event);
    }
}
