//! Abstract pitch events exchanged with the MIDI adapter layer

use crate::types::pitch::Pitch;
use crate::types::time::{Span, Time};

/// A single sounding note: what a note-on/note-off pair reduces to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NoteEvent {
    pub pitch: Pitch,
    pub start: Time,
    pub duration: Time,
    pub velocity: u8,
}

impl NoteEvent {
    pub fn new(pitch: Pitch, start: Time, duration: Time, velocity: u8) -> Self {
        Self {
            pitch,
            start,
            duration,
            velocity,
        }
    }

    pub fn end(&self) -> Time {
        self.start + self.duration
    }

    pub fn span(&self) -> Span {
        Span::new(self.start, self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::time::{beats, time};

    #[test]
    fn test_event_span() {
        let event = NoteEvent::new(Pitch::new(60), beats(1), time(1, 2), 100);
        assert_eq!(event.end(), time(3, 2));
        assert!(event.span().contains(beats(1)));
        assert!(!event.span().contains(time(3, 2)));
    }
}
