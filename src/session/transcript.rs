//! Turn-based transcript accumulation.
//!
//! The transport delivers transcription as incremental fragments per speaker;
//! committed turns only exist once a turn-complete boundary arrives. This
//! state machine buffers fragments for live captioning and emits immutable
//! [`TranscriptEntry`] records at each boundary, user side first.

use serde::{Deserialize, Serialize};

use crate::core::transport::Speaker;

/// One committed utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    /// Position in the committed history
    pub seq: u64,
}

/// The in-flight, not-yet-committed caption state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptUpdate {
    pub user_text: String,
    pub model_text: String,
}

/// Buffers fragments and commits them at turn boundaries.
#[derive(Debug, Default)]
pub struct TranscriptAccumulator {
    user: String,
    model: String,
    seq: u64,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one fragment and return the refreshed caption state.
    pub fn on_fragment(&mut self, speaker: Speaker, delta: &str) -> TranscriptUpdate {
        match speaker {
            Speaker::User => self.user.push_str(delta),
            Speaker::Model => self.model.push_str(delta),
        }
        self.pending()
    }

    /// Commit the current turn.
    ///
    /// Returns zero, one, or two entries (user then model, omitting empty
    /// sides) and clears both buffers.
    pub fn on_turn_complete(&mut self) -> Vec<TranscriptEntry> {
        let mut committed = Vec::new();
        let user = std::mem::take(&mut self.user);
        let model = std::mem::take(&mut self.model);

        let user = user.trim();
        if !user.is_empty() {
            committed.push(TranscriptEntry {
                speaker: Speaker::User,
                text: user.to_string(),
                seq: self.seq,
            });
            self.seq += 1;
        }
        let model = model.trim();
        if !model.is_empty() {
            committed.push(TranscriptEntry {
                speaker: Speaker::Model,
                text: model.to_string(),
                seq: self.seq,
            });
            self.seq += 1;
        }
        committed
    }

    /// Current caption state.
    pub fn pending(&self) -> TranscriptUpdate {
        TranscriptUpdate {
            user_text: self.user.clone(),
            model_text: self.model.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_commit_ordering() {
        let mut acc = TranscriptAccumulator::new();
        acc.on_fragment(Speaker::User, "he");
        acc.on_fragment(Speaker::User, "llo");
        acc.on_fragment(Speaker::Model, "hi");

        let committed = acc.on_turn_complete();
        assert_eq!(committed.len(), 2);
        assert_eq!(committed[0].speaker, Speaker::User);
        assert_eq!(committed[0].text, "hello");
        assert_eq!(committed[0].seq, 0);
        assert_eq!(committed[1].speaker, Speaker::Model);
        assert_eq!(committed[1].text, "hi");
        assert_eq!(committed[1].seq, 1);
    }

    #[test]
    fn test_model_only_turn_commits_one_entry() {
        let mut acc = TranscriptAccumulator::new();
        acc.on_fragment(Speaker::Model, "hi");
        let committed = acc.on_turn_complete();
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].speaker, Speaker::Model);
        assert_eq!(committed[0].text, "hi");
    }

    #[test]
    fn test_empty_turn_commits_nothing() {
        let mut acc = TranscriptAccumulator::new();
        assert!(acc.on_turn_complete().is_empty());
        acc.on_fragment(Speaker::User, "   ");
        assert!(acc.on_turn_complete().is_empty());
    }

    #[test]
    fn test_buffers_clear_after_commit() {
        let mut acc = TranscriptAccumulator::new();
        acc.on_fragment(Speaker::User, "first");
        acc.on_turn_complete();
        assert_eq!(acc.pending(), TranscriptUpdate::default());

        // Sequence numbers keep counting across turns.
        acc.on_fragment(Speaker::Model, "second");
        let committed = acc.on_turn_complete();
        assert_eq!(committed[0].seq, 1);
    }

    #[test]
    fn test_interleaved_fragments_stay_per_speaker() {
        let mut acc = TranscriptAccumulator::new();
        acc.on_fragment(Speaker::User, "can you ");
        let update = acc.on_fragment(Speaker::Model, "Sure, ");
        acc.on_fragment(Speaker::User, "help me");
        acc.on_fragment(Speaker::Model, "I can.");

        assert_eq!(update.user_text, "can you ");
        assert_eq!(update.model_text, "Sure, ");

        let committed = acc.on_turn_complete();
        assert_eq!(committed[0].text, "can you help me");
        assert_eq!(committed[1].text, "Sure, I can.");
    }

    #[test]
    fn test_no_fragment_dropped_before_first_commit() {
        let mut acc = TranscriptAccumulator::new();
        let fragments = ["a", "b", "c", "d"];
        for f in fragments {
            acc.on_fragment(Speaker::User, f);
        }
        let committed = acc.on_turn_complete();
        assert_eq!(committed[0].text, "abcd");
    }
}
