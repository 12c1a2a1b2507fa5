//! The tagged-segment stream splitter (§4.E): classifies incoming text
//! fragments as prose or reasoning based on `<plan>`/`</plan>` markers,
//! tolerating markers split across fragment boundaries and rejecting
//! lookalike text (`<play>`) that never completes a real tag.

use tracing::debug;

use crate::error::{JsonError, Result};

const OPEN: &str = "<plan>";
const CLOSE: &str = "</plan>";

/// Which side of a `<plan>`/`</plan>` pair the current text belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentMode {
    Prose,
    Reasoning,
}

/// One classified run of text, tagged with the mode and the generation of
/// the contiguous `<plan>`/`</plan>` span it belongs to. Every delta sharing
/// a `generation_id` is guaranteed contiguous; the id is reissued the moment
/// a marker toggles the mode (see SPEC_FULL.md §3, "generation identifier").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub mode: SegmentMode,
    pub generation_id: u64,
    pub text: String,
}

/// Splits an incrementally-arriving text stream into prose/reasoning
/// segments. Markers are matched byte-exactly; a run of text that only
/// resembles a marker (`<play>`) is held back just long enough to prove it
/// isn't one, then flushed as ordinary text.
pub struct TaggedSegmentSplitter {
    mode: SegmentMode,
    pending: String,
    generation: u64,
}

impl Default for TaggedSegmentSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl TaggedSegmentSplitter {
    pub fn new() -> Self {
        Self {
            mode: SegmentMode::Prose,
            pending: String::new(),
            generation: 0,
        }
    }

    pub fn mode(&self) -> SegmentMode {
        self.mode
    }

    /// The generation id currently in effect — the id any text emitted right
    /// now would carry. Reissued (incremented) every time a marker toggles
    /// the mode.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Feeds one fragment of the stream in, returning zero or more fully
    /// resolved segments. Any trailing bytes that might still grow into a
    /// marker are retained internally rather than returned.
    pub fn append(&mut self, fragment: &str) -> Vec<Segment> {
        let mut combined = std::mem::take(&mut self.pending);
        combined.push_str(fragment);

        let mut out = Vec::new();
        let mut rest = combined.as_str();
        loop {
            let marker = self.expected_marker();
            let Some(pos) = rest.find(marker) else {
                break;
            };

            let text = &rest[..pos];
            if !text.is_empty() {
                out.push(Segment {
                    mode: self.mode,
                    generation_id: self.generation,
                    text: text.to_string(),
                });
            }

            let new_mode = match self.mode {
                SegmentMode::Prose => SegmentMode::Reasoning,
                SegmentMode::Reasoning => SegmentMode::Prose,
            };
            self.generation += 1;
            debug!(
                mode = ?new_mode,
                generation = self.generation,
                "segment mode transition"
            );
            self.mode = new_mode;
            rest = &rest[pos + marker.len()..];
        }

        let hold = longest_partial_marker_suffix(rest, self.expected_marker());
        let split_at = rest.len() - hold;
        let (flush, pending) = rest.split_at(split_at);
        if !flush.is_empty() {
            out.push(Segment {
                mode: self.mode,
                generation_id: self.generation,
                text: flush.to_string(),
            });
        }
        self.pending = pending.to_string();
        out
    }

    /// The single marker this splitter is currently scanning for: only the
    /// opener while in prose, only the closer while in reasoning. Text that
    /// happens to contain the *other* marker's literal bytes is ordinary
    /// content, not a transition — matching only one marker at a time is
    /// what makes that true.
    fn expected_marker(&self) -> &'static str {
        match self.mode {
            SegmentMode::Prose => OPEN,
            SegmentMode::Reasoning => CLOSE,
        }
    }

    /// Clears accumulated state back to a fresh prose-mode splitter. Fails
    /// if a partial marker is still being held, since discarding it would
    /// silently drop input bytes.
    pub fn reset(&mut self) -> Result<()> {
        if !self.pending.is_empty() {
            return Err(JsonError::DirtyReset);
        }
        self.mode = SegmentMode::Prose;
        self.generation = 0;
        Ok(())
    }
}

/// The length of the longest suffix of `text` that is a proper prefix of
/// `marker` — i.e. text that must be held back because the next fragment
/// could complete it into a real tag. `marker` is always the single marker
/// currently being sought (see [`TaggedSegmentSplitter::expected_marker`]).
fn longest_partial_marker_suffix(text: &str, marker: &str) -> usize {
    let max_len = marker.len() - 1;
    let mut best = 0;
    for len in 1..=max_len.min(text.len()) {
        let start = text.len() - len;
        if !text.is_char_boundary(start) {
            continue;
        }
        let suffix = &text[start..];
        if marker.starts_with(suffix) {
            best = len;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(segments: &[Segment]) -> Vec<(SegmentMode, &str)> {
        segments.iter().map(|s| (s.mode, s.text.as_str())).collect()
    }

    #[test]
    fn plain_prose_passes_through_untouched() {
        let mut splitter = TaggedSegmentSplitter::new();
        let segments = splitter.append("hello world");
        assert_eq!(texts(&segments), vec![(SegmentMode::Prose, "hello world")]);
        assert_eq!(segments[0].generation_id, 0);
    }

    #[test]
    fn whole_marker_pair_switches_mode_and_back() {
        let mut splitter = TaggedSegmentSplitter::new();
        let segments = splitter.append("before<plan>thinking</plan>after");
        assert_eq!(
            texts(&segments),
            vec![
                (SegmentMode::Prose, "before"),
                (SegmentMode::Reasoning, "thinking"),
                (SegmentMode::Prose, "after"),
            ]
        );
        let ids: Vec<u64> = segments.iter().map(|s| s.generation_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(splitter.generation(), 2);
    }

    #[test]
    fn marker_split_across_fragments_still_matches() {
        let mut splitter = TaggedSegmentSplitter::new();
        let mut segments = splitter.append("before<pla");
        assert_eq!(texts(&segments), vec![(SegmentMode::Prose, "before")]);
        segments = splitter.append("n>after");
        assert_eq!(texts(&segments), vec![(SegmentMode::Reasoning, "after")]);
        assert_eq!(splitter.mode(), SegmentMode::Reasoning);
    }

    #[test]
    fn lookalike_tag_is_rejected_as_plain_text() {
        let mut splitter = TaggedSegmentSplitter::new();
        let mut segments = splitter.append("hi <pla");
        assert!(segments.is_empty() || texts(&segments) == vec![(SegmentMode::Prose, "hi ")]);
        segments = splitter.append("y> there");
        assert_eq!(splitter.mode(), SegmentMode::Prose);
        let joined: String = segments.iter().map(|s| s.text.as_str()).collect();
        assert!(joined.contains("<play>"));
    }

    #[test]
    fn reset_requires_an_empty_lookahead_buffer() {
        let mut splitter = TaggedSegmentSplitter::new();
        splitter.append("trailing<pla");
        assert_eq!(splitter.reset().unwrap_err(), JsonError::DirtyReset);
        splitter.append("n>");
        splitter.reset().unwrap();
        assert_eq!(splitter.mode(), SegmentMode::Prose);
    }
}
