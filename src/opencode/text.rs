//! Cumulative/delta text reconciliation for streamed message parts.

/// Progress of one streamed text part.
///
/// Each update may carry the cumulative `text` so far, a `delta`, or both.
/// Deltas can be redelivered unchanged, so the cumulative text is
/// authoritative: only the suffix past what was already emitted goes out.
/// A delta is used only while no cumulative text has been seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextPartState {
    last_text_len: usize,
}

impl TextPartState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of the part already emitted.
    #[must_use]
    pub fn emitted_len(&self) -> usize {
        self.last_text_len
    }

    /// Fold one update in, returning the text to emit, if any.
    pub fn reconcile(&mut self, text: Option<&str>, delta: Option<&str>) -> Option<String> {
        if let Some(text) = text {
            if text.len() > self.last_text_len {
                // A cumulative text that does not extend what was emitted
                // at a char boundary is an upstream rewrite; emit nothing
                // rather than a torn suffix.
                let suffix = text.get(self.last_text_len..)?;
                self.last_text_len = text.len();
                return Some(suffix.to_owned());
            }
        }

        match delta {
            Some(delta) if self.last_text_len == 0 && !delta.is_empty() => {
                self.last_text_len = delta.len();
                Some(delta.to_owned())
            }
            _ => None,
        }
    }
}
