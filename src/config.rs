//! Parser configuration for resource limits and buffer tuning.
//!
//! Following the pattern established by `serde_json`, the parser enforces a
//! maximum recursion depth so that deeply nested or adversarial input
//! (`[[[[[[...]]]]]]`) fails with [`crate::JsonError::RecursionLimitExceeded`]
//! instead of exhausting the stack.

/// Tunable limits and hints for a [`crate::Parser`].
///
/// `max_depth` is a correctness-affecting safety bound. `chunk_size_hint` is
/// a pure performance hint used only to size the adapter's initial buffer
/// reservation; a source is free to ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    max_depth: usize,
    chunk_size_hint: usize,
}

/// Default recursion depth, matching `serde_json`'s own default.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Default buffer reservation, sized for a handful of typical model-output
/// token fragments.
pub const DEFAULT_CHUNK_SIZE_HINT: usize = 256;

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            chunk_size_hint: DEFAULT_CHUNK_SIZE_HINT,
        }
    }
}

impl ParseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use with caution: `usize::MAX` disables the recursion guard entirely.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_chunk_size_hint(mut self, hint: usize) -> Self {
        self.chunk_size_hint = hint;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn chunk_size_hint(&self) -> usize {
        self.chunk_size_hint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_serde_json_convention() {
        let config = ParseConfig::default();
        assert_eq!(config.max_depth(), 128);
    }

    #[test]
    fn builder_overrides_apply() {
        let config = ParseConfig::new()
            .with_max_depth(4)
            .with_chunk_size_hint(64);
        assert_eq!(config.max_depth(), 4);
        assert_eq!(config.chunk_size_hint(), 64);
    }
}
