//! The byte-chunk source contract (component A's upstream collaborator).
//!
//! Fragments are required to be valid `String`s: Rust's string type cannot
//! hold a partial UTF-8 codepoint, so a `ChunkSource` rules out mid-codepoint
//! splits by construction rather than by runtime buffering (see SPEC_FULL.md
//! §9, "Chunk-boundary safety for multi-byte characters").

use std::convert::Infallible;

/// A pull-style, asynchronous producer of text fragments.
///
/// Implementations adapt an HTTP streaming body, an SSE decoder, or (in
/// tests) a fixed list of fragments. `next_chunk` returns `Ok(None)` exactly
/// once, at end of stream; calling it again afterward is implementation
/// defined (the parser never does).
pub trait ChunkSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn next_chunk(
        &mut self,
    ) -> impl std::future::Future<Output = std::result::Result<Option<String>, Self::Error>>;
}

/// A source over a fixed, in-memory list of fragments — the workhorse of the
/// test suite, and a reasonable starting point for feeding a fully-buffered
/// document through the streaming API.
pub struct FragmentSource {
    fragments: std::collections::VecDeque<String>,
}

impl FragmentSource {
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn whole(document: impl Into<String>) -> Self {
        Self::new([document.into()])
    }
}

impl ChunkSource for FragmentSource {
    type Error = Infallible;

    async fn next_chunk(&mut self) -> std::result::Result<Option<String>, Self::Error> {
        Ok(self.fragments.pop_front())
    }
}

#[cfg(feature = "futures")]
pub mod futures_impl {
    //! Adapts any [`futures_core::Stream`] of `String` items into a
    //! [`ChunkSource`].

    use super::ChunkSource;
    use futures_core::Stream;
    use std::pin::Pin;

    pub struct StreamSource<S> {
        inner: Pin<Box<S>>,
    }

    impl<S> StreamSource<S>
    where
        S: Stream<Item = String>,
    {
        pub fn new(stream: S) -> Self {
            Self {
                inner: Box::pin(stream),
            }
        }
    }

    impl<S> ChunkSource for StreamSource<S>
    where
        S: Stream<Item = String>,
    {
        type Error = std::convert::Infallible;

        async fn next_chunk(&mut self) -> std::result::Result<Option<String>, Self::Error> {
            use futures_core::Stream as _;
            Ok(std::future::poll_fn(|cx| self.inner.as_mut().poll_next(cx)).await)
        }
    }
}

#[cfg(feature = "tokio")]
pub mod tokio_impl {
    //! Adapts a [`tokio::sync::mpsc::Receiver`] of `String` chunks into a
    //! [`ChunkSource`], the shape a model-token channel typically arrives in.

    use super::ChunkSource;
    use tokio::sync::mpsc::Receiver;

    pub struct ChannelSource {
        rx: Receiver<String>,
    }

    impl ChannelSource {
        pub fn new(rx: Receiver<String>) -> Self {
            Self { rx }
        }
    }

    impl ChunkSource for ChannelSource {
        type Error = std::convert::Infallible;

        async fn next_chunk(&mut self) -> std::result::Result<Option<String>, Self::Error> {
            Ok(self.rx.recv().await)
        }
    }
}
