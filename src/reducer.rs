//! The synchronized reducer wrapper (§4.F): every dispatched event first
//! folds into local state, then — only once the fold succeeds — is pushed
//! onto an outbound event stream, in that exact order. A fold failure never
//! reaches the sink.

use thiserror::Error;

use crate::error::JsonError;

/// An outbound destination events are pushed to after a successful fold.
pub trait EventSink<E> {
    type Error: std::error::Error + Send + Sync + 'static;

    fn push(
        &mut self,
        event: E,
    ) -> impl std::future::Future<Output = std::result::Result<(), Self::Error>>;
}

#[derive(Debug, Error)]
pub enum ReducerError<SinkErr>
where
    SinkErr: std::error::Error + 'static,
{
    #[error("fold failed: {0}")]
    Fold(JsonError),

    #[error("sink push failed: {0}")]
    Sink(SinkErr),
}

/// Folds dispatched events into a piece of state `T` while forwarding each
/// one, in order, to an [`EventSink`].
pub struct Reducer<T, K> {
    state: T,
    sink: K,
}

impl<T, K> Reducer<T, K> {
    pub fn new(initial: T, sink: K) -> Self {
        Self {
            state: initial,
            sink,
        }
    }

    pub fn state(&self) -> &T {
        &self.state
    }

    /// Consumes the reducer, returning the final state.
    pub fn done(self) -> T {
        self.state
    }
}

impl<T, K> Reducer<T, K> {
    /// Folds `event` into state via `fold`, then — only if that succeeds —
    /// pushes `event` to the sink. A fold error short-circuits before the
    /// sink is ever touched, so the outbound stream never observes an
    /// event the local state didn't also absorb.
    pub async fn dispatch<E, F>(&mut self, event: E, fold: F) -> Result<(), ReducerError<K::Error>>
    where
        K: EventSink<E>,
        F: FnOnce(&mut T, &E) -> Result<(), JsonError>,
    {
        fold(&mut self.state, &event).map_err(ReducerError::Fold)?;
        self.sink.push(event).await.map_err(ReducerError::Sink)?;
        Ok(())
    }
}

#[cfg(feature = "tokio")]
pub mod tokio_impl {
    //! Adapts a [`tokio::sync::mpsc::Sender`] into an [`EventSink`].

    use super::EventSink;
    use tokio::sync::mpsc::Sender;

    pub struct ChannelSink<E> {
        tx: Sender<E>,
    }

    impl<E> ChannelSink<E> {
        pub fn new(tx: Sender<E>) -> Self {
            Self { tx }
        }
    }

    impl<E: Send + 'static> EventSink<E> for ChannelSink<E> {
        type Error = tokio::sync::mpsc::error::SendError<E>;

        async fn push(&mut self, event: E) -> std::result::Result<(), Self::Error> {
            self.tx.send(event).await
        }
    }
}
