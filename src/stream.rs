//! Incremental answer delivery.
//!
//! [`AnswerPresenter`] walks a single answer through
//! `Preparing → Emitting(0..n) → Citing → Done`, sleeping for a fixed pacing
//! delay before every token. The citation reference is sent once, after the
//! last token. A [`CancelHandle`] stops the walk at any point: the presenter
//! moves straight to `Done` and emits nothing further, while anything
//! already sent stays sent. Answers without citations short-circuit to a
//! single [`StreamEvent::NoContent`].

use std::time::Duration;

use futures_util::Stream;
use serde_json::json;
use tokio::sync::watch;

use crate::models::{Answer, CitationRef};

/// Frame text sent when no document matches.
pub const NO_CONTENT_EVENT: &str = "No relevant content found.";

/// One frame of a streamed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Token(String),
    Citation(CitationRef),
    NoContent,
}

impl StreamEvent {
    /// Payload of the event frame: the word, the citation JSON, or the
    /// no-content message.
    pub fn frame_data(&self) -> String {
        match self {
            StreamEvent::Token(word) => word.clone(),
            StreamEvent::Citation(c) => json!({ "citation": c }).to_string(),
            StreamEvent::NoContent => NO_CONTENT_EVENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenterState {
    Preparing,
    Emitting(usize),
    Citing,
    Done,
}

/// Sender half of a cancellation signal.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

/// Receiver half of a cancellation signal, owned by a presenter.
#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelSignal(rx))
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }

    /// Cancel automatically when the returned guard is dropped.
    pub fn drop_guard(self) -> CancelOnDrop {
        CancelOnDrop(self)
    }
}

/// Cancels its signal when dropped, e.g. when a client disconnects and the
/// response body holding it goes away.
#[derive(Debug)]
pub struct CancelOnDrop(CancelHandle);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once cancellation is requested. Never resolves if the handle
    /// is dropped without cancelling.
    async fn cancelled(&mut self) {
        let closed = self.0.wait_for(|c| *c).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

/// Token-by-token presenter for one answer.
#[derive(Debug)]
pub struct AnswerPresenter {
    state: PresenterState,
    tokens: Vec<String>,
    citation: Option<CitationRef>,
    pacing: Duration,
    cancel: CancelSignal,
}

impl AnswerPresenter {
    pub fn new(answer: &Answer, pacing: Duration, cancel: CancelSignal) -> Self {
        let citation = answer.citations.first().map(|c| c.reference());
        let tokens = if citation.is_some() {
            answer.answer.split_whitespace().map(String::from).collect()
        } else {
            Vec::new()
        };
        Self {
            state: PresenterState::Preparing,
            tokens,
            citation,
            pacing,
            cancel,
        }
    }

    pub fn state(&self) -> PresenterState {
        self.state
    }

    /// Advance the state machine and return the next event, or `None` once
    /// the answer is complete or cancelled.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            if self.state != PresenterState::Done && self.cancel.is_cancelled() {
                tracing::debug!(state = ?self.state, "answer stream cancelled");
                self.state = PresenterState::Done;
            }

            match self.state {
                PresenterState::Preparing => match self.citation {
                    None => {
                        self.state = PresenterState::Done;
                        return Some(StreamEvent::NoContent);
                    }
                    Some(_) if self.tokens.is_empty() => self.state = PresenterState::Citing,
                    Some(_) => self.state = PresenterState::Emitting(0),
                },
                PresenterState::Emitting(i) => {
                    let pacing = self.pacing;
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => {
                            tracing::debug!(token = i, "answer stream cancelled mid-token");
                            self.state = PresenterState::Done;
                            return None;
                        }
                        _ = tokio::time::sleep(pacing) => {}
                    }
                    self.state = if i + 1 < self.tokens.len() {
                        PresenterState::Emitting(i + 1)
                    } else {
                        PresenterState::Citing
                    };
                    return Some(StreamEvent::Token(self.tokens[i].clone()));
                }
                PresenterState::Citing => {
                    self.state = PresenterState::Done;
                    return self.citation.map(StreamEvent::Citation);
                }
                PresenterState::Done => return None,
            }
        }
    }

    /// Drive the presenter as a stream of events.
    pub fn into_stream(self) -> impl Stream<Item = StreamEvent> {
        futures_util::stream::unfold(self, |mut presenter| async move {
            presenter.next_event().await.map(|event| (event, presenter))
        })
    }
}
