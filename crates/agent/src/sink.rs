//! Ordered event delivery from a running agent loop to one consumer.
//!
//! The producer side ([`EventSink`]) never blocks. The consumer side
//! ([`AgentEventStream`]) yields every event once, in push order, and ends
//! right after the first terminal event. [`spawn_agent_stream`] guarantees a
//! terminal event is always pushed, even if the loop task panics.

use futures::Stream;
use ragent_core::message::Transcript;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use crate::loop_runner::{AgentLoop, StopReason};
use crate::stream_event::AgentStreamEvent;

/// Push side of an agent event channel.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<AgentStreamEvent>,
}

impl EventSink {
    /// Create a connected sink/stream pair.
    pub fn channel() -> (EventSink, AgentEventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            EventSink { tx },
            AgentEventStream {
                rx,
                finished: false,
            },
        )
    }

    /// Push an event. Returns `false` once the consumer has gone away.
    pub fn push(&self, event: AgentStreamEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Pull side of an agent event channel.
#[derive(Debug)]
pub struct AgentEventStream {
    rx: mpsc::UnboundedReceiver<AgentStreamEvent>,
    finished: bool,
}

impl Stream for AgentEventStream {
    type Item = AgentStreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                if event.is_terminal() {
                    this.finished = true;
                    this.rx.close();
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Owns the obligation to push exactly one terminal event.
///
/// Dropping an unfinished guard pushes an `error` event, which covers a
/// panicking or aborted loop task.
struct TerminalGuard {
    sink: EventSink,
    finished: bool,
}

impl TerminalGuard {
    fn new(sink: EventSink) -> Self {
        Self {
            sink,
            finished: false,
        }
    }

    fn finish(mut self, event: AgentStreamEvent) {
        self.finished = true;
        self.sink.push(event);
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if !self.finished {
            error!("Agent task ended without a terminal event");
            self.sink.push(AgentStreamEvent::Error {
                message: "agent task ended unexpectedly".into(),
            });
        }
    }
}

/// Run the agent loop on a background task and stream its events.
///
/// The returned stream always ends with a `done` or `error` event.
pub fn spawn_agent_stream(
    agent: Arc<AgentLoop>,
    transcript: Transcript,
    cancel: CancellationToken,
) -> AgentEventStream {
    let (sink, stream) = EventSink::channel();
    tokio::spawn(async move {
        let guard = TerminalGuard::new(sink.clone());
        match agent.run(transcript, Some(&sink), &cancel).await {
            Ok(outcome) => {
                debug!(iterations = outcome.iterations, "Agent stream finished");
                guard.finish(AgentStreamEvent::Done {
                    iterations: outcome.iterations,
                    tool_calls_made: outcome.tool_calls_made,
                    truncated: outcome.stop_reason == StopReason::MaxIterations,
                    usage: Some(outcome.usage),
                });
            }
            Err(e) => guard.finish(AgentStreamEvent::Error {
                message: e.to_string(),
            }),
        }
    });
    stream
}
