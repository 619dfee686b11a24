//! Async counterpart of [`Unbatch`](crate::Unbatch) over a stream of batches

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::{FusedStream, Stream, StreamExt};
use futures::ready;
use uuid::Uuid;

use unbatch_core::error::Result;
use unbatch_core::schema::ElementSpec;
use unbatch_core::Record;

use crate::config::UnbatchConfig;
use crate::unbatch::{Cursor, Step};

/// Stream of elements split from an upstream stream of batches
///
/// Upstream is polled only once the previous batch is fully emitted.
#[derive(Debug)]
pub struct UnbatchStream<St> {
    upstream: St,
    cursor: Cursor,
}

impl<St> UnbatchStream<St>
where
    St: Stream<Item = Result<Record>> + Unpin,
{
    /// Wrap `upstream`, whose batches are declared by `spec`
    pub fn new(upstream: St, spec: Arc<ElementSpec>) -> Result<Self> {
        Self::with_config(upstream, spec, UnbatchConfig::default())
    }

    /// Wrap `upstream` with an explicit configuration
    pub fn with_config(upstream: St, spec: Arc<ElementSpec>, config: UnbatchConfig) -> Result<Self> {
        Ok(Self {
            upstream,
            cursor: Cursor::new(spec, config)?,
        })
    }

    /// Spec of the produced elements
    pub fn element_spec(&self) -> Arc<ElementSpec> {
        self.cursor.plan().element_spec().clone()
    }

    /// Identifier recorded in this stream's log events
    pub fn id(&self) -> Uuid {
        self.cursor.id()
    }

    /// Number of elements emitted
    pub fn elements_produced(&self) -> u64 {
        self.cursor.elements_produced()
    }
}

impl<St> Stream for UnbatchStream<St>
where
    St: Stream<Item = Result<Record>> + Unpin,
{
    type Item = Result<Record>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            match this.cursor.step() {
                Step::Element(element) => return Poll::Ready(Some(element)),
                Step::Exhausted => return Poll::Ready(None),
                Step::NeedBatch => {
                    let batch = match ready!(this.upstream.poll_next_unpin(cx)).transpose() {
                        Ok(batch) => batch,
                        Err(e) => return Poll::Ready(Some(Err(e))),
                    };
                    if let Err(e) = this.cursor.accept(batch) {
                        return Poll::Ready(Some(Err(e)));
                    }
                }
            }
        }
    }
}

impl<St> FusedStream for UnbatchStream<St>
where
    St: Stream<Item = Result<Record>> + Unpin,
{
    fn is_terminated(&self) -> bool {
        self.cursor.is_exhausted()
    }
}
