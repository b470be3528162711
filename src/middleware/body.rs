//! Response body wrapper that counts bytes and fires the access record.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use axum::body::{Body, Bytes};
use http_body::{Body as HttpBody, Frame, SizeHint};

use crate::record::RequestSnapshot;

use super::logging::RequestLogger;

struct Pending {
    logger: RequestLogger,
    snapshot: RequestSnapshot,
    status: u16,
    bytes: u64,
}

/// Emits the access record exactly once: on [`EmitOnDrop::emit`] or when
/// dropped, whichever comes first.
pub struct EmitOnDrop(Option<Pending>);

impl EmitOnDrop {
    pub fn new(logger: RequestLogger, snapshot: RequestSnapshot) -> Self {
        Self(Some(Pending {
            logger,
            snapshot,
            status: 0,
            bytes: 0,
        }))
    }

    /// Records the response status. Only the first call has an effect.
    pub fn set_status(&mut self, status: u16) {
        if let Some(pending) = self.0.as_mut() {
            if pending.status == 0 {
                pending.status = status;
            }
        }
    }

    pub fn add_bytes(&mut self, len: usize) {
        if let Some(pending) = self.0.as_mut() {
            pending.bytes = pending.bytes.saturating_add(len as u64);
        }
    }

    pub fn emit(&mut self) {
        if let Some(pending) = self.0.take() {
            let record = pending.snapshot.finish(
                pending.status,
                pending.bytes,
                pending.logger.category(),
            );
            pending.logger.emit(&record);
        }
    }
}

impl Drop for EmitOnDrop {
    fn drop(&mut self) {
        self.emit();
    }
}

/// Pass-through body: frames are forwarded untouched while data lengths are
/// added to the guard. End of stream, an error, or dropping the body emits
/// the record.
pub struct LoggedBody {
    inner: Body,
    guard: EmitOnDrop,
}

impl LoggedBody {
    pub fn new(inner: Body, guard: EmitOnDrop) -> Self {
        Self { inner, guard }
    }
}

impl HttpBody for LoggedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;
        let polled = Pin::new(&mut this.inner).poll_frame(cx);

        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.guard.add_bytes(data.len());
                }
            }
            Poll::Ready(Some(Err(_))) | Poll::Ready(None) => this.guard.emit(),
            Poll::Pending => {}
        }

        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
