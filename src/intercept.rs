//! Status interception for responses the multiplexer writes itself.
//!
//! [`Mux`](crate::Mux) answers unmatched requests with hard-coded 404 and 405
//! bodies, and there is no hook to change that. Instead the router hands the
//! multiplexer a decorated writer: when a status with a registered override
//! is written, the status line and every following body byte are swallowed,
//! and the router runs the override afterwards, behind a fresh eraser.
//!
//! Two decorators, nested by ownership:
//!
//! ```text
//! StatusInterceptor  ─ decides: forward, or swallow and remember the status
//!   └ HeaderEraser   ─ strips DO_NOT_INTERCEPT right before the status leaves
//!       └ real writer
//! ```
//!
//! A handler that must send a genuine 404 (or any other overridden status)
//! sets [`DO_NOT_INTERCEPT`] before writing the status. The eraser removes it
//! again, so clients never see it.

use std::collections::HashSet;
use std::io;

use http::{HeaderMap, HeaderName, StatusCode};
use tracing::debug;

use crate::writer::ResponseWriter;

/// Escape flag: present on the pending headers when the status is written,
/// it makes that response bypass interception.
pub const DO_NOT_INTERCEPT: HeaderName = HeaderName::from_static("x-do-not-intercept");

/// Removes reserved headers at the moment headers are committed.
pub struct HeaderEraser<'a> {
    inner: &'a mut dyn ResponseWriter,
    erased: Vec<HeaderName>,
    committed: bool,
}

impl<'a> HeaderEraser<'a> {
    pub fn new(inner: &'a mut dyn ResponseWriter, erased: impl IntoIterator<Item = HeaderName>) -> Self {
        Self { inner, erased: erased.into_iter().collect(), committed: false }
    }
}

impl ResponseWriter for HeaderEraser<'_> {
    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        let headers = self.inner.headers_mut();
        for name in &self.erased {
            headers.remove(name);
        }
        self.committed = true;
        self.inner.write_header(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.committed {
            self.write_header(StatusCode::OK);
        }
        self.inner.write(buf)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    Forwarded,
    Intercepted(StatusCode),
}

/// Swallows responses whose status has an override registered.
///
/// A status is intercepted when it is in the override set and
/// [`DO_NOT_INTERCEPT`] is absent from the pending headers. Statuses with no
/// override always pass through, so nothing is ever dropped without a
/// replacement.
pub struct StatusInterceptor<W> {
    inner: W,
    overridden: HashSet<StatusCode>,
    state: State,
}

impl<W: ResponseWriter> StatusInterceptor<W> {
    pub fn new(inner: W, overridden: HashSet<StatusCode>) -> Self {
        Self { inner, overridden, state: State::Idle }
    }

    /// The swallowed status, if this response was intercepted.
    pub fn intercepted(&self) -> Option<StatusCode> {
        match self.state {
            State::Intercepted(status) => Some(status),
            _ => None,
        }
    }

    fn should_intercept(&self, status: StatusCode) -> bool {
        self.overridden.contains(&status) && !self.inner.headers().contains_key(&DO_NOT_INTERCEPT)
    }
}

impl<W: ResponseWriter> ResponseWriter for StatusInterceptor<W> {
    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        match self.state {
            State::Intercepted(_) => {}
            State::Idle if self.should_intercept(status) => {
                debug!(%status, "response intercepted");
                self.state = State::Intercepted(status);
            }
            _ => {
                self.state = State::Forwarded;
                self.inner.write_header(status);
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.state {
            State::Intercepted(_) => Ok(buf.len()),
            State::Idle => {
                // Bytes before a status carry an implicit 200 downstream.
                self.state = State::Forwarded;
                self.inner.write(buf)
            }
            State::Forwarded => self.inner.write(buf),
        }
    }
}
