//! The response-writer capability every handler writes through.
//!
//! A handler sets headers, then a status, then body bytes. Writing bytes
//! before a status implies `200 OK`. Keeping the capability this small is
//! what lets [`intercept`](crate::intercept) stack decorators around the real
//! writer without the multiplexer noticing.

use std::io;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use tracing::warn;

/// Minimal response sink: headers, one status line, body bytes.
pub trait ResponseWriter {
    fn headers(&self) -> &HeaderMap;

    /// Headers still pending. Changes made after the status is written have
    /// no effect on what the client receives.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Commits the status line and the current headers. Only the first call
    /// counts.
    fn write_header(&mut self, status: StatusCode);

    /// Appends body bytes, committing `200 OK` first if no status was written.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
}

/// The real writer at the bottom of every decorator stack.
///
/// Buffers the whole response, then becomes an `http::Response` for the
/// transport. Tests drive routers with it directly.
#[derive(Debug, Default)]
pub struct Recorder {
    headers: HeaderMap,
    committed: Option<(StatusCode, HeaderMap)>,
    body: BytesMut,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed status, or `200` if nothing was written yet.
    pub fn status(&self) -> StatusCode {
        self.committed.as_ref().map_or(StatusCode::OK, |(s, _)| *s)
    }

    /// Whether a status line has been committed.
    pub fn is_committed(&self) -> bool {
        self.committed.is_some()
    }

    /// The headers the client would see.
    pub fn sent_headers(&self) -> &HeaderMap {
        self.committed.as_ref().map_or(&self.headers, |(_, h)| h)
    }

    /// Convenience lookup on [`sent_headers`](Self::sent_headers).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.sent_headers().get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let (status, headers) = self.committed.unwrap_or((StatusCode::OK, self.headers));
        let mut res = http::Response::new(Full::new(self.body.freeze()));
        *res.status_mut() = status;
        *res.headers_mut() = headers;
        res
    }
}

impl ResponseWriter for Recorder {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        if let Some((first, _)) = &self.committed {
            warn!(first = %first, ignored = %status, "superfluous write_header call");
            return;
        }
        self.committed = Some((status, self.headers.clone()));
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.committed.is_none() {
            self.write_header(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }
}
