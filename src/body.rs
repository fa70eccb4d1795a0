//! The response body type.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::stream::{BoxStream, Stream};
use http::header::HeaderMap;
use http_body::Body as HttpBody;

/// Body of every response the handler produces.
///
/// Implements both `Stream` and `http_body::Body`, so it plugs straight
/// into hyper and, with a thin adapter, into stream-oriented frameworks.
/// Buffered responses (multistatus documents, empty bodies) are a single
/// chunk; file contents are streamed.
pub struct Body {
    inner: Inner,
}

enum Inner {
    Once(Option<Bytes>),
    Streaming(BoxStream<'static, io::Result<Bytes>>),
}

impl Body {
    /// An empty body.
    pub fn empty() -> Body {
        Body {
            inner: Inner::Once(None),
        }
    }

    /// A body that yields the stream's chunks.
    pub fn stream(stream: impl Stream<Item = io::Result<Bytes>> + Send + 'static) -> Body {
        Body {
            inner: Inner::Streaming(Box::pin(stream)),
        }
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Body {
        Body {
            inner: Inner::Once(Some(b)),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Body {
        Body::from(Bytes::from(v))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Body {
        Body::from(Bytes::from(s))
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Body {
        Body::from(s.to_string())
    }
}

impl Stream for Body {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        match &mut self.get_mut().inner {
            Inner::Once(bytes) => Poll::Ready(bytes.take().map(Ok)),
            Inner::Streaming(stream) => stream.as_mut().poll_next(cx),
        }
    }
}

impl HttpBody for Body {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_data(
        self: Pin<&mut Self>,
        cx: &mut Context,
    ) -> Poll<Option<Result<Self::Data, Self::Error>>> {
        self.poll_next(cx)
    }

    fn poll_trailers(
        self: Pin<&mut Self>,
        _cx: &mut Context,
    ) -> Poll<Result<Option<HeaderMap>, Self::Error>> {
        Poll::Ready(Ok(None))
    }
}
