//! Response body as a scoped, close-once resource.

use std::fmt;
use std::io::{self, Cursor, Read};

/// A readable, closable source of response bytes.
///
/// Implementations release whatever transport resource backs the body in
/// [`close`](BodyReader::close). [`Body`] guarantees `close` is invoked at
/// most once per reader.
pub trait BodyReader: Read + Send + Sync + fmt::Debug {
    /// Releases the underlying resource.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the resource could not be released cleanly.
    fn close(&mut self) -> io::Result<()>;
}

/// Fully buffered body content.
///
/// Reads fail once the body has been closed, unless the body is detached
/// (see [`Body::detached`]), in which case closing releases nothing and the
/// content stays readable.
#[derive(Debug)]
struct BufferedBody {
    content: Cursor<Vec<u8>>,
    closed: bool,
    detached: bool,
}

impl Read for BufferedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::other("read on closed body"));
        }
        self.content.read(buf)
    }
}

impl BodyReader for BufferedBody {
    fn close(&mut self) -> io::Result<()> {
        if !self.detached {
            self.closed = true;
        }
        Ok(())
    }
}

/// The body of an [`HttpResponse`](super::HttpResponse).
///
/// Exactly one owner closes a body. Closing twice is a no-op, and a body
/// dropped while still open is closed on drop.
pub struct Body {
    reader: Box<dyn BodyReader>,
    closed: bool,
}

impl Body {
    /// Wraps a custom reader.
    #[must_use]
    pub fn new(reader: impl BodyReader + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            closed: false,
        }
    }

    /// Creates a buffered body; reads fail after it is closed.
    #[must_use]
    pub fn from_bytes(content: impl Into<Vec<u8>>) -> Self {
        Self::new(BufferedBody {
            content: Cursor::new(content.into()),
            closed: false,
            detached: false,
        })
    }

    /// Creates a buffered body that is not backed by any resource.
    ///
    /// Closing it is a no-op and the content remains readable afterwards.
    /// Used to hand a body back to the caller after it has been inspected.
    #[must_use]
    pub fn detached(content: impl Into<Vec<u8>>) -> Self {
        Self::new(BufferedBody {
            content: Cursor::new(content.into()),
            closed: false,
            detached: true,
        })
    }

    /// Returns `true` until [`close`](Self::close) has been called.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        !self.closed
    }

    /// Reads the remaining content.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the reader fails or refuses reads after close.
    pub fn read_to_end(&mut self) -> io::Result<Vec<u8>> {
        let mut content = Vec::new();
        self.reader.read_to_end(&mut content)?;
        Ok(content)
    }

    /// Reads the remaining content as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading fails or the content is not UTF-8.
    pub fn read_to_string(&mut self) -> io::Result<String> {
        let mut content = String::new();
        self.reader.read_to_string(&mut content)?;
        Ok(content)
    }

    /// Closes the body. Subsequent calls do nothing.
    ///
    /// # Errors
    ///
    /// Returns the reader's error from the first close, if any.
    pub fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.reader.close()
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Drop for Body {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to close dropped response body: {e}");
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("reader", &self.reader)
            .field("closed", &self.closed)
            .finish()
    }
}
