use std::io::{self, Read};

use crate::{GrammarBuildError, GrammarBuildResult, GrammarErrorKind, Span};

const READ_CHUNK: usize = 4096;

/// A buffered byte reader over the grammar input with the small capability set the DSL tokeniser
/// needs: `n`-byte lookahead, single-byte consume/unread, and whitespace skipping.
///
/// Bytes fetched from `inner` are retained in `buf`; `pos` indexes the next unconsumed byte.
/// Grammar sources are small, so the consumed prefix is never discarded, which keeps `unread`
/// and span offsets exact no matter how `inner` chunks its reads.
pub struct DslReader<R: Read> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    eof: bool,
}

impl<R: Read> DslReader<R> {
    pub fn new(inner: R) -> Self {
        DslReader {
            inner,
            buf: Vec::new(),
            pos: 0,
            eof: false,
        }
    }

    /// Byte offset of the next byte to be consumed.
    pub fn offset(&self) -> usize {
        self.pos
    }

    fn err_io(&self, e: io::Error) -> GrammarBuildError {
        GrammarBuildError::new(GrammarErrorKind::Io(e.kind()), Span::at(self.pos))
    }

    /// Ensure at least `n` unconsumed bytes are buffered, or that `inner` is exhausted.
    fn fill(&mut self, n: usize) -> GrammarBuildResult<()> {
        while !self.eof && self.buf.len() - self.pos < n {
            let mut chunk = [0u8; READ_CHUNK];
            match self.inner.read(&mut chunk) {
                Ok(0) => self.eof = true,
                Ok(m) => self.buf.extend_from_slice(&chunk[..m]),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => (),
                Err(e) => return Err(self.err_io(e)),
            }
        }
        Ok(())
    }

    /// Look ahead at up to `n` bytes without consuming them. The returned slice is shorter than
    /// `n` only at end of input.
    pub fn peek(&mut self, n: usize) -> GrammarBuildResult<&[u8]> {
        self.fill(n)?;
        let end = (self.pos + n).min(self.buf.len());
        Ok(&self.buf[self.pos..end])
    }

    /// Look ahead at the next byte, or `None` at end of input.
    pub fn peek_byte(&mut self) -> GrammarBuildResult<Option<u8>> {
        Ok(self.peek(1)?.first().copied())
    }

    /// Consume and return the next byte, or `None` at end of input.
    pub fn read_byte(&mut self) -> GrammarBuildResult<Option<u8>> {
        match self.peek_byte()? {
            Some(c) => {
                self.pos += 1;
                Ok(Some(c))
            }
            None => Ok(None),
        }
    }

    /// Consume `n` bytes which a prior `peek` has shown to be available.
    pub fn discard(&mut self, n: usize) {
        debug_assert!(self.buf.len() - self.pos >= n);
        self.pos += n;
    }

    /// Push the most recently consumed byte back onto the stream.
    pub fn unread(&mut self) {
        debug_assert!(self.pos > 0);
        self.pos = self.pos.saturating_sub(1);
    }

    /// Skip any run of ASCII whitespace.
    pub fn skip_ws(&mut self) -> GrammarBuildResult<()> {
        while let Some(c) = self.peek_byte()? {
            if !c.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
        Ok(())
    }
}
