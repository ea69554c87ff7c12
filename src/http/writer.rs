use std::io::{self, Write};

use crate::http::response::Response;

/// Pushes one serialized response through a blocking writer.
pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
    attempts: usize,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self::from_bytes(response.serialize())
    }

    pub fn from_bytes(buffer: Vec<u8>) -> Self {
        Self {
            buffer,
            written: 0,
            attempts: 0,
        }
    }

    /// Writes the remaining bytes, looping over partial writes.
    ///
    /// On error the bytes already written stay written; the rest are
    /// abandoned by the caller.
    pub fn write_to<W: Write>(&mut self, stream: &mut W) -> io::Result<()> {
        while self.written < self.buffer.len() {
            self.attempts += 1;
            match stream.write(&self.buffer[self.written..]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "connection closed while writing",
                    ));
                }
                Ok(n) => self.written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        stream.flush()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Number of `write` calls issued so far.
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts at most `chunk` bytes per call.
    struct Trickle {
        out: Vec<u8>,
        chunk: usize,
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.chunk);
            self.out.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn partial_writes_are_retried_until_done() {
        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let mut writer = ResponseWriter::from_bytes(payload.clone());
        let mut sink = Trickle {
            out: Vec::new(),
            chunk: 1000,
        };

        writer.write_to(&mut sink).unwrap();

        assert_eq!(sink.out, payload);
        assert_eq!(writer.written(), payload.len());
        assert_eq!(writer.attempts(), 10);
    }

    #[test]
    fn zero_length_write_is_an_error() {
        let mut writer = ResponseWriter::from_bytes(b"abc".to_vec());
        let mut sink = Trickle {
            out: Vec::new(),
            chunk: 0,
        };

        let err = writer.write_to(&mut sink).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
        assert_eq!(writer.written(), 0);
    }
}
