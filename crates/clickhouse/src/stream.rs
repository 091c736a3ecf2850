//! Line splitting over a chunked response body.

use std::fmt::Display;

use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use sync_core::{Result, SyncError};

/// Yields one line at a time from a byte stream, holding at most one
/// partial line plus one chunk in memory.
pub struct LineStream {
    inner: BoxStream<'static, std::result::Result<Bytes, String>>,
    buffer: Vec<u8>,
    start: usize,
    exhausted: bool,
}

impl LineStream {
    pub fn new<S, E>(stream: S) -> Self
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
        E: Display,
    {
        Self {
            inner: stream.map(|chunk| chunk.map_err(|e| e.to_string())).boxed(),
            buffer: Vec::new(),
            start: 0,
            exhausted: false,
        }
    }

    pub fn from_response(response: reqwest::Response) -> Self {
        Self::new(response.bytes_stream())
    }

    /// Next line without its terminator, or `None` at end of stream. A final
    /// line without a trailing newline is still returned.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(offset) = self.buffer[self.start..].iter().position(|&b| b == b'\n') {
                let end = self.start + offset;
                let line = decode(&self.buffer[self.start..end])?;
                self.start = end + 1;
                return Ok(Some(line));
            }

            if self.exhausted {
                if self.start == self.buffer.len() {
                    return Ok(None);
                }
                let line = decode(&self.buffer[self.start..])?;
                self.start = self.buffer.len();
                return Ok(Some(line));
            }

            if self.start > 0 {
                self.buffer.drain(..self.start);
                self.start = 0;
            }

            match self.inner.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    return Err(SyncError::query(format!(
                        "failed to read response stream: {e}"
                    )))
                }
                None => self.exhausted = true,
            }
        }
    }
}

fn decode(line: &[u8]) -> Result<String> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8(line.to_vec())
        .map_err(|e| SyncError::query(format!("response line is not valid UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&'static str]) -> LineStream {
        let items: Vec<std::result::Result<Bytes, std::io::Error>> = parts
            .iter()
            .map(|p| Ok(Bytes::from_static(p.as_bytes())))
            .collect();
        LineStream::new(futures::stream::iter(items))
    }

    async fn collect(mut lines: LineStream) -> Result<Vec<String>> {
        let mut out = Vec::new();
        while let Some(line) = lines.next_line().await? {
            out.push(line);
        }
        Ok(out)
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let lines = chunks(&["[\"id\"]\n[\"In", "t64\"]\n[1]\n[", "2]\n"]);
        assert_eq!(
            collect(lines).await.unwrap(),
            vec!["[\"id\"]", "[\"Int64\"]", "[1]", "[2]"]
        );
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline() {
        let lines = chunks(&["a\r\nb"]);
        assert_eq!(collect(lines).await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_empty_stream() {
        assert!(collect(chunks(&[])).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stream_error_is_query_error() {
        let items: Vec<std::result::Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"[1]\n")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ];
        let mut lines = LineStream::new(futures::stream::iter(items));
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("[1]"));
        let err = lines.next_line().await.unwrap_err();
        assert!(matches!(err, SyncError::Query(_)));
    }
}
