use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, trace, warn};

use crate::encoder::DownstreamFrame;
use crate::error::{BridgeError, TransformError};
use crate::events::{parse_line, ParsedLine};
use crate::extract::extract;
use crate::sse::LineReader;
use crate::types::SseField;

/// What one upstream line turned into. Collapsed to "emit nothing" unless it
/// produced frames.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Frames(Vec<DownstreamFrame>),
    Metadata(SseField),
    Ignored,
}

/// Run one line through parser and extractor.
pub fn process_line(line: &str) -> LineOutcome {
    match parse_line(line) {
        None => LineOutcome::Ignored,
        Some(ParsedLine::Field(field)) => LineOutcome::Metadata(field),
        Some(ParsedLine::Turn(event)) => {
            let frames = extract(&event).into_frames();
            if frames.is_empty() {
                LineOutcome::Ignored
            } else {
                LineOutcome::Frames(frames)
            }
        }
    }
}

/// Owns the upstream body. Dropping it releases the connection.
struct UpstreamGuard<S> {
    stream: Pin<Box<S>>,
}

/// Transcodes an upstream agent SSE byte stream into downstream text-delta
/// frames, one pass, pulled by the consumer.
///
/// Each upstream chunk is split into lines, parsed, extracted and encoded;
/// the resulting frames are yielded before upstream is polled again. The
/// stream ends after the completion sentinel, when upstream is exhausted, or
/// on a transport error (without a sentinel). Upstream is released exactly
/// once on every one of those paths, and when the transformer is dropped.
pub struct ResponseTransformer<S> {
    upstream: Option<UpstreamGuard<S>>,
    reader: LineReader,
    queue: VecDeque<Bytes>,
    pending_error: Option<TransformError>,
    done_emitted: bool,
    finished: bool,
    lines_processed: usize,
    frames_emitted: usize,
}

impl<S> ResponseTransformer<S> {
    pub fn new(upstream: S) -> Self {
        Self {
            upstream: Some(UpstreamGuard {
                stream: Box::pin(upstream),
            }),
            reader: LineReader::new(),
            queue: VecDeque::new(),
            pending_error: None,
            done_emitted: false,
            finished: false,
            lines_processed: 0,
            frames_emitted: 0,
        }
    }

    pub fn lines_processed(&self) -> usize {
        self.lines_processed
    }

    pub fn frames_emitted(&self) -> usize {
        self.frames_emitted
    }

    /// Whether upstream has been let go.
    pub fn is_released(&self) -> bool {
        self.upstream.is_none()
    }

    fn release(&mut self, reason: &'static str) {
        if let Some(guard) = self.upstream.take() {
            drop(guard);
            debug!(reason, "upstream released");
        }
    }

    fn finish(&mut self, reason: &'static str) {
        if self.finished {
            return;
        }
        self.release(reason);
        self.finished = true;
        info!(
            reason,
            lines = self.lines_processed,
            frames = self.frames_emitted,
            completed = self.done_emitted,
            "transform finished"
        );
    }

    fn handle_lines(&mut self, lines: impl IntoIterator<Item = String>) -> Result<(), TransformError> {
        for line in lines {
            if self.done_emitted {
                trace!("turn already complete, skipping remaining lines");
                break;
            }
            self.handle_line(&line)?;
        }
        Ok(())
    }

    fn handle_line(&mut self, line: &str) -> Result<(), TransformError> {
        self.lines_processed += 1;
        match process_line(line) {
            LineOutcome::Frames(frames) => {
                for frame in frames {
                    self.queue.push_back(frame.encode()?);
                    self.frames_emitted += 1;
                    if frame.is_done() {
                        self.done_emitted = true;
                        break;
                    }
                }
            }
            LineOutcome::Metadata(field) => {
                trace!(kind = field.kind.name(), value = %field.value, "sse metadata");
            }
            LineOutcome::Ignored => {}
        }
        Ok(())
    }
}

impl<S> Drop for ResponseTransformer<S> {
    fn drop(&mut self) {
        if !self.is_released() {
            info!(
                lines = self.lines_processed,
                frames = self.frames_emitted,
                "downstream went away before the turn finished"
            );
        }
        self.release("consumer dropped");
    }
}

impl<S, E> Stream for ResponseTransformer<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    type Item = Result<Bytes, TransformError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            if let Some(frame) = this.queue.pop_front() {
                return Poll::Ready(Some(Ok(frame)));
            }
            if let Some(e) = this.pending_error.take() {
                return Poll::Ready(Some(Err(e)));
            }
            if this.finished {
                return Poll::Ready(None);
            }
            if this.done_emitted {
                this.finish("turn complete");
                continue;
            }

            let Some(upstream) = this.upstream.as_mut() else {
                this.finish("upstream already released");
                continue;
            };

            let polled = upstream.stream.as_mut().poll_next(cx);
            let result = match polled {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(chunk))) => {
                    let lines = this.reader.feed(&chunk);
                    this.handle_lines(lines)
                }
                Poll::Ready(Some(Err(e))) => {
                    warn!(error = %e, "upstream transport error, ending stream");
                    this.finish("transport error");
                    Ok(())
                }
                Poll::Ready(None) => {
                    let residual = this.reader.finish();
                    let result = this.handle_lines(residual);
                    this.finish("upstream exhausted");
                    result
                }
            };

            if let Err(e) = result {
                warn!(error = %e, "transcoder fault, ending stream");
                this.pending_error = Some(e);
                this.finish("encode error");
            }
        }
    }
}

/// Transcode an upstream SSE capture from `reader` into `writer`, reading at
/// most `chunk_size` bytes at a time. Returns the number of frames written.
pub async fn transcode<R, W>(reader: R, mut writer: W, chunk_size: usize) -> Result<usize, BridgeError>
where
    R: AsyncRead,
    W: AsyncWrite + Unpin,
{
    let upstream = ReaderStream::with_capacity(reader, chunk_size.max(1));
    let mut frames = ResponseTransformer::new(upstream);
    let mut written = 0;

    while let Some(frame) = frames.next().await {
        writer.write_all(&frame?).await?;
        writer.flush().await?;
        written += 1;
    }

    Ok(written)
}
