//! Scan engine input
//!
//! A `ScanSource` is polled by the scan worker on a fixed cadence. The
//! line-based source covers keyboard-wedge scanners and piped input: each
//! newline-terminated line is one scan.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Result of one poll of the scan engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanFrame {
    /// A barcode was read
    Code(String),
    /// Nothing in view this tick
    Empty,
    /// Source is gone; the worker stops
    Closed,
}

#[async_trait]
pub trait ScanSource: Send {
    async fn poll(&mut self) -> ScanFrame;
}

/// Scans delivered as lines over a channel
pub struct LineSource {
    rx: mpsc::Receiver<String>,
}

impl LineSource {
    /// Wrap an existing channel (tests, embedded callers)
    pub fn from_receiver(rx: mpsc::Receiver<String>) -> Self {
        Self { rx }
    }

    /// Read lines from `reader` on a background task
    pub fn spawn<R>(reader: R, capacity: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if tx.send(line).await.is_err() {
                            debug!("scan_reader_receiver_dropped");
                            break;
                        }
                    }
                    Ok(None) => {
                        info!("scan_reader_eof");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "scan_reader_error");
                        break;
                    }
                }
            }
        });
        Self { rx }
    }
}

#[async_trait]
impl ScanSource for LineSource {
    async fn poll(&mut self) -> ScanFrame {
        loop {
            match self.rx.try_recv() {
                Ok(line) => {
                    let code = line.trim();
                    if code.is_empty() {
                        continue;
                    }
                    return ScanFrame::Code(code.to_string());
                }
                Err(mpsc::error::TryRecvError::Empty) => return ScanFrame::Empty,
                Err(mpsc::error::TryRecvError::Disconnected) => return ScanFrame::Closed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_source_frames() {
        let (tx, rx) = mpsc::channel(4);
        let mut source = LineSource::from_receiver(rx);
        assert_eq!(source.poll().await, ScanFrame::Empty);

        tx.send("  ".to_string()).await.unwrap();
        tx.send("2025874002804\r".to_string()).await.unwrap();
        assert_eq!(source.poll().await, ScanFrame::Code("2025874002804".to_string()));

        drop(tx);
        assert_eq!(source.poll().await, ScanFrame::Closed);
    }

    #[tokio::test]
    async fn test_reader_source_reads_lines_then_closes() {
        let input: &'static [u8] = b"1234500250\n\n5555500100\n";
        let mut source = LineSource::spawn(input, 8);

        let mut codes = Vec::new();
        loop {
            match source.poll().await {
                ScanFrame::Code(code) => codes.push(code),
                ScanFrame::Empty => tokio::task::yield_now().await,
                ScanFrame::Closed => break,
            }
        }
        assert_eq!(codes, vec!["1234500250".to_string(), "5555500100".to_string()]);
    }
}
