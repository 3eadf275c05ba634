//! Progress bar and a log writer that does not tear it.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

/// Build the run progress bar, hidden when `enabled` is false.
pub(crate) fn run_progress_bar(
    len: u64,
    enabled: bool,
) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    if !enabled {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Log writer that prints each event with the progress bar suspended.
#[derive(Debug, Clone)]
pub(crate) struct ProgressWriter {
    bar: ProgressBar,
}

impl ProgressWriter {
    pub(crate) const fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl<'a> MakeWriter<'a> for ProgressWriter {
    type Writer = ProgressLine;

    fn make_writer(&'a self) -> Self::Writer {
        ProgressLine {
            bar: self.bar.clone(),
            buf: Vec::new(),
        }
    }
}

/// One buffered log event, flushed to stderr on drop.
#[derive(Debug)]
pub(crate) struct ProgressLine {
    bar: ProgressBar,
    buf: Vec<u8>,
}

impl Write for ProgressLine {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ProgressLine {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let buf = std::mem::take(&mut self.buf);
        self.bar.suspend(|| {
            let _ = io::stderr().write_all(&buf);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar() {
        let pb = run_progress_bar(10, false).unwrap();
        assert!(pb.is_hidden());
    }

    #[test]
    fn test_line_buffers_until_drop() {
        let writer = ProgressWriter::new(ProgressBar::hidden());
        let mut line = writer.make_writer();
        line.write_all(b"hello ").unwrap();
        line.write_all(b"world\n").unwrap();
        assert_eq!(line.buf, b"hello world\n");
    }
}
