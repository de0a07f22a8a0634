//! Buffered FastJ output.
//!
//! Headers are serialized straight into the output buffer and the sequence
//! body is wrapped without intermediate allocation.

use crate::fastj::FastjHeader;
use crate::streaming::buffers::{DEFAULT_OUTPUT_BUFFER, FASTJ_LINE_WIDTH};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Open an output path for writing; `-` is stdout, a `.gz` path is gzip-encoded.
pub fn open_output<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn Write + Send>> {
    let path = path.as_ref();
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdout()));
    }
    let file = File::create(path)?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(GzEncoder::new(file, Compression::default())))
    } else {
        Ok(Box::new(file))
    }
}

/// High-throughput FastJ record writer.
pub struct FastjWriter<W: Write> {
    writer: BufWriter<W>,
    line_width: usize,
    records_written: usize,
}

impl<W: Write> FastjWriter<W> {
    /// Create a new writer with the default 2MB buffer.
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_OUTPUT_BUFFER, output)
    }

    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            line_width: FASTJ_LINE_WIDTH,
            records_written: 0,
        }
    }

    /// Write one record: `> ` + JSON header, the wrapped body, a blank line.
    pub fn write_record(&mut self, header: &FastjHeader, seq: &[u8]) -> io::Result<()> {
        self.writer.write_all(b"> ")?;
        serde_json::to_writer(&mut self.writer, header)?;
        self.writer.write_all(b"\n")?;
        for line in seq.chunks(self.line_width) {
            self.writer.write_all(line)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.write_all(b"\n")?;
        self.records_written += 1;
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Flush the output buffer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
