//! Zero-allocation diff-line parsing utilities and input opening.
//!
//! These functions keep the per-line hot path free of heap allocation:
//! fields are located with memchr and coordinates parsed straight from bytes.

use crate::streaming::buffers::DEFAULT_INPUT_BUFFER;
use flate2::read::MultiGzDecoder;
use memchr::memchr;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Gzip magic bytes.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Fast u64 parsing - no allocation, no error formatting.
///
/// Returns None if the input is empty or contains non-digit characters.
#[inline(always)]
pub fn parse_u64_fast(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    let mut n: u64 = 0;
    for &b in bytes {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return None;
        }
        n = n.checked_mul(10)?.checked_add(d as u64)?;
    }
    Some(n)
}

/// Split a tab-delimited line into at most `N` fields without allocating.
///
/// The last field keeps any remaining tabs. Returns the number of fields found.
#[inline]
pub fn split_tabs<'a, const N: usize>(line: &'a [u8], out: &mut [&'a [u8]; N]) -> usize {
    let mut rest = line;
    let mut count = 0;
    while count < N {
        if count == N - 1 {
            out[count] = rest;
            return N;
        }
        match memchr(b'\t', rest) {
            Some(tab) => {
                out[count] = &rest[..tab];
                rest = &rest[tab + 1..];
                count += 1;
            }
            None => {
                out[count] = rest;
                return count + 1;
            }
        }
    }
    count
}

/// Check if a line should be skipped (empty or comment).
#[inline(always)]
pub fn should_skip_line(line: &[u8]) -> bool {
    line.is_empty() || line[0] == b'#' || line.iter().all(|b| b.is_ascii_whitespace())
}

/// Strip a trailing `\n` or `\r\n`.
#[inline]
pub fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Open an input path for buffered reading, transparently decoding gzip.
///
/// `-` reads from stdin.
pub fn open_input<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn BufRead + Send>> {
    let path = path.as_ref();
    if path.as_os_str() == "-" {
        return wrap_reader(io::stdin());
    }
    let file = File::open(path)?;
    wrap_reader(file)
}

/// Wrap any reader, sniffing the gzip magic to decide on decompression.
pub fn wrap_reader<R: Read + Send + 'static>(reader: R) -> io::Result<Box<dyn BufRead + Send>> {
    let mut buffered = BufReader::with_capacity(DEFAULT_INPUT_BUFFER, reader);
    let is_gzip = buffered.fill_buf()?.starts_with(&GZIP_MAGIC);
    if is_gzip {
        Ok(Box::new(BufReader::with_capacity(
            DEFAULT_INPUT_BUFFER,
            MultiGzDecoder::new(buffered),
        )))
    } else {
        Ok(Box::new(buffered))
    }
}
