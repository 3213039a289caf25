// Copyright 2024
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Records and count records as they appear on disk.
//!
//! A record is an opaque byte string taken from one input line. Shard files
//! hold one record per line; count files hold one `<record>,<count>` pair
//! per line.

use std::io::{self, BufRead, Write};

use bytes::Bytes;

use crate::constants::COUNT_SEPARATOR;

/// Extract the record from a raw line by removing surrounding ASCII
/// whitespace, including the line terminator.
pub fn trim_record(line: &[u8]) -> &[u8] {
    line.trim_ascii()
}

/// A piece returned by [`RecordLines::next_record`].
#[derive(Debug, PartialEq, Eq)]
pub enum RecordPiece<'a> {
    /// The next record, borrowed from the reader's line buffer.
    Record(&'a [u8]),
    /// The source is exhausted.
    EOF,
}

/// Reads records line by line from a buffered source without requiring UTF-8.
pub struct RecordLines<R: BufRead> {
    reader: R,
    buf: Vec<u8>,
    lines_read: u64,
}

impl<R: BufRead> RecordLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            lines_read: 0,
        }
    }

    /// Reads the next record. The returned slice is only valid until the next call.
    pub fn next_record(&mut self) -> io::Result<RecordPiece<'_>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(RecordPiece::EOF);
        }
        self.lines_read += 1;
        Ok(RecordPiece::Record(trim_record(&self.buf)))
    }

    /// Number of lines returned so far.
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }
}

/// A record together with the number of times it was seen.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CountRecord {
    pub record: Bytes,
    pub count: u64,
}

impl CountRecord {
    pub fn new(record: impl Into<Bytes>, count: u64) -> Self {
        Self {
            record: record.into(),
            count,
        }
    }

    /// Writes the record as one `<record>,<count>` line.
    ///
    /// Commas inside the record are not escaped; such a line will not parse back.
    pub fn write_line<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.record)?;
        writer.write_all(&[COUNT_SEPARATOR])?;
        writeln!(writer, "{}", self.count)
    }

    /// Parses one count file line. Returns `None` unless the line holds exactly
    /// one separator followed by a decimal count.
    pub fn parse_line(line: &[u8]) -> Option<Self> {
        let line = trim_record(line);
        let mut fields = line.split(|b| *b == COUNT_SEPARATOR);
        let record = fields.next()?;
        let count = fields.next()?;
        if fields.next().is_some() {
            return None;
        }
        let count = std::str::from_utf8(count).ok()?.parse::<u64>().ok()?;
        Some(Self::new(Bytes::copy_from_slice(record), count))
    }
}
