use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::trace;

use crate::constants::SHARD_WRITE_BUFFER_SIZE;
use crate::error::{Result, ShardTopError};
use crate::sharding::traits::Sharder;
use crate::sharding::utils::part_file_name;

/// A buffered shard file that remembers its path and how many bytes went into it.
#[derive(Debug)]
pub struct ShardSink {
    path: PathBuf,
    writer: BufWriter<File>,
    bytes_written: u64,
}

impl ShardSink {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written so far. After [`ShardSink::finish`] this equals the size on disk.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Appends one newline-terminated record.
    pub fn write_record(&mut self, record: &[u8]) -> Result<()> {
        if let Err(source) = self
            .write_all(record)
            .and_then(|_| self.write_all(b"\n"))
        {
            return Err(ShardTopError::PathIo {
                path: self.path.clone(),
                source,
            });
        }
        Ok(())
    }

    /// Flushes the buffer and closes the file, returning its path and size.
    pub fn finish(mut self) -> Result<(PathBuf, u64)> {
        self.writer
            .flush()
            .map_err(ShardTopError::at_path(&self.path))?;
        Ok((self.path, self.bytes_written))
    }
}

impl Write for ShardSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.writer.write(buf)?;
        self.bytes_written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// A file-based Sharder that creates sequentially numbered shard files.
///
/// Files are named `part-00000`, `part-00001`, ... inside the output directory.
///
/// # Example
/// ```no_run
/// use shardtop::sharding::{PartFileSharder, Sharder};
/// use std::io::Write;
/// use std::path::PathBuf;
///
/// let sharder = PartFileSharder::new(PathBuf::from("/tmp/urls.txt-parted"));
///
/// let mut sink = sharder.create_sink().unwrap();
/// sink.write_all(b"http://example.com/\n").unwrap();
/// let (path, size) = sink.finish().unwrap();
/// ```
pub struct PartFileSharder {
    /// Directory to create files in
    output_dir: PathBuf,

    /// Counter for generating sequential file names
    counter: AtomicUsize,
}

impl PartFileSharder {
    /// Create a new PartFileSharder numbering its files from `part-00000`.
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            counter: AtomicUsize::new(0),
        }
    }

    /// Get the next file path for a new shard
    fn next_file_path(&self) -> PathBuf {
        let file_num = self.counter.fetch_add(1, Ordering::SeqCst);
        self.output_dir.join(part_file_name(file_num))
    }
}

impl Sharder<ShardSink> for PartFileSharder {
    fn create_sink(&self) -> Result<ShardSink> {
        let path = self.next_file_path();

        // Create the directory if it doesn't exist
        std::fs::create_dir_all(&self.output_dir)
            .map_err(ShardTopError::at_path(&self.output_dir))?;

        trace!("Creating shard file {}", path.display());
        let file = File::create(&path).map_err(ShardTopError::at_path(&path))?;

        Ok(ShardSink {
            writer: BufWriter::with_capacity(SHARD_WRITE_BUFFER_SIZE, file),
            path,
            bytes_written: 0,
        })
    }
}
