use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};

/// Record-at-a-time input stream. Record decoding from wire formats lives
/// behind this trait; the sort engine only ever asks for the next record.
pub trait RecordSource {
    /// Read one record into `record`. Returns false on clean end of stream;
    /// a stream that ends inside a record is an error.
    fn read_record(&mut self, record: &mut [u8]) -> Result<bool, anyhow::Error>;
}

/// Record-at-a-time output stream. Implementations write their header on the
/// first record; [finish](RecordSink::finish) emits a header-only stream when
/// no record was ever written.
pub trait RecordSink {
    fn write_record(&mut self, record: &[u8]) -> Result<(), anyhow::Error>;

    /// Flush and finalize the stream.
    fn finish(&mut self) -> Result<(), anyhow::Error>;
}

const MAGIC: [u8; 4] = *b"FRS1";
pub(crate) const HEADER_SIZE: usize = 8;

/// Reader for the raw flow record stream format: an 8 byte header (magic
/// plus little-endian record size) followed by fixed-width records.
pub struct RawRecordReader {
    path: PathBuf,
    reader: BufReader<File>,
    record_size: usize,
}

impl RawRecordReader {
    /// Open `path` and validate its header against the expected record size.
    pub fn open(path: &Path, record_size: usize) -> Result<RawRecordReader, anyhow::Error> {
        let file = File::open(path).with_context(|| format!("path: {}", path.display()))?;
        let mut reader = BufReader::new(file);

        let mut header = [0u8; HEADER_SIZE];
        reader
            .read_exact(&mut header)
            .with_context(|| format!("short header in {}", path.display()))?;
        if header[..4] != MAGIC {
            bail!("{} is not a flow record stream", path.display());
        }
        let stream_record_size = u32::from_le_bytes(header[4..].try_into().unwrap()) as usize;
        if stream_record_size != record_size {
            bail!(
                "{}: stream record size {} does not match configured record size {}",
                path.display(),
                stream_record_size,
                record_size
            );
        }

        Ok(RawRecordReader {
            path: path.to_path_buf(),
            reader,
            record_size,
        })
    }
}

impl RecordSource for RawRecordReader {
    fn read_record(&mut self, record: &mut [u8]) -> Result<bool, anyhow::Error> {
        read_full(&mut self.reader, &mut record[..self.record_size])
            .with_context(|| format!("path: {}", self.path.display()))
    }
}

/// Writer for the raw flow record stream format. The header goes out ahead
/// of the first record, or from [finish](RecordSink::finish) when the stream
/// stays empty.
pub struct RawRecordWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    record_size: usize,
    header_written: bool,
}

impl RawRecordWriter {
    pub fn create(path: &Path, record_size: usize) -> Result<RawRecordWriter, anyhow::Error> {
        let file = File::create(path).with_context(|| format!("path: {}", path.display()))?;
        Ok(RawRecordWriter {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            record_size,
            header_written: false,
        })
    }

    fn write_header(&mut self) -> Result<(), anyhow::Error> {
        let mut header = [0u8; HEADER_SIZE];
        header[..4].copy_from_slice(&MAGIC);
        header[4..].copy_from_slice(&(self.record_size as u32).to_le_bytes());
        self.writer
            .write_all(&header)
            .with_context(|| format!("path: {}", self.path.display()))?;
        self.header_written = true;
        Ok(())
    }
}

impl RecordSink for RawRecordWriter {
    fn write_record(&mut self, record: &[u8]) -> Result<(), anyhow::Error> {
        if !self.header_written {
            self.write_header()?;
        }
        self.writer
            .write_all(&record[..self.record_size])
            .with_context(|| format!("path: {}", self.path.display()))
    }

    fn finish(&mut self) -> Result<(), anyhow::Error> {
        if !self.header_written {
            self.write_header()?;
        }
        self.writer
            .flush()
            .with_context(|| format!("path: {}", self.path.display()))
    }
}

/// Fill `buf` completely or report a clean end. A partial fill means the
/// stream was truncated.
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool, anyhow::Error> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    if filled == 0 {
        Ok(false)
    } else if filled < buf.len() {
        Err(anyhow!(
            "truncated stream: {} of {} bytes",
            filled,
            buf.len()
        ))
    } else {
        Ok(true)
    }
}
