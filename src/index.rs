use std::{
    convert::TryFrom,
    fs,
    io::{prelude::*, BufReader, BufWriter, SeekFrom},
    path::Path,
};

use tracing::{debug, trace, warn};

use crate::{config::Config, error::Error, Result};

/// Length of header in bytes
pub const HEADER_SIZE: usize = 34;

/// Byte position and width of the line count within the header
const LINE_COUNT_POS: u64 = 2;
const LINE_COUNT_SIZE: usize = 32;

/// An index header
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub struct Header {
    sampling_ratio: u8,
    offset_width: u8,
    /// Count of the source files lines at build time
    line_count: usize,
}

impl Header {
    #[inline]
    pub fn new(config: Config, line_count: usize) -> Self {
        Self {
            sampling_ratio: config.sampling_ratio,
            offset_width: config.offset_width,
            line_count,
        }
    }

    #[inline]
    pub fn sampling_ratio(&self) -> u8 {
        self.sampling_ratio
    }

    #[inline]
    pub fn offset_width(&self) -> u8 {
        self.offset_width
    }

    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// The parameters the index was built with
    #[inline]
    pub fn config(&self) -> Config {
        Config {
            sampling_ratio: self.sampling_ratio,
            offset_width: self.offset_width,
        }
    }

    /// Amount of offset entries following the header
    #[inline]
    pub fn entries(&self) -> usize {
        self.line_count / self.sampling_ratio as usize
    }

    /// Byte position of entry `k` within the index
    #[inline]
    pub fn entry_pos(&self, k: usize) -> u64 {
        HEADER_SIZE as u64 + k as u64 * self.offset_width as u64
    }

    /// Total length of the index in bytes
    #[inline]
    pub fn len_bytes(&self) -> u64 {
        self.entry_pos(self.entries())
    }

    /// Encode a header to bytes.
    pub(crate) fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut enc = [0u8; HEADER_SIZE];
        enc[0] = self.sampling_ratio;
        enc[1] = self.offset_width;
        enc[LINE_COUNT_POS as usize..].copy_from_slice(&encode_line_count(self.line_count));
        enc
    }

    /// Decodes a header from the current position of `reader`
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let mut header = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header)?;

        let config = Config {
            sampling_ratio: header[0],
            offset_width: header[1],
        };
        config.validate().map_err(|_| Error::MalformedIndex)?;

        let count = &header[LINE_COUNT_POS as usize..];
        let (high, low) = count.split_at(LINE_COUNT_SIZE - 8);
        if high.iter().any(|b| *b != 0) {
            return Err(Error::MalformedIndex);
        }
        let line_count =
            usize::try_from(decode_offset(low)).map_err(|_| Error::MalformedIndex)?;

        Ok(Header::new(config, line_count))
    }
}

/// 32 byte big endian encoding of `line_count`
fn encode_line_count(line_count: usize) -> [u8; LINE_COUNT_SIZE] {
    let mut enc = [0u8; LINE_COUNT_SIZE];
    enc[LINE_COUNT_SIZE - 8..].copy_from_slice(&(line_count as u64).to_be_bytes());
    enc
}

/// Writes `offset` big endian into `out`, using all of its bytes. Widths below 8 keep only the
/// low-order bytes.
pub(crate) fn encode_offset(offset: u64, out: &mut [u8]) {
    let bytes = offset.to_be_bytes();
    let width = out.len();
    if width >= bytes.len() {
        let (pad, tail) = out.split_at_mut(width - bytes.len());
        pad.iter_mut().for_each(|b| *b = 0);
        tail.copy_from_slice(&bytes);
    } else {
        out.copy_from_slice(&bytes[bytes.len() - width..]);
    }
}

#[inline]
pub(crate) fn decode_offset(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64)
}

/// Builds a sparse line index in a single pass over the source.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexBuilder {
    config: Config,
}

impl IndexBuilder {
    #[inline]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Scan `source` from its beginning and write the index into `dest`. The offset just past
    /// every `sampling_ratio`-th line gets recorded.
    pub fn build<R, W>(&self, source: &mut R, dest: W) -> Result<Header>
    where
        R: BufRead + Seek,
        W: Write + Seek,
    {
        self.config.validate()?;

        let ratio = self.config.sampling_ratio as usize;
        let mut out = BufWriter::new(dest);

        // The line count is unknown until the scan is done, write a placeholder and patch it
        // afterwards
        out.write_all(&Header::new(self.config, 0).encode())?;

        source.seek(SeekFrom::Start(0))?;

        let mut line_count: usize = 0;
        let mut curr_offset: u64 = 0;
        let mut entry = vec![0u8; self.config.offset_width as usize];
        let mut buff = Vec::with_capacity(1000);

        loop {
            buff.clear();
            let n = source.read_until(b'\n', &mut buff)?;
            if n == 0 {
                break;
            }

            line_count += 1;
            curr_offset += n as u64;

            if line_count % ratio == 0 {
                encode_offset(curr_offset, &mut entry);
                out.write_all(&entry)?;
            }
        }

        if curr_offset > self.config.max_offset() {
            warn!(
                size = curr_offset,
                max_offset = self.config.max_offset(),
                offset_width = self.config.offset_width,
                "source exceeds offset width, stored offsets are truncated"
            );
        }

        out.seek(SeekFrom::Start(LINE_COUNT_POS))?;
        out.write_all(&encode_line_count(line_count))?;
        out.flush()?;

        let header = Header::new(self.config, line_count);
        debug!(
            line_count,
            entries = header.entries(),
            sampling_ratio = self.config.sampling_ratio,
            offset_width = self.config.offset_width,
            "built index"
        );
        Ok(header)
    }

    /// Build the index of the file at `source` into `dest`. The index file receives the sources
    /// modification time so it can later be recognized as up to date.
    pub fn build_file(&self, source: &Path, dest: &Path) -> Result<Header> {
        self.config.validate()?;

        let mut reader = BufReader::new(fs::File::open(source)?);
        let modified = reader.get_ref().metadata()?.modified()?;

        let mut index_file = fs::File::create(dest)?;
        let header = self.build(&mut reader, &mut index_file)?;
        index_file.set_modified(modified)?;

        debug!(source = %source.display(), index = %dest.display(), "wrote index file");
        Ok(header)
    }
}

/// An opened index. The header is decoded on open, entries are read on demand.
///
/// Entries are read straight from `I`, one `offset_width` sized read per lookup.
#[derive(Debug)]
pub struct IndexFile<I> {
    header: Header,
    inner: I,
    entry: Vec<u8>,
}

impl<I: Read + Seek> IndexFile<I> {
    /// Parse the header of the index within `inner`.
    ///
    /// Returns an error if the header is malformed or an io error occurs
    pub fn open(mut inner: I) -> Result<IndexFile<I>> {
        inner.seek(SeekFrom::Start(0))?;
        let header = Header::decode(&mut inner)?;

        Ok(Self {
            entry: vec![0u8; header.offset_width() as usize],
            header,
            inner,
        })
    }

    /// Read the offset stored in entry `k`
    pub fn entry(&mut self, k: usize) -> Result<u64> {
        if k >= self.header.entries() {
            return Err(Error::OutOfBounds {
                index: isize::try_from(k).unwrap_or(isize::MAX),
                len: self.header.entries(),
            });
        }

        self.inner.seek(SeekFrom::Start(self.header.entry_pos(k)))?;
        self.inner.read_exact(&mut self.entry)?;
        Ok(decode_offset(&self.entry))
    }

    /// Returns the offset to seek the source to and the amount of lines which have to be skipped
    /// from there in order to reach `line`.
    pub fn resolve(&mut self, line: usize) -> Result<(u64, usize)> {
        let ratio = self.header.sampling_ratio() as usize;
        let k = line / ratio;
        let skip = line % ratio;

        // Start of the source is the implicit anchor for the lines before the first entry
        let offset = match k {
            0 => 0,
            k => self.entry(k - 1)?,
        };

        trace!(line, offset, skip, "resolved line");
        Ok((offset, skip))
    }
}

impl<I> IndexFile<I> {
    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    #[inline]
    pub fn into_inner(self) -> I {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn num_text(n: usize) -> String {
        (0..n).map(|i| format!("{}\n", i)).collect()
    }

    fn build(text: &str, config: Config) -> (Header, Vec<u8>) {
        let mut source = Cursor::new(text.as_bytes());
        let mut dest = Cursor::new(Vec::new());
        let header = IndexBuilder::new(config)
            .build(&mut source, &mut dest)
            .unwrap();
        (header, dest.into_inner())
    }

    #[test]
    fn test_header_layout() {
        let (header, data) = build(&num_text(12), Config::default().with_sampling_ratio(5));

        assert_eq!(header.line_count(), 12);
        assert_eq!(header.entries(), 2);
        assert_eq!(data.len(), HEADER_SIZE + 2 * 5);
        assert_eq!(data.len() as u64, header.len_bytes());

        assert_eq!(data[0], 5);
        assert_eq!(data[1], 5);
        assert!(data[2..HEADER_SIZE - 1].iter().all(|b| *b == 0));
        assert_eq!(data[HEADER_SIZE - 1], 12);

        // "0\n".."4\n" are 10 bytes, "5\n".."9\n" another 10
        assert_eq!(&data[HEADER_SIZE..HEADER_SIZE + 5], &[0, 0, 0, 0, 10]);
        assert_eq!(&data[HEADER_SIZE + 5..], &[0, 0, 0, 0, 20]);
    }

    #[test]
    fn test_entry_count() {
        let text = num_text(100);
        for ratio in 1..=13u8 {
            let (header, data) = build(&text, Config::default().with_sampling_ratio(ratio));
            assert_eq!(header.line_count(), 100);
            assert_eq!(header.entries(), 100 / ratio as usize);
            assert_eq!(data.len(), HEADER_SIZE + header.entries() * 5);
        }
    }

    #[test]
    fn test_decode() {
        let config = Config::default().with_sampling_ratio(3).with_offset_width(9);
        let (header, data) = build(&num_text(50), config);

        let mut index = IndexFile::open(Cursor::new(data)).unwrap();
        assert_eq!(*index.header(), header);
        assert_eq!(index.header().config(), config);
        assert_eq!(index.header().line_count(), 50);

        // Entry 0 points behind line 2
        assert_eq!(index.entry(0).unwrap(), 6);
        assert!(index.entry(header.entries()).is_err());
    }

    #[test]
    fn test_no_trailing_newline() {
        let (header, data) = build("a\nb\nc", Config::default());
        assert_eq!(header.line_count(), 3);

        let mut index = IndexFile::open(Cursor::new(data)).unwrap();
        assert_eq!(index.entry(0).unwrap(), 2);
        assert_eq!(index.entry(1).unwrap(), 4);
        assert_eq!(index.entry(2).unwrap(), 5);
    }

    #[test]
    fn test_empty_source() {
        let (header, data) = build("", Config::default().with_sampling_ratio(4));
        assert_eq!(header.line_count(), 0);
        assert_eq!(header.entries(), 0);
        assert_eq!(data.len(), HEADER_SIZE);
    }

    #[test]
    fn test_resolve() {
        let text = num_text(100);
        let (_, data) = build(&text, Config::default().with_sampling_ratio(10));
        let mut index = IndexFile::open(Cursor::new(data)).unwrap();

        assert_eq!(index.resolve(0).unwrap(), (0, 0));
        assert_eq!(index.resolve(9).unwrap(), (0, 9));
        // lines 0..=9 take 20 bytes
        assert_eq!(index.resolve(10).unwrap(), (20, 0));
        assert_eq!(index.resolve(15).unwrap(), (20, 5));
        assert_eq!(index.resolve(99).unwrap(), (text.find("90\n").unwrap() as u64, 9));
    }

    #[test]
    fn test_offset_width() {
        let mut out = [0u8; 3];
        encode_offset(0x0102_0304, &mut out);
        // undersized widths silently truncate
        assert_eq!(out, [0x02, 0x03, 0x04]);
        assert_eq!(decode_offset(&out), 0x02_0304);

        let mut out = [0xffu8; 12];
        encode_offset(0x0102_0304, &mut out);
        assert_eq!(&out[..8], &[0; 8]);
        assert_eq!(decode_offset(&out), 0x0102_0304);

        let mut out = [0u8; 8];
        encode_offset(u64::MAX, &mut out);
        assert_eq!(decode_offset(&out), u64::MAX);
    }

    #[test]
    fn test_malformed_header() {
        let (_, data) = build(&num_text(10), Config::default());

        let mut bad_ratio = data.clone();
        bad_ratio[0] = 0;
        assert!(matches!(
            IndexFile::open(Cursor::new(bad_ratio)),
            Err(Error::MalformedIndex)
        ));

        let mut bad_width = data.clone();
        bad_width[1] = 33;
        assert!(matches!(
            IndexFile::open(Cursor::new(bad_width)),
            Err(Error::MalformedIndex)
        ));

        let mut huge_count = data.clone();
        huge_count[2] = 1;
        assert!(matches!(
            IndexFile::open(Cursor::new(huge_count)),
            Err(Error::MalformedIndex)
        ));

        assert!(matches!(
            IndexFile::open(Cursor::new(&data[..10])),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_truncated_entries() {
        let (_, data) = build(&num_text(10), Config::default());
        let mut index = IndexFile::open(Cursor::new(&data[..HEADER_SIZE + 7])).unwrap();
        assert_eq!(index.entry(0).unwrap(), 2);
        assert!(matches!(index.entry(1), Err(Error::Io(_))));
    }

    /// Counts the bytes read from the wrapped reader
    struct CountingReader<R> {
        inner: R,
        read: usize,
    }

    impl<R: Read> Read for CountingReader<R> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.inner.read(buf)?;
            self.read += n;
            Ok(n)
        }
    }

    impl<R: Seek> Seek for CountingReader<R> {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn test_entry_reads_only_entry_bytes() {
        let (header, data) = build(&num_text(5000), Config::default());
        let mut index = IndexFile::open(CountingReader {
            inner: Cursor::new(data),
            read: 0,
        })
        .unwrap();
        assert_eq!(index.inner.read, HEADER_SIZE);

        let mut lookups = 0;
        for k in (0..header.entries()).rev().step_by(97) {
            let before = index.inner.read;
            index.entry(k).unwrap();
            assert_eq!(index.inner.read - before, 5);
            lookups += 1;
        }

        assert_eq!(index.into_inner().read, HEADER_SIZE + lookups * 5);
    }

    #[test]
    fn test_undersized_width_truncates() {
        // 1000 lines of "line\n" exceed what a single byte can address
        let text = "line\n".repeat(1000);
        let config = Config::default().with_offset_width(1);
        assert!(text.len() as u64 > config.max_offset());

        let (header, data) = build(&text, config);
        assert_eq!(header.line_count(), 1000);

        let mut index = IndexFile::open(Cursor::new(data)).unwrap();
        assert_eq!(index.entry(0).unwrap(), 5);
        // 260 bytes wrap around to 4
        assert_eq!(index.entry(51).unwrap(), 260 % 256);
    }

    #[test]
    fn test_invalid_config() {
        let mut source = Cursor::new(b"a\n".as_ref());
        let mut dest = Cursor::new(Vec::new());
        let res = IndexBuilder::new(Config::default().with_sampling_ratio(0))
            .build(&mut source, &mut dest);
        assert!(matches!(res, Err(Error::InvalidConfig(_))));
        assert!(dest.into_inner().is_empty());
    }
}
