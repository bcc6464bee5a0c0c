use std::io::{prelude::*, BufReader, SeekFrom};

use crate::{
    config::Config,
    index::{Header, IndexBuilder, IndexFile},
    Indexable, IndexableFile, ReadByLine, Result,
};

/// A wrapper around `BufReader<R>` which implements `ReadByLine` using the index stored in `I`.
#[derive(Debug)]
pub struct IndexedReader<R, I> {
    pub reader: BufReader<R>,
    pub(crate) index: IndexFile<I>,
    /// The line `reader` is currently positioned at, if known
    pub(crate) next_line: Option<usize>,
    skip_buf: Vec<u8>,
}

impl<R: Read + Seek, I: Read + Seek> IndexedReader<R, I> {
    /// Creates a new `IndexedReader` using a BufReader<R> and an opened index. The index won't be
    /// validated against the data. Using an index of other data won't return an error but make
    /// the IndexedReader return wrong lines.
    #[inline]
    pub fn new(reader: BufReader<R>, index: IndexFile<I>) -> IndexedReader<R, I> {
        Self {
            reader,
            index,
            next_line: None,
            skip_buf: Vec::new(),
        }
    }

    /// Builds an index for `source` into `index` using `config` and opens it.
    pub fn new_raw(source: R, mut index: I, config: Config) -> Result<IndexedReader<R, I>>
    where
        I: Write,
    {
        let mut reader = BufReader::new(source);
        IndexBuilder::new(config).build(&mut reader, &mut index)?;
        let index = IndexFile::open(index)?;
        Ok(Self::new(reader, index))
    }

    #[inline]
    pub fn index(&self) -> &IndexFile<I> {
        &self.index
    }

    /// Releases the reader and returns the underlying source and index
    #[inline]
    pub fn into_inner(self) -> (R, I) {
        (self.reader.into_inner(), self.index.into_inner())
    }
}

impl<R, I> Indexable for IndexedReader<R, I> {
    #[inline]
    fn header(&self) -> &Header {
        self.index.header()
    }
}

impl<R: Read + Seek, I: Read + Seek> IndexableFile for IndexedReader<R, I> {
    #[inline]
    fn resolve(&mut self, line: usize) -> Result<(u64, usize)> {
        self.index.resolve(line)
    }

    fn seek_line(&mut self, line: usize) -> Result<()> {
        // We don't need to seek if we're sequencially reading the file, aka. if
        // line == last_line + 1
        if self.next_line == Some(line) {
            return Ok(());
        }

        self.next_line = None;
        let (offset, skip) = self.resolve(line)?;
        self.reader.seek(SeekFrom::Start(offset))?;

        for _ in 0..skip {
            self.skip_buf.clear();
            if self.reader.read_until(b'\n', &mut self.skip_buf)? == 0 {
                break;
            }
        }

        self.next_line = Some(line);
        Ok(())
    }

    fn read_current_line(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        let line = self.next_line.take();
        let n = self.reader.read_until(b'\n', buf)?;
        if n > 0 {
            self.next_line = line.map(|l| l + 1);
        }
        Ok(n)
    }
}

impl<R: Read + Seek, I: Read + Seek> ReadByLine for IndexedReader<R, I> {}
