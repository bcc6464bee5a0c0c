use std::{
    fs,
    io::{self, BufReader},
    path::{Path, PathBuf},
    time::SystemTime,
};

use tracing::debug;

use crate::{
    bufreader::IndexedReader,
    config::Config,
    index::{Header, IndexBuilder, IndexFile},
    Indexable, IndexableFile, ReadByLine, Result,
};

/// Appended to the path of a source file to get the path of its index
pub const INDEX_SUFFIX: &str = ".idx";

/// Returns the path of the index belonging to `path`
pub fn index_path<P: AsRef<Path>>(path: P) -> PathBuf {
    let mut p = path.as_ref().as_os_str().to_owned();
    p.push(INDEX_SUFFIX);
    PathBuf::from(p)
}

/// A wrapper around `std::fs::File` which implements `ReadByLine` using the index stored next to
/// it. The index gets created when opening a file which has no index yet or whose index doesn't
/// carry the files modification time anymore.
#[derive(Debug)]
pub struct File {
    path: PathBuf,
    index_path: PathBuf,
    reader: IndexedReader<fs::File, fs::File>,
    rebuilt: bool,
}

impl File {
    /// Open an indexed file, building the index with default parameters if required.
    ///
    /// Returns an error if the index is malformed or an io error occurs
    #[inline]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<File> {
        Self::open_with(path, Config::default())
    }

    /// Open an indexed file, building the index using `config` if required. An existing, up to
    /// date index is used as is, regardless of `config`.
    pub fn open_with<P: AsRef<Path>>(path: P, config: Config) -> Result<File> {
        let path = path.as_ref().to_path_buf();
        let index_path = index_path(&path);

        let source = fs::File::open(&path)?;
        let modified = source.metadata()?.modified()?;

        let rebuilt = !is_current(&index_path, modified)?;
        if rebuilt {
            IndexBuilder::new(config).build_file(&path, &index_path)?;
        }

        let index = IndexFile::open(fs::File::open(&index_path)?)?;
        if !rebuilt {
            debug!(
                index = %index_path.display(),
                line_count = index.header().line_count(),
                sampling_ratio = index.header().sampling_ratio(),
                offset_width = index.header().offset_width(),
                "using existing index"
            );
        }

        Ok(Self {
            path,
            index_path,
            reader: IndexedReader::new(BufReader::new(source), index),
            rebuilt,
        })
    }

    /// Closes the file and its index. Consuming `self` makes a second close impossible.
    #[inline]
    pub fn close(self) -> Result<()> {
        let (source, index) = self.reader.into_inner();
        drop(source);
        drop(index);
        debug!(path = %self.path.display(), "closed");
        Ok(())
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Parameters of the index in use, which are the stored ones if the index was not rebuilt
    #[inline]
    pub fn config(&self) -> Config {
        self.header().config()
    }

    /// Returns `true` if opening the file (re)built its index
    #[inline]
    pub fn rebuilt(&self) -> bool {
        self.rebuilt
    }
}

/// An index is current if it exists and carries the exact modification time of its source
fn is_current(index_path: &Path, source_modified: SystemTime) -> Result<bool> {
    let meta = match fs::metadata(index_path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(index = %index_path.display(), "index missing");
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    let current = meta.modified()? == source_modified;
    if !current {
        debug!(index = %index_path.display(), "index stale");
    }
    Ok(current)
}

impl Indexable for File {
    #[inline]
    fn header(&self) -> &Header {
        self.reader.header()
    }
}

impl IndexableFile for File {
    #[inline]
    fn resolve(&mut self, line: usize) -> Result<(u64, usize)> {
        self.reader.resolve(line)
    }

    #[inline]
    fn seek_line(&mut self, line: usize) -> Result<()> {
        self.reader.seek_line(line)
    }

    #[inline]
    fn read_current_line(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        self.reader.read_current_line(buf)
    }
}

impl ReadByLine for File {}
