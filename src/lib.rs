//!A library to read arbitrary lines of large text files using a sparse index which gets built once
//!and stored next to the file

/// Generic implementation over any seekable source and index
pub mod bufreader;
/// Parameters used to build indices
pub mod config;
pub mod error;
/// A file on disk together with its companion index file
pub mod file;
/// The index format, its builder and reader
pub mod index;
/// Python style index and slice normalization
pub mod slice;

pub use config::Config;
pub use file::File;
pub use slice::Selector;

use std::{cmp::Ordering, convert::TryFrom};

use index::Header;
use rand::Rng;
use slice::normalize;

pub type Result<T> = std::result::Result<T, error::Error>;

pub trait Indexable {
    /// Returns the decoded header of the index.
    fn header(&self) -> &Header;

    /// Returns the total amount of lines of the source at the time the index was built.
    #[inline]
    fn total_lines(&self) -> usize {
        self.header().line_count()
    }

    /// Alias of `total_lines`
    #[inline]
    fn len(&self) -> usize {
        self.total_lines()
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait IndexableFile: Indexable {
    /// Should return the offset to seek to and the amount of lines to skip from there in order to
    /// reach `line`
    fn resolve(&mut self, line: usize) -> Result<(u64, usize)>;

    /// Should position the source at the beginning of `line`
    fn seek_line(&mut self, line: usize) -> Result<()>;

    /// Should read from the current position until the end of the line, including the line
    /// terminator
    fn read_current_line(&mut self, buf: &mut Vec<u8>) -> Result<usize>;
}

/// A trait defining behavior for reading certain lines directly from indexed files.
pub trait ReadByLine: IndexableFile {
    /// Reads the given line including its terminator. Negative values count from the end.
    fn get_line(&mut self, line: isize) -> Result<String> {
        let (line, _, _) = normalize(&Selector::Index(line), self.total_lines())?;
        let mut buf = Vec::new();
        self.read_line_raw(line, &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }

    /// Reads the given line and appends it to `buf`
    fn read_line_raw(&mut self, line: usize, buf: &mut Vec<u8>) -> Result<usize> {
        if line >= self.total_lines() {
            return Err(error::Error::OutOfBounds {
                index: isize::try_from(line).unwrap_or(isize::MAX),
                len: self.total_lines(),
            });
        }

        self.seek_line(line)?;
        self.read_current_line(buf)
    }

    /// Reads the lines selected by python-like slice bounds.
    fn get_range(
        &mut self,
        start: Option<isize>,
        stop: Option<isize>,
        step: Option<isize>,
    ) -> Result<Vec<String>> {
        let selector = Selector::slice(start, stop, step);
        let (start, stop, step) = normalize(&selector, self.total_lines())?;

        if stop <= start {
            return Ok(Vec::new());
        }

        if step == 1 {
            // Contiguous lines only need the index for the first one
            self.seek_line(start)?;
            return (start..stop).map(|_| read_string(self)).collect();
        }

        (start..stop)
            .step_by(step)
            .map(|line| {
                self.seek_line(line)?;
                read_string(self)
            })
            .collect()
    }

    /// Reads the lines selected by `selector`
    fn get<S: Into<Selector>>(&mut self, selector: S) -> Result<Vec<String>> {
        match selector.into() {
            Selector::Index(line) => Ok(vec![self.get_line(line)?]),
            Selector::Slice { start, stop, step } => self.get_range(start, stop, step),
        }
    }

    /// Reads a uniformly chosen line
    #[inline]
    fn random_line(&mut self) -> Result<String> {
        self.random_line_with(&mut rand::thread_rng())
    }

    /// Reads a uniformly chosen line using `rng` as source of randomness
    fn random_line_with<G: Rng>(&mut self, rng: &mut G) -> Result<String> {
        let len = self.total_lines();
        if len == 0 {
            return Err(error::Error::OutOfBounds { index: 0, len });
        }

        let line = isize::try_from(rng.gen_range(0..len))
            .map_err(|_| error::Error::OutOfBounds { index: isize::MAX, len })?;
        self.get_line(line)
    }

    /// Do a binary search on `ReadByLine` implementing Types, since it provides everything required
    /// for binary search. Only works with sorted files
    #[inline]
    fn binary_search(&mut self, x: &str) -> Result<usize> {
        self.binary_search_by(|p| p.cmp(x))
    }

    /// Do a binary search by on `ReadByLine` implementing Types, since it provides everything required
    /// for binary search. Lines are passed to `f` without their terminator. Only works with sorted
    /// files
    fn binary_search_by<F>(&mut self, mut f: F) -> Result<usize>
    where
        F: FnMut(&str) -> Ordering,
    {
        let mut size = self.total_lines();
        let mut left = 0;
        let mut right = size;

        while left < right {
            let mid = left + size / 2;

            let mut buf = Vec::new();
            self.read_line_raw(mid, &mut buf)?;
            let line = String::from_utf8(buf)?;
            let cmp = f(trim_terminator(&line));

            if cmp == Ordering::Less {
                left = mid + 1;
            } else if cmp == Ordering::Greater {
                right = mid;
            } else {
                return Ok(mid);
            }

            size = right - left;
        }

        Err(error::Error::NotFound)
    }
}

/// Read the line at the current position as String
fn read_string<L: IndexableFile + ?Sized>(reader: &mut L) -> Result<String> {
    let mut buf = Vec::new();
    reader.read_current_line(&mut buf)?;
    Ok(String::from_utf8(buf)?)
}

/// Strips `\n` or `\r\n` from the end of `line`
#[inline]
pub fn trim_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
