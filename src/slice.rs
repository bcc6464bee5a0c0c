use std::{
    convert::TryFrom,
    fmt::Display,
    ops::{Range, RangeFrom, RangeFull, RangeTo},
    str::FromStr,
};

use itertools::Itertools;

use crate::{error::Error, Result};

/// Selects a single line or a slice of lines. Negative values count from the end, like python
/// indices do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Index(isize),
    Slice {
        start: Option<isize>,
        stop: Option<isize>,
        step: Option<isize>,
    },
}

impl Selector {
    #[inline]
    pub fn slice(start: Option<isize>, stop: Option<isize>, step: Option<isize>) -> Self {
        Self::Slice { start, stop, step }
    }

    /// Normalizes the selector against a sequence of `len` lines.
    #[inline]
    pub fn normalize(&self, len: usize) -> Result<(usize, usize, usize)> {
        normalize(self, len)
    }
}

/// Turns `selector` into `(start, stop, step)` for a sequence of `length` items.
///
/// Unset components default to `0`, `length` and `1`. Negative bounds get `length` added once.
/// Both bounds have to end up within `0..=length` and the step has to be positive.
pub fn normalize(selector: &Selector, length: usize) -> Result<(usize, usize, usize)> {
    let len = isize::try_from(length).map_err(|_| Error::OutOfBounds {
        index: isize::MAX,
        len: length,
    })?;

    match *selector {
        Selector::Index(i) => {
            let start = usize::try_from(rebase(i, len))
                .ok()
                .filter(|start| *start < length)
                .ok_or(Error::OutOfBounds {
                    index: i,
                    len: length,
                })?;
            Ok((start, start + 1, 1))
        }
        Selector::Slice { start, stop, step } => {
            let step = step.unwrap_or(1);
            if step <= 0 {
                return Err(Error::InvalidStep(step));
            }

            let start = bound(rebase(start.unwrap_or(0), len), length)?;
            let stop = bound(rebase(stop.unwrap_or(len), len), length)?;
            Ok((start, stop, step as usize))
        }
    }
}

#[inline]
fn rebase(value: isize, len: isize) -> isize {
    if value < 0 {
        value + len
    } else {
        value
    }
}

#[inline]
fn bound(value: isize, length: usize) -> Result<usize> {
    usize::try_from(value)
        .ok()
        .filter(|v| *v <= length)
        .ok_or(Error::OutOfBounds {
            index: value,
            len: length,
        })
}

impl FromStr for Selector {
    type Err = Error;

    /// Parses python slice notation: `5`, `-4:`, `5:10:2`, `:`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || Error::InvalidSelector(s.to_owned());

        if !s.contains(':') {
            return s.parse().map(Selector::Index).map_err(|_| invalid());
        }

        let parts = s
            .split(':')
            .map(|part| match part.trim() {
                "" => Ok(None),
                p => p.parse::<isize>().map(Some).map_err(|_| invalid()),
            })
            .collect::<Result<Vec<_>>>()?;

        match parts.as_slice() {
            [start, stop] => Ok(Selector::slice(*start, *stop, None)),
            [start, stop, step] => Ok(Selector::slice(*start, *stop, *step)),
            _ => Err(invalid()),
        }
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Index(i) => write!(f, "{}", i),
            Selector::Slice { start, stop, step } => {
                let parts = if step.is_some() {
                    vec![start, stop, step]
                } else {
                    vec![start, stop]
                };
                let out = parts
                    .into_iter()
                    .map(|p| p.map(|v| v.to_string()).unwrap_or_default())
                    .join(":");
                write!(f, "{}", out)
            }
        }
    }
}

impl From<isize> for Selector {
    #[inline]
    fn from(i: isize) -> Self {
        Selector::Index(i)
    }
}

impl From<Range<isize>> for Selector {
    #[inline]
    fn from(r: Range<isize>) -> Self {
        Selector::slice(Some(r.start), Some(r.end), None)
    }
}

impl From<RangeFrom<isize>> for Selector {
    #[inline]
    fn from(r: RangeFrom<isize>) -> Self {
        Selector::slice(Some(r.start), None, None)
    }
}

impl From<RangeTo<isize>> for Selector {
    #[inline]
    fn from(r: RangeTo<isize>) -> Self {
        Selector::slice(None, Some(r.end), None)
    }
}

impl From<RangeFull> for Selector {
    #[inline]
    fn from(_: RangeFull) -> Self {
        Selector::slice(None, None, None)
    }
}
