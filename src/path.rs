//! Rule paths: dotted keys with `[]` for "every element of this array".

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    /// Descend into the member with this key
    Key(String),
    /// Apply to every element of an array
    Each,
}

/// Why a path string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    /// Two dots in a row, or a dot at either end
    EmptyKey,
    /// `[` without a closing `]`
    UnclosedIndex,
    /// Something between `[` and `]`; only `[]` is supported
    IndexNotEmpty,
    /// A character that cannot appear where it was found
    UnexpectedCharacter(char),
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::EmptyKey => write!(f, "path contains an empty key"),
            PathError::UnclosedIndex => write!(f, "`[` is never closed"),
            PathError::IndexNotEmpty => {
                write!(f, "only the empty index `[]` is supported")
            }
            PathError::UnexpectedCharacter(c) => write!(f, "unexpected character {c:?}"),
        }
    }
}

/// A parsed rule path. The empty path addresses the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// Parse a path such as `people[].address.city`.
    pub fn parse(input: &str) -> Result<Path, PathError> {
        let mut segments = Vec::new();
        let mut chars = input.char_indices().peekable();
        // a key may start here without a preceding dot
        let mut at_start = true;

        while let Some((start, c)) = chars.next() {
            match c {
                '[' => match chars.next() {
                    Some((_, ']')) => segments.push(Segment::Each),
                    Some(_) => return Err(PathError::IndexNotEmpty),
                    None => return Err(PathError::UnclosedIndex),
                },
                ']' => return Err(PathError::UnexpectedCharacter(']')),
                '.' if at_start => return Err(PathError::EmptyKey),
                '.' => {
                    let key = Self::read_key(input, &mut chars)?;
                    segments.push(Segment::Key(key));
                }
                _ if at_start => {
                    let mut end = start + c.len_utf8();
                    while let Some(&(i, next)) = chars.peek() {
                        if matches!(next, '.' | '[' | ']') {
                            break;
                        }
                        end = i + next.len_utf8();
                        chars.next();
                    }
                    segments.push(Segment::Key(String::from(&input[start..end])));
                }
                other => return Err(PathError::UnexpectedCharacter(other)),
            }
            at_start = false;
        }

        Ok(Path { segments })
    }

    /// Read the key following a dot.
    fn read_key(
        input: &str,
        chars: &mut core::iter::Peekable<core::str::CharIndices<'_>>,
    ) -> Result<String, PathError> {
        let Some(&(start, _)) = chars.peek() else {
            return Err(PathError::EmptyKey);
        };
        let mut end = start;
        while let Some(&(i, c)) = chars.peek() {
            if matches!(c, '.' | '[' | ']') {
                break;
            }
            end = i + c.len_utf8();
            chars.next();
        }
        if end == start {
            return Err(PathError::EmptyKey);
        }
        Ok(String::from(&input[start..end]))
    }

    /// The path's segments, outermost first.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns `true` for the root path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns `true` if the last segment is `[]`.
    pub fn ends_with_each(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::Each))
    }

    /// The path one segment up, or `None` for the root.
    pub fn parent(&self) -> Option<Path> {
        let (_, rest) = self.segments.split_last()?;
        Some(Path {
            segments: rest.to_vec(),
        })
    }

    /// Proper prefixes of this path, longest first, ending with the root.
    pub fn prefixes(&self) -> impl Iterator<Item = Path> + '_ {
        (0..self.segments.len()).rev().map(|n| Path {
            segments: self.segments[..n].to_vec(),
        })
    }

    /// The segments below `ancestor`, or `None` if `ancestor` is not a prefix.
    pub fn strip_prefix(&self, ancestor: &Path) -> Option<&[Segment]> {
        self.segments.strip_prefix(ancestor.segments.as_slice())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => f.write_str(key)?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Each => f.write_str("[]")?,
            }
        }
        Ok(())
    }
}

/// Append `key` to a canonical path string.
pub(crate) fn push_key(path: &mut String, key: &str) {
    if !path.is_empty() {
        path.push('.');
    }
    path.push_str(key);
}

/// Append the `[]` marker to a canonical path string.
pub(crate) fn push_each(path: &mut String) {
    path.push_str("[]");
}
