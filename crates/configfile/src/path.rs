//! Paths addressing members inside a value tree.
//!
//! Paths render as `commands[0].name`. Keys that are not plain identifiers
//! render in bracketed, quoted form (`["odd key"]`). The empty path renders as
//! `<root>`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// One accessor step in a [`ValuePath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Dictionary key or invocation argument name.
    Key(String),
    /// List index.
    Index(usize),
}

/// Sequence of accessors from a root value to one of its descendants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ValuePath {
    segments: Vec<PathSegment>,
}

impl ValuePath {
    /// Returns the empty path addressing the root.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Returns a new path extended by a key segment.
    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        self.child(PathSegment::Key(key.into()))
    }

    /// Returns a new path extended by an index segment.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        self.child(PathSegment::Index(index))
    }

    fn child(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment);
        Self { segments }
    }

    /// Returns the accessor steps.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns `true` for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the final segment, if any.
    #[must_use]
    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("<root>");
        }
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Index(index) => write!(f, "[{index}]")?,
                PathSegment::Key(key) if crate::printer::is_bare_key(key) => {
                    if position > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(key)?;
                }
                PathSegment::Key(key) => {
                    write!(f, "[{}]", crate::printer::quote(key))?;
                }
            }
        }
        Ok(())
    }
}

/// Errors raised while parsing a [`ValuePath`] from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid path '{path}': {message}")]
pub struct PathParseError {
    /// The rejected path text.
    pub path: String,
    /// Description of the problem.
    pub message: String,
}

impl FromStr for ValuePath {
    type Err = PathParseError;

    /// Parses `a.b[2]` style paths. Quoted bracket keys are not accepted
    /// here; use [`ValuePath::key`] for keys that need quoting.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let error = |message: &str| PathParseError {
            path: text.to_owned(),
            message: message.to_owned(),
        };

        let mut segments = Vec::new();
        if text.is_empty() || text == "<root>" {
            return Ok(Self { segments });
        }

        for (position, part) in text.split('.').enumerate() {
            let (key, indices) = match part.find('[') {
                Some(open) => part.split_at(open),
                None => (part, ""),
            };
            if key.is_empty() {
                // Only a leading index may omit its key: `[3].name`.
                if position > 0 || indices.is_empty() {
                    return Err(error("empty key segment"));
                }
            } else {
                segments.push(PathSegment::Key(key.to_owned()));
            }

            let mut rest = indices;
            while let Some(stripped) = rest.strip_prefix('[') {
                let close = stripped
                    .find(']')
                    .ok_or_else(|| error("unterminated index"))?;
                let (digits, tail) = stripped.split_at(close);
                let index = digits
                    .parse::<usize>()
                    .map_err(|_| error("index is not a number"))?;
                segments.push(PathSegment::Index(index));
                rest = tail.strip_prefix(']').unwrap_or(tail);
            }
            if !rest.is_empty() {
                return Err(error("unexpected text after index"));
            }
        }
        Ok(Self { segments })
    }
}

impl FromIterator<PathSegment> for ValuePath {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}
