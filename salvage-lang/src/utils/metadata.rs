use std::path::PathBuf;

pub type Span = std::ops::Range<usize>;

/// Byte extent of a partially parsed construct.
///
/// The end offset stays `None` until somebody who actually knows it writes it.
/// Recovery only ever fills an unknown end: once an end offset is recorded it is
/// never replaced, so an offset determined by the grammar engine survives a
/// later unwind that only has a rough guess.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Extent {
    pub start: usize,
    pub end: Option<usize>,
}

impl Extent {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }
    /// An extent whose end has not been seen yet.
    pub fn open(start: usize) -> Self {
        Self { start, end: None }
    }
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
    /// Records `offset` as the end if no end is known yet. Returns whether the
    /// extent changed.
    pub fn set_end_if_unknown(&mut self, offset: usize) -> bool {
        if self.end.is_some() {
            return false;
        }
        self.end = Some(offset);
        true
    }
    /// The span this extent covers, treating an unknown end as empty.
    pub fn span(&self) -> Span {
        let end = self.end.unwrap_or(self.start).max(self.start);
        self.start..end
    }
    pub fn to_location(self, path: PathBuf) -> Location {
        Location::new(self.span(), path)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    pub span: Span,
    pub path: PathBuf,
}
impl Location {
    pub fn new(span: Span, path: PathBuf) -> Self {
        Self { span, path }
    }
}
impl Default for Location {
    fn default() -> Self {
        Self {
            span: 0..0,
            path: PathBuf::new(),
        }
    }
}

impl ariadne::Span for Location {
    type SourceId = PathBuf;

    fn source(&self) -> &Self::SourceId {
        &self.path
    }

    fn start(&self) -> usize {
        self.span.start
    }

    fn end(&self) -> usize {
        self.span.end
    }
}
