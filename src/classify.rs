//! Rate limiter decision markers in response bodies.
//!
//! The throttled endpoint answers with one line per decision, e.g.
//! `Allowed : 10.0.0.1 count: 3<br>` or `Disallowed : 10.0.0.1 count: 6<br>`.
//! Bodies arrive as arbitrary byte chunks, so [`LineScanner`] reassembles
//! lines before they are classified.

pub const ALLOWED: &str = "Allowed";
pub const DISALLOWED: &str = "Disallowed";

/// Markers found on a single line. The two checks are independent: a line
/// mentioning both markers counts for both.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Marker {
    pub allowed: bool,
    pub disallowed: bool,
}

impl Marker {
    pub fn of(line: &str) -> Self {
        Self {
            allowed: line.contains(ALLOWED),
            disallowed: line.contains(DISALLOWED),
        }
    }

    pub fn is_some(&self) -> bool {
        self.allowed || self.disallowed
    }
}

/// Marker counts over a whole body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub allowed: u64,
    pub disallowed: u64,
}

impl Tally {
    pub fn add(&mut self, marker: Marker) {
        self.allowed += marker.allowed as u64;
        self.disallowed += marker.disallowed as u64;
    }
}

/// Splits a chunked body into lines and tallies their markers.
#[derive(Debug, Default)]
pub struct LineScanner {
    pending: Vec<u8>,
    tally: Tally,
    last_marked: Option<String>,
}

impl LineScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next body chunk; every completed line is classified.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        let mut start = 0;
        while let Some(pos) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + pos;
            let line = String::from_utf8_lossy(&self.pending[start..end]).into_owned();
            self.scan_line(&line);
            start = end + 1;
        }
        self.pending.drain(..start);
    }

    /// Classifies the trailing line, if the body did not end with a newline,
    /// and returns the counts.
    pub fn finish(&mut self) -> Tally {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&rest).into_owned();
            self.scan_line(&line);
        }
        self.tally
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    /// Last line that carried a marker.
    pub fn last_marked(&self) -> Option<&str> {
        self.last_marked.as_deref()
    }

    fn scan_line(&mut self, line: &str) {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let marker = Marker::of(line);
        if marker.is_some() {
            self.tally.add(marker);
            self.last_marked = Some(line.to_string());
        }
    }
}

/// Tallies a complete body in one go.
pub fn tally_body(body: &str) -> Tally {
    let mut scanner = LineScanner::new();
    scanner.feed(body.as_bytes());
    scanner.finish()
}
