//! Output pane contents.
//!
//! Chunks are appended the way a terminal would show them: a chunk with an
//! embedded carriage return rewrites the last line (progress bars), a chunk
//! that ends with one is an ordinary line break.

use std::collections::VecDeque;

/// A run of text from one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub is_error: bool,
}

/// One displayed line. Mixed-stream lines keep a segment per stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputLine {
    pub segments: Vec<Segment>,
    terminated: bool,
}

impl OutputLine {
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    /// Whether a newline has closed this line.
    pub const fn is_terminated(&self) -> bool {
        self.terminated
    }
}

/// Bounded scrollback of rendered output.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    lines: VecDeque<OutputLine>,
    max_lines: usize,
}

impl OutputBuffer {
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            max_lines: max_lines.max(1),
        }
    }

    /// Append one chunk of captured output.
    pub fn append(&mut self, text: &str, is_error: bool) {
        let text = text.replace("\r\n", "\n");
        if text.contains('\r') && !text.ends_with('\r') {
            self.lines.pop_back();
            let tail = text.rsplit('\r').next().unwrap_or_default();
            self.push_text(tail, is_error);
        } else {
            self.push_text(&text.replace('\r', "\n"), is_error);
        }
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> impl ExactSizeIterator<Item = &OutputLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn push_text(&mut self, text: &str, is_error: bool) {
        for piece in text.split_inclusive('\n') {
            let (body, terminated) = piece
                .strip_suffix('\n')
                .map_or((piece, false), |body| (body, true));

            if self.lines.back().is_none_or(OutputLine::is_terminated) {
                self.lines.push_back(OutputLine::default());
            }
            if let Some(line) = self.lines.back_mut() {
                if !body.is_empty() {
                    line.segments.push(Segment {
                        text: body.to_string(),
                        is_error,
                    });
                }
                line.terminated = terminated;
            }
        }
    }
}
