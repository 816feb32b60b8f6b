//! Line reassembly across arbitrary read boundaries.
//!
//! A read may end mid-line, or even between the `\r` and `\n` of one line
//! terminator. The reassembler holds the incomplete tail until more text
//! arrives, so downstream stages always see whole lines.
//!
//! Terminators are `\r\n`, lone `\n` and lone `\r`. A `\r\n` pair counts once
//! even when split across two chunks.

/// Buffers a partial line between chunks.
#[derive(Debug, Clone, Default)]
pub struct LineReassembler {
    partial: String,
    /// The previous chunk ended with `\r`; a leading `\n` belongs to it.
    pending_cr: bool,
}

impl LineReassembler {
    /// Empty reassembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every line it completes in order.
    ///
    /// Concatenating the returned lines (with terminators) followed by
    /// [`partial`](Self::partial) always reproduces everything fed so far.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        let mut lines = Vec::new();
        let mut chars = chunk.chars().peekable();

        if self.pending_cr
            && let Some(&first) = chars.peek()
        {
            self.pending_cr = false;
            if first == '\n' {
                chars.next();
            }
        }

        while let Some(c) = chars.next() {
            match c {
                '\n' => lines.push(std::mem::take(&mut self.partial)),
                '\r' => {
                    lines.push(std::mem::take(&mut self.partial));
                    match chars.peek() {
                        Some('\n') => {
                            chars.next();
                        },
                        Some(_) => {},
                        None => self.pending_cr = true,
                    }
                },
                other => self.partial.push(other),
            }
        }

        lines
    }

    /// Text received since the last terminator.
    #[must_use]
    pub fn partial(&self) -> &str {
        &self.partial
    }

    /// Drop buffered text. Called when a connection ends.
    pub fn reset(&mut self) {
        self.partial.clear();
        self.pending_cr = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_lines_are_returned() {
        let mut r = LineReassembler::new();
        assert_eq!(r.feed("one\r\ntwo\r\n"), vec!["one", "two"]);
        assert_eq!(r.partial(), "");
    }

    #[test]
    fn partial_tail_is_held() {
        let mut r = LineReassembler::new();
        assert_eq!(r.feed("Hel"), Vec::<String>::new());
        assert_eq!(r.partial(), "Hel");
        assert_eq!(r.feed("lo\r\n"), vec!["Hello"]);
        assert_eq!(r.partial(), "");
    }

    #[test]
    fn crlf_split_across_chunks_counts_once() {
        let mut r = LineReassembler::new();
        assert_eq!(r.feed("abc\r"), vec!["abc"]);
        assert_eq!(r.feed("\ndef\n"), vec!["def"]);
    }

    #[test]
    fn empty_chunk_keeps_pending_cr() {
        let mut r = LineReassembler::new();
        assert_eq!(r.feed("abc\r"), vec!["abc"]);
        assert!(r.feed("").is_empty());
        assert_eq!(r.feed("\nz\n"), vec!["z"]);
    }

    #[test]
    fn lone_cr_and_lf_terminate() {
        let mut r = LineReassembler::new();
        assert_eq!(r.feed("a\rb\nc\r\n"), vec!["a", "b", "c"]);
    }

    #[test]
    fn blank_lines_are_kept() {
        let mut r = LineReassembler::new();
        assert_eq!(r.feed("\r\n\r\nx\r\n"), vec!["", "", "x"]);
    }

    #[test]
    fn reset_drops_partial() {
        let mut r = LineReassembler::new();
        r.feed("dangling\r");
        r.reset();
        assert_eq!(r.partial(), "");
        assert_eq!(r.feed("\nnext\n"), vec!["", "next"]);
    }
}
