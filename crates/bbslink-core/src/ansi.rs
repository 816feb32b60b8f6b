//! ANSI SGR interpretation.
//!
//! Turns a raw line into styled spans. Only foreground colors and resets are
//! honoured; every other control sequence is consumed and dropped so it never
//! reaches the display.
//!
//! The active style carries over from one line to the next, the way a real
//! terminal behaves. A reset (`ESC[0m` or `ESC[m`) returns to
//! [`Color::Normal`].

/// Escape byte that introduces a control sequence.
const ESC: u8 = 0x1b;

/// Foreground color of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Terminal default
    #[default]
    Normal,
    /// SGR 30
    Black,
    /// SGR 31
    Red,
    /// SGR 32
    Green,
    /// SGR 33
    Yellow,
    /// SGR 34
    Blue,
    /// SGR 35
    Magenta,
    /// SGR 36
    Cyan,
    /// SGR 37
    White,
    /// SGR 90
    BrightBlack,
    /// SGR 91
    BrightRed,
    /// SGR 92
    BrightGreen,
    /// SGR 93
    BrightYellow,
    /// SGR 94
    BrightBlue,
    /// SGR 95
    BrightMagenta,
    /// SGR 96
    BrightCyan,
    /// SGR 97
    BrightWhite,
}

impl Color {
    /// Color selected by an SGR foreground code, if it is one.
    #[must_use]
    pub fn from_sgr(code: u16) -> Option<Self> {
        let color = match code {
            30 => Self::Black,
            31 => Self::Red,
            32 => Self::Green,
            33 => Self::Yellow,
            34 => Self::Blue,
            35 => Self::Magenta,
            36 => Self::Cyan,
            37 => Self::White,
            39 => Self::Normal,
            90 => Self::BrightBlack,
            91 => Self::BrightRed,
            92 => Self::BrightGreen,
            93 => Self::BrightYellow,
            94 => Self::BrightBlue,
            95 => Self::BrightMagenta,
            96 => Self::BrightCyan,
            97 => Self::BrightWhite,
            _ => return None,
        };
        Some(color)
    }

    /// Stable lowercase name, used in logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Black => "black",
            Self::Red => "red",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
            Self::Magenta => "magenta",
            Self::Cyan => "cyan",
            Self::White => "white",
            Self::BrightBlack => "bright_black",
            Self::BrightRed => "bright_red",
            Self::BrightGreen => "bright_green",
            Self::BrightYellow => "bright_yellow",
            Self::BrightBlue => "bright_blue",
            Self::BrightMagenta => "bright_magenta",
            Self::BrightCyan => "bright_cyan",
            Self::BrightWhite => "bright_white",
        }
    }
}

/// A run of text in one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    /// Visible text, free of control sequences
    pub text: String,
    /// Foreground color
    pub style: Color,
}

impl StyledSpan {
    /// Span with the given text and style.
    pub fn new(text: impl Into<String>, style: Color) -> Self {
        Self { text: text.into(), style }
    }
}

/// One lexical piece of a line.
#[derive(Debug, PartialEq, Eq)]
enum Piece<'a> {
    Text(&'a str),
    /// Parameters of an SGR (`m`) sequence
    Sgr(&'a str),
    /// Any other control sequence
    Other,
}

/// Length of the CSI sequence at the start of `bytes` and the end offset of
/// its parameter bytes, or `None` if `bytes` does not start a complete one.
fn csi_extent(bytes: &[u8]) -> Option<(usize, usize, u8)> {
    if bytes.first() != Some(&ESC) || bytes.get(1) != Some(&b'[') {
        return None;
    }
    let mut i = 2;
    while bytes.get(i).is_some_and(|b| (0x30..=0x3f).contains(b)) {
        i += 1;
    }
    let params_end = i;
    while bytes.get(i).is_some_and(|b| (0x20..=0x2f).contains(b)) {
        i += 1;
    }
    match bytes.get(i) {
        Some(&f) if (0x40..=0x7e).contains(&f) => Some((i + 1, params_end, f)),
        _ => None,
    }
}

fn pieces(line: &str) -> Vec<Piece<'_>> {
    let bytes = line.as_bytes();
    let mut out = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != ESC {
            i += 1;
            continue;
        }
        if i > text_start {
            out.push(Piece::Text(&line[text_start..i]));
        }
        match csi_extent(&bytes[i..]) {
            Some((len, params_end, b'm')) => {
                out.push(Piece::Sgr(&line[i + 2..i + params_end]));
                i += len;
            },
            Some((len, ..)) => {
                out.push(Piece::Other);
                i += len;
            },
            // Stray ESC: drop it, keep whatever follows as text.
            None => i += 1,
        }
        text_start = i;
    }

    if text_start < bytes.len() {
        out.push(Piece::Text(&line[text_start..]));
    }
    out
}

/// Apply SGR parameters to `style`.
///
/// A reset anywhere in the list is applied before the other codes, so
/// `ESC[31;0m` and `ESC[0;31m` both end up red. An empty list is a reset.
/// Extended color selectors (38/48) and their arguments are skipped.
fn apply_sgr(params: &str, style: &mut Color) {
    let codes: Vec<Option<u16>> = if params.is_empty() {
        vec![Some(0)]
    } else {
        params
            .split(';')
            .map(|p| if p.is_empty() { Some(0) } else { p.parse().ok() })
            .collect()
    };

    if codes.contains(&Some(0)) {
        *style = Color::Normal;
    }

    let mut iter = codes.into_iter();
    while let Some(code) = iter.next() {
        match code {
            Some(38 | 48) => {
                let skip = match iter.next() {
                    Some(Some(5)) => 1,
                    Some(Some(2)) => 3,
                    _ => 0,
                };
                for _ in 0..skip {
                    iter.next();
                }
            },
            Some(code) => {
                if let Some(color) = Color::from_sgr(code) {
                    *style = color;
                }
            },
            None => {},
        }
    }
}

/// Stateful SGR interpreter for one connection's display stream.
#[derive(Debug, Clone, Default)]
pub struct AnsiInterpreter {
    current: Color,
}

impl AnsiInterpreter {
    /// Interpreter starting at [`Color::Normal`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Style that the next text will be drawn in.
    #[must_use]
    pub fn style(&self) -> Color {
        self.current
    }

    /// Back to [`Color::Normal`]. Called when a connection ends.
    pub fn reset(&mut self) {
        self.current = Color::Normal;
    }

    /// Split `line` into styled spans. Never emits an empty span; adjacent
    /// text in the same style is merged.
    pub fn interpret(&mut self, line: &str) -> Vec<StyledSpan> {
        let mut spans: Vec<StyledSpan> = Vec::new();
        for piece in pieces(line) {
            match piece {
                Piece::Text(text) => {
                    if let Some(last) = spans.last_mut()
                        && last.style == self.current
                    {
                        last.text.push_str(text);
                    } else {
                        spans.push(StyledSpan::new(text, self.current));
                    }
                },
                Piece::Sgr(params) => apply_sgr(params, &mut self.current),
                Piece::Other => {},
            }
        }
        spans
    }
}

/// Remove every control sequence from `line`, leaving the visible text.
pub fn strip_ansi(line: &str) -> String {
    pieces(line)
        .into_iter()
        .filter_map(|piece| match piece {
            Piece::Text(text) => Some(text),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(pairs: &[(&str, Color)]) -> Vec<StyledSpan> {
        pairs.iter().map(|(t, c)| StyledSpan::new(*t, *c)).collect()
    }

    #[test]
    fn plain_text_is_one_normal_span() {
        let mut ansi = AnsiInterpreter::new();
        assert_eq!(ansi.interpret("hello"), spans(&[("hello", Color::Normal)]));
    }

    #[test]
    fn red_then_reset() {
        let mut ansi = AnsiInterpreter::new();
        assert_eq!(
            ansi.interpret("\x1b[31mRED\x1b[0m normal"),
            spans(&[("RED", Color::Red), (" normal", Color::Normal)])
        );
    }

    #[test]
    fn style_carries_to_next_line() {
        let mut ansi = AnsiInterpreter::new();
        ansi.interpret("\x1b[1;32mgreen");
        assert_eq!(ansi.style(), Color::Green);
        assert_eq!(ansi.interpret("still"), spans(&[("still", Color::Green)]));
    }

    #[test]
    fn reset_applies_before_color_in_same_sequence() {
        let mut ansi = AnsiInterpreter::new();
        ansi.interpret("\x1b[34m");
        assert_eq!(ansi.interpret("\x1b[33;0mx"), spans(&[("x", Color::Yellow)]));
    }

    #[test]
    fn empty_sgr_is_reset() {
        let mut ansi = AnsiInterpreter::new();
        assert_eq!(
            ansi.interpret("\x1b[35ma\x1b[mb"),
            spans(&[("a", Color::Magenta), ("b", Color::Normal)])
        );
    }

    #[test]
    fn bright_and_default_foreground() {
        let mut ansi = AnsiInterpreter::new();
        assert_eq!(
            ansi.interpret("\x1b[96mcyan\x1b[39mplain"),
            spans(&[("cyan", Color::BrightCyan), ("plain", Color::Normal)])
        );
    }

    #[test]
    fn extended_color_arguments_are_skipped() {
        let mut ansi = AnsiInterpreter::new();
        // 38;5;31 must not be read as red.
        assert_eq!(ansi.interpret("\x1b[38;5;31mx"), spans(&[("x", Color::Normal)]));
        assert_eq!(ansi.interpret("\x1b[38;2;1;2;3;32my"), spans(&[("y", Color::Green)]));
    }

    #[test]
    fn non_sgr_sequences_are_dropped() {
        let mut ansi = AnsiInterpreter::new();
        assert_eq!(
            ansi.interpret("\x1b[2J\x1b[1;1Hmenu\x1b[?25l"),
            spans(&[("menu", Color::Normal)])
        );
    }

    #[test]
    fn no_empty_spans() {
        let mut ansi = AnsiInterpreter::new();
        assert!(ansi.interpret("\x1b[31m\x1b[0m").is_empty());
        assert!(ansi.interpret("").is_empty());
    }

    #[test]
    fn stray_escape_is_dropped() {
        assert_eq!(strip_ansi("a\x1bb"), "ab");
        assert_eq!(strip_ansi("tail\x1b[31"), "tail[31");
    }

    #[test]
    fn strip_keeps_non_ascii() {
        assert_eq!(strip_ansi("\x1b[33m░▒▓\x1b[0m ok"), "░▒▓ ok");
    }
}
