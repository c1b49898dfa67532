//! Console line tokenizer
//!
//! Whitespace separated: a command name followed by up to [`MAX_ARGS`]
//! arguments. Free-text commands (`send`, `store`) take the raw tail of the
//! line through [`ParsedCommand::rest_from`], so spacing inside a message
//! survives.

/// Positional arguments kept per line.
pub const MAX_ARGS: usize = 3;

#[derive(Debug, Clone)]
pub struct ParsedCommand<'a> {
    /// First token, empty for a blank line.
    pub command: &'a str,
    pub args: [Option<&'a str>; MAX_ARGS],
    /// Input line as received.
    pub line: &'a str,
}

impl<'a> ParsedCommand<'a> {
    pub const fn empty() -> Self {
        Self { command: "", args: [None; MAX_ARGS], line: "" }
    }

    pub fn arg(&self, idx: usize) -> Option<&'a str> {
        self.args.get(idx).copied().flatten()
    }

    /// Raw text from argument `idx` to the end of the line, trimmed at both
    /// ends only.
    pub fn rest_from(&self, idx: usize) -> Option<&'a str> {
        // Token 0 is the command, argument `idx` is token `idx + 1`
        let (start, _) = spans(self.line).nth(idx + 1)?;
        Some(self.line[start..].trim_end())
    }
}

/// Byte spans of the whitespace separated tokens in `line`.
fn spans(line: &str) -> impl Iterator<Item = (usize, usize)> + '_ {
    let mut pos = 0;
    core::iter::from_fn(move || {
        let tail = &line[pos..];
        let start = pos + tail.find(|c: char| !c.is_whitespace())?;
        let end = line[start..].find(char::is_whitespace).map_or(line.len(), |n| start + n);
        pos = end;
        Some((start, end))
    })
}

pub fn parse_line(line: &str) -> ParsedCommand<'_> {
    let mut tokens = spans(line).map(|(s, e)| &line[s..e]);
    let mut cmd = ParsedCommand { command: tokens.next().unwrap_or(""), line, ..ParsedCommand::empty() };
    for (slot, token) in cmd.args.iter_mut().zip(tokens) {
        *slot = Some(token);
    }
    cmd
}
