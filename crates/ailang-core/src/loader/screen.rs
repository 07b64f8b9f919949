//! Linear pre-pass over the raw text.
//!
//! Runs before the YAML parser and rejects what it must never see: tab
//! indentation, a second document, content after `...` and nesting deeper
//! than [`MAX_DEPTH`]. The nesting estimate follows block indentation,
//! compact `- ` items and flow brackets, so a pathological document is
//! refused here before any tree is built.

use super::MAX_DEPTH;

/// What the screen found wrong, with the byte offset to blame
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Rejection {
    pub message: String,
    pub offset: usize,
}

impl Rejection {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }

    fn too_deep(offset: usize) -> Self {
        Self::new(format!("maximum nesting depth of {} exceeded", MAX_DEPTH), offset)
    }
}

#[derive(Default)]
struct Screen {
    /// Columns of open block collections
    block: Vec<usize>,
    /// Open flow brackets
    flow: usize,
    /// Open quote inside a flow collection
    quote: Option<char>,
    /// Content column a block scalar's lines must exceed
    block_scalar: Option<usize>,
    seen_marker: bool,
    seen_content: bool,
    ended: bool,
}

/// Screen `text`. Returns whether it has any content besides comments and
/// document markers.
pub(super) fn screen(text: &str) -> Result<bool, Rejection> {
    let mut screen = Screen::default();
    let mut start = 0;
    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        screen.line(line, start)?;
        start += raw.len() + 1;
    }
    Ok(screen.seen_content)
}

impl Screen {
    fn line(&mut self, line: &str, start: usize) -> Result<(), Rejection> {
        if self.flow > 0 {
            return self.flow_scan(line, 0, start);
        }

        if is_marker(line, "---") {
            if self.seen_content || self.seen_marker {
                return Err(Rejection::new("multiple documents are not supported", start));
            }
            self.seen_marker = true;
            return Ok(());
        }
        if is_marker(line, "...") {
            self.ended = true;
            return Ok(());
        }

        let body = line.trim_start_matches([' ', '\t']);
        if body.is_empty() {
            return Ok(());
        }
        let indent = line.len() - body.len();

        if let Some(parent) = self.block_scalar {
            if !line.starts_with('\t') && indent > parent {
                return Ok(());
            }
            self.block_scalar = None;
        }

        if body.starts_with('#') {
            return Ok(());
        }
        if self.ended {
            return Err(Rejection::new(
                "content after the document end marker '...'",
                start + indent,
            ));
        }
        if let Some(tab) = line[..indent].find('\t') {
            return Err(Rejection::new(
                "tab characters are not allowed in indentation",
                start + tab,
            ));
        }
        self.seen_content = true;

        while self.block.last().is_some_and(|col| *col > indent) {
            self.block.pop();
        }
        self.open_block(indent, start)?;

        // compact items: `- - x`, `- key: v`
        let mut col = indent;
        while let Some(after) = compact_item(&line[col..]) {
            col += after;
            self.open_block(col, start)?;
        }

        let rest = &line[col..];
        if let Some(value) = value_start(rest) {
            let value_col = col + value;
            let head = line[value_col..].chars().next();
            match head {
                Some('[' | '{') => return self.flow_scan(line, value_col, start),
                Some('|' | '>') if is_block_indicator(&line[value_col..]) => {
                    self.block_scalar = self.block.last().copied();
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn open_block(&mut self, col: usize, start: usize) -> Result<(), Rejection> {
        if self.block.last() != Some(&col) {
            self.block.push(col);
        }
        if self.block.len() > MAX_DEPTH {
            return Err(Rejection::too_deep(start + col));
        }
        Ok(())
    }

    /// Scan flow content from `from`, tracking brackets and quotes.
    fn flow_scan(&mut self, line: &str, from: usize, start: usize) -> Result<(), Rejection> {
        let mut prev = ' ';
        let mut chars = line[from..].char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            match self.quote {
                Some('"') => match c {
                    '\\' => {
                        chars.next();
                    }
                    '"' => self.quote = None,
                    _ => {}
                },
                Some(_) => {
                    if c == '\'' {
                        if chars.peek().map(|(_, n)| *n) == Some('\'') {
                            chars.next();
                        } else {
                            self.quote = None;
                        }
                    }
                }
                None => match c {
                    '"' | '\'' if is_token_start(prev) => self.quote = Some(c),
                    '#' if prev.is_whitespace() => return Ok(()),
                    '[' | '{' => {
                        self.flow += 1;
                        if self.block.len() + self.flow > MAX_DEPTH {
                            return Err(Rejection::too_deep(start + from + i));
                        }
                    }
                    ']' | '}' => {
                        self.flow = self.flow.saturating_sub(1);
                        if self.flow == 0 {
                            return Ok(());
                        }
                    }
                    _ => {}
                },
            }
            prev = c;
        }
        Ok(())
    }
}

fn is_marker(line: &str, marker: &str) -> bool {
    line.strip_prefix(marker)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t']))
}

fn is_token_start(prev: char) -> bool {
    prev.is_whitespace() || matches!(prev, '[' | '{' | ',' | ':')
}

/// Width of a leading `- ` (or `? `) indicator and the spaces after it
fn compact_item(rest: &str) -> Option<usize> {
    let mut chars = rest.chars();
    let indicator = chars.next()?;
    if !matches!(indicator, '-' | '?') {
        return None;
    }
    let tail = &rest[1..];
    let content = tail.trim_start_matches(' ');
    if content.len() == tail.len() || content.is_empty() || content.starts_with('#') {
        return None;
    }
    Some(rest.len() - content.len())
}

/// Offset in `rest` where the value of `key: value` (or a bare value) starts
fn value_start(rest: &str) -> Option<usize> {
    if rest.starts_with(['[', '{', '|', '>']) {
        return Some(0);
    }
    let key_end = if rest.starts_with(['"', '\'']) {
        super::scalar::quoted_string(rest)
            .ok()
            .map(|(after, _)| rest.len() - after.len())?
    } else {
        0
    };
    let colon = rest[key_end..]
        .match_indices(':')
        .map(|(i, _)| key_end + i)
        .find(|i| rest[i + 1..].is_empty() || rest[i + 1..].starts_with([' ', '\t']))?;
    let value = &rest[colon + 1..];
    let trimmed = value.trim_start_matches([' ', '\t']);
    Some(colon + 1 + value.len() - trimmed.len())
}

/// `|`, `>`, `|-`, `>+2` and similar, optionally followed by a comment
fn is_block_indicator(value: &str) -> bool {
    let token = value.split([' ', '\t']).next().unwrap_or("");
    let after = value[token.len()..].trim_start();
    token[1..].chars().all(|c| matches!(c, '+' | '-' | '1'..='9'))
        && (after.is_empty() || after.starts_with('#'))
}
