//! Locating the managed block inside a config file.
//!
//! A file is split into three spans:
//!
//! ```text
//! ┌──────────────┐
//! │ prefix       │  user-owned, preserved byte for byte
//! ├──────────────┤
//! │ start marker │ ┐
//! │ ...          │ │ managed block, regenerated on every run
//! │ end marker   │ ┘ (including the end marker's line break)
//! ├──────────────┤
//! │ suffix       │  user-owned, preserved byte for byte
//! └──────────────┘
//! ```
//!
//! Markers are matched as whole lines, ignoring surrounding whitespace and
//! a trailing `\r`. Only the first block is managed.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BlockError {
    #[error("managed block starting on line {line} has no end marker")]
    Unterminated { line: usize },
    #[error("end marker on line {line} has no matching start marker")]
    StrayEnd { line: usize },
}

/// Byte spans of a file around its managed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spans<'a> {
    pub prefix: &'a str,
    pub block: &'a str,
    pub suffix: &'a str,
}

/// Split `content` at the first managed block delimited by `start`/`end`.
///
/// Returns `Ok(None)` when the file has no block yet.
pub fn split<'a>(content: &'a str, start: &str, end: &str) -> Result<Option<Spans<'a>>, BlockError> {
    let mut offset = 0;
    let mut open: Option<(usize, usize)> = None;
    for (index, line) in content.split_inclusive('\n').enumerate() {
        let line_no = index + 1;
        let trimmed = line.trim();
        match open {
            None if trimmed == start => open = Some((offset, line_no)),
            None if trimmed == end => return Err(BlockError::StrayEnd { line: line_no }),
            Some((begin, _)) if trimmed == end => {
                let stop = offset + line.len();
                return Ok(Some(Spans {
                    prefix: &content[..begin],
                    block: &content[begin..stop],
                    suffix: &content[stop..],
                }));
            }
            _ => {}
        }
        offset += line.len();
    }
    match open {
        Some((_, line)) => Err(BlockError::Unterminated { line }),
        None => Ok(None),
    }
}

/// Replace the managed block in `content` with `block`, or append `block`
/// when none exists.
///
/// `block` must include its markers and end with a newline. Appending
/// separates the block from existing content by one blank line, using the
/// block's own line ending; existing content is never modified, only
/// extended.
pub fn replace(content: &str, start: &str, end: &str, block: &str) -> Result<String, BlockError> {
    if let Some(spans) = split(content, start, end)? {
        return Ok([spans.prefix, block, spans.suffix].concat());
    }
    let eol = if block.ends_with("\r\n") { "\r\n" } else { "\n" };
    let mut out = String::with_capacity(content.len() + block.len() + 4);
    out.push_str(content);
    if !content.is_empty() {
        if !content.ends_with('\n') {
            out.push_str(eol);
        }
        out.push_str(eol);
    }
    out.push_str(block);
    Ok(out)
}
