//! Single stack-frame line parsing.
//!
//! A frame line looks like:
//! `Module!Namespace::Class::Method+0x39 [d:\src\file.cpp @ 206] // free-form tag`
//!
//! Only the `!` is mandatory. Everything after it degrades gracefully:
//! missing offset, source or tag simply leave those fields empty.

use crate::utils::config::{COMMENT_KEYWORD, NAME_END_KEYWORD, NAME_START_KEYWORD};

/// One parsed line of a captured call stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Module name (text before the first `!`)
    pub module: String,

    /// Function name, without offset
    pub function: String,

    /// Offset including its leading `+` (e.g. "+0x39"), or empty
    pub offset: String,

    /// Source location inside the trailing brackets, or empty
    pub source_location: String,

    /// Trailing `//` comment, or empty
    pub tag: String,

    /// 0 = innermost frame of the capture
    pub frame_index: usize,
}

impl StackFrame {
    /// Parse one raw trace line into a frame
    ///
    /// **Public** - used by the trace reader for every line inside a stack block
    ///
    /// # Arguments
    /// * `line` - Raw text line
    /// * `frame_index` - Position of this line inside its capture (0 = innermost)
    ///
    /// # Returns
    /// `None` when the line has no module separator, which is how position
    /// markers and other noise are filtered out.
    pub fn parse(line: &str, frame_index: usize) -> Option<Self> {
        let (module, rest) = line.split_once('!')?;

        let (body, tag) = match rest.find(COMMENT_KEYWORD) {
            Some(idx) => (&rest[..idx], rest[idx + COMMENT_KEYWORD.len()..].trim()),
            None => (rest, ""),
        };
        let body = body.trim();

        // A bracket pair only counts as a source annotation when it closes the line.
        // Mangled names can carry brackets of their own.
        let (body, source_location) = match (body.ends_with(NAME_END_KEYWORD), body.rfind(NAME_START_KEYWORD)) {
            (true, Some(open)) => (
                body[..open].trim(),
                &body[open + 1..body.len() - 1],
            ),
            _ => (body, ""),
        };

        let (function, offset) = split_offset(body);

        Some(Self {
            module: module.trim().to_string(),
            function: function.to_string(),
            offset: offset.to_string(),
            source_location: source_location.to_string(),
            tag: tag.to_string(),
            frame_index,
        })
    }

    /// `module!function`, or just the function when there is no module
    pub fn module_and_function(&self) -> String {
        if self.module.is_empty() {
            self.function.clone()
        } else {
            format!("{}!{}", self.module, self.function)
        }
    }

    /// Display label: `module!function+offset [source]`
    pub fn display_label(&self) -> String {
        let mut label = format!("{}!{}{}", self.module, self.function, self.offset);
        if !self.source_location.is_empty() {
            label.push_str(" [");
            label.push_str(&self.source_location);
            label.push(']');
        }
        label
    }
}

/// Split `function+0x39` into `("function", "+0x39")`
///
/// **Private** - the suffix after the last `+` only counts as an offset when it
/// looks like a hex number, so names such as `operator+` stay intact.
fn split_offset(body: &str) -> (&str, &str) {
    match body.rfind('+') {
        Some(idx) if is_offset(&body[idx + 1..]) => (&body[..idx], &body[idx..]),
        _ => (body, ""),
    }
}

fn is_offset(text: &str) -> bool {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit() || c == '`')
}
