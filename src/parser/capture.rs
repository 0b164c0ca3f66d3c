//! One reference-count capture: the call stack recorded at a single AddRef or Release.

use super::frame::StackFrame;
use crate::utils::config::{PolarityRule, ADDREF_RULES, RELEASE_RULES};
use log::debug;

/// Direction of the reference-count change recorded by a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    AddRef,
    Release,
    Unknown,
}

impl Polarity {
    /// Net reference-count delta of a leaf with this polarity.
    /// Unknown counts as a Release.
    pub fn delta(self) -> i64 {
        match self {
            Polarity::AddRef => 1,
            Polarity::Release | Polarity::Unknown => -1,
        }
    }
}

/// A full captured stack with its reference count and trace position
///
/// Frames are stored innermost first (`frames[0]` is the reference-count call).
#[derive(Debug, Clone)]
pub struct RefCountStack {
    /// Reference count reported right after the change
    pub ref_count: i64,

    /// Opaque time-travel position token, empty if the trace had none
    pub position: String,

    polarity: Polarity,
    frames: Vec<StackFrame>,
}

impl RefCountStack {
    pub fn new(ref_count: i64) -> Self {
        Self {
            ref_count,
            position: String::new(),
            polarity: Polarity::Unknown,
            frames: Vec::new(),
        }
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Append the next frame of this capture
    ///
    /// **Public** - called by the trace reader for each frame line
    ///
    /// The first frame must have index 0 and every later frame must follow the
    /// previous one exactly. While the polarity is still unknown, each appended
    /// frame is checked against the allow-list and the first hit fixes it.
    ///
    /// # Returns
    /// `false` (and the frame is not appended) on a contiguity violation
    pub fn add_line(&mut self, frame: StackFrame) -> bool {
        let expected = self.frames.last().map_or(0, |last| last.frame_index + 1);
        if frame.frame_index != expected {
            return false;
        }

        if self.polarity == Polarity::Unknown {
            self.polarity = identify(&frame);
            if self.polarity != Polarity::Unknown {
                debug!(
                    "Capture identified as {:?} by frame {}",
                    self.polarity,
                    frame.display_label()
                );
            }
        }

        self.frames.push(frame);
        true
    }

    /// Force an unidentified capture to AddRef
    ///
    /// Used for the first capture of a trace, which is normally the object's construction.
    pub fn default_to_addref(&mut self) {
        if self.polarity == Polarity::Unknown {
            self.polarity = Polarity::AddRef;
        }
    }

    /// Frame at `level` counted from the outermost caller (level 1 = outermost)
    ///
    /// Level 0 stands for the tree root and has no frame.
    pub fn frame_from_top(&self, level: usize) -> Option<&StackFrame> {
        if level == 0 || level > self.frames.len() {
            return None;
        }
        self.frames.get(self.frames.len() - level)
    }
}

/// **Private** - run the allow-list against one frame
fn identify(frame: &StackFrame) -> Polarity {
    if ADDREF_RULES.iter().any(|rule| rule_matches(rule, frame)) {
        Polarity::AddRef
    } else if RELEASE_RULES.iter().any(|rule| rule_matches(rule, frame)) {
        Polarity::Release
    } else {
        Polarity::Unknown
    }
}

fn rule_matches(rule: &PolarityRule, frame: &StackFrame) -> bool {
    match *rule {
        PolarityRule::Function(text) => frame.function.contains(text),
        PolarityRule::Source(text) => frame.source_location.contains(text),
        PolarityRule::FunctionAtOffset(function, offset) => {
            frame.function.contains(function) && frame.offset.contains(offset)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(text: &str, index: usize) -> StackFrame {
        StackFrame::parse(text, index).unwrap()
    }

    #[test]
    fn test_add_line_requires_contiguous_indices() {
        let mut stack = RefCountStack::new(1);

        assert!(!stack.add_line(frame("m!A+0x1", 1)));
        assert!(stack.add_line(frame("m!A+0x1", 0)));
        assert!(!stack.add_line(frame("m!B+0x1", 2)));
        assert!(stack.add_line(frame("m!B+0x1", 1)));
        assert_eq!(stack.frames().len(), 2);
    }

    #[test]
    fn test_polarity_from_first_matching_frame() {
        let mut stack = RefCountStack::new(2);
        stack.add_line(frame("m!Helper::Work+0x10", 0));
        assert_eq!(stack.polarity(), Polarity::Unknown);

        stack.add_line(frame("m!Foo::Release+0x10", 1));
        assert_eq!(stack.polarity(), Polarity::Release);

        // Fixed once identified
        stack.add_line(frame("m!Foo::AddRef+0x10", 2));
        assert_eq!(stack.polarity(), Polarity::Release);
    }

    #[test]
    fn test_addref_rules_win_over_release_rules() {
        let mut stack = RefCountStack::new(1);
        stack.add_line(frame("m!ReleaseHolder::AddRef+0x4", 0));
        assert_eq!(stack.polarity(), Polarity::AddRef);
    }

    #[test]
    fn test_resolve_offset_rules() {
        let mut addref = RefCountStack::new(1);
        addref.add_line(frame("m!WeakReferenceImpl::Resolve+0x23", 0));
        assert_eq!(addref.polarity(), Polarity::AddRef);

        let mut release = RefCountStack::new(1);
        release.add_line(frame("m!WeakReferenceImpl::Resolve+0x3b", 0));
        assert_eq!(release.polarity(), Polarity::Release);
    }

    #[test]
    fn test_source_rule() {
        let mut stack = RefCountStack::new(1);
        stack.add_line(frame("m!Anything+0x5 [d:\\src\\WeakReference.cpp @ 25]", 0));
        assert_eq!(stack.polarity(), Polarity::AddRef);
    }

    #[test]
    fn test_default_to_addref_only_when_unknown() {
        let mut unknown = RefCountStack::new(1);
        unknown.add_line(frame("m!Ctor+0x1", 0));
        unknown.default_to_addref();
        assert_eq!(unknown.polarity(), Polarity::AddRef);

        let mut release = RefCountStack::new(0);
        release.add_line(frame("m!Foo::Release+0x1", 0));
        release.default_to_addref();
        assert_eq!(release.polarity(), Polarity::Release);
    }

    #[test]
    fn test_frame_from_top() {
        let mut stack = RefCountStack::new(1);
        stack.add_line(frame("m!Inner+0x1", 0));
        stack.add_line(frame("m!Outer+0x1", 1));

        assert!(stack.frame_from_top(0).is_none());
        assert_eq!(stack.frame_from_top(1).unwrap().function, "Outer");
        assert_eq!(stack.frame_from_top(2).unwrap().function, "Inner");
        assert!(stack.frame_from_top(3).is_none());
    }
}
