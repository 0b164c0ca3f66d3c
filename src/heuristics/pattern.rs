//! Heuristic definitions and frame-chain compilation.
//!
//! A chain such as `Outer --> Middle -> Inner` reads outermost to innermost:
//! - `->` requires the next frame to be called directly by the previous one
//! - `-->` allows any number of frames in between
//!
//! The last frame of a chain must land on a leaf row.

use crate::utils::config::{IMMEDIATE_SEPARATOR, TRANSITIVE_SEPARATOR};
use std::fmt;

/// One frame of a compiled chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePattern {
    /// Lowercased substring to look for in a row label
    pub text: String,

    /// Whether this frame must be called directly by the previous (outer) frame
    pub immediate: bool,
}

impl FramePattern {
    pub fn new(text: impl AsRef<str>, immediate: bool) -> Self {
        Self {
            text: text.as_ref().to_lowercase(),
            immediate,
        }
    }
}

/// Split a chain string into frames, outermost first
///
/// **Public** - used when compiling heuristics
///
/// Each `-->` group starts with a non-immediate frame, except the very first
/// group, whose first frame counts as immediate. That flag only matters for
/// wildcard-scoped rules, where an extra frame for the scope is put in front.
/// Empty segments are dropped but still take part in that numbering, so
/// `-> Inner` yields one immediate frame and `--> Inner` a non-immediate one.
pub fn split_chain(text: &str) -> Vec<FramePattern> {
    let mut frames = Vec::new();

    for (group_index, group) in text.split(TRANSITIVE_SEPARATOR).enumerate() {
        let mut immediate = group_index == 0;
        for segment in group.split(IMMEDIATE_SEPARATOR) {
            let segment = segment.trim();
            if !segment.is_empty() {
                frames.push(FramePattern::new(segment, immediate));
            }
            immediate = true;
        }
    }

    frames
}

/// Where the Release of a pattern heuristic must be found relative to its AddRef
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
    /// Anywhere after the AddRef in row order
    #[default]
    None,
    /// Under a sibling call of the named function, next to the AddRef's call
    Named(String),
    /// Under a sibling of whatever frame directly calls the AddRef chain
    Wildcard,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::None => Ok(()),
            Scope::Named(name) => write!(f, "{}", name),
            Scope::Wildcard => write!(f, "{}", crate::utils::config::WILDCARD_SCOPE_KEYWORD),
        }
    }
}

/// AddRef chain, Release alternatives and scope, with the compiled chains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternHeuristic {
    /// AddRef chain as written
    pub addref: String,

    /// Release chain alternatives as written
    pub releases: Vec<String>,

    pub scope: Scope,

    addref_chain: Vec<FramePattern>,
    release_chains: Vec<Vec<FramePattern>>,
}

impl PatternHeuristic {
    /// Compile the written chains
    ///
    /// A named scope becomes the outermost, non-immediate frame of every chain.
    /// Release alternatives that compile to nothing are left out.
    ///
    /// # Returns
    /// `None` if the AddRef chain or every Release chain is empty
    pub fn new(addref: impl Into<String>, releases: Vec<String>, scope: Scope) -> Option<Self> {
        let addref = addref.into();
        let compile = |chain: &str| match &scope {
            Scope::Named(name) => split_chain(&format!("{} {} {}", name, TRANSITIVE_SEPARATOR, chain)),
            Scope::None | Scope::Wildcard => split_chain(chain),
        };

        // The scope alone does not make a chain
        let scope_frames = usize::from(matches!(scope, Scope::Named(_)));

        let addref_chain = compile(&addref);
        if addref_chain.len() <= scope_frames {
            return None;
        }

        let release_chains: Vec<_> = releases
            .iter()
            .map(|release| compile(release))
            .filter(|chain| chain.len() > scope_frames)
            .collect();
        if release_chains.is_empty() {
            return None;
        }

        Some(Self {
            addref,
            releases,
            scope,
            addref_chain,
            release_chains,
        })
    }

    pub fn addref_chain(&self) -> &[FramePattern] {
        &self.addref_chain
    }

    pub fn release_chains(&self) -> &[Vec<FramePattern>] {
        &self.release_chains
    }
}

/// How a heuristic locates its AddRef/Release pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeuristicKind {
    /// Two known row numbers, tagged as-is
    LineMatch { addref_row: usize, release_row: usize },
    /// Chain search over the tree
    Pattern(PatternHeuristic),
}

/// A named AddRef/Release pairing rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heuristic {
    pub name: String,
    pub kind: HeuristicKind,
}

impl Heuristic {
    pub fn line_match(name: impl Into<String>, addref_row: usize, release_row: usize) -> Self {
        Self {
            name: name.into(),
            kind: HeuristicKind::LineMatch {
                addref_row,
                release_row,
            },
        }
    }

    /// Pattern heuristic, or `None` when the chains compile to nothing
    pub fn pattern(
        name: impl Into<String>,
        scope: Scope,
        addref: impl Into<String>,
        releases: Vec<String>,
    ) -> Option<Self> {
        Some(Self {
            name: name.into(),
            kind: HeuristicKind::Pattern(PatternHeuristic::new(addref, releases, scope)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_chain_flags() {
        assert_eq!(
            split_chain("First --> Second -> Last"),
            vec![
                FramePattern::new("First", true),
                FramePattern::new("Second", false),
                FramePattern::new("Last", true),
            ]
        );
    }

    #[test]
    fn test_split_chain_leading_separators() {
        assert_eq!(split_chain("-> Inner"), vec![FramePattern::new("Inner", true)]);
        assert_eq!(split_chain("--> Inner"), vec![FramePattern::new("Inner", false)]);
        assert_eq!(split_chain("Single"), vec![FramePattern::new("Single", true)]);
        assert!(split_chain("  ").is_empty());
    }

    #[test]
    fn test_frame_text_is_lowercased() {
        let frames = split_chain("Owner::Run --> Foo::AddRef");
        assert_eq!(frames[0].text, "owner::run");
        assert_eq!(frames[1].text, "foo::addref");
    }

    #[test]
    fn test_named_scope_is_prepended_transitively() {
        let heuristic = PatternHeuristic::new(
            "-> Foo::AddRef",
            vec!["Foo::Release".to_string()],
            Scope::Named("Owner::Run".to_string()),
        )
        .unwrap();

        // An explicit leading "->" still pins the AddRef right below the scope
        assert_eq!(
            heuristic.addref_chain(),
            &[FramePattern::new("Owner::Run", true), FramePattern::new("Foo::AddRef", true)]
        );
        assert_eq!(
            heuristic.release_chains()[0],
            vec![FramePattern::new("Owner::Run", true), FramePattern::new("Foo::Release", false)]
        );
    }

    #[test]
    fn test_wildcard_scope_is_not_prepended() {
        let heuristic =
            PatternHeuristic::new("Foo::AddRef", vec!["Foo::Release".to_string()], Scope::Wildcard).unwrap();
        assert_eq!(heuristic.addref_chain().len(), 1);
    }

    #[test]
    fn test_empty_chains_are_rejected() {
        assert!(PatternHeuristic::new("", vec!["Foo::Release".to_string()], Scope::None).is_none());
        assert!(PatternHeuristic::new("Foo::AddRef", vec![" -> ".to_string()], Scope::None).is_none());
        assert!(PatternHeuristic::new(
            " ",
            vec!["Foo::Release".to_string()],
            Scope::Named("Owner".to_string())
        )
        .is_none());

        let partial = PatternHeuristic::new(
            "Foo::AddRef",
            vec!["".to_string(), "Foo::Release".to_string()],
            Scope::None,
        )
        .unwrap();
        assert_eq!(partial.release_chains().len(), 1);
        assert_eq!(partial.releases.len(), 2);
    }
}
