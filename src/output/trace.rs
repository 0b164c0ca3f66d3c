//! Annotated trace writer.
//!
//! Writes the tree back in the trace dump format, one capture block per leaf,
//! with every frame's tag appended as a `//` comment. Loading the written text
//! rebuilds the same tree with the same tags.

use super::{file_size, prepare_output_path};
use crate::tree::{CallTree, NodeId};
use crate::utils::config::{
    ALL_CHILDREN_ACCOUNTED_FOR, COMMENT_KEYWORD, REF_COUNT_IS, STACK_BEGIN, STACK_END,
    TIME_TRAVEL_POSITION,
};
use crate::utils::error::OutputError;
use log::info;
use std::fmt::Write as _;
use std::path::Path;

/// Render a tree in trace dump format
///
/// **Public** - main entry point for saving an analysis
///
/// Propagation markers are left out. They are recomputed on load.
pub fn render_trace(tree: &CallTree) -> String {
    let mut out = String::new();
    if tree.is_empty() {
        return out;
    }

    for (id, node) in tree.rows().iter().enumerate() {
        if node.is_root() || !node.children.is_empty() {
            continue;
        }

        let _ = writeln!(out, "{}{}", REF_COUNT_IS, node.captured_ref_count);
        if !node.position.is_empty() {
            let _ = writeln!(out, "{}{}", TIME_TRAVEL_POSITION, node.position);
        }
        let _ = writeln!(out, "{}", STACK_BEGIN);
        write_frames(&mut out, tree, id);
        let _ = writeln!(out, "{}", STACK_END);
        out.push('\n');
    }

    out
}

/// Frames from `leaf` outwards, stopping below the root
fn write_frames(out: &mut String, tree: &CallTree, leaf: NodeId) {
    let frames = std::iter::once(leaf).chain(tree.ancestors(leaf));

    for id in frames {
        let node = tree.node(id);
        if node.is_root() {
            break;
        }

        out.push_str(&node.label);
        if !node.tag.is_empty() && node.tag != ALL_CHILDREN_ACCOUNTED_FOR {
            let _ = write!(out, " {} {}", COMMENT_KEYWORD, node.tag);
        }
        out.push('\n');
    }
}

/// Write a tree to disk in trace dump format
///
/// # Errors
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
/// * `OutputError::WriteFailed` - I/O error during write
pub fn write_trace(tree: &CallTree, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();
    info!("Writing annotated trace to: {}", output_path.display());

    prepare_output_path(output_path)?;
    std::fs::write(output_path, render_trace(tree)).map_err(OutputError::WriteFailed)?;

    info!("Trace written successfully ({} bytes)", file_size(output_path));
    Ok(())
}
