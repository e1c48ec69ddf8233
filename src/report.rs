//! Rendering of the run report: elapsed time, the execution log in
//! completion order, and the final tree in the same preorder format the
//! input uses, so a report's tree line can seed the next run.

use crate::dispatch::RunOutcome;
use crate::rbtree::{Color, PreorderItem, RbTree};

/// The tree as a preorder CSV line; `f` alone for an empty tree.
pub fn preorder_line(tree: &RbTree) -> String {
    let mut out = String::new();
    for (i, item) in tree.preorder().into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        match item {
            PreorderItem::Leaf => out.push('f'),
            PreorderItem::Node { key, color } => {
                let tag = if color == Color::Red { 'r' } else { 'b' };
                out.push_str(&format!("{key}{tag}"));
            }
        }
    }
    out
}

pub fn render(outcome: &RunOutcome, tree: &RbTree) -> String {
    let millis = outcome.elapsed.as_secs_f64() * 1_000.0;
    let mut out = format!("Execution time: {millis:.3} ms\n\n");
    for record in &outcome.log {
        out.push_str(&record.to_string());
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&preorder_line(tree));
    out.push('\n');
    out
}
