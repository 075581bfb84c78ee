//! Pretty-printing for IR
//!
//! Provides human-readable output for debugging IR structures.

use super::navigate::NodeRef;
use super::tree::IrTree;
use std::fmt::Write;

/// Trait for pretty-printing IR constructs
pub trait PrettyPrint {
    fn pretty_print(&self) -> String;
}

impl PrettyPrint for IrTree {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        if let Some(root) = self.root_node() {
            print_node(&mut output, root, 0);
        }
        output
    }
}

impl PrettyPrint for NodeRef<'_> {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        print_node(&mut output, *self, 0);
        output
    }
}

fn print_node(output: &mut String, node: NodeRef<'_>, depth: usize) {
    let prefix = "  ".repeat(depth);
    let _ = write!(output, "{}{}", prefix, node.kind().label());
    if let Some(slot) = node.slot() {
        let _ = write!(output, " @{}", slot);
    }
    output.push('\n');
    for child in node.children() {
        print_node(output, child, depth + 1);
    }
}
