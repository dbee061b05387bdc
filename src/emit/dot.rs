//! DOT output: one `digraph` per method, labelled with the entry address.

use std::collections::HashSet;
use std::io::{self, Write};

use crate::cfg::{NodeRef, ProgramGraph};

use super::formatted_hex;

const TAB: &str = "  ";

/// Dump one method's graph as a `digraph` block.
///
/// Depth-first from the entry, leftmost successor first. The visited set is
/// keyed by `base_addr`, so a node reached twice (joins, back-edges) is
/// printed once while every edge into it still appears.
pub fn dump_method<W: Write>(
    program: &ProgramGraph,
    method: usize,
    out: &mut W,
) -> io::Result<()> {
    let graph = &program.methods[method];
    let Some(entry) = graph.entry else {
        return Ok(());
    };

    writeln!(out, "digraph {{")?;
    writeln!(
        out,
        "{TAB}label=\"{}\"",
        formatted_hex(graph.nodes[entry].base_addr)
    )?;

    let mut visited: HashSet<u64> = HashSet::new();
    let mut stack = vec![NodeRef::new(method as u32, entry)];
    while let Some(r) = stack.pop() {
        let node = program.node(r);
        if !visited.insert(node.base_addr) {
            continue;
        }
        writeln!(
            out,
            "{TAB}\"{}\"[label=\"{}\"];",
            formatted_hex(node.base_addr),
            node.kind.name()
        )?;
        for succ in &node.successors {
            writeln!(
                out,
                "{TAB}\"{}\" -> \"{}\";",
                formatted_hex(node.base_addr),
                formatted_hex(program.node(*succ).base_addr)
            )?;
        }
        stack.extend(node.successors.iter().rev().copied());
    }

    writeln!(out, "}}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::{build_nodes, MethodGraph, MethodInfo, ProgramGraph};

    fn info() -> MethodInfo {
        MethodInfo {
            method_idx: 0,
            class_idx: 0,
            proto_idx: 0,
            name_idx: 0,
            class_descriptor: "LTest;".into(),
            name: "m".into(),
            signature: "()V".into(),
        }
    }

    fn program_of(code: &[u16]) -> ProgramGraph {
        let nodes = build_nodes(code, 0, |_| None).unwrap();
        ProgramGraph {
            methods: vec![MethodGraph::build(info(), nodes, code, 0)],
        }
    }

    fn dot_of(code: &[u16]) -> String {
        let program = program_of(code);
        let mut out = Vec::new();
        dump_method(&program, 0, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn single_return_is_a_single_vertex_digraph() {
        let dot = dot_of(&[0x000E]);
        assert_eq!(
            dot,
            "digraph {\n  label=\"0x0000\"\n  \"0x0000\"[label=\"RET\"];\n}\n"
        );
    }

    #[test]
    fn goto_loop_prints_both_nodes_and_both_edges() {
        // nop; goto -1
        let dot = dot_of(&[0x0000, 0xFF28]);
        assert!(dot.contains("\"0x0000\"[label=\"SEQ\"];"));
        assert!(dot.contains("\"0x0002\"[label=\"JMP\"];"));
        assert!(dot.contains("\"0x0000\" -> \"0x0002\";"));
        assert!(dot.contains("\"0x0002\" -> \"0x0000\";"));
    }

    #[test]
    fn conditional_emits_fall_through_branch_first() {
        let code = [0x0038, 0x0004, 0x0012, 0x000E, 0x1012, 0x000E];
        let dot = dot_of(&code);
        // the IF's out-edges appear in successor order
        let fall = dot.find("\"0x0000\" -> \"0x0004\";").unwrap();
        let branch = dot.find("\"0x0000\" -> \"0x0008\";").unwrap();
        assert!(fall < branch);
        // and the fall-through subtree is fully visited before the branch
        let fall_node = dot.find("\"0x0004\"[label=").unwrap();
        let branch_node = dot.find("\"0x0008\"[label=").unwrap();
        assert!(fall_node < branch_node);
    }

    #[test]
    fn output_is_deterministic() {
        let code = [0x0038, 0x0004, 0x0012, 0x000E, 0x1012, 0x000E];
        assert_eq!(dot_of(&code), dot_of(&code));
    }
}
