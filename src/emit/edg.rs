//! The EDG binary layout, written through one run-scoped writer:
//! the magic once, then a count-prefixed node block, then edge records
//! until end of file.

use std::collections::HashSet;
use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::cfg::{NodeRef, ProgramGraph};

pub const EDG_MAGIC: &[u8; 8] = b"GRAPHBIN";

pub struct EdgWriter<W: Write> {
    out: W,
}

impl<W: Write> EdgWriter<W> {
    /// Open the stream and emit the magic.
    pub fn new(mut out: W) -> io::Result<Self> {
        out.write_all(EDG_MAGIC)?;
        Ok(Self { out })
    }

    /// The node block: a `u32` count, then `'n'`, `u64` base address,
    /// `u32` control kind per node. Dangling nodes are included.
    pub fn write_nodes(&mut self, programs: &[ProgramGraph]) -> io::Result<()> {
        let count: usize = programs.iter().map(ProgramGraph::node_count).sum();
        self.out.write_u32::<LittleEndian>(count as u32)?;
        for program in programs {
            for graph in &program.methods {
                for node in &graph.nodes {
                    self.out.write_all(b"n")?;
                    self.out.write_u64::<LittleEndian>(node.base_addr)?;
                    self.out.write_u32::<LittleEndian>(node.kind as u32)?;
                }
            }
        }
        Ok(())
    }

    /// The edge block: `'e'`, parent `u64`, child `u64` for every edge
    /// reachable from a method entry. The DFS mirrors the DOT emitter so
    /// each node's out-edges are written exactly once.
    pub fn write_edges(&mut self, programs: &[ProgramGraph]) -> io::Result<()> {
        for program in programs {
            let mut visited: HashSet<u64> = HashSet::new();
            let mut stack: Vec<NodeRef> = Vec::new();
            for (m, graph) in program.methods.iter().enumerate() {
                let Some(entry) = graph.entry else {
                    continue;
                };
                stack.push(NodeRef::new(m as u32, entry));
                while let Some(r) = stack.pop() {
                    let node = program.node(r);
                    if !visited.insert(node.base_addr) {
                        continue;
                    }
                    for succ in &node.successors {
                        self.out.write_all(b"e")?;
                        self.out.write_u64::<LittleEndian>(node.base_addr)?;
                        self.out
                            .write_u64::<LittleEndian>(program.node(*succ).base_addr)?;
                    }
                    stack.extend(node.successors.iter().rev().copied());
                }
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
