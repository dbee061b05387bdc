//! Per-method control-flow graph construction and the program-wide arena.
//!
//! Nodes are grouped into clusters (runs terminated by IF/JMP/SWITCH/RET),
//! then successor edges are installed: fall-through plus branch target for
//! IF, target for JMP, the payload cases plus fall-through for SWITCH.
//! CALL edges across methods are added last, once every method is built.

mod node;
pub mod switches;

pub use node::{MethodInfo, Node, NodeRef};

use std::collections::{BTreeMap, HashMap};

use crate::insns::{self, ControlKind, DecodeError};

/// Build the node list for one method from its code units.
///
/// `code_base` is the byte offset of the first code unit within the DEX
/// image; `resolve_call` maps an invoke instruction's method index to its
/// identity (returning `None` for out-of-range or unresolvable indices).
pub fn build_nodes<F>(
    code: &[u16],
    code_base: u64,
    mut resolve_call: F,
) -> Result<Vec<Node>, DecodeError>
where
    F: FnMut(u16) -> Option<MethodInfo>,
{
    let mut nodes = Vec::new();
    let mut offset = 0usize;
    while offset < code.len() {
        let insn = insns::decode(code, offset)?;
        let kind = insn.opcode.kind();
        let mut branch_targets = Vec::new();
        if matches!(kind, ControlKind::If | ControlKind::Jmp | ControlKind::Switch) {
            if let Some(disp) = insn.format.branch_offset() {
                branch_targets.push((offset as u32).wrapping_add_signed(disp));
            }
        }
        let called = if kind == ControlKind::Call {
            insn.format.method_index().and_then(&mut resolve_call)
        } else {
            None
        };
        nodes.push(Node {
            base_addr: code_base + (offset as u64) * 2,
            intern_offset: offset as u32,
            size: insn.width as u32,
            opcode: insn.opcode,
            kind,
            called,
            branch_targets,
            successors: Vec::new(),
        });
        offset += insn.width;
    }
    Ok(nodes)
}

/// Install successor edges over a method's node list.
///
/// `method` is the index this method will occupy in the program arena;
/// `poisoned_switches` are node indices whose payload was unreadable and
/// which therefore keep an empty successor list.
pub fn connect(nodes: &mut [Node], method: u32, poisoned_switches: &[usize]) {
    if nodes.is_empty() {
        return;
    }

    // Clustering: a cluster closes after IF/JMP/SWITCH/RET; CALL and THROW
    // do not close one. Within a cluster every node is linked to its
    // lexical successor, except RET and THROW, which never carry
    // successors, and CALL, whose only successor is the callee entry
    // installed by call linking.
    let mut clusters: Vec<(u32, std::ops::Range<usize>)> = Vec::new();
    let mut start = 0usize;
    for i in 0..nodes.len() {
        let kind = nodes[i].kind;
        let closes = matches!(
            kind,
            ControlKind::If | ControlKind::Jmp | ControlKind::Switch | ControlKind::Ret
        );
        if closes || i + 1 == nodes.len() {
            clusters.push((nodes[start].intern_offset, start..i + 1));
            start = i + 1;
        } else if !matches!(
            kind,
            ControlKind::Ret | ControlKind::Throw | ControlKind::Call
        ) {
            nodes[i].successors.push(NodeRef::new(method, i + 1));
        }
    }

    // Head offsets are unique by construction, as are node offsets.
    let heads: BTreeMap<u32, usize> = clusters.iter().map(|(off, r)| (*off, r.start)).collect();
    let offsets: HashMap<u32, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.intern_offset, i))
        .collect();

    for (_, range) in &clusters {
        let t = range.end - 1;
        match nodes[t].kind {
            ControlKind::If => {
                // fall-through first, then the branch target
                let fall = nodes[t].intern_offset + nodes[t].size;
                if let Some(&head) = heads.get(&fall) {
                    nodes[t].successors.push(NodeRef::new(method, head));
                }
                if let Some(&target) = nodes[t].branch_targets.first() {
                    if let Some(&head) = heads.get(&target) {
                        nodes[t].successors.push(NodeRef::new(method, head));
                    }
                }
            }
            ControlKind::Jmp => {
                // a goto may land inside a cluster, so match any offset
                if let Some(&target) = nodes[t].branch_targets.first() {
                    if let Some(&idx) = offsets.get(&target) {
                        nodes[t].successors.push(NodeRef::new(method, idx));
                    }
                }
            }
            ControlKind::Switch => {
                let targets = nodes[t].branch_targets.clone();
                for target in targets {
                    if let Some(&head) = heads.get(&target) {
                        nodes[t].successors.push(NodeRef::new(method, head));
                    }
                }
                if !poisoned_switches.contains(&t) {
                    // a case may target the lexical next instruction; that
                    // offset is then not a separate fall-through
                    let fall = nodes[t].intern_offset + nodes[t].size;
                    if !nodes[t].branch_targets.contains(&fall) {
                        if let Some(&head) = heads.get(&fall) {
                            nodes[t].successors.push(NodeRef::new(method, head));
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// One method's arena: its nodes and entry point.
#[derive(Debug)]
pub struct MethodGraph {
    pub info: MethodInfo,
    pub nodes: Vec<Node>,
    pub entry: Option<usize>,
}

impl MethodGraph {
    /// Resolve switch payloads, install edges, and pick the entry (the
    /// cluster headed at offset 0).
    pub fn build(info: MethodInfo, mut nodes: Vec<Node>, code: &[u16], method: u32) -> Self {
        let poisoned = switches::resolve_payloads(&mut nodes, code);
        connect(&mut nodes, method, &poisoned);
        let entry = if nodes.is_empty() { None } else { Some(0) };
        Self { info, nodes, entry }
    }
}

/// Every method graph of one DEX. Successor references are indices into
/// this arena, so nothing here is reference counted and cycles are free.
#[derive(Debug, Default)]
pub struct ProgramGraph {
    pub methods: Vec<MethodGraph>,
}

impl ProgramGraph {
    pub fn node(&self, r: NodeRef) -> &Node {
        &self.methods[r.method as usize].nodes[r.node as usize]
    }

    pub fn node_count(&self) -> usize {
        self.methods.iter().map(|m| m.nodes.len()).sum()
    }

    /// Connect every CALL node to its callee's entry when the callee is
    /// defined in this DEX.
    pub fn link_calls(&mut self) {
        let entries: HashMap<u32, NodeRef> = self
            .methods
            .iter()
            .enumerate()
            .filter_map(|(m, graph)| {
                graph
                    .entry
                    .map(|e| (graph.info.method_idx, NodeRef::new(m as u32, e)))
            })
            .collect();
        for graph in &mut self.methods {
            for node in &mut graph.nodes {
                if node.kind != ControlKind::Call {
                    continue;
                }
                if let Some(info) = &node.called {
                    if let Some(&entry) = entries.get(&info.method_idx) {
                        node.successors.push(entry);
                    }
                }
            }
        }
    }
}
