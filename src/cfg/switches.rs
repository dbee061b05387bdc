//! Switch payload resolution: replacing a switch node's payload address
//! with the expanded, method-relative case targets.

use log::warn;

use super::node::Node;
use crate::insns::{ControlKind, PACKED_SWITCH_SIGNATURE, SPARSE_SWITCH_SIGNATURE};

/// A decoded switch payload table. All offsets in the payload are relative
/// to the switch instruction, for both variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchPayload {
    Packed { first_key: i32, targets: Vec<u32> },
    Sparse { keys: Vec<i32>, targets: Vec<u32> },
}

impl SwitchPayload {
    /// Read the payload at code-unit index `payload_at`, resolving each
    /// listed offset against `switch_offset`. `None` on an unrecognized
    /// ident or a truncated table.
    pub fn read(switch_offset: u32, payload_at: usize, code: &[u16]) -> Option<Self> {
        let ident = *code.get(payload_at)?;
        let size = *code.get(payload_at + 1)? as usize;
        match ident {
            PACKED_SWITCH_SIGNATURE => {
                let first_key = read_i32(code, payload_at + 2)?;
                let base = payload_at + 4;
                let mut targets = Vec::with_capacity(size);
                for i in 0..size {
                    let rel = read_i32(code, base + i * 2)?;
                    targets.push(switch_offset.wrapping_add_signed(rel));
                }
                Some(SwitchPayload::Packed { first_key, targets })
            }
            SPARSE_SWITCH_SIGNATURE => {
                let mut keys = Vec::with_capacity(size);
                for i in 0..size {
                    keys.push(read_i32(code, payload_at + 2 + i * 2)?);
                }
                let base = payload_at + 2 + size * 2;
                let mut targets = Vec::with_capacity(size);
                for i in 0..size {
                    let rel = read_i32(code, base + i * 2)?;
                    targets.push(switch_offset.wrapping_add_signed(rel));
                }
                Some(SwitchPayload::Sparse { keys, targets })
            }
            _ => None,
        }
    }

    pub fn into_targets(self) -> Vec<u32> {
        match self {
            SwitchPayload::Packed { targets, .. } => targets,
            SwitchPayload::Sparse { targets, .. } => targets,
        }
    }
}

fn read_i32(code: &[u16], at: usize) -> Option<i32> {
    let lo = *code.get(at)? as u32;
    let hi = *code.get(at + 1)? as u32;
    Some((hi << 16 | lo) as i32)
}

/// Expand every SWITCH node's `branch_targets` from its payload table.
///
/// Returns the indices of switch nodes whose payload could not be read;
/// their target lists are emptied and they must not receive a fall-through
/// edge either.
pub fn resolve_payloads(nodes: &mut [Node], code: &[u16]) -> Vec<usize> {
    let mut poisoned = Vec::new();
    for i in 0..nodes.len() {
        if nodes[i].kind != ControlKind::Switch {
            continue;
        }
        let switch_offset = nodes[i].intern_offset;
        let payload_at = match nodes[i].branch_targets.first() {
            Some(&addr) => addr as usize,
            None => {
                poisoned.push(i);
                continue;
            }
        };
        match SwitchPayload::read(switch_offset, payload_at, code) {
            Some(payload) => nodes[i].branch_targets = payload.into_targets(),
            None => {
                warn!(
                    "switch at {:#06x}: unreadable payload at {:#06x}",
                    switch_offset, payload_at
                );
                nodes[i].branch_targets.clear();
                poisoned.push(i);
            }
        }
    }
    poisoned
}
