use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use crate::insns::{ControlKind, Opcode};

/// Identity of a method within a DEX, resolved through the method-id table.
///
/// Equality, ordering, and hashing all go by `method_idx` alone; the
/// resolved strings are carried for diagnostics and listings.
#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub method_idx: u32,
    pub class_idx: u32,
    pub proto_idx: u32,
    pub name_idx: u32,
    pub class_descriptor: String,
    pub name: String,
    pub signature: String,
}

impl MethodInfo {
    /// `Lcom/example/Foo;bar(I)V`
    pub fn fullname(&self) -> String {
        format!("{}{}{}", self.class_descriptor, self.name, self.signature)
    }
}

impl PartialEq for MethodInfo {
    fn eq(&self, other: &Self) -> bool {
        self.method_idx == other.method_idx
    }
}

impl Eq for MethodInfo {}

impl PartialOrd for MethodInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MethodInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.method_idx.cmp(&other.method_idx)
    }
}

impl Hash for MethodInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.method_idx.hash(state);
    }
}

/// Stable reference to a node in the program arena:
/// `program.methods[method].nodes[node]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub method: u32,
    pub node: u32,
}

impl NodeRef {
    pub fn new(method: u32, node: usize) -> Self {
        Self {
            method,
            node: node as u32,
        }
    }
}

/// One instruction in a method graph.
#[derive(Debug, Clone)]
pub struct Node {
    /// Byte offset of this instruction within the DEX image; the stable
    /// identity used by both emitters.
    pub base_addr: u64,
    /// Offset in code units from the start of the method's insns.
    pub intern_offset: u32,
    /// Width in code units.
    pub size: u32,
    pub opcode: Opcode,
    pub kind: ControlKind,
    /// Callee identity, populated for CALL nodes whose method-id lookup
    /// succeeded.
    pub called: Option<MethodInfo>,
    /// Method-relative code-unit targets: one element for IF/JMP, the
    /// payload address and later the expanded case list for SWITCH.
    pub branch_targets: Vec<u32>,
    pub successors: Vec<NodeRef>,
}

#[cfg(test)]
mod tests {
    use super::MethodInfo;
    use std::collections::HashSet;

    fn info(method_idx: u32, name: &str) -> MethodInfo {
        MethodInfo {
            method_idx,
            class_idx: 0,
            proto_idx: 0,
            name_idx: 0,
            class_descriptor: "LFoo;".into(),
            name: name.into(),
            signature: "()V".into(),
        }
    }

    #[test]
    fn identity_is_the_method_index() {
        assert_eq!(info(7, "a"), info(7, "b"));
        assert_ne!(info(7, "a"), info(8, "a"));
        assert!(info(1, "z") < info(2, "a"));

        let mut set = HashSet::new();
        set.insert(info(7, "a"));
        assert!(set.contains(&info(7, "b")));
    }

    #[test]
    fn fullname_concatenates_descriptor_name_signature() {
        assert_eq!(info(0, "bar").fullname(), "LFoo;bar()V");
    }
}
