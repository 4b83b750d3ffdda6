//! Arena-backed tree skeleton
//!
//! Nodes live in a contiguous `Vec` and refer to each other by [`NodeId`].
//! Children lists carry the ownership relation; the parent link is a plain
//! back-reference index, so the structure has no ownership cycles.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Index of a node in a [`TreeSkeleton`]
pub type NodeId = usize;

/// A node of the branching skeleton
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub position: Vec3,
    /// Distance from the root in edges (root = 0)
    pub depth: u32,
    /// Branch radius, zero until radii are assigned
    pub radius: f32,
    pub parent: Option<NodeId>,
    /// Children in creation order
    pub children: Vec<NodeId>,
}

impl TreeNode {
    fn new_root(position: Vec3) -> Self {
        Self {
            position,
            depth: 0,
            radius: 0.0,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Branch tip: a node that never grew a child
    pub fn is_tip(&self) -> bool {
        self.children.is_empty()
    }
}

/// Structural defect found by [`TreeSkeleton::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkeletonDefect {
    NoRoot,
    MultipleRoots(Vec<NodeId>),
    DanglingParent { node: NodeId, parent: NodeId },
    ChildLinkMismatch { node: NodeId, parent: NodeId },
    DepthMismatch { node: NodeId },
    Unreachable { node: NodeId },
}

/// Rooted tree of [`TreeNode`]s stored in an arena
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeSkeleton {
    nodes: Vec<TreeNode>,
}

impl TreeSkeleton {
    /// Create a skeleton containing only a root node (id 0)
    pub fn with_root(position: Vec3) -> Self {
        Self {
            nodes: vec![TreeNode::new_root(position)],
        }
    }

    /// Append a child of `parent` and return its id
    pub fn add_child(&mut self, parent: NodeId, position: Vec3) -> NodeId {
        let id = self.nodes.len();
        let depth = self.nodes[parent].depth + 1;
        self.nodes.push(TreeNode {
            position,
            depth,
            radius: 0.0,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id]
    }

    /// Id of the unique parentless node
    pub fn root(&self) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.parent.is_none())
    }

    pub fn positions(&self) -> Vec<Vec3> {
        self.nodes.iter().map(|n| n.position).collect()
    }

    pub fn max_depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    pub fn tip_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_tip()).count()
    }

    /// Node ids in pre-order, starting at the root
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let Some(root) = self.root() else {
            return order;
        };
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        order
    }

    /// Check the rooted-tree invariants: one root, consistent parent/child
    /// links, `depth == parent.depth + 1`, every node reachable from the root
    pub fn validate(&self) -> Result<(), SkeletonDefect> {
        let roots: Vec<NodeId> = (0..self.nodes.len())
            .filter(|&i| self.nodes[i].parent.is_none())
            .collect();
        let root = match roots.as_slice() {
            [] => return Err(SkeletonDefect::NoRoot),
            [root] => *root,
            _ => return Err(SkeletonDefect::MultipleRoots(roots)),
        };

        for (id, node) in self.nodes.iter().enumerate() {
            let Some(parent) = node.parent else {
                if node.depth != 0 {
                    return Err(SkeletonDefect::DepthMismatch { node: id });
                }
                continue;
            };
            let Some(parent_node) = self.nodes.get(parent) else {
                return Err(SkeletonDefect::DanglingParent { node: id, parent });
            };
            if parent_node.children.iter().filter(|&&c| c == id).count() != 1 {
                return Err(SkeletonDefect::ChildLinkMismatch { node: id, parent });
            }
            if node.depth != parent_node.depth + 1 {
                return Err(SkeletonDefect::DepthMismatch { node: id });
            }
        }

        // Each child list entry must point back at its owner
        for (id, node) in self.nodes.iter().enumerate() {
            for &child in &node.children {
                match self.nodes.get(child) {
                    Some(c) if c.parent == Some(id) => {}
                    _ => return Err(SkeletonDefect::ChildLinkMismatch { node: child, parent: id }),
                }
            }
        }

        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id], true) {
                return Err(SkeletonDefect::Unreachable { node: id });
            }
            stack.extend(self.nodes[id].children.iter().copied());
        }
        match seen.iter().position(|&s| !s) {
            Some(node) => Err(SkeletonDefect::Unreachable { node }),
            None => Ok(()),
        }
    }
}
