//! Per-zone ternary region tree
//!
//! Nodes live in a flat arena owned by the tree. Leaves wrap scene nodes by
//! key and never own them; dropping the tree releases every node it holds.

use super::bounds::Bounds;
use crate::scene::SceneNodeKey;

/// Index of a node inside a [`RegionTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(u32);

impl RegionId {
    /// Arena index
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node of the region tree.
///
/// Internal nodes have up to three children (lesser, center, greater) and no
/// scene node. Leaf wrappers have no children and reference one scene node.
#[derive(Debug, Clone)]
pub struct RegionNode {
    /// World-space bounds enclosing everything below this node
    pub bounds: Bounds,
    /// Lesser, center and greater partitions
    pub children: [Option<RegionId>; 3],
    /// Scene node wrapped by a leaf
    pub leaf: Option<SceneNodeKey>,
}

impl RegionNode {
    /// Whether this node wraps a scene node
    pub fn is_leaf(&self) -> bool {
        self.leaf.is_some()
    }

    /// Iterate over the populated children
    pub fn child_ids(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.children.iter().flatten().copied()
    }
}

/// Arena-backed ternary tree. The root is always at index 0.
#[derive(Debug, Clone)]
pub struct RegionTree {
    nodes: Vec<RegionNode>,
}

impl RegionTree {
    /// A tree whose root has infinite bounds and no children.
    ///
    /// Zones start out this way until their hierarchy is built, so they are
    /// never culled before that.
    pub fn new() -> Self {
        Self {
            nodes: vec![RegionNode {
                bounds: Bounds::infinite(),
                children: [None; 3],
                leaf: None,
            }],
        }
    }

    /// Drop every node and start over with an unbuilt root
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Id of the root node
    pub fn root(&self) -> RegionId {
        RegionId(0)
    }

    /// Bounds of the root node
    pub fn root_bounds(&self) -> Bounds {
        self.nodes[0].bounds
    }

    /// Borrow a node
    pub fn node(&self, id: RegionId) -> &RegionNode {
        &self.nodes[id.index()]
    }

    /// Borrow a node mutably
    pub fn node_mut(&mut self, id: RegionId) -> &mut RegionNode {
        &mut self.nodes[id.index()]
    }

    /// Add a leaf wrapper for a scene node with precomputed world bounds
    pub fn push_leaf(&mut self, node: SceneNodeKey, bounds: Bounds) -> RegionId {
        self.push(RegionNode {
            bounds,
            children: [None; 3],
            leaf: Some(node),
        })
    }

    /// Add an empty internal node
    pub fn alloc_internal(&mut self) -> RegionId {
        self.push(RegionNode {
            bounds: Bounds::empty(),
            children: [None; 3],
            leaf: None,
        })
    }

    fn push(&mut self, node: RegionNode) -> RegionId {
        let id = RegionId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Total number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Ids of every node in the arena, in allocation order
    pub fn ids(&self) -> impl Iterator<Item = RegionId> {
        (0..self.nodes.len() as u32).map(RegionId)
    }

    /// Whether the root has no children
    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.iter().all(Option::is_none)
    }

    /// Number of leaf wrappers reachable from the root
    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    /// Number of internal nodes reachable from the root, root included
    pub fn internal_count(&self) -> usize {
        self.walk().filter(|id| !self.node(*id).is_leaf()).count()
    }

    /// Longest root-to-leaf path, counting the root as depth 1
    pub fn depth(&self) -> usize {
        self.depth_from(self.root())
    }

    fn depth_from(&self, id: RegionId) -> usize {
        1 + self
            .node(id)
            .child_ids()
            .map(|child| self.depth_from(child))
            .max()
            .unwrap_or(0)
    }

    /// Scene nodes referenced by leaves reachable from the root, depth first
    pub fn leaves(&self) -> impl Iterator<Item = SceneNodeKey> + '_ {
        self.walk().filter_map(|id| self.node(id).leaf)
    }

    fn walk(&self) -> impl Iterator<Item = RegionId> + '_ {
        let mut stack = vec![self.root()];
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            let node = self.node(id);
            for child in node.children.iter().rev().flatten() {
                stack.push(*child);
            }
            Some(id)
        })
    }
}

impl Default for RegionTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use slotmap::SlotMap;

    #[test]
    fn test_new_tree_has_infinite_root() {
        let tree = RegionTree::new();
        assert_eq!(tree.len(), 1);
        assert!(tree.is_empty());
        assert_eq!(tree.leaf_count(), 0);
        assert_eq!(tree.depth(), 1);
        assert!(tree.root_bounds().contains_point(Vec3::new(1.0e20, -1.0e20, 0.0)));
    }

    #[test]
    fn test_leaves_and_depth() {
        let mut keys: SlotMap<SceneNodeKey, ()> = SlotMap::with_key();
        let a = keys.insert(());
        let b = keys.insert(());

        let mut tree = RegionTree::new();
        let inner = tree.alloc_internal();
        let la = tree.push_leaf(a, Bounds::from_center_extents(Vec3::zeros(), Vec3::repeat(1.0)));
        let lb = tree.push_leaf(b, Bounds::from_center_extents(Vec3::x(), Vec3::repeat(1.0)));
        tree.node_mut(inner).children = [Some(la), None, Some(lb)];
        let root = tree.root();
        tree.node_mut(root).children[1] = Some(inner);

        assert_eq!(tree.leaf_count(), 2);
        assert_eq!(tree.internal_count(), 2);
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.leaves().collect::<Vec<_>>(), vec![a, b]);

        tree.reset();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.leaf_count(), 0);
    }
}
