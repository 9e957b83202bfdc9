//! Ternary region tree construction by major-axis median splitting

use super::bounds::Bounds;
use super::region_tree::{RegionId, RegionTree};

const LESSER: usize = 0;
const CENTER: usize = 1;
const GREATER: usize = 2;

/// Link `leaves` into a ternary hierarchy rooted at `base`.
///
/// `leaves` are leaf wrappers already pushed into `tree`, each carrying its
/// world-space bounds. `base` receives the union of their bounds and up to
/// three children. Singleton buckets are linked directly; larger buckets get
/// a fresh internal node and are split again.
///
/// An empty `leaves` list leaves `base` with empty bounds and no children.
pub fn create_hierarchy_from_blob(tree: &mut RegionTree, base: RegionId, leaves: &[RegionId]) {
    let bounds = leaves
        .iter()
        .fold(Bounds::empty(), |acc, id| acc.union(&tree.node(*id).bounds));

    {
        let node = tree.node_mut(base);
        node.bounds = bounds;
        node.children = [None; 3];
    }

    if leaves.is_empty() {
        return;
    }

    let buckets = partition(tree, &bounds, leaves);

    for (slot, bucket) in buckets.iter().enumerate() {
        let child = match bucket.as_slice() {
            [] => None,
            [single] => Some(*single),
            many => {
                let internal = tree.alloc_internal();
                create_hierarchy_from_blob(tree, internal, many);
                Some(internal)
            }
        };
        tree.node_mut(base).children[slot] = child;
    }
}

/// Split `leaves` into lesser, center and greater buckets around the midpoint
/// of `bounds` along its major axis. Falls back to round-robin when nothing
/// separates.
fn partition(tree: &RegionTree, bounds: &Bounds, leaves: &[RegionId]) -> [Vec<RegionId>; 3] {
    let axis = bounds.major_axis().index();
    let split = (bounds.lower[axis] + bounds.upper[axis]) * 0.5;

    let mut buckets: [Vec<RegionId>; 3] = Default::default();
    for id in leaves {
        let leaf = &tree.node(*id).bounds;
        let slot = if leaf.upper[axis] < split {
            LESSER
        } else if leaf.lower[axis] > split {
            GREATER
        } else {
            CENTER
        };
        buckets[slot].push(*id);
    }

    if buckets[CENTER].len() == leaves.len() {
        log::trace!(
            "Split along axis {} separated nothing, distributing {} leaves round-robin",
            axis,
            leaves.len()
        );
        for bucket in &mut buckets {
            bucket.clear();
        }
        for (i, id) in leaves.iter().enumerate() {
            buckets[i % 3].push(*id);
        }
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::scene::SceneNodeKey;
    use slotmap::SlotMap;
    use std::collections::HashSet;

    fn build(boxes: &[Bounds]) -> (RegionTree, Vec<SceneNodeKey>) {
        let mut keys: SlotMap<SceneNodeKey, ()> = SlotMap::with_key();
        let mut tree = RegionTree::new();
        let mut nodes = Vec::new();
        let mut leaves = Vec::new();
        for b in boxes {
            let key = keys.insert(());
            nodes.push(key);
            leaves.push(tree.push_leaf(key, *b));
        }
        let root = tree.root();
        create_hierarchy_from_blob(&mut tree, root, &leaves);
        (tree, nodes)
    }

    fn unit_box(center: Vec3) -> Bounds {
        Bounds::from_center_extents(center, Vec3::repeat(0.5))
    }

    #[test]
    fn test_empty_input() {
        let (tree, _) = build(&[]);
        assert!(tree.root_bounds().is_empty());
        assert!(tree.is_empty());
        assert_eq!(tree.leaf_count(), 0);
    }

    #[test]
    fn test_single_leaf_linked_directly() {
        let (tree, nodes) = build(&[unit_box(Vec3::zeros())]);
        let root = tree.node(tree.root());
        let children: Vec<_> = root.child_ids().collect();
        assert_eq!(children.len(), 1);
        assert_eq!(tree.node(children[0]).leaf, Some(nodes[0]));
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn test_every_leaf_appears_once() {
        let boxes: Vec<Bounds> = (0..40)
            .map(|i| {
                let x = (i % 7) as f32 * 3.0;
                let y = (i / 7) as f32 * 3.0;
                let z = ((i * 13) % 5) as f32 * 3.0;
                unit_box(Vec3::new(x, y, z))
            })
            .collect();
        let (tree, nodes) = build(&boxes);

        let found: Vec<_> = tree.leaves().collect();
        assert_eq!(found.len(), nodes.len());
        let unique: HashSet<_> = found.iter().copied().collect();
        assert_eq!(unique, nodes.iter().copied().collect());

        let expected = boxes.iter().fold(Bounds::empty(), |acc, b| acc.union(b));
        assert_eq!(tree.root_bounds(), expected);
    }

    #[test]
    fn test_internal_bounds_enclose_children() {
        let boxes: Vec<Bounds> = (0..20)
            .map(|i| unit_box(Vec3::new(i as f32 * 2.0, (i % 3) as f32, 0.0)))
            .collect();
        let (tree, _) = build(&boxes);

        for id in tree.ids() {
            let node = tree.node(id);
            for child in node.child_ids() {
                let cb = tree.node(child).bounds;
                assert_eq!(node.bounds.union(&cb), node.bounds);
            }
        }
    }

    #[test]
    fn test_far_leaf_is_singleton_on_major_axis() {
        // Four boxes near the origin, widths growing X < Y < Z, one far along X
        let mut boxes: Vec<Bounds> = (0..4)
            .map(|i| {
                let c = Vec3::new(i as f32 * 0.1, 0.0, 0.0);
                Bounds::from_center_extents(c, Vec3::new(0.1, 0.2, 0.3))
            })
            .collect();
        boxes.push(unit_box(Vec3::new(100.0, 0.0, 0.0)));

        let (tree, nodes) = build(&boxes);
        let root = tree.node(tree.root());
        assert_eq!(tree.root_bounds().major_axis(), crate::spatial::Axis::X);

        let greater = root.children[GREATER].expect("greater bucket populated");
        let greater_node = tree.node(greater);
        assert_eq!(greater_node.leaf, Some(nodes[4]));
        assert!(greater_node.children.iter().all(Option::is_none));

        let lesser = root.children[LESSER].expect("lesser bucket populated");
        assert!(!tree.node(lesser).is_leaf());
        assert!(root.children[CENTER].is_none());
    }

    #[test]
    fn test_identical_boxes_round_robin() {
        let boxes = vec![unit_box(Vec3::new(1.0, 2.0, 3.0)); 7];
        let (tree, nodes) = build(&boxes);

        let root = tree.node(tree.root());
        let populated = root.child_ids().count();
        assert!(populated >= 2);
        assert_eq!(tree.leaf_count(), nodes.len());

        // 7 leaves: buckets of 3, 2, 2 at the root
        let sizes: Vec<usize> = root
            .child_ids()
            .map(|c| {
                let n = tree.node(c);
                if n.is_leaf() { 1 } else { n.child_ids().count() }
            })
            .collect();
        assert_eq!(sizes, vec![3, 2, 2]);
    }

    #[test]
    fn test_two_identical_points_terminate() {
        let point = Bounds::new(Vec3::zeros(), Vec3::zeros());
        let (tree, _) = build(&[point, point]);
        let root = tree.node(tree.root());
        assert!(root.children[LESSER].is_some());
        assert!(root.children[CENTER].is_some());
        assert!(root.children[GREATER].is_none());
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn test_tie_break_prefers_x() {
        // Cube layout: equal extents on all axes, split must be along X
        let boxes = [
            unit_box(Vec3::new(-5.0, 0.0, 0.0)),
            unit_box(Vec3::new(5.0, 0.0, 0.0)),
            unit_box(Vec3::new(0.0, -5.0, 0.0)),
            unit_box(Vec3::new(0.0, 5.0, 0.0)),
            unit_box(Vec3::new(0.0, 0.0, -5.0)),
            unit_box(Vec3::new(0.0, 0.0, 5.0)),
        ];
        let (tree, nodes) = build(&boxes);
        let root = tree.node(tree.root());
        assert_eq!(tree.node(root.children[LESSER].unwrap()).leaf, Some(nodes[0]));
        assert_eq!(tree.node(root.children[GREATER].unwrap()).leaf, Some(nodes[1]));
        assert!(!tree.node(root.children[CENTER].unwrap()).is_leaf());
    }
}
