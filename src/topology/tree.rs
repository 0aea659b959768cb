//! Binary tree and double binary tree topologies.
//!
//! Trees are kept in an index arena: nodes live in one `Vec` and refer to
//! their children by position. Ids are assigned by in-order traversal, so
//! they increase from left to right and the root lands near the middle.
//!
//! BinaryTree(8):
//! ```text
//!               7
//!         3
//!     1       5
//!   0   2   4   6
//! ```
//! A route climbs from src to the lowest common ancestor and descends to dst.

use super::basic::{dedup_policies, AxisParams};
use super::links::LinkGraph;
use super::types::{
    Bandwidth, ConnectionPolicy, DeviceId, Latency, Route, TopologyBuildingBlock, TopologyError,
};

#[derive(Debug, Clone, Copy, Default)]
struct TreeNode {
    id: DeviceId,
    left: Option<usize>,
    right: Option<usize>,
}

/// Arena-backed tree with in-order ids
#[derive(Debug, Clone)]
struct TreeArena {
    nodes: Vec<TreeNode>,
    root: usize,
}

/// `ceil(log2(npus_count + 1)) - 1`; leaves sit at depth 0
fn tree_depth(npus_count: usize) -> i32 {
    (npus_count + 1).next_power_of_two().trailing_zeros() as i32 - 1
}

impl TreeArena {
    fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            root: 0,
        }
    }

    /// Balanced tree holding `npus_count` nodes
    fn balanced(npus_count: usize) -> Self {
        let mut tree = Self::empty();
        tree.root = tree.grow(tree_depth(npus_count), npus_count).unwrap_or(0);
        tree.number();
        tree
    }

    /// Root with a single subtree of `npus_count - 1` nodes on the given side
    fn rooted(npus_count: usize, subtree_on_left: bool) -> Self {
        let mut tree = Self::empty();
        tree.root = tree.alloc();
        let subtree = tree.grow(tree_depth(npus_count) - 1, npus_count - 1);
        if subtree_on_left {
            tree.nodes[tree.root].left = subtree;
        } else {
            tree.nodes[tree.root].right = subtree;
        }
        tree.number();
        tree
    }

    fn alloc(&mut self) -> usize {
        self.nodes.push(TreeNode::default());
        self.nodes.len() - 1
    }

    /// Grow a subtree of `count` nodes.
    ///
    /// The left child takes up to `2^depth - 1` nodes and the right child
    /// whatever remains. A negative depth places no bound on the left side.
    fn grow(&mut self, depth: i32, count: usize) -> Option<usize> {
        if count == 0 {
            return None;
        }
        let node = self.alloc();
        let max_left = if depth >= 0 {
            (1usize << depth) - 1
        } else {
            usize::MAX
        };
        if count > max_left {
            let left = self.grow(depth - 1, max_left);
            let right = self.grow(depth - 1, count - 1 - max_left);
            self.nodes[node].left = left;
            self.nodes[node].right = right;
        } else {
            let left = self.grow(depth - 1, count - 1);
            self.nodes[node].left = left;
        }
        Some(node)
    }

    fn number(&mut self) {
        let mut next_id = 0;
        if !self.nodes.is_empty() {
            self.number_in_order(self.root, &mut next_id);
        }
    }

    fn number_in_order(&mut self, node: usize, next_id: &mut DeviceId) {
        if let Some(left) = self.nodes[node].left {
            self.number_in_order(left, next_id);
        }
        self.nodes[node].id = *next_id;
        *next_id += 1;
        if let Some(right) = self.nodes[node].right {
            self.number_in_order(right, next_id);
        }
    }

    fn root_id(&self) -> DeviceId {
        self.nodes[self.root].id
    }

    fn node_by_id(&self, id: DeviceId) -> Option<&TreeNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    fn find_path(&self, node: Option<usize>, target: DeviceId, path: &mut Vec<DeviceId>) -> bool {
        let Some(index) = node else {
            return false;
        };
        let current = self.nodes[index];
        path.push(current.id);
        if current.id == target
            || self.find_path(current.left, target, path)
            || self.find_path(current.right, target, path)
        {
            return true;
        }
        path.pop();
        false
    }

    fn path_from_root(
        &self,
        target: DeviceId,
        tree: &'static str,
    ) -> Result<Vec<DeviceId>, TopologyError> {
        let mut path = Vec::new();
        if self.find_path(Some(self.root), target, &mut path) {
            Ok(path)
        } else {
            log::error!("Device {} not found in {} tree", target, tree);
            Err(TopologyError::PathNotFound {
                device: target,
                tree,
            })
        }
    }

    /// src up to the lowest common ancestor, then down to dst
    fn path(
        &self,
        src: DeviceId,
        dst: DeviceId,
        tree: &'static str,
    ) -> Result<Route, TopologyError> {
        let to_src = self.path_from_root(src, tree)?;
        let to_dst = self.path_from_root(dst, tree)?;

        let lca_index = to_src
            .iter()
            .zip(&to_dst)
            .take_while(|(a, b)| a == b)
            .count();

        let mut route: Route = to_src[lca_index..].iter().rev().copied().collect();
        route.extend_from_slice(&to_dst[lca_index - 1..]);
        Ok(route)
    }

    /// Both directions of every parent-child edge, parents before children
    fn edges(&self) -> Vec<ConnectionPolicy> {
        let mut policies = Vec::with_capacity(self.nodes.len() * 2);
        if !self.nodes.is_empty() {
            self.collect_edges(self.root, &mut policies);
        }
        policies
    }

    fn collect_edges(&self, node: usize, policies: &mut Vec<ConnectionPolicy>) {
        let parent = self.nodes[node];
        for child in [parent.left, parent.right].into_iter().flatten() {
            let child_id = self.nodes[child].id;
            policies.push(ConnectionPolicy::new(child_id, parent.id));
            policies.push(ConnectionPolicy::new(parent.id, child_id));
            self.collect_edges(child, policies);
        }
    }

    fn in_order_ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self.nodes.iter().map(|node| node.id).collect();
        ids.sort_unstable();
        ids
    }
}

#[derive(Debug, Clone)]
pub struct BinaryTree {
    params: AxisParams,
    tree: TreeArena,
    links: LinkGraph,
}

impl BinaryTree {
    pub fn new(
        npus_count: usize,
        bandwidth: Bandwidth,
        latency: Latency,
        is_multi_dim: bool,
    ) -> Result<Self, TopologyError> {
        let params =
            AxisParams::new(TopologyBuildingBlock::BinaryTree, npus_count, bandwidth, latency)?;
        let tree = TreeArena::balanced(npus_count);
        log::trace!(
            "BinaryTree({}) root {}, ids {:?}",
            npus_count,
            tree.root_id(),
            tree.in_order_ids()
        );
        let mut topology = Self {
            params,
            tree,
            links: LinkGraph::new(npus_count),
        };
        if !is_multi_dim {
            topology.links = params.build_links(npus_count, &topology.connection_policies())?;
        }
        Ok(topology)
    }

    pub fn params(&self) -> &AxisParams {
        &self.params
    }

    pub fn links(&self) -> &LinkGraph {
        &self.links
    }

    pub fn root(&self) -> DeviceId {
        self.tree.root_id()
    }

    /// Children of a node as (left, right) ids
    pub fn children(&self, id: DeviceId) -> Option<(Option<DeviceId>, Option<DeviceId>)> {
        let node = self.tree.node_by_id(id)?;
        let child_id = |child: Option<usize>| child.map(|index| self.tree.nodes[index].id);
        Some((child_id(node.left), child_id(node.right)))
    }

    pub fn route(&self, src: DeviceId, dst: DeviceId) -> Result<Route, TopologyError> {
        self.params.check_endpoints(src, dst)?;
        self.tree.path(src, dst, "binary")
    }

    pub fn connection_policies(&self) -> Vec<ConnectionPolicy> {
        self.tree.edges()
    }
}

/// Two trees over the same NPUs.
///
/// The "max" tree hangs everything off the root's left side, so its root is
/// the highest id; the "min" tree hangs everything off the right side, so
/// its root is id 0. Routes take whichever tree gives the shorter path.
#[derive(Debug, Clone)]
pub struct DoubleBinaryTree {
    params: AxisParams,
    max_tree: TreeArena,
    min_tree: TreeArena,
    links: LinkGraph,
}

impl DoubleBinaryTree {
    pub fn new(
        npus_count: usize,
        bandwidth: Bandwidth,
        latency: Latency,
        is_multi_dim: bool,
    ) -> Result<Self, TopologyError> {
        let params = AxisParams::new(
            TopologyBuildingBlock::DoubleBinaryTree,
            npus_count,
            bandwidth,
            latency,
        )?;
        let max_tree = TreeArena::rooted(npus_count, true);
        let min_tree = TreeArena::rooted(npus_count, false);
        log::trace!(
            "DoubleBinaryTree({}) max root {}, min root {}",
            npus_count,
            max_tree.root_id(),
            min_tree.root_id()
        );
        let mut topology = Self {
            params,
            max_tree,
            min_tree,
            links: LinkGraph::new(npus_count),
        };
        if !is_multi_dim {
            topology.links = params.build_links(npus_count, &topology.connection_policies())?;
        }
        Ok(topology)
    }

    pub fn params(&self) -> &AxisParams {
        &self.params
    }

    pub fn links(&self) -> &LinkGraph {
        &self.links
    }

    /// Roots of the (max, min) trees
    pub fn roots(&self) -> (DeviceId, DeviceId) {
        (self.max_tree.root_id(), self.min_tree.root_id())
    }

    /// Shorter of the two tree paths; ties go to the min tree
    pub fn route(&self, src: DeviceId, dst: DeviceId) -> Result<Route, TopologyError> {
        self.params.check_endpoints(src, dst)?;
        let max_path = self.max_tree.path(src, dst, "max")?;
        let min_path = self.min_tree.path(src, dst, "min")?;
        if max_path.len() < min_path.len() {
            Ok(max_path)
        } else {
            Ok(min_path)
        }
    }

    /// Union of both trees' edges; an edge shared by both appears once
    pub fn connection_policies(&self) -> Vec<ConnectionPolicy> {
        let mut policies = self.max_tree.edges();
        policies.extend(self.min_tree.edges());
        dedup_policies(policies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth() {
        assert_eq!(tree_depth(1), 0);
        assert_eq!(tree_depth(3), 1);
        assert_eq!(tree_depth(7), 2);
        assert_eq!(tree_depth(8), 3);
    }

    #[test]
    fn test_eight_node_tree_shape() {
        let tree = BinaryTree::new(8, 50.0, 500.0, false).unwrap();
        assert_eq!(tree.root(), 7);
        assert_eq!(tree.children(7), Some((Some(3), None)));
        assert_eq!(tree.children(3), Some((Some(1), Some(5))));
        assert_eq!(tree.children(1), Some((Some(0), Some(2))));
        assert_eq!(tree.children(6), Some((None, None)));
    }

    #[test]
    fn test_route_through_lca() {
        let tree = BinaryTree::new(8, 50.0, 500.0, false).unwrap();
        assert_eq!(tree.route(0, 6).unwrap(), vec![0, 1, 3, 5, 6]);
        assert_eq!(tree.route(0, 7).unwrap(), vec![0, 1, 3, 7]);
        assert_eq!(tree.route(7, 2).unwrap(), vec![7, 3, 1, 2]);
        assert_eq!(tree.route(1, 0).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_uneven_tree_numbers_every_npu() {
        for npus_count in 1..=20 {
            let tree = BinaryTree::new(npus_count, 1.0, 0.0, true).unwrap();
            let expected: Vec<DeviceId> = (0..npus_count).collect();
            assert_eq!(tree.tree.in_order_ids(), expected);
            assert_eq!(tree.connection_policies().len(), 2 * (npus_count - 1));
        }
    }

    #[test]
    fn test_double_tree_roots() {
        let tree = DoubleBinaryTree::new(8, 50.0, 500.0, false).unwrap();
        assert_eq!(tree.roots(), (7, 0));
    }

    #[test]
    fn test_double_tree_never_longer_than_single_tree() {
        for npus_count in [2, 4, 8, 16] {
            let single = BinaryTree::new(npus_count, 50.0, 500.0, false).unwrap();
            let double = DoubleBinaryTree::new(npus_count, 50.0, 500.0, false).unwrap();
            for src in 0..npus_count {
                for dst in 0..npus_count {
                    if src == dst {
                        continue;
                    }
                    let double_len = double.route(src, dst).unwrap().len();
                    let single_len = single.route(src, dst).unwrap().len();
                    assert!(double_len <= single_len, "{} -> {}", src, dst);
                }
            }
        }
    }

    #[test]
    fn test_double_tree_tie_prefers_min_tree() {
        let tree = DoubleBinaryTree::new(2, 50.0, 500.0, false).unwrap();
        // both trees are the single edge 0 - 1
        assert_eq!(tree.route(0, 1).unwrap(), vec![0, 1]);
        assert_eq!(tree.connection_policies().len(), 2);
    }

    #[test]
    fn test_small_double_tree_every_npu_reachable() {
        for npus_count in 1..=12 {
            let tree = DoubleBinaryTree::new(npus_count, 1.0, 0.0, false).unwrap();
            for src in 0..npus_count {
                for dst in 0..npus_count {
                    if src != dst {
                        assert!(tree.route(src, dst).is_ok(), "{}: {} -> {}", npus_count, src, dst);
                    }
                }
            }
        }
    }
}
