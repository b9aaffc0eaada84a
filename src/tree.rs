//! Arena-backed search tree for MCTS
//!
//! Nodes live in one contiguous `Vec` and refer to each other by [`NodeId`].
//! Children are owned through the arena, keyed by the column that leads to
//! them; the parent link is a plain index used only to walk back to the root.

use std::collections::VecDeque;

/// Index of a node inside a [`SearchTree`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId{
    #[inline]
    fn index(self) -> usize{
        self.0 as usize
    }
}

/// Statistics and links of one tree node.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchNode{
    mv: Option<usize>,
    parent: Option<NodeId>,
    visits: u32,
    reward: f64,
    /// (move, child) pairs in ascending move order.
    children: Vec<(usize, NodeId)>
}

impl SearchNode{
    /// Creates a detached node with no move and empty statistics
    #[inline]
    pub fn new_root() -> Self{
        SearchNode{ mv: None, parent: None, visits: 0, reward: 0.0, children: Vec::new() }
    }

    #[inline]
    fn new_child(mv: usize, parent: NodeId) -> Self{
        SearchNode{ mv: Some(mv), parent: Some(parent), visits: 0, reward: 0.0, children: Vec::new() }
    }

    /// Column played from the parent to reach this node, `None` for the root.
    #[inline]
    pub fn mv(&self) -> Option<usize>{
        self.mv
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId>{
        self.parent
    }

    #[inline]
    pub fn is_root(&self) -> bool{
        self.parent.is_none()
    }

    /// Visit count (N).
    #[inline]
    pub fn visits(&self) -> u32{
        self.visits
    }

    /// Accumulated reward (Q), always between 0 and N.
    #[inline]
    pub fn reward(&self) -> f64{
        self.reward
    }

    /// Average reward, `0.0` if the node was never visited.
    #[inline]
    pub fn mean_reward(&self) -> f64{
        if self.visits != 0 { self.reward / self.visits as f64 } else { 0.0 }
    }

    #[inline]
    pub fn children(&self) -> &[(usize, NodeId)]{
        &self.children
    }

    /// Returns the child reached by `mv`, if it was expanded.
    pub fn child(&self, mv: usize) -> Option<NodeId>{
        self.children
            .binary_search_by_key(&mv, |&(child_mv, _)| child_mv)
            .ok()
            .map(|index| self.children[index].1)
    }

    #[inline]
    pub fn is_leaf(&self) -> bool{
        self.children.is_empty()
    }

    /// UCB1 score of this node seen from its parent.
    ///
    /// Unvisited nodes score `+inf` when `exploration` is positive, so every
    /// child is tried once before any exploitation, and `0.0` otherwise.
    ///
    /// # Parameters
    /// - `parent_visits`: Visit count of the parent node.
    /// - `exploration`: Weight of the exploration term.
    ///
    /// # Returns
    /// `Q/N + exploration * sqrt(ln(parent_visits) / N)`.
    #[inline]
    pub fn selection_score(&self, parent_visits: u32, exploration: f64) -> f64{
        if self.visits == 0 {
            return if exploration > 0.0 { f64::INFINITY } else { 0.0 };
        }

        let n = self.visits as f64;
        self.reward / n + exploration * ((parent_visits as f64).ln() / n).sqrt()
    }

    /// Adds one visit carrying `reward`.
    #[inline]
    pub fn record(&mut self, reward: f64){
        self.visits += 1;
        self.reward += reward;
    }
}

/// Search tree owning every node in a single arena.
#[derive(Clone, Debug)]
pub struct SearchTree{
    nodes: Vec<SearchNode>,
    root: NodeId
}

impl SearchTree{
    /// Creates a tree holding a single empty root.
    pub fn new() -> Self{
        SearchTree{ nodes: vec![SearchNode::new_root()], root: NodeId(0) }
    }

    #[inline]
    pub fn root(&self) -> NodeId{
        self.root
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &SearchNode{
        &self.nodes[id.index()]
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut SearchNode{
        &mut self.nodes[id.index()]
    }

    /// Number of nodes in the arena, the root included.
    #[allow(clippy::len_without_is_empty)]
    #[inline]
    pub fn len(&self) -> usize{
        self.nodes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchNode>{
        self.nodes.iter()
    }

    /// Attaches one fresh child per move to a leaf node.
    ///
    /// # Parameters
    /// - `parent`: A node with no children yet.
    /// - `moves`: Legal moves of the parent state, ascending and unique.
    pub fn expand(&mut self, parent: NodeId, moves: &[usize]){
        debug_assert!(self.get(parent).is_leaf(), "node expanded twice");
        debug_assert!(moves.windows(2).all(|pair| pair[0] < pair[1]), "moves must be ascending");

        let first = self.nodes.len() as u32;
        self.nodes.extend(moves.iter().map(|&mv| SearchNode::new_child(mv, parent)));

        let children = moves
            .iter()
            .enumerate()
            .map(|(offset, &mv)| (mv, NodeId(first + offset as u32)))
            .collect();
        self.get_mut(parent).children = children;
    }

    /// Makes the root child reached by `mv` the new root.
    ///
    /// The subtree below that child is kept with its statistics and compacted
    /// into a fresh arena; everything else is dropped. When `mv` was never
    /// expanded the tree is reset to an empty root.
    ///
    /// # Returns
    /// `true` if a subtree was reused.
    pub fn reroot(&mut self, mv: usize) -> bool{
        let Some(new_root) = self.get(self.root).child(mv) else {
            *self = SearchTree::new();
            return false;
        };

        let mut old = std::mem::take(&mut self.nodes);
        let mut nodes: Vec<SearchNode> = Vec::new();
        let mut queue: VecDeque<(NodeId, Option<NodeId>)> = VecDeque::from([(new_root, None)]);

        // Breadth-first copy, children are pushed in move order so each
        // parent's mapping stays sorted.
        while let Some((old_id, parent)) = queue.pop_front() {
            let id = NodeId(nodes.len() as u32);
            let mut node = std::mem::replace(&mut old[old_id.index()], SearchNode::new_root());

            queue.extend(node.children.iter().map(|&(_, child)| (child, Some(id))));
            node.children.clear();
            node.parent = parent;

            match parent {
                Some(parent) => {
                    if let Some(child_mv) = node.mv {
                        nodes[parent.index()].children.push((child_mv, id));
                    }
                }
                None => node.mv = None
            }

            nodes.push(node);
        }

        self.nodes = nodes;
        self.root = NodeId(0);
        true
    }
}

impl Default for SearchTree{
    fn default() -> Self{
        SearchTree::new()
    }
}
