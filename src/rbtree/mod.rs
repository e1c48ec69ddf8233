//! A red-black tree over `i64` keys.
//!
//! Nodes live in an index arena rather than behind pointers: every link is a
//! `usize` handle into one `Vec`, and handle 0 is the shared sentinel that
//! terminates every leaf edge. The sentinel is "always black" as a single
//! global fact instead of a per-leaf one, and its parent field doubles as the
//! scratch slot the delete path needs.

use std::cmp::Ordering;

use thiserror::Error;

mod balance;

pub(crate) type NodeId = usize;

/// Handle of the sentinel. Allocated at arena construction, never released.
pub(crate) const NIL: NodeId = 0;

// LEMMA: a red-black tree with n interior nodes has height at most
// 2*log₂(n+1), since no path root→leaf can be more than twice as long as any
// other (reds never stack, black counts match).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

#[derive(Debug, PartialEq)]
pub(crate) struct Node {
    key: i64,
    color: Color,
    parent: NodeId,
    left: NodeId,
    right: NodeId,
}

/// Contiguous node storage. Slots freed by deletions are recycled.
#[derive(Debug, PartialEq)]
struct Arena {
    slots: Vec<Node>,
    free: Vec<NodeId>,
}

impl Arena {
    fn new() -> Self {
        // slot 0 is the sentinel; its key is never read
        let sentinel = Node { key: 0, color: Color::Black, parent: NIL, left: NIL, right: NIL };
        Arena { slots: vec![sentinel], free: Vec::new() }
    }

    fn alloc(&mut self, key: i64, color: Color) -> NodeId {
        let node = Node { key, color, parent: NIL, left: NIL, right: NIL };
        match self.free.pop() {
            Some(id) => {
                self.slots[id] = node;
                id
            }
            None => {
                self.slots.push(node);
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        debug_assert_ne!(id, NIL, "the sentinel is never released");
        self.free.push(id);
    }
}

impl std::ops::Index<NodeId> for Arena {
    type Output = Node;
    fn index(&self, id: NodeId) -> &Node {
        &self.slots[id]
    }
}

impl std::ops::IndexMut<NodeId> for Arena {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.slots[id]
    }
}

/// One entry of a preorder tree description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreorderItem {
    Node { key: i64, color: Color },
    /// A sentinel leaf edge.
    Leaf,
}

/// A `delete` targeted a key that is not in the tree.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("key {0} is not in the tree")]
pub struct KeyNotFound(pub i64);

/// A preorder description that does not describe exactly one tree.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ShapeError {
    #[error("preorder description ended before every subtree was closed")]
    Truncated,
    #[error("preorder description has {0} leftover item(s) after the root subtree closed")]
    Trailing(usize),
}

#[derive(Debug, PartialEq)]
pub struct RbTree {
    arena: Arena,
    root: NodeId,
    len: usize,
}

impl Default for RbTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RbTree {
    pub fn new() -> Self {
        RbTree { arena: Arena::new(), root: NIL, len: 0 }
    }

    /// The number of live (interior) nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `key` is present. Pure descent from the root; never mutates.
    pub fn contains(&self, key: i64) -> bool {
        self.find(key).is_some()
    }

    /// Descends to the shallowest node with exactly `key`.
    fn find(&self, key: i64) -> Option<NodeId> {
        let mut cur = self.root;
        while cur != NIL {
            let node = &self.arena[cur];
            cur = match key.cmp(&node.key) {
                Ordering::Equal => return Some(cur),
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }
        None
    }

    /// Leftmost node of the subtree at `from`. `from` must not be the
    /// sentinel.
    fn minimum(&self, from: NodeId) -> NodeId {
        debug_assert_ne!(from, NIL);
        let mut cur = from;
        while self.arena[cur].left != NIL {
            cur = self.arena[cur].left;
        }
        cur
    }

    /// Inserts `key`. Duplicates are accepted: comparison is `<`, so an equal
    /// key descends right of the existing one.
    pub fn insert(&mut self, key: i64) {
        let z = self.arena.alloc(key, Color::Red);
        let mut parent = NIL;
        let mut cur = self.root;
        while cur != NIL {
            parent = cur;
            cur = if key < self.arena[cur].key { self.arena[cur].left } else { self.arena[cur].right };
        }
        self.arena[z].parent = parent;
        if parent == NIL {
            self.root = z;
        } else if key < self.arena[parent].key {
            self.arena[parent].left = z;
        } else {
            self.arena[parent].right = z;
        }
        self.len += 1;
        self.insert_fixup(z);
    }

    /// Removes one node with exactly `key`, or fails without touching the
    /// tree if there is none.
    pub fn remove(&mut self, key: i64) -> Result<(), KeyNotFound> {
        let z = self.find(key).ok_or(KeyNotFound(key))?;

        // splice z out; x is the node inheriting the deficiency, removed_color
        // the color that actually left the tree
        let mut removed_color = self.arena[z].color;
        let x;
        if self.arena[z].left == NIL {
            x = self.arena[z].right;
            self.transplant(z, x);
        } else if self.arena[z].right == NIL {
            x = self.arena[z].left;
            self.transplant(z, x);
        } else {
            // two children: the in-order successor y takes z's place
            let y = self.minimum(self.arena[z].right);
            removed_color = self.arena[y].color;
            x = self.arena[y].right;
            if self.arena[y].parent == z {
                // x may be the sentinel; the fixup walks up from x, so park
                // its parent link even then
                self.arena[x].parent = y;
            } else {
                self.transplant(y, x);
                let zr = self.arena[z].right;
                self.arena[y].right = zr;
                self.arena[zr].parent = y;
            }
            self.transplant(z, y);
            let zl = self.arena[z].left;
            self.arena[y].left = zl;
            self.arena[zl].parent = y;
            self.arena[y].color = self.arena[z].color;
        }

        self.arena.release(z);
        self.len -= 1;
        // removing a red never unbalances black heights
        if removed_color == Color::Black {
            self.delete_fixup(x);
        }
        Ok(())
    }

    /// Rebuilds a tree from its preorder description, structure, keys, colors
    /// and all. The description is not re-balanced or otherwise checked
    /// beyond its shape.
    pub fn from_preorder(items: &[PreorderItem]) -> Result<Self, ShapeError> {
        let mut tree = RbTree::new();
        let mut pos = 0;
        tree.root = tree.build(items, &mut pos, NIL)?;
        if pos != items.len() {
            return Err(ShapeError::Trailing(items.len() - pos));
        }
        Ok(tree)
    }

    fn build(&mut self, items: &[PreorderItem], pos: &mut usize, parent: NodeId) -> Result<NodeId, ShapeError> {
        let item = *items.get(*pos).ok_or(ShapeError::Truncated)?;
        *pos += 1;
        match item {
            PreorderItem::Leaf => Ok(NIL),
            PreorderItem::Node { key, color } => {
                let id = self.arena.alloc(key, color);
                self.arena[id].parent = parent;
                self.len += 1;
                let left = self.build(items, pos, id)?;
                self.arena[id].left = left;
                let right = self.build(items, pos, id)?;
                self.arena[id].right = right;
                Ok(id)
            }
        }
    }

    /// Preorder description of the tree; the empty tree is a lone [`PreorderItem::Leaf`].
    /// Feeding the result to [`RbTree::from_preorder`] reproduces the tree exactly.
    pub fn preorder(&self) -> Vec<PreorderItem> {
        let mut out = Vec::with_capacity(2 * self.len + 1);
        self.walk(self.root, &mut out);
        out
    }

    fn walk(&self, id: NodeId, out: &mut Vec<PreorderItem>) {
        if id == NIL {
            out.push(PreorderItem::Leaf);
            return;
        }
        let node = &self.arena[id];
        out.push(PreorderItem::Node { key: node.key, color: node.color });
        self.walk(node.left, out);
        self.walk(node.right, out);
    }
}

#[cfg(test)]
impl RbTree {
    /// Asserts the five red-black invariants plus parent-link coherence.
    pub(crate) fn audit(&self) {
        assert_eq!(self.arena[NIL].color, Color::Black, "sentinel went non-black");
        if self.root != NIL {
            assert_eq!(self.arena[self.root].color, Color::Black, "root went red");
            assert_eq!(self.arena[self.root].parent, NIL);
        }
        let (_, _, count) = self.audit_subtree(self.root);
        assert_eq!(count, self.len, "len out of sync with reachable nodes");
    }

    /// Returns (black height, key range, node count) of the subtree.
    fn audit_subtree(&self, id: NodeId) -> (usize, Option<(i64, i64)>, usize) {
        if id == NIL {
            return (1, None, 0);
        }
        let node = &self.arena[id];
        if node.color == Color::Red {
            assert_eq!(self.arena[node.left].color, Color::Black, "red {} has a red left child", node.key);
            assert_eq!(self.arena[node.right].color, Color::Black, "red {} has a red right child", node.key);
        }
        if node.left != NIL {
            assert_eq!(self.arena[node.left].parent, id, "bad parent link under {}", node.key);
        }
        if node.right != NIL {
            assert_eq!(self.arena[node.right].parent, id, "bad parent link under {}", node.key);
        }
        let (lbh, lrange, lcount) = self.audit_subtree(node.left);
        let (rbh, rrange, rcount) = self.audit_subtree(node.right);
        assert_eq!(lbh, rbh, "black height split at {}", node.key);
        if let Some((_, lmax)) = lrange {
            assert!(lmax < node.key, "left subtree of {} reaches {}", node.key, lmax);
        }
        if let Some((rmin, _)) = rrange {
            // duplicates sit right of their equal, so >= not >
            assert!(rmin >= node.key, "right subtree of {} reaches {}", node.key, rmin);
        }
        let bh = lbh + usize::from(node.color == Color::Black);
        let min = lrange.map_or(node.key, |(lo, _)| lo);
        let max = rrange.map_or(node.key, |(_, hi)| hi);
        (bh, Some((min, max)), lcount + rcount + 1)
    }

    fn height(&self, id: NodeId) -> usize {
        if id == NIL {
            return 0;
        }
        1 + self.height(self.arena[id].left).max(self.height(self.arena[id].right))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(key: i64, color: Color) -> PreorderItem {
        PreorderItem::Node { key, color }
    }

    #[test]
    fn empty_tree() {
        let tree = RbTree::new();
        assert!(tree.is_empty());
        assert!(!tree.contains(0));
        assert_eq!(tree.preorder(), vec![PreorderItem::Leaf]);
        tree.audit();
    }

    #[test]
    fn insert_then_contains() {
        let mut tree = RbTree::new();
        for key in [41, 38, 31, 12, 19, 8] {
            tree.insert(key);
            tree.audit();
        }
        assert_eq!(tree.len(), 6);
        for key in [41, 38, 31, 12, 19, 8] {
            assert!(tree.contains(key));
        }
        assert!(!tree.contains(40));
        assert!(!tree.contains(-1));
    }

    #[test]
    fn insert_into_described_tree_keeps_colors_legal() {
        // 5 black at the root, red 3 and red 8 below it
        let items = [
            node(5, Color::Black),
            node(3, Color::Red),
            PreorderItem::Leaf,
            PreorderItem::Leaf,
            node(8, Color::Red),
            PreorderItem::Leaf,
            PreorderItem::Leaf,
        ];
        let mut tree = RbTree::from_preorder(&items).unwrap();
        tree.audit();
        tree.insert(6);
        // 6 lands under red 8; the recolor case must fire immediately
        tree.audit();
        assert!(tree.contains(6));
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn delete_root_of_two_node_tree() {
        let items = [
            node(5, Color::Black),
            node(3, Color::Red),
            PreorderItem::Leaf,
            PreorderItem::Leaf,
            PreorderItem::Leaf,
        ];
        let mut tree = RbTree::from_preorder(&items).unwrap();
        tree.remove(5).unwrap();
        tree.audit();
        assert_eq!(tree.len(), 1);
        assert!(tree.contains(3));
        assert!(!tree.contains(5));
        // the survivor is the root and must have been recolored black
        assert_eq!(tree.preorder(), vec![node(3, Color::Black), PreorderItem::Leaf, PreorderItem::Leaf]);
    }

    #[test]
    fn remove_absent_key_fails_and_leaves_tree_alone() {
        let mut tree = RbTree::new();
        tree.insert(1);
        tree.insert(2);
        assert_eq!(tree.remove(7), Err(KeyNotFound(7)));
        assert_eq!(tree.len(), 2);
        assert!(tree.contains(1) && tree.contains(2));
        assert_eq!(tree.remove(7).unwrap_err().to_string(), "key 7 is not in the tree");
    }

    #[test]
    fn remove_from_empty_tree_fails() {
        let mut tree = RbTree::new();
        assert_eq!(tree.remove(0), Err(KeyNotFound(0)));
    }

    #[test]
    fn duplicate_keys_coexist() {
        let mut tree = RbTree::new();
        tree.insert(5);
        tree.insert(5);
        tree.insert(5);
        tree.audit();
        assert_eq!(tree.len(), 3);
        assert!(tree.contains(5));
        // each removal takes out one copy
        tree.remove(5).unwrap();
        tree.audit();
        assert!(tree.contains(5));
        tree.remove(5).unwrap();
        tree.remove(5).unwrap();
        assert!(!tree.contains(5));
        assert!(tree.is_empty());
    }

    #[test]
    fn drain_ascending_inserts() {
        let mut tree = RbTree::new();
        for key in 0..128 {
            tree.insert(key);
        }
        tree.audit();
        for key in 0..128 {
            tree.remove(key).unwrap();
            tree.audit();
            assert!(!tree.contains(key));
        }
        assert!(tree.is_empty());
    }

    #[test]
    fn height_stays_logarithmic() {
        // ascending inserts are the degenerate case for a plain BST
        let mut tree = RbTree::new();
        for key in 0..1024 {
            tree.insert(key);
        }
        let height = tree.height(tree.root);
        // height ≤ 2*log₂(n+1) = 2*log₂(1025)
        assert!(height <= 21, "height {height} exceeds the red-black bound");
    }

    #[test]
    fn freed_slots_are_recycled() {
        let mut tree = RbTree::new();
        for key in 0..32 {
            tree.insert(key);
        }
        for key in 0..32 {
            tree.remove(key).unwrap();
        }
        let slots_before = tree.arena.slots.len();
        for key in 0..32 {
            tree.insert(key);
        }
        assert_eq!(tree.arena.slots.len(), slots_before, "inserts after deletes grew the arena");
        tree.audit();
    }

    #[test]
    fn preorder_round_trip() {
        let mut tree = RbTree::new();
        for key in [20, 10, 30, 5, 15, 25, 35, 1] {
            tree.insert(key);
        }
        let items = tree.preorder();
        let rebuilt = RbTree::from_preorder(&items).unwrap();
        rebuilt.audit();
        assert_eq!(rebuilt.preorder(), items);
        assert_eq!(rebuilt.len(), tree.len());
    }

    #[test]
    fn malformed_preorder_shapes() {
        assert_eq!(
            RbTree::from_preorder(&[node(5, Color::Black), PreorderItem::Leaf]),
            Err(ShapeError::Truncated),
        );
        assert_eq!(RbTree::from_preorder(&[]), Err(ShapeError::Truncated));
        assert_eq!(
            RbTree::from_preorder(&[PreorderItem::Leaf, PreorderItem::Leaf]),
            Err(ShapeError::Trailing(1)),
        );
    }

    mod proptests {
        use std::collections::BTreeMap;

        use proptest::prelude::*;
        use rand::seq::SliceRandom;
        use rand::thread_rng;

        use super::*;

        const CASES: u32 = 256;

        proptest!(
            #![proptest_config(ProptestConfig::with_cases(CASES))]

            #[test]
            fn inserts_keep_invariants(keys in proptest::collection::vec(-1000..1000i64, 0..200)) {
                let mut tree = RbTree::new();
                for &key in &keys {
                    tree.insert(key);
                    tree.audit();
                }
                prop_assert_eq!(tree.len(), keys.len());
            }

            #[test]
            fn deletes_keep_invariants_and_unreach_deleted_keys(
                keys in proptest::collection::vec(-100..100i64, 1..150),
                delete_share in 0.0..1.0f64,
            ) {
                // duplicates are legal, so model the tree as a multiset
                let mut model: BTreeMap<i64, usize> = BTreeMap::new();
                let mut tree = RbTree::new();
                for &key in &keys {
                    tree.insert(key);
                    *model.entry(key).or_insert(0) += 1;
                }

                let mut victims = keys.clone();
                victims.shuffle(&mut thread_rng());
                victims.truncate((keys.len() as f64 * delete_share) as usize);
                for &key in &victims {
                    tree.remove(key).unwrap();
                    tree.audit();
                    let count = model.get_mut(&key).unwrap();
                    *count -= 1;
                }

                for (&key, &count) in &model {
                    prop_assert_eq!(tree.contains(key), count > 0);
                }
                prop_assert_eq!(tree.len(), model.values().sum::<usize>());
            }

            #[test]
            fn membership_matches_model(
                inserts in proptest::collection::hash_set(-500..500i64, 0..100),
                probes in proptest::collection::vec(-500..500i64, 0..50),
            ) {
                let mut tree = RbTree::new();
                for &key in &inserts {
                    tree.insert(key);
                }
                for &key in inserts.iter().chain(probes.iter()) {
                    prop_assert_eq!(tree.contains(key), inserts.contains(&key));
                }
            }

            #[test]
            fn random_tree_round_trips(keys in proptest::collection::vec(-1000..1000i64, 0..120)) {
                let mut tree = RbTree::new();
                for &key in &keys {
                    tree.insert(key);
                }
                let items = tree.preorder();
                let rebuilt = RbTree::from_preorder(&items).unwrap();
                prop_assert_eq!(rebuilt.preorder(), items);
            }
        );
    }
}
