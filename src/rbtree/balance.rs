//! Rotations and the insert/delete repair passes.
//!
//! Everything here is direction-parameterized: one [`Side`] argument instead
//! of a mirrored left/right copy of every routine.

use super::{Color, NodeId, RbTree, NIL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    pub(crate) fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl RbTree {
    fn child(&self, id: NodeId, side: Side) -> NodeId {
        match side {
            Side::Left => self.arena[id].left,
            Side::Right => self.arena[id].right,
        }
    }

    fn set_child(&mut self, id: NodeId, side: Side, to: NodeId) {
        match side {
            Side::Left => self.arena[id].left = to,
            Side::Right => self.arena[id].right = to,
        }
    }

    /// Which side of its parent `id` hangs off of.
    ///
    /// `id` may be the sentinel mid-delete; a black-height-legal tree can
    /// only have an empty slot where the spliced node was, so matching the
    /// left link first is unambiguous.
    fn side_of(&self, id: NodeId) -> Side {
        let parent = self.arena[id].parent;
        if id == self.arena[parent].left { Side::Left } else { Side::Right }
    }

    /// Rotates `pivot` down toward `side`; its child on the opposite side
    /// rises into `pivot`'s place, and that child's inner subtree crosses
    /// over. BST order survives, colors are left as they are (callers repair
    /// them immediately).
    pub(crate) fn rotate(&mut self, pivot: NodeId, side: Side) {
        let up = self.child(pivot, side.other());
        debug_assert_ne!(up, NIL, "no child to rotate into the pivot's place");
        let inner = self.child(up, side);
        self.set_child(pivot, side.other(), inner);
        if inner != NIL {
            self.arena[inner].parent = pivot;
        }
        let parent = self.arena[pivot].parent;
        self.arena[up].parent = parent;
        if parent == NIL {
            self.root = up;
        } else if pivot == self.arena[parent].left {
            self.arena[parent].left = up;
        } else {
            self.arena[parent].right = up;
        }
        self.set_child(up, side, pivot);
        self.arena[pivot].parent = up;
    }

    /// Replaces the subtree at `old` with the one at `new`, re-parenting
    /// `new`. The parent link is written even when `new` is the sentinel;
    /// the delete fixup starts its walk from that parked link.
    pub(crate) fn transplant(&mut self, old: NodeId, new: NodeId) {
        let parent = self.arena[old].parent;
        if parent == NIL {
            self.root = new;
        } else if old == self.arena[parent].left {
            self.arena[parent].left = new;
        } else {
            self.arena[parent].right = new;
        }
        self.arena[new].parent = parent;
    }

    /// Repairs the color invariants after `z` was inserted red.
    ///
    /// Walks upward while the parent is red: a red uncle means recolor and
    /// retry from the grandparent; a black uncle means at most two rotations
    /// and the loop is done. Finally forces the root black.
    pub(crate) fn insert_fixup(&mut self, mut z: NodeId) {
        while self.arena[self.arena[z].parent].color == Color::Red {
            let parent = self.arena[z].parent;
            let grand = self.arena[parent].parent;
            let side = self.side_of(parent);
            let uncle = self.child(grand, side.other());
            if self.arena[uncle].color == Color::Red {
                self.arena[parent].color = Color::Black;
                self.arena[uncle].color = Color::Black;
                self.arena[grand].color = Color::Red;
                z = grand;
            } else {
                if z == self.child(parent, side.other()) {
                    // inner grandchild: rotate it outer, reducing to the
                    // last case
                    z = parent;
                    self.rotate(z, side);
                }
                let parent = self.arena[z].parent;
                let grand = self.arena[parent].parent;
                self.arena[parent].color = Color::Black;
                self.arena[grand].color = Color::Red;
                self.rotate(grand, side.other());
            }
        }
        let root = self.root;
        self.arena[root].color = Color::Black;
    }

    /// Repairs the black-height deficiency sitting at `x` after a black node
    /// was spliced out.
    ///
    /// Per side there are four sibling shapes: red sibling (rotate to get a
    /// black one), black sibling with black nephews (push the deficiency to
    /// the parent), black sibling with only the near nephew red (rotate the
    /// sibling), black sibling with a red far nephew (rotate the parent and
    /// stop). A red `x` absorbs the deficiency by turning black.
    pub(crate) fn delete_fixup(&mut self, mut x: NodeId) {
        while x != self.root && self.arena[x].color == Color::Black {
            let parent = self.arena[x].parent;
            let side = self.side_of(x);
            let mut sibling = self.child(parent, side.other());
            if self.arena[sibling].color == Color::Red {
                self.arena[sibling].color = Color::Black;
                self.arena[parent].color = Color::Red;
                self.rotate(parent, side);
                sibling = self.child(parent, side.other());
            }
            let near = self.child(sibling, side);
            let far = self.child(sibling, side.other());
            if self.arena[near].color == Color::Black && self.arena[far].color == Color::Black {
                self.arena[sibling].color = Color::Red;
                x = parent;
            } else {
                if self.arena[far].color == Color::Black {
                    self.arena[near].color = Color::Black;
                    self.arena[sibling].color = Color::Red;
                    self.rotate(sibling, side.other());
                    sibling = self.child(parent, side.other());
                }
                self.arena[sibling].color = self.arena[parent].color;
                self.arena[parent].color = Color::Black;
                let far = self.child(sibling, side.other());
                self.arena[far].color = Color::Black;
                self.rotate(parent, side);
                x = self.root;
            }
        }
        self.arena[x].color = Color::Black;
    }
}
