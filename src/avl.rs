//! Self-balancing ordered index.
//!
//! Nodes live in an arena and are linked by slot indices, so a node keeps the
//! same [`AvlHandle`] while rotations reshape the tree around it. The handle is
//! what "removal by node identity" refers to: with [`InsertMethod::Greater`] or
//! [`InsertMethod::Lesser`] several entries may compare equal, and only the
//! handle tells them apart.

use std::borrow::Borrow;
use std::cmp::Ordering;

/// What to do when an inserted value compares equal to one already in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertMethod {
    /// Keep the existing entry and drop the new one.
    #[default]
    Ignore,
    /// Swap in the new entry, keeping the position of the old one.
    Replace,
    /// Keep both, descending into the right subtree on equality.
    Greater,
    /// Keep both, descending into the left subtree on equality.
    Lesser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterateOrder {
    /// Pre-order, left subtree before right.
    TopDownLR,
    /// Pre-order, right subtree before left.
    TopDownRL,
    /// In-order, ascending.
    LowestToHighest,
    /// In-order, descending.
    HighestToLowest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AvlHandle(usize);

#[derive(Debug)]
struct AvlNode<T> {
    left: Option<usize>,
    right: Option<usize>,
    height: u8,
    value: T,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum InsertOutcome {
    Inserted,
    Ignored,
    Replaced(usize),
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

#[derive(Debug)]
pub struct AvlTree<T> {
    slots: Vec<Option<AvlNode<T>>>,
    free: Vec<usize>,
    root: Option<usize>,
    len: usize,
    method: InsertMethod,
}

impl<T> Default for AvlTree<T> {
    fn default() -> Self {
        Self::new(InsertMethod::default())
    }
}

impl<T> AvlTree<T> {
    pub fn new(method: InsertMethod) -> Self {
        Self {
            slots: vec![],
            free: vec![],
            root: None,
            len: 0,
            method,
        }
    }

    pub fn method(&self) -> InsertMethod {
        self.method
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the whole tree; an empty tree has height 0.
    pub fn height(&self) -> u8 {
        self.height_of(self.root)
    }

    pub fn root(&self) -> Option<AvlHandle> {
        self.root.map(AvlHandle)
    }

    pub fn get(&self, handle: AvlHandle) -> Option<&T> {
        self.slots
            .get(handle.0)
            .and_then(|slot| slot.as_ref())
            .map(|node| &node.value)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.root = None;
        self.len = 0;
    }

    /// Finds an entry with a caller-supplied comparison. `cmp` returns how the
    /// searched-for key orders relative to the visited value.
    pub fn find_by(&self, mut cmp: impl FnMut(&T) -> Ordering) -> Option<AvlHandle> {
        let mut cur = self.root;
        while let Some(idx) = cur {
            let node = self.node(idx);
            cur = match cmp(&node.value) {
                Ordering::Equal => return Some(AvlHandle(idx)),
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }
        None
    }

    pub fn find<Q>(&self, search: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_by(|value| search.cmp(value.borrow()))
            .and_then(|handle| self.get(handle))
    }

    /// Smallest entry that is greater than or equal to `search`.
    pub fn find_closest_above<Q>(&self, search: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut best = None;
        let mut cur = self.root;
        while let Some(idx) = cur {
            let node = self.node(idx);
            match search.cmp(node.value.borrow()) {
                Ordering::Equal => return Some(&node.value),
                Ordering::Less => {
                    best = Some(&node.value);
                    cur = node.left;
                }
                Ordering::Greater => cur = node.right,
            }
        }
        best
    }

    /// Largest entry that is less than or equal to `search`.
    pub fn find_closest_below<Q>(&self, search: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut best = None;
        let mut cur = self.root;
        while let Some(idx) = cur {
            let node = self.node(idx);
            match search.cmp(node.value.borrow()) {
                Ordering::Equal => return Some(&node.value),
                Ordering::Greater => {
                    best = Some(&node.value);
                    cur = node.right;
                }
                Ordering::Less => cur = node.left,
            }
        }
        best
    }

    /// Inserts `value` according to the tree's [`InsertMethod`].
    ///
    /// Returns the handle of the node holding `value`, or `None` if the value
    /// was dropped by [`InsertMethod::Ignore`].
    pub fn insert(&mut self, value: T) -> Option<AvlHandle>
    where
        T: Ord,
    {
        let new = self.alloc(value);
        let (root, outcome) = self.insert_at(self.root, new);
        self.root = Some(root);
        match outcome {
            InsertOutcome::Inserted => {
                self.len += 1;
                Some(AvlHandle(new))
            }
            InsertOutcome::Ignored => {
                self.release(new);
                None
            }
            InsertOutcome::Replaced(old) => {
                self.release(old);
                Some(AvlHandle(new))
            }
        }
    }

    pub fn remove<Q>(&mut self, search: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let cmp = |value: &T| search.cmp(value.borrow());
        let (root, removed) = self.remove_at(self.root, &cmp);
        self.root = root;
        let removed = removed?;
        self.len -= 1;
        self.release(removed)
    }

    /// Removes exactly the node behind `handle`, even if other entries compare
    /// equal to it.
    pub fn remove_handle(&mut self, handle: AvlHandle) -> Option<T>
    where
        T: Ord,
    {
        self.get(handle)?;
        let (root, found) = self.remove_node_at(self.root, handle.0);
        self.root = root;
        if !found {
            return None;
        }
        self.len -= 1;
        self.release(handle.0)
    }

    pub fn traverse(&self, order: IterateOrder, mut visit: impl FnMut(AvlHandle, &T)) {
        self.traverse_at(self.root, order, &mut visit);
    }

    /// Ascending iterator over the entries.
    pub fn iter(&self) -> Iter<'_, T> {
        let mut iter = Iter {
            tree: self,
            stack: vec![],
        };
        iter.push_left_spine(self.root);
        iter
    }

    fn traverse_at(
        &self,
        tree: Option<usize>,
        order: IterateOrder,
        visit: &mut impl FnMut(AvlHandle, &T),
    ) {
        let Some(idx) = tree else {
            return;
        };
        let node = self.node(idx);
        match order {
            IterateOrder::TopDownLR => {
                visit(AvlHandle(idx), &node.value);
                self.traverse_at(node.left, order, visit);
                self.traverse_at(node.right, order, visit);
            }
            IterateOrder::TopDownRL => {
                visit(AvlHandle(idx), &node.value);
                self.traverse_at(node.right, order, visit);
                self.traverse_at(node.left, order, visit);
            }
            IterateOrder::LowestToHighest => {
                self.traverse_at(node.left, order, visit);
                visit(AvlHandle(idx), &node.value);
                self.traverse_at(node.right, order, visit);
            }
            IterateOrder::HighestToLowest => {
                self.traverse_at(node.right, order, visit);
                visit(AvlHandle(idx), &node.value);
                self.traverse_at(node.left, order, visit);
            }
        }
    }

    fn node(&self, idx: usize) -> &AvlNode<T> {
        match &self.slots[idx] {
            Some(node) => node,
            None => unreachable!("AVL link to vacant slot {}", idx),
        }
    }

    fn node_mut(&mut self, idx: usize) -> &mut AvlNode<T> {
        match &mut self.slots[idx] {
            Some(node) => node,
            None => unreachable!("AVL link to vacant slot {}", idx),
        }
    }

    fn alloc(&mut self, value: T) -> usize {
        let node = AvlNode {
            left: None,
            right: None,
            height: 1,
            value,
        };
        if let Some(idx) = self.free.pop() {
            self.slots[idx] = Some(node);
            idx
        } else {
            self.slots.push(Some(node));
            self.slots.len() - 1
        }
    }

    fn release(&mut self, idx: usize) -> Option<T> {
        let node = self.slots.get_mut(idx)?.take()?;
        self.free.push(idx);
        Some(node.value)
    }

    fn height_of(&self, tree: Option<usize>) -> u8 {
        tree.map_or(0, |idx| self.node(idx).height)
    }

    fn balance_of(&self, tree: Option<usize>) -> i32 {
        tree.map_or(0, |idx| {
            let node = self.node(idx);
            self.height_of(node.left) as i32 - self.height_of(node.right) as i32
        })
    }

    fn update_height(&mut self, idx: usize) {
        let node = self.node(idx);
        let height = self.height_of(node.left).max(self.height_of(node.right)) + 1;
        self.node_mut(idx).height = height;
    }

    fn child(&self, idx: usize, side: Side) -> Option<usize> {
        match side {
            Side::Left => self.node(idx).left,
            Side::Right => self.node(idx).right,
        }
    }

    fn set_child(&mut self, idx: usize, side: Side, child: Option<usize>) {
        match side {
            Side::Left => self.node_mut(idx).left = child,
            Side::Right => self.node_mut(idx).right = child,
        }
    }

    fn rotate_right(&mut self, pivot: usize) -> usize {
        let Some(new_root) = self.node(pivot).left else {
            return pivot;
        };
        let transfer = self.node(new_root).right;
        self.node_mut(new_root).right = Some(pivot);
        self.node_mut(pivot).left = transfer;
        self.update_height(pivot);
        self.update_height(new_root);
        new_root
    }

    fn rotate_left(&mut self, pivot: usize) -> usize {
        let Some(new_root) = self.node(pivot).right else {
            return pivot;
        };
        let transfer = self.node(new_root).left;
        self.node_mut(new_root).left = Some(pivot);
        self.node_mut(pivot).right = transfer;
        self.update_height(pivot);
        self.update_height(new_root);
        new_root
    }

    /// Restores the height and the balance of `idx` after one of its subtrees
    /// changed, returning the new root of the subtree.
    fn rebalance(&mut self, idx: usize) -> usize {
        self.update_height(idx);
        let balance = self.balance_of(Some(idx));
        if balance > 1 {
            if let Some(left) = self.node(idx).left {
                // Left Right
                if self.balance_of(Some(left)) < 0 {
                    let left = self.rotate_left(left);
                    self.node_mut(idx).left = Some(left);
                }
            }
            // Left Left
            return self.rotate_right(idx);
        }
        if balance < -1 {
            if let Some(right) = self.node(idx).right {
                // Right Left
                if self.balance_of(Some(right)) > 0 {
                    let right = self.rotate_right(right);
                    self.node_mut(idx).right = Some(right);
                }
            }
            // Right Right
            return self.rotate_left(idx);
        }
        idx
    }

    fn insert_at(&mut self, tree: Option<usize>, new: usize) -> (usize, InsertOutcome)
    where
        T: Ord,
    {
        let Some(idx) = tree else {
            return (new, InsertOutcome::Inserted);
        };

        let side = match (self.node(new).value.cmp(&self.node(idx).value), self.method) {
            (Ordering::Less, _) => Side::Left,
            (Ordering::Greater, _) => Side::Right,
            (Ordering::Equal, InsertMethod::Ignore) => return (idx, InsertOutcome::Ignored),
            (Ordering::Equal, InsertMethod::Replace) => {
                let old = self.node(idx);
                let (left, right, height) = (old.left, old.right, old.height);
                let node = self.node_mut(new);
                node.left = left;
                node.right = right;
                node.height = height;
                return (new, InsertOutcome::Replaced(idx));
            }
            (Ordering::Equal, InsertMethod::Greater) => Side::Right,
            (Ordering::Equal, InsertMethod::Lesser) => Side::Left,
        };

        let (child, outcome) = self.insert_at(self.child(idx, side), new);
        self.set_child(idx, side, Some(child));
        if outcome == InsertOutcome::Inserted {
            (self.rebalance(idx), outcome)
        } else {
            (idx, outcome)
        }
    }

    fn remove_at<F>(&mut self, tree: Option<usize>, cmp: &F) -> (Option<usize>, Option<usize>)
    where
        F: Fn(&T) -> Ordering,
    {
        let Some(idx) = tree else {
            return (None, None);
        };
        let side = match cmp(&self.node(idx).value) {
            Ordering::Equal => return (self.unlink(idx), Some(idx)),
            Ordering::Less => Side::Left,
            Ordering::Greater => Side::Right,
        };
        let (child, removed) = self.remove_at(self.child(idx, side), cmp);
        if removed.is_none() {
            return (Some(idx), None);
        }
        self.set_child(idx, side, child);
        (Some(self.rebalance(idx)), removed)
    }

    fn remove_node_at(&mut self, tree: Option<usize>, target: usize) -> (Option<usize>, bool)
    where
        T: Ord,
    {
        let Some(idx) = tree else {
            return (None, false);
        };
        if idx == target {
            return (self.unlink(idx), true);
        }

        // Rotations can move entries that compare equal to either side of each
        // other, so both subtrees are candidates on equality.
        let sides: &[Side] = match self.node(target).value.cmp(&self.node(idx).value) {
            Ordering::Less => &[Side::Left],
            Ordering::Greater => &[Side::Right],
            Ordering::Equal if self.method == InsertMethod::Lesser => &[Side::Left, Side::Right],
            Ordering::Equal => &[Side::Right, Side::Left],
        };

        for &side in sides {
            let (child, found) = self.remove_node_at(self.child(idx, side), target);
            if found {
                self.set_child(idx, side, child);
                return (Some(self.rebalance(idx)), true);
            }
        }
        (Some(idx), false)
    }

    /// Detaches `idx` from its subtree and returns the subtree's new root.
    /// The slot itself is left for the caller to release.
    fn unlink(&mut self, idx: usize) -> Option<usize> {
        let node = self.node(idx);
        match (node.left, node.right) {
            (None, None) => None,
            (Some(child), None) | (None, Some(child)) => Some(child),
            (Some(left), Some(right)) => {
                let (rest, min) = self.detach_min(right);
                let successor = self.node_mut(min);
                successor.left = Some(left);
                successor.right = rest;
                Some(self.rebalance(min))
            }
        }
    }

    fn detach_min(&mut self, idx: usize) -> (Option<usize>, usize) {
        match self.node(idx).left {
            None => (self.node(idx).right, idx),
            Some(left) => {
                let (rest, min) = self.detach_min(left);
                self.node_mut(idx).left = rest;
                (Some(self.rebalance(idx)), min)
            }
        }
    }
}

pub struct Iter<'a, T> {
    tree: &'a AvlTree<T>,
    stack: Vec<usize>,
}

impl<'a, T> Iter<'a, T> {
    fn push_left_spine(&mut self, mut cur: Option<usize>) {
        while let Some(idx) = cur {
            self.stack.push(idx);
            cur = self.tree.node(idx).left;
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.stack.pop()?;
        let tree = self.tree;
        let node = tree.node(idx);
        self.push_left_spine(node.right);
        Some(&node.value)
    }
}

#[cfg(test)]
mod test;
