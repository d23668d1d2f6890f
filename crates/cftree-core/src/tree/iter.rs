//! Depth-first leaf iteration.
//!
//! Both iterators keep an explicit LIFO work list seeded with the root. A
//! popped node pushes all of its children in slot order, so the *last* child
//! is visited first. This order is relied upon by rebuilds and by callers
//! that need reproducible output, and must not be changed to breadth-first.

use super::node::{Children, LeafEntry, TreeNode};

enum Open<'a, I> {
    Node(&'a TreeNode<I>),
    Leaf(&'a LeafEntry<I>),
}

/// Borrowing iterator over all leaf entries of a tree.
///
/// Created by [`CFTree::leaves`](super::CFTree::leaves). The borrow checker
/// rules out mutating the tree while this iterator is alive.
pub struct Leaves<'a, I> {
    stack: Vec<Open<'a, I>>,
}

impl<'a, I> Leaves<'a, I> {
    pub(crate) fn new(root: Option<&'a TreeNode<I>>) -> Self {
        Self {
            stack: root.map(Open::Node).into_iter().collect(),
        }
    }
}

impl<'a, I> Iterator for Leaves<'a, I> {
    type Item = &'a LeafEntry<I>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(open) = self.stack.pop() {
            match open {
                Open::Leaf(leaf) => return Some(leaf),
                Open::Node(node) => match &node.children {
                    Children::Leaves(leaves) => self.stack.extend(leaves.iter().map(Open::Leaf)),
                    Children::Nodes(nodes) => self.stack.extend(nodes.iter().map(Open::Node)),
                },
            }
        }
        None
    }
}

enum OwnedOpen<I> {
    Node(TreeNode<I>),
    Leaf(LeafEntry<I>),
}

/// Consuming iterator over all leaf entries of a tree, in the same order as
/// [`Leaves`].
///
/// Inner nodes are dropped as soon as their children have been queued.
pub struct IntoLeaves<I> {
    stack: Vec<OwnedOpen<I>>,
}

impl<I> IntoLeaves<I> {
    pub(crate) fn new(root: Option<TreeNode<I>>) -> Self {
        Self {
            stack: root.map(OwnedOpen::Node).into_iter().collect(),
        }
    }
}

impl<I> Iterator for IntoLeaves<I> {
    type Item = LeafEntry<I>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(open) = self.stack.pop() {
            match open {
                OwnedOpen::Leaf(leaf) => return Some(leaf),
                OwnedOpen::Node(node) => match node.children {
                    Children::Leaves(leaves) => {
                        self.stack.extend(leaves.into_iter().map(OwnedOpen::Leaf))
                    }
                    Children::Nodes(nodes) => {
                        self.stack.extend(nodes.into_iter().map(OwnedOpen::Node))
                    }
                },
            }
        }
        None
    }
}
