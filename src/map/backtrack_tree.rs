use slab::Slab;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NodeId(usize);

/// Append-only tree of edit operations. Every partial alignment points at its newest edit
/// operation; siblings share the history of their parent. The only direction of traversal is
/// from children to parents (towards a root). It's possible to build trees with multiple roots.
#[derive(Default)]
pub struct Tree<T>(Slab<Node<T>>);

impl<T> Tree<T> {
    /// Create a new tree
    pub fn new() -> Self {
        Self(Slab::new())
    }

    /// Create a new tree with specified capacity to avoid frequent allocations
    /// if the maximal size of the tree is known upfront
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Slab::with_capacity(capacity))
    }

    /// Add node to tree under `parent`. If `parent` is `None`, the current node is inserted as a root.
    pub fn add_node<U>(&mut self, value: T, parent: U) -> NodeId
    where
        U: Into<Option<NodeId>>,
    {
        NodeId(self.0.insert(Node {
            value,
            parent: parent.into(),
        }))
    }

    /// Returns the data associated with a node
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.0.get(id.0).map(|node| &node.value)
    }

    /// Returns an _inclusive_ iterator over the data associated with the ancestors of a given node ID
    pub fn ancestors(&self, id: NodeId) -> Ancestors<T> {
        Ancestors {
            tree: self,
            state: Some(id),
        }
    }

    /// Returns the number of elements in the tree
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns if the tree is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Clears the tree, keeps the allocated memory for reuse
    pub fn clear(&mut self) {
        self.0.clear()
    }
}

/// The node struct is not exposed at the API surface
struct Node<T> {
    value: T,
    parent: Option<NodeId>,
}

/// Inclusive iterator over the data associated with the ancestors of a given node ID
pub struct Ancestors<'a, T> {
    tree: &'a Tree<T>,
    state: Option<NodeId>,
}

impl<'a, T> Iterator for Ancestors<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.tree.0.get(self.state?.0)?;
        self.state = node.parent;
        Some(&node.value)
    }
}
