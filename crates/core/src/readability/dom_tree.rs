use crate::parse::{Document, Element};

/// A node in the DOM tree representing an element
#[derive(Debug, Clone)]
pub struct DomNode<'a> {
    /// The element itself
    pub element: Element<'a>,
    /// Parent node ID (if any)
    pub parent_id: Option<usize>,
    /// Child node IDs, in document order
    pub child_ids: Vec<usize>,
}

/// Index of every element in a document, numbered in document order.
///
/// Node IDs are stable for the lifetime of the borrowed [`Document`], which
/// lets scores be keyed by ID and propagated to real ancestors.
#[derive(Debug, Clone, Default)]
pub struct DomTree<'a> {
    nodes: Vec<DomNode<'a>>,
}

impl<'a> DomTree<'a> {
    /// Walks `doc` from its root element, pre-order.
    pub fn build(doc: &'a Document) -> Self {
        let mut nodes: Vec<DomNode<'a>> = Vec::new();
        let mut stack: Vec<(Element<'a>, Option<usize>)> = vec![(doc.root_element(), None)];

        while let Some((element, parent_id)) = stack.pop() {
            let id = nodes.len();
            if let Some(parent) = parent_id.and_then(|p| nodes.get_mut(p)) {
                parent.child_ids.push(id);
            }

            let children = element.children();
            nodes.push(DomNode { element, parent_id, child_ids: Vec::new() });

            stack.extend(children.into_iter().rev().map(|child| (child, Some(id))));
        }

        Self { nodes }
    }

    /// Get a node by ID
    pub fn get_node(&self, id: usize) -> Option<&DomNode<'a>> {
        self.nodes.get(id)
    }

    /// Get the parent ID of a node
    pub fn parent_of(&self, id: usize) -> Option<usize> {
        self.nodes.get(id)?.parent_id
    }

    /// Iterates the ancestor IDs of a node, nearest first
    pub fn ancestors(&self, id: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.parent_of(id), move |&current| self.parent_of(current))
    }

    /// Iterates all nodes with their IDs in document order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &DomNode<'a>)> {
        self.nodes.iter().enumerate()
    }

    /// Get the total number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
