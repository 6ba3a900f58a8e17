//! Traversal policies
//!
//! A traversal owns the worklist of mapped folders still waiting to be
//! expanded. Depth-first uses a stack, breadth-first a FIFO queue, and
//! [`DepthTracking`] wraps either one to remember how far below the start
//! node every queued folder sits.

use std::collections::{HashMap, VecDeque};

use drivemap_core::domain::{MappingError, NodeId};

/// Order in which discovered folders are expanded
pub trait TraversalStrategy: Send {
    /// Seeds the worklist with the node the pass starts from
    fn start(&mut self, node: NodeId);

    /// Whether the worklist is empty
    fn is_done(&self) -> bool;

    /// Takes the next folder to expand
    ///
    /// # Errors
    /// Returns `IllegalState` when called on an empty worklist
    fn next_node(&mut self) -> Result<NodeId, MappingError>;

    /// Queues `node`, discovered as a child of `parent`
    ///
    /// # Errors
    /// Depth-tracking traversals return `InvalidArgument` when `parent`
    /// has no recorded depth
    fn add_child(&mut self, node: NodeId, parent: NodeId) -> Result<(), MappingError>;

    /// Depth of a queued or expanded node relative to the start node
    fn depth_of(&self, _node: NodeId) -> Option<usize> {
        None
    }

    /// Empties the worklist, returning what was still pending
    fn drain(&mut self) -> Vec<NodeId>;
}

fn exhausted() -> MappingError {
    MappingError::IllegalState("Requested next node but the traversal is done".to_string())
}

// ============================================================================
// DFS / BFS
// ============================================================================

/// Depth-first traversal (push and pop at the same end)
#[derive(Debug, Default)]
pub struct DepthFirst {
    stack: Vec<NodeId>,
}

impl DepthFirst {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TraversalStrategy for DepthFirst {
    fn start(&mut self, node: NodeId) {
        self.stack.push(node);
    }

    fn is_done(&self) -> bool {
        self.stack.is_empty()
    }

    fn next_node(&mut self) -> Result<NodeId, MappingError> {
        self.stack.pop().ok_or_else(exhausted)
    }

    fn add_child(&mut self, node: NodeId, _parent: NodeId) -> Result<(), MappingError> {
        self.stack.push(node);
        Ok(())
    }

    fn drain(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.stack)
    }
}

/// Breadth-first traversal (FIFO queue)
#[derive(Debug, Default)]
pub struct BreadthFirst {
    queue: VecDeque<NodeId>,
}

impl BreadthFirst {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TraversalStrategy for BreadthFirst {
    fn start(&mut self, node: NodeId) {
        self.queue.push_back(node);
    }

    fn is_done(&self) -> bool {
        self.queue.is_empty()
    }

    fn next_node(&mut self) -> Result<NodeId, MappingError> {
        self.queue.pop_front().ok_or_else(exhausted)
    }

    fn add_child(&mut self, node: NodeId, _parent: NodeId) -> Result<(), MappingError> {
        self.queue.push_back(node);
        Ok(())
    }

    fn drain(&mut self) -> Vec<NodeId> {
        self.queue.drain(..).collect()
    }
}

// ============================================================================
// Depth tracking
// ============================================================================

/// Wraps a traversal and records each node's depth below the start node
///
/// Depths are kept after a node is taken from the worklist so its children
/// can still be placed.
#[derive(Debug, Default)]
pub struct DepthTracking<T> {
    inner: T,
    depths: HashMap<NodeId, usize>,
}

impl<T: TraversalStrategy> DepthTracking<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            depths: HashMap::new(),
        }
    }
}

impl<T: TraversalStrategy> TraversalStrategy for DepthTracking<T> {
    fn start(&mut self, node: NodeId) {
        self.depths.insert(node, 0);
        self.inner.start(node);
    }

    fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    fn next_node(&mut self) -> Result<NodeId, MappingError> {
        self.inner.next_node()
    }

    fn add_child(&mut self, node: NodeId, parent: NodeId) -> Result<(), MappingError> {
        let parent_depth = self.depths.get(&parent).copied().ok_or_else(|| {
            MappingError::InvalidArgument(format!(
                "Parent node {} has not been added before",
                parent.index()
            ))
        })?;
        self.inner.add_child(node, parent)?;
        self.depths.insert(node, parent_depth + 1);
        Ok(())
    }

    fn depth_of(&self, node: NodeId) -> Option<usize> {
        self.depths.get(&node).copied()
    }

    fn drain(&mut self) -> Vec<NodeId> {
        self.inner.drain()
    }
}
