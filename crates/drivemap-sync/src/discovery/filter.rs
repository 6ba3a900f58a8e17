//! Filter policies: whether a mapped folder is expanded further
//!
//! A filtered folder stays in the registry but its children are not
//! fetched during this pass.

use std::sync::Arc;

use drivemap_core::domain::{IgnoreMatcher, MappingError, MappingRegistry, NodeId};

/// Outcome of a filter check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// Queue the folder for expansion
    Expand,
    /// Pruned on purpose (ignore rules); the parent stays up to date
    Ignored,
    /// Pruned by the depth limit; the parent is no longer up to date
    DepthLimited,
}

impl FilterDecision {
    pub fn is_filtered(self) -> bool {
        self != Self::Expand
    }
}

/// What a filter gets to look at
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    pub registry: &'a MappingRegistry,
    /// The mapped folder under consideration
    pub node: NodeId,
    /// The folder being expanded
    pub parent: NodeId,
    /// Depth of `node` below the start node, when the traversal tracks depths
    pub depth: Option<usize>,
}

/// Decides whether a mapped folder is pruned from the traversal
pub trait FilterStrategy: Send + Sync {
    /// # Errors
    /// Implementations may reject a context they cannot evaluate
    fn filter(&self, ctx: &FilterContext<'_>) -> Result<FilterDecision, MappingError>;
}

/// Expands everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFilter;

impl FilterStrategy for NoFilter {
    fn filter(&self, _ctx: &FilterContext<'_>) -> Result<FilterDecision, MappingError> {
        Ok(FilterDecision::Expand)
    }
}

/// Prunes folders whose local path is ignored
#[derive(Debug, Clone)]
pub struct FilterIfIgnored {
    ignorer: Arc<IgnoreMatcher>,
}

impl FilterIfIgnored {
    pub fn new(ignorer: Arc<IgnoreMatcher>) -> Self {
        Self { ignorer }
    }
}

impl FilterStrategy for FilterIfIgnored {
    fn filter(&self, ctx: &FilterContext<'_>) -> Result<FilterDecision, MappingError> {
        let node = ctx.registry.node(ctx.node).ok_or_else(|| {
            MappingError::IllegalState(format!("Filtered node {} is not live", ctx.node.index()))
        })?;
        if self.ignorer.is_ignored(node.local_path()) {
            Ok(FilterDecision::Ignored)
        } else {
            Ok(FilterDecision::Expand)
        }
    }
}

/// Prunes folders deeper than `max_depth`, then defers to a second filter
pub struct DepthLimitFilter {
    max_depth: usize,
    then: Box<dyn FilterStrategy>,
}

impl DepthLimitFilter {
    pub fn new(max_depth: usize, then: Box<dyn FilterStrategy>) -> Self {
        Self { max_depth, then }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl FilterStrategy for DepthLimitFilter {
    fn filter(&self, ctx: &FilterContext<'_>) -> Result<FilterDecision, MappingError> {
        let depth = ctx.depth.ok_or_else(|| {
            MappingError::InvalidArgument(format!(
                "Parent node {} has no recorded depth",
                ctx.parent.index()
            ))
        })?;
        if depth > self.max_depth {
            return Ok(FilterDecision::DepthLimited);
        }
        self.then.filter(ctx)
    }
}
