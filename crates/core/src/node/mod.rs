//! One navigation interface over every view of a profile.
//!
//! The direct view wraps arena records as they were sampled. The flat view
//! walks per-thread signature graphs, top-down or bottom-up. The source views
//! restrict navigation to one plugin or library, either per originating thread
//! or merged across the whole profile. Consumers (flame layout, highlight
//! checks, labels) are written against [`VirtualNode`] and do not care which
//! view they traverse.

mod direct;
mod flat;
mod source;

pub use direct::DirectNode;
pub use flat::FlatNode;
pub use source::{MergedNode, SourceNode};

use crate::model::{NodeDetails, NodeIds, SourceKey};

pub trait VirtualNode: Sized {
    /// Identity; aggregated nodes carry every folded occurrence.
    fn id(&self) -> NodeIds;
    fn details(&self) -> NodeDetails;
    /// Children in display order.
    fn children(&self) -> Vec<Self>;
    /// Parents in display order. Empty for thread nodes.
    fn parents(&self) -> Vec<Self>;
    /// Weight of this node in its view.
    fn time(&self) -> f64;
    fn source(&self) -> Option<SourceKey>;
}

/// A node of any view.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewNode<'a> {
    Direct(DirectNode<'a>),
    Flat(FlatNode<'a>),
    Source(SourceNode<'a>),
    Merged(MergedNode<'a>),
}

macro_rules! dispatch {
    ($self:ident, $node:ident => $body:expr) => {
        match $self {
            ViewNode::Direct($node) => $body,
            ViewNode::Flat($node) => $body,
            ViewNode::Source($node) => $body,
            ViewNode::Merged($node) => $body,
        }
    };
}

impl<'a> VirtualNode for ViewNode<'a> {
    fn id(&self) -> NodeIds {
        dispatch!(self, n => n.id())
    }

    fn details(&self) -> NodeDetails {
        dispatch!(self, n => n.details())
    }

    fn children(&self) -> Vec<Self> {
        match self {
            Self::Direct(n) => n.children().into_iter().map(Self::Direct).collect(),
            Self::Flat(n) => n.children().into_iter().map(Self::Flat).collect(),
            Self::Source(n) => n.children().into_iter().map(Self::Source).collect(),
            Self::Merged(n) => n.children().into_iter().map(Self::Merged).collect(),
        }
    }

    fn parents(&self) -> Vec<Self> {
        match self {
            Self::Direct(n) => n.parents().into_iter().map(Self::Direct).collect(),
            Self::Flat(n) => n.parents().into_iter().map(Self::Flat).collect(),
            Self::Source(n) => n.parents().into_iter().map(Self::Source).collect(),
            Self::Merged(n) => n.parents().into_iter().map(Self::Merged).collect(),
        }
    }

    fn time(&self) -> f64 {
        dispatch!(self, n => n.time())
    }

    fn source(&self) -> Option<SourceKey> {
        dispatch!(self, n => n.source())
    }
}

impl<'a> From<DirectNode<'a>> for ViewNode<'a> {
    fn from(node: DirectNode<'a>) -> Self {
        Self::Direct(node)
    }
}

impl<'a> From<FlatNode<'a>> for ViewNode<'a> {
    fn from(node: FlatNode<'a>) -> Self {
        Self::Flat(node)
    }
}

impl<'a> From<SourceNode<'a>> for ViewNode<'a> {
    fn from(node: SourceNode<'a>) -> Self {
        Self::Source(node)
    }
}

impl<'a> From<MergedNode<'a>> for ViewNode<'a> {
    fn from(node: MergedNode<'a>) -> Self {
        Self::Merged(node)
    }
}
