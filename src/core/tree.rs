// Copyright @yucwang 2026

use crate::core::patch::Patch;
use crate::core::shape::ParametricSurface;
use crate::math::constants::Float;

pub type NodeId = usize;

/// Address of a node: top-level patch index plus node handle in its tree.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PatchRef {
    pub patch: usize,
    pub node: NodeId,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Link {
    pub target: PatchRef,
    pub factor: Float,
}

#[derive(Debug, Clone)]
pub struct PatchNode {
    geometry: Patch,
    area: Option<Float>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    parent: Option<NodeId>,
    depth: u32,
    leaf: bool,
    links: Vec<Link>,
}

impl PatchNode {
    fn new(geometry: Patch, parent: Option<NodeId>, depth: u32) -> Self {
        Self { geometry, area: None, left: None, right: None,
               parent, depth, leaf: false, links: Vec::new() }
    }

    pub fn geometry(&self) -> &Patch {
        &self.geometry
    }

    pub fn children(&self) -> Option<(NodeId, NodeId)> {
        match (self.left, self.right) {
            (Some(l), Some(r)) => Some((l, r)),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }
}

/// Lazily refined binary subdivision of one top-level patch, stored as an
/// arena. Node 0 is the root.
#[derive(Debug, Clone)]
pub struct PatchTree {
    patch: usize,
    nodes: Vec<PatchNode>,
}

pub const ROOT: NodeId = 0;

impl PatchTree {
    pub fn new(patch: usize, geometry: Patch) -> Self {
        let mut root = PatchNode::new(geometry, None, 0);
        root.leaf = true;
        Self { patch, nodes: vec![root] }
    }

    pub fn patch(&self) -> usize {
        self.patch
    }

    pub fn node(&self, id: NodeId) -> &PatchNode {
        &self.nodes[id]
    }

    pub fn geometry(&self, id: NodeId) -> &Patch {
        &self.nodes[id].geometry
    }

    pub fn patch_ref(&self, id: NodeId) -> PatchRef {
        PatchRef { patch: self.patch, node: id }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Memoised area; computed on first request only.
    pub fn area(&mut self, id: NodeId) -> Float {
        let node = &mut self.nodes[id];
        match node.area {
            Some(a) => a,
            None => {
                let a = node.geometry.area();
                node.area = Some(a);
                a
            }
        }
    }

    /// Subdivides `id` if it has no children yet. New children are inactive
    /// and have their areas computed once here.
    pub fn ensure_children(&mut self, id: NodeId) -> (NodeId, NodeId) {
        if let Some(children) = self.nodes[id].children() {
            return children;
        }

        let (left, right) = self.nodes[id].geometry.subdivide();
        let depth = self.nodes[id].depth + 1;
        let l = self.nodes.len();
        let r = l + 1;

        let mut left = PatchNode::new(left, Some(id), depth);
        let mut right = PatchNode::new(right, Some(id), depth);
        left.area = Some(left.geometry.area());
        right.area = Some(right.geometry.area());
        self.nodes.push(left);
        self.nodes.push(right);

        let node = &mut self.nodes[id];
        node.left = Some(l);
        node.right = Some(r);
        (l, r)
    }

    /// Marks `id` as an active leaf and takes the leaf status away from its
    /// parent.
    pub fn activate(&mut self, id: NodeId) {
        self.nodes[id].leaf = true;
        if let Some(parent) = self.nodes[id].parent {
            self.nodes[parent].leaf = false;
        }
    }

    /// `ensure_children` plus hand-over of the leaf flag from an active node
    /// to both children.
    pub fn refine(&mut self, id: NodeId) -> (NodeId, NodeId) {
        let (l, r) = self.ensure_children(id);
        if self.nodes[id].leaf {
            self.activate(l);
            self.activate(r);
        }
        (l, r)
    }

    pub fn record(&mut self, id: NodeId, link: Link) {
        self.nodes[id].links.push(link);
    }

    pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().enumerate().filter(|(_, n)| n.leaf).map(|(i, _)| i)
    }

    pub fn link_count(&self) -> usize {
        self.nodes.iter().map(|n| n.links.len()).sum()
    }
}
