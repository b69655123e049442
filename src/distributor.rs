//! Weighted priority-tree byte distributor (RFC 7540 Section 5.3).
//!
//! Streams form a dependency tree rooted at the connection (stream 0). Given
//! an outbound budget, a node first serves its own streamable bytes, then
//! splits what is left among children whose subtree still has bytes to
//! send, in proportion to `weight / sum(active sibling weights)`. Shares a
//! child cannot use flow back to its siblings. Budget too small to split by
//! weight goes whole to the next sibling in round-robin order, continuing
//! after the one served last, so equal siblings take turns across rounds.
//!
//! The distributor only sees "streamable" byte counts. Callers keep them in
//! sync with pending data and windows; each allocation is reported through
//! the writer callback in chunks of at most `max_frame_size`.
//!
//! Nodes named by PRIORITY frames before (or after) their stream exists are
//! placeholders. Only `max_placeholders` of them are kept; past that the
//! oldest childless one is dropped.

use std::collections::{HashMap, VecDeque};

use tracing::trace;

use crate::config::DEFAULT_MAX_PRIORITY_PLACEHOLDERS;
use crate::frame::{PrioritySpec, StreamId, CONNECTION_STREAM_ID};

const ROOT: StreamId = CONNECTION_STREAM_ID;

#[derive(Debug)]
struct Node {
    parent: StreamId,
    children: Vec<StreamId>,
    weight: u16,
    /// Bytes this stream could write right now.
    streamable: usize,
    /// `streamable` of this node and all of its descendants.
    subtree: usize,
    /// Round-robin cursor into `children`.
    next_child: usize,
    placeholder: bool,
}

impl Node {
    fn new(parent: StreamId, weight: u16) -> Self {
        Self {
            parent,
            children: Vec::new(),
            weight,
            streamable: 0,
            subtree: 0,
            next_child: 0,
            placeholder: false,
        }
    }
}

#[derive(Debug)]
pub struct ByteDistributor {
    nodes: HashMap<StreamId, Node>,
    /// Placeholder ids, oldest first.
    placeholders: VecDeque<StreamId>,
    max_placeholders: usize,
    max_frame_size: usize,
}

impl ByteDistributor {
    pub fn new(max_frame_size: usize) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(ROOT, Node::new(ROOT, PrioritySpec::DEFAULT_WEIGHT));
        Self {
            nodes,
            placeholders: VecDeque::new(),
            max_placeholders: DEFAULT_MAX_PRIORITY_PLACEHOLDERS,
            max_frame_size: max_frame_size.max(1),
        }
    }

    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.max_frame_size = max_frame_size.max(1);
    }

    pub fn set_max_placeholders(&mut self, max_placeholders: usize) {
        self.max_placeholders = max_placeholders;
        self.trim_placeholders(&[]);
    }

    pub fn placeholder_count(&self) -> usize {
        self.placeholders.len()
    }

    /// Register an open stream. A placeholder with the same id keeps its
    /// place in the tree and stops counting as a placeholder.
    pub fn add_stream(&mut self, stream_id: StreamId) {
        if stream_id == ROOT {
            return;
        }
        match self.nodes.get_mut(&stream_id) {
            Some(node) if node.placeholder => {
                node.placeholder = false;
                self.placeholders.retain(|&id| id != stream_id);
            }
            Some(_) => {}
            None => {
                self.nodes.insert(stream_id, Node::new(ROOT, PrioritySpec::DEFAULT_WEIGHT));
                if let Some(root) = self.nodes.get_mut(&ROOT) {
                    root.children.push(stream_id);
                }
            }
        }
    }

    pub fn contains(&self, stream_id: StreamId) -> bool {
        self.nodes.contains_key(&stream_id)
    }

    pub fn weight(&self, stream_id: StreamId) -> Option<u16> {
        self.nodes.get(&stream_id).map(|n| n.weight)
    }

    pub fn parent(&self, stream_id: StreamId) -> Option<StreamId> {
        if stream_id == ROOT {
            return None;
        }
        self.nodes.get(&stream_id).map(|n| n.parent)
    }

    /// Visit the children of `stream_id` in tree order until `visitor`
    /// returns `false`.
    pub fn for_each_child(&self, stream_id: StreamId, mut visitor: impl FnMut(StreamId) -> bool) {
        if let Some(node) = self.nodes.get(&stream_id) {
            for &child in &node.children {
                if !visitor(child) {
                    break;
                }
            }
        }
    }

    pub fn streamable_bytes(&self, stream_id: StreamId) -> usize {
        self.nodes.get(&stream_id).map_or(0, |n| n.streamable)
    }

    /// Whether any stream in the tree still has bytes it could write.
    pub fn has_streamable(&self) -> bool {
        self.nodes.get(&ROOT).map_or(false, |n| n.subtree > 0)
    }

    /// Record how many bytes `stream_id` could write now, i.e.
    /// `min(pending, window)` or zero when the window is not positive.
    pub fn update_streamable_bytes(&mut self, stream_id: StreamId, bytes: usize) {
        if stream_id == ROOT {
            return;
        }
        self.add_stream(stream_id);
        let old = match self.nodes.get_mut(&stream_id) {
            Some(node) => std::mem::replace(&mut node.streamable, bytes),
            None => return,
        };
        if bytes > old {
            self.add_subtree(stream_id, bytes - old);
        } else if old > bytes {
            self.sub_subtree(stream_id, old - bytes);
        }
    }

    /// Re-parent and re-weight `stream_id`. Unknown streams on either side
    /// become placeholders with the default weight under the root.
    pub fn update_dependency(&mut self, stream_id: StreamId, parent: StreamId, weight: u16, exclusive: bool) {
        if stream_id == ROOT || stream_id == parent {
            return;
        }
        self.ensure_node(parent);
        self.ensure_node(stream_id);

        // A stream cannot depend on its own descendant: lift the new parent
        // into our old position first.
        if self.is_descendant(parent, stream_id) {
            let old_parent = self.nodes.get(&stream_id).map_or(ROOT, |n| n.parent);
            self.detach(parent);
            self.attach(parent, old_parent);
        }

        self.detach(stream_id);
        if exclusive {
            let siblings = self.nodes.get(&parent).map(|n| n.children.clone()).unwrap_or_default();
            for sibling in siblings {
                self.detach(sibling);
                self.attach(sibling, stream_id);
            }
        }
        if let Some(node) = self.nodes.get_mut(&stream_id) {
            node.weight = weight.clamp(PrioritySpec::MIN_WEIGHT, PrioritySpec::MAX_WEIGHT);
        }
        self.attach(stream_id, parent);
        self.trim_placeholders(&[stream_id, parent]);
    }

    /// Drop `stream_id` from the tree; its children move to its parent.
    pub fn remove(&mut self, stream_id: StreamId) {
        if stream_id == ROOT {
            return;
        }
        let (parent, children) = match self.nodes.get(&stream_id) {
            Some(node) => (node.parent, node.children.clone()),
            None => return,
        };
        for child in children {
            self.detach(child);
            self.attach(child, parent);
        }
        let streamable = self.nodes.get(&stream_id).map_or(0, |n| n.streamable);
        self.sub_subtree(stream_id, streamable);
        self.placeholders.retain(|&id| id != stream_id);
        self.detach(stream_id);
        self.nodes.remove(&stream_id);
    }

    /// Hand out up to `max_bytes` across streams, reporting each allocation
    /// through `writer`. Returns whether streamable bytes remain afterwards.
    pub fn distribute<F>(&mut self, max_bytes: usize, mut writer: F) -> bool
    where
        F: FnMut(StreamId, usize),
    {
        if max_bytes > 0 {
            self.allocate(ROOT, max_bytes, &mut writer);
        }
        self.has_streamable()
    }

    fn allocate<F>(&mut self, stream_id: StreamId, budget: usize, writer: &mut F) -> usize
    where
        F: FnMut(StreamId, usize),
    {
        let mut used = 0;
        let own = self.streamable_bytes(stream_id).min(budget);
        if own > 0 {
            self.emit(stream_id, own, writer);
            used = own;
        }

        while used < budget {
            let active = self.active_children(stream_id);
            if active.is_empty() {
                break;
            }
            let remaining = budget - used;
            let total_weight: u64 = active.iter().map(|&(_, w)| w as u64).sum();
            let mut progress = 0;
            let mut split = false;

            for &(child, weight) in &active {
                let left = remaining - progress;
                if left == 0 {
                    break;
                }
                let share = (remaining as u64 * weight as u64 / total_weight) as usize;
                if share == 0 {
                    continue;
                }
                split = true;
                progress += self.allocate(child, share.min(left), writer);
                self.mark_served(stream_id, child);
            }

            if !split {
                let (child, _) = active[0];
                progress += self.allocate(child, remaining, writer);
                self.mark_served(stream_id, child);
            }

            if progress == 0 {
                break;
            }
            used += progress;
        }
        used
    }

    fn emit<F>(&mut self, stream_id: StreamId, bytes: usize, writer: &mut F)
    where
        F: FnMut(StreamId, usize),
    {
        if let Some(node) = self.nodes.get_mut(&stream_id) {
            node.streamable -= bytes;
        }
        self.sub_subtree(stream_id, bytes);

        let mut left = bytes;
        while left > 0 {
            let chunk = left.min(self.max_frame_size);
            writer(stream_id, chunk);
            left -= chunk;
        }
    }

    /// Children with bytes somewhere in their subtree, starting at the
    /// round-robin cursor.
    fn active_children(&self, stream_id: StreamId) -> Vec<(StreamId, u16)> {
        let Some(node) = self.nodes.get(&stream_id) else {
            return Vec::new();
        };
        let len = node.children.len();
        (0..len)
            .map(|i| node.children[(node.next_child + i) % len])
            .filter_map(|child| {
                self.nodes
                    .get(&child)
                    .filter(|c| c.subtree > 0)
                    .map(|c| (child, c.weight))
            })
            .collect()
    }

    fn mark_served(&mut self, parent: StreamId, child: StreamId) {
        if let Some(node) = self.nodes.get_mut(&parent) {
            if let Some(pos) = node.children.iter().position(|&c| c == child) {
                node.next_child = (pos + 1) % node.children.len();
            }
        }
    }

    /// Make sure `stream_id` has a node, creating a placeholder if needed.
    fn ensure_node(&mut self, stream_id: StreamId) {
        if self.nodes.contains_key(&stream_id) {
            return;
        }
        let mut node = Node::new(ROOT, PrioritySpec::DEFAULT_WEIGHT);
        node.placeholder = true;
        self.nodes.insert(stream_id, node);
        self.placeholders.push_back(stream_id);
        if let Some(root) = self.nodes.get_mut(&ROOT) {
            root.children.push(stream_id);
        }
    }

    /// Drop placeholders beyond the limit, oldest childless first, then
    /// oldest. Ids in `keep` are never dropped.
    fn trim_placeholders(&mut self, keep: &[StreamId]) {
        while self.placeholders.len() > self.max_placeholders {
            let candidates = || self.placeholders.iter().copied().filter(|id| !keep.contains(id));
            let childless = candidates().find(|id| self.nodes.get(id).map_or(true, |n| n.children.is_empty()));
            let Some(victim) = childless.or_else(|| candidates().next()) else {
                return;
            };
            trace!(stream_id = victim, "dropping priority placeholder");
            self.remove(victim);
        }
    }

    fn is_descendant(&self, candidate: StreamId, ancestor: StreamId) -> bool {
        let mut current = candidate;
        while current != ROOT {
            current = match self.nodes.get(&current) {
                Some(node) => node.parent,
                None => return false,
            };
            if current == ancestor {
                return true;
            }
        }
        false
    }

    fn detach(&mut self, stream_id: StreamId) {
        let (parent, subtree) = match self.nodes.get(&stream_id) {
            Some(node) => (node.parent, node.subtree),
            None => return,
        };
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            if let Some(pos) = parent_node.children.iter().position(|&c| c == stream_id) {
                parent_node.children.remove(pos);
                if pos < parent_node.next_child {
                    parent_node.next_child -= 1;
                }
                if parent_node.next_child >= parent_node.children.len() {
                    parent_node.next_child = 0;
                }
            }
        }
        self.sub_subtree(parent, subtree);
    }

    fn attach(&mut self, stream_id: StreamId, parent: StreamId) {
        let subtree = match self.nodes.get_mut(&stream_id) {
            Some(node) => {
                node.parent = parent;
                node.subtree
            }
            None => return,
        };
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(stream_id);
        }
        self.add_subtree(parent, subtree);
    }

    /// Add `bytes` to the subtree totals of `from` and every ancestor.
    fn add_subtree(&mut self, from: StreamId, bytes: usize) {
        if bytes == 0 {
            return;
        }
        let mut current = from;
        loop {
            let Some(node) = self.nodes.get_mut(&current) else {
                return;
            };
            node.subtree += bytes;
            if current == ROOT {
                return;
            }
            current = node.parent;
        }
    }

    fn sub_subtree(&mut self, from: StreamId, bytes: usize) {
        if bytes == 0 {
            return;
        }
        let mut current = from;
        loop {
            let Some(node) = self.nodes.get_mut(&current) else {
                return;
            };
            node.subtree = node.subtree.saturating_sub(bytes);
            if current == ROOT {
                return;
            }
            current = node.parent;
        }
    }
}
