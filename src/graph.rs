//! The half-edge graph: a planar subdivision as a flat arena of directed
//! edge nodes.
//!
//! All topology pointers are u32 indices into one `Vec<Node>` arena.
//! Half-edges are allocated in pairs; `mate(e) = e ^ 1` is always the other
//! half of the pair. Each node stores its face successor (next CCW around
//! the left face) explicitly; the vertex successor is derived:
//! `vsucc(e) = fsucc(mate(e))`, which cycles CCW through the outbound edges
//! of the origin vertex.
//!
//! Nodes carry their origin coordinate (local frame plus the original world
//! coordinate), a bitmask, and one generic user-data slot. Roles are
//! encoded purely by additive mask bits on this single concrete node type;
//! topology removal (face merging) excises the pair from its cycles and
//! marks it `DELETED`, leaving the arena slot in place. The whole graph is
//! freed as one unit when the owning call drops it.

use glam::{DVec2, DVec3};

use crate::geom::{dir_in_ccw_wedge, Real};

pub type NodeId = u32;
pub const INVALID: NodeId = u32::MAX;

/// The other half of the pair.
#[inline(always)]
pub fn mate(e: NodeId) -> NodeId {
    e ^ 1
}

// ─────────────────────────────── Mask bits ────────────────────────────────

/// Edge inserted from a closed input loop; a parity boundary.
pub const BOUNDARY: u16 = 1 << 0;
/// Face lies outside the region of interest (hole or unbounded face).
pub const EXTERIOR: u16 = 1 << 1;
/// Edge inserted from an open path constraint; never flipped.
pub const RULE: u16 = 1 << 2;
/// Traversal bookkeeping; passes clear it before use.
pub const VISITED: u16 = 1 << 3;
/// Edge belongs to the artificial fringe rectangle around a point cloud.
pub const FRINGE: u16 = 1 << 4;
/// Pair excised from all cycles; slot is dead.
pub const DELETED: u16 = 1 << 5;

/// Masks that make an edge a constraint (ineligible for Delaunay flips).
pub const CONSTRAINED: u16 = BOUNDARY | RULE | FRINGE;

/// One directed half-edge. Coordinates are those of the origin vertex.
#[derive(Clone, Debug)]
pub struct Node {
    /// Next CCW around the left face.
    pub fsucc: NodeId,
    /// Origin coordinate in the local fitted frame.
    pub pos: DVec2,
    /// Origin coordinate in the caller's frame.
    pub world: DVec3,
    pub mask: u16,
    /// Generic user-data slot (site index for Voronoi; -1 = unset).
    pub user: i64,
}

/// The planar subdivision. Created empty, populated through the builder,
/// consumed by the extraction passes, dropped as a unit.
#[derive(Default)]
pub struct HalfEdgeGraph {
    nodes: Vec<Node>,
}

impl HalfEdgeGraph {
    pub fn new() -> Self {
        HalfEdgeGraph { nodes: Vec::new() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ───────────────────────── Navigation ─────────────────────────────────

    #[inline]
    pub fn node(&self, e: NodeId) -> &Node {
        &self.nodes[e as usize]
    }

    #[inline]
    pub fn node_mut(&mut self, e: NodeId) -> &mut Node {
        &mut self.nodes[e as usize]
    }

    #[inline]
    pub fn fsucc(&self, e: NodeId) -> NodeId {
        self.nodes[e as usize].fsucc
    }

    /// Next CCW outbound edge around the origin vertex.
    #[inline]
    pub fn vsucc(&self, e: NodeId) -> NodeId {
        self.nodes[mate(e) as usize].fsucc
    }

    /// Previous edge around the left face (O(face size) walk).
    pub fn fpred(&self, e: NodeId) -> NodeId {
        let mut cur = e;
        for _ in 0..self.nodes.len() {
            let next = self.fsucc(cur);
            if next == e {
                return cur;
            }
            cur = next;
        }
        debug_assert!(false, "face loop not closed at node {e}");
        e
    }

    /// Origin coordinate in the local frame.
    #[inline]
    pub fn pos(&self, e: NodeId) -> DVec2 {
        self.nodes[e as usize].pos
    }

    /// Destination coordinate (origin of the mate).
    #[inline]
    pub fn dst_pos(&self, e: NodeId) -> DVec2 {
        self.nodes[mate(e) as usize].pos
    }

    /// Outbound direction of `e` in the local frame.
    #[inline]
    pub fn dir(&self, e: NodeId) -> DVec2 {
        self.dst_pos(e) - self.pos(e)
    }

    #[inline]
    pub fn has_mask(&self, e: NodeId, bits: u16) -> bool {
        self.nodes[e as usize].mask & bits != 0
    }

    /// Masking is purely additive.
    #[inline]
    pub fn set_mask(&mut self, e: NodeId, bits: u16) {
        self.nodes[e as usize].mask |= bits;
    }

    /// Set mask bits on both halves of the pair.
    #[inline]
    pub fn set_mask_pair(&mut self, e: NodeId, bits: u16) {
        self.nodes[e as usize].mask |= bits;
        self.nodes[mate(e) as usize].mask |= bits;
    }

    /// Clear the given bits on every live node (used for VISITED).
    pub fn clear_mask_all(&mut self, bits: u16) {
        for n in &mut self.nodes {
            n.mask &= !bits;
        }
    }

    #[inline]
    pub fn user(&self, e: NodeId) -> i64 {
        self.nodes[e as usize].user
    }

    /// Tag every node in the origin vertex ring of `e` with `value`.
    pub fn set_user_around_vertex(&mut self, e: NodeId, value: i64) {
        let ring = self.vertex_loop(e);
        for n in ring {
            self.nodes[n as usize].user = value;
        }
    }

    // ───────────────────────── Iteration ──────────────────────────────────

    /// All nodes of the face cycle containing `e`, in fsucc order.
    pub fn face_loop(&self, e: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = e;
        // A closed cycle can visit at most every node once.
        for _ in 0..self.nodes.len() {
            out.push(cur);
            cur = self.fsucc(cur);
            if cur == e {
                return out;
            }
        }
        debug_assert!(false, "face loop not closed at node {e}");
        out
    }

    /// All outbound nodes of the origin vertex ring of `e`, CCW.
    pub fn vertex_loop(&self, e: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = e;
        for _ in 0..self.nodes.len() {
            out.push(cur);
            cur = self.vsucc(cur);
            if cur == e {
                return out;
            }
        }
        debug_assert!(false, "vertex ring not closed at node {e}");
        out
    }

    pub fn face_edge_count(&self, e: NodeId) -> usize {
        self.face_loop(e).len()
    }

    /// Signed area of the face cycle containing `e` (local frame).
    pub fn face_area(&self, e: NodeId) -> Real {
        let nodes = self.face_loop(e);
        let mut area = 0.0;
        for (i, &n) in nodes.iter().enumerate() {
            let a = self.pos(n);
            let b = self.pos(nodes[(i + 1) % nodes.len()]);
            area += a.x * b.y - b.x * a.y;
        }
        0.5 * area
    }

    /// One representative node per live face cycle; each cycle visited
    /// exactly once.
    pub fn face_representatives(&self) -> Vec<NodeId> {
        let mut seen = vec![false; self.nodes.len()];
        let mut reps = Vec::new();
        for e in 0..self.nodes.len() as NodeId {
            if seen[e as usize] || self.has_mask(e, DELETED) {
                continue;
            }
            reps.push(e);
            for n in self.face_loop(e) {
                seen[n as usize] = true;
            }
        }
        reps
    }

    /// One representative node per geometric vertex (vertex ring).
    pub fn vertex_representatives(&self) -> Vec<NodeId> {
        let mut seen = vec![false; self.nodes.len()];
        let mut reps = Vec::new();
        for e in 0..self.nodes.len() as NodeId {
            if seen[e as usize] || self.has_mask(e, DELETED) {
                continue;
            }
            reps.push(e);
            for n in self.vertex_loop(e) {
                seen[n as usize] = true;
            }
        }
        reps
    }

    /// All live node ids.
    pub fn live_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as NodeId).filter(|&e| !self.has_mask(e, DELETED))
    }

    // ───────────────────────── Construction ───────────────────────────────

    fn push_pair(
        &mut self,
        a_pos: DVec2,
        a_world: DVec3,
        b_pos: DVec2,
        b_world: DVec3,
        mask: u16,
    ) -> NodeId {
        let e = self.nodes.len() as NodeId;
        self.nodes.push(Node {
            fsucc: e + 1,
            pos: a_pos,
            world: a_world,
            mask,
            user: -1,
        });
        self.nodes.push(Node {
            fsucc: e,
            pos: b_pos,
            world: b_world,
            mask,
            user: -1,
        });
        e
    }

    /// Create an isolated edge chain from `a` to `b`, split into
    /// `subdivisions + 1` collinear segments. Immediately after creation the
    /// chain is its own 2-sided face cycle, connected to nothing; the merge
    /// pass welds it into existing topology.
    ///
    /// Returns the first outbound node at `a`.
    pub fn add_edge(
        &mut self,
        a: (DVec2, DVec3),
        b: (DVec2, DVec3),
        mask: u16,
        subdivisions: usize,
    ) -> NodeId {
        let segments = subdivisions + 1;
        let mut firsts = Vec::with_capacity(segments);
        for i in 0..segments {
            let t0 = i as Real / segments as Real;
            let t1 = (i + 1) as Real / segments as Real;
            let p0 = a.0.lerp(b.0, t0);
            let p1 = a.0.lerp(b.0, t1);
            let w0 = a.1.lerp(b.1, t0);
            let w1 = a.1.lerp(b.1, t1);
            // Keep exact endpoints at the chain ends.
            let (p0, w0) = if i == 0 { (a.0, a.1) } else { (p0, w0) };
            let (p1, w1) = if i + 1 == segments { (b.0, b.1) } else { (p1, w1) };
            firsts.push(self.push_pair(p0, w0, p1, w1, mask));
        }
        // Wire the chain: e0 e1 .. ek mk .. m1 m0 is one face cycle.
        for i in 0..segments - 1 {
            let e = firsts[i];
            let n = firsts[i + 1];
            self.nodes[e as usize].fsucc = n;
            self.nodes[mate(n) as usize].fsucc = mate(e);
        }
        firsts[0]
    }

    /// Split the edge pair of `e` at the given point. `e` keeps its origin;
    /// a new pair spans from the split point to the old destination.
    /// Returns the new node whose origin is the split point (continuing in
    /// the direction of `e`).
    pub fn split_edge(&mut self, e: NodeId, pos: DVec2, world: DVec3) -> NodeId {
        let m = mate(e);
        let en = self.fsucc(e);
        let pm = self.fpred(m);
        let old_dst = self.nodes[m as usize].clone();

        let n = self.push_pair(pos, world, old_dst.pos, old_dst.world, 0);
        let nm = mate(n);
        self.nodes[n as usize].mask = self.nodes[e as usize].mask;
        self.nodes[nm as usize].mask = self.nodes[m as usize].mask;
        self.nodes[nm as usize].user = old_dst.user;

        self.nodes[e as usize].fsucc = n;
        self.nodes[n as usize].fsucc = if en == m { nm } else { en };
        self.nodes[nm as usize].fsucc = m;
        if pm != e {
            self.nodes[pm as usize].fsucc = nm;
        }

        // The mate now originates at the split point.
        self.nodes[m as usize].pos = pos;
        self.nodes[m as usize].world = world;
        self.nodes[m as usize].user = -1;
        n
    }

    /// Ring node at the origin vertex of `at` whose face corner contains
    /// direction `dir`. The corner left of outbound node `c` spans CCW from
    /// `dir(c)` to the reversed direction of the arriving edge `fpred(c)`.
    pub fn corner_for_direction(&self, at: NodeId, dir: DVec2) -> NodeId {
        let ring = self.vertex_loop(at);
        for &c in &ring {
            let u = self.dir(c);
            let w = -self.dir(self.fpred(c));
            if dir_in_ccw_wedge(dir, u, w) {
                return c;
            }
        }
        // Numerical fallthrough on near-ties: any corner keeps topology
        // valid for the caller's bounded retry.
        ring[0]
    }

    /// Insert a new edge between the origin vertices of `a` and `b`,
    /// splicing each end into the corner wedge that geometrically contains
    /// the diagonal. Splits the face when both corners bound the same cycle,
    /// bridges two cycles otherwise. Returns the node a→b.
    pub fn insert_diagonal(&mut self, a: NodeId, b: NodeId, mask: u16) -> Option<NodeId> {
        let pa_pos = self.pos(a);
        let pb_pos = self.pos(b);
        let d = pb_pos - pa_pos;
        if d.length_squared() == 0.0 {
            return None;
        }
        let ca = self.corner_for_direction(a, d);
        let cb = self.corner_for_direction(b, -d);

        let pred_a = self.fpred(ca);
        let pred_b = self.fpred(cb);
        let a_world = self.node(ca).world;
        let b_world = self.node(cb).world;
        let a_user = self.node(ca).user;
        let b_user = self.node(cb).user;

        let n = self.push_pair(pa_pos, a_world, pb_pos, b_world, mask);
        let m = mate(n);
        self.nodes[n as usize].user = a_user;
        self.nodes[m as usize].user = b_user;

        self.nodes[pred_a as usize].fsucc = n;
        self.nodes[n as usize].fsucc = cb;
        self.nodes[pred_b as usize].fsucc = m;
        self.nodes[m as usize].fsucc = ca;
        Some(n)
    }

    /// Topological connect: new edge from the destination of `a` to the
    /// origin of `b`, where both lie on the same face cycle. The cycle is
    /// split in two; the new node (dst(a) -> org(b)) ends up on the piece
    /// containing `a`. No geometric search is involved, so this is the
    /// right primitive when the caller already knows the exact corners.
    pub fn connect(&mut self, a: NodeId, b: NodeId, mask: u16) -> NodeId {
        let an = self.fsucc(a);
        let pb = self.fpred(b);
        let (n_pos, n_world, n_user) = {
            let am = self.node(mate(a));
            (am.pos, am.world, am.user)
        };
        let (b_pos, b_world, b_user) = {
            let nb = self.node(b);
            (nb.pos, nb.world, nb.user)
        };
        let n = self.push_pair(n_pos, n_world, b_pos, b_world, mask);
        let m = mate(n);
        self.nodes[n as usize].user = n_user;
        self.nodes[m as usize].user = b_user;
        self.nodes[a as usize].fsucc = n;
        self.nodes[n as usize].fsucc = b;
        self.nodes[pb as usize].fsucc = m;
        self.nodes[m as usize].fsucc = an;
        n
    }

    /// Insert a dangling edge from the origin of corner `a` to an interior
    /// point `p` of the face left of `a`. Returns the node at `p` (pointing
    /// back to the corner); used as the seed for fan insertion.
    pub fn split_face_at_point(&mut self, a: NodeId, pos: DVec2, world: DVec3) -> NodeId {
        let pred_a = self.fpred(a);
        let n = self.push_pair(self.pos(a), self.node(a).world, pos, world, 0);
        let m = mate(n);
        self.nodes[n as usize].user = self.node(a).user;
        self.nodes[pred_a as usize].fsucc = n;
        self.nodes[n as usize].fsucc = m;
        self.nodes[m as usize].fsucc = a;
        m
    }

    /// Rotate the diagonal shared by two triangles. Both sides of `e` must
    /// be triangles.
    pub fn flip_edge(&mut self, e: NodeId) {
        let a0 = e;
        let a1 = self.fsucc(a0);
        let a2 = self.fsucc(a1);
        let b0 = mate(e);
        let b1 = self.fsucc(b0);
        let b2 = self.fsucc(b1);
        debug_assert_eq!(self.fsucc(a2), a0, "left side of flip must be a triangle");
        debug_assert_eq!(self.fsucc(b2), b0, "right side of flip must be a triangle");

        // New diagonal runs opposite-to-opposite.
        let (b2_pos, b2_world, b2_user) = {
            let n = self.node(b2);
            (n.pos, n.world, n.user)
        };
        let (a2_pos, a2_world, a2_user) = {
            let n = self.node(a2);
            (n.pos, n.world, n.user)
        };
        {
            let n = &mut self.nodes[a0 as usize];
            n.pos = b2_pos;
            n.world = b2_world;
            n.user = b2_user;
        }
        {
            let n = &mut self.nodes[b0 as usize];
            n.pos = a2_pos;
            n.world = a2_world;
            n.user = a2_user;
        }

        self.nodes[a0 as usize].fsucc = a2;
        self.nodes[a2 as usize].fsucc = b1;
        self.nodes[b1 as usize].fsucc = a0;
        self.nodes[b0 as usize].fsucc = b2;
        self.nodes[b2 as usize].fsucc = a1;
        self.nodes[a1 as usize].fsucc = b0;
    }

    /// Remove the pair of `e` from its face cycles, merging the two faces.
    /// The slot is masked `DELETED`, never reused.
    pub fn excise_pair(&mut self, e: NodeId) {
        let m = mate(e);
        let p = self.fpred(e);
        let q = self.fpred(m);
        let n = self.fsucc(e);
        let nm = self.fsucc(m);
        self.nodes[p as usize].fsucc = nm;
        self.nodes[q as usize].fsucc = n;
        self.nodes[e as usize].mask |= DELETED;
        self.nodes[m as usize].mask |= DELETED;
    }

    /// Re-link every outbound node of one geometric vertex into a single
    /// ring in CCW angular order. `nodes` must contain each outbound node of
    /// the vertex exactly once; rings from separately inserted loops are
    /// welded together by this call.
    pub fn rebuild_vertex_ring(&mut self, nodes: &mut Vec<NodeId>) {
        if nodes.len() < 2 {
            return;
        }
        let mut keyed: Vec<(Real, NodeId)> = nodes
            .iter()
            .map(|&n| {
                let d = self.dir(n);
                (d.y.atan2(d.x), n)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        let k = keyed.len();
        for i in 0..k {
            let cur = keyed[i].1;
            let next = keyed[(i + 1) % k].1;
            self.nodes[mate(cur) as usize].fsucc = next;
        }
        nodes.clear();
        nodes.extend(keyed.into_iter().map(|(_, n)| n));
    }
}
