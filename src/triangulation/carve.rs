// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)

use log::warn;

use super::{CarveRule, Location, Triangulation};
use crate::error::TriangulationError;
use crate::mesh::INVALID;
use crate::predicates::Point;

impl Triangulation {
    /// Remove the triangles `rule` says lie outside the domain. Returns the
    /// number of triangles removed.
    pub(crate) fn carve(&mut self, holes: &[Point], rule: CarveRule) -> Result<usize, TriangulationError> {
        let doomed = match rule {
            CarveRule::HoleSeeds => self.infect(holes),
            CarveRule::EvenOdd => self.outside_by_parity(),
        };
        let removed = self.remove_triangles(&doomed)?;
        self.refresh_vertex_hints();
        Ok(removed)
    }

    /// The infection spreads across any edge that is not a subsegment,
    /// seeded from unprotected hull edges and from each hole locator.
    fn infect(&self, holes: &[Point]) -> Vec<bool> {
        let mut infected = vec![false; self.tris.capacity_index() as usize];
        let mut stack: Vec<u32> = Vec::new();

        // Without any segment there is no boundary to stop at; keep the hull.
        if !self.subsegs.is_empty() {
            for (t, tri) in self.tris.iter() {
                if (0..3).any(|i| tri.n[i] == INVALID && tri.s[i] == INVALID) {
                    stack.push(t);
                }
            }
        }
        for &h in holes {
            match self.locate(h, self.recent) {
                Location::Inside(t) | Location::OnEdge(t, _) => stack.push(t),
                Location::OnVertex(_, v) => warn!("hole locator ({}, {}) sits on vertex {}", h.x, h.y, v),
                Location::Outside => warn!("hole locator ({}, {}) is outside the mesh", h.x, h.y),
            }
        }

        while let Some(t) = stack.pop() {
            if infected[t as usize] {
                continue;
            }
            infected[t as usize] = true;
            let tri = self.tris[t];
            for i in 0..3 {
                let u = tri.n[i];
                if u != INVALID && tri.s[i] == INVALID && !infected[u as usize] {
                    stack.push(u);
                }
            }
        }
        infected
    }

    /// Label every triangle with the parity of the segments between it and
    /// the exterior. Even means outside.
    fn outside_by_parity(&self) -> Vec<bool> {
        let odd = |s: u32| s != INVALID && self.subsegs[s as usize].count % 2 == 1;
        let mut label: Vec<Option<bool>> = vec![None; self.tris.capacity_index() as usize];
        let mut stack: Vec<(u32, bool)> = Vec::new();
        for (t, tri) in self.tris.iter() {
            for i in 0..3 {
                if tri.n[i] == INVALID {
                    stack.push((t, odd(tri.s[i])));
                }
            }
        }
        while let Some((t, inside)) = stack.pop() {
            if label[t as usize].is_some() {
                continue;
            }
            label[t as usize] = Some(inside);
            let tri = self.tris[t];
            for i in 0..3 {
                let u = tri.n[i];
                if u != INVALID && label[u as usize].is_none() {
                    stack.push((u, inside != odd(tri.s[i])));
                }
            }
        }
        label.iter().map(|l| *l == Some(false)).collect()
    }

    fn remove_triangles(&mut self, doomed: &[bool]) -> Result<usize, TriangulationError> {
        let mut removed = 0;
        for t in 0..doomed.len() as u32 {
            if !doomed[t as usize] || !self.tris.contains(t) {
                continue;
            }
            let tri = self.tris[t];
            for i in 0..3 {
                let u = tri.n[i];
                if u != INVALID && !doomed[u as usize] {
                    let j = self.slot_of(u, t)?;
                    self.tris[u].n[j] = INVALID;
                }
            }
            self.tris.free(t);
            removed += 1;
        }
        Ok(removed)
    }

    /// Point each vertex at a live triangle using it, after triangles were
    /// freed underneath the hints.
    fn refresh_vertex_hints(&mut self) {
        for v in self.verts.iter_mut() {
            v.tri = INVALID;
        }
        for (t, tri) in self.tris.iter() {
            for w in tri.v {
                self.verts[w as usize].tri = t;
            }
        }
        if !self.tris.contains(self.recent) {
            self.recent = self.tris.iter().next().map_or(INVALID, |(t, _)| t);
        }
    }
}
