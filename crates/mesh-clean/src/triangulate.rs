//! Polygon triangulation shared by the slicer cap and the hole filler.
//!
//! Polygons are given as rings of mesh vertex indices. Output triangles keep
//! the ring's orientation: a ring `a -> b -> c -> ...` yields triangles whose
//! edges run in the same direction, so a ring traced opposite to the open
//! boundary it closes produces faces that are consistently wound with their
//! neighbours.

use nalgebra::{Point2, Point3, Vector3};
use tracing::{debug, warn};

use crate::plane::orthonormal_basis;

/// Triangles produced for one or more rings.
#[derive(Debug, Clone, Default)]
pub(crate) struct Triangulation {
    pub triangles: Vec<[u32; 3]>,
    /// Rings where ear clipping stalled and a fan was used instead.
    pub fallback_rings: Vec<usize>,
}

impl Triangulation {
    fn extend(&mut self, other: Triangulation) {
        self.triangles.extend(other.triangles);
        self.fallback_rings.extend(other.fallback_rings);
    }
}

/// Area-weighted normal of a ring (Newell's method about the centroid).
pub(crate) fn ring_normal(positions: &[Point3<f64>], ring: &[u32]) -> Vector3<f64> {
    if ring.is_empty() {
        return Vector3::zeros();
    }
    let centroid = ring
        .iter()
        .fold(Vector3::zeros(), |acc, &i| acc + positions[i as usize].coords)
        / ring.len() as f64;

    let mut normal = Vector3::zeros();
    for k in 0..ring.len() {
        let a = positions[ring[k] as usize].coords - centroid;
        let b = positions[ring[(k + 1) % ring.len()] as usize].coords - centroid;
        normal += a.cross(&b);
    }
    normal
}

/// Triangulate a single, possibly non-planar ring in its best-fit plane.
pub(crate) fn triangulate_ring(positions: &[Point3<f64>], ring: &[u32]) -> Triangulation {
    match ring.len() {
        0..=2 => return Triangulation::default(),
        3 => {
            return Triangulation {
                triangles: vec![[ring[0], ring[1], ring[2]]],
                fallback_rings: Vec::new(),
            };
        }
        _ => {}
    }

    let Some(normal) = ring_normal(positions, ring).try_normalize(f64::EPSILON) else {
        debug!(ring_len = ring.len(), "Ring has no area, fan-filling");
        return Triangulation {
            triangles: fan(ring),
            fallback_rings: vec![ring.len()],
        };
    };

    let projector = Projector::new(positions, &normal);
    ear_clip(ring.to_vec(), &projector)
}

/// Triangulate planar rings lying in the plane with the given normal.
///
/// Rings winding counter-clockwise around `normal` are outer boundaries,
/// clockwise ones are holes. If the largest ring winds clockwise the roles are
/// swapped, so the caller does not need to know the mesh's orientation. Each
/// hole is bridged into the smallest outer ring containing it.
pub(crate) fn triangulate_planar_rings(
    positions: &[Point3<f64>],
    rings: &[Vec<u32>],
    normal: &Vector3<f64>,
) -> Triangulation {
    let Some(normal) = normal.try_normalize(f64::EPSILON) else {
        return Triangulation::default();
    };
    let projector = Projector::new(positions, &normal);

    let areas: Vec<f64> = rings
        .iter()
        .map(|r| signed_area(&projector.ring(r)))
        .collect();
    let Some(largest) = areas.iter().copied().max_by(|a, b| a.abs().total_cmp(&b.abs())) else {
        return Triangulation::default();
    };
    if largest == 0.0 {
        return Triangulation::default();
    }

    let projector = if largest < 0.0 {
        Projector::new(positions, &-normal)
    } else {
        projector
    };
    let sign = largest.signum();

    let outers: Vec<usize> = (0..rings.len())
        .filter(|&i| areas[i] * sign > 0.0 && rings[i].len() >= 3)
        .collect();
    let mut holes_of: Vec<Vec<usize>> = vec![Vec::new(); rings.len()];

    for hole in (0..rings.len()).filter(|&i| areas[i] * sign < 0.0 && rings[i].len() >= 3) {
        let anchor = projector.point(rings[hole][0]);
        let container = outers
            .iter()
            .copied()
            .filter(|&o| point_in_ring(&anchor, &projector.ring(&rings[o])))
            .min_by(|&a, &b| areas[a].abs().total_cmp(&areas[b].abs()));
        match container {
            Some(o) => holes_of[o].push(hole),
            None => warn!(
                ring_len = rings[hole].len(),
                "Hole ring outside every outer ring, skipped"
            ),
        }
    }

    let mut out = Triangulation::default();
    for &o in &outers {
        let holes: Vec<&[u32]> = holes_of[o].iter().map(|&h| rings[h].as_slice()).collect();
        let merged = bridge_holes(&rings[o], &holes, &projector);
        out.extend(ear_clip(merged, &projector));
    }
    out
}

/// Projects mesh vertices onto a plane basis so that rings winding
/// counter-clockwise around the normal have positive area.
struct Projector<'a> {
    positions: &'a [Point3<f64>],
    u: Vector3<f64>,
    v: Vector3<f64>,
}

impl<'a> Projector<'a> {
    fn new(positions: &'a [Point3<f64>], normal: &Vector3<f64>) -> Self {
        let (u, v) = orthonormal_basis(normal);
        Self { positions, u, v }
    }

    fn point(&self, idx: u32) -> Point2<f64> {
        let p = self.positions[idx as usize].coords;
        Point2::new(p.dot(&self.u), p.dot(&self.v))
    }

    fn ring(&self, ring: &[u32]) -> Vec<Point2<f64>> {
        ring.iter().map(|&i| self.point(i)).collect()
    }
}

#[inline]
fn orient(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn signed_area(pts: &[Point2<f64>]) -> f64 {
    let n = pts.len();
    (0..n)
        .map(|i| {
            let a = pts[i];
            let b = pts[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        * 0.5
}

/// Even-odd crossing test.
fn point_in_ring(p: &Point2<f64>, ring: &[Point2<f64>]) -> bool {
    let n = ring.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Segments `p1-p2` and `q1-q2` cross at a single interior point.
fn segments_cross(p1: &Point2<f64>, p2: &Point2<f64>, q1: &Point2<f64>, q2: &Point2<f64>) -> bool {
    let d1 = orient(q1, q2, p1);
    let d2 = orient(q1, q2, p2);
    let d3 = orient(p1, p2, q1);
    let d4 = orient(p1, p2, q2);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

/// Splice holes into the outer ring with zero-width bridges, producing a
/// single weakly simple ring.
fn bridge_holes(outer: &[u32], holes: &[&[u32]], projector: &Projector<'_>) -> Vec<u32> {
    let mut merged = outer.to_vec();
    if holes.is_empty() {
        return merged;
    }

    // Rightmost holes first, so later bridges never cross earlier ones.
    let mut order: Vec<(usize, usize, f64)> = holes
        .iter()
        .enumerate()
        .filter_map(|(h, ring)| {
            ring.iter()
                .enumerate()
                .map(|(k, &id)| (k, projector.point(id).x))
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(k, x)| (h, k, x))
        })
        .collect();
    order.sort_by(|a, b| b.2.total_cmp(&a.2));

    let mut pending: Vec<bool> = vec![true; holes.len()];
    for (h, k, _) in order {
        pending[h] = false;
        let hole = holes[h];
        let anchor_id = hole[k];
        let anchor = projector.point(anchor_id);

        let mut candidates: Vec<(usize, f64)> = merged
            .iter()
            .enumerate()
            .map(|(j, &id)| (j, (projector.point(id) - anchor).norm_squared()))
            .collect();
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));

        let visible = candidates.iter().map(|&(j, _)| j).find(|&j| {
            let target_id = merged[j];
            let target = projector.point(target_id);
            let blocked_by = |ring: &[u32]| {
                (0..ring.len()).any(|e| {
                    let (a, b) = (ring[e], ring[(e + 1) % ring.len()]);
                    if a == target_id || b == target_id || a == anchor_id || b == anchor_id {
                        return false;
                    }
                    segments_cross(&anchor, &target, &projector.point(a), &projector.point(b))
                })
            };
            !blocked_by(&merged)
                && !blocked_by(hole)
                && !holes
                    .iter()
                    .enumerate()
                    .any(|(other, ring)| pending[other] && blocked_by(ring))
        });
        let Some(j) = visible.or_else(|| candidates.first().map(|&(j, _)| j)) else {
            continue;
        };

        let mut spliced = Vec::with_capacity(merged.len() + hole.len() + 2);
        spliced.extend_from_slice(&merged[..=j]);
        spliced.extend_from_slice(&hole[k..]);
        spliced.extend_from_slice(&hole[..=k]);
        spliced.extend_from_slice(&merged[j..]);
        merged = spliced;
    }
    merged
}

fn fan(ring: &[u32]) -> Vec<[u32; 3]> {
    (1..ring.len().saturating_sub(1))
        .map(|k| [ring[0], ring[k], ring[k + 1]])
        .collect()
}

/// Ear clipping of a counter-clockwise ring (as seen through `projector`).
///
/// Vertices sharing an index with the candidate ear's corners are ignored in
/// the containment test, which lets bridged rings with repeated indices clip
/// cleanly. When no proper ear exists, a zero-area corner is clipped instead;
/// if there is none of those either, the rest is fan-filled.
fn ear_clip(ring: Vec<u32>, projector: &Projector<'_>) -> Triangulation {
    let pts: Vec<Point2<f64>> = projector.ring(&ring);
    let n = ring.len();
    if n < 3 {
        return Triangulation::default();
    }

    let (min, max) = pts.iter().fold((pts[0], pts[0]), |(lo, hi), p| {
        (lo.inf(p), hi.sup(p))
    });
    let eps = (max - min).norm_squared() * 1e-14;

    let mut remaining: Vec<usize> = (0..n).collect();
    let mut triangles = Vec::with_capacity(n - 2);
    let mut fallback = false;
    let mut i = 0usize;
    let mut misses = 0usize;

    while remaining.len() > 3 {
        let m = remaining.len();
        let at = |k: usize| remaining[(k + m) % m];

        if misses >= m {
            let flat = (0..m).find(|&k| {
                orient(&pts[at(k + m - 1)], &pts[at(k)], &pts[at(k + 1)]).abs() <= eps
            });
            match flat {
                Some(k) => {
                    triangles.push([ring[at(k + m - 1)], ring[at(k)], ring[at(k + 1)]]);
                    remaining.remove(k);
                    i = k % (m - 1);
                    misses = 0;
                    continue;
                }
                None => {
                    fallback = true;
                    break;
                }
            }
        }

        let (prev, curr, next) = (at(i + m - 1), at(i), at(i + 1));
        if is_ear(&ring, &pts, &remaining, prev, curr, next, eps) {
            triangles.push([ring[prev], ring[curr], ring[next]]);
            remaining.remove(i % m);
            i %= m - 1;
            misses = 0;
        } else {
            i = (i + 1) % m;
            misses += 1;
        }
    }

    if fallback {
        debug!(
            ring_len = n,
            remaining = remaining.len(),
            "Ear clipping stalled, fan-filling the remainder"
        );
        let rest: Vec<u32> = remaining.iter().map(|&k| ring[k]).collect();
        triangles.extend(fan(&rest));
    } else if let [a, b, c] = remaining[..] {
        triangles.push([ring[a], ring[b], ring[c]]);
    }

    Triangulation {
        triangles,
        fallback_rings: if fallback { vec![n] } else { Vec::new() },
    }
}

fn is_ear(
    ring: &[u32],
    pts: &[Point2<f64>],
    remaining: &[usize],
    prev: usize,
    curr: usize,
    next: usize,
    eps: f64,
) -> bool {
    let (a, b, c) = (&pts[prev], &pts[curr], &pts[next]);
    if orient(a, b, c) <= eps {
        return false;
    }

    let corners = [ring[prev], ring[curr], ring[next]];
    let m = remaining.len();
    (0..m).all(|j| {
        let k = remaining[j];
        if corners.contains(&ring[k]) {
            return true;
        }
        // Only reflex (or flat) vertices can lie inside a convex ear.
        let before = &pts[remaining[(j + m - 1) % m]];
        let after = &pts[remaining[(j + 1) % m]];
        if orient(before, &pts[k], after) > eps {
            return true;
        }
        let p = &pts[k];
        !(orient(a, b, p) >= -eps && orient(b, c, p) >= -eps && orient(c, a, p) >= -eps)
    })
}
