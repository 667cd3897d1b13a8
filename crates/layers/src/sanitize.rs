//! Ring validation and repair before solids are handed to the host.
//!
//! A ring is either accepted as a [`FlatRing`] or rejected with the
//! [`RingDefect`] that disqualified it. Nothing here panics.

use foundation::{GeoRect, Position};
use scene::FlatRing;

/// Roughly 1 cm on the ground, in degrees.
pub const DEGENERACY_TOLERANCE_DEG: f64 = 1e-7;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RingDefect {
    /// Fewer than three distinct finite vertices survived filtering.
    TooFewPoints { distinct: usize },
    /// The valid vertices span less than the tolerance on some axis.
    /// Triangulating such a ring yields non-finite normals.
    Degenerate { width: f64, height: f64 },
}

impl std::fmt::Display for RingDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RingDefect::TooFewPoints { distinct } => {
                write!(f, "ring has {distinct} distinct vertices, need 3")
            }
            RingDefect::Degenerate { width, height } => {
                write!(f, "ring extent {width:e} x {height:e} deg is degenerate")
            }
        }
    }
}

/// Validates one ring.
///
/// - drops non-finite vertices and consecutive near-duplicates
/// - drops the closing vertex if it repeats the first
/// - rejects rings with fewer than three distinct vertices
/// - rejects rings whose bounding box is thinner than the tolerance
pub fn sanitize_ring(ring: &[Position]) -> Result<FlatRing, RingDefect> {
    let mut coords: Vec<f64> = Vec::with_capacity(ring.len() * 2);
    let mut bounds = GeoRect::empty();
    let mut last: Option<(f64, f64)> = None;

    for p in ring {
        if !p.is_finite() {
            continue;
        }
        if let Some(prev) = last
            && near(prev, (p.lon, p.lat))
        {
            continue;
        }
        coords.push(p.lon);
        coords.push(p.lat);
        bounds.extend(p.lon, p.lat);
        last = Some((p.lon, p.lat));
    }

    if coords.len() >= 4 {
        let n = coords.len();
        if near((coords[0], coords[1]), (coords[n - 2], coords[n - 1])) {
            coords.truncate(n - 2);
        }
    }

    let distinct = count_distinct(&coords, 3);
    if distinct < 3 {
        return Err(RingDefect::TooFewPoints { distinct });
    }

    let (width, height) = (bounds.width(), bounds.height());
    if width < DEGENERACY_TOLERANCE_DEG || height < DEGENERACY_TOLERANCE_DEG {
        return Err(RingDefect::Degenerate { width, height });
    }

    Ok(FlatRing::from_coords(coords))
}

fn near(a: (f64, f64), b: (f64, f64)) -> bool {
    (a.0 - b.0).abs() < DEGENERACY_TOLERANCE_DEG && (a.1 - b.1).abs() < DEGENERACY_TOLERANCE_DEG
}

/// Counts mutually distinct vertices, stopping at `limit`.
fn count_distinct(coords: &[f64], limit: usize) -> usize {
    let mut seen: Vec<(f64, f64)> = Vec::with_capacity(limit);
    for v in coords.chunks_exact(2).map(|c| (c[0], c[1])) {
        if seen.iter().all(|s| !near(*s, v)) {
            seen.push(v);
            if seen.len() == limit {
                break;
            }
        }
    }
    seen.len()
}

#[cfg(test)]
mod tests {
    use super::{DEGENERACY_TOLERANCE_DEG, RingDefect, sanitize_ring};
    use foundation::Position;

    fn ring(points: &[(f64, f64)]) -> Vec<Position> {
        points.iter().map(|&(x, y)| Position::new(x, y)).collect()
    }

    #[test]
    fn accepts_closed_triangle_and_drops_closing_vertex() {
        let r = ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]);
        let flat = sanitize_ring(&r).unwrap();
        assert_eq!(flat.coords(), &[0.0, 0.0, 1.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn drops_non_finite_and_consecutive_duplicates() {
        let mut r = ring(&[
            (0.0, 0.0),
            (0.0, 0.0),
            (1.0, 0.0),
            (1.0 + 1e-9, 0.0),
            (1.0, 1.0),
            (0.0, 1.0),
        ]);
        r.insert(2, Position::new(f64::NAN, 3.0));
        r.push(Position::new(2.0, f64::INFINITY));
        let flat = sanitize_ring(&r).unwrap();
        assert_eq!(flat.vertex_count(), 4);
        assert!(flat.coords().iter().all(|c| c.is_finite()));
    }

    #[test]
    fn rejects_fewer_than_three_distinct_points() {
        assert_eq!(
            sanitize_ring(&ring(&[(0.0, 0.0), (1.0, 1.0)])),
            Err(RingDefect::TooFewPoints { distinct: 2 })
        );
        // Back-and-forth between two vertices is still two vertices.
        assert_eq!(
            sanitize_ring(&ring(&[(0.0, 0.0), (1.0, 1.0), (0.0, 0.0), (1.0, 1.0)])),
            Err(RingDefect::TooFewPoints { distinct: 2 })
        );
        assert_eq!(
            sanitize_ring(&[]),
            Err(RingDefect::TooFewPoints { distinct: 0 })
        );
        let all_nan = vec![Position::new(f64::NAN, f64::NAN); 5];
        assert_eq!(
            sanitize_ring(&all_nan),
            Err(RingDefect::TooFewPoints { distinct: 0 })
        );
    }

    #[test]
    fn rejects_points_collapsed_within_millimetres() {
        // All vertices within ~5 mm of each other.
        let d = 4e-8;
        let r = ring(&[(10.0, 50.0), (10.0 + d, 50.0), (10.0 + d, 50.0 + d), (10.0, 50.0 + d)]);
        assert!(sanitize_ring(&r).is_err());
    }

    #[test]
    fn rejects_thin_bounding_box_even_with_enough_points() {
        // Four distinct colinear vertices along a parallel: zero height.
        let r = ring(&[(0.0, 5.0), (0.001, 5.0), (0.002, 5.0), (0.003, 5.0)]);
        match sanitize_ring(&r) {
            Err(RingDefect::Degenerate { width, height }) => {
                assert!(width > DEGENERACY_TOLERANCE_DEG);
                assert_eq!(height, 0.0);
            }
            other => panic!("expected degenerate, got {other:?}"),
        }

        // Sliver narrower than the tolerance in longitude.
        let r = ring(&[(0.0, 0.0), (5e-8, 1.0), (0.0, 2.0), (0.0, 3.0)]);
        assert!(matches!(
            sanitize_ring(&r),
            Err(RingDefect::Degenerate { .. })
        ));
    }

    #[test]
    fn defect_messages_are_readable() {
        assert_eq!(
            RingDefect::TooFewPoints { distinct: 1 }.to_string(),
            "ring has 1 distinct vertices, need 3"
        );
    }
}
