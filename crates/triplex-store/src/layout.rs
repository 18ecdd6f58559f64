//! Seeded Fruchterman–Reingold force layout on the unit square

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default number of simulation steps
pub const DEFAULT_ITERATIONS: usize = 200;

/// A node position in `[0, 1] x [0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

/// Layout configuration
#[derive(Debug, Clone, Copy)]
pub struct ForceLayout {
    /// Seed for the initial positions
    pub seed: u64,
    /// Simulation steps
    pub iterations: usize,
}

impl ForceLayout {
    /// Layout with the default number of iterations
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            iterations: DEFAULT_ITERATIONS,
        }
    }

    /// Compute positions for `node_count` nodes connected by `edges`
    ///
    /// Identical inputs and seed always produce identical positions.
    /// Edges referring to nodes out of range are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use triplex_store::layout::ForceLayout;
    ///
    /// let layout = ForceLayout::new(42);
    /// let a = layout.positions(3, &[(0, 1), (1, 2)]);
    /// let b = layout.positions(3, &[(0, 1), (1, 2)]);
    /// assert_eq!(a, b);
    /// ```
    pub fn positions(&self, node_count: usize, edges: &[(usize, usize)]) -> Vec<Point> {
        match node_count {
            0 => return Vec::new(),
            1 => return vec![Point { x: 0.5, y: 0.5 }],
            _ => {}
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut pos: Vec<Point> = (0..node_count)
            .map(|_| Point {
                x: rng.gen_range(0.0..1.0),
                y: rng.gen_range(0.0..1.0),
            })
            .collect();

        let k = (1.0 / node_count as f64).sqrt();
        let initial_temp = 0.1;
        let mut disp = vec![(0.0f64, 0.0f64); node_count];

        for step in 0..self.iterations {
            disp.iter_mut().for_each(|d| *d = (0.0, 0.0));

            // Repulsion between every pair
            for i in 0..node_count {
                for j in (i + 1)..node_count {
                    let (dx, dy, dist) = delta(pos[i], pos[j]);
                    let force = k * k / dist;
                    let (fx, fy) = (dx / dist * force, dy / dist * force);
                    disp[i].0 += fx;
                    disp[i].1 += fy;
                    disp[j].0 -= fx;
                    disp[j].1 -= fy;
                }
            }

            // Attraction along edges
            for &(s, t) in edges {
                if s >= node_count || t >= node_count || s == t {
                    continue;
                }
                let (dx, dy, dist) = delta(pos[s], pos[t]);
                let force = dist * dist / k;
                let (fx, fy) = (dx / dist * force, dy / dist * force);
                disp[s].0 -= fx;
                disp[s].1 -= fy;
                disp[t].0 += fx;
                disp[t].1 += fy;
            }

            let temp = initial_temp * (1.0 - step as f64 / self.iterations as f64);
            for (p, (dx, dy)) in pos.iter_mut().zip(&disp) {
                let len = (dx * dx + dy * dy).sqrt().max(f64::EPSILON);
                let step_len = len.min(temp);
                p.x = (p.x + dx / len * step_len).clamp(0.0, 1.0);
                p.y = (p.y + dy / len * step_len).clamp(0.0, 1.0);
            }
        }

        pos
    }
}

fn delta(a: Point, b: Point) -> (f64, f64, f64) {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let dist = (dx * dx + dy * dy).sqrt().max(1e-4);
    (dx, dy, dist)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distance(a: Point, b: Point) -> f64 {
        ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
    }

    #[test]
    fn test_deterministic_for_seed() {
        let edges = [(0, 1), (1, 2), (2, 3), (3, 0), (0, 4)];
        let a = ForceLayout::new(7).positions(5, &edges);
        let b = ForceLayout::new(7).positions(5, &edges);
        assert_eq!(a, b);
    }

    #[test]
    fn test_seed_changes_layout() {
        let edges = [(0, 1), (1, 2)];
        let a = ForceLayout::new(1).positions(3, &edges);
        let b = ForceLayout::new(2).positions(3, &edges);
        assert_ne!(a, b);
    }

    #[test]
    fn test_positions_stay_on_canvas() {
        let edges: Vec<_> = (0..19).map(|i| (i, i + 1)).collect();
        for p in ForceLayout::new(42).positions(20, &edges) {
            assert!((0.0..=1.0).contains(&p.x));
            assert!((0.0..=1.0).contains(&p.y));
        }
    }

    #[test]
    fn test_connected_nodes_end_closer() {
        // Two pairs; each pair is linked, the pairs are not
        let pos = ForceLayout::new(3).positions(4, &[(0, 1), (2, 3)]);
        let linked = distance(pos[0], pos[1]) + distance(pos[2], pos[3]);
        let unlinked = distance(pos[0], pos[2]) + distance(pos[1], pos[3]);
        assert!(linked < unlinked);
    }

    #[test]
    fn test_degenerate_inputs() {
        let layout = ForceLayout::new(0);
        assert!(layout.positions(0, &[]).is_empty());
        assert_eq!(layout.positions(1, &[(0, 0)]), vec![Point { x: 0.5, y: 0.5 }]);
        assert_eq!(layout.positions(2, &[(0, 9)]).len(), 2);
    }
}
