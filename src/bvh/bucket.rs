use std::cell::RefCell;

use crate::aabb::Aabb;
use crate::axis::Axis;
use crate::config::BuildConfig;
use crate::shapes::BvhTriangle;
use crate::Real;

/// One uniform bin of the split search.
#[derive(Debug, Copy, Clone)]
pub struct Bin {
    /// Number of triangles whose centroid falls into the bin.
    pub count: usize,

    /// Join of the bounds of those triangles.
    pub aabb: Aabb,
}

impl Bin {
    /// A bin without triangles.
    pub fn empty() -> Bin {
        Bin {
            count: 0,
            aabb: Aabb::empty(),
        }
    }

    /// Adds one triangle's bounds to the bin.
    pub fn add(&mut self, aabb: &Aabb) {
        self.count += 1;
        self.aabb.join_mut(aabb);
    }

    /// Surface area heuristic of the bin's triangles.
    pub fn cost(&self) -> Real {
        self.aabb.surface_heuristic() * self.count as Real
    }
}

/// The plane chosen by [`best_split`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Split {
    /// Axis perpendicular to the split plane.
    pub axis: Axis,

    /// World coordinate of the plane along `axis`.
    pub position: Real,

    /// Surface area heuristic cost of the two halves.
    pub cost: Real,
}

#[derive(Default)]
struct Scratch {
    bins: Vec<Bin>,
    right_costs: Vec<Real>,
}

thread_local! {
    /// Thread local bins used while building to reduce allocations during build
    static SCRATCH: RefCell<Scratch> = RefCell::new(Scratch::default());
}

fn with_scratch<R>(closure: impl FnOnce(&mut Scratch) -> R) -> R {
    SCRATCH.with(move |scratch| {
        let mut scratch = scratch.borrow_mut();
        closure(&mut scratch)
    })
}

/// Maps a centroid coordinate to its bin.
fn bin_index(coordinate: Real, min: Real, extent: Real, bin_count: usize) -> usize {
    let relative = (coordinate - min) / extent * bin_count as Real;
    // `as` saturates, so negative rounding noise lands in bin 0.
    (relative as usize).min(bin_count - 1)
}

/// Finds the cheapest binned split of `triangles` inside `aabb`.
///
/// Every axis thicker than `config.axis_epsilon` is cut into `config.bin_count` uniform
/// bins over `aabb`. Each internal boundary between two bins is a candidate whose cost is
/// `h(left) * left_count + h(right) * right_count`. Boundaries with all triangles on one
/// side are skipped. Returns `None` when no axis yields a candidate.
pub fn best_split(triangles: &[BvhTriangle], aabb: &Aabb, config: &BuildConfig) -> Option<Split> {
    let bin_count = config.bin_count;
    with_scratch(|scratch| {
        let mut best: Option<Split> = None;

        for axis in Axis::ALL {
            let min = aabb.min[axis];
            let extent = aabb.extent(axis);
            if !(extent >= config.axis_epsilon) {
                continue;
            }

            scratch.bins.clear();
            scratch.bins.resize(bin_count, Bin::empty());
            for triangle in triangles {
                let index = bin_index(triangle.center[axis], min, extent, bin_count);
                scratch.bins[index].add(&triangle.aabb);
            }

            // right_costs[i] is the cost of everything right of boundary i.
            scratch.right_costs.clear();
            scratch.right_costs.resize(bin_count - 1, Real::INFINITY);
            let mut right = Bin::empty();
            for boundary in (0..bin_count - 1).rev() {
                let bin = &scratch.bins[boundary + 1];
                right.count += bin.count;
                right.aabb.join_mut(&bin.aabb);
                if right.count > 0 {
                    scratch.right_costs[boundary] = right.cost();
                }
            }

            let mut left = Bin::empty();
            for boundary in 0..bin_count - 1 {
                let bin = &scratch.bins[boundary];
                left.count += bin.count;
                left.aabb.join_mut(&bin.aabb);
                if left.count == 0 || left.count == triangles.len() {
                    continue;
                }

                let cost = left.cost() + scratch.right_costs[boundary];
                if best.map_or(true, |split| cost < split.cost) {
                    best = Some(Split {
                        axis,
                        position: min + extent * (boundary + 1) as Real / bin_count as Real,
                        cost,
                    });
                }
            }
        }

        best
    })
}
