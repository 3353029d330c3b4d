//! Initial marker population and the simulator's working set.

use std::collections::BTreeMap;

use geomark_types::{Coordinates, Geofence, Marker, MarkerId};
use rand::Rng;

use crate::simulation::SimulationError;

/// Non-empty list of display names markers are drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    names: Vec<String>,
}

impl Roster {
    /// Build a roster, dropping empty names.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::EmptyRoster`] if no non-empty name is
    /// left.
    pub fn new<I, N>(names: I) -> Result<Self, SimulationError>
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let names: Vec<String> = names
            .into_iter()
            .map(Into::into)
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            return Err(SimulationError::EmptyRoster);
        }
        Ok(Self { names })
    }

    /// Number of names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the roster has no names. Never true for a built roster.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Draw a name uniformly at random.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        let i = rng.random_range(0..self.names.len());
        self.names.get(i).map_or("", String::as_str)
    }
}

/// Generate `count` unassigned markers, uniform inside the fence bounds,
/// with names drawn from `roster`.
pub fn generate<R: Rng + ?Sized>(
    count: usize,
    fence: &Geofence,
    roster: &Roster,
    rng: &mut R,
) -> Vec<Marker> {
    let bounds = fence.bounds();
    (0..count)
        .map(|_| {
            let x = uniform(bounds.min_x(), bounds.max_x(), rng);
            let y = uniform(bounds.min_y(), bounds.max_y(), rng);
            Marker::unassigned(Coordinates::new(x, y), roster.pick(rng))
        })
        .collect()
}

fn uniform<R: Rng + ?Sized>(min: f64, max: f64, rng: &mut R) -> f64 {
    let u: f64 = rng.random();
    (max - min).mul_add(u, min)
}

/// The simulator's in-memory view of the population, keyed by id.
///
/// Mutated only by the sweep loop; each put result is written back to its
/// own marker's entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkingSet {
    markers: BTreeMap<MarkerId, Marker>,
}

impl WorkingSet {
    /// An empty working set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a marker, returning the previous record.
    pub fn insert(&mut self, marker: Marker) -> Option<Marker> {
        self.markers.insert(marker.id.clone(), marker)
    }

    /// Look up a marker by id.
    pub fn get(&self, id: &MarkerId) -> Option<&Marker> {
        self.markers.get(id)
    }

    /// Number of markers.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Markers in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }
}

impl FromIterator<Marker> for WorkingSet {
    fn from_iter<T: IntoIterator<Item = Marker>>(iter: T) -> Self {
        let mut set = Self::new();
        for marker in iter {
            set.insert(marker);
        }
        set
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use geomark_types::Rect;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn empty_roster_is_rejected() {
        assert!(matches!(
            Roster::new(Vec::<String>::new()),
            Err(SimulationError::EmptyRoster)
        ));
        assert!(matches!(
            Roster::new(["", ""]),
            Err(SimulationError::EmptyRoster)
        ));
    }

    #[test]
    fn generated_markers_are_inside_the_fence() {
        let fence = Geofence::default();
        let roster = Roster::new(["Ася", "Барсик"]).unwrap();
        let mut rng = StdRng::seed_from_u64(11);

        let markers = generate(1000, &fence, &roster, &mut rng);
        assert_eq!(markers.len(), 1000);
        for marker in &markers {
            assert!(marker.id.is_unassigned());
            assert!(fence.bounds().contains(&marker.coordinates));
            assert!(marker.name == "Ася" || marker.name == "Барсик");
        }
    }

    #[test]
    fn small_roster_repeats_names() {
        let fence = Geofence::new(
            Rect::new(0.0, 0.0, 1.0, 1.0).unwrap(),
            Coordinates::new(0.5, 0.5),
        )
        .unwrap();
        let roster = Roster::new(["only"]).unwrap();
        let mut rng = StdRng::seed_from_u64(5);

        let names: BTreeSet<String> = generate(20, &fence, &roster, &mut rng)
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn same_seed_same_population() {
        let fence = Geofence::default();
        let roster = Roster::new(["a", "b", "c"]).unwrap();
        let a = generate(50, &fence, &roster, &mut StdRng::seed_from_u64(99));
        let b = generate(50, &fence, &roster, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn working_set_replaces_by_id() {
        let mut set = WorkingSet::new();
        let first = Marker {
            id: MarkerId::from("m1"),
            coordinates: Coordinates::new(0.0, 0.0),
            name: String::from("a"),
        };
        assert!(set.insert(first.clone()).is_none());
        let moved = first.moved_to(Coordinates::new(1.0, 1.0));
        assert_eq!(set.insert(moved.clone()), Some(first));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(&MarkerId::from("m1")), Some(&moved));
    }
}
