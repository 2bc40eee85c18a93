use super::Simulation;
use crate::vehicle::Vehicle;
use log::trace;
use rand::Rng;
use rand_distr::{Distribution, Poisson};

impl Simulation {
    /// Creates new vehicles at the sites for a step of `dt` seconds.
    ///
    /// Sites are visited in weight matrix order. Each site first draws how many
    /// vehicles it creates, then draws a destination for each of them in turn.
    pub(super) fn generate_vehicles(&mut self, rng: &mut impl Rng, dt: f64) {
        let lambda = self.attributes.frequency * dt;
        if lambda <= 0.0 {
            return;
        }
        let distr = match Poisson::new(lambda) {
            Ok(distr) => distr,
            Err(_) => return,
        };

        for idx in 0..self.weights.len() {
            let site = self.weights.sites()[idx];
            let count = distr.sample(rng) as usize;
            for _ in 0..count {
                let destination = match self.weights.sample_destination(site, rng) {
                    Some(destination) => destination,
                    None => break,
                };
                let time = self.time;
                let id = self
                    .vehicles
                    .insert_with_key(|id| Vehicle::new(id, site, destination, time));
                self.waiting.push(id);
                self.stats.generated += 1;
                trace!("vehicle {:?} created at {:?} for {:?}", id, site, destination);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::edge::EdgeAttributes;
    use crate::math::Point2d;
    use crate::node::NodeKind;
    use crate::routing::WeightMatrix;
    use crate::simulation::SimulationAttributes;
    use crate::topology::Topology;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn two_sites(frequency: f64) -> Simulation {
        let mut topo = Topology::new();
        let a = topo.add_node(Point2d::new(0.0, 0.0), NodeKind::Site);
        let b = topo.add_node(Point2d::new(200.0, 0.0), NodeKind::Site);
        topo.add_edge(a, b, &EdgeAttributes::new(10.0, 0));
        topo.add_edge(b, a, &EdgeAttributes::new(10.0, 0));
        Simulation::new(
            topo,
            SimulationAttributes {
                frequency,
                ..Default::default()
            },
        )
    }

    #[test]
    fn generation_rate_matches_frequency() {
        let mut sim = two_sites(0.5);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2000 {
            sim.generate_vehicles(&mut rng, 1.0);
        }
        // Two sites at 0.5 vehicles/s over 2000 s
        let generated = sim.stats().generated as f64;
        assert!((generated - 2000.0).abs() < 150.0, "generated {}", generated);
        assert_eq!(sim.waiting.len(), sim.stats().generated);
    }

    #[test]
    fn destinations_are_other_sites() {
        let mut sim = two_sites(2.0);
        let mut rng = StdRng::seed_from_u64(1);
        sim.generate_vehicles(&mut rng, 5.0);
        assert!(sim.vehicle_count() > 0);
        for vehicle in sim.iter_vehicles() {
            assert_ne!(vehicle.departure(), vehicle.destination());
            assert_eq!(vehicle.waiting_node(), Some(vehicle.departure()));
            assert_eq!(vehicle.creation_time(), 0.0);
        }
    }

    #[test]
    fn zero_weight_rows_generate_nothing() {
        let mut sim = two_sites(2.0);
        sim.weights = WeightMatrix::zeros(sim.weights.sites().to_vec());
        let mut rng = StdRng::seed_from_u64(1);
        sim.generate_vehicles(&mut rng, 5.0);
        assert_eq!(sim.vehicle_count(), 0);
    }

    #[test]
    fn zero_frequency_generates_nothing() {
        let mut sim = two_sites(0.0);
        let mut rng = StdRng::seed_from_u64(1);
        sim.generate_vehicles(&mut rng, 5.0);
        assert_eq!(sim.stats().generated, 0);
    }
}
