use super::Simulation;
use crate::edge::VEHICLE_LENGTH;
use crate::priority::Junctions;
use crate::vehicle::{Arrival, VehicleState};
use crate::{EdgeId, VehicleId};
use log::{trace, warn};
use std::cmp::Reverse;

/// Remaining step times shorter than this are ignored, in s.
const TIME_EPSILON: f64 = 1e-9; // s

/// Safety cap on the number of edge arrivals handled in one step.
const MAX_EVENTS_PER_STEP: usize = 1 << 16;

/// How far a vehicle could move in the rest of the step.
#[derive(Clone, Copy, Debug)]
struct Candidate {
    vehicle: VehicleId,
    edge: EdgeId,
    /// The distance the vehicle can cover, in m.
    ds: f64,
    /// The time needed to cover `ds` at the speed limit, in s.
    dt: f64,
    /// Whether covering `ds` takes the vehicle to the end of its edge.
    at_end: bool,
}

impl Simulation {
    /// Moves the vehicles for `dt` seconds.
    ///
    /// The step is split at every moment a vehicle reaches the end of its edge,
    /// so vehicles can cross several edges in one step if nothing stops them.
    pub(super) fn move_vehicles(&mut self, dt: f64) {
        let mut remaining = dt;
        let mut events = 0;
        loop {
            self.admit_waiting_vehicles();
            if remaining <= TIME_EPSILON {
                self.time += remaining;
                break;
            }

            let candidates = self.candidate_moves(remaining);
            if candidates.is_empty() {
                self.time += remaining;
                break;
            }

            // Advance to the next arrival, or to the end of the step
            let t_event = candidates
                .iter()
                .filter(|c| c.at_end)
                .map(|c| c.dt)
                .fold(remaining, f64::min);
            self.time += t_event;
            remaining -= t_event;

            for c in candidates {
                let edge = self.topology.edge(c.edge);
                let ds = if c.at_end && c.dt <= t_event {
                    c.ds
                } else {
                    f64::min(c.ds, edge.speed_limit() * t_event)
                };
                if let Some(transit) = self.vehicles[c.vehicle].advance(ds, edge, self.time) {
                    self.finish_edge(c.vehicle, c.edge, transit);
                }
            }

            events += 1;
            if events >= MAX_EVENTS_PER_STEP {
                warn!(
                    "step cut short after {} events with {:.3} s left",
                    events, remaining
                );
                self.time += remaining;
                break;
            }
        }
    }

    /// Computes how far each vehicle on an edge may move in `remaining` seconds.
    fn candidate_moves(&self, remaining: f64) -> Vec<Candidate> {
        let mut candidates = vec![];
        for (edge_id, queue) in &self.queues {
            let edge = self.topology.edge(edge_id);
            let speed = edge.speed_limit();
            let mut ahead: Option<f64> = None;

            for vehicle_id in queue {
                let distance = self.vehicles[*vehicle_id]
                    .distance()
                    .unwrap_or(edge.length());
                let free = speed * remaining;
                let to_end = edge.length() - distance;
                let (mut ds, mut at_end) = if to_end <= free {
                    (to_end, true)
                } else {
                    (free, false)
                };

                // Close the gap to the vehicle ahead, never quite down to the minimum
                if let Some(ahead) = ahead {
                    let clearance = ahead - distance - VEHICLE_LENGTH;
                    let bound = if clearance <= 0.0 {
                        0.0
                    } else {
                        clearance / (1.0 + 1.0 / remaining)
                    };
                    if bound < ds {
                        ds = bound;
                        at_end = false;
                    }
                }

                candidates.push(Candidate {
                    vehicle: *vehicle_id,
                    edge: edge_id,
                    ds,
                    dt: ds / speed,
                    at_end,
                });
                ahead = Some(distance);
            }
        }
        candidates
    }

    /// Takes a vehicle that reached the end of its edge off the edge.
    fn finish_edge(&mut self, id: VehicleId, edge: EdgeId, transit: f64) {
        if let Some(queue) = self.queues.get_mut(edge) {
            queue.retain(|v| *v != id);
        }
        self.topology.edge_mut(edge).record_transit(transit);
        trace!("vehicle {:?} left edge {:?} after {:.2} s", id, edge, transit);

        let vehicle = &self.vehicles[id];
        let arrived = vehicle.waiting_node() == Some(vehicle.current_destination());
        if !arrived || self.settle(id) {
            self.waiting.push(id);
        }
    }

    /// Handles a vehicle waiting at its current destination.
    /// Returns `false` if the vehicle left the simulation.
    fn settle(&mut self, id: VehicleId) -> bool {
        match self.vehicles[id].reach_destination() {
            Arrival::TurnedBack => {
                trace!("vehicle {:?} turned back", id);
                true
            }
            Arrival::Completed => {
                let trip_time = self.time - self.vehicles[id].creation_time();
                self.vehicles.remove(id);
                self.stats.record_completed(trip_time);
                trace!("vehicle {:?} completed its trip in {:.2} s", id, trip_time);
                false
            }
        }
    }

    /// Moves waiting vehicles onto their next edge where the edge has room
    /// and no vehicle with right of way is about to cross.
    fn admit_waiting_vehicles(&mut self) {
        if self.waiting.is_empty() {
            return;
        }

        // Vehicles arriving on higher priority edges go first
        let mut order = std::mem::take(&mut self.waiting);
        {
            let junctions = Junctions::new(&self.topology, &self.queues, &self.vehicles);
            order.sort_by_key(|id| {
                Reverse(junctions.priority(arrival_edge(self.vehicles[*id].state())))
            });
        }

        let mut still_waiting = Vec::with_capacity(order.len());
        for id in order {
            let (node, arrived_from) = match *self.vehicles[id].state() {
                VehicleState::Waiting { node, arrived_from } => (node, arrived_from),
                VehicleState::Transiting { .. } => continue,
            };
            if node == self.vehicles[id].current_destination() && !self.settle(id) {
                continue;
            }

            let destination = self.vehicles[id].current_destination();
            let edge = match self.routes.next_edge(node, destination) {
                Some(edge) => edge,
                None => {
                    trace!("vehicle {:?} has no route from {:?}", id, node);
                    self.vehicles.remove(id);
                    self.stats.abandoned += 1;
                    continue;
                }
            };

            let junctions = Junctions::new(&self.topology, &self.queues, &self.vehicles);
            if junctions.has_entry_room(edge) && junctions.may_cross(node, arrived_from) {
                self.vehicles[id].enter_edge(edge, self.time);
                self.queues
                    .entry(edge)
                    .expect("Route leads to a removed edge")
                    .or_default()
                    .push_back(id);
                trace!("vehicle {:?} entered edge {:?}", id, edge);
            } else {
                still_waiting.push(id);
            }
        }
        self.waiting = still_waiting;
    }
}

fn arrival_edge(state: &VehicleState) -> Option<EdgeId> {
    match state {
        VehicleState::Waiting { arrived_from, .. } => *arrived_from,
        VehicleState::Transiting { .. } => None,
    }
}
