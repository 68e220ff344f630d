/// NeighborTable: the bounded live neighbor set.
///
/// Pure state machine: feed it one candidate table per discovery cycle,
/// it returns the change events. Owns the live table, the IP → ID
/// translation and the free-list of IDs. Only `reconcile` moves the
/// table from one consistent state to the next; readers get snapshots.
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::time::Duration;

use crate::config::RadarConfig;
use crate::error::RadarError;
use crate::neighbor::types::*;

/// Keep the `max_neigh` lowest-latency candidates.
///
/// Ties on RTT go to the lower IP. Returns the kept table and the IPs
/// that did not fit, best first.
pub fn truncate(candidates: CandidateTable, max_neigh: usize) -> (CandidateTable, Vec<IpAddr>) {
    let mut ranked: Vec<(IpAddr, PathRtt)> = candidates.into_iter().collect();
    ranked.sort_by(|(ip_a, a), (ip_b, b)| a.rtt.cmp(&b.rtt).then_with(|| ip_a.cmp(ip_b)));

    let dropped = ranked
        .split_off(max_neigh.min(ranked.len()))
        .into_iter()
        .map(|(ip, _)| ip)
        .collect();
    (ranked.into_iter().collect(), dropped)
}

/// Whether the move from `previous` to `current` crosses `threshold`.
///
/// A zero baseline counts as changed as soon as the new value is not zero.
fn rtt_changed(previous: Duration, current: Duration, threshold: f64) -> bool {
    if previous.is_zero() {
        return !current.is_zero();
    }
    let previous = previous.as_secs_f64();
    (current.as_secs_f64() - previous).abs() / previous > threshold
}

/// The live neighbor table with stable IDs.
#[derive(Debug, Clone)]
pub struct NeighborTable {
    max_neigh: usize,
    rtt_variation_threshold: f64,
    /// IP → latency of every live neighbor.
    live: BTreeMap<IpAddr, PathRtt>,
    /// IP → ID; same keys as `live` between reconciliations.
    translation: BTreeMap<IpAddr, NeighborId>,
    /// Unused IDs, lowest first.
    free: BTreeSet<NeighborId>,
    allocation_failures: u64,
}

impl NeighborTable {
    pub fn new(max_neigh: usize, rtt_variation_threshold: f64) -> Self {
        Self {
            max_neigh,
            rtt_variation_threshold,
            live: BTreeMap::new(),
            translation: BTreeMap::new(),
            free: (0..max_neigh).map(NeighborId::new).collect(),
            allocation_failures: 0,
        }
    }

    pub fn from_config(config: &RadarConfig) -> Self {
        Self::new(config.max_neigh, config.rtt_variation_threshold)
    }

    pub fn max_neigh(&self) -> usize {
        self.max_neigh
    }

    /// Number of live neighbors.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Number of IDs still available.
    pub fn free_ids(&self) -> usize {
        self.free.len()
    }

    /// Candidates dropped because no ID was left, since creation.
    pub fn allocation_failures(&self) -> u64 {
        self.allocation_failures
    }

    /// ID currently assigned to `ip`.
    pub fn id_of(&self, ip: &IpAddr) -> Option<NeighborId> {
        self.translation.get(ip).copied()
    }

    /// Snapshot of one live neighbor.
    pub fn get(&self, ip: &IpAddr) -> Option<NeighborRecord> {
        let path = self.live.get(ip)?;
        let id = self.id_of(ip)?;
        Some(NeighborRecord::new(*ip, id, path))
    }

    /// Snapshot of the live neighbor holding `id`.
    pub fn by_id(&self, id: NeighborId) -> Option<NeighborRecord> {
        let (ip, _) = self.translation.iter().find(|(_, assigned)| **assigned == id)?;
        self.get(ip)
    }

    /// All live neighbors, ordered by IP.
    pub fn snapshot(&self) -> Vec<NeighborRecord> {
        self.live
            .iter()
            .filter_map(|(ip, path)| Some(NeighborRecord::new(*ip, self.id_of(ip)?, path)))
            .collect()
    }

    /// ID for `ip`: its current one, or the lowest free one.
    pub fn allocate_id(&mut self, ip: IpAddr) -> Result<NeighborId, RadarError> {
        if let Some(id) = self.id_of(&ip) {
            return Ok(id);
        }
        let id = self.free.pop_first().ok_or(RadarError::TableFull { ip })?;
        self.translation.insert(ip, id);
        Ok(id)
    }

    /// Return `ip`'s ID to the free-list.
    pub fn release_id(&mut self, ip: &IpAddr) -> Option<NeighborId> {
        let id = self.translation.remove(ip)?;
        if id.index() < self.max_neigh {
            self.free.insert(id);
        }
        Some(id)
    }

    /// Change the capacity.
    ///
    /// Takes effect at the next `reconcile`: the table is truncated to the
    /// new size there, and a surviving neighbor whose ID no longer fits is
    /// reported removed and re-added under a fresh ID.
    pub fn set_max_neigh(&mut self, max_neigh: usize) {
        self.max_neigh = max_neigh;
        let assigned: BTreeSet<NeighborId> = self.translation.values().copied().collect();
        self.free = (0..max_neigh)
            .map(NeighborId::new)
            .filter(|id| !assigned.contains(id))
            .collect();
    }

    /// Replace the live table with this cycle's candidates.
    ///
    /// Events come out in a fixed order: neighbors truncated away, neighbors
    /// that went silent, new neighbors, then RTT changes; each group sorted
    /// by IP. IDs are released before new ones are handed out, so a freed
    /// slot is reused in the same cycle.
    pub fn reconcile(&mut self, candidates: CandidateTable) -> Vec<NeighborEvent> {
        // IDs handed out by a direct `allocate_id` are not backed by a
        // live neighbor; give them back before anything is admitted.
        let stray: Vec<IpAddr> = self
            .translation
            .keys()
            .filter(|ip| !self.live.contains_key(*ip))
            .copied()
            .collect();
        for ip in stray {
            self.release_id(&ip);
        }

        let (kept, dropped) = truncate(candidates, self.max_neigh);
        let previous = std::mem::take(&mut self.live);
        let mut events = Vec::new();

        let mut truncated: Vec<IpAddr> = dropped
            .into_iter()
            .filter(|ip| previous.contains_key(ip))
            .collect();
        truncated.sort();
        for ip in &truncated {
            if let Some(event) = self.remove(*ip, &previous[ip]) {
                events.push(event);
            }
        }

        for (ip, path) in &previous {
            if !kept.contains_key(ip) && truncated.binary_search(ip).is_err() {
                if let Some(event) = self.remove(*ip, path) {
                    events.push(event);
                }
            }
        }

        let mut changes = Vec::new();
        let mut next = BTreeMap::new();
        for (ip, path) in kept {
            let Some(old) = previous.get(&ip) else {
                self.admit(ip, path, &mut events, &mut next);
                continue;
            };
            match self.id_of(&ip) {
                Some(id) if id.index() < self.max_neigh => {
                    if rtt_changed(old.rtt, path.rtt, self.rtt_variation_threshold) {
                        let record = NeighborRecord::new(ip, id, &path);
                        tracing::info!(%record, previous = ?old.rtt, "radar: neighbor rtt changed");
                        changes.push(NeighborEvent::RttChanged {
                            record,
                            previous_rtt: old.rtt,
                        });
                    }
                    next.insert(ip, path);
                }
                _ => {
                    // ID outside a shrunk table: leave and rejoin.
                    if let Some(event) = self.remove(ip, old) {
                        events.push(event);
                    }
                    self.admit(ip, path, &mut events, &mut next);
                }
            }
        }
        events.extend(changes);

        self.live = next;
        debug_assert!(self.translation.keys().eq(self.live.keys()));
        debug_assert!(self.live.len() <= self.max_neigh);
        events
    }

    fn admit(
        &mut self,
        ip: IpAddr,
        path: PathRtt,
        events: &mut Vec<NeighborEvent>,
        next: &mut BTreeMap<IpAddr, PathRtt>,
    ) {
        match self.allocate_id(ip) {
            Ok(id) => {
                let record = NeighborRecord::new(ip, id, &path);
                tracing::info!(%record, "radar: new neighbor");
                events.push(NeighborEvent::New(record));
                next.insert(ip, path);
            }
            Err(e) => {
                self.allocation_failures += 1;
                tracing::error!(%ip, "radar: dropping candidate: {e}");
            }
        }
    }

    /// Drop the `n` lowest free IDs as if they had been lost.
    #[cfg(test)]
    pub(crate) fn leak_free_ids(&mut self, n: usize) {
        for _ in 0..n {
            self.free.pop_first();
        }
    }

    fn remove(&mut self, ip: IpAddr, last: &PathRtt) -> Option<NeighborEvent> {
        let Some(id) = self.release_id(&ip) else {
            tracing::error!(%ip, "radar: removing neighbor without id");
            return None;
        };
        let record = NeighborRecord::new(ip, id, last);
        tracing::info!(%record, "radar: neighbor removed");
        Some(NeighborEvent::Removed(record))
    }
}
