//! GN-002: Station arena and edge wiring.
//!
//! Stations live in a `Vec` owned by the [`Graph`]; `suppliers` and
//! `managers` are lists of [`StationId`] indices, so a diamond or even a
//! (rejected) cycle never turns into an ownership cycle.

use super::error::GraphError;
use super::registry::{ToolRequest, ToolSpec};
use super::types::{Artifact, RequirementMap, StationState};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::fmt;

/// Index of a station inside its [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StationId(usize);

impl StationId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Station({})", self.0)
    }
}

/// A graph node grouping the producers of one dependency tier.
#[derive(Debug)]
pub struct Station {
    name: String,
    registry: &'static [ToolSpec],
    pub(crate) suppliers: Vec<StationId>,
    pub(crate) managers: Vec<StationId>,
    pub(crate) resources: IndexMap<String, Artifact>,
    pub(crate) depth: Option<usize>,
    pub(crate) state: StationState,
    /// Root only: the declarative requirement map
    requirements: Option<RequirementMap>,
    /// Demand received from managers during resolution
    pub(crate) demand: RequirementMap,
    /// Tools selected by resolution, in build order
    pub(crate) plan: Vec<ToolRequest>,
}

impl Station {
    fn new(name: &str, registry: &'static [ToolSpec], requirements: Option<RequirementMap>) -> Self {
        Self {
            name: name.to_string(),
            registry,
            suppliers: Vec::new(),
            managers: Vec::new(),
            resources: IndexMap::new(),
            depth: None,
            state: StationState::Connected,
            requirements,
            demand: RequirementMap::new(),
            plan: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &'static [ToolSpec] {
        self.registry
    }

    pub fn suppliers(&self) -> &[StationId] {
        &self.suppliers
    }

    pub fn managers(&self) -> &[StationId] {
        &self.managers
    }

    /// Built artifacts keyed by resource key. Empty until the station builds.
    pub fn resources(&self) -> &IndexMap<String, Artifact> {
        &self.resources
    }

    /// Longest-path distance from the root, once computed.
    pub fn depth(&self) -> Option<usize> {
        self.depth
    }

    pub fn state(&self) -> StationState {
        self.state
    }

    pub fn requirements(&self) -> Option<&RequirementMap> {
        self.requirements.as_ref()
    }

    pub fn demand(&self) -> &RequirementMap {
        &self.demand
    }

    /// Tools resolution selected for this station.
    pub fn plan(&self) -> &[ToolRequest] {
        &self.plan
    }

    /// Resource keys resolution selected for this station.
    pub fn planned_keys(&self) -> Vec<String> {
        self.plan.iter().map(ToolRequest::key).collect()
    }

    /// Whether this station registers a tool called `name`.
    pub fn provides(&self, name: &str) -> bool {
        self.registry.iter().any(|spec| spec.name == name)
    }
}

/// The station arena. Edges are set by [`Graph::connect`] and frozen once
/// validation has run.
#[derive(Debug, Default)]
pub struct Graph {
    stations: Vec<Station>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the orchestration root. It owns the requirement map and no tools.
    pub fn add_root(&mut self, name: &str, requirements: RequirementMap) -> StationId {
        self.push(Station::new(name, &[], Some(requirements)))
    }

    /// Add a station that builds tools from `registry`.
    pub fn add_station(&mut self, name: &str, registry: &'static [ToolSpec]) -> StationId {
        self.push(Station::new(name, registry, None))
    }

    fn push(&mut self, station: Station) -> StationId {
        let id = StationId(self.stations.len());
        self.stations.push(station);
        id
    }

    /// Set both edge lists of `id`. No structural checks happen here; a
    /// station can be rewired until validation seals it.
    pub fn connect(
        &mut self,
        id: StationId,
        managers: &[StationId],
        suppliers: &[StationId],
    ) -> Result<(), GraphError> {
        let station = &mut self.stations[id.0];
        if station.state != StationState::Connected {
            return Err(GraphError::Sealed {
                station: station.name.clone(),
                state: station.state.to_string(),
            });
        }
        station.managers = managers.to_vec();
        station.suppliers = suppliers.to_vec();
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this graph.
    pub fn station(&self, id: StationId) -> &Station {
        &self.stations[id.0]
    }

    pub(crate) fn station_mut(&mut self, id: StationId) -> &mut Station {
        &mut self.stations[id.0]
    }

    pub fn find(&self, name: &str) -> Option<StationId> {
        self.stations
            .iter()
            .position(|s| s.name == name)
            .map(StationId)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Stations reachable from `root` over supplier edges, in discovery
    /// order (breadth-first, suppliers in declaration order). `root` first.
    pub fn reachable(&self, root: StationId) -> Vec<StationId> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([root]);
        seen.insert(root);

        while let Some(current) = queue.pop_front() {
            order.push(current);
            for &supplier in &self.stations[current.0].suppliers {
                if seen.insert(supplier) {
                    queue.push_back(supplier);
                }
            }
        }
        order
    }

    /// Move every station reachable from `root` to `state`.
    pub(crate) fn advance(&mut self, root: StationId, state: StationState) {
        for id in self.reachable(root) {
            self.stations[id.0].state = state;
        }
    }
}
