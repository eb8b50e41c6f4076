//! Contact graph over patients and carers.
//!
//! An undirected graph of social links. Each link records whether the far
//! end is a carer, when the link was created, and when it was last used
//! (carer top-ups stamp usage). Hop-count shortest paths feed the social
//! re-ranking in the choice phase.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use fallsim_types::AgentId;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Attributes of a contact link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactLink {
    /// Whether the far end of the link is a carer.
    pub carer: bool,
    /// Tick the link was created.
    pub created: u64,
    /// Tick the link was last used for support.
    pub usage: u64,
}

/// Undirected contact graph with hop-count path queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactGraph {
    links: BTreeMap<AgentId, BTreeMap<AgentId, ContactLink>>,
}

impl ContactGraph {
    /// Create an empty graph.
    pub const fn new() -> Self {
        Self {
            links: BTreeMap::new(),
        }
    }

    /// Add a member with no links. Idempotent.
    pub fn add_member(&mut self, agent: AgentId) {
        self.links.entry(agent).or_default();
    }

    /// Whether the agent is a member of the graph.
    pub fn contains(&self, agent: AgentId) -> bool {
        self.links.contains_key(&agent)
    }

    /// Number of members.
    pub fn member_count(&self) -> usize {
        self.links.len()
    }

    /// Create an undirected link between two members.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnknownAgent`] if either member is missing.
    pub fn link(
        &mut self,
        a: AgentId,
        b: AgentId,
        carer: bool,
        tick: u64,
    ) -> Result<(), AgentError> {
        if !self.links.contains_key(&a) {
            return Err(AgentError::UnknownAgent(a));
        }
        if !self.links.contains_key(&b) {
            return Err(AgentError::UnknownAgent(b));
        }
        let link = ContactLink {
            carer,
            created: tick,
            usage: tick,
        };
        self.links.entry(a).or_default().insert(b, link);
        self.links.entry(b).or_default().insert(a, link);
        Ok(())
    }

    /// Direct contacts of a member, in deterministic order.
    pub fn contacts_of(&self, agent: AgentId) -> Vec<AgentId> {
        self.links
            .get(&agent)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Carer contacts of a member.
    pub fn carers_of(&self, agent: AgentId) -> Vec<AgentId> {
        self.links
            .get(&agent)
            .map(|m| {
                m.iter()
                    .filter(|(_, link)| link.carer)
                    .map(|(id, _)| *id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Stamp a link's usage tick on both directions.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnknownAgent`] if the link does not exist.
    pub fn mark_usage(&mut self, a: AgentId, b: AgentId, tick: u64) -> Result<(), AgentError> {
        let forward = self
            .links
            .get_mut(&a)
            .and_then(|m| m.get_mut(&b))
            .ok_or(AgentError::UnknownAgent(b))?;
        forward.usage = tick;
        let backward = self
            .links
            .get_mut(&b)
            .and_then(|m| m.get_mut(&a))
            .ok_or(AgentError::UnknownAgent(a))?;
        backward.usage = tick;
        Ok(())
    }

    /// Remove a member and every link to it.
    pub fn remove_member(&mut self, agent: AgentId) {
        self.links.remove(&agent);
        for contacts in self.links.values_mut() {
            contacts.remove(&agent);
        }
    }

    /// Hop-count shortest path between two members (BFS).
    ///
    /// Returns `None` when no path exists or either member is unknown;
    /// `Some(0)` when `from == to`.
    pub fn shortest_path(&self, from: AgentId, to: AgentId) -> Option<u32> {
        if !self.links.contains_key(&from) || !self.links.contains_key(&to) {
            return None;
        }
        if from == to {
            return Some(0);
        }
        let mut visited: BTreeSet<AgentId> = BTreeSet::new();
        let mut queue: VecDeque<(AgentId, u32)> = VecDeque::new();
        visited.insert(from);
        queue.push_back((from, 0));
        while let Some((current, dist)) = queue.pop_front() {
            let next_dist = dist.saturating_add(1);
            if let Some(contacts) = self.links.get(&current) {
                for neighbor in contacts.keys() {
                    if *neighbor == to {
                        return Some(next_dist);
                    }
                    if visited.insert(*neighbor) {
                        queue.push_back((*neighbor, next_dist));
                    }
                }
            }
        }
        None
    }

    /// Minimum hop distance from `from` to any of the given members.
    ///
    /// Used to rank social destinations by how close the agent's contacts
    /// there are. Returns `None` when none are reachable.
    pub fn min_distance_to_any(&self, from: AgentId, candidates: &[AgentId]) -> Option<u32> {
        candidates
            .iter()
            .filter_map(|c| self.shortest_path(from, *c))
            .min()
    }
}
