//! Standard care-network topology.
//!
//! Builds the reference network used by the mobility model: Home, Hospital,
//! GP, Social, Intervention, optional open-access Intervention, and the
//! terminal Care sink, with the full directed connection set and its
//! attribute constants.

use fallsim_types::{
    Connection, ConnectionId, DwellRates, EdgeKind, Location, LocationId, LocationKind, Wellbeing,
};
use tracing::info;

use crate::error::WorldError;
use crate::network::CareNetwork;

/// Parameters the topology takes from configuration.
#[derive(Debug, Clone)]
pub struct NetworkOptions {
    /// Capacity of the referral-gated intervention programme.
    pub intervention_capacity: u32,
    /// Whether the open-access intervention node exists.
    pub open_intervention: bool,
    /// Capacity of the open-access intervention node.
    pub open_intervention_capacity: u32,
    /// Wellbeing states admitted to the open-access intervention node.
    pub open_intervention_allowed: Vec<Wellbeing>,
}

/// Location IDs of the standard topology, for direct lookups.
#[derive(Debug, Clone, Copy)]
pub struct NetworkHandles {
    /// The Home node.
    pub home: LocationId,
    /// The Hospital node.
    pub hospital: LocationId,
    /// The GP node.
    pub gp: LocationId,
    /// The Social node.
    pub social: LocationId,
    /// The referral-gated Intervention node.
    pub intervention: LocationId,
    /// The open-access intervention node, when configured.
    pub intervention_open: Option<LocationId>,
    /// The terminal Care node.
    pub care: LocationId,
}

fn location(name: &str, kind: LocationKind, deltas: (f64, f64, f64)) -> Location {
    let (resource_delta, mobility_delta, confidence_delta) = deltas;
    Location {
        id: LocationId::new(),
        name: name.to_string(),
        kind,
        resource_delta,
        mobility_delta,
        confidence_delta,
        capacity: None,
        load: 0,
        dwell: None,
    }
}

struct EdgeSpec {
    from: LocationId,
    to: LocationId,
    kind: EdgeKind,
    mood_barrier: f64,
    deltas: (f64, f64, f64),
    allowed: Option<Vec<Wellbeing>>,
    requires_referral: bool,
}

fn edge(from: LocationId, to: LocationId, kind: EdgeKind) -> EdgeSpec {
    EdgeSpec {
        from,
        to,
        kind,
        mood_barrier: 0.0,
        deltas: (0.0, 0.0, 0.0),
        allowed: None,
        requires_referral: false,
    }
}

impl EdgeSpec {
    const fn mood(mut self, barrier: f64) -> Self {
        self.mood_barrier = barrier;
        self
    }

    const fn deltas(mut self, resource: f64, mobility: f64, confidence: f64) -> Self {
        self.deltas = (resource, mobility, confidence);
        self
    }

    fn allowed(mut self, states: Vec<Wellbeing>) -> Self {
        self.allowed = Some(states);
        self
    }

    const fn referral(mut self) -> Self {
        self.requires_referral = true;
        self
    }

    fn build(self) -> Connection {
        let (resource_delta, mobility_delta, confidence_delta) = self.deltas;
        Connection {
            id: ConnectionId::new(),
            from: self.from,
            to: self.to,
            kind: self.kind,
            mood_barrier: self.mood_barrier,
            resource_delta,
            mobility_delta,
            confidence_delta,
            allowed: self.allowed,
            requires_referral: self.requires_referral,
        }
    }
}

/// Build the standard care network.
///
/// # Errors
///
/// Returns [`WorldError`] if the construction produces an inconsistent
/// graph, which indicates a bug in the constants below.
pub fn standard_network(
    options: &NetworkOptions,
) -> Result<(CareNetwork, NetworkHandles), WorldError> {
    let mut network = CareNetwork::new();

    let mut hospital = location("Hospital", LocationKind::Hospital, (0.2, -0.1, -0.05));
    hospital.dwell = Some(DwellRates {
        mobility_change: -0.1,
        recovery_rate: 0.2,
        confidence_change: -0.05,
    });
    let mut home = location("Home", LocationKind::Home, (0.3, 0.0, 0.0));
    home.dwell = Some(DwellRates {
        mobility_change: -0.015,
        recovery_rate: 0.3,
        confidence_change: -0.02,
    });
    let social = location("Social", LocationKind::Social, (-0.4, 0.05, 0.2));
    let mut intervention = location("Intervention", LocationKind::Intervention, (-0.8, 0.3, 0.3));
    intervention.capacity = Some(options.intervention_capacity);
    let care = location("Care", LocationKind::Care, (0.0, 0.0, 0.0));
    let gp = location("GP", LocationKind::Gp, (0.0, 0.0, 0.0));

    let handles = NetworkHandles {
        home: home.id,
        hospital: hospital.id,
        gp: gp.id,
        social: social.id,
        intervention: intervention.id,
        intervention_open: None,
        care: care.id,
    };

    network.add_location(hospital)?;
    network.add_location(home)?;
    network.add_location(social)?;
    network.add_location(intervention)?;
    network.add_location(care)?;
    network.add_location(gp)?;

    let (home, hospital, gp, social, intervention, care) = (
        handles.home,
        handles.hospital,
        handles.gp,
        handles.social,
        handles.intervention,
        handles.care,
    );

    let edges = vec![
        edge(hospital, home, EdgeKind::Inactive).deltas(-0.1, 0.0, 0.0),
        edge(home, gp, EdgeKind::Fall).deltas(-0.3, -0.1, -0.025),
        edge(intervention, gp, EdgeKind::Fall).deltas(-0.3, -0.1, -0.025),
        edge(social, gp, EdgeKind::Fall).deltas(-0.3, -0.1, -0.025),
        edge(gp, hospital, EdgeKind::Fall),
        edge(gp, home, EdgeKind::Inactive),
        edge(home, social, EdgeKind::Social).mood(0.2),
        edge(social, home, EdgeKind::Inactive),
        edge(home, intervention, EdgeKind::Medical)
            .mood(0.1)
            .allowed(vec![Wellbeing::Fallen])
            .referral(),
        edge(intervention, home, EdgeKind::Inactive),
        edge(intervention, hospital, EdgeKind::Fall).deltas(-0.8, -0.25, -0.35),
        edge(social, hospital, EdgeKind::Fall).deltas(-0.8, -0.25, -0.35),
        edge(home, hospital, EdgeKind::Fall).deltas(-0.8, -0.25, -0.5),
        edge(home, care, EdgeKind::Inactive),
        edge(home, home, EdgeKind::Inactive),
        edge(hospital, care, EdgeKind::Inactive),
    ];
    for spec in edges {
        network.add_connection(spec.build())?;
    }

    let mut handles = handles;
    if options.open_intervention {
        let mut open = location(
            "InterventionOpen",
            LocationKind::InterventionOpen,
            (-0.8, 0.3, 0.3),
        );
        open.capacity = Some(options.open_intervention_capacity);
        let open_id = open.id;
        network.add_location(open)?;

        let open_edges = vec![
            edge(open_id, gp, EdgeKind::Fall).deltas(-0.3, -0.1, -0.025),
            edge(open_id, hospital, EdgeKind::Fall).deltas(-0.8, -0.25, -0.35),
            edge(open_id, home, EdgeKind::Inactive),
            edge(home, open_id, EdgeKind::Medical)
                .mood(0.2)
                .allowed(options.open_intervention_allowed.clone()),
        ];
        for spec in open_edges {
            network.add_connection(spec.build())?;
        }
        handles.intervention_open = Some(open_id);
    }

    info!(
        locations = network.location_count(),
        connections = network.connection_count(),
        open_intervention = options.open_intervention,
        "standard care network built"
    );

    Ok((network, handles))
}
