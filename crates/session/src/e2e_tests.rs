//! Multi-peer integration tests.
//!
//! These drive several coordinators against an in-memory session: a shared
//! property store and per-peer inboxes with reliable, sender-ordered
//! delivery. Messages are pumped on each peer's "loop" until the network is
//! quiet, mirroring how the embedder drains its queue once per simulation
//! step.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use ridgeline_domain::{register_builtin_rulesets, RulesetRegistry, SimTime};
use ridgeline_shared::{keys, PeerId, SessionSelection, SyncMessage};

use crate::ports::{NextLevelResolver, SceneLoader, SessionTransport};
use crate::sync::{SyncConfig, SyncCoordinator, SyncState};

struct Network {
    properties: RefCell<HashMap<String, String>>,
    inboxes: RefCell<HashMap<u32, Vec<(PeerId, SyncMessage)>>>,
    peers: RefCell<Vec<u32>>,
    authority: Cell<u32>,
}

impl Network {
    fn new(authority: u32) -> Rc<Self> {
        Rc::new(Self {
            properties: RefCell::new(HashMap::new()),
            inboxes: RefCell::new(HashMap::new()),
            peers: RefCell::new(Vec::new()),
            authority: Cell::new(authority),
        })
    }

    fn deliver(&self, to: u32, from: u32, message: SyncMessage) {
        self.inboxes
            .borrow_mut()
            .entry(to)
            .or_default()
            .push((PeerId::new(from), message));
    }

    fn quiet(&self) -> bool {
        self.inboxes.borrow().values().all(Vec::is_empty)
    }
}

struct PeerTransport {
    network: Rc<Network>,
    id: u32,
}

impl SessionTransport for PeerTransport {
    fn in_session(&self) -> bool {
        true
    }

    fn is_authority(&self) -> bool {
        self.network.authority.get() == self.id
    }

    fn broadcast(&self, message: &SyncMessage) {
        for &peer in self.network.peers.borrow().iter() {
            self.network.deliver(peer, self.id, message.clone());
        }
    }

    fn send_to_authority(&self, message: &SyncMessage) {
        self.network
            .deliver(self.network.authority.get(), self.id, message.clone());
    }

    fn set_property(&self, key: &str, value: Option<&str>) {
        let mut properties = self.network.properties.borrow_mut();
        match value {
            Some(value) => {
                properties.insert(key.to_string(), value.to_string());
            }
            None => {
                properties.remove(key);
            }
        }
    }

    fn property(&self, key: &str) -> Option<String> {
        self.network.properties.borrow().get(key).cloned()
    }
}

#[derive(Default)]
struct RecordingLoader {
    loads: RefCell<Vec<(String, i32)>>,
}

impl SceneLoader for RecordingLoader {
    fn begin_load(&self, scene: &str, difficulty: i32) {
        self.loads.borrow_mut().push((scene.to_string(), difficulty));
    }
}

struct FixedResolver(Option<u32>);

impl NextLevelResolver for FixedResolver {
    fn precomputed_level_index(&self) -> Option<u32> {
        self.0
    }

    fn scene_for_level(&self, index: u32) -> Option<String> {
        Some(format!("level_{index}"))
    }

    fn is_offline(&self) -> bool {
        false
    }
}

struct Peer {
    id: u32,
    loader: Rc<RecordingLoader>,
    registry: RulesetRegistry,
    coordinator: SyncCoordinator,
}

impl Peer {
    fn join(network: &Rc<Network>, id: u32, level_index: Option<u32>) -> Self {
        network.peers.borrow_mut().push(id);
        let loader = Rc::new(RecordingLoader::default());
        let mut registry = RulesetRegistry::new();
        register_builtin_rulesets(&mut registry);
        let coordinator = SyncCoordinator::new(
            Rc::new(PeerTransport {
                network: Rc::clone(network),
                id,
            }),
            Rc::clone(&loader) as Rc<dyn SceneLoader>,
            Rc::new(FixedResolver(level_index)),
            SyncConfig::default(),
        );
        Self {
            id,
            loader,
            registry,
            coordinator,
        }
    }

    fn drain(&mut self, network: &Rc<Network>) {
        let pending = network
            .inboxes
            .borrow_mut()
            .get_mut(&self.id)
            .map(std::mem::take)
            .unwrap_or_default();
        for (sender, message) in pending {
            self.coordinator
                .handle_message(&mut self.registry, sender, message);
        }
    }
}

/// Drains every peer's inbox until no messages remain in flight.
fn pump(network: &Rc<Network>, peers: &mut [Peer]) {
    while !network.quiet() {
        for peer in peers.iter_mut() {
            peer.drain(network);
        }
    }
}

fn session_of_three(level_index: Option<u32>) -> (Rc<Network>, Vec<Peer>) {
    let network = Network::new(1);
    let peers = vec![
        Peer::join(&network, 1, level_index),
        Peer::join(&network, 2, level_index),
        Peer::join(&network, 3, level_index),
    ];
    (network, peers)
}

#[test]
fn test_selection_converges_across_peers() {
    let (network, mut peers) = session_of_three(None);

    let chosen = SessionSelection::from_wire(Some("frostbite"), Some(5));
    let chooser = &mut peers[1];
    chooser
        .coordinator
        .broadcast_selection(&mut chooser.registry, chosen.clone());
    pump(&network, &mut peers);

    for peer in &peers {
        assert_eq!(peer.coordinator.selection(), &chosen, "peer {}", peer.id);
        assert!(peer.registry.is_enabled("frostbite"), "peer {}", peer.id);
        assert!(!peer.registry.is_enabled("instagib"), "peer {}", peer.id);
    }
}

#[test]
fn test_full_handshake_loads_identical_scene_everywhere() {
    let (network, mut peers) = session_of_three(Some(4));

    let chosen = SessionSelection::from_wire(Some("instagib"), Some(7));
    let chooser = &mut peers[1];
    chooser
        .coordinator
        .broadcast_selection(&mut chooser.registry, chosen);
    pump(&network, &mut peers);

    peers[1].coordinator.request_start(7, SimTime::ZERO);
    pump(&network, &mut peers);

    for peer in &peers {
        assert_eq!(
            peer.loader.loads.borrow().as_slice(),
            &[("level_4".to_string(), 7)],
            "peer {}",
            peer.id
        );
        assert_eq!(peer.coordinator.state(), SyncState::StartConfirmed);
    }
}

#[test]
fn test_competing_start_requests_load_once_per_peer() {
    let (network, mut peers) = session_of_three(None);

    // Both followers mash the start button before the authority drains its
    // queue; the authority must still confirm exactly once.
    peers[1].coordinator.request_start(5, SimTime::ZERO);
    peers[2].coordinator.request_start(5, SimTime::ZERO);
    pump(&network, &mut peers);

    for peer in &peers {
        assert_eq!(
            peer.loader.loads.borrow().as_slice(),
            &[("NorthRidge".to_string(), 5)],
            "peer {}",
            peer.id
        );
    }
}

#[test]
fn test_authority_requesting_start_loads_on_every_peer() {
    let (network, mut peers) = session_of_three(None);

    peers[0].coordinator.request_start(2, SimTime::ZERO);
    pump(&network, &mut peers);

    for peer in &peers {
        assert_eq!(peer.loader.loads.borrow().len(), 1, "peer {}", peer.id);
    }
}

#[test]
fn test_late_joiner_recovers_selection_from_properties() {
    let (network, mut peers) = session_of_three(None);

    let chosen = SessionSelection::from_wire(Some("instagib"), Some(7));
    let chooser = &mut peers[1];
    chooser
        .coordinator
        .broadcast_selection(&mut chooser.registry, chosen.clone());
    pump(&network, &mut peers);

    // Joins after the live broadcast is long gone.
    let mut joiner = Peer::join(&network, 4, None);
    joiner.coordinator.on_joined_session(&mut joiner.registry);

    assert_eq!(joiner.coordinator.selection(), &chosen);
    assert!(joiner.registry.is_enabled("instagib"));
    assert_eq!(joiner.coordinator.state(), SyncState::SelectionKnown);
}

#[test]
fn test_lobby_reset_clears_selection_everywhere() {
    let (network, mut peers) = session_of_three(None);

    let chosen = SessionSelection::from_wire(Some("hunger"), Some(3));
    let chooser = &mut peers[2];
    chooser
        .coordinator
        .broadcast_selection(&mut chooser.registry, chosen);
    pump(&network, &mut peers);

    // Everyone returns to the lobby; the authority clears the persisted keys
    // and every peer observes the property change.
    for peer in peers.iter_mut() {
        peer.coordinator
            .on_scene_loaded(&mut peer.registry, "Basecamp");
    }
    for peer in peers.iter_mut() {
        peer.coordinator
            .on_selection_properties_changed(&mut peer.registry);
    }

    assert_eq!(network.properties.borrow().get(keys::SELECTED_RULESET), None);
    for peer in &peers {
        assert!(peer.coordinator.selection().is_empty(), "peer {}", peer.id);
        assert!(!peer.registry.any_active(), "peer {}", peer.id);
        assert_eq!(peer.coordinator.state(), SyncState::Idle);
    }

    // A peer joining the reset session finds nothing to recover.
    let mut joiner = Peer::join(&network, 5, None);
    assert_eq!(joiner.coordinator.on_joined_session(&mut joiner.registry), None);
    assert_eq!(joiner.coordinator.state(), SyncState::Idle);
}

#[test]
fn test_out_of_order_selection_between_peers_is_last_applied_wins() {
    let (network, mut peers) = session_of_three(None);

    // Two peers change the selection concurrently; no cross-sender ordering
    // is assumed, so whichever lands last on a given peer wins there.
    let first = &mut peers[1];
    first.coordinator.broadcast_selection(
        &mut first.registry,
        SessionSelection::from_wire(Some("frostbite"), Some(5)),
    );
    let second = &mut peers[2];
    second.coordinator.broadcast_selection(
        &mut second.registry,
        SessionSelection::from_wire(Some("instagib"), Some(7)),
    );
    pump(&network, &mut peers);

    // Delivery order here is deterministic (peer 2's broadcast queued
    // second), so every peer converges on the later selection.
    for peer in &peers {
        assert_eq!(
            peer.coordinator.selection(),
            &SessionSelection::from_wire(Some("instagib"), Some(7)),
            "peer {}",
            peer.id
        );
    }
}
