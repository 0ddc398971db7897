//! Challenge selection sync and start handshake
//!
//! One [`SyncCoordinator`] runs on every peer. It keeps the replicated
//! selection consistent (live broadcasts for already-joined peers, the
//! session property store for late joiners) and drives the start handshake:
//! followers ask the authority, the authority decides the scene once and
//! broadcasts the confirmation, and every peer - authority included - starts
//! the identical scene load when that confirmation arrives.
//!
//! All methods are non-blocking and expected to run on the peer's single
//! simulation loop; the embedder queues inbound messages and property-change
//! notifications and drains them there.

use std::rc::Rc;

use ridgeline_domain::{RulesetRegistry, SimTime};
use ridgeline_shared::{keys, PeerId, SessionSelection, SyncMessage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ports::{NextLevelResolver, SceneLoader, SessionTransport};

/// Tunables for the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Scene loaded when the authority cannot resolve anything better.
    pub default_scene: String,
    /// The lobby scene; returning to it resets the handshake and clears the
    /// persisted selection.
    pub staging_scene: String,
    /// How long a follower waits for the authority's confirmation before
    /// surfacing a failed start.
    pub start_timeout_secs: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_scene: "NorthRidge".to_string(),
            staging_scene: "Basecamp".to_string(),
            start_timeout_secs: 10.0,
        }
    }
}

/// Protocol position of the local peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    SelectionKnown,
    /// Follower only: waiting for the authority's confirmation.
    StartRequested,
    StartConfirmed,
}

/// Why a requested start did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StartFailure {
    #[error("authority unreachable")]
    AuthorityUnreachable,
}

/// Observable protocol outcome, returned to the embedder so presentation can
/// react without the core knowing about UI.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    SelectionApplied { selection: SessionSelection },
    StartConfirmed { scene: String, difficulty: i32 },
    StartFailed { reason: StartFailure },
}

/// Per-peer protocol state machine.
pub struct SyncCoordinator {
    transport: Rc<dyn SessionTransport>,
    scene_loader: Rc<dyn SceneLoader>,
    next_level: Rc<dyn NextLevelResolver>,
    config: SyncConfig,
    state: SyncState,
    selection: SessionSelection,
    start_deadline: Option<SimTime>,
    /// Authority-side guard: at most one confirmation per session transition,
    /// no matter how many start requests arrive.
    confirmation_sent: bool,
}

impl SyncCoordinator {
    pub fn new(
        transport: Rc<dyn SessionTransport>,
        scene_loader: Rc<dyn SceneLoader>,
        next_level: Rc<dyn NextLevelResolver>,
        config: SyncConfig,
    ) -> Self {
        Self {
            transport,
            scene_loader,
            next_level,
            config,
            state: SyncState::Idle,
            selection: SessionSelection::default(),
            start_deadline: None,
            confirmation_sent: false,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn selection(&self) -> &SessionSelection {
        &self.selection
    }

    /// Applies a locally chosen selection, broadcasts it, and mirrors it
    /// into the session property store for late joiners. In solo mode the
    /// selection is applied locally only.
    pub fn broadcast_selection(
        &mut self,
        registry: &mut RulesetRegistry,
        selection: SessionSelection,
    ) -> SyncEvent {
        self.apply_selection(registry, selection.clone());

        if self.transport.in_session() {
            let ruleset = selection.ruleset.as_ref().map(|id| id.as_str().to_string());
            self.transport.broadcast(&SyncMessage::SelectionChanged {
                ruleset: ruleset.clone(),
                difficulty: selection.difficulty,
            });

            let difficulty = selection.difficulty.map(|d| d.to_string());
            self.transport
                .set_property(keys::SELECTED_RULESET, ruleset.as_deref());
            self.transport
                .set_property(keys::SELECTED_DIFFICULTY, difficulty.as_deref());
        }

        SyncEvent::SelectionApplied {
            selection: self.selection.clone(),
        }
    }

    /// Asks for the transition into gameplay.
    ///
    /// Solo mode resolves the scene locally and starts the load at once. On
    /// the authority this confirms directly; on a follower it sends the
    /// request and arms the confirmation deadline.
    pub fn request_start(&mut self, difficulty: i32, now: SimTime) -> Option<SyncEvent> {
        if !self.transport.in_session() {
            if self.state == SyncState::StartConfirmed {
                tracing::debug!("start already confirmed, ignoring repeat request");
                return None;
            }
            let scene = self.resolve_scene();
            tracing::info!(%scene, difficulty, "solo start, loading immediately");
            self.state = SyncState::StartConfirmed;
            self.scene_loader.begin_load(&scene, difficulty);
            return Some(SyncEvent::StartConfirmed { scene, difficulty });
        }

        if self.transport.is_authority() {
            self.confirm_start(difficulty);
            return None;
        }

        tracing::info!(difficulty, "requesting start from authority");
        self.transport
            .send_to_authority(&SyncMessage::StartRequested { difficulty });
        self.state = SyncState::StartRequested;
        self.start_deadline = Some(now + self.config.start_timeout_secs);
        None
    }

    /// Decodes and applies one inbound payload. Undecodable payloads are
    /// dropped with a diagnostic; they are never fatal.
    pub fn handle_payload(
        &mut self,
        registry: &mut RulesetRegistry,
        sender: PeerId,
        payload: &[u8],
    ) -> Option<SyncEvent> {
        match SyncMessage::decode(payload) {
            Ok(message) => self.handle_message(registry, sender, message),
            Err(error) => {
                tracing::warn!(%sender, %error, "dropping undecodable sync payload");
                None
            }
        }
    }

    /// Applies one inbound protocol message.
    pub fn handle_message(
        &mut self,
        registry: &mut RulesetRegistry,
        sender: PeerId,
        message: SyncMessage,
    ) -> Option<SyncEvent> {
        match message {
            SyncMessage::SelectionChanged {
                ruleset,
                difficulty,
            } => {
                let selection = SessionSelection::from_wire(ruleset.as_deref(), difficulty);
                self.apply_selection(registry, selection);
                Some(SyncEvent::SelectionApplied {
                    selection: self.selection.clone(),
                })
            }
            SyncMessage::StartRequested { difficulty } => {
                if !self.transport.is_authority() {
                    // Should never route here; must not crash or mutate.
                    tracing::warn!(%sender, "start request arrived at non-authority peer, ignoring");
                    return None;
                }
                self.confirm_start(difficulty);
                None
            }
            SyncMessage::StartConfirmed { scene, difficulty } => {
                self.begin_confirmed_load(scene, difficulty)
            }
        }
    }

    /// Late-join recovery: reads the persisted selection keys and applies
    /// them as if a live `SelectionChanged` had just arrived. With no keys
    /// present the peer stays in `Idle`.
    pub fn on_joined_session(&mut self, registry: &mut RulesetRegistry) -> Option<SyncEvent> {
        let ruleset = self.transport.property(keys::SELECTED_RULESET);
        let difficulty = self.transport.property(keys::SELECTED_DIFFICULTY);
        if ruleset.is_none() && difficulty.is_none() {
            return None;
        }
        self.apply_wire_selection(registry, ruleset, difficulty)
    }

    /// Live property-store update for the selection keys. Unlike join
    /// recovery this applies unconditionally, so the authority clearing the
    /// keys at a lobby reset clears the selection on every peer.
    pub fn on_selection_properties_changed(
        &mut self,
        registry: &mut RulesetRegistry,
    ) -> Option<SyncEvent> {
        let ruleset = self.transport.property(keys::SELECTED_RULESET);
        let difficulty = self.transport.property(keys::SELECTED_DIFFICULTY);
        self.apply_wire_selection(registry, ruleset, difficulty)
    }

    /// Scene-load notification for the coordinator itself. Returning to the
    /// staging scene resets the handshake; the authority additionally clears
    /// the persisted selection so the next session starts clean.
    pub fn on_scene_loaded(
        &mut self,
        registry: &mut RulesetRegistry,
        scene: &str,
    ) -> Option<SyncEvent> {
        if scene != self.config.staging_scene {
            return None;
        }

        tracing::debug!(scene, "staging scene loaded, resetting handshake");
        self.state = SyncState::Idle;
        self.start_deadline = None;
        self.confirmation_sent = false;

        if self.transport.in_session() {
            if self.transport.is_authority() {
                self.transport.set_property(keys::SELECTED_RULESET, None);
                self.transport.set_property(keys::SELECTED_DIFFICULTY, None);
            }
            // Followers clear when the property update arrives.
            return None;
        }

        self.apply_selection(registry, SessionSelection::default());
        Some(SyncEvent::SelectionApplied {
            selection: self.selection.clone(),
        })
    }

    /// Deadline check; call once per simulation step. Surfaces a failed
    /// start when the authority never confirmed in time.
    pub fn poll(&mut self, now: SimTime) -> Option<SyncEvent> {
        let deadline = self.start_deadline?;
        if self.state != SyncState::StartRequested || now < deadline {
            return None;
        }

        tracing::warn!("start request timed out waiting for authority");
        self.start_deadline = None;
        self.state = if self.selection.is_empty() {
            SyncState::Idle
        } else {
            SyncState::SelectionKnown
        };
        Some(SyncEvent::StartFailed {
            reason: StartFailure::AuthorityUnreachable,
        })
    }

    /// Authority decision: resolve the scene deterministically and broadcast
    /// the confirmation to every peer, the authority included. The load
    /// itself happens when the broadcast loops back.
    fn confirm_start(&mut self, difficulty: i32) {
        if self.confirmation_sent {
            tracing::debug!("start already confirmed this session, ignoring duplicate request");
            return;
        }
        let scene = self.resolve_scene();
        tracing::info!(%scene, difficulty, "authority confirming start");
        self.confirmation_sent = true;
        self.transport
            .broadcast(&SyncMessage::StartConfirmed { scene, difficulty });
    }

    /// Pure function of the collaborators' observable state: a precomputed
    /// level index wins, offline mode falls back to the first level, and
    /// anything unresolvable falls back to the default scene.
    fn resolve_scene(&self) -> String {
        let resolved = match self.next_level.precomputed_level_index() {
            Some(index) => self.next_level.scene_for_level(index),
            None if self.next_level.is_offline() => self.next_level.scene_for_level(0),
            None => None,
        };
        match resolved {
            Some(scene) if !scene.is_empty() => scene,
            _ => self.config.default_scene.clone(),
        }
    }

    fn begin_confirmed_load(&mut self, scene: String, difficulty: i32) -> Option<SyncEvent> {
        if self.state == SyncState::StartConfirmed {
            tracing::debug!(%scene, "duplicate start confirmation ignored");
            return None;
        }

        let scene = if scene.is_empty() {
            // The authority should always fill this in; degrade to the local
            // resolution rather than failing the start.
            self.resolve_scene()
        } else {
            scene
        };

        tracing::info!(%scene, difficulty, "start confirmed, beginning scene load");
        self.state = SyncState::StartConfirmed;
        self.start_deadline = None;
        self.scene_loader.begin_load(&scene, difficulty);
        Some(SyncEvent::StartConfirmed { scene, difficulty })
    }

    fn apply_wire_selection(
        &mut self,
        registry: &mut RulesetRegistry,
        ruleset: Option<String>,
        difficulty: Option<String>,
    ) -> Option<SyncEvent> {
        let difficulty = difficulty.and_then(|raw| raw.parse::<i32>().ok());
        let selection = SessionSelection::from_wire(ruleset.as_deref(), difficulty);
        self.apply_selection(registry, selection);
        Some(SyncEvent::SelectionApplied {
            selection: self.selection.clone(),
        })
    }

    /// Last-write-wins application of a selection; mirrors it into the
    /// registry so replicated selection governs gameplay on this peer.
    fn apply_selection(&mut self, registry: &mut RulesetRegistry, selection: SessionSelection) {
        match selection.ruleset.as_ref() {
            Some(id) => registry.set_singular(id.as_str()),
            None => registry.disable_all(),
        }
        self.selection = selection;

        // A selection change never regresses an in-flight handshake.
        if matches!(self.state, SyncState::Idle | SyncState::SelectionKnown) {
            self.state = if self.selection.is_empty() {
                SyncState::Idle
            } else {
                SyncState::SelectionKnown
            };
        }
    }
}
