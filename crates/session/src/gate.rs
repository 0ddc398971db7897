//! Scene-lifecycle gate
//!
//! Fans scene-load notifications out to effect listeners, but only pays for
//! the external subscription while someone actually cares: the gate is
//! hooked to the [`SceneEventSource`] iff at least one listener is
//! registered AND any ruleset is active. The hook state is re-evaluated
//! after every registry mutation and after every fan-out. Omitting the
//! laziness would not change behavior; it is purely cost avoidance.
//!
//! Listeners receive the scene identity and load mode and are responsible
//! for their own gameplay-scene filtering and per-scene cache resets.

use std::cell::RefCell;
use std::rc::Rc;

use ridgeline_domain::{ObserverId, RulesetRegistry};

use crate::ports::SceneEventSource;

/// How a scene was brought in by the external loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    Single,
    Additive,
}

/// Handle returned by [`SceneGate::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = dyn FnMut(&str, LoadMode);

struct GateInner {
    source: Rc<dyn SceneEventSource>,
    listeners: Vec<(ListenerId, Box<Listener>)>,
    pending_unsubscribes: Vec<ListenerId>,
    dispatching: bool,
    next_listener: u64,
    rules_active: bool,
    hooked: bool,
}

impl GateInner {
    fn update_hook(&mut self) {
        let should_hook = !self.listeners.is_empty() && self.rules_active;
        if should_hook == self.hooked {
            return;
        }
        self.hooked = should_hook;
        if should_hook {
            tracing::debug!("attaching to scene notifications");
            self.source.hook();
        } else {
            tracing::debug!("detaching from scene notifications");
            self.source.unhook();
        }
    }

    fn set_rules_active(inner: &Rc<RefCell<GateInner>>, rules_active: bool) {
        let mut inner = inner.borrow_mut();
        inner.rules_active = rules_active;
        inner.update_hook();
    }
}

/// Lazily-attached fan-out point for scene-load notifications.
///
/// Cheap to clone handles are not provided on purpose; the embedder owns one
/// gate per peer and the registry observer keeps its internals alive.
pub struct SceneGate {
    inner: Rc<RefCell<GateInner>>,
}

impl SceneGate {
    pub fn new(source: Rc<dyn SceneEventSource>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(GateInner {
                source,
                listeners: Vec::new(),
                pending_unsubscribes: Vec::new(),
                dispatching: false,
                next_listener: 0,
                rules_active: false,
                hooked: false,
            })),
        }
    }

    /// Wires the gate to the registry so the hook policy follows enablement
    /// changes. Also samples the current state once.
    pub fn attach_to_registry(&self, registry: &mut RulesetRegistry) -> ObserverId {
        let inner = Rc::clone(&self.inner);
        let id = registry.subscribe(move |current| {
            GateInner::set_rules_active(&inner, current.any_active());
        });
        GateInner::set_rules_active(&self.inner, registry.any_active());
        id
    }

    /// Registers a scene-load listener.
    pub fn subscribe(&self, listener: impl FnMut(&str, LoadMode) + 'static) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next_listener);
        inner.next_listener += 1;
        inner.listeners.push((id, Box::new(listener)));
        inner.update_hook();
        id
    }

    /// Removes a listener. Safe to call from inside a fan-out; the removal
    /// is then deferred until the fan-out finishes.
    pub fn unsubscribe(&self, id: ListenerId) {
        let mut inner = self.inner.borrow_mut();
        if inner.dispatching {
            inner.pending_unsubscribes.push(id);
            return;
        }
        inner.listeners.retain(|(listener_id, _)| *listener_id != id);
        inner.update_hook();
    }

    /// Entry point for the external notification source: fans one scene load
    /// out to every listener, then re-evaluates the hook policy.
    pub fn on_scene_loaded(&self, scene: &str, mode: LoadMode) {
        if !self.inner.borrow().hooked {
            return;
        }

        // Listeners run without any borrow held so they may re-enter the
        // gate (subscribe/unsubscribe) or mutate the registry.
        let mut listeners = {
            let mut inner = self.inner.borrow_mut();
            inner.dispatching = true;
            std::mem::take(&mut inner.listeners)
        };
        for (_, listener) in listeners.iter_mut() {
            listener(scene, mode);
        }

        let mut inner = self.inner.borrow_mut();
        // Subscriptions made during dispatch landed in the inner list; keep
        // the originals first to preserve registration order.
        listeners.extend(inner.listeners.drain(..));
        inner.listeners = listeners;
        inner.dispatching = false;
        let pending = std::mem::take(&mut inner.pending_unsubscribes);
        for id in pending {
            inner.listeners.retain(|(listener_id, _)| *listener_id != id);
        }
        inner.update_hook();
    }

    /// Whether the gate is currently attached to the notification source.
    pub fn is_hooked(&self) -> bool {
        self.inner.borrow().hooked
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

/// Gameplay-scene filter shared by listeners: the default scene or any
/// `level_` scene counts; everything else (staging, menus) does not.
pub fn is_gameplay_scene(scene: &str, default_scene: &str) -> bool {
    scene == default_scene
        || scene
            .get(.."level_".len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("level_"))
}
