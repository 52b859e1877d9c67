//! Explicit listener registry.
//!
//! Listeners are wired up by hand at startup; there is no discovery. The
//! builder validates registrations once, so a running engine never sees a
//! listener without an identifier or event types.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::listener::EventListener;
use crate::process_manager::ProcessManagerDef;

/// What a registration dispatches to.
pub enum ListenerKind<E> {
    Plain(Arc<dyn EventListener<E>>),
    ProcessManager(Arc<dyn ProcessManagerDef<E>>),
}

impl<E> Clone for ListenerKind<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Plain(listener) => Self::Plain(Arc::clone(listener)),
            Self::ProcessManager(def) => Self::ProcessManager(Arc::clone(def)),
        }
    }
}

/// One registered listener: identifier, consumed types, target.
pub struct Registration<E> {
    pub listener_id: String,
    pub event_types: Vec<String>,
    pub kind: ListenerKind<E>,
}

/// Immutable set of registrations, keyed by listener id.
pub struct ListenerRegistry<E> {
    registrations: BTreeMap<String, Registration<E>>,
}

impl<E> std::fmt::Debug for ListenerRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listener_ids", &self.registrations.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<E> ListenerRegistry<E> {
    pub fn builder() -> ListenerRegistryBuilder<E> {
        ListenerRegistryBuilder::new()
    }

    /// Listener ids in deterministic (sorted) order.
    pub fn listener_ids(&self) -> impl Iterator<Item = &str> {
        self.registrations.keys().map(String::as_str)
    }

    pub fn registrations(&self) -> impl Iterator<Item = &Registration<E>> {
        self.registrations.values()
    }

    pub fn get(&self, listener_id: &str) -> Option<&Registration<E>> {
        self.registrations.get(listener_id)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

pub struct ListenerRegistryBuilder<E> {
    pending: Vec<Registration<E>>,
}

impl<E> Default for ListenerRegistryBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> ListenerRegistryBuilder<E> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    pub fn listener(
        mut self,
        listener_id: impl Into<String>,
        event_types: impl IntoIterator<Item = impl Into<String>>,
        listener: Arc<dyn EventListener<E>>,
    ) -> Self {
        self.pending.push(Registration {
            listener_id: listener_id.into(),
            event_types: event_types.into_iter().map(Into::into).collect(),
            kind: ListenerKind::Plain(listener),
        });
        self
    }

    pub fn process_manager(
        mut self,
        listener_id: impl Into<String>,
        event_types: impl IntoIterator<Item = impl Into<String>>,
        def: Arc<dyn ProcessManagerDef<E>>,
    ) -> Self {
        self.pending.push(Registration {
            listener_id: listener_id.into(),
            event_types: event_types.into_iter().map(Into::into).collect(),
            kind: ListenerKind::ProcessManager(def),
        });
        self
    }

    pub fn build(self) -> Result<ListenerRegistry<E>, RegistryError> {
        let mut registrations = BTreeMap::new();
        for registration in self.pending {
            if registration.event_types.is_empty() {
                return Err(RegistryError::NoEventTypes(registration.listener_id));
            }
            if registration
                .event_types
                .iter()
                .any(|t| t.trim().is_empty())
            {
                return Err(RegistryError::EmptyEventType(registration.listener_id));
            }
            let id = registration.listener_id.clone();
            if registrations.insert(id.clone(), registration).is_some() {
                return Err(RegistryError::DuplicateListener(id));
            }
        }
        Ok(ListenerRegistry { registrations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronik_store::RawEvent;

    struct Noop;

    impl EventListener<serde_json::Value> for Noop {
        fn apply(&self, _event: &serde_json::Value, _raw: &RawEvent) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn ids_come_back_sorted() {
        let registry = ListenerRegistry::builder()
            .listener("zeta", ["a"], Arc::new(Noop))
            .listener("alpha", ["a"], Arc::new(Noop))
            .build()
            .unwrap();
        let ids: Vec<&str> = registry.listener_ids().collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = ListenerRegistry::builder()
            .listener("same", ["a"], Arc::new(Noop))
            .listener("same", ["b"], Arc::new(Noop))
            .build()
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateListener("same".to_string()));
    }

    #[test]
    fn empty_type_sets_are_rejected() {
        let err = ListenerRegistry::builder()
            .listener("quiet", Vec::<String>::new(), Arc::new(Noop))
            .build()
            .unwrap_err();
        assert_eq!(err, RegistryError::NoEventTypes("quiet".to_string()));

        let err = ListenerRegistry::builder()
            .listener("blank", ["  "], Arc::new(Noop))
            .build()
            .unwrap_err();
        assert_eq!(err, RegistryError::EmptyEventType("blank".to_string()));
    }
}
