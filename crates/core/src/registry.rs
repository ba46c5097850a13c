//! Host-owned registry mapping strategy names to implementations.
//!
//! Each registration holds a constructor producing a fresh, per-connection
//! strategy value. The registry itself is shared by every connection and
//! may be read concurrently; registration changes take a write lock.

use std::collections::BTreeMap;
use std::fmt;

use parking_lot::RwLock;

use crate::ahs::AhsController;
use crate::congestion_control::{CongestionController, CongestionOps, CA_PRIV_SIZE};
use crate::errors::RegistryError;
use crate::reno::RenoController;
use crate::veno::VenoController;

/// Name of the algorithm that is always available and can't be removed.
pub const FALLBACK_ALGORITHM: &str = "reno";

/// Builds a new strategy for one connection.
pub type Constructor = fn() -> Box<dyn CongestionOps>;

#[derive(Clone, Copy)]
struct Registration {
    constructor: Constructor,
    private_size: usize,
}

struct Inner {
    entries: BTreeMap<String, Registration>,
    default: String,
}

pub struct CongestionControlRegistry {
    inner: RwLock<Inner>,
}

impl fmt::Debug for CongestionControlRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("CongestionControlRegistry")
            .field("available", &inner.entries.keys().collect::<Vec<_>>())
            .field("default", &inner.default)
            .finish()
    }
}

impl Default for CongestionControlRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl CongestionControlRegistry {
    /// A registry holding only the fallback algorithm.
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            FALLBACK_ALGORITHM.to_string(),
            Registration {
                constructor: || Box::new(CongestionController::Reno(RenoController::new())),
                private_size: 0,
            },
        );
        Self {
            inner: RwLock::new(Inner {
                entries,
                default: FALLBACK_ALGORITHM.to_string(),
            }),
        }
    }

    /// A registry holding `reno`, `veno` and `ahs`.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        let builtins: [Constructor; 2] = [
            || Box::new(CongestionController::Veno(VenoController::new())),
            || Box::new(CongestionController::Ahs(AhsController::default())),
        ];
        for constructor in builtins {
            if let Err(err) = registry.register(constructor) {
                tracing::error!(%err, "failed to register built-in congestion control");
            }
        }
        registry
    }

    /// Register a strategy under the name its instances report.
    ///
    /// The constructor is invoked once to learn the name and verify that the
    /// private state fits in [`CA_PRIV_SIZE`].
    pub fn register(&self, constructor: Constructor) -> Result<&'static str, RegistryError> {
        let probe = constructor();
        let name = probe.name();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }

        let private_size = probe.private_size();
        if private_size > CA_PRIV_SIZE {
            return Err(RegistryError::PrivateStateTooLarge {
                name: name.to_string(),
                size: private_size,
                capacity: CA_PRIV_SIZE,
            });
        }

        let mut inner = self.inner.write();
        if inner.entries.contains_key(name) {
            return Err(RegistryError::AlreadyRegistered(name.to_string()));
        }
        inner.entries.insert(
            name.to_string(),
            Registration {
                constructor,
                private_size,
            },
        );
        tracing::debug!(name, private_size, "congestion control registered");
        Ok(name)
    }

    /// Remove a strategy. Removing the current default reverts the default
    /// to the fallback algorithm.
    pub fn unregister(&self, name: &str) -> Result<(), RegistryError> {
        if name == FALLBACK_ALGORITHM {
            return Err(RegistryError::Builtin(name.to_string()));
        }

        let mut inner = self.inner.write();
        if inner.entries.remove(name).is_none() {
            return Err(RegistryError::NotFound(name.to_string()));
        }
        if inner.default == name {
            inner.default = FALLBACK_ALGORITHM.to_string();
        }
        tracing::debug!(name, "congestion control unregistered");
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().entries.contains_key(name)
    }

    /// Registered size of a strategy's private state.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.inner
            .read()
            .entries
            .get(name)
            .map(|registration| registration.private_size)
    }

    /// Registered names, sorted.
    pub fn available(&self) -> Vec<String> {
        self.inner.read().entries.keys().cloned().collect()
    }

    /// Build a fresh strategy for a new connection.
    pub fn instantiate(&self, name: &str) -> Result<Box<dyn CongestionOps>, RegistryError> {
        let constructor = self
            .inner
            .read()
            .entries
            .get(name)
            .map(|registration| registration.constructor)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        Ok(constructor())
    }

    /// Build a fresh strategy using the current default.
    pub fn instantiate_default(&self) -> Box<dyn CongestionOps> {
        let constructor = {
            let inner = self.inner.read();
            inner
                .entries
                .get(&inner.default)
                .map(|registration| registration.constructor)
        };
        match constructor {
            Some(constructor) => constructor(),
            None => Box::new(RenoController::new()),
        }
    }

    pub fn set_default(&self, name: &str) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();
        if !inner.entries.contains_key(name) {
            return Err(RegistryError::NotFound(name.to_string()));
        }
        inner.default = name.to_string();
        tracing::debug!(name, "default congestion control changed");
        Ok(())
    }

    pub fn default_name(&self) -> String {
        self.inner.read().default.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::TcpSock;

    #[derive(Debug)]
    struct Bloated {
        _state: [u64; 32],
    }

    impl CongestionOps for Bloated {
        fn name(&self) -> &'static str {
            "bloated"
        }

        fn private_size(&self) -> usize {
            std::mem::size_of::<[u64; 32]>()
        }

        fn on_init(&mut self, _tp: &mut TcpSock) {}

        fn cong_avoid(&mut self, _tp: &mut TcpSock, _ack: u32, _acked: u32) {}

        fn ssthresh(&self, tp: &TcpSock) -> u32 {
            tp.snd_cwnd
        }

        fn undo_cwnd(&self, tp: &TcpSock) -> u32 {
            tp.snd_cwnd
        }
    }

    #[derive(Debug)]
    struct Nameless;

    impl CongestionOps for Nameless {
        fn name(&self) -> &'static str {
            ""
        }

        fn private_size(&self) -> usize {
            0
        }

        fn on_init(&mut self, _tp: &mut TcpSock) {}

        fn cong_avoid(&mut self, _tp: &mut TcpSock, _ack: u32, _acked: u32) {}

        fn ssthresh(&self, _tp: &TcpSock) -> u32 {
            2
        }

        fn undo_cwnd(&self, _tp: &TcpSock) -> u32 {
            2
        }
    }

    #[test]
    fn test_builtins_available() {
        let registry = CongestionControlRegistry::with_builtins();
        assert_eq!(registry.available(), vec!["ahs", "reno", "veno"]);
        assert_eq!(registry.default_name(), FALLBACK_ALGORITHM);
        for name in registry.available() {
            let ops = registry.instantiate(&name).unwrap();
            assert_eq!(ops.name(), name);
            assert!(registry.find(&name).unwrap() <= CA_PRIV_SIZE);
        }
    }

    #[test]
    fn test_instantiate_gives_independent_state() {
        let registry = CongestionControlRegistry::with_builtins();
        let mut a = registry.instantiate("ahs").unwrap();
        let mut b = registry.instantiate("ahs").unwrap();
        let mut tp_a = TcpSock::new();
        let mut tp_b = TcpSock::new();
        a.on_init(&mut tp_a);
        b.on_init(&mut tp_b);

        a.on_ack_with_rtt(&mut tp_a, crate::connection::AckSample::new(1, 10_000));
        assert_eq!(a.last_rtt(), Some(std::time::Duration::from_millis(10)));
        assert_eq!(b.last_rtt(), Some(std::time::Duration::from_secs(1)));
    }

    #[test]
    fn test_duplicate_registration() {
        let registry = CongestionControlRegistry::with_builtins();
        let err = registry
            .register(|| Box::new(AhsController::default()))
            .unwrap_err();
        assert_eq!(err, RegistryError::AlreadyRegistered("ahs".into()));
    }

    #[test]
    fn test_oversized_state_rejected() {
        let registry = CongestionControlRegistry::new();
        let err = registry
            .register(|| Box::new(Bloated { _state: [0; 32] }))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::PrivateStateTooLarge {
                name: "bloated".into(),
                size: 256,
                capacity: CA_PRIV_SIZE,
            }
        );
        assert!(!registry.contains("bloated"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let registry = CongestionControlRegistry::new();
        assert_eq!(
            registry.register(|| Box::new(Nameless)).unwrap_err(),
            RegistryError::EmptyName
        );
    }

    #[test]
    fn test_unregister() {
        let registry = CongestionControlRegistry::with_builtins();
        registry.set_default("ahs").unwrap();
        assert_eq!(registry.instantiate_default().name(), "ahs");

        registry.unregister("ahs").unwrap();
        assert!(!registry.contains("ahs"));
        assert_eq!(registry.default_name(), FALLBACK_ALGORITHM);
        assert_eq!(registry.instantiate_default().name(), "reno");

        assert_eq!(
            registry.unregister("ahs").unwrap_err(),
            RegistryError::NotFound("ahs".into())
        );
        assert!(matches!(
            registry.instantiate("ahs"),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn test_fallback_cannot_be_unregistered() {
        let registry = CongestionControlRegistry::with_builtins();
        assert_eq!(
            registry.unregister(FALLBACK_ALGORITHM).unwrap_err(),
            RegistryError::Builtin(FALLBACK_ALGORITHM.into())
        );
    }

    #[test]
    fn test_set_default_unknown() {
        let registry = CongestionControlRegistry::new();
        assert_eq!(
            registry.set_default("ahs").unwrap_err(),
            RegistryError::NotFound("ahs".into())
        );
    }

    #[test]
    fn test_reregister_after_unregister() {
        let registry = CongestionControlRegistry::with_builtins();
        registry.unregister("veno").unwrap();
        let name = registry
            .register(|| Box::new(VenoController::new()))
            .unwrap();
        assert_eq!(name, "veno");
    }

    #[test]
    fn test_shared_across_threads() {
        let registry = std::sync::Arc::new(CongestionControlRegistry::with_builtins());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let mut tp = TcpSock::new();
                    let mut ops = registry.instantiate("ahs").unwrap();
                    ops.on_init(&mut tp);
                    ops.on_cwnd_event(&mut tp, crate::connection::CaEvent::Loss);
                    tp.snd_cwnd
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 65_000);
        }
    }
}
