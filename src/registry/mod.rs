//! Process-wide registry of active static mocks.
//!
//! At most one open [`Binding`] exists per type. The map lock is held only
//! for the insert, remove or lookup itself, never across a routed call.

pub mod binding;

pub use binding::{Binding, MockSettings};

use crate::config::Config;
use crate::identity::{ClassId, ThreadIdentity};
use crate::logging;
use crate::runtime::{DispatchTable, RedirectToken, Redirector, Router};
use crate::{MockError, Result};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

struct Entry {
    binding: Arc<Binding>,
    token: RedirectToken,
}

/// Maps each mocked type to its open binding.
pub struct StaticMockRegistry {
    bindings: RwLock<HashMap<ClassId, Entry>>,
    redirector: Arc<dyn Redirector>,
    config: Config,
}

impl StaticMockRegistry {
    /// Create a registry over `redirector` with default configuration
    pub fn new(redirector: Arc<dyn Redirector>) -> Arc<Self> {
        Self::with_config(redirector, Config::default())
    }

    pub fn with_config(redirector: Arc<dyn Redirector>, config: Config) -> Arc<Self> {
        Arc::new(Self {
            bindings: RwLock::new(HashMap::new()),
            redirector,
            config,
        })
    }

    /// The registry behind `mock_static`, wired to the global dispatch table.
    ///
    /// Configuration is read once, on first use.
    pub fn global() -> &'static Arc<StaticMockRegistry> {
        static GLOBAL: OnceLock<Arc<StaticMockRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let redirector: Arc<dyn Redirector> = DispatchTable::global().clone();
            Self::with_config(redirector, Config::load_or_default())
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Bind `class` to a new mock owned by `thread` and install its redirect.
    pub fn open(
        self: &Arc<Self>,
        class: ClassId,
        thread: ThreadIdentity,
        settings: &MockSettings,
    ) -> Result<Arc<Binding>> {
        let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = bindings.get(&class) {
            return Err(MockError::AlreadyMocked {
                class: class.to_string(),
                owner: existing.binding.owner().to_string(),
            });
        }

        let binding = Arc::new(Binding::new(
            class,
            thread,
            settings.clone(),
            self.config.diagnostics.max_listed_calls,
        ));
        let router = Router::new(Arc::downgrade(self), class);
        let token = self.redirector.install(class, router.into_callback())?;
        bindings.insert(
            class,
            Entry {
                binding: Arc::clone(&binding),
                token,
            },
        );

        logging::log_binding_opened(&class, binding.owner());
        Ok(binding)
    }

    /// Binding that should handle a call on `class` made from `thread`.
    pub fn lookup(&self, class: &ClassId, thread: &ThreadIdentity) -> Option<Arc<Binding>> {
        let bindings = self.bindings.read().unwrap_or_else(PoisonError::into_inner);
        let binding = &bindings.get(class)?.binding;
        if self.config.routing.foreign_threads || binding.owner() == thread {
            Some(Arc::clone(binding))
        } else {
            None
        }
    }

    /// Release `binding`; fails if it is already closed.
    pub fn close(&self, binding: &Binding, thread: &ThreadIdentity) -> Result<()> {
        binding.ensure_owner(thread)?;

        let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        if binding.is_closed() {
            return Err(MockError::AlreadyClosed {
                class: binding.display_name(),
            });
        }

        let class = *binding.class();
        let registered = bindings
            .get(&class)
            .is_some_and(|entry| std::ptr::eq(Arc::as_ptr(&entry.binding), binding));
        let entry = if registered { bindings.remove(&class) } else { None };
        let uninstalled = match entry {
            Some(entry) => self.redirector.uninstall(entry.token),
            None => Ok(()),
        };
        binding.mark_closed();
        drop(bindings);

        logging::log_binding_closed(&class, binding.owner());
        uninstalled
    }

    /// Release `binding` unless it is already closed.
    pub fn close_on_demand(&self, binding: &Binding, thread: &ThreadIdentity) -> Result<()> {
        match self.close(binding, thread) {
            Err(MockError::AlreadyClosed { .. }) => Ok(()),
            other => other,
        }
    }

    pub fn is_mocked(&self, class: &ClassId) -> bool {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(class)
    }

    /// Number of open bindings.
    pub fn active_count(&self) -> usize {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoutingConfig;
    use crate::runtime::RouterCallback;
    use std::sync::Mutex;
    use std::thread;

    struct Files;
    struct Clock;

    /// Redirector that only records what it was asked to do.
    #[derive(Default)]
    struct RecordingRedirector {
        installed: Mutex<Vec<String>>,
        uninstalled: Mutex<Vec<u64>>,
    }

    impl Redirector for RecordingRedirector {
        fn install(&self, class: ClassId, _callback: RouterCallback) -> Result<RedirectToken> {
            let mut installed = self.installed.lock().unwrap();
            installed.push(class.short_name().to_string());
            Ok(RedirectToken::new(installed.len() as u64))
        }

        fn uninstall(&self, token: RedirectToken) -> Result<()> {
            self.uninstalled.lock().unwrap().push(token.id());
            Ok(())
        }
    }

    fn registry() -> (Arc<StaticMockRegistry>, Arc<RecordingRedirector>) {
        let redirector = Arc::new(RecordingRedirector::default());
        (StaticMockRegistry::new(redirector.clone()), redirector)
    }

    #[test]
    fn test_open_installs_redirect() {
        let (registry, redirector) = registry();
        let class = ClassId::of::<Files>();
        registry
            .open(class, ThreadIdentity::current(), &MockSettings::default())
            .unwrap();

        assert!(registry.is_mocked(&class));
        assert_eq!(registry.active_count(), 1);
        assert_eq!(*redirector.installed.lock().unwrap(), vec!["Files".to_string()]);
    }

    #[test]
    fn test_second_open_is_already_mocked() {
        let (registry, _) = registry();
        let class = ClassId::of::<Files>();
        let settings = MockSettings::default();
        registry.open(class, ThreadIdentity::current(), &settings).unwrap();

        let err = registry
            .open(class, ThreadIdentity::current(), &settings)
            .unwrap_err();
        assert!(matches!(err, MockError::AlreadyMocked { .. }));

        // A different type is unaffected.
        assert!(registry
            .open(ClassId::of::<Clock>(), ThreadIdentity::current(), &settings)
            .is_ok());
    }

    #[test]
    fn test_open_on_other_thread_is_already_mocked() {
        let (registry, _) = registry();
        let class = ClassId::of::<Files>();
        registry
            .open(class, ThreadIdentity::current(), &MockSettings::default())
            .unwrap();

        let registry_ref = Arc::clone(&registry);
        let result = thread::spawn(move || {
            registry_ref
                .open(class, ThreadIdentity::current(), &MockSettings::default())
                .map(|_| ())
        })
        .join()
        .unwrap();
        assert!(matches!(result, Err(MockError::AlreadyMocked { .. })));
    }

    #[test]
    fn test_close_lifecycle() {
        let (registry, redirector) = registry();
        let class = ClassId::of::<Files>();
        let thread = ThreadIdentity::current();
        let binding = registry
            .open(class, thread.clone(), &MockSettings::default())
            .unwrap();

        registry.close(&binding, &thread).unwrap();
        assert!(binding.is_closed());
        assert!(!registry.is_mocked(&class));
        assert!(registry.lookup(&class, &thread).is_none());
        assert_eq!(redirector.uninstalled.lock().unwrap().len(), 1);

        assert!(matches!(
            registry.close(&binding, &thread),
            Err(MockError::AlreadyClosed { .. })
        ));
        registry.close_on_demand(&binding, &thread).unwrap();
        assert_eq!(redirector.uninstalled.lock().unwrap().len(), 1);

        // The type can be mocked again once released.
        assert!(registry.open(class, thread, &MockSettings::default()).is_ok());
    }

    #[test]
    fn test_close_from_foreign_thread_fails() {
        let (registry, _) = registry();
        let class = ClassId::of::<Files>();
        let binding = registry
            .open(class, ThreadIdentity::current(), &MockSettings::default())
            .unwrap();

        let registry_ref = Arc::clone(&registry);
        let binding_ref = Arc::clone(&binding);
        let result = thread::spawn(move || {
            registry_ref.close_on_demand(&binding_ref, &ThreadIdentity::current())
        })
        .join()
        .unwrap();

        assert!(matches!(result, Err(MockError::WrongThread { .. })));
        assert!(!binding.is_closed());
        assert!(registry.is_mocked(&class));
    }

    #[test]
    fn test_lookup_respects_foreign_thread_routing() {
        let config = Config {
            routing: RoutingConfig {
                foreign_threads: false,
            },
            ..Config::default()
        };
        let redirector = Arc::new(RecordingRedirector::default());
        let registry = StaticMockRegistry::with_config(redirector, config);
        let class = ClassId::of::<Files>();
        let owner = ThreadIdentity::current();
        registry
            .open(class, owner.clone(), &MockSettings::default())
            .unwrap();

        assert!(registry.lookup(&class, &owner).is_some());
        let foreign = thread::spawn(ThreadIdentity::current).join().unwrap();
        assert!(registry.lookup(&class, &foreign).is_none());
    }
}
