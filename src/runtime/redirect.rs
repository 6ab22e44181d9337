use super::intercept::{complete, try_complete};
use super::router::Routed;
use crate::identity::{CallSignature, ClassId};
use crate::logging;
use crate::{MockError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Callback that decides the fate of a redirected call.
pub type RouterCallback = Arc<dyn Fn(&CallSignature, &[Value]) -> Routed + Send + Sync>;

/// Handle for an installed redirect.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RedirectToken(u64);

impl RedirectToken {
    /// Token minted by a [`Redirector`] implementation.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Makes a type's static calls reach a router callback.
pub trait Redirector: Send + Sync {
    /// Start sending every static call on `class` to `callback`.
    fn install(&self, class: ClassId, callback: RouterCallback) -> Result<RedirectToken>;

    /// Restore original dispatch for the redirect behind `token`.
    fn uninstall(&self, token: RedirectToken) -> Result<()>;
}

struct Route {
    token: RedirectToken,
    callback: RouterCallback,
}

/// In-process redirect table consulted by [`intercept`](super::intercept).
///
/// Calls on types without an installed route run their real implementation.
#[derive(Default)]
pub struct DispatchTable {
    routes: RwLock<HashMap<ClassId, Route>>,
    next_token: AtomicU64,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table used by the global registry and by `intercept`.
    pub fn global() -> &'static Arc<DispatchTable> {
        static GLOBAL: OnceLock<Arc<DispatchTable>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(DispatchTable::new()))
    }

    pub fn is_redirected(&self, class: &ClassId) -> bool {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(class)
    }

    /// Route a call if `class` is redirected.
    ///
    /// The table lock is released before the callback runs.
    pub fn dispatch(
        &self,
        class: &ClassId,
        signature: &CallSignature,
        arguments: &[Value],
    ) -> Option<Routed> {
        let callback = {
            let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
            routes.get(class).map(|route| Arc::clone(&route.callback))
        };
        match callback {
            Some(callback) => Some(callback(signature, arguments)),
            None => {
                logging::log_unrouted_call(class, signature);
                None
            }
        }
    }

    /// Typed dispatch for a function returning `R`.
    pub fn call<R, F>(
        &self,
        class: ClassId,
        signature: CallSignature,
        arguments: Vec<Value>,
        real: F,
    ) -> R
    where
        R: DeserializeOwned,
        F: FnOnce() -> R,
    {
        match self.dispatch(&class, &signature, &arguments) {
            Some(routed) => complete(routed, &class, &signature, real),
            None => real(),
        }
    }

    /// Typed dispatch for a function returning `Result<R, E>`.
    pub fn try_call<R, E, F>(
        &self,
        class: ClassId,
        signature: CallSignature,
        arguments: Vec<Value>,
        real: F,
    ) -> std::result::Result<R, E>
    where
        R: DeserializeOwned,
        E: 'static,
        F: FnOnce() -> std::result::Result<R, E>,
    {
        match self.dispatch(&class, &signature, &arguments) {
            Some(routed) => try_complete(routed, &class, &signature, real),
            None => real(),
        }
    }
}

impl Redirector for DispatchTable {
    fn install(&self, class: ClassId, callback: RouterCallback) -> Result<RedirectToken> {
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        if routes.contains_key(&class) {
            return Err(MockError::Redirect {
                class: class.to_string(),
                reason: "a redirect is already installed".to_string(),
            });
        }
        let token = RedirectToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        routes.insert(class, Route { token, callback });
        logging::log_redirect_installed(&class, token.0);
        Ok(token)
    }

    fn uninstall(&self, token: RedirectToken) -> Result<()> {
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        let class = routes
            .iter()
            .find(|(_, route)| route.token == token)
            .map(|(class, _)| *class)
            .ok_or_else(|| MockError::Redirect {
                class: "<unknown>".to_string(),
                reason: format!("no redirect installed for token {}", token.0),
            })?;
        routes.remove(&class);
        logging::log_redirect_removed(&class, token.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Clock;

    fn now() -> CallSignature {
        CallSignature::new("now", Vec::<String>::new())
    }

    fn fixed(value: Value) -> RouterCallback {
        Arc::new(move |_: &CallSignature, _: &[Value]| Routed::Value(value.clone()))
    }

    #[test]
    fn test_unredirected_call_runs_real() {
        let table = DispatchTable::new();
        let class = ClassId::of::<Clock>();
        assert!(!table.is_redirected(&class));
        assert_eq!(table.call(class, now(), vec![], || 7u64), 7);
    }

    #[test]
    fn test_install_and_uninstall() {
        let table = DispatchTable::new();
        let class = ClassId::of::<Clock>();

        let token = table.install(class, fixed(json!(42))).unwrap();
        assert!(table.is_redirected(&class));
        assert_eq!(table.call(class, now(), vec![], || 7u64), 42);

        table.uninstall(token).unwrap();
        assert!(!table.is_redirected(&class));
        assert_eq!(table.call(class, now(), vec![], || 7u64), 7);
        assert!(table.uninstall(token).is_err());
    }

    #[test]
    fn test_second_install_rejected() {
        let table = DispatchTable::new();
        let class = ClassId::of::<Clock>();
        table.install(class, fixed(json!(1))).unwrap();
        assert!(matches!(
            table.install(class, fixed(json!(2))),
            Err(MockError::Redirect { .. })
        ));
    }
}
