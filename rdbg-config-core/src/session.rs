use std::sync::{Arc, PoisonError, RwLock};

/// The slice of the debug session that configuration changes reach into.
pub trait DebugSession: Send + Sync {
    fn set_postmortem(&self, enabled: bool);
}

/// Holder for the active session, if any.
#[derive(Clone, Default)]
pub struct SessionSlot {
    current: Arc<RwLock<Option<Arc<dyn DebugSession>>>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, session: Arc<dyn DebugSession>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    pub fn detach(&self) -> Option<Arc<dyn DebugSession>> {
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn current(&self) -> Option<Arc<dyn DebugSession>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_active(&self) -> bool {
        self.current().is_some()
    }
}

impl std::fmt::Debug for SessionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSlot")
            .field("active", &self.is_active())
            .finish()
    }
}
