use std::sync::Arc;

use crate::config::key::ConfigKey;
use crate::config::snapshot::ConfigSnapshot;
use crate::config::value::ConfigValue;
use crate::diagnostics::{AllocationSiteTracing, AllocationTracer};
#[cfg(unix)]
use crate::diagnostics::{parse_signal_setting, Sigdump};
use crate::error::Result;
use crate::session::SessionSlot;

type HookFn = fn(&ChangeHooks, Option<&ConfigValue>, Option<&ConfigValue>);

const HOOKS: [(ConfigKey, HookFn); 3] = [
    (ConfigKey::KeepAllocSite, on_keep_alloc_site),
    (ConfigKey::Postmortem, on_postmortem),
    (ConfigKey::SigdumpSig, on_sigdump_sig),
];

/// Side effects attached to specific keys, run when an update changes them.
pub struct ChangeHooks {
    alloc_tracer: Arc<dyn AllocationTracer>,
    session: SessionSlot,
    #[cfg(unix)]
    sigdump: Arc<Sigdump>,
}

impl ChangeHooks {
    pub fn new(
        alloc_tracer: Arc<dyn AllocationTracer>,
        session: SessionSlot,
        #[cfg(unix)] sigdump: Arc<Sigdump>,
    ) -> Self {
        Self {
            alloc_tracer,
            session,
            #[cfg(unix)]
            sigdump,
        }
    }

    /// Process-level collaborators: real allocation tracing and OS signal traps.
    pub fn system(session: SessionSlot) -> Self {
        Self::new(
            Arc::new(AllocationSiteTracing),
            session,
            #[cfg(unix)]
            Arc::new(Sigdump::system()),
        )
    }

    pub fn hooked_keys() -> impl Iterator<Item = ConfigKey> {
        HOOKS.iter().map(|(key, _)| *key)
    }

    pub fn session(&self) -> &SessionSlot {
        &self.session
    }

    #[cfg(unix)]
    pub fn sigdump(&self) -> &Sigdump {
        &self.sigdump
    }

    /// Rejects a value its hook could not act on, so it never reaches a snapshot.
    #[cfg_attr(not(unix), allow(unused_variables))]
    pub(crate) fn check_value(key: ConfigKey, value: &ConfigValue) -> Result<()> {
        match key {
            #[cfg(unix)]
            ConfigKey::SigdumpSig => parse_signal_setting(&value.to_string()).map(|_| ()),
            _ => Ok(()),
        }
    }

    /// Runs the hook of every hooked key whose value differs between the two
    /// snapshots, in table order. Returns the keys whose hooks ran.
    pub(crate) fn dispatch(&self, old: &ConfigSnapshot, new: &ConfigSnapshot) -> Vec<ConfigKey> {
        let mut fired = Vec::new();
        for (key, hook) in HOOKS {
            let (old_value, new_value) = (old.get(key), new.get(key));
            if old_value == new_value {
                continue;
            }
            tracing::debug!(key = %key, "running change hook");
            hook(self, old_value, new_value);
            fired.push(key);
        }
        fired
    }
}

impl std::fmt::Debug for ChangeHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("ChangeHooks");
        debug
            .field("alloc_tracing", &self.alloc_tracer.is_active())
            .field("session", &self.session);
        #[cfg(unix)]
        debug.field("sigdump", &self.sigdump);
        debug.finish()
    }
}

// Unset reads as false.
fn flag(value: Option<&ConfigValue>) -> bool {
    value.and_then(ConfigValue::as_bool).unwrap_or(false)
}

fn on_keep_alloc_site(hooks: &ChangeHooks, old: Option<&ConfigValue>, new: Option<&ConfigValue>) {
    match (flag(old), flag(new)) {
        (false, true) => hooks.alloc_tracer.start(),
        (true, false) => hooks.alloc_tracer.stop(),
        _ => {}
    }
}

fn on_postmortem(hooks: &ChangeHooks, _old: Option<&ConfigValue>, new: Option<&ConfigValue>) {
    if let Some(session) = hooks.session.current() {
        session.set_postmortem(flag(new));
    }
}

#[cfg(not(unix))]
fn on_sigdump_sig(_hooks: &ChangeHooks, _old: Option<&ConfigValue>, new: Option<&ConfigValue>) {
    if new.is_some() {
        tracing::warn!("sigdump is only available on unix targets");
    }
}

#[cfg(unix)]
fn on_sigdump_sig(hooks: &ChangeHooks, _old: Option<&ConfigValue>, new: Option<&ConfigValue>) {
    let name = new.map(ConfigValue::to_string);
    if let Err(err) = hooks.sigdump.transition(name.as_deref()) {
        tracing::error!(
            error = %err,
            signal = name.as_deref().unwrap_or(""),
            "failed to update sigdump handler"
        );
    }
}
