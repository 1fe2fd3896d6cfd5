//! Rebinding: the upgrade half of the router.
//!
//! A rebind only ever rewrites the module word of the binding. Data slots
//! are untouched, which is what lets an upgraded module pick up where the
//! previous one left off, and what lets an incompatible module misread it.

use std::sync::MutexGuard;

use tracing::{info, warn};

use dss_layout::{check_compatibility, CompatReport};
use dss_types::{Address, ModuleId, OwnerId, Word};

use crate::binding;
use crate::call::Call;
use crate::error::{RouterError, RouterResult};
use crate::phase::OwnerPhase;
use crate::router::{DelegationRouter, OwnerState};

impl DelegationRouter {
    /// Point `owner` at `new_module`.
    ///
    /// Fails with `NotAuthorized` unless `requester` is the admin, with
    /// `UnknownModule` if the module is not registered, and, while the
    /// layout guard is on, with `LayoutIncompatible` if the new layout does
    /// not preserve the current one.
    pub fn rebind(&self, owner: &OwnerId, requester: Address, new_module: ModuleId) -> RouterResult<()> {
        let state = self.owner_state(owner)?;
        let mut guard = state.lock().expect("lock poisoned");
        self.rebind_locked(owner, &mut guard, requester, new_module, self.config.enforce_layout_check)
    }

    /// Like [`Self::rebind`] but never consults the layout guard.
    ///
    /// This is how an owner ends up `Broken`.
    pub fn rebind_unchecked(
        &self,
        owner: &OwnerId,
        requester: Address,
        new_module: ModuleId,
    ) -> RouterResult<()> {
        let state = self.owner_state(owner)?;
        let mut guard = state.lock().expect("lock poisoned");
        warn!(%owner, module = %new_module, "rebind bypasses the layout guard");
        self.rebind_locked(owner, &mut guard, requester, new_module, false)
    }

    /// Rebind, then run `init` against the new module as `requester`.
    ///
    /// The init call runs with the owner in the `Upgrading` phase. If it
    /// fails, the module word is restored and the error is returned; the
    /// init call's own writes are discarded with it. A call without payload
    /// skips initialisation.
    pub fn rebind_with_init(
        &self,
        owner: &OwnerId,
        requester: Address,
        new_module: ModuleId,
        init: &Call,
    ) -> RouterResult<Vec<Word>> {
        let state = self.owner_state(owner)?;
        let mut guard = state.lock().expect("lock poisoned");
        let previous = self.binding_words(owner)?.module;
        let previous_phase = guard.phase;

        self.rebind_locked(owner, &mut guard, requester, new_module, self.config.enforce_layout_check)?;
        if !init.has_payload() {
            return Ok(Vec::new());
        }

        guard.phase = OwnerPhase::Upgrading;
        match self.dispatch_locked(owner, &mut guard, requester, init) {
            Ok(output) => {
                guard.phase = OwnerPhase::Active;
                Ok(output)
            }
            Err(err) => {
                let slot = Word::from_u64(self.config.binding.module_slot);
                self.store.write(owner, slot, previous)?;
                guard.phase = previous_phase;
                warn!(%owner, module = %new_module, error = %err, "init failed, rebind rolled back");
                Err(err)
            }
        }
    }

    /// Hand the admin role to `new_admin`.
    pub fn change_admin(&self, owner: &OwnerId, requester: Address, new_admin: Address) -> RouterResult<()> {
        let state = self.owner_state(owner)?;
        let _guard = state.lock().expect("lock poisoned");
        self.authorize(owner, requester)?;
        binding::write_admin(self.store.as_ref(), owner, &self.config.binding, &new_admin)?;
        info!(%owner, %new_admin, "admin changed");
        Ok(())
    }

    /// What the layout guard would say about rebinding `owner` to
    /// `new_module`, without changing anything.
    pub fn compatibility(&self, owner: &OwnerId, new_module: &ModuleId) -> RouterResult<CompatReport> {
        let next = self.require_module(new_module)?;
        let words = self.binding_words(owner)?;
        let current = words
            .module_id()
            .ok_or_else(|| RouterError::UnknownModule(words.record().active_module))?;
        let current = self.require_module(&current)?;
        Ok(check_compatibility(current.descriptor(), next.descriptor()))
    }

    fn authorize(&self, owner: &OwnerId, requester: Address) -> RouterResult<()> {
        let admin = self.binding_words(owner)?.admin();
        if requester != admin {
            return Err(RouterError::NotAuthorized {
                owner: *owner,
                requester,
            });
        }
        Ok(())
    }

    fn rebind_locked(
        &self,
        owner: &OwnerId,
        state: &mut MutexGuard<'_, OwnerState>,
        requester: Address,
        new_module: ModuleId,
        guarded: bool,
    ) -> RouterResult<()> {
        self.authorize(owner, requester)?;
        let next = self.require_module(&new_module)?;
        let words = self.binding_words(owner)?;

        if guarded {
            match words.module_id().and_then(|id| self.module(&id)) {
                Some(current) => {
                    let report = check_compatibility(current.descriptor(), next.descriptor());
                    if !report.is_compatible() {
                        return Err(RouterError::LayoutIncompatible {
                            from: current.id(),
                            to: new_module,
                            report,
                        });
                    }
                }
                None => warn!(%owner, "current binding is unresolvable, layout check skipped"),
            }
        }

        binding::write_module(self.store.as_ref(), owner, &self.config.binding, &new_module)?;
        if state.phase == OwnerPhase::Broken {
            state.phase = OwnerPhase::Active;
        }
        info!(
            %owner,
            from = %words.record().active_module,
            to = %new_module,
            guarded,
            "rebound owner"
        );
        Ok(())
    }
}
