use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tracing::{debug, info, warn};

use dss_layout::SlotAddressSpace;
use dss_store::{BindingRecord, OwnerSnapshot, SlotStore, WriteOverlay};
use dss_types::{Address, ModuleId, OwnerId, Word};

use crate::binding::{self, BindingWords};
use crate::call::Call;
use crate::config::RouterConfig;
use crate::context::StorageContext;
use crate::error::{RouterError, RouterResult};
use crate::module::CodeModule;
use crate::phase::OwnerPhase;

/// Router-side state of one owner. The mutex around it linearizes every
/// dispatch and rebind on that owner.
#[derive(Debug)]
pub(crate) struct OwnerState {
    pub(crate) phase: OwnerPhase,
}

/// Routes calls addressed to storage owners into the code module each
/// owner is bound to.
///
/// The router holds the module registry and one lock per owner. It never
/// caches bindings: every dispatch reads the binding words from the owner's
/// storage, so whatever a handler did to those words is what the next call
/// sees.
pub struct DelegationRouter {
    pub(crate) store: Arc<dyn SlotStore>,
    pub(crate) config: RouterConfig,
    space: SlotAddressSpace,
    modules: RwLock<HashMap<ModuleId, Arc<CodeModule>>>,
    owners: RwLock<HashMap<OwnerId, Arc<Mutex<OwnerState>>>>,
    nonce: AtomicU64,
    clock: AtomicU64,
}

impl DelegationRouter {
    pub fn new(store: Arc<dyn SlotStore>, config: RouterConfig) -> RouterResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            space: SlotAddressSpace::default(),
            modules: RwLock::new(HashMap::new()),
            owners: RwLock::new(HashMap::new()),
            nonce: AtomicU64::new(0),
            clock: AtomicU64::new(0),
        })
    }

    /// A router over a fresh in-memory store.
    pub fn in_memory(config: RouterConfig) -> RouterResult<Self> {
        Self::new(Arc::new(dss_store::InMemorySlotStore::new()), config)
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SlotStore> {
        &self.store
    }

    pub fn address_space(&self) -> &SlotAddressSpace {
        &self.space
    }

    // -- modules ------------------------------------------------------------

    /// Register a module. Ids are unique.
    pub fn register_module(&self, module: CodeModule) -> RouterResult<ModuleId> {
        let id = module.id();
        let mut modules = self.modules.write().expect("lock poisoned");
        if modules.contains_key(&id) {
            return Err(RouterError::DuplicateModule(id));
        }
        debug!(
            module = %id,
            name = module.name(),
            variables = module.descriptor().len(),
            "registered module"
        );
        modules.insert(id, Arc::new(module));
        Ok(id)
    }

    pub fn module(&self, id: &ModuleId) -> Option<Arc<CodeModule>> {
        self.modules.read().expect("lock poisoned").get(id).cloned()
    }

    pub(crate) fn require_module(&self, id: &ModuleId) -> RouterResult<Arc<CodeModule>> {
        self.module(id).ok_or(RouterError::UnknownModule(*id))
    }

    pub fn module_ids(&self) -> Vec<ModuleId> {
        let mut ids: Vec<ModuleId> = self
            .modules
            .read()
            .expect("lock poisoned")
            .keys()
            .copied()
            .collect();
        ids.sort();
        ids
    }

    // -- owners -------------------------------------------------------------

    /// Create a storage owner administered by `admin` and bound to `module`.
    ///
    /// The owner id is derived from the admin and a router-wide nonce.
    pub fn create_owner(&self, admin: Address, module: ModuleId) -> RouterResult<OwnerId> {
        self.require_module(&module)?;
        let owner = loop {
            let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
            let candidate = OwnerId::derive(&admin, nonce);
            if !self.store.contains_owner(&candidate) {
                break candidate;
            }
        };
        self.store.create_owner(owner)?;
        let layout = &self.config.binding;
        binding::write_module(self.store.as_ref(), &owner, layout, &module)?;
        binding::write_admin(self.store.as_ref(), &owner, layout, &admin)?;
        self.owners.write().expect("lock poisoned").insert(
            owner,
            Arc::new(Mutex::new(OwnerState {
                phase: OwnerPhase::Uninitialized,
            })),
        );
        info!(%owner, %module, %admin, "created owner");
        Ok(owner)
    }

    pub fn owners(&self) -> Vec<OwnerId> {
        let mut ids: Vec<OwnerId> = self
            .owners
            .read()
            .expect("lock poisoned")
            .keys()
            .copied()
            .collect();
        ids.sort();
        ids
    }

    pub(crate) fn owner_state(&self, owner: &OwnerId) -> RouterResult<Arc<Mutex<OwnerState>>> {
        self.owners
            .read()
            .expect("lock poisoned")
            .get(owner)
            .cloned()
            .ok_or(RouterError::UnknownOwner(*owner))
    }

    pub(crate) fn binding_words(&self, owner: &OwnerId) -> RouterResult<BindingWords> {
        Ok(BindingWords::read(
            self.store.as_ref(),
            owner,
            &self.config.binding,
        )?)
    }

    /// Current binding of `owner`, decoded from its binding slots.
    pub fn binding(&self, owner: &OwnerId) -> RouterResult<BindingRecord> {
        let state = self.owner_state(owner)?;
        let _guard = state.lock().expect("lock poisoned");
        Ok(self.binding_words(owner)?.record())
    }

    /// Lifecycle phase. An owner whose module word names no registered
    /// module reports `Broken`, whatever its last recorded phase.
    pub fn owner_phase(&self, owner: &OwnerId) -> RouterResult<OwnerPhase> {
        let state = self.owner_state(owner)?;
        let mut guard = state.lock().expect("lock poisoned");
        match (self.resolve_bound_module(owner)?, guard.phase) {
            (None, _) => guard.phase = OwnerPhase::Broken,
            (Some(_), OwnerPhase::Broken) => guard.phase = OwnerPhase::Active,
            _ => {}
        }
        Ok(guard.phase)
    }

    /// The module the binding currently names, if it is registered.
    fn resolve_bound_module(&self, owner: &OwnerId) -> RouterResult<Option<Arc<CodeModule>>> {
        let words = self.binding_words(owner)?;
        Ok(words.module_id().and_then(|id| self.module(&id)))
    }

    // -- dispatch -----------------------------------------------------------

    /// Run `call` against `owner` on behalf of `caller`.
    ///
    /// The handler's writes are committed together if it succeeds and
    /// discarded if it fails.
    pub fn dispatch(&self, owner: &OwnerId, caller: Address, call: &Call) -> RouterResult<Vec<Word>> {
        let state = self.owner_state(owner)?;
        let mut guard = state.lock().expect("lock poisoned");
        self.dispatch_locked(owner, &mut guard, caller, call)
    }

    pub(crate) fn dispatch_locked(
        &self,
        owner: &OwnerId,
        state: &mut MutexGuard<'_, OwnerState>,
        caller: Address,
        call: &Call,
    ) -> RouterResult<Vec<Word>> {
        if call.args.len() > self.config.max_call_args {
            return Err(RouterError::TooManyArgs {
                count: call.args.len(),
                max: self.config.max_call_args,
            });
        }

        let words = self.binding_words(owner)?;
        let module = match words.module_id().and_then(|id| self.module(&id)) {
            Some(module) => module,
            None => {
                state.phase = OwnerPhase::Broken;
                let id = words.record().active_module;
                warn!(%owner, module = %id, "binding does not resolve to a registered module");
                return Err(RouterError::UnknownModule(id));
            }
        };

        let (route, handler) = module.resolve(call).ok_or_else(|| RouterError::UnroutableCall {
            module: module.id(),
            selector: call.label().to_string(),
        })?;

        let timestamp = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        let mut ctx = StorageContext::new(
            *owner,
            caller,
            module.id(),
            state.phase,
            timestamp,
            call,
            module.descriptor(),
            self.space,
            WriteOverlay::new(self.store.as_ref(), *owner),
        );

        match handler(&mut ctx) {
            Ok(output) => {
                let written = ctx.into_overlay().commit()?;
                if state.phase == OwnerPhase::Uninitialized {
                    state.phase = OwnerPhase::Active;
                }
                debug!(%owner, %caller, module = module.name(), %route, written, "dispatched");
                Ok(output)
            }
            Err(source) => {
                let dropped = ctx.into_overlay().discard();
                debug!(%owner, %caller, module = module.name(), %route, dropped, error = %source, "dispatch failed");
                Err(RouterError::OperationFailed {
                    operation: route.to_string(),
                    source,
                })
            }
        }
    }

    // -- raw access ---------------------------------------------------------

    /// Read one slot directly. Diagnostic use.
    pub fn read_raw(&self, owner: &OwnerId, slot: &Word) -> RouterResult<Word> {
        let state = self.owner_state(owner)?;
        let _guard = state.lock().expect("lock poisoned");
        Ok(self.store.read(owner, slot)?)
    }

    /// Write one slot directly, bypassing every module. Diagnostic use.
    pub fn write_raw(&self, owner: &OwnerId, slot: Word, value: Word) -> RouterResult<()> {
        let state = self.owner_state(owner)?;
        let _guard = state.lock().expect("lock poisoned");
        warn!(%owner, slot = %slot.to_short_hex(), "raw slot write");
        Ok(self.store.write(owner, slot, value)?)
    }

    // -- snapshots ----------------------------------------------------------

    /// Capture `{ owner, binding, combine, slots }`.
    pub fn export_owner(&self, owner: &OwnerId) -> RouterResult<OwnerSnapshot> {
        let state = self.owner_state(owner)?;
        let _guard = state.lock().expect("lock poisoned");
        let record = self.binding_words(owner)?.record();
        Ok(self.store.snapshot(owner, record, self.space.version())?)
    }

    /// Recreate an owner from a snapshot. The owner must not exist yet, the
    /// snapshot must use this router's combine function, and its binding
    /// record must agree with its binding slots.
    pub fn import_owner(&self, snapshot: &OwnerSnapshot) -> RouterResult<()> {
        let owner = snapshot.owner;
        if snapshot.combine != self.space.version() {
            return Err(RouterError::CombineMismatch {
                owner,
                snapshot: snapshot.combine.name(),
                router: self.space.version().name(),
            });
        }
        let mut owners = self.owners.write().expect("lock poisoned");
        if owners.contains_key(&owner) || self.store.contains_owner(&owner) {
            return Err(RouterError::OwnerExists(owner));
        }
        let slot_of = |index: u64| {
            snapshot
                .slots
                .get(&Word::from_u64(index))
                .copied()
                .unwrap_or(Word::ZERO)
        };
        let words = BindingWords {
            module: slot_of(self.config.binding.module_slot),
            admin: slot_of(self.config.binding.admin_slot),
        };
        if words.record() != snapshot.binding {
            return Err(RouterError::SnapshotMismatch(owner));
        }
        self.store.restore(snapshot)?;
        let phase = if words.module_id().and_then(|id| self.module(&id)).is_some() {
            OwnerPhase::Active
        } else {
            OwnerPhase::Broken
        };
        owners.insert(owner, Arc::new(Mutex::new(OwnerState { phase })));
        info!(%owner, slots = snapshot.slots.len(), %phase, "imported owner");
        Ok(())
    }
}

impl std::fmt::Debug for DelegationRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegationRouter")
            .field("config", &self.config)
            .field("modules", &self.modules.read().expect("lock poisoned").len())
            .field("owners", &self.owners.read().expect("lock poisoned").len())
            .finish()
    }
}
