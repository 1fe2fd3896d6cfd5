use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use dss_layout::{ModuleDescriptor, VariableDescriptor};
use dss_router::{Call, CodeModule, DelegationRouter, OwnerPhase, RouterConfig, RouterError};
use dss_store::OwnerSnapshot;
use dss_types::{Address, ModuleId, OwnerId, Word, WordCodec};

use crate::error::{SdkError, SdkResult};
use crate::modules::receiver::ReceiverVariant;
use crate::modules::{balances, broken_counter, counter_v1, counter_v2, packing, receiver};

/// A router over an in-memory store with every sample module registered.
///
/// Modules are addressed by label (`"counter-v1"`, `"balances"`, ...).
pub struct Workbench {
    router: DelegationRouter,
    labels: BTreeMap<String, ModuleId>,
}

impl Workbench {
    /// Workbench with the default router configuration.
    pub fn new() -> SdkResult<Self> {
        Self::with_config(RouterConfig::default())
    }

    pub fn with_config(config: RouterConfig) -> SdkResult<Self> {
        let router = DelegationRouter::in_memory(config)?;
        let mut bench = Self {
            router,
            labels: BTreeMap::new(),
        };
        bench.register(counter_v1::module()?)?;
        bench.register(counter_v2::module()?)?;
        bench.register(broken_counter::module()?)?;
        bench.register(balances::module()?)?;
        bench.register(packing::module(false)?)?;
        bench.register(packing::module(true)?)?;
        for variant in ReceiverVariant::ALL {
            bench.register(receiver::module(variant)?)?;
        }
        Ok(bench)
    }

    /// Register an extra module next to the samples.
    pub fn register(&mut self, module: CodeModule) -> SdkResult<ModuleId> {
        let label = module.name().to_string();
        let id = self.router.register_module(module)?;
        debug!(%label, module = %id, "workbench module");
        self.labels.insert(label, id);
        Ok(id)
    }

    pub fn router(&self) -> &DelegationRouter {
        &self.router
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }

    pub fn module_id(&self, label: &str) -> SdkResult<ModuleId> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| SdkError::UnknownModule(label.to_string()))
    }

    pub fn descriptor(&self, label: &str) -> SdkResult<ModuleDescriptor> {
        let id = self.module_id(label)?;
        let module = self.router.module(&id).ok_or(RouterError::UnknownModule(id))?;
        Ok(ModuleDescriptor::clone(module.descriptor()))
    }

    // ---- Owners ----

    /// Create an owner administered by `admin` and bound to `label`.
    pub fn deploy(&self, admin: Address, label: &str) -> SdkResult<OwnerId> {
        let module = self.module_id(label)?;
        Ok(self.router.create_owner(admin, module)?)
    }

    pub fn phase(&self, owner: &OwnerId) -> SdkResult<OwnerPhase> {
        Ok(self.router.owner_phase(owner)?)
    }

    /// Label of the module `owner` is bound to, if it is one of ours.
    pub fn bound_label(&self, owner: &OwnerId) -> SdkResult<Option<String>> {
        let active = self.router.binding(owner)?.active_module;
        Ok(self
            .labels
            .iter()
            .find(|(_, id)| **id == active)
            .map(|(label, _)| label.clone()))
    }

    // ---- Calls ----

    pub fn call(
        &self,
        owner: &OwnerId,
        caller: Address,
        selector: &str,
        args: &[Word],
    ) -> SdkResult<Vec<Word>> {
        let call = Call::new(selector).with_args(args.iter().copied());
        self.send(owner, caller, &call)
    }

    /// Like [`Self::call`], returning the first output word.
    pub fn query(
        &self,
        owner: &OwnerId,
        caller: Address,
        selector: &str,
        args: &[Word],
    ) -> SdkResult<Word> {
        self.call(owner, caller, selector, args)?
            .first()
            .copied()
            .ok_or_else(|| SdkError::EmptyOutput(selector.to_string()))
    }

    pub fn send(&self, owner: &OwnerId, caller: Address, call: &Call) -> SdkResult<Vec<Word>> {
        Ok(self.router.dispatch(owner, caller, call)?)
    }

    // ---- Upgrades ----

    /// Rebind `owner` to `label`, running `init` (if any) in the upgrade
    /// phase.
    pub fn upgrade(
        &self,
        owner: &OwnerId,
        admin: Address,
        label: &str,
        init: Option<&str>,
    ) -> SdkResult<Vec<Word>> {
        let module = self.module_id(label)?;
        let init = init.map(Call::new).unwrap_or_default();
        Ok(self.router.rebind_with_init(owner, admin, module, &init)?)
    }

    /// Rebind without the layout guard.
    pub fn force_upgrade(&self, owner: &OwnerId, admin: Address, label: &str) -> SdkResult<()> {
        let module = self.module_id(label)?;
        Ok(self.router.rebind_unchecked(owner, admin, module)?)
    }

    // ---- Raw storage ----

    pub fn read_slot(&self, owner: &OwnerId, slot: impl Into<Word>) -> SdkResult<Word> {
        Ok(self.router.read_raw(owner, &slot.into())?)
    }

    /// Slots `0..count`.
    pub fn slots(&self, owner: &OwnerId, count: u64) -> SdkResult<Vec<Word>> {
        (0..count).map(|slot| self.read_slot(owner, slot)).collect()
    }

    /// Read a declared scalar through the layout of the bound module.
    pub fn read_variable(&self, owner: &OwnerId, name: &str) -> SdkResult<Word> {
        let var = self.bound_variable(owner, name)?;
        let word = self.read_slot(owner, var.slot_word())?;
        Ok(WordCodec::extract(&word, var.byte_offset, var.width)?)
    }

    fn bound_variable(&self, owner: &OwnerId, name: &str) -> SdkResult<VariableDescriptor> {
        let active = self.router.binding(owner)?.active_module;
        let module = self
            .router
            .module(&active)
            .ok_or(RouterError::UnknownModule(active))?;
        Ok(module.descriptor().require(name)?.clone())
    }

    // ---- Snapshots ----

    pub fn export(&self, owner: &OwnerId) -> SdkResult<OwnerSnapshot> {
        Ok(self.router.export_owner(owner)?)
    }

    pub fn import(&self, snapshot: &OwnerSnapshot) -> SdkResult<OwnerId> {
        self.router.import_owner(snapshot)?;
        Ok(snapshot.owner)
    }

    pub fn save_snapshot(&self, owner: &OwnerId, path: &Path) -> SdkResult<Word> {
        let snapshot = self.export(owner)?;
        snapshot.save(path)?;
        Ok(snapshot.digest()?)
    }

    pub fn load_snapshot(&self, path: &Path) -> SdkResult<OwnerId> {
        let snapshot = OwnerSnapshot::load(path)?;
        self.import(&snapshot)
    }
}

impl std::fmt::Debug for Workbench {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbench")
            .field("modules", &self.labels.keys().collect::<Vec<_>>())
            .field("owners", &self.router.owners().len())
            .finish()
    }
}
