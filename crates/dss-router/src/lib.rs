//! Delegation and upgrades for the Delegated Slot Store.
//!
//! A storage owner holds data; a [`CodeModule`] holds logic. The
//! [`DelegationRouter`] joins them per call: it reads the owner's binding
//! words, finds the module they name, and runs the selected handler with a
//! [`StorageContext`] bound to the owner and to the original caller.
//!
//! # Quick Start
//!
//! ```rust
//! use dss_layout::{Declaration, LayoutPlanner};
//! use dss_router::{Call, CodeModule, DelegationRouter, RouterConfig};
//! use dss_types::{Address, Word};
//!
//! let layout = LayoutPlanner::with_reserved(2)
//!     .declare(Declaration::uint("count", 256))
//!     .build()
//!     .unwrap();
//! let counter = CodeModule::named("counter", layout).operation("increment", |ctx| {
//!     let next = ctx.load("count")?.wrapping_add(Word::from_u64(1));
//!     ctx.store("count", next)?;
//!     Ok(vec![next])
//! });
//!
//! let router = DelegationRouter::in_memory(RouterConfig::default()).unwrap();
//! let module = router.register_module(counter).unwrap();
//! let admin = Address::from_bytes([1; 20]);
//! let owner = router.create_owner(admin, module).unwrap();
//! router.dispatch(&owner, admin, &Call::new("increment")).unwrap();
//! assert_eq!(router.read_raw(&owner, &Word::from_u64(2)).unwrap(), Word::from_u64(1));
//! ```

pub mod binding;
pub mod call;
pub mod config;
pub mod context;
pub mod error;
pub mod module;
pub mod phase;
pub mod router;
pub mod upgrade;

pub use binding::BindingWords;
pub use call::Call;
pub use config::{BindingLayout, RouterConfig};
pub use context::StorageContext;
pub use error::{OperationError, OperationResult, RouterError, RouterResult};
pub use module::{CodeModule, Handler, Route};
pub use phase::OwnerPhase;
pub use router::DelegationRouter;

#[cfg(test)]
mod tests {
    use super::*;
    use dss_layout::{Declaration, LayoutPlanner, LayoutViolationKind, ModuleDescriptor};
    use dss_types::{Address, ModuleId, OwnerId, Word, WordCodec};
    use std::sync::Arc;

    fn admin() -> Address {
        Address::from_bytes([0xad; 20])
    }

    fn user() -> Address {
        Address::from_bytes([0x11; 20])
    }

    fn counter_layout(reserved: u64, extra: bool) -> ModuleDescriptor {
        let mut planner = LayoutPlanner::with_reserved(reserved)
            .declare(Declaration::uint("count", 256))
            .declare(Declaration::address("owner"));
        if extra {
            planner = planner.declare(Declaration::uint("total", 256));
        }
        planner.build().unwrap()
    }

    fn increment(ctx: &mut StorageContext<'_>) -> OperationResult {
        let next = ctx.load("count")?.wrapping_add(Word::from_u64(1));
        ctx.store("count", next)?;
        Ok(vec![next])
    }

    fn get_count(ctx: &mut StorageContext<'_>) -> OperationResult {
        Ok(vec![ctx.load("count")?])
    }

    fn counter(name: &str, reserved: u64, extra: bool) -> CodeModule {
        CodeModule::named(name, counter_layout(reserved, extra))
            .operation("increment", increment)
            .operation("getCount", get_count)
            .operation("whoami", |ctx| Ok(vec![WordCodec::encode_address(&ctx.caller())]))
            .operation("failAfterWrite", |ctx| {
                ctx.store("count", 999u64)?;
                Err(OperationError::revert("boom"))
            })
    }

    fn v2() -> CodeModule {
        counter("v2", 2, true).operation("initialize", |ctx| {
            ctx.ensure(ctx.phase() == OwnerPhase::Upgrading, "not upgrading")?;
            ctx.store("total", ctx.arg(0)?)?;
            Ok(Vec::new())
        })
    }

    struct Fixture {
        router: DelegationRouter,
        v1: ModuleId,
        v2: ModuleId,
        broken: ModuleId,
        owner: OwnerId,
    }

    fn fixture(config: RouterConfig) -> Fixture {
        let router = DelegationRouter::in_memory(config).unwrap();
        let v1 = router.register_module(counter("v1", 2, false)).unwrap();
        let v2 = router.register_module(v2()).unwrap();
        let broken = router.register_module(counter("broken", 0, false)).unwrap();
        let owner = router.create_owner(admin(), v1).unwrap();
        Fixture {
            router,
            v1,
            v2,
            broken,
            owner,
        }
    }

    fn count(f: &Fixture) -> Word {
        f.router
            .dispatch(&f.owner, user(), &Call::new("getCount"))
            .unwrap()[0]
    }

    // -----------------------------------------------------------------------
    // 1. Dispatch resolves against the owner, not the module
    // -----------------------------------------------------------------------
    #[test]
    fn dispatch_writes_owner_storage() {
        let f = fixture(RouterConfig::default());
        f.router.dispatch(&f.owner, user(), &Call::new("increment")).unwrap();
        assert_eq!(
            f.router.read_raw(&f.owner, &Word::from_u64(2)).unwrap(),
            Word::from_u64(1)
        );
        assert_eq!(f.router.owner_phase(&f.owner).unwrap(), OwnerPhase::Active);
    }

    #[test]
    fn owners_sharing_a_module_keep_separate_storage() {
        let f = fixture(RouterConfig::default());
        let second = f.router.create_owner(admin(), f.v1).unwrap();
        assert_ne!(second, f.owner);
        for _ in 0..5 {
            f.router.dispatch(&f.owner, user(), &Call::new("increment")).unwrap();
        }
        for _ in 0..3 {
            f.router.dispatch(&second, user(), &Call::new("increment")).unwrap();
        }
        assert_eq!(count(&f), Word::from_u64(5));
        let other = f.router.dispatch(&second, user(), &Call::new("getCount")).unwrap();
        assert_eq!(other[0], Word::from_u64(3));
    }

    #[test]
    fn caller_identity_is_preserved() {
        let f = fixture(RouterConfig::default());
        let out = f.router.dispatch(&f.owner, user(), &Call::new("whoami")).unwrap();
        assert_eq!(WordCodec::decode_address(&out[0]), user());
    }

    #[test]
    fn new_owner_starts_uninitialized() {
        let f = fixture(RouterConfig::default());
        assert_eq!(
            f.router.owner_phase(&f.owner).unwrap(),
            OwnerPhase::Uninitialized
        );
        let binding = f.router.binding(&f.owner).unwrap();
        assert_eq!(binding.active_module, f.v1);
        assert_eq!(binding.admin, admin());
    }

    // -----------------------------------------------------------------------
    // 2. Routing failures and rollback
    // -----------------------------------------------------------------------
    #[test]
    fn unknown_selector_is_unroutable() {
        let f = fixture(RouterConfig::default());
        let before = f.router.export_owner(&f.owner).unwrap();
        let err = f
            .router
            .dispatch(&f.owner, user(), &Call::new("nonExistentFunction"))
            .unwrap_err();
        assert!(matches!(err, RouterError::UnroutableCall { .. }));
        assert_eq!(f.router.export_owner(&f.owner).unwrap(), before);
    }

    #[test]
    fn failed_operation_rolls_back() {
        let f = fixture(RouterConfig::default());
        f.router.dispatch(&f.owner, user(), &Call::new("increment")).unwrap();
        let err = f
            .router
            .dispatch(&f.owner, user(), &Call::new("failAfterWrite"))
            .unwrap_err();
        assert!(matches!(err, RouterError::OperationFailed { ref operation, .. } if operation == "failAfterWrite"));
        assert_eq!(count(&f), Word::from_u64(1));
    }

    #[test]
    fn too_many_arguments() {
        let config = RouterConfig {
            max_call_args: 1,
            ..Default::default()
        };
        let f = fixture(config);
        let call = Call::new("increment").with_arg(1u64).with_arg(2u64);
        assert!(matches!(
            f.router.dispatch(&f.owner, user(), &call),
            Err(RouterError::TooManyArgs { count: 2, max: 1 })
        ));
    }

    #[test]
    fn unknown_owner() {
        let f = fixture(RouterConfig::default());
        let ghost = OwnerId::derive(&user(), 99);
        assert!(matches!(
            f.router.dispatch(&ghost, user(), &Call::new("increment")),
            Err(RouterError::UnknownOwner(_))
        ));
    }

    #[test]
    fn duplicate_module_is_rejected() {
        let f = fixture(RouterConfig::default());
        assert!(matches!(
            f.router.register_module(counter("v1", 2, false)),
            Err(RouterError::DuplicateModule(_))
        ));
    }

    #[test]
    fn owner_needs_registered_module() {
        let f = fixture(RouterConfig::default());
        assert!(matches!(
            f.router.create_owner(admin(), ModuleId::derive("nope")),
            Err(RouterError::UnknownModule(_))
        ));
    }

    // -----------------------------------------------------------------------
    // 3. Upgrades
    // -----------------------------------------------------------------------
    #[test]
    fn upgrade_preserves_data() {
        let f = fixture(RouterConfig::default());
        for _ in 0..12 {
            f.router.dispatch(&f.owner, user(), &Call::new("increment")).unwrap();
        }
        let before = f.router.export_owner(&f.owner).unwrap();
        f.router.rebind(&f.owner, admin(), f.v2).unwrap();
        let after = f.router.export_owner(&f.owner).unwrap();

        assert_eq!(count(&f), Word::from_u64(12));
        assert_eq!(f.router.binding(&f.owner).unwrap().active_module, f.v2);
        let changed: Vec<_> = after
            .slots
            .iter()
            .filter(|(slot, value)| before.slots.get(*slot) != Some(*value))
            .map(|(slot, _)| *slot)
            .collect();
        assert_eq!(changed, vec![Word::from_u64(0)]);
    }

    #[test]
    fn rebind_requires_admin() {
        let f = fixture(RouterConfig::default());
        let err = f.router.rebind(&f.owner, user(), f.v2).unwrap_err();
        assert!(matches!(err, RouterError::NotAuthorized { requester, .. } if requester == user()));
        assert_eq!(f.router.binding(&f.owner).unwrap().active_module, f.v1);
    }

    #[test]
    fn rebind_to_unknown_module() {
        let f = fixture(RouterConfig::default());
        assert!(matches!(
            f.router.rebind(&f.owner, admin(), ModuleId::derive("ghost")),
            Err(RouterError::UnknownModule(_))
        ));
    }

    #[test]
    fn guard_rejects_incompatible_layout() {
        let f = fixture(RouterConfig::default());
        let err = f.router.rebind(&f.owner, admin(), f.broken).unwrap_err();
        match err {
            RouterError::LayoutIncompatible { report, .. } => {
                assert!(report
                    .violations
                    .iter()
                    .any(|v| v.variable == "count" && v.kind == LayoutViolationKind::Moved));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(f.router.binding(&f.owner).unwrap().active_module, f.v1);
    }

    #[test]
    fn compatibility_preview() {
        let f = fixture(RouterConfig::default());
        assert!(f.router.compatibility(&f.owner, &f.v2).unwrap().is_compatible());
        assert!(!f.router.compatibility(&f.owner, &f.broken).unwrap().is_compatible());
    }

    #[test]
    fn broken_layout_corrupts_binding() {
        let f = fixture(RouterConfig::unguarded());
        f.router.dispatch(&f.owner, user(), &Call::new("increment")).unwrap();
        f.router.rebind(&f.owner, admin(), f.broken).unwrap();

        // The broken module's "count" is slot 0: the module id word.
        let slot0 = f.router.read_raw(&f.owner, &Word::ZERO).unwrap();
        let seen = count(&f);
        assert_eq!(seen, slot0);
        assert_ne!(seen, Word::from_u64(1));

        f.router.dispatch(&f.owner, user(), &Call::new("increment")).unwrap();
        let corrupted = f.router.read_raw(&f.owner, &Word::ZERO).unwrap();
        assert_eq!(corrupted, slot0.wrapping_add(Word::from_u64(1)));

        assert!(matches!(
            f.router.dispatch(&f.owner, user(), &Call::new("getCount")),
            Err(RouterError::UnknownModule(_))
        ));
        assert_eq!(f.router.owner_phase(&f.owner).unwrap(), OwnerPhase::Broken);
    }

    #[test]
    fn unchecked_rebind_bypasses_guard() {
        let f = fixture(RouterConfig::default());
        f.router.rebind_unchecked(&f.owner, admin(), f.broken).unwrap();
        assert_eq!(f.router.binding(&f.owner).unwrap().active_module, f.broken);
    }

    #[test]
    fn rebind_with_init_runs_in_upgrading_phase() {
        let f = fixture(RouterConfig::default());
        let init = Call::new("initialize").with_arg(7u64);
        f.router.rebind_with_init(&f.owner, admin(), f.v2, &init).unwrap();
        assert_eq!(
            f.router.read_raw(&f.owner, &Word::from_u64(4)).unwrap(),
            Word::from_u64(7)
        );
        assert_eq!(f.router.owner_phase(&f.owner).unwrap(), OwnerPhase::Active);
    }

    #[test]
    fn rebind_with_failing_init_rolls_back() {
        let f = fixture(RouterConfig::default());
        f.router.dispatch(&f.owner, user(), &Call::new("increment")).unwrap();
        let before = f.router.export_owner(&f.owner).unwrap();
        let err = f
            .router
            .rebind_with_init(&f.owner, admin(), f.v2, &Call::new("nonExistentFunction"))
            .unwrap_err();
        assert!(matches!(err, RouterError::UnroutableCall { .. }));
        assert_eq!(f.router.export_owner(&f.owner).unwrap(), before);

        let err = f
            .router
            .rebind_with_init(&f.owner, admin(), f.v2, &Call::new("failAfterWrite"))
            .unwrap_err();
        assert!(matches!(err, RouterError::OperationFailed { .. }));
        assert_eq!(f.router.export_owner(&f.owner).unwrap(), before);
        assert_eq!(f.router.owner_phase(&f.owner).unwrap(), OwnerPhase::Active);
    }

    #[test]
    fn rebind_with_empty_init_skips_initialisation() {
        let f = fixture(RouterConfig::default());
        let out = f
            .router
            .rebind_with_init(&f.owner, admin(), f.v2, &Call::bare())
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(f.router.binding(&f.owner).unwrap().active_module, f.v2);
    }

    #[test]
    fn change_admin_moves_authority() {
        let f = fixture(RouterConfig::default());
        f.router.change_admin(&f.owner, admin(), user()).unwrap();
        assert!(f.router.rebind(&f.owner, admin(), f.v2).is_err());
        f.router.rebind(&f.owner, user(), f.v2).unwrap();
        assert!(matches!(
            f.router.change_admin(&f.owner, admin(), admin()),
            Err(RouterError::NotAuthorized { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // 4. Snapshots
    // -----------------------------------------------------------------------
    #[test]
    fn export_import_roundtrip() {
        let f = fixture(RouterConfig::default());
        f.router.dispatch(&f.owner, user(), &Call::new("increment")).unwrap();
        let snap = f.router.export_owner(&f.owner).unwrap();

        let other = DelegationRouter::in_memory(RouterConfig::default()).unwrap();
        other.register_module(counter("v1", 2, false)).unwrap();
        other.import_owner(&snap).unwrap();
        assert_eq!(other.export_owner(&f.owner).unwrap(), snap);
        let out = other.dispatch(&f.owner, user(), &Call::new("getCount")).unwrap();
        assert_eq!(out[0], Word::from_u64(1));
        assert!(matches!(
            other.import_owner(&snap),
            Err(RouterError::OwnerExists(_))
        ));
    }

    #[test]
    fn export_records_combine_version() {
        let f = fixture(RouterConfig::default());
        let snap = f.router.export_owner(&f.owner).unwrap();
        assert_eq!(snap.combine, f.router.address_space().version());

        let json = snap.to_json().unwrap().replace("Keccak256V1", "Keccak256V2");
        assert!(dss_store::OwnerSnapshot::from_json(&json).is_err());
    }

    #[test]
    fn import_rejects_inconsistent_binding() {
        let f = fixture(RouterConfig::default());
        let mut snap = f.router.export_owner(&f.owner).unwrap();
        snap.binding.admin = user();
        let other = DelegationRouter::in_memory(RouterConfig::default()).unwrap();
        assert!(matches!(
            other.import_owner(&snap),
            Err(RouterError::SnapshotMismatch(_))
        ));
    }

    // -----------------------------------------------------------------------
    // 5. Concurrency
    // -----------------------------------------------------------------------
    #[test]
    fn concurrent_dispatch_on_one_owner_is_linearized() {
        let f = fixture(RouterConfig::default());
        let router = Arc::new(f.router);
        let owner = f.owner;
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let router = Arc::clone(&router);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        router.dispatch(&owner, user(), &Call::new("increment")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let out = router.dispatch(&owner, user(), &Call::new("getCount")).unwrap();
        assert_eq!(out[0], Word::from_u64(400));
    }

    // -----------------------------------------------------------------------
    // 6. Properties
    // -----------------------------------------------------------------------
    fn scribble(ctx: &mut StorageContext<'_>) -> OperationResult {
        let args = ctx.call().args.clone();
        for pair in args.chunks(2) {
            if let [slot, value] = pair {
                ctx.sstore(*slot, *value);
            }
        }
        if ctx.call().value.is_zero() {
            Ok(Vec::new())
        } else {
            Err(OperationError::revert("asked to fail"))
        }
    }

    proptest::proptest! {
        #[test]
        fn failed_dispatch_never_touches_storage(
            writes in proptest::collection::vec((0u64..64, 1u64..1_000), 1..8)
        ) {
            let router = DelegationRouter::in_memory(RouterConfig::default()).unwrap();
            let module = CodeModule::named("scribbler", ModuleDescriptor::empty())
                .operation("scribble", scribble);
            let module = router.register_module(module).unwrap();
            let owner = router.create_owner(admin(), module).unwrap();
            let before = router.export_owner(&owner).unwrap();

            let args = writes
                .iter()
                .flat_map(|(slot, value)| [Word::from_u64(*slot), Word::from_u64(*value)]);
            let call = Call::new("scribble").with_args(args).with_value(1u64);
            proptest::prop_assert!(router.dispatch(&owner, user(), &call).is_err());
            proptest::prop_assert_eq!(router.export_owner(&owner).unwrap(), before);
        }
    }
}
