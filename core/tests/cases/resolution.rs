use std::collections::HashSet;

use crate::common::{model, TestHarness};
use stagebridge_core::*;

// R(basic) -> [A(position) -> [L1(laser)], L2(laser)]
fn nested() -> TestHarness {
    TestHarness::new(vec![model(ModelType::Basic, "R")
        .with_child(model(ModelType::Position, "A").with_child(model(ModelType::Laser, "L1")))
        .with_child(model(ModelType::Laser, "L2"))])
}

// R(basic) -> [P(position) -> [L1(laser), L2(laser)]]
fn scenario() -> TestHarness {
    TestHarness::new(vec![model(ModelType::Basic, "R").with_child(
        model(ModelType::Position, "P")
            .with_child(model(ModelType::Laser, "L1"))
            .with_child(model(ModelType::Laser, "L2")),
    )])
}

#[test]
fn test_preorder_prefers_deep_earlier_sibling() {
    let h = nested();
    let found = resolve(&h.world, "R", ModelType::Laser, &HashSet::new()).unwrap();
    assert_eq!(found, h.id("L1"));
}

#[test]
fn test_root_matches_itself() {
    let h = nested();
    let found = resolve(&h.world, "A", ModelType::Position, &HashSet::new()).unwrap();
    assert_eq!(found, h.id("A"));
}

#[test]
fn test_unknown_root_name() {
    let h = nested();
    let err = resolve(&h.world, "ghost", ModelType::Laser, &HashSet::new()).unwrap_err();
    assert!(matches!(err, Error::NameNotFound(ref n) if n == "ghost"));
    assert_eq!(err.code(), 1);
}

#[test]
fn test_no_entity_of_type() {
    let h = nested();
    let err = resolve(&h.world, "R", ModelType::Fiducial, &HashSet::new()).unwrap_err();
    assert!(matches!(err, Error::NotFound { model_type: ModelType::Fiducial, .. }));
}

#[test]
fn test_claimed_first_match_does_not_fall_through() {
    let h = scenario();
    let claimed: HashSet<EntityId> = [h.id("L1")].into_iter().collect();

    let err = resolve(&h.world, "R", ModelType::Laser, &claimed).unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }), "got {:?}", err);

    let found =
        resolve_with(&h.world, "R", ModelType::Laser, &claimed, ResolvePolicy::FirstUnclaimed)
            .unwrap();
    assert_eq!(found, h.id("L2"));
}

#[test]
fn test_two_lasers_need_first_unclaimed() {
    let h = scenario();
    let devices = [("position:0", "R"), ("laser:0", "R"), ("laser:1", "R")];

    let err = h.driver(&devices).err().expect("default policy stops at the claimed laser");
    match err {
        Error::ResolutionFailed { device, source } => {
            assert_eq!(device.to_string(), "6665:laser:1");
            assert!(matches!(*source, Error::NotFound { .. }));
        }
        other => panic!("unexpected error {:?}", other),
    }

    let driver = h.driver_with(&devices, ResolvePolicy::FirstUnclaimed).unwrap();
    assert_eq!(h.bound_entity(&driver, "position:0"), "P");
    assert_eq!(h.bound_entity(&driver, "laser:0"), "L1");
    assert_eq!(h.bound_entity(&driver, "laser:1"), "L2");

    let mut four = devices.to_vec();
    four.push(("laser:2", "R"));
    match h.driver_with(&four, ResolvePolicy::FirstUnclaimed).err() {
        Some(Error::ResolutionFailed { source, .. }) => {
            assert!(matches!(*source, Error::NotFound { .. }))
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_root_self_match_is_never_bound_twice() {
    let h = scenario();
    for policy in [ResolvePolicy::FirstMatch, ResolvePolicy::FirstUnclaimed] {
        let err = h
            .driver_with(&[("position:0", "P"), ("position:1", "P")], policy)
            .err()
            .expect("a second position device has nothing left to bind");
        assert!(matches!(err, Error::ResolutionFailed { .. }));
    }
}

#[test]
fn test_bindings_are_exclusive_across_tree_shapes() {
    let shapes: Vec<Vec<ModelDescription>> = vec![
        // flat
        vec![model(ModelType::Basic, "R")
            .with_child(model(ModelType::Laser, "a"))
            .with_child(model(ModelType::Laser, "b"))
            .with_child(model(ModelType::Laser, "c"))],
        // chain
        vec![model(ModelType::Laser, "R").with_child(
            model(ModelType::Laser, "a")
                .with_child(model(ModelType::Laser, "b").with_child(model(ModelType::Laser, "c"))),
        )],
        // mixed
        vec![model(ModelType::Position, "R")
            .with_child(model(ModelType::Basic, "x").with_child(model(ModelType::Laser, "a")))
            .with_child(model(ModelType::Laser, "b").with_child(model(ModelType::Laser, "c")))],
    ];

    for models in shapes {
        let h = TestHarness::new(models);
        let lasers =
            h.world.entities().iter().filter(|e| e.model_type == ModelType::Laser).count();

        // Every prefix of the declarations, under both policies: setup may
        // fail, but a set that exists never holds an entity twice.
        for wanted in 1..=lasers + 1 {
            let names: Vec<String> = (0..wanted).map(|i| format!("laser:{}", i)).collect();
            let devices: Vec<(&str, &str)> = names.iter().map(|d| (d.as_str(), "R")).collect();

            for policy in [ResolvePolicy::FirstMatch, ResolvePolicy::FirstUnclaimed] {
                let Ok(driver) = h.driver_with(&devices, policy) else {
                    assert!(
                        policy == ResolvePolicy::FirstMatch || wanted > lasers,
                        "{:?} failed with {} of {} lasers",
                        policy,
                        wanted,
                        lasers
                    );
                    continue;
                };
                assert!(wanted <= lasers);
                let bound: HashSet<EntityId> =
                    driver.bindings().iter().map(|b| b.entity).collect();
                assert_eq!(bound.len(), driver.bindings().len());
                assert_eq!(driver.bindings().len(), wanted);
                for binding in driver.bindings().iter() {
                    let entity = h.world.entity(binding.entity).unwrap();
                    assert_eq!(entity.model_type, ModelType::Laser);
                }
            }
        }
    }
}
