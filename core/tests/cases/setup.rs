use crate::common::{dev, robot, TestHarness};
use stagebridge_core::*;

#[test]
fn test_failed_setup_leaves_nothing_behind() {
    let h = TestHarness::new(vec![robot("marvin")]);

    let err = h
        .driver(&[("position:0", "marvin"), ("laser:0", "marvin"), ("fiducial:0", "ghost")])
        .err()
        .expect("third device cannot resolve");
    match err {
        Error::ResolutionFailed { device, source } => {
            assert_eq!(device, dev("fiducial:0"));
            assert!(matches!(*source, Error::NameNotFound(_)));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(h.total_subscriptions(), 0);

    // Entities tried by the failed attempt are free for the next one.
    let driver = h.driver(&[("position:0", "marvin"), ("laser:0", "marvin")]).unwrap();
    assert_eq!(driver.bindings().len(), 2);
}

#[test]
fn test_unsupported_interface_fails_setup() {
    let h = TestHarness::new(vec![robot("marvin")]);
    let err = h.driver(&[("position:0", "marvin"), ("6665:3:0", "marvin")]).err().unwrap();
    assert!(matches!(err, Error::UnsupportedInterface(3)));
    assert_eq!(err.code(), 3);
}

#[test]
fn test_duplicate_device_fails_setup() {
    let h = TestHarness::new(vec![robot("marvin")]);
    let err = h.driver(&[("laser:0", "marvin"), ("laser:0", "marvin")]).err().unwrap();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_bindings_keep_declaration_order() {
    let h = TestHarness::new(vec![robot("marvin")]);
    let driver = h
        .driver(&[("fiducial:0", "marvin"), ("position:0", "marvin"), ("laser:0", "marvin")])
        .unwrap();
    let order: Vec<String> = driver.bindings().iter().map(|b| b.device.to_string()).collect();
    assert_eq!(order, ["6665:fiducial:0", "6665:position:0", "6665:laser:0"]);
    assert!(driver.bindings().iter().all(|b| !b.is_active()));
}

#[test]
fn test_simulation_device_is_passthrough() {
    let h = TestHarness::new(vec![robot("marvin")]);
    let mut driver = h.driver(&[("simulation:0", "anything"), ("laser:0", "marvin")]).unwrap();

    assert_eq!(driver.bindings().len(), 1);
    assert_eq!(driver.bindings().passthrough(), &[dev("simulation:0")]);
    assert!(driver.bindings().contains(dev("simulation:0")));

    driver.subscribe(dev("simulation:0")).unwrap();
    driver.unsubscribe(dev("simulation:0")).unwrap();
    assert_eq!(h.total_subscriptions(), 0);
    assert!(matches!(driver.client(dev("simulation:0")), Err(Error::UnknownDevice(_))));
}

#[test]
fn test_subscribe_unknown_device() {
    let h = TestHarness::new(vec![robot("marvin")]);
    let mut driver = h.driver(&[("laser:0", "marvin")]).unwrap();

    assert!(matches!(driver.subscribe(dev("laser:1")), Err(Error::UnknownDevice(_))));
    assert!(matches!(driver.unsubscribe(dev("position:0")), Err(Error::UnknownDevice(_))));
    assert_eq!(h.total_subscriptions(), 0);
}

#[test]
fn test_subscription_is_idempotent_per_binding() {
    let h = TestHarness::new(vec![robot("marvin")]);
    let mut driver = h.driver(&[("laser:0", "marvin")]).unwrap();

    driver.subscribe(dev("laser:0")).unwrap();
    driver.subscribe(dev("laser:0")).unwrap();
    assert_eq!(h.subscriptions("marvin.laser"), 1);

    driver.unsubscribe(dev("laser:0")).unwrap();
    driver.unsubscribe(dev("laser:0")).unwrap();
    assert_eq!(h.subscriptions("marvin.laser"), 0);
}

#[test]
fn test_drivers_share_entity_subscriptions() {
    let h = TestHarness::new(vec![robot("marvin")]);
    let mut first = h.subscribed_driver(&[("laser:0", "marvin")]);
    let mut second = h.subscribed_driver(&[("laser:0", "marvin")]);
    assert_eq!(h.subscriptions("marvin.laser"), 2);

    first.shutdown();
    assert_eq!(h.subscriptions("marvin.laser"), 1);
    second.shutdown();
    assert_eq!(h.subscriptions("marvin.laser"), 0);
}

#[test]
fn test_shutdown_releases_everything() {
    let h = TestHarness::new(vec![robot("marvin")]);
    let mut driver = h.subscribed_driver(&[
        ("position:0", "marvin"),
        ("laser:0", "marvin"),
        ("fiducial:0", "marvin"),
    ]);
    assert_eq!(h.total_subscriptions(), 3);

    driver.shutdown();
    assert_eq!(h.total_subscriptions(), 0);
    assert!(driver.bindings().iter().all(|b| !b.is_active()));
}

#[test]
fn test_auto_names_follow_parent() {
    let h = TestHarness::new(vec![ModelDescription::new(ModelType::Position)
        .named("r2")
        .with_child(ModelDescription::new(ModelType::Laser))
        .with_child(ModelDescription::new(ModelType::Laser))]);
    assert!(h.world.lookup("r2.laser:0").is_some());
    assert!(h.world.lookup("r2.laser:1").is_some());
    assert_eq!(h.world.roots(), &[h.id("r2")]);
}

#[test]
fn test_duplicate_entity_names_are_rejected() {
    let desc = WorldDescription::with_models(vec![robot("marvin"), robot("marvin")]);
    assert!(matches!(World::from_description(&desc), Err(Error::DuplicateName(_))));
}
