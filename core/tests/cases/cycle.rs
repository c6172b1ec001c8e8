use std::sync::Arc;
use std::time::Duration;

use crate::common::{dev, robot, TestHarness};
use stagebridge_core::messages::PositionData;
use stagebridge_core::*;

fn timed_world(quit_time_ms: Option<u64>) -> TestHarness {
    TestHarness::from_description(WorldDescription {
        quit_time_ms,
        ..WorldDescription::with_models(vec![robot("marvin")])
    })
}

#[test]
fn test_world_stops_at_quit_time() {
    let h = timed_world(Some(300));
    assert_eq!(h.tick(), TickOutcome::Continue);
    assert_eq!(h.tick(), TickOutcome::Continue);
    assert_eq!(h.tick(), TickOutcome::Terminal);
    assert_eq!(h.world.sim_time_ms(), 300);

    // Terminal is sticky and time no longer advances.
    assert_eq!(h.tick(), TickOutcome::Terminal);
    assert_eq!(h.world.sim_time_ms(), 300);
    assert_eq!(h.world.updates(), 3);
}

#[test]
fn test_cycle_driver_runs_alongside_dispatch() {
    let h = timed_world(Some(1000));
    let stats = Arc::new(CycleStats::new().unwrap());
    let mut driver = h
        .subscribed_driver(&[("position:0", "marvin"), ("laser:0", "marvin")])
        .with_stats(Arc::clone(&stats));
    let client = driver.client(dev("position:0")).unwrap();
    let cruise = messages::PositionCommand::Velocity { vx: 0.5, vy: 0.0, va: 0.0 };
    client.send_command(&cruise).unwrap();
    assert!(driver.update().is_clean());

    let cycle = CycleDriver::new(Arc::clone(&h.world))
        .with_stats(Arc::clone(&stats))
        .spawn()
        .unwrap();
    while !cycle.is_finished() {
        let report = driver.update();
        assert!(report.is_clean(), "{:?}", report.failures);
        std::thread::sleep(Duration::from_millis(1));
    }
    cycle.join().unwrap();

    driver.update();
    assert_eq!(h.world.sim_time_ms(), 1000);
    assert_eq!(h.world.updates(), 10);

    let observation = client.latest().unwrap();
    assert_eq!(observation.sim_time_ms, 1000);
    let data: PositionData = observation.decode().unwrap();
    assert_eq!(data.velocity.vx, 0.5);
    assert!(data.odom.x > 0.0);

    let summary = stats.summary();
    assert_eq!(summary.ticks, 10);
    assert!(summary.dispatches >= 1);
}

#[test]
fn test_quit_request_ends_the_loop() {
    let h = TestHarness::from_description(WorldDescription {
        interval_real_ms: 5,
        ..WorldDescription::with_models(vec![robot("marvin")])
    });
    let cycle = CycleDriver::new(Arc::clone(&h.world)).spawn().unwrap();
    std::thread::sleep(Duration::from_millis(30));

    h.world.request_quit();
    cycle.join().unwrap();
    let updates = h.world.updates();
    assert_eq!(h.tick(), TickOutcome::Terminal);
    assert_eq!(h.world.updates(), updates);
}

#[test]
fn test_step_is_paced_by_caller() {
    let h = timed_world(None);
    let cycle = CycleDriver::new(Arc::clone(&h.world));
    for _ in 0..5 {
        assert_eq!(cycle.step(), TickOutcome::Continue);
    }
    assert_eq!(h.world.sim_time_ms(), 5 * DEFAULT_INTERVAL_SIM_MS);
}
