use bonsai_core::Timer;

#[test]
fn counts_down_and_fires_once() {
    let mut timer = Timer::new(1.0);
    timer.start();
    assert!(timer.is_running());

    assert!(!timer.update(0.4));
    assert!((timer.time_left() - 0.6).abs() < 1e-6);
    assert!(timer.update(0.6));
    assert!(timer.is_done());
    assert!(!timer.update(1.0));
}

#[test]
fn auto_restart_rearms_on_timeout() {
    let mut timer = Timer::new(0.5).with_auto_restart(true);
    timer.start();

    assert!(timer.update(0.5));
    assert!(timer.is_running());
    assert!((timer.time_left() - 0.5).abs() < 1e-6);
    assert!(timer.update(0.5));
}

#[test]
fn zero_and_negative_deltas_do_not_advance() {
    let mut timer = Timer::new(1.0);
    timer.start();
    assert!(!timer.update(0.0));
    assert!(!timer.update(-3.0));
    assert_eq!(timer.time_left(), 1.0);
}

#[test]
fn same_seed_same_deviation() {
    let mut a = Timer::new(2.0).with_deviation(0.5).with_seed(42);
    let mut b = Timer::new(2.0).with_deviation(0.5).with_seed(42);
    for _ in 0..8 {
        a.start();
        b.start();
        assert_eq!(a.time_left(), b.time_left());
    }
}

#[test]
fn stop_marks_done() {
    let mut timer = Timer::new(3.0);
    timer.start();
    timer.stop();
    assert!(timer.is_done());
}
