#[cfg(test)]
mod simulated_tests {
    use crate::alarm::{AlarmFired, SimulatedTimer, SuspendAwareTimer};
    use std::sync::mpsc::channel;
    use std::time::Duration;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_suspend_counts_toward_deadline() {
        let (tx, rx) = channel::<AlarmFired>();
        let mut timer = SimulatedTimer::new(tx);
        let handle = timer.arm(6 * HOUR).unwrap();

        // Four hours asleep, then one awake: not yet due
        assert_eq!(timer.suspend(4 * HOUR), None);
        assert_eq!(timer.advance(HOUR), None);
        assert!(rx.try_recv().is_err());
        assert_eq!(timer.remaining(), Some(HOUR));

        // The monotonic clock only saw one hour
        assert_eq!(timer.monotonic_elapsed(), HOUR);
        assert_eq!(timer.boot_elapsed(), 5 * HOUR);

        assert_eq!(timer.advance(HOUR), Some(handle));
        assert_eq!(rx.try_recv(), Ok(AlarmFired(handle)));
    }

    #[test]
    fn test_deadline_passing_during_suspend_fires_on_resume() {
        let (tx, rx) = channel::<AlarmFired>();
        let mut timer = SimulatedTimer::new(tx);
        let handle = timer.arm(6 * HOUR).unwrap();

        assert_eq!(timer.suspend(8 * HOUR), Some(handle));
        assert_eq!(rx.try_recv(), Ok(AlarmFired(handle)));
        assert!(!timer.is_live(handle));
    }

    #[test]
    fn test_does_not_fire_one_nanosecond_early() {
        let (tx, rx) = channel::<AlarmFired>();
        let mut timer = SimulatedTimer::new(tx);
        let handle = timer.arm(HOUR).unwrap();

        assert_eq!(timer.suspend(HOUR - Duration::from_nanos(1)), None);
        assert!(rx.try_recv().is_err());
        assert_eq!(timer.suspend(Duration::from_nanos(1)), Some(handle));
    }

    #[test]
    fn test_rearming_invalidates_previous_handle() {
        let (tx, rx) = channel::<AlarmFired>();
        let mut timer = SimulatedTimer::new(tx);
        let first = timer.arm(HOUR).unwrap();
        let second = timer.arm(2 * HOUR).unwrap();

        assert_ne!(first, second);
        assert!(!timer.is_live(first));
        assert!(timer.is_live(second));

        assert_eq!(timer.advance(HOUR), None);
        assert_eq!(timer.advance(HOUR), Some(second));
        assert_eq!(rx.try_recv(), Ok(AlarmFired(second)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let (tx, rx) = channel::<AlarmFired>();
        let mut timer = SimulatedTimer::new(tx);
        let handle = timer.arm(HOUR).unwrap();

        timer.cancel(handle);
        timer.cancel(handle);
        assert!(!timer.is_live(handle));
        assert_eq!(timer.advance(2 * HOUR), None);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_cancelling_stale_handle_keeps_current() {
        let (tx, _rx) = channel::<AlarmFired>();
        let mut timer = SimulatedTimer::new(tx);
        let stale = timer.arm(HOUR).unwrap();
        let current = timer.arm(HOUR).unwrap();

        timer.cancel(stale);
        assert!(timer.is_live(current));
    }

    #[test]
    fn test_failed_arm_leaves_nothing_pending() {
        let (tx, _rx) = channel::<AlarmFired>();
        let mut timer = SimulatedTimer::new(tx);
        let previous = timer.arm(HOUR).unwrap();

        timer.fail_next_arm();
        assert!(timer.arm(HOUR).is_err());
        assert!(!timer.is_live(previous));
        assert_eq!(timer.pending(), None);
    }
}

#[cfg(test)]
mod boottimer_tests {
    use crate::alarm::{AlarmFired, BootTimer, SuspendAwareTimer};
    use std::sync::mpsc::channel;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_fires_after_duration() {
        let (tx, rx) = channel::<AlarmFired>();
        let mut timer = BootTimer::new(tx).unwrap();
        let handle = timer.arm(Duration::from_millis(20)).unwrap();

        assert_eq!(rx.recv_timeout(WAIT), Ok(AlarmFired(handle)));
        assert!(!timer.is_live(handle));
    }

    #[test]
    fn test_only_latest_arm_fires() {
        let (tx, rx) = channel::<AlarmFired>();
        let mut timer = BootTimer::new(tx).unwrap();
        let first = timer.arm(Duration::from_millis(30)).unwrap();
        let second = timer.arm(Duration::from_millis(60)).unwrap();

        assert!(!timer.is_live(first));
        assert_eq!(rx.recv_timeout(WAIT), Ok(AlarmFired(second)));
        assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());
    }

    #[test]
    fn test_cancelled_timer_does_not_fire() {
        let (tx, rx) = channel::<AlarmFired>();
        let mut timer = BootTimer::new(tx).unwrap();
        let handle = timer.arm(Duration::from_millis(50)).unwrap();
        timer.cancel(handle);
        timer.cancel(handle);

        assert!(rx.recv_timeout(Duration::from_millis(250)).is_err());
    }

    #[test]
    fn test_zero_duration_still_fires() {
        let (tx, rx) = channel::<AlarmFired>();
        let mut timer = BootTimer::new(tx).unwrap();
        let handle = timer.arm(Duration::ZERO).unwrap();

        assert_eq!(rx.recv_timeout(WAIT), Ok(AlarmFired(handle)));
    }

    #[test]
    fn test_generations_increase() {
        let (tx, _rx) = channel::<AlarmFired>();
        let mut timer = BootTimer::new(tx).unwrap();
        let a = timer.arm(Duration::from_secs(60)).unwrap();
        let b = timer.arm(Duration::from_secs(60)).unwrap();
        assert!(b.generation() > a.generation());
    }

    #[test]
    fn test_drop_stops_waiter() {
        let (tx, rx) = channel::<AlarmFired>();
        let mut timer = BootTimer::new(tx).unwrap();
        timer.arm(Duration::from_secs(3600)).unwrap();
        drop(timer);

        // The waiter thread held the only sender clone
        assert!(matches!(
            rx.recv_timeout(WAIT),
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected)
        ));
    }

    #[test]
    fn test_boot_clock_has_resolution() {
        assert!(BootTimer::resolution().is_some());
    }
}
