//! Unit tests for xing-core primitives.

#[cfg(test)]
mod ids {
    use crate::{LaneId, NodeId, VehicleId};

    #[test]
    fn index_roundtrip() {
        let id = LaneId(7);
        assert_eq!(id.index(), 7);
        assert_eq!(LaneId::try_from(7usize).unwrap(), id);
    }

    #[test]
    fn ordering() {
        assert!(NodeId(0) < NodeId(1));
        assert!(VehicleId(100) > VehicleId(99));
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(NodeId::INVALID.0, u32::MAX);
        assert_eq!(LaneId::INVALID.0, u32::MAX);
        assert_eq!(VehicleId::INVALID.0, u64::MAX);
    }

    #[test]
    fn display() {
        assert_eq!(NodeId(3).to_string(), "NodeId(3)");
        assert_eq!(VehicleId(12).to_string(), "VehicleId(12)");
    }

    #[test]
    fn oversized_conversion_fails() {
        assert!(NodeId::try_from(usize::MAX).is_err());
    }
}

#[cfg(test)]
mod time {
    use crate::Tick;

    #[test]
    fn tick_arithmetic() {
        let t = Tick(10);
        assert_eq!(t + 5, Tick(15));
        assert_eq!(t.offset(3), Tick(13));
        assert_eq!(Tick(15) - Tick(10), 5u64);
        assert_eq!(Tick(15).since(Tick(10)), 5);
    }

    #[test]
    fn add_assign_advances() {
        let mut t = Tick::ZERO;
        t += 1;
        t += 2;
        assert_eq!(t, Tick(3));
    }

    #[test]
    fn saturating_since_clamps() {
        assert_eq!(Tick(5).saturating_since(Tick(9)), 0);
        assert_eq!(Tick(9).saturating_since(Tick(5)), 4);
    }

    #[test]
    fn display() {
        assert_eq!(Tick(42).to_string(), "T42");
    }
}

#[cfg(test)]
mod config {
    use std::time::Duration;

    use crate::ControlConfig;

    #[test]
    fn default_cadence_is_ten_ticks_per_second() {
        let cfg = ControlConfig::default();
        assert_eq!(cfg.tick_interval, Duration::from_millis(100));
        assert!(cfg.admission_poll < cfg.tick_interval);
    }

    #[test]
    fn with_tick_interval_keeps_poll() {
        let cfg = ControlConfig::with_tick_interval(Duration::from_millis(5));
        assert_eq!(cfg.tick_interval, Duration::from_millis(5));
        assert_eq!(cfg.admission_poll, ControlConfig::default().admission_poll);
    }
}
