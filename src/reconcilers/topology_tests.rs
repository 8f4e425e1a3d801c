// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::reconcilers::topology::*;

    #[test]
    fn test_new_from_flags() {
        assert_eq!(Topology::new(false, true), Topology::Disabled);
        assert_eq!(Topology::new(true, false), Topology::Standalone);
        assert_eq!(Topology::new(true, true), Topology::HighAvailability);
    }

    #[test]
    fn test_disabled_wants_nothing() {
        for variant in [Variant::Any, Variant::Standalone, Variant::HighAvailability] {
            assert!(!Topology::Disabled.wants(variant));
        }
        assert!(!Topology::Disabled.is_enabled());
    }

    #[test]
    fn test_standalone_wants() {
        assert!(Topology::Standalone.wants(Variant::Any));
        assert!(Topology::Standalone.wants(Variant::Standalone));
        assert!(!Topology::Standalone.wants(Variant::HighAvailability));
    }

    #[test]
    fn test_high_availability_wants() {
        assert!(Topology::HighAvailability.wants(Variant::Any));
        assert!(!Topology::HighAvailability.wants(Variant::Standalone));
        assert!(Topology::HighAvailability.wants(Variant::HighAvailability));
    }

    #[test]
    fn test_display() {
        assert_eq!(Topology::HighAvailability.to_string(), "high-availability");
    }
}
