// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tagged state of a component for one pass.
//!
//! The topology is computed once per component from the instance spec and handed to
//! every step. A step declares which [`Variant`] it belongs to; whether its resource
//! should exist is then `topology.wants(variant)`.

use std::fmt;

/// How a component is deployed in this pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    /// The component is turned off; none of its resources should exist
    Disabled,
    /// Single-instance deployment
    Standalone,
    /// Replicated deployment
    HighAvailability,
}

/// Which topologies a resource belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Variant {
    /// Exists whenever the component is enabled
    Any,
    /// Exists only in the standalone topology
    Standalone,
    /// Exists only in the high-availability topology
    HighAvailability,
}

impl Topology {
    #[must_use]
    pub fn new(enabled: bool, high_availability: bool) -> Self {
        match (enabled, high_availability) {
            (false, _) => Self::Disabled,
            (true, false) => Self::Standalone,
            (true, true) => Self::HighAvailability,
        }
    }

    #[must_use]
    pub fn is_enabled(self) -> bool {
        self != Self::Disabled
    }

    /// Whether a resource of `variant` belongs to this topology.
    #[must_use]
    pub fn wants(self, variant: Variant) -> bool {
        match (self, variant) {
            (Self::Disabled, _) => false,
            (_, Variant::Any)
            | (Self::Standalone, Variant::Standalone)
            | (Self::HighAvailability, Variant::HighAvailability) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disabled => "disabled",
            Self::Standalone => "standalone",
            Self::HighAvailability => "high-availability",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
#[path = "topology_tests.rs"]
mod topology_tests;
