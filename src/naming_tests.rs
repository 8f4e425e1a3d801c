// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::constants::MAX_RESOURCE_NAME_LENGTH;
    use crate::labels::*;
    use crate::naming::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_unique_resource_name_concatenates_inputs() {
        let name = unique_resource_name("demo", "ns1", "applicationset-controller");
        assert_eq!(name, "demo-ns1-applicationset-controller");
    }

    #[test]
    fn test_unique_resource_name_is_deterministic() {
        let first = unique_resource_name("demo", "ns1", "server");
        let second = unique_resource_name("demo", "ns1", "server");
        assert_eq!(first, second);
    }

    #[test]
    fn test_unique_resource_name_differs_per_namespace() {
        assert_ne!(
            unique_resource_name("demo", "ns1", "server"),
            unique_resource_name("demo", "ns2", "server")
        );
    }

    #[test]
    fn test_long_names_are_shortened_with_digest() {
        let instance = "a".repeat(40);
        let namespace = "b".repeat(40);

        let name = unique_resource_name(&instance, &namespace, "applicationset-controller");

        assert_eq!(name.len(), MAX_RESOURCE_NAME_LENGTH);
        assert!(name.starts_with(&instance));
        let (_, hash) = name.rsplit_once('-').unwrap();
        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(
            name,
            unique_resource_name(&instance, &namespace, "applicationset-controller"),
            "shortened names must be stable"
        );
    }

    #[test]
    fn test_shortened_names_keep_distinct_inputs_distinct() {
        let namespace = "n".repeat(60);
        let repo = unique_resource_name("demo", &namespace, "repo-server");
        let server = unique_resource_name("demo", &namespace, "server");
        assert_ne!(repo, server);
    }

    #[test]
    fn test_shortened_name_never_has_double_dash_before_digest() {
        // the separator after the instance name is the last character kept
        let instance = "x".repeat(53);
        let name = name_with_suffix(&instance, "redis-ha-haproxy");
        assert!(!name.contains("--"), "got {name}");
    }

    #[test]
    fn test_name_with_suffix() {
        assert_eq!(name_with_suffix("demo", "redis-ha"), "demo-redis-ha");
    }

    #[test]
    fn test_peer_base_name_leaves_room_for_index() {
        assert_eq!(peer_base_name("demo", "redis-ha-server"), "demo-redis-ha-server");

        let long = "a".repeat(50);
        let base = peer_base_name(&long, "redis-ha-server");
        assert!(base.len() <= 59);
        assert_eq!(indexed_name(&base, 999), format!("{base}-999"));
    }

    #[test]
    fn test_indexed_name() {
        assert_eq!(
            indexed_name("demo-redis-ha-announce", 2),
            "demo-redis-ha-announce-2"
        );
    }

    #[test]
    fn test_default_labels() {
        let labels = default_labels("demo-redis", "demo", "redis");

        assert_eq!(labels.get(K8S_NAME).unwrap(), "demo-redis");
        assert_eq!(labels.get(K8S_PART_OF).unwrap(), PART_OF_ARGOCD);
        assert_eq!(labels.get(K8S_COMPONENT).unwrap(), "redis");
        assert_eq!(labels.get(K8S_MANAGED_BY).unwrap(), MANAGED_BY_OPERATOR);
        assert_eq!(labels.get(K8S_INSTANCE).unwrap(), "demo");
        assert_eq!(labels.len(), 5);
    }

    #[test]
    fn test_default_annotations() {
        let annotations = default_annotations("demo", "ns1");

        assert_eq!(annotations.get(INSTANCE_NAME_ANNOTATION).unwrap(), "demo");
        assert_eq!(annotations.get(INSTANCE_NAMESPACE_ANNOTATION).unwrap(), "ns1");
    }

    #[test]
    fn test_component_selector_is_subset_of_default_labels() {
        let labels = default_labels("demo-server", "demo", "server");
        let selector = component_selector("demo", "server");

        for (key, value) in &selector {
            assert_eq!(labels.get(key), Some(value), "selector key {key} must match");
        }
    }

    #[test]
    fn test_merge_maps_user_values_win() {
        let defaults = default_labels("demo-server", "demo", "server");
        let mut overrides = BTreeMap::new();
        overrides.insert(K8S_PART_OF.to_string(), "platform".to_string());
        overrides.insert("team".to_string(), "gitops".to_string());

        let merged = merge_maps(&defaults, &overrides);

        assert_eq!(merged.get(K8S_PART_OF).unwrap(), "platform");
        assert_eq!(merged.get("team").unwrap(), "gitops");
        assert_eq!(merged.get(K8S_NAME).unwrap(), "demo-server");
    }
}
