// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::labels::SERVING_CERT_SECRET_ANNOTATION;
    use crate::reconcilers::toggles::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    const KEY: &str = SERVING_CERT_SECRET_ANNOTATION;

    fn meta_with(value: Option<&str>) -> ObjectMeta {
        let mut annotations = BTreeMap::new();
        annotations.insert("keep".to_string(), "me".to_string());
        if let Some(v) = value {
            annotations.insert(KEY.to_string(), v.to_string());
        }
        ObjectMeta {
            annotations: Some(annotations),
            ..Default::default()
        }
    }

    #[test]
    fn test_enable_adds_missing_annotation() {
        let mut meta = ObjectMeta::default();

        assert!(apply_toggle(&mut meta, KEY, "argocd-redis-tls", true));
        assert_eq!(
            meta.annotations.unwrap().get(KEY).map(String::as_str),
            Some("argocd-redis-tls")
        );
    }

    #[test]
    fn test_enable_corrects_wrong_value() {
        let mut meta = meta_with(Some("other-secret"));

        assert!(apply_toggle(&mut meta, KEY, "argocd-redis-tls", true));
        assert_eq!(
            meta.annotations.as_ref().unwrap().get(KEY).unwrap(),
            "argocd-redis-tls"
        );
    }

    #[test]
    fn test_enable_when_correct_is_unchanged() {
        let mut meta = meta_with(Some("argocd-redis-tls"));
        let before = meta.clone();

        assert!(!apply_toggle(&mut meta, KEY, "argocd-redis-tls", true));
        assert_eq!(meta, before);
    }

    #[test]
    fn test_disable_removes_only_toggle_key() {
        let mut meta = meta_with(Some("argocd-redis-tls"));

        assert!(apply_toggle(&mut meta, KEY, "argocd-redis-tls", false));
        let annotations = meta.annotations.unwrap();
        assert!(!annotations.contains_key(KEY));
        assert_eq!(annotations.get("keep").unwrap(), "me");
    }

    #[test]
    fn test_disable_when_absent_is_unchanged() {
        let mut meta = ObjectMeta::default();
        assert!(!apply_toggle(&mut meta, KEY, "argocd-redis-tls", false));
        assert!(meta.annotations.is_none(), "no annotation map must be created");

        let mut meta = meta_with(None);
        assert!(!apply_toggle(&mut meta, KEY, "argocd-redis-tls", false));
    }

    #[test]
    fn test_apply_toggles_reports_any_change() {
        let mut meta = ObjectMeta::default();
        let toggles = vec![
            Toggle::auto_tls("argocd-server-tls", true),
            Toggle {
                key: "example.com/other",
                value: "x".to_string(),
                enabled: false,
            },
        ];

        assert!(apply_toggles(&mut meta, &toggles));
        assert!(!apply_toggles(&mut meta, &toggles), "second application is a no-op");
    }

    #[test]
    fn test_auto_tls_toggle_uses_serving_cert_annotation() {
        let toggle = Toggle::auto_tls("argocd-repo-server-tls", true);
        assert_eq!(toggle.key, SERVING_CERT_SECRET_ANNOTATION);
        assert_eq!(toggle.value, "argocd-repo-server-tls");
        assert!(toggle.enabled);
    }
}
