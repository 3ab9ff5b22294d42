//! Discovery of secrets requested via object annotations.
//!
//! Secrets are requested by annotating the application object. The annotation
//! key carries a well-known prefix followed by the secret name, the value is
//! the path the secret should be mounted at, e.g.
//! `secret.spark-operator.k8s.io/my-secret: /etc/secrets/my-secret`.

use std::collections::BTreeMap;

use const_format::concatcp;

/// Domain shared by all annotation keys interpreted by the operator.
pub const ANNOTATION_DOMAIN: &str = "spark-operator.k8s.io";

/// Prefix of annotations requesting a general secret to be mounted.
/// The key suffix is the secret name, the value the desired mount path.
pub const GENERAL_SECRETS_ANNOTATION_PREFIX: &str = concatcp!("secret.", ANNOTATION_DOMAIN, "/");

/// Prefix of the annotation requesting a GCP service account secret. Such a
/// secret gets the additional treatment of wiring `GOOGLE_APPLICATION_CREDENTIALS`,
/// see [`crate::mounts::mount_service_account_secret`].
pub const GCP_SERVICE_ACCOUNT_ANNOTATION_PREFIX: &str =
    concatcp!("gcp-service-account.", ANNOTATION_DOMAIN, "/");

/// A secret requested by an annotation: the key suffix names the secret, the
/// value gives the path it should be mounted at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretRef {
    pub name: String,
    pub mount_path: String,
}

/// Returns the GCP service account secret requested by `annotations`, or
/// `None` if no key carries [`GCP_SERVICE_ACCOUNT_ANNOTATION_PREFIX`].
///
/// Only one service account secret is supported. Should several annotations
/// carry the prefix anyway, the one with the lexicographically smallest key
/// wins, since annotations are kept in a sorted map.
pub fn find_service_account_secret(annotations: &BTreeMap<String, String>) -> Option<SecretRef> {
    annotations.iter().find_map(|(key, value)| {
        key.strip_prefix(GCP_SERVICE_ACCOUNT_ANNOTATION_PREFIX)
            .map(|name| SecretRef {
                name: name.to_string(),
                mount_path: value.clone(),
            })
    })
}

/// Returns all general secrets requested by `annotations`, keyed by secret
/// name, with the desired mount path as value.
pub fn find_general_secrets(annotations: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    annotations
        .iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(GENERAL_SECRETS_ANNOTATION_PREFIX)
                .map(|name| (name.to_string(), value.clone()))
        })
        .collect()
}
