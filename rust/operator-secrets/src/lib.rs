//! Secret handling for Spark driver and executor pods.
//!
//! Users request secrets through annotations on the application object; this
//! crate discovers those requests and attaches the matching secret volumes,
//! volume mounts and environment variables to the pod specs the operator
//! builds. Secrets are only ever referenced by name here; resolving them is
//! left to the apiserver.

pub mod annotations;
pub mod mounts;

pub use annotations::{find_general_secrets, find_service_account_secret, SecretRef};
pub use mounts::{
    add_secret_volume, apply_secret_annotations, env_var_from_secret, mount_secret,
    mount_service_account_secret,
};
