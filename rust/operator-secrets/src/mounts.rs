//! Attaching secret volumes to pod specs and mounting them into containers.
//!
//! These are mechanical builders: nothing here checks that a referenced
//! secret exists, that volume names are unique or that mount paths do not
//! collide. The apiserver's validation catches all of that when the pod is
//! submitted.

use std::collections::BTreeMap;

use snafu::{ensure, Snafu};
use stackable_operator::{
    k8s_openapi::api::core::v1::{
        Container, EnvVar, EnvVarSource, PodSpec, SecretKeySelector, SecretVolumeSource, Volume,
        VolumeMount,
    },
    logging::controller::ReconcilerError,
};
use strum::{EnumDiscriminants, IntoStaticStr};

use crate::annotations::{
    self, SecretRef, GCP_SERVICE_ACCOUNT_ANNOTATION_PREFIX, GENERAL_SECRETS_ANNOTATION_PREFIX,
};

/// Environment variable used by the Application Default Credentials
/// mechanism, see <https://developers.google.com/identity/protocols/application-default-credentials>.
pub const GOOGLE_APPLICATION_CREDENTIALS_ENV_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";
/// Name of the key file expected inside the service account secret volume.
/// Appended to the volume's mount path to form the value of
/// [`GOOGLE_APPLICATION_CREDENTIALS_ENV_VAR`].
pub const SERVICE_ACCOUNT_KEY_FILE_NAME: &str = "key.json";
/// Name of the GCP service account secret volume.
pub const SERVICE_ACCOUNT_SECRET_VOLUME_NAME: &str = "gcp-service-account-secret-volume";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Snafu, Debug, EnumDiscriminants)]
#[strum_discriminants(derive(IntoStaticStr))]
pub enum Error {
    #[snafu(display("annotation {annotation:?} names no secret after the prefix"))]
    EmptySecretName { annotation: String },

    #[snafu(display("annotation {annotation:?} gives no mount path for secret {secret:?}"))]
    EmptyMountPath { annotation: String, secret: String },
}

impl ReconcilerError for Error {
    fn category(&self) -> &'static str {
        ErrorDiscriminants::from(self).into()
    }
}

/// Appends a volume backed by the secret `secret_name` to `pod_spec`.
///
/// Duplicate volume names are not checked here, they are rejected later by
/// apiserver validation.
pub fn add_secret_volume(volume_name: &str, secret_name: &str, pod_spec: &mut PodSpec) {
    let volume = Volume {
        name: volume_name.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret_name.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    };
    pod_spec.volumes.get_or_insert_with(Vec::new).push(volume);
}

/// Appends a read-only mount of the volume `volume_name` at `mount_path` to
/// `container`. The volume itself must be attached to the enclosing pod via
/// [`add_secret_volume`], the two calls are not linked.
pub fn mount_secret(volume_name: &str, mount_path: &str, container: &mut Container) {
    let volume_mount = VolumeMount {
        name: volume_name.to_string(),
        mount_path: mount_path.to_string(),
        read_only: Some(true),
        ..Default::default()
    };
    container
        .volume_mounts
        .get_or_insert_with(Vec::new)
        .push(volume_mount);
}

/// Mounts the service account secret volume at `mount_path` and points
/// `GOOGLE_APPLICATION_CREDENTIALS` at the key file inside it, so that
/// processes in `container` pick up the credentials automatically.
pub fn mount_service_account_secret(mount_path: &str, container: &mut Container) {
    mount_secret(SERVICE_ACCOUNT_SECRET_VOLUME_NAME, mount_path, container);
    let key_file_path = format!("{mount_path}/{SERVICE_ACCOUNT_KEY_FILE_NAME}");
    container.env.get_or_insert_with(Vec::new).push(EnvVar {
        name: GOOGLE_APPLICATION_CREDENTIALS_ENV_VAR.to_string(),
        value: Some(key_file_path),
        ..Default::default()
    });
}

/// Returns an environment variable drawing its value from the key
/// `secret_key` of the secret `secret`, for credentials that should reach
/// the process via the environment rather than a mounted file.
pub fn env_var_from_secret(var_name: &str, secret: &str, secret_key: &str) -> EnvVar {
    EnvVar {
        name: String::from(var_name),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: String::from(secret),
                key: String::from(secret_key),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Applies every secret requested by `annotations` to `pod_spec` and
/// `container`.
///
/// Each general secret is attached as a volume named `{secret}-volume` and
/// mounted read-only at the annotated path. A service account secret, if
/// requested, is additionally wired up via [`mount_service_account_secret`].
pub fn apply_secret_annotations(
    annotations: &BTreeMap<String, String>,
    pod_spec: &mut PodSpec,
    container: &mut Container,
) -> Result<()> {
    for (name, mount_path) in annotations::find_general_secrets(annotations) {
        ensure!(
            !name.is_empty(),
            EmptySecretNameSnafu {
                annotation: GENERAL_SECRETS_ANNOTATION_PREFIX,
            }
        );
        ensure!(
            !mount_path.is_empty(),
            EmptyMountPathSnafu {
                annotation: format!("{GENERAL_SECRETS_ANNOTATION_PREFIX}{name}"),
                secret: name.clone(),
            }
        );

        let volume_name = format!("{name}-volume");
        add_secret_volume(&volume_name, &name, pod_spec);
        mount_secret(&volume_name, &mount_path, container);
        tracing::debug!(secret = %name, mount_path = %mount_path, "mounted general secret");
    }

    if let Some(SecretRef { name, mount_path }) = annotations::find_service_account_secret(annotations)
    {
        ensure!(
            !name.is_empty(),
            EmptySecretNameSnafu {
                annotation: GCP_SERVICE_ACCOUNT_ANNOTATION_PREFIX,
            }
        );
        ensure!(
            !mount_path.is_empty(),
            EmptyMountPathSnafu {
                annotation: format!("{GCP_SERVICE_ACCOUNT_ANNOTATION_PREFIX}{name}"),
                secret: name.clone(),
            }
        );

        add_secret_volume(SERVICE_ACCOUNT_SECRET_VOLUME_NAME, &name, pod_spec);
        mount_service_account_secret(&mount_path, container);
        tracing::debug!(secret = %name, mount_path = %mount_path, "mounted service account secret");
    }

    Ok(())
}
