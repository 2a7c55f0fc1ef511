//! # Apply Helpers
//!
//! Write desired objects without computing patches: create when absent,
//! replace when any managed field differs, otherwise leave the object alone.
//!
//! Managed fields are the data maps plus the labels and annotations the
//! desired object carries. Extra labels or annotations already on the live
//! object are kept.

use super::{ApiError, ResourceStore};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Apply a config map. Returns the stored object and whether it was written.
pub async fn apply_config_map(
    store: &dyn ResourceStore<ConfigMap>,
    required: &ConfigMap,
) -> Result<(ConfigMap, bool), ApiError> {
    let (namespace, name) = super::object_key(required);

    let Some(existing) = store.get_opt(&namespace, &name).await? else {
        let created = store.create(required).await?;
        info!(
            reason = "ConfigMapCreated",
            namespace = %namespace,
            name = %name,
            "Created ConfigMap {}/{}",
            namespace,
            name
        );
        return Ok((created, true));
    };

    let mut modified = existing.clone();
    let metadata_changed = merge_metadata(&mut modified.metadata, &required.metadata);
    let data_changed = !same_map(existing.data.as_ref(), required.data.as_ref())
        || !same_map(existing.binary_data.as_ref(), required.binary_data.as_ref());

    if !metadata_changed && !data_changed {
        debug!(namespace = %namespace, name = %name, "ConfigMap unchanged");
        return Ok((existing, false));
    }

    modified.data.clone_from(&required.data);
    modified.binary_data.clone_from(&required.binary_data);
    let updated = store.update(&modified).await?;
    info!(
        reason = "ConfigMapUpdated",
        namespace = %namespace,
        name = %name,
        data_changed,
        "Updated ConfigMap {}/{}",
        namespace,
        name
    );
    Ok((updated, true))
}

/// Apply a secret. Returns the stored object and whether it was written.
pub async fn apply_secret(
    store: &dyn ResourceStore<Secret>,
    required: &Secret,
) -> Result<(Secret, bool), ApiError> {
    let (namespace, name) = super::object_key(required);

    let Some(existing) = store.get_opt(&namespace, &name).await? else {
        let created = store.create(required).await?;
        info!(
            reason = "SecretCreated",
            namespace = %namespace,
            name = %name,
            "Created Secret {}/{}",
            namespace,
            name
        );
        return Ok((created, true));
    };

    let mut modified = existing.clone();
    let metadata_changed = merge_metadata(&mut modified.metadata, &required.metadata);
    let data_changed = !same_map(existing.data.as_ref(), required.data.as_ref());
    let type_changed = required.type_.is_some() && existing.type_ != required.type_;

    if !metadata_changed && !data_changed && !type_changed {
        debug!(namespace = %namespace, name = %name, "Secret unchanged");
        return Ok((existing, false));
    }

    modified.data.clone_from(&required.data);
    if required.type_.is_some() {
        modified.type_.clone_from(&required.type_);
    }
    let updated = store.update(&modified).await?;
    // never log secret contents
    info!(
        reason = "SecretUpdated",
        namespace = %namespace,
        name = %name,
        data_changed,
        "Updated Secret {}/{}",
        namespace,
        name
    );
    Ok((updated, true))
}

/// Copy required labels and annotations onto `existing`. Returns true if anything changed.
fn merge_metadata(existing: &mut ObjectMeta, required: &ObjectMeta) -> bool {
    let labels = merge_string_map(&mut existing.labels, required.labels.as_ref());
    let annotations = merge_string_map(&mut existing.annotations, required.annotations.as_ref());
    labels || annotations
}

fn merge_string_map(
    existing: &mut Option<BTreeMap<String, String>>,
    required: Option<&BTreeMap<String, String>>,
) -> bool {
    let Some(required) = required else {
        return false;
    };
    let mut changed = false;
    for (key, value) in required {
        let target = existing.get_or_insert_with(BTreeMap::new);
        if target.get(key) != Some(value) {
            target.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

/// Map equality where an absent map equals an empty one
fn same_map<V: PartialEq>(a: Option<&BTreeMap<String, V>>, b: Option<&BTreeMap<String, V>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        (Some(m), None) | (None, Some(m)) => m.is_empty(),
        (None, None) => true,
    }
}
