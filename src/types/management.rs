// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Rancher `management.cattle.io/v3` resources.
//!
//! These objects keep their fields at the top level instead of under `spec`,
//! so `kube::Resource` is implemented by hand rather than derived.

use crate::constants::management::{GROUP, VERSION};
use k8s_openapi::api::rbac::v1::PolicyRule;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::core::TypeMeta;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::Debug;

/// A cluster-scoped management object the mutator can create, update and delete.
pub trait ManagementObject:
    Resource<DynamicType = ()> + Clone + Serialize + DeserializeOwned + Debug
{
    fn type_meta_mut(&mut self) -> &mut Option<TypeMeta>;

    /// Fill in `apiVersion` and `kind` when they are missing.
    fn stamp_type_meta(&mut self) {
        self.type_meta_mut().get_or_insert_with(|| TypeMeta {
            api_version: Self::api_version(&()).into_owned(),
            kind: Self::kind(&()).into_owned(),
        });
    }
}

macro_rules! management_resource {
    ($ty:ident, $kind:literal, $plural:literal) => {
        impl Resource for $ty {
            type DynamicType = ();
            type Scope = k8s_openapi::ClusterResourceScope;

            fn kind(_: &()) -> Cow<'_, str> {
                Cow::Borrowed($kind)
            }

            fn group(_: &()) -> Cow<'_, str> {
                Cow::Borrowed(GROUP)
            }

            fn version(_: &()) -> Cow<'_, str> {
                Cow::Borrowed(VERSION)
            }

            fn plural(_: &()) -> Cow<'_, str> {
                Cow::Borrowed($plural)
            }

            fn meta(&self) -> &ObjectMeta {
                &self.metadata
            }

            fn meta_mut(&mut self) -> &mut ObjectMeta {
                &mut self.metadata
            }
        }

        impl ManagementObject for $ty {
            fn type_meta_mut(&mut self) -> &mut Option<TypeMeta> {
                &mut self.types
            }
        }
    };
}

fn named(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

/// A local Rancher user
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(flatten)]
    pub types: Option<TypeMeta>,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    /// bcrypt hash, write-only on the Rancher side
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
}

management_resource!(User, "User", "users");

impl User {
    pub fn new(name: &str, password_hash: &str) -> Self {
        User {
            types: None,
            metadata: named(name),
            username: name.to_string(),
            password: password_hash.to_string(),
        }
    }
}

/// A set of rules granted across all clusters managed by Rancher
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GlobalRole {
    #[serde(flatten)]
    pub types: Option<TypeMeta>,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<PolicyRule>,
}

management_resource!(GlobalRole, "GlobalRole", "globalroles");

impl GlobalRole {
    pub fn new(name: &str, rules: Vec<PolicyRule>) -> Self {
        GlobalRole {
            types: None,
            metadata: named(name),
            rules,
        }
    }
}

/// Grants one [`GlobalRole`] to one user
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GlobalRoleBinding {
    #[serde(flatten)]
    pub types: Option<TypeMeta>,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub global_role_name: String,
}

management_resource!(GlobalRoleBinding, "GlobalRoleBinding", "globalrolebindings");

impl GlobalRoleBinding {
    /// Binding for `role`, named after the role itself.
    pub fn for_role(role_name: &str, user_name: &str) -> Self {
        GlobalRoleBinding {
            types: None,
            metadata: named(role_name),
            user_name: user_name.to_string(),
            global_role_name: role_name.to_string(),
        }
    }
}

/// A Rancher server setting
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    #[serde(flatten)]
    pub types: Option<TypeMeta>,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub value: String,
}

management_resource!(Setting, "Setting", "settings");
