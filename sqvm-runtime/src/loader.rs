//! Carregador da árvore de config a partir de JSON
//!
//! Objetos viram classes; números, textos e arrays viram entradas de valor.
//! A chave reservada `#parent` nomeia a classe base (`class Car: LandVehicle`).

use std::fs;
use std::path::Path;

use serde_json::Value as Json;
use sqvm_core::config_tree::{ConfigClass, ConfigEntry, ConfigTree, ConfigValue};

use crate::error::{RuntimeError, RuntimeResult};

pub struct ConfigTreeLoader;

impl ConfigTreeLoader {
    pub fn load_file(path: impl AsRef<Path>) -> RuntimeResult<ConfigTree> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> RuntimeResult<ConfigTree> {
        let json: Json = serde_json::from_str(content)?;
        Self::from_json(&json)
    }

    /// A raiz do documento precisa ser um objeto.
    pub fn from_json(json: &Json) -> RuntimeResult<ConfigTree> {
        let Json::Object(_) = json else {
            return Err(invalid("", "the root must be an object"));
        };
        let root = class(json, "")?;
        tracing::debug!(entries = root.len(), "config tree loaded");
        Ok(ConfigTree::new(root))
    }
}

fn invalid(path: &str, reason: &str) -> RuntimeError {
    RuntimeError::InvalidConfigTree { path: path.to_string(), reason: reason.to_string() }
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{} >> {}", parent, name)
    }
}

const PARENT_KEY: &str = "#parent";

fn class(json: &Json, path: &str) -> RuntimeResult<ConfigClass> {
    let mut class_node = ConfigClass::new();
    if let Json::Object(members) = json {
        for (name, member) in members {
            let member_path = join(path, name);
            if name == PARENT_KEY {
                let Json::String(parent) = member else {
                    return Err(invalid(&member_path, "the parent must be a class name"));
                };
                class_node.set_parent(parent.as_str());
                continue;
            }
            let entry = match member {
                Json::Object(_) => ConfigEntry::Class(class(member, &member_path)?),
                other => ConfigEntry::Value(value(other, &member_path)?),
            };
            class_node.insert(name.as_str(), entry);
        }
    }
    Ok(class_node)
}

fn value(json: &Json, path: &str) -> RuntimeResult<ConfigValue> {
    match json {
        Json::Number(n) => n.as_f64().map(ConfigValue::Number).ok_or_else(|| invalid(path, "number out of range")),
        Json::String(s) => Ok(ConfigValue::Text(s.clone())),
        Json::Array(items) => {
            let values = items.iter().map(|item| value(item, path)).collect::<RuntimeResult<Vec<_>>>()?;
            Ok(ConfigValue::Array(values))
        }
        Json::Bool(_) => Err(invalid(path, "booleans are not config values")),
        Json::Null => Err(invalid(path, "null is not a config value")),
        Json::Object(_) => Err(invalid(path, "classes cannot appear inside arrays")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqvm_core::config_tree::ConfigEntryRef;

    #[test]
    fn test_load_nested_classes() {
        let tree = ConfigTreeLoader::from_json_str(
            r#"{"CfgVehicles": {"Car": {"maxSpeed": 120, "displayName": "Car", "seats": [1, [2, 3]]}}}"#,
        )
        .unwrap();
        match tree.lookup(&["cfgvehicles", "car", "maxspeed"]) {
            Some(ConfigEntryRef::Value(ConfigValue::Number(n))) => assert_eq!(*n, 120.0),
            other => panic!("unexpected entry {:?}", other),
        }
        assert!(matches!(tree.lookup(&["CfgVehicles", "Car"]), Some(ConfigEntryRef::Class(_))));
        assert!(matches!(
            tree.lookup(&["CfgVehicles", "Car", "seats"]),
            Some(ConfigEntryRef::Value(ConfigValue::Array(items))) if items.len() == 2
        ));
    }

    #[test]
    fn test_rejects_booleans_with_path() {
        let err = ConfigTreeLoader::from_json_str(r#"{"CfgVehicles": {"Car": {"armed": true}}}"#).unwrap_err();
        match err {
            RuntimeError::InvalidConfigTree { path, .. } => assert_eq!(path, "CfgVehicles >> Car >> armed"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_parent_key_sets_inheritance() {
        let tree = ConfigTreeLoader::from_json_str(
            r##"{"CfgVehicles": {"LandVehicle": {}, "Car": {"#parent": "LandVehicle", "maxSpeed": 90}}}"##,
        )
        .unwrap();
        assert_eq!(tree.is_kind_of(&["CfgVehicles"], "Car", "LandVehicle"), Some(true));
        match tree.lookup(&["CfgVehicles", "Car"]) {
            Some(ConfigEntryRef::Class(car)) => {
                assert_eq!(car.parent(), Some("LandVehicle"));
                assert_eq!(car.len(), 1);
            }
            other => panic!("unexpected entry {:?}", other),
        }

        let err = ConfigTreeLoader::from_json_str(r##"{"CfgVehicles": {"Car": {"#parent": 3}}}"##).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConfigTree { path, .. } if path == "CfgVehicles >> Car >> #parent"));
    }

    #[test]
    fn test_root_must_be_object() {
        assert!(matches!(
            ConfigTreeLoader::from_json_str("[1, 2]"),
            Err(RuntimeError::InvalidConfigTree { .. })
        ));
    }
}
