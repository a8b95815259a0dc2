// 📐 Shape Layer - explicit entity schemas over loosely-typed JSON
//
// Every payload is decoded against a named field list. Keys outside that
// list are flagged (counted + logged) and never reach the persisted tables.
// A payload that is not an array of objects is an error.

use crate::error::ApiError;
use anyhow::{Context, Result};
use log::warn;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ============================================================================
// SCHEMA TRAIT
// ============================================================================

pub trait EntitySchema: DeserializeOwned {
    /// Every key the API is known to send for this entity
    const FIELDS: &'static [&'static str];

    /// Key holding nested children of the same shape, if the entity is a tree
    const CHILDREN: Option<&'static str> = None;
}

// ============================================================================
// SCHEMA REPORT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaReport {
    pub endpoint: String,

    /// Objects inspected, nested children included
    pub records: usize,

    /// Unexpected key → how many objects carried it
    pub unexpected: BTreeMap<String, usize>,
}

impl SchemaReport {
    pub fn is_clean(&self) -> bool {
        self.unexpected.is_empty()
    }

    /// Fold another report (e.g. a later page) into this one
    pub fn merge(&mut self, other: SchemaReport) {
        self.records += other.records;
        for (field, count) in other.unexpected {
            *self.unexpected.entry(field).or_insert(0) += count;
        }
    }
}

#[derive(Debug, Clone)]
pub struct Decoded<T> {
    pub records: Vec<T>,
    pub report: SchemaReport,
}

// ============================================================================
// DECODING
// ============================================================================

/// Decode a JSON array of `T` objects, flagging unexpected keys
pub fn decode_records<T: EntitySchema>(endpoint: &str, payload: Value) -> Result<Decoded<T>> {
    let Value::Array(items) = payload else {
        return Err(ApiError::Shape {
            endpoint: endpoint.to_string(),
            expected: "a JSON array of objects",
        }
        .into());
    };

    let mut report = SchemaReport {
        endpoint: endpoint.to_string(),
        ..SchemaReport::default()
    };
    let mut records = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(object) = &item else {
            return Err(ApiError::Shape {
                endpoint: endpoint.to_string(),
                expected: "a JSON array of objects",
            }
            .into());
        };

        inspect_object::<T>(object, &mut report);

        let record: T = serde_json::from_value(item)
            .with_context(|| format!("Failed to decode {} record #{}", endpoint, index))?;
        records.push(record);
    }

    for (field, count) in &report.unexpected {
        warn!(
            "{}: unexpected field '{}' in {} object(s), ignored",
            endpoint, field, count
        );
    }

    Ok(Decoded { records, report })
}

fn inspect_object<T: EntitySchema>(object: &Map<String, Value>, report: &mut SchemaReport) {
    report.records += 1;

    for (key, value) in object {
        if !T::FIELDS.contains(&key.as_str()) {
            *report.unexpected.entry(key.clone()).or_insert(0) += 1;
            continue;
        }

        if T::CHILDREN == Some(key.as_str()) {
            if let Value::Array(children) = value {
                for child in children {
                    if let Value::Object(child) = child {
                        inspect_object::<T>(child, report);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Categoria, Conta};
    use serde_json::json;

    #[test]
    fn test_decode_clean_payload() {
        let decoded = decode_records::<Conta>(
            "contas",
            json!([
                { "id": 1, "descricao": "Itaú" },
                { "id": 2, "descricao": "Caixa", "ativo": true }
            ]),
        )
        .unwrap();

        assert_eq!(decoded.records.len(), 2);
        assert_eq!(decoded.report.records, 2);
        assert!(decoded.report.is_clean());
    }

    #[test]
    fn test_unexpected_fields_are_flagged() {
        let decoded = decode_records::<Conta>(
            "contas",
            json!([
                { "id": 1, "descricao": "Itaú", "tipo_conta": "corrente" },
                { "id": 2, "descricao": "Caixa", "tipo_conta": "caixa", "cor": "#fff" }
            ]),
        )
        .unwrap();

        assert_eq!(decoded.records.len(), 2);
        assert_eq!(decoded.report.unexpected.get("tipo_conta"), Some(&2));
        assert_eq!(decoded.report.unexpected.get("cor"), Some(&1));
    }

    #[test]
    fn test_nested_children_are_inspected() {
        let decoded = decode_records::<Categoria>(
            "categorias",
            json!([
                {
                    "id": 1,
                    "descricao": "Receitas",
                    "categorias_filhas": [
                        { "id": 2, "descricao": "Vendas", "parent_id": 1, "legado": 1 }
                    ]
                }
            ]),
        )
        .unwrap();

        assert_eq!(decoded.records.len(), 1);
        assert_eq!(decoded.report.records, 2);
        assert_eq!(decoded.report.unexpected.get("legado"), Some(&1));
    }

    #[test]
    fn test_empty_array_is_valid() {
        let decoded = decode_records::<Conta>("contas", json!([])).unwrap();
        assert!(decoded.records.is_empty());
        assert_eq!(decoded.report.records, 0);
    }

    #[test]
    fn test_non_array_is_shape_error() {
        let err = decode_records::<Conta>("contas", json!({ "erro": "token" })).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::Shape { .. })
        ));
    }

    #[test]
    fn test_type_mismatch_propagates() {
        let result = decode_records::<Conta>("contas", json!([{ "id": "x", "descricao": 3 }]));
        assert!(result.is_err());
    }
}
