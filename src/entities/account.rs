// 💳 Conta - financial account (bank account, cash box, card)
//
// Every transaction is owned by exactly one Conta; the fetch stage loops
// over accounts to pull per-account monthly extracts.

use crate::schema::EntitySchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conta {
    pub id: i64,

    /// Display name (e.g., "Itaú CC 12345-6")
    pub descricao: String,

    #[serde(default)]
    pub banco_id: Option<i64>,

    #[serde(default)]
    pub numero_agencia: Option<String>,

    #[serde(default)]
    pub numero_conta: Option<String>,

    #[serde(default)]
    pub saldo_inicial: Option<f64>,

    #[serde(default)]
    pub ativo: Option<bool>,
}

impl EntitySchema for Conta {
    const FIELDS: &'static [&'static str] = &[
        "id",
        "descricao",
        "banco_id",
        "numero_agencia",
        "numero_conta",
        "saldo_inicial",
        "ativo",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_conta_minimal_payload() {
        let conta: Conta = serde_json::from_value(json!({
            "id": 7,
            "descricao": "Caixa"
        }))
        .unwrap();

        assert_eq!(conta.id, 7);
        assert_eq!(conta.descricao, "Caixa");
        assert_eq!(conta.banco_id, None);
        assert_eq!(conta.ativo, None);
    }

    #[test]
    fn test_conta_inactive() {
        let conta: Conta = serde_json::from_value(json!({
            "id": 8,
            "descricao": "Conta antiga",
            "ativo": false
        }))
        .unwrap();

        assert_eq!(conta.ativo, Some(false));
    }
}
