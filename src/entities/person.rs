// 👤 Pessoa - customer (cliente) or supplier (fornecedor)
//
// Both collections share one shape and one id space on the transaction side:
// a Lançamento's pessoa_id may point into either. Customers take priority.

use crate::schema::EntitySchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonKind {
    Cliente,
    Fornecedor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pessoa {
    pub id: i64,

    /// Legal or display name
    pub nome: String,

    #[serde(default)]
    pub nome_fantasia: Option<String>,

    /// CPF / CNPJ
    #[serde(default)]
    pub documento: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub ativo: Option<bool>,
}

impl EntitySchema for Pessoa {
    const FIELDS: &'static [&'static str] = &[
        "id",
        "nome",
        "nome_fantasia",
        "documento",
        "email",
        "ativo",
    ];
}
