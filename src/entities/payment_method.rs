// 💸 Forma de Pagamento - payment method (boleto, PIX, cartão, ...)

use crate::schema::EntitySchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormaPagamento {
    pub id: i64,
    pub descricao: String,

    #[serde(default)]
    pub ativo: Option<bool>,
}

impl EntitySchema for FormaPagamento {
    const FIELDS: &'static [&'static str] = &["id", "descricao", "ativo"];
}
