// 📒 Lançamento - ledger transaction entry
//
// Foreign keys into every reference collection, an amount, dates/status and
// provenance. Three shapes:
//   Lancamento         - as decoded from the API page
//   LancamentoRow      - as written to a per-(month, account) extract, with
//                        the queried account and page index
//   SourcedLancamento  - as read back, tagged with the extract file name

use crate::schema::EntitySchema;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Lancamento {
    pub id: i64,

    #[serde(default)]
    pub descricao: Option<String>,

    // Foreign keys
    #[serde(default)]
    pub conta_id: Option<i64>,
    #[serde(default)]
    pub categoria_id: Option<i64>,
    #[serde(default)]
    pub centro_custo_lucro_id: Option<i64>,
    #[serde(default)]
    pub forma_pagamento_id: Option<i64>,
    #[serde(default)]
    pub pessoa_id: Option<i64>,
    #[serde(default)]
    pub tipo_lancamento_id: Option<i64>,

    /// Signed amount (negative = outflow)
    pub valor: f64,

    // Dates (YYYY-MM-DD)
    #[serde(default)]
    pub data_vencimento: Option<NaiveDate>,
    #[serde(default)]
    pub data_pagamento: Option<NaiveDate>,
    #[serde(default)]
    pub data_competencia: Option<NaiveDate>,

    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub documento: Option<String>,
    #[serde(default)]
    pub observacao: Option<String>,
}

impl EntitySchema for Lancamento {
    const FIELDS: &'static [&'static str] = &[
        "id",
        "descricao",
        "conta_id",
        "categoria_id",
        "centro_custo_lucro_id",
        "forma_pagamento_id",
        "pessoa_id",
        "tipo_lancamento_id",
        "valor",
        "data_vencimento",
        "data_pagamento",
        "data_competencia",
        "status",
        "documento",
        "observacao",
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LancamentoRow {
    pub id: i64,
    pub descricao: Option<String>,
    pub conta_id: Option<i64>,
    pub categoria_id: Option<i64>,
    pub centro_custo_lucro_id: Option<i64>,
    pub forma_pagamento_id: Option<i64>,
    pub pessoa_id: Option<i64>,
    pub tipo_lancamento_id: Option<i64>,
    pub valor: f64,
    pub data_vencimento: Option<NaiveDate>,
    pub data_pagamento: Option<NaiveDate>,
    pub data_competencia: Option<NaiveDate>,
    pub status: Option<String>,
    pub documento: Option<String>,
    pub observacao: Option<String>,

    // Provenance
    /// Account the extract was queried for
    pub conta_consulta_id: i64,
    /// 0-based page the record arrived on
    pub pagina: usize,
}

impl LancamentoRow {
    pub fn from_fetched(lancamento: Lancamento, conta_consulta_id: i64, pagina: usize) -> Self {
        LancamentoRow {
            id: lancamento.id,
            descricao: lancamento.descricao,
            conta_id: lancamento.conta_id,
            categoria_id: lancamento.categoria_id,
            centro_custo_lucro_id: lancamento.centro_custo_lucro_id,
            forma_pagamento_id: lancamento.forma_pagamento_id,
            pessoa_id: lancamento.pessoa_id,
            tipo_lancamento_id: lancamento.tipo_lancamento_id,
            valor: lancamento.valor,
            data_vencimento: lancamento.data_vencimento,
            data_pagamento: lancamento.data_pagamento,
            data_competencia: lancamento.data_competencia,
            status: lancamento.status,
            documento: lancamento.documento,
            observacao: lancamento.observacao,
            conta_consulta_id,
            pagina,
        }
    }

    /// Owning account: the record's own conta_id, else the account it was queried for
    pub fn owning_account(&self) -> i64 {
        self.conta_id.unwrap_or(self.conta_consulta_id)
    }
}

/// Extract row plus the file it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedLancamento {
    pub row: LancamentoRow,
    pub arquivo: String,
}
