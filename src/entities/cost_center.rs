// 🎯 Centro de Custo/Lucro - cost/profit center tree (usually 2 levels)

use crate::entities::null_as_empty;
use crate::flatten::TreeNode;
use crate::schema::EntitySchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CentroCustoLucro {
    pub id: i64,
    pub descricao: String,

    #[serde(default)]
    pub parent_id: Option<i64>,

    #[serde(default)]
    pub ativo: Option<bool>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub centros_custo_lucro_filhos: Vec<CentroCustoLucro>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroCustoLucroRow {
    pub id: i64,
    pub descricao: String,
    pub parent_id: Option<i64>,
    pub ativo: Option<bool>,
}

impl TreeNode for CentroCustoLucro {
    type Row = CentroCustoLucroRow;

    fn id(&self) -> i64 {
        self.id
    }

    fn parent_id(&self) -> Option<i64> {
        self.parent_id
    }

    fn children(&self) -> &[Self] {
        &self.centros_custo_lucro_filhos
    }

    fn to_row(&self) -> CentroCustoLucroRow {
        CentroCustoLucroRow {
            id: self.id,
            descricao: self.descricao.clone(),
            parent_id: self.parent_id,
            ativo: self.ativo,
        }
    }
}

impl EntitySchema for CentroCustoLucro {
    const FIELDS: &'static [&'static str] = &[
        "id",
        "descricao",
        "parent_id",
        "ativo",
        "centros_custo_lucro_filhos",
    ];
    const CHILDREN: Option<&'static str> = Some("centros_custo_lucro_filhos");
}
