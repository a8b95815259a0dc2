// 🏷️ Categoria - hierarchical income/expense classification
//
// The API returns only root categories; each carries its children in
// `categorias_filhas`, which in turn carry theirs (up to 3 levels):
//
//   Despesas Administrativas          (root, parent_id = null)
//     └─ Aluguel                      (level 1, parent_id = root id)
//          └─ Condomínio              (level 2, parent_id = level-1 id)

use crate::entities::null_as_empty;
use crate::flatten::TreeNode;
use crate::schema::EntitySchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Categoria {
    pub id: i64,
    pub descricao: String,

    /// Hex color used by the Granatum UI
    #[serde(default)]
    pub cor: Option<String>,

    #[serde(default)]
    pub tipo_categoria_id: Option<i64>,

    /// Direct parent; None for roots
    #[serde(default)]
    pub parent_id: Option<i64>,

    #[serde(default)]
    pub ativo: Option<bool>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub categorias_filhas: Vec<Categoria>,
}

/// Flat, persisted shape of one category node (children dropped)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoriaRow {
    pub id: i64,
    pub descricao: String,
    pub parent_id: Option<i64>,
    pub cor: Option<String>,
    pub tipo_categoria_id: Option<i64>,
    pub ativo: Option<bool>,
}

impl TreeNode for Categoria {
    type Row = CategoriaRow;

    fn id(&self) -> i64 {
        self.id
    }

    fn parent_id(&self) -> Option<i64> {
        self.parent_id
    }

    fn children(&self) -> &[Self] {
        &self.categorias_filhas
    }

    fn to_row(&self) -> CategoriaRow {
        CategoriaRow {
            id: self.id,
            descricao: self.descricao.clone(),
            parent_id: self.parent_id,
            cor: self.cor.clone(),
            tipo_categoria_id: self.tipo_categoria_id,
            ativo: self.ativo,
        }
    }
}

impl EntitySchema for Categoria {
    const FIELDS: &'static [&'static str] = &[
        "id",
        "descricao",
        "cor",
        "tipo_categoria_id",
        "parent_id",
        "ativo",
        "categorias_filhas",
    ];
    const CHILDREN: Option<&'static str> = Some("categorias_filhas");
}
