// Entity Models - one explicit schema per Granatum collection
//
// Each entity has:
// - Named, typed, nullable-where-the-API-allows fields
// - A field list (EntitySchema) so unexpected keys get flagged, not persisted
// - A flat row shape for the CSV tables (nested children never reach disk)

pub mod account;
pub mod category;
pub mod cost_center;
pub mod payment_method;
pub mod person;
pub mod transaction;

pub use account::Conta;
pub use category::{Categoria, CategoriaRow};
pub use cost_center::{CentroCustoLucro, CentroCustoLucroRow};
pub use payment_method::FormaPagamento;
pub use person::{Pessoa, PersonKind};
pub use transaction::{Lancamento, LancamentoRow, SourcedLancamento};

use serde::{Deserialize, Deserializer};

/// Nested child arrays come back as `[]`, `null` or not at all; all mean "no children"
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
