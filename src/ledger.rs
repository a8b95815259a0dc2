// 📒 Ledger Assembler - transactions ⟕ every reference table
//
// One output row per transaction, always. Each foreign key is looked up in
// an id-keyed index; a miss leaves the description columns empty instead of
// dropping the row. Indexes keep the first row per id, so a transaction can
// never be duplicated by the join.
//
//   categoria / centro de custo  → TaxonomyIndex (most specific id)
//   conta, forma de pagamento    → by id
//   pessoa                       → clientes first, then fornecedores

use crate::entities::{Conta, FormaPagamento, PersonKind, Pessoa, SourcedLancamento};
use crate::hierarchy::{HierarchyRow, TaxonomyIndex};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// INPUT / OUTPUT
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub categorias: Vec<HierarchyRow>,
    pub centros_custo_lucro: Vec<HierarchyRow>,
    pub contas: Vec<Conta>,
    pub formas_pagamento: Vec<FormaPagamento>,
    pub clientes: Vec<Pessoa>,
    pub fornecedores: Vec<Pessoa>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub lancamento_id: i64,
    pub descricao: Option<String>,
    pub valor: f64,
    pub tipo_lancamento_id: Option<i64>,
    pub status: Option<String>,
    pub data_vencimento: Option<NaiveDate>,
    pub data_pagamento: Option<NaiveDate>,
    pub data_competencia: Option<NaiveDate>,
    pub documento: Option<String>,
    pub observacao: Option<String>,

    pub conta_id: i64,
    pub conta_descricao: Option<String>,

    pub categoria_id: Option<i64>,
    pub categoria_descricao: Option<String>,
    pub categoria_raiz: Option<String>,
    pub categoria_nivel_1: Option<String>,
    pub categoria_nivel_2: Option<String>,

    pub centro_custo_lucro_id: Option<i64>,
    pub centro_custo_lucro_descricao: Option<String>,
    pub centro_custo_lucro_raiz: Option<String>,
    pub centro_custo_lucro_nivel_1: Option<String>,
    pub centro_custo_lucro_nivel_2: Option<String>,

    pub forma_pagamento_id: Option<i64>,
    pub forma_pagamento_descricao: Option<String>,

    pub pessoa_id: Option<i64>,
    pub pessoa_nome: Option<String>,
    pub pessoa_origem: Option<PersonKind>,

    // Provenance
    pub arquivo: String,
    pub pagina: usize,
}

/// How many transactions had a key that did not resolve
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    pub rows: usize,
    pub conta_unresolved: usize,
    pub categoria_unresolved: usize,
    pub centro_custo_lucro_unresolved: usize,
    pub forma_pagamento_unresolved: usize,
    pub pessoa_unresolved: usize,
}

impl ResolutionStats {
    /// Misses across every reference table
    pub fn unresolved(&self) -> usize {
        self.conta_unresolved
            + self.categoria_unresolved
            + self.centro_custo_lucro_unresolved
            + self.forma_pagamento_unresolved
            + self.pessoa_unresolved
    }
}

// ============================================================================
// LOOKUPS
// ============================================================================

/// Customers and suppliers behind one id space; customers win
pub struct PersonDirectory<'a> {
    clientes: HashMap<i64, &'a Pessoa>,
    fornecedores: HashMap<i64, &'a Pessoa>,
}

impl<'a> PersonDirectory<'a> {
    pub fn new(clientes: &'a [Pessoa], fornecedores: &'a [Pessoa]) -> Self {
        PersonDirectory {
            clientes: index_by(clientes, |p| p.id),
            fornecedores: index_by(fornecedores, |p| p.id),
        }
    }

    pub fn resolve(&self, id: Option<i64>) -> Option<(&'a Pessoa, PersonKind)> {
        let id = id?;
        self.clientes
            .get(&id)
            .map(|p| (*p, PersonKind::Cliente))
            .or_else(|| self.fornecedores.get(&id).map(|p| (*p, PersonKind::Fornecedor)))
    }
}

/// id → first row with that id
fn index_by<T, F>(rows: &[T], key: F) -> HashMap<i64, &T>
where
    F: Fn(&T) -> i64,
{
    let mut index = HashMap::with_capacity(rows.len());
    for row in rows {
        index.entry(key(row)).or_insert(row);
    }
    index
}

// ============================================================================
// ASSEMBLY
// ============================================================================

pub fn assemble_ledger(
    transactions: &[SourcedLancamento],
    refs: &ReferenceTables,
) -> (Vec<LedgerRow>, ResolutionStats) {
    let categorias = TaxonomyIndex::build(&refs.categorias);
    let centros = TaxonomyIndex::build(&refs.centros_custo_lucro);
    let contas = index_by(&refs.contas, |c| c.id);
    let formas = index_by(&refs.formas_pagamento, |f| f.id);
    let pessoas = PersonDirectory::new(&refs.clientes, &refs.fornecedores);

    let mut stats = ResolutionStats::default();
    let mut ledger = Vec::with_capacity(transactions.len());

    for sourced in transactions {
        let tx = &sourced.row;
        let conta_id = tx.owning_account();

        let conta = contas.get(&conta_id);
        let categoria = categorias.resolve(tx.categoria_id);
        let centro = centros.resolve(tx.centro_custo_lucro_id);
        let forma = tx.forma_pagamento_id.and_then(|id| formas.get(&id));
        let pessoa = pessoas.resolve(tx.pessoa_id);

        stats.rows += 1;
        stats.conta_unresolved += conta.is_none() as usize;
        stats.categoria_unresolved += (tx.categoria_id.is_some() && categoria.is_none()) as usize;
        stats.centro_custo_lucro_unresolved +=
            (tx.centro_custo_lucro_id.is_some() && centro.is_none()) as usize;
        stats.forma_pagamento_unresolved +=
            (tx.forma_pagamento_id.is_some() && forma.is_none()) as usize;
        stats.pessoa_unresolved += (tx.pessoa_id.is_some() && pessoa.is_none()) as usize;

        ledger.push(LedgerRow {
            lancamento_id: tx.id,
            descricao: tx.descricao.clone(),
            valor: tx.valor,
            tipo_lancamento_id: tx.tipo_lancamento_id,
            status: tx.status.clone(),
            data_vencimento: tx.data_vencimento,
            data_pagamento: tx.data_pagamento,
            data_competencia: tx.data_competencia,
            documento: tx.documento.clone(),
            observacao: tx.observacao.clone(),

            conta_id,
            conta_descricao: conta.map(|c| c.descricao.clone()),

            categoria_id: tx.categoria_id,
            categoria_descricao: categoria.map(|h| h.descricao_especifica().to_string()),
            categoria_raiz: categoria.map(|h| h.raiz_descricao.clone()),
            categoria_nivel_1: categoria.and_then(|h| h.nivel_1_descricao.clone()),
            categoria_nivel_2: categoria.and_then(|h| h.nivel_2_descricao.clone()),

            centro_custo_lucro_id: tx.centro_custo_lucro_id,
            centro_custo_lucro_descricao: centro.map(|h| h.descricao_especifica().to_string()),
            centro_custo_lucro_raiz: centro.map(|h| h.raiz_descricao.clone()),
            centro_custo_lucro_nivel_1: centro.and_then(|h| h.nivel_1_descricao.clone()),
            centro_custo_lucro_nivel_2: centro.and_then(|h| h.nivel_2_descricao.clone()),

            forma_pagamento_id: tx.forma_pagamento_id,
            forma_pagamento_descricao: forma.map(|f| f.descricao.clone()),

            pessoa_id: tx.pessoa_id,
            pessoa_nome: pessoa.map(|(p, _)| p.nome.clone()),
            pessoa_origem: pessoa.map(|(_, kind)| kind),

            arquivo: sourced.arquivo.clone(),
            pagina: tx.pagina,
        });
    }

    (ledger, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::LancamentoRow;
    use crate::hierarchy::{join_hierarchy, TaxonomyRow};

    fn pessoa(id: i64, nome: &str) -> Pessoa {
        Pessoa {
            id,
            nome: nome.to_string(),
            nome_fantasia: None,
            documento: None,
            email: None,
            ativo: None,
        }
    }

    fn tx(id: i64) -> LancamentoRow {
        LancamentoRow {
            id,
            descricao: None,
            conta_id: Some(1),
            categoria_id: None,
            centro_custo_lucro_id: None,
            forma_pagamento_id: None,
            pessoa_id: None,
            tipo_lancamento_id: None,
            valor: 100.0,
            data_vencimento: None,
            data_pagamento: None,
            data_competencia: None,
            status: None,
            documento: None,
            observacao: None,
            conta_consulta_id: 1,
            pagina: 0,
        }
    }

    fn sourced(row: LancamentoRow) -> SourcedLancamento {
        SourcedLancamento {
            row,
            arquivo: "2024_01_1_lancamentos.csv".to_string(),
        }
    }

    fn refs() -> ReferenceTables {
        let categorias = join_hierarchy(
            &[TaxonomyRow::new(1, "Despesas", None)],
            &[TaxonomyRow::new(2, "Aluguel", Some(1))],
            &[TaxonomyRow::new(3, "Condomínio", Some(2))],
        );
        let centros = join_hierarchy(&[TaxonomyRow::new(40, "Comercial", None)], &[], &[]);

        ReferenceTables {
            categorias,
            centros_custo_lucro: centros,
            contas: vec![Conta {
                id: 1,
                descricao: "Itaú".to_string(),
                banco_id: None,
                numero_agencia: None,
                numero_conta: None,
                saldo_inicial: None,
                ativo: None,
            }],
            formas_pagamento: vec![FormaPagamento {
                id: 5,
                descricao: "PIX".to_string(),
                ativo: None,
            }],
            clientes: vec![pessoa(10, "Cliente Dez"), pessoa(30, "Cliente Trinta")],
            fornecedores: vec![pessoa(20, "Fornecedor Vinte"), pessoa(30, "Fornecedor Trinta")],
        }
    }

    #[test]
    fn test_person_resolution_priority() {
        let refs = refs();
        let people = PersonDirectory::new(&refs.clientes, &refs.fornecedores);

        let (p, kind) = people.resolve(Some(20)).unwrap();
        assert_eq!(p.nome, "Fornecedor Vinte");
        assert_eq!(kind, PersonKind::Fornecedor);

        let (p, kind) = people.resolve(Some(30)).unwrap();
        assert_eq!(p.nome, "Cliente Trinta");
        assert_eq!(kind, PersonKind::Cliente);

        assert!(people.resolve(Some(99)).is_none());
        assert!(people.resolve(None).is_none());
    }

    #[test]
    fn test_full_resolution() {
        let mut row = tx(1);
        row.categoria_id = Some(3);
        row.centro_custo_lucro_id = Some(40);
        row.forma_pagamento_id = Some(5);
        row.pessoa_id = Some(20);
        row.pagina = 2;

        let (ledger, stats) = assemble_ledger(&[sourced(row)], &refs());
        let out = &ledger[0];

        assert_eq!(out.conta_descricao.as_deref(), Some("Itaú"));
        assert_eq!(out.categoria_descricao.as_deref(), Some("Condomínio"));
        assert_eq!(out.categoria_raiz.as_deref(), Some("Despesas"));
        assert_eq!(out.categoria_nivel_1.as_deref(), Some("Aluguel"));
        assert_eq!(out.categoria_nivel_2.as_deref(), Some("Condomínio"));
        assert_eq!(out.centro_custo_lucro_descricao.as_deref(), Some("Comercial"));
        assert_eq!(out.centro_custo_lucro_nivel_1, None);
        assert_eq!(out.forma_pagamento_descricao.as_deref(), Some("PIX"));
        assert_eq!(out.pessoa_nome.as_deref(), Some("Fornecedor Vinte"));
        assert_eq!(out.pessoa_origem, Some(PersonKind::Fornecedor));
        assert_eq!(out.arquivo, "2024_01_1_lancamentos.csv");
        assert_eq!(out.pagina, 2);
        assert_eq!(stats.rows, 1);
        assert_eq!(stats.categoria_unresolved, 0);
    }

    #[test]
    fn test_unresolvable_keys_keep_row_with_nulls() {
        let mut row = tx(7);
        row.conta_id = Some(999);
        row.conta_consulta_id = 999;
        row.categoria_id = Some(12345);
        row.pessoa_id = Some(54321);
        row.forma_pagamento_id = Some(77);

        let (ledger, stats) = assemble_ledger(&[sourced(row)], &refs());

        assert_eq!(ledger.len(), 1);
        let out = &ledger[0];
        assert_eq!(out.lancamento_id, 7);
        assert_eq!(out.conta_descricao, None);
        assert_eq!(out.categoria_id, Some(12345));
        assert_eq!(out.categoria_descricao, None);
        assert_eq!(out.pessoa_nome, None);
        assert_eq!(out.pessoa_origem, None);
        assert_eq!(out.forma_pagamento_descricao, None);

        assert_eq!(stats.conta_unresolved, 1);
        assert_eq!(stats.categoria_unresolved, 1);
        assert_eq!(stats.pessoa_unresolved, 1);
        assert_eq!(stats.forma_pagamento_unresolved, 1);
        assert_eq!(stats.unresolved(), 4);
    }

    #[test]
    fn test_unresolved_counts_account_and_payment_method() {
        let mut row = tx(9);
        row.conta_id = Some(999);
        row.forma_pagamento_id = Some(77);

        let (_, stats) = assemble_ledger(&[sourced(row)], &refs());

        assert_eq!(stats.categoria_unresolved, 0);
        assert_eq!(stats.centro_custo_lucro_unresolved, 0);
        assert_eq!(stats.pessoa_unresolved, 0);
        assert_eq!(stats.unresolved(), 2);
    }

    #[test]
    fn test_inner_category_resolves_to_truncated_path() {
        let mut row = tx(8);
        row.categoria_id = Some(2);

        let (ledger, _) = assemble_ledger(&[sourced(row)], &refs());

        assert_eq!(ledger[0].categoria_descricao.as_deref(), Some("Aluguel"));
        assert_eq!(ledger[0].categoria_nivel_2, None);
    }

    #[test]
    fn test_row_count_preserved() {
        let transactions: Vec<SourcedLancamento> = (0..50)
            .map(|i| {
                let mut row = tx(i);
                row.categoria_id = [None, Some(1), Some(2), Some(3), Some(999)][(i % 5) as usize];
                row.pessoa_id = [None, Some(10), Some(20), Some(30)][(i % 4) as usize];
                sourced(row)
            })
            .collect();

        let (ledger, stats) = assemble_ledger(&transactions, &refs());

        assert_eq!(ledger.len(), transactions.len());
        assert_eq!(stats.rows, 50);
        let ids: Vec<i64> = ledger.iter().map(|r| r.lancamento_id).collect();
        assert_eq!(ids, (0..50).collect::<Vec<i64>>());
    }

    #[test]
    fn test_duplicate_reference_ids_do_not_duplicate_rows() {
        let mut refs = refs();
        let duplicate = refs.contas[0].clone();
        refs.contas.push(duplicate);

        let (ledger, _) = assemble_ledger(&[sourced(tx(1))], &refs);
        assert_eq!(ledger.len(), 1);
    }
}
