// 🔄 Pipeline - fetch → flatten → persist → join → assemble
//
// Two halves that only talk through the TableStore:
//   Fetcher  (needs the API)  : reference tables + per-(month, account) extracts
//   assemble (disk only)      : hierarchies + consolidated ledger
//
// Strictly sequential: one account at a time, one month at a time, one page
// at a time. A failure aborts the run; files already written stay on disk.

use crate::client::{ApiClient, Endpoint, Transport};
use crate::entities::{
    Categoria, CentroCustoLucro, Conta, FormaPagamento, LancamentoRow, Pessoa,
};
use crate::fetch::{fetch_transactions, TransactionQuery};
use crate::flatten::{flatten_levels, level_rows, TreeNode};
use crate::hierarchy::{join_hierarchy, HierarchyRow, TaxonomyRow};
use crate::ledger::{assemble_ledger, ReferenceTables, ResolutionStats};
use crate::schema::{EntitySchema, SchemaReport};
use crate::store::{hierarchy_table_name, level_table_name, TableStore, LEDGER_TABLE};
use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, Months, NaiveDate};
use log::{info, warn};
use serde::Serialize;
use std::path::PathBuf;

/// Levels kept for every reference tree (root, child, grandchild)
pub const TREE_DEPTH: usize = 3;

// ============================================================================
// MONTHS
// ============================================================================

/// "2024-03" → 2024-03-01
pub fn parse_month(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", value.trim()), "%Y-%m-%d")
        .map_err(|e| anyhow!("Invalid month '{}' (expected YYYY-MM): {}", value, e))
}

/// (first day, last day) of every calendar month from `first`'s month
/// through `last`'s month, inclusive
pub fn month_ranges(first: NaiveDate, last: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut ranges = Vec::new();
    let Some(mut month) = first.with_day(1) else {
        return ranges;
    };

    while month <= last {
        let Some(next) = month.checked_add_months(Months::new(1)) else {
            break;
        };
        let Some(month_end) = next.pred_opt() else {
            break;
        };

        ranges.push((month, month_end));
        month = next;
    }

    ranges
}

// ============================================================================
// SUMMARIES
// ============================================================================

#[derive(Debug, Clone)]
pub struct ReferenceSummary {
    pub contas: Vec<Conta>,

    /// (table name, rows written)
    pub tables: Vec<(String, usize)>,

    pub reports: Vec<SchemaReport>,
}

#[derive(Debug, Clone)]
pub struct ExtractSummary {
    pub account_id: i64,
    pub month: NaiveDate,
    pub path: PathBuf,
    pub expected: usize,
    pub retrieved: usize,
    pub complete: bool,
}

#[derive(Debug, Clone)]
pub struct AssemblySummary {
    pub path: PathBuf,
    pub extracts: usize,
    pub categorias_paths: usize,
    pub centros_paths: usize,
    pub stats: ResolutionStats,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub reference: ReferenceSummary,
    pub extracts: Vec<ExtractSummary>,
    pub assembly: AssemblySummary,
}

impl RunSummary {
    /// Extracts whose row count differs from the API-reported total
    pub fn incomplete_extracts(&self) -> Vec<&ExtractSummary> {
        self.extracts.iter().filter(|e| !e.complete).collect()
    }
}

// ============================================================================
// FETCH HALF
// ============================================================================

pub struct Fetcher<'s, T: Transport> {
    client: ApiClient<T>,
    store: &'s TableStore,
}

impl<'s, T: Transport> Fetcher<'s, T> {
    pub fn new(client: ApiClient<T>, store: &'s TableStore) -> Self {
        Fetcher { client, store }
    }

    pub fn client(&self) -> &ApiClient<T> {
        &self.client
    }

    /// Fetch every reference collection and write its table(s)
    pub fn fetch_reference(&mut self) -> Result<ReferenceSummary> {
        let mut summary = ReferenceSummary {
            contas: Vec::new(),
            tables: Vec::new(),
            reports: Vec::new(),
        };

        let contas = self.fetch_flat::<Conta>(Endpoint::Contas, &mut summary)?;
        summary.contas = contas;
        self.fetch_flat::<FormaPagamento>(Endpoint::FormasPagamento, &mut summary)?;
        self.fetch_flat::<Pessoa>(Endpoint::Clientes, &mut summary)?;
        self.fetch_flat::<Pessoa>(Endpoint::Fornecedores, &mut summary)?;

        self.fetch_tree::<Categoria>(Endpoint::Categorias, &mut summary)?;
        self.fetch_tree::<CentroCustoLucro>(Endpoint::CentrosCustoLucro, &mut summary)?;

        Ok(summary)
    }

    fn fetch_flat<E>(&mut self, endpoint: Endpoint, summary: &mut ReferenceSummary) -> Result<Vec<E>>
    where
        E: EntitySchema + Serialize,
    {
        let decoded = self
            .client
            .fetch_collection::<E>(endpoint)
            .with_context(|| format!("Failed to fetch {}", endpoint.path()))?;

        self.store.write_table(endpoint.path(), &decoded.records)?;
        info!("{}: {} row(s)", endpoint.path(), decoded.records.len());

        summary
            .tables
            .push((endpoint.path().to_string(), decoded.records.len()));
        summary.reports.push(decoded.report);
        Ok(decoded.records)
    }

    fn fetch_tree<N>(&mut self, endpoint: Endpoint, summary: &mut ReferenceSummary) -> Result<()>
    where
        N: EntitySchema + TreeNode,
        N::Row: Serialize,
    {
        let decoded = self
            .client
            .fetch_collection::<N>(endpoint)
            .with_context(|| format!("Failed to fetch {}", endpoint.path()))?;

        let levels = flatten_levels(decoded.records, TREE_DEPTH);
        for (level, rows) in level_rows(&levels).iter().enumerate() {
            let name = level_table_name(endpoint.path(), level);
            self.store.write_table(&name, rows)?;
            info!("{}: {} row(s)", name, rows.len());
            summary.tables.push((name, rows.len()));
        }

        summary.reports.push(decoded.report);
        Ok(())
    }

    /// One extract per (account, month); accounts outer, months inner
    pub fn fetch_extracts(
        &mut self,
        contas: &[Conta],
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Vec<ExtractSummary>> {
        let months = month_ranges(first, last);
        let mut extracts = Vec::with_capacity(contas.len() * months.len());

        for conta in contas {
            for &(start, end) in &months {
                let query = TransactionQuery::new(conta.id, start, end);
                let result = fetch_transactions(&mut self.client, &query).with_context(|| {
                    format!("Failed to fetch lancamentos of conta {} for {}", conta.id, start)
                })?;

                let retrieved = result.records.len();
                let rows: Vec<LancamentoRow> = result
                    .records
                    .into_iter()
                    .map(|(page, lancamento)| LancamentoRow::from_fetched(lancamento, conta.id, page))
                    .collect();

                let path = self.store.write_extract(start, conta.id, &rows)?;

                extracts.push(ExtractSummary {
                    account_id: conta.id,
                    month: start,
                    path,
                    expected: result.expected,
                    retrieved,
                    complete: result.complete,
                });
            }
        }

        Ok(extracts)
    }
}

// ============================================================================
// ASSEMBLY HALF
// ============================================================================

/// Join each persisted tree's levels and write `<stem>_hierarquia`
pub fn build_hierarchy(store: &TableStore, endpoint: Endpoint) -> Result<Vec<HierarchyRow>> {
    let stem = endpoint.path();
    let mut levels: Vec<Vec<TaxonomyRow>> = Vec::with_capacity(TREE_DEPTH);
    for level in 0..TREE_DEPTH {
        levels.push(store.read_table(&level_table_name(stem, level))?);
    }

    let rows = join_hierarchy(&levels[0], &levels[1], &levels[2]);
    store.write_table(&hierarchy_table_name(stem), &rows)?;
    info!("{}: {} path(s)", hierarchy_table_name(stem), rows.len());

    Ok(rows)
}

/// Read everything back from disk and write the consolidated ledger
pub fn assemble(store: &TableStore) -> Result<AssemblySummary> {
    let refs = ReferenceTables {
        categorias: build_hierarchy(store, Endpoint::Categorias)?,
        centros_custo_lucro: build_hierarchy(store, Endpoint::CentrosCustoLucro)?,
        contas: store.read_table(Endpoint::Contas.path())?,
        formas_pagamento: store.read_table(Endpoint::FormasPagamento.path())?,
        clientes: store.read_table(Endpoint::Clientes.path())?,
        fornecedores: store.read_table(Endpoint::Fornecedores.path())?,
    };

    let extracts = store.discover_extracts()?.len();
    let transactions = store.read_extracts()?;
    info!(
        "Assembling {} lancamento(s) from {} extract(s)",
        transactions.len(),
        extracts
    );

    let (ledger, stats) = assemble_ledger(&transactions, &refs);
    let path = store.write_table(LEDGER_TABLE, &ledger)?;

    if stats.unresolved() > 0 {
        warn!(
            "Unresolved references: categoria={} centro_custo_lucro={} pessoa={} conta={} forma_pagamento={}",
            stats.categoria_unresolved,
            stats.centro_custo_lucro_unresolved,
            stats.pessoa_unresolved,
            stats.conta_unresolved,
            stats.forma_pagamento_unresolved
        );
    }

    Ok(AssemblySummary {
        path,
        extracts,
        categorias_paths: refs.categorias.len(),
        centros_paths: refs.centros_custo_lucro.len(),
        stats,
    })
}

/// Full batch: reference tables, extracts for every account, then assembly
pub fn run<T: Transport>(
    fetcher: &mut Fetcher<'_, T>,
    first: NaiveDate,
    last: NaiveDate,
) -> Result<RunSummary> {
    let reference = fetcher.fetch_reference()?;
    let extracts = fetcher.fetch_extracts(&reference.contas, first, last)?;
    let assembly = assemble(fetcher.store)?;

    let (requests, cache_hits) = fetcher.client().stats();
    info!("{} request(s), {} served from cache", requests, cache_hits);

    Ok(RunSummary {
        reference,
        extracts,
        assembly,
    })
}
