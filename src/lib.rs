// Tesouraria - Granatum ledger extraction
// Exposes all modules for use in the CLI and tests

pub mod config;
pub mod error;
pub mod cache;      // SQLite response cache
pub mod client;     // Granatum endpoints over a pluggable transport
pub mod schema;     // Shape layer - explicit entity schemas
pub mod entities;   // Conta, Categoria, CentroCustoLucro, FormaPagamento, Pessoa, Lancamento
pub mod fetch;      // Count-then-page fetcher
pub mod flatten;    // Tree → fixed-depth level tables
pub mod hierarchy;  // Level tables → root-to-leaf paths
pub mod store;      // CSV tables on disk
pub mod ledger;     // Consolidated ledger assembly
pub mod pipeline;   // Stage orchestration

// Re-export commonly used types
pub use cache::{default_ttl, CachedResponse, ResponseCache};
pub use client::{ApiClient, ApiResponse, Endpoint, HttpTransport, Transport};
pub use config::Config;
pub use entities::{
    Categoria, CentroCustoLucro, Conta, FormaPagamento, Lancamento, LancamentoRow, Pessoa,
    PersonKind,
};
pub use error::ApiError;
pub use fetch::{fetch_transactions, Paginated, TransactionQuery, PAGE_SIZE};
pub use flatten::{flatten_levels, TreeNode};
pub use hierarchy::{join_hierarchy, HierarchyRow, TaxonomyIndex, TaxonomyRow};
pub use ledger::{assemble_ledger, LedgerRow, ReferenceTables, ResolutionStats};
pub use pipeline::{
    assemble, month_ranges, parse_month, run, AssemblySummary, ExtractSummary, Fetcher,
    ReferenceSummary, RunSummary,
};
pub use schema::{EntitySchema, SchemaReport};
pub use store::TableStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
