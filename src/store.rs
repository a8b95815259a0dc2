// 💾 Table Store - CSV tables on disk, the only link between stages
//
// Layout (one directory):
//   contas.csv, categorias.csv, categorias_nivel_1.csv, ...   reference tables
//   2024_03_123_lancamentos.csv                                one per (month, account)
//   lancamentos_consolidados.csv                               final ledger
//
// Extracts are found by their fixed suffix; the file name travels with each
// row as provenance (`arquivo`).

use crate::entities::{LancamentoRow, SourcedLancamento};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Every transaction extract ends with this
pub const EXTRACT_SUFFIX: &str = "_lancamentos.csv";

/// Final denormalized ledger (must not end with EXTRACT_SUFFIX)
pub const LEDGER_TABLE: &str = "lancamentos_consolidados";

/// `2024_03_123_lancamentos.csv` for March 2024, account 123
pub fn extract_file_name(month: NaiveDate, account_id: i64) -> String {
    format!("{}_{}{}", month.format("%Y_%m"), account_id, EXTRACT_SUFFIX)
}

/// Table name of a flattened tree level: level 0 is the endpoint itself
pub fn level_table_name(stem: &str, level: usize) -> String {
    match level {
        0 => stem.to_string(),
        n => format!("{}_nivel_{}", stem, n),
    }
}

pub fn hierarchy_table_name(stem: &str) -> String {
    format!("{}_hierarquia", stem)
}

pub struct TableStore {
    dir: PathBuf,
}

impl TableStore {
    /// Use `dir`, creating it if needed
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        Ok(TableStore {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn table_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", name))
    }

    /// Write (overwrite) a table. An empty slice gives an empty file.
    pub fn write_table<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<PathBuf> {
        let path = self.table_path(name);
        write_rows(&path, rows)?;
        Ok(path)
    }

    /// Read a table back. A missing file is an error, an empty one is an empty table.
    pub fn read_table<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        read_rows(&self.table_path(name))
    }

    pub fn write_extract(
        &self,
        month: NaiveDate,
        account_id: i64,
        rows: &[LancamentoRow],
    ) -> Result<PathBuf> {
        let path = self.dir.join(extract_file_name(month, account_id));
        write_rows(&path, rows)?;
        Ok(path)
    }

    /// All extract files, sorted by name
    pub fn discover_extracts(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list {}", self.dir.display()))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_extract = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(EXTRACT_SUFFIX));

            if is_extract && path.is_file() {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(paths)
    }

    /// Union of every extract, in file-name order then file order
    pub fn read_extracts(&self) -> Result<Vec<SourcedLancamento>> {
        let mut sourced = Vec::new();

        for path in self.discover_extracts()? {
            let arquivo = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default()
                .to_string();

            let rows: Vec<LancamentoRow> = read_rows(&path)?;
            sourced.extend(rows.into_iter().map(|row| SourcedLancamento {
                row,
                arquivo: arquivo.clone(),
            }));
        }

        Ok(sourced)
    }
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("Failed to write row to {}", path.display()))?;
    }

    wtr.flush()?;
    Ok(())
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: T = result.with_context(|| format!("Failed to deserialize row of {}", path.display()))?;
        rows.push(row);
    }

    Ok(rows)
}
