//! `kustprep lists`: List files expanded by earlier runs.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use kustprep_core::{FileState, ListRecord, StateFile};

use super::DEFAULT_STATE_FILE;

/// Arguments for `kustprep lists`.
#[derive(Args, Debug)]
pub struct ListsArgs {
    /// State file to read.
    #[arg(long, default_value = DEFAULT_STATE_FILE)]
    pub state: PathBuf,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl ListsArgs {
    pub fn run(self) -> Result<()> {
        let file = FileState::new(&self.state);
        let state = file
            .load()
            .with_context(|| format!("failed to load state {}", file.path().display()))?;

        if self.json {
            return print_json(&state);
        }
        print_table(&state);
        Ok(())
    }
}

#[derive(Serialize)]
struct ListsJson<'a> {
    updated_at: String,
    lists: Vec<ListJson<'a>>,
}

#[derive(Serialize)]
struct ListJson<'a> {
    path: String,
    api_version: &'a str,
    items: Vec<String>,
}

#[derive(Tabled)]
struct ListTableRow {
    #[tabled(rename = "list")]
    path: String,
    #[tabled(rename = "apiVersion")]
    api_version: String,
    #[tabled(rename = "items")]
    items: String,
}

fn print_json(state: &StateFile) -> Result<()> {
    let payload = ListsJson {
        updated_at: state.updated_at.to_rfc3339(),
        lists: state
            .lists
            .iter()
            .map(|list| ListJson {
                path: list.path.display().to_string(),
                api_version: &list.api_version,
                items: list.items.iter().map(ToString::to_string).collect(),
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize lists JSON")?
    );
    Ok(())
}

fn print_table(state: &StateFile) {
    if state.lists.is_empty() {
        println!("No List files recorded.");
        return;
    }

    let rows: Vec<ListTableRow> = state.lists.iter().map(table_row).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!(
        "{} lists, last updated {}",
        state.lists.len(),
        state.updated_at.to_rfc3339()
    );
}

fn table_row(list: &ListRecord) -> ListTableRow {
    ListTableRow {
        path: list.path.display().to_string(),
        api_version: list.api_version.clone(),
        items: list
            .items
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
