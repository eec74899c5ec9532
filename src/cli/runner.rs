use crate::catalog::Catalog;
use crate::config::SearchConfig;
use crate::query::{self, ItemSearch};
use std::io::Write;

use super::command::Command;
use super::util::search_params;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputMode {
    Human,
    Plain,
    Json,
}

/// Runs a command with human-readable output on stdout.
///
/// # Errors
/// Returns any search, catalog or I/O error.
pub fn run(cmd: Command, cfg: &SearchConfig) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_with_format(&mut out, cmd, OutputMode::Human, cfg)
}

/// # Errors
/// Returns any search, catalog or I/O error.
pub fn run_with_format<W: Write>(
    out: &mut W,
    cmd: Command,
    mode: OutputMode,
    cfg: &SearchConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Command::Search {
            catalog,
            ids,
            collections,
            bbox,
            intersects,
            datetime,
            filter,
            filter_lang,
            count,
        } => {
            let params =
                search_params(ids, collections, bbox, intersects, datetime, filter, filter_lang);
            // Parameters are validated before the catalog is read
            crate::query::Parameters::from_params(&params)?;
            let source = Catalog::from_file(&catalog)?;
            let search = ItemSearch::with_config(source, &params, cfg.clone())?;
            if count {
                let n = search.matched()?;
                match mode {
                    OutputMode::Json => writeln!(out, "{}", serde_json::json!({"matched": n}))?,
                    OutputMode::Plain => writeln!(out, "{n}")?,
                    OutputMode::Human => writeln!(out, "matched={n}")?,
                }
                return Ok(());
            }
            let matched = search.matched()?;
            for item in search.items()? {
                match mode {
                    OutputMode::Json => writeln!(out, "{}", serde_json::to_string(&item)?)?,
                    OutputMode::Plain => writeln!(out, "{}", item.id)?,
                    OutputMode::Human => writeln!(
                        out,
                        "{} collection={} datetime={}",
                        item.id,
                        item.collection.as_deref().unwrap_or("-"),
                        item.properties.get("datetime").and_then(|v| v.as_str()).unwrap_or("-")
                    )?,
                }
            }
            if mode == OutputMode::Human {
                writeln!(out, "matched={matched}")?;
            }
            Ok(())
        }
        Command::Info { catalog } => {
            let cat = Catalog::from_file(&catalog)?;
            let id = cat.id.clone();
            let table = crate::catalog::CatalogSource::from(cat).into_table()?;
            let collections = table.collections();
            let columns: Vec<&str> = table.columns().collect();
            match mode {
                OutputMode::Json => {
                    let json = serde_json::json!({
                        "id": id,
                        "items": table.len(),
                        "collections": collections,
                        "columns": columns,
                    });
                    writeln!(out, "{json}")?;
                }
                OutputMode::Plain => {
                    writeln!(out, "items={} collections={}", table.len(), collections.len())?;
                }
                OutputMode::Human => {
                    writeln!(out, "catalog={id} items={}", table.len())?;
                    writeln!(out, "collections: {}", collections.join(", "))?;
                    writeln!(out, "columns: {}", columns.join(", "))?;
                }
            }
            Ok(())
        }
        Command::Languages => {
            let langs = query::supported_languages();
            match mode {
                OutputMode::Json => writeln!(out, "{}", serde_json::json!(langs))?,
                OutputMode::Plain | OutputMode::Human => {
                    for l in langs {
                        writeln!(out, "{l}")?;
                    }
                }
            }
            Ok(())
        }
    }
}
