//! Dump document rendering
//!
//! Drives the resolver one entry at a time and renders each table into the
//! fixed textual framing expected by `psql`-style bulk loading: a session
//! preamble, one `COPY ... FROM stdin` data block per table, optional
//! post-load statements, and a commit postamble. The framing is byte-literal;
//! downstream load tooling depends on it.

use crate::error::DumpError;
use crate::resolver::ManifestResolver;
use crate::template::render_query;
use sampledump_catalog::SourceAdapter;
use sampledump_core::{Manifest, ManifestItem};
use std::io::Write;

const DUMP_PREAMBLE: &str = "
--
-- PostgreSQL database dump
--

BEGIN;

SET statement_timeout = 0;
SET lock_timeout = 0;
SET client_encoding = 'UTF8';
SET standard_conforming_strings = on;
SET check_function_bodies = false;
SET client_min_messages = warning;

SET search_path = public, pg_catalog;

";

const DUMP_POSTAMBLE: &str = "
COMMIT;

--
-- PostgreSQL database dump complete
--
";

const DATA_BLOCK_TERMINATOR: &str = "\\.\n";

/// Outcome of a completed dump run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpSummary {
    /// Table names in emission order
    pub tables: Vec<String>,
}

/// Stream a manifest's tables into `out` in dependency order
///
/// The run is strictly sequential: each table is fully drained (metadata
/// fetch, header, row stream, post-actions) before the next one starts. The
/// first failure at any stage aborts the run, possibly leaving a truncated
/// document in the sink; callers needing atomicity should write to a
/// temporary location and rename on success.
pub async fn write_dump<S, W>(
    source: &S,
    manifest: &Manifest,
    out: &mut W,
) -> Result<DumpSummary, DumpError>
where
    S: SourceAdapter + ?Sized,
    W: Write + Send,
{
    out.write_all(DUMP_PREAMBLE.as_bytes())?;

    let mut resolver = ManifestResolver::new(source, manifest);
    let mut tables = Vec::new();

    while let Some(item) = resolver.next_item().await? {
        write_table(source, manifest, &item, out).await?;
        tables.push(item.table);
    }

    out.write_all(DUMP_POSTAMBLE.as_bytes())?;
    out.flush()?;

    tracing::debug!(tables = tables.len(), "dump complete");

    Ok(DumpSummary { tables })
}

/// Render one resolved entry: header, row stream, terminator, post-actions
async fn write_table<S, W>(
    source: &S,
    manifest: &Manifest,
    item: &ManifestItem,
    out: &mut W,
) -> Result<(), DumpError>
where
    S: SourceAdapter + ?Sized,
    W: Write + Send,
{
    let columns = if item.columns.is_empty() {
        source
            .table_columns(&item.table)
            .await
            .map_err(|source| DumpError::Metadata {
                table: item.table.clone(),
                source,
            })?
    } else {
        item.columns.clone()
    };

    tracing::debug!(table = %item.table, columns = columns.len(), "dumping table");

    write_data_block_header(out, &item.table, &columns)?;

    let relation = match item.query.as_deref() {
        None | Some("") => item.table.clone(),
        Some(query) => {
            let rendered =
                render_query(query, &manifest.vars).map_err(|source| DumpError::Template {
                    table: item.table.clone(),
                    source,
                })?;
            format!("({})", rendered)
        }
    };

    source
        .copy_rows(&relation, out)
        .await
        .map_err(|source| DumpError::Stream {
            table: item.table.clone(),
            source,
        })?;

    out.write_all(DATA_BLOCK_TERMINATOR.as_bytes())?;

    for action in &item.post_actions {
        write!(out, "\n{};\n", action)?;
    }

    Ok(())
}

fn write_data_block_header<W: Write>(
    out: &mut W,
    table: &str,
    columns: &[String],
) -> Result<(), DumpError> {
    let quoted: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();

    write!(
        out,
        "\n--\n-- Data for Name: {}; Type: TABLE DATA\n--\n\nCOPY {} ({}) FROM stdin;\n",
        table,
        table,
        quoted.join(", ")
    )?;

    Ok(())
}

/// Quote an identifier per PostgreSQL rules: wrap in double quotes and
/// double any embedded quote
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
