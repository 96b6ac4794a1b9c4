//! Dataset snapshot export: denormalized match rows as parquet plus a
//! checksum manifest.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow_array::{Float64Array, Int16Array, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field as ArrowField, Schema};
use parquet::arrow::ArrowWriter;
use pitch_storage::{ExportMatchRow, Store};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotManifest {
    pub schema_version: u32,
    pub files: Vec<SnapshotFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotFile {
    pub name: String,
    pub path: String,
    pub sha256: String,
    pub bytes: u64,
}

/// Export every persisted match, with its odds columns, to
/// `<out_dir>/matches.parquet` and write `manifest.json` next to it.
pub async fn export_snapshot(store: &Store, out_dir: &Path) -> Result<SnapshotManifest> {
    let rows = store.export_match_rows().await?;
    fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let matches_path = out_dir.join("matches.parquet");
    write_matches_parquet(&matches_path, &rows)?;

    let manifest = SnapshotManifest {
        schema_version: 1,
        files: vec![manifest_entry("matches", out_dir, &matches_path)?],
    };

    let manifest_path = out_dir.join("manifest.json");
    let bytes = serde_json::to_vec_pretty(&manifest).context("serializing snapshot manifest")?;
    fs::write(&manifest_path, bytes)
        .await
        .with_context(|| format!("writing {}", manifest_path.display()))?;

    info!(rows = rows.len(), dir = %out_dir.display(), "snapshot exported");
    Ok(manifest)
}

pub fn write_matches_parquet(path: &PathBuf, rows: &[ExportMatchRow]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        ArrowField::new("match_id", DataType::Int64, false),
        ArrowField::new("league", DataType::Utf8, false),
        ArrowField::new("season", DataType::Utf8, false),
        ArrowField::new("home", DataType::Utf8, false),
        ArrowField::new("away", DataType::Utf8, false),
        ArrowField::new("date", DataType::Utf8, false),
        ArrowField::new("status", DataType::Utf8, false),
        ArrowField::new("home_goals", DataType::Int16, true),
        ArrowField::new("away_goals", DataType::Int16, true),
        ArrowField::new("home_max", DataType::Float64, true),
        ArrowField::new("draw_max", DataType::Float64, true),
        ArrowField::new("away_max", DataType::Float64, true),
        ArrowField::new("max_over_2_5", DataType::Float64, true),
        ArrowField::new("max_under_2_5", DataType::Float64, true),
    ]));

    let match_ids = Int64Array::from(rows.iter().map(|r| r.match_id).collect::<Vec<_>>());
    let leagues = StringArray::from(
        rows.iter()
            .map(|r| Some(r.league_code.as_str()))
            .collect::<Vec<_>>(),
    );
    let seasons = StringArray::from(
        rows.iter()
            .map(|r| Some(r.season.as_str()))
            .collect::<Vec<_>>(),
    );
    let homes = StringArray::from(
        rows.iter()
            .map(|r| Some(r.home_name.as_str()))
            .collect::<Vec<_>>(),
    );
    let aways = StringArray::from(
        rows.iter()
            .map(|r| Some(r.away_name.as_str()))
            .collect::<Vec<_>>(),
    );
    let dates = StringArray::from(
        rows.iter()
            .map(|r| Some(r.date.to_string()))
            .collect::<Vec<_>>(),
    );
    let statuses = StringArray::from(
        rows.iter()
            .map(|r| Some(r.status.as_str()))
            .collect::<Vec<_>>(),
    );
    let home_goals = Int16Array::from(rows.iter().map(|r| r.home_goals).collect::<Vec<_>>());
    let away_goals = Int16Array::from(rows.iter().map(|r| r.away_goals).collect::<Vec<_>>());
    let home_max = Float64Array::from(rows.iter().map(|r| r.home_max).collect::<Vec<_>>());
    let draw_max = Float64Array::from(rows.iter().map(|r| r.draw_max).collect::<Vec<_>>());
    let away_max = Float64Array::from(rows.iter().map(|r| r.away_max).collect::<Vec<_>>());
    let max_over = Float64Array::from(rows.iter().map(|r| r.max_over).collect::<Vec<_>>());
    let max_under = Float64Array::from(rows.iter().map(|r| r.max_under).collect::<Vec<_>>());

    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(match_ids),
            Arc::new(leagues),
            Arc::new(seasons),
            Arc::new(homes),
            Arc::new(aways),
            Arc::new(dates),
            Arc::new(statuses),
            Arc::new(home_goals),
            Arc::new(away_goals),
            Arc::new(home_max),
            Arc::new(draw_max),
            Arc::new(away_max),
            Arc::new(max_over),
            Arc::new(max_under),
        ],
    )
    .context("building matches record batch")?;

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
        .with_context(|| format!("opening parquet writer {}", path.display()))?;
    writer
        .write(&batch)
        .with_context(|| format!("writing record batch {}", path.display()))?;
    writer
        .close()
        .with_context(|| format!("closing parquet writer {}", path.display()))?;
    Ok(())
}

pub fn manifest_entry(name: &str, out_dir: &Path, path: &Path) -> Result<SnapshotFile> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let sha256 = hex::encode(hasher.finalize());
    let rel = path.strip_prefix(out_dir).unwrap_or(path).display().to_string();
    Ok(SnapshotFile {
        name: name.to_string(),
        path: rel,
        sha256,
        bytes: bytes.len() as u64,
    })
}
