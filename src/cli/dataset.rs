use anyhow::{anyhow, Context, Result};
use fd_lock::RwLock;
use std::fs::{File, OpenOptions};
use std::future::Future;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use rh_reports::{
    open_database, Dataset, InMemoryReportStore, ReportingConfig, ReportingService, SchemaRegistry,
};

/// Whether a command writes back to its data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

fn read_dataset(file: &mut File, path: &Path) -> Result<Dataset> {
    let mut raw = String::new();
    file.read_to_string(&mut raw)
        .with_context(|| format!("Failed to read dataset {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid dataset file {}", path.display()))
}

fn write_dataset(file: &mut File, dataset: &Dataset) -> Result<()> {
    let json = serde_json::to_string_pretty(dataset)?;
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

fn build_service(
    config: &ReportingConfig,
    store: Arc<dyn rh_reports::ReportStore>,
    locations: rh_reports::LocationTree,
) -> ReportingService {
    ReportingService::new(
        store,
        Arc::new(config.capabilities()),
        locations,
        SchemaRegistry::standard(),
    )
}

/// Run `f` against the dataset file at `path`, or the configured database
/// when no file is given.
///
/// The dataset file stays exclusively locked while `f` runs; with
/// [`Access::ReadWrite`] the resulting rows are written back on success.
pub async fn with_service<F, Fut, R>(
    config: &ReportingConfig,
    path: Option<&Path>,
    access: Access,
    f: F,
) -> Result<R>
where
    F: FnOnce(ReportingService) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let Some(path) = path else {
        let handle = open_database(config)
            .await?
            .ok_or_else(|| anyhow!("No --data file given and no database configured"))?;
        return f(build_service(config, handle.store, handle.locations)).await;
    };

    let file = OpenOptions::new()
        .read(true)
        .write(access == Access::ReadWrite)
        .open(path)
        .with_context(|| format!("Failed to open dataset {}", path.display()))?;
    let mut lock = RwLock::new(file);
    let mut guard = lock.try_write().map_err(|_| {
        anyhow!(
            "Dataset {} is in use by another rh-reports process",
            path.display()
        )
    })?;

    let dataset = read_dataset(&mut guard, path)?;
    let locations = dataset.location_tree();
    let store = Arc::new(InMemoryReportStore::from_dataset(dataset));
    let result = f(build_service(config, store.clone(), locations)).await?;

    if access == Access::ReadWrite {
        write_dataset(&mut guard, &store.snapshot().await)
            .with_context(|| format!("Failed to write dataset {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Dataset written");
    }

    Ok(result)
}
