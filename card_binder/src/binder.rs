//! Binder creation and management
//!
//! [`create_binder`] is the whole `create` pipeline: parse the inventory,
//! resolve every distinct card through the cache, render the view in
//! inventory order, write it out and register it.

use crate::cache::{CacheStore, CachedCardRecord, MetadataCache};
use crate::card_key::CardKey;
use crate::config::{FailurePolicy, OutputMode, Settings};
use crate::error::{BinderError, ResolveError, Result};
use crate::fetcher::CardFetcher;
use crate::inventory::{read_inventory, InventoryEntry};
use crate::registry::{self, BinderRecord, DEFAULT_BINDER_ID};
use crate::render::{self, BinderManifest, MANIFEST_FILE_NAME};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Input of a `create` run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    pub inventory: PathBuf,
    pub output_dir: PathBuf,
    pub name: Option<String>,
    pub id: Option<String>,
}

/// What a `create` run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinderSummary {
    pub id: String,
    pub name: String,
    pub output_dir: PathBuf,
    /// Inventory entries rendered
    pub cards: usize,
    /// Distinct card keys resolved
    pub distinct_cards: usize,
    pub not_found: usize,
    /// Keys rendered as placeholders after a transient failure
    pub unavailable: usize,
    pub pages: usize,
}

fn lock_store(store: &Mutex<CacheStore>) -> MutexGuard<'_, CacheStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Pick the binder id and display name.
///
/// An explicit id wins and doubles as the name when none is given. Without
/// either, the name is `default` and the id the first free `default[_N]`.
pub fn binder_identity(
    store: &CacheStore,
    name: Option<&str>,
    id: Option<&str>,
) -> Result<(String, String)> {
    let (id, name) = match (id, name) {
        (Some(id), Some(name)) => (registry::sanitize_binder_id(id), name.to_string()),
        (Some(id), None) => (registry::sanitize_binder_id(id), id.to_string()),
        (None, Some(name)) => (registry::sanitize_binder_id(name), name.to_string()),
        (None, None) => (
            registry::unique_binder_id(store.connection(), DEFAULT_BINDER_ID)?,
            DEFAULT_BINDER_ID.to_string(),
        ),
    };
    if name.trim().is_empty() || id.is_empty() {
        return Err(BinderError::BlankName);
    }
    Ok((id, name))
}

/// Distinct keys in first-appearance order
fn distinct_keys(entries: &[InventoryEntry]) -> Vec<CardKey> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .map(CardKey::from_entry)
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

/// Whether a failed lookup ends the run under `policy`
fn is_fatal(result: &std::result::Result<CachedCardRecord, ResolveError>, policy: FailurePolicy) -> bool {
    match result {
        Ok(_) => false,
        Err(ResolveError::Store { .. }) => true,
        Err(ResolveError::Transient(_)) => policy == FailurePolicy::Abort,
    }
}

/// Resolve keys with at most `max_concurrency` in flight; results keep key order.
///
/// The first fatal failure closes the semaphore so no further lookup starts,
/// and lookups already in flight are cancelled. The error reported is the
/// first fatal one in key order.
async fn resolve_all<F: CardFetcher>(
    cache: &Arc<MetadataCache<F>>,
    keys: &[CardKey],
    max_concurrency: usize,
    policy: FailurePolicy,
) -> Result<Vec<std::result::Result<CachedCardRecord, ResolveError>>> {
    let semaphore = Arc::new(Semaphore::new(
        max_concurrency.clamp(1, Semaphore::MAX_PERMITS),
    ));
    let mut tasks = JoinSet::new();

    for (i, key) in keys.iter().enumerate() {
        let cache = Arc::clone(cache);
        let semaphore = Arc::clone(&semaphore);
        let key = key.clone();
        tasks.spawn(async move {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                return (i, None);
            };
            let result = cache.resolve(&key).await;
            if is_fatal(&result, policy) {
                // Closed while the permit is held, so no waiter slips in
                semaphore.close();
            }
            drop(permit);
            (i, Some(result))
        });
    }

    let mut results = vec![None; keys.len()];
    let mut done = 0;
    let mut stopped = false;
    while let Some(joined) = tasks.join_next().await {
        let (i, result) = match joined {
            Ok((i, Some(result))) => (i, result),
            Ok((_, None)) => continue,
            Err(e) if e.is_cancelled() => continue,
            Err(e) => return Err(BinderError::Task(e.to_string())),
        };
        if !stopped && is_fatal(&result, policy) {
            log::warn!("Lookup of {} failed, cancelling remaining lookups", keys[i]);
            tasks.abort_all();
            stopped = true;
        }
        results[i] = Some(result);
        done += 1;
        if done % 25 == 0 {
            log::info!("Resolved {}/{} cards", done, keys.len());
        }
    }

    if stopped {
        let first_fatal = results
            .into_iter()
            .flatten()
            .find(|result| is_fatal(result, policy));
        if let Some(Err(err)) = first_fatal {
            return Err(err.into());
        }
        return Err(BinderError::Task("lookups were cancelled".to_string()));
    }

    results
        .into_iter()
        .zip(keys)
        .map(|(result, key)| {
            result.ok_or_else(|| BinderError::Task(format!("no result for {}", key)))
        })
        .collect()
}

/// Run the `create` pipeline.
///
/// Nothing is written unless every line parses and the output directory
/// passes its precondition check.
pub async fn create_binder<F: CardFetcher>(
    cache: Arc<MetadataCache<F>>,
    request: &CreateRequest,
    settings: &Settings,
) -> Result<BinderSummary> {
    settings.validate()?;

    log::info!("(1/5) Reading cards from {}...", request.inventory.display());
    let entries = read_inventory(&request.inventory, &settings.parse)?;
    if entries.is_empty() {
        return Err(BinderError::EmptyInventory);
    }
    let (id, name) = binder_identity(
        &lock_store(cache.store()),
        request.name.as_deref(),
        request.id.as_deref(),
    )?;
    render::check_output_dir(&request.output_dir, settings.output_mode)?;

    let keys = distinct_keys(&entries);
    log::info!(
        "(2/5) Resolving {} distinct cards ({} entries)...",
        keys.len(),
        entries.len()
    );
    let results = resolve_all(
        &cache,
        &keys,
        settings.fetch.max_concurrency,
        settings.failure_policy,
    )
    .await?;

    let now = Utc::now();
    let mut records = HashMap::with_capacity(keys.len());
    let mut unavailable = 0;
    for (key, result) in keys.iter().zip(results) {
        let record = match result {
            Ok(record) => record,
            Err(ResolveError::Transient(err))
                if settings.failure_policy == FailurePolicy::BestEffort =>
            {
                log::warn!("Rendering placeholder for {}: {}", key, err.source);
                unavailable += 1;
                CachedCardRecord::unavailable(key.clone(), now)
            }
            Err(err) => return Err(err.into()),
        };
        records.insert(key.clone(), record);
    }
    let not_found = records
        .values()
        .filter(|r| r.status == crate::cache::FetchStatus::NotFound)
        .count();

    log::info!("(3/5) Generating binder pages...");
    let pairs = entries
        .into_iter()
        .map(|entry| {
            let key = CardKey::from_entry(&entry);
            records
                .get(&key)
                .cloned()
                .map(|record| (entry, record))
                .ok_or_else(|| BinderError::Task(format!("no record for {}", key)))
        })
        .collect::<Result<Vec<_>>>()?;
    let image_dir = lock_store(cache.store()).image_dir().to_path_buf();
    let rendered = render::render_binder(&name, &pairs, settings.layout, &image_dir)?;

    log::info!("(4/5) Writing binder view to {}...", request.output_dir.display());
    render::write_binder(&request.output_dir, &rendered, settings.output_mode)?;

    log::info!("(5/5) Registering binder `{}`...", id);
    let output_dir = request
        .output_dir
        .canonicalize()
        .unwrap_or_else(|_| request.output_dir.clone());
    registry::save_binder(
        lock_store(cache.store()).connection(),
        &BinderRecord {
            id: id.clone(),
            name: name.clone(),
            path: output_dir.to_string_lossy().to_string(),
            card_count: pairs.len(),
        },
    )?;

    log::info!(
        "Done! Binder view `{}` is now ready at {}",
        id,
        output_dir.join("index.html").display()
    );
    Ok(BinderSummary {
        id,
        name,
        output_dir,
        cards: pairs.len(),
        distinct_cards: keys.len(),
        not_found,
        unavailable,
        pages: rendered.pages.len(),
    })
}

/// Look up a registered binder and, when still on disk, its `binder.json`
pub fn show_binder(store: &CacheStore, id: &str) -> Result<(BinderRecord, Option<BinderManifest>)> {
    let binder = registry::get_binder(store.connection(), id)?
        .ok_or_else(|| BinderError::UnknownBinder(id.to_string()))?;
    let manifest_path = PathBuf::from(&binder.path).join(MANIFEST_FILE_NAME);
    let manifest = if manifest_path.is_file() {
        Some(BinderManifest::from_file(&manifest_path)?)
    } else {
        log::warn!("No {} found at {}", MANIFEST_FILE_NAME, binder.path);
        None
    };
    Ok((binder, manifest))
}

/// Changes requested for a registered binder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinderEdit {
    pub id: Option<String>,
    pub name: Option<String>,
    /// New location of the binder view, e.g. after moving it
    pub path: Option<PathBuf>,
}

impl BinderEdit {
    fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none() && self.path.is_none()
    }
}

/// Change a binder's id, name or path.
///
/// The registry entry is updated first. If the view's `binder.json` can be
/// read at the resulting path and the name changed, the pages and index are
/// regenerated under the new name.
pub fn edit_binder(store: &CacheStore, id: &str, edit: &BinderEdit) -> Result<BinderRecord> {
    let conn = store.connection();
    let current = registry::get_binder(conn, id)?
        .ok_or_else(|| BinderError::UnknownBinder(id.to_string()))?;
    if edit.is_empty() {
        log::info!("Nothing to change for binder `{}`", id);
        return Ok(current);
    }

    let mut binder = current.clone();
    if let Some(new_id) = &edit.id {
        if new_id.trim().is_empty() {
            return Err(BinderError::BlankId);
        }
        let new_id = registry::sanitize_binder_id(new_id.trim());
        if new_id != current.id && registry::get_binder(conn, &new_id)?.is_some() {
            return Err(BinderError::DuplicateBinder(new_id));
        }
        binder.id = new_id;
    }
    if let Some(name) = &edit.name {
        if name.trim().is_empty() {
            return Err(BinderError::BlankName);
        }
        binder.name = name.clone();
    }
    if let Some(path) = &edit.path {
        let path = path.canonicalize().unwrap_or_else(|_| path.clone());
        binder.path = path.to_string_lossy().to_string();
    }

    registry::update_binder(conn, &current.id, &binder)?;
    log::info!("Updated binder `{}`", binder.id);

    let dir = PathBuf::from(&binder.path);
    let manifest = match BinderManifest::from_file(&dir.join(MANIFEST_FILE_NAME)) {
        Ok(manifest) => manifest,
        Err(e) => {
            log::warn!("Registry updated, but the binder view at {} could not be read: {}", binder.path, e);
            log::warn!("Point the path at a valid binder view directory to keep it in sync");
            return Ok(binder);
        }
    };
    if manifest.name != binder.name {
        log::info!("Name has been updated; regenerating binder view...");
        let rendered = render::rerender_binder(&BinderManifest {
            name: binder.name.clone(),
            ..manifest
        })?;
        render::write_binder(&dir, &rendered, OutputMode::Overwrite)?;
    }
    Ok(binder)
}

/// Unregister a binder, optionally deleting its output directory
pub fn delete_binder(store: &CacheStore, id: &str, delete_directory: bool) -> Result<BinderRecord> {
    let binder = registry::get_binder(store.connection(), id)?
        .ok_or_else(|| BinderError::UnknownBinder(id.to_string()))?;
    registry::delete_binder(store.connection(), id)?;

    if delete_directory {
        let path = PathBuf::from(&binder.path);
        if path.is_dir() {
            std::fs::remove_dir_all(&path)?;
            log::info!("Deleted {}", path.display());
        } else {
            log::warn!("Binder directory {} no longer exists", path.display());
        }
    }
    Ok(binder)
}
