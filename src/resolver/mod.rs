//! Resolution cache and unpack deduplication.
//!
//! A page that links to another book typically triggers several requests at
//! once (`.distribution`, `meta.json`, the `.htm` file). [`BookResolver`]
//! makes sure all of them share a single unpack of that book, and that later
//! requests are answered from the cache without touching the disk.

pub mod resource;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

use crate::archive::{ArchiveLocator, ArchiveUnpacker};
use crate::error::ResolveError;
use crate::url::BookRequest;

/// Outcome of resolving a book id to its unpacked folder.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The book is unpacked at this folder.
    Resolved(PathBuf),
    /// No archive exists for the book. Not cached: a later call searches again.
    NotFound,
    Failed(ResolveError),
}

impl Resolution {
    pub fn folder(&self) -> Option<&Path> {
        match self {
            Resolution::Resolved(folder) => Some(folder),
            _ => None,
        }
    }
}

type PendingUnpack = Shared<BoxFuture<'static, Resolution>>;

#[derive(Default)]
struct ResolverState {
    unpacked: HashMap<String, PathBuf>,
    in_flight: HashMap<String, PendingUnpack>,
}

/// Maps book ids to unpacked folders, unpacking each book at most once at a
/// time and caching successful unpacks for the lifetime of the resolver.
///
/// Cloning is cheap and clones share the same cache. Unpacks run on spawned
/// tokio tasks, so the resolver must be used inside a tokio runtime.
#[derive(Clone)]
pub struct BookResolver {
    locator: Arc<dyn ArchiveLocator>,
    unpacker: Arc<dyn ArchiveUnpacker>,
    state: Arc<Mutex<ResolverState>>,
}

impl fmt::Debug for BookResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        f.debug_struct("BookResolver")
            .field("unpacked", &state.unpacked.len())
            .field("in_flight", &state.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl BookResolver {
    pub fn new(locator: Arc<dyn ArchiveLocator>, unpacker: Arc<dyn ArchiveUnpacker>) -> Self {
        Self {
            locator,
            unpacker,
            state: Arc::default(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ResolverState> {
        lock(&self.state)
    }

    /// Folder of an already unpacked book. Never does I/O.
    pub fn cached_folder(&self, book_id: &str) -> Option<PathBuf> {
        self.lock_state().unpacked.get(book_id).cloned()
    }

    pub fn cached_count(&self) -> usize {
        self.lock_state().unpacked.len()
    }

    /// Resolve a cross-book request URL to the file it refers to.
    ///
    /// Returns `None` when the URL is not a cross-book reference or when the
    /// book or file cannot be found; the reason is logged.
    pub async fn resolve_resource_path(
        &self,
        request_url: &str,
        search_folder: &Path,
    ) -> Option<PathBuf> {
        let request = BookRequest::parse(request_url)?;
        debug!(
            book_id = %request.book_id,
            file = %request.requested_file,
            "cross-book request"
        );

        match self
            .resolve_unpacked_folder(&request.book_id, search_folder)
            .await
        {
            Resolution::Resolved(folder) => {
                let path = resource::resolve_file(&folder, &request.requested_file).await?;
                debug!(path = %path.display(), "resolved cross-book resource");
                Some(path)
            }
            Resolution::NotFound => {
                warn!(
                    book_id = %request.book_id,
                    folder = %search_folder.display(),
                    "book not found"
                );
                None
            }
            Resolution::Failed(e) => {
                error!(book_id = %request.book_id, error = %e, "failed to get book path");
                None
            }
        }
    }

    /// Resolve `book_id` to the folder its archive is unpacked in.
    ///
    /// Concurrent calls for the same book share one locate-and-unpack; calls
    /// for different books proceed independently. Only successful unpacks are
    /// cached.
    pub async fn resolve_unpacked_folder(&self, book_id: &str, search_folder: &Path) -> Resolution {
        if book_id.trim().is_empty() {
            error!("invalid book id");
            return Resolution::Failed(ResolveError::InvalidInput { field: "book id" });
        }
        if search_folder.to_string_lossy().trim().is_empty() {
            error!(book_id, "invalid search folder");
            return Resolution::Failed(ResolveError::InvalidInput {
                field: "search folder",
            });
        }

        let pending = {
            let mut state = self.lock_state();
            if let Some(folder) = state.unpacked.get(book_id) {
                return Resolution::Resolved(folder.clone());
            }

            match state.in_flight.get(book_id) {
                Some(pending) => {
                    debug!(book_id, "waiting for unpack already in progress");
                    pending.clone()
                }
                None => {
                    debug!(book_id, "book not in cache");
                    let pending = self.spawn_unpack(book_id, search_folder);
                    state.in_flight.insert(book_id.to_string(), pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Start locating and unpacking a book on its own task.
    ///
    /// Must be called with the state locked; the task cannot settle before
    /// the caller has registered the returned future.
    fn spawn_unpack(&self, book_id: &str, search_folder: &Path) -> PendingUnpack {
        let guard = InFlightGuard {
            state: Arc::clone(&self.state),
            book_id: book_id.to_string(),
            settled: false,
        };
        let locator = Arc::clone(&self.locator);
        let unpacker = Arc::clone(&self.unpacker);
        let search_folder = search_folder.to_path_buf();

        let task = tokio::spawn(async move {
            let resolution =
                locate_and_unpack(&*locator, &*unpacker, &guard.book_id, &search_folder).await;
            guard.settle(&resolution);
            resolution
        });

        let book_id = book_id.to_string();
        async move {
            match task.await {
                Ok(resolution) => resolution,
                Err(e) => {
                    error!(book_id = %book_id, error = %e, "unpack task ended abnormally");
                    Resolution::Failed(ResolveError::TaskAborted { book_id })
                }
            }
        }
        .boxed()
        .shared()
    }
}

fn lock(state: &Mutex<ResolverState>) -> MutexGuard<'_, ResolverState> {
    // every update is a single insert or remove, so a poisoned map is still consistent
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn locate_and_unpack(
    locator: &dyn ArchiveLocator,
    unpacker: &dyn ArchiveUnpacker,
    book_id: &str,
    search_folder: &Path,
) -> Resolution {
    let archive = match locator.locate(book_id, search_folder).await {
        Ok(Some(archive)) => archive,
        Ok(None) => {
            info!(book_id, folder = %search_folder.display(), "no bloomPUB found for book");
            return Resolution::NotFound;
        }
        Err(cause) => {
            let reason = format!("{cause:#}");
            error!(book_id, error = %reason, "failed to search for bloomPUB");
            return Resolution::Failed(ResolveError::Locate {
                book_id: book_id.to_string(),
                cause: Arc::new(cause),
            });
        }
    };

    info!(book_id, archive = %archive.display(), "unpacking bloomPUB");
    match unpacker.unpack(&archive, false).await {
        Ok(unpacked) if !unpacked.unpacked_to_folder_path.as_os_str().is_empty() => {
            Resolution::Resolved(unpacked.unpacked_to_folder_path)
        }
        Ok(_) => {
            error!(book_id, archive = %archive.display(), "unpacking returned no folder");
            Resolution::Failed(ResolveError::IncompleteUnpack { archive })
        }
        Err(cause) => {
            let reason = format!("{cause:#}");
            error!(book_id, archive = %archive.display(), error = %reason, "error unpacking book");
            Resolution::Failed(ResolveError::Unpack {
                archive,
                cause: Arc::new(cause),
            })
        }
    }
}

/// Owns a book's in-flight entry until the unpack settles.
///
/// Settling moves a successful result into the cache and drops the in-flight
/// entry in one critical section. If the task unwinds or is torn down
/// instead, dropping the guard still removes the entry.
struct InFlightGuard {
    state: Arc<Mutex<ResolverState>>,
    book_id: String,
    settled: bool,
}

impl InFlightGuard {
    fn settle(mut self, resolution: &Resolution) {
        let mut state = lock(&self.state);
        if let Resolution::Resolved(folder) = resolution {
            state.unpacked.insert(self.book_id.clone(), folder.clone());
        }
        state.in_flight.remove(&self.book_id);
        drop(state);
        self.settled = true;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.settled {
            lock(&self.state).in_flight.remove(&self.book_id);
        }
    }
}
