//! Single-page replacement and scoped re-assembly
//!
//! Work on one ebook is serialized through a lock keyed by its id. Different
//! ebooks never wait on each other.

use crate::export::{ExportEngine, ExportReport, ExportRequest};
use crate::policy::PolicyTable;
use crate::types::*;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Result of replacing one page
#[derive(Debug, Clone)]
pub struct Regeneration {
    pub page_index: usize,
    pub role: PageRole,
    /// Artifacts that contain the replaced page
    pub reassembled: Vec<ArtifactKind>,
    pub report: ExportReport,
}

#[derive(Debug)]
pub struct RegenerationCoordinator {
    engine: ExportEngine,
    locks: Mutex<HashMap<EbookId, Arc<Mutex<()>>>>,
}

impl RegenerationCoordinator {
    pub fn new(policy: Arc<PolicyTable>) -> Result<Self> {
        Ok(Self {
            engine: ExportEngine::new(policy)?,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn engine(&self) -> &ExportEngine {
        &self.engine
    }

    /// Run `f` while holding the ebook's lock. Calls for the same id run
    /// one at a time; calls for different ids do not wait on each other.
    pub fn with_ebook_lock<T>(&self, id: &EbookId, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(id);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        self.release(id, lock);
        result
    }

    /// Ebooks with a call in flight or waiting
    pub fn locked_ebooks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn lock_for(&self, id: &EbookId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(id.clone()).or_default().clone()
    }

    /// Drop the table entry once no other caller holds or awaits it
    fn release(&self, id: &EbookId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(lock);
        if locks.get(id).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(id);
        }
    }

    /// Export under the ebook's lock
    pub fn export(
        &self,
        ebook: &Ebook,
        pages: &PageSet,
        request: &ExportRequest,
    ) -> Result<ExportReport> {
        self.with_ebook_lock(&ebook.id, || self.engine.export(ebook, pages, request))
    }

    /// Replace exactly one page, then re-validate and rebuild only the
    /// requested artifacts that contain it.
    ///
    /// Published ebooks are rejected before anything is touched.
    pub fn replace_page(
        &self,
        ebook: &Ebook,
        pages: &mut PageSet,
        selector: PageSelector,
        buffer: PixelBuffer,
        request: &ExportRequest,
    ) -> Result<Regeneration> {
        self.with_ebook_lock(&ebook.id, || {
            self.replace_locked(ebook, pages, selector, buffer, request)
        })
    }

    fn replace_locked(
        &self,
        ebook: &Ebook,
        pages: &mut PageSet,
        selector: PageSelector,
        buffer: PixelBuffer,
        request: &ExportRequest,
    ) -> Result<Regeneration> {
        ebook.status.guard_page_mutation()?;

        let page = pages.replace(selector, buffer, Utc::now())?;
        let (page_index, role) = (page.index, page.role);

        let reassembled: Vec<ArtifactKind> = ArtifactKind::affected_by(role)
            .iter()
            .copied()
            .filter(|kind| request.wants(*kind))
            .collect();
        log::info!(
            "replaced {} page {} of {}; reassembling {:?}",
            role,
            page_index,
            ebook.id,
            reassembled
        );

        let scoped = ExportRequest {
            kinds: reassembled.clone(),
            ..request.clone()
        };
        let report = self.engine.export(ebook, pages, &scoped)?;

        Ok(Regeneration {
            page_index,
            role,
            reassembled,
            report,
        })
    }
}
