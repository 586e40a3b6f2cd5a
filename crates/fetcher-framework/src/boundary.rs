//! # Fallible Regions
//!
//! Two nested recovery scopes for a page that renders the result of a read:
//!
//! 1. **Scoped region** ([`scoped_region`]): catches the *expected* failure of a named read and
//!    renders it in place, inside the page chrome, with a [`RetryTrigger::Revalidate`].
//! 2. **Page boundary** ([`page_boundary`]): catches everything else, returned
//!    [`RenderError`]s and panics alike, and replaces the whole page with a recovery view
//!    offering [`RetryTrigger::Reload`].
//!
//! A fetch failure is turned into a [`Region::Failed`] value, which is ordinary data. It can
//! therefore never reach the page boundary, while a defect in the region's own rendering code
//! still does.

use crate::error::RenderError;
use crate::loader::FetchPhase;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error};

/// The command a fallback view offers to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryTrigger {
    /// Re-run the read; the rest of the page is kept.
    Revalidate,
    /// Rebuild the page from scratch, then re-run the read.
    Reload,
}

/// Whether rendered data is the outcome of the latest read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    /// A read is in flight; the data is from the previous successful one.
    Refreshing,
}

/// Fallback of a scoped region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedFailure {
    pub message: String,
    pub retry: RetryTrigger,
}

/// Content of a scoped region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Region<C> {
    /// Nothing to show yet.
    Pending,
    Ready(C),
    Failed(ScopedFailure),
}

impl<C> Region<C> {
    pub fn content(&self) -> Option<&C> {
        match self {
            Region::Ready(content) => Some(content),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&ScopedFailure> {
        match self {
            Region::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Renders the region for a read.
///
/// * `Failed` becomes [`Region::Failed`], never an error.
/// * `Loading` keeps showing `last_loaded` as [`Freshness::Refreshing`] when there is one.
/// * `Idle`, or `Loading` with nothing loaded before, is [`Region::Pending`].
///
/// Errors from `render` are defects and are returned unchanged for the page boundary.
pub fn scoped_region<T, C>(
    phase: &FetchPhase<T>,
    last_loaded: Option<&T>,
    render: impl FnOnce(&T, Freshness) -> Result<C, RenderError>,
) -> Result<Region<C>, RenderError> {
    match phase {
        FetchPhase::Loaded(data) => render(data, Freshness::Fresh).map(Region::Ready),
        FetchPhase::Failed(message) => {
            debug!(%message, "Scoped failure");
            Ok(Region::Failed(ScopedFailure {
                message: message.clone(),
                retry: RetryTrigger::Revalidate,
            }))
        }
        FetchPhase::Loading => match last_loaded {
            Some(data) => render(data, Freshness::Refreshing).map(Region::Ready),
            None => Ok(Region::Pending),
        },
        FetchPhase::Idle => Ok(Region::Pending),
    }
}

/// Page chrome that stays visible whatever the region shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chrome {
    pub title: String,
}

impl Chrome {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

/// Full-page fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryView {
    pub message: String,
    pub retry: RetryTrigger,
}

/// A rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page<C> {
    Rendered { chrome: Chrome, body: Region<C> },
    Recovery(RecoveryView),
}

impl<C> Page<C> {
    pub fn chrome(&self) -> Option<&Chrome> {
        match self {
            Page::Rendered { chrome, .. } => Some(chrome),
            Page::Recovery(_) => None,
        }
    }

    pub fn body(&self) -> Option<&Region<C>> {
        match self {
            Page::Rendered { body, .. } => Some(body),
            Page::Recovery(_) => None,
        }
    }

    pub fn recovery(&self) -> Option<&RecoveryView> {
        match self {
            Page::Recovery(view) => Some(view),
            Page::Rendered { .. } => None,
        }
    }
}

/// Renders a page, replacing it with a [`RecoveryView`] on any defect.
///
/// `body` may fail with a [`RenderError`] or panic; both are caught here.
pub fn page_boundary<C>(
    chrome: Chrome,
    body: impl FnOnce() -> Result<Region<C>, RenderError>,
) -> Page<C> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(body))
        .unwrap_or_else(|payload| Err(RenderError::Panic(panic_message(payload.as_ref()))));
    match outcome {
        Ok(body) => Page::Rendered { chrome, body },
        Err(e) => {
            error!(title = %chrome.title, error = %e, "Page boundary caught a defect");
            Page::Recovery(RecoveryView {
                message: e.to_string(),
                retry: RetryTrigger::Reload,
            })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(data: &Vec<u32>, _: Freshness) -> Result<u32, RenderError> {
        Ok(data.iter().sum())
    }

    #[test]
    fn fetch_failure_stays_inside_the_region() {
        let phase: FetchPhase<Vec<u32>> = FetchPhase::Failed("Failed to load".into());
        let page = page_boundary(Chrome::new("Inventory"), || {
            scoped_region(&phase, None, sum)
        });

        assert_eq!(page.chrome().unwrap().title, "Inventory");
        let failure = page.body().unwrap().failure().unwrap();
        assert_eq!(failure.message, "Failed to load");
        assert_eq!(failure.retry, RetryTrigger::Revalidate);
    }

    #[test]
    fn render_defect_escalates_to_the_page() {
        let phase = FetchPhase::Loaded(vec![1, 2]);
        let page = page_boundary(Chrome::new("Inventory"), || {
            scoped_region(&phase, None, |_: &Vec<u32>, _| -> Result<u32, RenderError> {
                Err(RenderError::Defect("bad row".into()))
            })
        });

        let recovery = page.recovery().unwrap();
        assert_eq!(recovery.retry, RetryTrigger::Reload);
        assert!(recovery.message.contains("bad row"));
        assert!(page.chrome().is_none());
    }

    #[test]
    fn panic_in_render_is_caught_by_the_page() {
        let phase = FetchPhase::Loaded(vec![1]);
        let page = page_boundary(Chrome::new("Inventory"), || {
            scoped_region(&phase, None, |data: &Vec<u32>, _| -> Result<u32, RenderError> {
                Ok(data[5])
            })
        });

        assert!(matches!(page, Page::Recovery(_)));
    }

    #[test]
    fn loading_shows_previous_data_as_refreshing() {
        let previous = vec![4, 5];
        let region = scoped_region(&FetchPhase::Loading, Some(&previous), |data, freshness| {
            Ok((data.len(), freshness))
        })
        .unwrap();
        assert_eq!(region, Region::Ready((2, Freshness::Refreshing)));

        let loading: FetchPhase<Vec<u32>> = FetchPhase::Loading;
        let region = scoped_region(&loading, None, sum).unwrap();
        assert_eq!(region, Region::Pending);
    }

    #[test]
    fn loaded_renders_fresh() {
        let region = scoped_region(&FetchPhase::Loaded(vec![1, 2, 3]), None, sum).unwrap();
        assert_eq!(region.content(), Some(&6));
    }
}
