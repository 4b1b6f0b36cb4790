//! Drives the [`Pager`] against a page source until the filter is exhausted,
//! a fetch fails, or the page budget runs out.

use crate::client::ClientError;
use ev_core::pager::{PageOutcome, Pager, PagerState};
use ev_core::{Event, QueryFilter};
use std::future::Future;

pub struct Browse {
    pub events: Vec<Event>,
    pub pages: usize,
    /// Set when the last fetch failed.
    pub error: Option<String>,
    pub exhausted: bool,
}

pub async fn browse<F, Fut>(filter: QueryFilter, max_pages: Option<usize>, mut fetch: F) -> Browse
where
    F: FnMut(QueryFilter) -> Fut,
    Fut: Future<Output = Result<Vec<Event>, ClientError>>,
{
    let mut pager = Pager::default();
    let mut next = Some(pager.set_filter(filter));
    let mut pages = 0;

    while let Some(request) = next.take() {
        pages += 1;
        match fetch(request.filter).await {
            Ok(page) => match pager.on_page(request.epoch, page) {
                PageOutcome::Appended(n) | PageOutcome::Exhausted(n) => {
                    eprintln!("page {}: {} events ({} total)", pages, n, pager.events().len());
                }
                PageOutcome::Failed | PageOutcome::Stale => {}
            },
            Err(e) => {
                pager.on_error(request.epoch, e.to_string());
            }
        }

        if max_pages.is_some_and(|max| pages >= max) {
            break;
        }
        next = pager.near_end();
    }

    let error = match pager.state() {
        PagerState::Failed(message) => Some(message.clone()),
        _ => None,
    };
    let exhausted = *pager.state() == PagerState::Exhausted;
    Browse {
        events: pager.into_events(),
        pages,
        error,
        exhausted,
    }
}
