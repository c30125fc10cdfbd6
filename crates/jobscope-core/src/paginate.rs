//! Pagination walker for status listings.
//!
//! Pages are fetched lazily, one per call, following the cursor returned by
//! the previous page. `meta.has_next` decides whether another page exists; a
//! page without pagination metadata is the only page.

use jobscope_proto::{Address, Cursor, Entity, PageMeta, ResponsePage};
use tracing::debug;

use crate::error::{CoreError, Operation, RemoteError, Result};
use crate::remote::RemoteClient;

/// One fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based position in the walk.
    pub number: u32,
    /// Records on this page.
    pub items: Vec<Entity>,
    /// Navigation metadata, `None` for an unpaginated response.
    pub meta: Option<PageMeta>,
}

impl Page {
    /// Split into body and navigation.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Entity>, Option<PageMeta>) {
        (self.items, self.meta)
    }

    /// Returns true if another page follows.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.meta.is_some_and(|m| m.has_next)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum WalkState {
    NotStarted,
    More(Cursor),
    Done,
}

/// Walks the status pages of one address.
#[derive(Debug)]
pub struct PageWalker<'c, C> {
    client: &'c mut C,
    address: Address,
    state: WalkState,
    fetched: u32,
}

impl<'c, C: RemoteClient> PageWalker<'c, C> {
    /// Create a walker. Nothing is fetched until the first call.
    #[must_use]
    pub const fn new(client: &'c mut C, address: Address) -> Self {
        Self {
            client,
            address,
            state: WalkState::NotStarted,
            fetched: 0,
        }
    }

    /// Address being listed.
    #[must_use]
    pub const fn address(&self) -> &Address {
        &self.address
    }

    /// Returns true once the last page has been fetched.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.state == WalkState::Done
    }

    /// Fetch the first page, restarting the walk.
    ///
    /// # Errors
    ///
    /// Returns the remote failure, or [`CoreError::RemoteUnavailable`] if the
    /// page claims a successor without a cursor.
    pub async fn first_page(&mut self) -> Result<Page> {
        self.state = WalkState::NotStarted;
        self.fetched = 0;
        self.fetch(None).await
    }

    /// Fetch the following page, or `None` after the last one.
    ///
    /// On a fresh walker this fetches the first page.
    ///
    /// # Errors
    ///
    /// Returns the remote failure, or [`CoreError::RemoteUnavailable`] if the
    /// page claims a successor without a cursor. The walker stops after an
    /// error.
    pub async fn next(&mut self) -> Result<Option<Page>> {
        match std::mem::replace(&mut self.state, WalkState::Done) {
            WalkState::NotStarted => self.fetch(None).await.map(Some),
            WalkState::More(cursor) => self.fetch(Some(cursor)).await.map(Some),
            WalkState::Done => Ok(None),
        }
    }

    /// Fetch every remaining page and concatenate the records in cursor order.
    ///
    /// # Errors
    ///
    /// Returns the first failure; records from earlier pages are discarded.
    pub async fn collect_all(mut self) -> Result<Vec<Entity>> {
        let mut all = Vec::new();
        while let Some(page) = self.next().await? {
            all.extend(page.items);
        }
        Ok(all)
    }

    async fn fetch(&mut self, cursor: Option<Cursor>) -> Result<Page> {
        self.state = WalkState::Done;
        let response = self
            .client
            .fetch_page(&self.address, cursor.as_ref())
            .await
            .map_err(|e| CoreError::remote(Operation::Statuses, self.address.clone(), e))?;

        self.fetched += 1;
        let number = self.fetched;
        self.state = self.state_after(&response)?;
        debug!(
            address = %self.address,
            page = number,
            items = response.items.len(),
            more = matches!(self.state, WalkState::More(_)),
            "fetched status page"
        );

        let ResponsePage { items, meta, .. } = response;
        Ok(Page {
            number,
            items,
            meta,
        })
    }

    fn state_after(&self, response: &ResponsePage) -> Result<WalkState> {
        let Some(meta) = response.meta else {
            return Ok(WalkState::Done);
        };
        if meta.count == 0 && response.items.is_empty() {
            return Ok(WalkState::Done);
        }
        if !meta.has_next {
            return Ok(WalkState::Done);
        }
        match &response.next {
            Some(cursor) => Ok(WalkState::More(cursor.clone())),
            None => Err(CoreError::remote(
                Operation::Statuses,
                self.address.clone(),
                RemoteError::Unavailable("page reports more results but carries no cursor".into()),
            )),
        }
    }
}
