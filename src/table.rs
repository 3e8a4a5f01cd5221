//! Server-paginated data table.
//!
//! The controller owns sort, filters and pagination for one list screen and
//! turns every state transition into exactly one fetch. Transitions are split
//! in two halves so that fetches may overlap:
//!
//! - a `begin_*` method updates the request state and returns a
//!   [`FetchTicket`] stamped with a fresh generation;
//! - [`DataTableController::complete`] applies the response, but only if the
//!   ticket is still the latest one issued.
//!
//! The async convenience methods (`set_sort`, `go_to_page`, …) do both halves
//! in sequence. [`DataTableController::drive`] serves them from a command
//! channel alongside filter commits.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::authority::RoleAuthority;
use crate::error::{Error, Result};
use crate::filter::FilterQuery;
use crate::http::BoxFuture;
use crate::permission::Capability;

/// Sort direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn flip(self) -> Self {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// The single active sort column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub column: String,
    pub direction: Direction,
}

impl SortState {
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            direction: Direction::Desc,
        }
    }
}

/// Pagination as last reported by the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PaginationState {
    pub page: u32,
    pub total_pages: u32,
    pub total_elements: u64,
}

impl PaginationState {
    pub fn contains(&self, page: u32) -> bool {
        page < self.total_pages
    }
}

/// One fetched slice of a list plus total-count metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub total_pages: u32,
    /// Zero-based index of this page.
    pub number: u32,
}

/// Everything a fetch needs to know.
#[derive(Clone, Debug, PartialEq)]
pub struct PageQuery {
    pub page: u32,
    pub size: u32,
    pub sort: Option<SortState>,
    pub filters: FilterQuery,
}

impl PageQuery {
    /// Spring-style query parameters: `page`, `size`, `sort=column,dir`,
    /// `search`, then one parameter per active filter.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("size".to_string(), self.size.to_string()),
        ];
        if let Some(sort) = &self.sort {
            pairs.push((
                "sort".to_string(),
                format!("{},{}", sort.column, sort.direction.as_str()),
            ));
        }
        if !self.filters.search_term.is_empty() {
            pairs.push(("search".to_string(), self.filters.search_term.clone()));
        }
        for (key, value) in self.filters.filters.iter() {
            pairs.push((key.to_string(), value.to_string()));
        }
        pairs
    }
}

/// Where a table gets its pages from.
pub trait PageSource<T>: Send + Sync {
    fn fetch(&self, query: PageQuery) -> BoxFuture<'_, Result<Page<T>>>;
}

impl<T, F, Fut> PageSource<T> for F
where
    F: Fn(PageQuery) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Page<T>>> + Send + 'static,
{
    fn fetch(&self, query: PageQuery) -> BoxFuture<'_, Result<Page<T>>> {
        Box::pin(self(query))
    }
}

/// Column descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub sortable: bool,
}

impl Column {
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            sortable: false,
        }
    }

    pub fn sortable(key: &str, label: &str) -> Self {
        Self {
            sortable: true,
            ..Self::new(key, label)
        }
    }
}

type Visibility<T> = Box<dyn Fn(&T, &RoleAuthority) -> bool + Send + Sync>;
type Handler<T> = Box<dyn Fn(&T) + Send + Sync>;

/// A per-row action whose visibility depends on the row and the principal.
pub struct RowAction<T> {
    label: String,
    visible: Visibility<T>,
    handler: Handler<T>,
}

impl<T> RowAction<T> {
    /// An action visible to everyone until narrowed.
    pub fn new(label: &str, handler: impl Fn(&T) + Send + Sync + 'static) -> Self {
        Self {
            label: label.to_string(),
            visible: Box::new(|_, _| true),
            handler: Box::new(handler),
        }
    }

    pub fn visible_when(
        mut self,
        predicate: impl Fn(&T, &RoleAuthority) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.visible = Box::new(predicate);
        self
    }

    /// Visible only to principals holding `cap`.
    pub fn requires(self, cap: Capability) -> Self {
        self.visible_when(move |_, authority| authority.has_capability(cap))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_visible(&self, row: &T, authority: &RoleAuthority) -> bool {
        (self.visible)(row, authority)
    }
}

/// A row together with the labels of the actions rendered for it.
#[derive(Debug)]
pub struct RenderedRow<'a, T> {
    pub row: &'a T,
    pub actions: Vec<&'a str>,
}

/// Proof that a fetch was issued; hand it back to
/// [`DataTableController::complete`].
#[derive(Clone, Debug, PartialEq)]
pub struct FetchTicket {
    generation: u64,
    pub query: PageQuery,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What [`DataTableController::complete`] did with a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    /// Rows and pagination were replaced.
    Updated,
    /// A newer fetch was issued meanwhile; the response was dropped.
    Stale,
    /// The server answered for a page past the end. Pagination was moved to
    /// the last page, whose rows still have to be fetched.
    Clamped,
}

/// A transition requested of a table running [`DataTableController::drive`].
#[derive(Clone, Debug, PartialEq)]
pub enum TableCommand {
    Reload,
    Sort(SortState),
    /// Header click on a column.
    ToggleSort(String),
    GoToPage(u32),
    SetPageSize(u32),
}

pub struct DataTableController<T> {
    columns: Vec<Column>,
    actions: Vec<RowAction<T>>,
    source: Arc<dyn PageSource<T>>,
    page_size: u32,
    sort: Option<SortState>,
    filters: FilterQuery,
    pagination: PaginationState,
    rows: Vec<T>,
    /// Page of the latest issued fetch.
    requested_page: u32,
    issued: u64,
}

impl<T: Send + 'static> DataTableController<T> {
    pub fn new(columns: Vec<Column>, source: Arc<dyn PageSource<T>>, page_size: u32) -> Self {
        Self {
            columns,
            actions: Vec::new(),
            source,
            page_size: page_size.max(1),
            sort: None,
            filters: FilterQuery::default(),
            pagination: PaginationState::default(),
            rows: Vec::new(),
            requested_page: 0,
            issued: 0,
        }
    }

    pub fn with_action(mut self, action: RowAction<T>) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_sort(mut self, sort: SortState) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn actions(&self) -> &[RowAction<T>] {
        &self.actions
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn pagination(&self) -> PaginationState {
        self.pagination
    }

    pub fn sort(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    pub fn filters(&self) -> &FilterQuery {
        &self.filters
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// The page source, for callers that run fetches themselves.
    pub fn source(&self) -> Arc<dyn PageSource<T>> {
        Arc::clone(&self.source)
    }

    fn issue(&mut self, page: u32) -> FetchTicket {
        self.issued += 1;
        self.requested_page = page;
        let ticket = FetchTicket {
            generation: self.issued,
            query: PageQuery {
                page,
                size: self.page_size,
                sort: self.sort.clone(),
                filters: self.filters.clone(),
            },
        };
        debug!(
            generation = ticket.generation,
            page,
            sort = ?ticket.query.sort,
            "Fetch issued"
        );
        ticket
    }

    /// Refetch the last requested page with the current sort and filters.
    ///
    /// After a failed transition this retries that transition rather than
    /// the page still on screen.
    pub fn begin_load(&mut self) -> FetchTicket {
        self.issue(self.requested_page)
    }

    /// Replace the sort and restart from the first page.
    pub fn begin_sort(&mut self, sort: SortState) -> FetchTicket {
        self.sort = Some(sort);
        self.issue(0)
    }

    /// Header click on `column`: flips the direction of the active column,
    /// sorts a new column ascending. Unknown and non-sortable columns are
    /// ignored.
    pub fn begin_toggle_sort(&mut self, column: &str) -> Option<FetchTicket> {
        if !self.columns.iter().any(|c| c.key == column && c.sortable) {
            debug!(column, "Ignoring sort on non-sortable column");
            return None;
        }
        let next = match &self.sort {
            Some(current) if current.column == column => SortState {
                column: column.to_string(),
                direction: current.direction.flip(),
            },
            _ => SortState::asc(column),
        };
        Some(self.begin_sort(next))
    }

    /// Apply a committed search and restart from the first page.
    pub fn begin_filters(&mut self, filters: FilterQuery) -> FetchTicket {
        self.filters = filters;
        self.issue(0)
    }

    /// Navigate to `page`, keeping sort and filters.
    pub fn begin_page(&mut self, page: u32) -> Result<FetchTicket> {
        if !self.pagination.contains(page) {
            return Err(Error::PageOutOfRange {
                page,
                total_pages: self.pagination.total_pages,
            });
        }
        Ok(self.issue(page))
    }

    /// Change the page size and restart from the first page.
    pub fn begin_page_size(&mut self, size: u32) -> FetchTicket {
        self.page_size = size.max(1);
        self.issue(0)
    }

    /// Apply the outcome of the fetch `ticket` was issued for.
    ///
    /// Responses to superseded tickets are dropped whether they succeeded or
    /// not. A failed current fetch leaves rows and pagination as they were
    /// and hands the error back. A page number at or past `total_pages` is
    /// clamped to the last page, or to 0 for an empty list.
    pub fn complete(&mut self, ticket: FetchTicket, result: Result<Page<T>>) -> Result<Applied> {
        if ticket.generation != self.issued {
            warn!(
                generation = ticket.generation,
                latest = self.issued,
                "Dropping stale page response"
            );
            return Ok(Applied::Stale);
        }
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                warn!(generation = ticket.generation, error = %e, "Page fetch failed");
                return Err(e);
            }
        };
        let (number, applied) = match page.total_pages {
            0 => (0, Applied::Updated),
            total if page.number >= total => (total - 1, Applied::Clamped),
            _ => (page.number, Applied::Updated),
        };
        if applied == Applied::Clamped {
            warn!(
                generation = ticket.generation,
                page = page.number,
                total_pages = page.total_pages,
                "Page past the end, clamping"
            );
        }
        self.pagination = PaginationState {
            page: number,
            total_pages: page.total_pages,
            total_elements: page.total_elements,
        };
        self.requested_page = number;
        self.rows = page.content;
        debug!(
            generation = ticket.generation,
            page = number,
            total_pages = page.total_pages,
            "Page applied"
        );
        Ok(applied)
    }

    async fn fetch(&mut self, ticket: FetchTicket) -> Result<Applied> {
        let source = Arc::clone(&self.source);
        let result = source.fetch(ticket.query.clone()).await;
        self.complete(ticket, result)
    }

    /// Fetch for `ticket`, then refetch once if the page had to be clamped.
    async fn run(&mut self, ticket: FetchTicket) -> Result<Applied> {
        match self.fetch(ticket).await? {
            Applied::Clamped => {
                let ticket = self.begin_load();
                self.fetch(ticket).await
            }
            applied => Ok(applied),
        }
    }

    pub async fn load(&mut self) -> Result<Applied> {
        let ticket = self.begin_load();
        self.run(ticket).await
    }

    pub async fn set_sort(&mut self, sort: SortState) -> Result<Applied> {
        let ticket = self.begin_sort(sort);
        self.run(ticket).await
    }

    /// Returns `Ok(None)` when the column is not sortable and nothing was fetched.
    pub async fn toggle_sort(&mut self, column: &str) -> Result<Option<Applied>> {
        match self.begin_toggle_sort(column) {
            Some(ticket) => self.run(ticket).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn apply_filters(&mut self, filters: FilterQuery) -> Result<Applied> {
        let ticket = self.begin_filters(filters);
        self.run(ticket).await
    }

    pub async fn go_to_page(&mut self, page: u32) -> Result<Applied> {
        let ticket = self.begin_page(page)?;
        self.run(ticket).await
    }

    pub async fn set_page_size(&mut self, size: u32) -> Result<Applied> {
        let ticket = self.begin_page_size(size);
        self.run(ticket).await
    }

    async fn execute(&mut self, command: TableCommand) -> Result<()> {
        debug!(?command, "Table command");
        match command {
            TableCommand::Reload => self.load().await.map(drop),
            TableCommand::Sort(sort) => self.set_sort(sort).await.map(drop),
            TableCommand::ToggleSort(column) => self.toggle_sort(&column).await.map(drop),
            TableCommand::GoToPage(page) => self.go_to_page(page).await.map(drop),
            TableCommand::SetPageSize(size) => self.set_page_size(size).await.map(drop),
        }
    }

    /// Serve filter commits and commands until the command channel closes.
    ///
    /// One transition runs at a time; commands are taken in the order they
    /// were sent. Once the search controller goes away only commands are
    /// served. Failures are logged and do not stop the loop.
    pub async fn drive(
        &mut self,
        commits: &mut watch::Receiver<FilterQuery>,
        commands: &mut mpsc::Receiver<TableCommand>,
    ) {
        let mut following = true;
        loop {
            let outcome = tokio::select! {
                changed = commits.changed(), if following => {
                    if changed.is_err() {
                        debug!("Search controller gone, serving commands only");
                        following = false;
                        continue;
                    }
                    let filters = commits.borrow_and_update().clone();
                    self.apply_filters(filters).await.map(drop)
                }
                command = commands.recv() => match command {
                    Some(command) => self.execute(command).await,
                    None => break,
                },
            };
            if let Err(e) = outcome {
                debug!(error = %e, "Table transition failed");
            }
        }
        debug!("Table command channel closed");
    }

    /// Actions rendered for `row`; invisible actions are omitted.
    pub fn visible_actions(&self, row: &T, authority: &RoleAuthority) -> Vec<&RowAction<T>> {
        self.actions
            .iter()
            .filter(|action| action.is_visible(row, authority))
            .collect()
    }

    /// Current rows with their visible action labels.
    pub fn render(&self, authority: &RoleAuthority) -> Vec<RenderedRow<'_, T>> {
        self.rows
            .iter()
            .map(|row| RenderedRow {
                row,
                actions: self
                    .visible_actions(row, authority)
                    .into_iter()
                    .map(RowAction::label)
                    .collect(),
            })
            .collect()
    }

    /// Run the action labelled `label` on `row`, if it is visible.
    pub fn invoke_action(&self, row: &T, label: &str, authority: &RoleAuthority) -> Result<()> {
        let action = self
            .visible_actions(row, authority)
            .into_iter()
            .find(|action| action.label == label)
            .ok_or_else(|| Error::Forbidden {
                action: label.to_string(),
            })?;
        (action.handler)(row);
        Ok(())
    }
}
