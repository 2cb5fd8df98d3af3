use crate::actions::ActionFlow;
use crate::api::ListApi;
use crate::banner::Banner;
use crate::config::ClientConfig;
use crate::debounce::Debouncer;
use crate::session::Session;
use futures::future::{AbortHandle, Abortable};
use log::{debug, error, info, warn};
use shared::dto::common::ListEnvelope;
use shared::error::{ClientError, Result};
use shared::filter::{FilterPatch, FilterState};
use shared::models::auth::Role;
use shared::query::{build_query, ListQuery, SortOrder};
use shared::reducer::{reduce, ListPage, PaginationState, StatsSummary};
use shared::resource::{ListResource, RowAction};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Loaded,
    Errored,
    /// Shut down; nothing loads any more.
    Closed,
}

/// What became of one load.
#[derive(Debug)]
pub enum LoadOutcome {
    Applied,
    /// A newer load was started while this one was in flight.
    Stale,
    /// Aborted by a newer load or by shutdown.
    Aborted,
    Failed(ClientError),
}

impl LoadOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, LoadOutcome::Applied)
    }

    pub fn into_result(self) -> Result<bool> {
        match self {
            LoadOutcome::Applied => Ok(true),
            LoadOutcome::Stale | LoadOutcome::Aborted => Ok(false),
            LoadOutcome::Failed(error) => Err(error),
        }
    }
}

/// Everything a renderer needs about one list.
#[derive(Debug, Clone)]
pub struct ListView<R> {
    pub phase: Phase,
    pub filters: FilterState,
    pub sort: Option<SortOrder>,
    pub page: u32,
    pub page_size: u32,
    pub data: ListPage<R>,
    pub banner: Option<Banner>,
    /// Phase to fall back to when a load is dropped mid-flight.
    settled: Phase,
}

impl<R> ListView<R> {
    fn new(page_size: u32) -> Self {
        Self {
            phase: Phase::Idle,
            filters: FilterState::new(),
            sort: None,
            page: 1,
            page_size: page_size.max(1),
            data: ListPage::default(),
            banner: None,
            settled: Phase::Idle,
        }
    }

    pub fn rows(&self) -> &[R] {
        &self.data.rows
    }

    pub fn pagination(&self) -> &PaginationState {
        &self.data.pagination
    }

    pub fn stats(&self) -> &StatsSummary {
        &self.data.stats
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn query(&self) -> ListQuery {
        build_query(&self.filters, self.sort, self.page, self.page_size)
    }
}

/// Hands out monotonically increasing request tokens; only the latest one
/// may write results.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: AtomicU64,
}

impl RequestTracker {
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == token
    }

    /// Makes every outstanding token stale.
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }
}

/// Puts the view back to its settled phase if a load is dropped while it is
/// still the current one.
struct LoadingGuard<'a, R> {
    view: &'a Mutex<ListView<R>>,
    tracker: &'a RequestTracker,
    token: u64,
}

impl<R> Drop for LoadingGuard<'_, R> {
    fn drop(&mut self) {
        let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        if self.tracker.is_current(self.token) && view.phase == Phase::Loading {
            debug!("Load {} dropped mid-flight", self.token);
            view.phase = view.settled;
        }
    }
}

/// Drives one admin list: filters, sort and page in, rows, pagination and
/// stats out.
///
/// Methods take `&self` so loads can overlap; a later load aborts the one in
/// flight and only the newest response is ever applied.
pub struct ListController<L: ListResource, A: ListApi> {
    api: A,
    session: Session,
    view: Mutex<ListView<L::Row>>,
    tracker: RequestTracker,
    in_flight: Mutex<Option<(u64, AbortHandle)>>,
    debouncer: Debouncer<FilterPatch>,
    updates: Mutex<Option<UnboundedReceiver<FilterPatch>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
    actions: ActionFlow,
    closed: AtomicBool,
    _resource: PhantomData<fn() -> L>,
}

impl<L: ListResource, A: ListApi> ListController<L, A> {
    pub fn new(api: A, session: Session, config: &ClientConfig) -> Self {
        let (debouncer, updates) = Debouncer::new(config.debounce);
        Self {
            api,
            session,
            view: Mutex::new(ListView::new(config.page_size)),
            tracker: RequestTracker::default(),
            in_flight: Mutex::new(None),
            debouncer,
            updates: Mutex::new(Some(updates)),
            listener: Mutex::new(None),
            actions: ActionFlow::default(),
            closed: AtomicBool::new(false),
            _resource: PhantomData,
        }
    }

    pub(crate) fn lock_view(&self) -> MutexGuard<'_, ListView<L::Row>> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn actions(&self) -> &ActionFlow {
        &self.actions
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Snapshot of the current list state.
    pub fn view(&self) -> ListView<L::Row> {
        self.lock_view().clone()
    }

    pub fn phase(&self) -> Phase {
        self.lock_view().phase
    }

    pub fn rows(&self) -> Vec<L::Row> {
        self.lock_view().data.rows.clone()
    }

    pub fn banner(&self) -> Option<Banner> {
        self.lock_view().banner.clone()
    }

    pub fn query(&self) -> ListQuery {
        self.lock_view().query()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Row actions the signed-in role may use on this list.
    pub fn available_actions(&self) -> Vec<RowAction> {
        L::actions_for(self.session.role())
    }

    pub fn role(&self) -> Role {
        self.session.role()
    }

    /// Initial load; may be answered from the response cache.
    pub async fn load(&self) -> LoadOutcome {
        self.run_load(true).await
    }

    /// Re-fetches from the backend, bypassing the cache.
    pub async fn refresh(&self) -> LoadOutcome {
        self.run_load(false).await
    }

    /// Manual retry after an error.
    pub async fn retry(&self) -> LoadOutcome {
        info!("Retrying {} list", L::NAME);
        self.run_load(false).await
    }

    /// Applies a filter edit now, back to page 1, and loads.
    pub async fn apply_patch(&self, patch: FilterPatch) -> LoadOutcome {
        self.update_filters(patch);
        self.run_load(true).await
    }

    /// Replaces filters, sort and page without loading.
    pub fn configure(&self, filters: FilterState, sort: Option<SortOrder>, page: u32) {
        let mut view = self.lock_view();
        view.filters = filters;
        view.sort = sort;
        view.page = page.max(1);
    }

    /// [`Self::configure`] followed by a load.
    pub async fn open(&self, filters: FilterState, sort: Option<SortOrder>, page: u32) -> LoadOutcome {
        self.configure(filters, sort, page);
        self.run_load(true).await
    }

    pub async fn set_filters(&self, filters: FilterState) -> LoadOutcome {
        {
            let mut view = self.lock_view();
            view.filters = filters;
            view.page = 1;
        }
        self.run_load(true).await
    }

    pub async fn set_sort(&self, sort: Option<SortOrder>) -> LoadOutcome {
        {
            let mut view = self.lock_view();
            view.sort = sort;
            view.page = 1;
        }
        self.run_load(true).await
    }

    pub async fn set_page(&self, page: u32) -> LoadOutcome {
        {
            let mut view = self.lock_view();
            let last = view.data.pagination.total_pages.max(1);
            view.page = if view.phase == Phase::Idle {
                page.max(1)
            } else {
                page.clamp(1, last)
            };
        }
        self.run_load(true).await
    }

    pub async fn next_page(&self) -> LoadOutcome {
        let page = self.lock_view().page.saturating_add(1);
        self.set_page(page).await
    }

    pub async fn prev_page(&self) -> LoadOutcome {
        let page = self.lock_view().page.saturating_sub(1);
        self.set_page(page).await
    }

    pub async fn set_page_size(&self, page_size: u32) -> LoadOutcome {
        {
            let mut view = self.lock_view();
            view.page_size = page_size.max(1);
            view.page = 1;
        }
        self.run_load(true).await
    }

    /// Queues a filter edit behind the quiet window. Needs [`Self::start`]
    /// to have been called for the update to reach the list.
    pub fn edit_filter(&self, patch: FilterPatch) {
        if self.is_closed() {
            return;
        }
        self.debouncer.push(patch);
    }

    /// Dispatches queued filter edits immediately.
    pub fn search(&self) -> bool {
        self.debouncer.flush()
    }

    pub fn has_pending_edit(&self) -> bool {
        self.debouncer.has_pending()
    }

    /// Starts listening for debounced filter edits. Each dispatched update
    /// resets to page 1 and starts a load, aborting any load in flight.
    pub fn start(self: &Arc<Self>) {
        let Some(mut updates) = self
            .updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            debug!("{} filter listener already running", L::NAME);
            return;
        };

        let controller = Arc::clone(self);
        let handle = tokio::spawn(async move {
            while let Some(patch) = updates.recv().await {
                if controller.is_closed() {
                    break;
                }
                controller.update_filters(patch);
                let loader = Arc::clone(&controller);
                tokio::spawn(async move {
                    loader.run_load(true).await;
                });
            }
        });
        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    pub fn dismiss_banner(&self, id: uuid::Uuid) -> bool {
        let mut view = self.lock_view();
        match &view.banner {
            Some(banner) if banner.id == id => {
                view.banner = None;
                true
            }
            _ => false,
        }
    }

    /// Stops everything: pending filter edits, the listener and any load in
    /// flight. The rows are discarded.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.debouncer.cancel();
        if let Some(listener) = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            listener.abort();
        }
        self.tracker.invalidate();
        if let Some((_, handle)) = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }

        let mut view = self.lock_view();
        view.phase = Phase::Closed;
        view.settled = Phase::Closed;
        view.data = ListPage::default();
        info!("{} list controller shut down", L::NAME);
    }

    pub(crate) fn set_banner(&self, banner: Banner) {
        self.lock_view().banner = Some(banner);
    }

    fn update_filters(&self, patch: FilterPatch) {
        let mut view = self.lock_view();
        view.filters.apply(patch);
        view.page = 1;
        debug!("{} filters now {:?}", L::NAME, view.filters);
    }

    async fn run_load(&self, use_cache: bool) -> LoadOutcome {
        if self.is_closed() {
            return LoadOutcome::Aborted;
        }

        let token = self.tracker.begin();
        let (query, filters, sort, page, page_size) = {
            let mut view = self.lock_view();
            view.phase = Phase::Loading;
            (
                view.query(),
                view.filters.clone(),
                view.sort,
                view.page,
                view.page_size,
            )
        };

        let (handle, registration) = AbortHandle::new_pair();
        if let Some((previous, superseded)) = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace((token, handle))
        {
            debug!("Load {} supersedes load {}", token, previous);
            superseded.abort();
        }
        let _guard = LoadingGuard {
            view: &self.view,
            tracker: &self.tracker,
            token,
        };

        if !use_cache {
            self.api.invalidate(L::PATH);
        }
        debug!("Loading {} with {}", L::NAME, query.apply_to(L::PATH));

        let fetch = async {
            let body = self.api.get_list(&self.session, L::PATH, &query).await?;
            let envelope = ListEnvelope::parse(&body, L::COLLECTION)?;
            reduce::<L>(envelope, &filters, sort, page, page_size)
        };
        let result = Abortable::new(fetch, registration).await;

        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if matches!(*in_flight, Some((current, _)) if current == token) {
                *in_flight = None;
            }
        }

        let result = match result {
            Ok(result) => result,
            Err(_) => {
                debug!("Load {} of {} aborted", token, L::NAME);
                return LoadOutcome::Aborted;
            }
        };

        let mut view = self.lock_view();
        if !self.tracker.is_current(token) {
            warn!("Discarding stale {} response for load {}", L::NAME, token);
            return LoadOutcome::Stale;
        }

        match result {
            Ok(data) => {
                info!(
                    "Loaded {} {} rows (page {}/{}, {} total)",
                    data.rows.len(),
                    L::NAME,
                    data.pagination.current_page,
                    data.pagination.total_pages,
                    data.pagination.total_items
                );
                view.page = data.pagination.current_page;
                view.data = data;
                view.phase = Phase::Loaded;
                view.settled = Phase::Loaded;
                if view.banner.as_ref().is_some_and(Banner::is_error) {
                    view.banner = None;
                }
                LoadOutcome::Applied
            }
            Err(e) => {
                error!("Failed to load {}: {}", L::NAME, e);
                view.phase = Phase::Errored;
                view.settled = Phase::Errored;
                view.banner = Some(Banner::from(&e));
                LoadOutcome::Failed(e)
            }
        }
    }
}

impl<L: ListResource, A: ListApi> Drop for ListController<L, A> {
    fn drop(&mut self) {
        if let Some(listener) = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            listener.abort();
        }
        if let Some((_, handle)) = self
            .in_flight
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::json;
    use shared::models::status::RowStatus;
    use shared::models::ticket::Tickets;
    use std::time::Duration;

    type Controller = ListController<Tickets, MockApi>;

    fn config() -> ClientConfig {
        ClientConfig {
            debounce: Duration::from_millis(400),
            page_size: 25,
            ..ClientConfig::default()
        }
    }

    fn tickets_body(ids: &[&str], status: &str) -> String {
        let tickets: Vec<_> = ids
            .iter()
            .map(|id| json!({"_id": id, "customerName": format!("Customer {}", id), "status": status, "amount": 10}))
            .collect();
        json!({ "tickets": tickets }).to_string()
    }

    #[fixture]
    fn api() -> MockApi {
        MockApi::new()
    }

    #[rstest]
    #[tokio::test]
    async fn test_load_success_populates_view(api: MockApi) {
        api.push_list(tickets_body(&["a", "b"], "completed"));
        let controller = Controller::new(api.clone(), Session::signed_in("tok", Role::Admin), &config());

        assert_eq!(controller.phase(), Phase::Idle);
        assert!(controller.load().await.is_applied());

        let view = controller.view();
        assert_eq!(view.phase, Phase::Loaded);
        assert_eq!(view.rows().len(), 2);
        assert_eq!(view.stats().total_amount, 20.0);
        assert!(view.banner.is_none());
        assert_eq!(api.list_calls(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn test_error_sets_banner_and_retry_recovers(api: MockApi) {
        api.push_list_error(ClientError::http(500, "<html>boom</html>"));
        api.push_list(tickets_body(&["a"], "completed"));
        let controller = Controller::new(api.clone(), Session::signed_in("tok", Role::Admin), &config());

        let outcome = controller.load().await;
        assert!(matches!(outcome, LoadOutcome::Failed(ClientError::Http { status: 500, .. })));
        assert_eq!(controller.phase(), Phase::Errored);
        let banner = controller.banner().unwrap();
        assert!(!banner.message.is_empty());

        assert!(controller.retry().await.is_applied());
        assert_eq!(controller.phase(), Phase::Loaded);
        assert!(controller.banner().is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn test_missing_token_never_calls_backend(api: MockApi) {
        let controller = Controller::new(api.clone(), Session::new(), &config());

        let outcome = controller.load().await;
        assert!(matches!(outcome, LoadOutcome::Failed(ClientError::Auth(_))));
        assert_eq!(api.list_calls(), 0);
        assert_eq!(
            controller.banner().map(|b| b.message),
            Some("Your session has expired. Please log in again.".to_string())
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_filter_patch_resets_page_and_builds_query(api: MockApi) {
        api.set_default_list(tickets_body(&[], "completed"));
        let controller = Controller::new(api.clone(), Session::signed_in("tok", Role::Admin), &config());

        controller.set_page(3).await;
        controller
            .apply_patch(FilterPatch::new().choice("status", "pending").text("customer", " "))
            .await;

        let query = api.last_list_query().unwrap();
        assert_eq!(query, "status=pending&page=1&limit=25");
    }

    #[rstest]
    #[tokio::test]
    async fn test_pending_filter_over_unpaginated_fixture(api: MockApi) {
        api.push_list(
            json!({"tickets": [
                {"_id": "1", "status": "pending", "amount": 5},
                {"_id": "2", "status": "pending", "amount": 5},
                {"_id": "3", "status": "completed", "amount": 5}
            ]})
            .to_string(),
        );
        let controller = Controller::new(api, Session::signed_in("tok", Role::Staff), &config());

        controller
            .apply_patch(FilterPatch::new().choice("status", "pending"))
            .await;
        let rows = controller.rows();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.status == RowStatus::Pending));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_overlapping_loads_keep_latest(api: MockApi) {
        api.push_list_delayed(tickets_body(&["from-a"], "completed"), Duration::from_millis(500));
        api.push_list_delayed(tickets_body(&["from-b"], "completed"), Duration::from_millis(100));
        let controller = Arc::new(Controller::new(
            api.clone(),
            Session::signed_in("tok", Role::Admin),
            &config(),
        ));

        let first = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move {
                controller
                    .apply_patch(FilterPatch::new().text("customer", "a"))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = controller
            .apply_patch(FilterPatch::new().text("customer", "ab"))
            .await;
        let first = first.await.unwrap();

        assert!(second.is_applied());
        assert!(matches!(first, LoadOutcome::Aborted | LoadOutcome::Stale));
        tokio::time::sleep(Duration::from_millis(600)).await;

        let view = controller.view();
        assert_eq!(view.phase, Phase::Loaded);
        assert_eq!(view.rows().iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["from-b"]);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_debounced_edits_trigger_one_load(api: MockApi) {
        api.set_default_list(tickets_body(&["x"], "completed"));
        let controller = Arc::new(Controller::new(
            api.clone(),
            Session::signed_in("tok", Role::Admin),
            &config(),
        ));
        controller.start();

        for text in ["a", "av", "ava"] {
            controller.edit_filter(FilterPatch::new().text("customer", text));
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(api.list_calls(), 0);
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(api.list_calls(), 1);
        assert_eq!(api.last_list_query().as_deref(), Some("customer=ava&page=1&limit=25"));
        assert_eq!(controller.phase(), Phase::Loaded);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_search_flushes_without_waiting(api: MockApi) {
        api.set_default_list(tickets_body(&[], "completed"));
        let controller = Arc::new(Controller::new(
            api.clone(),
            Session::signed_in("tok", Role::Admin),
            &config(),
        ));
        controller.start();

        controller.edit_filter(FilterPatch::new().choice("season", "Spring 2024"));
        assert!(controller.search());
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(api.list_calls(), 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(api.list_calls(), 1);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_dropped_load_clears_loading(api: MockApi) {
        api.push_list_delayed(tickets_body(&["a"], "completed"), Duration::from_secs(5));
        let controller = Controller::new(api, Session::signed_in("tok", Role::Admin), &config());

        let timed_out = tokio::time::timeout(Duration::from_millis(10), controller.load()).await;
        assert!(timed_out.is_err());
        assert_eq!(controller.phase(), Phase::Idle);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_shutdown_aborts_in_flight_load(api: MockApi) {
        api.push_list_delayed(tickets_body(&["a"], "completed"), Duration::from_secs(1));
        let controller = Arc::new(Controller::new(
            api,
            Session::signed_in("tok", Role::Admin),
            &config(),
        ));

        let pending = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.load().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.shutdown();

        assert!(matches!(pending.await.unwrap(), LoadOutcome::Aborted));
        assert_eq!(controller.phase(), Phase::Closed);
        assert!(matches!(controller.load().await, LoadOutcome::Aborted));
    }

    #[rstest]
    #[tokio::test]
    async fn test_dismiss_banner_by_id(api: MockApi) {
        api.push_list_error(ClientError::Network("connection refused".into()));
        let controller = Controller::new(api, Session::signed_in("tok", Role::Admin), &config());
        controller.load().await;

        let banner = controller.banner().unwrap();
        assert_eq!(banner.message, "Failed to load data. Please try again.");
        assert!(!controller.dismiss_banner(uuid::Uuid::new_v4()));
        assert!(controller.dismiss_banner(banner.id));
        assert!(controller.banner().is_none());
    }
}
