//! The heatmap overlay controller.
//!
//! `HeatmapOverlay` owns the filter state, the two load pipelines and the
//! data they deliver. The host feeds it page state through setters (URL,
//! window width, scroll offset), calls [`HeatmapOverlay::poll`] from its
//! event loop, and reads resolved elements and projections back out.
//! Every setter decides for itself whether the change needs a reload.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ToolbarConfig;
use crate::dom::PageDocument;
use crate::engine::listeners::{ListenerRegistry, ModifierKeys, Subscription};
use crate::engine::scroll::{ScrollProvider, ScrollWatcher};
use crate::heatmap::aggregator::{aggregate, CountedElement};
use crate::heatmap::capability::{check_scroll_depth_support, HostLibraryInfo, ScrollDepthSupport};
use crate::heatmap::filter::{
    clamp_accuracy, Aggregation, FilterState, FixedPositionMode, HeatmapType, HrefMatcher,
    UrlFilter, ViewportRange,
};
use crate::heatmap::model::{ElementStatsPage, HeatmapRecord, InteractionEvent};
use crate::heatmap::projector::{project, Projection, RenderContext};
use crate::heatmap::resolver::{DocumentGeneration, ResolvedElement, SelectorResolver};
use crate::net::fetch::{AuthSignal, Fetched, HeatmapApi, LoadError};
use crate::net::pipeline::LoadPipeline;
use crate::net::query::{ElementStatsQuery, HeatmapQuery};
use crate::store::PreferenceStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatsMode {
    Replace,
    Append,
}

type StatsLoad = (StatsMode, Result<Fetched<ElementStatsPage>, LoadError>);
type HeatmapLoad = Result<Fetched<Vec<HeatmapRecord>>, LoadError>;

pub struct HeatmapOverlay {
    config: ToolbarConfig,
    api: Arc<dyn HeatmapApi>,
    auth: Arc<dyn AuthSignal>,
    store: Box<dyn PreferenceStore>,
    filters: FilterState,

    page_url: String,
    href: HrefMatcher,
    window_width: f64,
    scroll_y: f64,
    viewport: ViewportRange,
    generation: DocumentGeneration,
    resolver: SelectorResolver,
    scroll_depth_support: Option<ScrollDepthSupport>,

    stats_pipeline: LoadPipeline<StatsLoad>,
    heatmap_pipeline: LoadPipeline<HeatmapLoad>,
    events: Vec<InteractionEvent>,
    next_page: Option<String>,
    can_load_more: bool,
    records: Vec<HeatmapRecord>,
    last_error: Option<LoadError>,

    scroll_watcher: Option<ScrollWatcher>,
    modifier_subscription: Option<Subscription>,
    show_all_labels: Rc<Cell<bool>>,
}

impl HeatmapOverlay {
    pub fn new(
        config: ToolbarConfig,
        api: Arc<dyn HeatmapApi>,
        auth: Arc<dyn AuthSignal>,
        store: Box<dyn PreferenceStore>,
    ) -> Self {
        let filters = FilterState::load(store.as_ref());
        let resolver = SelectorResolver::new(config.data_attributes.clone())
            .with_match_links_by_href(filters.match_links_by_href);
        let viewport = ViewportRange::compute(0.0, filters.viewport_accuracy);

        Self {
            stats_pipeline: LoadPipeline::new("element-stats", config.element_stats_debounce),
            heatmap_pipeline: LoadPipeline::new("heatmap", config.heatmap_debounce),
            config,
            api,
            auth,
            store,
            filters,
            page_url: String::new(),
            href: HrefMatcher::new(UrlFilter::Exact(String::new())),
            window_width: 0.0,
            scroll_y: 0.0,
            viewport,
            generation: DocumentGeneration::default(),
            resolver,
            scroll_depth_support: None,
            events: Vec::new(),
            next_page: None,
            can_load_more: false,
            records: Vec::new(),
            last_error: None,
            scroll_watcher: None,
            modifier_subscription: None,
            show_all_labels: Rc::new(Cell::new(false)),
        }
    }

    // ── State ───────────────────────────────────────────────────

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn href(&self) -> &UrlFilter {
        self.href.filter()
    }

    pub fn viewport_range(&self) -> ViewportRange {
        self.viewport
    }

    pub fn generation(&self) -> DocumentGeneration {
        self.generation
    }

    pub fn events(&self) -> &[InteractionEvent] {
        &self.events
    }

    pub fn records(&self) -> &[HeatmapRecord] {
        &self.records
    }

    pub fn can_load_more(&self) -> bool {
        self.can_load_more
    }

    pub fn last_error(&self) -> Option<&LoadError> {
        self.last_error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.stats_pipeline.is_loading() || self.heatmap_pipeline.is_loading()
    }

    /// Whether every element label is shown (shift held), not just the top ones.
    pub fn show_all_labels(&self) -> bool {
        self.show_all_labels.get()
    }

    pub fn scroll_depth_support(&self) -> Option<&ScrollDepthSupport> {
        self.scroll_depth_support.as_ref()
    }

    // ── Setters ─────────────────────────────────────────────────

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.filters.enabled == enabled {
            return;
        }
        self.filters.enabled = enabled;
        self.persist();
        if enabled {
            self.load_element_stats();
            self.load_heatmap();
        } else {
            self.stats_pipeline.cancel();
            self.heatmap_pipeline.cancel();
            self.events.clear();
            self.records.clear();
            self.next_page = None;
            self.can_load_more = false;
        }
    }

    /// The page navigated. A wildcard href that still matches is kept.
    pub fn set_page_url(&mut self, url: &str) {
        if self.page_url == url {
            return;
        }
        self.page_url = url.to_string();
        self.generation = self.generation.next();

        let keep = matches!(self.href.filter(), UrlFilter::Pattern(_)) && self.href.matches(url);
        if keep {
            log::debug!("keeping href {} for {}", self.href.filter().href(), url);
            return;
        }
        self.href = HrefMatcher::new(UrlFilter::Exact(url.to_string()));
        self.reload_all();
    }

    /// Explicitly choose the page address data is shown for.
    pub fn set_href(&mut self, href: &str) {
        let filter = UrlFilter::from_href(href);
        if *self.href.filter() == filter {
            return;
        }
        self.href = HrefMatcher::new(filter);
        self.reload_all();
    }

    /// The page's DOM changed without navigating.
    pub fn notify_dom_changed(&mut self) {
        self.generation = self.generation.next();
    }

    pub fn set_window_width(&mut self, width: f64) {
        self.window_width = width.max(0.0);
        self.update_viewport();
    }

    pub fn set_viewport_accuracy(&mut self, accuracy: f64) {
        let accuracy = clamp_accuracy(accuracy);
        if self.filters.viewport_accuracy == accuracy {
            return;
        }
        self.filters.viewport_accuracy = accuracy;
        self.persist();
        self.update_viewport();
    }

    fn update_viewport(&mut self) {
        let range = ViewportRange::compute(self.window_width, self.filters.viewport_accuracy);
        if range != self.viewport {
            self.viewport = range;
            self.reload_heatmap();
        }
    }

    /// Switch heatmap type. Records of the old type are dropped immediately.
    pub fn set_heatmap_type(&mut self, heatmap_type: HeatmapType) {
        if self.filters.heatmap_type == heatmap_type {
            return;
        }
        self.filters.heatmap_type = heatmap_type;
        self.persist();
        self.records.clear();
        self.reload_heatmap();
    }

    pub fn set_aggregation(&mut self, aggregation: Aggregation) {
        if self.filters.aggregation == aggregation {
            return;
        }
        self.filters.aggregation = aggregation;
        self.persist();
        self.reload_heatmap();
    }

    pub fn set_date_range(&mut self, date_from: &str, date_to: Option<&str>) {
        if self.filters.date_from == date_from && self.filters.date_to.as_deref() == date_to {
            return;
        }
        self.filters.date_from = date_from.to_string();
        self.filters.date_to = date_to.map(str::to_string);
        self.persist();
        self.reload_all();
    }

    pub fn set_fixed_position_mode(&mut self, mode: FixedPositionMode) {
        self.filters.fixed_position_mode = mode;
        self.persist();
    }

    pub fn set_clickmaps_enabled(&mut self, enabled: bool) {
        self.filters.clickmaps_enabled = enabled;
        self.persist();
    }

    pub fn set_match_links_by_href(&mut self, enabled: bool) {
        self.filters.match_links_by_href = enabled;
        self.resolver.set_match_links_by_href(enabled);
        self.persist();
    }

    pub fn set_scroll_y(&mut self, scroll_y: f64) {
        self.scroll_y = scroll_y;
    }

    /// Record what the host page's instrumentation library supports.
    pub fn set_host_library(&mut self, host: &HostLibraryInfo) {
        let support = check_scroll_depth_support(host);
        if !support.is_compatible() {
            log::warn!("scroll depth heatmaps unavailable: {:?}", support);
        }
        self.scroll_depth_support = Some(support);
    }

    fn persist(&mut self) {
        if let Err(e) = self.filters.save(self.store.as_mut()) {
            log::warn!("could not save heatmap filters: {}", e);
        }
    }

    // ── Loading ─────────────────────────────────────────────────

    fn reload_all(&mut self) {
        if self.filters.enabled {
            self.load_element_stats();
            self.load_heatmap();
        }
    }

    fn reload_heatmap(&mut self) {
        if self.filters.enabled {
            self.load_heatmap();
        }
    }

    fn stats_query(&self) -> ElementStatsQuery {
        ElementStatsQuery {
            url: self.href.filter().clone(),
            date_from: self.filters.date_from.clone(),
            date_to: self.filters.date_to.clone(),
        }
    }

    fn heatmap_query(&self) -> HeatmapQuery {
        HeatmapQuery {
            heatmap_type: self.filters.heatmap_type,
            date_from: self.filters.date_from.clone(),
            date_to: self.filters.date_to.clone(),
            url: self.href.filter().clone(),
            viewport: self.viewport,
            aggregation: self.filters.aggregation,
        }
    }

    /// Fetch the first page of element statistics, replacing what is loaded.
    pub fn load_element_stats(&mut self) {
        let api = Arc::clone(&self.api);
        let query = self.stats_query();
        self.stats_pipeline
            .dispatch(move || (StatsMode::Replace, api.element_stats(&query)));
    }

    /// Fetch the next page and append it. Without a continuation this
    /// retries the first page, which is what is left after a failed load.
    pub fn load_more_element_stats(&mut self) {
        let Some(next) = self.next_page.clone() else {
            if self.can_load_more {
                self.load_element_stats();
            }
            return;
        };
        let api = Arc::clone(&self.api);
        self.stats_pipeline
            .dispatch(move || (StatsMode::Append, api.element_stats_page(&next)));
    }

    pub fn load_heatmap(&mut self) {
        let api = Arc::clone(&self.api);
        let query = self.heatmap_query();
        self.heatmap_pipeline.dispatch(move || api.heatmap(&query));
    }

    /// Apply whatever has arrived: scroll updates and finished loads.
    pub fn poll(&mut self) {
        if let Some(y) = self.scroll_watcher.as_ref().and_then(ScrollWatcher::latest) {
            self.set_scroll_y(y);
        }
        if let Some((mode, result)) = self.stats_pipeline.try_take() {
            self.apply_element_stats(mode, result);
        }
        if let Some(result) = self.heatmap_pipeline.try_take() {
            self.apply_heatmap(result);
        }
    }

    /// Block until both pipelines are idle. Returns false on timeout.
    pub fn wait_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_loading() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            if self.stats_pipeline.is_loading() {
                if let Some((mode, result)) = self.stats_pipeline.wait(remaining) {
                    self.apply_element_stats(mode, result);
                }
            } else if let Some(result) = self.heatmap_pipeline.wait(remaining) {
                self.apply_heatmap(result);
            }
        }
        true
    }

    fn apply_element_stats(&mut self, mode: StatsMode, result: Result<Fetched<ElementStatsPage>, LoadError>) {
        match result {
            Ok(Fetched::Data(page)) => {
                log::info!("element stats: {} events ({:?})", page.results.len(), mode);
                match mode {
                    StatsMode::Replace => self.events = page.results,
                    StatsMode::Append => self.events.extend(page.results),
                }
                self.can_load_more = page.next.is_some();
                self.next_page = page.next;
                self.last_error = None;
            }
            Ok(Fetched::Forbidden) => self.forbidden("element stats"),
            Err(e) => {
                log::error!("element stats load failed: {}", e);
                self.can_load_more = true;
                self.last_error = Some(e);
            }
        }
    }

    fn apply_heatmap(&mut self, result: HeatmapLoad) {
        match result {
            Ok(Fetched::Data(records)) => {
                log::info!("heatmap: {} records", records.len());
                self.records = records;
                self.last_error = None;
            }
            Ok(Fetched::Forbidden) => self.forbidden("heatmap"),
            Err(e) => {
                log::error!("heatmap load failed: {}", e);
                self.last_error = Some(e);
            }
        }
    }

    fn forbidden(&mut self, what: &str) {
        log::warn!("{} request was forbidden, asking for authentication", what);
        self.auth.authentication_required();
        self.filters.enabled = false;
        self.persist();
    }

    // ── Views ───────────────────────────────────────────────────

    /// Bind loaded events to elements of `page`.
    pub fn resolve(&mut self, page: &PageDocument) -> Vec<ResolvedElement> {
        self.resolver.resolve(page, self.generation, &self.events)
    }

    /// Ranked click targets on `page`.
    pub fn counted_elements(&mut self, page: &PageDocument) -> Vec<CountedElement> {
        if !self.filters.clickmaps_enabled {
            return Vec::new();
        }
        let resolved = self.resolve(page);
        aggregate(
            page,
            &resolved,
            self.filters.clickmaps_enabled,
            &self.config.data_attributes,
        )
    }

    pub fn render_context(&self) -> RenderContext {
        RenderContext {
            scroll_y: self.scroll_y,
            window_width: self.window_width,
            fixed_position_mode: self.filters.fixed_position_mode,
        }
    }

    pub fn projection(&self) -> Projection {
        project(&self.records, &self.render_context())
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Start polling scroll offset and listening for modifier keys.
    pub fn mount(&mut self, scroll: Arc<dyn ScrollProvider>, keys: &ListenerRegistry<ModifierKeys>) {
        self.unmount();
        self.scroll_watcher = Some(ScrollWatcher::spawn(scroll, self.config.scroll_poll_interval));
        let show_all = Rc::clone(&self.show_all_labels);
        self.modifier_subscription = Some(keys.subscribe(move |mods: &ModifierKeys| {
            show_all.set(mods.shift);
        }));
    }

    pub fn unmount(&mut self) {
        self.scroll_watcher = None;
        self.modifier_subscription = None;
        self.show_all_labels.set(false);
    }

    pub fn is_mounted(&self) -> bool {
        self.scroll_watcher.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parser::parse_page;
    use crate::heatmap::model::{ElementDescriptor, EventType};
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeApi {
        stats_calls: AtomicUsize,
        page_calls: AtomicUsize,
        heatmap_calls: AtomicUsize,
        forbidden: AtomicBool,
        malformed: AtomicBool,
        last_heatmap: Mutex<Option<HeatmapQuery>>,
    }

    fn event(tag: &str, class: &str, count: u64, event_type: EventType) -> InteractionEvent {
        InteractionEvent {
            elements: vec![ElementDescriptor {
                tag_name: tag.into(),
                attr_class: vec![class.into()],
                ..Default::default()
            }],
            count,
            event_type,
            hash: None,
        }
    }

    impl HeatmapApi for FakeApi {
        fn element_stats(&self, _query: &ElementStatsQuery) -> Result<Fetched<ElementStatsPage>, LoadError> {
            self.stats_calls.fetch_add(1, Ordering::SeqCst);
            if self.forbidden.load(Ordering::SeqCst) {
                return Ok(Fetched::Forbidden);
            }
            if self.malformed.load(Ordering::SeqCst) {
                return Err(LoadError::Malformed("missing results array".into()));
            }
            Ok(Fetched::Data(ElementStatsPage {
                results: vec![event("button", "buy", 5, EventType::Click)],
                next: Some("https://analytics.example.com/api/element/stats/?offset=1".into()),
                previous: None,
            }))
        }

        fn element_stats_page(&self, _next: &str) -> Result<Fetched<ElementStatsPage>, LoadError> {
            self.page_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Fetched::Data(ElementStatsPage {
                results: vec![event("button", "buy", 3, EventType::RageClick)],
                next: None,
                previous: None,
            }))
        }

        fn heatmap(&self, query: &HeatmapQuery) -> Result<Fetched<Vec<HeatmapRecord>>, LoadError> {
            self.heatmap_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_heatmap.lock().unwrap() = Some(query.clone());
            if self.forbidden.load(Ordering::SeqCst) {
                return Ok(Fetched::Forbidden);
            }
            Ok(Fetched::Data(vec![
                HeatmapRecord::Pointer {
                    count: 4,
                    pointer_relative_x: 0.5,
                    pointer_y: 300.0,
                    pointer_target_fixed: false,
                },
                HeatmapRecord::Pointer {
                    count: 9,
                    pointer_relative_x: 0.25,
                    pointer_y: 20.0,
                    pointer_target_fixed: true,
                },
            ]))
        }
    }

    #[derive(Default)]
    struct CountingAuth(AtomicUsize);

    impl AuthSignal for CountingAuth {
        fn authentication_required(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn overlay() -> (HeatmapOverlay, Arc<FakeApi>, Arc<CountingAuth>) {
        let config = ToolbarConfig {
            element_stats_debounce: Duration::from_millis(30),
            heatmap_debounce: Duration::from_millis(60),
            scroll_poll_interval: Duration::from_millis(10),
            ..ToolbarConfig::default()
        };
        let api = Arc::new(FakeApi::default());
        let auth = Arc::new(CountingAuth::default());
        let mut overlay = HeatmapOverlay::new(
            config,
            api.clone(),
            auth.clone(),
            Box::new(MemoryStore::default()),
        );
        overlay.set_page_url("https://shop.example.com/pricing");
        overlay.set_window_width(1200.0);
        (overlay, api, auth)
    }

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn enabling_loads_both_pipelines() {
        let (mut overlay, api, _) = overlay();
        assert_eq!(api.stats_calls.load(Ordering::SeqCst), 0);

        overlay.set_enabled(true);
        assert!(overlay.wait_until_idle(WAIT));
        assert_eq!(api.stats_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.heatmap_calls.load(Ordering::SeqCst), 1);
        assert_eq!(overlay.events().len(), 1);
        assert_eq!(overlay.records().len(), 2);
        assert!(overlay.can_load_more());

        let query = api.last_heatmap.lock().unwrap().clone().unwrap();
        assert_eq!(query.viewport, ViewportRange { min: 240, max: 2160 });
        assert_eq!(query.url, UrlFilter::Exact("https://shop.example.com/pricing".into()));
    }

    #[test]
    fn rapid_heatmap_loads_collapse_into_one_request() {
        let (mut overlay, api, _) = overlay();
        overlay.load_heatmap();
        overlay.load_heatmap();
        assert!(overlay.wait_until_idle(WAIT));
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(api.heatmap_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn resize_and_accuracy_changes_debounce_to_one_reload() {
        let (mut overlay, api, _) = overlay();
        overlay.set_enabled(true);
        overlay.set_window_width(1000.0);
        overlay.set_viewport_accuracy(0.9);
        assert_eq!(overlay.viewport_range(), ViewportRange { min: 900, max: 1100 });
        assert!(overlay.wait_until_idle(WAIT));
        assert_eq!(api.heatmap_calls.load(Ordering::SeqCst), 1);

        let query = api.last_heatmap.lock().unwrap().clone().unwrap();
        assert_eq!(query.viewport, ViewportRange { min: 900, max: 1100 });
    }

    #[test]
    fn forbidden_signals_once_and_keeps_state() {
        let (mut overlay, api, auth) = overlay();
        overlay.set_enabled(true);
        assert!(overlay.wait_until_idle(WAIT));
        let records_before = overlay.records().to_vec();

        api.forbidden.store(true, Ordering::SeqCst);
        overlay.set_aggregation(Aggregation::UniqueVisitors);
        assert!(overlay.wait_until_idle(WAIT));

        assert_eq!(auth.0.load(Ordering::SeqCst), 1);
        assert_eq!(overlay.records(), records_before.as_slice());
        assert!(!overlay.filters().enabled);
        assert_eq!(overlay.events().len(), 1);
    }

    #[test]
    fn type_change_drops_stale_records() {
        let (mut overlay, _, _) = overlay();
        overlay.set_enabled(true);
        assert!(overlay.wait_until_idle(WAIT));
        assert_eq!(overlay.records().len(), 2);

        overlay.set_heatmap_type(HeatmapType::Rageclick);
        assert!(overlay.records().is_empty());
        assert!(overlay.wait_until_idle(WAIT));
        assert_eq!(overlay.records().len(), 2);
    }

    #[test]
    fn forbidden_stats_page_appends_nothing() {
        let (mut overlay, api, auth) = overlay();
        api.forbidden.store(true, Ordering::SeqCst);
        overlay.load_element_stats();
        assert!(overlay.wait_until_idle(WAIT));
        assert_eq!(auth.0.load(Ordering::SeqCst), 1);
        assert!(overlay.events().is_empty());
        assert!(overlay.last_error().is_none());
    }

    #[test]
    fn malformed_stats_allow_retry() {
        let (mut overlay, api, _) = overlay();
        api.malformed.store(true, Ordering::SeqCst);
        overlay.load_element_stats();
        assert!(overlay.wait_until_idle(WAIT));
        assert!(matches!(overlay.last_error(), Some(LoadError::Malformed(_))));
        assert!(overlay.can_load_more());

        api.malformed.store(false, Ordering::SeqCst);
        overlay.load_more_element_stats();
        assert!(overlay.wait_until_idle(WAIT));
        assert_eq!(api.stats_calls.load(Ordering::SeqCst), 2);
        assert_eq!(overlay.events().len(), 1);
        assert!(overlay.last_error().is_none());
    }

    #[test]
    fn load_more_appends_next_page() {
        let (mut overlay, api, _) = overlay();
        overlay.load_element_stats();
        assert!(overlay.wait_until_idle(WAIT));
        overlay.load_more_element_stats();
        assert!(overlay.wait_until_idle(WAIT));

        assert_eq!(api.page_calls.load(Ordering::SeqCst), 1);
        assert_eq!(overlay.events().len(), 2);
        assert!(!overlay.can_load_more());
    }

    #[test]
    fn wildcard_href_survives_matching_navigation() {
        let (mut overlay, _, _) = overlay();
        overlay.set_href("https://shop.example.com/*");
        let before = overlay.generation();

        overlay.set_page_url("https://shop.example.com/checkout");
        assert_eq!(overlay.href(), &UrlFilter::Pattern("https://shop.example.com/*".into()));
        assert!(overlay.generation() > before);

        overlay.set_page_url("https://blog.example.com/");
        assert_eq!(overlay.href(), &UrlFilter::Exact("https://blog.example.com/".into()));
    }

    #[test]
    fn counted_elements_merge_clicks_and_rageclicks() {
        let (mut overlay, _, _) = overlay();
        overlay.load_element_stats();
        assert!(overlay.wait_until_idle(WAIT));
        overlay.load_more_element_stats();
        assert!(overlay.wait_until_idle(WAIT));

        let page = parse_page(
            r#"<html><body><div><button class="buy">Buy</button></div></body></html>"#,
            "https://shop.example.com/pricing",
        );
        let counted = overlay.counted_elements(&page);
        assert_eq!(counted.len(), 1);
        assert_eq!(counted[0].count, 8);
        assert_eq!(counted[0].click_count, 5);
        assert_eq!(counted[0].rageclick_count, 3);
        assert_eq!(counted[0].rank, 1);

        overlay.set_clickmaps_enabled(false);
        assert!(overlay.counted_elements(&page).is_empty());
    }

    #[test]
    fn projection_follows_scroll_and_fixed_mode() {
        let (mut overlay, _, _) = overlay();
        overlay.load_heatmap();
        assert!(overlay.wait_until_idle(WAIT));
        overlay.set_scroll_y(100.0);

        let projection = overlay.projection();
        assert_eq!(projection.points.len(), 2);
        assert_eq!(projection.points[0].x, 600.0);
        assert_eq!(projection.points[0].y, 200.0);
        assert_eq!(projection.points[1].y, 20.0);
        assert_eq!(projection.max_value, 9);

        overlay.set_fixed_position_mode(FixedPositionMode::Hidden);
        let projection = overlay.projection();
        assert_eq!(projection.points.len(), 1);
        assert_eq!(projection.max_value, 4);
    }

    #[test]
    fn filters_are_persisted() {
        let (mut overlay, _, _) = overlay();
        overlay.set_viewport_accuracy(1.7);
        overlay.set_aggregation(Aggregation::UniqueVisitors);
        assert_eq!(overlay.filters().viewport_accuracy, 1.0);

        let saved = FilterState::load(overlay.store.as_ref());
        assert_eq!(saved.viewport_accuracy, 1.0);
        assert_eq!(saved.aggregation, Aggregation::UniqueVisitors);
    }

    struct StillScroll;

    impl ScrollProvider for StillScroll {
        fn scroll_y(&self) -> f64 {
            250.0
        }
    }

    #[test]
    fn mount_registers_and_unmount_releases() {
        let (mut overlay, _, _) = overlay();
        let keys = ListenerRegistry::<ModifierKeys>::new();

        overlay.mount(Arc::new(StillScroll), &keys);
        assert!(overlay.is_mounted());
        assert_eq!(keys.len(), 1);

        keys.emit(&ModifierKeys { shift: true, ..Default::default() });
        assert!(overlay.show_all_labels());

        std::thread::sleep(Duration::from_millis(60));
        overlay.poll();
        assert_eq!(overlay.render_context().scroll_y, 250.0);

        overlay.unmount();
        assert!(!overlay.is_mounted());
        assert!(keys.is_empty());
        assert!(!overlay.show_all_labels());
    }

    #[test]
    fn host_library_check_is_recorded() {
        let (mut overlay, _, _) = overlay();
        assert!(overlay.scroll_depth_support().is_none());
        overlay.set_host_library(&HostLibraryInfo {
            version: "1.80.0".into(),
            disable_scroll_properties: false,
        });
        assert!(!overlay.scroll_depth_support().unwrap().is_compatible());
    }
}
