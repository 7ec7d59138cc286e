//! heatmap-overlay: show which elements of a saved page get clicked.
//!
//! Loads an HTML file, fetches element statistics and heatmap samples for
//! the page's URL, and prints the ranked click targets together with a
//! projection summary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::Serialize;

use heatmap_overlay::config::ToolbarConfig;
use heatmap_overlay::dom::parser::parse_page;
use heatmap_overlay::engine::overlay::HeatmapOverlay;
use heatmap_overlay::heatmap::aggregator::CountedElement;
use heatmap_overlay::heatmap::filter::{Aggregation, FixedPositionMode, HeatmapType};
use heatmap_overlay::heatmap::projector::Projection;
use heatmap_overlay::net::fetch::{AuthSignal, HttpHeatmapApi};
use heatmap_overlay::store::{JsonFileStore, MemoryStore, PreferenceStore};

#[derive(Parser)]
#[command(name = "heatmap-overlay")]
#[command(about = "Reconcile recorded clicks with a page and summarize its heatmap")]
#[command(version)]
struct Cli {
    /// Saved HTML of the page
    page: PathBuf,

    /// URL the page was saved from
    #[arg(long)]
    url: String,

    /// Show data for this href instead (may contain `*` wildcards)
    #[arg(long)]
    href: Option<String>,

    /// Analytics API base URL
    #[arg(long, env = "HEATMAP_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    /// Temporary toolbar token
    #[arg(long, env = "HEATMAP_TOKEN")]
    token: Option<String>,

    /// Toolbar launch URL (`...#__posthog=...`); overrides --api-url and --token
    #[arg(long)]
    launch_url: Option<String>,

    /// Data attributes used to tag elements
    #[arg(long = "data-attr")]
    data_attributes: Vec<String>,

    /// Window width the page is viewed at
    #[arg(long, default_value_t = 1280.0)]
    width: f64,

    /// Viewport accuracy (0-1)
    #[arg(long)]
    accuracy: Option<f64>,

    /// Heatmap type
    #[arg(long = "type", value_enum)]
    heatmap_type: Option<TypeArg>,

    #[arg(long, value_enum)]
    aggregation: Option<AggregationArg>,

    #[arg(long, value_enum)]
    fixed_mode: Option<FixedModeArg>,

    #[arg(long)]
    date_from: Option<String>,

    #[arg(long)]
    date_to: Option<String>,

    /// Maximum number of element-stats pages to fetch
    #[arg(long, default_value_t = 5)]
    pages: usize,

    /// Preferences file (filters are kept in memory otherwise)
    #[arg(long)]
    prefs: Option<PathBuf>,

    /// Seconds to wait for each load
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum TypeArg {
    Click,
    Rageclick,
    Mousemove,
    Scrolldepth,
}

impl From<TypeArg> for HeatmapType {
    fn from(t: TypeArg) -> Self {
        match t {
            TypeArg::Click => HeatmapType::Click,
            TypeArg::Rageclick => HeatmapType::Rageclick,
            TypeArg::Mousemove => HeatmapType::Mousemove,
            TypeArg::Scrolldepth => HeatmapType::Scrolldepth,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum AggregationArg {
    TotalCount,
    UniqueVisitors,
}

impl From<AggregationArg> for Aggregation {
    fn from(a: AggregationArg) -> Self {
        match a {
            AggregationArg::TotalCount => Aggregation::TotalCount,
            AggregationArg::UniqueVisitors => Aggregation::UniqueVisitors,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FixedModeArg {
    Fixed,
    Relative,
    Hidden,
}

impl From<FixedModeArg> for FixedPositionMode {
    fn from(m: FixedModeArg) -> Self {
        match m {
            FixedModeArg::Fixed => FixedPositionMode::Fixed,
            FixedModeArg::Relative => FixedPositionMode::Relative,
            FixedModeArg::Hidden => FixedPositionMode::Hidden,
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    url: &'a str,
    href: &'a str,
    viewport_min: u32,
    viewport_max: u32,
    elements: &'a [CountedElement],
    projection: &'a Projection,
}

struct ConsoleAuth;

impl AuthSignal for ConsoleAuth {
    fn authentication_required(&self) {
        eprintln!("The API refused the token. Open the toolbar again to re-authenticate.");
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.launch_url {
        Some(launch) => ToolbarConfig::from_launch_url(launch)?,
        None => ToolbarConfig {
            api_url: cli.api_url.clone(),
            temporary_token: cli.token.clone(),
            ..ToolbarConfig::default()
        },
    };
    if !cli.data_attributes.is_empty() {
        config.data_attributes = cli.data_attributes.clone();
    }
    config.request_timeout = Duration::from_secs(cli.timeout);

    let html = std::fs::read_to_string(&cli.page)?;
    let page = parse_page(&html, &cli.url);
    log::info!(
        "{}: \"{}\", {} elements in {} frame(s)",
        cli.page.display(),
        page.title,
        page.element_count(),
        page.frame_count()
    );

    let store: Box<dyn PreferenceStore> = match &cli.prefs {
        Some(path) => Box::new(JsonFileStore::open(path)),
        None => Box::new(MemoryStore::default()),
    };
    let api = Arc::new(HttpHeatmapApi::new(&config)?);
    let mut overlay = HeatmapOverlay::new(config, api, Arc::new(ConsoleAuth), store);

    overlay.set_page_url(&cli.url);
    if let Some(href) = &cli.href {
        overlay.set_href(href);
    }
    overlay.set_window_width(cli.width);
    if let Some(accuracy) = cli.accuracy {
        overlay.set_viewport_accuracy(accuracy);
    }
    if let Some(t) = cli.heatmap_type {
        overlay.set_heatmap_type(t.into());
    }
    if let Some(a) = cli.aggregation {
        overlay.set_aggregation(a.into());
    }
    if let Some(m) = cli.fixed_mode {
        overlay.set_fixed_position_mode(m.into());
    }
    if cli.date_from.is_some() || cli.date_to.is_some() {
        let from = cli
            .date_from
            .clone()
            .unwrap_or_else(|| overlay.filters().date_from.clone());
        overlay.set_date_range(&from, cli.date_to.as_deref());
    }

    if overlay.filters().enabled {
        overlay.load_element_stats();
        overlay.load_heatmap();
    } else {
        overlay.set_enabled(true);
    }

    let timeout = Duration::from_secs(cli.timeout);
    if !overlay.wait_until_idle(timeout) {
        return Err("timed out waiting for the analytics API".into());
    }
    for _ in 1..cli.pages {
        if !overlay.can_load_more() || overlay.last_error().is_some() {
            break;
        }
        overlay.load_more_element_stats();
        if !overlay.wait_until_idle(timeout) {
            break;
        }
    }
    if let Some(e) = overlay.last_error() {
        log::warn!("showing partial data: {}", e);
    }

    let counted = overlay.counted_elements(&page);
    let projection = overlay.projection();

    if cli.json {
        let range = overlay.viewport_range();
        let out = Report {
            url: &page.url,
            href: overlay.href().href(),
            viewport_min: range.min,
            viewport_max: range.max,
            elements: &counted,
            projection: &projection,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let range = overlay.viewport_range();
    println!(
        "{} events, {} click targets ({}px to {}px wide viewports)",
        overlay.events().len(),
        counted.len(),
        range.min,
        range.max
    );
    for item in &counted {
        let (selector, text) = match &item.action_step {
            Some(step) => (
                step.selector.as_deref().unwrap_or("?"),
                step.text.as_deref().unwrap_or(""),
            ),
            None => ("?", ""),
        };
        println!(
            "{:>4}. {:>7}  ({} clicks, {} rage)  {}  {}",
            item.rank, item.count, item.click_count, item.rageclick_count, selector, text
        );
    }

    println!(
        "{} {} points, max value {}",
        overlay.filters().heatmap_type.as_str(),
        projection.points.len(),
        projection.max_value
    );
    let mut hottest: Vec<_> = projection
        .points
        .iter()
        .zip(projection.normalized())
        .collect();
    hottest.sort_by(|a, b| b.1.total_cmp(&a.1));
    for (point, intensity) in hottest.into_iter().take(5) {
        println!(
            "  ({:>6.0}, {:>6.0})  {:>6}  {:.2}",
            point.x, point.y, point.value, intensity
        );
    }

    Ok(())
}
