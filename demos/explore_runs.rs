//! Explore Runs: linked overview/detail plots over stored experiments
//!
//! Builds the series catalog, binds it to a headless chart, replays a few taps
//! and legend clicks, then prints the chart document a JavaScript runtime
//! would render.
//!
//! Run with: cargo run --example explore_runs [-- config.json]

use anyhow::Context;
use soup_scope::config::{ExplorerConfig, StoreLocation};
use soup_scope::render::{HeadlessChart, UNIQUE_EXPRESSIONS_FIELD};
use soup_scope::Explorer;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = match std::env::args().nth(1) {
        Some(path) => ExplorerConfig::from_path(&path)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => ExplorerConfig::default(),
    };
    let mut explorer = Explorer::open(&config).context("opening experiment store")?;

    if config.store == StoreLocation::Memory {
        info!("memory store is empty, seeding sample runs");
        let store = explorer.store_mut();
        store.persist_run(1, &[r"\x.x", r"\x.\y.x", r"\x.\y.\z.x z (y z)"])?;
        store.persist_run(1, &[r"\x.x x", r"(\x.x x) (\x.x x)"])?;
        store.persist_run(
            1,
            &[r"\f.f", r"\f.\x.f x", r"\f.\x.f (f x)", r"\f.\x.f (f (f x))", r"\n.n"],
        )?;
    }

    let mut surface = explorer.surface(HeadlessChart::new())?;

    println!("=== {} ===\n", config.intro);
    println!("Legend:");
    for item in surface.legend() {
        println!("  {:<16} {}", item.label, item.color);
    }

    println!("\nTaps:");
    for x in [0.2, 1.4, 3.9, f64::NAN] {
        match surface.on_tap(x)? {
            Some(run_id) => println!(
                "  x={x:<4} -> {} ({:?})",
                run_id.table_name(),
                surface.detail_source().column(UNIQUE_EXPRESSIONS_FIELD).unwrap_or_default()
            ),
            None => println!("  x={x:<4} -> no run, detail plot unchanged"),
        }
    }

    let first = surface.catalog().run_ids().next();
    if let Some(first) = first {
        let visible = surface.toggle_legend(first)?;
        println!("\nLegend click on {}: visible={visible}", first.table_name());
        println!("  tap x=0.0 -> {:?}", surface.on_tap(0.0)?.map(|id| id.table_name()));
    }

    println!("\nChart document:\n{}", surface.document().to_json()?);
    Ok(())
}
