//! adslot-sim - Ad slot lifecycle over a synthetic page
//!
//! Usage: `adslot-sim [article|liveblog] [width] [config.json]`
//!
//! Builds a page, brings up its adverts, scrolls to the bottom while the
//! stand-in ad server renders whatever it was asked to display, resizes
//! the window once and prints the resulting advert table. Set `RUST_LOG`
//! for more detail.

mod page;
mod vendors;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use adslot::dom::{CustomEvent, Viewport};
use adslot::liveblog::BLOCKS_UPDATED_EVENT;
use adslot::sizes::AdSize;
use adslot::{AdContext, Config, SlotRenderEnded, Vendor};
use anyhow::{bail, Context, Result};
use smol::LocalExecutor;
use tracing_subscriber::EnvFilter;

use crate::vendors::{serve_signals, LoggingAdServer, LoggingPartner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Article,
    Liveblog,
}

fn load_config(path: Option<&str>) -> Result<Config> {
    let Some(path) = path else {
        let mut config = Config::default();
        config.timeouts.viewable_refresh_ms = 300;
        config.switches.mobile_sticky = true;
        return Ok(config);
    };
    let json = std::fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
    Config::from_json(&json).with_context(|| format!("parsing config {path}"))
}

async fn pause(ms: u64) {
    smol::Timer::after(Duration::from_millis(ms)).await;
}

/// Report every display and refresh the ad server saw as rendered
fn deliver_renders(ctx: &Rc<AdContext>, server: &LoggingAdServer) {
    for id in server.take_pending_renders() {
        // Merchandising demand is thin
        let is_empty = id.contains("merchandising");
        let event = SlotRenderEnded {
            slot_id: id.clone(),
            is_empty,
            size: (!is_empty).then_some(AdSize::MPU),
            line_item_id: (!is_empty).then_some(4_200),
        };
        adslot::on_slot_render_ended(ctx, &event);
        if !is_empty {
            adslot::on_slot_viewable(ctx, &id);
        }
    }
}

async fn simulate(ctx: Rc<AdContext>, server: Rc<LoggingAdServer>, mode: Mode, liveblog_body: Option<adslot::dom::NodeId>) -> Result<()> {
    let page = adslot::init_page(&ctx).await.context("bringing up page adverts")?;
    tracing::info!(
        static_slots = ?page.static_slots,
        fixed_slots = ?page.fixed_slots,
        inline_slots = ?page.inline_slots,
        "page ready"
    );
    pause(50).await;
    deliver_renders(&ctx, &server);

    let (height, step) = {
        let mut doc = ctx.document().borrow_mut();
        (doc.scroll_height(), doc.viewport().height / 2.0)
    };
    let mut y = 0.0;
    while y < height {
        y += step;
        ctx.scroll_to(y);
        pause(60).await;
        deliver_renders(&ctx, &server);
    }

    if let (Mode::Liveblog, Some(body)) = (mode, liveblog_body) {
        for round in 0..3 {
            page::prepend_blocks(&mut ctx.document().borrow_mut(), body, 6)?;
            let listeners = ctx.dispatch_event(&CustomEvent::new(BLOCKS_UPDATED_EVENT));
            tracing::info!(round, listeners, "liveblog updated");
            pause(80).await;
            deliver_renders(&ctx, &server);
        }
        if let Some(inserter) = &page.liveblog {
            tracing::info!(inserted = inserter.inserted(), exhausted = inserter.is_exhausted(), "liveblog done");
        }
    }

    let viewport = ctx.document().borrow().viewport();
    ctx.resize(700.0, viewport.height);
    pause(250).await;
    ctx.resize(viewport.width, viewport.height);
    pause(400).await;
    deliver_renders(&ctx, &server);
    Ok(())
}

fn print_adverts(ctx: &AdContext, server: &LoggingAdServer) {
    let registry = ctx.registry().borrow();
    println!("{:<32} {:<20} {:>8} {:>9} {:<10}", "advert", "name", "rendered", "size", "bucket");
    for advert in registry.iter() {
        let size = advert.size.map(|s| s.to_string()).unwrap_or_else(|| "-".into());
        let bucket = advert.last_breakpoint.map(|b| b.name()).unwrap_or("-");
        println!(
            "{:<32} {:<20} {:>8} {:>9} {:<10}",
            advert.id, advert.name, advert.is_rendered, size, bucket
        );
    }
    println!(
        "{} adverts, {} displays, {} refreshes, frames {:?}",
        registry.len(),
        server.displays(),
        server.refreshes(),
        ctx.frame()
    );
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = match args.first().map(String::as_str) {
        None | Some("article") => Mode::Article,
        Some("liveblog") => Mode::Liveblog,
        Some(other) => bail!("unknown page type '{other}', expected article or liveblog"),
    };
    let width: f64 = match args.get(1) {
        Some(w) => w.parse().with_context(|| format!("bad viewport width '{w}'"))?,
        None => 1300.0,
    };
    let mut config = load_config(args.get(2).map(String::as_str))?;
    config.page.is_liveblog = mode == Mode::Liveblog;

    tracing::info!(version = adslot::VERSION, ?mode, width, "starting simulation");

    let viewport = Viewport::new(width, 800.0);
    let (document, liveblog_body) = match mode {
        Mode::Article => (page::article(viewport, 40)?, None),
        Mode::Liveblog => {
            let (doc, body) = page::liveblog(viewport, 12)?;
            (doc, Some(body))
        }
    };

    let ex = Rc::new(LocalExecutor::new());
    let server = Rc::new(LoggingAdServer::default());
    let (signals, signal_requests) = adslot::signal_queue(config.timeouts.third_party_signal());
    ex.spawn(serve_signals(signal_requests, Duration::from_millis(40))).detach();

    let ctx = AdContext::builder(Rc::new(RefCell::new(document)), server.clone())
        .config(config)
        .bid_partner(Rc::new(LoggingPartner::new("prebid", Vendor::Prebid, Duration::from_millis(120))))
        .bid_partner(Rc::new(LoggingPartner::new("a9", Vendor::A9, Duration::from_millis(80))))
        .signals(signals)
        .executor(ex.clone())
        .build();

    smol::block_on(ex.run(simulate(ctx.clone(), server.clone(), mode, liveblog_body)))?;
    print_adverts(&ctx, &server);
    Ok(())
}
