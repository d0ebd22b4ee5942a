use anyhow::Context;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn, Level};

use market_core::{ExecutionLog, SymbolInterner};
use market_data::{BinanceFeed, BookTicker, MarketDataSource, ReplayFeed};
use order_gateway::SimulatedGateway;
use order_manager::OrderManager;
use risk_gate::RiskGate;
use spsc_queue::SpscQueue;
use strategy_engine::StrategyEngine;
use tickcore::{utils, EngineConfig};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn parse_args() -> tickcore::Result<EngineConfig> {
    let mut config: Option<EngineConfig> = None;
    let mut replay: Option<String> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config requires a path")?;
                config = Some(EngineConfig::load_from_file(&path)?);
            }
            "--replay" => {
                replay = Some(args.next().context("--replay requires a path")?);
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    let mut config = config.unwrap_or_default();
    if replay.is_some() {
        config.replay_file = replay;
    }
    Ok(config)
}

fn main() {
    if let Err(err) = run() {
        // Fatal init contract: one line on stderr, exit code 1. Display (not
        // Debug) keeps the context chain from expanding over several lines.
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> tickcore::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = parse_args()?;
    info!("starting tickcore v{}", tickcore::VERSION);

    // Shared infrastructure. The queue is the only bridge between the
    // network thread (producer) and the strategy thread (consumer).
    let queue: Arc<SpscQueue<BookTicker>> = Arc::new(SpscQueue::new(config.queue_capacity));
    let running = Arc::new(AtomicBool::new(true));

    let interner = Arc::new(SymbolInterner::new());
    for symbol in &config.symbols {
        interner.intern(symbol);
    }

    let journal = Arc::new(
        ExecutionLog::open(&config.execution_log)
            .with_context(|| format!("opening execution log {}", config.execution_log))?,
    );

    // Order path: gateway reports drive the order manager's state machine
    // from the gateway dispatcher thread.
    let gateway = Arc::new(SimulatedGateway::new(config.gateway.clone()));
    let orders = Arc::new(OrderManager::with_capacity(config.order_pool_capacity));
    gateway.set_execution_callback({
        let orders = Arc::clone(&orders);
        Arc::new(move |report| orders.on_execution_report(&report))
    });

    let engine = StrategyEngine::new(
        config.strategy.clone(),
        Arc::clone(&interner),
        Arc::clone(&gateway),
        Arc::clone(&orders),
        RiskGate::new(config.risk.clone()),
        Arc::clone(&running),
    )
    .with_journal(Arc::clone(&journal));

    // Strategy thread: the SPSC consumer. Owns the books and the histogram;
    // prints the latency report when it drains out.
    let strategy_thread = {
        let queue = Arc::clone(&queue);
        let core = config.strategy_core;
        thread::Builder::new()
            .name("strategy".to_string())
            .spawn(move || {
                if let Some(core) = core {
                    utils::pin_to_core(core);
                }
                let mut engine = engine;
                engine.run(&queue);
            })
            .context("spawning strategy thread")?
    };

    // Producer callback: push or drop. Never blocks the network thread; a
    // full queue means the consumer is behind and stale ticks are the
    // cheapest thing to lose. One warning per burst, not per tick.
    let dropped_total = Arc::new(AtomicU64::new(0));
    let callback: market_data::TickerCallback = {
        let queue = Arc::clone(&queue);
        let dropped_total = Arc::clone(&dropped_total);
        let in_burst = AtomicBool::new(false);
        Arc::new(move |ticker| match queue.push(ticker) {
            Ok(()) => in_burst.store(false, Ordering::Relaxed),
            Err(_) => {
                let total = dropped_total.fetch_add(1, Ordering::Relaxed) + 1;
                if !in_burst.swap(true, Ordering::Relaxed) {
                    warn!(total_dropped = total, "market-data queue full; dropping ticks");
                }
            }
        })
    };

    // Market-data thread: the SPSC producer, live or replay.
    let mut source: Box<dyn MarketDataSource + Send> = match &config.replay_file {
        Some(path) => Box::new(ReplayFeed::new(path, Arc::clone(&running))),
        None => Box::new(BinanceFeed::new(&config.symbols, Arc::clone(&running))),
    };
    source.set_callback(callback);

    let network_thread = {
        let core = config.network_core;
        thread::Builder::new()
            .name("market-data".to_string())
            .spawn(move || {
                if let Some(core) = core {
                    utils::pin_to_core(core);
                }
                if let Err(err) = source.run() {
                    error!(%err, "market-data source terminated");
                }
            })
            .context("spawning market-data thread")?
    };

    info!("system running; press Enter to stop");
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);

    info!("shutting down");
    running.store(false, Ordering::Release);

    if strategy_thread.join().is_err() {
        error!("strategy thread panicked");
    }
    if network_thread.join().is_err() {
        error!("market-data thread panicked");
    }

    let dropped = dropped_total.load(Ordering::Relaxed);
    if dropped > 0 {
        warn!(dropped, "ticks dropped on queue overflow this session");
    }
    info!(orders = orders.len(), "session complete");
    Ok(())
}
