//! # Example: drift
//!
//! Simulates a server whose worker bookkeeping leaks: some workers exit
//! without decrementing the live counter. The reconciler notices on its next
//! audit and resets the counter to the number of linked workers.
//!
//! ## Flow
//! ```text
//! 8 workers admitted ──► 2 stay connected
//!                    ├─► 4 exit cleanly (retire)
//!                    └─► 2 exit "buggy": unlinked, counter left alone
//!
//! after 2s: reconciler audit
//!     reported=N, actual=M ──► live_count := M ──► LogWriter (WARN)
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example drift
//! ```

use std::sync::Arc;
use std::time::Duration;

use countvisor::{LogWriter, Reconciler, ReconcilerConfig, ServerContext, Subscribe};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let ctx = ServerContext::new(false);
    let cfg = ReconcilerConfig::default().with_interval(Duration::from_secs(2));

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let reconciler = Reconciler::builder(cfg).with_subscribers(subs).build(ctx.clone());
    reconciler.start()?;

    let mut ids = Vec::new();
    for port in 40_000..40_008 {
        ids.push(ctx.admit(format!("client 127.0.0.1:{port}")).await);
    }

    // The two newest clients stay connected.
    for (i, id) in ids.into_iter().take(6).enumerate() {
        if i % 3 == 0 {
            // Buggy exit path: record unlinked, counter never decremented.
            ctx.lock().await.unlink(id);
        } else {
            ctx.retire(id).await;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    {
        let workers = ctx.lock().await;
        println!(
            "before audit: live_count={} linked={}",
            workers.live_count(),
            workers.count_linked()
        );
        for rec in workers.walk() {
            println!(
                "  {} {} connected for {:?}",
                rec.id(),
                rec.label(),
                rec.admitted_at().elapsed()
            );
        }
    }

    tokio::time::sleep(Duration::from_secs(3)).await;

    {
        let workers = ctx.lock().await;
        println!(
            "after audit:  live_count={} linked={}",
            workers.live_count(),
            workers.count_linked()
        );
    }

    // Returns once LogWriter has written the stop event.
    reconciler.shutdown().await;
    Ok(())
}
