use std::net::SocketAddr;
use std::time::Duration;

use surge_testserver::{Behavior, TestServerOptions, TestServerStats};
use tokio::net::TcpListener;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut bind_addr: SocketAddr = "127.0.0.1:0".parse()?;
    let mut options = TestServerOptions::default();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--bind" => {
                let addr = args.next().ok_or_else(|| {
                    anyhow::anyhow!("--bind requires an address, e.g. 127.0.0.1:0")
                })?;
                bind_addr = addr.parse()?;
            }
            "--api-key" => {
                let key = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--api-key requires a value"))?;
                options.api_key = Some(key);
            }
            "--status" => {
                let status = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--status requires a code, e.g. 503"))?;
                options.status = Some(status.parse()?);
            }
            "--delay-ms" => {
                let ms = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--delay-ms requires a number"))?;
                options.delay = Duration::from_millis(ms.parse()?);
            }
            "-h" | "--help" => {
                eprintln!(
                    "surge-testserver\n\nUSAGE:\n  surge-testserver [--bind 127.0.0.1:0] [--api-key KEY] [--status CODE] [--delay-ms MS]\n\nOUTPUT:\n  Prints HTTP_URL=<url> to stdout once ready."
                );
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("unknown argument: {other}"));
            }
        }
    }

    let listener = TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    let stats = TestServerStats::default();
    let app = surge_testserver::router(stats.clone(), Behavior::from_options(&options));

    println!("HTTP_URL=http://{addr}");

    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
    });
    serve.await?;

    eprintln!(
        "requests={} events={} unauthorized={} bad_request={}",
        stats.requests_total(),
        stats.events_total(),
        stats.unauthorized_total(),
        stats.bad_request_total()
    );
    Ok(())
}
