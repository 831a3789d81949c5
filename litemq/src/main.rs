use litemq::{config, restapi, Context, Result};
use log::info;
use tokio::net::TcpListener;
use tokio::signal;

#[cfg(not(feature = "tracing"))]
fn setup_logger() {
    use env_logger::{Builder, Env};
    use std::io::Write;

    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));

    builder
        .format_timestamp_millis()
        .format(|buf, record| {
            let lvl = buf.default_level_style(record.level()).bold();

            writeln!(
                buf,
                "{} - [{lvl}{:5}{lvl:#}] {}:{} - {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or_default(),
                record.line().unwrap_or_default(),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Always)
        .init();
}

#[tokio::main]
pub async fn main() -> Result<()> {
    #[cfg(feature = "tracing")]
    console_subscriber::init();

    #[cfg(not(feature = "tracing"))]
    setup_logger();

    let cli_config = config::cli();

    let config = config::load(&cli_config)?;

    let context = Context::new(&config);

    if let Some(http_listen) = &config.network.http_listen {
        restapi::start_http(context.clone(), http_listen).await?;
    }

    let listener = TcpListener::bind(&config.network.listen).await?;

    tokio::select! {
        res = litemq::start_tcp(context, listener) => res?,
        _ = signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}
