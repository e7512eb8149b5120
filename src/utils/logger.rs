use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("req_audit=debug,warn")
        } else {
            EnvFilter::new("req_audit=info,warn")
        }
    })
}

/// 終端機用的精簡格式，輸出到 stderr 以免混入報告
pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// CI 等機器讀取的場合改用 JSON 格式
pub fn init_json_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .init();
}
