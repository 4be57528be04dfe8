use tracing_subscriber::EnvFilter;

/// ログ初期化。`RUST_LOG` があればそれを優先する
pub fn init_logging(verbose: bool) {
    let default_directive = if verbose {
        "litreview_rust=debug"
    } else {
        "litreview_rust=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    // 進捗表示は stdout、ログは stderr に分ける
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
