/// Install the stderr tracing subscriber.
///
/// Filter precedence: explicit filter, `PULSE_LOG`, `RUST_LOG`, then "info".
/// Stdout is left to the sinks.
pub fn init(filter: Option<&str>) {
    let filter = filter
        .map(str::to_string)
        .or_else(|| std::env::var("PULSE_LOG").ok())
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .compact()
        .with_env_filter(filter)
        .init();
}
