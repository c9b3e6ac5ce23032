use {
    crate::Config,
    std::{io::IsTerminal, panic::PanicHookInfo, sync::Once},
    time::macros::format_description,
    tracing::Level,
    tracing_subscriber::{
        EnvFilter,
        Layer,
        fmt::{
            MakeWriter,
            time::UtcTime,
            writer::{MakeWriterExt as _, OrElse, WithMaxLevel},
        },
        prelude::*,
        util::SubscriberInitExt,
    },
};

/// Initializes the tracing setup used by the deployer binary.
/// `env_filter` has similar syntax to env_logger. It is documented at
/// https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
pub fn initialize(config: &Config) {
    set_tracing_subscriber(config);
    std::panic::set_hook(Box::new(tracing_panic_hook));
}

/// Like [`initialize`], but can be called multiple times in a row. Later calls
/// are ignored.
///
/// Useful for tests.
pub fn initialize_reentrant(env_filter: &str) {
    // The tracing subscriber below is global object so initializing it again in the
    // same process by a different thread would fail.
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        set_tracing_subscriber(&Config::default().with_env_filter(env_filter));
        std::panic::set_hook(Box::new(tracing_panic_hook));
    });
}

fn set_tracing_subscriber(config: &Config) {
    let writer = split_by_level(
        std::io::stderr,
        std::io::stdout,
        config.stderr_threshold.unwrap_or(Level::ERROR),
    );
    let timer = UtcTime::new(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    ));

    let fmt_layer = if config.use_json_format {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .with_timer(timer)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_timer(timer)
            .with_ansi(std::io::stderr().is_terminal())
            .boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(EnvFilter::new(&config.env_filter)))
        .init();
}

/// Routes events at `threshold` or more severe to `stderr` and all others to
/// `stdout`.
fn split_by_level<E, O>(stderr: E, stdout: O, threshold: Level) -> OrElse<WithMaxLevel<E>, O>
where
    E: for<'a> MakeWriter<'a>,
    O: for<'a> MakeWriter<'a>,
{
    stderr.with_max_level(threshold).or_else(stdout)
}

/// Panic hook that prints roughly the same message as the default panic hook
/// but uses tracing:error instead of stderr.
fn tracing_panic_hook(panic: &PanicHookInfo) {
    let thread = std::thread::current();
    let name = thread.name().unwrap_or("<unnamed>");
    let backtrace = std::backtrace::Backtrace::force_capture();
    tracing::error!("thread '{name}' {panic}\nstack backtrace:\n{backtrace}");
}
