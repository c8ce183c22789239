use std::sync::Mutex;

use slog::{o, Drain, Logger};

/// Root logger: terminal output by default, JSON lines on stderr with the
/// `release` feature or when `json` is requested.
pub fn setup_logger(json: bool) -> Logger {
    if json || cfg!(feature = "release") {
        Logger::root(
            Mutex::new(slog_json::Json::default(std::io::stderr())).map(slog::Fuse),
            o!(),
        )
    } else {
        let decorator = slog_term::TermDecorator::new().build();
        let drain = Mutex::new(slog_term::FullFormat::new(decorator).build()).fuse();
        let drain = slog_async::Async::new(drain).build().fuse();
        Logger::root(drain, o!())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Context;

    #[test]
    fn json_logger_feeds_a_context() {
        let ctx = Context::new(setup_logger(true));
        let mut logged = false;
        ctx.try_log(|logger| {
            slog::info!(logger, "logger ready"; "component" => "flowkit");
            logged = true;
        });
        assert!(logged);
    }
}
