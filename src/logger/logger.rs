use serde::Serialize;
use crate::config::settings::Logger;

#[derive(Serialize)]
pub struct LoggerExtraFields {
    pub request_id: String,
}

fn parse_level(level: &str) -> log::LevelFilter {
    match level {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    }
}

pub fn setup_logger(logger: Option<&Logger>) {
    let log_level = logger
        .map(|logger| parse_level(logger.level.as_str()))
        .unwrap_or(log::LevelFilter::Info);

    env_logger::builder()
        .filter_level(log_level)
        .format_timestamp_micros()
        .format(ecs_logger::format)
        .target(env_logger::Target::Stdout)
        .init();
}
