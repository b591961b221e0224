use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

const DEFAULT_FILTER: &str = "warn,dub_sync=info";

/// Инициализирует env_logger для хост-приложения.
///
/// Фильтр берется из `RUST_LOG`, иначе используется `warn,dub_sync=info`.
/// Повторный вызов безопасен: если логгер уже установлен, возвращается `false`.
pub fn init_logger() -> bool {
    let env = Env::default().filter_or("RUST_LOG", DEFAULT_FILTER);

    let mut builder = Builder::from_env(env);

    // Декодеры symphonia слишком болтливы на уровне info
    builder
        .filter_module("symphonia_core", LevelFilter::Warn)
        .filter_module("symphonia_bundle_mp3", LevelFilter::Warn)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr);

    builder.try_init().is_ok()
}
