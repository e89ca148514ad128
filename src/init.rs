use std::io::Write;

use anyhow::Result;
use chrono::Local;
use env_logger::Env;

/// App initialization, run once before the command.
pub fn init() -> Result<()> {
    log_init();
    Ok(())
}

/// `RUST_LOG` selects the level, `info` by default.
fn log_init() {
    let env = Env::default().default_filter_or("info");
    env_logger::Builder::from_env(env)
        .format(|fmt, record| {
            writeln!(
                fmt,
                "[{} {}] {}",
                Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                &record.args()
            )
        })
        .init();
}
