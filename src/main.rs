//! Vault - ambient animated vault scene in an orbit-camera viewport.
//!
//! `vault [CONFIG.json]` opens a window with the vault mounted. The config
//! path may also come from `VAULT_CONFIG`; without one, defaults apply.

mod app;
mod config;
mod render;
mod scene;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = config::load();
    if let Err(err) = app::run(config) {
        log::error!("Event loop error: {err}");
        std::process::exit(1);
    }
}
