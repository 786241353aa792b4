use std::{io::IsTerminal, time::Duration};

use cardsync_connect::{AnkiConnect, ConnectConfig};
use cardsync_engine::Settings;
use eyre::WrapErr;
use tracing::{Level, debug};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, filter::Directive, fmt, layer::SubscriberExt,
};

use crate::cli::{LogColor, Options};

/// Logs go to stderr so a `--json` report on stdout stays parseable.
pub fn init_tracing(opts: &Options) {
    let log_filter = EnvFilter::builder()
        .with_default_directive(Directive::from(opts.log_level))
        .from_env_lossy();

    let stderr_is_tty = std::io::stderr().is_terminal();
    let use_color = match opts.log_color {
        LogColor::Always => true,
        LogColor::Never => false,
        LogColor::Auto => stderr_is_tty,
    };

    let include_target = matches!(opts.log_level, Level::DEBUG | Level::TRACE);

    let fmt_layer = fmt::layer()
        .with_target(include_target)
        .with_ansi(use_color)
        .with_writer(std::io::stderr);

    let subscriber = Registry::default().with(fmt_layer.with_filter(log_filter));

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        debug!("tracing subscriber already installed");
    }
}

pub fn client_config(opts: &Options) -> ConnectConfig {
    ConnectConfig {
        url: opts.anki_url.clone(),
        timeout: Duration::from_secs(opts.anki_timeout_secs),
        ..ConnectConfig::default()
    }
}

pub fn init_client(opts: &Options) -> AnkiConnect {
    AnkiConnect::new(client_config(opts))
}

pub fn load_settings(opts: &Options) -> eyre::Result<Settings> {
    match &opts.config {
        Some(path) => {
            let settings = Settings::load(path)
                .wrap_err_with(|| format!("loading settings from {}", path.display()))?;
            debug!(path = %path.display(), "settings loaded");
            Ok(settings)
        }
        None => Ok(Settings::default()),
    }
}
