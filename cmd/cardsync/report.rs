use std::time::Instant;

use cardsync_connect::{ConnectError, ErrorKind};
use cardsync_engine::{SettingsError, SyncError, report::REPORT_SCHEMA_VERSION};
use serde::Serialize;

/// Print a finished run: JSON on stdout, or the human summary.
pub fn emit_report<R: Serialize + std::fmt::Display>(json: bool, report: &R) -> eyre::Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}

#[derive(Serialize)]
struct ErrorReport {
    schema_version: u32,
    status: &'static str,
    error_type: &'static str,
    retryable: bool,
    error: String,
    elapsed_ms: u64,
}

/// Failure category of a run-level error, and whether running again may help.
fn classify(error: &eyre::Report) -> (&'static str, bool) {
    let connect_kind = |err: &ConnectError| match err.kind() {
        ErrorKind::Transient => ("transient", true),
        ErrorKind::Permanent => ("permanent", false),
        ErrorKind::RemoteReported => ("remote", false),
    };

    for cause in error.chain() {
        if let Some(err) = cause.downcast_ref::<SyncError>() {
            return match err {
                SyncError::Preparation(_) => ("preparation", false),
                SyncError::Fetch { source, .. } => connect_kind(source),
                SyncError::Filesystem { .. } | SyncError::Output { .. } => ("filesystem", false),
                SyncError::Input { .. } => ("input", false),
            };
        }
        if let Some(err) = cause.downcast_ref::<ConnectError>() {
            return connect_kind(err);
        }
        if cause.downcast_ref::<SettingsError>().is_some() {
            return ("settings", false);
        }
    }
    ("fatal", false)
}

fn build_error_report(error: &eyre::Report, started_at: Instant) -> ErrorReport {
    let (error_type, retryable) = classify(error);
    ErrorReport {
        schema_version: REPORT_SCHEMA_VERSION,
        status: "failed",
        error_type,
        retryable,
        error: format!("{error:#}"),
        elapsed_ms: started_at.elapsed().as_millis() as u64,
    }
}

pub fn emit_error_report(json: bool, started_at: Instant, error: &eyre::Report) {
    if json {
        let report = build_error_report(error, started_at);
        match serde_json::to_string(&report) {
            Ok(encoded) => println!("{encoded}"),
            Err(encode_error) => {
                eprintln!("cardsync failed: {error:#}\nCannot encode error report: {encode_error}");
            }
        }
    } else {
        eprintln!("cardsync failed: {error:#}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preparation_errors_are_not_retryable() {
        let error = eyre::Report::new(SyncError::Preparation("source folder missing".into()));
        let report = build_error_report(&error, Instant::now());
        assert_eq!(report.error_type, "preparation");
        assert!(!report.retryable);
        assert_eq!(report.status, "failed");
    }

    #[test]
    fn fetch_timeouts_are_transient() {
        let error = eyre::Report::new(SyncError::Fetch {
            deck: "Prelims-10".into(),
            source: ConnectError::Timeout {
                action: cardsync_connect::Action::NotesInfo,
                elapsed_ms: 60_000,
            },
        });
        let (error_type, retryable) = classify(&error);
        assert_eq!(error_type, "transient");
        assert!(retryable);
    }

    #[test]
    fn wrapped_settings_errors_are_found_in_the_chain() {
        use eyre::WrapErr;
        let error = Err::<(), _>(SettingsError::Invalid("bad".into()))
            .wrap_err("loading settings")
            .unwrap_err();
        assert_eq!(classify(&error).0, "settings");
        let json = serde_json::to_value(build_error_report(&error, Instant::now())).unwrap();
        assert_eq!(json["schema_version"], 1);
        assert!(json["error"].as_str().unwrap().contains("bad"));
    }
}
