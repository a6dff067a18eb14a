//! Long-running host loop.

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use irota_core::{Engine, Notification};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

fn render_notice(n: &Notification, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact => {
            serde_json::to_string(n).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
        }
        _ => {
            let mut line = format!(
                "{} [{}] {}: {}",
                n.created_at.format("%H:%M:%S"),
                n.kind,
                n.title,
                n.message
            );
            if let Some(ref detail) = n.detail {
                line.push_str(&format!(" ({detail})"));
            }
            line
        }
    }
}

/// `irota watch`: run the engine loop and print notifications until Ctrl-C.
pub async fn handle(engine: &Engine, global: &GlobalOpts) -> Result<(), CliError> {
    let cancel = CancellationToken::new();
    let mut notices = engine.notifications().subscribe();

    let runner = tokio::spawn({
        let engine = engine.clone();
        let cancel = cancel.clone();
        async move { engine.run(cancel).await }
    });

    if !global.quiet {
        eprintln!(
            "Watching {} (scan every {}s, check every {}s). Press Ctrl-C to stop.",
            engine.config().network_range,
            engine.config().scan_interval.as_secs(),
            engine.config().check_interval.as_secs()
        );
    }

    loop {
        tokio::select! {
            biased;
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            msg = notices.recv() => match msg {
                Ok(notice) => output::print_output(&render_notice(&notice, &global.output), global.quiet),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notification feed lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    cancel.cancel();
    runner
        .await
        .map_err(|e| CliError::Internal(format!("engine loop panicked: {e}")))?;
    if !global.quiet {
        eprintln!("Stopped");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use irota_core::HardwareId;

    #[test]
    fn text_notice_includes_detail() {
        let n = Notification::update_failed(&HardwareId::new("aa:bb"), "Kitchen", "HTTP 500");
        let line = render_notice(&n, &OutputFormat::Table);
        assert!(line.contains("Failed to update Kitchen"));
        assert!(line.ends_with("(HTTP 500)"));
    }

    #[test]
    fn json_notice_is_one_line() {
        let n = Notification::updates_available(&["Kitchen".into()]);
        let line = render_notice(&n, &OutputFormat::Json);
        assert!(!line.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["key"], "updates_available");
    }
}
