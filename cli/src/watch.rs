//! `tokenmeter watch`: each stdin line replaces the draft; reports are printed as the tracker
//! publishes them.

use std::io::Write;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_stream::wrappers::{LinesStream, WatchStream};
use tokio_stream::StreamExt;
use tokenmeter::{CapacityReport, CapacityTracker, TrackerConfig, UsageThresholds};

use crate::output::{render, OutputFormat};
use crate::{CliError, SessionOptions};

/// How long to wait after end of input for the last estimate to land.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs until `input` ends and the last draft has settled; returns the final report.
pub async fn run_watch<R, W>(
    options: &SessionOptions,
    config: &TrackerConfig,
    input: R,
    out: &mut W,
    format: OutputFormat,
) -> Result<CapacityReport, CliError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let catalog = options.load_catalog(config).await?;
    crate::resolve_limits(&catalog, &options.models)?;
    let store = options.load_conversations()?;

    let tracker = CapacityTracker::start(catalog, options.build_client(config), config);
    tracker.sync_conversations(&store).await?;
    tracker.set_follow_up(options.follow_up);
    tracker.set_attachments(options.attachments());
    tracker.set_selected_models(options.models.clone());

    let thresholds = tracker.thresholds();
    let mut printer = Printer {
        out,
        format,
        last: None,
    };
    let mut lines = LinesStream::new(input.lines());
    let mut reports = WatchStream::from_changes(tracker.subscribe_reports());

    loop {
        tokio::select! {
            line = lines.next() => match line {
                Some(line) => tracker.set_draft(line?),
                None => break,
            },
            Some(report) = reports.next() => printer.print(&report, &thresholds)?,
        }
    }

    let mut rx = tracker.subscribe_reports();
    let report = match tokio::time::timeout(
        config.debounce() + SETTLE_TIMEOUT,
        rx.wait_for(|report| !report.is_pending),
    )
    .await
    {
        Ok(Ok(report)) => report.clone(),
        _ => {
            tracing::warn!("estimate did not settle, reporting current state");
            tracker.report()
        }
    };
    printer.print(&report, &thresholds)?;
    Ok(report)
}

/// Writes one line per report, skipping lines identical to the previous one.
struct Printer<'a, W> {
    out: &'a mut W,
    format: OutputFormat,
    last: Option<String>,
}

impl<W: Write> Printer<'_, W> {
    fn print(
        &mut self,
        report: &CapacityReport,
        thresholds: &UsageThresholds,
    ) -> Result<(), CliError> {
        let line = render(report, thresholds, self.format)?;
        if self.last.as_deref() == Some(line.as_str()) {
            return Ok(());
        }
        writeln!(self.out, "{line}")?;
        self.out.flush()?;
        self.last = Some(line);
        Ok(())
    }
}
