//! The rescheduling run.

use reshuffle_engine::{RescheduleRequest, RunReport, reschedule};
use reshuffle_providers::{CalendarProvider, MemoryProvider};
use tracing::{debug, info};

use crate::cli::RunArgs;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Runs the planner and prints the transcript (and plan JSON if asked).
///
/// Fails when the run aborted or logged an error, after printing.
pub async fn run(args: &RunArgs, config: &ClientConfig, verbose: bool) -> ClientResult<()> {
    let request = build_request(args, config, verbose)?;
    let provider = open_provider(args, config)?;
    info!(
        "running against {} calendar {} (dry run: {})",
        provider.name(),
        request.calendar_id,
        request.dry_run
    );

    let report = reschedule(provider.as_ref(), &request).await;
    println!("{}", render(&report, args.json)?);

    if report.succeeded() {
        Ok(())
    } else {
        Err(ClientError::RunFailed)
    }
}

/// Builds the engine request from CLI arguments and config.
pub fn build_request(
    args: &RunArgs,
    config: &ClientConfig,
    verbose: bool,
) -> ClientResult<RescheduleRequest> {
    let positional = |value: &Option<String>, name: &str| {
        value
            .clone()
            .ok_or_else(|| ClientError::Config(format!("missing argument <{}>", name)))
    };

    let mut request = RescheduleRequest::new(
        positional(&args.blocked_dates, "BLOCKED_DATES")?,
        positional(&args.candidate_dates, "CANDIDATE_DATES")?,
        positional(&args.start_time, "START_TIME")?,
        positional(&args.end_time, "END_TIME")?,
    )
    .with_dry_run(args.dry_run)
    .with_verbose(verbose)
    .with_calendar_id(
        args.calendar_id
            .clone()
            .unwrap_or_else(|| config.calendar_id()),
    )
    .with_settings(config.schedule.to_settings()?);

    if let Some(ref organizer) = config.schedule.organizer {
        request = request.with_organizer(organizer);
    }
    Ok(request)
}

/// Picks the calendar backend: an offline snapshot or Google.
fn open_provider(args: &RunArgs, config: &ClientConfig) -> ClientResult<Box<dyn CalendarProvider>> {
    if let Some(ref path) = args.offline {
        debug!("loading calendar snapshot from {}", path.display());
        return Ok(Box::new(MemoryProvider::load(path)?));
    }
    open_google(args, config)
}

#[cfg(feature = "google")]
fn open_google(args: &RunArgs, config: &ClientConfig) -> ClientResult<Box<dyn CalendarProvider>> {
    use reshuffle_providers::google::GoogleProvider;

    let settings = config.google.clone().unwrap_or_default();
    let mut google = settings.to_provider_config()?;
    if let Some(ref id) = args.calendar_id {
        google = google.with_calendar_id(id);
    }
    let provider = GoogleProvider::new(google)?;
    if !provider.is_authenticated() {
        return Err(ClientError::Config(format!(
            "no usable Google token; set google.token_path or google.token_json in {}",
            ClientConfig::default_path().display()
        )));
    }
    Ok(Box::new(provider))
}

#[cfg(not(feature = "google"))]
fn open_google(_args: &RunArgs, _config: &ClientConfig) -> ClientResult<Box<dyn CalendarProvider>> {
    Err(ClientError::Config(
        "built without Google support; use --offline <FILE>".to_string(),
    ))
}

/// Transcript, optionally followed by the plan as JSON.
pub fn render(report: &RunReport, json: bool) -> ClientResult<String> {
    let mut out = report.render();
    if json && let Some(ref plan) = report.plan {
        let plan_json = plan
            .to_json()
            .map_err(|e| ClientError::Output(format!("failed to serialize plan: {}", e)))?;
        out.push('\n');
        out.push_str(&plan_json);
    }
    Ok(out)
}
