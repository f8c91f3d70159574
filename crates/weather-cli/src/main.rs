use std::io::{self, BufRead, Write};

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};

use weather_cli::{
    config::{RuntimeConfig, SHARED_NAMESPACE},
    error::{
        AppError, ERROR_CODE_RUNTIME_IO, ERROR_CODE_RUNTIME_PROVIDER_INIT,
        ERROR_CODE_RUNTIME_SERIALIZE, ERROR_CODE_USER_OUTPUT_MODE_CONFLICT,
    },
    model::{ForecastDay, ForecastSnapshot, day_name, parse_coordinate_line},
    providers::{HttpProviders, ProviderApi},
    service::{ForecastClient, ShareStatus},
    store::{FileSnapshotStore, SnapshotStore},
    weather_code::{classify, small_icon_or_fallback},
    widget::{self, WidgetEntry},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Open-Meteo forecast CLI with a shared widget snapshot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch the forecast for one coordinate and share it with the widget.
    Forecast {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Upcoming days to show after today.
        #[arg(long, default_value_t = DEFAULT_UPCOMING_DAYS)]
        days: usize,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Read `lat,lon` location updates from stdin and fetch once per update.
    Watch {
        #[arg(long, default_value_t = DEFAULT_UPCOMING_DAYS)]
        days: usize,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print the widget timeline entry from the shared snapshot.
    Widget {
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Debug, Clone, Copy, Args)]
struct OutputArgs {
    #[arg(long, value_enum)]
    output: Option<OutputModeArg>,
    #[arg(long)]
    json: bool,
}

const ENVELOPE_SCHEMA_VERSION: &str = "v1";
const DEFAULT_UPCOMING_DAYS: usize = 5;
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputModeArg {
    Human,
    Json,
}

impl Cli {
    fn command_name(&self) -> &'static str {
        match &self.command {
            Commands::Forecast { .. } => "weather.forecast",
            Commands::Watch { .. } => "weather.watch",
            Commands::Widget { .. } => "weather.widget",
        }
    }

    fn output_mode_hint(&self) -> OutputModeArg {
        let args = match &self.command {
            Commands::Forecast { output, .. }
            | Commands::Watch { output, .. }
            | Commands::Widget { output } => output,
        };
        if args.json {
            OutputModeArg::Json
        } else {
            args.output.unwrap_or(OutputModeArg::Human)
        }
    }
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let command = cli.command_name();
    let output_mode = cli.output_mode_hint();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Err(error) = run(cli, &mut out) {
        emit_error(&mut out, command, output_mode, &error);
        std::process::exit(error.exit_code());
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(io::stderr)
        .try_init();
}

fn run(cli: Cli, out: &mut dyn Write) -> Result<(), AppError> {
    let config = RuntimeConfig::from_env();
    let store = FileSnapshotStore::new(&config.shared_dir, SHARED_NAMESPACE);
    let providers = || {
        HttpProviders::new(&config).map_err(|error| {
            AppError::runtime(ERROR_CODE_RUNTIME_PROVIDER_INIT, error.to_string())
        })
    };
    let stdin = io::stdin();
    run_with(cli, providers, store, Utc::now, stdin.lock(), out)
}

/// Providers are built on demand; `widget` only reads the shared store.
fn run_with<F, P, S, N, R>(
    cli: Cli,
    providers: F,
    store: S,
    now_fn: N,
    input: R,
    out: &mut dyn Write,
) -> Result<(), AppError>
where
    F: FnOnce() -> Result<P, AppError>,
    P: ProviderApi,
    S: SnapshotStore,
    N: Fn() -> DateTime<Utc>,
    R: BufRead,
{
    let command = cli.command_name();
    match cli.command {
        Commands::Forecast {
            lat,
            lon,
            days,
            output,
        } => {
            let mode = resolve_output_mode(output)?;
            let client = ForecastClient::new(providers()?, store);
            let fetch = client.fetch_forecast(lat, lon)?;
            let rendered =
                render_forecast(command, mode, &fetch.snapshot, Some(&fetch.share), days)?;
            write_line(out, &rendered)
        }
        Commands::Watch { days, output } => {
            let mode = resolve_output_mode(output)?;
            let client = ForecastClient::new(providers()?, store);
            run_watch(command, mode, &client, days, input, out)
        }
        Commands::Widget { output } => {
            let mode = resolve_output_mode(output)?;
            let entry = widget::timeline_entry(&store, now_fn);
            let rendered = render_widget(command, mode, &entry)?;
            write_line(out, &rendered)
        }
    }
}

/// Location updates arrive one per line; a bad update is reported and skipped.
fn run_watch<P, S, R>(
    command: &str,
    mode: OutputModeArg,
    client: &ForecastClient<P, S>,
    days: usize,
    input: R,
    out: &mut dyn Write,
) -> Result<(), AppError>
where
    P: ProviderApi,
    S: SnapshotStore,
    R: BufRead,
{
    let updates = client.subscribe();

    for line in input.lines() {
        let line =
            line.map_err(|error| AppError::runtime(ERROR_CODE_RUNTIME_IO, error.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }

        let outcome = parse_coordinate_line(&line)
            .map_err(AppError::from)
            .and_then(|(lat, lon)| client.fetch_forecast(lat, lon).map_err(AppError::from));

        match outcome {
            Ok(fetch) => {
                if let ShareStatus::Failed(message) = &fetch.share {
                    tracing::warn!(%message, "watch update was not shared");
                }
            }
            Err(error) => {
                emit_error(out, command, mode, &error);
                continue;
            }
        }

        while let Ok(snapshot) = updates.try_recv() {
            let rendered = render_forecast(command, mode, &snapshot, None, days)?;
            write_line(out, &rendered)?;
        }
    }

    Ok(())
}

fn resolve_output_mode(args: OutputArgs) -> Result<OutputModeArg, AppError> {
    match (args.output, args.json) {
        (Some(OutputModeArg::Human), true) => Err(AppError::user(
            ERROR_CODE_USER_OUTPUT_MODE_CONFLICT,
            "conflicting output flags: --json requires --output json (got human)",
        )),
        (Some(mode), _) => Ok(mode),
        (None, true) => Ok(OutputModeArg::Json),
        (None, false) => Ok(OutputModeArg::Human),
    }
}

fn write_line(out: &mut dyn Write, rendered: &str) -> Result<(), AppError> {
    writeln!(out, "{rendered}")
        .and_then(|()| out.flush())
        .map_err(|error| AppError::runtime(ERROR_CODE_RUNTIME_IO, error.to_string()))
}

fn render_forecast(
    command: &str,
    mode: OutputModeArg,
    snapshot: &ForecastSnapshot,
    share: Option<&ShareStatus>,
    days: usize,
) -> Result<String, AppError> {
    let upcoming = snapshot.daily.upcoming(days);
    match mode {
        OutputModeArg::Human => Ok(format_forecast_text(snapshot, share, &upcoming)),
        OutputModeArg::Json => {
            let mut result = json!({
                "snapshot": to_value(snapshot)?,
                "current": describe_code(snapshot.current.weather_code),
                "upcoming": upcoming.iter().map(describe_day).collect::<Vec<_>>(),
            });
            if let Some(share) = share {
                result["share"] = to_value(share)?;
            }
            render_success_envelope(command, result)
        }
    }
}

fn render_widget(
    command: &str,
    mode: OutputModeArg,
    entry: &WidgetEntry,
) -> Result<String, AppError> {
    match mode {
        OutputModeArg::Human => Ok(entry.temperature.clone()),
        OutputModeArg::Json => render_success_envelope(command, to_value(entry)?),
    }
}

fn describe_code(code: i32) -> Value {
    match classify(code) {
        Ok(info) => json!({
            "weather_code": code,
            "description": info.description,
            "big_icon": info.big_icon,
            "small_icon": info.small_icon,
        }),
        Err(_) => json!({
            "weather_code": code,
            "description": Value::Null,
            "big_icon": Value::Null,
            "small_icon": small_icon_or_fallback(code),
        }),
    }
}

fn describe_day(day: &ForecastDay) -> Value {
    let mut value = describe_code(day.weather_code);
    value["date"] = json!(day.date);
    value["day"] = json!(day_name(&day.date).ok());
    value["temp_max_c"] = json!(day.temp_max_c);
    value["temp_min_c"] = json!(day.temp_min_c);
    value
}

fn format_forecast_text(
    snapshot: &ForecastSnapshot,
    share: Option<&ShareStatus>,
    upcoming: &[ForecastDay],
) -> String {
    let current = &snapshot.current;
    let mut lines = vec![format!(
        "{:.4},{:.4} | now {:.1}°C {} [{}] | wind {:.1} m/s | precipitation {:.1}%",
        snapshot.latitude,
        snapshot.longitude,
        current.temperature_c,
        description_or_unknown(current.weather_code),
        small_icon_or_fallback(current.weather_code),
        current.wind_speed_ms,
        current.precipitation_pct
    )];

    for day in upcoming {
        lines.push(format!(
            "{} {} {} [{}] {:.1}~{:.1}°C",
            day_name(&day.date).unwrap_or_else(|_| "---".to_string()),
            day.date,
            description_or_unknown(day.weather_code),
            small_icon_or_fallback(day.weather_code),
            day.temp_min_c,
            day.temp_max_c
        ));
    }

    if let Some(share) = share {
        lines.push(format!("shared: {}", share_label(share)));
    }

    lines.join("\n")
}

fn description_or_unknown(code: i32) -> &'static str {
    classify(code)
        .map(|info| info.description)
        .unwrap_or("Unknown")
}

fn share_label(share: &ShareStatus) -> String {
    match share {
        ShareStatus::Written => "written".to_string(),
        ShareStatus::Superseded => "superseded".to_string(),
        ShareStatus::Failed(message) => format!("failed ({message})"),
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(|error| {
        AppError::runtime(
            ERROR_CODE_RUNTIME_SERIALIZE,
            format!("failed to serialize output: {error}"),
        )
    })
}

fn render_success_envelope(command: &str, result: Value) -> Result<String, AppError> {
    serde_json::to_string(&json!({
        "schema_version": ENVELOPE_SCHEMA_VERSION,
        "command": command,
        "ok": true,
        "result": result,
    }))
    .map_err(|error| {
        AppError::runtime(
            ERROR_CODE_RUNTIME_SERIALIZE,
            format!("failed to serialize output envelope: {error}"),
        )
    })
}

fn emit_error(out: &mut dyn Write, command: &str, mode: OutputModeArg, error: &AppError) {
    match mode {
        OutputModeArg::Json => {
            let payload = json!({
                "schema_version": ENVELOPE_SCHEMA_VERSION,
                "command": command,
                "ok": false,
                "error": {
                    "code": error.code,
                    "message": error.message,
                    "details": {
                        "kind": error.kind_label(),
                        "exit_code": error.exit_code(),
                    }
                }
            });
            let _ = writeln!(out, "{payload}");
            let _ = out.flush();
        }
        OutputModeArg::Human => {
            eprintln!("error[{}]: {}", error.code, error.message);
        }
    }
}
