use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use reveal_crops::backends::{
    DirectoryStore, HttpImageFetcher, InMemoryGameRecords, PostgrestGameRecords, SupabaseStorage,
};
use reveal_crops::config::request::DEFAULT_MAX_ZOOM;
use reveal_crops::config::{ServiceConfig, parse_duration};
use reveal_crops::geometry::origin::{DEFAULT_ORIGIN, parse_origin};
use reveal_crops::geometry::presets::CanvasPreset;
use reveal_crops::processing::plan_stages;
use reveal_crops::{RevealSession, server};
use serde_json::json;
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use tracing_subscriber::EnvFilter;

/// Progressive-reveal crop generator:
/// - serve: HTTP trigger backed by Supabase (or local files)
/// - generate: one-off run for a single game
/// - plan: print stage geometry without touching any image
#[derive(Parser, Debug)]
#[command(name = "reveal")]
#[command(about = "🧩 Generate the six zoom stages of a daily reveal game")]
#[command(long_about = "Generate the six progressively revealing crops of a daily game photograph.
Game rows come from PostgREST or a local JSON file.
Artifacts go to Supabase Storage or a local directory.")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Listen for POST {"gameId": ...} requests
    Serve {
        #[arg(long, env = "REVEAL_BIND", default_value = "0.0.0.0:8000",
              help = "Address to listen on")]
        bind: SocketAddr,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Generate and store the stages of one game, then print a JSON report
    Generate {
        #[arg(long, help = "Id of the game row to process")]
        game_id: String,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Print the crop window of every stage as JSON
    Plan {
        #[arg(long, help = "Source image width in pixels")]
        width: u32,

        #[arg(long, help = "Source image height in pixels")]
        height: u32,

        #[arg(long, default_value = DEFAULT_ORIGIN,
              help = "Focal point: percentages (\"30% 70%\") or keywords (\"top left\")")]
        origin: String,

        #[arg(long, default_value_t = 5.0, help = "Zoom factor of stage 0")]
        max_zoom: f64,
    },
}

#[derive(Args, Debug)]
struct BackendArgs {
    /// Supabase project URL
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: Option<String>,

    /// Supabase service-role key
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    service_key: Option<String>,

    #[arg(long, default_value = "daily_games", help = "Table holding game rows")]
    games_table: String,

    #[arg(long, default_value = "game-crops", help = "Bucket receiving stage artifacts")]
    bucket: String,

    /// Read game rows from a JSON object keyed by game id instead of PostgREST
    #[arg(long)]
    games_file: Option<PathBuf>,

    /// Write artifacts under this directory instead of Supabase Storage
    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = CanvasPreset::Retina,
          help = "Output canvas: retina (600x400) or standard (300x200)")]
    canvas: CanvasPreset,

    #[arg(long, default_value_t = 80, help = "JPEG quality (1-100)")]
    jpeg_quality: u8,

    #[arg(long, default_value = "60s", value_parser = parse_duration,
          help = "Budget for one run: 45s, 2m")]
    deadline: Duration,
}

impl BackendArgs {
    fn to_config(&self, bind_addr: Option<SocketAddr>) -> ServiceConfig {
        let defaults = ServiceConfig::default();
        ServiceConfig {
            bind_addr: bind_addr.unwrap_or(defaults.bind_addr),
            supabase_url: self.supabase_url.clone(),
            service_key: self.service_key.clone(),
            games_table: self.games_table.clone(),
            bucket: self.bucket.clone(),
            canvas: self.canvas,
            jpeg_quality: self.jpeg_quality,
            deadline: self.deadline,
        }
    }

    async fn build_session(&self, config: &ServiceConfig) -> Result<RevealSession> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("reveal-crops/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        let mut builder = RevealSession::builder()
            .with_fetcher(HttpImageFetcher::new(client.clone()))
            .with_render_options(config.render_options())
            .with_deadline(config.deadline);

        builder = match (&self.games_file, config.supabase()) {
            (Some(path), _) => {
                let records = InMemoryGameRecords::from_json_file(path).await?;
                tracing::info!(path = %path.display(), games = records.len(), "loaded game rows");
                builder.with_records(records)
            }
            (None, Some((url, key))) => builder.with_records(PostgrestGameRecords::new(
                client.clone(),
                url,
                key,
                config.games_table.clone(),
            )),
            (None, None) => anyhow::bail!(
                "no game records backend: pass --games-file or set SUPABASE_URL and \
                 SUPABASE_SERVICE_ROLE_KEY"
            ),
        };

        builder = match (&self.output_dir, config.supabase()) {
            (Some(dir), _) => builder.with_store(DirectoryStore::new(dir)),
            (None, Some((url, key))) => {
                builder.with_store(SupabaseStorage::new(client, url, key, config.bucket.clone()))
            }
            (None, None) => anyhow::bail!(
                "no artifact store: pass --output-dir or set SUPABASE_URL and \
                 SUPABASE_SERVICE_ROLE_KEY"
            ),
        };

        Ok(builder.build()?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { bind, backend } => {
            let config = backend.to_config(Some(bind));
            config.validate().map_err(anyhow::Error::msg)?;
            let session = backend.build_session(&config).await?;
            server::serve(&config, session).await?;
        }
        Command::Generate { game_id, backend } => {
            let config = backend.to_config(None);
            config.validate().map_err(anyhow::Error::msg)?;
            let session = backend.build_session(&config).await?;
            let report = session.run(&game_id).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Plan {
            width,
            height,
            origin,
            max_zoom,
        } => {
            if width == 0 || height == 0 {
                anyhow::bail!("width and height must be greater than 0");
            }
            if !max_zoom.is_finite() || max_zoom < 0.0 {
                anyhow::bail!("max zoom must be a non-negative number, got {}", max_zoom);
            }
            let max_zoom = if max_zoom == 0.0 { DEFAULT_MAX_ZOOM } else { max_zoom };
            let focus = parse_origin(&origin);
            let stages: Vec<_> = plan_stages(width, height, focus, max_zoom)
                .into_iter()
                .map(|plan| {
                    let rect = plan.window.to_pixel_rect(width, height);
                    let window = plan.window;
                    json!({
                        "stage": plan.stage.get(),
                        "scale": plan.scale,
                        "window": [window.x, window.y, window.width, window.height],
                        "pixels": [rect.x, rect.y, rect.w, rect.h],
                    })
                })
                .collect();
            let out = json!({
                "origin": { "x": focus.x, "y": focus.y },
                "stages": stages,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}
