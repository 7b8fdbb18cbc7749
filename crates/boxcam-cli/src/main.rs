mod sink;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use boxcam_geom::{
    doctor as geom_doctor, map_box, map_box_fit_width, place_overlay, resolve, DisplayDimensions,
    InterfaceOrientation, NormalizedBox,
};
use boxcam_vision::camera::{oriented_display, CameraConfig, ReplaySource};
use boxcam_vision::overlay::OverlayConfig;
use boxcam_vision::pipeline::{self, RenderConfig, TallyConfig};
use boxcam_vision::predictor::{GatePolicy, Predictor};
use boxcam_vision::replay::{ScriptedDetector, Session};

use sink::ReportSink;

#[derive(Debug, Parser)]
#[command(name = "boxcam", version, about = "boxcam - detection overlay geometry and replay harness")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the config.
    Doctor,
    /// Map one normalized box through the overlay geometry.
    Map {
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
        #[arg(long)]
        width: f64,
        #[arg(long)]
        height: f64,
        #[arg(long, default_value = "portrait")]
        orientation: String,
    },
    /// Drive the pipeline over a scripted session.
    Replay {
        #[arg(long)]
        session: String,
        /// Write an annotated PNG per rendered frame.
        #[arg(long)]
        snapshot_dir: Option<PathBuf>,
        /// One JSON report per line instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, serde::Deserialize)]
struct Config {
    camera: CameraConfig,
    display: DisplayCfg,
    #[serde(default)]
    overlay: OverlayConfig,
    #[serde(default)]
    tally: TallyConfig,
    #[serde(default)]
    predictor: PredictorCfg,
}

#[derive(Debug, serde::Deserialize)]
struct DisplayCfg {
    width: f64,
    height: f64,
}

#[derive(Debug, Default, serde::Deserialize)]
struct PredictorCfg {
    #[serde(default)]
    gate: GatePolicy,
}

impl Config {
    fn display(&self) -> DisplayDimensions {
        DisplayDimensions::new(self.display.width, self.display.height)
    }

    fn render(&self) -> RenderConfig {
        RenderConfig { overlay: self.overlay.clone(), tally: self.tally.clone() }
    }
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).context("read config")?;
    toml::from_str(&s).context("parse config toml")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg)?,
        Command::Map { x, y, width, height, orientation } => {
            map_cmd(&cfg, NormalizedBox::new(x, y, width, height), &orientation)?
        }
        Command::Replay { session, snapshot_dir, json } => replay(&cfg, &session, snapshot_dir, json).await?,
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");

    geom_doctor::check_dimensions(cfg.camera.dimensions(), cfg.display())?;
    geom_doctor::check_calibration(&cfg.overlay.calibration)?;
    anyhow::ensure!(cfg.camera.fps >= 1 && cfg.camera.fps <= 240, "camera.fps should be 1..240");
    anyhow::ensure!(cfg.overlay.max_annotations >= 1, "overlay.max_annotations must be >= 1");
    if cfg.tally.enable {
        anyhow::ensure!(cfg.tally.label_a != cfg.tally.label_b, "tally.label_a and tally.label_b must differ");
        anyhow::ensure!(cfg.tally.bar_width > 0.0, "tally.bar_width must be > 0");
    }
    if let Some(p) = &cfg.camera.still_path {
        cfg.camera.load_pixels().with_context(|| format!("camera.still_path {}", p))?;
    }

    info!("doctor: OK");
    Ok(())
}

fn map_cmd(cfg: &Config, bbox: NormalizedBox, orientation: &str) -> Result<()> {
    let interface: InterfaceOrientation = orientation.parse()?;
    let tag = resolve(interface);
    let frame = cfg.camera.dimensions();
    let display = oriented_display(cfg.display(), interface);

    let rect = map_box(&bbox, frame);
    let placement = place_overlay(frame, display, tag, &cfg.overlay.calibration);
    let screen = placement.to_screen(rect);
    let fit = map_box_fit_width(&bbox, frame, display);

    println!("interface={} exif={} ({}) reflect={}", interface, tag, tag.raw(), tag.is_reflect());
    println!("frame={}x{} display={}x{}", frame.width, frame.height, display.width, display.height);
    println!("pixel_rect x={:.2} y={:.2} w={:.2} h={:.2}", rect.x, rect.y, rect.width, rect.height);
    println!(
        "transform scale_x={:.4} scale_y={:.4} rotation={:.4}",
        placement.transform.scale_x, placement.transform.scale_y, placement.transform.rotation_radians
    );
    println!("screen_rect x={:.2} y={:.2} w={:.2} h={:.2}", screen.x, screen.y, screen.width, screen.height);
    println!("fit_width_rect x={:.2} y={:.2} w={:.2} h={:.2}", fit.x, fit.y, fit.width, fit.height);
    Ok(())
}

async fn replay(cfg: &Config, session_path: &str, snapshot_dir: Option<PathBuf>, json: bool) -> Result<()> {
    doctor(cfg)?;
    let session = Session::load(session_path)?;
    if let Some(dir) = &snapshot_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }

    let base = cfg.display();
    let (display_tx, display_rx) = watch::channel(base);
    let source = ReplaySource::new(&cfg.camera, &session)?.with_display(display_tx, base);
    let predictor = Predictor::new(ScriptedDetector::from_session(&session), cfg.predictor.gate);
    let sink = ReportSink::new(json, snapshot_dir, source.pixels());

    let (summary, sink) = pipeline::run(source, predictor, cfg.render(), display_rx, sink).await?;

    println!("summary {} reports={}", summary, sink.reports_written());
    if let Some(t) = summary.tally {
        println!("tally {}={} {}={}", cfg.tally.label_a, t.count_a, cfg.tally.label_b, t.count_b);
    }
    Ok(())
}
