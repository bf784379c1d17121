use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use signal_hook::consts::{SIGINT, SIGTERM};

use facewatch_core::detection::domain::face_detector::FaceDetector;
use facewatch_core::detection::domain::face_size_bounds::FaceSizeBounds;
use facewatch_core::detection::infrastructure::model_resolver;
use facewatch_core::detection::infrastructure::onnx_face_detector::OnnxFaceDetector;
use facewatch_core::detection::infrastructure::size_bounded_detector::SizeBoundedDetector;
use facewatch_core::dispatch::infrastructure::http_event_sender::HttpEventSender;
use facewatch_core::dispatch::infrastructure::pooled_dispatcher::PooledDispatcher;
use facewatch_core::pipeline::frame_loop::FrameLoopController;
use facewatch_core::shared::clock::SystemClock;
use facewatch_core::shared::constants::FACE_MODEL_NAME;
use facewatch_core::shared::node_config::NodeConfig;
use facewatch_core::tracking::infrastructure::template_tracker::TemplateTracker;
use facewatch_core::video::domain::frame_source::FrameSource;
use facewatch_core::video::infrastructure::ffmpeg_source::FfmpegSource;

const DEFAULT_DEVICE: &str = "/dev/video0";

/// Camera node: tracks faces in a video stream and reports each sighting
/// to a collector.
#[derive(Parser)]
#[command(name = "facewatch-node")]
struct Cli {
    /// Collector address [default: http://localhost:8000].
    addr: Option<String>,

    /// Capture frame rate requested from the camera.
    #[arg(long)]
    fps: Option<f64>,

    /// Seconds between detection passes.
    #[arg(long)]
    detect: Option<f64>,

    /// Minimum seconds a face must be tracked to be reported.
    #[arg(long)]
    send: Option<f64>,

    /// Seconds a lost face is kept before its track expires.
    #[arg(long)]
    failure: Option<f64>,

    /// Minimum face size as a fraction of the frame (0.0-1.0).
    #[arg(long)]
    size: Option<f64>,

    /// Maximum face size as a fraction of the frame (0.0-1.0).
    #[arg(long)]
    size_max: Option<f64>,

    /// Read frames from a video file instead of the camera.
    #[arg(long)]
    video: Option<PathBuf>,

    /// Camera capture device.
    #[arg(long, default_value = DEFAULT_DEVICE)]
    device: String,

    /// Node id reported with each event (default: persistent per-device id).
    #[arg(long)]
    node_id: Option<u64>,

    /// ONNX face model (downloaded on first use when omitted).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Where to download the face model from when it is not cached.
    #[arg(long)]
    model_url: Option<String>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Number of concurrent event uploads.
    #[arg(long)]
    workers: Option<usize>,

    /// JSON config file; command-line flags take precedence.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    config.validate()?;

    let node_id = config.resolve_node_id()?;
    let events_url = config.events_url()?;
    log::info!("Node {node_id} reporting to {events_url}");

    let input = match &cli.video {
        Some(path) => path.to_string_lossy().into_owned(),
        None => cli.device.clone(),
    };
    let mut source = FfmpegSource::open(&input, cli.fps)?;
    let metadata = source.metadata();
    let bounds = FaceSizeBounds::new(config.min_box_fraction, config.max_box_fraction);
    log::info!(
        "Face size range {:?} to {:?} px",
        metadata.scaled_size(config.min_box_fraction),
        metadata.scaled_size(config.max_box_fraction)
    );

    let detector = build_detector(&cli, &config, bounds)?;
    let sender = HttpEventSender::new(events_url, config.send_timeout())?;
    let dispatcher = PooledDispatcher::new(
        Arc::new(sender),
        config.dispatch_workers,
        config.dispatch_queue_capacity,
    );

    let mut controller = FrameLoopController::new(
        detector,
        Box::new(TemplateTracker::default()),
        Box::new(dispatcher),
        Box::new(SystemClock),
        config.timing(),
        node_id,
    );

    // First signal stops the loop and drains dispatches; a second one exits.
    let stop = controller.stop_flag();
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register_conditional_shutdown(signal, 1, Arc::clone(&stop))?;
        signal_hook::flag::register(signal, Arc::clone(&stop))?;
    }

    controller.run(&mut source)
}

/// Defaults, then the config file, then command-line flags.
fn build_config(cli: &Cli) -> Result<NodeConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };

    if let Some(addr) = &cli.addr {
        config.collector_address = addr.clone();
    }
    if let Some(v) = cli.detect {
        config.detection_interval = v;
    }
    if let Some(v) = cli.send {
        config.send_delay = v;
    }
    if let Some(v) = cli.failure {
        config.failure_delay = v;
    }
    if let Some(v) = cli.size {
        config.min_box_fraction = v;
    }
    if let Some(v) = cli.size_max {
        config.max_box_fraction = v;
    }
    if let Some(v) = cli.node_id {
        config.node_id = Some(v);
    }
    if let Some(v) = cli.confidence {
        config.confidence = v;
    }
    if let Some(v) = cli.workers {
        config.dispatch_workers = v;
    }
    if let Some(url) = &cli.model_url {
        config.model_url = url.clone();
    }
    Ok(config)
}

fn build_detector(
    cli: &Cli,
    config: &NodeConfig,
    bounds: FaceSizeBounds,
) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    let model_path = match &cli.model {
        Some(path) if path.exists() => path.clone(),
        Some(path) => return Err(format!("Model file not found: {}", path.display()).into()),
        None => {
            log::info!("Resolving model: {FACE_MODEL_NAME}");
            model_resolver::resolve(FACE_MODEL_NAME, &config.model_url, None)?
        }
    };

    let base: Box<dyn FaceDetector> =
        Box::new(OnnxFaceDetector::new(&model_path, config.confidence)?);
    Ok(Box::new(SizeBoundedDetector::new(base, bounds)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("facewatch-node").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults_follow_node_config() {
        let cli = parse(&[]);
        let config = build_config(&cli).unwrap();

        assert_eq!(config, NodeConfig::default());
        assert_eq!(cli.device, DEFAULT_DEVICE);
        assert!(cli.video.is_none());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = parse(&[
            "http://collector:9000",
            "--detect",
            "0.5",
            "--send",
            "0.8",
            "--size",
            "0.2",
            "--size-max",
            "0.6",
            "--node-id",
            "12",
            "--workers",
            "2",
            "--model-url",
            "https://models.example.com/face.onnx",
        ]);
        let config = build_config(&cli).unwrap();

        assert_eq!(config.collector_address, "http://collector:9000");
        assert_eq!(config.detection_interval, 0.5);
        assert_eq!(config.send_delay, 0.8);
        assert_eq!(config.min_box_fraction, 0.2);
        assert_eq!(config.max_box_fraction, 0.6);
        assert_eq!(config.node_id, Some(12));
        assert_eq!(config.dispatch_workers, 2);
        assert_eq!(config.model_url, "https://models.example.com/face.onnx");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.json");
        std::fs::write(&path, r#"{"send_delay": 1.5, "failure_delay": 2.0}"#).unwrap();

        let cli = parse(&["--config", path.to_str().unwrap(), "--failure", "3"]);
        let config = build_config(&cli).unwrap();

        assert_eq!(config.send_delay, 1.5);
        assert_eq!(config.failure_delay, 3.0);
    }
}
