use std::time::Duration;

pub const FACE_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
/// Published YOLO face weights; `NodeConfig::model_url` overrides it.
pub const DEFAULT_FACE_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Path appended to the collector address for event submission.
pub const EVENTS_PATH: &str = "/v1/events/";

/// Overall timeout for one event submission.
pub const SEND_TIMEOUT: Duration = Duration::from_millis(6050);

/// Event type reported for a new sighting ("enter").
pub const EVENT_TYPE_ENTER: u32 = 0;

pub const DEFAULT_DISPATCH_WORKERS: usize = 4;
pub const DEFAULT_DISPATCH_QUEUE_CAPACITY: usize = 64;
