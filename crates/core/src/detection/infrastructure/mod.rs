pub mod model_resolver;
pub mod onnx_face_detector;
pub mod size_bounded_detector;
