pub mod frame_loop;
pub mod loop_stats;
