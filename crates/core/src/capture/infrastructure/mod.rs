mod ffmpeg_capture_worker;
pub mod ffmpeg_camera_source;
pub mod ffmpeg_file_source;
