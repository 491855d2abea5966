//! Summarizes a media file's audio/video characteristics by running ffprobe
//! and aggregating its JSON output into a [`VideoInfo`] record.

pub mod ffprobe;

pub use ffprobe::{probe_file, CodecType, Disposition, Format, FormatTags, ProbeResult, Stream, StreamTags};
pub use ffprobe::error::{ProbeError, WriteError};
pub use ffprobe::info::VideoInfo;
