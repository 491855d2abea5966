pub mod info;
pub mod error;

use std::path::Path;
use std::process::{Command, Stdio};

use log::debug;
use serde::{Deserialize, Serialize};

use error::ProbeError;

/// Raw ffprobe output for one file: every stream plus the container format.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProbeResult {
    #[serde(default)]
    pub streams: Vec<Stream>,
    #[serde(default)]
    pub format: Format
}

impl ProbeResult {
    pub fn video_streams(&self) -> Vec<&Stream> {
        self.streams.iter()
            .filter(| s | matches!(s.codec_type, CodecType::Video))
            .collect()
    }

    pub fn audio_streams(&self) -> Vec<&Stream> {
        self.streams.iter()
            .filter(| s | matches!(s.codec_type, CodecType::Audio))
            .collect()
    }
}

/// The kind of track a stream carries. ffprobe emits more kinds than we
/// aggregate (subtitle, data, attachment); those keep their exact spelling
/// in `Other` and round-trip through serialization untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CodecType {
    Video,
    Audio,
    Other(String)
}

impl Default for CodecType {
    fn default() -> CodecType {
        CodecType::Other(String::new())
    }
}

impl From<String> for CodecType {
    fn from(raw: String) -> CodecType {
        match raw.as_str() {
            "video" => CodecType::Video,
            "audio" => CodecType::Audio,

            _ => CodecType::Other(raw)
        }
    }
}

impl From<CodecType> for String {
    fn from(codec_type: CodecType) -> String {
        match codec_type {
            CodecType::Video => String::from("video"),
            CodecType::Audio => String::from("audio"),
            CodecType::Other(raw) => raw
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stream {
    #[serde(default)]
    pub index: u64,
    #[serde(default)]
    pub codec_name: String,
    #[serde(default)]
    pub codec_long_name: String,
    #[serde(default)]
    pub profile: String,
    #[serde(default)]
    pub codec_type: CodecType,
    #[serde(default)]
    pub codec_time_base: String,
    #[serde(default)]
    pub codec_tag_string: String,
    #[serde(default)]
    pub codec_tag: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub width: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub height: u64,
    // Encoders can require frame dimensions to be a multiple of some number
    // (16 for x264) and pad the frame to fit, storing crop values for the
    // decoder. The coded size is the size before cropping.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub coded_width: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub coded_height: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub closed_captions: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub has_b_frames: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sample_aspect_ratio: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_aspect_ratio: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pix_fmt: String,
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub level: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub chroma_location: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub refs: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub is_avc: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub nal_length_size: String,

    #[serde(default)]
    pub r_frame_rate: String,
    #[serde(default)]
    pub avg_frame_rate: String,
    #[serde(default)]
    pub time_base: String,
    #[serde(default)]
    pub start_pts: i64,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub duration_ts: u64,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub bit_rate: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bits_per_raw_sample: String,
    #[serde(default)]
    pub nb_frames: String,

    #[serde(default)]
    pub disposition: Disposition,
    #[serde(default)]
    pub tags: StreamTags,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sample_fmt: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sample_rate: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub channels: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub channel_layout: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub bits_per_sample: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub max_bit_rate: String
}

/// Boolean-as-0/1 flags describing the role of a stream within the file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Disposition {
    #[serde(default)]
    pub default: u8,
    #[serde(default)]
    pub dub: u8,
    #[serde(default)]
    pub original: u8,
    #[serde(default)]
    pub comment: u8,
    #[serde(default)]
    pub lyrics: u8,
    #[serde(default)]
    pub karaoke: u8,
    #[serde(default)]
    pub forced: u8,
    #[serde(default)]
    pub hearing_impaired: u8,
    #[serde(default)]
    pub visual_impaired: u8,
    #[serde(default)]
    pub clean_effects: u8,
    #[serde(default)]
    pub attached_pic: u8,
    #[serde(default)]
    pub timed_thumbnails: u8
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StreamTags {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub handler_name: String
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Format {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub nb_streams: u64,
    #[serde(default)]
    pub nb_programs: u64,
    #[serde(default)]
    pub format_name: String,
    #[serde(default)]
    pub format_long_name: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub bit_rate: String,
    #[serde(default)]
    pub probe_score: u64,
    #[serde(default)]
    pub tags: FormatTags
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FormatTags {
    #[serde(default)]
    pub major_brand: String,
    #[serde(default)]
    pub minor_version: String,
    #[serde(default)]
    pub compatible_brands: String,
    #[serde(default)]
    pub encoder: String
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

fn is_zero_i64(n: &i64) -> bool {
    *n == 0
}

/// Runs ffprobe on the given path and parses its JSON output.
pub fn probe_file(path: &Path) -> Result<ProbeResult, ProbeError> {
    debug!("Probing {} with ffprobe", path.to_string_lossy());

    let mut ffprobe = Command::new("ffprobe");
    ffprobe.args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"]);
    ffprobe.arg(path);
    ffprobe.stdin(Stdio::null());

    let output = ffprobe.output().map_err(ProbeError::ExecError)?;

    if !output.status.success() {
        return Err(ProbeError::BadExitStatus(output.status));
    }

    serde_json::from_slice::<ProbeResult>(output.stdout.as_slice()).map_err(ProbeError::SerdeError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_probe_output() {
        let raw = r#"{
            "streams": [
                {
                    "index": 0,
                    "codec_name": "h264",
                    "codec_long_name": "H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10",
                    "profile": "High",
                    "codec_type": "video",
                    "codec_tag_string": "avc1",
                    "codec_tag": "0x31637661",
                    "width": 1920,
                    "height": 1080,
                    "coded_width": 1920,
                    "coded_height": 1088,
                    "has_b_frames": 2,
                    "pix_fmt": "yuv420p",
                    "level": 40,
                    "refs": 1,
                    "is_avc": "true",
                    "nal_length_size": "4",
                    "r_frame_rate": "25/1",
                    "avg_frame_rate": "25/1",
                    "time_base": "1/12800",
                    "start_pts": 0,
                    "start_time": "0.000000",
                    "duration_ts": 154624,
                    "duration": "12.080000",
                    "bit_rate": "4000000",
                    "bits_per_raw_sample": "8",
                    "nb_frames": "302",
                    "disposition": {
                        "default": 1,
                        "dub": 0,
                        "original": 0,
                        "comment": 0,
                        "lyrics": 0,
                        "karaoke": 0,
                        "forced": 0,
                        "hearing_impaired": 0,
                        "visual_impaired": 0,
                        "clean_effects": 0,
                        "attached_pic": 0,
                        "timed_thumbnails": 0
                    },
                    "tags": {
                        "language": "und",
                        "handler_name": "VideoHandler"
                    }
                },
                {
                    "index": 1,
                    "codec_name": "aac",
                    "codec_type": "audio",
                    "sample_fmt": "fltp",
                    "sample_rate": "48000",
                    "channels": 2,
                    "channel_layout": "stereo",
                    "bit_rate": "128000",
                    "max_bit_rate": "128000",
                    "tags": {
                        "language": "eng"
                    }
                }
            ],
            "format": {
                "filename": "movie.mp4",
                "nb_streams": 2,
                "nb_programs": 0,
                "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
                "format_long_name": "QuickTime / MOV",
                "start_time": "0.000000",
                "duration": "12.303000",
                "size": "6400000",
                "bit_rate": "4161000",
                "probe_score": 100,
                "tags": {
                    "major_brand": "isom",
                    "minor_version": "512",
                    "compatible_brands": "isomiso2avc1mp41",
                    "encoder": "Lavf58.76.100"
                }
            }
        }"#;

        let probe = serde_json::from_str::<ProbeResult>(raw).unwrap();

        assert_eq!(probe.streams.len(), 2);
        assert_eq!(probe.streams[0].codec_type, CodecType::Video);
        assert_eq!(probe.streams[0].coded_height, 1088);
        assert_eq!(probe.streams[0].disposition.default, 1);
        assert_eq!(probe.streams[0].tags.handler_name, "VideoHandler");
        assert_eq!(probe.streams[1].codec_type, CodecType::Audio);
        assert_eq!(probe.streams[1].channels, 2);
        assert_eq!(probe.streams[1].tags.language, "eng");
        assert_eq!(probe.format.duration, "12.303000");
        assert_eq!(probe.format.probe_score, 100);
        assert_eq!(probe.format.tags.major_brand, "isom");
    }

    #[test]
    fn tolerates_unknown_fields_and_missing_optionals() {
        let raw = r#"{
            "streams": [
                {
                    "index": 0,
                    "codec_type": "audio",
                    "bit_rate": "96000",
                    "color_range": "tv",
                    "side_data_list": [{ "rotation": 90 }]
                }
            ],
            "format": {
                "duration": "3.5",
                "some_future_field": true
            }
        }"#;

        let probe = serde_json::from_str::<ProbeResult>(raw).unwrap();
        let stream = &probe.streams[0];

        assert_eq!(stream.codec_name, "");
        assert_eq!(stream.width, 0);
        assert_eq!(stream.channels, 0);
        assert_eq!(stream.disposition, Disposition::default());
        assert_eq!(stream.tags, StreamTags::default());
        assert_eq!(probe.format.filename, "");
        assert_eq!(probe.format.duration, "3.5");
    }

    #[test]
    fn unrecognized_codec_types_pass_through() {
        let raw = r#"{
            "streams": [
                { "index": 0, "codec_type": "subtitle" },
                { "index": 1, "codec_type": "attachment" }
            ],
            "format": { "duration": "1" }
        }"#;

        let probe = serde_json::from_str::<ProbeResult>(raw).unwrap();

        assert_eq!(probe.streams[0].codec_type, CodecType::Other(String::from("subtitle")));
        assert_eq!(probe.streams[1].codec_type, CodecType::Other(String::from("attachment")));

        let round_trip = serde_json::to_string(&probe.streams[0]).unwrap();
        assert!(round_trip.contains(r#""codec_type":"subtitle""#));
    }

    #[test]
    fn stream_filters_preserve_order() {
        let streams = vec![
            Stream { index: 0, codec_type: CodecType::Video, codec_name: String::from("h264"), ..Default::default() },
            Stream { index: 1, codec_type: CodecType::Other(String::from("subtitle")), ..Default::default() },
            Stream { index: 2, codec_type: CodecType::Audio, codec_name: String::from("aac"), ..Default::default() },
            Stream { index: 3, codec_type: CodecType::Video, codec_name: String::from("av1"), ..Default::default() }
        ];

        let probe = ProbeResult { streams, format: Format::default() };

        let video: Vec<u64> = probe.video_streams().iter().map(| s | s.index).collect();
        let audio: Vec<u64> = probe.audio_streams().iter().map(| s | s.index).collect();

        assert_eq!(video, vec![0, 3]);
        assert_eq!(audio, vec![2]);
    }
}
