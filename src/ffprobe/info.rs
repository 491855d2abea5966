use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;

use super::{probe_file, CodecType, ProbeResult};
use super::error::{ProbeError, WriteError};

// Bitrate sums are checked against i64::MAX, not the full range of the
// unsigned accumulator.
const SUM_LIMIT: u64 = i64::MAX as u64;

/// A probed file's raw streams plus the aggregates derived from them:
/// per-kind codec lists and bitrates, total bitrate, peak pixel count,
/// rounded duration and a one-line description of the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    probe_result: ProbeResult,
    video_formats: Vec<String>,
    video_bitrates: Vec<u64>,
    audio_formats: Vec<String>,
    audio_bitrates: Vec<u64>,
    bitrate: u64,
    duration: i64,
    filename: String,
    pixels: u64,
    basename: String,
    at_time: i64,
    has_multiple_audio: bool,
    has_multiple_video: bool,
    simple_description: String,
    video_format: String,
    audio_format: String,
    video_bitrate: u64,
    audio_bitrate: u64
}

impl VideoInfo {
    /// Probes the file with ffprobe and summarizes the result.
    pub fn new(filename: &str) -> Result<VideoInfo, ProbeError> {
        let at_time = Utc::now().timestamp();
        let probe = probe_file(Path::new(filename))?;

        VideoInfo::summarize(filename, probe, at_time)
    }

    /// Summarizes an already-obtained probe result, skipping the subprocess.
    pub fn from_probe(filename: &str, probe: ProbeResult) -> Result<VideoInfo, ProbeError> {
        VideoInfo::summarize(filename, probe, Utc::now().timestamp())
    }

    fn summarize(filename: &str, probe: ProbeResult, at_time: i64) -> Result<VideoInfo, ProbeError> {
        let basename = basename_of(filename);
        let duration = ceil_seconds(&probe.format.duration)?;

        let mut video_formats = Vec::new();
        let mut video_bitrates = Vec::new();
        let mut audio_formats = Vec::new();
        let mut audio_bitrates = Vec::new();
        let mut bitrate = 0;

        for stream in &probe.streams {
            match &stream.codec_type {
                CodecType::Video => {
                    let rate = parse_bitrate(&stream.bit_rate)?;

                    bitrate = add_bitrate(bitrate, rate)?;
                    video_bitrates.push(rate);
                    video_formats.push(stream.codec_name.clone());
                }
                CodecType::Audio => {
                    let rate = parse_bitrate(&stream.bit_rate)?;

                    bitrate = add_bitrate(bitrate, rate)?;
                    audio_bitrates.push(rate);
                    audio_formats.push(stream.codec_name.clone());
                }

                CodecType::Other(_) => {}
            }
        }

        let pixels = probe.streams.iter()
            .filter(| s | matches!(s.codec_type, CodecType::Video))
            .map(| s | s.width * s.height)
            .max()
            .unwrap_or(0)
        ;

        let has_multiple_audio = audio_bitrates.len() > 1;
        let has_multiple_video = video_bitrates.len() > 1;

        let video_bitrate = sum_bitrates(&video_bitrates)?;
        let audio_bitrate = sum_bitrates(&audio_bitrates)?;
        let video_format = video_formats.join("+");
        let audio_format = audio_formats.join("+");
        let simple_description = format!("{video_format}@{video_bitrate}/{audio_format}@{audio_bitrate}");

        debug!("Summarized {basename}: {simple_description}, {duration}s, {pixels} pixels");

        Ok(
            VideoInfo {
                probe_result: probe,
                video_formats,
                video_bitrates,
                audio_formats,
                audio_bitrates,
                bitrate,
                duration,
                filename: filename.to_string(),
                pixels,
                basename,
                at_time,
                has_multiple_audio,
                has_multiple_video,
                simple_description,
                video_format,
                audio_format,
                video_bitrate,
                audio_bitrate
            }
        )
    }

    /// Writes the summary as pretty-printed JSON, creating or truncating
    /// the file with the given mode bits.
    pub fn write_json_file<P: AsRef<Path>>(&self, path: P, mode: u32) -> Result<(), WriteError> {
        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(b" ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);

        self.serialize(&mut serializer).map_err(WriteError::SerializeError)?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        let mut file = options.open(path).map_err(WriteError::IoError)?;
        file.write_all(buffer.as_slice()).map_err(WriteError::IoError)
    }

    pub fn probe_result(&self) -> &ProbeResult {
        &self.probe_result
    }

    pub fn video_formats(&self) -> &[String] {
        self.video_formats.as_slice()
    }

    pub fn video_bitrates(&self) -> &[u64] {
        self.video_bitrates.as_slice()
    }

    pub fn audio_formats(&self) -> &[String] {
        self.audio_formats.as_slice()
    }

    pub fn audio_bitrates(&self) -> &[u64] {
        self.audio_bitrates.as_slice()
    }

    pub fn bitrate(&self) -> u64 {
        self.bitrate
    }

    pub fn duration(&self) -> i64 {
        self.duration
    }

    pub fn filename(&self) -> &str {
        self.filename.as_str()
    }

    pub fn pixels(&self) -> u64 {
        self.pixels
    }

    pub fn basename(&self) -> &str {
        self.basename.as_str()
    }

    pub fn at_time(&self) -> i64 {
        self.at_time
    }

    pub fn has_multiple_audio(&self) -> bool {
        self.has_multiple_audio
    }

    pub fn has_multiple_video(&self) -> bool {
        self.has_multiple_video
    }

    pub fn simple_description(&self) -> &str {
        self.simple_description.as_str()
    }

    pub fn video_format(&self) -> &str {
        self.video_format.as_str()
    }

    pub fn audio_format(&self) -> &str {
        self.audio_format.as_str()
    }

    pub fn video_bitrate(&self) -> u64 {
        self.video_bitrate
    }

    pub fn audio_bitrate(&self) -> u64 {
        self.audio_bitrate
    }
}

fn basename_of(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .map(| name | name.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string())
}

fn ceil_seconds(raw: &str) -> Result<i64, ProbeError> {
    let seconds = raw.parse::<f64>().map_err(|_| ProbeError::NumParseError(raw.to_string()))?;

    Ok(seconds.ceil() as i64)
}

fn parse_bitrate(raw: &str) -> Result<u64, ProbeError> {
    raw.parse::<u64>().map_err(|_| ProbeError::NumParseError(raw.to_string()))
}

fn add_bitrate(total: u64, rate: u64) -> Result<u64, ProbeError> {
    if rate > SUM_LIMIT - total {
        return Err(ProbeError::BitrateOverflow);
    }

    Ok(total + rate)
}

fn sum_bitrates(rates: &[u64]) -> Result<u64, ProbeError> {
    let mut total = 0;

    for rate in rates {
        total = add_bitrate(total, *rate)?;
    }

    Ok(total)
}
