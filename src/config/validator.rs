//! Config validation and the catalog of selectable values.

use crate::error::ConfigError;
use crate::models::Configuration;
use once_cell::sync::Lazy;

/// Target ABIs the NDK toolchain can build for.
pub const SUPPORTED_ARCHITECTURES: [&str; 4] = ["arm64-v8a", "armeabi-v7a", "x86", "x86_64"];

/// Lowest Android API level accepted by the build scripts.
pub const MIN_API_LEVEL: u32 = 16;

/// API levels offered by the API selector.
pub const API_LEVELS: [u32; 9] = [16, 19, 21, 23, 24, 26, 28, 29, 30];

/// Selectable values for one multi-select domain, grouped for display.
#[derive(Debug, Clone)]
pub struct OptionGroup {
    pub title: &'static str,
    pub items: Vec<&'static str>,
}

/// Selectable values per domain, keyed by the configuration field name.
pub static OPTION_CATALOG: Lazy<Vec<(&'static str, Vec<OptionGroup>)>> = Lazy::new(|| {
    vec![
        (
            "architectures",
            vec![OptionGroup {
                title: "目标架构",
                items: SUPPORTED_ARCHITECTURES.to_vec(),
            }],
        ),
        (
            "decoders",
            vec![
                OptionGroup {
                    title: "视频解码器",
                    items: vec!["h264", "hevc", "vp8", "vp9", "av1", "mpeg4", "mjpeg", "flv"],
                },
                OptionGroup {
                    title: "音频解码器",
                    items: vec!["aac", "mp3", "opus", "vorbis", "flac", "pcm_s16le", "amrnb"],
                },
            ],
        ),
        (
            "encoders",
            vec![
                OptionGroup {
                    title: "视频编码器",
                    items: vec!["libx264", "mpeg4", "mjpeg"],
                },
                OptionGroup {
                    title: "音频编码器",
                    items: vec!["aac", "libmp3lame", "opus", "pcm_s16le"],
                },
            ],
        ),
        (
            "muxers",
            vec![OptionGroup {
                title: "复用器",
                items: vec!["mp4", "m4a", "mov", "flv", "hls", "mpegts", "matroska", "webm", "mp3", "adts"],
            }],
        ),
        (
            "demuxers",
            vec![OptionGroup {
                title: "解复用器",
                items: vec!["mov", "mp4", "m4a", "flv", "hls", "mpegts", "matroska", "mp3", "aac", "wav", "rtsp"],
            }],
        ),
        (
            "protocols",
            vec![OptionGroup {
                title: "网络协议",
                items: vec!["file", "http", "https", "tcp", "udp", "rtmp", "rtp", "hls", "crypto"],
            }],
        ),
        (
            "filters",
            vec![OptionGroup {
                title: "滤镜",
                items: vec!["scale", "crop", "rotate", "transpose", "overlay", "volume", "aresample", "atempo"],
            }],
        ),
    ]
});

/// Option groups for a multi-select field, if it is one.
pub fn option_groups(field: &str) -> Option<&'static [OptionGroup]> {
    OPTION_CATALOG
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, groups)| groups.as_slice())
}

/// Validate architectures against the supported ABI list.
pub fn validate_architectures(architectures: &[String]) -> Result<(), ConfigError> {
    for arch in architectures {
        if !SUPPORTED_ARCHITECTURES.contains(&arch.as_str()) {
            return Err(ConfigError::ValidationFailed(format!("不支持的架构: {}", arch)));
        }
    }
    Ok(())
}

/// Validate the Android API level.
pub fn validate_api_level(api: u32) -> Result<(), ConfigError> {
    if api < MIN_API_LEVEL {
        return Err(ConfigError::ValidationFailed(format!(
            "API级别必须大于等于{}: {}",
            MIN_API_LEVEL, api
        )));
    }
    Ok(())
}

/// Validate value ranges of a whole configuration before it is submitted.
///
/// Non-empty selection checks are the wizard gates, not part of this.
pub fn validate_config(config: &Configuration) -> Result<(), ConfigError> {
    validate_architectures(&config.architectures)?;
    validate_api_level(config.api)?;
    Ok(())
}
