//! Canonical WAV Encoder - 基于 symphonia 的录音规范化
//!
//! 流程：
//! 1. symphonia 探测并解码任意容器为交错 f32 PCM
//! 2. 各声道取平均下混为单声道
//! 3. 线性插值重采样到 16 kHz
//! 4. 硬截断到 8 秒
//! 5. 写出 44 字节头的 PCM16 单声道 WAV

use async_trait::async_trait;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::{
    container_format, AudioClip, AudioEncoderPort, AudioInfo, EncodeError, EncodedAudio,
    MAX_DURATION_SECS, MAX_ENCODED_SAMPLES, TARGET_SAMPLE_RATE, WAV_HEADER_LEN,
};

/// 默认输入大小上限：10 MB
pub const DEFAULT_MAX_INPUT_BYTES: usize = 10 * 1024 * 1024;

/// 规范 WAV 编码器
pub struct SymphoniaWavEncoder {
    /// 输入大小上限（字节）
    max_input_bytes: usize,
}

impl SymphoniaWavEncoder {
    pub fn new(max_input_bytes: usize) -> Self {
        Self { max_input_bytes }
    }

    /// 同步执行完整流程（在阻塞线程池中调用）
    pub fn encode_blocking(&self, clip: &AudioClip) -> Result<EncodedAudio, EncodeError> {
        if clip.bytes.is_empty() {
            return Err(EncodeError::InvalidInput("Empty audio".to_string()));
        }
        if clip.bytes.len() > self.max_input_bytes {
            return Err(EncodeError::TooLarge {
                size: clip.bytes.len(),
                limit: self.max_input_bytes,
            });
        }

        let decoded = decode_to_pcm(&clip.bytes, &clip.mime_type)?;
        let mono = downmix_to_mono(&decoded.samples, decoded.channels as usize);
        let mut resampled = resample_linear(&mono, decoded.sample_rate, TARGET_SAMPLE_RATE);
        truncate_samples(&mut resampled, MAX_ENCODED_SAMPLES);
        let wav = write_canonical_wav(&resampled);

        tracing::debug!(
            mime_type = %clip.mime_type,
            input_size = clip.bytes.len(),
            source_sample_rate = decoded.sample_rate,
            source_channels = decoded.channels,
            output_samples = resampled.len(),
            "Encoded canonical WAV"
        );

        Ok(EncodedAudio {
            wav,
            num_samples: resampled.len(),
            source_sample_rate: decoded.sample_rate,
            source_channels: decoded.channels,
        })
    }
}

impl Default for SymphoniaWavEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INPUT_BYTES)
    }
}

#[derive(Debug)]
struct DecodedAudio {
    /// 交错 f32 样本
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

/// MIME 到扩展名的提示，帮助 symphonia 探测
fn extension_hint(mime_type: &str) -> Option<&'static str> {
    match container_format(mime_type).as_str() {
        "wav" => Some("wav"),
        "mp3" => Some("mp3"),
        "mp4" | "m4a" | "aac" => Some("m4a"),
        "ogg" => Some("ogg"),
        "webm" => Some("webm"),
        "flac" => Some("flac"),
        _ => None,
    }
}

/// 使用 symphonia 解码为交错 f32 PCM
fn decode_to_pcm(data: &[u8], mime_type: &str) -> Result<DecodedAudio, EncodeError> {
    let cursor = Cursor::new(data.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension_hint(mime_type) {
        hint.with_extension(ext);
    }
    hint.mime_type(mime_type.split(';').next().unwrap_or(mime_type).trim());

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| EncodeError::DecodeError(format!("Probe failed: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| EncodeError::DecodeError("No audio track found".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| EncodeError::DecodeError(format!("Decoder creation failed: {}", e)))?;

    let track_id = track.id;
    // 容器声明的参数只用于日志；HE-AAC 的容器可能报半采样率或单声道，
    // 以解码器实际输出为准
    let declared_rate = track.codec_params.sample_rate;
    let declared_channels = track.codec_params.channels.map(|c| c.count());
    let mut sample_rate: Option<u32> = None;
    let mut channels: Option<usize> = None;
    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(symphonia::core::errors::Error::ResetRequired) => break,
            Err(e) => {
                return Err(EncodeError::DecodeError(format!("Packet read error: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("Decode error (skipping packet): {}", e);
                continue;
            }
        };

        let spec = *decoded.spec();
        let buffer_channels = spec.channels.count();
        if spec.rate == 0 || buffer_channels == 0 {
            continue;
        }
        let rate = *sample_rate.get_or_insert(spec.rate);
        let stride = *channels.get_or_insert(buffer_channels);
        if rate != spec.rate || stride != buffer_channels {
            tracing::warn!(
                rate = spec.rate,
                channels = buffer_channels,
                "Signal spec changed mid-stream, skipping buffer"
            );
            continue;
        }

        let num_frames = decoded.frames();
        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        let actual_samples = num_frames * buffer_channels;
        samples.extend(&sample_buf.samples()[..actual_samples]);

        // 超过 8 秒的部分会被截掉，不再继续解码
        if samples.len() / stride >= max_source_frames(rate) {
            break;
        }
    }

    let (sample_rate, channels) = match (sample_rate, channels) {
        (Some(rate), Some(channels)) => (rate, channels as u16),
        _ => {
            return Err(EncodeError::DecodeError(format!(
                "No decodable audio (declared rate {:?}, channels {:?})",
                declared_rate, declared_channels
            )))
        }
    };
    if declared_rate.is_some_and(|r| r != sample_rate)
        || declared_channels.is_some_and(|c| c != channels as usize)
    {
        tracing::debug!(
            declared_rate = ?declared_rate,
            declared_channels = ?declared_channels,
            sample_rate,
            channels,
            "Decoded signal differs from container parameters"
        );
    }

    if samples.is_empty() {
        return Err(EncodeError::DecodeError("No audio samples decoded".to_string()));
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

/// 截断前需要的源帧数
fn max_source_frames(sample_rate: u32) -> usize {
    sample_rate as usize * MAX_DURATION_SECS as usize
}

/// 各声道逐样本取平均
pub fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// 单声道线性插值重采样
///
/// 输出第 i 个样本取源位置 `i / (to_rate / from_rate)`，在两侧源样本间插值，越界时钳到末尾
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let last = samples.len() - 1;
    let new_len = (samples.len() as u64 * to_rate as u64 / from_rate as u64) as usize;

    (0..new_len)
        .map(|i| {
            let src_pos = i as f64 / ratio;
            let idx0 = (src_pos as usize).min(last);
            let idx1 = (idx0 + 1).min(last);
            let frac = (src_pos - idx0 as f64) as f32;
            let s0 = samples[idx0];
            let s1 = samples[idx1];
            s0 + (s1 - s0) * frac
        })
        .collect()
}

/// 硬截断，不做拉伸
pub fn truncate_samples(samples: &mut Vec<f32>, max_samples: usize) {
    samples.truncate(max_samples);
}

/// f32 [-1, 1] 转 i16：负值乘 0x8000，正值乘 0x7fff
#[inline]
fn to_pcm16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// 写出规范 WAV：PCM、单声道、16 kHz、16 位
pub fn write_canonical_wav(samples: &[f32]) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let num_channels: u16 = 1;
    let sample_rate = TARGET_SAMPLE_RATE;
    let block_align = num_channels * (bits_per_sample / 8);
    let byte_rate = sample_rate * block_align as u32;

    let data_size = samples.len() * 2;
    let file_size = 36 + data_size;

    let mut wav = Vec::with_capacity(WAV_HEADER_LEN + data_size);

    // RIFF header
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(file_size as u32).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    // fmt chunk
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&num_channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&(data_size as u32).to_le_bytes());

    for &sample in samples {
        wav.extend_from_slice(&to_pcm16(sample).to_le_bytes());
    }

    wav
}

#[derive(Debug)]
struct FmtChunk {
    num_channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

/// 解析 WAV 头，返回 fmt 信息与 data chunk 大小
fn parse_wav_header(data: &[u8]) -> Result<(FmtChunk, usize), EncodeError> {
    if data.len() < WAV_HEADER_LEN {
        return Err(EncodeError::InvalidInput("WAV data too short".to_string()));
    }
    if &data[0..4] != b"RIFF" {
        return Err(EncodeError::InvalidInput(
            "Invalid WAV: missing RIFF header".to_string(),
        ));
    }
    if &data[8..12] != b"WAVE" {
        return Err(EncodeError::InvalidInput(
            "Invalid WAV: missing WAVE identifier".to_string(),
        ));
    }

    let read_u16 = |at: usize| u16::from_le_bytes([data[at], data[at + 1]]);
    let read_u32 =
        |at: usize| u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);

    let mut pos = 12;
    let mut fmt_chunk: Option<FmtChunk> = None;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size = read_u32(pos + 4) as usize;

        match chunk_id {
            b"fmt " => {
                if chunk_size < 16 || pos + 8 + 16 > data.len() {
                    return Err(EncodeError::InvalidInput(
                        "Invalid fmt chunk size".to_string(),
                    ));
                }
                let base = pos + 8;
                fmt_chunk = Some(FmtChunk {
                    num_channels: read_u16(base + 2),
                    sample_rate: read_u32(base + 4),
                    bits_per_sample: read_u16(base + 14),
                });
            }
            b"data" => {
                let fmt = fmt_chunk.ok_or_else(|| {
                    EncodeError::InvalidInput("Invalid WAV: missing fmt chunk".to_string())
                })?;
                return Ok((fmt, chunk_size));
            }
            _ => {}
        }

        pos += 8 + chunk_size;
        // 对齐到偶数字节
        if chunk_size % 2 != 0 {
            pos += 1;
        }
    }

    Err(EncodeError::InvalidInput(
        "Invalid WAV: missing data chunk".to_string(),
    ))
}

#[async_trait]
impl AudioEncoderPort for SymphoniaWavEncoder {
    async fn encode(&self, clip: &AudioClip) -> Result<EncodedAudio, EncodeError> {
        let clip = clip.clone();
        let encoder = SymphoniaWavEncoder::new(self.max_input_bytes);
        tokio::task::spawn_blocking(move || encoder.encode_blocking(&clip))
            .await
            .map_err(|e| EncodeError::EncodingError(format!("Encoder task failed: {}", e)))?
    }

    fn get_audio_info(&self, wav_data: &[u8]) -> Result<AudioInfo, EncodeError> {
        let (fmt, data_size) = parse_wav_header(wav_data)?;

        let samples_per_channel = if fmt.bits_per_sample > 0 && fmt.num_channels > 0 {
            data_size / (fmt.bits_per_sample as usize / 8).max(1) / fmt.num_channels as usize
        } else {
            0
        };

        let duration_ms = if fmt.sample_rate > 0 {
            (samples_per_channel as u64 * 1000) / fmt.sample_rate as u64
        } else {
            0
        };

        Ok(AudioInfo {
            duration_ms,
            sample_rate: fmt.sample_rate,
            channels: fmt.num_channels,
            bits_per_sample: fmt.bits_per_sample,
            data_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 生成 PCM16 WAV：每个声道一段正弦波
    fn create_test_wav(sample_rate: u32, num_channels: u16, seconds: f32) -> Vec<u8> {
        let bits_per_sample: u16 = 16;
        let frames = (sample_rate as f32 * seconds) as usize;
        let data_size = frames * num_channels as usize * 2;

        let mut wav = Vec::with_capacity(44 + data_size);
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&((36 + data_size) as u32).to_le_bytes());
        wav.extend_from_slice(b"WAVE");
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&num_channels.to_le_bytes());
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        let block_align = num_channels * (bits_per_sample / 8);
        wav.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        wav.extend_from_slice(&block_align.to_le_bytes());
        wav.extend_from_slice(&bits_per_sample.to_le_bytes());
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&(data_size as u32).to_le_bytes());

        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            for ch in 0..num_channels {
                let freq = 220.0 * (ch as f32 + 1.0);
                let v = (t * freq * std::f32::consts::TAU).sin() * 0.5;
                wav.extend_from_slice(&((v * 32767.0) as i16).to_le_bytes());
            }
        }
        wav
    }

    fn header_u16(wav: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([wav[at], wav[at + 1]])
    }

    fn header_u32(wav: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([wav[at], wav[at + 1], wav[at + 2], wav[at + 3]])
    }

    #[test]
    fn test_long_stereo_recording_is_clipped() {
        let encoder = SymphoniaWavEncoder::default();
        let clip = AudioClip::new(create_test_wav(44_100, 2, 12.0), "audio/wav");

        let encoded = encoder.encode_blocking(&clip).unwrap();
        assert_eq!(encoded.num_samples, 8 * 16_000);
        assert_eq!(encoded.wav.len(), 44 + 128_000 * 2);
        assert_eq!(encoded.source_channels, 2);
        assert_eq!(encoded.source_sample_rate, 44_100);
        assert_eq!(encoded.duration_ms(), 8000);

        let wav = &encoded.wav;
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(header_u32(wav, 4) as usize, 36 + 128_000 * 2);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(header_u32(wav, 16), 16);
        assert_eq!(header_u16(wav, 20), 1);
        assert_eq!(header_u16(wav, 22), 1);
        assert_eq!(header_u32(wav, 24), 16_000);
        assert_eq!(header_u32(wav, 28), 32_000);
        assert_eq!(header_u16(wav, 32), 2);
        assert_eq!(header_u16(wav, 34), 16);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(header_u32(wav, 40) as usize, 128_000 * 2);
    }

    #[test]
    fn test_decoding_stops_after_max_duration() {
        let wav = create_test_wav(44_100, 2, 12.0);
        let decoded = decode_to_pcm(&wav, "audio/wav").unwrap();
        assert_eq!(decoded.sample_rate, 44_100);
        assert_eq!(decoded.channels, 2);

        let frames = decoded.samples.len() / 2;
        assert!(frames >= max_source_frames(44_100));
        assert!(frames < 9 * 44_100);
    }

    #[test]
    fn test_any_rate_and_channels_yield_canonical_header() {
        let encoder = SymphoniaWavEncoder::default();
        for (rate, channels) in [(8_000, 1), (22_050, 2), (48_000, 1), (16_000, 4)] {
            let clip = AudioClip::new(create_test_wav(rate, channels, 0.5), "audio/wav");
            let encoded = encoder.encode_blocking(&clip).unwrap();
            let info = encoder.get_audio_info(&encoded.wav).unwrap();
            assert_eq!(info.sample_rate, 16_000);
            assert_eq!(info.channels, 1);
            assert_eq!(info.bits_per_sample, 16);
            assert_eq!(encoded.num_samples, 8_000);
        }
    }

    #[test]
    fn test_undecodable_input_is_decode_error() {
        let encoder = SymphoniaWavEncoder::default();
        let clip = AudioClip::new(vec![0x13; 4096], "audio/webm;codecs=opus");
        let err = encoder.encode_blocking(&clip).unwrap_err();
        assert!(matches!(err, EncodeError::DecodeError(_)));
    }

    #[test]
    fn test_input_limits() {
        let encoder = SymphoniaWavEncoder::new(16);
        let err = encoder
            .encode_blocking(&AudioClip::new(vec![0; 32], "audio/wav"))
            .unwrap_err();
        assert!(matches!(err, EncodeError::TooLarge { size: 32, limit: 16 }));

        let err = encoder
            .encode_blocking(&AudioClip::new(Vec::new(), "audio/wav"))
            .unwrap_err();
        assert!(matches!(err, EncodeError::InvalidInput(_)));
    }

    #[test]
    fn test_downmix_averages_channels() {
        let mono = downmix_to_mono(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2);
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
        assert_eq!(downmix_to_mono(&[0.1, 0.2], 1), vec![0.1, 0.2]);
    }

    #[test]
    fn test_resample_linear_interpolates() {
        // 8k -> 16k: 每两个输出样本间插入中点
        let out = resample_linear(&[0.0, 1.0, 0.0], 8_000, 16_000);
        assert_eq!(out.len(), 6);
        assert_eq!(out[0], 0.0);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert_eq!(out[2], 1.0);
        // 末尾钳住最后一个样本
        assert_eq!(out[5], 0.0);

        let flat = resample_linear(&[0.25; 441], 44_100, 16_000);
        assert_eq!(flat.len(), 160);
        assert!(flat.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_pcm16_scaling() {
        assert_eq!(to_pcm16(-1.0), i16::MIN);
        assert_eq!(to_pcm16(1.0), i16::MAX);
        assert_eq!(to_pcm16(2.0), i16::MAX);
        assert_eq!(to_pcm16(0.0), 0);
    }

    #[test]
    fn test_audio_info_rejects_garbage() {
        let encoder = SymphoniaWavEncoder::default();
        assert!(encoder.get_audio_info(b"not a wav").is_err());
        let mut wav = write_canonical_wav(&[0.0; 10]);
        wav[0] = b'X';
        assert!(encoder.get_audio_info(&wav).is_err());
    }

    #[tokio::test]
    async fn test_async_encode() {
        let encoder = SymphoniaWavEncoder::default();
        let clip = AudioClip::new(create_test_wav(16_000, 1, 1.0), "audio/wav");
        let encoded = encoder.encode(&clip).await.unwrap();
        assert_eq!(encoded.num_samples, 16_000);
        assert_eq!(encoded.mime_type(), "audio/wav");
    }
}
