//! Audio Context - Value Objects

use serde::{Deserialize, Serialize};

/// 音频格式
///
/// 同时覆盖 TTS 输出格式（wav/mp3/ogg/aac/pcm）与上传样本格式（flac/m4a）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
    Ogg,
    Aac,
    Pcm,
    Flac,
    M4a,
}

impl AudioFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "wav" => Some(Self::Wav),
            "mp3" => Some(Self::Mp3),
            "ogg" => Some(Self::Ogg),
            "aac" => Some(Self::Aac),
            "pcm" => Some(Self::Pcm),
            "flac" => Some(Self::Flac),
            "m4a" => Some(Self::M4a),
            _ => None,
        }
    }

    /// 从 MIME 类型推断格式，忽略 `;codecs=...` 之类的参数
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim().to_lowercase();
        match essence.as_str() {
            "audio/wav" | "audio/x-wav" | "audio/wave" => Some(Self::Wav),
            "audio/mpeg" | "audio/mp3" => Some(Self::Mp3),
            "audio/ogg" => Some(Self::Ogg),
            "audio/aac" => Some(Self::Aac),
            "audio/pcm" | "audio/l16" => Some(Self::Pcm),
            "audio/flac" | "audio/x-flac" => Some(Self::Flac),
            "audio/m4a" | "audio/x-m4a" | "audio/mp4" => Some(Self::M4a),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Aac => "aac",
            Self::Pcm => "pcm",
            Self::Flac => "flac",
            Self::M4a => "m4a",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::Ogg => "audio/ogg",
            Self::Aac => "audio/aac",
            Self::Pcm => "audio/pcm",
            Self::Flac => "audio/flac",
            Self::M4a => "audio/m4a",
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.extension()
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 根据文件名扩展名推断 MIME 类型，无法识别时回退为 `audio/mpeg`
pub fn mime_type_for_filename(filename: &str) -> &'static str {
    filename
        .rsplit_once('.')
        .and_then(|(_, ext)| AudioFormat::from_extension(ext))
        .map(|format| format.mime_type())
        .unwrap_or("audio/mpeg")
}

/// 内存中的音频文件（上传文件、录音结果或克隆样本）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFile {
    name: String,
    mime_type: String,
    data: Vec<u8>,
}

impl AudioFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// MIME 类型是否为 `audio/*`
    pub fn is_audio(&self) -> bool {
        self.mime_type.trim().to_lowercase().starts_with("audio/")
    }

    pub fn format(&self) -> Option<AudioFormat> {
        AudioFormat::from_mime_type(&self.mime_type)
    }

    /// 返回扩展名与 MIME 类型一致的文件名
    ///
    /// 只处理 wav/mp3/ogg/m4a/flac；主干取第一个 `.` 之前的部分
    pub fn normalized_name(&self) -> String {
        let format = match self.format() {
            Some(
                format @ (AudioFormat::Wav
                | AudioFormat::Mp3
                | AudioFormat::Ogg
                | AudioFormat::M4a
                | AudioFormat::Flac),
            ) => format,
            _ => return self.name.clone(),
        };

        let suffix = format!(".{}", format.extension());
        if self.name.ends_with(&suffix) {
            return self.name.clone();
        }

        let stem = self.name.split('.').next().unwrap_or_default();
        format!("{}{}", stem, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_parameters_are_ignored() {
        assert_eq!(
            AudioFormat::from_mime_type("audio/ogg; codecs=opus"),
            Some(AudioFormat::Ogg)
        );
        assert_eq!(AudioFormat::from_mime_type("video/mp4"), None);
    }

    #[test]
    fn test_normalized_name_fixes_extension() {
        let file = AudioFile::new("my.voice.webm", "audio/wav", vec![1]);
        assert_eq!(file.normalized_name(), "my.wav");

        let file = AudioFile::new("sample.mp3", "audio/mpeg", vec![1]);
        assert_eq!(file.normalized_name(), "sample.mp3");

        let file = AudioFile::new("clip", "audio/flac", vec![1]);
        assert_eq!(file.normalized_name(), "clip.flac");
    }

    #[test]
    fn test_normalized_name_leaves_unknown_types() {
        let file = AudioFile::new("clip.webm", "audio/webm", vec![1]);
        assert_eq!(file.normalized_name(), "clip.webm");
    }

    #[test]
    fn test_mime_type_for_filename() {
        assert_eq!(mime_type_for_filename("a.wav"), "audio/wav");
        assert_eq!(mime_type_for_filename("a.M4A"), "audio/m4a");
        assert_eq!(mime_type_for_filename("noext"), "audio/mpeg");
    }

    #[test]
    fn test_is_audio() {
        assert!(AudioFile::new("a", "Audio/WAV", vec![]).is_audio());
        assert!(!AudioFile::new("a", "image/png", vec![1]).is_audio());
    }
}
