//! Voice Context - Value Objects

use serde::{Deserialize, Serialize};

/// 音色性别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    /// 远端返回了未知取值（例如 `notSpecified`）
    #[serde(other)]
    Unknown,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Gender {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            _ => Err("性别必须为 male 或 female"),
        }
    }
}

/// 模型支持的语言
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceLanguage {
    #[serde(default)]
    pub locale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_audio: Option<String>,
}

/// 音色可用的合成模型
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceModel {
    pub name: String,
    #[serde(default)]
    pub languages: Vec<VoiceLanguage>,
}

/// 克隆音色时随表单上传的头像图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarImage {
    name: String,
    mime_type: String,
    data: Vec<u8>,
}

impl AvatarImage {
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

    /// MIME 类型是否为 `image/*`
    pub fn is_image(&self) -> bool {
        self.mime_type.trim().to_lowercase().starts_with("image/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_mime_check() {
        assert!(AvatarImage::new("me.png", "image/png", vec![1]).is_image());
        assert!(AvatarImage::new("me.jpg", " Image/JPEG ", vec![1]).is_image());
        assert!(!AvatarImage::new("me.wav", "audio/wav", vec![1]).is_image());
    }
}
