//! Voice Context - Aggregate Root

use serde::{Deserialize, Serialize};

use super::{Gender, VoiceModel};

/// 个人（克隆）音色的类型标记
pub const PERSONAL_VOICE_TYPE: &str = "personal";

/// Voice 聚合根
///
/// 不变量:
/// - 由远端 API 提供，获取后不可变
/// - 以 `id` 唯一标识
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    pub display_name: String,
    pub gender: Gender,
    #[serde(default)]
    pub locale: String,
    #[serde(rename = "type")]
    pub voice_type: String,
    #[serde(default)]
    pub models: Vec<VoiceModel>,
    #[serde(default)]
    pub avatar_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// 克隆音色接口的响应与音色列表条目结构相同
pub type VoiceCloneResult = Voice;

impl Voice {
    pub fn is_personal(&self) -> bool {
        self.voice_type == PERSONAL_VOICE_TYPE
    }

    /// 下拉框中的展示文本，例如 `Ada (female)`
    pub fn label(&self) -> String {
        format!("{} ({})", self.display_name, self.gender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_api_voice() {
        let json = r#"{
            "id": "v123",
            "display_name": "Ada",
            "gender": "female",
            "locale": "en-US",
            "type": "personal",
            "models": [{"name": "simba-english", "languages": [{"locale": "en-US"}]}],
            "avatar_image": null,
            "tags": ["timbre:deep"]
        }"#;

        let voice: Voice = serde_json::from_str(json).unwrap();
        assert_eq!(voice.id, "v123");
        assert_eq!(voice.gender, Gender::Female);
        assert!(voice.is_personal());
        assert_eq!(voice.models[0].languages[0].locale, "en-US");
        assert_eq!(voice.label(), "Ada (female)");
    }

    #[test]
    fn test_unknown_gender_does_not_fail() {
        let json = r#"{"id":"x","display_name":"X","gender":"notSpecified","type":"shared"}"#;
        let voice: Voice = serde_json::from_str(json).unwrap();
        assert_eq!(voice.gender, Gender::Unknown);
        assert!(!voice.is_personal());
    }

    #[test]
    fn test_clone_response_with_opaque_languages() {
        let json = r#"{
            "id": "c1", "display_name": "Me", "gender": "male", "locale": "en-US",
            "type": "personal", "avatar_image": "https://img",
            "models": [{"name": "simba-multilingual", "languages": [{}]}]
        }"#;
        let result: VoiceCloneResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.models[0].languages[0].locale, "");
    }
}
