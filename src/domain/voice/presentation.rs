//! 音色列表展示规则

use super::Voice;

/// 非个人音色最多展示的数量
pub const MAX_SHARED_VOICES: usize = 5;

/// 过滤出用于展示的音色
///
/// 规则（固定业务规则，不可配置）:
/// - 所有 `personal` 音色
/// - 之后最多 5 个其他类型的音色
/// - 保持原始相对顺序
pub fn presentable_voices(voices: &[Voice]) -> Vec<Voice> {
    let personal = voices.iter().filter(|v| v.is_personal());
    let shared = voices
        .iter()
        .filter(|v| !v.is_personal())
        .take(MAX_SHARED_VOICES);

    personal.chain(shared).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::voice::Gender;

    fn voice(id: &str, voice_type: &str) -> Voice {
        Voice {
            id: id.to_string(),
            display_name: id.to_uppercase(),
            gender: Gender::Male,
            locale: "en-US".to_string(),
            voice_type: voice_type.to_string(),
            models: Vec::new(),
            avatar_image: None,
            preview_audio: None,
            tags: None,
        }
    }

    #[test]
    fn test_personal_first_then_five_others() {
        let mut voices = vec![voice("o0", "shared")];
        voices.push(voice("p1", "personal"));
        for i in 1..7 {
            voices.push(voice(&format!("o{}", i), "shared"));
        }
        voices.push(voice("p2", "personal"));

        let ids: Vec<String> = presentable_voices(&voices)
            .into_iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(ids, vec!["p1", "p2", "o0", "o1", "o2", "o3", "o4"]);
    }

    #[test]
    fn test_two_personal_seven_other() {
        let mut voices = vec![voice("p1", "personal"), voice("p2", "personal")];
        for i in 0..7 {
            voices.push(voice(&format!("o{}", i), "other"));
        }

        let result = presentable_voices(&voices);
        assert_eq!(result.len(), 7);
        assert!(result[..2].iter().all(Voice::is_personal));
        assert_eq!(result[2].id, "o0");
        assert_eq!(result[6].id, "o4");
    }

    #[test]
    fn test_empty_list() {
        assert!(presentable_voices(&[]).is_empty());
    }
}
