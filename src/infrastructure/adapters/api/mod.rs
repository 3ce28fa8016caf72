//! API Adapters - 远端语音 API 客户端

mod client;
mod speech_api;

pub use client::{
    ApiBody, ApiClient, ApiClientConfig, ApiKeyResolver, ApiRequest, DEFAULT_BASE_URL,
};
pub use speech_api::{clone_voice_form, HttpSpeechApi};
