//! Constants for the workbench API

/// Default settings values
pub mod defaults {
    pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
    pub const GEMINI_API_VERSION: &str = "v1beta";
    pub const GEMINI_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
    pub const ANALYSIS_MODEL: &str = "gemini-2.5-flash";

    pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
    pub const OPENAI_MODEL: &str = "gpt-4o-mini";

    /// Minimum spacing between generation starts
    pub const MIN_GENERATION_INTERVAL_MS: u64 = 1000;
    /// Hard per-request timeout
    pub const REQUEST_TIMEOUT_SECS: u64 = 300;
}

/// Bounds and sizes
pub mod limits {
    pub const MIN_IMAGE_COUNT: u32 = 1;
    pub const MAX_IMAGE_COUNT: u32 = 8;
    /// Transport error messages are cut to this many characters
    pub const ERROR_MESSAGE_MAX_CHARS: usize = 300;
}

/// Provider endpoint conventions
pub mod endpoints {
    /// Host that takes the API key as a `key` query parameter
    pub const FIRST_PARTY_HOST: &str = "generativelanguage.googleapis.com";
    pub const GENERATE_CONTENT_METHOD: &str = "generateContent";
    pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";
}

/// Text sent to the model alongside user content
pub mod prompts {
    pub const REFERENCE_IMAGE_LEAD: &str = "Use this reference image:";
    pub const NEGATIVE_PROMPT_MARKER: &str = "Avoid the following in the image: ";
    pub const FALLBACK_INSTRUCTION: &str = "Generate an image.";

    pub const ANALYZE_PROMPT_INSTRUCTION: &str = "You are an assistant for image generation prompts. \
Analyze the prompt below and reply with a single JSON object with the keys \
\"subject\", \"style\", \"composition\", \"lighting\", \"issues\" (array of strings) \
and \"improvedPrompt\". Reply with JSON only.";

    pub const ANALYZE_IMAGE_INSTRUCTION: &str = "Describe the attached image for reuse as an \
image generation prompt. Reply with a single JSON object with the keys \"subject\", \
\"style\", \"composition\", \"lighting\", \"colors\" (array of strings) and \"prompt\". \
Reply with JSON only.";
}

/// User-facing copy
pub mod messages {
    pub const EMPTY_PROMPT: &str = "请输入提示词或添加参考图片";
    pub const MISSING_API_KEY: &str = "未配置 API Key";
    pub const MISSING_MODEL: &str = "未配置模型";
    pub const NO_IMAGES_RETURNED: &str = "本次请求未返回图片";
    pub const GENERATION_FAILED: &str = "图片生成失败";
    pub const IMAGE_OUTPUT_UNSUPPORTED: &str = "当前 API 格式不支持图片生成，请切换到 Gemini 格式";
    pub const EMPTY_CONVERSATION: &str = "对话内容不能为空";
    pub const EMPTY_ANALYSIS_PROMPT: &str = "请输入需要分析的提示词";
    pub const MISSING_ANALYSIS_IMAGE: &str = "请提供需要分析的图片";
    pub const REQUEST_TIMEOUT: &str = "请求超时，请稍后重试";
    pub const NETWORK_ERROR: &str = "网络请求失败";
    pub const MALFORMED_RESPONSE: &str = "服务返回了无法解析的内容";
}
