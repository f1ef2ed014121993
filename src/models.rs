use serde::{Deserialize, Serialize};

/// Instruction text sent with every summarization request unless the user
/// has overridden it through settings.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a task-decomposition assistant. Turn the user's loose ideas, goals, \
or plans into a concrete list of tasks that can be done today.

Follow these rules strictly:

1. Output JSON only, with no explanatory text around it.
2. The JSON must be an array; each element describes one task.
3. Each task object must contain exactly these fields and no others:
   - \"text\": string, the concrete task description
   - \"done\": boolean, always false initially
   - \"pinned\": boolean, at most one task may be true
4. Tasks should be actionable, specific, and sized for a single day.
5. If the input is broad or abstract, break it into smaller tasks yourself.
6. If the tasks have a natural order, mark the first step as pinned = true.
7. Aim for 3 to 7 tasks.
8. Do not use numbering, emoji, or markdown syntax.
9. Start each description with a verb and avoid vague phrasing.";

pub const DEFAULT_API_BASE_URL: &str = "https://api.siliconflow.cn/v1";
pub const DEFAULT_MODEL: &str = "deepseek-ai/DeepSeek-V3.2";

/// One entry of a day's task list. Lists are handed between the store, the
/// controller, and the surfaces by value; order within a list is meaningful
/// (it is the storage position and the display tie-break).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub text: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub pinned: bool,
}

impl TaskRecord {
    /// Leading/trailing whitespace is stripped on ingestion.
    pub fn new(text: impl AsRef<str>) -> Self {
        Self {
            text: text.as_ref().trim().to_string(),
            done: false,
            pinned: false,
        }
    }

    pub fn with_flags(text: impl AsRef<str>, done: bool, pinned: bool) -> Self {
        Self {
            text: text.as_ref().trim().to_string(),
            done,
            pinned,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub api_base_url: String,
    pub model: String,
    pub system_prompt: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}
