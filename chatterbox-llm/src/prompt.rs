use std::{fs, path::Path};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// System prompt from `SYSTEM_PROMPT.md` in the working directory, if non-empty.
pub fn system_prompt() -> String {
    load_system_prompt(Path::new("SYSTEM_PROMPT.md"))
}

fn load_system_prompt(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_owned(),
        _ => DEFAULT_SYSTEM_PROMPT.to_owned(),
    }
}
