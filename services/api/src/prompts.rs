use anyhow::{Context, Result, bail};
use classroom_core::content::PROMPT_KEYS;
use std::{collections::HashMap, fs, path::Path};

/// Loads every `*.md` file in `prompts_path`, keyed by file stem, and checks
/// that the content provider's templates are all present.
pub fn load_prompts(prompts_path: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    for entry in fs::read_dir(prompts_path)
        .with_context(|| format!("Could not read prompts directory {}", prompts_path.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)?;
            prompts.insert(prompt_key, content);
        }
    }
    let missing: Vec<&str> = PROMPT_KEYS
        .iter()
        .copied()
        .filter(|key| !prompts.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        bail!("Missing prompt templates: {}", missing.join(", "));
    }
    Ok(prompts)
}
