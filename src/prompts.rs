pub const MNEMONIC_SYSTEM: &str = include_str!("../data/prompts/mnemonic_system.txt");
pub const MNEMONIC_USER: &str = include_str!("../data/prompts/mnemonic_user.txt");
pub const TRANSLATE_SYSTEM: &str = include_str!("../data/prompts/translate_system.txt");
pub const IMAGE_PROMPT: &str = include_str!("../data/prompts/image_prompt.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.trim_end().to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

/// Instruction asking for three mnemonic candidates for `word`.
pub fn mnemonic_prompt(word: &str) -> String {
    render(MNEMONIC_USER, &[("word", word)])
}

/// Illustration prompt for an (English) scene description.
pub fn image_prompt(scene: &str) -> String {
    render(IMAGE_PROMPT, &[("scene", scene)])
}
