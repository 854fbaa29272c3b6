use super::JudgeError;

/// A language the sandbox can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    /// Canonical name stored on submissions.
    pub name: &'static str,
    /// Sandbox language id.
    pub judge_id: u32,
}

/// (accepted spellings, canonical name, sandbox id)
const LANGUAGES: &[(&[&str], &str, u32)] = &[
    (&["c"], "c", 50),
    (&["cpp", "c++", "cxx"], "cpp", 54),
    (&["csharp", "c#", "cs"], "csharp", 51),
    (&["go", "golang"], "go", 60),
    (&["java"], "java", 62),
    (&["javascript", "js", "node", "nodejs"], "javascript", 63),
    (&["kotlin", "kt"], "kotlin", 78),
    (&["python", "python3", "py"], "python", 71),
    (&["ruby", "rb"], "ruby", 72),
    (&["rust", "rs"], "rust", 73),
    (&["typescript", "ts"], "typescript", 74),
];

/// Resolve a user-supplied language name, accepting common aliases.
pub fn resolve_language(name: &str) -> Result<Language, JudgeError> {
    let needle = name.trim().to_ascii_lowercase();
    LANGUAGES
        .iter()
        .find(|(aliases, _, _)| aliases.contains(&needle.as_str()))
        .map(|&(_, name, judge_id)| Language { name, judge_id })
        .ok_or_else(|| JudgeError::UnknownLanguage(name.trim().to_string()))
}
