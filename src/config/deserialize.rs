// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles template file lists given as plain paths or detailed entries.

use nonempty::NonEmpty;
use serde::Deserialize;

use super::TemplateFile;

pub fn deserialize_template_files<'de, D>(deserializer: D) -> Result<NonEmpty<TemplateFile>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<TemplateFileEntry> = Vec::deserialize(deserializer)?;
    let files = values
        .into_iter()
        .map(TemplateFileEntry::into_template_file)
        .collect::<Result<Vec<_>, _>>()
        .map_err(serde::de::Error::custom)?;

    NonEmpty::from_vec(files)
        .ok_or_else(|| serde::de::Error::custom("at least one template file is required"))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TemplateFileEntry {
    Simple(String),
    Detailed(TemplateFile),
}

impl TemplateFileEntry {
    fn into_template_file(self) -> Result<TemplateFile, String> {
        let file = match self {
            TemplateFileEntry::Simple(path) => TemplateFile::new(path, false),
            TemplateFileEntry::Detailed(file) => file,
        };

        let path = std::path::Path::new(&file.path);
        if file.path.trim().is_empty() {
            return Err("template file path cannot be empty".to_string());
        }
        if path.is_absolute() || path.components().any(|c| c.as_os_str() == "..") {
            return Err(format!(
                "template file path must stay inside the repository: {}",
                file.path
            ));
        }

        Ok(file)
    }
}
