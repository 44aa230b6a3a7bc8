//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the scriptorium binary.

mod commands;
mod ideas;
mod languages;
mod write;

pub use commands::{Cli, Commands, IdeasArgs, WriteArgs};
pub use ideas::run_ideas;
pub use languages::list_languages;
pub use write::run_write;
pub(crate) use write::compose_story;

use scriptorium::{Language, LanguagePack, ScriptoriumResult};
use std::path::{Path, PathBuf};
use tracing::info;

/// Where a command's files go.
///
/// A path ending in `.txt` names the story file; the outline and proposals
/// then go to its directory instead of overwriting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OutputTarget {
    artifacts: PathBuf,
    story: PathBuf,
}

impl OutputTarget {
    pub(crate) fn new(path: PathBuf) -> Self {
        let is_file = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
        if !is_file {
            return Self {
                artifacts: path.clone(),
                story: path,
            };
        }
        let artifacts = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            artifacts,
            story: path,
        }
    }

    /// Directory for outlines and proposals.
    pub(crate) fn artifacts(&self) -> &Path {
        &self.artifacts
    }

    /// Directory or exact file for the story.
    pub(crate) fn story(&self) -> &Path {
        &self.story
    }
}

/// The language pack for a `--language`/`--language-pack` pair.
///
/// A custom pack file wins; otherwise the bundled pack for the requested
/// language, or for the default language when none is given.
pub(crate) fn resolve_pack(
    language: Option<&str>,
    pack_file: Option<&Path>,
) -> ScriptoriumResult<LanguagePack> {
    let pack = match (pack_file, language) {
        (Some(path), _) => LanguagePack::from_file(path)?,
        (None, Some(code)) => LanguagePack::for_code(code)?,
        (None, None) => LanguagePack::bundled(Language::default())?,
    };
    info!(language = %pack.language(), pack = pack.name(), "Language pack loaded");
    Ok(pack)
}

/// Save `text` under `directory`, or print it.
///
/// A failed save is logged and the text printed instead, so nothing generated
/// is lost.
pub(crate) fn deliver(text: &str, name: &str, directory: Option<&Path>) {
    use scriptorium::{FileSystemPersistence, Persistence};

    if let Some(directory) = directory {
        match FileSystemPersistence.persist(text, name, directory) {
            Ok(path) => {
                info!(path = %path.display(), "Saved");
                return;
            }
            Err(e) => tracing::warn!(error = %e, "Could not save, printing instead"),
        }
    }
    println!("{}", text.trim_end());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_target_holds_everything() {
        let target = OutputTarget::new(PathBuf::from("out/stories"));
        assert_eq!(target.artifacts(), Path::new("out/stories"));
        assert_eq!(target.story(), Path::new("out/stories"));
    }

    #[test]
    fn txt_target_names_only_the_story() {
        let target = OutputTarget::new(PathBuf::from("out/train.TXT"));
        assert_eq!(target.artifacts(), Path::new("out"));
        assert_eq!(target.story(), Path::new("out/train.TXT"));

        let bare = OutputTarget::new(PathBuf::from("train.txt"));
        assert_eq!(bare.artifacts(), Path::new("."));
    }

    #[test]
    fn artifacts_and_story_land_in_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = OutputTarget::new(dir.path().join("train.txt"));
        deliver("Plot outline.", "outline_Train_1.txt", Some(target.artifacts()));
        deliver("# Train\n\nStory text.", "story_Train_1.txt", Some(target.story()));

        assert_eq!(
            std::fs::read_to_string(dir.path().join("outline_Train_1.txt")).unwrap(),
            "Plot outline.\n"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("train.txt")).unwrap(),
            "# Train\n\nStory text.\n"
        );
    }
}
