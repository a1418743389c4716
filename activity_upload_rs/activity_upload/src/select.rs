use tracing::debug;

/// Anything that carries a filename the handler can compare against the target.
pub trait NamedFile {
    fn file_name(&self) -> String;
}

impl<T: NamedFile + ?Sized> NamedFile for &T {
    fn file_name(&self) -> String {
        (**self).file_name()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection<F> {
    Found { index: usize, file: F },
    NotFound { scanned: usize },
}

impl<F> Selection<F> {
    pub fn is_found(&self) -> bool {
        matches!(self, Selection::Found { .. })
    }

    pub fn into_file(self) -> Option<F> {
        match self {
            Selection::Found { file, .. } => Some(file),
            Selection::NotFound { .. } => None,
        }
    }
}

/// First file whose name is exactly `target`. Scanning stops at the first hit.
pub fn select_target<'a, F: NamedFile>(files: &'a [F], target: &str) -> Option<&'a F> {
    files.iter().find(|f| f.file_name() == target)
}

pub fn select<F: NamedFile + Clone>(files: &[F], target: &str) -> Selection<F> {
    for (index, file) in files.iter().enumerate() {
        let name = file.file_name();
        if name == target {
            debug!(index, name = %name, "target file selected");
            return Selection::Found {
                index,
                file: file.clone(),
            };
        }
    }
    debug!(scanned = files.len(), wanted = target, "target file not in selection");
    Selection::NotFound {
        scanned: files.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Fake {
        name: &'static str,
        tag: u8,
    }

    impl NamedFile for Fake {
        fn file_name(&self) -> String {
            self.name.to_string()
        }
    }

    fn fake(name: &'static str, tag: u8) -> Fake {
        Fake { name, tag }
    }

    #[test]
    fn picks_first_of_duplicate_matches() {
        let files = vec![
            fake("profile.json", 0),
            fake("activities.csv", 1),
            fake("activities.csv", 2),
        ];
        let hit = select_target(&files, "activities.csv").unwrap();
        assert_eq!(hit.tag, 1);
        assert_eq!(
            select(&files, "activities.csv"),
            Selection::Found {
                index: 1,
                file: fake("activities.csv", 1)
            }
        );
    }

    #[test]
    fn match_is_exact() {
        let files = vec![
            fake("Activities.csv", 0),
            fake("activities.csv.bak", 1),
            fake(" activities.csv", 2),
        ];
        assert!(select_target(&files, "activities.csv").is_none());
        assert_eq!(
            select(&files, "activities.csv"),
            Selection::NotFound { scanned: 3 }
        );
    }

    #[test]
    fn empty_selection_finds_nothing() {
        let files: Vec<Fake> = Vec::new();
        let sel = select(&files, "activities.csv");
        assert!(!sel.is_found());
        assert_eq!(sel.into_file(), None);
    }

    #[test]
    fn target_is_configurable() {
        let files = vec![fake("activities.csv", 0), fake("rides.csv", 1)];
        assert_eq!(select_target(&files, "rides.csv").map(|f| f.tag), Some(1));
    }
}
