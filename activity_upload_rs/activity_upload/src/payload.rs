use crate::select::Selection;

/// Multipart body for one submission: a field key and at most one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadPayload<F> {
    field_name: String,
    entry: Option<F>,
}

impl<F> UploadPayload<F> {
    pub fn empty(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            entry: None,
        }
    }

    pub fn single(field_name: impl Into<String>, file: F) -> Self {
        Self {
            field_name: field_name.into(),
            entry: Some(file),
        }
    }

    pub fn from_selection(selection: Selection<F>, field_name: impl Into<String>) -> Self {
        match selection.into_file() {
            Some(file) => Self::single(field_name, file),
            None => Self::empty(field_name),
        }
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn entry(&self) -> Option<&F> {
        self.entry.as_ref()
    }

    pub fn into_entry(self) -> Option<F> {
        self.entry
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    pub fn len(&self) -> usize {
        usize::from(self.entry.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn found_selection_yields_one_entry() {
        let sel = Selection::Found {
            index: 3,
            file: "activities.csv",
        };
        let payload = UploadPayload::from_selection(sel, "files");
        assert_eq!(payload.len(), 1);
        assert_eq!(payload.field_name(), "files");
        assert_eq!(payload.entry(), Some(&"activities.csv"));
    }

    #[test]
    fn missing_selection_yields_empty_payload() {
        let payload: UploadPayload<&str> =
            UploadPayload::from_selection(Selection::NotFound { scanned: 4 }, "files");
        assert!(payload.is_empty());
        assert_eq!(payload.len(), 0);
        assert_eq!(payload.into_entry(), None);
    }
}
