use bson::Document;

/// Options attached verbatim to the aggregate command. They never affect
/// how the pipeline itself renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationOptions {
    pub allow_disk_use: Option<bool>,
    pub explain: Option<bool>,
    pub cursor_batch_size: Option<u32>,
    pub comment: Option<String>,
}

impl AggregationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allow_disk_use(self, allow_disk_use: bool) -> Self {
        AggregationOptions {
            allow_disk_use: Some(allow_disk_use),
            ..self
        }
    }

    pub fn with_explain(self, explain: bool) -> Self {
        AggregationOptions {
            explain: Some(explain),
            ..self
        }
    }

    pub fn with_cursor_batch_size(self, batch_size: u32) -> Self {
        AggregationOptions {
            cursor_batch_size: Some(batch_size),
            ..self
        }
    }

    pub fn with_comment(self, comment: impl Into<String>) -> Self {
        AggregationOptions {
            comment: Some(comment.into()),
            ..self
        }
    }

    pub fn apply_to_command(&self, command: &mut Document) {
        if let Some(allow_disk_use) = self.allow_disk_use {
            command.insert("allowDiskUse", allow_disk_use);
        }
        if self.explain == Some(true) {
            command.insert("explain", true);
        } else {
            // The aggregate command requires a cursor document unless it
            // is an explain.
            let mut cursor = Document::new();
            if let Some(batch_size) = self.cursor_batch_size {
                cursor.insert("batchSize", batch_size as i32);
            }
            command.insert("cursor", cursor);
        }
        if let Some(comment) = &self.comment {
            command.insert("comment", comment.clone());
        }
    }
}
