//! Fixed-schema records produced by the page pipeline.

use serde::{Deserialize, Serialize};

/// Summary of a page's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,
    pub original_length: usize,
    pub summary_length: usize,
}

impl Summary {
    pub fn from_text(summary: &str, original: &str) -> Self {
        let summary = summary.trim();
        Self {
            summary: summary.to_string(),
            original_length: original.chars().count(),
            summary_length: summary.chars().count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ActionItem {
    pub fn new(action: &str) -> Self {
        Self {
            action: action.to_string(),
            priority: None,
            assignee: None,
            due_date: None,
            category: None,
        }
    }
}

/// Result of content analysis for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBundle {
    pub summary: Summary,
    pub structured_data: serde_json::Value,
    pub action_items: Vec<ActionItem>,
    pub document_type: String,
    pub document_id: String,
    /// Set once the combined document artifact exists.
    pub artifact_created: bool,
    /// Partial degradation inside an otherwise usable analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_error: Option<String>,
}

impl AnalysisBundle {
    pub fn new(
        summary: Summary,
        structured_data: serde_json::Value,
        action_items: Vec<ActionItem>,
        document_type: &str,
        document_id: &str,
    ) -> Self {
        Self {
            summary,
            structured_data,
            action_items,
            document_type: document_type.to_string(),
            document_id: document_id.to_string(),
            artifact_created: false,
            analysis_error: None,
        }
    }
}

/// Outcome of the analysis stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PageAnalysis {
    /// No extractable text, analysis not attempted.
    #[default]
    Skipped,
    Completed(AnalysisBundle),
    Failed { error: String },
}

impl PageAnalysis {
    pub fn bundle(&self) -> Option<&AnalysisBundle> {
        match self {
            PageAnalysis::Completed(bundle) => Some(bundle),
            _ => None,
        }
    }

    pub fn bundle_mut(&mut self) -> Option<&mut AnalysisBundle> {
        match self {
            PageAnalysis::Completed(bundle) => Some(bundle),
            _ => None,
        }
    }
}

/// Everything the pipeline learned about one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// Position in the submitted page order.
    pub page_index: usize,
    pub image: String,
    /// None when enhancement failed or changed nothing.
    pub enhanced_image: Option<String>,
    pub ocr_text: String,
    pub ocr_error: Option<String>,
    pub analysis: PageAnalysis,
    /// Present only when extracted text is non-blank.
    pub document_id: Option<String>,
    /// Page-level defect; the stages after the failing one did not run.
    pub error: Option<String>,
}

impl PageResult {
    pub fn new(page_index: usize, image: &str) -> Self {
        Self {
            page_index,
            image: image.to_string(),
            enhanced_image: None,
            ocr_text: String::new(),
            ocr_error: None,
            analysis: PageAnalysis::Skipped,
            document_id: None,
            error: None,
        }
    }

    /// Result for a page whose pipeline aborted.
    pub fn defect(page_index: usize, image: &str, error: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(page_index, image)
        }
    }

    pub fn has_text(&self) -> bool {
        !self.ocr_text.trim().is_empty()
    }

    pub fn is_defect(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lengths_count_chars() {
        let summary = Summary::from_text("  Grüße ", "Grüße aus Zürich");
        assert_eq!(summary.summary, "Grüße");
        assert_eq!(summary.summary_length, 5);
        assert_eq!(summary.original_length, 16);
    }

    #[test]
    fn test_defect_result() {
        let result = PageResult::defect(2, "page3.png", "decoder crashed");
        assert!(result.is_defect());
        assert!(!result.has_text());
        assert_eq!(result.analysis, PageAnalysis::Skipped);
    }

    #[test]
    fn test_blank_text_is_not_text() {
        let mut result = PageResult::new(0, "page1.png");
        result.ocr_text = " \n\t".to_string();
        assert!(!result.has_text());
    }

    #[test]
    fn test_analysis_serializes_tagged() {
        let failed = PageAnalysis::Failed {
            error: "timeout".to_string(),
        };
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["error"], "timeout");

        let skipped = serde_json::to_value(PageAnalysis::Skipped).unwrap();
        assert_eq!(skipped["state"], "skipped");
    }

    #[test]
    fn test_action_item_tolerates_missing_fields() {
        let item: ActionItem = serde_json::from_str(r#"{"action": "Pay invoice"}"#).unwrap();
        assert_eq!(item, ActionItem::new("Pay invoice"));
    }
}
