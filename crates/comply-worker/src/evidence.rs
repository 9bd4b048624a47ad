//! Evidence locations for extracted controls

use comply_domain::{EvidenceLocation, ExtractionRecord};

/// Keep at most `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// One `control` evidence location per extracted control, in record order
pub fn control_evidence(record: &ExtractionRecord, text_limit: usize) -> Vec<EvidenceLocation> {
    record
        .controls
        .iter()
        .map(|control| EvidenceLocation {
            evidence_type: "control".to_string(),
            evidence_id: control.control_id.clone(),
            page_number: control.page_ref,
            section_reference: control.category_code.clone(),
            extracted_text: truncate_chars(&control.description, text_limit),
            confidence: control.confidence,
            extraction_method: "ai".to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use comply_domain::{ExtractedControl, ReportMetadata, TestResult};

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("Überprüfung", 3), "Übe");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_control_evidence() {
        let record = ExtractionRecord::new(
            ReportMetadata::default(),
            vec![ExtractedControl {
                control_id: "CC7.2".to_string(),
                category_code: "CC7".to_string(),
                description: "x".repeat(2500),
                test_result: TestResult::Exception,
                page_ref: Some(63),
                confidence: 0.8,
            }],
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );

        let locations = control_evidence(&record, 2000);
        assert_eq!(locations.len(), 1);

        let location = &locations[0];
        assert_eq!(location.evidence_type, "control");
        assert_eq!(location.evidence_id, "CC7.2");
        assert_eq!(location.page_number, Some(63));
        assert_eq!(location.section_reference, "CC7");
        assert_eq!(location.extracted_text.len(), 2000);
        assert_eq!(location.extraction_method, "ai");
    }
}
