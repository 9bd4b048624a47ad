//! TSC category codes: normalization and keyword inference

/// Category assigned when neither the code nor the description identify one
pub const UNCATEGORIZED: &str = "UNCATEGORIZED";

/// Keywords that suggest each TSC category, in priority order
pub const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "CC1",
        &["governance", "accountability", "oversight", "board", "ethics", "integrity", "values"],
    ),
    (
        "CC2",
        &["communication", "information", "policies", "procedures", "internal control"],
    ),
    (
        "CC3",
        &["risk assessment", "risk identification", "risk analysis", "risk mitigation"],
    ),
    ("CC4", &["monitoring", "evaluation", "ongoing", "assessment", "review"]),
    (
        "CC5",
        &["access control", "segregation", "authorization", "approval", "control activities"],
    ),
    (
        "CC6",
        &["logical access", "physical access", "authentication", "identity", "credentials", "badge"],
    ),
    (
        "CC7",
        &["incident", "detection", "response", "recovery", "operations", "security events"],
    ),
    (
        "CC8",
        &["change management", "deployment", "infrastructure", "software changes", "release"],
    ),
    (
        "CC9",
        &["vendor", "third-party", "business continuity", "disaster recovery", "outsourcing"],
    ),
    (
        "A",
        &["availability", "uptime", "redundancy", "failover", "disaster recovery", "backup"],
    ),
    (
        "PI",
        &["processing integrity", "accuracy", "completeness", "validity", "timeliness"],
    ),
    (
        "C",
        &["confidentiality", "classification", "encryption", "data protection", "sensitive"],
    ),
    (
        "P",
        &["privacy", "personal information", "pii", "consent", "data subject", "gdpr"],
    ),
];

/// Collapse a category code or control id to its TSC category
///
/// `"cc6.1"` and `"CC6"` become `CC6`; `"A1.2"` becomes `A`; `"PI1"` becomes
/// `PI`. Category names such as `"Availability"` are also recognized.
/// Returns `None` for anything else.
pub fn normalize_category(raw: &str) -> Option<String> {
    let upper = raw.trim().to_uppercase();
    if upper.is_empty() {
        return None;
    }

    if let Some(rest) = upper.strip_prefix("CC") {
        let digit = rest.chars().next()?;
        let follows = rest.chars().nth(1);
        if ('1'..='9').contains(&digit) && !follows.is_some_and(|c| c.is_ascii_digit()) {
            return Some(format!("CC{}", digit));
        }
        return None;
    }

    match upper.as_str() {
        "AVAILABILITY" => return Some("A".to_string()),
        "CONFIDENTIALITY" => return Some("C".to_string()),
        "PROCESSING INTEGRITY" | "PROCESSING_INTEGRITY" => return Some("PI".to_string()),
        "PRIVACY" => return Some("P".to_string()),
        _ => {}
    }

    for prefix in ["PI", "A", "C", "P"] {
        if let Some(rest) = upper.strip_prefix(prefix) {
            if rest.is_empty() || rest.starts_with(|c: char| c.is_ascii_digit()) {
                return Some(prefix.to_string());
            }
        }
    }

    None
}

/// Guess a category from free text by keyword matches
///
/// The category with the most matching keywords wins; ties go to the
/// category listed first.
pub fn infer_category(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    let mut best: Option<(&'static str, usize)> = None;

    for (category, keywords) in CATEGORY_KEYWORDS {
        let hits = keywords.iter().filter(|k| lower.contains(*k)).count();
        if hits > 0 && best.is_none_or(|(_, top)| hits > top) {
            best = Some((*category, hits));
        }
    }

    best.map(|(category, _)| category)
}

/// Resolve the category of an extracted control
///
/// Tries the reported category, then the control id, then keywords in the
/// description, and falls back to [`UNCATEGORIZED`].
pub fn resolve_category(reported: Option<&str>, control_id: &str, description: &str) -> String {
    reported
        .and_then(normalize_category)
        .or_else(|| normalize_category(control_id))
        .or_else(|| infer_category(description).map(str::to_string))
        .unwrap_or_else(|| UNCATEGORIZED.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_common_criteria() {
        assert_eq!(normalize_category("cc6.1").as_deref(), Some("CC6"));
        assert_eq!(normalize_category(" CC6 ").as_deref(), Some("CC6"));
        assert_eq!(normalize_category("CC9.2").as_deref(), Some("CC9"));
        assert_eq!(normalize_category("CC10"), None);
        assert_eq!(normalize_category("CC"), None);
    }

    #[test]
    fn test_normalize_additional_criteria() {
        assert_eq!(normalize_category("A1.2").as_deref(), Some("A"));
        assert_eq!(normalize_category("PI1").as_deref(), Some("PI"));
        assert_eq!(normalize_category("C1.1").as_deref(), Some("C"));
        assert_eq!(normalize_category("P4.3").as_deref(), Some("P"));
        assert_eq!(normalize_category("a").as_deref(), Some("A"));
        assert_eq!(normalize_category("Availability").as_deref(), Some("A"));
        assert_eq!(normalize_category("Processing Integrity").as_deref(), Some("PI"));
    }

    #[test]
    fn test_normalize_rejects_other_ids() {
        assert_eq!(normalize_category("SEC-01"), None);
        assert_eq!(normalize_category("AC-2"), None);
        assert_eq!(normalize_category("Security"), None);
        assert_eq!(normalize_category(""), None);
    }

    #[test]
    fn test_infer_category_by_keywords() {
        assert_eq!(
            infer_category("Security incidents are logged and the response team is paged"),
            Some("CC7")
        );
        assert_eq!(
            infer_category("Badge readers restrict physical access to the data center"),
            Some("CC6")
        );
        assert_eq!(infer_category("Nightly backup with failover to a second region"), Some("A"));
        assert_eq!(infer_category("Lorem ipsum"), None);
    }

    #[test]
    fn test_resolve_category_fallbacks() {
        assert_eq!(resolve_category(Some("cc5"), "X-1", ""), "CC5");
        assert_eq!(resolve_category(Some("Security"), "CC8.1", ""), "CC8");
        assert_eq!(
            resolve_category(None, "SEC-01", "Encryption of sensitive data at rest"),
            "C"
        );
        assert_eq!(resolve_category(None, "SEC-01", "Misc"), UNCATEGORIZED);
    }
}
