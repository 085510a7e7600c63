//! Best-effort parsing of model output into a [`Report`].
//!
//! The model is asked for three sections separated by `---`: a summary, a
//! bullet list of risks and a bullet list of recommendations. Output that
//! does not follow the format degrades to a default summary and empty lists.

use crate::models::Report;

pub const SECTION_DELIMITER: &str = "---";
pub const DEFAULT_SUMMARY: &str = "Analysis complete.";
/// Lines whose trimmed length is at most this are dropped.
const MIN_LINE_CHARS: usize = 3;

/// Split raw model output into summary, risks and recommendations.
///
/// Sections after the third are ignored.
pub fn parse_report(raw: &str) -> Report {
    let mut sections = raw.split(SECTION_DELIMITER);

    let summary = sections
        .next()
        .map(str::trim)
        // Blank counts as absent
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SUMMARY)
        .to_string();
    let risks = sections.next().map(parse_list).unwrap_or_default();
    let recommendations = sections.next().map(parse_list).unwrap_or_default();

    Report {
        summary,
        risks,
        recommendations,
    }
}

/// One entry per line longer than [`MIN_LINE_CHARS`], bullet marker removed.
///
/// Length is measured on the trimmed line including its marker, so `* ok`
/// survives while `abc` does not.
fn parse_list(section: &str) -> Vec<String> {
    section
        .split('\n')
        .filter(|line| line.trim().chars().count() > MIN_LINE_CHARS)
        .map(|line| strip_bullet(line).to_string())
        .collect()
}

/// Remove one leading `*` or `-` and the whitespace after it.
fn strip_bullet(line: &str) -> &str {
    match line.strip_prefix(['*', '-']) {
        Some(rest) => rest.trim_start(),
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_sections() {
        let report = parse_report(
            "Patient is healthy.---* High cholesterol\n* skip\n---* Exercise more\n* ok",
        );

        assert_eq!(report.summary, "Patient is healthy.");
        assert_eq!(report.risks, ["High cholesterol", "skip"]);
        assert_eq!(report.recommendations, ["Exercise more", "ok"]);
    }

    #[test]
    fn test_length_boundary() {
        // Trimmed length 3 is dropped, 4 is kept.
        let report = parse_report("s---abc\n  abc  \nabcd\n* a\n-  \n--- * xy\n");
        assert_eq!(report.risks, ["abcd"]);
        // A leading space keeps the marker, as only a line-initial bullet is stripped.
        assert_eq!(report.recommendations, [" * xy"]);
    }

    #[test]
    fn test_dash_bullets_and_blank_lines() {
        let report = parse_report("Summary.\n---\n- Elevated LDL\n\n-Low iron\n---\n");
        assert_eq!(report.risks, ["Elevated LDL", "Low iron"]);
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_unstructured_output_degrades() {
        let report = parse_report("  The report looks normal.  ");
        assert_eq!(report.summary, "The report looks normal.");
        assert!(report.risks.is_empty());
        assert!(report.recommendations.is_empty());

        let report = parse_report("");
        assert_eq!(report.summary, DEFAULT_SUMMARY);

        let report = parse_report("---only risks here");
        assert_eq!(report.summary, DEFAULT_SUMMARY);
        assert_eq!(report.risks, ["only risks here"]);
    }

    #[test]
    fn test_whitespace_summary_uses_default() {
        let report = parse_report(" \n\t ---* Elevated LDL---* Walk daily");
        assert_eq!(report.summary, DEFAULT_SUMMARY);
        assert_eq!(report.risks, ["Elevated LDL"]);
        assert_eq!(report.recommendations, ["Walk daily"]);
    }

    #[test]
    fn test_extra_sections_ignored() {
        let report = parse_report("a summary---risk one---rec one---trailing junk");
        assert_eq!(report.risks, ["risk one"]);
        assert_eq!(report.recommendations, ["rec one"]);
    }
}
