//! Spreadsheet export of certificate records for the admin back office.

use anyhow::Result;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};
use serde::Deserialize;

use crate::core::time::format_export;
use crate::db::models::ExamCertificate;

const COLUMNS: [(&str, f64); 18] = [
    ("Student Name", 28.0),
    ("Email", 30.0),
    ("Phone", 18.0),
    ("Course Name", 30.0),
    ("Course Duration (Days)", 14.0),
    ("Course Duration (Months)", 14.0),
    ("Purchased Date", 20.0),
    ("Joined Date", 20.0),
    ("Exam Score (%)", 12.0),
    ("Correct Answers", 12.0),
    ("Total Questions", 12.0),
    ("Exam Duration (Minutes)", 14.0),
    ("Exam Submitted Date", 20.0),
    ("Certificate Status", 16.0),
    ("Has Violations", 12.0),
    ("Violation Count", 12.0),
    ("Violation Details", 40.0),
    ("Admin Notes", 40.0),
];

// Indexes into COLUMNS dropped when violations are excluded.
const VIOLATION_COLUMNS: std::ops::Range<usize> = 14..17;

pub(crate) fn certificate_status(record: &ExamCertificate) -> &'static str {
    if record.certificate_file.is_some() {
        "Uploaded"
    } else {
        "Pending"
    }
}

#[derive(Deserialize)]
struct StoredViolation {
    violation_type: String,
}

/// Human summary of the stored violation JSON: the type labels joined
/// with commas. Missing or unparseable details render as "None".
pub(crate) fn violation_summary(details: Option<&str>) -> String {
    let summary = details
        .and_then(|details| serde_json::from_str::<Vec<StoredViolation>>(details).ok())
        .map(|parsed| {
            parsed
                .into_iter()
                .map(|violation| violation.violation_type)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    if summary.is_empty() {
        "None".to_string()
    } else {
        summary
    }
}

enum Cell {
    Text(String),
    Centered(String),
    Number(f64),
}

/// One cell per COLUMNS entry, in order.
fn row_cells(record: &ExamCertificate) -> Vec<Cell> {
    vec![
        Cell::Text(record.student_name.clone()),
        Cell::Text(record.student_email.clone()),
        Cell::Text(record.student_phone.clone().unwrap_or_else(|| "N/A".to_string())),
        Cell::Text(record.course_name.clone()),
        Cell::Number(record.course_duration_days as f64),
        Cell::Number(record.course_duration_months),
        Cell::Centered(format_export(record.purchased_date)),
        Cell::Centered(format_export(record.joined_date)),
        Cell::Number(record.exam_score_percentage),
        Cell::Number(record.correct_answers as f64),
        Cell::Number(record.total_questions as f64),
        Cell::Number(record.exam_duration_taken_minutes as f64),
        Cell::Centered(format_export(record.exam_submitted_date)),
        Cell::Centered(certificate_status(record).to_string()),
        Cell::Centered(if record.has_violations { "Yes" } else { "No" }.to_string()),
        Cell::Number(record.violation_count as f64),
        Cell::Text(violation_summary(record.violation_details.as_deref())),
        Cell::Text(record.admin_notes.clone().unwrap_or_default()),
    ]
}

fn keep_column(index: usize, include_violations: bool) -> bool {
    include_violations || !VIOLATION_COLUMNS.contains(&index)
}

pub(crate) fn build_workbook(
    records: &[ExamCertificate],
    include_violations: bool,
) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Certificates")?;

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x0F172A))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
        .set_border(FormatBorder::Thin);

    let columns: Vec<(&str, f64)> = COLUMNS
        .iter()
        .enumerate()
        .filter(|(i, _)| keep_column(*i, include_violations))
        .map(|(_, column)| *column)
        .collect();

    worksheet.set_row_height(0, 30)?;
    for (i, (name, width)) in columns.iter().enumerate() {
        worksheet.set_column_width(i as u16, *width)?;
        worksheet.write_string_with_format(0, i as u16, *name, &header_format)?;
    }

    let body_format = Format::new().set_border(FormatBorder::Thin);
    let center_format = body_format.clone().set_align(FormatAlign::Center);

    for (idx, record) in records.iter().enumerate() {
        let row = 1 + idx as u32;
        let cells = row_cells(record)
            .into_iter()
            .enumerate()
            .filter(|(i, _)| keep_column(*i, include_violations))
            .map(|(_, cell)| cell);
        for (col, cell) in cells.enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(value) => {
                    worksheet.write_string_with_format(row, col, &value, &body_format)?;
                }
                Cell::Centered(value) => {
                    worksheet.write_string_with_format(row, col, &value, &center_format)?;
                }
                Cell::Number(value) => {
                    worksheet.write_number_with_format(row, col, value, &center_format)?;
                }
            }
        }
    }

    worksheet.set_freeze_panes(1, 0)?;
    worksheet.autofilter(0, 0, records.len().max(1) as u32, (columns.len() - 1) as u16)?;

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample_certificate() -> ExamCertificate {
        ExamCertificate {
            id: "cert-1".to_string(),
            exam_attempt_id: "attempt-1".to_string(),
            student_name: "Aruzhan Bekova".to_string(),
            student_email: "aruzhan@example.com".to_string(),
            student_phone: None,
            course_name: "Digital Marketing".to_string(),
            course_duration_days: 45,
            course_duration_months: 1.5,
            purchased_date: datetime!(2025-01-04 18:20:00),
            joined_date: datetime!(2025-01-05 09:00:00),
            exam_score_percentage: 92.5,
            correct_answers: 37,
            total_questions: 40,
            exam_duration_taken_minutes: 30,
            exam_submitted_date: datetime!(2025-03-10 14:30:00),
            has_violations: true,
            violation_count: 3,
            violation_details: Some(
                r#"[{"violation_type":"Tab Switch","count":2},{"violation_type":"Copy Paste","count":1}]"#
                    .to_string(),
            ),
            certificate_file: None,
            certificate_uploaded_date: None,
            admin_notes: None,
            is_active: true,
            created_at: datetime!(2025-03-10 14:30:05),
            updated_at: datetime!(2025-03-10 14:30:05),
        }
    }

    #[test]
    fn status_reflects_artifact_presence() {
        let mut record = sample_certificate();
        assert_eq!(certificate_status(&record), "Pending");
        record.certificate_file = Some("certificates/cert-1.pdf".to_string());
        assert_eq!(certificate_status(&record), "Uploaded");
    }

    #[test]
    fn violation_summary_joins_type_labels() {
        let record = sample_certificate();
        assert_eq!(
            violation_summary(record.violation_details.as_deref()),
            "Tab Switch, Copy Paste"
        );
        assert_eq!(violation_summary(None), "None");
        assert_eq!(violation_summary(Some("not json")), "None");
        assert_eq!(violation_summary(Some("[]")), "None");
    }

    #[test]
    fn missing_phone_renders_as_na() {
        let record = sample_certificate();
        let cells = row_cells(&record);
        assert!(matches!(&cells[2], Cell::Text(value) if value == "N/A"));
    }

    #[test]
    fn excluding_violations_drops_their_columns() {
        let record = sample_certificate();
        assert_eq!(row_cells(&record).len(), COLUMNS.len());

        let kept: Vec<&str> = COLUMNS
            .iter()
            .enumerate()
            .filter(|(i, _)| keep_column(*i, false))
            .map(|(_, (name, _))| *name)
            .collect();
        assert_eq!(kept.len(), COLUMNS.len() - 3);
        assert!(!kept.contains(&"Has Violations"));
        assert!(!kept.contains(&"Violation Count"));
        assert!(!kept.contains(&"Violation Details"));
        assert!(kept.contains(&"Admin Notes"));
    }

    #[test]
    fn workbook_builds_for_empty_and_populated_lists() {
        assert!(!build_workbook(&[], true).unwrap().is_empty());
        let bytes = build_workbook(&[sample_certificate()], true).unwrap();
        // XLSX files are zip archives.
        assert_eq!(&bytes[0..2], b"PK");
        assert!(!build_workbook(&[sample_certificate()], false).unwrap().is_empty());
    }
}
