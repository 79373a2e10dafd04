//! 学生レコードとアップロード履歴のモデル。

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// サーバーが払い出すレコードID（文字列・数値どちらでも受け付ける）。
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        string_or_number(d).map(RecordId)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// JSONの文字列/数値を文字列として読み込む。
fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }
    Ok(match Raw::deserialize(d)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}

/// 名簿の1行分。
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct StudentRecord {
    /// サーバー側の識別子。
    #[serde(rename = "_id")]
    pub id: RecordId,
    /// 学籍番号（表示専用）。
    #[serde(deserialize_with = "string_or_number", default)]
    pub student_id: String,
    /// 氏名。
    #[serde(default)]
    pub student_name: String,
    /// 満点。
    #[serde(default)]
    pub total_marks: f64,
    /// 得点。
    #[serde(default)]
    pub marks_obtained: f64,
    /// サーバーが算出する得点率。
    #[serde(default)]
    pub percentage: f64,
}

/// PUT時に送る本文（idを除く全項目）。
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StudentPayload {
    pub student_id: String,
    pub student_name: String,
    pub total_marks: f64,
    pub marks_obtained: f64,
    pub percentage: f64,
}

/// アップロード結果の状態。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Success,
    Error,
}

/// アップロード履歴の1件（作成後は不変）。
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct UploadHistoryEntry {
    /// アップロード日時。
    pub upload_date: DateTime<Utc>,
    /// 元のファイル名。
    pub filename: String,
    /// 拡張子などの種別。
    #[serde(default)]
    pub file_type: String,
    /// ファイルサイズ（バイト）。
    #[serde(default)]
    pub file_size: u64,
    /// 取り込まれた学生数。
    #[serde(default)]
    pub students_count: u64,
    /// 成否。
    pub status: UploadStatus,
}

impl UploadHistoryEntry {
    /// ローカル時刻での表示文字列。
    pub fn local_date_label(&self) -> String {
        self.upload_date
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }

    /// KB単位（小数1桁）の表示文字列。
    pub fn size_label(&self) -> String {
        format!("{:.1} KB", self.file_size as f64 / 1024.0)
    }

    /// 状態の表示ラベル。
    pub fn status_label(&self) -> &'static str {
        match self.status {
            UploadStatus::Success => "Success",
            UploadStatus::Error => "Failed",
        }
    }
}

/// アップロードAPIの応答。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    /// 取り込まれたレコード数。
    pub count: u64,
}

/// 編集フォームで変更できる項目。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DraftField {
    StudentName,
    TotalMarks,
    MarksObtained,
}

impl DraftField {
    /// フォーム上の並び順。
    pub const ALL: [DraftField; 3] = [
        DraftField::StudentName,
        DraftField::TotalMarks,
        DraftField::MarksObtained,
    ];

    /// 表示ラベル。
    pub fn label(self) -> &'static str {
        match self {
            DraftField::StudentName => "Student Name",
            DraftField::TotalMarks => "Total Marks",
            DraftField::MarksObtained => "Marks Obtained",
        }
    }
}

/// 編集中のレコードのローカルコピー。
#[derive(Clone, Debug, PartialEq)]
pub struct EditDraft {
    /// 編集元レコードのID。
    pub id: RecordId,
    pub student_id: String,
    pub student_name: String,
    pub total_marks: f64,
    pub marks_obtained: f64,
    /// 編集不可（保存後はサーバー値で置き換わる）。
    pub percentage: f64,
}

impl From<&StudentRecord> for EditDraft {
    fn from(r: &StudentRecord) -> Self {
        Self {
            id: r.id.clone(),
            student_id: r.student_id.clone(),
            student_name: r.student_name.clone(),
            total_marks: r.total_marks,
            marks_obtained: r.marks_obtained,
            percentage: r.percentage,
        }
    }
}

impl EditDraft {
    /// 入力文字列を項目へ反映する。数値項目で不正な値なら元の値を保つ。
    pub fn set_field(&mut self, field: DraftField, value: &str) -> Result<(), String> {
        match field {
            DraftField::StudentName => {
                self.student_name = value.to_string();
                Ok(())
            }
            DraftField::TotalMarks => {
                self.total_marks = parse_marks(field, value)?;
                Ok(())
            }
            DraftField::MarksObtained => {
                self.marks_obtained = parse_marks(field, value)?;
                Ok(())
            }
        }
    }

    /// 項目の現在値を文字列で返す。
    pub fn field_value(&self, field: DraftField) -> String {
        match field {
            DraftField::StudentName => self.student_name.clone(),
            DraftField::TotalMarks => format_number(self.total_marks),
            DraftField::MarksObtained => format_number(self.marks_obtained),
        }
    }

    /// PUT本文へ変換する。
    pub fn to_payload(&self) -> StudentPayload {
        StudentPayload {
            student_id: self.student_id.clone(),
            student_name: self.student_name.clone(),
            total_marks: self.total_marks,
            marks_obtained: self.marks_obtained,
            percentage: self.percentage,
        }
    }
}

/// 点数入力を非負の有限数として解釈する。
fn parse_marks(field: DraftField, value: &str) -> Result<f64, String> {
    match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 => Ok(n),
        _ => Err(format!(
            "{} must be a non-negative number (got {:?})",
            field.label(),
            value
        )),
    }
}

/// 整数値なら小数点なしで表示する。
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> StudentRecord {
        StudentRecord {
            id: RecordId::from("1"),
            student_id: "S001".into(),
            student_name: "A".into(),
            total_marks: 100.0,
            marks_obtained: 50.0,
            percentage: 50.0,
        }
    }

    #[test]
    fn test_student_record_accepts_numeric_ids() {
        // 数値のIDも文字列として読み込めることを検証する。
        let json = r#"{"_id": 7, "student_id": 1001, "student_name": "Ann",
            "total_marks": 100, "marks_obtained": 72.5, "percentage": 72.5}"#;
        let r: StudentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.id, RecordId::from("7"));
        assert_eq!(r.student_id, "1001");
        assert_eq!(r.marks_obtained, 72.5);
    }

    #[test]
    fn test_history_entry_labels() {
        // 履歴の表示用ラベルを検証する。
        let json = r#"{"upload_date": "2024-03-01T10:00:00Z", "filename": "a.csv",
            "file_type": "csv", "file_size": 2048, "students_count": 3, "status": "error"}"#;
        let e: UploadHistoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(e.size_label(), "2.0 KB");
        assert_eq!(e.status_label(), "Failed");
        assert_eq!(e.students_count, 3);
    }

    #[test]
    fn test_set_field_coerces_numbers() {
        // 数値項目は数値として保存される。
        let mut d = EditDraft::from(&record());
        d.set_field(DraftField::TotalMarks, " 80 ").unwrap();
        assert_eq!(d.total_marks, 80.0);
        d.set_field(DraftField::StudentName, "Bea").unwrap();
        assert_eq!(d.student_name, "Bea");
    }

    #[test]
    fn test_set_field_rejects_invalid_numbers() {
        // 不正な入力では元の値が保たれる。
        let mut d = EditDraft::from(&record());
        assert!(d.set_field(DraftField::MarksObtained, "abc").is_err());
        assert!(d.set_field(DraftField::MarksObtained, "-1").is_err());
        assert!(d.set_field(DraftField::MarksObtained, "").is_err());
        assert!(d.set_field(DraftField::MarksObtained, "NaN").is_err());
        assert_eq!(d.marks_obtained, 50.0);
    }

    #[test]
    fn test_payload_excludes_id() {
        // PUT本文に_idが含まれないことを検証する。
        let d = EditDraft::from(&record());
        let v = serde_json::to_value(d.to_payload()).unwrap();
        assert!(v.get("_id").is_none());
        assert_eq!(v["student_name"], "A");
        assert_eq!(v["total_marks"], 100.0);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(80.0), "80");
        assert_eq!(format_number(72.456), "72.46");
    }
}
