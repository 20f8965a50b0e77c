//! CSV 导出
//!
//! 写入 UTF-8 BOM 以便表格软件正确识别编码，字段引号由 `csv` crate 处理。

use actix_web::HttpResponse;
use actix_web::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};

use crate::errors::LearnHubError;
use crate::models::credits::entities::CreditTransaction;
use crate::models::users::entities::User;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn format_time(dt: &chrono::DateTime<chrono::Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// 按表头与行写出 CSV
pub fn write_csv<I, R>(headers: &[&str], rows: I) -> Result<Vec<u8>, LearnHubError>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut wtr = csv::Writer::from_writer(UTF8_BOM.to_vec());
    wtr.write_record(headers)
        .map_err(|e| LearnHubError::serialization(e.to_string()))?;
    for row in rows {
        wtr.write_record(row)
            .map_err(|e| LearnHubError::serialization(e.to_string()))?;
    }
    wtr.into_inner()
        .map_err(|e| LearnHubError::serialization(e.to_string()))
}

pub fn transactions_csv(transactions: &[CreditTransaction]) -> Result<Vec<u8>, LearnHubError> {
    write_csv(
        &["id", "user_id", "kind", "amount", "balance_after", "reason", "created_at"],
        transactions.iter().map(|t| {
            vec![
                t.id.to_string(),
                t.user_id.to_string(),
                t.kind.to_string(),
                t.amount.to_string(),
                t.balance_after.to_string(),
                t.reason.clone(),
                format_time(&t.created_at),
            ]
        }),
    )
}

pub fn users_csv(users: &[User]) -> Result<Vec<u8>, LearnHubError> {
    write_csv(
        &[
            "id",
            "username",
            "email",
            "display_name",
            "role",
            "status",
            "credits",
            "last_login",
            "created_at",
        ],
        users.iter().map(|u| {
            vec![
                u.id.to_string(),
                u.username.clone(),
                u.email.clone(),
                u.display_name.clone().unwrap_or_default(),
                u.role.to_string(),
                u.status.to_string(),
                u.credits.to_string(),
                u.last_login.as_ref().map(format_time).unwrap_or_default(),
                format_time(&u.created_at),
            ]
        }),
    )
}

/// 以附件形式返回 CSV
pub fn csv_attachment(filename: &str, body: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .insert_header((CONTENT_TYPE, "text/csv; charset=utf-8"))
        .insert_header((
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credits::entities::CreditKind;

    fn as_text(bytes: Vec<u8>) -> String {
        assert!(bytes.starts_with(UTF8_BOM));
        String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap()
    }

    #[test]
    fn test_fields_with_commas_and_quotes_are_quoted() {
        let out = write_csv(&["a", "b"], vec![vec!["x, y", "say \"hi\""]]).unwrap();
        let text = as_text(out);
        assert_eq!(text, "a,b\n\"x, y\",\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn test_transactions_export() {
        let tx = CreditTransaction {
            id: 7,
            user_id: 3,
            amount: -20,
            balance_after: 80,
            kind: CreditKind::Deduction,
            reason: "course generation: Rust, basics".into(),
            created_at: chrono::DateTime::from_timestamp(0, 0).unwrap(),
        };
        let text = as_text(transactions_csv(&[tx]).unwrap());
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,user_id,kind,amount,balance_after,reason,created_at")
        );
        assert_eq!(
            lines.next(),
            Some("7,3,deduction,-20,80,\"course generation: Rust, basics\",1970-01-01 00:00:00")
        );
    }
}
