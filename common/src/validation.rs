//! 入力値の検証
//!
//! フォーム入力はサーバーへ送る前にここで検証する。
//! 空文字は未入力として常に有効扱い（必須チェックは `ensure_present` で行う）。

use crate::error::{Error, Result};
use regex::Regex;

/// 検証の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    LoginId,
    LoginPassword,
    Url,
    Name,
    Timestamp,
}

/// パスワードで使える記号
const PASSWORD_SYMBOLS: &[char] = &['_', '-', '!', '$', '#', '%', '@'];
const PASSWORD_MIN_LENGTH: usize = 8;

/// 文字列を検証
pub fn validate_string(value: &str, kind: ValidationKind) -> bool {
    if value.is_empty() {
        return true;
    }

    lazy_static::lazy_static! {
        // 漢字・ひらがな・カタカナ・英数字、区切りに `_` `-`
        static ref LOGIN_ID_RE: Regex = Regex::new(
            r"^[\x{4E00}-\x{9FAF}\x{3040}-\x{309F}\x{30A0}-\x{30FF}a-zA-Z0-9]+(?:[_-][\x{4E00}-\x{9FAF}\x{3040}-\x{309F}\x{30A0}-\x{30FF}a-zA-Z0-9]+)*$"
        ).unwrap();
        static ref URL_RE: Regex = Regex::new(
            r"^(https?|ftp)://[a-zA-Z0-9\-.]+\.[a-zA-Z]{2,}(/\S*)?$"
        ).unwrap();
        // 先頭・末尾は記号と空白を除く
        static ref NAME_RE: Regex = Regex::new(
            r"^(?:[A-Za-z0-9\x{4E00}-\x{9FAF}\x{3040}-\x{309F}\x{30A0}-\x{30FF}])(?:[\x{4E00}-\x{9FAF}\x{3040}-\x{309F}\x{30A0}-\x{30FF}a-zA-Z0-9_\- ]*[A-Za-z0-9\x{4E00}-\x{9FAF}\x{3040}-\x{309F}\x{30A0}-\x{30FF}])?$"
        ).unwrap();
        static ref TIMESTAMP_RE: Regex = Regex::new(
            r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}[+]00:00$"
        ).unwrap();
    }

    match kind {
        ValidationKind::LoginId => LOGIN_ID_RE.is_match(value),
        ValidationKind::LoginPassword => is_valid_password(value),
        ValidationKind::Url => URL_RE.is_match(value),
        ValidationKind::Name => NAME_RE.is_match(value),
        ValidationKind::Timestamp => TIMESTAMP_RE.is_match(value),
    }
}

/// 8文字以上・空白なし・小文字/大文字/数字/記号のうち3種類以上
fn is_valid_password(value: &str) -> bool {
    if value.chars().count() < PASSWORD_MIN_LENGTH || value.chars().any(char::is_whitespace) {
        return false;
    }

    let classes = [
        value.chars().any(|c| c.is_ascii_lowercase()),
        value.chars().any(|c| c.is_ascii_uppercase()),
        value.chars().any(|c| c.is_ascii_digit()),
        value.chars().any(|c| PASSWORD_SYMBOLS.contains(&c)),
    ];

    classes.iter().filter(|&&present| present).count() >= 3
}

/// 必須項目のチェック
pub fn ensure_present(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!(
            "{} is required and cannot be empty",
            field
        )));
    }
    Ok(())
}

/// 2つの文字列の差分（追加・置換された部分）を返す
pub fn string_difference(current: &str, new: &str) -> String {
    let cur: Vec<char> = current.chars().collect();
    let new: Vec<char> = new.chars().collect();

    let mut prefix = 0;
    while prefix < cur.len() && new.get(prefix) == Some(&cur[prefix]) {
        prefix += 1;
    }

    // 先頭がすべて一致: 追加された末尾部分
    if prefix == cur.len() {
        return new[prefix..].iter().collect();
    }

    let mut suffix = 0;
    while suffix < cur.len()
        && suffix < new.len()
        && cur[cur.len() - 1 - suffix] == new[new.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let end = new.len() - suffix;
    if prefix >= end {
        return String::new();
    }
    new[prefix..end].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_valid() {
        assert!(validate_string("", ValidationKind::Url));
        assert!(validate_string("", ValidationKind::LoginPassword));
    }

    #[test]
    fn test_login_id() {
        assert!(validate_string("admin_01", ValidationKind::LoginId));
        assert!(validate_string("管理者-東京", ValidationKind::LoginId));
        assert!(!validate_string("admin__01", ValidationKind::LoginId));
        assert!(!validate_string("_admin", ValidationKind::LoginId));
        assert!(!validate_string("admin 01", ValidationKind::LoginId));
    }

    #[test]
    fn test_password() {
        assert!(validate_string("Passw0rd", ValidationKind::LoginPassword));
        assert!(validate_string("passw0rd!", ValidationKind::LoginPassword));
        // 2種類のみ
        assert!(!validate_string("password1", ValidationKind::LoginPassword));
        // 短すぎる
        assert!(!validate_string("Pa0!", ValidationKind::LoginPassword));
        // 空白を含む
        assert!(!validate_string("Pass w0rd", ValidationKind::LoginPassword));
    }

    #[test]
    fn test_url() {
        assert!(validate_string("https://console.example.com/api", ValidationKind::Url));
        assert!(validate_string("ftp://files.example.jp", ValidationKind::Url));
        assert!(!validate_string("example.com", ValidationKind::Url));
        assert!(!validate_string("https://localhost", ValidationKind::Url));
    }

    #[test]
    fn test_name() {
        assert!(validate_string("東京 本社", ValidationKind::Name));
        assert!(validate_string("A", ValidationKind::Name));
        assert!(!validate_string(" 本社", ValidationKind::Name));
        assert!(!validate_string("本社-", ValidationKind::Name));
    }

    #[test]
    fn test_timestamp() {
        assert!(validate_string("2024-05-01T09:30:00+00:00", ValidationKind::Timestamp));
        assert!(!validate_string("2024-05-01T09:30:00+09:00", ValidationKind::Timestamp));
        assert!(!validate_string("2024-05-01 09:30:00", ValidationKind::Timestamp));
    }

    #[test]
    fn test_ensure_present() {
        assert!(ensure_present("name", "屋外カメラ").is_ok());
        let err = ensure_present("name", "   ").unwrap_err();
        assert!(err.to_string().contains("name is required"));
    }

    #[test]
    fn test_string_difference() {
        assert_eq!(string_difference("abc", "abcdef"), "def");
        assert_eq!(string_difference("abcdef", "abXYef"), "XY");
        assert_eq!(string_difference("abc", "ab"), "");
        assert_eq!(string_difference("画角", "画角調整"), "調整");
    }
}
