//! 表示メッセージ
//!
//! APIの `error_code` を画面ごと・言語ごとの固定メッセージへ対応付ける。
//! メッセージは計算せず、テーブルとして列挙する。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 未知のエラーコードの代替
pub const UNKNOWN_ERROR_CODE: u32 = 10000;
/// タイムアウト時に使うメッセージのコード
pub const TIMEOUT_ERROR_CODE: u32 = 50401;
/// ネットワーク到達不可の識別子
pub const NETWORK_ERROR_KEY: &str = "ERR_NETWORK";

/// 表示言語
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[serde(rename = "en")]
    English,
    #[default]
    #[serde(rename = "jp")]
    Japanese,
}

impl Locale {
    pub fn code(self) -> &'static str {
        match self {
            Locale::English => "en",
            Locale::Japanese => "jp",
        }
    }
}

impl std::str::FromStr for Locale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Locale::English),
            "jp" | "ja" | "japanese" => Ok(Locale::Japanese),
            _ => Err(Error::UnknownLocale(s.to_string())),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// 画面の種類（管理コンソール / 請負業者アプリ）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Admin,
    Contractor,
}

/// 正規化済みエラーコード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// サーバーが返した数値コード
    Server(u32),
    /// ネットワーク到達不可（ERR_NETWORK）
    Network,
    /// リクエストのタイムアウト
    Timeout,
    /// コードなしのエラー
    Unknown,
}

impl ErrorCode {
    /// 数値コードを返す（ネットワークエラーはなし）
    pub fn number(self) -> Option<u32> {
        match self {
            ErrorCode::Server(code) => Some(code),
            ErrorCode::Timeout => Some(TIMEOUT_ERROR_CODE),
            ErrorCode::Unknown => Some(UNKNOWN_ERROR_CODE),
            ErrorCode::Network => None,
        }
    }

    /// 画面のテーブルに存在しないコードを Unknown に丸める
    pub fn resolve(self, surface: Surface) -> ErrorCode {
        match self {
            ErrorCode::Server(code) if lookup(surface, Locale::English, code).is_none() => {
                ErrorCode::Unknown
            }
            other => other,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.number() {
            Some(code) => write!(f, "{}", code),
            None => write!(f, "{}", NETWORK_ERROR_KEY),
        }
    }
}

/// エラーコードを表示メッセージへ変換
pub fn error_message(surface: Surface, locale: Locale, code: ErrorCode) -> &'static str {
    let unknown = || lookup(surface, locale, UNKNOWN_ERROR_CODE).unwrap_or_default();
    match code {
        ErrorCode::Network => network_message(locale),
        ErrorCode::Timeout => lookup(surface, locale, TIMEOUT_ERROR_CODE).unwrap_or_else(unknown),
        ErrorCode::Server(code) => lookup(surface, locale, code).unwrap_or_else(unknown),
        ErrorCode::Unknown => unknown(),
    }
}

fn network_message(locale: Locale) -> &'static str {
    match locale {
        Locale::English => "Unable to Connect! Please check your network connection and try again.",
        Locale::Japanese => "ネットワーク接続を確認して、もう一度試してください。",
    }
}

fn lookup(surface: Surface, locale: Locale, code: u32) -> Option<&'static str> {
    match (surface, locale) {
        (Surface::Admin, Locale::English) => admin_en(code),
        (Surface::Admin, Locale::Japanese) => admin_jp(code),
        (Surface::Contractor, Locale::English) => contractor_en(code),
        (Surface::Contractor, Locale::Japanese) => contractor_jp(code),
    }
}

const ADMIN_PROCESSING_EN: &str = "Sorry, we encountered an error while processing your request.";
const ADMIN_PROCESSING_JP: &str = "処理中にエラーが発生しました。申し訳ありませんが、もう一度お試しください";

fn admin_en(code: u32) -> Option<&'static str> {
    let msg = match code {
        10000 => "Unknown error, please try again.",
        10001 => "You have reached the character limit of 255.",
        40004 | 40005 | 40006 | 40008 | 40009 | 40010 | 40301 => ADMIN_PROCESSING_EN,
        40007 => "Please provide a comment while rejecting a review.",
        40107 => "Invalid Account or Password.",
        40303 => "Review approval failed as the current review is not the latest one.",
        40304 => "Review rejection failed as the current review is not the latest one.",
        40305 => "Invalid Client ID / Client Secret / Auth URL provided.",
        40306 => "Invalid Client ID / Client Secret / Auth URL / Application ID provided.",
        40307 => "Invalid Console Endpoint.",
        40308 => "Console credentials verification failed.",
        40401 => "Facility not found.",
        40402 => "Image file not found.",
        40403 => "Device not found.",
        40404 => "Review not found.",
        40407 => "Customer not found.",
        50002 | 50008 | 50009 => ADMIN_PROCESSING_EN,
        50010 => "Sorry, we failed to load review image.",
        50011 => "Unable to fetch the device connection state. Please check the console credentials.",
        50301 => "Unable to connect to the server. Please try again after some time.",
        50401 => "Sorry, the request timed out. Please try again.",
        _ => return None,
    };
    Some(msg)
}

fn admin_jp(code: u32) -> Option<&'static str> {
    let msg = match code {
        10000 => "予期しない問題が発生しましたもう一度試してください",
        10001 => "文字数制限の 255字に達しました",
        40004 | 40005 | 40006 | 40008 | 40009 | 40010 | 40301 => ADMIN_PROCESSING_JP,
        40007 => "レビューを却下する場合は理由を記載してください",
        40107 => "ログインIDまたはパスワードが無効です",
        40303 => "現在のレビューが最新ではないため、レビューの承認に失敗しました",
        40304 => "現在のレビューが最新ではないため、レビューの却下に失敗しました",
        40305 => "無効なクライアントID、クライアントシークレット、認証URLが入力されました",
        40306 => "無効なクライアントID、クライアントシークレット、認証URL、Application IDが入力されました",
        40307 => "Console エンドポイント が無効です",
        40308 => "コンソールの資格情報の検証に失敗しました",
        40401 => "施設が見つかりません",
        40402 => "画像ファイルが見つかりません",
        40403 => "カメラが見つかりません",
        40404 => "レビューが見つかりませんでした",
        40407 => "顧客が見つかりません",
        50002 | 50008 | 50009 => ADMIN_PROCESSING_JP,
        50010 => "申請された画像の読み込みに失敗しました",
        50011 => "デバイスの接続状態が確認できません。コンソールの資格情報を確認してください",
        50301 => "サーバーに接続できません。しばらくしてからもう一度お試しください",
        50401 => "申請がタイムアウトしました。申し訳ありませんが、もう一度お試しください",
        _ => return None,
    };
    Some(msg)
}

fn contractor_en(code: u32) -> Option<&'static str> {
    const INVALID_QR: &str = "Invalid QR code! Please scan a valid QR.";
    const CONTACT_ADMIN: &str = "Please try again or contact Admin if the issue persists.";
    let msg = match code {
        10000 | 50011 | 50014 => CONTACT_ADMIN,
        10002 => "Review already submitted by another Contractor.",
        10003 | 40302 => "Review already approved by Admin.",
        40001 | 40003 | 40101 | 40102 | 40104 | 40105 | 40106 | 40108 | 40408 | 40409 => INVALID_QR,
        40002 | 50003 | 50004 => "Review submission failed for the camera.",
        40004 | 40005 | 40006 | 40008 | 40009 | 40010 | 40301 | 50002 | 50008 => ADMIN_PROCESSING_EN,
        40103 => "Expired QR code! Please scan a valid QR.",
        40401 | 40403 | 40404 => "Unknown error, please contact Admin.",
        40402 => "Image file not found!",
        40405 => "No cameras are associated with this Facility.",
        40406 => "Image type not found",
        50001 | 50006 => "Sorry, we failed to fetch camera image.",
        50007 => "Sorry, we failed to fetch sample image.",
        50009 => "Unknown error, please try again.",
        50301 => "Unable to connect to the server. Please try again after sometime.",
        50401 => "Sorry, the request timed out. Please try again.",
        _ => return None,
    };
    Some(msg)
}

fn contractor_jp(code: u32) -> Option<&'static str> {
    const INVALID_QR: &str = "QRコードが無効です。有効なQRコードをスキャンしてください";
    const CONTACT_ADMIN: &str = "再試行して問題が解決しない場合は管理者に問い合わせてください。";
    let msg = match code {
        10000 | 50011 | 50014 => CONTACT_ADMIN,
        10002 => "レビューはすでに別のユーザによって送信されています",
        10003 | 40302 => "レビューは管理者によってすでに承認されています",
        40001 | 40003 | 40101 | 40102 | 40104 | 40105 | 40106 | 40108 | 40408 | 40409 => INVALID_QR,
        40002 | 50003 | 50004 => "撮影画像の送信に失敗しました",
        40004 | 40005 | 40006 | 40008 | 40010 | 40011 | 40301 | 50002 | 50008 => ADMIN_PROCESSING_JP,
        40103 => "QRコードの有効期限が切れています。有効なQRコードをスキャンしてください",
        40401 | 40403 | 40404 => "不明なエラーです。管理者にお問い合わせください。",
        40402 => "画像ファイルが見つかりません",
        40405 => "この施設に対応しているカメラはありません",
        40406 => "画像タイプが見つかりません",
        50001 | 50006 => "撮影画像の取得に失敗しました。申し訳ありませんが、もう一度お試しください",
        50007 => "申し訳ありませんが、サンプル画像の取得に失敗しました。",
        50009 => "不明なエラーです。もう一度お試しください。",
        50301 => "サーバーに接続できません。しばらくしてからもう一度お試しください",
        50401 => "申請がタイムアウトしました。申し訳ありませんが、もう一度お試しください",
        _ => return None,
    };
    Some(msg)
}

/// 画面表示用の固定文言
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKey {
    NotSubmitted,
    FailedToLoadImage,
    SubmittedImageNotFound,
    ReferenceImageNotFound,
    ApproveSuccess,
    RejectSuccess,
    ReviewChecking,
    ReviewApproved,
    ReviewRejected,
    ReviewFailed,
}

impl TextKey {
    /// 翻訳リソースのキー
    pub fn key(self) -> &'static str {
        match self {
            TextKey::NotSubmitted => "reviewRequestPage.notSubmitted",
            TextKey::FailedToLoadImage => "reviewRequestPage.failedToLoadImage",
            TextKey::SubmittedImageNotFound => "reviewRequestPage.submittedImageNotFound",
            TextKey::ReferenceImageNotFound => "reviewRequestPage.referenceImageNotFound",
            TextKey::ApproveSuccess => "reviewRequestPage.approveSuccess",
            TextKey::RejectSuccess => "reviewRequestPage.rejectSuccess",
            TextKey::ReviewChecking => "review_status_page.des2_p1",
            TextKey::ReviewApproved => "review_status_page.approval_des1_p1",
            TextKey::ReviewRejected => "review_status_page.reject_des1_p2",
            TextKey::ReviewFailed => "review_status_page.failed_des1_p1",
        }
    }
}

/// 固定文言を取得
pub fn text(locale: Locale, key: TextKey) -> &'static str {
    match (locale, key) {
        (Locale::English, TextKey::NotSubmitted) => "Contractor has not submitted the image.",
        (Locale::Japanese, TextKey::NotSubmitted) => "請負業者は画像を提出していません。",
        (Locale::English, TextKey::FailedToLoadImage) => "Failed to load image.",
        (Locale::Japanese, TextKey::FailedToLoadImage) => "画像の読み込みに失敗しました。",
        (Locale::English, TextKey::SubmittedImageNotFound) => "Contractor submitted image not found.",
        (Locale::Japanese, TextKey::SubmittedImageNotFound) => "請負業者が提出した画像が見つかりません。",
        (Locale::English, TextKey::ReferenceImageNotFound) => "Reference Image not found.",
        (Locale::Japanese, TextKey::ReferenceImageNotFound) => "参照画像が見つかりません。",
        (Locale::English, TextKey::ApproveSuccess) => "Review approval successful.",
        (Locale::Japanese, TextKey::ApproveSuccess) => "レビューの承認が成功しました。",
        (Locale::English, TextKey::RejectSuccess) => "Review rejection successful.",
        (Locale::Japanese, TextKey::RejectSuccess) => "レビュー拒否が成功しました。",
        (Locale::English, TextKey::ReviewChecking) => {
            "We are currently checking the angle of view at our headquarters."
        }
        (Locale::Japanese, TextKey::ReviewChecking) => "本部にて、画角を確認中です",
        (Locale::English, TextKey::ReviewApproved) => "Registration approved",
        (Locale::Japanese, TextKey::ReviewApproved) => "申請を承認しました",
        (Locale::English, TextKey::ReviewRejected) => "Please adjust the angle of view.",
        (Locale::Japanese, TextKey::ReviewRejected) => "画角調整をお願いします",
        (Locale::English, TextKey::ReviewFailed) => "Review processing failed.",
        (Locale::Japanese, TextKey::ReviewFailed) => "レビュー処理に失敗しました",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_from_str() {
        assert_eq!("en".parse::<Locale>().unwrap(), Locale::English);
        assert_eq!("ja".parse::<Locale>().unwrap(), Locale::Japanese);
        assert_eq!("JP".parse::<Locale>().unwrap(), Locale::Japanese);
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn test_locale_serde_codes() {
        assert_eq!(serde_json::to_string(&Locale::Japanese).unwrap(), "\"jp\"");
        let locale: Locale = serde_json::from_str("\"en\"").unwrap();
        assert_eq!(locale, Locale::English);
    }

    #[test]
    fn test_admin_review_not_found() {
        let msg = error_message(Surface::Admin, Locale::English, ErrorCode::Server(40404));
        assert_eq!(msg, "Review not found.");
        let msg = error_message(Surface::Admin, Locale::Japanese, ErrorCode::Server(40404));
        assert_eq!(msg, "レビューが見つかりませんでした");
    }

    #[test]
    fn test_unknown_code_falls_back() {
        let msg = error_message(Surface::Admin, Locale::English, ErrorCode::Server(99999));
        assert_eq!(msg, "Unknown error, please try again.");
        assert_eq!(ErrorCode::Server(99999).resolve(Surface::Admin), ErrorCode::Unknown);
        assert_eq!(ErrorCode::Server(40404).resolve(Surface::Admin), ErrorCode::Server(40404));
    }

    #[test]
    fn test_surfaces_differ() {
        // 同じコードでも画面ごとに文言が異なる
        let admin = error_message(Surface::Admin, Locale::English, ErrorCode::Server(40403));
        let contractor = error_message(Surface::Contractor, Locale::English, ErrorCode::Server(40403));
        assert_eq!(admin, "Device not found.");
        assert_eq!(contractor, "Unknown error, please contact Admin.");
    }

    #[test]
    fn test_network_and_timeout() {
        let msg = error_message(Surface::Contractor, Locale::Japanese, ErrorCode::Network);
        assert!(msg.contains("ネットワーク"));
        let msg = error_message(Surface::Admin, Locale::English, ErrorCode::Timeout);
        assert!(msg.contains("timed out"));
        assert_eq!(ErrorCode::Network.to_string(), "ERR_NETWORK");
        assert_eq!(ErrorCode::Timeout.to_string(), "50401");
    }

    #[test]
    fn test_text_keys() {
        assert_eq!(TextKey::NotSubmitted.key(), "reviewRequestPage.notSubmitted");
        assert_eq!(
            text(Locale::English, TextKey::NotSubmitted),
            "Contractor has not submitted the image."
        );
    }
}
