//! レビューステータスの表示・絞り込み

use crate::error::{Error, Result};
use crate::types::ReviewResult;
use serde::{Deserialize, Serialize};

/// ステータスの表示キー
pub fn status_to_string(result: Option<ReviewResult>) -> &'static str {
    match result {
        None | Some(ReviewResult::Initial) => "initialState",
        Some(ReviewResult::Requesting) => "requesting",
        Some(ReviewResult::Rejected) => "rejected",
        Some(ReviewResult::Approved) => "approved",
    }
}

/// ダッシュボードのステータス絞り込み（チェックボックス）
///
/// APIには `"1,2,3,4"` 形式のカンマ区切りで渡す。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusFilter {
    pub initial_state: bool,
    pub requesting: bool,
    pub rejected: bool,
    pub approved: bool,
}

impl StatusFilter {
    /// カンマ区切り文字列から復元
    pub fn parse(status: &str) -> Result<Self> {
        let mut filter = Self::default();
        for element in status.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match element {
                "1" => filter.initial_state = true,
                "2" => filter.requesting = true,
                "3" => filter.rejected = true,
                "4" => filter.approved = true,
                other => return Err(Error::InvalidStatus(other.to_string())),
            }
        }
        Ok(filter)
    }

    /// APIパラメータ用の文字列（何も選択されていなければ None）
    pub fn to_param(&self) -> Option<String> {
        let mut codes = Vec::new();
        if self.initial_state {
            codes.push("1");
        }
        if self.requesting {
            codes.push("2");
        }
        if self.rejected {
            codes.push("3");
        }
        if self.approved {
            codes.push("4");
        }

        if codes.is_empty() {
            None
        } else {
            Some(codes.join(","))
        }
    }

    pub fn contains(&self, result: ReviewResult) -> bool {
        match result {
            ReviewResult::Initial => self.initial_state,
            ReviewResult::Requesting => self.requesting,
            ReviewResult::Rejected => self.rejected,
            ReviewResult::Approved => self.approved,
        }
    }
}

/// グリッド線の色に対して読みやすいアイコン色（#000 / #fff）
pub fn contrast_color(hex_color: &str) -> &'static str {
    let rgb = u32::from_str_radix(hex_color.trim_start_matches('#'), 16).unwrap_or(0);
    let r = (rgb >> 16) & 0xff;
    let g = (rgb >> 8) & 0xff;
    let b = rgb & 0xff;

    // 輝度
    let brightness = (r * 299 + g * 587 + b * 114) / 1000;
    if brightness > 125 {
        "#000"
    } else {
        "#fff"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_to_string() {
        assert_eq!(status_to_string(None), "initialState");
        assert_eq!(status_to_string(Some(ReviewResult::Requesting)), "requesting");
        assert_eq!(status_to_string(Some(ReviewResult::Approved)), "approved");
    }

    #[test]
    fn test_parse_and_param() {
        let filter = StatusFilter::parse("2, 4").unwrap();
        assert!(filter.requesting);
        assert!(filter.approved);
        assert!(!filter.rejected);
        assert_eq!(filter.to_param().as_deref(), Some("2,4"));
        assert!(filter.contains(ReviewResult::Approved));
        assert!(!filter.contains(ReviewResult::Initial));
    }

    #[test]
    fn test_empty_filter() {
        let filter = StatusFilter::parse("").unwrap();
        assert_eq!(filter, StatusFilter::default());
        assert!(filter.to_param().is_none());
    }

    #[test]
    fn test_invalid_status() {
        assert!(StatusFilter::parse("1,7").is_err());
    }

    #[test]
    fn test_contrast_color() {
        assert_eq!(contrast_color("#ffffff"), "#000");
        assert_eq!(contrast_color("#000000"), "#fff");
        assert_eq!(contrast_color("#ff0000"), "#fff");
    }
}
