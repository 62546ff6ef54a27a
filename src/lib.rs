//! aov-review
//!
//! カメラ画角の申請・レビューを行うクライアントライブラリ。
//! 管理コンソール（レビュー・承認）と請負業者アプリ（撮影・申請）の処理を持つ。

pub mod adjuster;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod poller;
pub mod review;
pub mod store;
pub mod submission;

pub use aov_review_common as common;
