//! バックエンドREST APIの呼び出し
//!
//! 管理コンソール向け（auth, customers, reviews, devices, facilities,
//! device_types, migration）と請負業者アプリ向け（contractor）に分かれる。

pub mod auth;
pub mod client;
pub mod contractor;
pub mod customers;
pub mod device_types;
pub mod devices;
pub mod facilities;
pub mod migration;
pub mod reviews;
pub mod throttle;

pub use client::{ApiClient, UnauthorizedHook};
pub use throttle::Throttle;

use serde::Deserialize;

/// `{data: T}` で包まれている場合と素の `T` の両方を受け付ける
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Payload<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Payload<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Payload::Wrapped { data } => data,
            Payload::Bare(value) => value,
        }
    }
}
