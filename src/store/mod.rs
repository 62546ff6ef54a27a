//! クライアント状態ストア
//!
//! ログイン情報・絞り込み条件・表示言語・ダッシュボード表示・グリッド線を保持し、
//! 変更のたびに `Persistence` へ状態全体を書き込む。
//! グローバルには持たず、`Store` を値または `SharedStore` として渡す。

mod persist;

pub use persist::{FilePersistence, MemoryPersistence, Persistence};

use crate::api::UnauthorizedHook;
use crate::error::Result;
use aov_review_common::types::Customer;
use aov_review_common::{Account, Locale, StatusFilter};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// ダッシュボードの絞り込み条件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Filter {
    pub customer_id: Option<i64>,
    pub facility_name: String,
    pub prefecture: String,
    pub municipality: String,
    /// `"1,2,3,4"` 形式
    pub status: Option<String>,
}

impl Filter {
    pub fn status_filter(&self) -> StatusFilter {
        self.status
            .as_deref()
            .and_then(|s| StatusFilter::parse(s).ok())
            .unwrap_or_default()
    }
}

/// 個別に更新できる絞り込み項目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    FacilityName,
    Prefecture,
    Municipality,
    Status,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    #[default]
    List,
    Grid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridType {
    Small,
    #[default]
    Medium,
    Large,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Dashboard {
    pub view_type: ViewType,
    pub grid_type: GridType,
    pub current_page: u32,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self {
            view_type: ViewType::List,
            grid_type: GridType::Medium,
            current_page: 1,
        }
    }
}

/// 画角調整のグリッド線
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridLine {
    pub color: String,
    pub visibility: bool,
}

impl Default for GridLine {
    fn default() -> Self {
        Self {
            color: "#ffffff".into(),
            visibility: false,
        }
    }
}

/// 永続化される状態全体
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppState {
    pub current_account: Option<Account>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub customers: Vec<CustomerEntry>,
    pub current_language: Locale,
    pub filter: Filter,
    pub dashboard: Dashboard,
    pub grid_line: GridLine,
}

/// ストアに保持する顧客
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomerEntry {
    pub id: i64,
    pub customer_name: String,
    pub last_updated_by: String,
    pub last_updated_time: String,
}

impl From<&Customer> for CustomerEntry {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id,
            customer_name: customer.customer_name.clone(),
            last_updated_by: customer.last_updated_by.clone(),
            last_updated_time: customer.last_updated_at_utc.clone().unwrap_or_default(),
        }
    }
}

/// 状態ストア
pub struct Store<P: Persistence> {
    state: AppState,
    persistence: P,
}

/// APIクライアントと共有するストア
pub type SharedStore<P> = Arc<Mutex<Store<P>>>;

impl<P: Persistence> Store<P> {
    /// 保存済みの状態を読み込んで開く
    ///
    /// 読み込めない場合は初期状態で開始する。
    pub fn open(persistence: P) -> Self {
        Self::open_with(persistence, AppState::default())
    }

    /// 保存済みの状態がなければ `initial` で開始する
    pub fn open_with(persistence: P, initial: AppState) -> Self {
        let state = match persistence.load() {
            Ok(Some(state)) => state,
            Ok(None) => initial,
            Err(e) => {
                warn!("保存済みの状態を読み込めません。初期状態で開始します: {}", e);
                initial
            }
        };
        Self { state, persistence }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    pub fn account(&self) -> Option<&Account> {
        self.state.current_account.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.account()
            .map(|a| a.token.as_str())
            .filter(|t| !t.is_empty())
    }

    pub fn language(&self) -> Locale {
        self.state.current_language
    }

    fn update(&mut self, action: &str, mutate: impl FnOnce(&mut AppState)) -> Result<()> {
        mutate(&mut self.state);
        debug!(action, "store updated");
        self.persistence.save(&self.state)
    }

    pub fn set_account(&mut self, account: Option<Account>) -> Result<()> {
        self.update("account/setAccount", |s| s.current_account = account)
    }

    pub fn set_customers(&mut self, customers: &[Customer]) -> Result<()> {
        let entries = customers.iter().map(CustomerEntry::from).collect();
        self.update("customers/setCustomers", |s| s.customers = entries)
    }

    pub fn set_language(&mut self, language: Locale) -> Result<()> {
        self.update("language/setLanguage", |s| s.current_language = language)
    }

    pub fn set_filter(&mut self, filter: Filter) -> Result<()> {
        self.update("filter/setFilter", |s| s.filter = filter)
    }

    /// 顧客を切り替えると他の条件とページはリセットされる
    pub fn set_customer(&mut self, customer_id: Option<i64>) -> Result<()> {
        self.update("filter/setCustomer", |s| {
            s.filter = Filter {
                customer_id,
                ..Filter::default()
            };
            s.dashboard.current_page = 1;
        })
    }

    pub fn set_single_filter(&mut self, field: FilterField, value: String) -> Result<()> {
        self.update("filter/setSingleFilter", |s| {
            match field {
                FilterField::FacilityName => s.filter.facility_name = value,
                FilterField::Prefecture => s.filter.prefecture = value,
                FilterField::Municipality => s.filter.municipality = value,
                FilterField::Status => {
                    s.filter.status = if value.is_empty() { None } else { Some(value) }
                }
            }
            s.dashboard.current_page = 1;
        })
    }

    pub fn set_view_type(&mut self, view_type: ViewType) -> Result<()> {
        self.update("dashboard/setViewType", |s| s.dashboard.view_type = view_type)
    }

    pub fn set_grid_type(&mut self, grid_type: GridType) -> Result<()> {
        self.update("dashboard/setGridType", |s| s.dashboard.grid_type = grid_type)
    }

    pub fn set_current_page(&mut self, page: u32) -> Result<()> {
        self.update("dashboard/setCurrentPage", |s| {
            s.dashboard.current_page = page.max(1)
        })
    }

    pub fn set_grid_line_color(&mut self, color: String) -> Result<()> {
        self.update("gridLine/setGridLineColor", |s| s.grid_line.color = color)
    }

    pub fn set_grid_line_visibility(&mut self, visibility: bool) -> Result<()> {
        self.update("gridLine/setGridLineVisibility", |s| {
            s.grid_line.visibility = visibility
        })
    }

    /// ログアウト（保存済みの状態をすべて消し、表示言語は `language` に戻す）
    pub fn clear_all(&mut self, language: Locale) -> Result<()> {
        self.update("storage/clear", |s| {
            *s = AppState {
                current_language: language,
                ..AppState::default()
            };
        })
    }

    /// 401受信時のセッション破棄（表示言語とグリッド線の設定のみ残す）
    pub fn clear_session(&mut self) -> Result<()> {
        self.update("session/clear", |s| {
            *s = AppState {
                current_language: s.current_language,
                grid_line: s.grid_line.clone(),
                ..AppState::default()
            };
        })
    }

    pub fn into_shared(self) -> SharedStore<P> {
        Arc::new(Mutex::new(self))
    }
}

/// 401受信時にセッションを破棄するフック
pub fn unauthorized_hook<P>(store: SharedStore<P>) -> UnauthorizedHook
where
    P: Persistence + 'static,
{
    Arc::new(move || match store.lock() {
        Ok(mut store) => {
            if let Err(e) = store.clear_session() {
                warn!("セッションの破棄に失敗: {}", e);
            }
        }
        Err(_) => warn!("ストアのロックに失敗"),
    })
}
