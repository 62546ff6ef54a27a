use aov_review_common::Locale;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aov-review")]
#[command(about = "カメラ画角の申請・レビュークライアント", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 表示言語 (en/jp)（省略時は保存済みの設定）
    #[arg(long, global = true)]
    pub lang: Option<Locale>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 管理者としてログイン
    Login {
        /// ログインID
        #[arg(required = true)]
        login_id: String,

        /// パスワード（省略時は入力を求める）
        #[arg(short, long)]
        password: Option<String>,
    },

    /// ログアウト（保存済みの状態をすべて消す）
    Logout,

    /// 顧客一覧を表示
    Customers {
        /// ダッシュボードで使う顧客を選択
        #[arg(short, long)]
        select: Option<i64>,
    },

    /// デバイスごとの最新レビュー（ダッシュボード）
    Reviews {
        /// 顧客ID（省略時は選択済みの顧客）
        #[arg(short, long)]
        customer: Option<i64>,

        /// 施設名
        #[arg(long)]
        facility_name: Option<String>,

        /// 都道府県
        #[arg(long)]
        prefecture: Option<String>,

        /// 市区町村
        #[arg(long)]
        municipality: Option<String>,

        /// 判定で絞り込み（例: "2,3"）
        #[arg(short, long)]
        status: Option<String>,
    },

    /// レビューの表示・承認・却下・履歴
    Review {
        #[command(subcommand)]
        action: ReviewAction,
    },

    /// 申請画像の画角を調整して参照画像の候補を作る
    Adjust {
        /// レビューID
        #[arg(required = true)]
        review_id: i64,

        /// 横方向の移動量（表示座標）
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        dx: f64,

        /// 縦方向の移動量（表示座標）
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        dy: f64,

        /// 表示幅（省略時は元画像の幅）
        #[arg(long)]
        rendered_width: Option<f64>,

        /// 表示高さ（省略時は元画像の高さ）
        #[arg(long)]
        rendered_height: Option<f64>,

        /// 調整後の画像を保存するファイル
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 調整後の画像を参照画像として登録
        #[arg(long)]
        apply: bool,
    },

    /// デバイスの接続状態
    Devices {
        /// ページ番号
        #[arg(short, long, default_value = "1")]
        page: u32,

        /// 1ページの件数
        #[arg(long, default_value = "20")]
        page_size: u32,
    },

    /// 顧客の施設一覧
    Facilities {
        /// 顧客ID（省略時は選択済みの顧客）
        #[arg(short, long)]
        customer: Option<i64>,
    },

    /// デバイス種別（参照画像）の一覧
    DeviceTypes,

    /// 施設QRコードを生成（zip）
    Qr {
        /// 顧客ID
        #[arg(short, long, required = true)]
        customer: i64,

        /// 施設ID（複数指定可）
        #[arg(short, long, required = true, num_args = 1..)]
        facility: Vec<i64>,

        /// 出力zipファイル
        #[arg(short, long, default_value = "qr-codes.zip")]
        output: PathBuf,
    },

    /// 管理データをJSONにエクスポート
    Export {
        /// 出力JSONファイル
        #[arg(required = true)]
        output: PathBuf,
    },

    /// JSONから管理データをインポート
    Import {
        /// 入力JSONファイル
        #[arg(required = true)]
        input: PathBuf,
    },

    /// グリッド線の設定
    Grid {
        /// 色（#rrggbb）
        #[arg(long)]
        color: Option<String>,

        /// 表示 (on/off)
        #[arg(long)]
        visibility: Option<Toggle>,
    },

    /// 請負業者アプリの操作（施設トークンで認証）
    Contractor {
        /// QRコードに含まれる施設トークン
        #[arg(short, long, required = true)]
        token: String,

        #[command(subcommand)]
        action: ContractorAction,
    },

    /// 設定を表示/編集
    Config {
        /// APIのURLを設定
        #[arg(long)]
        set_api_url: Option<String>,

        /// 表示言語を設定 (en/jp)
        #[arg(long)]
        set_language: Option<Locale>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(Subcommand)]
pub enum ReviewAction {
    /// レビュー詳細を表示
    Show {
        #[arg(required = true)]
        id: i64,
    },

    /// 承認
    Approve {
        #[arg(required = true)]
        id: i64,
    },

    /// 却下
    Reject {
        #[arg(required = true)]
        id: i64,

        /// 却下理由（省略時は入力を求める）
        #[arg(short, long)]
        comment: Option<String>,
    },

    /// デバイスのレビュー履歴
    History {
        /// デバイスID
        #[arg(required = true)]
        device_id: i64,

        #[arg(short, long, default_value = "1")]
        page: u32,

        #[arg(long, default_value = "10")]
        page_size: u32,
    },
}

#[derive(Subcommand)]
pub enum ContractorAction {
    /// 施設トークンを確認
    Verify,

    /// 施設のデバイス一覧
    Devices {
        /// 接続状態を監視し続ける
        #[arg(short, long)]
        watch: bool,
    },

    /// カメラの最新画像で画角を申請
    Submit {
        /// デバイスID
        #[arg(required = true)]
        device_id: i64,

        /// 申請後に判定が出るまで待つ
        #[arg(short, long)]
        wait: bool,
    },

    /// 申請の判定を待つ
    Status {
        /// デバイスID
        #[arg(required = true)]
        device_id: i64,
    },

    /// カメラ画像を保存
    Capture {
        /// デバイスID
        #[arg(required = true)]
        device_id: i64,

        /// 出力ファイル
        #[arg(short, long, default_value = "capture.jpg")]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn is_on(self) -> bool {
        self == Toggle::On
    }
}

impl std::str::FromStr for Toggle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "on" | "true" | "show" => Ok(Toggle::On),
            "off" | "false" | "hide" => Ok(Toggle::Off),
            _ => Err(format!("Unknown value: {}. Use on or off", s)),
        }
    }
}
