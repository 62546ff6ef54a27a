use anyhow::{anyhow, Context};
use aov_review::adjuster::{decode_image, ImageAdjuster, JpegBaker, Offset, RenderedSize};
use aov_review::api::{self, ApiClient};
use aov_review::cli::{Cli, Commands, ContractorAction, ReviewAction};
use aov_review::config::Config;
use aov_review::error::AovError;
use aov_review::poller::connection::{ConnectionMonitor, FacilityConnections};
use aov_review::poller::{DeviceProgress, PollState, StatusPoller};
use aov_review::review::{ImageSlot, ReviewController, ReviewView};
use aov_review::store::{unauthorized_hook, AppState, FilePersistence, Filter, SharedStore, Store};
use aov_review::submission::{CameraImage, SubmissionController, SubmitOutcome};
use aov_review_common::types::QrCodeCustomer;
use aov_review_common::{
    contrast_color, status_to_string, text, Locale, ReviewResult, StatusFilter, Surface,
};
use clap::Parser;
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::MutexGuard;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

type SharedFileStore = SharedStore<FilePersistence>;

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn lock(store: &SharedFileStore) -> anyhow::Result<MutexGuard<'_, Store<FilePersistence>>> {
    store.lock().map_err(|_| anyhow!("ストアのロックに失敗しました"))
}

/// ログイン中のトークンと401時のセッション破棄を組み込んだクライアント
fn admin_client(config: &Config, store: &SharedFileStore) -> anyhow::Result<ApiClient> {
    let token = lock(store)?
        .token()
        .map(String::from)
        .ok_or(AovError::NotLoggedIn)?;
    Ok(ApiClient::from_config(config)?
        .with_unauthorized_hook(unauthorized_hook(store.clone()))
        .with_token(Some(token)))
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load()?;
    let storage = config.storage_file()?;
    let initial = AppState {
        current_language: config.language,
        ..AppState::default()
    };
    let store = Store::open_with(FilePersistence::new(storage), initial).into_shared();
    let locale = match cli.lang {
        Some(locale) => locale,
        None => lock(&store)?.language(),
    };

    match cli.command {
        Commands::Login { login_id, password } => {
            let password = match password {
                Some(p) => p,
                None => Password::new().with_prompt("パスワード").interact()?,
            };
            let client = ApiClient::from_config(&config)?;
            let account = api::auth::login(&client, &login_id, &password).await?;
            println!("✔ ログインしました: {}", account.login_id);
            lock(&store)?.set_account(Some(account))?;
        }

        Commands::Logout => {
            let token = lock(&store)?.token().map(String::from);
            if let (Some(token), Ok(client)) = (token, ApiClient::from_config(&config)) {
                if let Err(e) = api::auth::logout(&client.with_token(Some(token))).await {
                    tracing::warn!("ログアウトAPIの呼び出しに失敗: {}", e);
                }
            }
            lock(&store)?.clear_all(config.language)?;
            println!("✔ ログアウトしました");
        }

        Commands::Customers { select } => {
            let client = admin_client(&config, &store)?;
            let customers = api::customers::get_customers(&client).await?;
            let mut store = lock(&store)?;
            store.set_customers(&customers)?;
            if let Some(id) = select {
                if !customers.iter().any(|c| c.id == id) {
                    return Err(anyhow!("顧客が見つかりません: {}", id));
                }
                store.set_customer(Some(id))?;
            }

            let selected = store.state().filter.customer_id;
            for customer in &customers {
                let mark = if Some(customer.id) == selected { "*" } else { " " };
                println!("{} {:>5}  {}", mark, customer.id, customer.customer_name);
            }
        }

        Commands::Reviews {
            customer,
            facility_name,
            prefecture,
            municipality,
            status,
        } => {
            let client = admin_client(&config, &store)?;
            let filter = {
                let mut store = lock(&store)?;
                let saved = store.state().filter.clone();
                let filter = Filter {
                    customer_id: customer.or(saved.customer_id),
                    facility_name: facility_name.unwrap_or(saved.facility_name),
                    prefecture: prefecture.unwrap_or(saved.prefecture),
                    municipality: municipality.unwrap_or(saved.municipality),
                    status: status.or(saved.status),
                };
                if let Some(status) = &filter.status {
                    StatusFilter::parse(status)?;
                }
                store.set_filter(filter.clone())?;
                filter
            };

            let query = api::reviews::LatestReviewsQuery {
                customer_id: filter.customer_id,
                facility_name: non_empty(Some(filter.facility_name.clone())),
                prefecture: non_empty(Some(filter.prefecture.clone())),
                municipality: non_empty(Some(filter.municipality.clone())),
            };
            let Some(list) = api::reviews::get_latest_reviews(&client, &query).await? else {
                println!("顧客が選択されていません。`aov-review customers --select ID` で選択してください");
                return Ok(());
            };

            // 判定の指定がなければ全件
            let statuses = filter.status.as_ref().map(|_| filter.status_filter());
            for row in &list.data {
                let result = row.latest_review.as_ref().map(|r| r.result);
                if let Some(statuses) = &statuses {
                    if !statuses.contains(result.unwrap_or_default()) {
                        continue;
                    }
                }
                let review_id = row
                    .latest_review
                    .as_ref()
                    .map(|r| r.id.to_string())
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{:>6}  {:<20} {:<16} {}",
                    review_id,
                    row.device.device_name,
                    row.device.device_id,
                    status_to_string(result)
                );
            }
            println!("\n{}件", list.total.unwrap_or(list.data.len() as u32));
        }

        Commands::Review { action } => {
            let client = admin_client(&config, &store)?;
            run_review(action, client, locale).await?;
        }

        Commands::Adjust {
            review_id,
            dx,
            dy,
            rendered_width,
            rendered_height,
            output,
            apply,
        } => {
            let client = admin_client(&config, &store)?;
            let mut controller = ReviewController::new(client, review_id);
            if let Some(notice) = controller.load().await.notice {
                return Err(anyhow!(notice.message(locale)));
            }
            let Some(details) = controller.details() else {
                return Err(anyhow!("レビューを読み込めませんでした"));
            };
            let ImageSlot::Image(data) = &details.submitted_image else {
                let key = details.submitted_image.fallback();
                return Err(anyhow!(key.map(|k| text(locale, k)).unwrap_or_default()));
            };

            let image = decode_image(data)?;
            let rendered = RenderedSize::new(
                rendered_width.unwrap_or(image.width() as f64),
                rendered_height.unwrap_or(image.height() as f64),
            );

            let mut grid = lock(&store)?.state().grid_line.clone();
            let mut adjuster = ImageAdjuster::new(JpegBaker::new(config.jpeg_quality));
            adjuster.load(image, rendered);
            adjuster.toggle_adjustment(&mut grid);
            adjuster.drag_to(Offset::new(dx, dy));
            adjuster.end_drag()?;

            if !adjuster.can_confirm() {
                println!("画角が調整されていません（移動量が0です）");
                return Ok(());
            }
            let position = adjuster.position();
            let baked = adjuster.confirm()?;
            println!("✔ 画角を調整しました: x={}, y={}", position.x, position.y);

            if let Some(path) = output {
                std::fs::write(&path, baked.to_bytes()?)
                    .with_context(|| format!("write {}", path.display()))?;
                println!("✔ 画像を保存: {}", path.display());
            }
            if apply {
                controller.replace_reference_image(&baked).await?;
                println!("✔ 参照画像を更新しました");
            }
            lock(&store)?.set_grid_line_visibility(grid.visibility)?;
        }

        Commands::Devices { page, page_size } => {
            let client = admin_client(&config, &store)?;
            let filter = lock(&store)?.state().filter.clone();
            let query = api::devices::DeviceStatusQuery {
                customer_id: filter.customer_id,
                page,
                page_size,
                facility_name: non_empty(Some(filter.facility_name)),
                prefecture: non_empty(Some(filter.prefecture)),
                municipality: non_empty(Some(filter.municipality)),
                status: filter.status,
            };
            lock(&store)?.set_current_page(page)?;
            match api::devices::get_device_status(&client, &query).await? {
                Some(list) => {
                    for device in &list.data {
                        println!(
                            "{:<20} {:<12} ({})",
                            device.device_id,
                            format!("{:?}", device.connection_status),
                            device.connection_status.color()
                        );
                    }
                    println!(
                        "\n{} / {}件",
                        list.data.len(),
                        list.total.unwrap_or(list.data.len() as u32)
                    );
                }
                None => println!("顧客が選択されていません"),
            }
        }

        Commands::Facilities { customer } => {
            let client = admin_client(&config, &store)?;
            let customer_id = customer
                .or(lock(&store)?.state().filter.customer_id)
                .ok_or_else(|| anyhow!("顧客を指定してください（--customer または customers --select）"))?;
            let facilities = api::facilities::get_facilities(&client, customer_id).await?;
            for facility in &facilities {
                let kind = facility.facility_type.as_ref().map(|t| t.name.as_str()).unwrap_or("-");
                println!(
                    "{:>5}  {:<24} {:<12} {} {}",
                    facility.id, facility.facility_name, kind, facility.prefecture, facility.municipality
                );
            }
            println!("\n{}件", facilities.len());
        }

        Commands::DeviceTypes => {
            let client = admin_client(&config, &store)?;
            for device_type in api::device_types::get_device_types(&client).await? {
                let reference = if device_type.sample_image_blob.as_deref().map_or(true, str::is_empty) {
                    "参照画像なし"
                } else {
                    "参照画像あり"
                };
                println!("{:>5}  {:<24} {}", device_type.id, device_type.name, reference);
            }
        }

        Commands::Qr {
            customer,
            facility,
            output,
        } => {
            let client = admin_client(&config, &store)?;
            let request = [QrCodeCustomer {
                customer_id: customer,
                facility_ids: facility,
            }];
            let zip = api::customers::generate_qr_codes(&client, &request).await?;
            std::fs::write(&output, zip).with_context(|| format!("write {}", output.display()))?;
            println!("✔ QRコードを保存: {}", output.display());
        }

        Commands::Export { output } => {
            let client = admin_client(&config, &store)?;
            let data = api::migration::export_data(&client).await?;
            std::fs::write(&output, serde_json::to_string_pretty(&data)?)
                .with_context(|| format!("write {}", output.display()))?;
            println!("✔ エクスポートしました: {}", output.display());
        }

        Commands::Import { input } => {
            let client = admin_client(&config, &store)?;
            api::migration::import_data(&client, &input).await?;
            println!("✔ インポートしました: {}", input.display());
        }

        Commands::Grid { color, visibility } => {
            let mut store = lock(&store)?;
            if let Some(color) = color {
                store.set_grid_line_color(color)?;
            }
            if let Some(visibility) = visibility {
                store.set_grid_line_visibility(visibility.is_on())?;
            }
            let grid = &store.state().grid_line;
            println!("グリッド線:");
            println!("  色: {}（文字色 {}）", grid.color, contrast_color(&grid.color));
            println!("  表示: {}", if grid.visibility { "on" } else { "off" });
        }

        Commands::Contractor { token, action } => {
            let client = ApiClient::from_config(&config)?;
            let facility = api::contractor::verify_facility(&client, &token).await?;
            run_contractor(action, client, &config, locale, &facility.facility_name).await?;
        }

        Commands::Config {
            set_api_url,
            set_language,
            show,
        } => {
            let mut config = config;

            if let Some(url) = set_api_url {
                config.set_api_url(url)?;
                println!("✔ APIのURLを設定しました");
            }

            if let Some(language) = set_language {
                config.set_language(language)?;
                lock(&store)?.set_language(language)?;
                println!("✔ 表示言語を設定しました: {}", language);
            }

            if show {
                println!("設定:");
                println!("  API URL: {}", config.get_api_url().unwrap_or_else(|_| "未設定".into()));
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  表示言語: {}", config.language);
                println!("  申請確認の間隔: {}ms", config.review_poll_interval_ms);
                println!("  接続確認の間隔: {}ms", config.connection_poll_interval_ms);
                println!("  JPEG品質: {}", config.jpeg_quality);
                println!("  保存先: {}", config.storage_file()?.display());
                let store = lock(&store)?;
                println!(
                    "  ログイン: {}",
                    store.account().map(|a| a.login_id.as_str()).unwrap_or("未ログイン")
                );
            }
        }
    }

    Ok(())
}

async fn run_review(action: ReviewAction, client: ApiClient, locale: Locale) -> anyhow::Result<()> {
    match action {
        ReviewAction::Show { id } => {
            let mut controller = ReviewController::new(client, id);
            let outcome = controller.load().await;
            if let Some(notice) = &outcome.notice {
                println!("✗ {}", notice.message(locale));
            }
            let ReviewView::Ready(details) = controller.view() else {
                return Ok(());
            };

            println!("レビュー #{}", details.id);
            println!("  デバイス: {} ({})", details.device_name, details.serial_number);
            println!("  デバイスタイプ: {}", details.device_type_name);
            println!("  施設: {} / {}", details.facility_name, details.facility_type_name);
            println!("  判定: {}", status_to_string(Some(details.result)));
            println!("  画像取得日時: {}", details.image_date_label().unwrap_or_else(|| "-".into()));
            println!("  申請日時: {}", details.requested_label().unwrap_or_else(|| "-".into()));
            println!("  回答日時: {}", details.answered_label().unwrap_or_else(|| "-".into()));
            for (label, slot) in [("提出画像", &details.submitted_image), ("参照画像", &details.reference_image)] {
                match slot.fallback() {
                    Some(key) => println!("  {}: {}", label, text(locale, key)),
                    None => println!("  {}: {} bytes (base64)", label, slot.as_str().len()),
                }
            }
            if !details.review_comment.is_empty() {
                println!("  コメント: {}", details.review_comment);
            }
        }

        ReviewAction::Approve { id } => {
            let mut controller = ReviewController::new(client, id);
            decide(&mut controller, locale, None).await?;
        }

        ReviewAction::Reject { id, comment } => {
            let mut controller = ReviewController::new(client, id);
            decide(&mut controller, locale, Some(comment)).await?;
        }

        ReviewAction::History {
            device_id,
            page,
            page_size,
        } => {
            let history = api::reviews::get_device_review_history(&client, device_id, page, page_size).await?;
            for review in &history.reviews {
                println!(
                    "{:>6}  {:<10} {}",
                    review.id,
                    status_to_string(Some(review.result)),
                    review.created_at_utc.as_deref().unwrap_or("-")
                );
            }
            println!("\n{} / {}件（{}ページ）", history.reviews.len(), history.total, history.page);
        }
    }
    Ok(())
}

/// 承認（comment なし）または却下
async fn decide(
    controller: &mut ReviewController,
    locale: Locale,
    reject: Option<Option<String>>,
) -> anyhow::Result<()> {
    if let Some(notice) = controller.load().await.notice {
        return Err(anyhow!(notice.message(locale)));
    }
    if !controller.can_decide() {
        let result = controller.details().map(|d| d.result).unwrap_or_default();
        println!("このレビューは判定できません（{}）", status_to_string(Some(result)));
        return Ok(());
    }

    let outcome = match reject {
        None => controller.approve().await,
        Some(comment) => {
            let comment = match comment {
                Some(c) => c,
                None => Input::<String>::new()
                    .with_prompt("却下理由")
                    .with_initial_text(controller.reject_reason().to_string())
                    .interact_text()?,
            };
            if !controller.set_reject_reason(&comment) {
                return Err(anyhow!("却下理由は{}文字以内で入力してください", aov_review::review::CHARACTER_LIMIT));
            }
            if !controller.can_reject() {
                return Err(anyhow!("却下理由を入力してください"));
            }
            controller.reject().await
        }
    };

    if let Some(notice) = &outcome.notice {
        println!("{}", notice.message(locale));
    }
    Ok(())
}

async fn run_contractor(
    action: ContractorAction,
    client: ApiClient,
    config: &Config,
    locale: Locale,
    facility_name: &str,
) -> anyhow::Result<()> {
    println!("施設: {}\n", facility_name);

    match action {
        ContractorAction::Verify => {
            println!("✔ 施設トークンを確認しました");
        }

        ContractorAction::Devices { watch } => {
            let devices = api::contractor::get_facility_devices(&client).await?;
            for device in &devices.devices {
                let result = device.result.map(ReviewResult::from);
                println!("{:>6}  {:<20} {}", device.id, device.device_name, status_to_string(result));
            }

            if watch {
                let mut handle = ConnectionMonitor::new(FacilityConnections::new(client))
                    .spawn(config.connection_poll_interval());
                println!("\n接続状態を監視中（Ctrl+Cで終了）");
                loop {
                    tokio::select! {
                        snapshot = handle.changed() => {
                            let Some(snapshot) = snapshot else { break };
                            if let Some(failure) = &snapshot.last_error {
                                println!("✗ {}", failure.user_message(Surface::Contractor, locale));
                                continue;
                            }
                            for (device_id, state) in &snapshot.states {
                                println!("  {:<20} {}", device_id, state.color());
                            }
                        }
                        _ = tokio::signal::ctrl_c() => break,
                    }
                }
            }
        }

        ContractorAction::Submit { device_id, wait } => {
            let mut controller = SubmissionController::new(client.clone(), device_id);
            if let Err(e) = controller.capture(false).await {
                println!("✗ {}", e);
            }
            match controller.submit().await {
                SubmitOutcome::Submitted { review_id } => {
                    println!("✔ 画角を申請しました（レビュー #{}）", review_id);
                    if wait {
                        wait_for_review(client, device_id, config, locale).await;
                    }
                }
                SubmitOutcome::Blocked { failure, .. } | SubmitOutcome::Failed(failure) => {
                    println!("✗ {}", failure.user_message(Surface::Contractor, locale));
                }
                SubmitOutcome::Ignored => {
                    println!("✗ カメラ画像がないため申請できません");
                }
            }
        }

        ContractorAction::Status { device_id } => {
            wait_for_review(client, device_id, config, locale).await;
        }

        ContractorAction::Capture { device_id, output } => {
            let mut controller = SubmissionController::new(client, device_id);
            match controller.capture(false).await? {
                CameraImage::Image(data) => {
                    let image = decode_image(data)?;
                    image
                        .save(&output)
                        .with_context(|| format!("write {}", output.display()))?;
                    println!("✔ カメラ画像を保存: {}", output.display());
                }
                CameraImage::NotFound => println!("✗ カメラ画像が見つかりません"),
            }
        }
    }
    Ok(())
}

async fn wait_for_review(client: ApiClient, device_id: i64, config: &Config, locale: Locale) {
    let poller = StatusPoller::new(DeviceProgress::new(client, device_id));
    let mut handle = poller.spawn(config.review_poll_interval());
    let pb = spinner(text(locale, PollState::Requesting.message_key()));

    let done = loop {
        tokio::select! {
            snapshot = handle.changed() => {
                let Some(snapshot) = snapshot else { break handle.snapshot() };
                if let Some(failure) = &snapshot.last_error {
                    pb.set_message(failure.user_message(Surface::Contractor, locale).to_string());
                } else {
                    pb.set_message(text(locale, snapshot.state.message_key()).to_string());
                }
                if snapshot.state.is_terminal() {
                    break snapshot;
                }
            }
            _ = tokio::signal::ctrl_c() => break handle.snapshot(),
        }
    };
    pb.finish_and_clear();

    println!("{}", text(locale, done.state.message_key()));
    if let Some(comment) = done.comment.filter(|c| !c.is_empty()) {
        if done.state == PollState::Rejected {
            println!("  コメント: {}", comment);
        }
    }
}
