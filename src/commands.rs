use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;

use crate::encoder::{decode_image, RawFile};
use crate::gallery::{save_generated_image, GeneratedImage};
use crate::logging::init_tracing;
use crate::prompt::SuggestionCategory;
use crate::session::{Session, SessionSnapshot};
use crate::settings::{load_settings_from_dir, save_settings_to_dir, Settings};
use crate::utils::ensure_data_dir;
use crate::build_session;

#[derive(Clone)]
struct AppState {
    session: Session,
    data_dir: PathBuf,
}

fn file_from_data_url(name: String, data_url: &str) -> Result<RawFile, String> {
    let bytes = decode_image(data_url).map_err(|e| e.to_string())?;
    Ok(RawFile::from_bytes(name, bytes))
}

// ===== Tauri Commands =====

#[tauri::command]
fn get_session(state: tauri::State<'_, AppState>) -> SessionSnapshot {
    state.session.snapshot()
}

#[tauri::command]
async fn get_settings(state: tauri::State<'_, AppState>) -> Result<Settings, String> {
    Ok(load_settings_from_dir(&state.data_dir))
}

#[tauri::command]
async fn update_settings(
    state: tauri::State<'_, AppState>,
    settings: Settings,
) -> Result<Settings, String> {
    save_settings_to_dir(&state.data_dir, &settings).map_err(|e| e.to_string())?;
    Ok(settings)
}

#[tauri::command]
fn suggestion_catalog() -> Vec<SuggestionCategory> {
    crate::prompt::suggestion_catalog().to_vec()
}

#[tauri::command]
async fn set_character_image(
    state: tauri::State<'_, AppState>,
    index: usize,
    path: Option<String>,
) -> Result<SessionSnapshot, String> {
    state
        .session
        .set_character_file(index, path.map(RawFile::from_path))
        .map_err(|e| e.to_string())?;
    Ok(state.session.snapshot())
}

#[tauri::command]
async fn set_character_image_data(
    state: tauri::State<'_, AppState>,
    index: usize,
    name: String,
    data_url: String,
) -> Result<SessionSnapshot, String> {
    let file = file_from_data_url(name, &data_url)?;
    state
        .session
        .set_character_file(index, Some(file))
        .map_err(|e| e.to_string())?;
    Ok(state.session.snapshot())
}

#[tauri::command]
async fn set_context_image(
    state: tauri::State<'_, AppState>,
    path: Option<String>,
) -> Result<SessionSnapshot, String> {
    state
        .session
        .set_context_file(path.map(RawFile::from_path))
        .map_err(|e| e.to_string())?;
    Ok(state.session.snapshot())
}

#[tauri::command]
async fn set_context_image_data(
    state: tauri::State<'_, AppState>,
    name: String,
    data_url: String,
) -> Result<SessionSnapshot, String> {
    let file = file_from_data_url(name, &data_url)?;
    state
        .session
        .set_context_file(Some(file))
        .map_err(|e| e.to_string())?;
    Ok(state.session.snapshot())
}

#[tauri::command]
async fn wait_for_encodes(state: tauri::State<'_, AppState>) -> Result<SessionSnapshot, String> {
    state.session.slots().settle().await;
    Ok(state.session.snapshot())
}

#[tauri::command]
fn toggle_character(state: tauri::State<'_, AppState>, index: usize) -> Result<bool, String> {
    state
        .session
        .toggle_character(index)
        .map_err(|e| e.to_string())
}

#[tauri::command]
fn set_use_context(state: tauri::State<'_, AppState>, use_context: bool) {
    state.session.set_use_context(use_context);
}

#[tauri::command]
fn set_prompt(state: tauri::State<'_, AppState>, prompt: String) {
    state.session.set_prompt(prompt);
}

#[tauri::command]
fn append_prompt(state: tauri::State<'_, AppState>, fragment: String) -> String {
    state.session.append_prompt(&fragment)
}

#[tauri::command]
async fn suggest_prompt(state: tauri::State<'_, AppState>) -> Result<String, String> {
    Ok(state.session.suggest_prompt().await)
}

#[tauri::command]
async fn enhance_prompt(state: tauri::State<'_, AppState>) -> Result<String, String> {
    Ok(state.session.enhance_prompt().await)
}

#[tauri::command]
async fn generate_images(
    state: tauri::State<'_, AppState>,
) -> Result<Vec<GeneratedImage>, String> {
    state.session.generate().await.map_err(|e| e.to_string())
}

#[tauri::command]
fn get_image(state: tauri::State<'_, AppState>, id: String) -> Result<GeneratedImage, String> {
    state
        .session
        .image(&id)
        .ok_or_else(|| "image not found".to_string())
}

#[tauri::command]
async fn save_image(state: tauri::State<'_, AppState>, id: String) -> Result<String, String> {
    let image = state
        .session
        .image(&id)
        .ok_or_else(|| "image not found".to_string())?;
    save_generated_image(&state.data_dir, &image)
        .await
        .map(|p| p.display().to_string())
        .map_err(|e| e.to_string())
}

// ===== Startup and Main =====

fn startup() -> Result<(AppState, WorkerGuard)> {
    let data_dir = ensure_data_dir()?;
    let guard = init_tracing(&data_dir)?;
    let settings = load_settings_from_dir(&data_dir);
    let session = build_session(&settings)?;
    Ok((AppState { session, data_dir }, guard))
}

fn try_run() -> Result<()> {
    let (state, _guard) = startup()?;

    tauri::Builder::default()
        .manage(state)
        .plugin(tauri_plugin_opener::init())
        .invoke_handler(tauri::generate_handler![
            get_session,
            get_settings,
            update_settings,
            suggestion_catalog,
            set_character_image,
            set_character_image_data,
            set_context_image,
            set_context_image_data,
            wait_for_encodes,
            toggle_character,
            set_use_context,
            set_prompt,
            append_prompt,
            suggest_prompt,
            enhance_prompt,
            generate_images,
            get_image,
            save_image
        ])
        .run(tauri::generate_context!())
        .context("error while running tauri application")
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    if let Err(e) = try_run() {
        eprintln!("likeness: {e:#}");
        std::process::exit(1);
    }
}
